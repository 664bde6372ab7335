//! Turns a grid into draw calls.
//!
//! Nothing here rasterizes. A [`GridRenderer`] receives triangle fills and
//! polylines in pixel space and draws them however it likes; [`DrawList`]
//! just records them.

use emath::{Pos2, Vec2, pos2, vec2};
use serde::{Deserialize, Serialize};

use crate::canvas::{CellValue, Fill, GridState};
use crate::components::tools::{HoverFootprint, Tool};
use crate::geometry::{CellCoord, GridGeometry, sub_triangle};

/// Above this many cells the grid overlay is not drawn.
pub const GRID_LINE_CELL_LIMIT: usize = 400_000;

/// Outline width of painted cells, hides hairline seams between neighbours.
const CELL_SEAM_WIDTH: f32 = 0.5;
const CURSOR_WIDTH: f32 = 2.0;

// ============================================================================
// LINE STYLE
// ============================================================================

#[derive(Clone, Copy, Debug, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LineDash {
    #[default]
    Solid,
    Dashed,
    Dotted,
}

impl LineDash {
    pub fn name(&self) -> &'static str {
        match self {
            LineDash::Solid => "solid",
            LineDash::Dashed => "dashed",
            LineDash::Dotted => "dotted",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        match name.trim() {
            "solid" => Some(LineDash::Solid),
            "dashed" => Some(LineDash::Dashed),
            "dotted" => Some(LineDash::Dotted),
            _ => None,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct LineStyle {
    pub color: String,
    pub width: f32,
    pub opacity: f32,
    pub dash: LineDash,
}

impl LineStyle {
    pub fn solid(color: impl Into<String>, width: f32) -> Self {
        Self {
            color: color.into(),
            width,
            opacity: 1.0,
            dash: LineDash::Solid,
        }
    }
}

/// What to draw besides the cells themselves.
#[derive(Clone, Debug, PartialEq)]
pub struct RenderOptions {
    /// `None` leaves the surface transparent.
    pub background: Option<String>,
    pub show_grid: bool,
    pub grid: LineStyle,
    pub show_sub_grid: bool,
    pub sub_grid: LineStyle,
}

impl Default for RenderOptions {
    fn default() -> Self {
        Self {
            background: None,
            show_grid: true,
            grid: LineStyle {
                color: "#C5C4BD".to_string(),
                width: 0.5,
                opacity: 0.2,
                dash: LineDash::Solid,
            },
            show_sub_grid: true,
            sub_grid: LineStyle {
                color: "#D2D1CA".to_string(),
                width: 0.5,
                opacity: 1.0,
                dash: LineDash::Dashed,
            },
        }
    }
}

// ============================================================================
// RENDERER CONTRACT
// ============================================================================

pub trait GridRenderer {
    /// Fill the whole `size` surface with `color`.
    fn fill_background(&mut self, size: Vec2, color: &str);
    /// Fill a triangle. Implementations should also stroke its outline with
    /// the same fill at `seam_width` so adjacent cells meet without gaps.
    fn fill_triangle(&mut self, tri: &[Pos2; 3], fill: &Fill, seam_width: f32);
    fn stroke_polyline(&mut self, points: &[Pos2], style: &LineStyle);
}

/// Draw `grid` in (row, col) order: background, cells (descending into
/// subdivided nodes), sub-grid outlines, then grid lines.
///
/// Returns the number of triangles filled.
pub fn render_grid(
    grid: &GridState,
    geometry: &GridGeometry,
    options: &RenderOptions,
    renderer: &mut dyn GridRenderer,
) -> usize {
    let (w, h) = geometry.canvas_size();
    if let Some(bg) = &options.background {
        renderer.fill_background(vec2(w as f32, h as f32), bg);
    }

    let mut filled = 0;
    for (cell, value) in grid.iter_within(geometry) {
        filled += fill_node(value, &geometry.vertices(cell), renderer);
    }

    if options.show_sub_grid {
        for (cell, value) in grid.iter_within(geometry) {
            outline_node(value, &geometry.vertices(cell), &options.sub_grid, renderer);
        }
    }

    if options.show_grid {
        draw_grid_lines(geometry, &options.grid, renderer);
    }
    filled
}

fn fill_node(value: &CellValue, tri: &[Pos2; 3], renderer: &mut dyn GridRenderer) -> usize {
    match value {
        CellValue::Subdivided(children) => children
            .iter()
            .enumerate()
            .filter_map(|(i, child)| child.as_ref().map(|c| (i, c)))
            .map(|(i, child)| fill_node(child, &sub_triangle(tri, i), renderer))
            .sum(),
        leaf => match leaf.as_fill() {
            Some(fill) => {
                renderer.fill_triangle(tri, &fill, CELL_SEAM_WIDTH);
                1
            }
            None => 0,
        },
    }
}

/// Stroke the center triangle of every subdivided node, which traces all
/// internal edges of the split.
fn outline_node(value: &CellValue, tri: &[Pos2; 3], style: &LineStyle, renderer: &mut dyn GridRenderer) {
    if let CellValue::Subdivided(children) = value {
        let center = sub_triangle(tri, 3);
        renderer.stroke_polyline(&closed(&center), style);
        for (i, child) in children.iter().enumerate() {
            if let Some(child) = child {
                outline_node(child, &sub_triangle(tri, i), style, renderer);
            }
        }
    }
}

/// One horizontal line per row boundary, then the two slanted edges of every
/// cell as a single three-point polyline.
pub fn draw_grid_lines(geometry: &GridGeometry, style: &LineStyle, renderer: &mut dyn GridRenderer) {
    if geometry.cell_count() > GRID_LINE_CELL_LIMIT {
        return;
    }
    let th = geometry.tri_height();
    let hw = geometry.half_width();
    let canvas_w = geometry.canvas_size().0 as f32;

    for r in 0..=geometry.height {
        let y = r as f32 * th;
        renderer.stroke_polyline(&[pos2(0.0, y), pos2(canvas_w, y)], style);
    }

    for r in 0..geometry.height as i32 {
        for c in 0..geometry.width as i32 {
            let x = c as f32 * hw;
            let y = r as f32 * th;
            let up = CellCoord::new(r, c).is_up();
            let path = if up {
                [pos2(x, y + th), pos2(x + hw, y), pos2(x + 2.0 * hw, y + th)]
            } else {
                [pos2(x, y), pos2(x + hw, y + th), pos2(x + 2.0 * hw, y)]
            };
            renderer.stroke_polyline(&path, style);
        }
    }
}

/// Outline the hovered cells (and the hovered sub-triangle) in the tool's
/// cursor color.
pub fn render_cursor(
    hover: &HoverFootprint,
    geometry: &GridGeometry,
    tool: Tool,
    renderer: &mut dyn GridRenderer,
) {
    let style = LineStyle::solid(tool.cursor_color(), CURSOR_WIDTH);
    for &cell in &hover.cells {
        renderer.stroke_polyline(&closed(&geometry.vertices(cell)), &style);
    }
    if let Some(sub) = &hover.sub_triangle {
        renderer.stroke_polyline(&closed(sub), &style);
    }
}

fn closed(tri: &[Pos2; 3]) -> [Pos2; 4] {
    [tri[0], tri[1], tri[2], tri[0]]
}

// ============================================================================
// DRAW LIST: a recording renderer
// ============================================================================

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum DrawCommand {
    Background {
        width: f32,
        height: f32,
        color: String,
    },
    Triangle {
        points: [[f32; 2]; 3],
        fill: Fill,
        seam_width: f32,
    },
    Polyline {
        points: Vec<[f32; 2]>,
        style: LineStyle,
    },
}

/// Records draw calls in order, for export collaborators and tests.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct DrawList {
    pub width: u32,
    pub height: u32,
    pub commands: Vec<DrawCommand>,
}

impl DrawList {
    pub fn new(geometry: &GridGeometry) -> Self {
        let (width, height) = geometry.canvas_size();
        Self {
            width,
            height,
            commands: Vec::new(),
        }
    }

    pub fn triangles(&self) -> impl Iterator<Item = (&[[f32; 2]; 3], &Fill)> {
        self.commands.iter().filter_map(|cmd| match cmd {
            DrawCommand::Triangle { points, fill, .. } => Some((points, fill)),
            _ => None,
        })
    }

    pub fn polylines(&self) -> impl Iterator<Item = (&[[f32; 2]], &LineStyle)> {
        self.commands.iter().filter_map(|cmd| match cmd {
            DrawCommand::Polyline { points, style } => Some((points.as_slice(), style)),
            _ => None,
        })
    }
}

impl GridRenderer for DrawList {
    fn fill_background(&mut self, size: Vec2, color: &str) {
        self.commands.push(DrawCommand::Background {
            width: size.x,
            height: size.y,
            color: color.to_string(),
        });
    }

    fn fill_triangle(&mut self, tri: &[Pos2; 3], fill: &Fill, seam_width: f32) {
        self.commands.push(DrawCommand::Triangle {
            points: tri.map(|p| [p.x, p.y]),
            fill: fill.clone(),
            seam_width,
        });
    }

    fn stroke_polyline(&mut self, points: &[Pos2], style: &LineStyle) {
        self.commands.push(DrawCommand::Polyline {
            points: points.iter().map(|p| [p.x, p.y]).collect(),
            style: style.clone(),
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn no_overlays() -> RenderOptions {
        RenderOptions {
            show_grid: false,
            show_sub_grid: false,
            ..RenderOptions::default()
        }
    }

    #[test]
    fn cells_are_drawn_in_row_major_order() {
        let g = GridGeometry::new(20.0, 4, 4);
        let mut grid = GridState::new();
        grid.set(CellCoord::new(2, 1), Some(CellValue::Color("b".into())));
        grid.set(CellCoord::new(0, 3), Some(CellValue::Color("a".into())));

        let mut list = DrawList::new(&g);
        assert_eq!(render_grid(&grid, &g, &no_overlays(), &mut list), 2);
        let fills: Vec<_> = list.triangles().map(|(_, f)| f.to_string()).collect();
        assert_eq!(fills, ["a", "b"]);
        let (pts, _) = list.triangles().next().unwrap();
        let expected = g.vertices(CellCoord::new(0, 3)).map(|p| [p.x, p.y]);
        assert_eq!(*pts, expected);
    }

    #[test]
    fn subdivided_cells_draw_their_children() {
        let g = GridGeometry::new(20.0, 4, 4);
        let mut grid = GridState::new();
        let cell = CellCoord::new(1, 1);
        grid.set(cell, Some(CellValue::Color("red".into())));
        grid.subdivide(cell);
        let center = g.centroid(cell);
        grid.route_and_mutate(&g, cell, center, Tool::Eraser, &Fill::color("x"));

        let mut list = DrawList::new(&g);
        assert_eq!(render_grid(&grid, &g, &no_overlays(), &mut list), 3);

        let mut with_sub = DrawList::new(&g);
        let opts = RenderOptions {
            show_grid: false,
            ..RenderOptions::default()
        };
        render_grid(&grid, &g, &opts, &mut with_sub);
        assert_eq!(with_sub.polylines().count(), 1);
        let (pts, style) = with_sub.polylines().next().unwrap();
        assert_eq!(pts.len(), 4);
        assert_eq!(style.dash, LineDash::Dashed);
    }

    #[test]
    fn out_of_bounds_cells_are_not_drawn() {
        let g = GridGeometry::new(20.0, 2, 2);
        let mut grid = GridState::new();
        grid.set(CellCoord::new(5, 5), Some(CellValue::Color("red".into())));
        let mut list = DrawList::new(&g);
        assert_eq!(render_grid(&grid, &g, &no_overlays(), &mut list), 0);
    }

    #[test]
    fn grid_lines_cover_rows_and_cells() {
        let g = GridGeometry::new(20.0, 3, 2);
        let mut list = DrawList::new(&g);
        let opts = RenderOptions {
            background: Some("#000000".into()),
            ..RenderOptions::default()
        };
        render_grid(&GridState::new(), &g, &opts, &mut list);
        assert!(matches!(list.commands[0], DrawCommand::Background { .. }));
        // 3 horizontal lines + 6 cell polylines.
        assert_eq!(list.polylines().count(), 3 + 6);
    }

    #[test]
    fn huge_grids_skip_grid_lines() {
        let g = GridGeometry::new(5.0, 1000, 1000);
        let mut list = DrawList::new(&g);
        draw_grid_lines(&g, &RenderOptions::default().grid, &mut list);
        assert!(list.commands.is_empty());
    }

    #[test]
    fn cursor_uses_tool_color() {
        let g = GridGeometry::new(20.0, 4, 4);
        let hover = HoverFootprint {
            cells: vec![CellCoord::new(0, 0), CellCoord::new(0, 1)],
            sub_triangle: None,
        };
        let mut list = DrawList::new(&g);
        render_cursor(&hover, &g, Tool::Eraser, &mut list);
        assert_eq!(list.polylines().count(), 2);
        assert!(list.polylines().all(|(_, s)| s.color == "#ff4444" && s.width == 2.0));
    }
}
