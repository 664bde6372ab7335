use emath::Pos2;
use serde::{Deserialize, Serialize};

use crate::canvas::GridState;
use crate::geometry::{CellCoord, GridGeometry};

/// Largest brush (triangle rows per cluster).
pub const MAX_BRUSH_SIZE: u8 = 5;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Tool {
    #[default]
    Pencil,
    Eraser,
    Bucket,
    Picker,
    Subdivide,
}

impl Tool {
    pub fn all() -> &'static [Tool] {
        &[Tool::Pencil, Tool::Eraser, Tool::Bucket, Tool::Picker, Tool::Subdivide]
    }

    pub fn name(&self) -> &'static str {
        match self {
            Tool::Pencil => "pencil",
            Tool::Eraser => "eraser",
            Tool::Bucket => "bucket",
            Tool::Picker => "picker",
            Tool::Subdivide => "subdivide",
        }
    }

    pub fn from_name(name: &str) -> Option<Tool> {
        Tool::all()
            .iter()
            .copied()
            .find(|t| t.name().eq_ignore_ascii_case(name.trim()))
    }

    /// Bucket and picker always act on a single cell.
    pub fn effective_size(&self, brush_size: u8) -> u8 {
        match self {
            Tool::Bucket | Tool::Picker => 1,
            _ => brush_size.clamp(1, MAX_BRUSH_SIZE),
        }
    }

    /// Tools that act once per click and ignore pointer drags.
    pub fn is_click_only(&self) -> bool {
        matches!(self, Tool::Bucket | Tool::Picker | Tool::Subdivide)
    }

    /// Stroke color of the hover outline.
    pub fn cursor_color(&self) -> &'static str {
        match self {
            Tool::Eraser => "#ff4444",
            Tool::Picker => "#ffff00",
            Tool::Bucket => "#00ff00",
            Tool::Pencil | Tool::Subdivide => "#ffffff",
        }
    }
}

// ============================================================================
// TOOL STATE
// ============================================================================

/// Active tool and brush size.
///
/// Picker and bucket always paint one cell, so size changes made while they
/// are active only update the stored size, which comes back into effect when
/// the user switches to pencil or eraser.
#[derive(Clone, Debug, PartialEq)]
pub struct ToolState {
    tool: Tool,
    brush_size: u8,
    stored_brush_size: u8,
    /// Recenter large brushes in pixel space instead of (row, col) space.
    pub pixel_anchor: bool,
}

impl Default for ToolState {
    fn default() -> Self {
        Self {
            tool: Tool::Pencil,
            brush_size: 1,
            stored_brush_size: 1,
            pixel_anchor: false,
        }
    }
}

impl ToolState {
    pub fn with_brush_size(size: u8) -> Self {
        let size = size.clamp(1, MAX_BRUSH_SIZE);
        Self {
            brush_size: size,
            stored_brush_size: size,
            ..Self::default()
        }
    }

    pub fn tool(&self) -> Tool {
        self.tool
    }

    pub fn brush_size(&self) -> u8 {
        self.brush_size
    }

    pub fn stored_brush_size(&self) -> u8 {
        self.stored_brush_size
    }

    /// Size the active tool actually paints with.
    pub fn effective_size(&self) -> u8 {
        self.tool.effective_size(self.brush_size)
    }

    pub fn set_tool(&mut self, tool: Tool) {
        self.tool = tool;
        if matches!(tool, Tool::Pencil | Tool::Eraser) {
            self.brush_size = self.stored_brush_size;
        }
    }

    pub fn set_brush_size(&mut self, size: u8) {
        let size = size.clamp(1, MAX_BRUSH_SIZE);
        self.brush_size = size;
        self.stored_brush_size = size;
    }

    /// Step the brush size by `delta`. Returns the new size when it changed.
    pub fn adjust_brush_size(&mut self, delta: i32) -> Option<u8> {
        let base = if self.tool.effective_size(MAX_BRUSH_SIZE) == 1 {
            self.stored_brush_size
        } else {
            self.brush_size
        };
        let next = (base as i32 + delta).clamp(1, MAX_BRUSH_SIZE as i32) as u8;
        if next == base {
            return None;
        }
        self.stored_brush_size = next;
        if self.tool.effective_size(MAX_BRUSH_SIZE) != 1 {
            self.brush_size = next;
        }
        Some(next)
    }
}

// ============================================================================
// HOVER FOOTPRINT
// ============================================================================

/// What the cursor covers: the brush cells, plus the exact sub-triangle when
/// a single subdivided cell is hovered.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct HoverFootprint {
    pub cells: Vec<CellCoord>,
    pub sub_triangle: Option<[Pos2; 3]>,
}

impl HoverFootprint {
    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }
}

/// Hit-test the pointer against the grid for the active tool.
pub fn footprint(geometry: &GridGeometry, grid: &GridState, p: Pos2, tools: &ToolState) -> HoverFootprint {
    let size = tools.effective_size();
    let cells = geometry.brush_footprint(p, size, tools.pixel_anchor);
    let sub_triangle = match cells.as_slice() {
        [cell] if size == 1 => grid.leaf_triangle(geometry, *cell, p),
        _ => None,
    };
    HoverFootprint { cells, sub_triangle }
}

#[cfg(test)]
mod tests {
    use super::*;
    use emath::pos2;

    #[test]
    fn tool_names_round_trip() {
        for tool in Tool::all() {
            assert_eq!(Tool::from_name(tool.name()), Some(*tool));
        }
        assert_eq!(Tool::from_name(" Bucket "), Some(Tool::Bucket));
        assert_eq!(Tool::from_name("airbrush"), None);
    }

    #[test]
    fn single_cell_tools_ignore_brush_size() {
        assert_eq!(Tool::Bucket.effective_size(4), 1);
        assert_eq!(Tool::Picker.effective_size(4), 1);
        assert_eq!(Tool::Pencil.effective_size(4), 4);
        assert_eq!(Tool::Subdivide.effective_size(3), 3);
        assert_eq!(Tool::Eraser.effective_size(9), MAX_BRUSH_SIZE);
    }

    #[test]
    fn size_changes_under_bucket_are_stored_for_later() {
        let mut tools = ToolState::with_brush_size(2);
        tools.set_tool(Tool::Bucket);
        assert_eq!(tools.adjust_brush_size(1), Some(3));
        assert_eq!(tools.brush_size(), 2);
        assert_eq!(tools.effective_size(), 1);
        tools.set_tool(Tool::Pencil);
        assert_eq!(tools.brush_size(), 3);
    }

    #[test]
    fn brush_size_is_clamped() {
        let mut tools = ToolState::default();
        assert_eq!(tools.adjust_brush_size(-1), None);
        tools.set_brush_size(5);
        assert_eq!(tools.adjust_brush_size(1), None);
        assert_eq!(tools.adjust_brush_size(-2), Some(3));
    }

    #[test]
    fn footprint_reports_sub_triangle_for_subdivided_cells() {
        let g = GridGeometry::new(20.0, 10, 10);
        let mut grid = GridState::new();
        let cell = CellCoord::new(3, 3);
        let p = g.centroid(cell);
        let tools = ToolState::default();

        let plain = footprint(&g, &grid, p, &tools);
        assert_eq!(plain.cells, vec![cell]);
        assert_eq!(plain.sub_triangle, None);

        grid.subdivide(cell);
        let fine = footprint(&g, &grid, p, &tools);
        assert!(fine.sub_triangle.is_some());

        let big = footprint(&g, &grid, p, &ToolState::with_brush_size(2));
        assert_eq!(big.cells.len(), 4);
        assert_eq!(big.sub_triangle, None);

        assert!(footprint(&g, &grid, pos2(-10.0, -10.0), &tools).is_empty());
    }
}
