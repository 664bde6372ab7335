use std::path::{Path, PathBuf};

use emath::Pos2;
use uuid::Uuid;

use crate::canvas::{Fill, GridState};
use crate::components::colors::ColorState;
use crate::components::history::{GridSnapshot, HistoryManager};
use crate::components::tools::{HoverFootprint, Tool, ToolState, footprint};
use crate::geometry::GridGeometry;
use crate::io::{ProjectFileError, load_project, save_project};
use crate::ops::paint::{flood_fill, paint_stroke, subdivide_cells};
use crate::ops::render::{GridRenderer, RenderOptions, render_cursor, render_grid};
use crate::settings::GridSettings;

/// Pointer state between down and up.
#[derive(Clone, Copy, Debug)]
struct StrokeState {
    last: Pos2,
}

/// Single open document plus the editing state that drives it.
pub struct Project {
    pub id: Uuid,
    /// Display name (derived from path or "Untitled-X")
    pub name: String,
    /// `None` for unsaved/untitled files.
    pub path: Option<PathBuf>,
    pub is_dirty: bool,

    pub geometry: GridGeometry,
    pub grid: GridState,
    pub history: HistoryManager,

    pub tools: ToolState,
    /// What pencil and bucket paint with.
    pub fill: Fill,
    pub color: ColorState,
    pub hover: HoverFootprint,

    pub render_options: RenderOptions,
    pub flood_fill_limit: usize,

    stroke: Option<StrokeState>,
}

impl Project {
    pub fn new_untitled(untitled_counter: usize, settings: &GridSettings) -> Self {
        let color = ColorState::default();
        let mut tools = ToolState::with_brush_size(settings.brush_size);
        tools.pixel_anchor = settings.pixel_anchor;
        Self {
            id: Uuid::new_v4(),
            name: format!("Untitled-{}", untitled_counter),
            path: None,
            is_dirty: false,
            geometry: settings.geometry(),
            grid: GridState::new(),
            history: HistoryManager::new(settings.max_undo_steps),
            tools,
            fill: Fill::Color(color.css()),
            color,
            hover: HoverFootprint::default(),
            render_options: settings.render_options(),
            flood_fill_limit: settings.flood_fill_limit,
            stroke: None,
        }
    }

    /// Open a .trx project file.
    pub fn open(path: &Path, settings: &GridSettings) -> Result<Self, ProjectFileError> {
        let (geometry, grid) = load_project(path)?;
        let mut project = Self::new_untitled(0, settings);
        project.geometry = geometry;
        project.grid = grid;
        project.path = Some(path.to_path_buf());
        project.update_name_from_path();
        log_info!(
            "Opened {} ({}x{} cells, {} painted)",
            path.display(),
            geometry.width,
            geometry.height,
            project.grid.len()
        );
        Ok(project)
    }

    /// Save to `path` and adopt it as the document path.
    pub fn save_as(&mut self, path: &Path) -> Result<(), ProjectFileError> {
        save_project(&self.geometry, &self.grid, path)?;
        self.path = Some(path.to_path_buf());
        self.update_name_from_path();
        self.mark_clean();
        Ok(())
    }

    pub fn mark_dirty(&mut self) {
        self.is_dirty = true;
    }

    pub fn mark_clean(&mut self) {
        self.is_dirty = false;
    }

    pub fn update_name_from_path(&mut self) {
        if let Some(ref path) = self.path {
            self.name = path
                .file_name()
                .map(|s| s.to_string_lossy().to_string())
                .unwrap_or_else(|| "Unknown".to_string());
        }
    }

    /// Get the display title (name with dirty indicator)
    pub fn display_title(&self) -> String {
        if self.is_dirty {
            format!("{}*", self.name)
        } else {
            self.name.clone()
        }
    }

    pub fn is_drawing(&self) -> bool {
        self.stroke.is_some()
    }

    // ========================================================================
    // POINTER INPUT
    // ========================================================================

    fn update_hover(&mut self, p: Pos2) {
        self.hover = footprint(&self.geometry, &self.grid, p, &self.tools);
    }

    /// Start a gesture at `p`. Returns true when the grid changed.
    ///
    /// Click-only tools (bucket, picker, subdivide) complete on the spot;
    /// pencil and eraser keep the gesture open until [`Self::pointer_up`].
    pub fn pointer_down(&mut self, p: Pos2) -> bool {
        self.update_hover(p);
        let tool = self.tools.tool();
        self.history.begin_gesture(gesture_description(tool), &self.grid);
        self.stroke = Some(StrokeState { last: p });

        let changed = match tool {
            Tool::Pencil | Tool::Eraser => self.paint_segment(p, p),
            Tool::Bucket => match self.hover.cells.first() {
                Some(&cell) => flood_fill(&mut self.grid, &self.geometry, cell, &self.fill, self.flood_fill_limit),
                None => false,
            },
            Tool::Picker => {
                self.pick_at(p);
                false
            }
            Tool::Subdivide => {
                if self.tools.effective_size() == 1 {
                    match self.hover.cells.first() {
                        Some(&cell) => self.grid.route_and_mutate(&self.geometry, cell, p, Tool::Subdivide, &self.fill),
                        None => false,
                    }
                } else {
                    subdivide_cells(&mut self.grid, &self.geometry, &self.hover.cells)
                }
            }
        };
        if changed {
            self.mark_dirty();
            self.update_hover(p);
        }
        changed
    }

    /// Continue the gesture (if any) to `p`. Returns true when the grid changed.
    pub fn pointer_move(&mut self, p: Pos2) -> bool {
        self.update_hover(p);
        let Some(stroke) = self.stroke else {
            return false;
        };
        self.stroke = Some(StrokeState { last: p });
        if self.tools.tool().is_click_only() {
            return false;
        }
        let changed = self.paint_segment(stroke.last, p);
        if changed {
            self.mark_dirty();
        }
        changed
    }

    /// Finish the gesture. Returns true when an undo step was recorded.
    pub fn pointer_up(&mut self) -> bool {
        self.stroke = None;
        self.history.end_gesture(&self.grid)
    }

    /// The pointer left the canvas: clear the hover and close any gesture.
    pub fn pointer_leave(&mut self) -> bool {
        self.hover = HoverFootprint::default();
        if self.stroke.is_some() {
            self.pointer_up()
        } else {
            false
        }
    }

    fn paint_segment(&mut self, p0: Pos2, p1: Pos2) -> bool {
        paint_stroke(
            &mut self.grid,
            &self.geometry,
            p0,
            p1,
            self.tools.tool(),
            self.tools.brush_size(),
            self.tools.pixel_anchor,
            &self.fill,
        )
    }

    /// Adopt the fill under `p` as the current fill.
    fn pick_at(&mut self, p: Pos2) -> Option<Fill> {
        let cell = *self.hover.cells.first()?;
        let picked = self.grid.pick(&self.geometry, cell, p)?;
        if let Fill::Color(token) = &picked {
            match ColorState::from_token(token) {
                Some(state) => self.color = state,
                None => {
                    log_warn!("Picked unrecognised color token '{}'", token);
                }
            }
        }
        log_info!("Color picked at {}: {}", cell, picked);
        self.fill = picked.clone();
        Some(picked)
    }

    // ========================================================================
    // DOCUMENT COMMANDS
    // ========================================================================

    /// Returns the undone step's description, or `None` when there was
    /// nothing to undo.
    pub fn undo(&mut self) -> Option<String> {
        self.stroke = None;
        self.history.cancel_gesture();
        let desc = self.history.undo(&mut self.grid);
        match &desc {
            Some(d) => {
                self.mark_dirty();
                log_info!("Undo: {}", d);
            }
            None => {
                log_info!("Nothing to undo");
            }
        }
        desc
    }

    pub fn redo(&mut self) -> Option<String> {
        self.stroke = None;
        self.history.cancel_gesture();
        let desc = self.history.redo(&mut self.grid);
        if desc.is_some() {
            self.mark_dirty();
        }
        desc
    }

    /// Clear the canvas. Undoable when something was painted.
    pub fn reset(&mut self) -> bool {
        self.stroke = None;
        self.history.cancel_gesture();
        if self.grid.is_empty() {
            return false;
        }
        self.history.push(GridSnapshot::capture("Clear canvas", &self.grid));
        self.grid.clear();
        self.mark_dirty();
        true
    }

    /// Change the grid dimensions. Cells outside the new bounds are kept so
    /// that growing the grid again brings them back.
    pub fn resize(&mut self, width: u32, height: u32) {
        self.geometry = GridGeometry::new(self.geometry.tri_side, width, height);
        self.hover = HoverFootprint::default();
        self.mark_dirty();
    }

    /// Change the triangle edge length (zoom). Clamped to the valid range.
    pub fn set_tri_side(&mut self, tri_side: f32) -> f32 {
        self.geometry = GridGeometry::new(tri_side, self.geometry.width, self.geometry.height);
        self.hover = HoverFootprint::default();
        self.geometry.tri_side
    }

    pub fn set_tool(&mut self, tool: Tool) {
        self.tools.set_tool(tool);
    }

    pub fn set_fill(&mut self, fill: Fill) {
        if let Fill::Color(token) = &fill
            && let Some(state) = ColorState::from_token(token)
        {
            self.color = state;
        }
        self.fill = fill;
        self.leave_non_painting_tool();
    }

    /// Set the current color from a hex token. Returns false if unparseable.
    pub fn set_color_hex(&mut self, hex: &str) -> bool {
        let Some(state) = ColorState::from_hex(hex) else {
            return false;
        };
        self.color = state;
        self.fill = Fill::Color(hex.trim().to_string());
        self.leave_non_painting_tool();
        true
    }

    /// Set the color from OKLCH components, painting with its CSS form.
    pub fn set_color_oklch(&mut self, color: ColorState) {
        self.color = color;
        self.fill = Fill::Color(color.css());
        self.leave_non_painting_tool();
    }

    /// Choosing a color while erasing or picking switches back to pencil.
    fn leave_non_painting_tool(&mut self) {
        if matches!(self.tools.tool(), Tool::Eraser | Tool::Picker) {
            self.tools.set_tool(Tool::Pencil);
        }
    }

    pub fn adjust_brush_size(&mut self, delta: i32) -> Option<u8> {
        self.tools.adjust_brush_size(delta)
    }

    // ========================================================================
    // RENDERING
    // ========================================================================

    /// Draw the document followed by the hover outline.
    pub fn render(&self, renderer: &mut dyn GridRenderer) -> usize {
        let filled = render_grid(&self.grid, &self.geometry, &self.render_options, renderer);
        render_cursor(&self.hover, &self.geometry, self.tools.tool(), renderer);
        filled
    }
}

fn gesture_description(tool: Tool) -> &'static str {
    match tool {
        Tool::Pencil => "Pencil stroke",
        Tool::Eraser => "Eraser stroke",
        Tool::Bucket => "Bucket fill",
        Tool::Picker => "Pick color",
        Tool::Subdivide => "Subdivide",
    }
}
