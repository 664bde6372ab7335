// ============================================================================
// Gesture scripts: JSON recordings of pointer input replayed headlessly
// ============================================================================
//
// A script is a list of events in the order the UI would deliver them:
//
//   { "width": 20, "height": 12, "events": [
//       { "event": "color", "value": "#ff8800" },
//       { "event": "down", "x": 30.0, "y": 20.0 },
//       { "event": "move", "x": 140.0, "y": 20.0 },
//       { "event": "up" },
//       { "event": "tool", "name": "bucket" },
//       { "event": "down", "x": 60.0, "y": 90.0 },
//       { "event": "up" } ] }
//
// Replay drives a `Project` through the same entry points as live input, so
// undo steps, tool switching and color rules behave identically.

use std::path::Path;

use emath::pos2;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::canvas::{Fill, ImageRef};
use crate::components::colors::ColorState;
use crate::components::tools::Tool;
use crate::project::Project;

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct GestureScript {
    /// Overrides applied to the project before the first event.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tri_side: Option<f32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub width: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub height: Option<u32>,
    pub events: Vec<ScriptEvent>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum ScriptEvent {
    Tool { name: String },
    /// Hex or `oklch(...)` color token.
    Color { value: String },
    Oklch { l: f64, c: f64, h: f64 },
    Image { id: Uuid },
    BrushSize { delta: i32 },
    PixelAnchor { enabled: bool },
    Down { x: f32, y: f32 },
    Move { x: f32, y: f32 },
    Up,
    Leave,
    Undo,
    Redo,
    Reset,
    Resize { width: u32, height: u32 },
    TriSide { value: f32 },
}

// ============================================================================
// Error type
// ============================================================================

#[derive(Debug, Clone)]
pub struct ScriptError {
    pub message: String,
    /// Source position, for JSON syntax errors.
    pub line: Option<usize>,
    pub column: Option<usize>,
    /// Zero-based index of the offending event.
    pub event: Option<usize>,
}

impl ScriptError {
    fn at_event(event: usize, message: String) -> Self {
        Self {
            message,
            line: None,
            column: None,
            event: Some(event),
        }
    }
}

impl std::fmt::Display for ScriptError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if let (Some(line), Some(col)) = (self.line, self.column) {
            write!(f, "Line {}, Col {}: {}", line, col, self.message)
        } else if let Some(event) = self.event {
            write!(f, "Event {}: {}", event, self.message)
        } else {
            write!(f, "{}", self.message)
        }
    }
}

impl std::error::Error for ScriptError {}

impl From<serde_json::Error> for ScriptError {
    fn from(e: serde_json::Error) -> Self {
        Self {
            message: e.to_string(),
            line: Some(e.line()),
            column: Some(e.column()),
            event: None,
        }
    }
}

impl From<std::io::Error> for ScriptError {
    fn from(e: std::io::Error) -> Self {
        Self {
            message: e.to_string(),
            line: None,
            column: None,
            event: None,
        }
    }
}

// ============================================================================
// Loading and replay
// ============================================================================

pub fn parse_script(source: &str) -> Result<GestureScript, ScriptError> {
    Ok(serde_json::from_str(source)?)
}

pub fn load_script(path: &Path) -> Result<GestureScript, ScriptError> {
    parse_script(&std::fs::read_to_string(path)?)
}

/// Summary of one replay.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ReplayReport {
    pub events: usize,
    /// Events that changed the grid.
    pub changes: usize,
    pub undo_steps: usize,
    pub redo_steps: usize,
}

/// Apply `script` to `project`. Stops at the first invalid event; events
/// before it stay applied.
pub fn replay(project: &mut Project, script: &GestureScript) -> Result<ReplayReport, ScriptError> {
    if script.width.is_some() || script.height.is_some() {
        let width = script.width.unwrap_or(project.geometry.width);
        let height = script.height.unwrap_or(project.geometry.height);
        project.resize(width, height);
    }
    if let Some(side) = script.tri_side {
        project.set_tri_side(side);
    }

    let mut report = ReplayReport::default();
    for (idx, event) in script.events.iter().enumerate() {
        if apply_event(project, idx, event)? {
            report.changes += 1;
        }
        report.events += 1;
    }
    // An unterminated drag still counts as one gesture.
    if project.is_drawing() {
        project.pointer_up();
    }
    report.undo_steps = project.history.undo_count();
    report.redo_steps = project.history.redo_count();
    log_info!(
        "Replayed {} events ({} changed the grid, {} undo steps)",
        report.events,
        report.changes,
        report.undo_steps
    );
    Ok(report)
}

fn apply_event(project: &mut Project, idx: usize, event: &ScriptEvent) -> Result<bool, ScriptError> {
    let changed = match event {
        ScriptEvent::Tool { name } => {
            let tool = Tool::from_name(name)
                .ok_or_else(|| ScriptError::at_event(idx, format!("unknown tool '{}'", name)))?;
            project.set_tool(tool);
            false
        }
        ScriptEvent::Color { value } => {
            if value.trim_start().starts_with('#') {
                if !project.set_color_hex(value) {
                    return Err(ScriptError::at_event(idx, format!("invalid color '{}'", value)));
                }
            } else {
                let color = ColorState::parse_css(value)
                    .ok_or_else(|| ScriptError::at_event(idx, format!("invalid color '{}'", value)))?;
                project.set_color_oklch(color);
            }
            false
        }
        ScriptEvent::Oklch { l, c, h } => {
            project.set_color_oklch(ColorState { l: *l, c: *c, h: *h });
            false
        }
        ScriptEvent::Image { id } => {
            project.set_fill(Fill::Image(ImageRef(*id)));
            false
        }
        ScriptEvent::BrushSize { delta } => {
            project.adjust_brush_size(*delta);
            false
        }
        ScriptEvent::PixelAnchor { enabled } => {
            project.tools.pixel_anchor = *enabled;
            false
        }
        ScriptEvent::Down { x, y } => project.pointer_down(pos2(*x, *y)),
        ScriptEvent::Move { x, y } => project.pointer_move(pos2(*x, *y)),
        ScriptEvent::Up => {
            project.pointer_up();
            false
        }
        ScriptEvent::Leave => {
            project.pointer_leave();
            false
        }
        ScriptEvent::Undo => project.undo().is_some(),
        ScriptEvent::Redo => project.redo().is_some(),
        ScriptEvent::Reset => project.reset(),
        ScriptEvent::Resize { width, height } => {
            project.resize(*width, *height);
            false
        }
        ScriptEvent::TriSide { value } => {
            project.set_tri_side(*value);
            false
        }
    };
    Ok(changed)
}
