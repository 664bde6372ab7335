use std::path::{Path, PathBuf};

use crate::components::history::DEFAULT_HISTORY_SIZE;
use crate::components::tools::MAX_BRUSH_SIZE;
use crate::geometry::GridGeometry;
use crate::ops::paint::FLOOD_FILL_LIMIT;
use crate::ops::render::{LineDash, LineStyle, RenderOptions};

/// Document and display defaults that persist across sessions.
#[derive(Clone, Debug, PartialEq)]
pub struct GridSettings {
    /// Triangle edge length in pixels.
    pub tri_side: f32,
    pub width_triangles: u32,
    pub height_triangles: u32,
    /// CSS color or `transparent`.
    pub bg_color: String,
    pub brush_size: u8,
    pub pixel_anchor: bool,

    pub show_grid: bool,
    pub grid_color: String,
    pub grid_style: LineDash,
    pub grid_thickness: f32,
    pub grid_opacity: f32,

    pub show_sub_grid: bool,
    pub sub_grid_color: String,
    pub sub_grid_style: LineDash,
    pub sub_grid_thickness: f32,
    pub sub_grid_opacity: f32,

    /// Maximum number of undo steps
    pub max_undo_steps: usize,
    /// Dequeue cap for the bucket tool.
    pub flood_fill_limit: usize,
}

impl Default for GridSettings {
    fn default() -> Self {
        Self {
            tri_side: 25.0,
            width_triangles: 40,
            height_triangles: 30,
            bg_color: "transparent".to_string(),
            brush_size: 1,
            pixel_anchor: false,

            show_grid: true,
            grid_color: "#C5C4BD".to_string(),
            grid_style: LineDash::Solid,
            grid_thickness: 0.5,
            grid_opacity: 0.2,

            show_sub_grid: true,
            sub_grid_color: "#D2D1CA".to_string(),
            sub_grid_style: LineDash::Dashed,
            sub_grid_thickness: 0.5,
            sub_grid_opacity: 1.0,

            max_undo_steps: DEFAULT_HISTORY_SIZE,
            flood_fill_limit: FLOOD_FILL_LIMIT,
        }
    }
}

impl GridSettings {
    /// Path to the settings file.
    /// On Linux:   ~/.config/trixel/trixel_settings.cfg  (XDG_CONFIG_HOME respected)
    /// On Windows: %APPDATA%\Trixel\trixel_settings.cfg
    /// On macOS:   ~/Library/Application Support/Trixel/trixel_settings.cfg
    pub fn settings_path() -> Option<PathBuf> {
        #[cfg(target_os = "linux")]
        {
            let config_dir = std::env::var("XDG_CONFIG_HOME")
                .map(PathBuf::from)
                .or_else(|_| std::env::var("HOME").map(|home| PathBuf::from(home).join(".config")))
                .ok()?
                .join("trixel");
            return Some(config_dir.join("trixel_settings.cfg"));
        }
        #[cfg(target_os = "windows")]
        {
            let appdata = std::env::var("APPDATA")
                .or_else(|_| std::env::var("USERPROFILE"))
                .ok()?;
            return Some(PathBuf::from(appdata).join("Trixel").join("trixel_settings.cfg"));
        }
        #[cfg(target_os = "macos")]
        {
            let home = std::env::var("HOME").ok()?;
            return Some(
                PathBuf::from(home)
                    .join("Library")
                    .join("Application Support")
                    .join("Trixel")
                    .join("trixel_settings.cfg"),
            );
        }
        #[cfg(not(any(target_os = "linux", target_os = "windows", target_os = "macos")))]
        {
            std::env::current_exe()
                .ok()
                .and_then(|p| p.parent().map(|d| d.join("trixel_settings.cfg")))
        }
    }

    /// Load from the default location (defaults if missing or unreadable).
    pub fn load() -> Self {
        match Self::settings_path() {
            Some(path) => Self::load_from(&path),
            None => Self::default(),
        }
    }

    pub fn load_from(path: &Path) -> Self {
        match std::fs::read_to_string(path) {
            Ok(content) => Self::parse(&content),
            Err(_) => Self::default(),
        }
    }

    /// Parse `key=value` lines. Unknown keys and bad values keep the default.
    pub fn parse(content: &str) -> Self {
        let mut s = Self::default();
        for line in content.lines() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            let Some((key, val)) = line.split_once('=') else {
                log_warn!("Ignoring malformed settings line '{}'", line);
                continue;
            };
            let val = val.trim();
            match key.trim() {
                "tri_side" => parse_into(val, &mut s.tri_side),
                "width_triangles" => parse_into(val, &mut s.width_triangles),
                "height_triangles" => parse_into(val, &mut s.height_triangles),
                "bg_color" => s.bg_color = val.to_string(),
                "brush_size" => {
                    if let Ok(v) = val.parse::<u8>() {
                        s.brush_size = v.clamp(1, MAX_BRUSH_SIZE);
                    }
                }
                "pixel_anchor" => s.pixel_anchor = val == "true",
                "show_grid" => s.show_grid = val == "true",
                "grid_color" => s.grid_color = val.to_string(),
                "grid_style" => {
                    if let Some(d) = LineDash::from_name(val) {
                        s.grid_style = d;
                    }
                }
                "grid_thickness" => parse_into(val, &mut s.grid_thickness),
                "grid_opacity" => parse_into(val, &mut s.grid_opacity),
                "show_sub_grid" => s.show_sub_grid = val == "true",
                "sub_grid_color" => s.sub_grid_color = val.to_string(),
                "sub_grid_style" => {
                    if let Some(d) = LineDash::from_name(val) {
                        s.sub_grid_style = d;
                    }
                }
                "sub_grid_thickness" => parse_into(val, &mut s.sub_grid_thickness),
                "sub_grid_opacity" => parse_into(val, &mut s.sub_grid_opacity),
                "max_undo_steps" => {
                    if let Ok(v) = val.parse::<usize>() {
                        s.max_undo_steps = v.max(1);
                    }
                }
                "flood_fill_limit" => {
                    if let Ok(v) = val.parse::<usize>() {
                        s.flood_fill_limit = v.max(1);
                    }
                }
                other => {
                    log_warn!("Unknown settings key '{}'", other);
                }
            }
        }
        s
    }

    pub fn to_config_string(&self) -> String {
        format!(
            "tri_side={}\n\
             width_triangles={}\n\
             height_triangles={}\n\
             bg_color={}\n\
             brush_size={}\n\
             pixel_anchor={}\n\
             show_grid={}\n\
             grid_color={}\n\
             grid_style={}\n\
             grid_thickness={}\n\
             grid_opacity={}\n\
             show_sub_grid={}\n\
             sub_grid_color={}\n\
             sub_grid_style={}\n\
             sub_grid_thickness={}\n\
             sub_grid_opacity={}\n\
             max_undo_steps={}\n\
             flood_fill_limit={}\n",
            self.tri_side,
            self.width_triangles,
            self.height_triangles,
            self.bg_color,
            self.brush_size,
            self.pixel_anchor,
            self.show_grid,
            self.grid_color,
            self.grid_style.name(),
            self.grid_thickness,
            self.grid_opacity,
            self.show_sub_grid,
            self.sub_grid_color,
            self.sub_grid_style.name(),
            self.sub_grid_thickness,
            self.sub_grid_opacity,
            self.max_undo_steps,
            self.flood_fill_limit,
        )
    }

    /// Save to the default location.
    pub fn save(&self) {
        let Some(path) = Self::settings_path() else { return };
        if let Err(e) = self.save_to(&path) {
            log_err!("Failed to save settings to {}: {}", path.display(), e);
        }
    }

    pub fn save_to(&self, path: &Path) -> std::io::Result<()> {
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, self.to_config_string())
    }

    pub fn geometry(&self) -> GridGeometry {
        GridGeometry::new(self.tri_side, self.width_triangles, self.height_triangles)
    }

    pub fn render_options(&self) -> RenderOptions {
        let background = match self.bg_color.trim() {
            "" | "transparent" => None,
            color => Some(color.to_string()),
        };
        RenderOptions {
            background,
            show_grid: self.show_grid,
            grid: LineStyle {
                color: self.grid_color.clone(),
                width: self.grid_thickness,
                opacity: self.grid_opacity,
                dash: self.grid_style,
            },
            show_sub_grid: self.show_sub_grid,
            sub_grid: LineStyle {
                color: self.sub_grid_color.clone(),
                width: self.sub_grid_thickness,
                opacity: self.sub_grid_opacity,
                dash: self.sub_grid_style,
            },
        }
    }
}

fn parse_into<T: std::str::FromStr>(val: &str, slot: &mut T) {
    if let Ok(v) = val.parse() {
        *slot = v;
    }
}
