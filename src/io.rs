use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::canvas::GridState;
use crate::components::colors::parse_hex;
use crate::geometry::GridGeometry;

// ============================================================================
// GIMP PALETTE (.gpl)
// ============================================================================

const GPL_HEADER: &str = "GIMP Palette";
pub const DEFAULT_PALETTE_NAME: &str = "Trixel Palette";

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PaletteEntry {
    pub rgb: [u8; 3],
    pub name: String,
}

impl PaletteEntry {
    pub fn hex(&self) -> String {
        let [r, g, b] = self.rgb;
        format!("#{:02x}{:02x}{:02x}", r, g, b)
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Palette {
    pub name: String,
    pub columns: u32,
    pub entries: Vec<PaletteEntry>,
}

impl Default for Palette {
    fn default() -> Self {
        Self {
            name: DEFAULT_PALETTE_NAME.to_string(),
            columns: 4,
            entries: Vec::new(),
        }
    }
}

/// Error type for palette files
#[derive(Debug)]
pub enum PaletteError {
    Io(std::io::Error),
    /// A color line whose channels are not in 0..=255.
    InvalidEntry { line: usize, text: String },
    /// A hex color that could not be parsed.
    InvalidColor(String),
}

impl std::fmt::Display for PaletteError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PaletteError::Io(e) => write!(f, "I/O error: {}", e),
            PaletteError::InvalidEntry { line, text } => {
                write!(f, "Invalid palette entry on line {}: '{}'", line, text)
            }
            PaletteError::InvalidColor(c) => write!(f, "Invalid color '{}'", c),
        }
    }
}

impl std::error::Error for PaletteError {}

impl From<std::io::Error> for PaletteError {
    fn from(e: std::io::Error) -> Self {
        PaletteError::Io(e)
    }
}

impl Palette {
    /// Build a palette from hex color tokens; each entry is named by its hex.
    pub fn from_hex_colors<S: AsRef<str>>(name: &str, colors: &[S]) -> Result<Self, PaletteError> {
        let entries = colors
            .iter()
            .map(|c| {
                let c = c.as_ref();
                let rgb = parse_hex(c).ok_or_else(|| PaletteError::InvalidColor(c.to_string()))?;
                let entry = PaletteEntry { rgb: rgb.to_u8(), name: String::new() };
                Ok(PaletteEntry { name: entry.hex(), ..entry })
            })
            .collect::<Result<Vec<_>, PaletteError>>()?;
        Ok(Self {
            name: name.to_string(),
            entries,
            ..Self::default()
        })
    }

    /// Parse GPL text. The `GIMP Palette` header is optional, `#` lines are
    /// comments, `Key: value` lines are metadata (`Name`, `Columns`), and
    /// every `R G B [name]` line is a color. Lines whose first three fields
    /// are not numbers are skipped.
    pub fn parse_gpl(content: &str) -> Result<Self, PaletteError> {
        let mut palette = Self::default();
        for (idx, line) in content.lines().enumerate() {
            let trimmed = line.trim();
            if trimmed.is_empty() || trimmed.starts_with('#') || trimmed == GPL_HEADER {
                continue;
            }

            let mut parts = trimmed.split_whitespace();
            let channels: Vec<i64> = parts
                .by_ref()
                .take(3)
                .map_while(|p| p.parse::<i64>().ok())
                .collect();
            if channels.len() == 3 {
                let rgb = match channels.as_slice() {
                    &[r, g, b] if [r, g, b].iter().all(|v| (0..=255).contains(v)) => {
                        [r as u8, g as u8, b as u8]
                    }
                    _ => {
                        return Err(PaletteError::InvalidEntry {
                            line: idx + 1,
                            text: trimmed.to_string(),
                        });
                    }
                };
                let name = parts.collect::<Vec<_>>().join(" ");
                palette.entries.push(PaletteEntry { rgb, name });
                continue;
            }

            if let Some((key, value)) = trimmed.split_once(':') {
                match key.trim() {
                    "Name" => palette.name = value.trim().to_string(),
                    "Columns" => {
                        if let Ok(n) = value.trim().parse() {
                            palette.columns = n;
                        }
                    }
                    _ => {}
                }
            }
        }
        Ok(palette)
    }

    pub fn to_gpl(&self) -> String {
        let mut content = format!("{}\nName: {}\nColumns: {}\n#\n", GPL_HEADER, self.name, self.columns);
        for entry in &self.entries {
            let [r, g, b] = entry.rgb;
            let name = if entry.name.is_empty() { entry.hex() } else { entry.name.clone() };
            content.push_str(&format!("{:>3} {:>3} {:>3} {}\n", r, g, b, name));
        }
        content
    }

    /// Lower-case `#rrggbb` tokens, in file order.
    pub fn hex_colors(&self) -> Vec<String> {
        self.entries.iter().map(PaletteEntry::hex).collect()
    }

    pub fn load(path: &Path) -> Result<Self, PaletteError> {
        let content = std::fs::read_to_string(path)?;
        Self::parse_gpl(&content)
    }

    pub fn save(&self, path: &Path) -> Result<(), PaletteError> {
        std::fs::write(path, self.to_gpl())?;
        Ok(())
    }
}

// ============================================================================
// TEXT SNAPSHOTS
// ============================================================================

/// Serialize the sparse cell map as a JSON object keyed by `"row,col"`.
pub fn snapshot_to_json(grid: &GridState) -> Result<String, serde_json::Error> {
    serde_json::to_string(grid)
}

pub fn snapshot_to_json_pretty(grid: &GridState) -> Result<String, serde_json::Error> {
    serde_json::to_string_pretty(grid)
}

pub fn snapshot_from_json(text: &str) -> Result<GridState, serde_json::Error> {
    serde_json::from_str(text)
}

// ============================================================================
// TRX PROJECT FILE FORMAT
// ============================================================================

const TRX_MAGIC: &str = "TRX1";

/// Upper bound on stored cells, far beyond any real 1000×1000 document.
const MAX_PROJECT_CELLS: usize = 4_000_000;

/// Serializable project file structure
#[derive(Serialize, Deserialize)]
struct ProjectFile {
    magic: String,
    geometry: GridGeometry,
    cells: GridState,
}

/// Error type for .trx file operations
#[derive(Debug)]
pub enum ProjectFileError {
    Io(std::io::Error),
    Serialize(String),
    InvalidFormat(String),
}

impl std::fmt::Display for ProjectFileError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ProjectFileError::Io(e) => write!(f, "I/O error: {}", e),
            ProjectFileError::Serialize(e) => write!(f, "Serialization error: {}", e),
            ProjectFileError::InvalidFormat(e) => write!(f, "Invalid format: {}", e),
        }
    }
}

impl std::error::Error for ProjectFileError {}

impl From<std::io::Error> for ProjectFileError {
    fn from(e: std::io::Error) -> Self {
        ProjectFileError::Io(e)
    }
}

impl From<Box<bincode::ErrorKind>> for ProjectFileError {
    fn from(e: Box<bincode::ErrorKind>) -> Self {
        ProjectFileError::Serialize(e.to_string())
    }
}

/// Write geometry and cells as a .trx project file.
pub fn save_project(geometry: &GridGeometry, grid: &GridState, path: &Path) -> Result<(), ProjectFileError> {
    let file = File::create(path)?;
    let writer = BufWriter::new(file);
    let project = ProjectFileRef {
        magic: TRX_MAGIC,
        geometry,
        cells: grid,
    };
    bincode::serialize_into(writer, &project)?;
    Ok(())
}

/// Borrowing twin of [`ProjectFile`] so saving does not clone the grid.
#[derive(Serialize)]
struct ProjectFileRef<'a> {
    magic: &'a str,
    geometry: &'a GridGeometry,
    cells: &'a GridState,
}

/// Load a .trx project file.
pub fn load_project(path: &Path) -> Result<(GridGeometry, GridState), ProjectFileError> {
    let raw = std::fs::read(path)?;
    if raw.len() < 12 {
        return Err(ProjectFileError::InvalidFormat("File too small".into()));
    }

    // bincode writes a String as an 8-byte length prefix followed by UTF-8,
    // so bytes 8..12 hold the magic.
    let magic = std::str::from_utf8(&raw[8..12]).unwrap_or("");
    if magic != TRX_MAGIC {
        return Err(ProjectFileError::InvalidFormat(format!("Unknown magic '{}'", magic)));
    }

    let project: ProjectFile = bincode::deserialize_from(BufReader::new(raw.as_slice()))?;
    if project.cells.len() > MAX_PROJECT_CELLS {
        return Err(ProjectFileError::InvalidFormat(format!(
            "Too many cells ({})",
            project.cells.len()
        )));
    }
    let g = project.geometry;
    Ok((GridGeometry::new(g.tri_side, g.width, g.height), project.cells))
}
