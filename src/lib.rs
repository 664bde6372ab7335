//! Triangular-grid pixel art: geometry, a quad-subdivided cell store, painting
//! tools with bounded undo, OKLCH colors and GIMP palettes.

#[macro_use]
pub mod logger;

pub mod canvas;
pub mod cli;
pub mod components;
pub mod geometry;
pub mod io;
pub mod ops;
pub mod project;
pub mod settings;

/// Fresh directory under the system temp dir for file round-trip tests,
/// removed again when dropped.
#[cfg(test)]
pub(crate) struct ScratchDir(std::path::PathBuf);

#[cfg(test)]
impl std::ops::Deref for ScratchDir {
    type Target = std::path::Path;

    fn deref(&self) -> &std::path::Path {
        &self.0
    }
}

#[cfg(test)]
impl Drop for ScratchDir {
    fn drop(&mut self) {
        let _ = std::fs::remove_dir_all(&self.0);
    }
}

#[cfg(test)]
pub(crate) fn scratch_dir() -> ScratchDir {
    let dir = std::env::temp_dir().join(format!("trixel-test-{}", uuid::Uuid::new_v4()));
    std::fs::create_dir_all(&dir).unwrap();
    ScratchDir(dir)
}
