//! On-disk layout: `<root>/user` holds saved patterns, `<root>/state` holds
//! generator sessions.

use std::io;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone)]
pub struct DataPaths {
    root: PathBuf,
}

impl DataPaths {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// `~/.local/share/regroove` (or platform equivalent), `./.regroove` as a last resort.
    pub fn default_root() -> PathBuf {
        dirs::data_dir()
            .map(|d| d.join("regroove"))
            .unwrap_or_else(|| PathBuf::from(".regroove"))
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn user_dir(&self) -> PathBuf {
        self.root.join("user")
    }

    pub fn state_dir(&self) -> PathBuf {
        self.root.join("state")
    }

    /// Create every directory in the layout that does not exist yet.
    pub fn ensure(&self) -> io::Result<()> {
        for dir in [self.user_dir(), self.state_dir()] {
            if !dir.exists() {
                log::info!("Creating directory: {}", dir.display());
                std::fs::create_dir_all(&dir)?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ensure_creates_layout() {
        let tmp = tempfile::tempdir().unwrap();
        let paths = DataPaths::new(tmp.path().join("data"));
        paths.ensure().unwrap();
        assert!(paths.user_dir().is_dir());
        assert!(paths.state_dir().is_dir());
        // idempotent
        paths.ensure().unwrap();
    }
}
