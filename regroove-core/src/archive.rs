//! Named pattern storage.

use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use regroove_types::PatternTriple;

/// Name the last committed pattern is stored under.
pub const ORIGIN: &str = "origin";

const INDEX_FILE: &str = "index.json";

#[derive(Debug, Error)]
pub enum ArchiveError {
    #[error("archive io: {0}")]
    Io(#[from] std::io::Error),
    #[error("archive format: {0}")]
    Json(#[from] serde_json::Error),
    #[error("invalid pattern name {0:?}")]
    InvalidName(String),
    #[error("no pattern named {0:?}")]
    NotFound(String),
}

/// Persistent store of named pattern triples.
pub trait PatternArchive: Send {
    fn save(&mut self, name: &str, triple: &PatternTriple) -> Result<(), ArchiveError>;
    fn load(&self, name: &str) -> Result<PatternTriple, ArchiveError>;
    fn contains(&self, name: &str) -> bool;
}

/// Strip a trailing `.json` and reject names that would escape the archive
/// directory.
pub fn normalize_name(name: &str) -> Result<String, ArchiveError> {
    let trimmed = name.trim();
    let stem = trimmed.strip_suffix(".json").unwrap_or(trimmed);
    if stem.is_empty() || stem.contains(['/', '\\']) || stem == "." || stem == ".." {
        return Err(ArchiveError::InvalidName(name.to_string()));
    }
    Ok(stem.to_string())
}

/// One entry of the archive index.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexEntry {
    pub file: String,
    /// Seconds since the epoch of the last save.
    pub saved_at: u64,
}

/// `<dir>/<name>.json` per pattern plus `<dir>/index.json` listing them.
pub struct JsonArchive {
    dir: PathBuf,
    index: BTreeMap<String, IndexEntry>,
}

impl JsonArchive {
    /// Open (or start) an archive in `dir`. A missing or unreadable index is
    /// rebuilt from the pattern files present.
    pub fn open(dir: impl Into<PathBuf>) -> Result<Self, ArchiveError> {
        let dir = dir.into();
        std::fs::create_dir_all(&dir)?;
        let index = match std::fs::read_to_string(dir.join(INDEX_FILE)) {
            Ok(contents) => match serde_json::from_str(&contents) {
                Ok(index) => index,
                Err(e) => {
                    log::warn!(target: "archive", "rebuilding malformed index: {}", e);
                    scan_dir(&dir)?
                }
            },
            Err(_) => scan_dir(&dir)?,
        };
        Ok(Self { dir, index })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.index.keys().map(|k| k.as_str())
    }

    fn path_for(&self, name: &str) -> PathBuf {
        self.dir.join(format!("{}.json", name))
    }

    fn write_index(&self) -> Result<(), ArchiveError> {
        let json = serde_json::to_string_pretty(&self.index)?;
        std::fs::write(self.dir.join(INDEX_FILE), json)?;
        Ok(())
    }
}

fn scan_dir(dir: &Path) -> Result<BTreeMap<String, IndexEntry>, ArchiveError> {
    let mut index = BTreeMap::new();
    for entry in std::fs::read_dir(dir)? {
        let path = entry?.path();
        let Some(file) = path.file_name().and_then(|f| f.to_str()) else {
            continue;
        };
        if file == INDEX_FILE {
            continue;
        }
        if let Some(stem) = file.strip_suffix(".json") {
            index.insert(
                stem.to_string(),
                IndexEntry {
                    file: file.to_string(),
                    saved_at: 0,
                },
            );
        }
    }
    Ok(index)
}

impl PatternArchive for JsonArchive {
    fn save(&mut self, name: &str, triple: &PatternTriple) -> Result<(), ArchiveError> {
        let name = normalize_name(name)?;
        let path = self.path_for(&name);
        std::fs::write(&path, serde_json::to_string(triple)?)?;
        let saved_at = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or(0);
        self.index.insert(
            name.clone(),
            IndexEntry {
                file: format!("{}.json", name),
                saved_at,
            },
        );
        self.write_index()?;
        log::debug!(target: "archive", "saved pattern {} to {}", name, path.display());
        Ok(())
    }

    fn load(&self, name: &str) -> Result<PatternTriple, ArchiveError> {
        let name = normalize_name(name)?;
        let path = self.path_for(&name);
        let contents = match std::fs::read_to_string(&path) {
            Ok(c) => c,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(ArchiveError::NotFound(name))
            }
            Err(e) => return Err(e.into()),
        };
        Ok(serde_json::from_str(&contents)?)
    }

    fn contains(&self, name: &str) -> bool {
        normalize_name(name)
            .map(|n| self.index.contains_key(&n) || self.path_for(&n).exists())
            .unwrap_or(false)
    }
}

/// In-memory archive, used when nothing should touch the disk.
#[derive(Default)]
pub struct MemoryArchive {
    patterns: HashMap<String, PatternTriple>,
}

impl MemoryArchive {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.patterns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.patterns.is_empty()
    }
}

impl PatternArchive for MemoryArchive {
    fn save(&mut self, name: &str, triple: &PatternTriple) -> Result<(), ArchiveError> {
        self.patterns.insert(normalize_name(name)?, triple.clone());
        Ok(())
    }

    fn load(&self, name: &str) -> Result<PatternTriple, ArchiveError> {
        let name = normalize_name(name)?;
        self.patterns
            .get(&name)
            .cloned()
            .ok_or(ArchiveError::NotFound(name))
    }

    fn contains(&self, name: &str) -> bool {
        normalize_name(name)
            .map(|n| self.patterns.contains_key(&n))
            .unwrap_or(false)
    }
}
