//! Generator session files: configuration, source seed and population as one
//! JSON document.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use regroove_types::{GeneratorConfig, PatternTriple};

use super::population::CandidatePopulation;
use crate::archive::{normalize_name, ArchiveError};

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("session io: {0}")]
    Io(#[from] std::io::Error),
    #[error("session format: {0}")]
    Json(#[from] serde_json::Error),
    #[error("invalid session name {0:?}")]
    InvalidName(String),
    #[error("no state directory configured")]
    NoStateDir,
    #[error("session pattern shape {found} does not match {expected}")]
    ShapeMismatch {
        found: regroove_types::Shape,
        expected: regroove_types::Shape,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeneratorSession {
    pub config: GeneratorConfig,
    pub source: PatternTriple,
    pub population: CandidatePopulation,
}

impl GeneratorSession {
    fn validate(self) -> Result<Self, SessionError> {
        match self.population.shape() {
            Some(shape) if shape != self.source.shape() => Err(SessionError::ShapeMismatch {
                found: self.source.shape(),
                expected: shape,
            }),
            _ => Ok(self),
        }
    }
}

/// `<dir>/<name>.json`
pub fn session_path(dir: &Path, name: &str) -> Result<PathBuf, SessionError> {
    let name = normalize_name(name).map_err(|e| match e {
        ArchiveError::InvalidName(n) => SessionError::InvalidName(n),
        other => SessionError::InvalidName(other.to_string()),
    })?;
    Ok(dir.join(format!("{}.json", name)))
}

pub fn write_session(path: &Path, session: &GeneratorSession) -> Result<(), SessionError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let json = serde_json::to_string(session)?;
    std::fs::write(path, json)?;
    Ok(())
}

pub fn read_session(path: &Path) -> Result<GeneratorSession, SessionError> {
    let json = std::fs::read_to_string(path)?;
    let session: GeneratorSession = serde_json::from_str(&json)?;
    session.validate()
}

#[cfg(test)]
mod tests {
    use super::*;
    use regroove_types::Shape;

    fn session() -> GeneratorSession {
        GeneratorSession {
            config: GeneratorConfig::default(),
            source: PatternTriple::default(),
            population: CandidatePopulation::new(1, 2, vec![PatternTriple::default(); 2]).unwrap(),
        }
    }

    #[test]
    fn write_then_read() {
        let dir = tempfile::tempdir().unwrap();
        let path = session_path(dir.path(), "jam").unwrap();
        assert_eq!(path, dir.path().join("jam.json"));
        write_session(&path, &session()).unwrap();
        assert_eq!(read_session(&path).unwrap(), session());
    }

    #[test]
    fn bad_names_are_rejected() {
        let dir = tempfile::tempdir().unwrap();
        assert!(matches!(session_path(dir.path(), "../x"), Err(SessionError::InvalidName(_))));
        assert!(matches!(session_path(dir.path(), ""), Err(SessionError::InvalidName(_))));
    }

    #[test]
    fn mismatched_source_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.json");
        let mut bad = session();
        bad.source = PatternTriple::empty(Shape::new(8, 9));
        write_session(&path, &bad).unwrap();
        assert!(matches!(read_session(&path), Err(SessionError::ShapeMismatch { .. })));
    }

    #[test]
    fn missing_file_is_io_error() {
        let dir = tempfile::tempdir().unwrap();
        assert!(matches!(
            read_session(&dir.path().join("nope.json")),
            Err(SessionError::Io(_))
        ));
    }
}
