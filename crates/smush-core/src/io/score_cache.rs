//! On-disk cache of activity scores so the scoring pass can be skipped on reruns.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::{Result, SmushError};

/// Identity of a scored input: path plus byte length.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceKey {
    pub path: PathBuf,
    pub byte_length: u64,
}

impl SourceKey {
    pub fn of(path: &Path) -> Result<Self> {
        let byte_length = std::fs::metadata(path)?.len();
        Ok(Self {
            path: path.to_path_buf(),
            byte_length,
        })
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CacheEntry {
    pub label: String,
    pub source: SourceKey,
    pub scores: Vec<f64>,
}

/// Score arrays keyed by a label (e.g. the proxy filter) and the source identity.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ScoreCache {
    #[serde(default, rename = "entry")]
    entries: Vec<CacheEntry>,
}

impl ScoreCache {
    /// Load a cache file. A missing file is an empty cache.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let contents = std::fs::read_to_string(path)?;
        toml::from_str(&contents)
            .map_err(|e| SmushError::Cache(format!("{}: {e}", path.display())))
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        let contents =
            toml::to_string(self).map_err(|e| SmushError::Cache(format!("serialize: {e}")))?;
        std::fs::write(path, contents)?;
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Scores for `label` if they were computed for the same source file.
    pub fn get(&self, label: &str, source: &SourceKey) -> Option<&[f64]> {
        let entry = self.entries.iter().find(|e| e.label == label && e.source.path == source.path)?;
        if entry.source != *source {
            warn!(label, path = %source.path.display(), "Cached scores are stale, recomputing");
            return None;
        }
        debug!(label, scores = entry.scores.len(), "Score cache hit");
        Some(&entry.scores)
    }

    /// Store scores, replacing any entry with the same label and path.
    pub fn insert(&mut self, label: &str, source: SourceKey, scores: Vec<f64>) {
        self.entries
            .retain(|e| !(e.label == label && e.source.path == source.path));
        self.entries.push(CacheEntry {
            label: label.to_string(),
            source,
            scores,
        });
    }
}
