use std::path::PathBuf;

use tracing::warn;

use crate::models::{Candidature, Goals};
use crate::store::{StoreError, StoreResult};

pub const FALLBACK_FILE: &str = "fallback.json";

// Fixed keys of the mirror document. The record list and the goal singleton
// are stored flattened under these two entries.
const KEY_RECORDS: &str = "jobtrack_candidatures";
const KEY_GOALS: &str = "jobtrack_goals";

/// Synchronous key-value mirror of the store, one flat JSON file. Read and
/// rewritten wholesale; last-known state for the fallback path.
pub struct CacheFile {
    path: PathBuf,
}

impl CacheFile {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    pub fn path(&self) -> &PathBuf {
        &self.path
    }

    /// Last-known state, or empty state when the mirror is missing or
    /// unreadable.
    pub fn load(&self) -> (Vec<Candidature>, Goals) {
        let raw = match std::fs::read_to_string(&self.path) {
            Ok(raw) => raw,
            Err(_) => return (Vec::new(), Goals::default()),
        };

        let doc: serde_json::Value = match serde_json::from_str(&raw) {
            Ok(doc) => doc,
            Err(e) => {
                warn!(path = %self.path.display(), error = %e, "unreadable fallback cache, starting empty");
                return (Vec::new(), Goals::default());
            }
        };

        let records = doc
            .get(KEY_RECORDS)
            .cloned()
            .and_then(|v| serde_json::from_value(v).ok())
            .unwrap_or_default();

        let goals = doc
            .get(KEY_GOALS)
            .cloned()
            .and_then(|v| serde_json::from_value::<Goals>(v).ok())
            .map(|g| g.sanitized())
            .unwrap_or_default();

        (records, goals)
    }

    pub fn save(&self, records: &[Candidature], goals: &Goals) -> StoreResult<()> {
        let doc = serde_json::json!({
            KEY_RECORDS: records,
            KEY_GOALS: goals,
        });
        self.write_document(&doc)
    }

    /// Mirrors only the goal singleton, keeping whatever record list the
    /// cache already holds. Used when the primary store is authoritative.
    pub fn save_goals(&self, goals: &Goals) -> StoreResult<()> {
        let (records, _) = self.load();
        self.save(&records, goals)
    }

    fn write_document(&self, doc: &serde_json::Value) -> StoreResult<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| StoreError::WriteFailed(e.to_string()))?;
        }
        let raw = serde_json::to_string_pretty(doc)
            .map_err(|e| StoreError::WriteFailed(e.to_string()))?;
        std::fs::write(&self.path, raw).map_err(|e| StoreError::WriteFailed(e.to_string()))
    }
}
