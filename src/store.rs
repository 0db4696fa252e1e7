use std::path::{Path, PathBuf};

use chrono::Local;
use thiserror::Error;
use tracing::{debug, warn};

use crate::backup::{self, Backup};
use crate::cache::{CacheFile, FALLBACK_FILE};
use crate::db::{DB_FILE, Database, default_data_dir, today_string};
use crate::models::{Candidature, Goals};

#[derive(Debug, Error)]
pub enum StoreError {
    /// The backing store cannot be opened or read. Triggers the fallback.
    #[error("storage unavailable: {0}")]
    StorageUnavailable(String),
    /// A specific mutating call was rejected.
    #[error("write failed: {0}")]
    WriteFailed(String),
    #[error("no candidature with id {0}")]
    NotFound(i64),
    #[error("invalid backup format: {0}")]
    InvalidBackupFormat(String),
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Push notification for the view layer: invoked with the full reloaded
/// state after every successful mutation. Replace, don't patch.
pub type ChangeListener = Box<dyn Fn(&[Candidature], &Goals)>;

enum Backend {
    Primary(Database),
    Fallback(FallbackState),
}

/// Degraded backend: the in-memory record list, persisted wholesale to the
/// synchronous mirror after every mutation.
struct FallbackState {
    records: Vec<Candidature>,
    goals: Goals,
}

/// The application's record store. Opens the SQLite database when possible
/// and degrades to the JSON mirror when it cannot; the degrade is one-way
/// for the session.
pub struct Store {
    backend: Backend,
    cache: CacheFile,
    on_change: Option<ChangeListener>,
}

impl Store {
    /// Never fails: an unopenable primary store puts the session into
    /// fallback mode with the last-known mirrored state.
    pub fn open(dir: &Path) -> Self {
        let cache = CacheFile::new(dir.join(FALLBACK_FILE));
        let primary = Database::open_at(dir.join(DB_FILE)).and_then(|db| {
            db.init()?;
            Ok(db)
        });

        match primary {
            Ok(db) => {
                debug!(path = %db.path().display(), "primary store ready");
                Self {
                    backend: Backend::Primary(db),
                    cache,
                    on_change: None,
                }
            }
            Err(err) => {
                warn!(error = %err, "cannot open primary store, starting in fallback mode");
                let (records, goals) = cache.load();
                Self {
                    backend: Backend::Fallback(FallbackState { records, goals }),
                    cache,
                    on_change: None,
                }
            }
        }
    }

    pub fn is_degraded(&self) -> bool {
        matches!(self.backend, Backend::Fallback(_))
    }

    pub fn set_on_change(&mut self, listener: ChangeListener) {
        self.on_change = Some(listener);
    }

    /// Where the active backend keeps its data, for user-facing messages.
    pub fn location(&self) -> PathBuf {
        match &self.backend {
            Backend::Primary(db) => db.path().clone(),
            Backend::Fallback(_) => self.cache.path().clone(),
        }
    }

    // --- Candidature operations ---

    pub fn list_all(&mut self) -> StoreResult<Vec<Candidature>> {
        self.list_filtered(None, None)
    }

    pub fn list_filtered(
        &mut self,
        status: Option<&str>,
        company: Option<&str>,
    ) -> StoreResult<Vec<Candidature>> {
        let result = match &self.backend {
            Backend::Primary(db) => db.list_filtered(status, company),
            Backend::Fallback(state) => {
                return Ok(filter_records(&state.records, status, company));
            }
        };

        match result {
            Ok(records) => Ok(records),
            Err(err @ StoreError::StorageUnavailable(_)) => {
                self.degrade(&err);
                match &self.backend {
                    Backend::Fallback(state) => {
                        Ok(filter_records(&state.records, status, company))
                    }
                    Backend::Primary(_) => Err(err),
                }
            }
            Err(err) => Err(err),
        }
    }

    pub fn get(&mut self, id: i64) -> StoreResult<Option<Candidature>> {
        let result = match &self.backend {
            Backend::Primary(db) => db.get(id),
            Backend::Fallback(state) => {
                return Ok(state.records.iter().find(|c| c.id == id).cloned());
            }
        };

        match result {
            Ok(found) => Ok(found),
            Err(err @ StoreError::StorageUnavailable(_)) => {
                self.degrade(&err);
                match &self.backend {
                    Backend::Fallback(state) => {
                        Ok(state.records.iter().find(|c| c.id == id).cloned())
                    }
                    Backend::Primary(_) => Err(err),
                }
            }
            Err(err) => Err(err),
        }
    }

    /// Persists a new candidature and returns the assigned id.
    pub fn add(&mut self, draft: Candidature) -> StoreResult<i64> {
        let id = match &mut self.backend {
            Backend::Primary(db) => db.add(draft)?,
            Backend::Fallback(state) => {
                let mut c = draft;
                if c.date.is_empty() {
                    c.date = today_string();
                }
                // Millisecond timestamp id: uniqueness is only probabilistic,
                // two adds within the same millisecond can collide.
                c.id = Local::now().timestamp_millis();
                let id = c.id;
                state.records.push(c);
                self.cache.save(&state.records, &state.goals)?;
                id
            }
        };
        self.notify_change();
        Ok(id)
    }

    /// Wholesale replace keyed by `record.id`.
    pub fn update(&mut self, record: &Candidature) -> StoreResult<()> {
        match &mut self.backend {
            Backend::Primary(db) => db.update(record)?,
            Backend::Fallback(state) => {
                let pos = state
                    .records
                    .iter()
                    .position(|c| c.id == record.id)
                    .ok_or(StoreError::NotFound(record.id))?;
                state.records[pos] = record.clone();
                self.cache.save(&state.records, &state.goals)?;
            }
        }
        self.notify_change();
        Ok(())
    }

    /// Idempotent delete.
    pub fn remove(&mut self, id: i64) -> StoreResult<()> {
        match &mut self.backend {
            Backend::Primary(db) => db.remove(id)?,
            Backend::Fallback(state) => {
                state.records.retain(|c| c.id != id);
                self.cache.save(&state.records, &state.goals)?;
            }
        }
        self.notify_change();
        Ok(())
    }

    // --- Goal operations ---

    pub fn get_goals(&mut self) -> StoreResult<Goals> {
        let result = match &self.backend {
            Backend::Primary(db) => db.get_goals(),
            Backend::Fallback(state) => return Ok(state.goals.clone()),
        };

        match result {
            Ok(goals) => Ok(goals),
            Err(err @ StoreError::StorageUnavailable(_)) => {
                self.degrade(&err);
                match &self.backend {
                    Backend::Fallback(state) => Ok(state.goals.clone()),
                    Backend::Primary(_) => Err(err),
                }
            }
            Err(err) => Err(err),
        }
    }

    pub fn save_goals(&mut self, goals: &Goals) -> StoreResult<()> {
        let clean = goals.sanitized();
        match &mut self.backend {
            Backend::Primary(db) => {
                db.save_goals(&clean)?;
                // Mirrored into the synchronous cache as well; the database
                // stays authoritative.
                if let Err(err) = self.cache.save_goals(&clean) {
                    debug!(error = %err, "goal mirror write skipped");
                }
            }
            Backend::Fallback(state) => {
                state.goals = clean;
                self.cache.save(&state.records, &state.goals)?;
            }
        }
        self.notify_change();
        Ok(())
    }

    // --- Backup operations ---

    pub fn export_backup(&mut self) -> StoreResult<Backup> {
        let records = self.list_all()?;
        let goals = self.get_goals()?;
        Ok(backup::export_document(records, goals, Local::now()))
    }

    /// Replaces the entire store content with the document's. Ids are
    /// imported as-is, without remapping.
    pub fn import_backup(&mut self, doc: Backup) -> StoreResult<usize> {
        let Backup { records, goals, .. } = doc;
        let goals = goals.sanitized();
        let count = records.len();

        match &mut self.backend {
            Backend::Primary(db) => db.replace_all(&records, &goals)?,
            Backend::Fallback(state) => {
                state.records = records;
                state.goals = goals;
                self.cache.save(&state.records, &state.goals)?;
            }
        }
        self.notify_change();
        Ok(count)
    }

    // --- Internals ---

    /// One-way switchover to the mirror-backed fallback. The session does
    /// not attempt to re-acquire the primary store afterwards.
    fn degrade(&mut self, err: &StoreError) {
        warn!(error = %err, "primary store failed, switching to fallback storage");
        let (records, goals) = self.cache.load();
        self.backend = Backend::Fallback(FallbackState { records, goals });
    }

    fn notify_change(&mut self) {
        if self.on_change.is_none() {
            return;
        }
        // Reload wholesale so listeners always see the store's own view.
        let records = match self.list_all() {
            Ok(records) => records,
            Err(_) => return,
        };
        let goals = match self.get_goals() {
            Ok(goals) => goals,
            Err(_) => return,
        };
        if let Some(listener) = &self.on_change {
            listener(&records, &goals);
        }
    }
}

fn filter_records(
    records: &[Candidature],
    status: Option<&str>,
    company: Option<&str>,
) -> Vec<Candidature> {
    records
        .iter()
        .filter(|c| status.is_none_or(|s| c.status == s))
        .filter(|c| company.is_none_or(|name| c.company.eq_ignore_ascii_case(name)))
        .cloned()
        .collect()
}

pub fn resolve_data_dir(cli_override: Option<PathBuf>) -> PathBuf {
    cli_override.unwrap_or_else(default_data_dir)
}
