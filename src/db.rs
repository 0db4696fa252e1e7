use rusqlite::{Connection, params};
use std::path::PathBuf;

use crate::models::{Candidature, Goals};
use crate::store::{StoreError, StoreResult};

pub const DB_FILE: &str = "jobtrack.db";

const GOALS_KEY: &str = "goals";

/// Primary store: a SQLite database holding the candidature collection and
/// the goal singleton. Authoritative when it can be opened.
pub struct Database {
    conn: Connection,
    path: PathBuf,
}

impl Database {
    pub fn open_at(path: PathBuf) -> StoreResult<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| StoreError::StorageUnavailable(e.to_string()))?;
        }
        let conn = Connection::open(&path)
            .map_err(|e| StoreError::StorageUnavailable(e.to_string()))?;
        Ok(Self { conn, path })
    }

    pub fn path(&self) -> &PathBuf {
        &self.path
    }

    /// Creates the schema when missing. The date/company/status indexes back
    /// the filtered listings; record counts are expected to stay small.
    pub fn init(&self) -> StoreResult<()> {
        self.conn
            .execute_batch(
                r#"
            CREATE TABLE IF NOT EXISTS candidatures (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                date TEXT NOT NULL,
                company TEXT NOT NULL,
                role TEXT NOT NULL,
                link TEXT,
                platform TEXT,
                status TEXT NOT NULL DEFAULT 'Submitted',
                feedback TEXT NOT NULL DEFAULT 'Pending',
                notes TEXT
            );

            CREATE INDEX IF NOT EXISTS idx_candidatures_date ON candidatures(date);
            CREATE INDEX IF NOT EXISTS idx_candidatures_company ON candidatures(company);
            CREATE INDEX IF NOT EXISTS idx_candidatures_status ON candidatures(status);

            CREATE TABLE IF NOT EXISTS goals (
                id TEXT PRIMARY KEY,
                daily_target INTEGER NOT NULL,
                monthly_target INTEGER NOT NULL
            );
            "#,
            )
            .map_err(|e| StoreError::StorageUnavailable(e.to_string()))?;
        Ok(())
    }

    // --- Candidature operations ---

    pub fn list_all(&self) -> StoreResult<Vec<Candidature>> {
        self.list_filtered(None, None)
    }

    pub fn list_filtered(
        &self,
        status: Option<&str>,
        company: Option<&str>,
    ) -> StoreResult<Vec<Candidature>> {
        let mut sql = String::from(
            "SELECT id, date, company, role, link, platform, status, feedback, notes
             FROM candidatures WHERE 1=1",
        );

        let mut filters: Vec<String> = vec![];

        if let Some(s) = status {
            sql.push_str(&format!(" AND status = ?{}", filters.len() + 1));
            filters.push(s.to_string());
        }

        if let Some(c) = company {
            sql.push_str(&format!(" AND LOWER(company) = LOWER(?{})", filters.len() + 1));
            filters.push(c.to_string());
        }

        let mut stmt = self
            .conn
            .prepare(&sql)
            .map_err(|e| StoreError::StorageUnavailable(e.to_string()))?;

        let rows = match filters.len() {
            0 => stmt.query_map([], Self::row_to_candidature),
            1 => stmt.query_map([&filters[0]], Self::row_to_candidature),
            _ => stmt.query_map([&filters[0], &filters[1]], Self::row_to_candidature),
        }
        .map_err(|e| StoreError::StorageUnavailable(e.to_string()))?;

        rows.collect::<Result<Vec<_>, _>>()
            .map_err(|e| StoreError::StorageUnavailable(e.to_string()))
    }

    pub fn get(&self, id: i64) -> StoreResult<Option<Candidature>> {
        let result = self.conn.query_row(
            "SELECT id, date, company, role, link, platform, status, feedback, notes
             FROM candidatures WHERE id = ?1",
            [id],
            Self::row_to_candidature,
        );
        match result {
            Ok(c) => Ok(Some(c)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(StoreError::StorageUnavailable(e.to_string())),
        }
    }

    /// Inserts a new candidature and returns the store-assigned id. An empty
    /// date is defaulted to today before the write.
    pub fn add(&self, draft: Candidature) -> StoreResult<i64> {
        let mut c = draft;
        if c.date.is_empty() {
            c.date = today_string();
        }

        self.conn
            .execute(
                "INSERT INTO candidatures (date, company, role, link, platform, status, feedback, notes)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
                params![
                    c.date, c.company, c.role, c.link, c.platform, c.status, c.feedback, c.notes
                ],
            )
            .map_err(|e| StoreError::WriteFailed(e.to_string()))?;

        Ok(self.conn.last_insert_rowid())
    }

    /// Wholesale replace keyed by id. Referencing a missing id is `NotFound`
    /// and leaves the store unchanged.
    pub fn update(&self, c: &Candidature) -> StoreResult<()> {
        let affected = self
            .conn
            .execute(
                "UPDATE candidatures
                 SET date = ?1, company = ?2, role = ?3, link = ?4, platform = ?5,
                     status = ?6, feedback = ?7, notes = ?8
                 WHERE id = ?9",
                params![
                    c.date, c.company, c.role, c.link, c.platform, c.status, c.feedback, c.notes,
                    c.id
                ],
            )
            .map_err(|e| StoreError::WriteFailed(e.to_string()))?;

        if affected == 0 {
            return Err(StoreError::NotFound(c.id));
        }
        Ok(())
    }

    /// Idempotent delete: removing an id that does not exist is not an error.
    pub fn remove(&self, id: i64) -> StoreResult<()> {
        self.conn
            .execute("DELETE FROM candidatures WHERE id = ?1", [id])
            .map_err(|e| StoreError::WriteFailed(e.to_string()))?;
        Ok(())
    }

    /// Import path: delete everything, insert the incoming records with their
    /// existing ids, overwrite the goal singleton. Sequential statements; a
    /// mid-sequence failure can leave a partially replaced store.
    pub fn replace_all(&self, records: &[Candidature], goals: &Goals) -> StoreResult<()> {
        self.conn
            .execute("DELETE FROM candidatures", [])
            .map_err(|e| StoreError::WriteFailed(e.to_string()))?;

        for c in records {
            self.conn
                .execute(
                    "INSERT INTO candidatures (id, date, company, role, link, platform, status, feedback, notes)
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
                    params![
                        c.id, c.date, c.company, c.role, c.link, c.platform, c.status, c.feedback,
                        c.notes
                    ],
                )
                .map_err(|e| StoreError::WriteFailed(e.to_string()))?;
        }

        self.save_goals(goals)
    }

    fn row_to_candidature(row: &rusqlite::Row) -> rusqlite::Result<Candidature> {
        Ok(Candidature {
            id: row.get(0)?,
            date: row.get(1)?,
            company: row.get(2)?,
            role: row.get(3)?,
            link: row.get(4)?,
            platform: row.get(5)?,
            status: row.get(6)?,
            feedback: row.get(7)?,
            notes: row.get(8)?,
        })
    }

    // --- Goal operations ---

    /// Reads the goal singleton, creating it with defaults on first read.
    pub fn get_goals(&self) -> StoreResult<Goals> {
        let result = self.conn.query_row(
            "SELECT daily_target, monthly_target FROM goals WHERE id = ?1",
            [GOALS_KEY],
            |row| {
                Ok((
                    row.get::<_, i64>(0).unwrap_or(0),
                    row.get::<_, i64>(1).unwrap_or(0),
                ))
            },
        );

        match result {
            Ok((daily, monthly)) => Ok(Goals {
                daily_target: clamp_target(daily),
                monthly_target: clamp_target(monthly),
            }
            .sanitized()),
            Err(rusqlite::Error::QueryReturnedNoRows) => {
                let defaults = Goals::default();
                self.save_goals(&defaults)?;
                Ok(defaults)
            }
            Err(e) => Err(StoreError::StorageUnavailable(e.to_string())),
        }
    }

    pub fn save_goals(&self, goals: &Goals) -> StoreResult<()> {
        self.conn
            .execute(
                "INSERT OR REPLACE INTO goals (id, daily_target, monthly_target) VALUES (?1, ?2, ?3)",
                params![GOALS_KEY, goals.daily_target, goals.monthly_target],
            )
            .map_err(|e| StoreError::WriteFailed(e.to_string()))?;
        Ok(())
    }
}

fn clamp_target(value: i64) -> u32 {
    if value > 0 && value <= u32::MAX as i64 {
        value as u32
    } else {
        0
    }
}

pub fn today_string() -> String {
    chrono::Local::now().format("%Y-%m-%d").to_string()
}

pub fn default_data_dir() -> PathBuf {
    // Use XDG data directory or fallback
    if let Some(proj_dirs) = directories::ProjectDirs::from("", "", "jobtrack") {
        proj_dirs.data_dir().to_path_buf()
    } else {
        // Fallback to current directory
        PathBuf::from(".")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;

    fn open_test_db(dir: &Path) -> Database {
        let db = Database::open_at(dir.join(DB_FILE)).unwrap();
        db.init().unwrap();
        db
    }

    fn sample(company: &str, date: &str) -> Candidature {
        Candidature {
            id: 0,
            date: date.to_string(),
            company: company.to_string(),
            role: "Engineer".to_string(),
            link: None,
            platform: Some("LinkedIn".to_string()),
            status: "Submitted".to_string(),
            feedback: "Pending".to_string(),
            notes: None,
        }
    }

    #[test]
    fn test_add_assigns_unique_ids() {
        let dir = tempfile::tempdir().unwrap();
        let db = open_test_db(dir.path());

        let mut ids = vec![];
        for i in 0..10 {
            ids.push(db.add(sample(&format!("Company {i}"), "2026-08-01")).unwrap());
        }

        let mut deduped = ids.clone();
        deduped.sort();
        deduped.dedup();
        assert_eq!(deduped.len(), ids.len());
    }

    #[test]
    fn test_add_defaults_empty_date_to_today() {
        let dir = tempfile::tempdir().unwrap();
        let db = open_test_db(dir.path());

        let id = db.add(sample("Acme", "")).unwrap();
        let stored = db.get(id).unwrap().unwrap();
        assert_eq!(stored.date, today_string());
    }

    #[test]
    fn test_update_missing_id_is_not_found_and_store_unchanged() {
        let dir = tempfile::tempdir().unwrap();
        let db = open_test_db(dir.path());

        let id = db.add(sample("Acme", "2026-08-01")).unwrap();
        let mut ghost = sample("Ghost", "2026-08-02");
        ghost.id = id + 999;

        let err = db.update(&ghost).unwrap_err();
        assert!(matches!(err, StoreError::NotFound(_)));

        let all = db.list_all().unwrap();
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].company, "Acme");
    }

    #[test]
    fn test_remove_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let db = open_test_db(dir.path());

        let id = db.add(sample("Acme", "2026-08-01")).unwrap();
        db.remove(id).unwrap();
        assert!(db.list_all().unwrap().iter().all(|c| c.id != id));

        // Second remove of the same id is a no-op, not an error.
        db.remove(id).unwrap();
    }

    #[test]
    fn test_list_filtered_by_status_and_company() {
        let dir = tempfile::tempdir().unwrap();
        let db = open_test_db(dir.path());

        let mut a = sample("Acme", "2026-08-01");
        a.status = "Interview".to_string();
        db.add(a).unwrap();
        db.add(sample("Acme", "2026-08-02")).unwrap();
        db.add(sample("Globex", "2026-08-02")).unwrap();

        assert_eq!(db.list_filtered(Some("Interview"), None).unwrap().len(), 1);
        assert_eq!(db.list_filtered(None, Some("acme")).unwrap().len(), 2);
        assert_eq!(
            db.list_filtered(Some("Submitted"), Some("Globex")).unwrap().len(),
            1
        );
    }

    #[test]
    fn test_goals_created_lazily_with_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let db = open_test_db(dir.path());

        let goals = db.get_goals().unwrap();
        assert_eq!(goals, Goals::default());

        // The lazy creation persisted the row; a direct read sees it too.
        let again = db.get_goals().unwrap();
        assert_eq!(again, goals);
    }

    #[test]
    fn test_goals_zero_targets_read_back_as_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let db = open_test_db(dir.path());

        db.conn
            .execute(
                "INSERT OR REPLACE INTO goals (id, daily_target, monthly_target) VALUES ('goals', 0, -3)",
                [],
            )
            .unwrap();

        let goals = db.get_goals().unwrap();
        assert_eq!(goals, Goals::default());
    }

    #[test]
    fn test_replace_all_keeps_ids_and_sequence_resumes_above_max() {
        let dir = tempfile::tempdir().unwrap();
        let db = open_test_db(dir.path());

        let mut imported = sample("Imported", "2026-07-15");
        imported.id = 1000;
        db.replace_all(&[imported], &Goals::default()).unwrap();

        let all = db.list_all().unwrap();
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].id, 1000);

        // AUTOINCREMENT resumes above the largest imported id.
        let next = db.add(sample("Fresh", "2026-08-01")).unwrap();
        assert!(next > 1000);
    }

    #[test]
    fn test_replace_all_overwrites_goals() {
        let dir = tempfile::tempdir().unwrap();
        let db = open_test_db(dir.path());

        db.save_goals(&Goals {
            daily_target: 2,
            monthly_target: 20,
        })
        .unwrap();

        db.replace_all(
            &[],
            &Goals {
                daily_target: 9,
                monthly_target: 90,
            },
        )
        .unwrap();

        let goals = db.get_goals().unwrap();
        assert_eq!(goals.daily_target, 9);
        assert_eq!(goals.monthly_target, 90);
    }
}
