use chrono::{DateTime, Local, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::models::{Candidature, Goals};
use crate::store::{StoreError, StoreResult};

/// Schema version stamped into exported documents.
pub const FORMAT_VERSION: i64 = 1;

/// The portable JSON snapshot: full record list, goals, format version and
/// export timestamp. Produced on demand, never persisted by the store.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Backup {
    pub records: Vec<Candidature>,
    pub goals: Goals,
    #[serde(rename = "formatVersion", default)]
    pub format_version: i64,
    #[serde(rename = "exportedAt", default)]
    pub exported_at: String,
}

pub fn export_document(
    records: Vec<Candidature>,
    goals: Goals,
    exported_at: DateTime<Local>,
) -> Backup {
    Backup {
        records,
        goals,
        format_version: FORMAT_VERSION,
        exported_at: exported_at.to_rfc3339(),
    }
}

pub fn to_json(doc: &Backup) -> StoreResult<String> {
    serde_json::to_string_pretty(doc).map_err(|e| StoreError::WriteFailed(e.to_string()))
}

/// Parses and validates a backup document. `records` and `goals` must be
/// present; `formatVersion` and `exportedAt` are tolerated missing so that
/// older or hand-edited files still import.
pub fn parse_document(json: &str) -> StoreResult<Backup> {
    serde_json::from_str(json).map_err(|e| StoreError::InvalidBackupFormat(e.to_string()))
}

pub fn default_filename(date: NaiveDate) -> String {
    format!("jobtrack_backup_{}.json", date.format("%Y-%m-%d"))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rec(id: i64, company: &str) -> Candidature {
        Candidature {
            id,
            date: "2026-08-01".to_string(),
            company: company.to_string(),
            role: "Engineer".to_string(),
            link: Some("https://example.com/job".to_string()),
            platform: Some("LinkedIn".to_string()),
            status: "Submitted".to_string(),
            feedback: "Pending".to_string(),
            notes: None,
        }
    }

    #[test]
    fn test_export_parse_round_trip() {
        let doc = export_document(
            vec![rec(1, "Acme"), rec(2, "Globex")],
            Goals {
                daily_target: 3,
                monthly_target: 60,
            },
            Local::now(),
        );

        let json = to_json(&doc).unwrap();
        let parsed = parse_document(&json).unwrap();

        assert_eq!(parsed.records, doc.records);
        assert_eq!(parsed.goals, doc.goals);
        assert_eq!(parsed.format_version, FORMAT_VERSION);
        assert_eq!(parsed.exported_at, doc.exported_at);
    }

    #[test]
    fn test_round_trip_on_empty_state() {
        let doc = export_document(vec![], Goals::default(), Local::now());
        let parsed = parse_document(&to_json(&doc).unwrap()).unwrap();
        assert!(parsed.records.is_empty());
        assert_eq!(parsed.goals, Goals::default());
    }

    #[test]
    fn test_missing_goals_key_is_invalid() {
        let err = parse_document(r#"{"records": []}"#).unwrap_err();
        assert!(matches!(err, StoreError::InvalidBackupFormat(_)));
    }

    #[test]
    fn test_missing_records_key_is_invalid() {
        let err = parse_document(r#"{"goals": {"dailyTarget": 5, "monthlyTarget": 100}}"#)
            .unwrap_err();
        assert!(matches!(err, StoreError::InvalidBackupFormat(_)));
    }

    #[test]
    fn test_not_json_is_invalid() {
        assert!(matches!(
            parse_document("not json at all"),
            Err(StoreError::InvalidBackupFormat(_))
        ));
    }

    #[test]
    fn test_version_and_timestamp_optional_on_import() {
        let parsed = parse_document(
            r#"{"records": [], "goals": {"dailyTarget": 2, "monthlyTarget": 20}}"#,
        )
        .unwrap();
        assert_eq!(parsed.format_version, 0);
        assert_eq!(parsed.exported_at, "");
        assert_eq!(parsed.goals.daily_target, 2);
    }

    #[test]
    fn test_extra_top_level_keys_ignored() {
        let parsed = parse_document(
            r#"{"records": [], "goals": {}, "theme": "dark", "formatVersion": 1}"#,
        )
        .unwrap();
        assert!(parsed.records.is_empty());
        assert_eq!(parsed.goals, Goals::default());
    }

    #[test]
    fn test_default_filename_convention() {
        let date = NaiveDate::from_ymd_opt(2026, 8, 7).unwrap();
        assert_eq!(default_filename(date), "jobtrack_backup_2026-08-07.json");
    }
}
