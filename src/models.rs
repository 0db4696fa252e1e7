use serde::{Deserialize, Deserializer, Serialize};

pub const DEFAULT_DAILY_TARGET: u32 = 5;
pub const DEFAULT_MONTHLY_TARGET: u32 = 100;

pub const DEFAULT_STATUS: &str = "Submitted";
pub const DEFAULT_FEEDBACK: &str = "Pending";

/// Well-known status labels. The set is open: any string is accepted and
/// unknown values get the default visual treatment in views.
pub const KNOWN_STATUSES: [&str; 5] = [
    "Submitted",
    "Under Review",
    "Interview",
    "Test",
    "Finished",
];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Candidature {
    #[serde(default)]
    pub id: i64,
    #[serde(default)]
    pub date: String, // ISO YYYY-MM-DD, defaulted to today on add
    pub company: String,
    pub role: String,
    pub link: Option<String>,
    pub platform: Option<String>, // "LinkedIn", "Indeed", etc.
    #[serde(default = "default_status")]
    pub status: String,
    #[serde(default = "default_feedback")]
    pub feedback: String, // "Yes", "No", "Pending"
    pub notes: Option<String>,
}

fn default_status() -> String {
    DEFAULT_STATUS.to_string()
}

fn default_feedback() -> String {
    DEFAULT_FEEDBACK.to_string()
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Goals {
    #[serde(
        rename = "dailyTarget",
        default = "default_daily",
        deserialize_with = "de_daily"
    )]
    pub daily_target: u32,
    #[serde(
        rename = "monthlyTarget",
        default = "default_monthly",
        deserialize_with = "de_monthly"
    )]
    pub monthly_target: u32,
}

impl Default for Goals {
    fn default() -> Self {
        Goals {
            daily_target: DEFAULT_DAILY_TARGET,
            monthly_target: DEFAULT_MONTHLY_TARGET,
        }
    }
}

impl Goals {
    /// Non-positive targets read back as the defaults. Malformed input is
    /// "use default", not an error.
    pub fn sanitized(&self) -> Goals {
        Goals {
            daily_target: sanitize_target(self.daily_target, DEFAULT_DAILY_TARGET),
            monthly_target: sanitize_target(self.monthly_target, DEFAULT_MONTHLY_TARGET),
        }
    }
}

pub fn sanitize_target(value: u32, default: u32) -> u32 {
    if value == 0 { default } else { value }
}

fn default_daily() -> u32 {
    DEFAULT_DAILY_TARGET
}

fn default_monthly() -> u32 {
    DEFAULT_MONTHLY_TARGET
}

fn de_daily<'de, D>(deserializer: D) -> Result<u32, D::Error>
where
    D: Deserializer<'de>,
{
    let value = serde_json::Value::deserialize(deserializer)?;
    Ok(lenient_target(&value, DEFAULT_DAILY_TARGET))
}

fn de_monthly<'de, D>(deserializer: D) -> Result<u32, D::Error>
where
    D: Deserializer<'de>,
{
    let value = serde_json::Value::deserialize(deserializer)?;
    Ok(lenient_target(&value, DEFAULT_MONTHLY_TARGET))
}

// Accepts positive integers and numeric strings; anything else is the default.
fn lenient_target(value: &serde_json::Value, default: u32) -> u32 {
    let parsed = match value {
        serde_json::Value::Number(n) => n.as_u64(),
        serde_json::Value::String(s) => s.trim().parse::<u64>().ok(),
        _ => None,
    };
    match parsed {
        Some(n) if n > 0 && n <= u32::MAX as u64 => n as u32,
        _ => default,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_goals_default_values() {
        let goals = Goals::default();
        assert_eq!(goals.daily_target, 5);
        assert_eq!(goals.monthly_target, 100);
    }

    #[test]
    fn test_goals_lenient_parse_non_numeric() {
        let goals: Goals =
            serde_json::from_str(r#"{"dailyTarget": "abc", "monthlyTarget": null}"#).unwrap();
        assert_eq!(goals.daily_target, 5);
        assert_eq!(goals.monthly_target, 100);
    }

    #[test]
    fn test_goals_lenient_parse_numeric_string() {
        let goals: Goals =
            serde_json::from_str(r#"{"dailyTarget": "7", "monthlyTarget": 150}"#).unwrap();
        assert_eq!(goals.daily_target, 7);
        assert_eq!(goals.monthly_target, 150);
    }

    #[test]
    fn test_goals_missing_keys_use_defaults() {
        let goals: Goals = serde_json::from_str("{}").unwrap();
        assert_eq!(goals, Goals::default());
    }

    #[test]
    fn test_sanitized_replaces_zero() {
        let goals = Goals {
            daily_target: 0,
            monthly_target: 30,
        };
        let clean = goals.sanitized();
        assert_eq!(clean.daily_target, 5);
        assert_eq!(clean.monthly_target, 30);
    }

    #[test]
    fn test_candidature_optional_fields_default() {
        let c: Candidature =
            serde_json::from_str(r#"{"company": "Acme", "role": "Engineer"}"#).unwrap();
        assert_eq!(c.id, 0);
        assert_eq!(c.date, "");
        assert_eq!(c.status, "Submitted");
        assert_eq!(c.feedback, "Pending");
        assert!(c.link.is_none());
    }
}
