use std::collections::BTreeMap;

use chrono::{Duration, NaiveDate};

use crate::models::{Candidature, Goals};

/// Pure aggregations over the in-memory record list. Records whose `date`
/// is not a well-formed `YYYY-MM-DD` are excluded from date-keyed series;
/// they still count toward totals and status breakdowns.

pub fn count_on_date(records: &[Candidature], date: &str) -> usize {
    records.iter().filter(|c| c.date == date).count()
}

pub fn count_in_month(records: &[Candidature], year_month: &str) -> usize {
    records.iter().filter(|c| c.date.starts_with(year_month)).count()
}

/// Occurrence count per distinct status, in first-seen order.
pub fn count_by_status(records: &[Candidature]) -> Vec<(String, usize)> {
    let mut counts: Vec<(String, usize)> = Vec::new();
    for c in records {
        match counts.iter_mut().find(|(status, _)| *status == c.status) {
            Some((_, n)) => *n += 1,
            None => counts.push((c.status.clone(), 1)),
        }
    }
    counts
}

/// Count per day present in the records, ascending by date (lexicographic
/// order is chronological for ISO dates).
pub fn series_by_day(records: &[Candidature]) -> BTreeMap<String, usize> {
    let mut series = BTreeMap::new();
    for c in records.iter().filter(|c| parse_date(&c.date).is_some()) {
        *series.entry(c.date.clone()).or_insert(0) += 1;
    }
    series
}

/// Count per `YYYY-MM` month present in the records, ascending.
pub fn series_by_month(records: &[Candidature]) -> BTreeMap<String, usize> {
    let mut series = BTreeMap::new();
    for c in records.iter().filter(|c| parse_date(&c.date).is_some()) {
        *series.entry(c.date[..7].to_string()).or_insert(0) += 1;
    }
    series
}

/// Zero-filled counts for the `n` calendar days ending at `today`, oldest
/// first. The chart series.
pub fn last_n_days(records: &[Candidature], today: NaiveDate, n: usize) -> Vec<(String, usize)> {
    (0..n)
        .map(|i| {
            let date = (today - Duration::days((n - 1 - i) as i64))
                .format("%Y-%m-%d")
                .to_string();
            let count = count_on_date(records, &date);
            (date, count)
        })
        .collect()
}

#[derive(Debug, Clone, PartialEq)]
pub struct ResponseStats {
    pub total: usize,
    pub responded: usize,
    pub rate_percent: f64,
}

/// Totals and company-response rate. A record counts as responded when its
/// feedback is "Yes".
pub fn response_stats(records: &[Candidature]) -> ResponseStats {
    let total = records.len();
    let responded = records.iter().filter(|c| c.feedback == "Yes").count();
    let rate_percent = if total > 0 {
        (responded as f64 / total as f64) * 100.0
    } else {
        0.0
    };
    ResponseStats {
        total,
        responded,
        rate_percent,
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct GoalProgress {
    pub today_count: usize,
    pub daily_target: u32,
    pub daily_met: bool,
    pub month_count: usize,
    pub monthly_target: u32,
    pub monthly_met: bool,
}

pub fn goal_progress(records: &[Candidature], goals: &Goals, today: NaiveDate) -> GoalProgress {
    let today_str = today.format("%Y-%m-%d").to_string();
    let month_str = today.format("%Y-%m").to_string();
    let today_count = count_on_date(records, &today_str);
    let month_count = count_in_month(records, &month_str);
    GoalProgress {
        today_count,
        daily_target: goals.daily_target,
        daily_met: today_count >= goals.daily_target as usize,
        month_count,
        monthly_target: goals.monthly_target,
        monthly_met: month_count >= goals.monthly_target as usize,
    }
}

fn parse_date(s: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(s, "%Y-%m-%d").ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rec(date: &str, status: &str, feedback: &str) -> Candidature {
        Candidature {
            id: 0,
            date: date.to_string(),
            company: "Acme".to_string(),
            role: "Engineer".to_string(),
            link: None,
            platform: None,
            status: status.to_string(),
            feedback: feedback.to_string(),
            notes: None,
        }
    }

    #[test]
    fn test_count_on_date_exact_match() {
        let records = vec![
            rec("2026-08-01", "Submitted", "Pending"),
            rec("2026-08-01", "Submitted", "Pending"),
            rec("2026-08-02", "Submitted", "Pending"),
        ];
        assert_eq!(count_on_date(&records, "2026-08-01"), 2);
        assert_eq!(count_on_date(&records, "2026-08-03"), 0);
        assert_eq!(count_on_date(&[], "2026-08-01"), 0);
    }

    #[test]
    fn test_count_in_month_prefix_match() {
        let records = vec![
            rec("2026-08-01", "Submitted", "Pending"),
            rec("2026-08-30", "Submitted", "Pending"),
            rec("2026-07-31", "Submitted", "Pending"),
        ];
        assert_eq!(count_in_month(&records, "2026-08"), 2);
        assert_eq!(count_in_month(&records, "2026-07"), 1);
        assert_eq!(count_in_month(&records, "2025-08"), 0);
    }

    #[test]
    fn test_count_by_status_first_seen_order() {
        let records = vec![
            rec("2026-08-01", "Submitted", "Pending"),
            rec("2026-08-01", "Submitted", "Pending"),
            rec("2026-08-02", "Interview", "Yes"),
        ];
        let counts = count_by_status(&records);
        assert_eq!(
            counts,
            vec![("Submitted".to_string(), 2), ("Interview".to_string(), 1)]
        );
    }

    #[test]
    fn test_count_by_status_empty() {
        assert!(count_by_status(&[]).is_empty());
    }

    #[test]
    fn test_series_by_day_ascending_and_excludes_malformed() {
        let records = vec![
            rec("2026-08-02", "Submitted", "Pending"),
            rec("2026-08-01", "Submitted", "Pending"),
            rec("2026-08-01", "Submitted", "Pending"),
            rec("not-a-date", "Submitted", "Pending"),
            rec("", "Submitted", "Pending"),
        ];
        let series = series_by_day(&records);
        let keys: Vec<&String> = series.keys().collect();
        assert_eq!(keys, vec!["2026-08-01", "2026-08-02"]);
        assert_eq!(series["2026-08-01"], 2);

        // The malformed entries still show up in non-date aggregations.
        assert_eq!(count_by_status(&records)[0].1, 5);
    }

    #[test]
    fn test_series_by_month() {
        let records = vec![
            rec("2026-07-31", "Submitted", "Pending"),
            rec("2026-08-01", "Submitted", "Pending"),
            rec("2026-08-15", "Submitted", "Pending"),
        ];
        let series = series_by_month(&records);
        assert_eq!(series.len(), 2);
        assert_eq!(series["2026-08"], 2);
    }

    #[test]
    fn test_last_n_days_zero_fills() {
        let today = NaiveDate::from_ymd_opt(2026, 8, 7).unwrap();
        let records = vec![
            rec("2026-08-07", "Submitted", "Pending"),
            rec("2026-08-05", "Submitted", "Pending"),
            rec("2026-08-05", "Submitted", "Pending"),
        ];
        let series = last_n_days(&records, today, 7);
        assert_eq!(series.len(), 7);
        assert_eq!(series[0], ("2026-08-01".to_string(), 0));
        assert_eq!(series[4], ("2026-08-05".to_string(), 2));
        assert_eq!(series[6], ("2026-08-07".to_string(), 1));
    }

    #[test]
    fn test_response_stats() {
        let records = vec![
            rec("2026-08-01", "Submitted", "Yes"),
            rec("2026-08-01", "Submitted", "No"),
            rec("2026-08-02", "Interview", "Yes"),
            rec("2026-08-03", "Submitted", "Pending"),
        ];
        let stats = response_stats(&records);
        assert_eq!(stats.total, 4);
        assert_eq!(stats.responded, 2);
        assert!((stats.rate_percent - 50.0).abs() < f64::EPSILON);

        let empty = response_stats(&[]);
        assert_eq!(empty.total, 0);
        assert_eq!(empty.rate_percent, 0.0);
    }

    #[test]
    fn test_goal_progress_daily_met() {
        let today = NaiveDate::from_ymd_opt(2026, 8, 7).unwrap();
        let records = vec![
            rec("2026-08-07", "Submitted", "Pending"),
            rec("2026-08-07", "Submitted", "Pending"),
            rec("2026-08-07", "Submitted", "Pending"),
        ];
        let goals = Goals {
            daily_target: 2,
            monthly_target: 100,
        };
        let progress = goal_progress(&records, &goals, today);
        assert_eq!(progress.today_count, 3);
        assert!(progress.daily_met);
        assert_eq!(progress.month_count, 3);
        assert!(!progress.monthly_met);
    }
}
