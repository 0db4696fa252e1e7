mod backup;
mod cache;
mod db;
mod models;
mod stats;
mod store;
mod tui;

use anyhow::{Context, Result, bail};
use chrono::{Datelike, Local, NaiveDate};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

use models::{Candidature, DEFAULT_FEEDBACK, DEFAULT_STATUS, Goals};
use store::Store;

#[derive(Parser)]
#[command(name = "jobtrack")]
#[command(about = "Job application tracker - record candidatures, follow goals, keep backups")]
struct Cli {
    /// Override the data directory (defaults to the platform data dir)
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize the store
    Init,

    /// Add a candidature
    Add {
        /// Company applied to
        company: String,

        /// Role applied for
        role: String,

        /// Application date (YYYY-MM-DD, defaults to today)
        #[arg(short, long)]
        date: Option<String>,

        /// Link to the posting
        #[arg(short, long)]
        link: Option<String>,

        /// Platform used (LinkedIn, Indeed, ...)
        #[arg(short, long)]
        platform: Option<String>,

        /// Status (Submitted, Under Review, Interview, Test, Finished, or any label)
        #[arg(short, long, default_value = DEFAULT_STATUS)]
        status: String,

        /// Company feedback (Yes, No, Pending)
        #[arg(short, long, default_value = DEFAULT_FEEDBACK)]
        feedback: String,

        /// Free-form notes
        #[arg(short, long)]
        notes: Option<String>,
    },

    /// List candidatures
    List {
        /// Filter by status
        #[arg(short, long)]
        status: Option<String>,

        /// Filter by company
        #[arg(short, long)]
        company: Option<String>,
    },

    /// Show candidature details
    Show {
        /// Candidature ID
        id: i64,
    },

    /// Edit a candidature
    Edit {
        /// Candidature ID
        id: i64,

        #[arg(short, long)]
        date: Option<String>,

        #[arg(long)]
        company: Option<String>,

        #[arg(long)]
        role: Option<String>,

        /// New link (empty string clears it)
        #[arg(short, long)]
        link: Option<String>,

        /// New platform (empty string clears it)
        #[arg(short, long)]
        platform: Option<String>,

        #[arg(short, long)]
        status: Option<String>,

        #[arg(short, long)]
        feedback: Option<String>,

        /// New notes (empty string clears them)
        #[arg(short, long)]
        notes: Option<String>,
    },

    /// Remove a candidature
    Remove {
        /// Candidature ID
        id: i64,
    },

    /// Show or set submission goals
    Goals {
        /// Daily submission target
        #[arg(long)]
        daily: Option<u32>,

        /// Monthly submission target
        #[arg(long)]
        monthly: Option<u32>,
    },

    /// Show aggregate statistics
    Stats,

    /// Show a month calendar with per-day counts
    Calendar {
        /// Month to show (YYYY-MM, defaults to the current month)
        #[arg(short, long)]
        month: Option<String>,
    },

    /// Interactive dashboard
    Dashboard,

    /// Export a JSON backup
    Export {
        /// Output file (defaults to jobtrack_backup_<date>.json)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Import a JSON backup, replacing all current data
    Import {
        /// Backup file to import
        file: PathBuf,
    },
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let dir = store::resolve_data_dir(cli.data_dir);
    let mut store = Store::open(&dir);

    if store.is_degraded() {
        println!("Warning: primary database unavailable, using fallback storage.");
    }

    // The dashboard redraws from the store itself; everywhere else the
    // change notification prints the refreshed goal progress.
    if !matches!(cli.command, Commands::Dashboard) {
        store.set_on_change(Box::new(|records, goals| {
            let progress = stats::goal_progress(records, goals, Local::now().date_naive());
            println!(
                "Today: {}/{}   This month: {}/{}",
                progress.today_count,
                progress.daily_target,
                progress.month_count,
                progress.monthly_target
            );
        }));
    }

    match cli.command {
        Commands::Init => {
            println!("Store ready at {}", store.location().display());
        }

        Commands::Add {
            company,
            role,
            date,
            link,
            platform,
            status,
            feedback,
            notes,
        } => {
            if let Some(d) = &date {
                validate_date(d)?;
            }
            let draft = Candidature {
                id: 0,
                date: date.unwrap_or_default(),
                company,
                role,
                link: none_if_empty(link),
                platform: none_if_empty(platform),
                status,
                feedback,
                notes: none_if_empty(notes),
            };
            let id = store.add(draft)?;
            println!("Candidature #{} added.", id);
        }

        Commands::List { status, company } => {
            let mut records = store.list_filtered(status.as_deref(), company.as_deref())?;
            tui::sort_for_display(&mut records);
            if records.is_empty() {
                println!("No candidatures found.");
            } else {
                println!(
                    "{:<8} {:<12} {:<20} {:<24} {:<12} {:<14} {:<8}",
                    "ID", "DATE", "COMPANY", "ROLE", "PLATFORM", "STATUS", "FEEDBACK"
                );
                println!("{}", "-".repeat(102));
                for c in records {
                    println!(
                        "{:<8} {:<12} {:<20} {:<24} {:<12} {:<14} {:<8}",
                        c.id,
                        c.date,
                        truncate(&c.company, 18),
                        truncate(&c.role, 22),
                        truncate(&c.platform.unwrap_or_default(), 10),
                        truncate(&c.status, 12),
                        c.feedback
                    );
                }
            }
        }

        Commands::Show { id } => match store.get(id)? {
            Some(c) => {
                println!("Candidature #{}", c.id);
                println!("Date: {}", c.date);
                println!("Company: {}", c.company);
                println!("Role: {}", c.role);
                println!("Status: {}", c.status);
                println!("Feedback: {}", c.feedback);
                if let Some(platform) = &c.platform {
                    println!("Platform: {}", platform);
                }
                if let Some(link) = &c.link {
                    println!("Link: {}", link);
                }
                if let Some(notes) = &c.notes {
                    println!("\nNotes:\n{}", notes);
                }
            }
            None => {
                println!("Candidature #{} not found.", id);
            }
        },

        Commands::Edit {
            id,
            date,
            company,
            role,
            link,
            platform,
            status,
            feedback,
            notes,
        } => {
            let mut c = store
                .get(id)?
                .with_context(|| format!("Candidature #{} not found", id))?;

            if let Some(d) = date {
                validate_date(&d)?;
                c.date = d;
            }
            if let Some(v) = company {
                c.company = v;
            }
            if let Some(v) = role {
                c.role = v;
            }
            if let Some(v) = link {
                c.link = none_if_empty(Some(v));
            }
            if let Some(v) = platform {
                c.platform = none_if_empty(Some(v));
            }
            if let Some(v) = status {
                c.status = v;
            }
            if let Some(v) = feedback {
                c.feedback = v;
            }
            if let Some(v) = notes {
                c.notes = none_if_empty(Some(v));
            }

            store.update(&c)?;
            println!("Candidature #{} updated.", id);
        }

        Commands::Remove { id } => {
            store.remove(id)?;
            println!("Candidature #{} deleted.", id);
        }

        Commands::Goals { daily, monthly } => {
            let current = store.get_goals()?;
            if daily.is_none() && monthly.is_none() {
                println!("Daily target:   {}", current.daily_target);
                println!("Monthly target: {}", current.monthly_target);

                let records = store.list_all()?;
                let progress =
                    stats::goal_progress(&records, &current, Local::now().date_naive());
                println!(
                    "\nToday: {}/{} ({})",
                    progress.today_count,
                    progress.daily_target,
                    if progress.daily_met { "met" } else { "open" }
                );
                println!(
                    "This month: {}/{} ({})",
                    progress.month_count,
                    progress.monthly_target,
                    if progress.monthly_met { "met" } else { "open" }
                );
            } else {
                let goals = Goals {
                    daily_target: daily.unwrap_or(current.daily_target),
                    monthly_target: monthly.unwrap_or(current.monthly_target),
                };
                store.save_goals(&goals)?;
                println!("Goals saved.");
            }
        }

        Commands::Stats => {
            let records = store.list_all()?;
            let goals = store.get_goals()?;
            print_stats(&records, &goals);
        }

        Commands::Calendar { month } => {
            let records = store.list_all()?;
            let goals = store.get_goals()?;
            let month = month.unwrap_or_else(|| Local::now().format("%Y-%m").to_string());
            print_calendar(&records, &goals, &month)?;
        }

        Commands::Dashboard => {
            tui::run_dashboard(&mut store)?;
        }

        Commands::Export { output } => {
            let doc = store.export_backup()?;
            let count = doc.records.len();
            let json = backup::to_json(&doc)?;
            let path = output
                .unwrap_or_else(|| PathBuf::from(backup::default_filename(Local::now().date_naive())));
            std::fs::write(&path, json)
                .with_context(|| format!("Failed to write backup to {}", path.display()))?;
            println!("Backup exported to {} ({} candidatures).", path.display(), count);
        }

        Commands::Import { file } => {
            let raw = std::fs::read_to_string(&file)
                .with_context(|| format!("Failed to read backup file {}", file.display()))?;
            let doc = backup::parse_document(&raw)?;
            let count = store.import_backup(doc)?;
            println!("Backup imported: {} candidatures restored.", count);
        }
    }

    Ok(())
}

fn print_stats(records: &[Candidature], goals: &Goals) {
    let today = Local::now().date_naive();
    let progress = stats::goal_progress(records, goals, today);
    let responses = stats::response_stats(records);

    println!("Statistics for {}", today.format("%Y-%m-%d"));
    println!();
    println!(
        "Today:      {:>4} / {} daily target ({})",
        progress.today_count,
        progress.daily_target,
        if progress.daily_met { "met" } else { "open" }
    );
    println!(
        "This month: {:>4} / {} monthly target ({})",
        progress.month_count,
        progress.monthly_target,
        if progress.monthly_met { "met" } else { "open" }
    );
    println!();
    println!("Total candidatures: {}", responses.total);
    println!(
        "Responses:          {} ({:.1}%)",
        responses.responded, responses.rate_percent
    );

    let by_status = stats::count_by_status(records);
    if !by_status.is_empty() {
        println!("\nBy status:");
        for (status, count) in by_status {
            println!("  {:<16} {:>4}", status, count);
        }
    }

    let by_month = stats::series_by_month(records);
    if !by_month.is_empty() {
        println!("\nBy month:");
        for (month, count) in by_month {
            println!("  {:<16} {:>4}", month, count);
        }
    }
}

fn print_calendar(records: &[Candidature], goals: &Goals, month: &str) -> Result<()> {
    let first = NaiveDate::parse_from_str(&format!("{month}-01"), "%Y-%m-%d")
        .with_context(|| format!("Invalid month '{}' (expected YYYY-MM)", month))?;
    // Record dates compare as strings, so build lookups from the canonical
    // zero-padded form rather than the raw argument.
    let month_key = first.format("%Y-%m").to_string();

    println!("{:^49}", first.format("%B %Y"));
    println!(
        "{:>7}{:>7}{:>7}{:>7}{:>7}{:>7}{:>7}",
        "Mon", "Tue", "Wed", "Thu", "Fri", "Sat", "Sun"
    );

    let offset = first.weekday().num_days_from_monday() as usize;
    let mut cells: Vec<String> = vec![String::new(); offset];
    for day in 1..=days_in_month(first) {
        let date = format!("{}-{:02}", month_key, day);
        let count = stats::count_on_date(records, &date);
        let marker = if count >= goals.daily_target as usize {
            "*"
        } else {
            " "
        };
        cells.push(format!("{:>2}:{:<2}{}", day, count, marker));
    }

    for week in cells.chunks(7) {
        let row: Vec<String> = week.iter().map(|cell| format!("{:>7}", cell)).collect();
        println!("{}", row.join(""));
    }
    println!("\n* daily target met ({} or more)", goals.daily_target);
    Ok(())
}

fn days_in_month(first: NaiveDate) -> u32 {
    let next = if first.month() == 12 {
        NaiveDate::from_ymd_opt(first.year() + 1, 1, 1)
    } else {
        NaiveDate::from_ymd_opt(first.year(), first.month() + 1, 1)
    };
    match next {
        Some(n) => (n - first).num_days() as u32,
        None => 31,
    }
}

// Date-keyed aggregations compare strings exactly, so input must be in the
// canonical zero-padded form, not merely parseable.
fn validate_date(date: &str) -> Result<()> {
    let canonical = NaiveDate::parse_from_str(date, "%Y-%m-%d")
        .map(|d| d.format("%Y-%m-%d").to_string() == date)
        .unwrap_or(false);
    if !canonical {
        bail!("Invalid date '{}' (expected YYYY-MM-DD)", date);
    }
    Ok(())
}

fn none_if_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.is_empty())
}

fn truncate(s: &str, max: usize) -> String {
    if s.len() <= max {
        s.to_string()
    } else {
        format!("{}...", &s[..max.saturating_sub(3)])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_days_in_month() {
        assert_eq!(days_in_month(NaiveDate::from_ymd_opt(2026, 2, 1).unwrap()), 28);
        assert_eq!(days_in_month(NaiveDate::from_ymd_opt(2024, 2, 1).unwrap()), 29);
        assert_eq!(days_in_month(NaiveDate::from_ymd_opt(2026, 12, 1).unwrap()), 31);
    }

    #[test]
    fn test_validate_date() {
        assert!(validate_date("2026-08-07").is_ok());
        assert!(validate_date("2026-8-7").is_err());
        assert!(validate_date("tomorrow").is_err());
    }

    #[test]
    fn test_truncate() {
        assert_eq!(truncate("short", 10), "short");
        assert_eq!(truncate("a very long company name", 10), "a very ...");
    }

    #[test]
    fn test_none_if_empty() {
        assert_eq!(none_if_empty(Some("x".to_string())), Some("x".to_string()));
        assert_eq!(none_if_empty(Some(String::new())), None);
        assert_eq!(none_if_empty(None), None);
    }
}
