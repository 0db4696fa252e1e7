use anyhow::Result;
use chrono::Local;
use crossterm::{
    ExecutableCommand,
    event::{self, Event, KeyCode, KeyEventKind},
    terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
};
use ratatui::{
    prelude::*,
    widgets::{Bar, BarChart, BarGroup, Block, Borders, List, ListItem, ListState, Paragraph, Wrap},
};
use std::io::stdout;

use crate::models::{Candidature, Goals};
use crate::stats;
use crate::store::Store;

struct AppState {
    records: Vec<Candidature>,
    goals: Goals,
    selected: usize,
    scroll_offset: u16,
}

impl AppState {
    fn new(records: Vec<Candidature>, goals: Goals) -> Self {
        Self {
            records,
            goals,
            selected: 0,
            scroll_offset: 0,
        }
    }

    fn current(&self) -> Option<&Candidature> {
        self.records.get(self.selected)
    }

    fn reload(&mut self, store: &mut Store) {
        // Replace the whole list from the store rather than patching rows.
        self.records = store.list_all().unwrap_or_default();
        sort_for_display(&mut self.records);
        self.goals = store.get_goals().unwrap_or_default();
        if self.selected >= self.records.len() && !self.records.is_empty() {
            self.selected = self.records.len() - 1;
        }
    }

    fn next(&mut self) {
        if !self.records.is_empty() && self.selected < self.records.len() - 1 {
            self.selected += 1;
            self.scroll_offset = 0;
        }
    }

    fn prev(&mut self) {
        if self.selected > 0 {
            self.selected -= 1;
            self.scroll_offset = 0;
        }
    }

    fn scroll_down(&mut self) {
        self.scroll_offset = self.scroll_offset.saturating_add(3);
    }

    fn scroll_up(&mut self) {
        self.scroll_offset = self.scroll_offset.saturating_sub(3);
    }
}

// Most recent first, as the table view shows them.
pub fn sort_for_display(records: &mut [Candidature]) {
    records.sort_by(|a, b| b.date.cmp(&a.date));
}

pub fn run_dashboard(store: &mut Store) -> Result<()> {
    let mut records = store.list_all()?;
    sort_for_display(&mut records);
    let goals = store.get_goals()?;
    let mut state = AppState::new(records, goals);

    // Setup terminal
    enable_raw_mode()?;
    stdout().execute(EnterAlternateScreen)?;
    let mut terminal = Terminal::new(CrosstermBackend::new(stdout()))?;

    let result = run_loop(&mut terminal, &mut state, store);

    // Restore terminal
    disable_raw_mode()?;
    stdout().execute(LeaveAlternateScreen)?;

    result
}

fn run_loop(
    terminal: &mut Terminal<CrosstermBackend<std::io::Stdout>>,
    state: &mut AppState,
    store: &mut Store,
) -> Result<()> {
    let mut list_state = ListState::default();
    list_state.select(Some(0));

    loop {
        terminal.draw(|frame| draw(frame, state, &mut list_state))?;

        if let Event::Key(key) = event::read()? {
            if key.kind != KeyEventKind::Press {
                continue;
            }
            match key.code {
                KeyCode::Char('q') | KeyCode::Esc => break,
                KeyCode::Down | KeyCode::Char('j') => state.next(),
                KeyCode::Up | KeyCode::Char('k') => state.prev(),
                KeyCode::Char('J') | KeyCode::PageDown => state.scroll_down(),
                KeyCode::Char('K') | KeyCode::PageUp => state.scroll_up(),
                KeyCode::Char(c @ '1'..='5') => {
                    let status = crate::models::KNOWN_STATUSES[(c as usize) - ('1' as usize)];
                    if let Some(record) = state.current() {
                        let mut updated = record.clone();
                        updated.status = status.to_string();
                        let _ = store.update(&updated);
                        state.reload(store);
                    }
                }
                KeyCode::Char('y') => set_feedback(state, store, "Yes"),
                KeyCode::Char('n') => set_feedback(state, store, "No"),
                KeyCode::Char('p') => set_feedback(state, store, "Pending"),
                KeyCode::Char('d') => {
                    if let Some(record) = state.current() {
                        let _ = store.remove(record.id);
                        state.reload(store);
                    }
                }
                _ => {}
            }
            state.selected = state.selected.min(state.records.len().saturating_sub(1));
            list_state.select(Some(state.selected));
        }
    }
    Ok(())
}

fn set_feedback(state: &mut AppState, store: &mut Store, feedback: &str) {
    if let Some(record) = state.current() {
        let mut updated = record.clone();
        updated.feedback = feedback.to_string();
        let _ = store.update(&updated);
        state.reload(store);
    }
}

fn draw(frame: &mut Frame, state: &AppState, list_state: &mut ListState) {
    let body = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Min(0), Constraint::Length(1)])
        .split(frame.area());

    let columns = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(40), Constraint::Percentage(60)])
        .split(body[0]);

    // Left panel: candidature list
    let items: Vec<ListItem> = state
        .records
        .iter()
        .map(|c| {
            let icon = status_icon(&c.status);
            let company = if c.company.len() > 18 {
                format!("{}...", &c.company[..15])
            } else {
                c.company.clone()
            };
            ListItem::new(format!("{} {} {:<18} {}", icon, c.date, company, c.role))
        })
        .collect();

    let list = List::new(items)
        .block(Block::default().borders(Borders::ALL).title(format!(
            " Candidatures ({}) ",
            state.records.len()
        )))
        .highlight_style(Style::default().bg(Color::DarkGray).add_modifier(Modifier::BOLD))
        .highlight_symbol("> ");

    frame.render_stateful_widget(list, columns[0], list_state);

    // Right column: detail, goal progress, 7-day chart
    let right = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Min(8),
            Constraint::Length(8),
            Constraint::Length(10),
        ])
        .split(columns[1]);

    let detail = build_detail(state);
    let detail_widget = Paragraph::new(detail)
        .block(Block::default().borders(Borders::ALL).title(" Detail "))
        .wrap(Wrap { trim: false })
        .scroll((state.scroll_offset, 0));
    frame.render_widget(detail_widget, right[0]);

    frame.render_widget(build_progress(state), right[1]);
    draw_week_chart(frame, state, right[2]);

    // Footer help
    let help = Paragraph::new(
        " j/k:navigate  J/K:scroll  1-5:status  y/n/p:feedback  d:delete  q:quit",
    )
    .style(Style::default().fg(Color::DarkGray));
    frame.render_widget(help, body[1]);
}

fn build_detail<'a>(state: &'a AppState) -> Text<'a> {
    let Some(c) = state.current() else {
        return Text::raw("No candidature selected");
    };

    let mut lines: Vec<Line> = Vec::new();

    lines.push(Line::from(Span::styled(
        format!("{} at {}", c.role, c.company),
        Style::default().add_modifier(Modifier::BOLD),
    )));
    lines.push(Line::from(format!("Date: {}", c.date)));
    lines.push(Line::from(Span::styled(
        format!("Status: {}", c.status),
        status_style(&c.status),
    )));
    lines.push(Line::from(format!("Feedback: {}", c.feedback)));

    if let Some(platform) = &c.platform {
        lines.push(Line::from(format!("Platform: {}", platform)));
    }
    if let Some(link) = &c.link {
        lines.push(Line::from(format!("Link: {}", link)));
    }

    if let Some(notes) = &c.notes {
        lines.push(Line::from(""));
        lines.push(Line::from(Span::styled(
            "Notes",
            Style::default().add_modifier(Modifier::BOLD),
        )));
        for line in textwrap::fill(notes, 70).lines() {
            lines.push(Line::from(format!("  {}", line)));
        }
    }

    Text::from(lines)
}

fn build_progress(state: &AppState) -> Paragraph<'static> {
    let today = Local::now().date_naive();
    let progress = stats::goal_progress(&state.records, &state.goals, today);
    let responses = stats::response_stats(&state.records);

    let mut lines: Vec<Line> = Vec::new();
    lines.push(progress_line(
        "Today",
        progress.today_count,
        progress.daily_target,
        progress.daily_met,
    ));
    lines.push(progress_line(
        "Month",
        progress.month_count,
        progress.monthly_target,
        progress.monthly_met,
    ));
    lines.push(Line::from(format!(
        "Total: {}   Responses: {} ({:.1}%)",
        responses.total, responses.responded, responses.rate_percent
    )));

    let by_status: Vec<String> = stats::count_by_status(&state.records)
        .into_iter()
        .map(|(status, n)| format!("{}: {}", status, n))
        .collect();
    if !by_status.is_empty() {
        lines.push(Line::from(by_status.join("   ")));
    }

    Paragraph::new(Text::from(lines))
        .block(Block::default().borders(Borders::ALL).title(" Goals "))
        .wrap(Wrap { trim: true })
}

fn progress_line(label: &str, count: usize, target: u32, met: bool) -> Line<'static> {
    let style = if met {
        Style::default().fg(Color::Green)
    } else {
        Style::default().fg(Color::Yellow)
    };
    let marker = if met { "met" } else { "open" };
    Line::from(Span::styled(
        format!("{}: {} / {} ({})", label, count, target, marker),
        style,
    ))
}

fn draw_week_chart(frame: &mut Frame, state: &AppState, area: Rect) {
    let today = Local::now().date_naive();
    let series = stats::last_n_days(&state.records, today, 7);

    let bars: Vec<Bar> = series
        .iter()
        .map(|(date, count)| {
            let met = *count >= state.goals.daily_target as usize;
            let color = if met { Color::Green } else { Color::Blue };
            // Bar labels carry day-of-month only; the full date is in the title.
            Bar::default()
                .value(*count as u64)
                .label(Line::from(date[8..].to_string()))
                .style(Style::default().fg(color))
        })
        .collect();

    let chart = BarChart::default()
        .block(Block::default().borders(Borders::ALL).title(format!(
            " Last 7 days (target {}/day) ",
            state.goals.daily_target
        )))
        .bar_width(5)
        .bar_gap(2)
        .data(BarGroup::default().bars(&bars));

    frame.render_widget(chart, area);
}

fn status_icon(status: &str) -> &'static str {
    match status {
        "Submitted" => ">",
        "Under Review" => "*",
        "Interview" => "+",
        "Test" => "~",
        "Finished" => "-",
        _ => "?",
    }
}

fn status_style(status: &str) -> Style {
    match status {
        "Submitted" => Style::default().fg(Color::Blue),
        "Under Review" => Style::default().fg(Color::Yellow),
        "Interview" => Style::default().fg(Color::Green),
        "Test" => Style::default().fg(Color::Cyan),
        "Finished" => Style::default().fg(Color::Red),
        // Unknown labels are accepted and rendered unstyled.
        _ => Style::default(),
    }
}
