//! Read-only terminal dashboard for a site database.
//!
//! Three tabs: execution KPIs with the health score, the task tree with
//! derived statuses, and the budget overview. The dashboard never writes;
//! `r` reloads the database from disk to pick up CLI changes.

use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;

use chrono::{Local, NaiveDate};
use crossterm::event::{self, DisableMouseCapture, EnableMouseCapture, Event, KeyCode};
use crossterm::execute;
use crossterm::terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen};
use ratatui::{
    backend::Backend,
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    prelude::CrosstermBackend,
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Gauge, List, ListItem, Paragraph, Row, Table, TableState},
    Frame, Terminal,
};

use crate::db::{format_due_relative, format_priority, format_status, truncate, user_name, Database};
use crate::fields::Status;
use crate::finance::{budget_summary, format_budget_risk, BudgetRisk};
use crate::risk::{
    average_performance, delayed_task_count, format_risk, health_score, open_issue_count,
    predict_delay, HealthInputs, RiskLabel,
};
use crate::rollup::{ancestor_chain, compute_progress, compute_status};
use crate::site::Site;
use crate::tui::colors::{AMBER, DARK_GREEN, DARK_RED, GOLD};

/// Dashboard tabs.
#[derive(Clone, Copy, PartialEq)]
enum Tab {
    Overview,
    Tasks,
    Budget,
}

/// Main application state for the dashboard.
pub struct DashboardApp {
    db: Database,
    db_path: PathBuf,
    tab: Tab,
    task_state: TableState,
    task_rows: Vec<u64>,
    should_exit: bool,
}

impl DashboardApp {
    /// Create a new dashboard, loading the database from the specified path.
    pub fn new(db_path: &Path) -> io::Result<Self> {
        let db = Database::load(db_path);
        let mut app = DashboardApp {
            db,
            db_path: db_path.to_path_buf(),
            tab: Tab::Overview,
            task_state: TableState::default(),
            task_rows: Vec::new(),
            should_exit: false,
        };
        app.update_task_rows();
        Ok(app)
    }

    /// Reload the database from disk and refresh the task rows.
    fn refresh(&mut self) {
        self.db = Database::load(&self.db_path);
        self.update_task_rows();
    }

    /// Rebuild the task listing in tree order (roots first, children
    /// depth-first beneath their parent).
    fn update_task_rows(&mut self) {
        fn push_subtree(db: &Database, id: u64, out: &mut Vec<u64>) {
            for t in db.tasks.iter().filter(|t| t.parent == Some(id)) {
                if out.contains(&t.id) {
                    continue;
                }
                out.push(t.id);
                push_subtree(db, t.id, out);
            }
        }

        let mut rows = Vec::new();
        for t in &self.db.tasks {
            let is_root = match t.parent {
                None => true,
                Some(p) => !self.db.tasks.iter().any(|o| o.id == p),
            };
            if is_root && !rows.contains(&t.id) {
                rows.push(t.id);
                push_subtree(&self.db, t.id, &mut rows);
            }
        }
        // Tasks stuck inside a parent cycle are unreachable from any root;
        // list them flat at the end.
        for t in &self.db.tasks {
            if !rows.contains(&t.id) {
                rows.push(t.id);
            }
        }
        self.task_rows = rows;

        if self.task_state.selected().is_none() && !self.task_rows.is_empty() {
            self.task_state.select(Some(0));
        }
    }

    /// Handle keyboard input.
    fn handle_input(&mut self) -> io::Result<()> {
        if event::poll(Duration::from_millis(50))? {
            if let Event::Key(key) = event::read()? {
                match key.code {
                    KeyCode::Esc | KeyCode::Char('q') => {
                        self.should_exit = true;
                    }
                    KeyCode::Tab | KeyCode::Right => {
                        self.tab = match self.tab {
                            Tab::Overview => Tab::Tasks,
                            Tab::Tasks => Tab::Budget,
                            Tab::Budget => Tab::Overview,
                        };
                    }
                    KeyCode::Left => {
                        self.tab = match self.tab {
                            Tab::Overview => Tab::Budget,
                            Tab::Tasks => Tab::Overview,
                            Tab::Budget => Tab::Tasks,
                        };
                    }
                    KeyCode::Up => {
                        if self.tab == Tab::Tasks {
                            if let Some(selected) = self.task_state.selected() {
                                if selected > 0 {
                                    self.task_state.select(Some(selected - 1));
                                }
                            }
                        }
                    }
                    KeyCode::Down => {
                        if self.tab == Tab::Tasks {
                            if let Some(selected) = self.task_state.selected() {
                                if selected + 1 < self.task_rows.len() {
                                    self.task_state.select(Some(selected + 1));
                                }
                            }
                        }
                    }
                    KeyCode::Char('r') => {
                        self.refresh();
                    }
                    _ => {}
                }
            }
        }
        Ok(())
    }

    /// Main render function.
    fn render(&mut self, f: &mut Frame) {
        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Length(3), Constraint::Min(0), Constraint::Length(1)].as_ref())
            .split(f.area());

        self.render_header(f, chunks[0]);

        match self.tab {
            Tab::Overview => self.render_overview(f, chunks[1]),
            Tab::Tasks => self.render_tasks(f, chunks[1]),
            Tab::Budget => self.render_budget(f, chunks[1]),
        }

        self.render_status_bar(f, chunks[2]);
    }

    /// Render the site name and tab bar.
    fn render_header(&self, f: &mut Frame, area: Rect) {
        let site_name = Site::from_file(self.db_path.clone())
            .map(|s| s.display_name)
            .unwrap_or_else(|| "Site".to_string());

        let tab_span = |label: &str, tab: Tab| {
            if self.tab == tab {
                Span::styled(
                    format!(" {} ", label),
                    Style::default().bg(Color::Gray).fg(Color::Black),
                )
            } else {
                Span::raw(format!(" {} ", label))
            }
        };

        let header_text = vec![Line::from(vec![
            Span::styled(
                site_name.to_uppercase(),
                Style::default().add_modifier(Modifier::BOLD),
            ),
            Span::raw("   "),
            tab_span("Overview", Tab::Overview),
            tab_span("Tasks", Tab::Tasks),
            tab_span("Budget", Tab::Budget),
        ])];

        let header = Paragraph::new(header_text)
            .block(Block::default().borders(Borders::ALL))
            .alignment(Alignment::Center)
            .style(Style::default().fg(Color::White));

        f.render_widget(header, area);
    }

    /// Render the execution KPI overview.
    fn render_overview(&self, f: &mut Frame, area: Rect) {
        let today = Local::now().date_naive();
        let summary = budget_summary(&self.db.procurement, self.db.budget_limit);
        let avg = average_performance(&self.db.reports);
        let open = open_issue_count(&self.db.issues);
        let delayed = delayed_task_count(&self.db.tasks, today);
        let score = health_score(&HealthInputs {
            avg_performance: avg,
            open_issues: open,
            delayed_tasks: delayed,
            financial_risk: summary.financial_risk,
            supply_risk: summary.supply_risk,
        });

        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Length(3), Constraint::Min(0)])
            .split(area);

        let gauge_color = if score >= 70 {
            DARK_GREEN
        } else if score >= 40 {
            AMBER
        } else {
            DARK_RED
        };
        let gauge = Gauge::default()
            .block(Block::default().borders(Borders::ALL).title("Site Health"))
            .gauge_style(Style::default().fg(gauge_color))
            .percent(score as u16)
            .label(format!("{}/100", score));
        f.render_widget(gauge, chunks[0]);

        let (high, moderate) = self.delay_risk_counts(today);

        let kpi_text = vec![
            Line::from(""),
            Line::from(format!("  Average performance:  {:.1}%", avg)),
            Line::from(format!("  Open issues:          {}", open)),
            Line::from(format!("  Delayed tasks:        {}", delayed)),
            Line::from(format!("  Delay risk:           {} high, {} moderate", high, moderate)),
            Line::from(vec![
                Span::raw("  Budget status:        "),
                Span::styled(
                    format_budget_risk(summary.risk_level),
                    Style::default().fg(budget_color(summary.risk_level)),
                ),
            ]),
            Line::from(format!("  Users on site:        {}", self.db.users.len())),
            Line::from(format!("  Tasks tracked:        {}", self.db.tasks.len())),
            Line::from(format!("  Reports filed:        {}", self.db.reports.len())),
        ];

        let kpis = Paragraph::new(kpi_text)
            .block(Block::default().borders(Borders::ALL).title("Execution KPIs"));
        f.render_widget(kpis, chunks[1]);
    }

    /// Count non-complete tasks per predicted delay tier.
    fn delay_risk_counts(&self, today: NaiveDate) -> (usize, usize) {
        let mut high = 0usize;
        let mut moderate = 0usize;
        for t in &self.db.tasks {
            if compute_status(t, &self.db.tasks) == Status::Complete {
                continue;
            }
            match predict_delay(t, &self.db.reports, today) {
                RiskLabel::High => high += 1,
                RiskLabel::Moderate => moderate += 1,
                RiskLabel::Low => {}
            }
        }
        (high, moderate)
    }

    /// Render the task tree with derived statuses.
    fn render_tasks(&mut self, f: &mut Frame, area: Rect) {
        let today = Local::now().date_naive();

        let rows: Vec<Row> = self
            .task_rows
            .iter()
            .filter_map(|id| self.db.tasks.iter().find(|t| t.id == *id))
            .map(|t| {
                let status = compute_status(t, &self.db.tasks);
                let progress = compute_progress(t, &self.db.tasks);
                let depth = ancestor_chain(t.id, &self.db.tasks).len();
                let risk = predict_delay(t, &self.db.reports, today);
                let risk_cell = if status == Status::Complete {
                    Span::raw("-")
                } else {
                    Span::styled(format_risk(risk), Style::default().fg(risk_color(risk)))
                };
                Row::new(vec![
                    Span::raw(t.id.to_string()),
                    Span::styled(format_status(status), Style::default().fg(status_color(status))),
                    Span::raw(format!("{}%", progress)),
                    Span::raw(format_priority(t.priority)),
                    Span::raw(format_due_relative(t.due, today)),
                    risk_cell,
                    Span::raw(truncate(&user_name(&self.db, t.assignee), 16)),
                    Span::raw(format!("{}{}", "  ".repeat(depth), t.title)),
                ])
            })
            .collect();

        let table = Table::new(
            rows,
            [
                Constraint::Length(5),
                Constraint::Length(12),
                Constraint::Length(5),
                Constraint::Length(7),
                Constraint::Length(9),
                Constraint::Length(14),
                Constraint::Length(16),
                Constraint::Min(10),
            ],
        )
        .header(
            Row::new(vec!["ID", "Status", "Prog", "Pri", "Due", "Risk", "Assignee", "Title"])
                .style(Style::default().add_modifier(Modifier::BOLD)),
        )
        .block(Block::default().borders(Borders::ALL).title("Tasks"))
        .row_highlight_style(Style::default().bg(Color::Gray).fg(Color::Black));

        f.render_stateful_widget(table, area, &mut self.task_state);
    }

    /// Render the budget overview.
    fn render_budget(&self, f: &mut Frame, area: Rect) {
        let summary = budget_summary(&self.db.procurement, self.db.budget_limit);

        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Length(3), Constraint::Length(9), Constraint::Min(0)])
            .split(area);

        let used_pct = if summary.budget_limit > 0.0 {
            ((summary.total_spent / summary.budget_limit) * 100.0).min(100.0) as u16
        } else {
            0
        };
        let gauge = Gauge::default()
            .block(Block::default().borders(Borders::ALL).title("Budget Used"))
            .gauge_style(Style::default().fg(budget_color(summary.risk_level)))
            .percent(used_pct)
            .label(format!("{:.0} / {:.0}", summary.total_spent, summary.budget_limit));
        f.render_widget(gauge, chunks[0]);

        let projection = if summary.projection.is_empty() {
            "Stable spending".to_string()
        } else {
            summary
                .projection
                .iter()
                .enumerate()
                .map(|(i, v)| format!("+{} {:.0}", i + 1, v))
                .collect::<Vec<_>>()
                .join("  ")
        };

        let mut overview_text = vec![
            Line::from(format!("  Remaining:   {:.2}", summary.remaining)),
            Line::from(format!("  Burn rate:   {:.2} per order", summary.burn_rate)),
            Line::from(vec![
                Span::raw("  Status:      "),
                Span::styled(
                    format_budget_risk(summary.risk_level),
                    Style::default().fg(budget_color(summary.risk_level)),
                ),
            ]),
            Line::from(format!("  Supply risk: {:.0}", summary.supply_risk)),
            Line::from(format!("  Projection:  {}", projection)),
        ];
        if summary.anomaly {
            overview_text.push(Line::from(Span::styled(
                "  Large procurement anomaly detected",
                Style::default().fg(DARK_RED).add_modifier(Modifier::BOLD),
            )));
        }

        let overview = Paragraph::new(overview_text)
            .block(Block::default().borders(Borders::ALL).title("Financial Position"));
        f.render_widget(overview, chunks[1]);

        let category_items: Vec<ListItem> = summary
            .by_category
            .iter()
            .map(|(category, spend)| {
                ListItem::new(Line::from(format!("  {:<16} {:.2}", category, spend)))
            })
            .collect();

        let categories = List::new(category_items)
            .block(Block::default().borders(Borders::ALL).title("Spend by Category"));
        f.render_widget(categories, chunks[2]);
    }

    /// Render the status bar with context-appropriate help text.
    fn render_status_bar(&self, f: &mut Frame, area: Rect) {
        let status_text = match self.tab {
            Tab::Tasks => "Tab/←→ switch panel, ↑↓ move, r refresh, q/Esc quit",
            _ => "Tab/←→ switch panel, r refresh, q/Esc quit",
        };

        let status = Paragraph::new(status_text)
            .style(Style::default().bg(Color::Blue).fg(Color::White))
            .alignment(Alignment::Left);

        f.render_widget(status, area);
    }

    /// Main event loop for the dashboard.
    pub fn run<B: Backend>(&mut self, terminal: &mut Terminal<B>) -> io::Result<()> {
        loop {
            terminal.draw(|f| self.render(f))?;

            self.handle_input()?;

            if self.should_exit {
                break;
            }
        }
        Ok(())
    }
}

/// Accent color for a derived task status.
fn status_color(s: Status) -> Color {
    match s {
        Status::NotStarted => Color::Blue,
        Status::InProgress => GOLD,
        Status::OnHold => AMBER,
        Status::Complete => DARK_GREEN,
    }
}

/// Accent color for a delay risk tier.
fn risk_color(r: RiskLabel) -> Color {
    match r {
        RiskLabel::Low => DARK_GREEN,
        RiskLabel::Moderate => AMBER,
        RiskLabel::High => DARK_RED,
    }
}

/// Accent color for a budget risk band.
fn budget_color(r: BudgetRisk) -> Color {
    match r {
        BudgetRisk::Healthy => DARK_GREEN,
        BudgetRisk::Warning => AMBER,
        BudgetRisk::Critical => DARK_RED,
    }
}

/// Initialise and run the dashboard terminal user interface.
pub fn run_dashboard_tui(db_path: &Path) -> io::Result<()> {
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let mut app = DashboardApp::new(db_path)?;
    let result = app.run(&mut terminal);

    disable_raw_mode()?;
    execute!(
        terminal.backend_mut(),
        LeaveAlternateScreen,
        DisableMouseCapture
    )?;
    terminal.show_cursor()?;

    result
}
