//! Database operations and utility functions for site tracking.
//!
//! This module provides the `Database` struct holding a site's personnel,
//! tasks, daily reports, issues and procurement orders, along with formatting
//! helpers and identifier resolution used across the CLI.

use std::collections::{BTreeMap, HashMap};
use std::fs::{self, File};
use std::io::{Read, Write};
use std::path::Path;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::fields::*;
use crate::records::{DailyReport, Issue, ProcurementItem};
use crate::rollup::{compute_progress, compute_status};
use crate::task::Task;
use crate::user::User;

/// In-memory database for a single construction site.
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct Database {
    /// Approved budget for the site, set via `ct budget`.
    #[serde(default)]
    pub budget_limit: f64,
    #[serde(default)]
    pub users: Vec<User>,
    #[serde(default)]
    pub tasks: Vec<Task>,
    #[serde(default)]
    pub reports: Vec<DailyReport>,
    #[serde(default)]
    pub issues: Vec<Issue>,
    #[serde(default)]
    pub procurement: Vec<ProcurementItem>,
}

impl Database {
    /// Load database from JSON file, creating a new empty database if file doesn't exist.
    pub fn load(path: &Path) -> Self {
        if !path.exists() {
            return Database::default();
        }
        let mut buf = String::new();
        match File::open(path).and_then(|mut f| f.read_to_string(&mut buf)) {
            Ok(_) => match serde_json::from_str(&buf) {
                Ok(db) => db,
                Err(e) => {
                    eprintln!("Error parsing DB, starting fresh: {e}");
                    Database::default()
                }
            },
            Err(e) => {
                eprintln!("Error reading DB, starting fresh: {e}");
                Database::default()
            }
        }
    }

    /// Save database to JSON file using atomic write (temp file + rename).
    pub fn save(&self, path: &Path) -> std::io::Result<()> {
        // Atomic-ish write via temp + rename.
        let tmp = path.with_extension("json.tmp");
        let mut f = File::create(&tmp)?;
        let data = serde_json::to_string_pretty(self).unwrap();
        f.write_all(data.as_bytes())?;
        f.flush()?;
        fs::rename(tmp, path)?;
        Ok(())
    }

    /// Generate the next available task ID.
    pub fn next_task_id(&self) -> u64 {
        self.tasks.iter().map(|t| t.id).max().unwrap_or(0) + 1
    }

    /// Generate the next available user ID.
    pub fn next_user_id(&self) -> u64 {
        self.users.iter().map(|u| u.id).max().unwrap_or(0) + 1
    }

    /// Generate the next available daily report ID.
    pub fn next_report_id(&self) -> u64 {
        self.reports.iter().map(|r| r.id).max().unwrap_or(0) + 1
    }

    /// Generate the next available issue ID.
    pub fn next_issue_id(&self) -> u64 {
        self.issues.iter().map(|i| i.id).max().unwrap_or(0) + 1
    }

    /// Generate the next available procurement order ID.
    pub fn next_item_id(&self) -> u64 {
        self.procurement.iter().map(|p| p.id).max().unwrap_or(0) + 1
    }

    /// Get a task by ID.
    pub fn get_task(&self, id: u64) -> Option<&Task> {
        self.tasks.iter().find(|t| t.id == id)
    }

    /// Get a mutable reference to a task by ID.
    pub fn get_task_mut(&mut self, id: u64) -> Option<&mut Task> {
        let idx = self.tasks.iter().position(|t| t.id == id)?;
        self.tasks.get_mut(idx)
    }

    /// Get a user by ID.
    pub fn get_user(&self, id: u64) -> Option<&User> {
        self.users.iter().find(|u| u.id == id)
    }

    /// Get an issue by ID.
    pub fn get_issue_mut(&mut self, id: u64) -> Option<&mut Issue> {
        let idx = self.issues.iter().position(|i| i.id == id)?;
        self.issues.get_mut(idx)
    }

    /// Get a procurement order by ID.
    pub fn get_item_mut(&mut self, id: u64) -> Option<&mut ProcurementItem> {
        let idx = self.procurement.iter().position(|p| p.id == id)?;
        self.procurement.get_mut(idx)
    }
}

/// Format a task status for display.
pub fn format_status(s: Status) -> &'static str {
    match s {
        Status::NotStarted => "Not Started",
        Status::InProgress => "In Progress",
        Status::OnHold => "On Hold",
        Status::Complete => "Complete",
    }
}

/// Format a priority for display.
pub fn format_priority(p: Priority) -> &'static str {
    match p {
        Priority::Low => "Low",
        Priority::Medium => "Medium",
        Priority::High => "High",
    }
}

/// Format a role for display.
pub fn format_role(r: Role) -> &'static str {
    match r {
        Role::ProjectManager => "Project Manager",
        Role::ConstructionManager => "Construction Manager",
        Role::QualityManager => "Quality Manager",
        Role::ProcurementManager => "Procurement Manager",
        Role::HseManager => "HSE Manager",
        Role::PlanningManager => "Planning Manager",
        Role::Supervisor => "Supervisor",
        Role::Inspector => "Inspector",
        Role::Buyer => "Buyer",
        Role::Foreman => "Foreman",
        Role::Worker => "Worker",
    }
}

/// Format an issue status for display.
pub fn format_issue_status(s: IssueStatus) -> &'static str {
    match s {
        IssueStatus::Open => "Open",
        IssueStatus::InProgress => "In Progress",
        IssueStatus::Blocked => "Blocked",
        IssueStatus::Resolved => "Resolved",
        IssueStatus::Closed => "Closed",
    }
}

/// Format a procurement status for display.
pub fn format_procurement_status(s: ProcurementStatus) -> &'static str {
    match s {
        ProcurementStatus::Pending => "Pending",
        ProcurementStatus::Ordered => "Ordered",
        ProcurementStatus::EnCours => "En Cours",
        ProcurementStatus::Delivered => "Delivered",
    }
}

/// Format a quality level for display.
pub fn format_quality(q: Option<QualityLevel>) -> &'static str {
    match q {
        Some(QualityLevel::VeryGood) => "Very Good",
        Some(QualityLevel::Medium) => "Medium",
        Some(QualityLevel::Low) => "Low",
        None => "-",
    }
}

/// Format a delay reason for display.
pub fn format_delay_reason(r: DelayReason) -> &'static str {
    match r {
        DelayReason::Materials => "Materials",
        DelayReason::ToolsEquipment => "Tools / Equipment",
        DelayReason::Logistics => "Logistics",
        DelayReason::Manpower => "Manpower",
        DelayReason::Weather => "Weather",
        DelayReason::ClientDesign => "Client / Design",
        DelayReason::Safety => "Safety",
        DelayReason::Other => "Other",
    }
}

/// Format a due date relative to today ("today", "tomorrow", "in 3d", "2d late").
pub fn format_due_relative(due: Option<NaiveDate>, today: NaiveDate) -> String {
    match due {
        None => "-".into(),
        Some(d) => {
            let delta = d - today;
            if delta.num_days() == 0 {
                "today".into()
            } else if delta.num_days() == 1 {
                "tomorrow".into()
            } else if delta.num_days() > 1 {
                format!("in {}d", delta.num_days())
            } else {
                format!("{}d late", -delta.num_days())
            }
        }
    }
}

/// Truncate a string to a maximum width, adding ellipsis if needed.
pub fn truncate(s: &str, width: usize) -> String {
    if s.chars().count() <= width {
        s.to_string()
    } else {
        let mut out = String::new();
        for (i, ch) in s.chars().enumerate() {
            if i + 1 >= width {
                out.push('…');
                break;
            }
            out.push(ch);
        }
        out
    }
}

/// Build a map of parent task IDs to their children's IDs.
pub fn build_children_map(tasks: &[Task]) -> BTreeMap<u64, Vec<u64>> {
    let mut map: BTreeMap<u64, Vec<u64>> = BTreeMap::new();
    for t in tasks {
        if let Some(p) = t.parent {
            map.entry(p).or_default().push(t.id);
        }
    }
    for v in map.values_mut() {
        v.sort_unstable();
    }
    map
}

/// Display name for a user ID, falling back to the raw ID when the
/// reference dangles.
pub fn user_name(db: &Database, id: u64) -> String {
    db.get_user(id)
        .map(|u| u.full_name.clone())
        .unwrap_or_else(|| format!("#{id}"))
}

/// Print tasks in a formatted table with derived status and progress,
/// with optional tree indentation.
pub fn print_task_table(
    db: &Database,
    tasks: &[&Task],
    today: NaiveDate,
    id_to_depth: Option<&HashMap<u64, usize>>,
) {
    // Header.
    println!(
        "{:<5} {:<12} {:>5} {:<7} {:<10} {:<18} {}",
        "ID", "Status", "Prog", "Pri", "Due", "Assignee", "Title"
    );
    for t in tasks {
        let indent = id_to_depth
            .and_then(|m| m.get(&t.id).copied())
            .unwrap_or(0);
        let indent_str = "  ".repeat(indent);
        let status = compute_status(t, &db.tasks);
        let progress = compute_progress(t, &db.tasks);
        let due = format_due_relative(t.due, today);
        println!(
            "{:<5} {:<12} {:>4}% {:<7} {:<10} {:<18} {}{}",
            t.id,
            format_status(status),
            progress,
            format_priority(t.priority),
            due,
            truncate(&user_name(db, t.assignee), 18),
            indent_str,
            t.title,
        );
    }
}

/// Resolve a task identifier (either ID or title) to a task ID.
/// Returns an error if the title has multiple matches and suggests using ID instead.
pub fn resolve_task_identifier(identifier: &str, db: &Database) -> Result<u64, String> {
    // Try parsing as ID first
    if let Ok(id) = identifier.parse::<u64>() {
        if db.get_task(id).is_some() {
            return Ok(id);
        } else {
            return Err(format!("Task with ID {} not found", id));
        }
    }

    // Search by title (case-insensitive)
    let matches: Vec<&Task> = db
        .tasks
        .iter()
        .filter(|task| task.title.to_lowercase() == identifier.to_lowercase())
        .collect();

    match matches.len() {
        0 => Err(format!("No task found with title '{}'", identifier)),
        1 => Ok(matches[0].id),
        _ => {
            let mut error_msg = format!("Multiple tasks found with title '{}':\n", identifier);
            for task in matches {
                error_msg.push_str(&format!("  ID {}: {}\n", task.id, task.title));
            }
            error_msg.push_str("Please use the specific ID instead.");
            Err(error_msg)
        }
    }
}

/// Resolve a user identifier (either ID or full name) to a user ID.
pub fn resolve_user_identifier(identifier: &str, db: &Database) -> Result<u64, String> {
    if let Ok(id) = identifier.parse::<u64>() {
        if db.get_user(id).is_some() {
            return Ok(id);
        } else {
            return Err(format!("User with ID {} not found", id));
        }
    }

    let matches: Vec<&User> = db
        .users
        .iter()
        .filter(|u| u.full_name.to_lowercase() == identifier.to_lowercase())
        .collect();

    match matches.len() {
        0 => Err(format!("No user found with name '{}'", identifier)),
        1 => Ok(matches[0].id),
        _ => {
            let mut error_msg = format!("Multiple users found with name '{}':\n", identifier);
            for u in matches {
                error_msg.push_str(&format!("  ID {}: {} ({})\n", u.id, u.full_name, format_role(u.role)));
            }
            error_msg.push_str("Please use the specific ID instead.");
            Err(error_msg)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn user(id: u64, name: &str) -> User {
        User {
            id,
            full_name: name.to_string(),
            email: format!("u{id}@site.test"),
            role: Role::Worker,
            department: "Civil".to_string(),
            reports_to: None,
            created_at_utc: Utc::now().timestamp(),
        }
    }

    #[test]
    fn test_resolve_user_by_name_and_id() {
        let mut db = Database::default();
        db.users.push(user(1, "Amine Kaci"));
        db.users.push(user(2, "Sara Leroy"));

        assert_eq!(resolve_user_identifier("2", &db), Ok(2));
        assert_eq!(resolve_user_identifier("amine kaci", &db), Ok(1));
        assert!(resolve_user_identifier("3", &db).is_err());
        assert!(resolve_user_identifier("Nobody", &db).is_err());
    }

    #[test]
    fn test_resolve_user_ambiguous_name() {
        let mut db = Database::default();
        db.users.push(user(1, "Sara Leroy"));
        db.users.push(user(2, "Sara Leroy"));

        let err = resolve_user_identifier("Sara Leroy", &db).unwrap_err();
        assert!(err.contains("Multiple users"));
    }

    #[test]
    fn test_format_due_relative() {
        let today = NaiveDate::from_ymd_opt(2025, 6, 10).unwrap();
        assert_eq!(format_due_relative(Some(today), today), "today");
        assert_eq!(
            format_due_relative(NaiveDate::from_ymd_opt(2025, 6, 13), today),
            "in 3d"
        );
        assert_eq!(
            format_due_relative(NaiveDate::from_ymd_opt(2025, 6, 8), today),
            "2d late"
        );
        assert_eq!(format_due_relative(None, today), "-");
    }
}
