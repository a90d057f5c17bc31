//! Command implementations for the CLI interface.
//!
//! This module contains all the command handlers that implement the various
//! subcommands available in the CLI, from personnel and task management to
//! the KPI dashboard and the TUI interface.

use clap::Subcommand;
use clap_complete::{generate, Shell};

use std::collections::HashMap;
use std::fs;
use std::path::Path;

use chrono::{Local, NaiveDate, TimeZone, Utc};

use crate::db::*;
use crate::fields::*;
use crate::finance::{budget_summary, format_budget_risk, BudgetRisk, PROJECTION_STEPS};
use crate::hierarchy::{can_assign, org_roots, team_members};
use crate::records::{DailyReport, Issue, ProcurementItem};
use crate::risk::{
    average_performance, delayed_task_count, format_risk, health_score, open_issue_count,
    predict_delay, HealthInputs, RiskLabel,
};
use crate::rollup::{ancestor_chain, compute_progress, compute_status, stale_ancestors};
use crate::task::Task;
use crate::tui::dashboard::run_dashboard_tui;
use crate::user::User;

#[derive(Subcommand)]
pub enum Commands {
    /// Launch the site dashboard interface.
    Ui,

    /// Register a site user.
    Register {
        /// Full name of the user.
        full_name: String,
        #[arg(long)]
        email: String,
        /// Organisational role.
        #[arg(long, value_enum)]
        role: Role,
        #[arg(long)]
        department: String,
        /// Manager this user reports to (ID or name).
        #[arg(long)]
        reports_to: Option<String>,
    },

    /// List registered users.
    Users,

    /// Print the reports-to organisation tree.
    Org {
        /// Show a manager's team instead (the manager plus direct reports).
        #[arg(long)]
        team: Option<String>,
    },

    /// Add a new task.
    Add {
        /// Short title for the task.
        title: String,
        /// Optional longer description.
        #[arg(long)]
        desc: Option<String>,
        /// Parent task ID or title; makes this a subtask.
        #[arg(long)]
        parent: Option<String>,
        /// Assignee (user ID or name). Defaults to the acting user.
        #[arg(long)]
        assignee: Option<String>,
        /// Due date: YYYY-MM-DD.
        #[arg(long)]
        due: Option<NaiveDate>,
        /// Priority: low | medium | high.
        #[arg(long, value_enum, default_value_t = Priority::Medium)]
        priority: Priority,
        /// Quantitative goal (units of work).
        #[arg(long)]
        total_target: Option<f64>,
        /// Status: not-started | in-progress | on-hold | complete.
        #[arg(long, value_enum, default_value_t = Status::NotStarted)]
        status: Status,
    },

    /// List tasks with derived status and progress.
    List {
        /// Include completed tasks.
        #[arg(long)]
        all: bool,
        /// Filter by derived status.
        #[arg(long, value_enum)]
        status: Option<Status>,
        /// Render as a tree across parent-child relationships.
        #[arg(long)]
        tree: bool,
    },

    /// View a single task by ID or title.
    View {
        /// Task ID or title to view
        id: String,
    },

    /// Update fields on a task. Status changes cascade to ancestors.
    Update {
        /// Task ID or title to update
        id: String,
        #[arg(long)]
        title: Option<String>,
        #[arg(long)]
        desc: Option<String>,
        #[arg(long, value_enum)]
        status: Option<Status>,
        /// Stored completion percentage (leaf tasks), 0-100.
        #[arg(long)]
        progress: Option<u8>,
        #[arg(long, value_enum)]
        priority: Option<Priority>,
        #[arg(long)]
        due: Option<NaiveDate>,
        /// Assignee (user ID or name).
        #[arg(long)]
        assignee: Option<String>,
        /// Parent task ID or title.
        #[arg(long)]
        parent: Option<String>,
        /// Clear due date.
        #[arg(long)]
        clear_due: bool,
        /// Clear parent.
        #[arg(long)]
        clear_parent: bool,
    },

    /// File a daily progress report against a task.
    Report {
        /// Task ID or title.
        task: String,
        /// Reporting user (ID or name); defaults to the acting user, then to
        /// the task assignee.
        #[arg(long)]
        by: Option<String>,
        /// Report date: YYYY-MM-DD. Defaults to today.
        #[arg(long)]
        date: Option<NaiveDate>,
        /// Planned quantity for the day. Zero means a qualitative report.
        #[arg(long, default_value_t = 0.0)]
        target: f64,
        /// Achieved quantity for the day.
        #[arg(long, default_value_t = 0.0)]
        actual: f64,
        #[arg(long)]
        comment: Option<String>,
        /// Quality assessment: very-good | medium | low.
        #[arg(long, value_enum)]
        quality: Option<QualityLevel>,
        /// Delay reason. May be repeated.
        #[arg(long = "delay", value_enum)]
        delays: Vec<DelayReason>,
    },

    /// Manage issues.
    Issue {
        #[command(subcommand)]
        action: IssueAction,
    },

    /// Manage procurement orders.
    Procure {
        #[command(subcommand)]
        action: ProcureAction,
    },

    /// Set the site budget limit.
    Budget {
        /// Approved budget amount.
        amount: f64,
    },

    /// Print site execution KPIs and the health score.
    Dashboard,

    /// Print the executive financial overview.
    Executive,

    /// Manage sites.
    Site {
        #[command(subcommand)]
        action: SiteAction,
    },

    /// Export tasks to CSV format.
    Export {
        /// Output file path (default: tasks.csv)
        #[arg(long, short)]
        output: Option<String>,
        /// Include completed tasks
        #[arg(long)]
        all: bool,
    },

    /// Create timestamped backup of the current site database.
    Backup,

    /// Generate shell completion scripts.
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

#[derive(Subcommand)]
pub enum IssueAction {
    /// Raise an issue against a task.
    Add {
        /// Short title for the issue.
        title: String,
        /// Task ID or title the issue belongs to.
        #[arg(long)]
        task: String,
        /// Category: performance | quality | procurement | logistics | safety | other.
        #[arg(long, value_enum, default_value_t = IssueCategory::Other)]
        category: IssueCategory,
        /// Owner (user ID or name); defaults to the acting user, then to the
        /// task assignee.
        #[arg(long)]
        owner: Option<String>,
        /// Due date: YYYY-MM-DD.
        #[arg(long)]
        due: Option<NaiveDate>,
    },
    /// Mark an issue resolved.
    Close {
        /// Issue ID.
        id: u64,
    },
    /// List issues.
    List {
        /// Include resolved and closed issues.
        #[arg(long)]
        all: bool,
    },
}

#[derive(Subcommand)]
pub enum ProcureAction {
    /// Record a procurement order.
    Add {
        /// Short title for the order.
        title: String,
        #[arg(long)]
        supplier: String,
        #[arg(long)]
        quantity: f64,
        #[arg(long)]
        unit_cost: f64,
        /// Spend category (defaults to "Other" in rollups).
        #[arg(long)]
        category: Option<String>,
        /// Priority: low | medium | high.
        #[arg(long, value_enum, default_value_t = Priority::Medium)]
        priority: Priority,
        /// Expected delivery date: YYYY-MM-DD.
        #[arg(long)]
        expected: Option<NaiveDate>,
        /// Status: pending | ordered | en-cours | delivered.
        #[arg(long, value_enum, default_value_t = ProcurementStatus::Pending)]
        status: ProcurementStatus,
    },
    /// Mark an order delivered.
    Receive {
        /// Order ID.
        id: u64,
    },
    /// List procurement orders.
    List,
}

#[derive(Subcommand)]
pub enum SiteAction {
    /// Create a new site.
    New {
        /// Site name.
        name: String,
    },
    /// List known sites.
    List,
}

/// Launch the terminal dashboard.
pub fn cmd_ui(db_path: &Path) {
    if let Err(e) = run_dashboard_tui(db_path) {
        eprintln!("UI error: {e}");
        std::process::exit(1);
    }
}

/// Resolve the acting user passed via --as, if any.
fn resolve_acting(db: &Database, acting: Option<&str>) -> Option<u64> {
    let identifier = acting?;
    match resolve_user_identifier(identifier, db) {
        Ok(id) => Some(id),
        Err(e) => {
            eprintln!("Error resolving acting user: {}", e);
            std::process::exit(1);
        }
    }
}

/// Register a new site user.
pub fn cmd_register(
    db: &mut Database,
    db_path: &Path,
    full_name: String,
    email: String,
    role: Role,
    department: String,
    reports_to: Option<String>,
) {
    let manager_id = match reports_to {
        Some(identifier) => match resolve_user_identifier(&identifier, db) {
            Ok(id) => Some(id),
            Err(e) => {
                eprintln!("Error resolving manager: {}", e);
                std::process::exit(1);
            }
        },
        None => None,
    };

    let id = db.next_user_id();
    db.users.push(User {
        id,
        full_name,
        email,
        role,
        department,
        reports_to: manager_id,
        created_at_utc: Utc::now().timestamp(),
    });
    if let Err(e) = db.save(db_path) {
        eprintln!("Failed to save DB: {e}");
        std::process::exit(1);
    }
    println!("Registered user {}", id);
}

/// Print the user roster.
pub fn cmd_users(db: &Database) {
    println!(
        "{:<5} {:<22} {:<22} {:<14} {}",
        "ID", "Name", "Role", "Department", "Reports to"
    );
    for u in &db.users {
        let manager = u
            .reports_to
            .map(|m| user_name(db, m))
            .unwrap_or_else(|| "-".into());
        println!(
            "{:<5} {:<22} {:<22} {:<14} {}",
            u.id,
            truncate(&u.full_name, 22),
            format_role(u.role),
            truncate(&u.department, 14),
            manager
        );
    }
}

/// Print the reports-to organisation tree, or a manager's team.
pub fn cmd_org(db: &Database, team: Option<String>) {
    if let Some(identifier) = team {
        let manager_id = match resolve_user_identifier(&identifier, db) {
            Ok(id) => id,
            Err(e) => {
                eprintln!("Error resolving user: {}", e);
                std::process::exit(1);
            }
        };
        println!("Team of {}:", user_name(db, manager_id));
        for member in team_members(manager_id, &db.users) {
            println!("  {} ({})", member.full_name, format_role(member.role));
        }
        return;
    }

    fn print_subtree(db: &Database, id: u64, depth: usize, visited: &mut std::collections::HashSet<u64>) {
        for sub in db.users.iter().filter(|u| u.reports_to == Some(id)) {
            if !visited.insert(sub.id) {
                continue;
            }
            println!(
                "{}- {} [{}] (#{})",
                "  ".repeat(depth),
                sub.full_name,
                format_role(sub.role),
                sub.id
            );
            print_subtree(db, sub.id, depth + 1, visited);
        }
    }

    let mut visited = std::collections::HashSet::new();
    for root in org_roots(&db.users) {
        if !visited.insert(root.id) {
            continue;
        }
        println!("{} [{}] (#{})", root.full_name, format_role(root.role), root.id);
        print_subtree(db, root.id, 1, &mut visited);
    }
}

/// Add a new task to the database.
pub fn cmd_add(
    db: &mut Database,
    db_path: &Path,
    acting: Option<&str>,
    title: String,
    desc: Option<String>,
    parent: Option<String>,
    assignee: Option<String>,
    due: Option<NaiveDate>,
    priority: Priority,
    total_target: Option<f64>,
    status: Status,
) {
    let acting_id = resolve_acting(db, acting);

    let assignee_id = match assignee {
        Some(identifier) => match resolve_user_identifier(&identifier, db) {
            Ok(id) => id,
            Err(e) => {
                eprintln!("Error resolving assignee: {}", e);
                std::process::exit(1);
            }
        },
        None => match acting_id {
            Some(id) => id,
            None => {
                eprintln!("Specify an assignee with --assignee or an acting user with --as.");
                std::process::exit(1);
            }
        },
    };

    // Assignment authorisation: the acting user must reach the assignee
    // through the reports-to hierarchy.
    let created_by = match acting_id {
        Some(id) => {
            if !can_assign(id, assignee_id, &db.users) {
                eprintln!(
                    "{} is not in the management subtree of {}; assignment refused.",
                    user_name(db, assignee_id),
                    user_name(db, id)
                );
                std::process::exit(1);
            }
            id
        }
        None => assignee_id,
    };

    let id = db.next_task_id();

    let parent_id = if let Some(parent_str) = parent {
        match resolve_task_identifier(&parent_str, db) {
            Ok(pid) => Some(pid),
            Err(e) => {
                eprintln!("Error resolving parent: {}", e);
                std::process::exit(1);
            }
        }
    } else {
        None
    };

    let now_utc = Utc::now().timestamp();
    let task = Task {
        id,
        title,
        description: desc,
        status,
        priority,
        assignee: assignee_id,
        created_by,
        due,
        total_target,
        progress: 0,
        parent: parent_id,
        created_at_utc: now_utc,
        updated_at_utc: now_utc,
    };
    db.tasks.push(task);

    // A new subtask can change every ancestor's derived status.
    let synced = apply_cascade(db, id, now_utc);

    if let Err(e) = db.save(db_path) {
        eprintln!("Failed to save DB: {e}");
        std::process::exit(1);
    }
    println!("Added task {}", id);
    if synced > 0 {
        println!("Synced {} ancestor status(es)", synced);
    }
}

/// Apply the upward status cascade for a task, child before parent.
/// Returns the number of ancestors whose stored status changed.
fn apply_cascade(db: &mut Database, task_id: u64, now_utc: i64) -> usize {
    let updates = stale_ancestors(task_id, &db.tasks);
    let count = updates.len();
    for (id, status) in updates {
        if let Some(t) = db.get_task_mut(id) {
            t.status = status;
            t.updated_at_utc = now_utc;
        }
    }
    count
}

/// List tasks with optional filtering.
pub fn cmd_list(db: &Database, all: bool, status: Option<Status>, tree: bool) {
    let today = Local::now().date_naive();

    let filtered: Vec<&Task> = db
        .tasks
        .iter()
        .filter(|t| {
            let derived = compute_status(t, &db.tasks);
            if !all && derived == Status::Complete {
                return false;
            }
            if let Some(s) = status {
                if derived != s {
                    return false;
                }
            }
            true
        })
        .collect();

    if tree {
        // Compute depths for indentation using ancestry in the full DB.
        let mut depth_map: HashMap<u64, usize> = HashMap::new();
        for t in &db.tasks {
            depth_map.insert(t.id, ancestor_chain(t.id, &db.tasks).len());
        }
        print_task_table(db, &filtered, today, Some(&depth_map));
    } else {
        print_task_table(db, &filtered, today, None);
    }
}

/// View detailed information about a specific task.
pub fn cmd_view(db: &Database, id: String) {
    let task_id = match resolve_task_identifier(&id, db) {
        Ok(id) => id,
        Err(e) => {
            eprintln!("Error resolving task: {}", e);
            std::process::exit(1);
        }
    };

    let Some(task) = db.get_task(task_id).cloned() else {
        eprintln!("Task {} not found.", task_id);
        std::process::exit(1);
    };
    let today = Local::now().date_naive();
    let derived = compute_status(&task, &db.tasks);
    let progress = compute_progress(&task, &db.tasks);
    let risk = predict_delay(&task, &db.reports, today);

    println!("ID:           {}", task.id);
    println!("Title:        {}", task.title);
    println!("Status:       {}", format_status(derived));
    if derived != task.status {
        println!("Stored:       {}", format_status(task.status));
    }
    println!("Progress:     {}%", progress);
    println!("Priority:     {}", format_priority(task.priority));
    println!("Assignee:     {}", user_name(db, task.assignee));
    println!("Created by:   {}", user_name(db, task.created_by));
    println!("Due:          {}", match task.due { Some(d) => format!("{d} ({})", format_due_relative(Some(d), today)), None => "-".into() });
    println!("Delay risk:   {}", format_risk(risk));
    if let Some(target) = task.total_target {
        println!("Target:       {}", target);
    }
    println!("Parent:       {}", task.parent.map(|p| p.to_string()).unwrap_or_else(|| "-".into()));
    println!("Created UTC:  {}", Utc.timestamp_opt(task.created_at_utc, 0).single().unwrap().to_rfc3339());
    println!("Updated UTC:  {}", Utc.timestamp_opt(task.updated_at_utc, 0).single().unwrap().to_rfc3339());
    println!("Description:\n{}\n", task.description.unwrap_or_else(|| "-".into()));

    let chain = ancestor_chain(task_id, &db.tasks);
    if chain.is_empty() {
        println!("Ancestors: -");
    } else {
        println!(
            "Ancestors (closest first): {}",
            chain.iter().map(|i| i.to_string()).collect::<Vec<_>>().join(" -> ")
        );
    }

    println!("Subtasks:");
    let child_map = build_children_map(&db.tasks);
    if child_map.contains_key(&task_id) {
        // Depth-first print.
        fn dfs(db: &Database, child_map: &std::collections::BTreeMap<u64, Vec<u64>>, id: u64, depth: usize) {
            if let Some(children) = child_map.get(&id) {
                for &c in children {
                    if let Some(t) = db.get_task(c) {
                        println!(
                            "{}- {} [{}] (#{})",
                            "  ".repeat(depth),
                            t.title,
                            format_status(compute_status(t, &db.tasks)),
                            t.id
                        );
                        dfs(db, child_map, c, depth + 1);
                    }
                }
            }
        }
        dfs(db, &child_map, task_id, 1);
    } else {
        println!("  -");
    }

    let reports: Vec<&DailyReport> = db.reports.iter().filter(|r| r.task == task_id).collect();
    if !reports.is_empty() {
        println!("Reports ({}):", reports.len());
        for r in reports.iter().rev().take(3).rev() {
            if r.is_quantitative() {
                let pct = r.actual_quantity / r.target_quantity * 100.0;
                println!("  {} {}: {}/{} ({:.0}%)", r.date, user_name(db, r.user), r.actual_quantity, r.target_quantity, pct);
            } else {
                println!("  {} {}: {} [{}]", r.date, user_name(db, r.user), r.comment.as_deref().unwrap_or("-"), format_quality(r.quality));
            }
            if !r.delay_reasons.is_empty() {
                let reasons: Vec<&str> = r.delay_reasons.iter().map(|&d| format_delay_reason(d)).collect();
                println!("      delays: {}", reasons.join(", "));
            }
        }
    }

    let open: Vec<&Issue> = db
        .issues
        .iter()
        .filter(|i| i.task == task_id && i.status == IssueStatus::Open)
        .collect();
    if !open.is_empty() {
        println!("Open issues:");
        for i in &open {
            println!("  #{} {} [{}]", i.id, i.title, format_issue_status(i.status));
        }
    }
}

/// Update an existing task's fields.
pub fn cmd_update(
    db: &mut Database,
    db_path: &Path,
    acting: Option<&str>,
    id: String,
    title: Option<String>,
    desc: Option<String>,
    status: Option<Status>,
    progress: Option<u8>,
    priority: Option<Priority>,
    due: Option<NaiveDate>,
    assignee: Option<String>,
    parent: Option<String>,
    clear_due: bool,
    clear_parent: bool,
) {
    let task_id = match resolve_task_identifier(&id, db) {
        Ok(id) => id,
        Err(e) => {
            eprintln!("Error resolving task: {}", e);
            std::process::exit(1);
        }
    };

    let acting_id = resolve_acting(db, acting);

    let assignee_id = match assignee {
        Some(identifier) => match resolve_user_identifier(&identifier, db) {
            Ok(uid) => {
                if let Some(me) = acting_id {
                    if !can_assign(me, uid, &db.users) {
                        eprintln!(
                            "{} is not in the management subtree of {}; assignment refused.",
                            user_name(db, uid),
                            user_name(db, me)
                        );
                        std::process::exit(1);
                    }
                }
                Some(uid)
            }
            Err(e) => {
                eprintln!("Error resolving assignee: {}", e);
                std::process::exit(1);
            }
        },
        None => None,
    };

    // Resolve parent if provided
    let parent_id = if let Some(parent_str) = parent {
        match resolve_task_identifier(&parent_str, db) {
            Ok(pid) => Some(pid),
            Err(e) => {
                eprintln!("Error resolving parent: {}", e);
                std::process::exit(1);
            }
        }
    } else {
        None
    };

    // Validate parent won't cause cycles before getting mutable borrow
    if let Some(pid) = parent_id {
        if pid == task_id {
            eprintln!("Parent cannot equal child.");
            std::process::exit(1);
        }
        // Detect cycle.
        let mut cur = Some(pid);
        let mut hops = 0;
        while let Some(p) = cur {
            if p == task_id {
                eprintln!("Setting parent would create a cycle.");
                std::process::exit(1);
            }
            cur = db.get_task(p).and_then(|x| x.parent);
            hops += 1;
            if hops > 64 {
                break;
            }
        }
    }

    let now_utc = Utc::now().timestamp();
    {
        let Some(t) = db.get_task_mut(task_id) else {
            eprintln!("Task {} not found.", task_id);
            std::process::exit(1);
        };

        if let Some(v) = title {
            t.title = v;
        }
        if let Some(v) = desc {
            t.description = Some(v);
        }
        if let Some(v) = status {
            t.status = v;
        }
        if let Some(v) = progress {
            t.progress = v.min(100);
        }
        if let Some(v) = priority {
            t.priority = v;
        }
        if let Some(v) = due {
            t.due = Some(v);
        }
        if clear_due {
            t.due = None;
        }
        if let Some(v) = assignee_id {
            t.assignee = v;
        }
        if let Some(v) = parent_id {
            t.parent = Some(v);
        }
        if clear_parent {
            t.parent = None;
        }
        t.updated_at_utc = now_utc;
    }

    let synced = apply_cascade(db, task_id, now_utc);

    if let Err(e) = db.save(db_path) {
        eprintln!("Failed to save DB: {e}");
        std::process::exit(1);
    }
    println!("Updated task {}", task_id);
    if synced > 0 {
        println!("Synced {} ancestor status(es)", synced);
    }
}

/// File a daily progress report.
pub fn cmd_report(
    db: &mut Database,
    db_path: &Path,
    acting: Option<&str>,
    task: String,
    by: Option<String>,
    date: Option<NaiveDate>,
    target: f64,
    actual: f64,
    comment: Option<String>,
    quality: Option<QualityLevel>,
    delays: Vec<DelayReason>,
) {
    let task_id = match resolve_task_identifier(&task, db) {
        Ok(id) => id,
        Err(e) => {
            eprintln!("Error resolving task: {}", e);
            std::process::exit(1);
        }
    };

    let acting_id = resolve_acting(db, acting);
    let user_id = match by {
        Some(identifier) => match resolve_user_identifier(&identifier, db) {
            Ok(id) => id,
            Err(e) => {
                eprintln!("Error resolving reporting user: {}", e);
                std::process::exit(1);
            }
        },
        None => acting_id.unwrap_or_else(|| db.get_task(task_id).map(|t| t.assignee).unwrap_or(0)),
    };

    let id = db.next_report_id();
    let report = DailyReport {
        id,
        task: task_id,
        user: user_id,
        date: date.unwrap_or_else(|| Local::now().date_naive()),
        target_quantity: target,
        actual_quantity: actual,
        comment,
        quality,
        delay_reasons: delays,
        created_at_utc: Utc::now().timestamp(),
    };
    let quantitative = report.is_quantitative();
    let ratio = if quantitative { actual / target * 100.0 } else { 0.0 };
    db.reports.push(report);

    if let Err(e) = db.save(db_path) {
        eprintln!("Failed to save DB: {e}");
        std::process::exit(1);
    }
    if quantitative {
        println!("Filed report {} ({:.0}% of target)", id, ratio);
    } else {
        println!("Filed report {}", id);
    }
}

/// Handle issue subcommands.
pub fn cmd_issue(db: &mut Database, db_path: &Path, acting: Option<&str>, action: IssueAction) {
    match action {
        IssueAction::Add { title, task, category, owner, due } => {
            let task_id = match resolve_task_identifier(&task, db) {
                Ok(id) => id,
                Err(e) => {
                    eprintln!("Error resolving task: {}", e);
                    std::process::exit(1);
                }
            };
            let acting_id = resolve_acting(db, acting);
            let owner_id = match owner {
                Some(identifier) => match resolve_user_identifier(&identifier, db) {
                    Ok(id) => id,
                    Err(e) => {
                        eprintln!("Error resolving owner: {}", e);
                        std::process::exit(1);
                    }
                },
                None => acting_id
                    .unwrap_or_else(|| db.get_task(task_id).map(|t| t.assignee).unwrap_or(0)),
            };

            let id = db.next_issue_id();
            db.issues.push(Issue {
                id,
                task: task_id,
                title,
                category,
                owner: owner_id,
                due,
                status: IssueStatus::Open,
                created_at_utc: Utc::now().timestamp(),
            });
            if let Err(e) = db.save(db_path) {
                eprintln!("Failed to save DB: {e}");
                std::process::exit(1);
            }
            println!("Raised issue {}", id);
        }
        IssueAction::Close { id } => {
            let Some(issue) = db.get_issue_mut(id) else {
                eprintln!("Issue {} not found.", id);
                std::process::exit(1);
            };
            issue.status = IssueStatus::Resolved;
            if let Err(e) = db.save(db_path) {
                eprintln!("Failed to save DB: {e}");
                std::process::exit(1);
            }
            println!("Resolved issue {}", id);
        }
        IssueAction::List { all } => {
            println!(
                "{:<5} {:<12} {:<12} {:<18} {:<6} {}",
                "ID", "Status", "Category", "Owner", "Task", "Title"
            );
            for i in db.issues.iter().filter(|i| {
                all || !matches!(i.status, IssueStatus::Resolved | IssueStatus::Closed)
            }) {
                println!(
                    "{:<5} {:<12} {:<12} {:<18} {:<6} {}",
                    i.id,
                    format_issue_status(i.status),
                    format_issue_category(i.category),
                    truncate(&user_name(db, i.owner), 18),
                    i.task,
                    i.title
                );
            }
        }
    }
}

/// Format an issue category for display.
fn format_issue_category(c: IssueCategory) -> &'static str {
    match c {
        IssueCategory::Performance => "Performance",
        IssueCategory::Quality => "Quality",
        IssueCategory::Procurement => "Procurement",
        IssueCategory::Logistics => "Logistics",
        IssueCategory::Safety => "Safety",
        IssueCategory::Other => "Other",
    }
}

/// Handle procurement subcommands.
pub fn cmd_procure(db: &mut Database, db_path: &Path, action: ProcureAction) {
    match action {
        ProcureAction::Add {
            title,
            supplier,
            quantity,
            unit_cost,
            category,
            priority,
            expected,
            status,
        } => {
            let id = db.next_item_id();
            let item = ProcurementItem {
                id,
                title,
                supplier,
                quantity,
                unit_cost,
                category,
                priority,
                status,
                expected,
                created_at_utc: Utc::now().timestamp(),
            };
            let cost = item.cost();
            db.procurement.push(item);
            if let Err(e) = db.save(db_path) {
                eprintln!("Failed to save DB: {e}");
                std::process::exit(1);
            }
            println!("Recorded order {} (cost {:.2})", id, cost);
            if db.budget_limit > 0.0 && cost > db.budget_limit * 0.25 {
                println!("Warning: single order exceeds a quarter of the site budget.");
            }
        }
        ProcureAction::Receive { id } => {
            let Some(item) = db.get_item_mut(id) else {
                eprintln!("Order {} not found.", id);
                std::process::exit(1);
            };
            item.status = ProcurementStatus::Delivered;
            if let Err(e) = db.save(db_path) {
                eprintln!("Failed to save DB: {e}");
                std::process::exit(1);
            }
            println!("Order {} delivered", id);
        }
        ProcureAction::List => {
            println!(
                "{:<5} {:<10} {:>8} {:>10} {:>10} {:<12} {:<14} {}",
                "ID", "Status", "Qty", "Unit", "Cost", "Category", "Supplier", "Title"
            );
            for p in &db.procurement {
                println!(
                    "{:<5} {:<10} {:>8} {:>10.2} {:>10.2} {:<12} {:<14} {}",
                    p.id,
                    format_procurement_status(p.status),
                    p.quantity,
                    p.unit_cost,
                    p.cost(),
                    truncate(p.category.as_deref().unwrap_or("Other"), 12),
                    truncate(&p.supplier, 14),
                    p.title
                );
            }
        }
    }
}

/// Set the site budget limit.
pub fn cmd_budget(db: &mut Database, db_path: &Path, amount: f64) {
    if amount < 0.0 {
        eprintln!("Budget cannot be negative.");
        std::process::exit(1);
    }
    db.budget_limit = amount;
    if let Err(e) = db.save(db_path) {
        eprintln!("Failed to save DB: {e}");
        std::process::exit(1);
    }
    println!("Budget limit set to {:.2}", amount);
}

/// Print site execution KPIs and the health score.
pub fn cmd_dashboard(db: &Database) {
    let today = Local::now().date_naive();
    let summary = budget_summary(&db.procurement, db.budget_limit);
    let avg = average_performance(&db.reports);
    let open = open_issue_count(&db.issues);
    let delayed = delayed_task_count(&db.tasks, today);
    let score = health_score(&HealthInputs {
        avg_performance: avg,
        open_issues: open,
        delayed_tasks: delayed,
        financial_risk: summary.financial_risk,
        supply_risk: summary.supply_risk,
    });

    let mut high = 0usize;
    let mut moderate = 0usize;
    for t in &db.tasks {
        if compute_status(t, &db.tasks) == Status::Complete {
            continue;
        }
        match predict_delay(t, &db.reports, today) {
            RiskLabel::High => high += 1,
            RiskLabel::Moderate => moderate += 1,
            RiskLabel::Low => {}
        }
    }

    println!("Site health:      {}/100", score);
    println!("Avg performance:  {:.1}%", avg);
    println!("Open issues:      {}", open);
    println!("Delayed tasks:    {}", delayed);
    println!("Delay risk:       {} high, {} moderate", high, moderate);
    println!("Budget status:    {}", format_budget_risk(summary.risk_level));
}

/// Print the executive financial overview.
pub fn cmd_executive(db: &Database) {
    let summary = budget_summary(&db.procurement, db.budget_limit);

    println!("Executive Financial Overview");
    println!();
    println!("Budget limit:   {:.2}", summary.budget_limit);
    println!("Total spent:    {:.2}", summary.total_spent);
    println!("Remaining:      {:.2}", summary.remaining);
    println!("Burn rate:      {:.2} per order", summary.burn_rate);
    println!("Status:         {}", format_budget_risk(summary.risk_level));
    println!("Supply risk:    {:.0}", summary.supply_risk);

    if !summary.by_category.is_empty() {
        println!();
        println!("Spend by category:");
        for (category, spend) in &summary.by_category {
            println!("  {:<16} {:.2}", category, spend);
        }
    }

    println!();
    if summary.projection.is_empty() {
        println!("Projection:     Stable spending");
    } else {
        println!("Projection (next {} orders):", PROJECTION_STEPS);
        for (i, remaining) in summary.projection.iter().enumerate() {
            println!("  +{}  {:.2}", i + 1, remaining);
        }
    }

    let mut note = String::from("Financial performance stable.");
    if summary.risk_level == BudgetRisk::Critical {
        note = String::from("Budget critical. Immediate cost restructuring required.");
    }
    if summary.anomaly {
        note.push_str(" Large procurement anomaly detected.");
    }
    println!();
    println!("{}", note);
}

/// Export tasks to CSV format.
pub fn cmd_export(db: &Database, output: Option<String>, all: bool) {
    let output_path = output.unwrap_or_else(|| "tasks.csv".to_string());

    let tasks: Vec<&Task> = db
        .tasks
        .iter()
        .filter(|task| all || compute_status(task, &db.tasks) != Status::Complete)
        .collect();

    let mut csv_content = String::new();
    csv_content.push_str(
        "ID,Title,Status,ComputedStatus,Progress,Priority,Assignee,CreatedBy,Due,Parent,CreatedUTC,UpdatedUTC\n",
    );

    let task_count = tasks.len();
    for task in &tasks {
        let due = task.due.map(|d| d.to_string()).unwrap_or("-".to_string());
        let parent = task.parent.map(|p| p.to_string()).unwrap_or("-".to_string());
        let created = Utc.timestamp_opt(task.created_at_utc, 0).single().unwrap().to_rfc3339();
        let updated = Utc.timestamp_opt(task.updated_at_utc, 0).single().unwrap().to_rfc3339();

        // Escape CSV fields that contain commas or quotes
        let escape_csv = |s: &str| {
            if s.contains(',') || s.contains('"') || s.contains('\n') {
                format!("\"{}\"", s.replace('"', "\\\""))
            } else {
                s.to_string()
            }
        };

        csv_content.push_str(&format!(
            "{},{},{},{},{},{},{},{},{},{},{},{}\n",
            task.id,
            escape_csv(&task.title),
            format_status(task.status),
            format_status(compute_status(task, &db.tasks)),
            compute_progress(task, &db.tasks),
            format_priority(task.priority),
            escape_csv(&user_name(db, task.assignee)),
            escape_csv(&user_name(db, task.created_by)),
            escape_csv(&due),
            escape_csv(&parent),
            escape_csv(&created),
            escape_csv(&updated)
        ));
    }

    match std::fs::write(&output_path, csv_content) {
        Ok(_) => {
            println!("Exported {} task(s) to {}", task_count, output_path);
        }
        Err(e) => {
            eprintln!("Failed to write CSV file: {}", e);
            std::process::exit(1);
        }
    }
}

/// Create a timestamped backup of the database file.
pub fn create_backup(db_path: &Path) -> Result<String, std::io::Error> {
    if !db_path.exists() {
        return Err(std::io::Error::new(
            std::io::ErrorKind::NotFound,
            "Database file does not exist",
        ));
    }

    let parent_dir = db_path.parent().unwrap_or_else(|| Path::new("."));
    let backup_dir = parent_dir.join("backup");

    fs::create_dir_all(&backup_dir)?;

    let timestamp = Local::now().format("%Y-%m-%d_%H-%M-%S");
    let db_filename = db_path
        .file_name()
        .and_then(|name| name.to_str())
        .unwrap_or("site.json");

    let backup_filename = format!("{}_{}", timestamp, db_filename);
    let backup_path = backup_dir.join(backup_filename);

    fs::copy(db_path, &backup_path)?;

    Ok(backup_path.to_string_lossy().to_string())
}

/// Create a timestamped backup of the current site database.
pub fn cmd_backup(db_path: &Path) {
    match create_backup(db_path) {
        Ok(backup_path) => {
            println!("Created backup: {}", backup_path);
        }
        Err(e) => {
            eprintln!("Failed to create backup: {}", e);
            std::process::exit(1);
        }
    }
}

/// Handle site subcommands.
pub fn cmd_site(ct_dir: &Path, action: SiteAction) {
    use crate::site::{create_site, discover_sites};
    match action {
        SiteAction::New { name } => match create_site(&name, ct_dir) {
            Ok(site) => println!("Created site '{}' at {}", site.display_name, site.file_path.display()),
            Err(e) => {
                eprintln!("Failed to create site: {}", e);
                std::process::exit(1);
            }
        },
        SiteAction::List => match discover_sites(ct_dir) {
            Ok(sites) => {
                if sites.is_empty() {
                    println!("No sites found. Create one with: ct site new <name>");
                } else {
                    for site in sites {
                        println!("{:<24} {}", site.display_name, site.name);
                    }
                }
            }
            Err(e) => {
                eprintln!("Failed to list sites: {}", e);
                std::process::exit(1);
            }
        },
    }
}

/// Generate shell completion scripts.
pub fn cmd_completions(shell: Shell) {
    use clap::CommandFactory;
    let mut cmd = crate::cli::Cli::command();
    generate(shell, &mut cmd, "ct", &mut std::io::stdout());
}
