//! # CT - Construction-Site Execution Tracker
//!
//! A command-line tracker for construction-site execution with hierarchical
//! task organisation, daily progress reporting and an optional terminal
//! dashboard (TUI).
//!
//! ## Key Features
//!
//! - **Hierarchical Tasks**: Tasks and subtasks to arbitrary depth, with
//!   status and progress derived from the subtree
//! - **Site Organisation**: Personnel with a reports-to hierarchy; work can
//!   only be assigned within the acting user's management subtree
//! - **Daily Reporting**: Quantitative (target/actual) and qualitative
//!   reports feeding delay-risk prediction
//! - **Issues & Procurement**: Issue tracking and purchase orders rolled up
//!   into budget burn-rate, depletion projection and supply risk
//! - **KPIs**: A weighted 0-100 site health score and an executive financial
//!   overview, on the command line or in the TUI dashboard
//! - **Multi-Site Support**: Manage multiple sites with site-scoped (local
//!   .json) db files
//!
//! ## Quick Start
//!
//! ```bash
//! # Create a site and register people
//! ct site new "North Tower"
//! ct register "Rachid Benali" --email rb@site.test --role project-manager --department Management
//! ct register "Sara Leroy" --email sl@site.test --role foreman --department Civil --reports-to "Rachid Benali"
//!
//! # Track work
//! ct add "Pour foundation slab" --assignee "Sara Leroy" --as "Rachid Benali" --due 2025-07-01
//! ct add "Install rebar" --parent "Pour foundation slab" --assignee "Sara Leroy" --as "Rachid Benali"
//! ct report "Install rebar" --target 40 --actual 32
//!
//! # Review
//! ct list --tree
//! ct dashboard
//! ct ui
//! ```
//!
//! Data is stored locally in `~/.ct/` with each site as a separate JSON file.
//! We recommend you source control this folder via `git init` and back it up
//! periodically.

use std::path::PathBuf;

use clap::Parser;

pub mod cli;
pub mod cmd;
pub mod db;
pub mod fields;
pub mod finance;
pub mod hierarchy;
pub mod records;
pub mod risk;
pub mod rollup;
pub mod site;
pub mod task;
pub mod user;
pub mod tui {
    pub mod colors;
    pub mod dashboard;
}

use cli::Cli;
use cmd::*;
use db::Database;
use site::{get_most_recent_site, Site};

fn main() {
    let cli = Cli::parse();

    // Determine CT directory
    let ct_dir = if let Some(db_path) = cli.db.as_ref() {
        db_path.parent().unwrap_or_else(|| std::path::Path::new(".")).to_path_buf()
    } else {
        let home = std::env::var("HOME").unwrap_or_else(|_| ".".to_string());
        let ct_dir = PathBuf::from(home).join(".ct");
        if let Err(e) = std::fs::create_dir_all(&ct_dir) {
            eprintln!("Failed to create ct directory {}: {}", ct_dir.display(), e);
            std::process::exit(1);
        }
        ct_dir
    };

    let Cli { db: db_flag, acting, command } = cli;

    match command {
        // Commands that operate on the site directory, not a single database.
        Commands::Site { action } => cmd_site(&ct_dir, action),
        Commands::Completions { shell } => cmd_completions(shell),

        command => {
            // Determine the database file to use: --db, the most recently
            // modified site, or a fresh default site.
            let db_path = db_flag.unwrap_or_else(|| {
                match get_most_recent_site(&ct_dir) {
                    Ok(Some(site)) => site.file_path,
                    _ => {
                        let default_site = Site::new("Default", &ct_dir);
                        if let Err(e) = default_site.create_if_not_exists() {
                            eprintln!("Failed to create default site: {}", e);
                            std::process::exit(1);
                        }
                        default_site.file_path
                    }
                }
            });

            let mut db = Database::load(&db_path);
            let acting = acting.as_deref();

            match command {
                Commands::Site { .. } | Commands::Completions { .. } => {
                    unreachable!("handled above")
                }

                Commands::Ui => cmd_ui(&db_path),

                Commands::Register { full_name, email, role, department, reports_to } =>
                    cmd_register(&mut db, &db_path, full_name, email, role, department, reports_to),

                Commands::Users => cmd_users(&db),

                Commands::Org { team } => cmd_org(&db, team),

                Commands::Add { title, desc, parent, assignee, due, priority, total_target, status } =>
                    cmd_add(&mut db, &db_path, acting, title, desc, parent, assignee, due,
                            priority, total_target, status),

                Commands::List { all, status, tree } => cmd_list(&db, all, status, tree),

                Commands::View { id } => cmd_view(&db, id),

                Commands::Update { id, title, desc, status, progress, priority, due, assignee,
                                   parent, clear_due, clear_parent } =>
                    cmd_update(&mut db, &db_path, acting, id, title, desc, status, progress,
                               priority, due, assignee, parent, clear_due, clear_parent),

                Commands::Report { task, by, date, target, actual, comment, quality, delays } =>
                    cmd_report(&mut db, &db_path, acting, task, by, date, target, actual,
                               comment, quality, delays),

                Commands::Issue { action } => cmd_issue(&mut db, &db_path, acting, action),

                Commands::Procure { action } => cmd_procure(&mut db, &db_path, action),

                Commands::Budget { amount } => cmd_budget(&mut db, &db_path, amount),

                Commands::Dashboard => cmd_dashboard(&db),

                Commands::Executive => cmd_executive(&db),

                Commands::Export { output, all } => cmd_export(&db, output, all),

                Commands::Backup => cmd_backup(&db_path),
            }
        }
    }
}
