//! Task data structure.
//!
//! This module defines the core `Task` struct that represents a single work
//! package on site, including hierarchy, assignment and timing information.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::fields::{Priority, Status};

/// A work package with assignment, scheduling and hierarchy metadata.
///
/// Tasks are self-referential: a task whose `parent` points at another task is
/// a subtask, to arbitrary depth. The stored `status` and `progress` are
/// authoritative for leaf tasks only; tasks with children derive both from
/// their subtree.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Task {
    pub id: u64,
    pub title: String,
    pub description: Option<String>,
    pub status: Status,
    pub priority: Priority,
    /// User responsible for execution.
    pub assignee: u64,
    /// User who created the task.
    pub created_by: u64,
    pub due: Option<NaiveDate>,
    /// Quantitative goal (units of work), when the task is measured.
    pub total_target: Option<f64>,
    /// Stored completion percentage, 0-100. Meaningful for leaf tasks.
    #[serde(default)]
    pub progress: u8,
    pub parent: Option<u64>,
    pub created_at_utc: i64,
    pub updated_at_utc: i64,
}
