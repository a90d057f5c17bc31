//! Operational records: daily reports, issues and procurement orders.
//!
//! These are append-mostly collections the KPI and financial rollups read
//! from; none of them carry hierarchy of their own.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::fields::{DelayReason, IssueCategory, IssueStatus, Priority, ProcurementStatus, QualityLevel};

/// End-of-day progress report filed against a task.
///
/// A report is quantitative when `target_quantity` is non-zero; the
/// `actual / target` ratio is undefined otherwise and consumers must skip it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DailyReport {
    pub id: u64,
    pub task: u64,
    pub user: u64,
    pub date: NaiveDate,
    #[serde(default)]
    pub target_quantity: f64,
    #[serde(default)]
    pub actual_quantity: f64,
    pub comment: Option<String>,
    pub quality: Option<QualityLevel>,
    #[serde(default)]
    pub delay_reasons: Vec<DelayReason>,
    pub created_at_utc: i64,
}

impl DailyReport {
    /// Whether this report carries a measurable target.
    pub fn is_quantitative(&self) -> bool {
        self.target_quantity > 0.0
    }
}

/// A problem raised against a task, tracked to resolution.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Issue {
    pub id: u64,
    pub task: u64,
    pub title: String,
    pub category: IssueCategory,
    pub owner: u64,
    pub due: Option<NaiveDate>,
    pub status: IssueStatus,
    pub created_at_utc: i64,
}

/// A purchase order for site materials or equipment.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProcurementItem {
    pub id: u64,
    pub title: String,
    pub supplier: String,
    pub quantity: f64,
    pub unit_cost: f64,
    /// Spend category; rollups group uncategorised items under "Other".
    pub category: Option<String>,
    pub priority: Priority,
    pub status: ProcurementStatus,
    pub expected: Option<NaiveDate>,
    pub created_at_utc: i64,
}

impl ProcurementItem {
    /// Total cost of the order. Every downstream financial figure derives
    /// from this product.
    pub fn cost(&self) -> f64 {
        self.quantity * self.unit_cost
    }
}
