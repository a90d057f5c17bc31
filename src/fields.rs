//! Enumerations and field types for site execution tracking.
//!
//! This module defines the structured data types used to categorise tasks,
//! personnel, daily reports, issues and procurement orders.

use clap::ValueEnum;
use serde::{Deserialize, Serialize};

/// Task execution status.
///
/// For a task with subtasks the displayed status is derived from the subtree
/// (see `rollup::compute_status`); the stored value is authoritative only for
/// leaf tasks.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, ValueEnum, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum Status {
    #[serde(alias = "Not Started")]
    NotStarted,
    #[serde(alias = "In Progress")]
    InProgress,
    #[serde(alias = "On Hold")]
    OnHold,
    #[serde(alias = "Complete")]
    Complete,
}

/// Priority classification shared by tasks and procurement orders.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, ValueEnum, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum Priority {
    Low,
    Medium,
    High,
}

/// Organisational titles on a construction site.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, ValueEnum, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum Role {
    ProjectManager,
    ConstructionManager,
    QualityManager,
    ProcurementManager,
    HseManager,
    PlanningManager,
    Supervisor,
    Inspector,
    Buyer,
    Foreman,
    Worker,
}

/// Issue lifecycle status.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, ValueEnum, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum IssueStatus {
    Open,
    InProgress,
    Blocked,
    Resolved,
    Closed,
}

/// Issue classification.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, ValueEnum, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum IssueCategory {
    Performance,
    Quality,
    Procurement,
    Logistics,
    Safety,
    Other,
}

/// Procurement order status.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, ValueEnum, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum ProcurementStatus {
    Pending,
    Ordered,
    #[serde(alias = "En Cours")]
    EnCours,
    Delivered,
}

/// Work quality assessment attached to qualitative daily reports.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, ValueEnum, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum QualityLevel {
    VeryGood,
    Medium,
    Low,
}

/// Reasons a crew may cite for a slow reporting day.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, ValueEnum, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum DelayReason {
    Materials,
    ToolsEquipment,
    Logistics,
    Manpower,
    Weather,
    ClientDesign,
    Safety,
    Other,
}
