//! Delay risk prediction and site health scoring.

use chrono::NaiveDate;

use crate::fields::{IssueStatus, Status};
use crate::records::{DailyReport, Issue};
use crate::rollup::compute_status;
use crate::task::Task;

/// Predicted delay risk tier for a task.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RiskLabel {
    Low,
    Moderate,
    High,
}

/// Format a risk label for display.
pub fn format_risk(r: RiskLabel) -> &'static str {
    match r {
        RiskLabel::Low => "Low Risk",
        RiskLabel::Moderate => "Moderate Risk",
        RiskLabel::High => "High Risk",
    }
}

/// Reports below this performance ratio count as a poor day.
const POOR_RATIO: f64 = 0.7;
/// Days-remaining window inside which repeated poor days escalate to High.
const CRUNCH_WINDOW_DAYS: i64 = 5;

/// Classify the delay risk of `task` from its recent reporting trend.
///
/// Looks at the last three reports filed for the task, in list order
/// (reports are appended chronologically by the CLI). A report counts as
/// poor when `actual / target < 0.7`; a zero target makes the ratio
/// undefined and the report is never counted as poor. Two or more poor days
/// with fewer than five days to the due date reads High Risk; any poor day
/// reads Moderate; otherwise Low.
pub fn predict_delay(task: &Task, reports: &[DailyReport], today: NaiveDate) -> RiskLabel {
    let for_task: Vec<&DailyReport> = reports.iter().filter(|r| r.task == task.id).collect();
    let recent = &for_task[for_task.len().saturating_sub(3)..];

    let poor = recent
        .iter()
        .filter(|r| r.is_quantitative() && r.actual_quantity / r.target_quantity < POOR_RATIO)
        .count();

    // A task without a due date has no crunch window to violate.
    let days_left = task.due.map(|d| (d - today).num_days());

    if poor >= 2 && days_left.is_some_and(|d| d < CRUNCH_WINDOW_DAYS) {
        return RiskLabel::High;
    }
    if poor >= 1 {
        return RiskLabel::Moderate;
    }
    RiskLabel::Low
}

/// Normalised inputs to the health score. Callers are expected to supply
/// sane ranges; no input clamping is applied.
#[derive(Debug, Clone, Copy)]
pub struct HealthInputs {
    /// Mean performance ratio across quantitative reports, as a percentage.
    pub avg_performance: f64,
    pub open_issues: usize,
    pub delayed_tasks: usize,
    /// Discrete financial risk score from the budget rollup.
    pub financial_risk: f64,
    /// Supply risk score from the budget rollup.
    pub supply_risk: f64,
}

/// Weighted 0-100 site health score.
pub fn health_score(inputs: &HealthInputs) -> u8 {
    let mut score = 100.0;
    score -= (100.0 - inputs.avg_performance) * 0.3;
    score -= inputs.open_issues as f64 * 2.0;
    score -= inputs.delayed_tasks as f64 * 3.0;
    score -= inputs.financial_risk * 0.2;
    score -= inputs.supply_risk * 0.1;
    score.clamp(0.0, 100.0).round() as u8
}

/// Mean performance across quantitative reports, as a percentage.
/// Reads 100 when no quantitative report exists.
pub fn average_performance(reports: &[DailyReport]) -> f64 {
    let quantitative: Vec<&DailyReport> = reports.iter().filter(|r| r.is_quantitative()).collect();
    if quantitative.is_empty() {
        return 100.0;
    }
    let sum: f64 = quantitative
        .iter()
        .map(|r| r.actual_quantity / r.target_quantity * 100.0)
        .sum();
    sum / quantitative.len() as f64
}

/// Count of open issues.
pub fn open_issue_count(issues: &[Issue]) -> usize {
    issues.iter().filter(|i| i.status == IssueStatus::Open).count()
}

/// Count of tasks past their due date whose effective status is not
/// Complete.
pub fn delayed_task_count(tasks: &[Task], today: NaiveDate) -> usize {
    tasks
        .iter()
        .filter(|t| {
            t.due.is_some_and(|d| d < today) && compute_status(t, tasks) != Status::Complete
        })
        .count()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fields::Priority;

    fn task(id: u64, due: Option<NaiveDate>) -> Task {
        Task {
            id,
            title: format!("Task {id}"),
            description: None,
            status: Status::InProgress,
            priority: Priority::Medium,
            assignee: 1,
            created_by: 1,
            due,
            total_target: Some(100.0),
            progress: 0,
            parent: None,
            created_at_utc: 0,
            updated_at_utc: 0,
        }
    }

    fn report(task: u64, target: f64, actual: f64) -> DailyReport {
        DailyReport {
            id: 0,
            task,
            user: 1,
            date: NaiveDate::from_ymd_opt(2025, 6, 1).unwrap(),
            target_quantity: target,
            actual_quantity: actual,
            comment: None,
            quality: None,
            delay_reasons: Vec::new(),
            created_at_utc: 0,
        }
    }

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 6, d).unwrap()
    }

    #[test]
    fn test_two_poor_days_near_due_is_high() {
        let t = task(1, Some(day(13)));
        let reports = vec![
            report(1, 100.0, 50.0),
            report(1, 100.0, 60.0),
            report(1, 100.0, 90.0),
        ];
        // Due in 3 days with two poor days out of the last three.
        assert_eq!(predict_delay(&t, &reports, day(10)), RiskLabel::High);
    }

    #[test]
    fn test_poor_days_far_from_due_is_moderate() {
        let t = task(1, Some(day(30)));
        let reports = vec![
            report(1, 100.0, 50.0),
            report(1, 100.0, 60.0),
            report(1, 100.0, 90.0),
        ];
        assert_eq!(predict_delay(&t, &reports, day(10)), RiskLabel::Moderate);
    }

    #[test]
    fn test_healthy_trend_is_low() {
        let t = task(1, Some(day(13)));
        let reports = vec![
            report(1, 100.0, 90.0),
            report(1, 100.0, 95.0),
            report(1, 100.0, 100.0),
        ];
        assert_eq!(predict_delay(&t, &reports, day(10)), RiskLabel::Low);
    }

    #[test]
    fn test_only_last_three_reports_count() {
        let t = task(1, Some(day(13)));
        // Two poor days early in the list, then three good ones.
        let reports = vec![
            report(1, 100.0, 10.0),
            report(1, 100.0, 20.0),
            report(1, 100.0, 90.0),
            report(1, 100.0, 95.0),
            report(1, 100.0, 100.0),
        ];
        assert_eq!(predict_delay(&t, &reports, day(10)), RiskLabel::Low);
    }

    #[test]
    fn test_zero_target_never_counts_as_poor() {
        let t = task(1, Some(day(11)));
        let reports = vec![
            report(1, 0.0, 0.0),
            report(1, 0.0, 0.0),
            report(1, 100.0, 90.0),
        ];
        assert_eq!(predict_delay(&t, &reports, day(10)), RiskLabel::Low);
    }

    #[test]
    fn test_overdue_counts_inside_crunch_window() {
        let t = task(1, Some(day(5)));
        let reports = vec![report(1, 100.0, 10.0), report(1, 100.0, 20.0)];
        // Negative days left still satisfies the < 5 window.
        assert_eq!(predict_delay(&t, &reports, day(10)), RiskLabel::High);
    }

    #[test]
    fn test_no_due_date_caps_at_moderate() {
        let t = task(1, None);
        let reports = vec![report(1, 100.0, 10.0), report(1, 100.0, 20.0)];
        assert_eq!(predict_delay(&t, &reports, day(10)), RiskLabel::Moderate);
    }

    #[test]
    fn test_other_tasks_reports_ignored() {
        let t = task(1, Some(day(11)));
        let reports = vec![report(2, 100.0, 10.0), report(2, 100.0, 20.0)];
        assert_eq!(predict_delay(&t, &reports, day(10)), RiskLabel::Low);
    }

    #[test]
    fn test_health_score_perfect() {
        let inputs = HealthInputs {
            avg_performance: 100.0,
            open_issues: 0,
            delayed_tasks: 0,
            financial_risk: 0.0,
            supply_risk: 0.0,
        };
        assert_eq!(health_score(&inputs), 100);
    }

    #[test]
    fn test_health_score_clamps_at_zero() {
        let inputs = HealthInputs {
            avg_performance: 100.0,
            open_issues: 50,
            delayed_tasks: 0,
            financial_risk: 0.0,
            supply_risk: 0.0,
        };
        assert_eq!(health_score(&inputs), 0);
    }

    #[test]
    fn test_health_score_weights() {
        let inputs = HealthInputs {
            avg_performance: 80.0,
            open_issues: 3,
            delayed_tasks: 2,
            financial_risk: 50.0,
            supply_risk: 20.0,
        };
        // 100 - 6 - 6 - 6 - 10 - 2 = 70
        assert_eq!(health_score(&inputs), 70);
    }

    #[test]
    fn test_average_performance_skips_qualitative() {
        let reports = vec![report(1, 100.0, 50.0), report(1, 0.0, 0.0), report(1, 100.0, 100.0)];
        assert_eq!(average_performance(&reports), 75.0);
        assert_eq!(average_performance(&[]), 100.0);
    }

    #[test]
    fn test_delayed_task_count_uses_computed_status() {
        let mut parent = task(1, Some(day(5)));
        parent.status = Status::InProgress;
        let mut child = task(2, None);
        child.parent = Some(1);
        child.status = Status::Complete;
        let tasks = vec![parent, child];
        // Parent is overdue but its subtree computes Complete.
        assert_eq!(delayed_task_count(&tasks, day(10)), 0);
    }
}
