//! Budget rollup over procurement orders.
//!
//! Every figure here derives from one fact per order, `quantity × unit_cost`,
//! aggregated against the site budget limit. All order statuses count toward
//! spend: money is committed at order time, not at delivery.

use std::collections::BTreeMap;

use crate::fields::ProcurementStatus;
use crate::records::ProcurementItem;

/// Budget risk banding from remaining funds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BudgetRisk {
    Healthy,
    Warning,
    Critical,
}

/// Format a budget risk band for display.
pub fn format_budget_risk(r: BudgetRisk) -> &'static str {
    match r {
        BudgetRisk::Healthy => "Healthy",
        BudgetRisk::Warning => "Warning",
        BudgetRisk::Critical => "Critical",
    }
}

/// Number of forward burn-rate steps in the depletion projection.
pub const PROJECTION_STEPS: usize = 5;

/// A single order larger than this share of the budget flags an anomaly.
const ANOMALY_SHARE: f64 = 0.25;

/// Aggregated financial picture of the site.
#[derive(Debug, Clone)]
pub struct BudgetSummary {
    pub budget_limit: f64,
    pub total_spent: f64,
    /// Funds left, floored at zero.
    pub remaining: f64,
    /// Average spend per order; zero when there are no orders.
    pub burn_rate: f64,
    pub risk_level: BudgetRisk,
    /// Discrete health-score input: Critical 80, Warning 50, Healthy 20.
    pub financial_risk: f64,
    /// Undelivered order count × 5.
    pub supply_risk: f64,
    /// Spend grouped by category; uncategorised orders fall under "Other".
    pub by_category: BTreeMap<String, f64>,
    /// Projected remaining funds over the next `PROJECTION_STEPS` orders,
    /// floored at zero. Empty when the burn rate is zero (stable spending).
    pub projection: Vec<f64>,
    /// True when any single order exceeds a quarter of the budget.
    pub anomaly: bool,
}

/// Roll procurement orders up into the site's financial summary.
pub fn budget_summary(items: &[ProcurementItem], budget_limit: f64) -> BudgetSummary {
    let total_spent: f64 = items.iter().map(|i| i.cost()).sum();
    let remaining = (budget_limit - total_spent).max(0.0);

    let burn_rate = if items.is_empty() {
        0.0
    } else {
        total_spent / items.len() as f64
    };

    let risk_level = if remaining < budget_limit * 0.2 {
        BudgetRisk::Critical
    } else if remaining < budget_limit * 0.4 {
        BudgetRisk::Warning
    } else {
        BudgetRisk::Healthy
    };

    let financial_risk = match risk_level {
        BudgetRisk::Critical => 80.0,
        BudgetRisk::Warning => 50.0,
        BudgetRisk::Healthy => 20.0,
    };

    let supply_risk = items
        .iter()
        .filter(|i| i.status != ProcurementStatus::Delivered)
        .count() as f64
        * 5.0;

    let mut by_category: BTreeMap<String, f64> = BTreeMap::new();
    for item in items {
        let category = item.category.clone().unwrap_or_else(|| "Other".to_string());
        *by_category.entry(category).or_insert(0.0) += item.cost();
    }

    let mut projection = Vec::new();
    if burn_rate > 0.0 {
        let mut projected = remaining;
        for _ in 0..PROJECTION_STEPS {
            projected = (projected - burn_rate).max(0.0);
            projection.push(projected);
        }
    }

    let anomaly = items.iter().any(|i| i.cost() > budget_limit * ANOMALY_SHARE);

    BudgetSummary {
        budget_limit,
        total_spent,
        remaining,
        burn_rate,
        risk_level,
        financial_risk,
        supply_risk,
        by_category,
        projection,
        anomaly,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fields::Priority;

    fn item(quantity: f64, unit_cost: f64, status: ProcurementStatus, category: Option<&str>) -> ProcurementItem {
        ProcurementItem {
            id: 0,
            title: "Rebar".to_string(),
            supplier: "Acier Nord".to_string(),
            quantity,
            unit_cost,
            category: category.map(String::from),
            priority: Priority::Medium,
            status,
            expected: None,
            created_at_utc: 0,
        }
    }

    #[test]
    fn test_basic_rollup() {
        let items = vec![
            item(2.0, 100.0, ProcurementStatus::Delivered, Some("Steel")),
            item(1.0, 300.0, ProcurementStatus::Pending, Some("Concrete")),
        ];
        let summary = budget_summary(&items, 1000.0);
        assert_eq!(summary.total_spent, 500.0);
        assert_eq!(summary.remaining, 500.0);
        assert_eq!(summary.burn_rate, 250.0);
        assert_eq!(summary.risk_level, BudgetRisk::Healthy);
        assert_eq!(summary.financial_risk, 20.0);
        assert_eq!(summary.supply_risk, 5.0);
    }

    #[test]
    fn test_all_statuses_count_toward_spend() {
        let items = vec![
            item(1.0, 100.0, ProcurementStatus::Pending, None),
            item(1.0, 100.0, ProcurementStatus::Ordered, None),
            item(1.0, 100.0, ProcurementStatus::EnCours, None),
            item(1.0, 100.0, ProcurementStatus::Delivered, None),
        ];
        let summary = budget_summary(&items, 1000.0);
        assert_eq!(summary.total_spent, 400.0);
        assert_eq!(summary.supply_risk, 15.0);
    }

    #[test]
    fn test_risk_bands() {
        // remaining 100 of 1000 -> Critical.
        let summary = budget_summary(&[item(9.0, 100.0, ProcurementStatus::Ordered, None)], 1000.0);
        assert_eq!(summary.risk_level, BudgetRisk::Critical);
        assert_eq!(summary.financial_risk, 80.0);

        // remaining 300 of 1000 -> Warning.
        let summary = budget_summary(&[item(7.0, 100.0, ProcurementStatus::Ordered, None)], 1000.0);
        assert_eq!(summary.risk_level, BudgetRisk::Warning);
        assert_eq!(summary.financial_risk, 50.0);

        // remaining 400 of 1000 sits on the boundary -> Healthy.
        let summary = budget_summary(&[item(6.0, 100.0, ProcurementStatus::Ordered, None)], 1000.0);
        assert_eq!(summary.risk_level, BudgetRisk::Healthy);
    }

    #[test]
    fn test_overspend_floors_remaining() {
        let summary = budget_summary(&[item(20.0, 100.0, ProcurementStatus::Ordered, None)], 1000.0);
        assert_eq!(summary.remaining, 0.0);
        assert_eq!(summary.risk_level, BudgetRisk::Critical);
    }

    #[test]
    fn test_empty_orders_no_division() {
        let summary = budget_summary(&[], 1000.0);
        assert_eq!(summary.total_spent, 0.0);
        assert_eq!(summary.burn_rate, 0.0);
        assert_eq!(summary.supply_risk, 0.0);
        assert!(summary.projection.is_empty());
        assert!(!summary.anomaly);
    }

    #[test]
    fn test_category_breakdown_defaults_other() {
        let items = vec![
            item(1.0, 100.0, ProcurementStatus::Ordered, Some("Steel")),
            item(1.0, 50.0, ProcurementStatus::Ordered, Some("Steel")),
            item(1.0, 25.0, ProcurementStatus::Ordered, None),
        ];
        let summary = budget_summary(&items, 1000.0);
        assert_eq!(summary.by_category.get("Steel"), Some(&150.0));
        assert_eq!(summary.by_category.get("Other"), Some(&25.0));
    }

    #[test]
    fn test_projection_floors_at_zero() {
        // spent 600 of 1000, burn rate 600 -> one step to zero, then flat.
        let summary = budget_summary(&[item(6.0, 100.0, ProcurementStatus::Ordered, None)], 1000.0);
        assert_eq!(summary.projection.len(), PROJECTION_STEPS);
        assert_eq!(summary.projection[0], 0.0);
        assert!(summary.projection.iter().all(|&v| v == 0.0));
    }

    #[test]
    fn test_projection_steps_down_by_burn_rate() {
        let items = vec![
            item(1.0, 100.0, ProcurementStatus::Ordered, None),
            item(1.0, 100.0, ProcurementStatus::Ordered, None),
        ];
        // spent 200, remaining 800, burn rate 100.
        let summary = budget_summary(&items, 1000.0);
        assert_eq!(summary.projection, vec![700.0, 600.0, 500.0, 400.0, 300.0]);
    }

    #[test]
    fn test_anomaly_flag() {
        let summary = budget_summary(&[item(1.0, 260.0, ProcurementStatus::Ordered, None)], 1000.0);
        assert!(summary.anomaly);
        let summary = budget_summary(&[item(1.0, 250.0, ProcurementStatus::Ordered, None)], 1000.0);
        assert!(!summary.anomaly);
    }
}
