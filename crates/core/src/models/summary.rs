use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::expense::Category;
use super::month::LedgerMonth;

/// Everything the dashboard shows for one month, computed from the ledger on
/// read.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DashboardSummary {
    /// Month the cash-flow figures were computed for
    pub month: LedgerMonth,

    /// Σ shares × current price
    pub portfolio_value: f64,

    /// Σ shares × average price
    pub cost_basis: f64,

    /// portfolio_value - cost_basis
    pub gain_loss: f64,

    /// Monthly income from the ledger
    pub monthly_income: f64,

    /// Σ non-return expenses in the month
    pub monthly_spend: f64,

    /// Σ sale proceeds in the month
    pub monthly_returns: f64,

    /// monthly_income + monthly_returns - monthly_spend (may be negative)
    pub remaining_budget: f64,

    /// Σ goal targets
    pub goals_target: f64,

    /// Σ goal current amounts
    pub goals_saved: f64,

    /// goals_saved / goals_target × 100, or 0 with no goals
    pub overall_goal_progress: f64,

    /// portfolio value plus savings held in non-loan goals
    pub net_worth: f64,

    /// Per-position breakdown, largest allocation first
    pub holdings: Vec<HoldingSummary>,

    /// Spend per category in the month, largest first
    pub category_spending: Vec<CategorySpending>,
}

/// Summary of a single position.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HoldingSummary {
    pub holding_id: Uuid,
    pub ticker: String,
    pub shares: f64,
    pub market_value: f64,
    pub cost_basis: f64,
    pub gain_loss: f64,
    /// gain_loss / cost_basis × 100
    pub return_pct: f64,
    /// market_value / total portfolio value × 100
    pub allocation_pct: f64,
}

/// Total spent in one category.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategorySpending {
    pub category: Category,
    pub amount: f64,
}
