//! Derived metrics: pure aggregations over ledger state, recomputed on every
//! read and never persisted.

use std::collections::HashMap;

use crate::models::expense::{Category, Expense};
use crate::models::goal::Goal;
use crate::models::holding::PortfolioHolding;
use crate::models::ledger::LedgerState;
use crate::models::month::LedgerMonth;
use crate::models::summary::{CategorySpending, DashboardSummary, HoldingSummary};

/// Σ shares × current price
pub fn portfolio_value(holdings: &[PortfolioHolding]) -> f64 {
    holdings.iter().map(PortfolioHolding::market_value).sum()
}

/// Σ shares × average price
pub fn cost_basis(holdings: &[PortfolioHolding]) -> f64 {
    holdings.iter().map(PortfolioHolding::cost_basis).sum()
}

pub fn gain_loss(holdings: &[PortfolioHolding]) -> f64 {
    portfolio_value(holdings) - cost_basis(holdings)
}

/// Σ amount of every non-return expense dated in `month`.
pub fn monthly_spend(expenses: &[Expense], month: LedgerMonth) -> f64 {
    expenses
        .iter()
        .filter(|e| month.contains(e.date) && !e.category.is_return())
        .map(|e| e.amount)
        .sum()
}

/// Σ sale proceeds dated in `month`.
pub fn monthly_returns(expenses: &[Expense], month: LedgerMonth) -> f64 {
    expenses
        .iter()
        .filter(|e| month.contains(e.date) && e.category.is_return())
        .map(|e| e.amount)
        .sum()
}

/// income + returns - spend for `month`. Negative when over budget.
pub fn remaining_budget(state: &LedgerState, month: LedgerMonth) -> f64 {
    state.monthly_income + monthly_returns(&state.expenses, month)
        - monthly_spend(&state.expenses, month)
}

/// Percent of the target reached, capped at 100.
pub fn goal_progress(goal: &Goal) -> f64 {
    if goal.target_amount <= 0.0 {
        return 0.0;
    }
    (goal.current_amount / goal.target_amount * 100.0).min(100.0)
}

pub fn goals_target_total(goals: &[Goal]) -> f64 {
    goals.iter().map(|g| g.target_amount).sum()
}

pub fn goals_saved_total(goals: &[Goal]) -> f64 {
    goals.iter().map(|g| g.current_amount).sum()
}

/// Saved over target across all goals, in percent; 0 without goals.
pub fn overall_goal_progress(goals: &[Goal]) -> f64 {
    let target = goals_target_total(goals);
    if target > 0.0 {
        goals_saved_total(goals) / target * 100.0
    } else {
        0.0
    }
}

/// Portfolio value plus money set aside in savings goals. Loan repayments are
/// excluded: that money has left the user's hands.
pub fn net_worth(state: &LedgerState) -> f64 {
    let savings: f64 = state
        .goals
        .iter()
        .filter(|g| !g.is_loan)
        .map(|g| g.current_amount)
        .sum();
    portfolio_value(&state.portfolio) + savings
}

/// Spend per category in `month`, largest first. Returns are not spending and
/// are left out.
pub fn category_spending(expenses: &[Expense], month: LedgerMonth) -> Vec<CategorySpending> {
    let mut totals: HashMap<&Category, f64> = HashMap::new();
    for expense in expenses
        .iter()
        .filter(|e| month.contains(e.date) && !e.category.is_return())
    {
        *totals.entry(&expense.category).or_insert(0.0) += expense.amount;
    }

    let mut spending: Vec<CategorySpending> = totals
        .into_iter()
        .map(|(category, amount)| CategorySpending {
            category: category.clone(),
            amount,
        })
        .collect();
    spending.sort_by(|a, b| {
        b.amount
            .partial_cmp(&a.amount)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| a.category.as_str().cmp(b.category.as_str()))
    });
    spending
}

/// Per-position breakdown, largest allocation first.
pub fn holding_summaries(holdings: &[PortfolioHolding]) -> Vec<HoldingSummary> {
    let total_value = portfolio_value(holdings);
    let mut summaries: Vec<HoldingSummary> = holdings
        .iter()
        .map(|h| {
            let market_value = h.market_value();
            let cost_basis = h.cost_basis();
            let gain_loss = market_value - cost_basis;
            HoldingSummary {
                holding_id: h.id,
                ticker: h.ticker.clone(),
                shares: h.shares,
                market_value,
                cost_basis,
                gain_loss,
                return_pct: if cost_basis > 0.0 {
                    gain_loss / cost_basis * 100.0
                } else {
                    0.0
                },
                allocation_pct: if total_value > 0.0 {
                    market_value / total_value * 100.0
                } else {
                    0.0
                },
            }
        })
        .collect();

    summaries.sort_by(|a, b| {
        b.allocation_pct
            .partial_cmp(&a.allocation_pct)
            .unwrap_or(std::cmp::Ordering::Equal)
    });
    summaries
}

impl DashboardSummary {
    /// Compute every dashboard figure for `month` from the current state.
    pub fn compute(state: &LedgerState, month: LedgerMonth) -> Self {
        let portfolio_value = portfolio_value(&state.portfolio);
        let cost_basis = cost_basis(&state.portfolio);
        let monthly_spend = monthly_spend(&state.expenses, month);
        let monthly_returns = monthly_returns(&state.expenses, month);

        Self {
            month,
            portfolio_value,
            cost_basis,
            gain_loss: portfolio_value - cost_basis,
            monthly_income: state.monthly_income,
            monthly_spend,
            monthly_returns,
            remaining_budget: state.monthly_income + monthly_returns - monthly_spend,
            goals_target: goals_target_total(&state.goals),
            goals_saved: goals_saved_total(&state.goals),
            overall_goal_progress: overall_goal_progress(&state.goals),
            net_worth: net_worth(state),
            holdings: holding_summaries(&state.portfolio),
            category_spending: category_spending(&state.expenses, month),
        }
    }
}
