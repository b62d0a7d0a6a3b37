use crate::errors::CoreError;
use crate::models::ledger::LedgerState;
use crate::models::month::LedgerMonth;
use crate::services::metrics;

/// Slack for floating-point noise when a transaction fills the budget exactly.
/// Only applied when there is something to fill: an empty budget allows 0.
const BUDGET_TOLERANCE: f64 = 1e-6;

/// Result of a budget check. Never an error: a rejection is a normal answer.
#[derive(Debug, Clone, PartialEq)]
pub enum BudgetCheck {
    Allowed,
    Rejected(String),
}

impl BudgetCheck {
    pub fn is_allowed(&self) -> bool {
        matches!(self, BudgetCheck::Allowed)
    }
}

/// Decides whether a cash outflow fits the month's budget.
///
/// A month's budget is income plus that month's sale proceeds; everything
/// else dated in the month counts against it.
///
/// Pure: reads the ledger, never changes it.
pub struct BudgetService;

impl BudgetService {
    pub fn new() -> Self {
        Self
    }

    /// Would spending `candidate` in `month` stay within budget, given that
    /// `replaced` (an amount already recorded in that month and being
    /// edited) stops counting?
    pub fn check(
        &self,
        state: &LedgerState,
        candidate: f64,
        month: LedgerMonth,
        replaced: f64,
    ) -> BudgetCheck {
        let spent = metrics::monthly_spend(&state.expenses, month);
        let available = state.monthly_income + metrics::monthly_returns(&state.expenses, month);

        let slack = if available > 0.0 { BUDGET_TOLERANCE } else { 0.0 };
        if spent - replaced + candidate <= available + slack {
            BudgetCheck::Allowed
        } else {
            BudgetCheck::Rejected(CoreError::InsufficientBudget.to_string())
        }
    }

    /// [`check`](Self::check) as a `Result`, for use with `?`.
    pub fn require(
        &self,
        state: &LedgerState,
        candidate: f64,
        month: LedgerMonth,
        replaced: f64,
    ) -> Result<(), CoreError> {
        match self.check(state, candidate, month, replaced) {
            BudgetCheck::Allowed => Ok(()),
            BudgetCheck::Rejected(_) => Err(CoreError::InsufficientBudget),
        }
    }
}

impl Default for BudgetService {
    fn default() -> Self {
        Self::new()
    }
}
