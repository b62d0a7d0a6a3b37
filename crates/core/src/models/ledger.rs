use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::expense::{Expense, ExpenseLink};
use super::goal::Goal;
use super::holding::PortfolioHolding;

/// The unit of persistence: one user's complete financial state.
///
/// Everything in here gets serialized and saved by the ledger store.
/// Derived metrics are never stored here.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LedgerState {
    /// Open stock positions
    pub portfolio: Vec<PortfolioHolding>,

    /// Savings goals and loans
    pub goals: Vec<Goal>,

    /// Every cash movement, manual and system-generated, in insertion order
    pub expenses: Vec<Expense>,

    /// Monthly income; the base of every month's budget
    pub monthly_income: f64,
}

impl LedgerState {
    /// The state a user starts with on first access.
    pub fn seeded() -> Self {
        let mut apple = PortfolioHolding::new("AAPL", "Apple Inc.", 50.0, 150.0);
        apple.current_price = 175.28;
        let mut microsoft = PortfolioHolding::new("MSFT", "Microsoft Corp.", 30.0, 300.0);
        microsoft.current_price = 334.75;

        let mut car = Goal::new("Buy a new car", 350_000.0, false);
        car.current_amount = 120_000.0;
        let mut home_loan = Goal::new("Home Loan Repayment", 1_000_000.0, true);
        home_loan.current_amount = 450_000.0;

        Self {
            portfolio: vec![apple, microsoft],
            goals: vec![car, home_loan],
            expenses: Vec::new(),
            monthly_income: 75_000.0,
        }
    }

    pub fn holding(&self, id: Uuid) -> Option<&PortfolioHolding> {
        self.portfolio.iter().find(|h| h.id == id)
    }

    pub fn goal(&self, id: Uuid) -> Option<&Goal> {
        self.goals.iter().find(|g| g.id == id)
    }

    pub fn expense(&self, id: Uuid) -> Option<&Expense> {
        self.expenses.iter().find(|e| e.id == id)
    }

    /// The expense produced by the transaction `link` points at.
    pub fn linked_expense(&self, link: ExpenseLink) -> Option<&Expense> {
        self.expenses.iter().find(|e| e.link == Some(link))
    }
}
