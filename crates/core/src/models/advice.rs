use serde::{Deserialize, Serialize};

use super::expense::Expense;
use super::goal::Goal;
use super::holding::PortfolioHolding;
use super::ledger::LedgerState;

/// Who said a chat line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    User,
    Model,
}

/// One line of the advice chat.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: ChatRole,
    pub text: String,
}

impl ChatMessage {
    pub fn user(text: impl Into<String>) -> Self {
        Self {
            role: ChatRole::User,
            text: text.into(),
        }
    }

    pub fn model(text: impl Into<String>) -> Self {
        Self {
            role: ChatRole::Model,
            text: text.into(),
        }
    }
}

/// A market headline returned by the advice backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewsArticle {
    pub title: String,
    pub summary: String,
    pub source: String,
}

/// Read-only copy of the ledger handed to the advice collaborator.
///
/// Owned data, detached from the live session: the collaborator cannot write
/// back through it.
#[derive(Debug, Clone, PartialEq)]
pub struct LedgerSnapshot {
    pub portfolio: Vec<PortfolioHolding>,
    pub goals: Vec<Goal>,
    /// Expenses of the month the snapshot was taken for
    pub monthly_expenses: Vec<Expense>,
    pub monthly_income: f64,
}

impl LedgerSnapshot {
    pub fn new(state: &LedgerState, monthly_expenses: Vec<Expense>) -> Self {
        Self {
            portfolio: state.portfolio.clone(),
            goals: state.goals.clone(),
            monthly_expenses,
            monthly_income: state.monthly_income,
        }
    }
}
