use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A savings target or a loan being paid down.
///
/// `current_amount` only grows (through payments) and never exceeds
/// `target_amount`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Goal {
    pub id: Uuid,
    pub name: String,
    pub target_amount: f64,
    pub current_amount: f64,
    /// Loan repayments are reported separately from savings in net worth
    /// and advice requests.
    pub is_loan: bool,
}

impl Goal {
    pub fn new(name: impl Into<String>, target_amount: f64, is_loan: bool) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into().trim().to_string(),
            target_amount,
            current_amount: 0.0,
            is_loan,
        }
    }

    /// Amount still needed to reach the target.
    pub fn remaining(&self) -> f64 {
        (self.target_amount - self.current_amount).max(0.0)
    }

    pub fn is_completed(&self) -> bool {
        self.current_amount >= self.target_amount
    }
}
