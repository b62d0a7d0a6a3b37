use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::errors::CoreError;

/// Outcome of a mutating ledger operation as seen by the presentation layer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionResult {
    pub success: bool,
    pub message: Option<String>,
    /// Id of the entity the operation created, when it created one.
    pub id: Option<Uuid>,
}

impl TransactionResult {
    pub fn ok() -> Self {
        Self {
            success: true,
            message: None,
            id: None,
        }
    }

    /// Success that created the entity `id`.
    pub fn applied(id: Uuid) -> Self {
        Self {
            id: Some(id),
            ..Self::ok()
        }
    }

    pub fn rejected(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: Some(message.into()),
            id: None,
        }
    }

    pub fn is_ok(&self) -> bool {
        self.success
    }
}

impl From<&CoreError> for TransactionResult {
    fn from(e: &CoreError) -> Self {
        Self::rejected(e.to_string())
    }
}
