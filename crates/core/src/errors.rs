use thiserror::Error;

/// Unified error type for the finance-ledger-core library.
///
/// Two families live here. Rejections (budget, validation, not-found,
/// read-only) are recoverable by the caller fixing the input; the facade turns
/// them into a [`TransactionResult`](crate::models::result::TransactionResult)
/// instead of propagating them. Everything else is infrastructure.
#[derive(Debug, Error)]
pub enum CoreError {
    // ── Storage / File ──────────────────────────────────────────────
    #[error("Invalid ledger file format: {0}")]
    InvalidFileFormat(String),

    #[error("Unsupported ledger file version: {0}")]
    UnsupportedVersion(u16),

    #[error("Encryption failed: {0}")]
    Encryption(String),

    #[error("Decryption failed: wrong passphrase or corrupted record")]
    Decryption,

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Deserialization error: {0}")]
    Deserialization(String),

    #[error("File I/O error: {0}")]
    FileIO(String),

    #[error("Changes were not saved: {0}")]
    Persistence(String),

    // ── Configuration ───────────────────────────────────────────────
    #[error("Configuration error: {0}")]
    Config(String),

    // ── API / Network ───────────────────────────────────────────────
    #[error("API error ({provider}): {message}")]
    Api { provider: String, message: String },

    #[error("Network error: {0}")]
    Network(String),

    #[error("No provider available for {0}")]
    NoProvider(String),

    // ── Business Logic ──────────────────────────────────────────────
    #[error("You don't have enough budget for this transaction.")]
    InsufficientBudget,

    #[error("{0}")]
    Validation(String),

    #[error("Holding not found: {0}")]
    HoldingNotFound(String),

    #[error("Goal not found.")]
    GoalNotFound(String),

    #[error("Expense not found: {0}")]
    ExpenseNotFound(String),

    #[error("Automated transactions cannot be edited or deleted directly ({0}).")]
    ReadOnlyExpense(String),

    #[error("Goal '{0}' is already fully funded.")]
    GoalAlreadyFunded(String),
}

impl CoreError {
    /// `true` for rejections a user can recover from by correcting input.
    pub fn is_rejection(&self) -> bool {
        matches!(
            self,
            CoreError::InsufficientBudget
                | CoreError::Validation(_)
                | CoreError::HoldingNotFound(_)
                | CoreError::GoalNotFound(_)
                | CoreError::ExpenseNotFound(_)
                | CoreError::ReadOnlyExpense(_)
                | CoreError::GoalAlreadyFunded(_)
        )
    }
}

// ── Conversion helpers (From impls) ─────────────────────────────────

impl From<std::io::Error> for CoreError {
    fn from(e: std::io::Error) -> Self {
        CoreError::FileIO(e.to_string())
    }
}

impl From<bincode::Error> for CoreError {
    fn from(e: bincode::Error) -> Self {
        CoreError::Serialization(e.to_string())
    }
}

impl From<serde_json::Error> for CoreError {
    fn from(e: serde_json::Error) -> Self {
        CoreError::Deserialization(e.to_string())
    }
}

impl From<serde_yaml::Error> for CoreError {
    fn from(e: serde_yaml::Error) -> Self {
        CoreError::Config(e.to_string())
    }
}

impl From<reqwest::Error> for CoreError {
    fn from(e: reqwest::Error) -> Self {
        // reqwest errors embed the full URL; drop the query string.
        let msg = e.to_string();
        let sanitized = match msg.find('?') {
            Some(idx) => format!("{}?<query redacted>", &msg[..idx]),
            None => msg,
        };
        CoreError::Network(sanitized)
    }
}

impl From<aes_gcm::Error> for CoreError {
    fn from(_: aes_gcm::Error) -> Self {
        CoreError::Decryption
    }
}
