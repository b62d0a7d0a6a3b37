use std::collections::HashMap;

use async_trait::async_trait;

use crate::errors::CoreError;
use crate::models::advice::{ChatMessage, LedgerSnapshot, NewsArticle};
use crate::models::goal::Goal;
use crate::models::holding::PortfolioHolding;

/// Source of market prices for holdings.
///
/// Implementations only fetch. Writing prices into the ledger is up to the
/// caller, which never budget-checks a price change.
#[cfg_attr(target_arch = "wasm32", async_trait(?Send))]
#[cfg_attr(not(target_arch = "wasm32"), async_trait)]
pub trait QuoteProvider: Send + Sync {
    /// Human-readable name of this provider (for logs/errors).
    fn name(&self) -> &str;

    /// Latest price per requested symbol. Symbols the provider has no price
    /// for are simply absent from the map.
    async fn fetch_quotes(&self, symbols: &[String]) -> Result<HashMap<String, f64>, CoreError>;
}

/// Generates natural-language advice from a read-only ledger snapshot.
#[cfg_attr(target_arch = "wasm32", async_trait(?Send))]
#[cfg_attr(not(target_arch = "wasm32"), async_trait)]
pub trait AdviceProvider: Send + Sync {
    fn name(&self) -> &str;

    async fn analyze_portfolio(&self, holdings: &[PortfolioHolding]) -> Result<String, CoreError>;

    async fn goal_advice(&self, goal: &Goal) -> Result<String, CoreError>;

    /// Advice on the snapshot month's spending, in light of income and goals.
    async fn expense_advice(&self, snapshot: &LedgerSnapshot) -> Result<String, CoreError>;

    /// One chat turn. `history` holds the earlier turns, oldest first.
    async fn chat(&self, history: &[ChatMessage], message: &str) -> Result<String, CoreError>;

    async fn market_news(&self, topic: &str) -> Result<Vec<NewsArticle>, CoreError>;
}
