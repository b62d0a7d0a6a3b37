use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A stock position held in the portfolio.
///
/// `current_price` is owned by the quote feed: it is overwritten out-of-band
/// and no ledger invariant depends on it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PortfolioHolding {
    /// Unique identifier
    pub id: Uuid,

    /// Ticker symbol, uppercased (e.g., "AAPL", "RELIANCE.NS")
    pub ticker: String,

    /// Human-readable name (e.g., "Apple Inc.")
    pub name: String,

    /// Number of shares held (always positive)
    pub shares: f64,

    /// Average purchase price per share (always positive)
    pub avg_price: f64,

    /// Last known market price per share
    pub current_price: f64,
}

impl PortfolioHolding {
    /// New position priced at its purchase price until the first quote arrives.
    pub fn new(
        ticker: impl Into<String>,
        name: impl Into<String>,
        shares: f64,
        avg_price: f64,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            ticker: ticker.into().trim().to_uppercase(),
            name: name.into().trim().to_string(),
            shares,
            avg_price,
            current_price: avg_price,
        }
    }

    /// shares × current price
    pub fn market_value(&self) -> f64 {
        self.shares * self.current_price
    }

    /// shares × average purchase price
    pub fn cost_basis(&self) -> f64 {
        self.shares * self.avg_price
    }

    pub fn gain_loss(&self) -> f64 {
        self.market_value() - self.cost_basis()
    }
}

/// Partial update for a holding. `None` keeps the current value.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HoldingUpdate {
    pub ticker: Option<String>,
    pub name: Option<String>,
    pub shares: Option<f64>,
    pub avg_price: Option<f64>,
}

impl HoldingUpdate {
    pub fn shares(mut self, shares: f64) -> Self {
        self.shares = Some(shares);
        self
    }

    pub fn avg_price(mut self, avg_price: f64) -> Self {
        self.avg_price = Some(avg_price);
        self
    }

    pub fn ticker(mut self, ticker: impl Into<String>) -> Self {
        self.ticker = Some(ticker.into());
        self
    }

    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }
}
