use async_trait::async_trait;
use std::collections::HashMap;
use tracing::warn;

use crate::errors::CoreError;
use super::traits::QuoteProvider;

/// Yahoo Finance quotes for listed stocks.
///
/// - **Free**: No API key required.
/// - **Coverage**: Global equities, ETFs, indices (e.g. `RELIANCE.NS`).
///
/// One request per symbol. A symbol Yahoo can't price is left out of the
/// result; the call only fails when no symbol could be priced at all.
///
/// **Note**: Not WASM-compatible (uses native reqwest/tokio).
pub struct YahooQuoteProvider {
    connector: yahoo_finance_api::YahooConnector,
}

impl YahooQuoteProvider {
    pub fn new() -> Result<Self, CoreError> {
        let connector = yahoo_finance_api::YahooConnector::new().map_err(|e| CoreError::Api {
            provider: "Yahoo Finance".into(),
            message: format!("Failed to create connector: {e}"),
        })?;
        Ok(Self { connector })
    }

    async fn latest_close(&self, symbol: &str) -> Result<f64, CoreError> {
        let resp = self
            .connector
            .get_latest_quotes(symbol, "1d")
            .await
            .map_err(|e| CoreError::Api {
                provider: "Yahoo Finance".into(),
                message: format!("Failed to fetch latest quote for {symbol}: {e}"),
            })?;

        let quote = resp.last_quote().map_err(|e| CoreError::Api {
            provider: "Yahoo Finance".into(),
            message: format!("No quote data for {symbol}: {e}"),
        })?;

        Ok(quote.close)
    }
}

#[async_trait]
impl QuoteProvider for YahooQuoteProvider {
    fn name(&self) -> &str {
        "Yahoo Finance"
    }

    async fn fetch_quotes(&self, symbols: &[String]) -> Result<HashMap<String, f64>, CoreError> {
        let mut quotes = HashMap::new();
        let mut last_error = None;

        for symbol in symbols {
            let symbol = symbol.trim().to_uppercase();
            if quotes.contains_key(&symbol) {
                continue;
            }
            match self.latest_close(&symbol).await {
                Ok(price) => {
                    quotes.insert(symbol, price);
                }
                Err(e) => {
                    warn!(symbol = %symbol, error = %e, "Yahoo quote unavailable");
                    last_error = Some(e);
                }
            }
        }

        match last_error {
            Some(e) if quotes.is_empty() => Err(e),
            _ => Ok(quotes),
        }
    }
}
