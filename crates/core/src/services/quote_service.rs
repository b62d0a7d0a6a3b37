use std::collections::HashMap;

use tracing::{debug, warn};

use crate::errors::CoreError;
use crate::providers::registry::QuoteRegistry;

/// Fetches market prices for held tickers from the registered providers.
///
/// Providers are tried in registration order. If the primary fails (backend
/// down, rate limited, etc.), the next one is asked. Prices that aren't
/// finite and non-negative are dropped before they reach the ledger.
pub struct QuoteService {
    registry: QuoteRegistry,
}

impl QuoteService {
    pub fn new(registry: QuoteRegistry) -> Self {
        Self { registry }
    }

    /// Backend first, Yahoo Finance as fallback.
    pub fn with_defaults(backend_url: &str) -> Self {
        Self::new(QuoteRegistry::new_with_defaults(backend_url))
    }

    pub fn provider_names(&self) -> Vec<String> {
        self.registry.provider_names()
    }

    /// Latest price per symbol, keyed by uppercased ticker.
    ///
    /// An empty request succeeds with an empty map without asking anyone.
    pub async fn fetch_quotes(
        &self,
        symbols: &[String],
    ) -> Result<HashMap<String, f64>, CoreError> {
        if symbols.is_empty() {
            return Ok(HashMap::new());
        }
        if self.registry.is_empty() {
            return Err(CoreError::NoProvider("stock quotes".into()));
        }

        let mut last_error = None;
        for provider in self.registry.providers() {
            match provider.fetch_quotes(symbols).await {
                Ok(quotes) => {
                    let valid = validate_quotes(provider.name(), quotes);
                    if valid.is_empty() {
                        last_error = Some(CoreError::Api {
                            provider: provider.name().to_string(),
                            message: format!("No valid quotes returned for {}", symbols.join(",")),
                        });
                        continue;
                    }
                    debug!(provider = provider.name(), count = valid.len(), "Quotes fetched");
                    return Ok(valid);
                }
                Err(e) => {
                    warn!(
                        provider = provider.name(),
                        error = %e,
                        "Quote provider failed, trying next"
                    );
                    last_error = Some(e);
                }
            }
        }

        Err(last_error.unwrap_or_else(|| CoreError::NoProvider("stock quotes".into())))
    }
}

fn validate_quotes(provider: &str, quotes: HashMap<String, f64>) -> HashMap<String, f64> {
    quotes
        .into_iter()
        .filter_map(|(symbol, price)| {
            if price.is_finite() && price >= 0.0 {
                Some((symbol.to_uppercase(), price))
            } else {
                warn!(provider, symbol = %symbol, price, "Dropping invalid quote");
                None
            }
        })
        .collect()
}
