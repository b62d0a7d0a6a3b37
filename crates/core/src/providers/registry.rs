use super::backend::BackendQuoteProvider;
#[cfg(not(target_arch = "wasm32"))]
use super::yahoo_finance::YahooQuoteProvider;
use super::traits::QuoteProvider;

/// Ordered list of quote providers.
///
/// Registration order is priority order: callers try the first provider and
/// fall back to the next one when it fails.
pub struct QuoteRegistry {
    providers: Vec<Box<dyn QuoteProvider>>,
}

impl QuoteRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self {
            providers: Vec::new(),
        }
    }

    /// Backend proxy first, Yahoo Finance as fallback where available.
    pub fn new_with_defaults(backend_url: &str) -> Self {
        let mut registry = Self::new();

        registry.register(Box::new(BackendQuoteProvider::new(backend_url)));

        // Not available on WASM (uses native reqwest/tokio connectors)
        #[cfg(not(target_arch = "wasm32"))]
        {
            if let Ok(yahoo) = YahooQuoteProvider::new() {
                registry.register(Box::new(yahoo));
            }
        }

        registry
    }

    pub fn register(&mut self, provider: Box<dyn QuoteProvider>) {
        self.providers.push(provider);
    }

    /// All providers, in priority order.
    pub fn providers(&self) -> impl Iterator<Item = &dyn QuoteProvider> {
        self.providers.iter().map(|p| p.as_ref())
    }

    pub fn provider_names(&self) -> Vec<String> {
        self.providers().map(|p| p.name().to_string()).collect()
    }

    pub fn is_empty(&self) -> bool {
        self.providers.is_empty()
    }
}

impl Default for QuoteRegistry {
    fn default() -> Self {
        Self::new()
    }
}
