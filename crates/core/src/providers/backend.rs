use async_trait::async_trait;
use chrono::NaiveDate;
use reqwest::{Client, RequestBuilder};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::collections::HashMap;
#[cfg(not(target_arch = "wasm32"))]
use std::time::Duration;
use tracing::debug;

use crate::errors::CoreError;
use crate::models::advice::{ChatMessage, ChatRole, LedgerSnapshot, NewsArticle};
use crate::models::expense::Expense;
use crate::models::goal::Goal;
use crate::models::holding::PortfolioHolding;
use super::traits::{AdviceProvider, QuoteProvider};

const PROVIDER_NAME: &str = "Backend";

const CHAT_SYSTEM_INSTRUCTION: &str = "You are a friendly and professional financial assistant.";

/// HTTP client for the companion backend that proxies market data and the
/// language model.
///
/// - **Quotes**: `GET /api/quotes?symbols=A,B`
/// - **Advice**: `POST /api/ai/*` with a JSON body, answered by `{"text": ...}`
/// - **News**: `GET /api/ai/news?topic=...`
///
/// Error responses carry `{"error": ...}` which is surfaced as `CoreError::Api`.
#[derive(Clone)]
pub struct BackendClient {
    client: Client,
    base_url: String,
}

impl BackendClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        let builder = Client::builder();
        #[cfg(not(target_arch = "wasm32"))]
        let builder = builder.timeout(Duration::from_secs(30));
        Self {
            client: builder.build().unwrap_or_else(|_| Client::new()),
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }

    async fn send<T: DeserializeOwned>(
        &self,
        request: RequestBuilder,
        what: &str,
    ) -> Result<T, CoreError> {
        let resp = request.send().await?;
        let status = resp.status();
        if !status.is_success() {
            let message = resp
                .json::<ErrorBody>()
                .await
                .ok()
                .and_then(|b| b.error)
                .unwrap_or_else(|| format!("{what} failed with status {status}"));
            return Err(CoreError::Api {
                provider: PROVIDER_NAME.into(),
                message,
            });
        }
        resp.json().await.map_err(|e| CoreError::Api {
            provider: PROVIDER_NAME.into(),
            message: format!("Failed to parse {what} response: {e}"),
        })
    }

    async fn post_text(
        &self,
        path: &str,
        body: serde_json::Value,
        what: &str,
    ) -> Result<String, CoreError> {
        debug!(path, "Advice request");
        let resp: TextResponse = self
            .send(self.client.post(self.url(path)).json(&body), what)
            .await?;
        resp.text.ok_or_else(|| CoreError::Api {
            provider: PROVIDER_NAME.into(),
            message: format!("Empty {what} response"),
        })
    }
}

// ── Backend response types ──────────────────────────────────────────

#[derive(Deserialize)]
struct ErrorBody {
    error: Option<String>,
}

#[derive(Deserialize)]
struct QuotesResponse {
    #[serde(default)]
    quotes: HashMap<String, Quote>,
}

#[derive(Deserialize)]
struct Quote {
    price: Option<f64>,
}

#[derive(Deserialize)]
struct TextResponse {
    text: Option<String>,
}

#[derive(Deserialize)]
struct NewsResponse {
    #[serde(default)]
    articles: Vec<NewsArticle>,
}

// ── Wire shapes the backend expects (camelCase) ─────────────────────

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct WireHolding<'a> {
    id: String,
    ticker: &'a str,
    name: &'a str,
    shares: f64,
    avg_price: f64,
    current_price: f64,
}

impl<'a> From<&'a PortfolioHolding> for WireHolding<'a> {
    fn from(h: &'a PortfolioHolding) -> Self {
        Self {
            id: h.id.to_string(),
            ticker: &h.ticker,
            name: &h.name,
            shares: h.shares,
            avg_price: h.avg_price,
            current_price: h.current_price,
        }
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct WireGoal<'a> {
    id: String,
    name: &'a str,
    target_amount: f64,
    current_amount: f64,
    is_loan: bool,
}

impl<'a> From<&'a Goal> for WireGoal<'a> {
    fn from(g: &'a Goal) -> Self {
        Self {
            id: g.id.to_string(),
            name: &g.name,
            target_amount: g.target_amount,
            current_amount: g.current_amount,
            is_loan: g.is_loan,
        }
    }
}

#[derive(Serialize)]
struct WireExpense<'a> {
    id: String,
    description: &'a str,
    amount: f64,
    category: &'a str,
    date: NaiveDate,
}

impl<'a> From<&'a Expense> for WireExpense<'a> {
    fn from(e: &'a Expense) -> Self {
        Self {
            id: e.id.to_string(),
            description: &e.description,
            amount: e.amount,
            category: e.category.as_str(),
            date: e.date,
        }
    }
}

#[derive(Serialize)]
struct WirePart<'a> {
    text: &'a str,
}

#[derive(Serialize)]
struct WireTurn<'a> {
    role: ChatRole,
    parts: [WirePart<'a>; 1],
}

// ── Quote provider ──────────────────────────────────────────────────

/// Quotes from the backend's market-data proxy. Symbols are uppercased and
/// deduplicated before the request.
pub struct BackendQuoteProvider {
    backend: BackendClient,
}

impl BackendQuoteProvider {
    pub fn new(backend_url: impl Into<String>) -> Self {
        Self {
            backend: BackendClient::new(backend_url),
        }
    }
}

#[cfg_attr(target_arch = "wasm32", async_trait(?Send))]
#[cfg_attr(not(target_arch = "wasm32"), async_trait)]
impl QuoteProvider for BackendQuoteProvider {
    fn name(&self) -> &str {
        PROVIDER_NAME
    }

    async fn fetch_quotes(&self, symbols: &[String]) -> Result<HashMap<String, f64>, CoreError> {
        let mut unique: Vec<String> = symbols.iter().map(|s| s.trim().to_uppercase()).collect();
        unique.sort();
        unique.dedup();
        if unique.is_empty() {
            return Ok(HashMap::new());
        }

        let request = self
            .backend
            .client
            .get(self.backend.url("/api/quotes"))
            .query(&[("symbols", unique.join(","))]);
        let resp: QuotesResponse = self.backend.send(request, "quotes").await?;

        Ok(resp
            .quotes
            .into_iter()
            .filter_map(|(symbol, quote)| quote.price.map(|price| (symbol.to_uppercase(), price)))
            .collect())
    }
}

// ── Advice provider ─────────────────────────────────────────────────

pub struct BackendAdviceProvider {
    backend: BackendClient,
}

impl BackendAdviceProvider {
    pub fn new(backend_url: impl Into<String>) -> Self {
        Self {
            backend: BackendClient::new(backend_url),
        }
    }
}

#[cfg_attr(target_arch = "wasm32", async_trait(?Send))]
#[cfg_attr(not(target_arch = "wasm32"), async_trait)]
impl AdviceProvider for BackendAdviceProvider {
    fn name(&self) -> &str {
        PROVIDER_NAME
    }

    async fn analyze_portfolio(&self, holdings: &[PortfolioHolding]) -> Result<String, CoreError> {
        let portfolio: Vec<WireHolding> = holdings.iter().map(WireHolding::from).collect();
        self.backend
            .post_text(
                "/api/ai/analyze-portfolio",
                json!({ "portfolio": portfolio }),
                "portfolio analysis",
            )
            .await
    }

    async fn goal_advice(&self, goal: &Goal) -> Result<String, CoreError> {
        self.backend
            .post_text(
                "/api/ai/goal-advice",
                json!({ "goal": WireGoal::from(goal) }),
                "goal advice",
            )
            .await
    }

    async fn expense_advice(&self, snapshot: &LedgerSnapshot) -> Result<String, CoreError> {
        let expenses: Vec<WireExpense> =
            snapshot.monthly_expenses.iter().map(WireExpense::from).collect();
        let goals: Vec<WireGoal> = snapshot.goals.iter().map(WireGoal::from).collect();
        self.backend
            .post_text(
                "/api/ai/expense-advice",
                json!({
                    "monthlyExpenses": expenses,
                    "goals": goals,
                    "monthlyIncome": snapshot.monthly_income,
                }),
                "expense advice",
            )
            .await
    }

    async fn chat(&self, history: &[ChatMessage], message: &str) -> Result<String, CoreError> {
        let turns: Vec<WireTurn> = history
            .iter()
            .map(|m| WireTurn {
                role: m.role,
                parts: [WirePart { text: &m.text }],
            })
            .collect();
        self.backend
            .post_text(
                "/api/ai/chat",
                json!({
                    "history": turns,
                    "newMessage": message,
                    "systemInstruction": CHAT_SYSTEM_INSTRUCTION,
                }),
                "chat",
            )
            .await
    }

    async fn market_news(&self, topic: &str) -> Result<Vec<NewsArticle>, CoreError> {
        let request = self
            .backend
            .client
            .get(self.backend.url("/api/ai/news"))
            .query(&[("topic", topic)]);
        let resp: NewsResponse = self.backend.send(request, "news").await?;
        Ok(resp.articles)
    }
}
