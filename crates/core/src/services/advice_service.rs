use tracing::warn;

use crate::models::advice::{ChatMessage, LedgerSnapshot, NewsArticle};
use crate::models::goal::Goal;
use crate::models::holding::PortfolioHolding;
use crate::providers::traits::AdviceProvider;

pub const PORTFOLIO_ANALYSIS_FALLBACK: &str =
    "An error occurred while analyzing the portfolio. Please try again.";
pub const GOAL_ADVICE_FALLBACK: &str =
    "An error occurred while generating advice for your goal. Please try again.";
pub const EXPENSE_ADVICE_FALLBACK: &str =
    "An error occurred while generating expense advice. Please try again.";
pub const TIP_FALLBACK: &str = "Could not fetch a tip right now. Try to save a little extra today!";
pub const CHECKIN_FALLBACK: &str = "Could not fetch a quick summary at this time.";
pub const CHECKIN_EMPTY: &str = "Quick check-in unavailable.";
pub const CHAT_FALLBACK: &str = "Sorry, I encountered an error. Please try again.";

/// Number of pieces a chat reply is delivered in.
const CHAT_CHUNKS: usize = 20;

/// User-facing advice on top of an [`AdviceProvider`].
///
/// Never fails: a collaborator error is logged and replaced by a fixed
/// placeholder text, so the UI always has something to show. Only ever sees
/// snapshots, never the live ledger.
pub struct AdviceService {
    provider: Box<dyn AdviceProvider>,
}

impl AdviceService {
    pub fn new(provider: Box<dyn AdviceProvider>) -> Self {
        Self { provider }
    }

    pub async fn analyze_portfolio(&self, holdings: &[PortfolioHolding]) -> String {
        self.provider
            .analyze_portfolio(holdings)
            .await
            .unwrap_or_else(|e| {
                self.fallback("portfolio analysis", &e, PORTFOLIO_ANALYSIS_FALLBACK)
            })
    }

    pub async fn goal_advice(&self, goal: &Goal) -> String {
        self.provider
            .goal_advice(goal)
            .await
            .unwrap_or_else(|e| self.fallback("goal advice", &e, GOAL_ADVICE_FALLBACK))
    }

    pub async fn expense_advice(&self, snapshot: &LedgerSnapshot) -> String {
        self.provider
            .expense_advice(snapshot)
            .await
            .unwrap_or_else(|e| self.fallback("expense advice", &e, EXPENSE_ADVICE_FALLBACK))
    }

    /// A general savings tip, asked for as advice on a token goal.
    pub async fn tip_of_the_day(&self) -> String {
        let goal = Goal::new("General Savings", 100.0, false);
        self.provider
            .goal_advice(&goal)
            .await
            .unwrap_or_else(|e| self.fallback("tip of the day", &e, TIP_FALLBACK))
    }

    /// First sentence of the portfolio analysis.
    pub async fn portfolio_checkin(&self, holdings: &[PortfolioHolding]) -> String {
        match self.provider.analyze_portfolio(holdings).await {
            Ok(text) => first_sentence(&text).unwrap_or(CHECKIN_EMPTY).to_string(),
            Err(e) => self.fallback("portfolio check-in", &e, CHECKIN_FALLBACK),
        }
    }

    /// Headlines for `topic`; empty when the collaborator is unavailable.
    pub async fn market_news(&self, topic: &str) -> Vec<NewsArticle> {
        match self.provider.market_news(topic).await {
            Ok(articles) => articles,
            Err(e) => {
                warn!(
                    provider = self.provider.name(),
                    error = %e,
                    topic,
                    "Market news unavailable"
                );
                Vec::new()
            }
        }
    }

    /// Ask the chat collaborator and hand the reply to `on_chunk` piece by
    /// piece, about twenty pieces in order, and at least once even for an
    /// empty reply. On failure `on_chunk` receives the apology text once.
    /// Returns the full reply as delivered.
    pub async fn chat_chunks<F>(
        &self,
        history: &[ChatMessage],
        message: &str,
        mut on_chunk: F,
    ) -> String
    where
        F: FnMut(&str),
    {
        let reply = match self.provider.chat(history, message).await {
            Ok(reply) => reply,
            Err(e) => {
                let text = self.fallback("chat", &e, CHAT_FALLBACK);
                on_chunk(&text);
                return text;
            }
        };

        let chunks = split_chunks(&reply, CHAT_CHUNKS);
        if chunks.is_empty() {
            on_chunk(&reply);
        }
        for chunk in chunks {
            on_chunk(chunk);
        }
        reply
    }

    fn fallback(&self, what: &str, error: &crate::errors::CoreError, text: &str) -> String {
        warn!(
            provider = self.provider.name(),
            error = %error,
            "{what} unavailable, using placeholder"
        );
        text.to_string()
    }
}

/// Split `text` into at most `pieces` slices of about equal length, never
/// cutting through a UTF-8 character. Empty text yields no slices.
pub fn split_chunks(text: &str, pieces: usize) -> Vec<&str> {
    let size = text.len().div_ceil(pieces.max(1)).max(1);
    let mut chunks = Vec::new();
    let mut start = 0;
    while start < text.len() {
        let mut end = (start + size).min(text.len());
        while !text.is_char_boundary(end) {
            end += 1;
        }
        chunks.push(&text[start..end]);
        start = end;
    }
    chunks
}

/// Text up to and including the first `.`, `!` or `?` that is followed by
/// whitespace (or ends the text).
fn first_sentence(text: &str) -> Option<&str> {
    let text = text.trim();
    if text.is_empty() {
        return None;
    }
    let mut chars = text.char_indices().peekable();
    while let Some((idx, c)) = chars.next() {
        if matches!(c, '.' | '!' | '?') {
            match chars.peek() {
                Some((_, next)) if next.is_whitespace() => return Some(&text[..idx + c.len_utf8()]),
                None => return Some(text),
                _ => {}
            }
        }
    }
    Some(text)
}
