pub mod config;
pub mod errors;
pub mod log;
pub mod models;
pub mod providers;
pub mod services;
pub mod storage;

use chrono::NaiveDate;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, info, warn};
use uuid::Uuid;

use config::{LedgerConfig, OverpaymentPolicy};
use errors::CoreError;
use models::{
    advice::LedgerSnapshot,
    expense::{Category, Expense, ExpenseLink, ExpenseSortOrder, ExpenseUpdate},
    goal::Goal,
    holding::{HoldingUpdate, PortfolioHolding},
    ledger::LedgerState,
    month::LedgerMonth,
    result::TransactionResult,
    summary::DashboardSummary,
    user::UserId,
};
use services::{
    budget_service::{BudgetCheck, BudgetService},
    ledger_service::LedgerService,
    metrics,
    quote_service::QuoteService,
};
use storage::{file_store::FileLedgerStore, manager::StorageManager};

/// What an operation did to the working copy.
enum Change {
    /// State changed; carries the id of the created entity, if any.
    Applied(Option<Uuid>),
    /// Nothing to do (e.g. deleting an id that doesn't exist).
    Unchanged,
}

/// Main entry point: one user's ledger session.
///
/// Owns the in-memory [`LedgerState`] and the store it came from. Every
/// mutation runs against a working copy, is persisted, and only then
/// replaces the session state. A rejected or unsaved operation leaves no trace.
///
/// Mutations return `Ok(TransactionResult)` for both success and business
/// rejections (budget, validation, not found, read-only). `Err` is reserved
/// for infrastructure failures, `CoreError::Persistence` in particular.
#[must_use]
pub struct FinanceLedger {
    user: UserId,
    state: LedgerState,
    storage: StorageManager,
    ledger_service: LedgerService,
    budget_service: BudgetService,
}

impl std::fmt::Debug for FinanceLedger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FinanceLedger")
            .field("user", &self.user)
            .field("holdings", &self.state.portfolio.len())
            .field("goals", &self.state.goals.len())
            .field("expenses", &self.state.expenses.len())
            .field("storage", &self.storage)
            .finish()
    }
}

impl FinanceLedger {
    /// Open `user`'s ledger. A first-time user gets the seeded defaults; an
    /// unreadable record falls back to them as well.
    pub fn open(user: UserId, storage: StorageManager, overpayment: OverpaymentPolicy) -> Self {
        let state = storage.load(&user);
        info!(
            user = %user,
            holdings = state.portfolio.len(),
            expenses = state.expenses.len(),
            "Ledger opened"
        );
        Self {
            user,
            state,
            storage,
            ledger_service: LedgerService::new(overpayment),
            budget_service: BudgetService::new(),
        }
    }

    /// Open `user`'s ledger from the file store described by `config`.
    pub fn open_with_config(user: UserId, config: &LedgerConfig) -> Result<Self, CoreError> {
        let store = FileLedgerStore::open(config.default_data_path()?)?;
        let storage = StorageManager::from_config(Arc::new(store), &config.store);
        Ok(Self::open(user, storage, config.goal_overpayment))
    }

    #[must_use]
    pub fn user(&self) -> &UserId {
        &self.user
    }

    #[must_use]
    pub fn overpayment_policy(&self) -> OverpaymentPolicy {
        self.ledger_service.overpayment_policy()
    }

    // ── Portfolio ───────────────────────────────────────────────────

    /// Buy `shares` of `ticker` at `avg_price`, dated today.
    /// The new holding's id is in the result.
    pub fn add_holding(
        &mut self,
        name: &str,
        ticker: &str,
        shares: f64,
        avg_price: f64,
    ) -> Result<TransactionResult, CoreError> {
        let today = Self::today();
        self.commit("add_holding", |ledger, state| {
            ledger
                .add_holding(state, name, ticker, shares, avg_price, today)
                .map(|id| Change::Applied(Some(id)))
        })
    }

    /// Edit a holding; its purchase expense follows.
    pub fn update_holding(
        &mut self,
        id: Uuid,
        update: &HoldingUpdate,
    ) -> Result<TransactionResult, CoreError> {
        let today = Self::today();
        self.commit("update_holding", |ledger, state| {
            ledger
                .update_holding(state, id, update, today)
                .map(|()| Change::Applied(None))
        })
    }

    /// Sell the whole holding at its current price. Unknown ids are a no-op.
    pub fn delete_holding(&mut self, id: Uuid) -> Result<TransactionResult, CoreError> {
        let today = Self::today();
        self.commit("delete_holding", |ledger, state| {
            ledger.sell_holding(state, id, today).map(|sold| {
                if sold {
                    Change::Applied(None)
                } else {
                    Change::Unchanged
                }
            })
        })
    }

    /// Set the market price of every holding with `ticker`. Returns how many
    /// holdings were updated.
    pub fn apply_quote(&mut self, ticker: &str, price: f64) -> Result<usize, CoreError> {
        let quotes = HashMap::from([(ticker.to_string(), price)]);
        self.apply_quotes(&quotes)
    }

    /// Apply a batch of quotes with a single save.
    pub fn apply_quotes(&mut self, quotes: &HashMap<String, f64>) -> Result<usize, CoreError> {
        let mut working = self.state.clone();
        let updated: usize = quotes
            .iter()
            .map(|(ticker, price)| self.ledger_service.apply_quote(&mut working, ticker, *price))
            .sum();
        if updated == 0 {
            return Ok(0);
        }
        self.storage.save(&self.user, &working)?;
        self.state = working;
        debug!(updated, "Quotes applied");
        Ok(updated)
    }

    /// Fetch quotes for every held ticker and apply them.
    ///
    /// An unreachable quote feed only leaves prices stale: it is logged and
    /// reported as zero updates. Only a failed save is an error.
    pub async fn refresh_quotes(&mut self, quotes: &QuoteService) -> Result<usize, CoreError> {
        let mut tickers: Vec<String> =
            self.state.portfolio.iter().map(|h| h.ticker.clone()).collect();
        tickers.sort();
        tickers.dedup();
        if tickers.is_empty() {
            return Ok(0);
        }

        match quotes.fetch_quotes(&tickers).await {
            Ok(prices) => self.apply_quotes(&prices),
            Err(e) => {
                warn!(error = %e, "Quote refresh failed, keeping last known prices");
                Ok(0)
            }
        }
    }

    // ── Goals ───────────────────────────────────────────────────────

    pub fn add_goal(
        &mut self,
        name: &str,
        target_amount: f64,
        is_loan: bool,
    ) -> Result<TransactionResult, CoreError> {
        self.commit("add_goal", |ledger, state| {
            ledger
                .add_goal(state, name, target_amount, is_loan)
                .map(|id| Change::Applied(Some(id)))
        })
    }

    /// Pay `amount` toward a goal on `date`. The payment expense's id is in
    /// the result.
    pub fn add_goal_payment(
        &mut self,
        goal_id: Uuid,
        amount: f64,
        date: NaiveDate,
    ) -> Result<TransactionResult, CoreError> {
        self.commit("add_goal_payment", |ledger, state| {
            ledger
                .add_goal_payment(state, goal_id, amount, date)
                .map(|id| Change::Applied(Some(id)))
        })
    }

    // ── Expenses ────────────────────────────────────────────────────

    /// Record a manual expense. `category` is a built-in name or a custom
    /// one; system categories are refused.
    pub fn add_expense(
        &mut self,
        description: &str,
        amount: f64,
        category: &str,
        date: NaiveDate,
    ) -> Result<TransactionResult, CoreError> {
        self.commit("add_expense", |ledger, state| {
            let category = Category::manual(category)?;
            ledger
                .add_expense(state, description, amount, category, date)
                .map(|id| Change::Applied(Some(id)))
        })
    }

    pub fn update_expense(
        &mut self,
        id: Uuid,
        update: &ExpenseUpdate,
    ) -> Result<TransactionResult, CoreError> {
        self.commit("update_expense", |ledger, state| {
            ledger
                .update_expense(state, id, update)
                .map(|()| Change::Applied(None))
        })
    }

    /// Remove a manual expense. Unknown ids are a no-op; system-generated
    /// expenses are refused.
    pub fn delete_expense(&mut self, id: Uuid) -> Result<TransactionResult, CoreError> {
        self.commit("delete_expense", |ledger, state| {
            ledger.delete_expense(state, id).map(|removed| {
                if removed {
                    Change::Applied(None)
                } else {
                    Change::Unchanged
                }
            })
        })
    }

    // ── Income ──────────────────────────────────────────────────────

    pub fn update_income(&mut self, income: f64) -> Result<TransactionResult, CoreError> {
        self.commit("update_income", |ledger, state| {
            ledger
                .update_income(state, income)
                .map(|()| Change::Applied(None))
        })
    }

    // ── Queries ─────────────────────────────────────────────────────

    #[must_use]
    pub fn state(&self) -> &LedgerState {
        &self.state
    }

    #[must_use]
    pub fn portfolio(&self) -> &[PortfolioHolding] {
        &self.state.portfolio
    }

    #[must_use]
    pub fn goals(&self) -> &[Goal] {
        &self.state.goals
    }

    /// Every expense, in insertion order.
    #[must_use]
    pub fn expenses(&self) -> &[Expense] {
        &self.state.expenses
    }

    #[must_use]
    pub fn monthly_income(&self) -> f64 {
        self.state.monthly_income
    }

    #[must_use]
    pub fn holding(&self, id: Uuid) -> Option<&PortfolioHolding> {
        self.state.holding(id)
    }

    #[must_use]
    pub fn goal(&self, id: Uuid) -> Option<&Goal> {
        self.state.goal(id)
    }

    #[must_use]
    pub fn expense(&self, id: Uuid) -> Option<&Expense> {
        self.state.expense(id)
    }

    /// The expense generated by a purchase, sale or goal payment.
    #[must_use]
    pub fn linked_expense(&self, link: ExpenseLink) -> Option<&Expense> {
        self.state.linked_expense(link)
    }

    /// Would spending `amount` in `month` fit the budget right now?
    #[must_use]
    pub fn check_budget(&self, amount: f64, month: LedgerMonth) -> BudgetCheck {
        self.budget_service.check(&self.state, amount, month, 0.0)
    }

    #[must_use]
    pub fn remaining_budget(&self, month: LedgerMonth) -> f64 {
        metrics::remaining_budget(&self.state, month)
    }

    /// Dashboard figures for `month`, computed fresh.
    #[must_use]
    pub fn summary(&self, month: LedgerMonth) -> DashboardSummary {
        DashboardSummary::compute(&self.state, month)
    }

    #[must_use]
    pub fn current_summary(&self) -> DashboardSummary {
        self.summary(LedgerMonth::of(Self::today()))
    }

    /// Detached copy of the ledger for the advice collaborator, with
    /// `month`'s expenses.
    #[must_use]
    pub fn snapshot(&self, month: LedgerMonth) -> LedgerSnapshot {
        let monthly = self
            .expenses_in_month(month)
            .into_iter()
            .cloned()
            .collect();
        LedgerSnapshot::new(&self.state, monthly)
    }

    /// Expenses dated in `month`, newest first.
    #[must_use]
    pub fn expenses_in_month(&self, month: LedgerMonth) -> Vec<&Expense> {
        let mut expenses: Vec<&Expense> = self
            .state
            .expenses
            .iter()
            .filter(|e| month.contains(e.date))
            .collect();
        expenses.sort_by(|a, b| b.date.cmp(&a.date));
        expenses
    }

    /// Search expenses by description or category name (case-insensitive).
    #[must_use]
    pub fn search_expenses(&self, query: &str) -> Vec<&Expense> {
        let q = query.trim().to_lowercase();
        self.state
            .expenses
            .iter()
            .filter(|e| {
                e.description.to_lowercase().contains(&q) || e.category.as_str().contains(&q)
            })
            .collect()
    }

    #[must_use]
    pub fn expenses_sorted(&self, order: &ExpenseSortOrder) -> Vec<&Expense> {
        let mut expenses: Vec<&Expense> = self.state.expenses.iter().collect();
        match order {
            ExpenseSortOrder::DateDesc => expenses.sort_by(|a, b| b.date.cmp(&a.date)),
            ExpenseSortOrder::DateAsc => expenses.sort_by(|a, b| a.date.cmp(&b.date)),
            ExpenseSortOrder::AmountDesc => expenses.sort_by(|a, b| {
                b.amount
                    .partial_cmp(&a.amount)
                    .unwrap_or(std::cmp::Ordering::Equal)
            }),
            ExpenseSortOrder::AmountAsc => expenses.sort_by(|a, b| {
                a.amount
                    .partial_cmp(&b.amount)
                    .unwrap_or(std::cmp::Ordering::Equal)
            }),
            ExpenseSortOrder::CategoryAsc => {
                expenses.sort_by(|a, b| a.category.as_str().cmp(b.category.as_str()))
            }
        }
        expenses
    }

    // ── Export ──────────────────────────────────────────────────────

    /// Export all expenses as a JSON string.
    pub fn export_expenses_to_json(&self) -> Result<String, CoreError> {
        serde_json::to_string_pretty(&self.state.expenses)
            .map_err(|e| {
                CoreError::Serialization(format!("Failed to serialize expenses to JSON: {e}"))
            })
    }

    /// Export all expenses as a CSV string.
    /// Columns: id, date, description, category, amount, link
    #[must_use]
    pub fn export_expenses_to_csv(&self) -> String {
        let mut csv = String::from("id,date,description,category,amount,link\n");
        for expense in &self.state.expenses {
            let link = match expense.link {
                Some(ExpenseLink::Purchase(id)) => format!("purchase:{id}"),
                Some(ExpenseLink::Sale(id)) => format!("sale:{id}"),
                Some(ExpenseLink::GoalPayment(id)) => format!("goal:{id}"),
                None => String::new(),
            };
            csv.push_str(&format!(
                "{},{},{},{},{},{}\n",
                expense.id,
                expense.date,
                csv_field(&expense.description),
                csv_field(expense.category.as_str()),
                expense.amount,
                link,
            ));
        }
        csv
    }

    /// The full ledger as JSON (unencrypted, for debugging/display).
    pub fn to_json(&self) -> Result<String, CoreError> {
        serde_json::to_string_pretty(&self.state)
            .map_err(|e| CoreError::Serialization(format!("Failed to serialize ledger: {e}")))
    }

    // ── Internal ────────────────────────────────────────────────────

    fn today() -> NaiveDate {
        chrono::Utc::now().date_naive()
    }

    /// Run `op` on a copy of the state, persist, then swap the copy in.
    fn commit<F>(&mut self, action: &str, op: F) -> Result<TransactionResult, CoreError>
    where
        F: FnOnce(&LedgerService, &mut LedgerState) -> Result<Change, CoreError>,
    {
        let mut working = self.state.clone();
        match op(&self.ledger_service, &mut working) {
            Ok(Change::Unchanged) => Ok(TransactionResult::ok()),
            Ok(Change::Applied(id)) => {
                self.storage.save(&self.user, &working)?;
                self.state = working;
                debug!(action, user = %self.user, "Transaction committed");
                Ok(id.map_or_else(TransactionResult::ok, TransactionResult::applied))
            }
            Err(e) if e.is_rejection() => {
                info!(action, user = %self.user, reason = %e, "Transaction rejected");
                Ok(TransactionResult::from(&e))
            }
            Err(e) => Err(e),
        }
    }
}

/// Quote fields containing commas, quotes, or newlines.
fn csv_field(value: &str) -> String {
    if value.contains(',') || value.contains('"') || value.contains('\n') {
        format!("\"{}\"", value.replace('"', "\"\""))
    } else {
        value.to_string()
    }
}
