use chrono::NaiveDate;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::config::OverpaymentPolicy;
use crate::errors::CoreError;
use crate::models::expense::{Category, Expense, ExpenseLink, ExpenseUpdate};
use crate::models::goal::Goal;
use crate::models::holding::{HoldingUpdate, PortfolioHolding};
use crate::models::ledger::LedgerState;
use crate::models::month::LedgerMonth;
use crate::services::budget_service::BudgetService;

/// Applies correlated mutations across holdings, goals and expenses.
///
/// Pure business logic, no I/O. Every operation validates fully before it
/// touches `state`, so a rejected operation leaves it exactly as it was.
/// The caller decides what "today" is.
pub struct LedgerService {
    budget: BudgetService,
    overpayment: OverpaymentPolicy,
}

impl LedgerService {
    pub fn new(overpayment: OverpaymentPolicy) -> Self {
        Self {
            budget: BudgetService::new(),
            overpayment,
        }
    }

    pub fn overpayment_policy(&self) -> OverpaymentPolicy {
        self.overpayment
    }

    // ── Portfolio ───────────────────────────────────────────────────

    /// Buy a position. Its cost is budget-checked against this month and
    /// recorded as a linked `investment` expense.
    pub fn add_holding(
        &self,
        state: &mut LedgerState,
        name: &str,
        ticker: &str,
        shares: f64,
        avg_price: f64,
        today: NaiveDate,
    ) -> Result<Uuid, CoreError> {
        require_text("Stock name", name)?;
        require_text("Ticker", ticker)?;
        require_positive("Shares", shares)?;
        require_positive("Average price", avg_price)?;

        let holding = PortfolioHolding::new(ticker, name, shares, avg_price);
        let cost = holding.cost_basis();
        self.budget.require(state, cost, LedgerMonth::of(today), 0.0)?;

        let purchase = Expense::linked(
            purchase_description(&holding),
            cost,
            Category::Investment,
            today,
            ExpenseLink::Purchase(holding.id),
        );
        let id = holding.id;
        debug!(holding = %id, ticker = %holding.ticker, cost, "Holding bought");
        state.portfolio.push(holding);
        state.expenses.push(purchase);
        Ok(id)
    }

    /// Edit a position and keep its purchase expense in step.
    ///
    /// The new cost replaces the recorded purchase in the month it was made.
    /// A purchase expense that has gone missing is reported and the new cost
    /// is checked against today instead.
    pub fn update_holding(
        &self,
        state: &mut LedgerState,
        id: Uuid,
        update: &HoldingUpdate,
        today: NaiveDate,
    ) -> Result<(), CoreError> {
        let idx = state
            .portfolio
            .iter()
            .position(|h| h.id == id)
            .ok_or_else(|| CoreError::HoldingNotFound(id.to_string()))?;

        let mut updated = state.portfolio[idx].clone();
        if let Some(ticker) = &update.ticker {
            require_text("Ticker", ticker)?;
            updated.ticker = ticker.trim().to_uppercase();
        }
        if let Some(name) = &update.name {
            require_text("Stock name", name)?;
            updated.name = name.trim().to_string();
        }
        if let Some(shares) = update.shares {
            require_positive("Shares", shares)?;
            updated.shares = shares;
        }
        if let Some(avg_price) = update.avg_price {
            require_positive("Average price", avg_price)?;
            updated.avg_price = avg_price;
        }

        // Only a recorded purchase has a cost to give back to its month.
        let link = ExpenseLink::Purchase(id);
        let (purchase_date, replaced) = match state.linked_expense(link) {
            Some(expense) => (expense.date, expense.amount),
            None => {
                warn!(
                    holding = %id,
                    "Purchase expense missing for holding, budgeting against today"
                );
                (today, 0.0)
            }
        };

        let new_cost = updated.cost_basis();
        self.budget
            .require(state, new_cost, LedgerMonth::of(purchase_date), replaced)?;

        if let Some(expense) = state.expenses.iter_mut().find(|e| e.link == Some(link)) {
            expense.amount = new_cost;
            expense.description = purchase_description(&updated);
        }
        debug!(holding = %id, new_cost, "Holding updated");
        state.portfolio[idx] = updated;
        Ok(())
    }

    /// Sell a whole position at its current price. Proceeds are recorded as
    /// a linked `investment_return` without a budget check, since they only
    /// add to what's available.
    ///
    /// Returns `false` (and changes nothing) when the holding doesn't exist.
    pub fn sell_holding(
        &self,
        state: &mut LedgerState,
        id: Uuid,
        today: NaiveDate,
    ) -> Result<bool, CoreError> {
        let Some(idx) = state.portfolio.iter().position(|h| h.id == id) else {
            debug!(holding = %id, "Sell ignored, holding not found");
            return Ok(false);
        };

        let holding = state.portfolio.remove(idx);
        let proceeds = holding.market_value();
        if proceeds > 0.0 {
            state.expenses.push(Expense::linked(
                format!("Sold {} of {}", holding.shares, holding.ticker),
                proceeds,
                Category::InvestmentReturn,
                today,
                ExpenseLink::Sale(id),
            ));
        } else {
            warn!(
                holding = %id,
                ticker = %holding.ticker,
                "Holding sold with no market value, no proceeds recorded"
            );
        }
        debug!(holding = %id, proceeds, "Holding sold");
        Ok(true)
    }

    /// Overwrite the market price of every holding with this ticker.
    /// Touches nothing else and never budget-checks. Returns how many
    /// holdings changed.
    pub fn apply_quote(&self, state: &mut LedgerState, ticker: &str, price: f64) -> usize {
        if !price.is_finite() || price < 0.0 {
            warn!(ticker, price, "Ignoring invalid quote");
            return 0;
        }
        let ticker = ticker.trim().to_uppercase();
        let mut updated = 0;
        for holding in state.portfolio.iter_mut().filter(|h| h.ticker == ticker) {
            holding.current_price = price;
            updated += 1;
        }
        updated
    }

    // ── Goals ───────────────────────────────────────────────────────

    /// Create a goal. No money moves, so no budget check.
    pub fn add_goal(
        &self,
        state: &mut LedgerState,
        name: &str,
        target_amount: f64,
        is_loan: bool,
    ) -> Result<Uuid, CoreError> {
        require_text("Goal name", name)?;
        require_positive("Target amount", target_amount)?;

        let goal = Goal::new(name, target_amount, is_loan);
        let id = goal.id;
        debug!(goal = %id, target_amount, is_loan, "Goal added");
        state.goals.push(goal);
        Ok(id)
    }

    /// Pay toward a goal. The goal never goes past its target; what gets
    /// recorded for an overpayment depends on the [`OverpaymentPolicy`].
    ///
    /// Returns the id of the linked `goals` expense.
    pub fn add_goal_payment(
        &self,
        state: &mut LedgerState,
        goal_id: Uuid,
        amount: f64,
        date: NaiveDate,
    ) -> Result<Uuid, CoreError> {
        require_positive("Payment amount", amount)?;

        let goal = state
            .goal(goal_id)
            .ok_or_else(|| CoreError::GoalNotFound(goal_id.to_string()))?;

        let recorded = match self.overpayment {
            OverpaymentPolicy::ClampToRemaining => {
                let remaining = goal.remaining();
                if remaining <= 0.0 {
                    return Err(CoreError::GoalAlreadyFunded(goal.name.clone()));
                }
                amount.min(remaining)
            }
            OverpaymentPolicy::RecordRequested => amount,
        };
        self.budget.require(state, recorded, LedgerMonth::of(date), 0.0)?;

        let payment = Expense::linked(
            format!("Payment for goal: {}", goal.name),
            recorded,
            Category::Goals,
            date,
            ExpenseLink::GoalPayment(goal_id),
        );
        let expense_id = payment.id;

        if let Some(goal) = state.goals.iter_mut().find(|g| g.id == goal_id) {
            goal.current_amount = (goal.current_amount + amount).min(goal.target_amount);
            debug!(
                goal = %goal_id,
                recorded,
                current = goal.current_amount,
                "Goal payment applied"
            );
        }
        state.expenses.push(payment);
        Ok(expense_id)
    }

    // ── Expenses ────────────────────────────────────────────────────

    /// Record a manual expense. System categories are refused.
    pub fn add_expense(
        &self,
        state: &mut LedgerState,
        description: &str,
        amount: f64,
        category: Category,
        date: NaiveDate,
    ) -> Result<Uuid, CoreError> {
        require_text("Description", description)?;
        require_positive("Amount", amount)?;
        let category = require_manual(&category)?;
        self.budget.require(state, amount, LedgerMonth::of(date), 0.0)?;

        let expense = Expense::new(description, amount, category, date);
        let id = expense.id;
        debug!(expense = %id, amount, category = %expense.category, "Expense added");
        state.expenses.push(expense);
        Ok(id)
    }

    /// Edit a manual expense. Its old amount stops counting only if it was in
    /// the month the expense ends up in.
    pub fn update_expense(
        &self,
        state: &mut LedgerState,
        id: Uuid,
        update: &ExpenseUpdate,
    ) -> Result<(), CoreError> {
        let idx = state
            .expenses
            .iter()
            .position(|e| e.id == id)
            .ok_or_else(|| CoreError::ExpenseNotFound(id.to_string()))?;

        let original = &state.expenses[idx];
        require_manual(&original.category)?;

        let mut updated = original.clone();
        if let Some(description) = &update.description {
            require_text("Description", description)?;
            updated.description = description.trim().to_string();
        }
        if let Some(amount) = update.amount {
            require_positive("Amount", amount)?;
            updated.amount = amount;
        }
        if let Some(category) = &update.category {
            updated.category = require_manual(category)?;
        }
        if let Some(date) = update.date {
            updated.date = date;
        }

        let month = LedgerMonth::of(updated.date);
        let replaced = if month.contains(original.date) {
            original.amount
        } else {
            0.0
        };
        self.budget.require(state, updated.amount, month, replaced)?;

        debug!(expense = %id, amount = updated.amount, "Expense updated");
        state.expenses[idx] = updated;
        Ok(())
    }

    /// Remove a manual expense. Returns `false` when it doesn't exist.
    pub fn delete_expense(&self, state: &mut LedgerState, id: Uuid) -> Result<bool, CoreError> {
        let Some(idx) = state.expenses.iter().position(|e| e.id == id) else {
            debug!(expense = %id, "Delete ignored, expense not found");
            return Ok(false);
        };
        require_manual(&state.expenses[idx].category)?;

        state.expenses.remove(idx);
        debug!(expense = %id, "Expense deleted");
        Ok(true)
    }

    // ── Income ──────────────────────────────────────────────────────

    /// Replace the monthly income. Past months are not re-validated.
    pub fn update_income(&self, state: &mut LedgerState, income: f64) -> Result<(), CoreError> {
        if !income.is_finite() || income < 0.0 {
            return Err(CoreError::Validation(format!(
                "Monthly income must be zero or more, got {income}"
            )));
        }
        state.monthly_income = income;
        debug!(income, "Monthly income updated");
        Ok(())
    }
}

impl Default for LedgerService {
    fn default() -> Self {
        Self::new(OverpaymentPolicy::default())
    }
}

fn purchase_description(holding: &PortfolioHolding) -> String {
    format!("Bought {} of {}", holding.shares, holding.ticker)
}

fn require_positive(field: &str, value: f64) -> Result<(), CoreError> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(CoreError::Validation(format!(
            "{field} must be a positive number, got {value}"
        )))
    }
}

fn require_text(field: &str, value: &str) -> Result<(), CoreError> {
    if value.trim().is_empty() {
        Err(CoreError::Validation(format!("{field} is required")))
    } else {
        Ok(())
    }
}

/// The category as it will be stored, or a rejection if it is (or would
/// reload as) a system category.
fn require_manual(category: &Category) -> Result<Category, CoreError> {
    match category {
        Category::Custom(name) => Category::manual(name),
        system if system.is_system_generated() => {
            Err(CoreError::ReadOnlyExpense(system.to_string()))
        }
        builtin => Ok(builtin.clone()),
    }
}
