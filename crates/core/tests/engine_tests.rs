// ═══════════════════════════════════════════════════════════════════
// Engine Tests: FinanceLedger transactions, budget rules, atomicity
// ═══════════════════════════════════════════════════════════════════

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use chrono::{Datelike, NaiveDate};
use finance_ledger_core::config::OverpaymentPolicy;
use finance_ledger_core::errors::CoreError;
use finance_ledger_core::models::expense::{
    Category, ExpenseLink, ExpenseSortOrder, ExpenseUpdate,
};
use finance_ledger_core::models::holding::HoldingUpdate;
use finance_ledger_core::models::month::LedgerMonth;
use finance_ledger_core::models::result::TransactionResult;
use finance_ledger_core::services::metrics;
use finance_ledger_core::models::user::UserId;
use finance_ledger_core::storage::manager::StorageManager;
use finance_ledger_core::storage::store::{LedgerStore, MemoryLedgerStore};
use finance_ledger_core::FinanceLedger;
use uuid::Uuid;

const BUDGET_MESSAGE: &str = "You don't have enough budget for this transaction.";

// ═══════════════════════════════════════════════════════════════════
// Helpers
// ═══════════════════════════════════════════════════════════════════

/// Memory store whose writes can be made to fail on demand.
#[derive(Default)]
struct FlakyStore {
    inner: MemoryLedgerStore,
    fail_writes: AtomicBool,
}

impl FlakyStore {
    fn set_failing(&self, failing: bool) {
        self.fail_writes.store(failing, Ordering::SeqCst);
    }
}

impl LedgerStore for FlakyStore {
    fn name(&self) -> &str {
        "flaky"
    }

    fn read(&self, key: &str) -> Result<Option<Vec<u8>>, CoreError> {
        self.inner.read(key)
    }

    fn write(&self, key: &str, bytes: &[u8]) -> Result<(), CoreError> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(CoreError::FileIO("disk full".into()));
        }
        self.inner.write(key, bytes)
    }

    fn remove(&self, key: &str) -> Result<bool, CoreError> {
        self.inner.remove(key)
    }

    fn keys(&self) -> Result<Vec<String>, CoreError> {
        self.inner.keys()
    }
}

fn user() -> UserId {
    UserId::new("alice@example.com").unwrap()
}

fn today() -> NaiveDate {
    chrono::Utc::now().date_naive()
}

fn this_month() -> LedgerMonth {
    LedgerMonth::of(today())
}

/// A date in the month before the current one.
fn last_month() -> NaiveDate {
    let first = today().with_day(1).unwrap();
    first - chrono::Duration::days(1)
}

fn open_with(store: Arc<dyn LedgerStore>, policy: OverpaymentPolicy) -> FinanceLedger {
    FinanceLedger::open(user(), StorageManager::new(store), policy)
}

/// Seeded ledger (income 75000, no expenses) on a fresh memory store.
fn ledger() -> FinanceLedger {
    open_with(Arc::new(MemoryLedgerStore::new()), OverpaymentPolicy::default())
}

fn created_id(result: &TransactionResult) -> Uuid {
    assert!(result.success, "expected success, got {:?}", result.message);
    result.id.expect("operation should report the created id")
}

// ═══════════════════════════════════════════════════════════════════
// Budget scenarios
// ═══════════════════════════════════════════════════════════════════

mod budget_limits {
    use super::*;

    #[test]
    fn expense_over_income_by_a_cent_is_rejected() {
        let mut ledger = ledger();
        let result = ledger
            .add_expense("Rent", 75_000.01, "housing", today())
            .unwrap();
        assert!(!result.success);
        assert_eq!(result.message.as_deref(), Some(BUDGET_MESSAGE));
        assert!(ledger.expenses().is_empty());
    }

    #[test]
    fn expense_equal_to_income_is_accepted() {
        let mut ledger = ledger();
        let result = ledger.add_expense("Rent", 75_000.0, "housing", today()).unwrap();
        assert!(result.success);
        assert_eq!(ledger.expenses().len(), 1);
        assert!(ledger.remaining_budget(this_month()).abs() < 1e-9);
    }

    #[test]
    fn budget_is_per_month() {
        let mut ledger = ledger();
        assert!(ledger.add_expense("Rent", 75_000.0, "housing", today()).unwrap().success);
        // The previous month has its own budget.
        assert!(ledger.add_expense("Rent", 75_000.0, "housing", last_month()).unwrap().success);
        assert!(!ledger.add_expense("Snack", 1.0, "food", today()).unwrap().success);
    }

    #[test]
    fn zero_income_rejects_any_spending() {
        let mut ledger = ledger();
        assert!(ledger.update_income(0.0).unwrap().success);
        let result = ledger.add_expense("Coffee", 0.5, "food", today()).unwrap();
        assert!(!result.success);
        assert!(!ledger.check_budget(0.5, this_month()).is_allowed());
        assert!(ledger.check_budget(0.0, this_month()).is_allowed());
    }

    #[test]
    fn goal_payment_counts_against_budget() {
        let mut ledger = ledger();
        let goal_id = created_id(&ledger.add_goal("Trip", 200_000.0, false).unwrap());
        ledger.add_expense("Rent", 70_000.0, "housing", today()).unwrap();

        let result = ledger.add_goal_payment(goal_id, 6_000.0, today()).unwrap();
        assert!(!result.success);
        assert_eq!(ledger.goal(goal_id).unwrap().current_amount, 0.0);

        assert!(ledger.add_goal_payment(goal_id, 5_000.0, today()).unwrap().success);
        assert_eq!(ledger.goal(goal_id).unwrap().current_amount, 5_000.0);
    }

    #[test]
    fn lowering_income_does_not_touch_history() {
        let mut ledger = ledger();
        ledger.add_expense("Rent", 50_000.0, "housing", today()).unwrap();
        assert!(ledger.update_income(10_000.0).unwrap().success);
        assert_eq!(ledger.expenses().len(), 1);
        assert_eq!(ledger.remaining_budget(this_month()), -40_000.0);
    }

    /// No month with expenses may spend more than income plus its returns.
    fn assert_budget_holds(ledger: &FinanceLedger) {
        let mut months: Vec<LedgerMonth> = ledger
            .expenses()
            .iter()
            .map(|e| LedgerMonth::of(e.date))
            .collect();
        months.sort();
        months.dedup();
        for month in months {
            let spent = metrics::monthly_spend(ledger.expenses(), month);
            let available =
                ledger.monthly_income() + metrics::monthly_returns(ledger.expenses(), month);
            assert!(spent <= available + 1e-6, "{month}: spent {spent} of {available}");
        }
    }

    fn step(ledger: &FinanceLedger, result: TransactionResult, accepted: bool) {
        assert_eq!(result.success, accepted, "unexpected outcome: {:?}", result.message);
        assert_budget_holds(ledger);
    }

    #[test]
    fn budget_holds_across_a_mixed_sequence() {
        let mut ledger = ledger();
        let goal = created_id(&ledger.add_goal("Trip", 200_000.0, false).unwrap());

        let acme = ledger.add_holding("Acme", "ACME", 100.0, 500.0).unwrap();
        let acme = created_id(&acme);
        assert_budget_holds(&ledger);
        let r = ledger.add_holding("Big", "BIG", 10.0, 3_000.0).unwrap();
        step(&ledger, r, false);

        let r = ledger.update_holding(acme, &HoldingUpdate::default().shares(140.0)).unwrap();
        step(&ledger, r, true);
        let r = ledger.update_holding(acme, &HoldingUpdate::default().shares(200.0)).unwrap();
        step(&ledger, r, false);

        let rent = ledger.add_expense("Rent", 5_000.0, "housing", today()).unwrap();
        let rent = created_id(&rent);
        assert_budget_holds(&ledger);
        let r = ledger.add_expense("Snack", 1.0, "food", today()).unwrap();
        step(&ledger, r, false);
        let r = ledger.add_goal_payment(goal, 1_000.0, today()).unwrap();
        step(&ledger, r, false);

        // 140 shares sold at 400 bring 56 000 back into this month.
        assert_eq!(ledger.apply_quote("ACME", 400.0).unwrap(), 1);
        let r = ledger.delete_holding(acme).unwrap();
        step(&ledger, r, true);
        let r = ledger.add_goal_payment(goal, 20_000.0, today()).unwrap();
        step(&ledger, r, true);

        let laptop = ledger.add_expense("Laptop", 70_000.0, "bills", last_month()).unwrap();
        let laptop = created_id(&laptop);
        assert_budget_holds(&ledger);

        // Moving it into this month gives nothing back to this month.
        let moved = ExpenseUpdate::default().date(today()).amount(60_000.0);
        let r = ledger.update_expense(laptop, &moved).unwrap();
        step(&ledger, r, false);
        let moved = ExpenseUpdate::default().date(today()).amount(36_000.0);
        let r = ledger.update_expense(laptop, &moved).unwrap();
        step(&ledger, r, true);
        assert!(ledger.remaining_budget(this_month()).abs() < 1e-6);

        let r = ledger.add_expense("Repairs", 75_000.0, "housing", last_month()).unwrap();
        step(&ledger, r, true);
        let r = ledger.update_expense(rent, &ExpenseUpdate::default().amount(5_000.01)).unwrap();
        step(&ledger, r, false);
        let r = ledger.update_expense(rent, &ExpenseUpdate::default().amount(4_000.0)).unwrap();
        step(&ledger, r, true);
    }
}

// ═══════════════════════════════════════════════════════════════════
// Portfolio transactions
// ═══════════════════════════════════════════════════════════════════

mod holdings {
    use super::*;

    #[test]
    fn buy_records_linked_investment_expense() {
        let mut ledger = ledger();
        let id = created_id(&ledger.add_holding("Tesla", "tsla", 50.0, 150.0).unwrap());

        let holding = ledger.holding(id).unwrap();
        assert_eq!(holding.ticker, "TSLA");
        assert_eq!(holding.current_price, 150.0);

        let purchase = ledger.linked_expense(ExpenseLink::Purchase(id)).unwrap();
        assert_eq!(purchase.amount, 7_500.0);
        assert_eq!(purchase.category, Category::Investment);
        assert_eq!(purchase.date, today());
        assert_eq!(purchase.description, "Bought 50 of TSLA");
    }

    #[test]
    fn buy_over_budget_changes_nothing() {
        let mut ledger = ledger();
        let before = ledger.state().clone();
        let result = ledger.add_holding("Berkshire", "BRK.A", 1.0, 75_001.0).unwrap();
        assert!(!result.success);
        assert_eq!(result.message.as_deref(), Some(BUDGET_MESSAGE));
        assert_eq!(ledger.state(), &before);
    }

    #[test]
    fn sell_adds_proceeds_and_frees_budget() {
        let mut ledger = ledger();
        let id = created_id(&ledger.add_holding("Tesla", "TSLA", 50.0, 150.0).unwrap());
        assert_eq!(ledger.apply_quote("TSLA", 175.0).unwrap(), 1);
        let before_sale = ledger.remaining_budget(this_month());

        assert!(ledger.delete_holding(id).unwrap().success);

        assert!(ledger.holding(id).is_none());
        let sale = ledger.linked_expense(ExpenseLink::Sale(id)).unwrap();
        assert_eq!(sale.amount, 8_750.0);
        assert_eq!(sale.category, Category::InvestmentReturn);
        assert_eq!(ledger.remaining_budget(this_month()) - before_sale, 8_750.0);

        // The purchase stays in history next to the sale.
        let summary = ledger.summary(this_month());
        assert_eq!(summary.monthly_spend, 7_500.0);
        assert_eq!(summary.monthly_returns, 8_750.0);
    }

    #[test]
    fn selling_unknown_holding_is_a_silent_noop() {
        let mut ledger = ledger();
        let before = ledger.state().clone();
        let result = ledger.delete_holding(Uuid::new_v4()).unwrap();
        assert!(result.success);
        assert_eq!(ledger.state(), &before);
    }

    #[test]
    fn sale_proceeds_allow_further_spending() {
        let mut ledger = ledger();
        let aapl = ledger.portfolio()[0].id;
        // Seeded AAPL: 50 × 175.28
        ledger.delete_holding(aapl).unwrap();
        let result = ledger.add_expense("Laptop", 80_000.0, "electronics", today()).unwrap();
        assert!(result.success);
    }

    #[test]
    fn update_rewrites_linked_expense_without_duplicating() {
        let mut ledger = ledger();
        let id = created_id(&ledger.add_holding("Tesla", "TSLA", 10.0, 100.0).unwrap());

        let update = HoldingUpdate::default().shares(20.0).avg_price(110.0);
        assert!(ledger.update_holding(id, &update).unwrap().success);

        let purchases: Vec<_> = ledger
            .expenses()
            .iter()
            .filter(|e| e.link == Some(ExpenseLink::Purchase(id)))
            .collect();
        assert_eq!(purchases.len(), 1);
        assert_eq!(purchases[0].amount, 2_200.0);
        assert_eq!(purchases[0].description, "Bought 20 of TSLA");
        assert_eq!(ledger.holding(id).unwrap().shares, 20.0);
        assert_eq!(ledger.expenses().len(), 1);
    }

    #[test]
    fn update_replaces_original_cost_in_budget() {
        let mut ledger = ledger();
        ledger.add_expense("Rent", 70_000.0, "housing", today()).unwrap();
        let id = created_id(&ledger.add_holding("Tesla", "TSLA", 10.0, 100.0).unwrap());

        // 71000 - 1000 + 5000 = 75000: exactly at the limit
        let ok = HoldingUpdate::default().shares(50.0);
        assert!(ledger.update_holding(id, &ok).unwrap().success);

        let before = ledger.state().clone();
        let too_much = HoldingUpdate::default().shares(51.0);
        let result = ledger.update_holding(id, &too_much).unwrap();
        assert!(!result.success);
        assert_eq!(ledger.state(), &before);
    }

    #[test]
    fn update_unknown_holding_is_rejected() {
        let mut ledger = ledger();
        let result = ledger
            .update_holding(Uuid::new_v4(), &HoldingUpdate::default().shares(1.0))
            .unwrap();
        assert!(!result.success);
        assert!(result.message.unwrap().contains("Holding not found"));
    }

    #[test]
    fn update_seeded_holding_without_purchase_record() {
        // Seeded holdings were never bought through the ledger.
        let mut ledger = ledger();
        let msft = ledger.portfolio()[1].id;
        let result = ledger
            .update_holding(msft, &HoldingUpdate::default().shares(40.0))
            .unwrap();
        assert!(result.success);
        assert_eq!(ledger.holding(msft).unwrap().shares, 40.0);
        assert!(ledger.expenses().is_empty());
    }

    #[test]
    fn invalid_holding_input_is_rejected() {
        let mut ledger = ledger();
        for (name, ticker, shares, price) in [
            ("", "X", 1.0, 1.0),
            ("X", "  ", 1.0, 1.0),
            ("X", "X", 0.0, 1.0),
            ("X", "X", 1.0, -5.0),
            ("X", "X", f64::NAN, 1.0),
        ] {
            let result = ledger.add_holding(name, ticker, shares, price).unwrap();
            assert!(!result.success, "{name:?}/{ticker:?}/{shares}/{price} accepted");
        }
        assert_eq!(ledger.portfolio().len(), 2);
    }
}

// ═══════════════════════════════════════════════════════════════════
// Quotes
// ═══════════════════════════════════════════════════════════════════

mod quotes {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn quote_matches_ticker_case_insensitively() {
        let mut ledger = ledger();
        assert_eq!(ledger.apply_quote("aapl", 200.0).unwrap(), 1);
        assert_eq!(ledger.portfolio()[0].current_price, 200.0);
        assert!(ledger.expenses().is_empty());
    }

    #[test]
    fn invalid_or_unknown_quotes_are_ignored() {
        let mut ledger = ledger();
        let before = ledger.state().clone();
        assert_eq!(ledger.apply_quote("AAPL", f64::NAN).unwrap(), 0);
        assert_eq!(ledger.apply_quote("AAPL", -1.0).unwrap(), 0);
        assert_eq!(ledger.apply_quote("GOOG", 100.0).unwrap(), 0);
        assert_eq!(ledger.state(), &before);
    }

    #[test]
    fn quotes_bypass_budget() {
        let mut ledger = ledger();
        ledger.add_expense("Rent", 75_000.0, "housing", today()).unwrap();
        let quotes = HashMap::from([("AAPL".to_string(), 1_000.0), ("MSFT".to_string(), 2_000.0)]);
        assert_eq!(ledger.apply_quotes(&quotes).unwrap(), 2);
        assert_eq!(ledger.summary(this_month()).portfolio_value, 50.0 * 1_000.0 + 30.0 * 2_000.0);
    }
}

// ═══════════════════════════════════════════════════════════════════
// Goals
// ═══════════════════════════════════════════════════════════════════

mod goals {
    use super::*;

    fn goal_at_900(ledger: &mut FinanceLedger) -> Uuid {
        let id = created_id(&ledger.add_goal("Trip", 1_000.0, false).unwrap());
        assert!(ledger.add_goal_payment(id, 900.0, today()).unwrap().success);
        id
    }

    #[test]
    fn add_goal_starts_empty_without_budget_check() {
        let mut ledger = ledger();
        ledger.add_expense("Rent", 75_000.0, "housing", today()).unwrap();
        let id = created_id(&ledger.add_goal("House", 5_000_000.0, true).unwrap());
        let goal = ledger.goal(id).unwrap();
        assert_eq!(goal.current_amount, 0.0);
        assert!(goal.is_loan);
    }

    #[test]
    fn clamp_policy_records_only_what_completes_the_goal() {
        let mut ledger = ledger();
        let id = goal_at_900(&mut ledger);

        let result = ledger.add_goal_payment(id, 500.0, today()).unwrap();
        let expense_id = created_id(&result);

        assert_eq!(ledger.goal(id).unwrap().current_amount, 1_000.0);
        let payment = ledger.expense(expense_id).unwrap();
        assert_eq!(payment.amount, 100.0);
        assert_eq!(payment.category, Category::Goals);
        assert_eq!(payment.link, Some(ExpenseLink::GoalPayment(id)));
        assert_eq!(payment.description, "Payment for goal: Trip");
    }

    #[test]
    fn clamp_policy_rejects_paying_a_funded_goal() {
        let mut ledger = ledger();
        let id = goal_at_900(&mut ledger);
        ledger.add_goal_payment(id, 100.0, today()).unwrap();
        let count = ledger.expenses().len();

        let result = ledger.add_goal_payment(id, 50.0, today()).unwrap();
        assert!(!result.success);
        assert!(result.message.unwrap().contains("already fully funded"));
        assert_eq!(ledger.expenses().len(), count);
    }

    #[test]
    fn record_requested_policy_records_full_amount() {
        let mut ledger = open_with(
            Arc::new(MemoryLedgerStore::new()),
            OverpaymentPolicy::RecordRequested,
        );
        let id = goal_at_900(&mut ledger);

        let expense_id = created_id(&ledger.add_goal_payment(id, 500.0, today()).unwrap());

        assert_eq!(ledger.goal(id).unwrap().current_amount, 1_000.0);
        assert_eq!(ledger.expense(expense_id).unwrap().amount, 500.0);
    }

    #[test]
    fn unknown_goal_is_rejected() {
        let mut ledger = ledger();
        let result = ledger.add_goal_payment(Uuid::new_v4(), 10.0, today()).unwrap();
        assert!(!result.success);
        assert_eq!(result.message.as_deref(), Some("Goal not found."));
    }

    #[test]
    fn payment_is_budgeted_in_its_own_month() {
        let mut ledger = ledger();
        let id = created_id(&ledger.add_goal("Car", 500_000.0, false).unwrap());
        ledger.add_expense("Rent", 75_000.0, "housing", today()).unwrap();
        assert!(ledger.add_goal_payment(id, 10_000.0, last_month()).unwrap().success);
    }
}

// ═══════════════════════════════════════════════════════════════════
// Manual expenses & the read-only rule
// ═══════════════════════════════════════════════════════════════════

mod expenses {
    use super::*;

    #[test]
    fn custom_category_is_normalized() {
        let mut ledger = ledger();
        let id = created_id(&ledger.add_expense("Gym", 2_000.0, "  Fitness ", today()).unwrap());
        assert_eq!(
            ledger.expense(id).unwrap().category,
            Category::Custom("fitness".into())
        );
    }

    #[test]
    fn system_category_cannot_be_entered_manually() {
        let mut ledger = ledger();
        for category in ["investment", "Investment_Return", "goals"] {
            let result = ledger.add_expense("Fake", 10.0, category, today()).unwrap();
            assert!(!result.success, "{category} accepted");
        }
        let result = ledger.add_expense("Blank", 10.0, "   ", today()).unwrap();
        assert_eq!(
            result.message.as_deref(),
            Some("Please enter a name for your custom category.")
        );
        assert!(ledger.expenses().is_empty());
    }

    #[test]
    fn system_generated_expenses_are_read_only() {
        let mut ledger = ledger();
        let holding = created_id(&ledger.add_holding("Tesla", "TSLA", 1.0, 100.0).unwrap());
        let purchase = ledger.linked_expense(ExpenseLink::Purchase(holding)).unwrap().id;

        let deleted = ledger.delete_expense(purchase).unwrap();
        assert!(!deleted.success);
        assert!(deleted.message.unwrap().starts_with("Automated transactions"));

        let updated = ledger
            .update_expense(purchase, &ExpenseUpdate::default().amount(1.0))
            .unwrap();
        assert!(!updated.success);
        assert_eq!(ledger.expense(purchase).unwrap().amount, 100.0);
    }

    #[test]
    fn manual_expense_cannot_become_system_generated() {
        let mut ledger = ledger();
        let id = created_id(&ledger.add_expense("Lunch", 200.0, "food", today()).unwrap());
        let result = ledger
            .update_expense(id, &ExpenseUpdate::default().category(Category::Goals))
            .unwrap();
        assert!(!result.success);
        assert_eq!(ledger.expense(id).unwrap().category, Category::Food);
    }

    #[test]
    fn update_replaces_original_amount_in_same_month() {
        let mut ledger = ledger();
        ledger.add_expense("Rent", 70_000.0, "housing", today()).unwrap();
        let id = created_id(&ledger.add_expense("Groceries", 5_000.0, "food", today()).unwrap());

        let exact = ExpenseUpdate::default().amount(5_000.0).description("Big shop");
        assert!(ledger.update_expense(id, &exact).unwrap().success);
        assert_eq!(ledger.expense(id).unwrap().description, "Big shop");

        let over = ExpenseUpdate::default().amount(5_000.01);
        let result = ledger.update_expense(id, &over).unwrap();
        assert!(!result.success);
        assert_eq!(ledger.expense(id).unwrap().amount, 5_000.0);
    }

    #[test]
    fn moving_to_another_month_checks_that_months_budget() {
        let mut ledger = ledger();
        ledger.add_expense("Rent", 75_000.0, "housing", last_month()).unwrap();
        let id = created_id(&ledger.add_expense("Groceries", 5_000.0, "food", today()).unwrap());

        // Last month is full; the amount moved in must fit on top of it.
        let moved = ExpenseUpdate::default().date(last_month());
        let result = ledger.update_expense(id, &moved).unwrap();
        assert!(!result.success);
        assert_eq!(ledger.expense(id).unwrap().date, today());
    }

    #[test]
    fn update_unknown_expense_is_rejected() {
        let mut ledger = ledger();
        let result = ledger
            .update_expense(Uuid::new_v4(), &ExpenseUpdate::default().amount(1.0))
            .unwrap();
        assert!(!result.success);
        assert!(result.message.unwrap().contains("Expense not found"));
    }

    #[test]
    fn delete_manual_expense_and_unknown_id() {
        let mut ledger = ledger();
        let id = created_id(&ledger.add_expense("Taxi", 300.0, "transport", today()).unwrap());
        assert!(ledger.delete_expense(id).unwrap().success);
        assert!(ledger.expense(id).is_none());
        assert!(ledger.delete_expense(id).unwrap().success);
    }

    #[test]
    fn invalid_amounts_and_income_are_rejected() {
        let mut ledger = ledger();
        assert!(!ledger.add_expense("X", 0.0, "food", today()).unwrap().success);
        assert!(!ledger.add_expense("X", -3.0, "food", today()).unwrap().success);
        assert!(!ledger.add_expense("X", f64::INFINITY, "food", today()).unwrap().success);
        assert!(!ledger.add_expense(" ", 3.0, "food", today()).unwrap().success);
        assert!(!ledger.update_income(-1.0).unwrap().success);
        assert!(!ledger.update_income(f64::NAN).unwrap().success);
        assert_eq!(ledger.monthly_income(), 75_000.0);
    }

    #[test]
    fn custom_names_are_normalized_before_saving() {
        let store: Arc<dyn LedgerStore> = Arc::new(MemoryLedgerStore::new());
        let mut ledger = open_with(store.clone(), OverpaymentPolicy::default());
        let lunch = created_id(&ledger.add_expense("Lunch", 100.0, "food", today()).unwrap());
        let taxi = created_id(&ledger.add_expense("Taxi", 300.0, "transport", today()).unwrap());

        for name in ["investment", "Goals", " investment_return "] {
            let forged = ExpenseUpdate::default().category(Category::Custom(name.into()));
            let result = ledger.update_expense(lunch, &forged).unwrap();
            assert!(!result.success, "{name} accepted");
        }
        assert_eq!(ledger.expense(lunch).unwrap().category, Category::Food);

        let to_food = ExpenseUpdate::default().category(Category::Custom("Food".into()));
        assert!(ledger.update_expense(taxi, &to_food).unwrap().success);
        assert_eq!(ledger.expense(taxi).unwrap().category, Category::Food);

        let to_pets = ExpenseUpdate::default().category(Category::Custom(" Pet Care ".into()));
        assert!(ledger.update_expense(lunch, &to_pets).unwrap().success);
        assert_eq!(
            ledger.expense(lunch).unwrap().category,
            Category::Custom("pet care".into())
        );

        let before = ledger.state().clone();
        let mut reopened = open_with(store, OverpaymentPolicy::default());
        assert_eq!(reopened.state(), &before);
        assert!(reopened.delete_expense(lunch).unwrap().success);
        assert!(reopened.delete_expense(taxi).unwrap().success);
        assert!(reopened.expenses().is_empty());
    }
}

// ═══════════════════════════════════════════════════════════════════
// Persistence & atomicity
// ═══════════════════════════════════════════════════════════════════

mod persistence {
    use super::*;

    #[test]
    fn every_commit_is_persisted() {
        let store = Arc::new(MemoryLedgerStore::new());
        let mut ledger = open_with(store.clone(), OverpaymentPolicy::default());
        ledger.add_holding("Tesla", "TSLA", 2.0, 100.0).unwrap();
        ledger.add_expense("Lunch", 250.0, "food", today()).unwrap();
        ledger.update_income(80_000.0).unwrap();

        let reopened = open_with(store, OverpaymentPolicy::default());
        assert_eq!(reopened.state(), ledger.state());
    }

    #[test]
    fn failed_save_leaves_state_untouched() {
        let store = Arc::new(FlakyStore::default());
        let mut ledger = open_with(store.clone(), OverpaymentPolicy::default());
        let before = ledger.state().clone();

        store.set_failing(true);
        let err = ledger.add_holding("Tesla", "TSLA", 1.0, 100.0).unwrap_err();
        assert!(matches!(err, CoreError::Persistence(_)));
        assert!(ledger.add_expense("Lunch", 10.0, "food", today()).is_err());
        assert!(ledger.apply_quote("AAPL", 1.0).is_err());
        assert_eq!(ledger.state(), &before);

        store.set_failing(false);
        assert!(ledger.add_expense("Lunch", 10.0, "food", today()).unwrap().success);
        assert_eq!(ledger.expenses().len(), 1);
    }

    #[test]
    fn rejection_does_not_save() {
        let store = Arc::new(FlakyStore::default());
        let mut ledger = open_with(store.clone(), OverpaymentPolicy::default());
        store.set_failing(true);
        // A rejection never reaches the store, so the failing store is not hit.
        let result = ledger.add_expense("Yacht", 1e9, "fun", today()).unwrap();
        assert!(!result.success);
    }

    #[test]
    fn persistence_error_is_not_a_rejection() {
        assert!(!CoreError::Persistence("x".into()).is_rejection());
        assert!(CoreError::InsufficientBudget.is_rejection());
    }
}

// ═══════════════════════════════════════════════════════════════════
// Queries & export
// ═══════════════════════════════════════════════════════════════════

mod queries {
    use super::*;

    fn ledger_with_expenses() -> FinanceLedger {
        let mut ledger = ledger();
        ledger.add_expense("Lunch, with team", 300.0, "food", today()).unwrap();
        ledger.add_expense("Bus pass", 1_200.0, "transport", last_month()).unwrap();
        ledger.add_expense("Cinema", 500.0, "entertainment", today()).unwrap();
        ledger
    }

    #[test]
    fn expenses_in_month_only_that_month() {
        let ledger = ledger_with_expenses();
        let current = ledger.expenses_in_month(this_month());
        assert_eq!(current.len(), 2);
        assert!(current.iter().all(|e| this_month().contains(e.date)));
    }

    #[test]
    fn search_matches_description_and_category() {
        let ledger = ledger_with_expenses();
        assert_eq!(ledger.search_expenses("LUNCH").len(), 1);
        assert_eq!(ledger.search_expenses("transport").len(), 1);
        assert!(ledger.search_expenses("rent").is_empty());
    }

    #[test]
    fn sorted_listings() {
        let ledger = ledger_with_expenses();
        let by_amount = ledger.expenses_sorted(&ExpenseSortOrder::AmountDesc);
        assert_eq!(by_amount[0].amount, 1_200.0);
        let by_date = ledger.expenses_sorted(&ExpenseSortOrder::DateAsc);
        assert_eq!(by_date[0].description, "Bus pass");
        let by_category = ledger.expenses_sorted(&ExpenseSortOrder::CategoryAsc);
        assert_eq!(by_category[0].category, Category::Entertainment);
    }

    #[test]
    fn csv_export_escapes_fields() {
        let ledger = ledger_with_expenses();
        let csv = ledger.export_expenses_to_csv();
        let lines: Vec<&str> = csv.lines().collect();
        assert_eq!(lines[0], "id,date,description,category,amount,link");
        assert_eq!(lines.len(), 4);
        assert!(lines[1].contains("\"Lunch, with team\",food,300,"));
    }

    #[test]
    fn json_exports_parse_back() {
        let ledger = ledger_with_expenses();
        let expenses: serde_json::Value =
            serde_json::from_str(&ledger.export_expenses_to_json().unwrap()).unwrap();
        assert_eq!(expenses.as_array().unwrap().len(), 3);

        let full: serde_json::Value = serde_json::from_str(&ledger.to_json().unwrap()).unwrap();
        assert_eq!(full["monthly_income"], 75_000.0);
        assert_eq!(full["portfolio"].as_array().unwrap().len(), 2);
    }

    #[test]
    fn snapshot_is_detached() {
        let mut ledger = ledger_with_expenses();
        let snapshot = ledger.snapshot(this_month());
        assert_eq!(snapshot.monthly_expenses.len(), 2);
        ledger.update_income(1.0).unwrap();
        assert_eq!(snapshot.monthly_income, 75_000.0);
    }
}
