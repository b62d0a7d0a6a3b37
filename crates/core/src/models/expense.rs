use chrono::NaiveDate;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use uuid::Uuid;

use crate::errors::CoreError;

/// Expense category.
///
/// `Investment`, `InvestmentReturn` and `Goals` are system-generated: they are
/// only ever written as a side effect of a portfolio or goal transaction.
/// Everything else is user-editable.
///
/// Serialized as its lowercase name (`"food"`, `"investment_return"`, or the
/// custom name itself), so stored records stay readable and stable.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Category {
    Food,
    Transport,
    Housing,
    Bills,
    Entertainment,
    /// Cash leaving the budget to buy a holding
    Investment,
    /// Cash entering the budget from a sale
    InvestmentReturn,
    /// Cash leaving the budget toward a goal payment
    Goals,
    /// Free-form user category, stored trimmed and lowercased
    Custom(String),
}

impl Category {
    pub fn as_str(&self) -> &str {
        match self {
            Category::Food => "food",
            Category::Transport => "transport",
            Category::Housing => "housing",
            Category::Bills => "bills",
            Category::Entertainment => "entertainment",
            Category::Investment => "investment",
            Category::InvestmentReturn => "investment_return",
            Category::Goals => "goals",
            Category::Custom(name) => name,
        }
    }

    /// System-generated categories are read-only for direct edits.
    pub fn is_system_generated(&self) -> bool {
        matches!(
            self,
            Category::Investment | Category::InvestmentReturn | Category::Goals
        )
    }

    /// Returns are the only category that adds to the monthly budget.
    pub fn is_return(&self) -> bool {
        matches!(self, Category::InvestmentReturn)
    }

    /// Parse a category chosen by a user for a manual expense.
    ///
    /// Built-in manual names map to their variant, anything else becomes a
    /// custom category. System category names are refused so a user can't
    /// forge an automated transaction by typing its name.
    pub fn manual(input: &str) -> Result<Self, CoreError> {
        let name = input.trim().to_lowercase();
        if name.is_empty() {
            return Err(CoreError::Validation(
                "Please enter a name for your custom category.".into(),
            ));
        }
        let category = Self::from_name(&name);
        if category.is_system_generated() {
            return Err(CoreError::ReadOnlyExpense(format!(
                "'{name}' is reserved for automated transactions"
            )));
        }
        Ok(category)
    }

    fn from_name(name: &str) -> Self {
        match name {
            "food" => Category::Food,
            "transport" => Category::Transport,
            "housing" => Category::Housing,
            "bills" => Category::Bills,
            "entertainment" => Category::Entertainment,
            "investment" => Category::Investment,
            "investment_return" => Category::InvestmentReturn,
            "goals" => Category::Goals,
            other => Category::Custom(other.to_string()),
        }
    }
}

impl std::fmt::Display for Category {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for Category {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for Category {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let name = String::deserialize(deserializer)?;
        Ok(Self::from_name(&name))
    }
}

/// Foreign key from a system-generated expense to the transaction that
/// produced it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ExpenseLink {
    /// Purchase cost of the holding with this id
    Purchase(Uuid),
    /// Sale proceeds of the holding with this id
    Sale(Uuid),
    /// A payment toward the goal with this id
    GoalPayment(Uuid),
}

/// A single cash movement in the ledger.
///
/// Manual expenses have no `link`; linked ones are maintained by the
/// transaction engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Expense {
    pub id: Uuid,
    pub description: String,
    /// Always positive; direction comes from the category.
    pub amount: f64,
    pub category: Category,
    pub date: NaiveDate,
    pub link: Option<ExpenseLink>,
}

impl Expense {
    pub fn new(
        description: impl Into<String>,
        amount: f64,
        category: Category,
        date: NaiveDate,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            description: description.into().trim().to_string(),
            amount,
            category,
            date,
            link: None,
        }
    }

    /// An expense produced as a side effect of a portfolio or goal transaction.
    pub fn linked(
        description: impl Into<String>,
        amount: f64,
        category: Category,
        date: NaiveDate,
        link: ExpenseLink,
    ) -> Self {
        Self {
            link: Some(link),
            ..Self::new(description, amount, category, date)
        }
    }
}

/// Partial update for a manual expense. `None` keeps the current value.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ExpenseUpdate {
    pub description: Option<String>,
    pub amount: Option<f64>,
    pub category: Option<Category>,
    pub date: Option<NaiveDate>,
}

impl ExpenseUpdate {
    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn amount(mut self, amount: f64) -> Self {
        self.amount = Some(amount);
        self
    }

    pub fn category(mut self, category: Category) -> Self {
        self.category = Some(category);
        self
    }

    pub fn date(mut self, date: NaiveDate) -> Self {
        self.date = Some(date);
        self
    }
}

/// Sort order for expense listings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExpenseSortOrder {
    /// Newest date first (default for display)
    DateDesc,
    DateAsc,
    AmountDesc,
    AmountAsc,
    /// Alphabetical by category name
    CategoryAsc,
}
