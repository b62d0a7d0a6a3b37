pub mod advice_service;
pub mod budget_service;
pub mod ledger_service;
pub mod metrics;
pub mod quote_service;
