pub mod advice;
pub mod expense;
pub mod goal;
pub mod holding;
pub mod ledger;
pub mod month;
pub mod result;
pub mod summary;
pub mod user;
