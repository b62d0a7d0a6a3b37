pub mod encryption;
pub mod file_store;
pub mod format;
pub mod manager;
pub mod store;
