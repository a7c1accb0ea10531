pub mod config;
pub mod format;
pub mod observability;
pub mod types;
