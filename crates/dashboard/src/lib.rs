pub mod config;
pub mod dashboard;
pub mod db;
pub mod github;
pub mod reconcile;
pub mod reminders;
pub mod roast;
mod request_logging;
pub mod server;
pub mod store;
