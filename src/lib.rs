pub mod api;
pub mod config;
pub mod dashboard;
pub mod event;
pub mod logging;
pub mod public_form;
pub mod query;
pub mod reorder;
pub mod session;
