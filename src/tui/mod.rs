//! Terminal user interface for MISPA chat
//!
//! Ratatui panes over the session client: contacts sidebar, message list,
//! compose box, transient notifications.

mod app;
mod backend;
mod compose;
mod messages;
mod notify;
mod sidebar;
mod ui;

pub use app::run;
