//! Data models for MISPA entities and realtime events

mod event;
mod message;
mod user;

pub use event::*;
pub use message::*;
pub use user::*;
