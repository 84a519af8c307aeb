//! Discord adapter: the serenity-backed [`ChatPort`] implementation plus the
//! gateway event handler and slash command surface.
//!
//! [`ChatPort`]: guildbot_core::ports::ChatPort

pub mod chat;
mod commands;
mod handler;
pub mod start;

pub use start::run;
