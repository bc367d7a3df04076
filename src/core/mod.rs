//! # Core Module
//!
//! Configuration, Discord message limits and shared embed builders.
//!
//! - **Version**: 1.0.0
//! - **Since**: 0.1.0
//! - **Toggleable**: false
//!
//! ## Changelog
//! - 1.0.0: Config, response helpers and shared embeds

pub mod config;
pub mod embeds;
pub mod response;

// Re-export commonly used items
pub use config::Config;
pub use embeds::{branded_embed, Colors};
pub use response::{
    bold, format_list, format_permissions, italic, truncate_for_embed, truncate_for_message,
    underline, EMBED_LIMIT, MESSAGE_LIMIT,
};
