// Core layer - shared types and configuration
pub mod core;

// Features layer - process-level features
pub mod features;

// Infrastructure
pub mod database;
pub mod i18n;

// Application layer
pub mod commands;
pub mod dispatch;

pub use core::Config;
pub use dispatch::{InteractionDispatcher, InteractionEvent, Outcome};
