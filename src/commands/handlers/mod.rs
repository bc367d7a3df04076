//! Per-command implementations
//!
//! - **Version**: 1.1.0
//! - **Since**: 0.1.0
//!
//! ## Changelog
//! - 1.1.0: Add the butt prefix command
//! - 1.0.0: ping, advice, smile, language and the Avatar user menu

pub mod context_menu;
pub mod fun;
pub mod interact;
pub mod nsfw;
pub mod settings;
pub mod utility;

use std::sync::Arc;

use super::handler::SlashCommand;
use super::registry::CommandRegistry;

/// Create every built-in command
pub fn builtin_commands() -> Vec<Arc<dyn SlashCommand>> {
    vec![
        Arc::new(utility::Ping::new()),
        Arc::new(fun::Advice::new()),
        Arc::new(interact::Smile::new()),
        Arc::new(settings::Language::new()),
        Arc::new(context_menu::Avatar::new()),
        Arc::new(nsfw::Butt::new()),
    ]
}

/// Registry holding every built-in command
pub fn builtin_registry() -> CommandRegistry {
    let mut registry = CommandRegistry::new();
    for command in builtin_commands() {
        registry.register(command);
    }
    registry
}
