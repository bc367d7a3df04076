//! Command registry
//!
//! - **Version**: 1.1.0
//! - **Since**: 0.1.0
//!
//! ## Changelog
//! - 1.1.0: Prefix commands resolved by name or alias, kept out of registration
//! - 1.0.0: Commands keyed by descriptor name, registration payloads

use log::warn;
use serenity::builder::CreateApplicationCommand;
use std::collections::HashMap;
use std::sync::Arc;

use super::handler::SlashCommand;

/// Registry mapping command names to commands
///
/// # Example
///
/// ```ignore
/// let mut registry = CommandRegistry::new();
/// registry.register(Arc::new(Ping::new()));
///
/// if let Some(command) = registry.get("ping") {
///     command.execute(ctx, &interaction, &i18n).await?;
/// }
/// ```
#[derive(Clone)]
pub struct CommandRegistry {
    commands: HashMap<&'static str, Arc<dyn SlashCommand>>,
}

impl CommandRegistry {
    /// Create a new empty registry
    pub fn new() -> Self {
        Self {
            commands: HashMap::new(),
        }
    }

    /// Register a command under its descriptor name, replacing any previous
    /// command with the same name
    pub fn register(&mut self, command: Arc<dyn SlashCommand>) {
        let name = command.descriptor().name;
        if self.commands.insert(name, command).is_some() {
            warn!("Command {name} registered twice, keeping the latest");
        }
    }

    /// Get command by name
    ///
    /// Returns None if no command is registered for the given name.
    pub fn get(&self, name: &str) -> Option<Arc<dyn SlashCommand>> {
        self.commands.get(name).cloned()
    }

    /// Command invoked through a Discord interaction
    pub fn get_application(&self, name: &str) -> Option<Arc<dyn SlashCommand>> {
        self.get(name)
            .filter(|command| command.descriptor().kind.is_application())
    }

    /// Prefix command answering to `name`, aliases included
    pub fn get_prefix(&self, name: &str) -> Option<Arc<dyn SlashCommand>> {
        self.commands
            .values()
            .find(|command| {
                let descriptor = command.descriptor();
                !descriptor.kind.is_application() && descriptor.answers_to(name)
            })
            .cloned()
    }

    /// Check if a command is registered
    pub fn contains(&self, name: &str) -> bool {
        self.commands.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.commands.len()
    }

    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }

    /// Registration payloads for every application command, sorted by name
    pub fn application_commands(&self) -> Vec<CreateApplicationCommand> {
        let mut names: Vec<&&'static str> = self.commands.keys().collect();
        names.sort();
        names
            .into_iter()
            .filter_map(|name| self.commands.get(*name))
            .filter(|command| command.descriptor().kind.is_application())
            .map(|command| command.create_command())
            .collect()
    }
}

impl Default for CommandRegistry {
    fn default() -> Self {
        Self::new()
    }
}
