//! Command descriptors
//!
//! Static metadata the dispatcher reads to admit or refuse an invocation, plus
//! what Discord needs to register the command.

use serenity::builder::CreateApplicationCommand;
use serenity::model::application::command::CommandType;
use serenity::model::permissions::Permissions;
use std::time::Duration;

/// Cooldown applied when a command does not declare one
pub const DEFAULT_COOLDOWN: Duration = Duration::from_millis(3000);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandKind {
    ChatInput,
    UserMenu,
    MessageMenu,
    /// Text command typed after the message prefix, never registered with Discord
    Prefix,
}

impl CommandKind {
    /// Registered with Discord and invoked through interactions
    pub fn is_application(self) -> bool {
        !matches!(self, CommandKind::Prefix)
    }
}

#[derive(Debug, Clone)]
pub struct CommandDescriptor {
    pub name: &'static str,
    pub description: &'static str,
    pub kind: CommandKind,
    /// Extra names a prefix command answers to
    pub aliases: &'static [&'static str],
    pub category: &'static str,
    pub enabled: bool,
    /// Only runs while the process is in unsafe mode
    pub is_unsafe: bool,
    pub owner_only: bool,
    pub guild_only: bool,
    pub nsfw: bool,
    /// Replaces the configured default set when present
    pub user_permissions: Option<Permissions>,
    pub bot_permissions: Option<Permissions>,
    pub cooldown: Duration,
}

impl CommandDescriptor {
    pub fn new(name: &'static str, description: &'static str) -> Self {
        Self {
            name,
            description,
            kind: CommandKind::ChatInput,
            aliases: &[],
            category: "General",
            enabled: true,
            is_unsafe: false,
            owner_only: false,
            guild_only: false,
            nsfw: false,
            user_permissions: None,
            bot_permissions: None,
            cooldown: DEFAULT_COOLDOWN,
        }
    }

    pub fn kind(mut self, kind: CommandKind) -> Self {
        self.kind = kind;
        self
    }

    pub fn aliases(mut self, aliases: &'static [&'static str]) -> Self {
        self.aliases = aliases;
        self
    }

    /// Name or alias match, case-insensitive
    pub fn answers_to(&self, name: &str) -> bool {
        self.name.eq_ignore_ascii_case(name)
            || self.aliases.iter().any(|alias| alias.eq_ignore_ascii_case(name))
    }

    pub fn category(mut self, category: &'static str) -> Self {
        self.category = category;
        self
    }

    pub fn enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    pub fn unsafe_only(mut self) -> Self {
        self.is_unsafe = true;
        self
    }

    pub fn owner_only(mut self) -> Self {
        self.owner_only = true;
        self
    }

    pub fn guild_only(mut self) -> Self {
        self.guild_only = true;
        self
    }

    pub fn nsfw(mut self) -> Self {
        self.nsfw = true;
        self
    }

    pub fn user_permissions(mut self, permissions: Permissions) -> Self {
        self.user_permissions = Some(permissions);
        self
    }

    pub fn bot_permissions(mut self, permissions: Permissions) -> Self {
        self.bot_permissions = Some(permissions);
        self
    }

    pub fn cooldown(mut self, cooldown: Duration) -> Self {
        self.cooldown = cooldown;
        self
    }

    /// Base registration payload; handlers add their options on top
    pub fn to_application_command(&self) -> CreateApplicationCommand {
        let mut command = CreateApplicationCommand::default();
        command.name(self.name);
        match self.kind {
            CommandKind::ChatInput => {
                command.kind(CommandType::ChatInput).description(self.description);
            }
            CommandKind::UserMenu => {
                command.kind(CommandType::User);
            }
            CommandKind::MessageMenu => {
                command.kind(CommandType::Message);
            }
            CommandKind::Prefix => {}
        }
        if self.guild_only {
            command.dm_permission(false);
        }
        if let Some(permissions) = self.user_permissions {
            command.default_member_permissions(permissions);
        }
        command
    }
}
