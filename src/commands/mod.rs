//! # Command System
//!
//! Slash, context-menu and prefix commands, their descriptors and registration.
//!
//! - **Version**: 1.1.0
//! - **Since**: 0.1.0
//! - **Toggleable**: false
//!
//! ## Changelog
//! - 1.1.0: Prefix commands alongside application commands
//! - 1.0.0: Descriptor-driven commands dispatched through the interaction dispatcher

pub mod context;
pub mod descriptor;
pub mod handler;
pub mod handlers;
pub mod registry;

use anyhow::Result;
use log::info;
use serenity::model::application::command::Command;
use serenity::model::id::GuildId;
use serenity::prelude::Context;

pub use context::CommandContext;
pub use descriptor::{CommandDescriptor, CommandKind, DEFAULT_COOLDOWN};
pub use handler::SlashCommand;
pub use handlers::builtin_registry;
pub use registry::CommandRegistry;

/// Registers every command globally
pub async fn register_global_commands(ctx: &Context, registry: &CommandRegistry) -> Result<()> {
    let commands = registry.application_commands();
    let count = commands.len();

    Command::set_global_application_commands(&ctx.http, |builder| {
        for command in commands {
            builder.add_application_command(command);
        }
        builder
    })
    .await?;

    info!("Global application commands registered successfully ({count} commands)");
    Ok(())
}

/// Registers every command for a single guild (propagates instantly, used in development)
pub async fn register_guild_commands(
    ctx: &Context,
    guild_id: GuildId,
    registry: &CommandRegistry,
) -> Result<()> {
    let commands = registry.application_commands();
    let count = commands.len();

    guild_id
        .set_application_commands(&ctx.http, |builder| {
            for command in commands {
                builder.add_application_command(command);
            }
            builder
        })
        .await?;

    info!("Guild application commands registered for guild {guild_id} ({count} commands)");
    Ok(())
}
