//! Command trait
//!
//! - **Version**: 1.0.0
//! - **Since**: 0.1.0
//!
//! ## Changelog
//! - 1.0.0: Commands carry a descriptor and receive the locale resolver

use anyhow::Result;
use async_trait::async_trait;
use serenity::builder::CreateApplicationCommand;
use std::sync::Arc;

use super::context::CommandContext;
use super::descriptor::CommandDescriptor;
use crate::dispatch::Invocation;
use crate::i18n::LocaleText;

/// A slash or context-menu command.
///
/// Commands are registered with a [`CommandRegistry`](super::CommandRegistry)
/// under their descriptor's name. The dispatcher decides whether an invocation
/// is admitted; `execute` only runs once every gate has passed.
///
/// # Example
///
/// ```ignore
/// pub struct Ping {
///     descriptor: CommandDescriptor,
/// }
///
/// #[async_trait]
/// impl SlashCommand for Ping {
///     fn descriptor(&self) -> &CommandDescriptor {
///         &self.descriptor
///     }
///
///     async fn execute(
///         &self,
///         ctx: Arc<CommandContext>,
///         interaction: &Invocation,
///         i18n: &LocaleText,
///     ) -> Result<()> {
///         interaction.responder.reply(Reply::text("Pong!")).await
///     }
/// }
/// ```
#[async_trait]
pub trait SlashCommand: Send + Sync {
    fn descriptor(&self) -> &CommandDescriptor;

    /// Registration payload sent to Discord
    fn create_command(&self) -> CreateApplicationCommand {
        self.descriptor().to_application_command()
    }

    /// Run the command. The interaction may be replied to once, or deferred
    /// and then edited once.
    async fn execute(
        &self,
        ctx: Arc<CommandContext>,
        interaction: &Invocation,
        i18n: &LocaleText,
    ) -> Result<()>;

    /// Answer an autocomplete request. Commands without suggestions answer
    /// with an empty list.
    async fn autocomplete(&self, _ctx: Arc<CommandContext>, interaction: &Invocation) -> Result<()> {
        interaction.responder.respond(Vec::new()).await
    }
}
