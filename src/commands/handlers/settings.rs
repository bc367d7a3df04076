//! Guild settings commands
//!
//! Handles: language (set, reset, view)
//!
//! - **Version**: 1.0.0
//! - **Since**: 0.1.0

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use log::info;
use serenity::builder::CreateApplicationCommand;
use serenity::model::application::command::CommandOptionType;
use serenity::model::permissions::Permissions;
use std::sync::Arc;
use std::time::Duration;

use crate::commands::context::CommandContext;
use crate::commands::descriptor::CommandDescriptor;
use crate::commands::handler::SlashCommand;
use crate::core::{bold, format_list};
use crate::dispatch::{Choice, Invocation, Reply};
use crate::i18n::LocaleText;

/// /language
pub struct Language {
    descriptor: CommandDescriptor,
}

impl Language {
    pub fn new() -> Self {
        Self {
            descriptor: CommandDescriptor::new(
                "language",
                "Change the language of the bot in this server.",
            )
            .category("Settings")
            .guild_only()
            .user_permissions(Permissions::MANAGE_GUILD)
            .cooldown(Duration::from_secs(10)),
        }
    }
}

impl Default for Language {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl SlashCommand for Language {
    fn descriptor(&self) -> &CommandDescriptor {
        &self.descriptor
    }

    fn create_command(&self) -> CreateApplicationCommand {
        let mut command = self.descriptor.to_application_command();
        command
            .create_option(|option| {
                option
                    .name("set")
                    .description("Use a specific language in this server")
                    .kind(CommandOptionType::SubCommand)
                    .create_sub_option(|locale| {
                        locale
                            .name("locale")
                            .description("Language tag, e.g. en-US")
                            .kind(CommandOptionType::String)
                            .required(true)
                            .set_autocomplete(true)
                    })
            })
            .create_option(|option| {
                option
                    .name("reset")
                    .description("Follow the server's Discord language again")
                    .kind(CommandOptionType::SubCommand)
            })
            .create_option(|option| {
                option
                    .name("view")
                    .description("Show the language used in this server")
                    .kind(CommandOptionType::SubCommand)
            });
        command
    }

    async fn execute(
        &self,
        ctx: Arc<CommandContext>,
        interaction: &Invocation,
        i18n: &LocaleText,
    ) -> Result<()> {
        let guild_id = interaction
            .guild
            .id()
            .ok_or_else(|| anyhow!("language invoked outside a guild"))?;

        let reply = match interaction.subcommand.as_deref() {
            Some("set") => {
                let requested = interaction.string_option("locale").unwrap_or_default();
                if !ctx.i18n.has_locale(requested) {
                    let available: Vec<String> =
                        ctx.i18n.locales().into_iter().map(bold).collect();
                    Reply::ephemeral(i18n.text(
                        "commands:language_unknown",
                        &[
                            ("locale", requested),
                            ("available", format_list(&available).as_str()),
                        ],
                    ))
                } else {
                    ctx.settings
                        .set_guild_locale(guild_id, Some(requested))
                        .await?;
                    info!(
                        "[{}] Guild {guild_id} language set to {requested}",
                        interaction.request_id
                    );
                    // Confirm in the language just chosen
                    let chosen = ctx.i18n.set_locale(requested);
                    Reply::text(chosen.text("commands:language_set", &[("locale", requested)]))
                }
            }
            Some("reset") => {
                ctx.settings.set_guild_locale(guild_id, None).await?;
                info!(
                    "[{}] Guild {guild_id} language reset",
                    interaction.request_id
                );
                let fallback = match interaction.guild_locale.as_deref() {
                    Some(tag) => ctx.i18n.set_locale(tag),
                    None => ctx.i18n.default_locale(),
                };
                Reply::text(fallback.text("commands:language_reset", &[]))
            }
            _ => Reply::ephemeral(i18n.text("commands:language_current", &[("locale", i18n.tag())])),
        };

        interaction.responder.reply(reply).await
    }

    async fn autocomplete(&self, ctx: Arc<CommandContext>, interaction: &Invocation) -> Result<()> {
        let typed = interaction
            .focused_option()
            .and_then(|option| option.value.as_str())
            .unwrap_or_default()
            .to_lowercase();

        let choices = ctx
            .i18n
            .locales()
            .into_iter()
            .filter(|tag| tag.to_lowercase().starts_with(&typed))
            .map(|tag| Choice::new(tag, tag))
            .collect();

        interaction.responder.respond(choices).await
    }
}
