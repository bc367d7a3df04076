//! Interaction commands
//!
//! Handles: smile
//!
//! - **Version**: 1.0.0
//! - **Since**: 0.1.0

use anyhow::{anyhow, Context as _, Result};
use async_trait::async_trait;
use serde::Deserialize;
use serenity::builder::{CreateApplicationCommand, CreateEmbed};
use serenity::model::application::command::CommandOptionType;
use std::sync::Arc;

use crate::commands::context::CommandContext;
use crate::commands::descriptor::CommandDescriptor;
use crate::commands::handler::SlashCommand;
use crate::core::branded_embed;
use crate::dispatch::{Invocation, Reply, UserRef};
use crate::i18n::LocaleText;

pub const SMILE_URL: &str = "https://api.waifu.pics/sfw/smile";

#[derive(Debug, Deserialize)]
struct ImageResponse {
    url: String,
}

/// /smile
pub struct Smile {
    descriptor: CommandDescriptor,
}

impl Smile {
    pub fn new() -> Self {
        Self {
            descriptor: CommandDescriptor::new("smile", "Someone made you smile.")
                .category("Interact")
                .guild_only(),
        }
    }
}

impl Default for Smile {
    fn default() -> Self {
        Self::new()
    }
}

fn smile_embed(
    i18n: &LocaleText,
    bot_name: &str,
    target: &UserRef,
    author: &UserRef,
    image_url: &str,
) -> CreateEmbed {
    let description = i18n.text(
        "commands:smile",
        &[("target", target.name.as_str()), ("user", author.name.as_str())],
    );
    let footer = i18n.text("misc:powered_by", &[("name", bot_name)]);
    let mut embed = branded_embed(&description, &footer, Some(&author.avatar_url));
    embed.image(image_url);
    embed
}

#[async_trait]
impl SlashCommand for Smile {
    fn descriptor(&self) -> &CommandDescriptor {
        &self.descriptor
    }

    fn create_command(&self) -> CreateApplicationCommand {
        let mut command = self.descriptor.to_application_command();
        command.create_option(|option| {
            option
                .name("user")
                .description("The user who made you smile")
                .kind(CommandOptionType::User)
                .required(true)
        });
        command
    }

    async fn execute(
        &self,
        ctx: Arc<CommandContext>,
        interaction: &Invocation,
        i18n: &LocaleText,
    ) -> Result<()> {
        let target = interaction
            .user_option("user")
            .ok_or_else(|| anyhow!("smile invoked without a resolved user option"))?;

        interaction.responder.defer(false).await?;

        let image: ImageResponse = ctx
            .get_json(SMILE_URL)
            .await
            .context("Failed to fetch smile image")?;

        let embed = smile_embed(i18n, &ctx.bot_name, target, &interaction.user, &image.url);
        interaction.responder.edit_reply(Reply::embed(embed)).await
    }
}
