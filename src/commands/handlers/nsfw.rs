//! Age-restricted prefix commands
//!
//! Handles: butt
//!
//! - **Version**: 1.0.0
//! - **Since**: 0.1.0

use anyhow::{Context as _, Result};
use async_trait::async_trait;
use serde::Deserialize;
use serenity::builder::CreateEmbed;
use std::sync::Arc;
use std::time::Duration;

use crate::commands::context::CommandContext;
use crate::commands::descriptor::{CommandDescriptor, CommandKind};
use crate::commands::handler::SlashCommand;
use crate::core::branded_embed;
use crate::dispatch::{Invocation, Reply, UserRef};
use crate::i18n::LocaleText;

pub const BUTTS_URL: &str = "http://api.obutts.ru/butts/0/1/random";
pub const BUTTS_MEDIA_URL: &str = "http://media.obutts.ru";

#[derive(Debug, Deserialize)]
struct ButtResponse {
    preview: String,
}

/// Full media URL of the first entry in a butts API answer
fn media_url(entries: &[ButtResponse]) -> Option<String> {
    let preview = entries.first()?.preview.trim_start_matches('/');
    Some(format!("{BUTTS_MEDIA_URL}/{preview}"))
}

/// !butt
pub struct Butt {
    descriptor: CommandDescriptor,
}

impl Butt {
    pub fn new() -> Self {
        Self {
            descriptor: CommandDescriptor::new("butt", "This command contain explicit content!")
                .kind(CommandKind::Prefix)
                .category("NSFW")
                .nsfw()
                .cooldown(Duration::from_secs(10)),
        }
    }
}

impl Default for Butt {
    fn default() -> Self {
        Self::new()
    }
}

fn butt_reply(i18n: &LocaleText, bot_name: &str, author: &UserRef, image_url: &str) -> Reply {
    let footer = i18n.text("misc:powered_by", &[("name", bot_name)]);
    let mut embed: CreateEmbed = branded_embed("", &footer, Some(&author.avatar_url));
    embed.image(image_url);
    Reply::embed(embed).link(i18n.text("commands:open_in_browser", &[]), image_url)
}

#[async_trait]
impl SlashCommand for Butt {
    fn descriptor(&self) -> &CommandDescriptor {
        &self.descriptor
    }

    async fn execute(
        &self,
        ctx: Arc<CommandContext>,
        interaction: &Invocation,
        i18n: &LocaleText,
    ) -> Result<()> {
        interaction.responder.defer(false).await?;

        let entries: Vec<ButtResponse> = ctx
            .get_json(BUTTS_URL)
            .await
            .context("Failed to fetch image")?;
        let image_url = media_url(&entries).context("Image API returned no entries")?;

        let reply = butt_reply(i18n, &ctx.bot_name, &interaction.user, &image_url);
        interaction.responder.edit_reply(reply).await
    }
}
