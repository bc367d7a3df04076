//! Context menu commands
//!
//! Handles: Avatar (user menu)
//!
//! - **Version**: 1.0.0
//! - **Since**: 0.1.0

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use serenity::builder::CreateEmbed;
use std::sync::Arc;

use crate::commands::context::CommandContext;
use crate::commands::descriptor::{CommandDescriptor, CommandKind};
use crate::commands::handler::SlashCommand;
use crate::core::branded_embed;
use crate::dispatch::{Invocation, Reply, UserRef};
use crate::i18n::LocaleText;

/// "Avatar" entry in the user context menu
pub struct Avatar {
    descriptor: CommandDescriptor,
}

impl Avatar {
    pub fn new() -> Self {
        Self {
            descriptor: CommandDescriptor::new("Avatar", "")
                .kind(CommandKind::UserMenu)
                .category("Utility"),
        }
    }
}

impl Default for Avatar {
    fn default() -> Self {
        Self::new()
    }
}

fn avatar_embed(i18n: &LocaleText, bot_name: &str, target: &UserRef, author: &UserRef) -> CreateEmbed {
    let footer = i18n.text("misc:powered_by", &[("name", bot_name)]);
    let mut embed = branded_embed("", &footer, Some(&author.avatar_url));
    embed
        .title(i18n.text("commands:avatar", &[("user", target.name.as_str())]))
        .url(&target.avatar_url)
        .image(&target.avatar_url);
    embed
}

#[async_trait]
impl SlashCommand for Avatar {
    fn descriptor(&self) -> &CommandDescriptor {
        &self.descriptor
    }

    async fn execute(
        &self,
        ctx: Arc<CommandContext>,
        interaction: &Invocation,
        i18n: &LocaleText,
    ) -> Result<()> {
        let target = interaction
            .target()
            .ok_or_else(|| anyhow!("Avatar invoked without a resolved target user"))?;

        let embed = avatar_embed(i18n, &ctx.bot_name, target, &interaction.user);
        interaction.responder.reply(Reply::embed(embed)).await
    }
}
