//! Utility commands
//!
//! Handles: ping
//!
//! - **Version**: 1.0.0
//! - **Since**: 0.1.0

use anyhow::Result;
use async_trait::async_trait;
use log::info;
use std::sync::Arc;
use std::time::Instant;

use crate::commands::context::CommandContext;
use crate::commands::descriptor::CommandDescriptor;
use crate::commands::handler::SlashCommand;
use crate::dispatch::{Invocation, Reply};
use crate::i18n::LocaleText;

/// /ping
pub struct Ping {
    descriptor: CommandDescriptor,
}

impl Ping {
    pub fn new() -> Self {
        Self {
            descriptor: CommandDescriptor::new("ping", "Check the bot's response time.")
                .category("Utility"),
        }
    }
}

impl Default for Ping {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl SlashCommand for Ping {
    fn descriptor(&self) -> &CommandDescriptor {
        &self.descriptor
    }

    async fn execute(
        &self,
        _ctx: Arc<CommandContext>,
        interaction: &Invocation,
        i18n: &LocaleText,
    ) -> Result<()> {
        let started = Instant::now();
        interaction.responder.defer(false).await?;
        let latency = started.elapsed().as_millis().to_string();

        interaction
            .responder
            .edit_reply(Reply::text(
                i18n.text("commands:ping", &[("latency", latency.as_str())]),
            ))
            .await?;

        info!(
            "[{}] Ping command completed for user {} ({latency}ms)",
            interaction.request_id, interaction.user.id
        );
        Ok(())
    }
}
