//! Fun commands
//!
//! Handles: advice
//!
//! - **Version**: 1.0.0
//! - **Since**: 0.1.0

use anyhow::{Context as _, Result};
use async_trait::async_trait;
use log::debug;
use serde::Deserialize;
use std::sync::Arc;

use crate::commands::context::CommandContext;
use crate::commands::descriptor::CommandDescriptor;
use crate::commands::handler::SlashCommand;
use crate::dispatch::{Invocation, Reply};
use crate::i18n::LocaleText;

pub const ADVICE_URL: &str = "https://api.adviceslip.com/advice";

#[derive(Debug, Deserialize)]
struct AdviceResponse {
    slip: AdviceSlip,
}

#[derive(Debug, Deserialize)]
struct AdviceSlip {
    advice: String,
}

/// /advice
pub struct Advice {
    descriptor: CommandDescriptor,
}

impl Advice {
    pub fn new() -> Self {
        Self {
            descriptor: CommandDescriptor::new("advice", "Get a random advice.").category("Fun"),
        }
    }
}

impl Default for Advice {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl SlashCommand for Advice {
    fn descriptor(&self) -> &CommandDescriptor {
        &self.descriptor
    }

    async fn execute(
        &self,
        ctx: Arc<CommandContext>,
        interaction: &Invocation,
        _i18n: &LocaleText,
    ) -> Result<()> {
        interaction.responder.defer(false).await?;

        let response: AdviceResponse = ctx
            .get_json(ADVICE_URL)
            .await
            .context("Failed to fetch advice")?;
        debug!("[{}] Advice fetched", interaction.request_id);

        interaction
            .responder
            .edit_reply(Reply::text(response.slip.advice))
            .await
    }
}
