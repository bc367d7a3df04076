//! Shared context for command handlers
//!
//! - **Version**: 1.0.0
//! - **Since**: 0.1.0
//!
//! ## Changelog
//! - 1.0.0: Settings store, locale bundles and the outbound HTTP client

use anyhow::Result;
use serde::de::DeserializeOwned;
use std::sync::Arc;
use std::time::Duration;

use crate::database::GuildSettingsStore;
use crate::i18n::I18n;

/// User agent sent to third-party APIs
pub const USER_AGENT: &str = concat!("elvia/", env!("CARGO_PKG_VERSION"));

/// Shared context for all command handlers
///
/// Contains the services commands reach for:
/// - the guild settings store
/// - the locale bundles
/// - an HTTP client for third-party APIs
/// - the display name used in embed footers
#[derive(Clone)]
pub struct CommandContext {
    pub settings: Arc<dyn GuildSettingsStore>,
    pub i18n: Arc<I18n>,
    pub http_client: reqwest::Client,
    pub bot_name: String,
}

impl CommandContext {
    pub fn new(
        settings: Arc<dyn GuildSettingsStore>,
        i18n: Arc<I18n>,
        bot_name: impl Into<String>,
    ) -> Result<Self> {
        let http_client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(Duration::from_secs(15))
            .build()?;
        Ok(Self {
            settings,
            i18n,
            http_client,
            bot_name: bot_name.into(),
        })
    }

    /// GET a JSON document from a third-party API
    pub async fn get_json<T: DeserializeOwned>(&self, url: &str) -> Result<T> {
        let response = self
            .http_client
            .get(url)
            .send()
            .await?
            .error_for_status()?
            .json::<T>()
            .await?;
        Ok(response)
    }
}
