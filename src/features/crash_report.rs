//! # Feature: Crash Reporting
//!
//! Panic hook that logs uncaught panics at error level and, when a logger
//! webhook is configured, mirrors them to Discord as an "Uncaught Exception"
//! embed. The previously installed hook still runs afterwards.
//!
//! - **Version**: 1.0.0
//! - **Since**: 0.1.0
//! - **Toggleable**: true (via LOGGER_WEBHOOK_URL)

use anyhow::Result;
use chrono::{DateTime, Utc};
use log::{error, warn};
use serde_json::Value;
use std::any::Any;

use crate::core::{bold, branded_embed, italic, truncate_for_embed, Colors};

pub const CRASH_TITLE: &str = "Uncaught Exception";

/// What was passed to `panic!`
pub fn panic_text(payload: &(dyn Any + Send)) -> String {
    if let Some(text) = payload.downcast_ref::<&str>() {
        text.to_string()
    } else if let Some(text) = payload.downcast_ref::<String>() {
        text.clone()
    } else {
        "Box<dyn Any>".to_string()
    }
}

/// Webhook body for one crash
pub fn webhook_payload(
    message: &str,
    location: Option<&str>,
    bot_name: &str,
    at: DateTime<Utc>,
) -> Result<Value> {
    let timestamp = at.timestamp();
    let description = [
        format!("```xl\n{}\n```", truncate_for_embed(message)),
        format!("{} {}", bold(&italic("Location:")), location.unwrap_or("unknown")),
        format!("{} <t:{timestamp}:D> (<t:{timestamp}:R>)", bold(&italic("Date:"))),
    ]
    .join("\n");

    let mut embed = branded_embed(&description, &format!("Powered by {bot_name}"), None);
    embed.title(CRASH_TITLE).color(Colors::RED);
    embed.0.insert("timestamp", Value::from(at.to_rfc3339()));

    Ok(serde_json::json!({
        "username": bot_name,
        "embeds": [serde_json::to_value(&embed.0)?],
    }))
}

/// POST to a Discord webhook URL; a `thread_id` query parameter is honoured by Discord
async fn post_webhook(client: &reqwest::Client, url: &str, body: &Value) -> Result<()> {
    client
        .post(url)
        .json(body)
        .send()
        .await?
        .error_for_status()?;
    Ok(())
}

/// Install the crash hook on top of whatever hook is already set
pub fn install(webhook_url: Option<String>, bot_name: String) {
    let previous = std::panic::take_hook();
    let client = reqwest::Client::new();

    std::panic::set_hook(Box::new(move |info| {
        let message = panic_text(info.payload());
        let location = info
            .location()
            .map(|location| format!("{}:{}:{}", location.file(), location.line(), location.column()));

        error!(
            "💥 {CRASH_TITLE}: {message} at {}",
            location.as_deref().unwrap_or("unknown location")
        );

        if let Some(url) = &webhook_url {
            // Needs a runtime to deliver; panics outside one are only logged
            if let Ok(handle) = tokio::runtime::Handle::try_current() {
                match webhook_payload(&message, location.as_deref(), &bot_name, Utc::now()) {
                    Ok(body) => {
                        let client = client.clone();
                        let url = url.clone();
                        handle.spawn(async move {
                            if let Err(e) = post_webhook(&client, &url, &body).await {
                                warn!("Failed to deliver crash report: {e:#}");
                            }
                        });
                    }
                    Err(e) => warn!("Failed to build crash report: {e:#}"),
                }
            }
        }

        previous(info);
    }));
}
