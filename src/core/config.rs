//! Environment-driven configuration
//!
//! - **Version**: 1.0.0
//! - **Since**: 0.1.0
//!
//! ## Changelog
//! - 1.0.0: Initial configuration with owner allowlist, unsafe mode, default permissions
//!   and the prefix for message commands

use anyhow::{anyhow, Context, Result};
use serenity::model::id::UserId;
use serenity::model::permissions::Permissions;
use std::collections::HashSet;
use std::env;

pub const DEFAULT_PREFIX: &str = "!";

#[derive(Debug, Clone)]
pub struct Config {
    pub discord_token: String,
    /// Register commands in this guild only (faster propagation while developing)
    pub discord_guild_id: Option<String>,
    pub owners: HashSet<UserId>,
    /// Allows commands flagged as unsafe to run
    pub unsafe_mode: bool,
    /// Permissions required from both member and bot when a command declares none
    pub default_permissions: Permissions,
    /// Leading text that marks a message as a prefix command
    pub command_prefix: String,
    pub database_path: String,
    pub log_level: String,
    pub default_locale: String,
    pub locales_dir: Option<String>,
    pub support_server_url: String,
    pub logger_webhook_url: Option<String>,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        let discord_token = env::var("DISCORD_TOKEN")
            .map_err(|_| anyhow!("DISCORD_TOKEN environment variable is required"))?;

        let owners = match env::var("OWNER_IDS") {
            Ok(raw) => parse_owner_ids(&raw)?,
            Err(_) => HashSet::new(),
        };

        let default_permissions = match env::var("DEFAULT_PERMISSIONS") {
            Ok(raw) => parse_permissions(&raw)?,
            Err(_) => default_permissions(),
        };

        Ok(Config {
            discord_token,
            discord_guild_id: optional_var("DISCORD_GUILD_ID"),
            owners,
            unsafe_mode: env::var("UNSAFE_MODE")
                .map(|v| parse_flag(&v))
                .unwrap_or(false),
            default_permissions,
            command_prefix: optional_var("COMMAND_PREFIX")
                .map(|prefix| prefix.trim().to_string())
                .unwrap_or_else(|| DEFAULT_PREFIX.to_string()),
            database_path: env::var("DATABASE_PATH").unwrap_or_else(|_| "elvia.db".to_string()),
            log_level: env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_string()),
            default_locale: env::var("DEFAULT_LOCALE").unwrap_or_else(|_| "en-US".to_string()),
            locales_dir: optional_var("LOCALES_DIR"),
            support_server_url: env::var("SUPPORT_SERVER_URL")
                .unwrap_or_else(|_| "https://discord.gg/".to_string()),
            logger_webhook_url: optional_var("LOGGER_WEBHOOK_URL"),
        })
    }
}

fn optional_var(name: &str) -> Option<String> {
    env::var(name).ok().filter(|v| !v.trim().is_empty())
}

pub fn default_permissions() -> Permissions {
    Permissions::VIEW_CHANNEL | Permissions::SEND_MESSAGES
}

/// Comma separated list of user ids, blanks ignored
pub fn parse_owner_ids(raw: &str) -> Result<HashSet<UserId>> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| {
            s.parse::<u64>()
                .map(UserId)
                .with_context(|| format!("Invalid owner id in OWNER_IDS: {s}"))
        })
        .collect()
}

/// Permission bitfield as a decimal number, unknown bits dropped
pub fn parse_permissions(raw: &str) -> Result<Permissions> {
    let bits = raw
        .trim()
        .parse::<u64>()
        .with_context(|| format!("Invalid DEFAULT_PERMISSIONS bitfield: {raw}"))?;
    Ok(Permissions::from_bits_truncate(bits))
}

pub fn parse_flag(raw: &str) -> bool {
    matches!(
        raw.trim().to_lowercase().as_str(),
        "1" | "true" | "yes" | "on"
    )
}
