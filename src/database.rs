//! # Guild Settings Store
//!
//! Per-guild preferences persisted in sqlite. The dispatcher only reads the
//! locale preference; the `/language` command writes it.
//!
//! - **Version**: 1.0.0
//! - **Since**: 0.1.0
//! - **Toggleable**: false

use anyhow::Result;
use async_trait::async_trait;
use log::info;
use serenity::model::id::GuildId;
use sqlite::State;
use std::sync::Arc;
use tokio::sync::Mutex;

/// Lookup of persisted guild settings
#[async_trait]
pub trait GuildSettingsStore: Send + Sync {
    /// Stored locale preference, `None` when the guild never chose one
    async fn guild_locale(&self, guild_id: GuildId) -> Result<Option<String>>;

    /// Store a locale preference; `None` clears it
    async fn set_guild_locale(&self, guild_id: GuildId, locale: Option<&str>) -> Result<()>;
}

#[derive(Clone)]
pub struct Database {
    connection: Arc<Mutex<sqlite::Connection>>,
}

impl Database {
    /// Open (or create) the database at `path` and apply the schema
    pub async fn new(path: &str) -> Result<Self> {
        let connection = sqlite::open(path)?;
        connection.execute(
            "CREATE TABLE IF NOT EXISTS guilds (
                id TEXT PRIMARY KEY,
                locale TEXT
            )",
        )?;
        info!("Connected to database at {path}");
        Ok(Database {
            connection: Arc::new(Mutex::new(connection)),
        })
    }

    /// In-memory database, used by tests
    pub async fn in_memory() -> Result<Self> {
        Self::new(":memory:").await
    }
}

#[async_trait]
impl GuildSettingsStore for Database {
    async fn guild_locale(&self, guild_id: GuildId) -> Result<Option<String>> {
        let connection = self.connection.lock().await;
        let mut statement = connection.prepare("SELECT locale FROM guilds WHERE id = ?")?;
        statement.bind((1, guild_id.0.to_string().as_str()))?;

        if let State::Row = statement.next()? {
            Ok(statement.read::<Option<String>, _>("locale")?)
        } else {
            Ok(None)
        }
    }

    async fn set_guild_locale(&self, guild_id: GuildId, locale: Option<&str>) -> Result<()> {
        let connection = self.connection.lock().await;
        let mut statement = connection.prepare(
            "INSERT INTO guilds (id, locale) VALUES (?, ?)
             ON CONFLICT(id) DO UPDATE SET locale = excluded.locale",
        )?;
        statement.bind((1, guild_id.0.to_string().as_str()))?;
        statement.bind((2, locale))?;
        while statement.next()? != State::Done {}
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_unknown_guild_has_no_locale() {
        let db = Database::in_memory().await.unwrap();
        assert_eq!(db.guild_locale(GuildId(1)).await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_set_and_get_locale() {
        let db = Database::in_memory().await.unwrap();
        db.set_guild_locale(GuildId(42), Some("es-ES")).await.unwrap();
        assert_eq!(
            db.guild_locale(GuildId(42)).await.unwrap().as_deref(),
            Some("es-ES")
        );
        assert_eq!(db.guild_locale(GuildId(43)).await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_overwrite_and_clear_locale() {
        let db = Database::in_memory().await.unwrap();
        db.set_guild_locale(GuildId(7), Some("es-ES")).await.unwrap();
        db.set_guild_locale(GuildId(7), Some("en-US")).await.unwrap();
        assert_eq!(
            db.guild_locale(GuildId(7)).await.unwrap().as_deref(),
            Some("en-US")
        );

        db.set_guild_locale(GuildId(7), None).await.unwrap();
        assert_eq!(db.guild_locale(GuildId(7)).await.unwrap(), None);
    }

    #[test]
    fn test_database_is_clone() {
        fn assert_clone<T: Clone>() {}
        assert_clone::<Database>();
    }
}
