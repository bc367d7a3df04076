//! In-memory collaborators for dispatcher and command tests

use anyhow::{anyhow, bail, Result};
use async_trait::async_trait;
use log::Level;
use serenity::model::id::{GuildId, UserId};
use serenity::model::permissions::Permissions;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use super::cooldown::CooldownTracker;
use super::dispatcher::{DispatchPolicy, InteractionDispatcher};
use super::error::{ErrorReporter, InteractionExpired};
use super::event::{CachedGuild, GuildScope, Invocation, UserRef};
use super::responder::{Choice, Reply, Responder, ResponseAction, ResponseState};
use crate::commands::{CommandContext, CommandDescriptor, CommandRegistry, SlashCommand};
use crate::database::GuildSettingsStore;
use crate::i18n::{I18n, LocaleText};

pub const GUILD: GuildId = GuildId(100);

#[derive(Debug, Clone)]
pub enum ResponderCall {
    Reply(Reply),
    Defer { ephemeral: bool },
    Edit(Reply),
    Delete,
    Respond(Vec<Choice>),
}

/// Records every response and enforces the reply-once rules
pub struct FakeResponder {
    state: Mutex<ResponseState>,
    calls: Mutex<Vec<ResponderCall>>,
    expired: bool,
}

impl FakeResponder {
    pub fn new() -> Self {
        FakeResponder {
            state: Mutex::new(ResponseState::Pending),
            calls: Mutex::new(Vec::new()),
            expired: false,
        }
    }

    /// Every call fails as if the interaction token had expired
    pub fn expired() -> Self {
        FakeResponder {
            expired: true,
            ..Self::new()
        }
    }

    pub fn shared() -> (Arc<dyn Responder>, Arc<FakeResponder>) {
        let fake = Arc::new(Self::new());
        let responder: Arc<dyn Responder> = fake.clone();
        (responder, fake)
    }

    pub fn calls(&self) -> Vec<ResponderCall> {
        self.calls.lock().unwrap().clone()
    }

    /// Replies and edits, in order
    pub fn messages(&self) -> Vec<Reply> {
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                ResponderCall::Reply(reply) | ResponderCall::Edit(reply) => Some(reply),
                _ => None,
            })
            .collect()
    }

    pub fn only_message(&self) -> Reply {
        let messages = self.messages();
        assert_eq!(messages.len(), 1, "expected exactly one message, got {messages:?}");
        messages.into_iter().next().unwrap()
    }

    pub fn choices(&self) -> Option<Vec<Choice>> {
        self.calls().into_iter().find_map(|call| match call {
            ResponderCall::Respond(choices) => Some(choices),
            _ => None,
        })
    }

    pub fn deletions(&self) -> usize {
        self.calls()
            .iter()
            .filter(|call| matches!(call, ResponderCall::Delete))
            .count()
    }

    fn record(&self, action: ResponseAction, call: ResponderCall) -> Result<()> {
        if self.expired {
            return Err(anyhow::Error::new(InteractionExpired));
        }
        let mut state = self.state.lock().unwrap();
        *state = state.check(action)?;
        self.calls.lock().unwrap().push(call);
        Ok(())
    }
}

#[async_trait]
impl Responder for FakeResponder {
    fn state(&self) -> ResponseState {
        *self.state.lock().unwrap()
    }

    async fn reply(&self, reply: Reply) -> Result<()> {
        self.record(ResponseAction::Reply, ResponderCall::Reply(reply))
    }

    async fn defer(&self, ephemeral: bool) -> Result<()> {
        self.record(ResponseAction::Defer, ResponderCall::Defer { ephemeral })
    }

    async fn edit_reply(&self, reply: Reply) -> Result<()> {
        self.record(ResponseAction::Edit, ResponderCall::Edit(reply))
    }

    async fn delete_reply(&self) -> Result<()> {
        self.record(ResponseAction::Delete, ResponderCall::Delete)
    }

    async fn respond(&self, choices: Vec<Choice>) -> Result<()> {
        self.record(ResponseAction::Respond, ResponderCall::Respond(choices))
    }
}

/// Guild settings kept in a map
#[derive(Default)]
pub struct MemoryStore {
    locales: Mutex<HashMap<GuildId, String>>,
    broken: bool,
}

impl MemoryStore {
    pub fn with_locale(guild: GuildId, locale: &str) -> Self {
        let store = Self::default();
        store.locales.lock().unwrap().insert(guild, locale.to_string());
        store
    }

    /// Every lookup fails
    pub fn broken() -> Self {
        MemoryStore {
            broken: true,
            ..Self::default()
        }
    }
}

#[async_trait]
impl GuildSettingsStore for MemoryStore {
    async fn guild_locale(&self, guild_id: GuildId) -> Result<Option<String>> {
        if self.broken {
            bail!("database is locked");
        }
        Ok(self.locales.lock().unwrap().get(&guild_id).cloned())
    }

    async fn set_guild_locale(&self, guild_id: GuildId, locale: Option<&str>) -> Result<()> {
        if self.broken {
            bail!("database is locked");
        }
        let mut locales = self.locales.lock().unwrap();
        match locale {
            Some(locale) => locales.insert(guild_id, locale.to_string()),
            None => locales.remove(&guild_id),
        };
        Ok(())
    }
}

/// Collects reported failures instead of logging them
#[derive(Default)]
pub struct RecordingReporter {
    entries: Mutex<Vec<(Level, String)>>,
}

impl RecordingReporter {
    pub fn entries(&self) -> Vec<(Level, String)> {
        self.entries.lock().unwrap().clone()
    }

    pub fn count(&self, level: Level) -> usize {
        self.entries()
            .iter()
            .filter(|(recorded, _)| *recorded == level)
            .count()
    }
}

impl ErrorReporter for RecordingReporter {
    fn report(&self, level: Level, message: &str, error: &anyhow::Error) {
        self.entries
            .lock()
            .unwrap()
            .push((level, format!("{message}: {error:#}")));
    }
}

/// What a [`ScriptedCommand`] does when executed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Script {
    Succeed,
    Reply,
    Fail,
    FailExpired,
    DeferThenFail,
    ReplyThenFail,
}

pub struct ScriptedCommand {
    descriptor: CommandDescriptor,
    script: Script,
    executions: AtomicUsize,
    completions: AtomicUsize,
}

impl ScriptedCommand {
    pub fn new(descriptor: CommandDescriptor, script: Script) -> Arc<Self> {
        Arc::new(ScriptedCommand {
            descriptor,
            script,
            executions: AtomicUsize::new(0),
            completions: AtomicUsize::new(0),
        })
    }

    pub fn executions(&self) -> usize {
        self.executions.load(Ordering::SeqCst)
    }

    pub fn completions(&self) -> usize {
        self.completions.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl SlashCommand for ScriptedCommand {
    fn descriptor(&self) -> &CommandDescriptor {
        &self.descriptor
    }

    async fn execute(
        &self,
        _ctx: Arc<CommandContext>,
        interaction: &Invocation,
        _i18n: &LocaleText,
    ) -> Result<()> {
        self.executions.fetch_add(1, Ordering::SeqCst);
        match self.script {
            Script::Succeed => Ok(()),
            Script::Reply => interaction.responder.reply(Reply::text("done")).await,
            Script::Fail => Err(anyhow!("upstream returned 500")),
            Script::FailExpired => Err(anyhow::Error::new(InteractionExpired)),
            Script::DeferThenFail => {
                interaction.responder.defer(false).await?;
                Err(anyhow!("upstream timed out"))
            }
            Script::ReplyThenFail => {
                interaction.responder.reply(Reply::text("partial")).await?;
                Err(anyhow!("follow-up failed"))
            }
        }
    }

    async fn autocomplete(&self, _ctx: Arc<CommandContext>, interaction: &Invocation) -> Result<()> {
        self.completions.fetch_add(1, Ordering::SeqCst);
        interaction
            .responder
            .respond(vec![Choice::new("English", "en-US")])
            .await
    }
}

pub fn user(id: u64) -> UserRef {
    UserRef {
        id: UserId(id),
        name: format!("user{id}"),
        avatar_url: format!("https://cdn.discordapp.com/embed/avatars/{}.png", id % 5),
    }
}

pub fn cached_guild(member_permissions: Permissions, bot_permissions: Permissions) -> GuildScope {
    GuildScope::Cached(CachedGuild {
        id: GUILD,
        member_permissions,
        bot_permissions,
    })
}

/// A guild where both the member and the bot hold every permission
pub fn trusted_guild() -> GuildScope {
    cached_guild(Permissions::all(), Permissions::all())
}

pub fn invocation(command: &str, user_id: u64) -> (Invocation, Arc<FakeResponder>) {
    let (responder, fake) = FakeResponder::shared();
    (Invocation::new(command, user(user_id), responder), fake)
}

pub fn context(store: Arc<dyn GuildSettingsStore>) -> Arc<CommandContext> {
    let i18n = Arc::new(I18n::builtin("en-US").unwrap());
    Arc::new(CommandContext::new(store, i18n, "elvia").unwrap())
}

pub struct Harness {
    pub dispatcher: InteractionDispatcher,
    pub reporter: Arc<RecordingReporter>,
}

pub fn harness(commands: Vec<Arc<ScriptedCommand>>, policy: DispatchPolicy) -> Harness {
    harness_with_store(commands, policy, Arc::new(MemoryStore::default()))
}

pub fn harness_with_store(
    commands: Vec<Arc<ScriptedCommand>>,
    policy: DispatchPolicy,
    store: Arc<dyn GuildSettingsStore>,
) -> Harness {
    let mut registry = CommandRegistry::new();
    for command in commands {
        registry.register(command);
    }
    let reporter = Arc::new(RecordingReporter::default());
    let dispatcher = InteractionDispatcher::new(
        Arc::new(registry),
        context(store),
        Arc::new(CooldownTracker::new()),
        policy,
    )
    .with_reporter(reporter.clone());
    Harness {
        dispatcher,
        reporter,
    }
}
