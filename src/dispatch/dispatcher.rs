//! # Feature: Interaction Dispatch
//!
//! Routes slash, context-menu, autocomplete and prefix-message commands to
//! registered commands. Everything except autocomplete passes an admission
//! pipeline in fixed order: enabled, unsafe, guild-only, permissions, nsfw,
//! owner, cooldown. The first gate that fails answers the user (ephemerally
//! where Discord allows it) and stops dispatch.
//!
//! - **Version**: 1.1.0
//! - **Since**: 0.1.0
//! - **Toggleable**: false
//!
//! ## Changelog
//! - 1.1.0: Prefix commands share the admission pipeline
//! - 1.0.0: Admission gates, cooldown tracker and failure classification

use log::{debug, info, warn, Level};
use serenity::model::id::UserId;
use serenity::model::permissions::Permissions;
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use super::cooldown::{Admission, CooldownTracker};
use super::error::{classify, ErrorReporter, Failure, LogReporter};
use super::event::{InteractionEvent, Invocation};
use super::responder::{Reply, ResponseState};
use crate::commands::{CommandContext, CommandDescriptor, CommandRegistry, SlashCommand};
use crate::core::{bold, config, format_permissions, Config};
use crate::i18n::LocaleText;

/// Reply for commands that only run in unsafe mode
pub const UNSAFE_MESSAGE: &str = "This command is currently under development.";

/// Process-wide admission settings
#[derive(Debug, Clone)]
pub struct DispatchPolicy {
    pub unsafe_mode: bool,
    pub owners: HashSet<UserId>,
    /// Required when a command declares no permission set of its own
    pub default_permissions: Permissions,
    pub support_server_url: String,
}

impl DispatchPolicy {
    pub fn from_config(config: &Config) -> Self {
        DispatchPolicy {
            unsafe_mode: config.unsafe_mode,
            owners: config.owners.clone(),
            default_permissions: config.default_permissions,
            support_server_url: config.support_server_url.clone(),
        }
    }

    pub fn is_owner(&self, user: UserId) -> bool {
        self.owners.contains(&user)
    }
}

impl Default for DispatchPolicy {
    fn default() -> Self {
        DispatchPolicy {
            unsafe_mode: false,
            owners: HashSet::new(),
            default_permissions: config::default_permissions(),
            support_server_url: String::new(),
        }
    }
}

/// Admission gate that refused an invocation
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Gate {
    Disabled,
    Unsafe,
    GuildOnly,
    MissingUserPermissions(Permissions),
    MissingBotPermissions(Permissions),
    Nsfw,
    OwnerOnly,
    Cooldown(Duration),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// Unregistered command or unsupported interaction kind
    Ignored,
    Denied(Gate),
    Executed,
    Failed(Failure),
    /// Autocomplete handler answered
    Suggested,
}

pub struct InteractionDispatcher {
    registry: Arc<CommandRegistry>,
    context: Arc<CommandContext>,
    cooldowns: Arc<CooldownTracker>,
    policy: DispatchPolicy,
    reporter: Arc<dyn ErrorReporter>,
}

impl InteractionDispatcher {
    pub fn new(
        registry: Arc<CommandRegistry>,
        context: Arc<CommandContext>,
        cooldowns: Arc<CooldownTracker>,
        policy: DispatchPolicy,
    ) -> Self {
        InteractionDispatcher {
            registry,
            context,
            cooldowns,
            policy,
            reporter: Arc::new(LogReporter),
        }
    }

    pub fn with_reporter(mut self, reporter: Arc<dyn ErrorReporter>) -> Self {
        self.reporter = reporter;
        self
    }

    pub fn registry(&self) -> &CommandRegistry {
        &self.registry
    }

    pub fn cooldowns(&self) -> &CooldownTracker {
        &self.cooldowns
    }

    pub async fn dispatch(&self, event: InteractionEvent) -> Outcome {
        match event {
            InteractionEvent::ChatCommand(interaction) | InteractionEvent::ContextMenu(interaction) => {
                let command = self.registry.get_application(&interaction.command);
                self.run_command(interaction, command).await
            }
            InteractionEvent::MessageCommand(interaction) => {
                let command = self.registry.get_prefix(&interaction.command);
                self.run_command(interaction, command).await
            }
            InteractionEvent::Autocomplete(interaction) => self.run_autocomplete(interaction).await,
            InteractionEvent::Other => Outcome::Ignored,
        }
    }

    async fn run_command(
        &self,
        interaction: Invocation,
        command: Option<Arc<dyn SlashCommand>>,
    ) -> Outcome {
        let request_id = interaction.request_id;
        let Some(command) = command else {
            debug!("[{request_id}] ℹ️ No command registered as '{}', ignoring", interaction.command);
            return Outcome::Ignored;
        };

        info!(
            "[{}] 📥 Command received | Command: {} | User: {} ({}) | Guild: {:?}",
            request_id,
            interaction.command,
            interaction.user.name,
            interaction.user.id,
            interaction.guild.id()
        );

        let i18n = self.resolve_locale(&interaction).await;
        let descriptor = command.descriptor();

        if let Err(gate) = self.check_gates(descriptor, &interaction) {
            return self.deny(&interaction, &i18n, gate).await;
        }

        let bypass = self.policy.is_owner(interaction.user.id);
        let admission = self.cooldowns.admit(
            descriptor.name,
            interaction.user.id,
            descriptor.cooldown,
            bypass,
        );
        if let Admission::Cooling { remaining } = admission {
            return self.deny(&interaction, &i18n, Gate::Cooldown(remaining)).await;
        }

        debug!("[{request_id}] ▶️ Executing {} in locale {}", descriptor.name, i18n.tag());
        match command
            .execute(Arc::clone(&self.context), &interaction, &i18n)
            .await
        {
            Ok(()) => {
                info!("[{request_id}] ✅ Command {} completed", descriptor.name);
                Outcome::Executed
            }
            Err(error) => Outcome::Failed(self.handle_failure(&interaction, &i18n, error).await),
        }
    }

    async fn run_autocomplete(&self, interaction: Invocation) -> Outcome {
        let request_id = interaction.request_id;
        let Some(command) = self.registry.get_application(&interaction.command) else {
            debug!("[{request_id}] ℹ️ Autocomplete for unregistered '{}'", interaction.command);
            self.respond_empty(&interaction).await;
            return Outcome::Ignored;
        };

        if let Err(gate) = self.check_autocomplete_gates(command.descriptor(), &interaction) {
            debug!("[{request_id}] ⛔ Autocomplete for {} refused: {gate:?}", interaction.command);
            self.respond_empty(&interaction).await;
            return Outcome::Denied(gate);
        }

        match command
            .autocomplete(Arc::clone(&self.context), &interaction)
            .await
        {
            Ok(()) => Outcome::Suggested,
            Err(error) => match classify(&error) {
                Failure::Expired => {
                    debug!("[{request_id}] ⌛ Autocomplete for {} expired", interaction.command);
                    Outcome::Failed(Failure::Expired)
                }
                Failure::Unexpected => {
                    let message = format!(
                        "[{request_id}] ❌ Autocomplete for {} failed",
                        interaction.command
                    );
                    self.reporter.report(Level::Error, &message, &error);
                    Outcome::Failed(Failure::Unexpected)
                }
            },
        }
    }

    /// Stored guild preference, then the guild's Discord locale, then the default
    async fn resolve_locale(&self, interaction: &Invocation) -> LocaleText {
        let mut tag = None;
        if let Some(guild) = interaction.guild.cached() {
            match self.context.settings.guild_locale(guild.id).await {
                Ok(stored) => tag = stored,
                Err(e) => warn!(
                    "[{}] ⚠️ Locale lookup failed for guild {}: {e:#}",
                    interaction.request_id, guild.id
                ),
            }
        }

        match tag.or_else(|| interaction.guild_locale.clone()) {
            Some(tag) => self.context.i18n.set_locale(&tag),
            None => self.context.i18n.default_locale(),
        }
    }

    fn check_gates(&self, descriptor: &CommandDescriptor, interaction: &Invocation) -> Result<(), Gate> {
        if !descriptor.enabled {
            return Err(Gate::Disabled);
        }
        if descriptor.is_unsafe && !self.policy.unsafe_mode {
            return Err(Gate::Unsafe);
        }
        if descriptor.guild_only && interaction.guild.cached().is_none() {
            return Err(Gate::GuildOnly);
        }

        if let Some(guild) = interaction.guild.cached() {
            let required = descriptor
                .user_permissions
                .unwrap_or(self.policy.default_permissions);
            let missing = required & !guild.member_permissions;
            if !missing.is_empty() {
                return Err(Gate::MissingUserPermissions(missing));
            }

            let required = descriptor
                .bot_permissions
                .unwrap_or(self.policy.default_permissions);
            let missing = required & !guild.bot_permissions;
            if !missing.is_empty() {
                return Err(Gate::MissingBotPermissions(missing));
            }
        }

        // DMs carry no age restriction
        if descriptor.nsfw && interaction.guild.in_guild() && !interaction.nsfw_channel {
            return Err(Gate::Nsfw);
        }
        if descriptor.owner_only && !self.policy.is_owner(interaction.user.id) {
            return Err(Gate::OwnerOnly);
        }
        Ok(())
    }

    fn check_autocomplete_gates(
        &self,
        descriptor: &CommandDescriptor,
        interaction: &Invocation,
    ) -> Result<(), Gate> {
        if !descriptor.enabled {
            return Err(Gate::Disabled);
        }
        if descriptor.is_unsafe && !self.policy.unsafe_mode {
            return Err(Gate::Unsafe);
        }
        if descriptor.guild_only && interaction.guild.cached().is_none() {
            return Err(Gate::GuildOnly);
        }
        if descriptor.owner_only && !self.policy.is_owner(interaction.user.id) {
            return Err(Gate::OwnerOnly);
        }
        Ok(())
    }

    async fn deny(&self, interaction: &Invocation, i18n: &LocaleText, gate: Gate) -> Outcome {
        let request_id = interaction.request_id;
        debug!("[{request_id}] ⛔ Command {} refused: {gate:?}", interaction.command);

        let message = self.denial_message(&gate, i18n);
        match interaction.responder.reply(Reply::ephemeral(message)).await {
            Ok(()) => {
                if let Gate::Cooldown(remaining) = gate {
                    let responder = Arc::clone(&interaction.responder);
                    self.cooldowns
                        .schedule(remaining, async move { responder.delete_reply().await });
                }
            }
            Err(e) if classify(&e) == Failure::Expired => {
                debug!("[{request_id}] ⌛ Interaction expired before refusal was sent");
            }
            Err(e) => warn!("[{request_id}] ⚠️ Failed to send refusal: {e:#}"),
        }
        Outcome::Denied(gate)
    }

    async fn respond_empty(&self, interaction: &Invocation) {
        if let Err(e) = interaction.responder.respond(Vec::new()).await {
            if classify(&e) == Failure::Unexpected {
                warn!(
                    "[{}] ⚠️ Failed to answer autocomplete: {e:#}",
                    interaction.request_id
                );
            }
        }
    }

    fn denial_message(&self, gate: &Gate, i18n: &LocaleText) -> String {
        match gate {
            Gate::Disabled => i18n.text("misc:command_disabled", &[]),
            Gate::Unsafe => UNSAFE_MESSAGE.to_string(),
            Gate::GuildOnly => i18n.text("misc:guild_only", &[]),
            Gate::MissingUserPermissions(missing) => i18n.text(
                "misc:missing_user_permission",
                &[("permission", format_permissions(*missing).as_str())],
            ),
            Gate::MissingBotPermissions(missing) => i18n.text(
                "misc:missing_client_permission",
                &[("permission", format_permissions(*missing).as_str())],
            ),
            Gate::Nsfw => i18n.text("misc:nsfw_command", &[]),
            Gate::OwnerOnly => i18n.text("misc:owner_only", &[]),
            Gate::Cooldown(remaining) => i18n.text(
                "misc:cooldown",
                &[("duration", bold(&format!("{:.2}", remaining.as_secs_f64())).as_str())],
            ),
        }
    }

    async fn handle_failure(
        &self,
        interaction: &Invocation,
        i18n: &LocaleText,
        error: anyhow::Error,
    ) -> Failure {
        let request_id = interaction.request_id;
        let failure = classify(&error);
        if failure == Failure::Expired {
            debug!("[{request_id}] ⌛ Interaction for {} expired", interaction.command);
            return failure;
        }

        let state = interaction.responder.state();
        if state == ResponseState::Replied {
            debug!(
                "[{request_id}] Command {} failed after replying: {error:#}",
                interaction.command
            );
            return failure;
        }

        let message = format!("[{request_id}] ❌ Command {} failed", interaction.command);
        self.reporter.report(Level::Error, &message, &error);

        let notice = i18n.text(
            "misc:error_occurred",
            &[("invite", self.policy.support_server_url.as_str())],
        );
        let sent = match state {
            ResponseState::Deferred => interaction.responder.edit_reply(Reply::text(notice)).await,
            _ => interaction.responder.reply(Reply::ephemeral(notice)).await,
        };
        if let Err(e) = sent {
            if classify(&e) == Failure::Unexpected {
                warn!("[{request_id}] ⚠️ Failed to send error notice: {e:#}");
            }
        }
        failure
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dispatch::testing::{
        cached_guild, harness, harness_with_store, invocation, trusted_guild, FakeResponder,
        MemoryStore, ResponderCall, Script, ScriptedCommand, GUILD,
    };
    use crate::commands::CommandKind;
    use crate::dispatch::{GuildScope, Responder, ResponseState};
    use regex::Regex;
    use serenity::model::id::GuildId;
    use std::collections::BTreeSet;

    const OWNER: u64 = 1;
    const MEMBER: u64 = 2;

    fn owner_policy() -> DispatchPolicy {
        DispatchPolicy {
            owners: HashSet::from([UserId(OWNER)]),
            support_server_url: "https://discord.gg/elvia".to_string(),
            ..DispatchPolicy::default()
        }
    }

    fn chat(command: &str, user: u64, guild: GuildScope) -> (InteractionEvent, Arc<FakeResponder>) {
        let (mut interaction, fake) = invocation(command, user);
        interaction.guild = guild;
        (InteractionEvent::ChatCommand(interaction), fake)
    }

    fn autocomplete(command: &str, user: u64) -> (InteractionEvent, Arc<FakeResponder>) {
        let (mut interaction, fake) = invocation(command, user);
        interaction.guild = trusted_guild();
        (InteractionEvent::Autocomplete(interaction), fake)
    }

    fn mentioned_permissions(message: &str) -> BTreeSet<String> {
        let pattern = Regex::new(r"__\*([^*]+)\*__").unwrap();
        pattern
            .captures_iter(message)
            .map(|caps| caps[1].to_string())
            .collect()
    }

    #[tokio::test]
    async fn test_disabled_command_never_executes() {
        let variants = [
            CommandDescriptor::new("ping", "Ping").enabled(false),
            CommandDescriptor::new("ping", "Ping").enabled(false).owner_only(),
            CommandDescriptor::new("ping", "Ping").enabled(false).guild_only().nsfw(),
            CommandDescriptor::new("ping", "Ping").enabled(false).unsafe_only(),
            CommandDescriptor::new("ping", "Ping")
                .enabled(false)
                .user_permissions(Permissions::empty())
                .cooldown(Duration::ZERO),
        ];
        for descriptor in variants {
            let command = ScriptedCommand::new(descriptor, Script::Reply);
            let h = harness(vec![command.clone()], owner_policy());
            for user in [OWNER, MEMBER] {
                let (event, _) = chat("ping", user, trusted_guild());
                assert_eq!(h.dispatcher.dispatch(event).await, Outcome::Denied(Gate::Disabled));
            }
            assert_eq!(command.executions(), 0);
        }
    }

    #[tokio::test]
    async fn test_disabled_replies_once_without_logging() {
        let command = ScriptedCommand::new(
            CommandDescriptor::new("ping", "Ping").enabled(false),
            Script::Reply,
        );
        let h = harness(vec![command.clone()], owner_policy());
        let (event, fake) = chat("ping", MEMBER, trusted_guild());

        h.dispatcher.dispatch(event).await;

        let reply = fake.only_message();
        assert!(reply.ephemeral);
        assert_eq!(reply.content.as_deref(), Some("This command is currently disabled."));
        assert_eq!(command.executions(), 0);
        assert!(h.reporter.entries().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_second_invocation_within_cooldown_is_denied() {
        let command = ScriptedCommand::new(
            CommandDescriptor::new("ping", "Ping").cooldown(Duration::from_millis(5000)),
            Script::Reply,
        );
        let h = harness(vec![command.clone()], owner_policy());

        let (event, _) = chat("ping", MEMBER, trusted_guild());
        assert_eq!(h.dispatcher.dispatch(event).await, Outcome::Executed);

        tokio::time::advance(Duration::from_millis(1000)).await;

        let (event, fake) = chat("ping", MEMBER, trusted_guild());
        assert_eq!(
            h.dispatcher.dispatch(event).await,
            Outcome::Denied(Gate::Cooldown(Duration::from_millis(4000)))
        );
        let reply = fake.only_message();
        assert!(reply.ephemeral);
        assert!(reply.content.unwrap().contains("**4.00**"));
        assert_eq!(command.executions(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cooldown_expires_and_ledger_is_cleared() {
        let cooldown = Duration::from_millis(5000);
        let command = ScriptedCommand::new(
            CommandDescriptor::new("ping", "Ping").cooldown(cooldown),
            Script::Succeed,
        );
        let h = harness(vec![command.clone()], owner_policy());

        let (event, _) = chat("ping", MEMBER, trusted_guild());
        h.dispatcher.dispatch(event).await;
        assert!(h.dispatcher.cooldowns().contains("ping", UserId(MEMBER)));

        tokio::time::sleep(cooldown + Duration::from_millis(1)).await;
        assert!(!h.dispatcher.cooldowns().contains("ping", UserId(MEMBER)));

        let (event, _) = chat("ping", MEMBER, trusted_guild());
        assert_eq!(h.dispatcher.dispatch(event).await, Outcome::Executed);
        assert_eq!(command.executions(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cooldown_notice_is_deleted_when_cooldown_ends() {
        let command = ScriptedCommand::new(
            CommandDescriptor::new("ping", "Ping").cooldown(Duration::from_secs(3)),
            Script::Succeed,
        );
        let h = harness(vec![command], owner_policy());

        let (event, _) = chat("ping", MEMBER, trusted_guild());
        h.dispatcher.dispatch(event).await;
        let (event, fake) = chat("ping", MEMBER, trusted_guild());
        h.dispatcher.dispatch(event).await;
        assert_eq!(fake.deletions(), 0);

        tokio::time::sleep(Duration::from_secs(3) + Duration::from_millis(1)).await;
        assert_eq!(fake.deletions(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_owner_bypasses_cooldown() {
        let command = ScriptedCommand::new(
            CommandDescriptor::new("ping", "Ping").cooldown(Duration::from_secs(60)),
            Script::Succeed,
        );
        let h = harness(vec![command.clone()], owner_policy());

        for _ in 0..25 {
            let (event, _) = chat("ping", OWNER, trusted_guild());
            assert_eq!(h.dispatcher.dispatch(event).await, Outcome::Executed);
        }
        assert_eq!(command.executions(), 25);
    }

    #[tokio::test]
    async fn test_guild_only_outside_cached_guild() {
        let command = ScriptedCommand::new(
            CommandDescriptor::new("smile", "Smile").guild_only(),
            Script::Reply,
        );
        let h = harness(vec![command.clone()], owner_policy());

        for scope in [GuildScope::None, GuildScope::Raw(GuildId(5))] {
            let (event, fake) = chat("smile", MEMBER, scope);
            assert_eq!(h.dispatcher.dispatch(event).await, Outcome::Denied(Gate::GuildOnly));
            assert_eq!(
                fake.only_message().content.as_deref(),
                Some("This command can only be used inside a server.")
            );
        }
        assert_eq!(command.executions(), 0);
    }

    #[tokio::test]
    async fn test_missing_user_permissions_are_enumerated() {
        let required = Permissions::MANAGE_GUILD | Permissions::BAN_MEMBERS | Permissions::KICK_MEMBERS;
        let held = Permissions::BAN_MEMBERS | Permissions::SEND_MESSAGES;
        let command = ScriptedCommand::new(
            CommandDescriptor::new("language", "Language").user_permissions(required),
            Script::Reply,
        );
        let h = harness(vec![command.clone()], owner_policy());

        let (event, fake) = chat("language", MEMBER, cached_guild(held, Permissions::all()));
        let outcome = h.dispatcher.dispatch(event).await;

        let missing = required & !held;
        assert_eq!(outcome, Outcome::Denied(Gate::MissingUserPermissions(missing)));
        let reply = fake.only_message();
        assert!(reply.ephemeral);
        let expected: BTreeSet<String> = missing
            .get_permission_names()
            .into_iter()
            .map(str::to_string)
            .collect();
        assert_eq!(mentioned_permissions(&reply.content.unwrap()), expected);
        assert_eq!(command.executions(), 0);
    }

    #[tokio::test]
    async fn test_default_permissions_apply_without_command_set() {
        let command = ScriptedCommand::new(CommandDescriptor::new("ping", "Ping"), Script::Reply);
        let h = harness(vec![command.clone()], owner_policy());

        let (event, _) = chat("ping", MEMBER, cached_guild(Permissions::VIEW_CHANNEL, Permissions::all()));
        assert_eq!(
            h.dispatcher.dispatch(event).await,
            Outcome::Denied(Gate::MissingUserPermissions(Permissions::SEND_MESSAGES))
        );
        assert_eq!(command.executions(), 0);
    }

    #[tokio::test]
    async fn test_missing_bot_permissions() {
        let command = ScriptedCommand::new(
            CommandDescriptor::new("smile", "Smile").bot_permissions(Permissions::EMBED_LINKS),
            Script::Reply,
        );
        let h = harness(vec![command.clone()], owner_policy());

        let (event, fake) = chat("smile", MEMBER, cached_guild(Permissions::all(), Permissions::empty()));
        assert_eq!(
            h.dispatcher.dispatch(event).await,
            Outcome::Denied(Gate::MissingBotPermissions(Permissions::EMBED_LINKS))
        );
        let content = fake.only_message().content.unwrap();
        assert!(content.starts_with("I need"));
        assert!(content.contains("__*Embed Links*__"));
    }

    #[tokio::test]
    async fn test_permissions_not_checked_outside_cached_guild() {
        let command = ScriptedCommand::new(
            CommandDescriptor::new("ping", "Ping").user_permissions(Permissions::ADMINISTRATOR),
            Script::Reply,
        );
        let h = harness(vec![command.clone()], owner_policy());

        let (event, _) = chat("ping", MEMBER, GuildScope::None);
        assert_eq!(h.dispatcher.dispatch(event).await, Outcome::Executed);
    }

    #[tokio::test]
    async fn test_nsfw_gate() {
        let command = ScriptedCommand::new(
            CommandDescriptor::new("lewd", "Lewd").nsfw().cooldown(Duration::ZERO),
            Script::Succeed,
        );
        let h = harness(vec![command.clone()], owner_policy());

        let (event, fake) = chat("lewd", MEMBER, trusted_guild());
        assert_eq!(h.dispatcher.dispatch(event).await, Outcome::Denied(Gate::Nsfw));
        assert!(fake.only_message().content.unwrap().contains("age-restricted"));

        let (mut interaction, _) = invocation("lewd", MEMBER);
        interaction.guild = trusted_guild();
        interaction.nsfw_channel = true;
        let event = InteractionEvent::ChatCommand(interaction);
        assert_eq!(h.dispatcher.dispatch(event).await, Outcome::Executed);

        let (event, _) = chat("lewd", MEMBER, GuildScope::None);
        assert_eq!(h.dispatcher.dispatch(event).await, Outcome::Executed);
    }

    fn prefix_command(script: Script) -> Arc<ScriptedCommand> {
        ScriptedCommand::new(
            CommandDescriptor::new("butt", "Explicit content")
                .kind(CommandKind::Prefix)
                .aliases(&["booty"])
                .nsfw()
                .cooldown(Duration::from_secs(10)),
            script,
        )
    }

    fn message(command: &str, user: u64, nsfw_channel: bool) -> (InteractionEvent, Arc<FakeResponder>) {
        let (mut interaction, fake) = invocation(command, user);
        interaction.guild = trusted_guild();
        interaction.nsfw_channel = nsfw_channel;
        (InteractionEvent::MessageCommand(interaction), fake)
    }

    #[tokio::test]
    async fn test_prefix_command_passes_nsfw_gate() {
        let command = prefix_command(Script::Reply);
        let h = harness(vec![command.clone()], owner_policy());

        let (event, fake) = message("butt", MEMBER, false);
        assert_eq!(h.dispatcher.dispatch(event).await, Outcome::Denied(Gate::Nsfw));
        assert!(fake.only_message().content.unwrap().contains("age-restricted"));
        assert_eq!(command.executions(), 0);

        let (event, fake) = message("booty", MEMBER, true);
        assert_eq!(h.dispatcher.dispatch(event).await, Outcome::Executed);
        assert_eq!(fake.only_message().content.as_deref(), Some("done"));
        assert_eq!(command.executions(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_prefix_command_cooldown_is_keyed_by_command_name() {
        let command = prefix_command(Script::Succeed);
        let h = harness(vec![command.clone()], owner_policy());

        let (event, _) = message("butt", MEMBER, true);
        assert_eq!(h.dispatcher.dispatch(event).await, Outcome::Executed);

        // Alias shares the ledger entry of the command it names
        let (event, fake) = message("booty", MEMBER, true);
        assert!(matches!(
            h.dispatcher.dispatch(event).await,
            Outcome::Denied(Gate::Cooldown(_))
        ));
        assert!(fake.only_message().content.unwrap().contains("more second(s)"));
        assert!(h.dispatcher.cooldowns().contains("butt", UserId(MEMBER)));
        assert_eq!(command.executions(), 1);
    }

    #[tokio::test]
    async fn test_prefix_and_application_commands_do_not_mix() {
        let prefix = prefix_command(Script::Succeed);
        let slash = ScriptedCommand::new(CommandDescriptor::new("ping", "Ping"), Script::Succeed);
        let h = harness(vec![prefix.clone(), slash.clone()], owner_policy());

        let (event, _) = chat("butt", MEMBER, trusted_guild());
        assert_eq!(h.dispatcher.dispatch(event).await, Outcome::Ignored);

        let (event, fake) = message("ping", MEMBER, true);
        assert_eq!(h.dispatcher.dispatch(event).await, Outcome::Ignored);
        assert!(fake.calls().is_empty());

        assert_eq!(prefix.executions() + slash.executions(), 0);
    }

    #[tokio::test]
    async fn test_owner_only_gate() {
        let command = ScriptedCommand::new(CommandDescriptor::new("eval", "Eval").owner_only(), Script::Succeed);
        let h = harness(vec![command.clone()], owner_policy());

        let (event, fake) = chat("eval", MEMBER, trusted_guild());
        assert_eq!(h.dispatcher.dispatch(event).await, Outcome::Denied(Gate::OwnerOnly));
        assert!(fake.only_message().content.unwrap().contains("bot developers"));

        let (event, _) = chat("eval", OWNER, trusted_guild());
        assert_eq!(h.dispatcher.dispatch(event).await, Outcome::Executed);
        assert_eq!(command.executions(), 1);
    }

    #[tokio::test]
    async fn test_unsafe_gate() {
        let descriptor = CommandDescriptor::new("beta", "Beta").unsafe_only();
        let command = ScriptedCommand::new(descriptor.clone(), Script::Succeed);
        let h = harness(vec![command.clone()], owner_policy());

        let (event, fake) = chat("beta", OWNER, trusted_guild());
        assert_eq!(h.dispatcher.dispatch(event).await, Outcome::Denied(Gate::Unsafe));
        assert_eq!(fake.only_message().content.as_deref(), Some(UNSAFE_MESSAGE));

        let policy = DispatchPolicy {
            unsafe_mode: true,
            ..owner_policy()
        };
        let command = ScriptedCommand::new(descriptor, Script::Succeed);
        let h = harness(vec![command.clone()], policy);
        let (event, _) = chat("beta", MEMBER, trusted_guild());
        assert_eq!(h.dispatcher.dispatch(event).await, Outcome::Executed);
    }

    #[tokio::test]
    async fn test_gates_run_in_order() {
        // Permission gate comes before nsfw and owner gates
        let command = ScriptedCommand::new(
            CommandDescriptor::new("x", "X")
                .nsfw()
                .owner_only()
                .user_permissions(Permissions::MANAGE_GUILD),
            Script::Succeed,
        );
        let h = harness(vec![command.clone()], owner_policy());
        let (event, _) = chat("x", MEMBER, cached_guild(Permissions::empty(), Permissions::all()));
        assert_eq!(
            h.dispatcher.dispatch(event).await,
            Outcome::Denied(Gate::MissingUserPermissions(Permissions::MANAGE_GUILD))
        );

        // nsfw before owner
        let (event, _) = chat("x", MEMBER, trusted_guild());
        assert_eq!(h.dispatcher.dispatch(event).await, Outcome::Denied(Gate::Nsfw));

        // guild-only before permissions
        let command = ScriptedCommand::new(
            CommandDescriptor::new("y", "Y").guild_only().owner_only(),
            Script::Succeed,
        );
        let h = harness(vec![command], owner_policy());
        let (event, _) = chat("y", MEMBER, GuildScope::Raw(GuildId(9)));
        assert_eq!(h.dispatcher.dispatch(event).await, Outcome::Denied(Gate::GuildOnly));
    }

    #[tokio::test]
    async fn test_denied_invocation_does_not_start_cooldown() {
        let command = ScriptedCommand::new(CommandDescriptor::new("eval", "Eval").owner_only(), Script::Succeed);
        let h = harness(vec![command], owner_policy());

        let (event, _) = chat("eval", MEMBER, trusted_guild());
        h.dispatcher.dispatch(event).await;
        assert!(!h.dispatcher.cooldowns().contains("eval", UserId(MEMBER)));
    }

    #[tokio::test]
    async fn test_expired_interaction_is_swallowed() {
        let command = ScriptedCommand::new(CommandDescriptor::new("ping", "Ping"), Script::FailExpired);
        let h = harness(vec![command.clone()], owner_policy());

        let (event, fake) = chat("ping", MEMBER, trusted_guild());
        assert_eq!(
            h.dispatcher.dispatch(event).await,
            Outcome::Failed(Failure::Expired)
        );
        assert!(fake.calls().is_empty());
        assert!(h.reporter.entries().is_empty());
    }

    #[tokio::test]
    async fn test_unexpected_failure_replies_once_and_logs_once() {
        let command = ScriptedCommand::new(CommandDescriptor::new("advice", "Advice"), Script::Fail);
        let h = harness(vec![command.clone()], owner_policy());

        let (event, fake) = chat("advice", MEMBER, trusted_guild());
        assert_eq!(
            h.dispatcher.dispatch(event).await,
            Outcome::Failed(Failure::Unexpected)
        );

        let reply = fake.only_message();
        assert!(reply.ephemeral);
        assert!(reply.content.unwrap().contains("https://discord.gg/elvia"));
        assert_eq!(h.reporter.entries().len(), 1);
        assert_eq!(h.reporter.count(Level::Error), 1);
    }

    #[tokio::test]
    async fn test_failure_after_defer_edits_deferred_reply() {
        let command = ScriptedCommand::new(CommandDescriptor::new("advice", "Advice"), Script::DeferThenFail);
        let h = harness(vec![command], owner_policy());

        let (event, fake) = chat("advice", MEMBER, trusted_guild());
        h.dispatcher.dispatch(event).await;

        let calls = fake.calls();
        assert_eq!(calls.len(), 2);
        assert!(matches!(calls[0], ResponderCall::Defer { .. }));
        assert!(matches!(calls[1], ResponderCall::Edit(_)));
        assert_eq!(h.reporter.count(Level::Error), 1);
    }

    #[tokio::test]
    async fn test_failure_after_reply_sends_nothing_more() {
        let command = ScriptedCommand::new(CommandDescriptor::new("advice", "Advice"), Script::ReplyThenFail);
        let h = harness(vec![command], owner_policy());

        let (event, fake) = chat("advice", MEMBER, trusted_guild());
        assert_eq!(
            h.dispatcher.dispatch(event).await,
            Outcome::Failed(Failure::Unexpected)
        );
        assert_eq!(fake.only_message().content.as_deref(), Some("partial"));
        assert!(h.reporter.entries().is_empty());
    }

    #[tokio::test]
    async fn test_autocomplete_owner_only_for_non_owner() {
        let command = ScriptedCommand::new(CommandDescriptor::new("eval", "Eval").owner_only(), Script::Succeed);
        let h = harness(vec![command.clone()], owner_policy());

        let (event, fake) = autocomplete("eval", MEMBER);
        assert_eq!(h.dispatcher.dispatch(event).await, Outcome::Denied(Gate::OwnerOnly));
        assert_eq!(fake.choices(), Some(Vec::new()));
        assert_eq!(command.completions(), 0);
    }

    #[tokio::test]
    async fn test_autocomplete_runs_handler() {
        let command = ScriptedCommand::new(CommandDescriptor::new("language", "Language"), Script::Succeed);
        let h = harness(vec![command.clone()], owner_policy());

        let (event, fake) = autocomplete("language", MEMBER);
        assert_eq!(h.dispatcher.dispatch(event).await, Outcome::Suggested);
        assert_eq!(fake.choices().unwrap().len(), 1);
        assert_eq!(command.completions(), 1);
        assert_eq!(command.executions(), 0);
    }

    #[tokio::test]
    async fn test_autocomplete_unregistered_answers_empty() {
        let h = harness(Vec::new(), owner_policy());
        let (event, fake) = autocomplete("ghost", MEMBER);
        assert_eq!(h.dispatcher.dispatch(event).await, Outcome::Ignored);
        assert_eq!(fake.choices(), Some(Vec::new()));
    }

    #[tokio::test]
    async fn test_unregistered_command_is_ignored() {
        let h = harness(Vec::new(), owner_policy());
        let (event, fake) = chat("ghost", MEMBER, trusted_guild());
        assert_eq!(h.dispatcher.dispatch(event).await, Outcome::Ignored);
        assert!(fake.calls().is_empty());
        assert_eq!(h.dispatcher.dispatch(InteractionEvent::Other).await, Outcome::Ignored);
    }

    #[tokio::test]
    async fn test_context_menu_uses_same_pipeline() {
        let command = ScriptedCommand::new(CommandDescriptor::new("Avatar", "").enabled(false), Script::Reply);
        let h = harness(vec![command.clone()], owner_policy());
        let (interaction, _) = invocation("Avatar", MEMBER);
        let outcome = h.dispatcher.dispatch(InteractionEvent::ContextMenu(interaction)).await;
        assert_eq!(outcome, Outcome::Denied(Gate::Disabled));
    }

    #[tokio::test]
    async fn test_stored_guild_locale_wins() {
        let command = ScriptedCommand::new(CommandDescriptor::new("ping", "Ping").enabled(false), Script::Reply);
        let store = Arc::new(MemoryStore::with_locale(GUILD, "es-ES"));
        let h = harness_with_store(vec![command], owner_policy(), store);

        let (mut interaction, fake) = invocation("ping", MEMBER);
        interaction.guild = trusted_guild();
        interaction.guild_locale = Some("en-US".to_string());
        h.dispatcher.dispatch(InteractionEvent::ChatCommand(interaction)).await;

        assert_eq!(
            fake.only_message().content.as_deref(),
            Some("Este comando está deshabilitado actualmente.")
        );
    }

    #[tokio::test]
    async fn test_locale_falls_back_to_guild_locale() {
        let command = ScriptedCommand::new(CommandDescriptor::new("ping", "Ping").enabled(false), Script::Reply);
        let h = harness_with_store(vec![command], owner_policy(), Arc::new(MemoryStore::broken()));

        let (mut interaction, fake) = invocation("ping", MEMBER);
        interaction.guild = trusted_guild();
        interaction.guild_locale = Some("es-419".to_string());
        h.dispatcher.dispatch(InteractionEvent::ChatCommand(interaction)).await;

        assert!(fake.only_message().content.unwrap().starts_with("Este comando"));
        // Lookup failures are not reported as command failures
        assert!(h.reporter.entries().is_empty());
    }

    #[tokio::test]
    async fn test_locale_defaults_in_direct_messages() {
        let command = ScriptedCommand::new(CommandDescriptor::new("ping", "Ping").enabled(false), Script::Reply);
        let h = harness(vec![command], owner_policy());
        let (event, fake) = chat("ping", MEMBER, GuildScope::None);
        h.dispatcher.dispatch(event).await;
        assert_eq!(
            fake.only_message().content.as_deref(),
            Some("This command is currently disabled.")
        );
    }

    #[tokio::test]
    async fn test_successful_command_leaves_reply_state() {
        let command = ScriptedCommand::new(CommandDescriptor::new("ping", "Ping"), Script::Reply);
        let h = harness(vec![command], owner_policy());
        let (interaction, fake) = invocation("ping", MEMBER);
        h.dispatcher.dispatch(InteractionEvent::ChatCommand(interaction)).await;
        assert_eq!(fake.state(), ResponseState::Replied);
    }
}
