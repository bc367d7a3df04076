//! Inbound interaction events
//!
//! Serenity interactions and prefixed messages are flattened into an
//! [`Invocation`] holding only what the dispatcher and the commands read, plus
//! the reply surface.

use serde_json::Value;
use serenity::cache::Cache;
use serenity::client::Context;
use serenity::model::application::command::{CommandOptionType, CommandType};
use serenity::model::application::interaction::application_command::{
    ApplicationCommandInteraction, CommandDataOption,
};
use serenity::model::application::interaction::autocomplete::AutocompleteInteraction;
use serenity::model::application::interaction::Interaction;
use serenity::model::channel::{ChannelType, GuildChannel, Message};
use serenity::model::guild::Member;
use serenity::model::id::{ChannelId, GuildId, UserId};
use serenity::model::permissions::Permissions;
use serenity::model::user::User;
use std::collections::HashMap;
use std::sync::Arc;
use uuid::Uuid;

use super::responder::{MessageResponder, Responder, SerenityResponder};

pub enum InteractionEvent {
    ChatCommand(Invocation),
    ContextMenu(Invocation),
    Autocomplete(Invocation),
    /// Text command typed after the message prefix
    MessageCommand(Invocation),
    Other,
}

impl InteractionEvent {
    pub fn from_serenity(ctx: &Context, interaction: Interaction) -> Self {
        match interaction {
            Interaction::ApplicationCommand(command) => {
                let is_chat = command.data.kind == CommandType::ChatInput;
                let invocation = Invocation::from_command(ctx, command);
                if is_chat {
                    InteractionEvent::ChatCommand(invocation)
                } else {
                    InteractionEvent::ContextMenu(invocation)
                }
            }
            Interaction::Autocomplete(autocomplete) => {
                InteractionEvent::Autocomplete(Invocation::from_autocomplete(ctx, autocomplete))
            }
            _ => InteractionEvent::Other,
        }
    }

    /// `Other` unless the message starts with `prefix` and names something
    pub async fn from_message(ctx: &Context, message: &Message, prefix: &str) -> Self {
        if message.author.bot {
            return InteractionEvent::Other;
        }
        match parse_prefixed(&message.content, prefix) {
            Some((command, args)) => {
                let invocation = Invocation::from_message(ctx, message, command, args).await;
                InteractionEvent::MessageCommand(invocation)
            }
            None => InteractionEvent::Other,
        }
    }

    pub fn invocation(&self) -> Option<&Invocation> {
        match self {
            InteractionEvent::ChatCommand(invocation)
            | InteractionEvent::ContextMenu(invocation)
            | InteractionEvent::Autocomplete(invocation)
            | InteractionEvent::MessageCommand(invocation) => Some(invocation),
            InteractionEvent::Other => None,
        }
    }
}

/// Where the interaction happened
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GuildScope {
    /// Direct messages
    None,
    /// Guild we know the id of but hold no cached data for
    Raw(GuildId),
    Cached(CachedGuild),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CachedGuild {
    pub id: GuildId,
    pub member_permissions: Permissions,
    pub bot_permissions: Permissions,
}

impl GuildScope {
    pub fn id(&self) -> Option<GuildId> {
        match self {
            GuildScope::None => None,
            GuildScope::Raw(id) => Some(*id),
            GuildScope::Cached(guild) => Some(guild.id),
        }
    }

    pub fn cached(&self) -> Option<&CachedGuild> {
        match self {
            GuildScope::Cached(guild) => Some(guild),
            _ => None,
        }
    }

    pub fn in_guild(&self) -> bool {
        !matches!(self, GuildScope::None)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserRef {
    pub id: UserId,
    pub name: String,
    pub avatar_url: String,
}

impl From<&User> for UserRef {
    fn from(user: &User) -> Self {
        UserRef {
            id: user.id,
            name: user.name.clone(),
            avatar_url: user.face(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct CommandOption {
    pub name: String,
    pub value: Value,
    pub focused: bool,
}

pub struct Invocation {
    /// Correlates log lines for one interaction
    pub request_id: Uuid,
    pub command: String,
    pub user: UserRef,
    pub guild: GuildScope,
    pub channel_id: ChannelId,
    pub nsfw_channel: bool,
    pub guild_locale: Option<String>,
    /// Innermost subcommand, e.g. `set` for `/language set`
    pub subcommand: Option<String>,
    /// Options with subcommand groups flattened
    pub options: Vec<CommandOption>,
    pub resolved_users: HashMap<UserId, UserRef>,
    /// Target of a user context-menu command
    pub target_user: Option<UserId>,
    /// Words after the command name of a prefix command
    pub args: Vec<String>,
    pub responder: Arc<dyn Responder>,
}

impl Invocation {
    pub fn new(command: impl Into<String>, user: UserRef, responder: Arc<dyn Responder>) -> Self {
        Invocation {
            request_id: Uuid::new_v4(),
            command: command.into(),
            user,
            guild: GuildScope::None,
            channel_id: ChannelId(0),
            nsfw_channel: false,
            guild_locale: None,
            subcommand: None,
            options: Vec::new(),
            resolved_users: HashMap::new(),
            target_user: None,
            args: Vec::new(),
            responder,
        }
    }

    fn from_command(ctx: &Context, command: ApplicationCommandInteraction) -> Self {
        let user = UserRef::from(&command.user);
        let guild = guild_scope(
            &ctx.cache,
            command.guild_id,
            command.member.as_ref(),
            command.app_permissions,
        );
        let resolved_users = command
            .data
            .resolved
            .users
            .iter()
            .map(|(id, user)| (*id, UserRef::from(user)))
            .collect();
        let target_user = match command.data.kind {
            CommandType::User => command.data.target_id.map(|target| target.to_user_id()),
            _ => None,
        };

        Invocation {
            request_id: Uuid::new_v4(),
            command: command.data.name.clone(),
            user,
            guild,
            channel_id: command.channel_id,
            nsfw_channel: channel_is_nsfw(&ctx.cache, command.channel_id),
            guild_locale: command.guild_locale.clone(),
            subcommand: find_subcommand(&command.data.options),
            options: flatten_options(&command.data.options),
            resolved_users,
            target_user,
            args: Vec::new(),
            responder: Arc::new(SerenityResponder::for_command(ctx.http.clone(), command)),
        }
    }

    fn from_autocomplete(ctx: &Context, autocomplete: AutocompleteInteraction) -> Self {
        let user = UserRef::from(&autocomplete.user);
        let guild = guild_scope(&ctx.cache, autocomplete.guild_id, autocomplete.member.as_ref(), None);
        let command = autocomplete.data.name.clone();
        let subcommand = find_subcommand(&autocomplete.data.options);
        let options = flatten_options(&autocomplete.data.options);
        let channel_id = autocomplete.channel_id;
        let responder = Arc::new(SerenityResponder::for_autocomplete(
            ctx.http.clone(),
            autocomplete,
        ));

        let mut invocation = Invocation::new(command, user, responder);
        invocation.guild = guild;
        invocation.channel_id = channel_id;
        invocation.nsfw_channel = channel_is_nsfw(&ctx.cache, channel_id);
        invocation.subcommand = subcommand;
        invocation.options = options;
        invocation
    }

    async fn from_message(
        ctx: &Context,
        message: &Message,
        command: String,
        args: Vec<String>,
    ) -> Self {
        let guild = match message.guild_id {
            None => GuildScope::None,
            Some(id) => {
                let author = id.member(ctx, message.author.id).await.ok();
                let bot = id.member(ctx, ctx.cache.current_user_id()).await.ok();
                member_scope(&ctx.cache, id, message.channel_id, author.as_ref(), bot.as_ref())
            }
        };
        let guild_locale = guild
            .id()
            .and_then(|id| ctx.cache.guild_field(id, |guild| guild.preferred_locale.clone()));
        let resolved_users = message
            .mentions
            .iter()
            .map(|user| (user.id, UserRef::from(user)))
            .collect();
        let responder = Arc::new(MessageResponder::new(
            ctx.http.clone(),
            message.channel_id,
            message.id,
        ));

        let mut invocation = Invocation::new(command, UserRef::from(&message.author), responder);
        invocation.guild = guild;
        invocation.channel_id = message.channel_id;
        invocation.nsfw_channel = channel_is_nsfw(&ctx.cache, message.channel_id);
        invocation.guild_locale = guild_locale;
        invocation.resolved_users = resolved_users;
        invocation.args = args;
        invocation
    }

    pub fn option(&self, name: &str) -> Option<&Value> {
        self.options
            .iter()
            .find(|option| option.name == name)
            .map(|option| &option.value)
    }

    pub fn string_option(&self, name: &str) -> Option<&str> {
        self.option(name).and_then(Value::as_str)
    }

    /// User option resolved to its user data
    pub fn user_option(&self, name: &str) -> Option<&UserRef> {
        let id = self.string_option(name)?.parse::<u64>().ok()?;
        self.resolved_users.get(&UserId(id))
    }

    /// Option the user is currently typing in an autocomplete request
    pub fn focused_option(&self) -> Option<&CommandOption> {
        self.options.iter().find(|option| option.focused)
    }

    pub fn target(&self) -> Option<&UserRef> {
        self.target_user.and_then(|id| self.resolved_users.get(&id))
    }
}

fn guild_scope(
    cache: &Cache,
    guild_id: Option<GuildId>,
    member: Option<&Member>,
    app_permissions: Option<Permissions>,
) -> GuildScope {
    match guild_id {
        None => GuildScope::None,
        Some(id) if cache.guild_field(id, |_| ()).is_some() => GuildScope::Cached(CachedGuild {
            id,
            member_permissions: member
                .and_then(|member| member.permissions)
                .unwrap_or_else(Permissions::empty),
            bot_permissions: app_permissions.unwrap_or_else(Permissions::empty),
        }),
        Some(id) => GuildScope::Raw(id),
    }
}

/// Scope of a prefix command; permissions come from the cached guild's roles
/// and channel overwrites, so an uncached guild, channel or member stays raw
fn member_scope(
    cache: &Cache,
    guild_id: GuildId,
    channel_id: ChannelId,
    author: Option<&Member>,
    bot: Option<&Member>,
) -> GuildScope {
    let (Some(author), Some(bot)) = (author, bot) else {
        return GuildScope::Raw(guild_id);
    };
    let Some(channel) = permission_channel(cache, channel_id) else {
        return GuildScope::Raw(guild_id);
    };
    let permissions = cache
        .guild_field(guild_id, |guild| {
            let member_permissions = guild.user_permissions_in(&channel, author).ok()?;
            let bot_permissions = guild.user_permissions_in(&channel, bot).ok()?;
            Some((member_permissions, bot_permissions))
        })
        .flatten();
    match permissions {
        Some((member_permissions, bot_permissions)) => GuildScope::Cached(CachedGuild {
            id: guild_id,
            member_permissions,
            bot_permissions,
        }),
        None => GuildScope::Raw(guild_id),
    }
}

/// Threads carry no overwrites of their own, their parent decides
fn permission_channel(cache: &Cache, channel_id: ChannelId) -> Option<GuildChannel> {
    let channel = cache.guild_channel(channel_id)?;
    match channel.kind {
        ChannelType::PublicThread | ChannelType::PrivateThread | ChannelType::NewsThread => {
            channel.parent_id.and_then(|parent| cache.guild_channel(parent))
        }
        _ => Some(channel),
    }
}

/// Command name (lowercased) and arguments of a prefixed message
pub fn parse_prefixed(content: &str, prefix: &str) -> Option<(String, Vec<String>)> {
    if prefix.is_empty() {
        return None;
    }
    let mut words = content.trim_start().strip_prefix(prefix)?.split_whitespace();
    let command = words.next()?.to_lowercase();
    Some((command, words.map(str::to_string).collect()))
}

/// Threads inherit the nsfw flag of their parent channel
fn channel_is_nsfw(cache: &Cache, channel_id: ChannelId) -> bool {
    let Some((kind, parent_id, nsfw)) =
        cache.guild_channel_field(channel_id, |channel| (channel.kind, channel.parent_id, channel.nsfw))
    else {
        return false;
    };
    match kind {
        ChannelType::PublicThread | ChannelType::PrivateThread | ChannelType::NewsThread => parent_id
            .and_then(|parent| cache.guild_channel_field(parent, |channel| channel.nsfw))
            .unwrap_or(false),
        _ => nsfw,
    }
}

fn find_subcommand(options: &[CommandDataOption]) -> Option<String> {
    options.iter().find_map(|option| match option.kind {
        CommandOptionType::SubCommand => Some(option.name.clone()),
        CommandOptionType::SubCommandGroup => find_subcommand(&option.options),
        _ => None,
    })
}

fn flatten_options(options: &[CommandDataOption]) -> Vec<CommandOption> {
    let mut flat = Vec::new();
    for option in options {
        if let Some(value) = &option.value {
            flat.push(CommandOption {
                name: option.name.clone(),
                value: value.clone(),
                focused: option.focused,
            });
        }
        flat.extend(flatten_options(&option.options));
    }
    flat
}
