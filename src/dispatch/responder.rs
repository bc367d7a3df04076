//! Reply surface
//!
//! An interaction can be answered once: either a direct reply, or a defer
//! followed by edits of the deferred message. Autocomplete requests are
//! answered with a list of choices instead. Prefix commands follow the same
//! rules over plain channel messages.

use anyhow::{bail, Result};
use async_trait::async_trait;
use serenity::builder::{CreateComponents, CreateEmbed};
use serenity::http::Http;
use serenity::model::application::component::ButtonStyle;
use serenity::model::application::interaction::application_command::ApplicationCommandInteraction;
use serenity::model::application::interaction::autocomplete::AutocompleteInteraction;
use serenity::model::application::interaction::InteractionResponseType;
use serenity::model::id::{ChannelId, MessageId};
use std::future::Future;
use std::sync::{Arc, Mutex, PoisonError};

use super::error::from_serenity;
use crate::core::truncate_for_message;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponseState {
    Pending,
    Deferred,
    Replied,
}

impl ResponseState {
    /// Check a transition before sending anything to Discord
    pub fn check(self, action: ResponseAction) -> Result<ResponseState> {
        match (self, action) {
            (ResponseState::Pending, ResponseAction::Reply) => Ok(ResponseState::Replied),
            (ResponseState::Pending, ResponseAction::Defer) => Ok(ResponseState::Deferred),
            (ResponseState::Pending, ResponseAction::Respond) => Ok(ResponseState::Replied),
            (ResponseState::Deferred | ResponseState::Replied, ResponseAction::Edit) => {
                Ok(ResponseState::Replied)
            }
            (ResponseState::Deferred | ResponseState::Replied, ResponseAction::Delete) => Ok(self),
            (ResponseState::Pending, ResponseAction::Edit | ResponseAction::Delete) => {
                bail!("Interaction has not been acknowledged yet")
            }
            (_, _) => bail!("Interaction has already been acknowledged"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponseAction {
    Reply,
    Defer,
    Edit,
    Delete,
    Respond,
}

/// Button opening a URL
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinkButton {
    pub label: String,
    pub url: String,
}

/// Message payload for replies and edits
#[derive(Debug, Clone, Default)]
pub struct Reply {
    pub content: Option<String>,
    pub embeds: Vec<CreateEmbed>,
    pub links: Vec<LinkButton>,
    /// Ignored for prefix commands, channel messages are always public
    pub ephemeral: bool,
}

impl Reply {
    pub fn text(content: impl Into<String>) -> Self {
        Self {
            content: Some(content.into()),
            ..Default::default()
        }
    }

    /// Plain text only the invoking user can see
    pub fn ephemeral(content: impl Into<String>) -> Self {
        Self::text(content).hidden()
    }

    pub fn embed(embed: CreateEmbed) -> Self {
        Self {
            embeds: vec![embed],
            ..Default::default()
        }
    }

    pub fn hidden(mut self) -> Self {
        self.ephemeral = true;
        self
    }

    pub fn link(mut self, label: impl Into<String>, url: impl Into<String>) -> Self {
        self.links.push(LinkButton {
            label: label.into(),
            url: url.into(),
        });
        self
    }
}

/// One action row of link buttons, or nothing
fn link_components(links: &[LinkButton]) -> CreateComponents {
    let mut components = CreateComponents::default();
    if !links.is_empty() {
        components.create_action_row(|row| {
            for link in links {
                row.create_button(|button| {
                    button
                        .style(ButtonStyle::Link)
                        .label(&link.label)
                        .url(&link.url)
                });
            }
            row
        });
    }
    components
}

/// Autocomplete suggestion
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Choice {
    pub name: String,
    pub value: String,
}

impl Choice {
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }
}

#[async_trait]
pub trait Responder: Send + Sync {
    fn state(&self) -> ResponseState;

    async fn reply(&self, reply: Reply) -> Result<()>;

    async fn defer(&self, ephemeral: bool) -> Result<()>;

    /// Edit the deferred or sent reply
    async fn edit_reply(&self, reply: Reply) -> Result<()>;

    async fn delete_reply(&self) -> Result<()>;

    /// Answer an autocomplete request
    async fn respond(&self, choices: Vec<Choice>) -> Result<()>;
}

/// Response state plus a send lock held from the transition check until the
/// request settles, so concurrent callers see each other's responses
struct ResponseGuard {
    state: Mutex<ResponseState>,
    sending: tokio::sync::Mutex<()>,
}

impl ResponseGuard {
    fn new() -> Self {
        ResponseGuard {
            state: Mutex::new(ResponseState::Pending),
            sending: tokio::sync::Mutex::new(()),
        }
    }

    fn state(&self) -> ResponseState {
        *self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Run `request` if `action` is allowed; the state only moves when it succeeds
    async fn send<F>(&self, action: ResponseAction, request: F) -> Result<()>
    where
        F: Future<Output = Result<()>>,
    {
        let _sending = self.sending.lock().await;
        let next = self.state().check(action)?;
        request.await?;
        *self.state.lock().unwrap_or_else(PoisonError::into_inner) = next;
        Ok(())
    }
}

enum ResponseTarget {
    Command(ApplicationCommandInteraction),
    Autocomplete(AutocompleteInteraction),
}

/// Responder backed by Discord's interaction endpoints
pub struct SerenityResponder {
    http: Arc<Http>,
    target: ResponseTarget,
    guard: ResponseGuard,
}

impl SerenityResponder {
    pub fn for_command(http: Arc<Http>, interaction: ApplicationCommandInteraction) -> Self {
        Self::with_target(http, ResponseTarget::Command(interaction))
    }

    pub fn for_autocomplete(http: Arc<Http>, interaction: AutocompleteInteraction) -> Self {
        Self::with_target(http, ResponseTarget::Autocomplete(interaction))
    }

    fn with_target(http: Arc<Http>, target: ResponseTarget) -> Self {
        Self {
            http,
            target,
            guard: ResponseGuard::new(),
        }
    }

    fn command(&self) -> Result<&ApplicationCommandInteraction> {
        match &self.target {
            ResponseTarget::Command(command) => Ok(command),
            ResponseTarget::Autocomplete(_) => bail!("Autocomplete requests only accept choices"),
        }
    }
}

#[async_trait]
impl Responder for SerenityResponder {
    fn state(&self) -> ResponseState {
        self.guard.state()
    }

    async fn reply(&self, reply: Reply) -> Result<()> {
        let command = self.command()?;
        let request = async {
            command
                .create_interaction_response(&self.http, |response| {
                    response
                        .kind(InteractionResponseType::ChannelMessageWithSource)
                        .interaction_response_data(|message| {
                            if let Some(content) = &reply.content {
                                message.content(truncate_for_message(content));
                            }
                            for embed in &reply.embeds {
                                message.add_embed(embed.clone());
                            }
                            message
                                .set_components(link_components(&reply.links))
                                .ephemeral(reply.ephemeral)
                        })
                })
                .await
                .map_err(from_serenity)
        };
        self.guard.send(ResponseAction::Reply, request).await
    }

    async fn defer(&self, ephemeral: bool) -> Result<()> {
        let command = self.command()?;
        let request = async {
            command
                .create_interaction_response(&self.http, |response| {
                    response
                        .kind(InteractionResponseType::DeferredChannelMessageWithSource)
                        .interaction_response_data(|message| message.ephemeral(ephemeral))
                })
                .await
                .map_err(from_serenity)
        };
        self.guard.send(ResponseAction::Defer, request).await
    }

    async fn edit_reply(&self, reply: Reply) -> Result<()> {
        let command = self.command()?;
        let request = async {
            command
                .edit_original_interaction_response(&self.http, |response| {
                    if let Some(content) = &reply.content {
                        response.content(truncate_for_message(content));
                    }
                    for embed in &reply.embeds {
                        response.add_embed(embed.clone());
                    }
                    response.set_components(link_components(&reply.links))
                })
                .await
                .map(|_| ())
                .map_err(from_serenity)
        };
        self.guard.send(ResponseAction::Edit, request).await
    }

    async fn delete_reply(&self) -> Result<()> {
        let command = self.command()?;
        let request = async {
            command
                .delete_original_interaction_response(&self.http)
                .await
                .map_err(from_serenity)
        };
        self.guard.send(ResponseAction::Delete, request).await
    }

    async fn respond(&self, choices: Vec<Choice>) -> Result<()> {
        let ResponseTarget::Autocomplete(autocomplete) = &self.target else {
            bail!("Only autocomplete requests accept choices");
        };
        let request = async {
            autocomplete
                .create_autocomplete_response(&self.http, |response| {
                    // Discord caps suggestions at 25
                    for choice in choices.iter().take(25) {
                        response.add_string_choice(&choice.name, &choice.value);
                    }
                    response
                })
                .await
                .map_err(from_serenity)
        };
        self.guard.send(ResponseAction::Respond, request).await
    }
}

/// Responder for prefix commands: replies reference the invoking message,
/// deferring shows the typing indicator
pub struct MessageResponder {
    http: Arc<Http>,
    channel_id: ChannelId,
    message_id: MessageId,
    sent: Mutex<Option<MessageId>>,
    guard: ResponseGuard,
}

impl MessageResponder {
    pub fn new(http: Arc<Http>, channel_id: ChannelId, message_id: MessageId) -> Self {
        MessageResponder {
            http,
            channel_id,
            message_id,
            sent: Mutex::new(None),
            guard: ResponseGuard::new(),
        }
    }

    fn sent_message(&self) -> Option<MessageId> {
        *self.sent.lock().unwrap_or_else(PoisonError::into_inner)
    }

    async fn send_reply(&self, reply: &Reply) -> Result<()> {
        let reference = (self.channel_id, self.message_id);
        let message = self
            .channel_id
            .send_message(&self.http, |message| {
                message
                    .reference_message(reference)
                    .allowed_mentions(|mentions| mentions.replied_user(false));
                if let Some(content) = &reply.content {
                    message.content(truncate_for_message(content));
                }
                message
                    .add_embeds(reply.embeds.clone())
                    .set_components(link_components(&reply.links))
            })
            .await
            .map_err(from_serenity)?;
        *self.sent.lock().unwrap_or_else(PoisonError::into_inner) = Some(message.id);
        Ok(())
    }
}

#[async_trait]
impl Responder for MessageResponder {
    fn state(&self) -> ResponseState {
        self.guard.state()
    }

    async fn reply(&self, reply: Reply) -> Result<()> {
        self.guard
            .send(ResponseAction::Reply, self.send_reply(&reply))
            .await
    }

    async fn defer(&self, _ephemeral: bool) -> Result<()> {
        let request = async {
            self.channel_id
                .broadcast_typing(&self.http)
                .await
                .map_err(from_serenity)
        };
        self.guard.send(ResponseAction::Defer, request).await
    }

    /// Edits the sent reply, or sends the first one after a defer
    async fn edit_reply(&self, reply: Reply) -> Result<()> {
        let request = async {
            let Some(message_id) = self.sent_message() else {
                return self.send_reply(&reply).await;
            };
            self.channel_id
                .edit_message(&self.http, message_id, |message| {
                    if let Some(content) = &reply.content {
                        message.content(truncate_for_message(content));
                    }
                    message
                        .set_embeds(reply.embeds.clone())
                        .set_components(link_components(&reply.links))
                })
                .await
                .map(|_| ())
                .map_err(from_serenity)
        };
        self.guard.send(ResponseAction::Edit, request).await
    }

    async fn delete_reply(&self) -> Result<()> {
        let request = async {
            match self.sent_message() {
                Some(message_id) => self
                    .channel_id
                    .delete_message(&self.http, message_id)
                    .await
                    .map_err(from_serenity),
                None => Ok(()),
            }
        };
        self.guard.send(ResponseAction::Delete, request).await
    }

    async fn respond(&self, _choices: Vec<Choice>) -> Result<()> {
        bail!("Prefix commands have no autocomplete")
    }
}
