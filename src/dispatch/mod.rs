//! Interaction and prefix-command dispatch: admission gates, cooldowns, reply
//! surface and failure classification.

pub mod cooldown;
pub mod dispatcher;
pub mod error;
pub mod event;
pub mod responder;

#[cfg(test)]
pub(crate) mod testing;

pub use cooldown::{Admission, CooldownTracker};
pub use dispatcher::{DispatchPolicy, Gate, InteractionDispatcher, Outcome, UNSAFE_MESSAGE};
pub use error::{classify, ErrorReporter, Failure, InteractionExpired, LogReporter};
pub use event::{CachedGuild, CommandOption, GuildScope, InteractionEvent, Invocation, UserRef};
pub use responder::{
    Choice, LinkButton, MessageResponder, Reply, Responder, ResponseState, SerenityResponder,
};
