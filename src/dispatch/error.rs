//! Failure classification and reporting
//!
//! Two buckets: an interaction that expired before we answered (Discord error
//! 10062, always swallowed) and everything else (logged).

use log::Level;
use serenity::http::error::Error as HttpError;
use std::fmt;

/// Discord JSON error code for "Unknown interaction"
pub const UNKNOWN_INTERACTION: isize = 10062;

/// The interaction token expired or was already consumed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InteractionExpired;

impl fmt::Display for InteractionExpired {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Unknown interaction (Discord error {UNKNOWN_INTERACTION})")
    }
}

impl std::error::Error for InteractionExpired {}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Failure {
    /// Race against interaction expiry
    Expired,
    Unexpected,
}

/// JSON error code of a failed Discord HTTP request
pub fn discord_error_code(error: &serenity::Error) -> Option<isize> {
    match error {
        serenity::Error::Http(http) => match http.as_ref() {
            HttpError::UnsuccessfulRequest(response) => Some(response.error.code),
            _ => None,
        },
        _ => None,
    }
}

/// Convert a serenity error, tagging expired interactions
pub fn from_serenity(error: serenity::Error) -> anyhow::Error {
    if discord_error_code(&error) == Some(UNKNOWN_INTERACTION) {
        anyhow::Error::new(InteractionExpired)
    } else {
        anyhow::Error::new(error)
    }
}

pub fn classify(error: &anyhow::Error) -> Failure {
    let expired = error.chain().any(|cause| {
        cause.is::<InteractionExpired>()
            || cause
                .downcast_ref::<serenity::Error>()
                .and_then(discord_error_code)
                == Some(UNKNOWN_INTERACTION)
    });
    if expired {
        Failure::Expired
    } else {
        Failure::Unexpected
    }
}

/// Sink for unexpected failures
pub trait ErrorReporter: Send + Sync {
    fn report(&self, level: Level, message: &str, error: &anyhow::Error);
}

/// Writes failures through the `log` facade
pub struct LogReporter;

impl ErrorReporter for LogReporter {
    fn report(&self, level: Level, message: &str, error: &anyhow::Error) {
        log::log!(level, "{message}: {error:#} | {error:?}");
    }
}
