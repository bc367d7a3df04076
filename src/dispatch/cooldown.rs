//! # Feature: Command Cooldowns
//!
//! Per (command, user) cooldown ledger. Each admission records the invocation
//! instant and schedules its own eviction once the window has elapsed. Deferred
//! work (eviction, cleanup of cooldown notices) runs as tokio tasks owned by the
//! tracker and is cancelled when the tracker shuts down or is dropped.
//!
//! - **Version**: 1.0.0
//! - **Since**: 0.1.0
//! - **Toggleable**: false
//!
//! ## Changelog
//! - 1.0.0: Single timestamp per (command, user), tracker-owned deferred tasks

use anyhow::Result;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use log::debug;
use serenity::model::id::UserId;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{sleep, Instant};

/// Composite key: (command name, user id)
type CooldownKey = (String, UserId);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Admission {
    Admitted,
    Cooling { remaining: Duration },
}

pub struct CooldownTracker {
    ledger: Arc<DashMap<CooldownKey, Instant>>,
    shutdown: watch::Sender<bool>,
}

impl CooldownTracker {
    pub fn new() -> Self {
        let (shutdown, _) = watch::channel(false);
        CooldownTracker {
            ledger: Arc::new(DashMap::new()),
            shutdown,
        }
    }

    fn make_key(command: &str, user: UserId) -> CooldownKey {
        (command.to_string(), user)
    }

    /// Admit an invocation or report how long the user still has to wait.
    ///
    /// `bypass` skips the check but still records the invocation.
    pub fn admit(&self, command: &str, user: UserId, cooldown: Duration, bypass: bool) -> Admission {
        let key = Self::make_key(command, user);
        let now = Instant::now();

        match self.ledger.entry(key.clone()) {
            Entry::Occupied(mut entry) => {
                let elapsed = now.saturating_duration_since(*entry.get());
                if !bypass && elapsed < cooldown {
                    return Admission::Cooling {
                        remaining: cooldown - elapsed,
                    };
                }
                entry.insert(now);
            }
            Entry::Vacant(entry) => {
                entry.insert(now);
            }
        }

        self.schedule_eviction(key, now, cooldown);
        Admission::Admitted
    }

    /// Time left before `user` may run `command` again
    pub fn remaining(&self, command: &str, user: UserId, cooldown: Duration) -> Option<Duration> {
        let key = Self::make_key(command, user);
        let last = *self.ledger.get(&key)?;
        let elapsed = Instant::now().saturating_duration_since(last);
        cooldown.checked_sub(elapsed).filter(|left| !left.is_zero())
    }

    pub fn contains(&self, command: &str, user: UserId) -> bool {
        self.ledger.contains_key(&Self::make_key(command, user))
    }

    pub fn len(&self) -> usize {
        self.ledger.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ledger.is_empty()
    }

    /// Run `task` after `delay` unless the tracker shuts down first
    pub fn schedule<F>(&self, delay: Duration, task: F) -> JoinHandle<()>
    where
        F: Future<Output = Result<()>> + Send + 'static,
    {
        let mut shutdown = self.shutdown.subscribe();
        tokio::spawn(async move {
            let stopped = *shutdown.borrow();
            if stopped {
                return;
            }
            tokio::select! {
                _ = sleep(delay) => {
                    if let Err(e) = task.await {
                        debug!("Deferred task failed: {e:#}");
                    }
                }
                // Fires on shutdown() and when the tracker is dropped
                _ = shutdown.changed() => {}
            }
        })
    }

    /// Cancel every pending deferred task
    pub fn shutdown(&self) {
        self.shutdown.send_replace(true);
    }

    fn schedule_eviction(&self, key: CooldownKey, stamp: Instant, cooldown: Duration) {
        let ledger = Arc::clone(&self.ledger);
        self.schedule(cooldown, async move {
            // A later admission owns the entry now
            ledger.remove_if(&key, |_, recorded| *recorded == stamp);
            Ok(())
        });
    }
}

impl Default for CooldownTracker {
    fn default() -> Self {
        Self::new()
    }
}
