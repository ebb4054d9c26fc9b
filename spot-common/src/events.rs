//! Current-user broadcast
//!
//! The "current user" is shared, process-lifetime state with several readers
//! (navigation display, profile view) and a handful of writers (login,
//! registration, logout, score refresh). [`UserWatch`] publishes it over a
//! `tokio::sync::watch` channel, so a subscriber always starts from the latest
//! value and sees every later change. A subscriber that arrives between two
//! rapid refreshes still observes the newest one.

use crate::models::User;
use std::sync::Arc;
use tokio::sync::watch;

/// Receiver half handed to subscribers
pub type UserReceiver = watch::Receiver<Option<User>>;

/// Replay-latest channel for the current user
///
/// Cloning a `UserWatch` yields another handle to the same channel.
///
/// # Examples
///
/// ```
/// use spot_common::events::UserWatch;
///
/// let watch = UserWatch::new(None);
/// let rx = watch.subscribe();
/// assert!(rx.borrow().is_none());
/// ```
#[derive(Debug, Clone)]
pub struct UserWatch {
    tx: Arc<watch::Sender<Option<User>>>,
}

impl UserWatch {
    /// Create a channel holding `initial`
    pub fn new(initial: Option<User>) -> Self {
        let (tx, _) = watch::channel(initial);
        Self { tx: Arc::new(tx) }
    }

    /// Subscribe to the current value and every later update
    ///
    /// The value present at subscription time is readable immediately via
    /// `borrow()`; `changed()` resolves on the next publish.
    pub fn subscribe(&self) -> UserReceiver {
        self.tx.subscribe()
    }

    /// Replace the current value and notify subscribers
    ///
    /// Succeeds with no subscribers; the value is retained for late ones.
    /// Returns the previous value.
    pub fn publish(&self, user: Option<User>) -> Option<User> {
        self.tx.send_replace(user)
    }

    /// Snapshot of the current value
    pub fn current(&self) -> Option<User> {
        self.tx.borrow().clone()
    }

    /// Identifier of the current user, if any
    pub fn current_id(&self) -> Option<String> {
        self.tx.borrow().as_ref().map(|u| u.id.clone())
    }

    /// Number of live receivers
    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

impl Default for UserWatch {
    fn default() -> Self {
        Self::new(None)
    }
}
