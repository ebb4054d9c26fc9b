//! Current-user session and score refresh
//!
//! The session owns the single process-wide "current user". Writers (login,
//! registration, logout, refresh) are serialized through one async mutex so
//! the persisted copy and the published copy never diverge. Readers either
//! take a snapshot or subscribe for updates.
//!
//! Each refresh takes a ticket before its fetch. Under the writer lock a
//! refresh applies only if its ticket is newer than the last applied one,
//! and login, registration and logout invalidate every ticket already
//! issued. Overlapping refreshes therefore never publish an older read over
//! a newer one.

use serde_json::Value;
use spot_common::events::{UserReceiver, UserWatch};
use spot_common::identity::decode;
use spot_common::models::{Credentials, NewUser, User};
use spot_common::Result;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::api::SpotApi;
use crate::db::CredentialStore;

pub struct Session {
    api: Arc<dyn SpotApi>,
    store: Arc<dyn CredentialStore>,
    current: UserWatch,
    /// Last ticket issued to a refresh
    issued: AtomicU64,
    /// Guards writes; holds the newest ticket that may no longer apply
    writer: Mutex<u64>,
}

impl Session {
    /// Start a session from persisted state
    ///
    /// A stored value that no longer parses as a user is discarded and the
    /// session starts unauthenticated. Store read failures propagate.
    pub async fn restore(api: Arc<dyn SpotApi>, store: Arc<dyn CredentialStore>) -> Result<Self> {
        let initial = match store.load().await? {
            None => None,
            Some(raw) => match parse_stored(&raw) {
                Some(user) => {
                    info!(user_id = %user.id, "Restored session");
                    Some(user)
                }
                None => {
                    warn!("Discarding unreadable stored user");
                    store.clear().await?;
                    None
                }
            },
        };

        Ok(Self {
            api,
            store,
            current: UserWatch::new(initial),
            issued: AtomicU64::new(0),
            writer: Mutex::new(0),
        })
    }

    /// Authenticate and make the returned user current
    pub async fn login(&self, credentials: &Credentials) -> Result<User> {
        let mut applied = self.writer.lock().await;

        let record = self.api.authenticate(credentials).await?;
        let user: User = decode(record)?;

        self.persist(&user).await?;
        *applied = self.issued.load(Ordering::SeqCst);
        self.current.publish(Some(user.clone()));
        info!(user_id = %user.id, "Logged in");
        Ok(user)
    }

    /// Create an account and make it current
    pub async fn register(&self, new_user: &NewUser) -> Result<User> {
        let mut applied = self.writer.lock().await;

        let record = self.api.create_user(new_user).await?;
        let user: User = decode(record)?;

        self.persist(&user).await?;
        *applied = self.issued.load(Ordering::SeqCst);
        self.current.publish(Some(user.clone()));
        info!(user_id = %user.id, "Registered");
        Ok(user)
    }

    /// Forget the current user, in memory and on disk
    pub async fn logout(&self) -> Result<()> {
        let mut applied = self.writer.lock().await;

        self.store.clear().await?;
        *applied = self.issued.load(Ordering::SeqCst);
        if let Some(previous) = self.current.publish(None) {
            info!(user_id = %previous.id, "Logged out");
        }
        Ok(())
    }

    /// Re-read the current user's record (scores change after writes)
    pub async fn refresh(&self) -> Option<User> {
        let user_id = self.user_id();
        self.refresh_user(user_id.as_deref()).await
    }

    /// Re-read `user_id` from the backend and publish it
    ///
    /// Best effort: no user id means no request; a failed fetch is logged
    /// and the previous value stays in effect. The result is applied only if
    /// `user_id` is still the current user when it arrives and no newer
    /// refresh or session change has been applied meanwhile, so a refresh
    /// racing a logout cannot bring the old user back and a slow refresh
    /// cannot roll a score back. Returns the user only when it was applied.
    pub async fn refresh_user(&self, user_id: Option<&str>) -> Option<User> {
        let Some(user_id) = user_id else {
            debug!("No current user, skipping refresh");
            return None;
        };
        let ticket = self.issued.fetch_add(1, Ordering::SeqCst) + 1;

        let user: User = match self.api.get_user(user_id).await.and_then(decode) {
            Ok(user) => user,
            Err(e) => {
                warn!(user_id = %user_id, error = %e, "User refresh failed, keeping previous value");
                return None;
            }
        };

        let mut applied = self.writer.lock().await;

        if ticket <= *applied || self.current.current_id().as_deref() != Some(user_id) {
            debug!(user_id = %user_id, ticket, "Stale refresh, discarding result");
            return None;
        }
        *applied = ticket;

        if let Err(e) = self.persist(&user).await {
            warn!(user_id = %user_id, error = %e, "Failed to persist refreshed user");
        }
        self.current.publish(Some(user.clone()));
        debug!(
            user_id = %user.id,
            total_score = user.total_score,
            "Refreshed current user"
        );
        Some(user)
    }

    pub fn current_user(&self) -> Option<User> {
        self.current.current()
    }

    pub fn user_id(&self) -> Option<String> {
        self.current.current_id()
    }

    pub fn is_authenticated(&self) -> bool {
        self.current.current_id().is_some()
    }

    /// Current value now, plus every later change
    pub fn subscribe(&self) -> UserReceiver {
        self.current.subscribe()
    }

    async fn persist(&self, user: &User) -> Result<()> {
        let raw = serde_json::to_string(user)?;
        self.store.save(&raw).await
    }
}

/// Parse a stored user, accepting either identifier spelling
fn parse_stored(raw: &str) -> Option<User> {
    let value: Value = serde_json::from_str(raw).ok()?;
    decode(value).ok()
}
