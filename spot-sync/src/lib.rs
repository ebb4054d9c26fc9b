//! spot-sync library - UrbanSpot client synchronization layer
//!
//! Reconciles a backend that only returns bounded pages into complete views
//! (all POIs, a user's photos across all POIs, a user's live score after a
//! write).

use spot_common::config::TomlConfig;
use spot_common::Result;
use std::sync::Arc;

pub mod actions;
pub mod api;
pub mod catalog;
pub mod db;
pub mod session;
pub mod sync;

use actions::Actions;
use api::SpotApi;
use catalog::Catalog;
use db::CredentialStore;
use session::Session;

/// Tuning for collection walks and fan-out
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SyncOptions {
    /// Records requested per list call
    pub page_size: u32,
    /// Child fetches in flight at once
    pub fan_out_limit: usize,
}

impl Default for SyncOptions {
    fn default() -> Self {
        Self::from(&TomlConfig::default())
    }
}

impl From<&TomlConfig> for SyncOptions {
    fn from(config: &TomlConfig) -> Self {
        Self {
            page_size: config.page_size,
            fan_out_limit: config.fan_out_limit,
        }
    }
}

/// Session, read views and write actions over one backend
pub struct SpotClient {
    pub session: Arc<Session>,
    pub catalog: Catalog,
    pub actions: Actions,
}

impl SpotClient {
    /// Restore the session from `store` and wire up the views
    pub async fn new(
        api: Arc<dyn SpotApi>,
        store: Arc<dyn CredentialStore>,
        options: SyncOptions,
    ) -> Result<Self> {
        let session = Arc::new(Session::restore(Arc::clone(&api), store).await?);
        let catalog = Catalog::new(Arc::clone(&api), options);
        let actions = Actions::new(api, Arc::clone(&session));

        Ok(Self {
            session,
            catalog,
            actions,
        })
    }
}
