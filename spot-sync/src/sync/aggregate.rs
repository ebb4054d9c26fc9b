//! Cross-entity aggregation
//!
//! Gathers a user's children (photos) across a complete parent set (POIs) by
//! issuing one child-list fetch per parent. Fetches run concurrently and
//! settle in any order; the merge waits for every one of them. A failed
//! fetch counts as zero children for its parent and never fails the whole
//! aggregation.

use futures::stream::{self, StreamExt};
use serde::de::DeserializeOwned;
use spot_common::identity::decode_all;
use spot_common::models::{Authored, Entity};
use spot_common::Result;
use std::future::Future;
use tracing::{debug, warn};

use crate::api::ApiRecord;

/// Fetch children of every parent and keep those owned by `owner_id`
///
/// At most `concurrency` fetches are in flight at once (0 is treated as 1).
/// No ordering is guaranteed across parents. An empty parent set returns
/// immediately without calling `fetch_children`.
pub async fn aggregate_children<P, C, F, Fut>(
    parents: &[P],
    owner_id: &str,
    concurrency: usize,
    fetch_children: F,
) -> Vec<C>
where
    P: Entity,
    C: Authored + DeserializeOwned,
    F: Fn(String) -> Fut,
    Fut: Future<Output = Result<Vec<ApiRecord>>>,
{
    if parents.is_empty() {
        return Vec::new();
    }

    let fetch_children = &fetch_children;
    let settled: Vec<Vec<C>> = stream::iter(parents.iter().map(|parent| {
        let parent_id = parent.id().to_string();
        async move {
            match fetch_children(parent_id.clone()).await {
                Ok(records) => {
                    let children: Vec<C> = decode_all(records);
                    debug!(
                        parent_id = %parent_id,
                        fetched = children.len(),
                        "Child fetch settled"
                    );
                    children
                        .into_iter()
                        .filter(|child| child.author_id() == owner_id)
                        .collect()
                }
                Err(e) => {
                    warn!(
                        parent_id = %parent_id,
                        error = %e,
                        "Child fetch failed, treating parent as having no children"
                    );
                    Vec::new()
                }
            }
        }
    }))
    .buffer_unordered(concurrency.max(1))
    .collect()
    .await;

    debug!(
        parents = parents.len(),
        settled = settled.len(),
        "Aggregation complete"
    );

    settled.into_iter().flatten().collect()
}
