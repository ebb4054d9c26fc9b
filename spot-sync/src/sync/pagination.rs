//! Exhaustive paginated fetch
//!
//! The list endpoint returns at most `limit` records from offset `skip` and
//! reports no total count. The only end-of-collection signal is a page
//! shorter than requested.

use serde::de::DeserializeOwned;
use spot_common::identity::decode_all;
use spot_common::Result;
use std::future::Future;
use tracing::{debug, warn};

use crate::api::ApiRecord;

/// Result of walking a paginated collection
#[derive(Debug, Clone, PartialEq)]
pub struct FetchedCollection<T> {
    /// Decoded records in ascending offset order
    pub items: Vec<T>,
    /// Page requests issued, including a failed final one
    pub pages_fetched: u32,
    /// False when a page request failed and the walk stopped early
    pub complete: bool,
}

impl<T> FetchedCollection<T> {
    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

/// Fetch every page and decode the records
///
/// Pages are requested strictly one after another from offset 0, advancing
/// by `page_size` each time. The walk stops when a page is shorter than
/// `page_size` (judged on the raw page, before undecodable records are
/// dropped) or when a request fails. A failure is logged and the records
/// gathered so far are returned with `complete` set to false.
///
/// A `page_size` of 0 is treated as 1.
///
/// # Examples
///
/// ```
/// use spot_sync::sync::fetch_all_pages;
/// use serde_json::{json, Value};
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() {
/// let fetched = fetch_all_pages::<Value, _, _>(2, |skip, _limit| async move {
///     let page = match skip {
///         0 => vec![json!({"id": "a"}), json!({"id": "b"})],
///         _ => vec![json!({"_id": "c"})],
///     };
///     Ok(page)
/// })
/// .await;
///
/// assert_eq!(fetched.items.len(), 3);
/// assert_eq!(fetched.pages_fetched, 2);
/// assert!(fetched.complete);
/// # }
/// ```
pub async fn fetch_all_pages<T, F, Fut>(page_size: u32, mut fetch_page: F) -> FetchedCollection<T>
where
    T: DeserializeOwned,
    F: FnMut(u32, u32) -> Fut,
    Fut: Future<Output = Result<Vec<ApiRecord>>>,
{
    let page_size = page_size.max(1);
    let mut items = Vec::new();
    let mut skip: u32 = 0;
    let mut pages_fetched: u32 = 0;

    loop {
        pages_fetched += 1;

        let page = match fetch_page(skip, page_size).await {
            Ok(page) => page,
            Err(e) => {
                warn!(
                    skip,
                    page_size,
                    collected = items.len(),
                    error = %e,
                    "Page request failed, returning partial collection"
                );
                return FetchedCollection {
                    items,
                    pages_fetched,
                    complete: false,
                };
            }
        };

        let raw_len = page.len();
        debug!(skip, page_size, received = raw_len, "Fetched page");

        items.extend(decode_all::<T>(page));

        if raw_len < page_size as usize {
            break;
        }

        skip = match skip.checked_add(page_size) {
            Some(next) => next,
            None => {
                warn!(skip, page_size, "Offset overflow, stopping pagination");
                return FetchedCollection {
                    items,
                    pages_fetched,
                    complete: false,
                };
            }
        };
    }

    FetchedCollection {
        items,
        pages_fetched,
        complete: true,
    }
}

/// Fetch every page, keeping only the records
///
/// Same walk as [`fetch_all_pages`]; callers that need to know whether the
/// result is complete should use that instead.
pub async fn fetch_all<T, F, Fut>(page_size: u32, fetch_page: F) -> Vec<T>
where
    T: DeserializeOwned,
    F: FnMut(u32, u32) -> Fut,
    Fut: Future<Output = Result<Vec<ApiRecord>>>,
{
    fetch_all_pages(page_size, fetch_page).await.items
}
