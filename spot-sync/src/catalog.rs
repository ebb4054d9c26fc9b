//! Read-side views assembled from the backend
//!
//! Each view re-derives its working set from scratch; nothing is cached
//! between calls. Collection views tolerate partial failure and report
//! whether the underlying walk was complete.

use spot_common::identity::{decode, decode_all};
use spot_common::models::{Photo, PhotoDetail, Poi, PoiDetail, Rating, UserProfile};
use spot_common::Result;
use std::sync::Arc;
use tracing::{debug, warn};

use crate::api::SpotApi;
use crate::sync::{aggregate_children, fetch_all_pages, FetchedCollection};
use crate::SyncOptions;

/// POI detail view: the POI and every photo attached to it
#[derive(Debug, Clone)]
pub struct PoiPage {
    pub poi: PoiDetail,
    pub photos: Vec<Photo>,
}

/// Profile view: profile plus the user's contributions
#[derive(Debug, Clone)]
pub struct ProfilePage {
    /// `None` when the profile lookup failed
    pub profile: Option<UserProfile>,
    pub pois: Vec<Poi>,
    pub photos: Vec<Photo>,
    /// False when the POI walk stopped early, so both lists may be short
    pub complete: bool,
}

/// Ranking entry with its 1-based position
#[derive(Debug, Clone, PartialEq)]
pub struct RankedProfile {
    pub position: usize,
    pub profile: UserProfile,
}

pub struct Catalog {
    api: Arc<dyn SpotApi>,
    options: SyncOptions,
}

impl Catalog {
    pub fn new(api: Arc<dyn SpotApi>, options: SyncOptions) -> Self {
        Self { api, options }
    }

    /// Every POI, optionally restricted to those carrying `tags`
    pub async fn all_pois(&self, tags: Option<&[String]>) -> FetchedCollection<Poi> {
        let api = self.api.as_ref();
        let fetched = fetch_all_pages(self.options.page_size, move |skip, limit| async move {
            api.list_pois(skip, limit, tags).await
        })
        .await;

        debug!(
            count = fetched.len(),
            pages = fetched.pages_fetched,
            complete = fetched.complete,
            "Fetched POI collection"
        );
        fetched
    }

    /// POIs owned by `user_id`
    pub async fn user_pois(&self, user_id: &str) -> Vec<Poi> {
        let all = self.all_pois(None).await;
        owned_by(all.items, user_id)
    }

    /// Photos owned by `user_id` across every POI
    pub async fn user_photos(&self, user_id: &str) -> Vec<Photo> {
        let all = self.all_pois(None).await;
        self.photos_owned_by(&all.items, user_id).await
    }

    /// POI detail and its photos, fetched concurrently
    ///
    /// A failed POI lookup is an error; a failed photo list yields no photos.
    pub async fn poi_page(&self, poi_id: &str) -> Result<PoiPage> {
        let (poi, photos) = tokio::join!(
            self.api.get_poi(poi_id),
            self.api.list_photos_by_poi(poi_id)
        );

        let poi: PoiDetail = decode(poi?)?;
        let photos = match photos {
            Ok(records) => decode_all(records),
            Err(e) => {
                warn!(poi_id = %poi_id, error = %e, "Photo list failed, showing none");
                Vec::new()
            }
        };

        Ok(PoiPage { poi, photos })
    }

    /// Profile, POIs and photos for `user_id`
    ///
    /// The POI collection is fetched once and feeds both the POI list and
    /// the photo aggregation. A failed profile lookup leaves `profile` empty
    /// while the collections are still filled in.
    pub async fn profile_page(&self, user_id: &str) -> ProfilePage {
        let (profile, all) = tokio::join!(self.profile(user_id), self.all_pois(None));

        let profile = match profile {
            Ok(profile) => Some(profile),
            Err(e) => {
                warn!(user_id = %user_id, error = %e, "Profile lookup failed");
                None
            }
        };

        let photos = self.photos_owned_by(&all.items, user_id).await;
        let complete = all.complete;
        let pois = owned_by(all.items, user_id);

        ProfilePage {
            profile,
            pois,
            photos,
            complete,
        }
    }

    /// Global ranking in backend order with positions attached
    ///
    /// Positions follow the backend's order even when an entry is dropped
    /// for missing data, so a gap marks the dropped entry.
    pub async fn ranking(&self, limit: u32) -> Result<Vec<RankedProfile>> {
        let records = self.api.get_global_ranking(limit).await?;

        let ranked = records
            .into_iter()
            .enumerate()
            .filter_map(|(index, record)| match decode::<UserProfile>(record) {
                Ok(profile) => Some(RankedProfile {
                    position: index + 1,
                    profile,
                }),
                Err(e) => {
                    warn!(position = index + 1, error = %e, "Dropping ranking entry");
                    None
                }
            })
            .collect();

        Ok(ranked)
    }

    pub async fn profile(&self, user_id: &str) -> Result<UserProfile> {
        decode(self.api.get_user_profile(user_id).await?)
    }

    pub async fn photo(&self, photo_id: &str) -> Result<PhotoDetail> {
        decode(self.api.get_photo(photo_id).await?)
    }

    pub async fn rating(&self, rating_id: &str) -> Result<Rating> {
        decode(self.api.get_rating(rating_id).await?)
    }

    async fn photos_owned_by(&self, pois: &[Poi], user_id: &str) -> Vec<Photo> {
        let api = self.api.as_ref();
        aggregate_children(pois, user_id, self.options.fan_out_limit, move |poi_id| async move {
            api.list_photos_by_poi(&poi_id).await
        })
        .await
    }
}

fn owned_by(pois: Vec<Poi>, user_id: &str) -> Vec<Poi> {
    pois.into_iter()
        .filter(|poi| poi.author_id == user_id)
        .collect()
}
