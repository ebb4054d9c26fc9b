//! Score-affecting writes
//!
//! Every action checks its preconditions before touching the network, then
//! performs the write and refreshes the current user so that displayed
//! scores follow the backend's award. The refresh is best effort and may
//! land before the backend has applied the new score.
//!
//! Once the backend accepts a write the action succeeds. A response body
//! that cannot be decoded is logged and surfaces as `Ok(None)`.

use serde::de::DeserializeOwned;
use spot_common::identity::decode;
use spot_common::models::{
    NewPoi, NewRating, Photo, Poi, PoiUpdate, Rating, RatingScore, TargetKind,
};
use spot_common::{Error, Result};
use std::sync::Arc;
use tracing::{info, warn};

use crate::api::{ApiRecord, ImageUpload, SpotApi};
use crate::session::Session;

pub struct Actions {
    api: Arc<dyn SpotApi>,
    session: Arc<Session>,
}

impl Actions {
    pub fn new(api: Arc<dyn SpotApi>, session: Arc<Session>) -> Self {
        Self { api, session }
    }

    fn require_user(&self) -> Result<String> {
        self.session.user_id().ok_or(Error::NotAuthenticated)
    }

    /// Create a POI with its initial image
    pub async fn create_poi(
        &self,
        poi: &NewPoi,
        image: Option<&ImageUpload>,
    ) -> Result<Option<Poi>> {
        let image = require_image(image)?;
        poi.validate()?;
        let author_id = self.require_user()?;

        let record = self.api.create_poi(&author_id, poi, image).await?;
        let created: Option<Poi> = decode_written(record, "create POI");
        info!(poi_id = ?created.as_ref().map(|p| &p.id), name = %poi.name, "Created POI");

        self.session.refresh().await;
        Ok(created)
    }

    /// Apply a partial update to a POI
    pub async fn update_poi(&self, poi_id: &str, update: &PoiUpdate) -> Result<Option<Poi>> {
        update.validate()?;
        self.require_user()?;

        let record = self.api.update_poi(poi_id, update).await?;
        let updated: Option<Poi> = decode_written(record, "update POI");
        info!(poi_id = %poi_id, "Updated POI");

        self.session.refresh().await;
        Ok(updated)
    }

    pub async fn delete_poi(&self, poi_id: &str) -> Result<()> {
        self.require_user()?;

        self.api.delete_poi(poi_id).await?;
        info!(poi_id = %poi_id, "Deleted POI");

        self.session.refresh().await;
        Ok(())
    }

    /// Attach a photo to a POI; a blank description is not sent
    pub async fn upload_photo(
        &self,
        poi_id: &str,
        image: Option<&ImageUpload>,
        description: Option<&str>,
    ) -> Result<Option<Photo>> {
        let image = require_image(image)?;
        let author_id = self.require_user()?;
        let description = description.map(str::trim).filter(|d| !d.is_empty());

        let record = self
            .api
            .create_photo(poi_id, &author_id, image, description)
            .await?;
        let photo: Option<Photo> = decode_written(record, "upload photo");
        info!(photo_id = ?photo.as_ref().map(|p| &p.id), poi_id = %poi_id, "Uploaded photo");

        self.session.refresh().await;
        Ok(photo)
    }

    pub async fn delete_photo(&self, photo_id: &str) -> Result<()> {
        self.require_user()?;

        self.api.delete_photo(photo_id).await?;
        info!(photo_id = %photo_id, "Deleted photo");

        self.session.refresh().await;
        Ok(())
    }

    /// Rate a POI or photo; `score` must be within 1..=10
    pub async fn rate(
        &self,
        target_type: TargetKind,
        target_id: &str,
        score: i64,
    ) -> Result<Option<Rating>> {
        let score = RatingScore::try_from(score)?;
        let user_id = self.require_user()?;

        let rating = NewRating {
            user_id,
            score,
            target_type,
            target_id: target_id.to_string(),
        };
        let record = self.api.create_rating(&rating).await?;
        let created: Option<Rating> = decode_written(record, "rate");
        info!(
            rating_id = ?created.as_ref().map(|r| &r.id),
            target_type = %target_type,
            target_id = %target_id,
            score = score.value(),
            "Rated"
        );

        self.session.refresh().await;
        Ok(created)
    }

    pub async fn delete_rating(&self, rating_id: &str) -> Result<()> {
        self.require_user()?;

        self.api.delete_rating(rating_id).await?;
        info!(rating_id = %rating_id, "Deleted rating");

        self.session.refresh().await;
        Ok(())
    }
}

/// Decode the record a successful write returned
fn decode_written<T: DeserializeOwned>(record: ApiRecord, action: &str) -> Option<T> {
    match decode(record) {
        Ok(value) => Some(value),
        Err(e) => {
            warn!(action = %action, error = %e, "Write accepted but response unreadable");
            None
        }
    }
}

fn require_image(image: Option<&ImageUpload>) -> Result<&ImageUpload> {
    match image {
        Some(image) if !image.is_empty() => Ok(image),
        _ => Err(Error::MissingImage),
    }
}
