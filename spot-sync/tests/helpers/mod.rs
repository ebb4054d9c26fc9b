//! Shared test helpers: a scripted in-memory backend
#![allow(dead_code)]

use async_trait::async_trait;
use serde_json::{json, Value};
use spot_common::models::{Credentials, NewPoi, NewRating, NewUser, PoiUpdate};
use spot_common::{Error, Result};
use spot_sync::api::{ApiRecord, ImageUpload, SpotApi};
use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};
use tokio::sync::Notify;

/// `SpotApi` double that replays scripted responses and records every call
///
/// Scripted entries of `None` fail with a network error.
#[derive(Default)]
pub struct MockApi {
    calls: Mutex<Vec<String>>,
    poi_pages: Mutex<VecDeque<Option<Vec<Value>>>>,
    photos: Mutex<HashMap<String, Option<Vec<Value>>>>,
    users: Mutex<VecDeque<Option<Value>>>,
    user_gate: Mutex<Option<Arc<Notify>>>,
    profile: Mutex<Option<Value>>,
    poi_detail: Mutex<Option<Value>>,
    ranking: Mutex<Vec<Value>>,
    auth_user: Mutex<Option<Value>>,
    fail_writes: Mutex<bool>,
    garbled_writes: Mutex<bool>,
}

fn network_error() -> Error {
    Error::Network("scripted failure".to_string())
}

impl MockApi {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn shared(self) -> Arc<Self> {
        Arc::new(self)
    }

    // ---- scripting ----

    pub fn push_poi_page(&self, page: Vec<Value>) -> &Self {
        self.poi_pages.lock().unwrap().push_back(Some(page));
        self
    }

    pub fn push_poi_failure(&self) -> &Self {
        self.poi_pages.lock().unwrap().push_back(None);
        self
    }

    pub fn set_photos(&self, poi_id: &str, photos: Vec<Value>) -> &Self {
        self.photos
            .lock()
            .unwrap()
            .insert(poi_id.to_string(), Some(photos));
        self
    }

    pub fn fail_photos(&self, poi_id: &str) -> &Self {
        self.photos.lock().unwrap().insert(poi_id.to_string(), None);
        self
    }

    /// Queue a `get_user` response; the last one repeats
    pub fn push_user(&self, user: Option<Value>) -> &Self {
        self.users.lock().unwrap().push_back(user);
        self
    }

    /// Hold the next `get_user` call until the returned handle is notified
    pub fn gate_user_fetch(&self) -> Arc<Notify> {
        let gate = Arc::new(Notify::new());
        *self.user_gate.lock().unwrap() = Some(Arc::clone(&gate));
        gate
    }

    pub fn set_profile(&self, profile: Option<Value>) -> &Self {
        *self.profile.lock().unwrap() = profile;
        self
    }

    pub fn set_poi_detail(&self, poi: Option<Value>) -> &Self {
        *self.poi_detail.lock().unwrap() = poi;
        self
    }

    pub fn set_ranking(&self, ranking: Vec<Value>) -> &Self {
        *self.ranking.lock().unwrap() = ranking;
        self
    }

    pub fn set_auth_user(&self, user: Option<Value>) -> &Self {
        *self.auth_user.lock().unwrap() = user;
        self
    }

    pub fn fail_writes(&self) -> &Self {
        *self.fail_writes.lock().unwrap() = true;
        self
    }

    /// Accept writes but answer with a body that is not a record
    pub fn garble_writes(&self) -> &Self {
        *self.garbled_writes.lock().unwrap() = true;
        self
    }

    // ---- inspection ----

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    pub fn count(&self, method: &str) -> usize {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .filter(|c| c.split(' ').next() == Some(method))
            .count()
    }

    pub fn total_calls(&self) -> usize {
        self.calls.lock().unwrap().len()
    }

    fn record(&self, call: String) {
        self.calls.lock().unwrap().push(call);
    }

    fn write_result(&self, record: Value) -> Result<ApiRecord> {
        if *self.fail_writes.lock().unwrap() {
            return Err(Error::Api {
                status: 500,
                message: "scripted write failure".to_string(),
            });
        }
        if *self.garbled_writes.lock().unwrap() && !record.is_null() {
            return Ok(json!({"detail": "accepted"}));
        }
        Ok(record)
    }
}

#[async_trait]
impl SpotApi for MockApi {
    async fn list_pois(
        &self,
        skip: u32,
        limit: u32,
        tags: Option<&[String]>,
    ) -> Result<Vec<ApiRecord>> {
        let tags = tags.map(|t| t.join(",")).unwrap_or_default();
        self.record(format!("list_pois {} {} {}", skip, limit, tags));
        match self.poi_pages.lock().unwrap().pop_front() {
            Some(Some(page)) => Ok(page),
            Some(None) => Err(network_error()),
            None => Ok(Vec::new()),
        }
    }

    async fn get_poi(&self, poi_id: &str) -> Result<ApiRecord> {
        self.record(format!("get_poi {}", poi_id));
        self.poi_detail
            .lock()
            .unwrap()
            .clone()
            .ok_or(Error::Api {
                status: 404,
                message: "POI not found".to_string(),
            })
    }

    async fn create_poi(
        &self,
        author_id: &str,
        poi: &NewPoi,
        image: &ImageUpload,
    ) -> Result<ApiRecord> {
        self.record(format!("create_poi {} {}", author_id, image.file_name));
        self.write_result(poi_record("new-poi", author_id, &poi.name))
    }

    async fn update_poi(&self, poi_id: &str, update: &PoiUpdate) -> Result<ApiRecord> {
        self.record(format!("update_poi {}", poi_id));
        let name = update.name.clone().unwrap_or_else(|| "unchanged".to_string());
        self.write_result(poi_record(poi_id, "u1", &name))
    }

    async fn delete_poi(&self, poi_id: &str) -> Result<()> {
        self.record(format!("delete_poi {}", poi_id));
        self.write_result(Value::Null).map(|_| ())
    }

    async fn list_photos_by_poi(&self, poi_id: &str) -> Result<Vec<ApiRecord>> {
        self.record(format!("list_photos_by_poi {}", poi_id));
        match self.photos.lock().unwrap().get(poi_id) {
            Some(Some(photos)) => Ok(photos.clone()),
            Some(None) => Err(network_error()),
            None => Ok(Vec::new()),
        }
    }

    async fn get_photo(&self, photo_id: &str) -> Result<ApiRecord> {
        self.record(format!("get_photo {}", photo_id));
        let mut record = photo_record(photo_id, "p1", "u1");
        record["poi_name"] = json!("Plaza Mayor");
        Ok(record)
    }

    async fn create_photo(
        &self,
        poi_id: &str,
        author_id: &str,
        _image: &ImageUpload,
        description: Option<&str>,
    ) -> Result<ApiRecord> {
        self.record(format!(
            "create_photo {} {} {}",
            poi_id,
            author_id,
            description.unwrap_or("-")
        ));
        let mut record = photo_record("new-photo", poi_id, author_id);
        record["description"] = json!(description);
        self.write_result(record)
    }

    async fn delete_photo(&self, photo_id: &str) -> Result<()> {
        self.record(format!("delete_photo {}", photo_id));
        self.write_result(Value::Null).map(|_| ())
    }

    async fn create_rating(&self, rating: &NewRating) -> Result<ApiRecord> {
        self.record(format!(
            "create_rating {} {} {}",
            rating.target_type,
            rating.target_id,
            rating.score.value()
        ));
        self.write_result(json!({
            "_id": "new-rating",
            "user_id": rating.user_id,
            "score": f64::from(rating.score.value()),
            "target_type": rating.target_type,
            "target_id": rating.target_id,
            "created_at": "2025-12-12T08:06:12.920925"
        }))
    }

    async fn get_rating(&self, rating_id: &str) -> Result<ApiRecord> {
        self.record(format!("get_rating {}", rating_id));
        Ok(json!({
            "_id": rating_id,
            "user_id": "u1",
            "score": 9,
            "target_type": "poi",
            "target_id": "p1"
        }))
    }

    async fn delete_rating(&self, rating_id: &str) -> Result<()> {
        self.record(format!("delete_rating {}", rating_id));
        self.write_result(Value::Null).map(|_| ())
    }

    async fn get_user(&self, user_id: &str) -> Result<ApiRecord> {
        self.record(format!("get_user {}", user_id));

        // Response is chosen on arrival, so a held call answers with older data
        let next = {
            let mut users = self.users.lock().unwrap();
            if users.len() > 1 {
                users.pop_front()
            } else {
                users.front().cloned()
            }
        };

        let gate = self.user_gate.lock().unwrap().take();
        if let Some(gate) = gate {
            gate.notified().await;
        }

        match next {
            Some(Some(user)) => Ok(user),
            _ => Err(network_error()),
        }
    }

    async fn get_user_profile(&self, user_id: &str) -> Result<ApiRecord> {
        self.record(format!("get_user_profile {}", user_id));
        self.profile.lock().unwrap().clone().ok_or_else(network_error)
    }

    async fn get_global_ranking(&self, limit: u32) -> Result<Vec<ApiRecord>> {
        self.record(format!("get_global_ranking {}", limit));
        Ok(self.ranking.lock().unwrap().clone())
    }

    async fn authenticate(&self, credentials: &Credentials) -> Result<ApiRecord> {
        self.record(format!("authenticate {}", credentials.email));
        self.auth_user.lock().unwrap().clone().ok_or(Error::Api {
            status: 401,
            message: "Invalid email or password".to_string(),
        })
    }

    async fn create_user(&self, user: &NewUser) -> Result<ApiRecord> {
        self.record(format!("create_user {}", user.email));
        Ok(json!({
            "_id": "registered",
            "name": user.name,
            "email": user.email,
            "poi_score": 0,
            "photo_score": 0,
            "total_score": 0
        }))
    }
}

// ---- record builders ----

pub fn poi_record(id: &str, author_id: &str, name: &str) -> Value {
    json!({
        "_id": id,
        "name": name,
        "description": "scripted",
        "latitude": 40.4168,
        "longitude": -3.7038,
        "tags": ["cultura"],
        "image_url": format!("/uploads/{}.jpg", id),
        "author_id": author_id,
        "rating_count": 0,
        "average_rating": 0.0,
        "created_at": "2025-12-12T08:06:12.920925",
        "updated_at": "2025-12-12T08:06:12.920925"
    })
}

pub fn photo_record(id: &str, poi_id: &str, author_id: &str) -> Value {
    json!({
        "_id": id,
        "poi_id": poi_id,
        "image_url": format!("/uploads/{}.jpg", id),
        "description": null,
        "author_id": author_id,
        "rating_count": 0,
        "average_rating": 0.0
    })
}

pub fn user_record(id: &str, total_score: u64) -> Value {
    json!({
        "id": id,
        "name": format!("user {}", id),
        "email": format!("{}@example.com", id),
        "poi_score": total_score,
        "photo_score": 0,
        "total_score": total_score
    })
}

pub fn profile_record(id: &str, total_score: u64) -> Value {
    json!({
        "id": id,
        "name": format!("user {}", id),
        "email": format!("{}@example.com", id),
        "poi_score": total_score,
        "photo_score": 0,
        "total_score": total_score,
        "poi_count": 1,
        "photo_count": 0,
        "rating_count": 0
    })
}

/// `n` POIs owned by `author_id`, ids prefixed by `prefix`
pub fn poi_page(prefix: &str, n: usize, author_id: &str) -> Vec<Value> {
    (0..n)
        .map(|i| poi_record(&format!("{}{}", prefix, i), author_id, "scripted"))
        .collect()
}

pub fn png_image() -> ImageUpload {
    let mut bytes = vec![0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A];
    bytes.extend_from_slice(&[0; 16]);
    ImageUpload::new("spot.png", bytes)
}
