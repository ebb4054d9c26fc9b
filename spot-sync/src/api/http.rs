//! reqwest implementation of [`SpotApi`]
//!
//! Non-success statuses become `Error::Api` carrying the backend's `detail`
//! message; transport failures become `Error::Network`; bodies that are not
//! JSON become `Error::Parse`. Identifiers are percent-encoded as single
//! path segments.

use super::{ApiRecord, ImageUpload, SpotApi};
use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use reqwest::{Method, RequestBuilder, Response, Url};
use serde::de::DeserializeOwned;
use spot_common::api::{ApiKey, ErrorBody, API_KEY_HEADER};
use spot_common::models::{Credentials, NewPoi, NewRating, NewUser, PoiUpdate};
use spot_common::{Error, Result};
use std::time::Duration;
use tracing::debug;

const USER_AGENT: &str = concat!("urbanspot-sync/", env!("CARGO_PKG_VERSION"));

/// HTTP client for the UrbanSpot backend
pub struct HttpSpotApi {
    http_client: reqwest::Client,
    base_url: Url,
    api_key: ApiKey,
}

impl HttpSpotApi {
    pub fn new(base_url: &str, api_key: ApiKey, timeout: Duration) -> Result<Self> {
        let trimmed = base_url.trim().trim_end_matches('/');
        if trimmed.is_empty() {
            return Err(Error::Config("API base URL must not be empty".to_string()));
        }
        let base_url = Url::parse(trimmed)
            .map_err(|e| Error::Config(format!("Invalid API base URL '{}': {}", trimmed, e)))?;
        if base_url.cannot_be_a_base() {
            return Err(Error::Config(format!(
                "API base URL '{}' cannot take a path",
                trimmed
            )));
        }

        let http_client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(timeout)
            .build()
            .map_err(|e| Error::Network(e.to_string()))?;

        Ok(Self {
            http_client,
            base_url,
            api_key,
        })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Endpoint URL from path segments; a trailing `""` keeps the trailing slash
    fn endpoint(&self, segments: &[&str]) -> Url {
        let mut url = self.base_url.clone();
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments);
        }
        url
    }

    /// Start a request with the API key attached
    fn request(&self, method: Method, segments: &[&str]) -> RequestBuilder {
        let url = self.endpoint(segments);
        debug!(method = %method, url = %url, "Backend request");
        self.http_client
            .request(method, url)
            .header(API_KEY_HEADER, self.api_key.expose())
    }

    async fn send(&self, request: RequestBuilder) -> Result<Response> {
        let response = request
            .send()
            .await
            .map_err(|e| Error::Network(e.to_string()))?;
        check(response).await
    }

    async fn send_json<T: DeserializeOwned>(&self, request: RequestBuilder) -> Result<T> {
        self.send(request)
            .await?
            .json()
            .await
            .map_err(|e| Error::Parse(e.to_string()))
    }

    async fn send_empty(&self, request: RequestBuilder) -> Result<()> {
        self.send(request).await.map(|_| ())
    }
}

/// Map a non-success response to `Error::Api`
async fn check(response: Response) -> Result<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    let message = ErrorBody::message_from(&body).unwrap_or_else(|| {
        status
            .canonical_reason()
            .unwrap_or("request failed")
            .to_string()
    });

    Err(Error::Api {
        status: status.as_u16(),
        message,
    })
}

fn image_part(image: &ImageUpload) -> Result<Part> {
    Part::bytes(image.bytes.clone())
        .file_name(image.file_name.clone())
        .mime_str(&image.content_type)
        .map_err(|e| Error::InvalidInput(format!("bad image content type: {}", e)))
}

#[async_trait]
impl SpotApi for HttpSpotApi {
    async fn list_pois(
        &self,
        skip: u32,
        limit: u32,
        tags: Option<&[String]>,
    ) -> Result<Vec<ApiRecord>> {
        let mut query = vec![("skip", skip.to_string()), ("limit", limit.to_string())];
        if let Some(tags) = tags.filter(|t| !t.is_empty()) {
            query.push(("tags", tags.join(",")));
        }

        self.send_json(self.request(Method::GET, &["pois", ""]).query(&query))
            .await
    }

    async fn get_poi(&self, poi_id: &str) -> Result<ApiRecord> {
        self.send_json(self.request(Method::GET, &["pois", poi_id]))
            .await
    }

    async fn create_poi(
        &self,
        author_id: &str,
        poi: &NewPoi,
        image: &ImageUpload,
    ) -> Result<ApiRecord> {
        let mut query = vec![
            ("name", poi.name.clone()),
            ("description", poi.description.clone()),
            ("latitude", poi.latitude.to_string()),
            ("longitude", poi.longitude.to_string()),
            ("author_id", author_id.to_string()),
        ];
        if !poi.tags.is_empty() {
            query.push(("tags", poi.tags.join(",")));
        }

        let form = Form::new().part("image", image_part(image)?);
        self.send_json(
            self.request(Method::POST, &["pois", ""])
                .query(&query)
                .multipart(form),
        )
        .await
    }

    async fn update_poi(&self, poi_id: &str, update: &PoiUpdate) -> Result<ApiRecord> {
        self.send_json(
            self.request(Method::PUT, &["pois", poi_id])
                .json(update),
        )
        .await
    }

    async fn delete_poi(&self, poi_id: &str) -> Result<()> {
        self.send_empty(self.request(Method::DELETE, &["pois", poi_id]))
            .await
    }

    async fn list_photos_by_poi(&self, poi_id: &str) -> Result<Vec<ApiRecord>> {
        self.send_json(self.request(Method::GET, &["photos", "poi", poi_id]))
            .await
    }

    async fn get_photo(&self, photo_id: &str) -> Result<ApiRecord> {
        self.send_json(self.request(Method::GET, &["photos", photo_id]))
            .await
    }

    async fn create_photo(
        &self,
        poi_id: &str,
        author_id: &str,
        image: &ImageUpload,
        description: Option<&str>,
    ) -> Result<ApiRecord> {
        let mut query = vec![("poi_id", poi_id), ("author_id", author_id)];
        if let Some(description) = description {
            query.push(("description", description));
        }

        let form = Form::new().part("image", image_part(image)?);
        self.send_json(
            self.request(Method::POST, &["photos", ""])
                .query(&query)
                .multipart(form),
        )
        .await
    }

    async fn delete_photo(&self, photo_id: &str) -> Result<()> {
        self.send_empty(self.request(Method::DELETE, &["photos", photo_id]))
            .await
    }

    async fn create_rating(&self, rating: &NewRating) -> Result<ApiRecord> {
        self.send_json(self.request(Method::POST, &["ratings", ""]).json(rating))
            .await
    }

    async fn get_rating(&self, rating_id: &str) -> Result<ApiRecord> {
        self.send_json(self.request(Method::GET, &["ratings", rating_id]))
            .await
    }

    async fn delete_rating(&self, rating_id: &str) -> Result<()> {
        self.send_empty(self.request(Method::DELETE, &["ratings", rating_id]))
            .await
    }

    async fn get_user(&self, user_id: &str) -> Result<ApiRecord> {
        self.send_json(self.request(Method::GET, &["users", user_id]))
            .await
    }

    async fn get_user_profile(&self, user_id: &str) -> Result<ApiRecord> {
        self.send_json(self.request(Method::GET, &["users", user_id, "profile"]))
            .await
    }

    async fn get_global_ranking(&self, limit: u32) -> Result<Vec<ApiRecord>> {
        self.send_json(
            self.request(Method::GET, &["users", "ranking", "global"])
                .query(&[("limit", limit)]),
        )
        .await
    }

    async fn authenticate(&self, credentials: &Credentials) -> Result<ApiRecord> {
        self.send_json(
            self.request(Method::POST, &["users", "authenticate"])
                .json(credentials),
        )
        .await
    }

    async fn create_user(&self, user: &NewUser) -> Result<ApiRecord> {
        self.send_json(self.request(Method::POST, &["users", ""]).json(user))
            .await
    }
}
