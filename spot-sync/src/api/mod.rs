//! Backend API boundary
//!
//! [`SpotApi`] is the seam between the sync layer and the network. Methods
//! return raw JSON records so that identifier normalization and decoding
//! happen in one place (`spot_common::identity`) regardless of transport.

use async_trait::async_trait;
use serde_json::Value;
use spot_common::models::{Credentials, NewPoi, NewRating, NewUser, PoiUpdate};
use spot_common::{Error, Result};
use std::path::Path;

pub mod http;

pub use http::HttpSpotApi;

/// Undecoded backend record
pub type ApiRecord = Value;

/// Image attached to a POI or photo upload
#[derive(Clone, PartialEq, Eq)]
pub struct ImageUpload {
    pub file_name: String,
    pub content_type: String,
    pub bytes: Vec<u8>,
}

impl ImageUpload {
    /// Wrap bytes, sniffing the content type from the data itself
    pub fn new(file_name: impl Into<String>, bytes: Vec<u8>) -> Self {
        let content_type = infer::get(&bytes)
            .map(|kind| kind.mime_type().to_string())
            .unwrap_or_else(|| "application/octet-stream".to_string());

        Self {
            file_name: file_name.into(),
            content_type,
            bytes,
        }
    }

    /// Read an image from disk
    pub async fn from_path(path: &Path) -> Result<Self> {
        let bytes = tokio::fs::read(path).await?;
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .ok_or_else(|| Error::InvalidInput(format!("not a file: {}", path.display())))?;
        Ok(Self::new(file_name, bytes))
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    pub fn is_image(&self) -> bool {
        self.content_type.starts_with("image/")
    }
}

impl std::fmt::Debug for ImageUpload {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ImageUpload")
            .field("file_name", &self.file_name)
            .field("content_type", &self.content_type)
            .field("len", &self.bytes.len())
            .finish()
    }
}

/// Operations consumed from the UrbanSpot backend
///
/// Every call is independent; implementations attach credentials themselves.
#[async_trait]
pub trait SpotApi: Send + Sync {
    /// At most `limit` POIs starting at offset `skip`, optionally tag-filtered
    async fn list_pois(
        &self,
        skip: u32,
        limit: u32,
        tags: Option<&[String]>,
    ) -> Result<Vec<ApiRecord>>;

    async fn get_poi(&self, poi_id: &str) -> Result<ApiRecord>;

    async fn create_poi(
        &self,
        author_id: &str,
        poi: &NewPoi,
        image: &ImageUpload,
    ) -> Result<ApiRecord>;

    async fn update_poi(&self, poi_id: &str, update: &PoiUpdate) -> Result<ApiRecord>;

    async fn delete_poi(&self, poi_id: &str) -> Result<()>;

    /// Every photo of one POI (unpaginated)
    async fn list_photos_by_poi(&self, poi_id: &str) -> Result<Vec<ApiRecord>>;

    async fn get_photo(&self, photo_id: &str) -> Result<ApiRecord>;

    async fn create_photo(
        &self,
        poi_id: &str,
        author_id: &str,
        image: &ImageUpload,
        description: Option<&str>,
    ) -> Result<ApiRecord>;

    async fn delete_photo(&self, photo_id: &str) -> Result<()>;

    async fn create_rating(&self, rating: &NewRating) -> Result<ApiRecord>;

    async fn get_rating(&self, rating_id: &str) -> Result<ApiRecord>;

    async fn delete_rating(&self, rating_id: &str) -> Result<()>;

    async fn get_user(&self, user_id: &str) -> Result<ApiRecord>;

    async fn get_user_profile(&self, user_id: &str) -> Result<ApiRecord>;

    /// Profiles sorted by descending total score
    async fn get_global_ranking(&self, limit: u32) -> Result<Vec<ApiRecord>>;

    async fn authenticate(&self, credentials: &Credentials) -> Result<ApiRecord>;

    async fn create_user(&self, user: &NewUser) -> Result<ApiRecord>;
}

#[cfg(test)]
mod tests {
    use super::*;

    const PNG_HEADER: [u8; 8] = [0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A];

    #[test]
    fn test_content_type_sniffed_from_bytes() {
        let mut bytes = PNG_HEADER.to_vec();
        bytes.extend_from_slice(&[0; 16]);

        let image = ImageUpload::new("fuente.png", bytes);
        assert_eq!(image.content_type, "image/png");
        assert!(image.is_image());
        assert!(!image.is_empty());
    }

    #[test]
    fn test_unknown_bytes_fall_back_to_octet_stream() {
        let image = ImageUpload::new("notes.txt", b"plain words".to_vec());
        assert_eq!(image.content_type, "application/octet-stream");
        assert!(!image.is_image());
    }

    #[tokio::test]
    async fn test_from_path_reads_file_name() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("plaza.png");
        tokio::fs::write(&path, PNG_HEADER).await.unwrap();

        let image = ImageUpload::from_path(&path).await.unwrap();
        assert_eq!(image.file_name, "plaza.png");
        assert_eq!(image.bytes.len(), PNG_HEADER.len());
    }
}
