//! Entity models and write payloads
//!
//! Records are decoded only after [`crate::identity::normalize_id`] has run,
//! so every entity reads its identifier from `id`. Counters and scores that
//! the backend omits or sends as `null` decode to zero.

use crate::{Error, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;

/// Lowest accepted rating score
pub const MIN_SCORE: u8 = 1;

/// Highest accepted rating score
pub const MAX_SCORE: u8 = 10;

/// Anything with a canonical identifier
pub trait Entity {
    fn id(&self) -> &str;
}

/// Entities owned by a user
pub trait Authored: Entity {
    fn author_id(&self) -> &str;
}

/// Treat explicit `null` like a missing field
fn nullable<'de, D, T>(deserializer: D) -> std::result::Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

// ========================================
// Read models
// ========================================

/// Point of interest
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Poi {
    pub id: String,
    pub name: String,
    #[serde(default, deserialize_with = "nullable")]
    pub description: String,
    pub latitude: f64,
    pub longitude: f64,
    #[serde(default, deserialize_with = "nullable")]
    pub tags: Vec<String>,
    #[serde(default, deserialize_with = "nullable")]
    pub image_url: String,
    pub author_id: String,
    #[serde(default, deserialize_with = "nullable")]
    pub rating_count: u32,
    #[serde(default, deserialize_with = "nullable")]
    pub average_rating: f64,
    #[serde(default, with = "crate::time::lenient")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default, with = "crate::time::lenient")]
    pub updated_at: Option<DateTime<Utc>>,
}

/// Single-POI lookup result
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PoiDetail {
    #[serde(flatten)]
    pub poi: Poi,
    #[serde(default)]
    pub author_name: Option<String>,
    #[serde(default, deserialize_with = "nullable")]
    pub photo_count: u32,
}

/// Photo attached to a POI
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Photo {
    pub id: String,
    pub poi_id: String,
    #[serde(default, deserialize_with = "nullable")]
    pub image_url: String,
    #[serde(default)]
    pub description: Option<String>,
    pub author_id: String,
    #[serde(default, deserialize_with = "nullable")]
    pub rating_count: u32,
    #[serde(default, deserialize_with = "nullable")]
    pub average_rating: f64,
    #[serde(default, with = "crate::time::lenient")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default, with = "crate::time::lenient")]
    pub updated_at: Option<DateTime<Utc>>,
}

/// Single-photo lookup result
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PhotoDetail {
    #[serde(flatten)]
    pub photo: Photo,
    #[serde(default)]
    pub author_name: Option<String>,
    #[serde(default)]
    pub poi_name: Option<String>,
}

/// Account record, also the persisted "current user"
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    pub name: String,
    pub email: String,
    #[serde(default, deserialize_with = "nullable")]
    pub poi_score: u64,
    #[serde(default, deserialize_with = "nullable")]
    pub photo_score: u64,
    #[serde(default, deserialize_with = "nullable")]
    pub total_score: u64,
    #[serde(default, with = "crate::time::lenient")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default, with = "crate::time::lenient")]
    pub updated_at: Option<DateTime<Utc>>,
}

/// Public profile with contribution counts
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserProfile {
    pub id: String,
    pub name: String,
    #[serde(default, deserialize_with = "nullable")]
    pub email: String,
    #[serde(default, deserialize_with = "nullable")]
    pub poi_score: u64,
    #[serde(default, deserialize_with = "nullable")]
    pub photo_score: u64,
    #[serde(default, deserialize_with = "nullable")]
    pub total_score: u64,
    #[serde(default, deserialize_with = "nullable")]
    pub poi_count: u32,
    #[serde(default, deserialize_with = "nullable")]
    pub photo_count: u32,
    #[serde(default, deserialize_with = "nullable")]
    pub rating_count: u32,
}

/// What a rating points at
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TargetKind {
    Poi,
    Photo,
}

impl TargetKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            TargetKind::Poi => "poi",
            TargetKind::Photo => "photo",
        }
    }
}

impl fmt::Display for TargetKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for TargetKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "poi" => Ok(TargetKind::Poi),
            "photo" => Ok(TargetKind::Photo),
            other => Err(Error::InvalidInput(format!(
                "unknown rating target '{}' (expected poi or photo)",
                other
            ))),
        }
    }
}

/// Rating given by a user to a POI or photo
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Rating {
    pub id: String,
    pub user_id: String,
    #[serde(deserialize_with = "score_from_number")]
    pub score: u8,
    pub target_type: TargetKind,
    pub target_id: String,
    #[serde(default, with = "crate::time::lenient")]
    pub created_at: Option<DateTime<Utc>>,
}

/// Backend stores scores as floats
///
/// Values outside 1..=10 fail to decode, so the record is dropped as bad
/// data. Fractions round half away from zero (7.5 reads as 8).
fn score_from_number<'de, D>(deserializer: D) -> std::result::Result<u8, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = f64::deserialize(deserializer)?;
    if !raw.is_finite() || raw < f64::from(MIN_SCORE) || raw > f64::from(MAX_SCORE) {
        return Err(serde::de::Error::custom(format!(
            "rating score {} out of range",
            raw
        )));
    }
    Ok(raw.round() as u8)
}

impl Entity for Poi {
    fn id(&self) -> &str {
        &self.id
    }
}

impl Authored for Poi {
    fn author_id(&self) -> &str {
        &self.author_id
    }
}

impl Entity for Photo {
    fn id(&self) -> &str {
        &self.id
    }
}

impl Authored for Photo {
    fn author_id(&self) -> &str {
        &self.author_id
    }
}

impl Entity for User {
    fn id(&self) -> &str {
        &self.id
    }
}

impl Entity for UserProfile {
    fn id(&self) -> &str {
        &self.id
    }
}

impl Entity for Rating {
    fn id(&self) -> &str {
        &self.id
    }
}

// ========================================
// Write payloads
// ========================================

/// Fields for a new POI (the image travels separately as multipart)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewPoi {
    pub name: String,
    pub description: String,
    pub latitude: f64,
    pub longitude: f64,
    #[serde(default)]
    pub tags: Vec<String>,
}

impl NewPoi {
    /// Reject blank text and coordinates off the globe
    pub fn validate(&self) -> Result<()> {
        if self.name.trim().is_empty() {
            return Err(Error::InvalidInput("POI name is required".to_string()));
        }
        if self.description.trim().is_empty() {
            return Err(Error::InvalidInput(
                "POI description is required".to_string(),
            ));
        }
        validate_coordinate(self.latitude, self.longitude)
    }
}

/// Partial POI update; absent fields are left untouched by the backend
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PoiUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tags: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub latitude: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub longitude: Option<f64>,
}

impl PoiUpdate {
    pub fn is_empty(&self) -> bool {
        self.name.is_none()
            && self.description.is_none()
            && self.tags.is_none()
            && self.latitude.is_none()
            && self.longitude.is_none()
    }

    pub fn validate(&self) -> Result<()> {
        if self.is_empty() {
            return Err(Error::InvalidInput("nothing to update".to_string()));
        }
        if let Some(lat) = self.latitude {
            validate_coordinate(lat, 0.0)?;
        }
        if let Some(lon) = self.longitude {
            validate_coordinate(0.0, lon)?;
        }
        Ok(())
    }
}

fn validate_coordinate(latitude: f64, longitude: f64) -> Result<()> {
    if !(-90.0..=90.0).contains(&latitude) {
        return Err(Error::InvalidInput(format!(
            "latitude {} outside -90..=90",
            latitude
        )));
    }
    if !(-180.0..=180.0).contains(&longitude) {
        return Err(Error::InvalidInput(format!(
            "longitude {} outside -180..=180",
            longitude
        )));
    }
    Ok(())
}

/// Registration payload
#[derive(Clone, Serialize, Deserialize)]
pub struct NewUser {
    pub name: String,
    pub email: String,
    pub password: String,
}

impl fmt::Debug for NewUser {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NewUser")
            .field("name", &self.name)
            .field("email", &self.email)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Login payload
#[derive(Clone, Serialize, Deserialize)]
pub struct Credentials {
    pub email: String,
    pub password: String,
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("email", &self.email)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Rating score checked against 1..=10
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct RatingScore(u8);

impl RatingScore {
    pub fn value(self) -> u8 {
        self.0
    }
}

impl TryFrom<i64> for RatingScore {
    type Error = Error;

    fn try_from(score: i64) -> Result<Self> {
        if score < i64::from(MIN_SCORE) || score > i64::from(MAX_SCORE) {
            return Err(Error::InvalidScore(score));
        }
        Ok(RatingScore(score as u8))
    }
}

/// Body of `POST /ratings/`
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NewRating {
    pub user_id: String,
    pub score: RatingScore,
    pub target_type: TargetKind,
    pub target_id: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_poi_missing_counters_default_to_zero() {
        let poi: Poi = serde_json::from_value(json!({
            "id": "p1",
            "name": "Mirador",
            "description": "Vista",
            "latitude": 40.4,
            "longitude": -3.7,
            "tags": null,
            "image_url": "/uploads/a.jpg",
            "author_id": "u1",
            "rating_count": null,
            "created_at": "2025-12-12T08:06:12.920925"
        }))
        .unwrap();

        assert!(poi.tags.is_empty());
        assert_eq!(poi.rating_count, 0);
        assert_eq!(poi.average_rating, 0.0);
        assert!(poi.created_at.is_some());
        assert!(poi.updated_at.is_none());
    }

    #[test]
    fn test_poi_detail_flattens_base_fields() {
        let detail: PoiDetail = serde_json::from_value(json!({
            "id": "p1",
            "name": "Mirador",
            "description": "Vista",
            "latitude": 1.0,
            "longitude": 2.0,
            "author_id": "u1",
            "author_name": "Ana",
            "photo_count": 3
        }))
        .unwrap();

        assert_eq!(detail.poi.id, "p1");
        assert_eq!(detail.author_name.as_deref(), Some("Ana"));
        assert_eq!(detail.photo_count, 3);
    }

    #[test]
    fn test_user_missing_scores_default_to_zero() {
        let user: User = serde_json::from_value(json!({
            "id": "u1",
            "name": "Ana",
            "email": "ana@example.com",
            "total_score": 26
        }))
        .unwrap();

        assert_eq!(user.poi_score, 0);
        assert_eq!(user.photo_score, 0);
        assert_eq!(user.total_score, 26);
    }

    #[test]
    fn test_rating_accepts_float_score() {
        let rating: Rating = serde_json::from_value(json!({
            "id": "r1",
            "user_id": "u1",
            "score": 8.0,
            "target_type": "photo",
            "target_id": "ph1"
        }))
        .unwrap();

        assert_eq!(rating.score, 8);
        assert_eq!(rating.target_type, TargetKind::Photo);
    }

    #[test]
    fn test_rating_score_below_one_rejected() {
        for score in [0.0, 0.3, 0.99, -1.0] {
            let result = crate::identity::decode::<Rating>(json!({
                "id": "r1",
                "user_id": "u1",
                "score": score,
                "target_type": "poi",
                "target_id": "p1"
            }));
            assert!(
                matches!(result, Err(Error::DataQuality(_))),
                "score {} accepted",
                score
            );
        }
    }

    #[test]
    fn test_rating_fraction_rounds_half_away_from_zero() {
        let rating: Rating = serde_json::from_value(json!({
            "id": "r1",
            "user_id": "u1",
            "score": 7.5,
            "target_type": "poi",
            "target_id": "p1"
        }))
        .unwrap();
        assert_eq!(rating.score, 8);
    }

    #[test]
    fn test_rating_score_bounds() {
        assert!(RatingScore::try_from(1).is_ok());
        assert!(RatingScore::try_from(10).is_ok());
        assert!(matches!(
            RatingScore::try_from(0),
            Err(Error::InvalidScore(0))
        ));
        assert!(matches!(
            RatingScore::try_from(11),
            Err(Error::InvalidScore(11))
        ));
    }

    #[test]
    fn test_new_rating_serializes_plain_score() {
        let body = NewRating {
            user_id: "u1".to_string(),
            score: RatingScore::try_from(7).unwrap(),
            target_type: TargetKind::Poi,
            target_id: "p1".to_string(),
        };
        assert_eq!(
            serde_json::to_value(&body).unwrap(),
            json!({"user_id": "u1", "score": 7, "target_type": "poi", "target_id": "p1"})
        );
    }

    #[test]
    fn test_new_poi_validation() {
        let mut poi = NewPoi {
            name: "Plaza".to_string(),
            description: "Centro".to_string(),
            latitude: 40.0,
            longitude: -3.0,
            tags: vec![],
        };
        assert!(poi.validate().is_ok());

        poi.latitude = 91.0;
        assert!(matches!(poi.validate(), Err(Error::InvalidInput(_))));

        poi.latitude = 0.0;
        poi.name = "  ".to_string();
        assert!(poi.validate().is_err());
    }

    #[test]
    fn test_poi_update_skips_absent_fields() {
        let update = PoiUpdate {
            name: Some("Nuevo".to_string()),
            ..Default::default()
        };
        assert_eq!(serde_json::to_value(&update).unwrap(), json!({"name": "Nuevo"}));
        assert!(PoiUpdate::default().validate().is_err());
        assert!(update.validate().is_ok());
    }

    #[test]
    fn test_credentials_debug_hides_password() {
        let creds = Credentials {
            email: "a@b.c".to_string(),
            password: "hunter22".to_string(),
        };
        let shown = format!("{:?}", creds);
        assert!(!shown.contains("hunter22"));
        assert!(shown.contains("a@b.c"));
    }

    #[test]
    fn test_target_kind_parse() {
        assert_eq!("POI".parse::<TargetKind>().unwrap(), TargetKind::Poi);
        assert_eq!("photo".parse::<TargetKind>().unwrap(), TargetKind::Photo);
        assert!("user".parse::<TargetKind>().is_err());
    }
}
