//! API key credential
//!
//! Every backend call carries the same shared secret in the `X-API-Key`
//! header. The key is validated once at construction so the HTTP layer can
//! attach it without further checks, and it never appears in logs.

use crate::{Error, Result};
use std::fmt;

/// Header carrying the shared secret
pub const API_KEY_HEADER: &str = "X-API-Key";

/// Shared secret for the backend
///
/// # Examples
///
/// ```
/// use spot_common::api::ApiKey;
///
/// let key = ApiKey::new("dev-key-123").unwrap();
/// assert_eq!(key.expose(), "dev-key-123");
/// assert_eq!(format!("{:?}", key), "ApiKey(<redacted>)");
/// ```
#[derive(Clone, PartialEq, Eq)]
pub struct ApiKey(String);

impl ApiKey {
    /// Accepts non-empty visible ASCII, the set valid in a header value
    pub fn new(raw: impl Into<String>) -> Result<Self> {
        let raw = raw.into();
        let key = raw.trim();

        if key.is_empty() {
            return Err(Error::Config("API key must not be empty".to_string()));
        }
        if !key.bytes().all(|b| b.is_ascii_graphic()) {
            return Err(Error::Config(
                "API key must contain only visible ASCII characters".to_string(),
            ));
        }

        Ok(Self(key.to_string()))
    }

    /// Raw key for header attachment
    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for ApiKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("ApiKey(<redacted>)")
    }
}
