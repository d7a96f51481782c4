//! Service resolver: turn a connection string into its service item id.
//!
//! The metadata URL is the connection string minus its last two characters
//! (usually a `/<layer index>` suffix) followed by `/?f=pjson`. The id is
//! the `serviceItemId` field of the JSON response.

pub mod http;
pub mod transport;

pub use http::HttpResolver;
pub use transport::TransportConfig;

use crate::error::{Error, ResolveCause, Result};
use async_trait::async_trait;
use serde_json::Value;
use url::Url;

/// Response key holding the service id.
pub const SERVICE_ITEM_ID_KEY: &str = "serviceItemId";

/// Query parameter asking the service for pretty-printed JSON.
pub const FORMAT_PARAM: (&str, &str) = ("f", "pjson");

/// Looks up the service id for a connection string.
#[async_trait]
pub trait ServiceResolver: Send + Sync {
    async fn resolve(&self, connection_string: &str) -> Result<String>;
}

/// Build the metadata query URL for a connection string.
pub fn metadata_url(connection_string: &str) -> Result<Url> {
    let cut = connection_string
        .char_indices()
        .rev()
        .nth(1)
        .map(|(i, _)| i)
        .ok_or_else(|| {
            Error::resolution(
                connection_string,
                ResolveCause::InvalidUrl("connection string is shorter than two characters".into()),
            )
        })?;

    let mut url = Url::parse(&format!("{}/", &connection_string[..cut])).map_err(|e| {
        Error::resolution(connection_string, ResolveCause::InvalidUrl(e.to_string()))
    })?;
    url.query_pairs_mut().append_pair(FORMAT_PARAM.0, FORMAT_PARAM.1);
    Ok(url)
}

/// Pull the service id out of a metadata response body.
pub fn extract_service_id(body: &[u8]) -> std::result::Result<String, ResolveCause> {
    let json: Value = serde_json::from_slice(body)?;
    match json.get(SERVICE_ITEM_ID_KEY) {
        None => Err(ResolveCause::MissingKey),
        Some(Value::String(id)) => Ok(id.clone()),
        Some(Value::Number(n)) => Ok(n.to_string()),
        Some(other) => Err(ResolveCause::UnsupportedValue(other.to_string())),
    }
}
