//! HTTP-backed [`ServiceResolver`].

use super::transport::TransportConfig;
use super::{extract_service_id, metadata_url, ServiceResolver};
use crate::error::{Error, ResolveCause, Result};
use async_trait::async_trait;
use tracing::debug;

/// Resolves service ids by querying the live service endpoint.
///
/// Every call makes exactly one request. Nothing is cached or retried.
#[derive(Debug, Clone)]
pub struct HttpResolver {
    client: reqwest::Client,
}

impl HttpResolver {
    pub fn new(config: &TransportConfig) -> Result<Self> {
        Ok(Self::with_client(config.build_client()?))
    }

    pub fn with_client(client: reqwest::Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl ServiceResolver for HttpResolver {
    async fn resolve(&self, connection_string: &str) -> Result<String> {
        let url = metadata_url(connection_string)?;
        debug!(%url, "requesting service metadata");

        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| Error::resolution(connection_string, e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(Error::resolution(
                connection_string,
                ResolveCause::Status(status.as_u16()),
            ));
        }

        let body = response
            .bytes()
            .await
            .map_err(|e| Error::resolution(connection_string, e))?;

        extract_service_id(&body).map_err(|cause| Error::resolution(connection_string, cause))
    }
}
