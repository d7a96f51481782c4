//! Transport settings for service metadata requests.

use crate::error::{Error, Result};
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use std::time::Duration;

/// Content types the metadata request advertises.
pub const DEFAULT_ACCEPT: &str = "text/html,application/xhtml+xml,application/xml;q=0.9,image/avif,image/webp,image/apng,*/*;q=0.8,application/signed-exchange;v=b3;q=0.7";

/// Encodings the metadata request advertises. The client decodes all three.
pub const DEFAULT_ACCEPT_ENCODING: &str = "gzip, deflate, br";

/// How outbound metadata requests are made.
///
/// Loadable from JSON; omitted fields take their defaults.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct TransportConfig {
    /// Headers sent with every request (name -> value).
    pub headers: BTreeMap<String, String>,
    /// Proxy for both http and https traffic. Environment proxies are
    /// ignored when unset.
    pub proxy: Option<String>,
    /// Verify server certificates.
    pub verify_tls: bool,
    /// Whole-request timeout. Unset leaves the client default.
    pub timeout_secs: Option<u64>,
}

impl Default for TransportConfig {
    fn default() -> Self {
        let mut headers = BTreeMap::new();
        headers.insert("Accept".to_string(), DEFAULT_ACCEPT.to_string());
        headers.insert(
            "Accept-Encoding".to_string(),
            DEFAULT_ACCEPT_ENCODING.to_string(),
        );
        Self {
            headers,
            proxy: None,
            verify_tls: true,
            timeout_secs: None,
        }
    }
}

impl TransportConfig {
    /// Load settings from a JSON file.
    pub fn from_json_file(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("cannot read {}: {e}", path.display())))?;
        serde_json::from_str(&text)
            .map_err(|e| Error::Config(format!("cannot parse {}: {e}", path.display())))
    }

    /// Add a header, replacing any existing one with the same name
    /// (names compare case-insensitively).
    pub fn set_header(&mut self, name: &str, value: &str) {
        self.headers.retain(|k, _| !k.eq_ignore_ascii_case(name));
        self.headers.insert(name.to_string(), value.to_string());
    }

    /// Build the HTTP client these settings describe.
    pub fn build_client(&self) -> Result<reqwest::Client> {
        let mut headers = HeaderMap::new();
        for (name, value) in &self.headers {
            let header_name = HeaderName::from_bytes(name.as_bytes())
                .map_err(|e| Error::Config(format!("header name {name:?}: {e}")))?;
            let header_value = HeaderValue::from_str(value)
                .map_err(|e| Error::Config(format!("header {name}: {e}")))?;
            headers.insert(header_name, header_value);
        }

        let mut builder = reqwest::Client::builder()
            .default_headers(headers)
            .danger_accept_invalid_certs(!self.verify_tls);

        builder = match &self.proxy {
            Some(proxy) => builder.proxy(
                reqwest::Proxy::all(proxy)
                    .map_err(|e| Error::Config(format!("proxy {proxy:?}: {e}")))?,
            ),
            None => builder.no_proxy(),
        };

        if let Some(secs) = self.timeout_secs {
            builder = builder.timeout(Duration::from_secs(secs));
        }

        builder
            .build()
            .map_err(|e| Error::Config(format!("cannot build HTTP client: {e}")))
    }
}
