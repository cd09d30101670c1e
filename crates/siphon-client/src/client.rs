//! Management console REST client
//!
//! Provides a typed HTTP client for the console's `management-rest` API.
//! Handles basic authentication, TLS verification, query construction and
//! the mapping of responses onto [`SourceError`].
//!
//! ## Usage
//!
//! ```rust,no_run
//! use siphon_client::client::{ClientOptions, ConsoleClient};
//! use siphon_core::domain::OrganizationName;
//! use siphon_core::ports::Credentials;
//!
//! # async fn example() -> anyhow::Result<()> {
//! let client = ConsoleClient::new(
//!     "https://acme.console.ensilo.com/management-rest/",
//!     Credentials::new("api_user", "secret"),
//!     ClientOptions::default(),
//! )?;
//! let events = client.list_events(None, &OrganizationName::new("Acme")?).await?;
//! println!("{} events", events.len());
//! # Ok(())
//! # }
//! ```

use std::time::Duration;

use anyhow::{Context, Result};
use reqwest::{Client, Method, RequestBuilder};
use serde::de::DeserializeOwned;
use tracing::{debug, warn};

use siphon_core::config::SourceConfig;
use siphon_core::domain::{Event, EventId, Organization, OrganizationName, SubRecord, TimeWindow};
use siphon_core::ports::{Credentials, SourceError};

/// Event listing endpoint
const LIST_EVENTS_PATH: &str = "events/list-events";

/// Raw data item listing endpoint
const LIST_RAW_DATA_ITEMS_PATH: &str = "events/list-raw-data-items";

/// Organization listing endpoint
const LIST_ORGANIZATIONS_PATH: &str = "organizations/list-organizations";

/// Longest error body kept in a [`SourceError::Http`]
const MAX_ERROR_BODY_CHARS: usize = 512;

// ============================================================================
// ClientOptions
// ============================================================================

/// Transport settings for [`ConsoleClient`]
#[derive(Debug, Clone)]
pub struct ClientOptions {
    /// Verify the server certificate
    pub verify_tls: bool,
    /// Per-request timeout
    pub timeout: Duration,
}

impl Default for ClientOptions {
    fn default() -> Self {
        Self {
            verify_tls: true,
            timeout: Duration::from_secs(30),
        }
    }
}

impl From<&SourceConfig> for ClientOptions {
    fn from(config: &SourceConfig) -> Self {
        Self {
            verify_tls: config.verify_tls,
            timeout: Duration::from_secs(config.timeout_secs),
        }
    }
}

// ============================================================================
// ConsoleClient
// ============================================================================

/// HTTP client for the management console REST API
///
/// Wraps `reqwest::Client` with basic authentication and base URL
/// construction. Every call returns a [`SourceError`] so callers can tell an
/// HTTP failure (with its status) from a transport failure.
pub struct ConsoleClient {
    /// The underlying HTTP client
    client: Client,
    /// Base URL for API requests, always ending in `/`
    base_url: String,
    /// Basic-auth credentials sent with every request
    credentials: Credentials,
}

impl ConsoleClient {
    /// Creates a new client
    ///
    /// # Arguments
    /// * `base_url` - REST root, e.g. `https://acme.console.ensilo.com/management-rest/`
    /// * `credentials` - Basic-auth credentials
    /// * `options` - TLS and timeout settings
    pub fn new(
        base_url: impl Into<String>,
        credentials: Credentials,
        options: ClientOptions,
    ) -> Result<Self> {
        let mut base_url = base_url.into();
        if !base_url.ends_with('/') {
            base_url.push('/');
        }

        if !options.verify_tls {
            warn!(base_url = %base_url, "TLS certificate verification is disabled");
        }

        let client = Client::builder()
            .danger_accept_invalid_certs(!options.verify_tls)
            .timeout(options.timeout)
            .build()
            .context("Failed to build HTTP client")?;

        Ok(Self {
            client,
            base_url,
            credentials,
        })
    }

    /// Creates a client from the `source` configuration section
    pub fn from_config(config: &SourceConfig, credentials: Credentials) -> Result<Self> {
        let base_url = config
            .resolved_base_url()
            .context("Neither source.console nor source.base_url is configured")?;
        Self::new(base_url, credentials, ClientOptions::from(config))
    }

    /// Returns the base URL for API requests
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Returns the user name requests are authenticated as
    pub fn username(&self) -> &str {
        &self.credentials.username
    }

    /// Creates an authenticated request builder for the given method and path
    ///
    /// # Arguments
    /// * `method` - HTTP method
    /// * `path` - API path relative to the base URL (e.g. `events/list-events`)
    pub fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let url = format!("{}{}", self.base_url, path.trim_start_matches('/'));
        self.client
            .request(method, &url)
            .basic_auth(&self.credentials.username, Some(&self.credentials.password))
    }

    /// Lists events for an organization
    ///
    /// `lastSeenFrom` and `lastSeenTo` are sent together when `window` is
    /// given and both omitted otherwise.
    pub async fn list_events(
        &self,
        window: Option<&TimeWindow>,
        organization: &OrganizationName,
    ) -> Result<Vec<Event>, SourceError> {
        let query = event_query(window, organization);
        self.get_list(LIST_EVENTS_PATH, &query).await
    }

    /// Lists the raw data items of one event
    pub async fn list_sub_records(
        &self,
        event_id: EventId,
        organization: &OrganizationName,
    ) -> Result<Vec<SubRecord>, SourceError> {
        let query = [
            ("eventId", event_id.to_string()),
            ("organization", organization.as_str().to_string()),
        ];
        self.get_list(LIST_RAW_DATA_ITEMS_PATH, &query).await
    }

    /// Lists the organizations visible to the API user
    pub async fn list_organizations(&self) -> Result<Vec<Organization>, SourceError> {
        self.get_list(LIST_ORGANIZATIONS_PATH, &[]).await
    }

    /// Issues a GET and decodes a JSON array; a blank 2xx body is an empty list
    async fn get_list<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, String)],
    ) -> Result<Vec<T>, SourceError> {
        debug!(path, params = query.len(), "GET");

        let response = self
            .request(Method::GET, path)
            .query(query)
            .send()
            .await
            .map_err(|e| SourceError::Transport(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            debug!(path, status = status.as_u16(), "Request returned error status");
            return Err(SourceError::Http {
                status: status.as_u16(),
                body: truncate_body(body),
            });
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|e| SourceError::Transport(e.to_string()))?;

        if bytes.iter().all(u8::is_ascii_whitespace) {
            return Ok(Vec::new());
        }

        serde_json::from_slice(&bytes)
            .map_err(|e| SourceError::InvalidResponse(format!("{path}: {e}")))
    }
}

/// Query parameters of an event listing
fn event_query(
    window: Option<&TimeWindow>,
    organization: &OrganizationName,
) -> Vec<(&'static str, String)> {
    let mut query = Vec::with_capacity(3);
    if let Some(window) = window {
        query.push(("lastSeenFrom", window.from_param()));
        query.push(("lastSeenTo", window.to_param()));
    }
    query.push(("organization", organization.as_str().to_string()));
    query
}

fn truncate_body(body: String) -> String {
    if body.chars().count() <= MAX_ERROR_BODY_CHARS {
        body
    } else {
        let mut truncated: String = body.chars().take(MAX_ERROR_BODY_CHARS).collect();
        truncated.push('…');
        truncated
    }
}
