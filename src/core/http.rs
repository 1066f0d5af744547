//! HTTP client utilities.
//!
//! Provides the shared HTTP client used by network source fetchers.

use std::time::Duration;

use reqwest::{Client, ClientBuilder, Response};

use crate::error::FetchError;

/// Default timeout for HTTP requests.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Default user agent.
#[must_use]
pub fn default_user_agent() -> String {
    format!("novelcache/{}", env!("CARGO_PKG_VERSION"))
}

/// Build a configured HTTP client.
///
/// # Errors
///
/// Returns error if client construction fails.
pub fn build_client(timeout: Duration, user_agent: &str) -> Result<Client, FetchError> {
    ClientBuilder::new()
        .timeout(timeout)
        .user_agent(user_agent)
        .build()
        .map_err(|e| FetchError::Network(e.to_string()))
}

/// Classify a transport error.
#[must_use]
pub fn map_transport_error(err: &reqwest::Error, timeout: Duration) -> FetchError {
    if err.is_timeout() {
        FetchError::Timeout {
            seconds: timeout.as_secs(),
        }
    } else {
        FetchError::Network(err.to_string())
    }
}

/// Send a GET and reject non-success statuses.
///
/// # Errors
///
/// Returns `Timeout`/`Network` for transport failures and `Http` for any
/// status of 400 or above.
pub async fn get_checked(client: &Client, url: &str, timeout: Duration) -> Result<Response, FetchError> {
    let response = client
        .get(url)
        .send()
        .await
        .map_err(|e| map_transport_error(&e, timeout))?;

    let status = response.status();
    if status.is_client_error() || status.is_server_error() {
        return Err(FetchError::Http {
            status: status.as_u16(),
            url: url.to_string(),
        });
    }
    Ok(response)
}

/// Fetch JSON from a URL.
///
/// # Errors
///
/// Returns error on network failure, error status or JSON parse failure.
pub async fn fetch_json<T: serde::de::DeserializeOwned>(
    client: &Client,
    url: &str,
    timeout: Duration,
) -> Result<T, FetchError> {
    get_checked(client, url, timeout)
        .await?
        .json()
        .await
        .map_err(|e| {
            if e.is_timeout() {
                map_transport_error(&e, timeout)
            } else {
                FetchError::Parse(e.to_string())
            }
        })
}

/// Fetch a response body as text.
///
/// # Errors
///
/// Returns error on network failure or error status.
pub async fn fetch_text(client: &Client, url: &str, timeout: Duration) -> Result<String, FetchError> {
    get_checked(client, url, timeout)
        .await?
        .text()
        .await
        .map_err(|e| map_transport_error(&e, timeout))
}
