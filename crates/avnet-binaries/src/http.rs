//! Blocking HTTP helpers shared by the downloaders.

use reqwest::StatusCode;
use reqwest::blocking::{Client, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use tracing::debug;

use crate::PROVISION_TARGET;
use crate::error::ProvisionError;

const USER_AGENT: &str = concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION"));

/// Builds the client used for release, plugin and snapshot downloads.
///
/// # Errors
///
/// Returns an error when the TLS backend cannot be initialised.
pub fn build_client() -> Result<Client, ProvisionError> {
    Client::builder()
        .user_agent(USER_AGENT)
        .build()
        .map_err(|source| ProvisionError::http("client setup", source))
}

/// Sends `request` and returns the whole body of a 200 response.
pub(crate) fn fetch_bytes(request: RequestBuilder, url: &str) -> Result<Vec<u8>, ProvisionError> {
    debug!(target: PROVISION_TARGET, url, "starting download");
    let response = send_ok(request, url)?;
    let body = response
        .bytes()
        .map_err(|source| ProvisionError::http(url, source))?;
    debug!(target: PROVISION_TARGET, url, bytes = body.len(), "download complete");
    Ok(body.to_vec())
}

/// Sends `request` and decodes the JSON body of a 200 response.
pub(crate) fn fetch_json<T: DeserializeOwned>(
    request: RequestBuilder,
    url: &str,
) -> Result<T, ProvisionError> {
    send_ok(request, url)?
        .json()
        .map_err(|source| ProvisionError::http(url, source))
}

fn send_ok(request: RequestBuilder, url: &str) -> Result<Response, ProvisionError> {
    let response = request
        .send()
        .map_err(|source| ProvisionError::http(url, source))?;
    if response.status() != StatusCode::OK {
        return Err(ProvisionError::Status {
            url: url.to_owned(),
            status: response.status().as_u16(),
        });
    }
    Ok(response)
}
