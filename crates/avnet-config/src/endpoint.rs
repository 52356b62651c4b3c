//! Address of the network-runner HTTP gateway.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use url::Url;

/// Address of the network-runner HTTP gateway.
///
/// The gateway fronts the runner's gRPC control service with a JSON API, so
/// only plain `http` URLs are accepted.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
#[serde(try_from = "String", into = "String")]
pub struct GatewayEndpoint {
    /// Host name or IP address the gateway listens on.
    pub host: String,
    /// TCP port of the gateway.
    pub port: u16,
}

impl GatewayEndpoint {
    /// Builds an endpoint from its parts.
    #[must_use]
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
        }
    }

    /// Joins `path` onto the endpoint's base URL.
    #[must_use]
    pub fn url_for(&self, path: &str) -> String {
        format!("{self}/{}", path.trim_start_matches('/'))
    }
}

impl fmt::Display for GatewayEndpoint {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(formatter, "http://{}:{}", self.host, self.port)
    }
}

impl FromStr for GatewayEndpoint {
    type Err = EndpointParseError;

    fn from_str(input: &str) -> Result<Self, Self::Err> {
        let url = Url::parse(input)?;
        if url.scheme() != "http" {
            return Err(EndpointParseError::UnsupportedScheme(
                url.scheme().to_owned(),
            ));
        }
        let host = url
            .host_str()
            .ok_or_else(|| EndpointParseError::MissingHost(input.to_owned()))?;
        let port = url
            .port()
            .ok_or_else(|| EndpointParseError::MissingPort(input.to_owned()))?;
        Ok(Self::new(host, port))
    }
}

impl TryFrom<String> for GatewayEndpoint {
    type Error = EndpointParseError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<GatewayEndpoint> for String {
    fn from(endpoint: GatewayEndpoint) -> Self {
        endpoint.to_string()
    }
}

/// Errors encountered while parsing a [`GatewayEndpoint`] from text.
#[derive(Debug, Error)]
pub enum EndpointParseError {
    /// Scheme was not `http`.
    #[error("unsupported gateway scheme '{0}'")]
    UnsupportedScheme(String),
    /// Host name was missing.
    #[error("missing gateway host in '{0}'")]
    MissingHost(String),
    /// Port was missing from the address.
    #[error("missing gateway port in '{0}'")]
    MissingPort(String),
    /// URL failed to parse.
    #[error(transparent)]
    Url(#[from] url::ParseError),
}
