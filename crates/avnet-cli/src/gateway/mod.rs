//! HTTP/JSON adapter for the network-runner control service.
//!
//! The runner exposes its gRPC control API through a JSON gateway. Each
//! [`NetworkControl`] call becomes a single blocking `POST` whose timeout is
//! whatever remains of the caller's deadline; failures are turned into
//! [`ControlError`]s by [`errors`] so callers only ever branch on
//! [`avnet_control_types::ControlErrorKind`].

mod errors;
mod wire;

use std::time::{Duration, Instant};

use reqwest::blocking::Client;
use serde::Serialize;
use tracing::debug;

use avnet_config::GatewayEndpoint;
use avnet_control_types::{
    ClusterInfo, ControlError, ControlErrorKind, LoadSnapshotRequest, NetworkControl,
    StartRequest,
};

use wire::{ClusterInfoResponse, EmptyRequest, SnapshotNameRequest};

const GATEWAY_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::gateway");

const PING_PATH: &str = "/v1/ping";
const START_PATH: &str = "/v1/control/start";
const LOAD_SNAPSHOT_PATH: &str = "/v1/control/loadsnapshot";
const SAVE_SNAPSHOT_PATH: &str = "/v1/control/savesnapshot";
const REMOVE_SNAPSHOT_PATH: &str = "/v1/control/removesnapshot";
const STOP_PATH: &str = "/v1/control/stop";
const HEALTH_PATH: &str = "/v1/control/health";
const STATUS_PATH: &str = "/v1/control/status";

/// [`NetworkControl`] over the runner's HTTP gateway.
#[derive(Debug, Clone)]
pub struct GatewayClient {
    http: Client,
    endpoint: GatewayEndpoint,
}

impl GatewayClient {
    /// Builds a client for the gateway at `endpoint`.
    ///
    /// Requests carry no timeout of their own; each call is bounded by the
    /// deadline passed to it.
    pub fn new(endpoint: GatewayEndpoint) -> Result<Self, reqwest::Error> {
        let http = Client::builder().timeout(None).build()?;
        Ok(Self { http, endpoint })
    }

    fn post<B: Serialize>(
        &self,
        path: &str,
        body: &B,
        deadline: Instant,
    ) -> Result<String, ControlError> {
        let url = self.endpoint.url_for(path);
        let Some(remaining) = remaining(deadline) else {
            return Err(errors::deadline_exceeded(&url));
        };
        debug!(target: GATEWAY_TARGET, %url, remaining_ms = remaining.as_millis(), "gateway request");
        let response = self
            .http
            .post(&url)
            .timeout(remaining)
            .json(body)
            .send()
            .map_err(|error| errors::from_transport(&url, &error))?;
        let status = response.status();
        let text = response
            .text()
            .map_err(|error| errors::from_transport(&url, &error))?;
        if !status.is_success() {
            return Err(errors::from_response(status.as_u16(), &text));
        }
        Ok(text)
    }

    fn post_for_cluster<B: Serialize>(
        &self,
        path: &str,
        body: &B,
        deadline: Instant,
    ) -> Result<ClusterInfo, ControlError> {
        let text = self.post(path, body, deadline)?;
        let response: ClusterInfoResponse = serde_json::from_str(&text).map_err(|error| {
            ControlError::new(
                ControlErrorKind::Other,
                format!("malformed response from {path}: {error}"),
            )
        })?;
        Ok(response.cluster_info.unwrap_or_default())
    }
}

/// Time left before `deadline`, or `None` once it has passed.
fn remaining(deadline: Instant) -> Option<Duration> {
    deadline
        .checked_duration_since(Instant::now())
        .filter(|left| !left.is_zero())
}

impl NetworkControl for GatewayClient {
    fn ping(&self, deadline: Instant) -> Result<(), ControlError> {
        self.post(PING_PATH, &EmptyRequest {}, deadline).map(drop)
    }

    fn start(&self, request: &StartRequest, deadline: Instant) -> Result<ClusterInfo, ControlError> {
        self.post_for_cluster(START_PATH, request, deadline)
    }

    fn load_snapshot(
        &self,
        request: &LoadSnapshotRequest,
        deadline: Instant,
    ) -> Result<ClusterInfo, ControlError> {
        self.post_for_cluster(LOAD_SNAPSHOT_PATH, request, deadline)
    }

    fn save_snapshot(&self, name: &str, deadline: Instant) -> Result<(), ControlError> {
        self.post(
            SAVE_SNAPSHOT_PATH,
            &SnapshotNameRequest { snapshot_name: name },
            deadline,
        )
        .map(drop)
    }

    fn remove_snapshot(&self, name: &str, deadline: Instant) -> Result<(), ControlError> {
        self.post(
            REMOVE_SNAPSHOT_PATH,
            &SnapshotNameRequest { snapshot_name: name },
            deadline,
        )
        .map(drop)
    }

    fn stop(&self, deadline: Instant) -> Result<(), ControlError> {
        self.post(STOP_PATH, &EmptyRequest {}, deadline).map(drop)
    }

    fn health(&self, deadline: Instant) -> Result<ClusterInfo, ControlError> {
        self.post_for_cluster(HEALTH_PATH, &EmptyRequest {}, deadline)
    }

    fn status(&self, deadline: Instant) -> Result<ClusterInfo, ControlError> {
        self.post_for_cluster(STATUS_PATH, &EmptyRequest {}, deadline)
    }
}
