//! Types shared between the session controller and backend control adapters.
//!
//! The controller drives a local network through the [`NetworkControl`]
//! trait and never inspects transport details. Adapters translate their
//! failures into a [`ControlError`] whose [`ControlErrorKind`] is the only
//! thing callers branch on.

use std::collections::BTreeMap;
use std::time::Instant;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Connection details for one node of a local network.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct NodeInfo {
    /// Node name assigned by the backend.
    pub name: String,
    /// Base URI of the node's HTTP API.
    pub uri: String,
}

/// Cluster state reported by the backend.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ClusterInfo {
    /// True once every node reports healthy.
    pub healthy: bool,
    /// True once every custom chain reports healthy.
    pub custom_chains_healthy: bool,
    /// Nodes keyed by name.
    pub node_infos: BTreeMap<String, NodeInfo>,
    /// Directory holding node data and logs for this run.
    pub root_data_dir: String,
}

impl ClusterInfo {
    /// Returns true when both the nodes and the custom chains are healthy.
    #[must_use]
    pub const fn is_ready(&self) -> bool {
        self.healthy && self.custom_chains_healthy
    }

    /// Returns the node URIs in sorted order.
    #[must_use]
    pub fn endpoints(&self) -> Vec<String> {
        let mut endpoints: Vec<String> = self
            .node_infos
            .values()
            .map(|node| node.uri.clone())
            .collect();
        endpoints.sort();
        endpoints
    }
}

/// Parameters for resuming a network from a saved snapshot.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoadSnapshotRequest {
    /// Name of the snapshot to load.
    pub snapshot_name: String,
    /// Node executable used for every node.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub exec_path: Option<String>,
    /// Directory holding VM plugins.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub plugin_dir: Option<String>,
    /// Directory receiving node data for this run.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub root_data_dir: Option<String>,
    /// Lets the backend pick free ports when recorded ones are taken.
    pub reassign_ports_if_used: bool,
    /// JSON node configuration applied to every node.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub global_node_config: Option<String>,
}

/// Parameters for booting a network without a snapshot.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StartRequest {
    /// Node executable used for every node.
    pub exec_path: String,
    /// Number of nodes to boot; the backend default applies when unset.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub num_nodes: Option<u32>,
    /// Directory holding VM plugins.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub plugin_dir: Option<String>,
    /// Directory receiving node data for this run.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub root_data_dir: Option<String>,
    /// Lets the backend pick free ports when defaults are taken.
    pub reassign_ports_if_used: bool,
    /// JSON node configuration applied to every node.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub global_node_config: Option<String>,
}

impl From<&LoadSnapshotRequest> for StartRequest {
    fn from(request: &LoadSnapshotRequest) -> Self {
        Self {
            exec_path: request.exec_path.clone().unwrap_or_default(),
            num_nodes: None,
            plugin_dir: request.plugin_dir.clone(),
            root_data_dir: request.root_data_dir.clone(),
            reassign_ports_if_used: request.reassign_ports_if_used,
            global_node_config: request.global_node_config.clone(),
        }
    }
}

/// Discriminates control failures callers react to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ControlErrorKind {
    /// No network is running on the backend.
    NotBootstrapped,
    /// The named snapshot does not exist.
    SnapshotNotFound,
    /// A snapshot with that name already exists.
    SnapshotAlreadyExists,
    /// The backend could not be reached.
    Unavailable,
    /// The caller's deadline elapsed before the backend answered.
    DeadlineExceeded,
    /// Any other failure.
    Other,
}

/// Failure reported by a [`NetworkControl`] implementation.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("{message}")]
pub struct ControlError {
    kind: ControlErrorKind,
    message: String,
}

impl ControlError {
    /// Builds an error of the given kind.
    #[must_use]
    pub fn new(kind: ControlErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    /// Classification of the failure.
    #[must_use]
    pub const fn kind(&self) -> ControlErrorKind {
        self.kind
    }

    /// Message reported by the backend or transport.
    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Returns true when the error has the given kind.
    #[must_use]
    pub fn is(&self, kind: ControlErrorKind) -> bool {
        self.kind == kind
    }
}

/// Control surface of the network-runner backend.
///
/// Each call blocks until the backend answers or `deadline` passes. An
/// elapsed deadline is reported as [`ControlErrorKind::DeadlineExceeded`],
/// and a deadline already in the past fails without contacting the backend.
pub trait NetworkControl {
    /// Checks that the backend accepts requests.
    ///
    /// # Errors
    /// Returns [`ControlErrorKind::Unavailable`] when the backend cannot be reached.
    fn ping(&self, deadline: Instant) -> Result<(), ControlError>;

    /// Boots a fresh network.
    ///
    /// # Errors
    /// Returns the backend's failure.
    fn start(&self, request: &StartRequest, deadline: Instant) -> Result<ClusterInfo, ControlError>;

    /// Boots a network from a saved snapshot.
    ///
    /// # Errors
    /// Returns [`ControlErrorKind::SnapshotNotFound`] when the snapshot is missing.
    fn load_snapshot(
        &self,
        request: &LoadSnapshotRequest,
        deadline: Instant,
    ) -> Result<ClusterInfo, ControlError>;

    /// Saves the running network under `name` and stops it.
    ///
    /// # Errors
    /// Returns [`ControlErrorKind::NotBootstrapped`] when no network runs.
    fn save_snapshot(&self, name: &str, deadline: Instant) -> Result<(), ControlError>;

    /// Deletes the snapshot called `name`.
    ///
    /// # Errors
    /// Returns [`ControlErrorKind::SnapshotNotFound`] when it does not exist.
    fn remove_snapshot(&self, name: &str, deadline: Instant) -> Result<(), ControlError>;

    /// Stops the running network without saving it.
    ///
    /// # Errors
    /// Returns [`ControlErrorKind::NotBootstrapped`] when no network runs.
    fn stop(&self, deadline: Instant) -> Result<(), ControlError>;

    /// Waits for and reports cluster health.
    ///
    /// # Errors
    /// Returns the backend's failure.
    fn health(&self, deadline: Instant) -> Result<ClusterInfo, ControlError>;

    /// Reports the cluster state without waiting.
    ///
    /// # Errors
    /// Returns [`ControlErrorKind::NotBootstrapped`] when no network runs.
    fn status(&self, deadline: Instant) -> Result<ClusterInfo, ControlError>;
}
