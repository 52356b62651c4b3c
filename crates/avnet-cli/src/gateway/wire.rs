//! JSON payloads exchanged with the runner gateway.

use serde::{Deserialize, Serialize};

use avnet_control_types::ClusterInfo;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(super) struct SnapshotNameRequest<'a> {
    pub(super) snapshot_name: &'a str,
}

#[derive(Debug, Serialize)]
pub(super) struct EmptyRequest {}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub(super) struct ClusterInfoResponse {
    pub(super) cluster_info: Option<ClusterInfo>,
}

/// Error body produced by the gateway for failed calls; only the message is
/// inspected.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub(super) struct ErrorBody {
    pub(super) message: String,
}
