//! Translation of gateway failures into control error kinds.
//!
//! This is the only place that inspects backend error text.

use avnet_control_types::{ControlError, ControlErrorKind};

use super::wire::ErrorBody;

const NOT_BOOTSTRAPPED: &str = "not bootstrapped";
const SNAPSHOT_NOT_FOUND: &str = "snapshot not found";
const ALREADY_EXISTS: &str = "already exists";

pub(super) fn classify(message: &str) -> ControlErrorKind {
    if message.contains(NOT_BOOTSTRAPPED) {
        ControlErrorKind::NotBootstrapped
    } else if message.contains(SNAPSHOT_NOT_FOUND) {
        ControlErrorKind::SnapshotNotFound
    } else if message.contains(ALREADY_EXISTS) {
        ControlErrorKind::SnapshotAlreadyExists
    } else {
        ControlErrorKind::Other
    }
}

/// Builds the error for a non-success response.
pub(super) fn from_response(status: u16, body: &str) -> ControlError {
    match serde_json::from_str::<ErrorBody>(body) {
        Ok(error) if !error.message.is_empty() => {
            ControlError::new(classify(&error.message), error.message)
        }
        _ => ControlError::new(
            ControlErrorKind::Other,
            format!("gateway returned HTTP {status}: {}", body.trim()),
        ),
    }
}

/// Builds the error for a request that produced no response.
pub(super) fn from_transport(endpoint: &str, error: &reqwest::Error) -> ControlError {
    let kind = if error.is_timeout() {
        ControlErrorKind::DeadlineExceeded
    } else if error.is_connect() {
        ControlErrorKind::Unavailable
    } else {
        ControlErrorKind::Other
    };
    ControlError::new(kind, format!("request to {endpoint} failed: {error}"))
}

/// Builds the error for a call whose deadline passed before it was sent.
pub(super) fn deadline_exceeded(endpoint: &str) -> ControlError {
    ControlError::new(
        ControlErrorKind::DeadlineExceeded,
        format!("deadline passed before request to {endpoint}"),
    )
}
