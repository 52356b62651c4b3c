//! Doubles shared by the CLI unit and behavioural tests.

use std::cell::RefCell;
use std::collections::{BTreeMap, BTreeSet};
use std::ffi::OsString;
use std::time::Instant;

use mockall::mock;

use avnet_config::Config;
use avnet_control_types::{
    ClusterInfo, ControlError, ControlErrorKind, LoadSnapshotRequest, NetworkControl, NodeInfo,
    StartRequest,
};

use crate::{AppError, ConfigLoader};

mock! {
    pub(crate) Control {}
    impl NetworkControl for Control {
        fn ping(&self, deadline: Instant) -> Result<(), ControlError>;
        fn start(&self, request: &StartRequest, deadline: Instant) -> Result<ClusterInfo, ControlError>;
        fn load_snapshot(
            &self,
            request: &LoadSnapshotRequest,
            deadline: Instant,
        ) -> Result<ClusterInfo, ControlError>;
        fn save_snapshot(&self, name: &str, deadline: Instant) -> Result<(), ControlError>;
        fn remove_snapshot(&self, name: &str, deadline: Instant) -> Result<(), ControlError>;
        fn stop(&self, deadline: Instant) -> Result<(), ControlError>;
        fn health(&self, deadline: Instant) -> Result<ClusterInfo, ControlError>;
        fn status(&self, deadline: Instant) -> Result<ClusterInfo, ControlError>;
    }
}

pub(crate) struct StaticConfigLoader {
    config: Config,
}

impl StaticConfigLoader {
    pub(crate) fn new(config: Config) -> Self {
        Self { config }
    }
}

impl ConfigLoader for StaticConfigLoader {
    fn load(&self, _args: &[OsString]) -> Result<Config, AppError> {
        Ok(self.config.clone())
    }
}

/// Number of nodes in every network booted by [`FakeBackend`].
pub(crate) const FAKE_NODE_COUNT: u16 = 5;

#[derive(Debug, Default)]
struct FakeState {
    running: bool,
    snapshots: BTreeSet<String>,
    loaded: Vec<String>,
}

/// In-memory control service that keeps snapshots between calls.
#[derive(Debug, Default)]
pub(crate) struct FakeBackend {
    state: RefCell<FakeState>,
}

impl FakeBackend {
    pub(crate) fn running() -> Self {
        let backend = Self::default();
        backend.state.borrow_mut().running = true;
        backend
    }

    pub(crate) fn has_snapshot(&self, name: &str) -> bool {
        self.state.borrow().snapshots.contains(name)
    }

    pub(crate) fn loaded_snapshots(&self) -> Vec<String> {
        self.state.borrow().loaded.clone()
    }

    fn require_running(&self) -> Result<(), ControlError> {
        if self.state.borrow().running {
            Ok(())
        } else {
            Err(ControlError::new(
                ControlErrorKind::NotBootstrapped,
                "network not bootstrapped",
            ))
        }
    }

    fn cluster() -> ClusterInfo {
        let node_infos = (1..=FAKE_NODE_COUNT)
            .map(|index| {
                let name = format!("node{index}");
                let uri = format!("http://127.0.0.1:{}", 9648 + 2 * index);
                (name.clone(), NodeInfo { name, uri })
            })
            .collect::<BTreeMap<_, _>>();
        ClusterInfo {
            healthy: true,
            custom_chains_healthy: true,
            node_infos,
            root_data_dir: String::from("/tmp/network"),
        }
    }
}

impl NetworkControl for FakeBackend {
    fn ping(&self, _deadline: Instant) -> Result<(), ControlError> {
        Ok(())
    }

    fn start(&self, _request: &StartRequest, _deadline: Instant) -> Result<ClusterInfo, ControlError> {
        self.state.borrow_mut().running = true;
        Ok(Self::cluster())
    }

    fn load_snapshot(
        &self,
        request: &LoadSnapshotRequest,
        _deadline: Instant,
    ) -> Result<ClusterInfo, ControlError> {
        let mut state = self.state.borrow_mut();
        if !state.snapshots.contains(&request.snapshot_name) {
            return Err(ControlError::new(
                ControlErrorKind::SnapshotNotFound,
                "snapshot not found",
            ));
        }
        state.running = true;
        state.loaded.push(request.snapshot_name.clone());
        Ok(Self::cluster())
    }

    fn save_snapshot(&self, name: &str, _deadline: Instant) -> Result<(), ControlError> {
        self.require_running()?;
        let mut state = self.state.borrow_mut();
        if !state.snapshots.insert(name.to_owned()) {
            return Err(ControlError::new(
                ControlErrorKind::SnapshotAlreadyExists,
                format!("snapshot {name} already exists"),
            ));
        }
        state.running = false;
        Ok(())
    }

    fn remove_snapshot(&self, name: &str, _deadline: Instant) -> Result<(), ControlError> {
        self.require_running()?;
        if self.state.borrow_mut().snapshots.remove(name) {
            Ok(())
        } else {
            Err(ControlError::new(
                ControlErrorKind::SnapshotNotFound,
                "snapshot not found",
            ))
        }
    }

    fn stop(&self, _deadline: Instant) -> Result<(), ControlError> {
        self.require_running()?;
        self.state.borrow_mut().running = false;
        Ok(())
    }

    fn health(&self, _deadline: Instant) -> Result<ClusterInfo, ControlError> {
        self.require_running()?;
        Ok(Self::cluster())
    }

    fn status(&self, deadline: Instant) -> Result<ClusterInfo, ControlError> {
        self.health(deadline)
    }
}
