//! Background rig loading.
//!
//! Parsing a model happens on tokio's blocking pool. The frame loop polls the
//! returned [`RigLoad`] once per frame and keeps rendering with no rig until
//! the result arrives.

use crossbeam_channel::{bounded, Receiver, TryRecvError};
use glam::Vec3;
use std::path::PathBuf;
use tokio::task::JoinHandle;

use super::vrm::VrmRig;
use crate::error::RigError;

/// An in-flight rig load.
pub struct RigLoad {
    path: PathBuf,
    rx: Receiver<Result<VrmRig, RigError>>,
    handle: JoinHandle<()>,
}

impl RigLoad {
    /// Path of the model being loaded.
    pub fn path(&self) -> &std::path::Path {
        &self.path
    }

    /// Non-blocking check for the result. Returns `None` while the load is
    /// still running.
    pub fn poll(&self) -> Option<Result<VrmRig, RigError>> {
        match self.rx.try_recv() {
            Ok(result) => Some(result),
            Err(TryRecvError::Empty) => None,
            Err(TryRecvError::Disconnected) => Some(Err(RigError::LoaderGone(
                self.path.display().to_string(),
            ))),
        }
    }

    /// Wait for the load to finish.
    pub async fn wait(self) -> Result<VrmRig, RigError> {
        if let Err(e) = self.handle.await {
            return Err(RigError::LoaderGone(format!("{}: {}", self.path.display(), e)));
        }
        self.rx
            .try_recv()
            .map_err(|_| RigError::LoaderGone(self.path.display().to_string()))?
    }
}

/// Start loading the model at `path` on the blocking pool.
///
/// `position` and `scale` place the model root once it is loaded. Must be
/// called from within a tokio runtime.
pub fn spawn_load(path: impl Into<PathBuf>, position: Vec3, scale: f32) -> RigLoad {
    let path = path.into();
    let (tx, rx) = bounded(1);

    let task_path = path.clone();
    let handle = tokio::task::spawn_blocking(move || {
        tracing::debug!("Loading model: {}", task_path.display());
        let result = VrmRig::load(&task_path).map(|mut rig| {
            rig.set_placement(position, scale);
            rig
        });
        let _ = tx.send(result);
    });

    RigLoad { path, rx, handle }
}
