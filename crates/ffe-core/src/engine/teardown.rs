//! Background release of detached systems.
//!
//! Detach unlinks a System from the tree synchronously; freeing the renderer
//! resources behind it can be slow and happens here, on a dedicated thread, off
//! the explorer lock. Dispatch is fire-and-forget: there is no completion signal
//! and no cancellation. Dropping the worker drains the queue and joins the thread.

use super::collaborators::Renderer;
use super::error::EngineError;
use crate::core::models::hierarchy::DetachedSystem;
use std::sync::Arc;
use std::sync::mpsc;
use std::thread::{self, JoinHandle};
use tracing::{debug, warn};

const WORKER_NAME: &str = "ffe-teardown";

enum TeardownMsg {
    Release(DetachedSystem),
    Shutdown,
}

pub struct TeardownWorker {
    sender: mpsc::Sender<TeardownMsg>,
    handle: Option<JoinHandle<()>>,
}

impl TeardownWorker {
    pub fn spawn(renderer: Arc<dyn Renderer>) -> Result<Self, EngineError> {
        let (sender, receiver) = mpsc::channel::<TeardownMsg>();
        let handle = thread::Builder::new()
            .name(WORKER_NAME.into())
            .spawn(move || teardown_loop(renderer, receiver))
            .map_err(EngineError::TeardownWorker)?;
        Ok(Self {
            sender,
            handle: Some(handle),
        })
    }

    /// Queues `system` for release. Returns immediately.
    pub fn dispatch(&self, system: DetachedSystem) {
        let name = system.name.clone();
        if self.sender.send(TeardownMsg::Release(system)).is_err() {
            warn!(system = %name, "Teardown worker is gone; resources were not released");
        }
    }
}

impl Drop for TeardownWorker {
    fn drop(&mut self) {
        let _ = self.sender.send(TeardownMsg::Shutdown);
        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                warn!("Teardown worker panicked");
            }
        }
    }
}

fn teardown_loop(renderer: Arc<dyn Renderer>, receiver: mpsc::Receiver<TeardownMsg>) {
    while let Ok(msg) = receiver.recv() {
        match msg {
            TeardownMsg::Release(system) => {
                debug!(system = %system.name, nodes = system.nodes.len(), "Releasing detached system");
                renderer.release(&system);
            }
            TeardownMsg::Shutdown => break,
        }
    }
}
