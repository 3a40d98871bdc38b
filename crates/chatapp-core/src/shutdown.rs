//! Cooperative shutdown flag.
//!
//! A watch channel wrapped so the two halves read as what they are: the
//! driver holds the [`ShutdownHandle`], every long-running task holds a
//! [`ShutdownSignal`] clone and selects on it between blocking points.

use tokio::sync::watch;

/// Create a linked shutdown handle/signal pair.
pub fn shutdown_channel() -> (ShutdownHandle, ShutdownSignal) {
    let (tx, rx) = watch::channel(false);
    (ShutdownHandle { tx }, ShutdownSignal { rx })
}

/// Write half: flips the stop flag. Idempotent.
pub struct ShutdownHandle {
    tx: watch::Sender<bool>,
}

impl ShutdownHandle {
    /// Request shutdown. Calling again is a no-op.
    pub fn shutdown(&self) {
        let _ = self.tx.send(true);
    }
}

/// Read half: observed cooperatively by listeners and drivers.
#[derive(Clone)]
pub struct ShutdownSignal {
    rx: watch::Receiver<bool>,
}

impl ShutdownSignal {
    /// Whether shutdown has been requested.
    pub fn is_shutdown(&self) -> bool {
        *self.rx.borrow()
    }

    /// Resolve once shutdown is requested.
    ///
    /// Also resolves if the handle is dropped, which only happens when the
    /// owning runtime is already tearing down.
    pub async fn recv(&mut self) {
        while !*self.rx.borrow() {
            if self.rx.changed().await.is_err() {
                return;
            }
        }
    }
}
