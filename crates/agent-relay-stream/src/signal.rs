use tokio::sync::watch;

/// Creates a completion signal and the guard that sets it.
///
/// The guard sets the signal when it is dropped, so moving it into the
/// task wrapper covers success, failure, panic unwinding and abort alike.
pub fn completion_signal() -> (SignalGuard, CompletionSignal) {
    let (tx, rx) = watch::channel(false);
    (SignalGuard { tx }, CompletionSignal { rx })
}

/// Write side of a completion signal. Sets the signal on drop.
#[derive(Debug)]
pub struct SignalGuard {
    tx: watch::Sender<bool>,
}

impl SignalGuard {
    /// Sets the signal. Returns `false` when it was already set.
    pub fn set(&self) -> bool {
        self.tx.send_if_modified(|set| {
            if *set {
                false
            } else {
                *set = true;
                true
            }
        })
    }
}

impl Drop for SignalGuard {
    fn drop(&mut self) {
        self.set();
    }
}

/// Read side of a completion signal. Reads never consume the flag.
#[derive(Clone, Debug)]
pub struct CompletionSignal {
    rx: watch::Receiver<bool>,
}

impl CompletionSignal {
    /// Returns whether the task has reached a terminal state.
    pub fn is_set(&self) -> bool {
        *self.rx.borrow()
    }

    /// Waits until the signal is set.
    ///
    /// A dropped guard always sets the signal first, so a closed channel is
    /// treated as set.
    pub async fn wait(&mut self) {
        if let Err(closed) = self.rx.wait_for(|set| *set).await {
            tracing::trace!(%closed, "completion sender dropped");
        }
    }
}
