use tokio_util::sync::CancellationToken;

/// Read-only view of an app's termination signal.
///
/// Fires once, when the browser process exits. Any number of clones may
/// wait on it, before or after it fired.
#[derive(Debug, Clone)]
pub struct DoneSignal(CancellationToken);

impl DoneSignal {
    pub(crate) fn new(token: CancellationToken) -> Self {
        Self(token)
    }

    /// Wait until the process has exited. Returns at once if it already has.
    pub async fn wait(&self) {
        self.0.cancelled().await
    }

    pub fn is_done(&self) -> bool {
        self.0.is_cancelled()
    }
}
