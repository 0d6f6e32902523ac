//! Browser process spawning and supervision.

use std::path::Path;
use std::process::Stdio;
use std::sync::LazyLock;
use std::time::Duration;

use regex::Regex;
use tokio::io::{AsyncBufReadExt, BufReader, Lines};
use tokio::process::{Child, ChildStderr, Command};
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace, warn};

use kiosk_common::{BrowserError, LaunchError};

static DEVTOOLS_LISTENING: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^DevTools listening on (ws://\S+)\s*$").unwrap());

/// Lines of stderr kept for the error message when startup fails.
const STARTUP_TAIL: usize = 5;

/// Extract the browser websocket URL from a stderr line.
pub(crate) fn parse_devtools_url(line: &str) -> Option<String> {
    DEVTOOLS_LISTENING
        .captures(line)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().to_string())
}

/// Handle to a supervised browser process.
///
/// The child itself lives in a supervisor task. Dropping the handle kills
/// the process.
pub(crate) struct ChromeProcess {
    kill_tx: mpsc::Sender<()>,
    exited: CancellationToken,
    pid: Option<u32>,
}

impl ChromeProcess {
    /// Start `executable` and wait until it announces its DevTools endpoint.
    pub(crate) async fn spawn(
        executable: &Path,
        args: &[String],
        startup_timeout: Duration,
    ) -> Result<(Self, String), LaunchError> {
        let mut child = Command::new(executable)
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|source| LaunchError::Spawn {
                path: executable.to_path_buf(),
                source,
            })?;
        let pid = child.id();
        debug!(pid = ?pid, path = %executable.display(), "browser process started");

        let Some(stderr) = child.stderr.take() else {
            return Err(LaunchError::DevTools("stderr was not captured".into()));
        };
        let mut lines = BufReader::new(stderr).lines();

        let ws_url = match tokio::time::timeout(startup_timeout, read_devtools_url(&mut lines)).await
        {
            Ok(Ok(url)) => url,
            Ok(Err(e)) => {
                let _ = child.kill().await;
                return Err(e);
            }
            Err(_elapsed) => {
                let _ = child.kill().await;
                return Err(LaunchError::Timeout(startup_timeout));
            }
        };

        // Keep the pipe drained so the browser never blocks on a full stderr.
        tokio::spawn(async move {
            while let Ok(Some(line)) = lines.next_line().await {
                trace!(target: "kiosk_cdp::stderr", "{line}");
            }
        });

        let (kill_tx, kill_rx) = mpsc::channel(1);
        let exited = CancellationToken::new();
        tokio::spawn(supervise(child, kill_rx, exited.clone()));

        Ok((
            Self {
                kill_tx,
                exited,
                pid,
            },
            ws_url,
        ))
    }

    pub(crate) fn pid(&self) -> Option<u32> {
        self.pid
    }

    /// Request termination. Fails with `Closed` once the process is gone.
    pub(crate) fn kill(&self) -> Result<(), BrowserError> {
        if self.exited.is_cancelled() {
            return Err(BrowserError::Closed);
        }
        match self.kill_tx.try_send(()) {
            // A request already queued means the kill is on its way.
            Ok(()) | Err(TrySendError::Full(())) => Ok(()),
            Err(TrySendError::Closed(())) => Err(BrowserError::Closed),
        }
    }

    pub(crate) async fn wait(&self) {
        self.exited.cancelled().await;
    }
}

async fn read_devtools_url(lines: &mut Lines<BufReader<ChildStderr>>) -> Result<String, LaunchError> {
    let mut tail = Vec::with_capacity(STARTUP_TAIL);
    while let Some(line) = lines
        .next_line()
        .await
        .map_err(|e| LaunchError::DevTools(e.to_string()))?
    {
        if let Some(url) = parse_devtools_url(&line) {
            return Ok(url);
        }
        trace!(target: "kiosk_cdp::stderr", "{line}");
        if tail.len() == STARTUP_TAIL {
            tail.remove(0);
        }
        tail.push(line);
    }
    Err(LaunchError::DevTools(format!(
        "browser exited before announcing an endpoint: {}",
        tail.join(" | ")
    )))
}

/// Own the child until it exits, honouring kill requests. A closed request
/// channel means the handle was dropped and also kills the child.
async fn supervise(mut child: Child, mut kill_rx: mpsc::Receiver<()>, exited: CancellationToken) {
    let status = tokio::select! {
        status = child.wait() => status,
        request = kill_rx.recv() => {
            if request.is_none() {
                debug!("browser handle dropped, killing process");
            }
            if let Err(e) = child.start_kill() {
                debug!(error = %e, "kill request failed");
            }
            child.wait().await
        }
    };
    match status {
        Ok(status) => debug!(%status, "browser process exited"),
        Err(e) => warn!(error = %e, "failed to wait for browser process"),
    }
    exited.cancel();
}
