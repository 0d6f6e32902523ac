//! Chrome DevTools Protocol implementation of [`Browser`].
//!
//! `Chrome` launches the executable with `--remote-debugging-port=0`, reads
//! the announced websocket URL from stderr, attaches to the first page
//! target with a flattened session, and serves page-side calls to bound
//! functions.

use std::collections::HashMap;
use std::path::Path;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use serde_json::{json, Value};
use tokio::sync::{mpsc, Mutex as AsyncMutex};
use tracing::{debug, info, trace, warn};

use kiosk_bind::{Handler, Registry};
use kiosk_common::{BrowserError, LaunchError};

use crate::browser::Browser;

mod binding;
mod connection;
mod process;
mod protocol;


use connection::Connection;
use process::ChromeProcess;
use protocol::{decode, ConsoleApiCalled, EvaluateResult, Event, ExceptionThrown, TargetCreated};

/// A running Chrome instance attached to its page target.
pub struct Chrome {
    conn: Arc<Connection>,
    session_id: String,
    target_id: String,
    handlers: Registry,
    /// Per binding name: whether the page side is installed.
    installs: Mutex<HashMap<String, Arc<AsyncMutex<bool>>>>,
    process: ChromeProcess,
}

impl Chrome {
    /// Spawn `executable` with `args` and attach to its page.
    ///
    /// On any failure the process is killed before returning.
    pub async fn launch(
        executable: &Path,
        args: &[String],
        startup_timeout: Duration,
    ) -> Result<Self, LaunchError> {
        let (process, ws_url) = ChromeProcess::spawn(executable, args, startup_timeout).await?;
        debug!(url = %ws_url, pid = ?process.pid(), "devtools endpoint announced");

        match tokio::time::timeout(startup_timeout, Self::attach(process, &ws_url)).await {
            Ok(Ok(chrome)) => {
                info!(target_id = %chrome.target_id, "attached to browser page");
                Ok(chrome)
            }
            Ok(Err(e)) => Err(LaunchError::DevTools(e.to_string())),
            Err(_elapsed) => Err(LaunchError::Timeout(startup_timeout)),
        }
    }

    async fn attach(process: ChromeProcess, ws_url: &str) -> Result<Self, BrowserError> {
        let (conn, mut events) = Connection::connect(ws_url).await?;
        let conn = Arc::new(conn);

        conn.call(None, "Target.setDiscoverTargets", json!({ "discover": true }))
            .await?;
        let target_id = wait_for_page(&mut events).await?;

        let attached = conn
            .call(
                None,
                "Target.attachToTarget",
                json!({ "targetId": target_id, "flatten": true }),
            )
            .await?;
        let session_id = attached
            .get("sessionId")
            .and_then(Value::as_str)
            .ok_or_else(|| BrowserError::Decode("attachToTarget returned no sessionId".into()))?
            .to_string();

        let handlers = Registry::new();
        tokio::spawn(event_loop(
            events,
            Arc::clone(&conn),
            session_id.clone(),
            handlers.clone(),
        ));

        for method in ["Page.enable", "Runtime.enable", "Log.enable"] {
            conn.call(Some(&session_id), method, json!({})).await?;
        }

        Ok(Self {
            conn,
            session_id,
            target_id,
            handlers,
            installs: Mutex::new(HashMap::new()),
            process,
        })
    }

    pub fn pid(&self) -> Option<u32> {
        self.process.pid()
    }

    pub fn target_id(&self) -> &str {
        &self.target_id
    }

    async fn send(&self, method: &str, params: Value) -> Result<Value, BrowserError> {
        self.conn.call(Some(&self.session_id), method, params).await
    }

    fn install_slot(&self, name: &str) -> Arc<AsyncMutex<bool>> {
        let mut slots = self.installs.lock().unwrap_or_else(PoisonError::into_inner);
        Arc::clone(slots.entry(name.to_string()).or_default())
    }

    /// Route `name` to us and define its page-side wrapper, now and on
    /// every later document.
    async fn install_binding(&self, name: &str) -> Result<(), BrowserError> {
        self.send("Runtime.addBinding", json!({ "name": name })).await?;
        let script = binding::shim_script(name);
        self.send(
            "Page.addScriptToEvaluateOnNewDocument",
            json!({ "source": script }),
        )
        .await?;
        self.eval(&script).await?;
        Ok(())
    }
}

#[async_trait]
impl Browser for Chrome {
    async fn load(&self, url: &str) -> Result<(), BrowserError> {
        let result = self.send("Page.navigate", json!({ "url": url })).await?;
        match result.get("errorText").and_then(Value::as_str) {
            Some(text) if !text.is_empty() => Err(BrowserError::Navigation(text.to_string())),
            _ => Ok(()),
        }
    }

    async fn eval(&self, js: &str) -> Result<Value, BrowserError> {
        let result = self
            .send(
                "Runtime.evaluate",
                json!({
                    "expression": js,
                    "awaitPromise": true,
                    "returnByValue": true,
                }),
            )
            .await?;
        decode::<EvaluateResult>(result)?.into_value()
    }

    async fn bind(&self, name: &str, handler: Handler) -> Result<(), BrowserError> {
        // Binds of one name run one at a time, so a rebind never returns
        // before the page routes the name here.
        let slot = self.install_slot(name);
        let mut installed = slot.lock().await;
        if *installed {
            self.handlers.insert(name, handler);
            return Ok(());
        }

        self.handlers.insert(name, handler.clone());
        if let Err(e) = self.install_binding(name).await {
            self.handlers.remove_if_same(name, &handler);
            return Err(e);
        }
        *installed = true;
        debug!(name, "binding installed");
        Ok(())
    }

    async fn kill(&self) -> Result<(), BrowserError> {
        if !self.conn.is_closed() {
            self.conn.close();
        }
        self.process.kill()
    }

    async fn wait(&self) {
        self.process.wait().await
    }
}

async fn wait_for_page(events: &mut mpsc::UnboundedReceiver<Event>) -> Result<String, BrowserError> {
    while let Some(event) = events.recv().await {
        if event.method != "Target.targetCreated" {
            continue;
        }
        let created: TargetCreated = decode(event.params)?;
        if created.target_info.kind == "page" {
            return Ok(created.target_info.target_id);
        }
    }
    Err(BrowserError::Closed)
}

async fn event_loop(
    mut events: mpsc::UnboundedReceiver<Event>,
    conn: Arc<Connection>,
    session_id: String,
    handlers: Registry,
) {
    while let Some(event) = events.recv().await {
        let ours = event.session_id.as_deref() == Some(session_id.as_str());
        match event.method.as_str() {
            "Runtime.bindingCalled" if ours => binding::spawn_call(
                event.params,
                Arc::clone(&conn),
                session_id.clone(),
                handlers.clone(),
            ),
            "Runtime.consoleAPICalled" if ours => match decode::<ConsoleApiCalled>(event.params) {
                Ok(call) => {
                    let text: Vec<String> = call.args.iter().map(|a| a.display()).collect();
                    debug!(kind = %call.kind, "console: {}", text.join(" "));
                }
                Err(e) => trace!(error = %e, "undecodable console event"),
            },
            "Runtime.exceptionThrown" if ours => match decode::<ExceptionThrown>(event.params) {
                Ok(thrown) => {
                    let details = thrown.exception_details;
                    let message = details
                        .exception
                        .map(|e| e.display())
                        .unwrap_or(details.text);
                    warn!("page exception: {message}");
                }
                Err(e) => trace!(error = %e, "undecodable exception event"),
            },
            "Log.entryAdded" if ours => {
                let entry = &event.params["entry"];
                debug!(
                    level = %entry["level"].as_str().unwrap_or("info"),
                    "page log: {}",
                    entry["text"].as_str().unwrap_or_default()
                );
            }
            "Target.detachedFromTarget" | "Inspector.detached" => {
                debug!(method = %event.method, "page session detached");
            }
            _ => trace!(method = %event.method, "devtools event"),
        }
    }
    debug!("devtools event stream ended");
}
