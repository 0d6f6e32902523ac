use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use serde_json::{json, Value};
use tokio_util::sync::CancellationToken;

use kiosk_bind::{Handler, Registry};
use kiosk_cdp::Browser;
use kiosk_common::{BindError, BrowserError, KioskError};

use super::{App, AppState};
use crate::config::LaunchConfig;

/// In-memory browser: `eval` parses its input as JSON, `kill` ends the
/// "process" unless told to ignore it.
#[derive(Default)]
struct FakeBrowser {
    exited: CancellationToken,
    handlers: Registry,
    loads: Mutex<Vec<String>>,
    kills: AtomicUsize,
    fail_bind: AtomicBool,
}

impl FakeBrowser {
    fn exit(&self) {
        self.exited.cancel();
    }
}

#[async_trait]
impl Browser for FakeBrowser {
    async fn load(&self, url: &str) -> Result<(), BrowserError> {
        if url.starts_with("bad:") {
            return Err(BrowserError::Navigation("net::ERR_ABORTED".into()));
        }
        self.loads.lock().unwrap().push(url.to_string());
        Ok(())
    }

    async fn eval(&self, js: &str) -> Result<Value, BrowserError> {
        serde_json::from_str(js).map_err(|e| BrowserError::Evaluation(e.to_string()))
    }

    async fn bind(&self, name: &str, handler: Handler) -> Result<(), BrowserError> {
        if self.fail_bind.load(Ordering::SeqCst) {
            return Err(BrowserError::Closed);
        }
        self.handlers.insert(name, handler);
        Ok(())
    }

    async fn kill(&self) -> Result<(), BrowserError> {
        self.kills.fetch_add(1, Ordering::SeqCst);
        if self.exited.is_cancelled() {
            return Err(BrowserError::Closed);
        }
        self.exited.cancel();
        Ok(())
    }

    async fn wait(&self) {
        self.exited.cancelled().await
    }
}

fn start(owned_profile: Option<std::path::PathBuf>) -> (Arc<FakeBrowser>, App) {
    let fake = Arc::new(FakeBrowser::default());
    let app = App::with_browser(fake.clone(), owned_profile);
    (fake, app)
}

async fn within<F: std::future::Future>(f: F) -> F::Output {
    tokio::time::timeout(Duration::from_secs(2), f)
        .await
        .expect("timed out")
}

#[tokio::test]
async fn done_fires_on_external_exit() {
    let (fake, app) = start(None);
    let done = app.done();
    assert!(!done.is_done());
    assert_eq!(app.state(), AppState::Running);

    fake.exit();
    within(done.wait()).await;
    assert!(done.is_done());
    within(app.done().wait()).await;
    assert_eq!(app.state(), AppState::Closed);
}

#[tokio::test]
async fn done_wakes_every_waiter() {
    let (fake, app) = start(None);
    let waiters: Vec<_> = (0..3)
        .map(|_| {
            let done = app.done();
            tokio::spawn(async move { done.wait().await })
        })
        .collect();

    fake.exit();
    for waiter in waiters {
        within(waiter).await.unwrap();
    }
}

#[tokio::test]
async fn close_kills_and_waits() {
    let (fake, app) = start(None);
    within(app.close()).await.unwrap();

    assert_eq!(fake.kills.load(Ordering::SeqCst), 1);
    assert!(app.done().is_done());
    assert_eq!(app.state(), AppState::Closed);
}

#[tokio::test]
async fn close_after_external_death() {
    let (fake, app) = start(None);
    fake.exit();
    within(app.done().wait()).await;

    // kill reports the process gone; close still succeeds.
    within(app.close()).await.unwrap();
    assert_eq!(fake.kills.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn close_twice_is_fine() {
    let (_fake, app) = start(None);
    within(app.close()).await.unwrap();
    within(app.close()).await.unwrap();
    assert_eq!(app.state(), AppState::Closed);
}

#[tokio::test]
async fn close_removes_owned_profile() {
    let root = tempfile::tempdir().unwrap();
    let profile = root.path().join("kiosk-profile");
    std::fs::create_dir(&profile).unwrap();
    std::fs::write(profile.join("Preferences"), b"{}").unwrap();

    let (_fake, app) = start(Some(profile.clone()));
    within(app.close()).await.unwrap();
    assert!(!profile.exists());
}

#[tokio::test]
async fn close_keeps_supplied_profile() {
    let profile = tempfile::tempdir().unwrap();
    let resolved = LaunchConfig::new(100, 100)
        .with_profile_dir(profile.path())
        .resolve()
        .unwrap();

    let (_fake, app) = start(resolved.owned_profile());
    within(app.close()).await.unwrap();
    assert!(profile.path().is_dir());
    assert_eq!(app.state(), AppState::Closed);
}

#[tokio::test]
async fn close_removes_created_profile() {
    let root = tempfile::tempdir().unwrap();
    let resolved = LaunchConfig::new(100, 100).resolve_in(root.path()).unwrap();
    let profile = resolved.profile.path.clone();
    assert!(profile.is_dir());

    let (_fake, app) = start(resolved.owned_profile());
    within(app.close()).await.unwrap();
    assert!(!profile.exists());
}

#[cfg(unix)]
#[tokio::test]
async fn failed_profile_removal_is_reported_until_it_succeeds() {
    let root = tempfile::tempdir().unwrap();
    // A plain file where the profile directory should be cannot be removed
    // as a directory.
    let profile = root.path().join("not-a-dir");
    std::fs::write(&profile, b"").unwrap();

    let (_fake, app) = start(Some(profile.clone()));
    let err = within(app.close()).await.unwrap_err();
    assert!(matches!(err, KioskError::Io(_)), "{err:?}");
    assert_eq!(app.state(), AppState::Closing);
    assert!(within(app.close()).await.is_err());
    assert_eq!(app.state(), AppState::Closing);

    std::fs::remove_file(&profile).unwrap();
    within(app.close()).await.unwrap();
    assert_eq!(app.state(), AppState::Closed);
}

#[tokio::test]
async fn owned_profile_already_gone() {
    let root = tempfile::tempdir().unwrap();
    let (_fake, app) = start(Some(root.path().join("never-created")));
    within(app.close()).await.unwrap();
}

#[tokio::test]
async fn external_exit_leaves_cleanup_pending() {
    let root = tempfile::tempdir().unwrap();
    let profile = root.path().join("p");
    std::fs::create_dir(&profile).unwrap();

    let (fake, app) = start(Some(profile.clone()));
    fake.exit();
    within(app.done().wait()).await;
    assert_eq!(app.state(), AppState::Closing);

    within(app.close()).await.unwrap();
    assert_eq!(app.state(), AppState::Closed);
    assert!(!profile.exists());
}

#[tokio::test]
async fn drop_kills_browser() {
    let (fake, app) = start(None);
    drop(app);
    within(fake.exited.cancelled()).await;
    assert_eq!(fake.kills.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn bind_reaches_browser_and_registry() {
    let (fake, app) = start(None);
    app.bind("add", |a: i64, b: i64| a + b).await.unwrap();

    let reply = fake.handlers.dispatch("add", vec![json!(2), json!(3)]);
    assert_eq!(reply.value, Some(json!(5)));
    let bound = app.bindings();
    assert_eq!(bound.len(), 1);
    assert_eq!(bound[0].0, "add");
    assert_eq!(bound[0].1.arity(), 2);
}

#[tokio::test]
async fn rebind_replaces_function() {
    let (fake, app) = start(None);
    app.bind("answer", || 1).await.unwrap();
    app.bind("answer", || 2).await.unwrap();

    let reply = fake.handlers.dispatch("answer", vec![]);
    assert_eq!(reply.value, Some(json!(2)));
    assert_eq!(app.bindings().len(), 1);
}

#[tokio::test]
async fn bind_rejects_bad_names() {
    let (fake, app) = start(None);
    for name in ["", "1st", "has space", "a-b"] {
        let err = app.bind(name, || ()).await.unwrap_err();
        assert!(
            matches!(err, KioskError::Bind(BindError::InvalidBinding(_))),
            "{name:?}: {err:?}"
        );
    }
    assert!(fake.handlers.is_empty());
    assert!(app.bindings().is_empty());
}

#[tokio::test]
async fn bind_failure_leaves_registry_untouched() {
    let (fake, app) = start(None);
    fake.fail_bind.store(true, Ordering::SeqCst);

    let err = app.bind("add", |a: i64, b: i64| a + b).await.unwrap_err();
    assert!(matches!(err, KioskError::Browser(BrowserError::Closed)));
    assert!(app.bindings().is_empty());
}

#[tokio::test]
async fn bind_handler_raw() {
    let (fake, app) = start(None);
    app.bind_handler("count", Handler::raw(|args: Vec<Value>| args.len()))
        .await
        .unwrap();
    let reply = fake.handlers.dispatch("count", vec![json!(1), json!("x")]);
    assert_eq!(reply.value, Some(json!(2)));
}

#[tokio::test]
async fn load_forwards() {
    let (fake, app) = start(None);
    app.load("https://example.com").await.unwrap();
    assert_eq!(*fake.loads.lock().unwrap(), vec!["https://example.com"]);

    let err = app.load("bad://x").await.unwrap_err();
    assert!(matches!(err, KioskError::Browser(BrowserError::Navigation(_))));
}

#[tokio::test]
async fn eval_value_and_error() {
    let (_fake, app) = start(None);
    let v = app.eval(r#"{"n": 5, "s": "hi"}"#).await;
    assert!(v.err().is_none());
    assert_eq!(v.object()["n"].int(), 5);

    let v = app.eval("not json").await;
    assert!(matches!(v.err(), Some(BrowserError::Evaluation(_))));
    assert_eq!(v.string(), "");
}
