use std::sync::{Arc, Mutex, PoisonError};

use tracing::info;

use kiosk::{App, LaunchConfig};

use super::hello::data_url;

const PAGE: &str = r#"<html>
  <head><title>Counter</title></head>
  <body onload="start()">
    <h1 id="value">0</h1>
    <button onclick="step(-1)">-</button>
    <button onclick="step(1)">+</button>
    <script>
      async function step(n) {
        await counterAdd(n);
        document.getElementById("value").innerText = await counterValue();
      }
    </script>
  </body>
</html>"#;

/// Shared between concurrent calls from the page.
#[derive(Debug, Default, Clone)]
pub struct Counter(Arc<Mutex<i64>>);

impl Counter {
    pub fn add(&self, n: i64) {
        *self.0.lock().unwrap_or_else(PoisonError::into_inner) += n;
    }

    pub fn value(&self) -> i64 {
        *self.0.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Bind the counter first so `start()` exists when the page's onload runs.
pub async fn start(config: LaunchConfig) -> kiosk::Result<App> {
    let app = kiosk::launch(config).await?;
    let counter = Counter::default();

    app.bind("start", || info!("counter page ready")).await?;
    let c = counter.clone();
    app.bind("counterAdd", move |n: i64| c.add(n)).await?;
    let c = counter.clone();
    app.bind("counterValue", move || c.value()).await?;

    app.load(&data_url(PAGE)).await?;
    Ok(app)
}
