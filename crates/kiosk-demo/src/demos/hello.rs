use kiosk::{App, LaunchConfig};

const PAGE: &str = r#"<html>
  <head><title>Hello</title></head>
  <body><h1>Hello, world!</h1></body>
</html>"#;

pub async fn start(config: LaunchConfig) -> kiosk::Result<App> {
    kiosk::launch(config.with_url(data_url(PAGE))).await
}

/// Inline HTML as a `data:` URL.
pub fn data_url(html: &str) -> String {
    format!("data:text/html,{}", urlencoding::encode(html))
}
