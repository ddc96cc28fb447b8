//! Static Website Server
//!
//! Serves the bot's landing page from a directory on disk, `index.html`
//! at `/`. Runs on its own task beside the bot and shares no state with it.

use anyhow::{Context, Result};
use axum::Router;
use std::net::SocketAddr;
use std::path::PathBuf;
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

pub struct WebServer {
    port: u16,
    website_dir: PathBuf,
}

impl WebServer {
    pub fn new(port: u16, website_dir: impl Into<PathBuf>) -> Self {
        Self {
            port,
            website_dir: website_dir.into(),
        }
    }

    /// Build the router with static files and request logging
    pub fn build_router(&self) -> Router {
        let files = ServeDir::new(&self.website_dir).append_index_html_on_directories(true);

        Router::new()
            .fallback_service(files)
            .layer(TraceLayer::new_for_http())
    }

    /// Bind and serve until the process exits
    pub async fn run(self) -> Result<()> {
        if !self.website_dir.join("index.html").is_file() {
            warn!("No index.html in {}", self.website_dir.display());
        }

        let addr = SocketAddr::from(([0, 0, 0, 0], self.port));
        let router = self.build_router();

        let listener = tokio::net::TcpListener::bind(addr)
            .await
            .with_context(|| format!("Failed to bind web server to {}", addr))?;

        info!("🌐 Starting web server on port {}", self.port);
        axum::serve(listener, router).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::{to_bytes, Body};
    use axum::http::{Request, StatusCode};
    use tempfile::TempDir;
    use tower::ServiceExt;

    fn site() -> TempDir {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("index.html"), "<!DOCTYPE html><title>Mirai</title>").unwrap();
        std::fs::create_dir_all(dir.path().join("assets/js")).unwrap();
        std::fs::write(dir.path().join("assets/js/script.js"), "console.log('hi');").unwrap();
        dir
    }

    async fn get(server: &WebServer, uri: &str) -> (StatusCode, String) {
        let response = server
            .build_router()
            .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();
        let status = response.status();
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, String::from_utf8_lossy(&body).into_owned())
    }

    #[tokio::test]
    async fn test_index_served_at_root() {
        let dir = site();
        let server = WebServer::new(0, dir.path());

        let (status, body) = get(&server, "/").await;
        assert_eq!(status, StatusCode::OK);
        assert!(body.contains("<title>Mirai</title>"));
    }

    #[tokio::test]
    async fn test_nested_asset() {
        let dir = site();
        let server = WebServer::new(0, dir.path());

        let (status, body) = get(&server, "/assets/js/script.js").await;
        assert_eq!(status, StatusCode::OK);
        assert!(body.contains("console.log"));
    }

    #[tokio::test]
    async fn test_unknown_file_returns_404() {
        let dir = site();
        let server = WebServer::new(0, dir.path());

        let (status, _) = get(&server, "/nonexistent.js").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }
}
