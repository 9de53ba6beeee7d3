// keep_alive.rs - Liveness endpoint for external uptime pingers
//
// Serves a static "alive" response on GET / from a background task. It has
// no access to bot state.

use std::net::SocketAddr;

use axum::routing::get;
use axum::Router;
use tokio::task::JoinHandle;

pub const ALIVE_RESPONSE: &str = "Bot is alive!";

pub fn router() -> Router {
    Router::new().route("/", get(alive))
}

async fn alive() -> &'static str {
    ALIVE_RESPONSE
}

pub fn spawn(port: u16) -> JoinHandle<()> {
    tokio::spawn(async move {
        if let Err(e) = serve(port).await {
            log::error!("[KEEPALIVE] Liveness server stopped: {}", e);
        }
    })
}

async fn serve(port: u16) -> std::io::Result<()> {
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let listener = tokio::net::TcpListener::bind(addr).await?;
    log::info!("[KEEPALIVE] Listening on {}", addr);
    axum::serve(listener, router()).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use tower::ServiceExt;

    #[tokio::test]
    async fn test_root_reports_alive() {
        let response = router()
            .oneshot(Request::builder().uri("/").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let body = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        assert_eq!(&body[..], ALIVE_RESPONSE.as_bytes());
    }

    #[tokio::test]
    async fn test_other_paths_are_not_found() {
        let response = router()
            .oneshot(Request::builder().uri("/status").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }
}
