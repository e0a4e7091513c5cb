//! In-process HTTP streaming server for integration tests.

use std::convert::Infallible;
use std::time::Duration;

use axum::{body::Body, http::StatusCode, response::IntoResponse, routing::get, Router};
use bytes::Bytes;
use futures::StreamExt;
use tokio::net::TcpListener;
use tokio::sync::oneshot;

pub const FLV_HEADER: &[u8; 9] = b"FLV\x01\x05\x00\x00\x00\x09";
pub const FIXED_BODY_LEN: usize = 1000;

pub struct MockStreamServer {
    pub addr: String,
    shutdown_tx: Option<oneshot::Sender<()>>,
}

impl MockStreamServer {
    pub async fn start() -> Self {
        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .expect("failed to bind mock server");
        let port = listener.local_addr().unwrap().port();
        let (shutdown_tx, shutdown_rx) = oneshot::channel();

        tokio::spawn(async move {
            axum::serve(listener, router())
                .with_graceful_shutdown(async {
                    let _ = shutdown_rx.await;
                })
                .await
                .expect("mock server failed");
        });

        Self {
            addr: format!("http://127.0.0.1:{}", port),
            shutdown_tx: Some(shutdown_tx),
        }
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.addr, path)
    }
}

impl Drop for MockStreamServer {
    fn drop(&mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }
    }
}

fn header_bytes() -> Bytes {
    Bytes::from_static(FLV_HEADER)
}

fn router() -> Router {
    Router::new()
        .route("/fixed.flv", get(fixed))
        .route("/garbage.flv", get(garbage))
        .route("/live.flv", get(live))
        .route("/stall.flv", get(stall))
        .route("/missing.flv", get(|| async { StatusCode::NOT_FOUND }))
}

/// Exactly [`FIXED_BODY_LEN`] bytes, then close.
async fn fixed() -> impl IntoResponse {
    let mut body = FLV_HEADER.to_vec();
    body.resize(FIXED_BODY_LEN, 0x42);
    body
}

async fn garbage() -> impl IntoResponse {
    vec![b'X'; FIXED_BODY_LEN]
}

/// Header followed by a 512-byte chunk every 10 ms, forever.
async fn live() -> impl IntoResponse {
    let header = futures::stream::once(async { Ok::<_, Infallible>(header_bytes()) });
    let tags = futures::stream::unfold((), |()| async {
        tokio::time::sleep(Duration::from_millis(10)).await;
        Some((Ok::<_, Infallible>(Bytes::from(vec![0u8; 512])), ()))
    });
    Body::from_stream(header.chain(tags))
}

/// Header, then nothing ever again.
async fn stall() -> impl IntoResponse {
    let header = futures::stream::once(async { Ok::<_, Infallible>(header_bytes()) });
    Body::from_stream(header.chain(futures::stream::pending()))
}
