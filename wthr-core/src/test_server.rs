//! One-shot HTTP responder for exercising the reqwest clients.

use std::sync::{Arc, Mutex};

use axum::{
    Router,
    body::Bytes,
    extract::State,
    http::{HeaderMap, Method, StatusCode, Uri, header::CONTENT_TYPE},
    response::IntoResponse,
};
use tokio::{net::TcpListener, sync::oneshot};

#[derive(Debug)]
pub(crate) struct Captured {
    pub method: Method,
    pub uri: Uri,
    pub headers: HeaderMap,
    pub body: Bytes,
}

#[derive(Clone)]
struct Reply {
    status: StatusCode,
    body: String,
    captured: Arc<Mutex<Option<oneshot::Sender<Captured>>>>,
}

async fn record(
    State(reply): State<Reply>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    body: Bytes,
) -> impl IntoResponse {
    let sender = reply.captured.lock().unwrap().take();
    if let Some(tx) = sender {
        let _ = tx.send(Captured { method, uri, headers, body });
    }
    (reply.status, [(CONTENT_TYPE, "application/json")], reply.body)
}

/// Answer every request with `status` and `body`, and hand back the first
/// request the client sent. Returns the base URL to point a client at.
pub(crate) async fn serve_once(status: u16, body: &str) -> (String, oneshot::Receiver<Captured>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let (tx, rx) = oneshot::channel();

    let reply = Reply {
        status: StatusCode::from_u16(status).unwrap(),
        body: body.to_string(),
        captured: Arc::new(Mutex::new(Some(tx))),
    };
    let app = Router::new().fallback(record).with_state(reply);

    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    (format!("http://{addr}"), rx)
}
