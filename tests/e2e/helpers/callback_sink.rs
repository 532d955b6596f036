use axum::{extract::State, routing::post, Json, Router};
use serde_json::Value;
use std::sync::{Arc, Mutex};

/// Captures federation callback POSTs so tests can assert on delivery.
pub struct CallbackSink {
    pub url: String,
    received: Arc<Mutex<Vec<Value>>>,
}

impl CallbackSink {
    pub async fn start() -> Self {
        let received: Arc<Mutex<Vec<Value>>> = Arc::new(Mutex::new(Vec::new()));

        let app = Router::new()
            .route("/callback", post(capture))
            .with_state(received.clone());

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let url = format!("http://{}/callback", listener.local_addr().unwrap());
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self { url, received }
    }

    pub fn received(&self) -> Vec<Value> {
        self.received.lock().unwrap().clone()
    }

    /// Wait until at least `count` callbacks arrive, panicking after 5s.
    pub async fn wait_for(&self, count: usize) {
        let deadline = tokio::time::Instant::now() + std::time::Duration::from_secs(5);
        while self.received.lock().unwrap().len() < count {
            assert!(
                tokio::time::Instant::now() < deadline,
                "expected {} callbacks, got {}",
                count,
                self.received.lock().unwrap().len()
            );
            tokio::time::sleep(std::time::Duration::from_millis(10)).await;
        }
    }
}

async fn capture(State(received): State<Arc<Mutex<Vec<Value>>>>, Json(body): Json<Value>) {
    received.lock().unwrap().push(body);
}
