//! Shared utilities for integration tests.

use alloy::primitives::U256;
use axum::{extract::State, routing::post, Json, Router};
use serde_json::{json, Value};
use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tokio::net::TcpListener;

/// Mock JSON-RPC node answering `eth_getBalance`.
#[derive(Clone, Default)]
pub struct RpcNode {
    balances: Arc<Mutex<HashMap<String, U256>>>,
    failing: Arc<AtomicBool>,
    requests: Arc<AtomicUsize>,
}

#[allow(dead_code)]
impl RpcNode {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_balance(&self, address: &str, balance: U256) {
        self.balances
            .lock()
            .unwrap()
            .insert(address.to_lowercase(), balance);
    }

    /// Make every following request fail with a JSON-RPC error.
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    pub fn requests(&self) -> usize {
        self.requests.load(Ordering::SeqCst)
    }

    /// Serve on an ephemeral port and return the endpoint URL.
    pub async fn start(&self) -> String {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let app = Router::new()
            .route("/", post(handle_rpc))
            .with_state(self.clone());
        tokio::spawn(async move {
            let _ = axum::serve(listener, app).await;
        });
        format!("http://{addr}")
    }
}

async fn handle_rpc(State(node): State<RpcNode>, Json(request): Json<Value>) -> Json<Value> {
    node.requests.fetch_add(1, Ordering::SeqCst);
    let id = request["id"].clone();

    if node.failing.load(Ordering::SeqCst) {
        return Json(json!({
            "jsonrpc": "2.0",
            "id": id,
            "error": { "code": -32000, "message": "node unavailable" }
        }));
    }

    match request["method"].as_str() {
        Some("eth_getBalance") => {
            let address = request["params"][0].as_str().unwrap_or_default().to_lowercase();
            let balance = node
                .balances
                .lock()
                .unwrap()
                .get(&address)
                .copied()
                .unwrap_or(U256::ZERO);
            Json(json!({ "jsonrpc": "2.0", "id": id, "result": format!("0x{balance:x}") }))
        }
        _ => Json(json!({
            "jsonrpc": "2.0",
            "id": id,
            "error": { "code": -32601, "message": "method not found" }
        })),
    }
}

/// An endpoint on which nothing is listening.
#[allow(dead_code)]
pub async fn dead_endpoint() -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr: SocketAddr = listener.local_addr().unwrap();
    drop(listener);
    format!("http://{addr}")
}
