use axum::{
    routing::{get, post},
    Router,
};
use chainlet_core::Ledger;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;
use tokio::sync::RwLock;
use tower_http::trace::TraceLayer;

pub mod constants;
pub mod handlers;
pub mod peers;

/// Everything a request handler needs: the single Ledger instance behind one
/// lock, this node's mining identity, an HTTP client for peer fetches, and
/// the flag that aborts an in-flight proof search on shutdown.
pub struct AppState {
    pub ledger: RwLock<Ledger>,
    pub node_id: String,
    pub http: reqwest::Client,
    pub cancel_mining: Arc<AtomicBool>,
}

impl AppState {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            ledger: RwLock::new(Ledger::new()),
            node_id: random_node_id(),
            http: reqwest::Client::new(),
            cancel_mining: Arc::new(AtomicBool::new(false)),
        })
    }
}

/// The identity credited by this node's reward transactions, generated once
/// per process.
fn random_node_id() -> String {
    let bytes: [u8; 16] = rand::random();
    hex::encode(bytes)
}

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(handlers::health))
        .route("/mine", get(handlers::mine))
        .route("/transactions/new", post(handlers::new_transaction))
        .route("/chain", get(handlers::full_chain))
        .route("/nodes/register", post(handlers::register_nodes))
        .route("/nodes/resolve", get(handlers::resolve))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
