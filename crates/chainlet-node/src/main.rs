use anyhow::Result;
use chainlet_node::{router, AppState};
use clap::Parser;
use std::net::SocketAddr;
use std::sync::atomic::Ordering;
use tracing::{info, Level};

#[derive(Parser, Debug)]
struct Args {
    /// Address to listen on, e.g. 127.0.0.1:8080
    #[arg(long, default_value = "127.0.0.1:8080")]
    listen: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_max_level(Level::DEBUG)
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let args = Args::parse();
    let state = AppState::new();
    info!(node_id = %state.node_id, "node identity generated");

    let app = router(state.clone());
    let addr: SocketAddr = args.listen.parse()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!("chainlet-node listening on http://{addr}");

    let cancel = state.cancel_mining.clone();
    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            let _ = tokio::signal::ctrl_c().await;
            // Abandon any in-flight proof search before the server drains.
            cancel.store(true, Ordering::Relaxed);
        })
        .await?;
    Ok(())
}
