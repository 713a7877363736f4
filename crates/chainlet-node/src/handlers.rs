use crate::{peers, AppState};
use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use chainlet_core::{pow, Block, Transaction};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::task::JoinSet;
use tracing::warn;

#[derive(Serialize)]
pub struct Health {
    status: &'static str,
}

pub async fn health() -> Json<Health> {
    Json(Health { status: "ok" })
}

#[derive(Serialize)]
pub struct Message {
    message: String,
}

impl Message {
    fn new(message: impl Into<String>) -> Json<Self> {
        Json(Self {
            message: message.into(),
        })
    }
}

#[derive(Serialize)]
pub struct MineResponse {
    message: &'static str,
    index: u64,
    transactions: Vec<Transaction>,
    proof: u64,
    previous_hash: String,
}

/// Mine one block. The proof search runs on a blocking task without holding
/// the ledger lock; if the tip moved while searching (a concurrent mine or a
/// chain replacement), the result is discarded and the search restarts from
/// the new tip. A search cancelled by shutdown appends nothing.
pub async fn mine(
    State(state): State<Arc<AppState>>,
) -> Result<Json<MineResponse>, StatusCode> {
    loop {
        let (tip_index, last_proof) = {
            let ledger = state.ledger.read().await;
            let tip = ledger.last_block();
            (tip.index, tip.proof)
        };

        let cancel = state.cancel_mining.clone();
        let found =
            tokio::task::spawn_blocking(move || pow::find_proof_cancellable(last_proof, &cancel))
                .await
                .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?;
        let Some(proof) = found else {
            return Err(StatusCode::SERVICE_UNAVAILABLE);
        };

        let mut ledger = state.ledger.write().await;
        let tip = ledger.last_block();
        if tip.index != tip_index || tip.proof != last_proof {
            warn!(tip_index, "chain advanced during proof search, restarting");
            continue;
        }
        let block = ledger.commit_block(proof, &state.node_id);
        return Ok(Json(MineResponse {
            message: "New Block Forged",
            index: block.index,
            transactions: block.transactions,
            proof: block.proof,
            previous_hash: block.previous_hash,
        }));
    }
}

#[derive(Deserialize)]
pub struct NewTransaction {
    sender: String,
    recipient: String,
    amount: i64,
}

pub async fn new_transaction(
    State(state): State<Arc<AppState>>,
    Json(tx): Json<NewTransaction>,
) -> Json<Message> {
    let index = state
        .ledger
        .write()
        .await
        .submit_transaction(tx.sender, tx.recipient, tx.amount);
    Message::new(format!("Transaction will be added to Block {index}"))
}

#[derive(Serialize)]
pub struct ChainResponse {
    chain: Vec<Block>,
    length: u64,
}

/// The wire format peers validate against; `length` is what conflict
/// resolution on the other side compares.
pub async fn full_chain(State(state): State<Arc<AppState>>) -> Json<ChainResponse> {
    let ledger = state.ledger.read().await;
    let chain = ledger.chain().to_vec();
    let length = chain.len() as u64;
    Json(ChainResponse { chain, length })
}

#[derive(Deserialize)]
pub struct RegisterNodes {
    nodes: Vec<String>,
}

#[derive(Serialize)]
pub struct RegisterResponse {
    message: String,
    total_nodes: Vec<String>,
}

pub async fn register_nodes(
    State(state): State<Arc<AppState>>,
    Json(body): Json<RegisterNodes>,
) -> Result<Json<RegisterResponse>, (StatusCode, Json<Message>)> {
    if body.nodes.is_empty() {
        return Err((StatusCode::BAD_REQUEST, Message::new("No nodes provided")));
    }

    let mut ledger = state.ledger.write().await;
    let mut rejected = Vec::new();
    for address in &body.nodes {
        if let Err(err) = ledger.register_peer(address) {
            warn!(%err, "rejecting peer address");
            rejected.push(address.clone());
        }
    }
    if !rejected.is_empty() {
        return Err((
            StatusCode::BAD_REQUEST,
            Message::new(format!(
                "Addresses without a host:port authority: {}",
                rejected.join(", ")
            )),
        ));
    }
    Ok(Json(RegisterResponse {
        message: "New nodes have been added".to_string(),
        total_nodes: ledger.peers().map(str::to_string).collect(),
    }))
}

#[derive(Serialize)]
pub struct ResolveResponse {
    message: &'static str,
    replaced: bool,
    chain: Vec<Block>,
}

/// Conflict resolution: fetch every registered peer's chain in parallel,
/// skip peers that fail or time out, then adopt the longest valid chain if
/// one strictly beats ours.
pub async fn resolve(State(state): State<Arc<AppState>>) -> Json<ResolveResponse> {
    let peer_ids: Vec<String> = state
        .ledger
        .read()
        .await
        .peers()
        .map(str::to_string)
        .collect();

    let mut fetches = JoinSet::new();
    for peer in peer_ids {
        let client = state.http.clone();
        fetches.spawn(async move {
            let result = peers::fetch_chain(&client, &peer).await;
            (peer, result)
        });
    }

    let mut candidates = Vec::new();
    while let Some(joined) = fetches.join_next().await {
        match joined {
            Ok((_, Ok(candidate))) => candidates.push(candidate),
            Ok((peer, Err(err))) => warn!(%peer, %err, "peer fetch failed"),
            Err(err) => warn!(%err, "peer fetch task failed"),
        }
    }

    let mut ledger = state.ledger.write().await;
    let replaced = ledger.resolve_conflicts(candidates);
    let message = if replaced {
        "Our chain was replaced"
    } else {
        "Our chain is authoritative"
    };
    Json(ResolveResponse {
        message,
        replaced,
        chain: ledger.chain().to_vec(),
    })
}
