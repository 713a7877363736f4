use crate::constants::PEER_FETCH_TIMEOUT;
use anyhow::{Context, Result};
use chainlet_core::{Block, PeerChain};
use serde::Deserialize;

#[derive(Deserialize)]
struct ChainResponse {
    chain: Vec<Block>,
    length: u64,
}

/// Fetch a peer's full chain and reported length from its chain endpoint.
/// Any failure (unreachable, non-success status, malformed payload) is an
/// error for this one peer only; callers skip it and move on.
pub async fn fetch_chain(client: &reqwest::Client, peer: &str) -> Result<PeerChain> {
    let url = format!("http://{peer}/chain");
    let response = client
        .get(&url)
        .timeout(PEER_FETCH_TIMEOUT)
        .send()
        .await
        .with_context(|| format!("request to {url} failed"))?
        .error_for_status()
        .with_context(|| format!("non-success status from {url}"))?;
    let body: ChainResponse = response
        .json()
        .await
        .with_context(|| format!("malformed chain payload from {url}"))?;
    Ok(PeerChain {
        peer: peer.to_string(),
        length: body.length,
        chain: body.chain,
    })
}
