use crate::constants::{GENESIS_PREVIOUS_HASH, GENESIS_PROOF};
use crate::error::LedgerError;
use crate::{canonical_hash, pow, unix_timestamp, Block, Transaction};
use std::collections::BTreeSet;
use tracing::{debug, info};
use url::Url;

/// A peer's chain as reported by its chain endpoint. `length` is what the peer
/// claims; the chain itself is still validated before adoption.
#[derive(Clone, Debug)]
pub struct PeerChain {
    pub peer: String,
    pub length: u64,
    pub chain: Vec<Block>,
}

/// The whole node state: the block chain, transactions waiting for the next
/// block, and the set of known peers. One instance per process, owned by the
/// service composition root and handed to request handlers explicitly.
pub struct Ledger {
    chain: Vec<Block>,
    pending: Vec<Transaction>,
    peers: BTreeSet<String>,
}

impl Ledger {
    /// A fresh ledger holding only the genesis block.
    pub fn new() -> Self {
        let genesis = Block {
            index: 1,
            timestamp: unix_timestamp(),
            transactions: Vec::new(),
            proof: GENESIS_PROOF,
            previous_hash: GENESIS_PREVIOUS_HASH.to_string(),
        };
        Self {
            chain: vec![genesis],
            pending: Vec::new(),
            peers: BTreeSet::new(),
        }
    }

    pub fn chain(&self) -> &[Block] {
        &self.chain
    }

    /// Transactions accepted but not yet mined into a block.
    pub fn pending(&self) -> &[Transaction] {
        &self.pending
    }

    pub fn last_block(&self) -> &Block {
        self.chain.last().expect("chain always holds at least genesis")
    }

    pub fn last_proof(&self) -> u64 {
        self.last_block().proof
    }

    /// Registered peer authorities, in lexicographic order.
    pub fn peers(&self) -> impl Iterator<Item = &str> {
        self.peers.iter().map(String::as_str)
    }

    /// Record a peer by its host:port authority; scheme, path and query are
    /// discarded. Bare `host:port` input is accepted. Idempotent. Addresses
    /// without a usable authority are rejected rather than stored.
    pub fn register_peer(&mut self, address: &str) -> Result<(), LedgerError> {
        let authority = authority_of(address)
            .ok_or_else(|| LedgerError::InvalidPeerAddress(address.to_string()))?;
        self.peers.insert(authority);
        Ok(())
    }

    /// Queue a transaction for the next mined block, preserving arrival order.
    /// Returns the index of the block that will eventually contain it.
    pub fn submit_transaction(&mut self, sender: String, recipient: String, amount: i64) -> u64 {
        self.pending.push(Transaction {
            sender,
            recipient,
            amount,
        });
        self.last_block().index + 1
    }

    /// Run the proof search against the current tip and append the resulting
    /// block. Synchronous; callers that must not block for the whole search
    /// use `last_proof` + `commit_block` and run the search off to the side.
    pub fn mine_next_block(&mut self, rewarded_identity: &str) -> Block {
        let proof = pow::find_proof(self.last_proof());
        self.commit_block(proof, rewarded_identity)
    }

    /// The append half of mining: credit the miner with the reward
    /// transaction (sentinel sender "0"), drain the pending pool into a new
    /// block linked to the current tip, and append it. Callers that searched
    /// for `proof` outside the ledger lock must confirm the tip has not moved
    /// before committing.
    pub fn commit_block(&mut self, proof: u64, rewarded_identity: &str) -> Block {
        self.pending.push(Transaction {
            sender: "0".to_string(),
            recipient: rewarded_identity.to_string(),
            amount: 1,
        });
        let block = Block {
            index: self.last_block().index + 1,
            timestamp: unix_timestamp(),
            transactions: std::mem::take(&mut self.pending),
            proof,
            previous_hash: canonical_hash(self.last_block()),
        };
        info!(index = block.index, proof, "new block forged");
        self.chain.push(block.clone());
        block
    }

    /// Longest-valid-chain consensus over pre-fetched candidates. Candidates
    /// are compared in lexicographic peer order; only a chain strictly longer
    /// than both the local chain and the best candidate so far is considered,
    /// so ties go to the lexicographically-first peer. Returns whether the
    /// local chain was replaced. The pending pool is untouched either way.
    pub fn resolve_conflicts(&mut self, mut candidates: Vec<PeerChain>) -> bool {
        candidates.sort_by(|a, b| a.peer.cmp(&b.peer));

        let mut max_length = self.chain.len() as u64;
        let mut adopted: Option<(String, Vec<Block>)> = None;

        for PeerChain { peer, length, chain } in candidates {
            if length <= max_length {
                debug!(%peer, length, max_length, "candidate chain is not longer");
                continue;
            }
            if !validate_chain(&chain) {
                debug!(%peer, length, "candidate chain failed validation");
                continue;
            }
            max_length = length;
            adopted = Some((peer, chain));
        }

        match adopted {
            Some((peer, chain)) => {
                info!(%peer, length = max_length, "replacing local chain");
                self.chain = chain;
                true
            }
            None => false,
        }
    }
}

impl Default for Ledger {
    fn default() -> Self {
        Self::new()
    }
}

/// Pairwise internal-consistency check over a candidate chain: every block
/// must link to the canonical hash of its predecessor and its proof must
/// satisfy the difficulty predicate against the predecessor's proof.
/// Transaction contents are not inspected. A single-block chain (or shorter)
/// is vacuously valid.
pub fn validate_chain(chain: &[Block]) -> bool {
    chain.windows(2).all(|pair| {
        pair[1].previous_hash == canonical_hash(&pair[0])
            && pow::valid_proof(pair[0].proof, pair[1].proof)
    })
}

/// Extract the host:port authority from a peer address. Input without a
/// scheme (or whose leading segment parses as one, like `localhost:5000`) is
/// retried with an `http://` prefix.
fn authority_of(address: &str) -> Option<String> {
    let parsed = match Url::parse(address) {
        Ok(url) if url.host_str().is_some() => url,
        _ => Url::parse(&format!("http://{address}")).ok()?,
    };
    let host = parsed.host_str()?;
    Some(match parsed.port() {
        Some(port) => format!("{host}:{port}"),
        None => host.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::{GENESIS_PREVIOUS_HASH, GENESIS_PROOF};

    fn mined_chain(identity: &str, blocks: usize) -> Vec<Block> {
        let mut ledger = Ledger::new();
        for _ in 0..blocks {
            ledger.mine_next_block(identity);
        }
        ledger.chain().to_vec()
    }

    #[test]
    fn fresh_ledger_holds_only_genesis() {
        let ledger = Ledger::new();
        assert_eq!(ledger.chain().len(), 1);
        let genesis = ledger.last_block();
        assert_eq!(genesis.index, 1);
        assert_eq!(genesis.previous_hash, GENESIS_PREVIOUS_HASH);
        assert_eq!(genesis.proof, GENESIS_PROOF);
        assert!(genesis.transactions.is_empty());
        assert!(ledger.pending().is_empty());
    }

    #[test]
    fn submit_predicts_containing_block_index() {
        let mut ledger = Ledger::new();
        for _ in 0..3 {
            ledger.mine_next_block("miner");
        }
        assert_eq!(ledger.chain().len(), 4);
        let index =
            ledger.submit_transaction("alice".to_string(), "bob".to_string(), 5);
        assert_eq!(index, 5);
    }

    #[test]
    fn submissions_keep_arrival_order() {
        let mut ledger = Ledger::new();
        ledger.submit_transaction("a".to_string(), "b".to_string(), 1);
        ledger.submit_transaction("c".to_string(), "d".to_string(), 2);
        ledger.submit_transaction("e".to_string(), "f".to_string(), 3);
        let amounts: Vec<i64> = ledger.pending().iter().map(|t| t.amount).collect();
        assert_eq!(amounts, vec![1, 2, 3]);
    }

    #[test]
    fn mining_links_to_previous_block_and_drains_pool() {
        let mut ledger = Ledger::new();
        ledger.submit_transaction("alice".to_string(), "bob".to_string(), 7);
        let tip_before = ledger.last_block().clone();

        let block = ledger.mine_next_block("miner-1");

        assert_eq!(block.index, 2);
        assert_eq!(block.previous_hash, canonical_hash(&tip_before));
        assert!(pow::valid_proof(tip_before.proof, block.proof));
        assert!(ledger.pending().is_empty());

        // Submitted transaction first, then exactly one trailing reward.
        assert_eq!(block.transactions.len(), 2);
        assert_eq!(block.transactions[0].sender, "alice");
        let reward = &block.transactions[1];
        assert_eq!(reward.sender, "0");
        assert_eq!(reward.recipient, "miner-1");
        assert_eq!(reward.amount, 1);
    }

    #[test]
    fn mined_chain_validates() {
        let chain = mined_chain("miner", 2);
        assert_eq!(chain.len(), 3);
        assert!(validate_chain(&chain));
    }

    #[test]
    fn tampered_amount_is_not_detected() {
        // Transaction contents are unchecked; only linkage and work are.
        let mut chain = mined_chain("miner", 2);
        chain[1].transactions[0].amount = 9_999;
        assert!(validate_chain(&chain));
    }

    #[test]
    fn tampered_previous_hash_fails_validation() {
        let mut chain = mined_chain("miner", 2);
        chain[2].previous_hash = "deadbeef".to_string();
        assert!(!validate_chain(&chain));
    }

    #[test]
    fn tampered_proof_fails_validation() {
        let mut chain = mined_chain("miner", 2);
        chain[1].proof += 1;
        assert!(!validate_chain(&chain));
    }

    #[test]
    fn single_block_chain_is_vacuously_valid() {
        let chain = mined_chain("miner", 0);
        assert!(validate_chain(&chain));
    }

    #[test]
    fn peer_registration_is_idempotent_and_strips_url_parts() {
        let mut ledger = Ledger::new();
        ledger.register_peer("http://10.0.0.1:5000/foo?bar=1").unwrap();
        ledger.register_peer("http://10.0.0.1:5000/foo?bar=1").unwrap();
        let peers: Vec<&str> = ledger.peers().collect();
        assert_eq!(peers, vec!["10.0.0.1:5000"]);
    }

    #[test]
    fn bare_host_port_is_accepted() {
        let mut ledger = Ledger::new();
        ledger.register_peer("localhost:5000").unwrap();
        ledger.register_peer("10.0.0.2:5001").unwrap();
        let peers: Vec<&str> = ledger.peers().collect();
        assert_eq!(peers, vec!["10.0.0.2:5001", "localhost:5000"]);
    }

    #[test]
    fn address_without_authority_is_rejected() {
        let mut ledger = Ledger::new();
        let err = ledger.register_peer("/just/a/path").unwrap_err();
        assert!(matches!(err, LedgerError::InvalidPeerAddress(_)));
        assert_eq!(ledger.peers().count(), 0);
    }

    #[test]
    fn resolve_ignores_equal_length_and_invalid_chains() {
        let mut ledger = Ledger::new();
        ledger.mine_next_block("local");
        ledger.mine_next_block("local");
        let local_before = ledger.chain().to_vec();

        // Same length as ours: not strictly longer.
        let peer_a = PeerChain {
            peer: "10.0.0.1:5000".to_string(),
            length: 3,
            chain: mined_chain("a", 2),
        };
        // Longer but corrupted.
        let mut broken = mined_chain("b", 4);
        broken[3].previous_hash = "deadbeef".to_string();
        let peer_b = PeerChain {
            peer: "10.0.0.2:5000".to_string(),
            length: 5,
            chain: broken,
        };

        assert!(!ledger.resolve_conflicts(vec![peer_a, peer_b]));
        assert_eq!(ledger.chain(), local_before.as_slice());
    }

    #[test]
    fn resolve_adopts_longest_valid_chain() {
        let mut ledger = Ledger::new();
        ledger.mine_next_block("local");
        ledger.mine_next_block("local");

        let peer_a = PeerChain {
            peer: "10.0.0.1:5000".to_string(),
            length: 3,
            chain: mined_chain("a", 2),
        };
        let mut broken = mined_chain("b", 4);
        broken[2].proof += 1;
        let peer_b = PeerChain {
            peer: "10.0.0.2:5000".to_string(),
            length: 5,
            chain: broken,
        };
        let winner = mined_chain("c", 5);
        let peer_c = PeerChain {
            peer: "10.0.0.3:5000".to_string(),
            length: 6,
            chain: winner.clone(),
        };

        assert!(ledger.resolve_conflicts(vec![peer_a, peer_b, peer_c]));
        assert_eq!(ledger.chain(), winner.as_slice());
    }

    #[test]
    fn resolve_ties_break_to_lexicographically_first_peer() {
        let mut ledger = Ledger::new();
        let chain_a = mined_chain("a", 3);
        let chain_b = mined_chain("b", 3);

        // Handed over in reverse order; selection must not depend on it.
        let candidates = vec![
            PeerChain {
                peer: "10.0.0.2:5000".to_string(),
                length: 4,
                chain: chain_b,
            },
            PeerChain {
                peer: "10.0.0.1:5000".to_string(),
                length: 4,
                chain: chain_a.clone(),
            },
        ];

        assert!(ledger.resolve_conflicts(candidates));
        assert_eq!(ledger.chain(), chain_a.as_slice());
    }

    #[test]
    fn resolve_leaves_pending_pool_alone() {
        let mut ledger = Ledger::new();
        ledger.submit_transaction("alice".to_string(), "bob".to_string(), 3);

        let peer = PeerChain {
            peer: "10.0.0.1:5000".to_string(),
            length: 4,
            chain: mined_chain("a", 3),
        };
        assert!(ledger.resolve_conflicts(vec![peer]));
        assert_eq!(ledger.pending().len(), 1);
        assert_eq!(ledger.pending()[0].sender, "alice");
    }
}
