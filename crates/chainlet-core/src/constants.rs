/// Proof baked into the genesis block. Not a solved puzzle; the proof chain
/// starts from it but never checks it.
pub const GENESIS_PROOF: u64 = 100;

/// Previous-hash sentinel for the genesis block, distinguishable from any real
/// 64-char digest.
pub const GENESIS_PREVIOUS_HASH: &str = "1";

/// A digest must start with this prefix for a proof to count. Four hex zeros
/// means ~65536 expected attempts per block.
pub const DIFFICULTY_PREFIX: &str = "0000";

/// How many proof candidates to try between cancellation checks.
pub const CANCEL_CHECK_INTERVAL: u64 = 1024;
