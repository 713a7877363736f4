use thiserror::Error;

#[derive(Debug, Error)]
pub enum LedgerError {
    /// The address did not yield a usable host:port authority, so a chain
    /// fetch against it could never be well-formed.
    #[error("peer address {0:?} has no host:port authority")]
    InvalidPeerAddress(String),
}
