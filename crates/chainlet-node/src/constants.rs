use std::time::Duration;

/// Per-peer deadline for fetching a remote chain during conflict resolution.
/// One unreachable peer must not stall the whole fan-out.
pub(crate) const PEER_FETCH_TIMEOUT: Duration = Duration::from_secs(5);
