use thiserror::Error;

/// Failures while encoding or decoding a binary grid snapshot.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum SnapshotError {
    #[error("grid of {width}x{height} does not fit in a snapshot header")]
    DimensionsTooLarge { width: usize, height: usize },
    #[error("snapshot is truncated: expected at least {expected} bytes, got {got}")]
    Truncated { expected: usize, got: usize },
    #[error("snapshot has {got} bytes but its header describes {expected}")]
    SizeMismatch { expected: usize, got: usize },
    #[error("unknown terrain byte {0}")]
    UnknownTerrain(u8),
    #[error("unknown structure byte {0}")]
    UnknownStructure(u8),
}

/// Failures while retrieving paths through a [PathData](crate::PathData).
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum PathDataError {
    #[error("path worker is no longer running")]
    WorkerDisconnected,
    #[error("worker reply for generation {got} arrived after generation {expected} started")]
    Stale { expected: u64, got: u64 },
    #[error(transparent)]
    Snapshot(#[from] SnapshotError),
}
