use thiserror::Error;

#[derive(Error, Debug)]
pub enum SnapshotError {
    #[error("Snapshot is frozen: modification is not allowed")]
    ImmutableState,

    #[error("Switch data mismatch: {detail}")]
    MissingSwitchData { detail: &'static str },

    #[error("Shunt data mismatch: {detail}")]
    MissingShuntData { detail: &'static str },

    #[error("Topology repair is not supported for switch-level grids")]
    UnsupportedDetailedTopology,

    #[error("Size mismatch for '{field}': expected {expected}, got {actual}")]
    SizeMismatch {
        field: &'static str,
        expected: usize,
        actual: usize,
    },

    #[error("Invalid grid shape: {detail}")]
    InvalidShape { detail: String },

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

pub type SnapshotResult<T> = Result<T, SnapshotError>;
