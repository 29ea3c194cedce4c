//! Error types for CEP analysis operations

use thiserror::Error;

#[derive(Error, Debug)]
pub enum CepError {
    #[error("Chip index out of range: {index} not in [0, {max})")]
    ChipOutOfRange { index: usize, max: usize },

    #[error("Row width mismatch in tree '{tree}': expected {expected}, got {got}")]
    RowWidthMismatch {
        tree: String,
        expected: usize,
        got: usize,
    },

    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    #[error("No MC truth available for a selected event (run {run}, event {event})")]
    MissingMcTruth { run: u32, event: u64 },

    #[error("No MC particle for selected track {track} (label {label})")]
    MissingMcParticle { track: usize, label: i32 },

    #[error("Unknown output slot {0}")]
    UnknownSlot(usize),

    #[error("Malformed event on line {line}: {message}")]
    MalformedEvent { line: usize, message: String },

    #[error("Serialization error: {0}")]
    SerializationError(String),

    #[error("IO error: {0}")]
    Io(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

impl From<serde_json::Error> for CepError {
    fn from(err: serde_json::Error) -> Self {
        CepError::SerializationError(err.to_string())
    }
}
