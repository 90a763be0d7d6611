use std::fmt;

/// Coarse failure classes. All of them degrade to "fewer notes returned";
/// none is surfaced as a blocking failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    NetworkFailure,
    ParseFailure,
    PartialDataFailure,
    Storage,
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            FailureKind::NetworkFailure => "network",
            FailureKind::ParseFailure => "parse",
            FailureKind::PartialDataFailure => "partial-data",
            FailureKind::Storage => "storage",
        };
        f.write_str(name)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum NotesError {
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("Request to {url} failed with status {status}")]
    Status { url: String, status: u16 },

    #[error("Parse error: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Malformed record {id}: {message}")]
    Malformed { id: String, message: String },

    #[error("Ledger query rejected: {0}")]
    Query(String),

    #[error("{failed} of {total} author blobs could not be fetched")]
    PartialData { failed: usize, total: usize },

    #[error("Cache I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl NotesError {
    pub fn kind(&self) -> FailureKind {
        match self {
            NotesError::Network(_) | NotesError::Status { .. } | NotesError::Query(_) => {
                FailureKind::NetworkFailure
            }
            NotesError::Parse(_) | NotesError::Malformed { .. } => FailureKind::ParseFailure,
            NotesError::PartialData { .. } => FailureKind::PartialDataFailure,
            NotesError::Io(_) => FailureKind::Storage,
        }
    }
}

pub type Result<T, E = NotesError> = std::result::Result<T, E>;
