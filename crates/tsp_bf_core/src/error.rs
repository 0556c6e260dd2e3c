use thiserror::Error as ThisError;

#[derive(Debug, ThisError)]
pub enum Error {
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Csv(#[from] csv::Error),
    #[error(transparent)]
    Http(#[from] reqwest::Error),
    #[error("invalid input: {0}")]
    InvalidInput(String),
    #[error("invalid data: {0}")]
    InvalidData(String),
    #[error("{0}")]
    Other(String),
}

pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    pub fn invalid_input(message: impl Into<String>) -> Self {
        Self::InvalidInput(message.into())
    }

    pub fn invalid_data(message: impl Into<String>) -> Self {
        Self::InvalidData(message.into())
    }

    pub fn other(message: impl Into<String>) -> Self {
        Self::Other(message.into())
    }
}

/// Why a single route could not be scored.
///
/// Scoring failures are recovered by the dispatch engine: they are counted and the
/// route is excluded from the best-so-far comparison.
#[derive(Clone, Debug, PartialEq, ThisError)]
pub enum ScoreError {
    #[error("waypoint {0} is not part of the input set")]
    MissingWaypoint(String),
    #[error("scorer responded with status {status}: {body}")]
    Status { status: u16, body: String },
    #[error("malformed scorer response: {0}")]
    MalformedResponse(String),
    #[error("scorer unreachable: {0}")]
    Transport(String),
    /// The coordinates are finite but the summed length is not.
    #[error("route length is not a finite number")]
    NonFiniteLength,
}

impl ScoreError {
    pub fn missing_waypoint(id: impl Into<String>) -> Self {
        Self::MissingWaypoint(id.into())
    }

    pub fn malformed(message: impl Into<String>) -> Self {
        Self::MalformedResponse(message.into())
    }

    /// Transport errors and 5xx answers may succeed on a later attempt.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Transport(_) => true,
            Self::Status { status, .. } => *status >= 500,
            Self::MissingWaypoint(_) | Self::MalformedResponse(_) | Self::NonFiniteLength => false,
        }
    }
}
