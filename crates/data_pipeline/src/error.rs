use std::path::PathBuf;

use accounting_client::ClientError;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, ExportError>;

/// Every failure is fatal for the run; nothing is retried or skipped.
#[derive(Debug, Error)]
pub enum ExportError {
    #[error("Fetching transactions failed: {0}")]
    FetchFailure(#[source] ClientError),

    #[error("Malformed response: {0}")]
    MalformedResponse(#[source] ClientError),

    #[error("Malformed timestamp '{value}': {reason}")]
    MalformedTimestamp { value: String, reason: String },

    #[error("Writing {} failed: {source}", .path.display())]
    WriteFailure {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Serializing {name} failed: {source}")]
    Serialize {
        name: String,
        #[source]
        source: serde_json::Error,
    },
}

impl From<ClientError> for ExportError {
    fn from(err: ClientError) -> Self {
        match err {
            ClientError::Decode { .. } => ExportError::MalformedResponse(err),
            _ => ExportError::FetchFailure(err),
        }
    }
}
