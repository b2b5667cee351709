use reqwest::StatusCode;
use thiserror::Error;

/// Errors from the Drive client.
#[derive(Debug, Error)]
pub enum DriveError {
    /// A required setting is missing. Not retryable; fix the environment.
    #[error("missing configuration: {0}")]
    Configuration(&'static str),

    /// A metadata call (list, create, token, session init) returned non-2xx.
    #[error("Drive API returned {status}: {body}")]
    RemoteService { status: StatusCode, body: String },

    /// The provider accepted the call but the response is missing an
    /// expected field.
    #[error("unexpected Drive API response: {0}")]
    Protocol(String),

    /// Transport failure before any HTTP status existed.
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error(transparent)]
    Transfer(#[from] TransferFailure),
}

/// Failures while streaming one asset's bytes. These are recorded per
/// asset; the batch keeps going.
#[derive(Debug, Error)]
pub enum TransferFailure {
    #[error("upload aborted")]
    Aborted,

    /// The batch was canceled before this asset's transfer began.
    #[error("upload canceled before it started")]
    Canceled,

    #[error("could not read {name}: {detail}")]
    Source { name: String, detail: String },

    #[error("network error during upload: {0}")]
    Network(String),

    #[error("upload rejected with {status}: {body}")]
    Rejected { status: StatusCode, body: String },
}

impl DriveError {
    /// Flattened form for per-file status rows and error banners.
    pub fn detail(&self) -> String {
        self.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejected_detail_contains_status_code() {
        let err = DriveError::from(TransferFailure::Rejected {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            body: "backend error".to_string(),
        });
        assert!(err.detail().contains("500"));
    }

    #[test]
    fn aborted_detail_names_the_abort() {
        let err = DriveError::from(TransferFailure::Aborted);
        assert!(err.detail().contains("aborted"));
    }
}
