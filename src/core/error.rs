use std::time::Duration;
use thiserror::Error;

/// Failure talking to a durable medium (local file or remote object).
#[derive(Error, Debug)]
pub enum MediumError {
    #[error("I/O error on '{path}': {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("HTTP request to '{url}' failed: {source}")]
    Http {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("HTTP status {status} from '{url}'")]
    Status { url: String, status: u16 },

    #[error("Medium access timed out after {0:?}")]
    Timeout(Duration),

    #[error("Malformed document: {0}")]
    Codec(#[from] serde_json::Error),
}

#[derive(Error, Debug)]
pub enum GokiError {
    #[error("User '{0}' not found")]
    UserNotFound(String),

    #[error("User already exists: {0}")]
    UserAlreadyExists(String),

    #[error("Could not open {store} store: {source}")]
    StoreOpen {
        store: &'static str,
        #[source]
        source: MediumError,
    },

    #[error("Could not save {store} store: {source}")]
    StoreSave {
        store: &'static str,
        #[source]
        source: MediumError,
    },

    #[error("Could not close {store} store: {source}")]
    StoreClose {
        store: &'static str,
        #[source]
        source: MediumError,
    },

    #[error("Store internal error: {0}")]
    Internal(String),

    #[error("Invalid period: {0}")]
    InvalidPeriod(String),

    #[error("Counter overflow: {0}")]
    CounterOverflow(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Could not shut down ({})", describe_shutdown(.users, .activities))]
    Shutdown {
        users: Option<Box<GokiError>>,
        activities: Option<Box<GokiError>>,
    },
}

/// Coarse classification for callers that only need to pick a response.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    NotFound,
    AlreadyExists,
    Open,
    Save,
    Close,
    Internal,
    InvalidInput,
    Shutdown,
}

impl GokiError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::UserNotFound(_) => ErrorKind::NotFound,
            Self::UserAlreadyExists(_) => ErrorKind::AlreadyExists,
            Self::StoreOpen { .. } => ErrorKind::Open,
            Self::StoreSave { .. } => ErrorKind::Save,
            Self::StoreClose { .. } => ErrorKind::Close,
            Self::Internal(_) => ErrorKind::Internal,
            Self::InvalidPeriod(_) | Self::CounterOverflow(_) | Self::Config(_) => {
                ErrorKind::InvalidInput
            }
            Self::Shutdown { .. } => ErrorKind::Shutdown,
        }
    }

    /// True for misses and duplicates, the two kinds a login flow recovers from.
    pub fn is_expected(&self) -> bool {
        matches!(self.kind(), ErrorKind::NotFound | ErrorKind::AlreadyExists)
    }
}

fn describe_shutdown(
    users: &Option<Box<GokiError>>,
    activities: &Option<Box<GokiError>>,
) -> String {
    let describe = |outcome: &Option<Box<GokiError>>| match outcome {
        Some(err) => err.to_string(),
        None => "ok".to_string(),
    };
    format!("users: {}; activities: {}", describe(users), describe(activities))
}

pub type Result<T> = std::result::Result<T, GokiError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_classification() {
        assert_eq!(GokiError::UserNotFound("u1".into()).kind(), ErrorKind::NotFound);
        assert!(GokiError::UserAlreadyExists("u1".into()).is_expected());

        let save = GokiError::StoreSave {
            store: "user",
            source: MediumError::Timeout(Duration::from_secs(10)),
        };
        assert_eq!(save.kind(), ErrorKind::Save);
        assert!(!save.is_expected());
    }

    #[test]
    fn test_shutdown_message_names_both_stores() {
        let err = GokiError::Shutdown {
            users: None,
            activities: Some(Box::new(GokiError::StoreClose {
                store: "activity",
                source: MediumError::Status {
                    url: "http://bucket/activityDB.json".into(),
                    status: 503,
                },
            })),
        };

        let message = err.to_string();
        assert!(message.contains("users: ok"));
        assert!(message.contains("Could not close activity store"));
        assert!(message.contains("503"));
    }
}
