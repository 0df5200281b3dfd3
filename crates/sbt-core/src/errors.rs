/// Core error type for the bot.
///
/// Adapter crates map their specific errors into this type so the dispatcher can
/// tell business-rule failures (answered with plain text) from unexpected faults.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("config error: {0}")]
    Config(String),

    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("invalid pattern: {0}")]
    Pattern(#[from] regex::Error),

    #[error("{0}")]
    PreconditionFailed(String),

    #[error("{0}")]
    AlreadyExists(String),

    #[error("division by zero")]
    DivisionByZero,

    #[error("arithmetic overflow")]
    Overflow,

    #[error("{0}")]
    Endorsement(String),

    #[error("transient store error: {0}")]
    TransientStore(String),

    #[error("store error: {0}")]
    Store(String),

    #[error("timed out: {0}")]
    Timeout(String),

    #[error("collaborator unavailable: {0}")]
    CollaboratorUnavailable(String),

    #[error("external error: {0}")]
    External(String),
}

impl Error {
    /// Text to show the user for business-rule failures, `None` for faults.
    pub fn user_message(&self) -> Option<String> {
        match self {
            Error::PreconditionFailed(s)
            | Error::AlreadyExists(s)
            | Error::Endorsement(s) => Some(s.clone()),
            Error::DivisionByZero => Some("You can't divide by zero, stupid!".to_string()),
            Error::Overflow => Some("That number is too big for me!".to_string()),
            _ => None,
        }
    }

    pub fn is_transient(&self) -> bool {
        matches!(self, Error::TransientStore(_))
    }
}

impl From<rusqlite::Error> for Error {
    fn from(e: rusqlite::Error) -> Self {
        use rusqlite::ErrorCode;
        match &e {
            rusqlite::Error::SqliteFailure(f, _)
                if matches!(
                    f.code,
                    ErrorCode::DatabaseBusy | ErrorCode::DatabaseLocked
                ) =>
            {
                Error::TransientStore(e.to_string())
            }
            _ => Error::Store(e.to_string()),
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
