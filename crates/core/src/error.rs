use thiserror::Error;

/// Per-attempt failure classification, carried in `SessionResult`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Network,
    AuthExpired,
    ElementNotFound,
    ChallengeTimeout,
    VerificationTimeout,
    UnknownOutcome,
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            ErrorKind::Network => "network",
            ErrorKind::AuthExpired => "auth expired",
            ErrorKind::ElementNotFound => "element not found",
            ErrorKind::ChallengeTimeout => "challenge timeout",
            ErrorKind::VerificationTimeout => "verification timeout",
            ErrorKind::UnknownOutcome => "unknown outcome",
        };
        f.write_str(name)
    }
}

#[derive(Error, Debug)]
pub enum SessionError {
    #[error("network error: {0}")]
    Network(String),

    #[error("authentication expired")]
    AuthExpired,

    #[error("element not found: {0}")]
    ElementNotFound(String),

    #[error("challenge not ready after {0} polls")]
    ChallengeTimeout(usize),

    #[error("verification code not received after {attempts} attempts: {last}")]
    VerificationTimeout { attempts: u32, last: String },

    #[error("post-submission page not recognized as signed in: {0}")]
    UnknownOutcome(String),
}

impl SessionError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            SessionError::Network(_) => ErrorKind::Network,
            SessionError::AuthExpired => ErrorKind::AuthExpired,
            SessionError::ElementNotFound(_) => ErrorKind::ElementNotFound,
            SessionError::ChallengeTimeout(_) => ErrorKind::ChallengeTimeout,
            SessionError::VerificationTimeout { .. } => ErrorKind::VerificationTimeout,
            SessionError::UnknownOutcome(_) => ErrorKind::UnknownOutcome,
        }
    }
}
