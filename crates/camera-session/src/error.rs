use thiserror::Error;

pub type Result<T, E = Error> = core::result::Result<T, E>;

#[derive(Debug, Error)]
pub enum Error {
    #[error("failed to open capture: {0}")]
    OpenFailure(String),
    #[error("capture opened but delivered no trial frame: {0}")]
    NoTrialFrame(String),
    #[error("failed to read frame: {0}")]
    ReadFailure(String),
    #[error("backend unavailable: {0}")]
    BackendUnavailable(&'static str),
    #[error("session is not open")]
    NotOpen,
    #[error("invalid camera config: {0}")]
    InvalidConfig(String),
    #[error("I/O error: {0}")]
    Io(String),
    #[error("backend error: {0}")]
    Backend(String),
}

impl Error {
    /// Whether this error belongs to the open-failure class: the handle could
    /// not be created, the health check failed, or the backend is missing.
    pub fn is_open_failure(&self) -> bool {
        matches!(
            self,
            Error::OpenFailure(_)
                | Error::NoTrialFrame(_)
                | Error::BackendUnavailable(_)
                | Error::InvalidConfig(_)
        )
    }
}
