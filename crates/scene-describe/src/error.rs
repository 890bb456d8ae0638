use thiserror::Error;

pub type Result<T, E = Error> = core::result::Result<T, E>;

#[derive(Debug, Error)]
pub enum Error {
    #[error("describer not available: {0}")]
    Unavailable(String),
    #[error("invalid frame: {0}")]
    InvalidFrame(String),
    #[error("inference request failed: {0}")]
    Request(String),
    #[error("inference server returned HTTP {0}")]
    Status(u16),
    #[error(transparent)]
    Camera(#[from] camera_session::Error),
}
