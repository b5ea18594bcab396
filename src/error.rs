use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("Browser launch failed: {0}")]
    LaunchError(String),

    #[error("Navigation failed: {0}")]
    NavigationError(String),

    #[error("Element not found: {0}")]
    ElementNotFound(String),

    #[error("Timeout waiting for: {0}")]
    Timeout(String),

    #[error("Stale element: {0}")]
    Stale(String),

    #[error("Unclassified failure: {0}")]
    Unclassified(String),

    #[error("JavaScript error: {0}")]
    JsError(String),

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("CDP error: {0}")]
    CdpError(#[from] chromiumoxide::error::CdpError),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

impl Error {
    pub fn is_timeout(&self) -> bool {
        matches!(self, Error::Timeout(_))
    }

    pub fn is_stale(&self) -> bool {
        matches!(self, Error::Stale(_))
    }
}

pub type Result<T> = std::result::Result<T, Error>;
