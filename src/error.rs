use actix_web::{http::StatusCode, ResponseError};
use color_eyre::eyre;

pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("webhook payload has bad format: {0}")]
    PayloadBadFormat(String),
    #[error("GET {url} still failing with status {status} after {attempts} attempts")]
    MaxRetry {
        url: String,
        attempts: u32,
        status: u16,
    },
    #[error("GET {url} failed: {reason}")]
    Http {
        url: String,
        status: Option<u16>,
        reason: String,
    },
    #[error(transparent)]
    Generic(#[from] eyre::Report),
}

impl Error {
    pub fn bad_format(msg: impl Into<String>) -> Self {
        Self::PayloadBadFormat(msg.into())
    }
}

impl ResponseError for Error {
    fn status_code(&self) -> StatusCode {
        match self {
            Error::PayloadBadFormat(_) => StatusCode::BAD_REQUEST,
            Error::MaxRetry { .. } => StatusCode::BAD_GATEWAY,
            Error::Http { .. } => StatusCode::BAD_GATEWAY,
            Error::Generic(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}
