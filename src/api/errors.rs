#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum ApiError {
    #[error("session expired")]
    SessionExpired,

    #[error("{0}")]
    Rejected(String),

    #[error("login failed: {}", .0.as_deref().unwrap_or("unknown reason"))]
    LoginFailed(Option<String>),

    #[error("network error: {0}")]
    Network(String),
}

impl From<reqwest::Error> for ApiError {
    fn from(err: reqwest::Error) -> Self {
        use std::error::Error;

        // the innermost cause is the readable one ("connection refused", ...)
        let mut cause: &dyn Error = &err;
        while let Some(source) = cause.source() {
            cause = source;
        }
        ApiError::Network(cause.to_string())
    }
}
