use thiserror::Error;

/// Failure of a single outbound hop. Never leaves the hop that produced it:
/// callers log it and treat the hop as having no result.
#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("Request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("HTTP error: {0}")]
    Status(u16),

    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("No access token available")]
    Unauthorized,
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RomanizeError {
    #[error("Japanese analyzer is still initializing")]
    NotReady,

    #[error("Japanese analyzer failed to initialize")]
    AnalyzerFailed,

    #[error("Conversion failed: {0}")]
    Conversion(String),

    #[error("Conversion panicked")]
    Panicked,
}

/// Unexpected failure while serving a lookup; maps to a 500-equivalent.
#[derive(Debug, Error)]
pub enum LookupError {
    #[error("Internal error: {0}")]
    Internal(String),
}
