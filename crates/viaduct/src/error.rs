use std::fmt;

/// Error types that can occur when talking to an LLM provider's wire protocol.
///
/// This taxonomy stays flat by design: every adapter normalizes its own
/// failure modes into one of these before handing it to the orchestrator,
/// which only ever needs to know "this turn cannot continue".
#[derive(Debug)]
pub enum LLMError {
    /// HTTP request/response errors
    HttpError(String),
    /// Authentication and authorization errors
    AuthError(String),
    /// Invalid request parameters or format
    InvalidRequest(String),
    /// Errors returned by the LLM provider
    ProviderError(String),
    /// API response parsing or format error
    ResponseFormatError {
        message: String,
        raw_response: String,
    },
    /// JSON serialization/deserialization errors
    JsonError(String),
    /// The request deadline elapsed before the stream completed
    Timeout,
}

impl fmt::Display for LLMError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LLMError::HttpError(e) => write!(f, "HTTP Error: {}", e),
            LLMError::AuthError(e) => write!(f, "Auth Error: {}", e),
            LLMError::InvalidRequest(e) => write!(f, "Invalid Request: {}", e),
            LLMError::ProviderError(e) => write!(f, "Provider Error: {}", e),
            LLMError::ResponseFormatError {
                message,
                raw_response,
            } => {
                write!(
                    f,
                    "Response Format Error: {}. Raw response: {}",
                    message, raw_response
                )
            }
            LLMError::JsonError(e) => write!(f, "JSON Parse Error: {}", e),
            LLMError::Timeout => write!(f, "Request timed out"),
        }
    }
}

impl std::error::Error for LLMError {}

impl From<reqwest::Error> for LLMError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            LLMError::Timeout
        } else if err.is_status() {
            match err.status().map(|s| s.as_u16()) {
                Some(401) | Some(403) => LLMError::AuthError(err.to_string()),
                _ => LLMError::ProviderError(err.to_string()),
            }
        } else {
            LLMError::HttpError(err.to_string())
        }
    }
}

impl From<http::Error> for LLMError {
    fn from(err: http::Error) -> Self {
        LLMError::HttpError(err.to_string())
    }
}

impl From<serde_json::Error> for LLMError {
    fn from(err: serde_json::Error) -> Self {
        LLMError::JsonError(format!(
            "{} at line {} column {}",
            err,
            err.line(),
            err.column()
        ))
    }
}

impl From<url::ParseError> for LLMError {
    fn from(err: url::ParseError) -> Self {
        LLMError::InvalidRequest(format!("error parsing provided url: {}", err))
    }
}
