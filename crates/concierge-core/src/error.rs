//! Core error type for the Concierge dispatch pipeline.
//!
//! Only caller misuse and setup problems surface as `ConciergeError`.
//! Unreliable classifier output and tool misses are absorbed into
//! `HandlerResult`s and never reach this type.

#[derive(Debug, thiserror::Error)]
pub enum ConciergeError {
    #[error("Unknown workflow template: {0}")]
    UnknownTemplate(String),

    #[error("Session not found: {0}")]
    SessionNotFound(String),

    #[error("Unknown handler: {0}")]
    UnknownHandler(String),

    #[error("Classification error: {0}")]
    Classification(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Template error: {0}")]
    Template(String),
}

pub type ConciergeResult<T> = Result<T, ConciergeError>;

impl ConciergeError {
    /// Stable machine-readable code, used when the error is reported as a
    /// structured result to a front end.
    pub fn code(&self) -> &'static str {
        match self {
            ConciergeError::UnknownTemplate(_) => "unknown_template",
            ConciergeError::SessionNotFound(_) => "session_not_found",
            ConciergeError::UnknownHandler(_) => "unknown_handler",
            ConciergeError::Classification(_) => "classification",
            ConciergeError::Config(_) => "config",
            ConciergeError::Template(_) => "template",
        }
    }

    /// Render as `{ "error": ..., "code": ... }`.
    pub fn to_json(&self) -> serde_json::Value {
        serde_json::json!({ "error": self.to_string(), "code": self.code() })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_json_shape() {
        let err = ConciergeError::SessionNotFound("s-1".to_string());
        let json = err.to_json();
        assert_eq!(json["code"], "session_not_found");
        assert_eq!(json["error"], "Session not found: s-1");
    }
}
