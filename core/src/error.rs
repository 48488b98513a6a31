//! Error types for the UserGrid client.
//!
//! # Design
//! Lookup problems (`AmbiguousLookup`, `NoEntities`, `MissingField`) get
//! dedicated variants so callers can tell a contract violation from a failed
//! round-trip. Transport and parse failures carry the underlying message
//! verbatim; nothing here is retried or recovered locally.

use thiserror::Error;

/// Errors returned by `UsergridClient` operations.
#[derive(Debug, Error)]
pub enum ApiError {
    /// More than one entity came back where exactly one was expected.
    #[error("multiple results returned where only one was expected ({count} entities)")]
    AmbiguousLookup { count: usize },

    /// The response envelope held no entities but the operation needs one.
    #[error("response contained no entities")]
    NoEntities,

    /// A field the API always sends on success was absent.
    #[error("response is missing field `{0}`")]
    MissingField(&'static str),

    /// The JSON parsed but did not have the envelope shape we expect.
    #[error("unexpected response shape: {0}")]
    UnexpectedShape(String),

    /// The server returned a non-2xx status.
    #[error("HTTP {status}: {body}")]
    HttpError { status: u16, body: String },

    /// The request never produced a response.
    #[error("transport failed: {0}")]
    Transport(String),

    /// The response body could not be deserialized into the expected type.
    #[error("deserialization failed: {0}")]
    Deserialization(#[from] serde_json::Error),

    /// The request payload could not be serialized to JSON.
    #[error("serialization failed: {0}")]
    Serialization(String),

    #[error("configuration error: {0}")]
    Config(String),
}

impl ApiError {
    /// True when the server answered but the answer broke the lookup contract.
    pub fn is_contract_violation(&self) -> bool {
        matches!(
            self,
            ApiError::AmbiguousLookup { .. }
                | ApiError::NoEntities
                | ApiError::MissingField(_)
                | ApiError::UnexpectedShape(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ambiguous_lookup_message_names_count() {
        let err = ApiError::AmbiguousLookup { count: 2 };
        assert_eq!(
            err.to_string(),
            "multiple results returned where only one was expected (2 entities)"
        );
    }

    #[test]
    fn http_error_passes_body_through() {
        let err = ApiError::HttpError {
            status: 404,
            body: r#"{"error":"entity_not_found"}"#.to_string(),
        };
        assert_eq!(err.to_string(), r#"HTTP 404: {"error":"entity_not_found"}"#);
        assert!(!err.is_contract_violation());
    }

    #[test]
    fn lookup_errors_are_contract_violations() {
        assert!(ApiError::NoEntities.is_contract_violation());
        assert!(ApiError::MissingField("access_token").is_contract_violation());
        assert!(!ApiError::Transport("refused".to_string()).is_contract_violation());
    }

    #[test]
    fn serde_errors_convert() {
        let parse_err = serde_json::from_str::<serde_json::Value>("{").unwrap_err();
        let err: ApiError = parse_err.into();
        assert!(matches!(err, ApiError::Deserialization(_)));
    }
}
