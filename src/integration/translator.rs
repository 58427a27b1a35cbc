use reqwest::StatusCode;

use crate::error::{CompositeError, DownstreamFailure};
use crate::models::HttpErrorInfo;

// ============================================================================
// Error Translation
// ============================================================================
//
// Only two statuses have a domain meaning. Everything else, including
// failures that never produced a status, is rethrown as Unknown.
//
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ErrorKind {
    NotFound,
    InvalidInput,
}

const STATUS_TABLE: &[(StatusCode, ErrorKind)] = &[
    (StatusCode::NOT_FOUND, ErrorKind::NotFound),
    (StatusCode::UNPROCESSABLE_ENTITY, ErrorKind::InvalidInput),
];

fn kind_for(status: StatusCode) -> Option<ErrorKind> {
    STATUS_TABLE
        .iter()
        .find(|(code, _)| *code == status)
        .map(|(_, kind)| *kind)
}

/// Translate a failed downstream read into a composite error.
pub fn translate(failure: DownstreamFailure) -> CompositeError {
    let Some(status) = failure.status() else {
        tracing::warn!(error = %failure, "Got an unexpected error, will rethrow it");
        return CompositeError::Unknown(failure);
    };

    match kind_for(status) {
        Some(ErrorKind::NotFound) => CompositeError::NotFound(error_message(&failure)),
        Some(ErrorKind::InvalidInput) => CompositeError::InvalidInput(error_message(&failure)),
        None => {
            tracing::warn!(
                status = %status,
                body = failure.body().unwrap_or_default(),
                "Got an unexpected HTTP error, will rethrow it"
            );
            CompositeError::Unknown(failure)
        }
    }
}

/// The message from the service's error body, or the failure's own message
/// when the body is missing, malformed or carries no message.
pub fn error_message(failure: &DownstreamFailure) -> String {
    failure
        .body()
        .and_then(|body| serde_json::from_str::<HttpErrorInfo>(body).ok())
        .and_then(|info| info.message)
        .unwrap_or_else(|| failure.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn status_failure(status: StatusCode, body: &str) -> DownstreamFailure {
        DownstreamFailure::Status {
            status,
            url: "http://product:7001/product/2".to_string(),
            body: body.to_string(),
        }
    }

    #[test]
    fn test_not_found_uses_body_message() {
        let failure = status_failure(StatusCode::NOT_FOUND, r#"{"message":"NOT FOUND: 2"}"#);

        match translate(failure) {
            CompositeError::NotFound(message) => assert_eq!(message, "NOT FOUND: 2"),
            other => panic!("expected NotFound, got {:?}", other),
        }
    }

    #[test]
    fn test_not_found_with_unparsable_body_uses_transport_message() {
        let failure = status_failure(StatusCode::NOT_FOUND, "<html>oops</html>");

        match translate(failure) {
            CompositeError::NotFound(message) => {
                assert_eq!(message, "404 Not Found from GET http://product:7001/product/2")
            }
            other => panic!("expected NotFound, got {:?}", other),
        }
    }

    #[test]
    fn test_invalid_input_from_full_error_body() {
        let body = r#"{"path":"/product/-1","message":"Invalid productId: -1",
                       "status":"UNPROCESSABLE_ENTITY","timestamp":"2024-05-01T10:00:00Z"}"#;
        let failure = status_failure(StatusCode::UNPROCESSABLE_ENTITY, body);

        match translate(failure) {
            CompositeError::InvalidInput(message) => assert_eq!(message, "Invalid productId: -1"),
            other => panic!("expected InvalidInput, got {:?}", other),
        }
    }

    #[test]
    fn test_message_kept_with_unusual_status_field() {
        let failure = status_failure(
            StatusCode::NOT_FOUND,
            r#"{"message":"NOT FOUND: 2","status":404.0}"#,
        );

        assert_eq!(error_message(&failure), "NOT FOUND: 2");
    }

    #[test]
    fn test_body_without_message_falls_back() {
        let failure = status_failure(StatusCode::UNPROCESSABLE_ENTITY, "{}");

        assert_eq!(
            error_message(&failure),
            "422 Unprocessable Entity from GET http://product:7001/product/2"
        );
    }

    #[test]
    fn test_other_status_is_unknown_and_keeps_status() {
        let failure = status_failure(StatusCode::INTERNAL_SERVER_ERROR, "boom");

        match translate(failure) {
            CompositeError::Unknown(inner) => {
                assert_eq!(inner.status(), Some(StatusCode::INTERNAL_SERVER_ERROR));
                assert_eq!(inner.body(), Some("boom"));
            }
            other => panic!("expected Unknown, got {:?}", other),
        }
    }

    #[test]
    fn test_decode_failure_is_unknown() {
        let source = serde_json::from_str::<HttpErrorInfo>("not json").unwrap_err();
        let failure = DownstreamFailure::Decode {
            url: "http://product:7001/product/1".to_string(),
            source,
        };

        assert!(matches!(
            translate(failure),
            CompositeError::Unknown(DownstreamFailure::Decode { .. })
        ));
    }
}
