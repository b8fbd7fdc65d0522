use super::*;

// =============================================================================
// FieldErrors
// =============================================================================

#[test]
fn field_errors_prefers_non_field_errors() {
    let errors = FieldErrors::from_body(
        r#"{"username":["This field is required."],"non_field_errors":["Invalid credentials."]}"#,
    );
    assert_eq!(errors.first_message(), Some("Invalid credentials."));
}

#[test]
fn field_errors_falls_back_to_detail() {
    let errors = FieldErrors::from_body(r#"{"detail":"Account disabled."}"#);
    assert_eq!(errors.first_message(), Some("Account disabled."));
    assert_eq!(errors.detail(), Some("Account disabled."));
}

#[test]
fn field_errors_falls_back_to_first_field_message() {
    let errors = FieldErrors::from_body(r#"{"title":["Ensure this field has no more than 200 characters."]}"#);
    assert_eq!(errors.field("title").len(), 1);
    assert_eq!(errors.first_message(), Some("Ensure this field has no more than 200 characters."));
}

#[test]
fn field_errors_wraps_plain_text_body() {
    let errors = FieldErrors::from_body("Bad Request");
    assert_eq!(errors.detail(), Some("Bad Request"));
}

#[test]
fn field_errors_empty_body_has_no_message() {
    let errors = FieldErrors::from_body("   ");
    assert_eq!(errors.first_message(), None);
    assert!(errors.as_json().is_empty());
}

#[test]
fn field_errors_single_string_field_value() {
    let errors = FieldErrors::from_body(r#"{"status":"Status must be one of: Todo, In Progress, Done"}"#);
    assert_eq!(errors.field("status"), vec!["Status must be one of: Todo, In Progress, Done"]);
}

// =============================================================================
// ApiError
// =============================================================================

#[test]
fn error_codes_distinguish_csrf_rejection() {
    let csrf = ApiError::Forbidden { detail: "CSRF Failed".into(), csrf: true };
    let plain = ApiError::Forbidden { detail: "nope".into(), csrf: false };
    assert_eq!(csrf.error_code(), "E_CSRF_REJECTED");
    assert_eq!(plain.error_code(), "E_FORBIDDEN");
}

#[test]
fn retryable_covers_transport_and_server_errors() {
    assert!(ApiError::Transport("reset".into()).retryable());
    assert!(ApiError::Status { status: 503, body: String::new() }.retryable());
    assert!(ApiError::Status { status: 429, body: String::new() }.retryable());
    assert!(!ApiError::Status { status: 404, body: String::new() }.retryable());
    assert!(!ApiError::Unauthenticated.retryable());
    assert!(!ApiError::CsrfUnavailable.retryable());
}

#[test]
fn validation_display_uses_first_message() {
    let err = ApiError::Validation(FieldErrors::from_body(r#"{"non_field_errors":["Invalid credentials."]}"#));
    assert_eq!(err.to_string(), "validation failed: Invalid credentials.");
    assert_eq!(err.user_message(), "Invalid credentials.");
}

#[test]
fn csrf_unavailable_message() {
    assert_eq!(ApiError::CsrfUnavailable.to_string(), "CSRF token unavailable");
}
