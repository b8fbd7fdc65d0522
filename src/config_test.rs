use super::*;

/// # Safety
/// Tests touching the environment must not run concurrently with each other.
unsafe fn clear_taskdesk_env() {
    unsafe {
        std::env::remove_var("TASKDESK_ENV");
        std::env::remove_var("TASKDESK_API_URL");
        std::env::remove_var("TASKDESK_ORIGIN");
        std::env::remove_var("TASKDESK_CSRF_COOKIE");
        std::env::remove_var("TASKDESK_CSRF_SETTLE_MS");
        std::env::remove_var("TASKDESK_REQUEST_TIMEOUT_SECS");
        std::env::remove_var("TASKDESK_CONNECT_TIMEOUT_SECS");
    }
}

// =============================================================================
// normalize_api_url
// =============================================================================

#[test]
fn normalize_appends_api_to_bare_origin() {
    let url = normalize_api_url("https://tasks.example.com").unwrap();
    assert_eq!(url.as_str(), "https://tasks.example.com/api");
}

#[test]
fn normalize_strips_trailing_slashes() {
    let url = normalize_api_url("https://tasks.example.com/api///").unwrap();
    assert_eq!(url.as_str(), "https://tasks.example.com/api");
}

#[test]
fn normalize_keeps_existing_prefix() {
    let url = normalize_api_url("http://127.0.0.1:8000/backend/").unwrap();
    assert_eq!(url.as_str(), "http://127.0.0.1:8000/backend/api");
}

#[test]
fn normalize_rejects_relative_url() {
    let err = normalize_api_url("/api").unwrap_err();
    assert!(matches!(err, ConfigError::InvalidApiUrl { .. }));
}

#[test]
fn normalize_rejects_non_http_scheme() {
    let err = normalize_api_url("ftp://example.com").unwrap_err().to_string();
    assert!(err.contains("scheme"));
}

#[test]
fn normalize_rejects_query() {
    assert!(normalize_api_url("https://example.com/api?x=1").is_err());
}

// =============================================================================
// parse_environment / resolve_api_url
// =============================================================================

#[test]
fn parse_environment_defaults_to_development() {
    assert_eq!(parse_environment(None).unwrap(), Environment::Development);
    assert_eq!(parse_environment(Some("PROD")).unwrap(), Environment::Production);
}

#[test]
fn parse_environment_unknown_errors() {
    let err = parse_environment(Some("staging")).unwrap_err().to_string();
    assert!(err.contains("unknown TASKDESK_ENV"));
}

#[test]
fn environment_parses_from_flag_value() {
    assert_eq!(" dev ".parse::<Environment>().unwrap(), Environment::Development);
    assert_eq!("production".parse::<Environment>().unwrap(), Environment::Production);
    assert!("qa".parse::<Environment>().is_err());
}

#[test]
fn resolve_api_url_uses_environment_default() {
    let dev = resolve_api_url(Environment::Development, None).unwrap();
    let prod = resolve_api_url(Environment::Production, None).unwrap();
    assert_eq!(dev.as_str(), DEFAULT_DEV_API_URL);
    assert_eq!(prod.as_str(), DEFAULT_PROD_API_URL);
}

#[test]
fn resolve_api_url_override_is_normalized() {
    let url = resolve_api_url(Environment::Production, Some("https://api.example.com/")).unwrap();
    assert_eq!(url.as_str(), "https://api.example.com/api");
}

// =============================================================================
// from_env
// =============================================================================

#[test]
fn from_env_defaults_and_overrides() {
    unsafe { clear_taskdesk_env() };

    let cfg = ClientConfig::from_env().unwrap();
    assert_eq!(cfg.environment, Environment::Development);
    assert_eq!(cfg.api_url.as_str(), DEFAULT_DEV_API_URL);
    assert_eq!(cfg.origin, None);
    assert_eq!(cfg.csrf_cookie, DEFAULT_CSRF_COOKIE);
    assert_eq!(cfg.csrf_settle, Duration::from_millis(DEFAULT_CSRF_SETTLE_MS));

    unsafe {
        std::env::set_var("TASKDESK_ENV", "production");
        std::env::set_var("TASKDESK_API_URL", "https://tasks.example.com");
        std::env::set_var("TASKDESK_ORIGIN", "https://app.example.com/");
        std::env::set_var("TASKDESK_CSRF_SETTLE_MS", "5");
        std::env::set_var("TASKDESK_REQUEST_TIMEOUT_SECS", "not-a-number");
    }

    let cfg = ClientConfig::from_env().unwrap();
    assert_eq!(cfg.environment, Environment::Production);
    assert_eq!(cfg.api_url.as_str(), "https://tasks.example.com/api");
    assert_eq!(cfg.origin.as_deref(), Some("https://app.example.com"));
    assert_eq!(cfg.csrf_settle, Duration::from_millis(5));
    assert_eq!(cfg.timeouts.request_secs, DEFAULT_REQUEST_TIMEOUT_SECS);

    unsafe { clear_taskdesk_env() };
}
