use linkhut_client::config::{
    DEFAULT_BASE_URL, DEFAULT_TIMEOUT_SECS, ENV_API_TOKEN, ENV_BASE_URL, ENV_TIMEOUT_SECS,
};
use linkhut_client::{Config, Error};
use std::time::Duration;

#[test]
fn explicit_config_uses_defaults() {
    let config = Config::new("secret-token-1234");
    assert_eq!(config.base_url, DEFAULT_BASE_URL);
    assert_eq!(config.timeout, Duration::from_secs(DEFAULT_TIMEOUT_SECS));
    assert_eq!(config.redacted_token(), "****1234");
}

#[test]
fn builder_overrides_defaults() {
    let config = Config::new("tok")
        .with_base_url("https://linkhut.example")
        .with_timeout(Duration::from_secs(5));
    assert_eq!(config.base_url, "https://linkhut.example");
    assert_eq!(config.timeout, Duration::from_secs(5));
    assert_eq!(config.redacted_token(), "****");
}

#[test]
fn redaction_counts_characters_not_bytes() {
    // Multi-byte characters near the end must not split the suffix.
    assert_eq!(Config::new("abc€€").redacted_token(), "****bc€€");
    assert_eq!(Config::new("secret-tokén").redacted_token(), "****okén");
    assert_eq!(Config::new("€€€€").redacted_token(), "****");
}

// All environment scenarios live in one test so nothing else runs while
// the process environment is being mutated.
#[test]
fn load_resolves_env_over_defaults() {
    unsafe {
        std::env::remove_var(ENV_API_TOKEN);
        std::env::remove_var(ENV_BASE_URL);
        std::env::remove_var(ENV_TIMEOUT_SECS);
    }
    assert!(matches!(Config::load(), Err(Error::MissingToken)));

    // A blank token does not count as a credential.
    unsafe { std::env::set_var(ENV_API_TOKEN, "   ") };
    assert!(matches!(Config::load(), Err(Error::MissingToken)));

    unsafe { std::env::set_var(ENV_API_TOKEN, "env-token") };
    let config = Config::load().unwrap();
    assert_eq!(config.api_token, "env-token");
    assert_eq!(config.base_url, DEFAULT_BASE_URL);
    assert_eq!(config.timeout, Duration::from_secs(DEFAULT_TIMEOUT_SECS));

    unsafe {
        std::env::set_var(ENV_BASE_URL, "https://linkhut.example");
        std::env::set_var(ENV_TIMEOUT_SECS, "7");
    }
    let config = Config::load().unwrap();
    assert_eq!(config.base_url, "https://linkhut.example");
    assert_eq!(config.timeout, Duration::from_secs(7));

    unsafe { std::env::set_var(ENV_TIMEOUT_SECS, "soon") };
    assert!(matches!(Config::load(), Err(Error::InvalidConfig(_))));

    unsafe {
        std::env::remove_var(ENV_API_TOKEN);
        std::env::remove_var(ENV_BASE_URL);
        std::env::remove_var(ENV_TIMEOUT_SECS);
    }
}
