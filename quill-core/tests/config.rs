use quill_core::config::{ConfigError, ConfigValue, QuillConfig};
use serial_test::serial;

#[test]
fn empty_config_reports_missing_keys() {
    let config = QuillConfig::empty();
    assert!(matches!(
        config.get::<String>("quill.api.url"),
        Err(ConfigError::NotFound(_))
    ));
}

#[test]
fn get_or_falls_back_only_when_missing() {
    let mut config = QuillConfig::empty();
    assert_eq!(config.get_or("quill.api.timeout", 10_000u64).unwrap(), 10_000);

    config.set("quill.api.timeout", ConfigValue::String("soon".into()));
    assert!(matches!(
        config.get_or("quill.api.timeout", 10_000u64),
        Err(ConfigError::TypeMismatch { .. })
    ));
}

#[test]
fn nested_yaml_is_flattened() {
    let yaml = r#"
quill:
  api:
    url: "https://blog.example.com"
    timeout: 2500
  auth:
    storage: ~
"#;
    let config = QuillConfig::from_yaml_str(yaml, "test").unwrap();

    assert_eq!(
        config.get::<String>("quill.api.url").unwrap(),
        "https://blog.example.com"
    );
    assert_eq!(config.get::<u64>("quill.api.timeout").unwrap(), 2500);
    assert!(config.get::<Option<String>>("quill.auth.storage").unwrap().is_none());
}

#[test]
fn negative_numbers_do_not_fit_unsigned() {
    let config = QuillConfig::from_yaml_str("quill:\n  api:\n    timeout: -1\n", "test").unwrap();
    assert!(config.get::<u64>("quill.api.timeout").is_err());
}

#[test]
fn lists_accept_yaml_sequences_and_comma_strings() {
    let mut config = QuillConfig::from_yaml_str("roles: [admin, author]\n", "test").unwrap();
    assert_eq!(
        config.get::<Vec<String>>("roles").unwrap(),
        vec!["admin".to_string(), "author".to_string()]
    );

    config.set("roles", ConfigValue::String("admin, author".into()));
    assert_eq!(config.get::<Vec<String>>("roles").unwrap().len(), 2);
}

#[test]
fn malformed_yaml_is_a_load_error() {
    let err = QuillConfig::from_yaml_str("quill: [unclosed", "test").unwrap_err();
    assert!(matches!(err, ConfigError::Load(_)));
}

#[test]
#[serial]
fn files_and_environment_are_layered() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(
        dir.path().join("quill.yaml"),
        "quill:\n  api:\n    url: http://base\n    timeout: 1000\n",
    )
    .unwrap();
    std::fs::write(
        dir.path().join("quill-staging.yaml"),
        "quill:\n  api:\n    url: http://staging\n",
    )
    .unwrap();

    std::env::remove_var("QUILL_PROFILE");
    std::env::set_var("QUILL_API_TIMEOUT", "3000");

    let config = QuillConfig::load_from(dir.path(), "staging").unwrap();

    std::env::remove_var("QUILL_API_TIMEOUT");

    assert_eq!(config.profile(), "staging");
    assert_eq!(config.get::<String>("quill.api.url").unwrap(), "http://staging");
    assert_eq!(config.get::<u64>("quill.api.timeout").unwrap(), 3000);
}

#[test]
#[serial]
fn profile_env_var_wins_over_argument() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("quill-prod.yaml"), "quill:\n  api:\n    url: http://prod\n").unwrap();

    std::env::set_var("QUILL_PROFILE", "prod");
    let config = QuillConfig::load_from(dir.path(), "dev").unwrap();
    std::env::remove_var("QUILL_PROFILE");

    assert_eq!(config.profile(), "prod");
    assert_eq!(config.get::<String>("quill.api.url").unwrap(), "http://prod");
}
