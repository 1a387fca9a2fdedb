use std::collections::HashMap;

use super::*;

fn env_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
    let map: HashMap<String, String> = pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();
    move |key| map.get(key).cloned()
}

#[test]
fn defaults_have_no_request_timeout() {
    let settings = ClientSettings::default();
    assert_eq!(settings.api_base_url, DEFAULT_API_BASE_URL);
    assert_eq!(settings.request_timeout(), None);
}

#[test]
fn app_prefixed_env_wins_over_short_name() {
    let mut settings = ClientSettings::default();
    apply_env_overrides(
        &mut settings,
        env_from(&[
            ("CRM_API_BASE_URL", "http://one/api/"),
            ("APP__API_BASE_URL", "http://two/api/"),
            ("CRM_REQUEST_TIMEOUT_SECS", "15"),
            ("CRM_LOG", "debug"),
        ]),
    );
    assert_eq!(settings.api_base_url, "http://two/api/");
    assert_eq!(settings.request_timeout(), Some(Duration::from_secs(15)));
    assert_eq!(settings.log_filter, "debug");
}

#[test]
fn invalid_timeout_is_ignored() {
    let mut settings = ClientSettings::default();
    apply_env_overrides(&mut settings, env_from(&[("CRM_REQUEST_TIMEOUT_SECS", "soon")]));
    assert_eq!(settings.request_timeout_secs, None);
}

#[test]
fn zero_timeout_means_none() {
    let settings = ClientSettings {
        request_timeout_secs: Some(0),
        ..ClientSettings::default()
    };
    assert_eq!(settings.request_timeout(), None);
}

#[test]
fn file_settings_parse_from_toml() {
    let file_cfg: FileSettings = toml::from_str(
        r#"
        api_base_url = "https://crm.example.com/api"
        storage_path = "/tmp/crm.json"
        request_timeout_secs = 30
        "#,
    )
    .expect("toml");
    let mut settings = ClientSettings::default();
    apply_file_settings(&mut settings, file_cfg);
    assert_eq!(settings.api_base_url, "https://crm.example.com/api");
    assert_eq!(settings.storage_path, PathBuf::from("/tmp/crm.json"));
    assert_eq!(settings.request_timeout_secs, Some(30));
    assert_eq!(settings.log_filter, "info");
}

#[test]
fn base_url_gets_trailing_slash() {
    assert_eq!(normalize_base_url("http://x/api"), "http://x/api/");
    assert_eq!(normalize_base_url("http://x/api/"), "http://x/api/");
    assert_eq!(normalize_base_url("  "), DEFAULT_API_BASE_URL);
}
