/*!
 * Tests for engine configuration
 */

use wordlens::app_config::{Config, ProviderConfig, ProviderKind};

#[test]
fn test_config_default_shouldValidate() {
    let config = Config::default();
    assert!(config.validate().is_ok());
}

#[test]
fn test_config_default_shouldEnableGoogleOnly() {
    let config = Config::default();
    assert_eq!(config.translation.enabled, vec![ProviderKind::Google]);
    assert_eq!(config.max_word_count, 25);
}

#[test]
fn test_config_default_shouldShipAllProviderEntries() {
    let config = Config::default();
    for kind in [
        ProviderKind::Google,
        ProviderKind::DeepL,
        ProviderKind::Microsoft,
        ProviderKind::Gemini,
    ] {
        assert!(
            config.translation.get_provider_config(kind).is_some(),
            "missing entry for {}",
            kind
        );
    }
}

#[test]
fn test_config_default_shouldGiveGeminiACooldown() {
    let config = Config::default();
    assert_eq!(config.translation.get_cooldown_ms(ProviderKind::Gemini), 1000);
    assert_eq!(config.translation.get_cooldown_ms(ProviderKind::Google), 0);
}

#[test]
fn test_validate_withBadTargetLanguage_shouldFail() {
    let mut config = Config::default();
    config.default_target_language = "nonsense".to_string();
    assert!(config.validate().is_err());
}

#[test]
fn test_validate_withEnabledProviderMissingEntry_shouldFail() {
    let mut config = Config::default();
    config.translation.enabled = vec![ProviderKind::DeepL];
    config
        .translation
        .available_providers
        .retain(|p| p.provider_type != "deepl");
    assert!(config.validate().is_err());
}

#[test]
fn test_validate_withZeroWordCount_shouldFail() {
    let mut config = Config::default();
    config.max_word_count = 0;
    assert!(config.validate().is_err());
}

#[test]
fn test_validate_withEmptyBackoffTable_shouldFail() {
    let mut config = Config::default();
    config.sync.backoff_ms.clear();
    assert!(config.validate().is_err());
}

#[test]
fn test_config_fromJson_shouldApplyFieldDefaults() {
    let json = r#"{
        "default_target_language": "de",
        "translation": {
            "enabled": ["google", "gemini"],
            "available_providers": [
                { "type": "google" },
                { "type": "gemini", "api_key": "k", "cooldown_ms": 2000 }
            ]
        }
    }"#;

    let config: Config = serde_json::from_str(json).expect("config should parse");
    assert_eq!(config.default_target_language, "de");
    assert_eq!(config.max_word_count, 25);
    assert_eq!(
        config.translation.enabled,
        vec![ProviderKind::Google, ProviderKind::Gemini]
    );
    assert_eq!(config.translation.get_cooldown_ms(ProviderKind::Gemini), 2000);
    assert_eq!(config.arbitration.pointer_delay_ms, 50);
    assert_eq!(config.discovery.max_poll_attempts, 20);
    assert_eq!(config.sync.backoff_ms, vec![1000, 2000, 5000]);
}

#[test]
fn test_config_fromFile_shouldLoadAndValidate() {
    let dir = tempfile::tempdir().expect("temp dir");
    let path = dir.path().join("wordlens.json");
    std::fs::write(&path, r#"{ "default_target_language": "es" }"#).expect("write config");

    let config = Config::from_file(&path).expect("config should load");
    assert_eq!(config.default_target_language, "es");
}

#[test]
fn test_config_fromFile_withMissingFile_shouldFail() {
    assert!(Config::from_file("/nonexistent/wordlens.json").is_err());
}

#[test]
fn test_provider_kind_roundTrip_shouldParseAllVariants() {
    for kind in [
        ProviderKind::Google,
        ProviderKind::DeepL,
        ProviderKind::Microsoft,
        ProviderKind::Gemini,
    ] {
        let parsed: ProviderKind = kind.to_string().parse().expect("should parse");
        assert_eq!(parsed, kind);
    }
    assert!("yandex".parse::<ProviderKind>().is_err());
}

#[test]
fn test_provider_config_new_withKeylessProvider_shouldNotRequireKey() {
    let google = ProviderConfig::new(ProviderKind::Google);
    assert!(google.api_key.is_empty());
    assert!(!ProviderKind::Google.requires_api_key());
    assert!(ProviderKind::DeepL.requires_api_key());
}
