use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::warn;

use crate::network::language_tool::{DEFAULT_ENDPOINT, DEFAULT_LANGUAGE};
use crate::network::{DEFAULT_MAX_SUGGESTIONS, LanguageToolConfig};
use crate::render::CaretPolicy;
use crate::secure_storage;

pub const DEFAULT_CHECK_DELAY_MS: u64 = 900;
pub const DEFAULT_HIDE_DELAY_MS: u64 = 800;
pub const DEFAULT_SETTLE_DELAY_MS: u64 = 400;
pub const DEFAULT_LABEL_REVERT_MS: u64 = 1_500;
pub const DEFAULT_REQUEST_TIMEOUT_MS: u64 = 10_000;

const MIN_DELAY_MS: u64 = 50;
const MAX_DELAY_MS: u64 = 10_000;
const MAX_SETTLE_DELAY_MS: u64 = 5_000;
const MIN_REQUEST_TIMEOUT_MS: u64 = 1_000;
const MAX_REQUEST_TIMEOUT_MS: u64 = 60_000;
const MAX_SUGGESTIONS_LIMIT: usize = 10;

#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("failed to access settings file {path}: {message}")]
    Io { path: PathBuf, message: String },
    #[error("failed to parse settings file: {0}")]
    Parse(String),
    #[error("invalid settings: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EditorSettings {
    #[serde(default = "default_endpoint")]
    pub endpoint: String,
    #[serde(default = "default_language")]
    pub language: String,
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub api_key: String,
    #[serde(default = "default_check_delay_ms")]
    pub check_delay_ms: u64,
    #[serde(default = "default_hide_delay_ms")]
    pub hide_delay_ms: u64,
    #[serde(default = "default_settle_delay_ms")]
    pub settle_delay_ms: u64,
    #[serde(default = "default_label_revert_ms")]
    pub label_revert_ms: u64,
    #[serde(default = "default_request_timeout_ms")]
    pub request_timeout_ms: u64,
    #[serde(default = "default_max_suggestions")]
    pub max_suggestions: usize,
    #[serde(default = "default_discard_stale_responses")]
    pub discard_stale_responses: bool,
    #[serde(default)]
    pub caret: CaretPolicy,
}

impl Default for EditorSettings {
    fn default() -> Self {
        Self {
            endpoint: default_endpoint(),
            language: default_language(),
            username: String::new(),
            api_key: String::new(),
            check_delay_ms: default_check_delay_ms(),
            hide_delay_ms: default_hide_delay_ms(),
            settle_delay_ms: default_settle_delay_ms(),
            label_revert_ms: default_label_revert_ms(),
            request_timeout_ms: default_request_timeout_ms(),
            max_suggestions: default_max_suggestions(),
            discard_stale_responses: default_discard_stale_responses(),
            caret: CaretPolicy::default(),
        }
    }
}

impl EditorSettings {
    pub fn check_delay(&self) -> Duration {
        Duration::from_millis(self.check_delay_ms)
    }

    pub fn hide_delay(&self) -> Duration {
        Duration::from_millis(self.hide_delay_ms)
    }

    pub fn settle_delay(&self) -> Duration {
        Duration::from_millis(self.settle_delay_ms)
    }

    pub fn label_revert_delay(&self) -> Duration {
        Duration::from_millis(self.label_revert_ms)
    }

    pub fn language_tool_config(&self) -> LanguageToolConfig {
        let non_empty = |value: &str| {
            let trimmed = value.trim();
            (!trimmed.is_empty()).then(|| trimmed.to_string())
        };

        LanguageToolConfig {
            endpoint: self.endpoint.clone(),
            language: self.language.clone(),
            username: non_empty(&self.username),
            api_key: non_empty(&self.api_key),
            request_timeout: Duration::from_millis(self.request_timeout_ms),
            max_suggestions: self.max_suggestions,
        }
    }
}

fn default_endpoint() -> String {
    DEFAULT_ENDPOINT.to_string()
}

fn default_language() -> String {
    DEFAULT_LANGUAGE.to_string()
}

fn default_check_delay_ms() -> u64 {
    DEFAULT_CHECK_DELAY_MS
}

fn default_hide_delay_ms() -> u64 {
    DEFAULT_HIDE_DELAY_MS
}

fn default_settle_delay_ms() -> u64 {
    DEFAULT_SETTLE_DELAY_MS
}

fn default_label_revert_ms() -> u64 {
    DEFAULT_LABEL_REVERT_MS
}

fn default_request_timeout_ms() -> u64 {
    DEFAULT_REQUEST_TIMEOUT_MS
}

fn default_max_suggestions() -> usize {
    DEFAULT_MAX_SUGGESTIONS
}

fn default_discard_stale_responses() -> bool {
    true
}

pub fn default_settings_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("proofline")
        .join("settings.json")
}

fn read_api_key_from_environment() -> Option<String> {
    std::env::var("LANGUAGETOOL_API_KEY")
        .ok()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

fn read_username_from_environment() -> Option<String> {
    std::env::var("LANGUAGETOOL_USERNAME")
        .ok()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

/// Reads settings from `path` (defaults when missing), then resolves the API
/// key from the keyring, the file and the environment in that order.
pub fn load_settings(path: &Path) -> Result<EditorSettings, SettingsError> {
    let mut settings = normalize_loaded_settings(read_settings_file(path)?);

    match secure_storage::read_api_key() {
        Ok(Some(api_key)) => settings.api_key = api_key,
        Ok(None) => {}
        Err(err) => warn!("failed to read API key from secure storage; using config fallback: {err}"),
    }

    if settings.api_key.trim().is_empty() {
        if let Some(api_key) = read_api_key_from_environment() {
            settings.api_key = api_key;
        }
    }
    if settings.username.trim().is_empty() {
        if let Some(username) = read_username_from_environment() {
            settings.username = username;
        }
    }

    Ok(settings)
}

/// Validates and persists `settings`. The API key goes to the keyring when it
/// accepts it and is stripped from the file in that case.
pub fn save_settings(path: &Path, settings: EditorSettings) -> Result<EditorSettings, SettingsError> {
    let validated = validate_settings(settings)?;

    let secure_storage_available = match secure_storage::write_api_key(&validated.api_key) {
        Ok(()) => true,
        Err(err) => {
            warn!("failed to write API key into secure storage, fallback to config persistence: {err}");
            false
        }
    };

    let mut persisted = validated.clone();
    if secure_storage_available {
        persisted.api_key.clear();
    }
    write_settings_file(path, &persisted)?;

    Ok(validated)
}

fn read_settings_file(path: &Path) -> Result<EditorSettings, SettingsError> {
    if !path.exists() {
        return Ok(EditorSettings::default());
    }

    let content = fs::read_to_string(path).map_err(|err| SettingsError::Io {
        path: path.to_path_buf(),
        message: err.to_string(),
    })?;
    serde_json::from_str::<EditorSettings>(&content).map_err(|err| SettingsError::Parse(err.to_string()))
}

fn write_settings_file(path: &Path, settings: &EditorSettings) -> Result<(), SettingsError> {
    let io_error = |err: std::io::Error| SettingsError::Io {
        path: path.to_path_buf(),
        message: err.to_string(),
    };

    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(io_error)?;
    }
    let serialized =
        serde_json::to_string_pretty(settings).map_err(|err| SettingsError::Parse(err.to_string()))?;
    fs::write(path, serialized).map_err(io_error)
}

pub fn normalize_loaded_settings(mut settings: EditorSettings) -> EditorSettings {
    settings.endpoint = settings.endpoint.trim().to_string();
    if reqwest::Url::parse(&settings.endpoint).is_err() {
        warn!(endpoint = %settings.endpoint, "loaded endpoint is not a valid url; resetting to default");
        settings.endpoint = default_endpoint();
    }
    settings.language = normalize_language(&settings.language);
    settings.api_key = settings.api_key.trim().to_string();
    settings.username = settings.username.trim().to_string();

    reset_out_of_range(
        "check delay",
        &mut settings.check_delay_ms,
        MIN_DELAY_MS..=MAX_DELAY_MS,
        DEFAULT_CHECK_DELAY_MS,
    );
    reset_out_of_range(
        "hide delay",
        &mut settings.hide_delay_ms,
        MIN_DELAY_MS..=MAX_DELAY_MS,
        DEFAULT_HIDE_DELAY_MS,
    );
    reset_out_of_range(
        "settle delay",
        &mut settings.settle_delay_ms,
        0..=MAX_SETTLE_DELAY_MS,
        DEFAULT_SETTLE_DELAY_MS,
    );
    reset_out_of_range(
        "label revert delay",
        &mut settings.label_revert_ms,
        MIN_DELAY_MS..=MAX_DELAY_MS,
        DEFAULT_LABEL_REVERT_MS,
    );
    reset_out_of_range(
        "request timeout",
        &mut settings.request_timeout_ms,
        MIN_REQUEST_TIMEOUT_MS..=MAX_REQUEST_TIMEOUT_MS,
        DEFAULT_REQUEST_TIMEOUT_MS,
    );

    if !(1..=MAX_SUGGESTIONS_LIMIT).contains(&settings.max_suggestions) {
        warn!(
            max_suggestions = settings.max_suggestions,
            "loaded max suggestions is out of range; resetting to default"
        );
        settings.max_suggestions = DEFAULT_MAX_SUGGESTIONS;
    }

    settings
}

fn reset_out_of_range(
    name: &str,
    value: &mut u64,
    range: std::ops::RangeInclusive<u64>,
    default: u64,
) {
    if !range.contains(value) {
        warn!(value = *value, "loaded {name} is out of range; resetting to default");
        *value = default;
    }
}

pub fn validate_settings(mut settings: EditorSettings) -> Result<EditorSettings, SettingsError> {
    settings.endpoint = settings.endpoint.trim().to_string();
    let endpoint = reqwest::Url::parse(&settings.endpoint)
        .map_err(|err| SettingsError::Invalid(format!("endpoint is not a valid url: {err}")))?;
    if !matches!(endpoint.scheme(), "http" | "https") {
        return Err(SettingsError::Invalid(
            "endpoint must use http or https".to_string(),
        ));
    }

    settings.language = normalize_language(&settings.language);
    settings.api_key = settings.api_key.trim().to_string();
    settings.username = settings.username.trim().to_string();
    if settings.api_key.is_empty() != settings.username.is_empty() {
        return Err(SettingsError::Invalid(
            "username and apiKey must be configured together".to_string(),
        ));
    }

    let delays = [
        ("checkDelayMs", settings.check_delay_ms, MIN_DELAY_MS, MAX_DELAY_MS),
        ("hideDelayMs", settings.hide_delay_ms, MIN_DELAY_MS, MAX_DELAY_MS),
        ("settleDelayMs", settings.settle_delay_ms, 0, MAX_SETTLE_DELAY_MS),
        ("labelRevertMs", settings.label_revert_ms, MIN_DELAY_MS, MAX_DELAY_MS),
        (
            "requestTimeoutMs",
            settings.request_timeout_ms,
            MIN_REQUEST_TIMEOUT_MS,
            MAX_REQUEST_TIMEOUT_MS,
        ),
    ];
    for (name, value, min, max) in delays {
        if !(min..=max).contains(&value) {
            return Err(SettingsError::Invalid(format!(
                "{name} must be between {min} and {max}"
            )));
        }
    }

    if !(1..=MAX_SUGGESTIONS_LIMIT).contains(&settings.max_suggestions) {
        return Err(SettingsError::Invalid(format!(
            "maxSuggestions must be between 1 and {MAX_SUGGESTIONS_LIMIT}"
        )));
    }

    Ok(settings)
}

/// Accepts the common spellings of the default locale; anything else is
/// passed through for the service to judge.
fn normalize_language(language: &str) -> String {
    let normalized = language.trim();
    match normalized.to_lowercase().as_str() {
        "" | "en" | "en-us" | "en_us" | "english" => default_language(),
        "auto" => "auto".to_string(),
        _ => normalized.replace('_', "-"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_fields_fall_back_to_defaults() {
        let parsed: EditorSettings =
            serde_json::from_str(r#"{"checkDelayMs":500}"#).expect("settings should parse");

        assert_eq!(parsed.check_delay_ms, 500);
        assert_eq!(parsed.hide_delay_ms, DEFAULT_HIDE_DELAY_MS);
        assert_eq!(parsed.endpoint, DEFAULT_ENDPOINT);
        assert!(parsed.discard_stale_responses);
        assert_eq!(parsed.caret, CaretPolicy::End);
    }

    #[test]
    fn normalize_resets_out_of_range_values() {
        let settings = normalize_loaded_settings(EditorSettings {
            endpoint: "not a url".to_string(),
            check_delay_ms: 0,
            max_suggestions: 0,
            language: " EN ".to_string(),
            ..EditorSettings::default()
        });

        assert_eq!(settings.endpoint, DEFAULT_ENDPOINT);
        assert_eq!(settings.check_delay_ms, DEFAULT_CHECK_DELAY_MS);
        assert_eq!(settings.max_suggestions, DEFAULT_MAX_SUGGESTIONS);
        assert_eq!(settings.language, "en-US");
    }

    #[test]
    fn validate_rejects_partial_credentials() {
        let result = validate_settings(EditorSettings {
            username: "me@example.com".to_string(),
            ..EditorSettings::default()
        });
        assert!(matches!(result, Err(SettingsError::Invalid(_))));
    }

    #[test]
    fn validate_rejects_non_http_endpoint() {
        let result = validate_settings(EditorSettings {
            endpoint: "ftp://example.com/check".to_string(),
            ..EditorSettings::default()
        });
        assert!(matches!(result, Err(SettingsError::Invalid(_))));
    }

    #[test]
    fn validate_rejects_out_of_range_delay() {
        let result = validate_settings(EditorSettings {
            hide_delay_ms: MAX_DELAY_MS + 1,
            ..EditorSettings::default()
        });
        assert!(matches!(result, Err(SettingsError::Invalid(message)) if message.contains("hideDelayMs")));
    }

    #[test]
    fn language_codes_are_normalized() {
        assert_eq!(normalize_language("en_us"), "en-US");
        assert_eq!(normalize_language("de_DE"), "de-DE");
        assert_eq!(normalize_language(""), "en-US");
    }

    #[test]
    fn settings_file_round_trip_keeps_values() {
        let dir = tempfile::tempdir().expect("temp dir");
        let path = dir.path().join("nested").join("settings.json");
        let settings = EditorSettings {
            check_delay_ms: 1_200,
            caret: CaretPolicy::Preserve,
            ..EditorSettings::default()
        };

        write_settings_file(&path, &settings).expect("settings should be written");
        let loaded = read_settings_file(&path).expect("settings should be read");

        assert_eq!(loaded, settings);
    }

    #[test]
    fn language_tool_config_drops_blank_credentials() {
        let config = EditorSettings::default().language_tool_config();
        assert!(config.username.is_none());
        assert!(config.api_key.is_none());
        assert_eq!(config.request_timeout, Duration::from_millis(DEFAULT_REQUEST_TIMEOUT_MS));
    }
}
