use serde::Deserialize;
use std::fmt;
use std::path::{Path, PathBuf};
use teloxide::types::ChatId;

/// Errors that can occur when loading configuration.
#[derive(Debug)]
pub enum ConfigError {
    /// Failed to read the config file.
    ReadFile { path: PathBuf, source: std::io::Error },
    /// Failed to parse JSON.
    ParseJson { path: PathBuf, source: serde_json::Error },
    /// Validation error.
    Validation(String),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ReadFile { path, source } => {
                write!(f, "failed to read config file '{}': {}", path.display(), source)
            }
            Self::ParseJson { path, source } => {
                write!(f, "failed to parse config file '{}': {}", path.display(), source)
            }
            Self::Validation(msg) => write!(f, "config validation error: {}", msg),
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::ReadFile { source, .. } => Some(source),
            Self::ParseJson { source, .. } => Some(source),
            Self::Validation(_) => None,
        }
    }
}

#[derive(Deserialize)]
struct ConfigFile {
    telegram_bot_token: String,
    /// The group whose memberships are tracked. Reward announcements for
    /// deep-link referrals go here.
    group_chat_id: i64,
    /// URL of the image sent along with the reward announcement.
    #[serde(default = "default_reward_image_url")]
    reward_image_url: String,
    /// Referral count at which the reward announcement fires.
    #[serde(default = "default_referral_threshold")]
    referral_threshold: u32,
    /// Directory for state files (database, logs). Defaults to current directory.
    data_dir: Option<String>,
}

fn default_reward_image_url() -> String {
    "https://s33.picofile.com/file/8484362042/Choose_Your_Gift.PNG".to_string()
}

fn default_referral_threshold() -> u32 {
    30
}

pub struct Config {
    pub telegram_bot_token: String,
    /// The tracked group chat.
    pub group_chat_id: ChatId,
    pub reward_image_url: String,
    pub referral_threshold: u32,
    /// Directory for state files (database, logs).
    pub data_dir: PathBuf,
}

impl Config {
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let config_path = path.as_ref().to_path_buf();
        let content = std::fs::read_to_string(&config_path)
            .map_err(|e| ConfigError::ReadFile { path: config_path.clone(), source: e })?;
        let file: ConfigFile = serde_json::from_str(&content)
            .map_err(|e| ConfigError::ParseJson { path: config_path.clone(), source: e })?;

        // Validate required fields
        if file.telegram_bot_token.is_empty() {
            return Err(ConfigError::Validation("telegram_bot_token is required".into()));
        }
        // Telegram tokens are formatted as {bot_id}:{secret} where bot_id is numeric
        let token_parts: Vec<&str> = file.telegram_bot_token.split(':').collect();
        if token_parts.len() != 2 || token_parts[0].parse::<u64>().is_err() || token_parts[1].is_empty() {
            return Err(ConfigError::Validation(
                "telegram_bot_token appears invalid (expected format: 123456789:ABCdefGHI...)".into()
            ));
        }
        if file.group_chat_id == 0 {
            return Err(ConfigError::Validation("group_chat_id is required".into()));
        }
        if file.referral_threshold == 0 {
            return Err(ConfigError::Validation("referral_threshold must be at least 1".into()));
        }

        let data_dir = file
            .data_dir
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from("."));

        Ok(Self {
            telegram_bot_token: file.telegram_bot_token,
            group_chat_id: ChatId(file.group_chat_id),
            reward_image_url: file.reward_image_url,
            referral_threshold: file.referral_threshold,
            data_dir,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn write_config(content: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file
    }

    fn assert_err<T>(result: Result<T, ConfigError>) -> ConfigError {
        match result {
            Ok(_) => panic!("expected error, got Ok"),
            Err(e) => e,
        }
    }

    #[test]
    fn test_valid_config() {
        let file = write_config(r#"{
            "telegram_bot_token": "123456789:ABCdefGHIjklMNOpqrsTUVwxyz",
            "group_chat_id": -1001250582965
        }"#);
        let config = Config::load(file.path()).expect("should load valid config");
        assert_eq!(config.group_chat_id, ChatId(-1001250582965));
        assert_eq!(config.referral_threshold, 30);
        assert!(config.reward_image_url.starts_with("https://"));
        assert_eq!(config.data_dir, PathBuf::from("."));
    }

    #[test]
    fn test_explicit_threshold_and_data_dir() {
        let file = write_config(r#"{
            "telegram_bot_token": "123456789:ABCdef",
            "group_chat_id": -100123,
            "referral_threshold": 5,
            "data_dir": "/var/lib/davatbot"
        }"#);
        let config = Config::load(file.path()).unwrap();
        assert_eq!(config.referral_threshold, 5);
        assert_eq!(config.data_dir, PathBuf::from("/var/lib/davatbot"));
    }

    #[test]
    fn test_empty_token() {
        let file = write_config(r#"{
            "telegram_bot_token": "",
            "group_chat_id": -100123
        }"#);
        let err = assert_err(Config::load(file.path()));
        assert!(matches!(err, ConfigError::Validation(_)));
        assert!(err.to_string().contains("telegram_bot_token"));
    }

    #[test]
    fn test_invalid_token_format_no_colon() {
        let file = write_config(r#"{
            "telegram_bot_token": "invalid_token_no_colon",
            "group_chat_id": -100123
        }"#);
        let err = assert_err(Config::load(file.path()));
        assert!(matches!(err, ConfigError::Validation(_)));
        assert!(err.to_string().contains("invalid"));
    }

    #[test]
    fn test_invalid_token_format_non_numeric_id() {
        let file = write_config(r#"{
            "telegram_bot_token": "notanumber:ABCdef",
            "group_chat_id": -100123
        }"#);
        let err = assert_err(Config::load(file.path()));
        assert!(matches!(err, ConfigError::Validation(_)));
    }

    #[test]
    fn test_invalid_token_format_empty_secret() {
        let file = write_config(r#"{
            "telegram_bot_token": "123456789:",
            "group_chat_id": -100123
        }"#);
        let err = assert_err(Config::load(file.path()));
        assert!(matches!(err, ConfigError::Validation(_)));
    }

    #[test]
    fn test_missing_group_chat_id() {
        let file = write_config(r#"{
            "telegram_bot_token": "123456789:ABCdef"
        }"#);
        let err = assert_err(Config::load(file.path()));
        assert!(matches!(err, ConfigError::ParseJson { .. }));
    }

    #[test]
    fn test_zero_group_chat_id() {
        let file = write_config(r#"{
            "telegram_bot_token": "123456789:ABCdef",
            "group_chat_id": 0
        }"#);
        let err = assert_err(Config::load(file.path()));
        assert!(matches!(err, ConfigError::Validation(_)));
        assert!(err.to_string().contains("group_chat_id"));
    }

    #[test]
    fn test_zero_threshold() {
        let file = write_config(r#"{
            "telegram_bot_token": "123456789:ABCdef",
            "group_chat_id": -100123,
            "referral_threshold": 0
        }"#);
        let err = assert_err(Config::load(file.path()));
        assert!(matches!(err, ConfigError::Validation(_)));
    }

    #[test]
    fn test_file_not_found() {
        let err = assert_err(Config::load("/nonexistent/path/config.json"));
        assert!(matches!(err, ConfigError::ReadFile { .. }));
    }

    #[test]
    fn test_invalid_json() {
        let file = write_config("{ invalid json }");
        let err = assert_err(Config::load(file.path()));
        assert!(matches!(err, ConfigError::ParseJson { .. }));
    }
}
