use std::path::Path;
use std::{env, fs};

use log::{debug, info};
use serde::Deserialize;

use crate::error::{BotError, Result};

const DEFAULT_CONFIG_PATH: &str = "config.json";

/// Process-wide immutable settings, loaded once before any component starts.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Config {
    /// Discord bot token.
    pub token: String,
    /// Application client id, needed for command registration.
    pub client_id: u64,
    /// Guilds that receive guild-scoped command registrations.
    pub guild_ids: Vec<u64>,
    /// OpenAI API key.
    #[serde(rename = "openAIKey")]
    pub open_ai_key: String,
}

impl Config {
    /// Load the configuration file, honoring a `SENKO_CONFIG` path override.
    pub fn load() -> Result<Self> {
        dotenvy::dotenv().ok();

        let path =
            env::var("SENKO_CONFIG").unwrap_or_else(|_| DEFAULT_CONFIG_PATH.to_string());
        Self::from_path(Path::new(&path))
    }

    pub fn from_path(path: &Path) -> Result<Self> {
        debug!("Loading configuration from {}", path.display());

        let raw = fs::read_to_string(path)
            .map_err(|e| BotError::Config(format!("failed to read {}: {e}", path.display())))?;
        let config = Self::from_json(&raw)?;

        info!("Configuration loaded successfully");
        debug!("Token length: {} characters", config.token.len());
        debug!("Registered guilds: {}", config.guild_ids.len());

        Ok(config)
    }

    fn from_json(raw: &str) -> Result<Self> {
        let config: Config = serde_json::from_str(raw)?;
        if config.token.is_empty() {
            return Err(BotError::Config("bot token is empty".to_string()));
        }
        if config.open_ai_key.is_empty() {
            return Err(BotError::Config("OpenAI API key is empty".to_string()));
        }
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_original_key_names() -> Result<()> {
        let config = Config::from_json(
            r#"{
                "token": "bot-token",
                "clientId": 1234567890,
                "guildIds": [111, 222],
                "openAIKey": "sk-test"
            }"#,
        )?;
        assert_eq!(config.token, "bot-token");
        assert_eq!(config.client_id, 1_234_567_890);
        assert_eq!(config.guild_ids, vec![111, 222]);
        assert_eq!(config.open_ai_key, "sk-test");
        Ok(())
    }

    #[test]
    fn rejects_empty_token() {
        let result = Config::from_json(
            r#"{"token": "", "clientId": 1, "guildIds": [], "openAIKey": "sk-test"}"#,
        );
        assert!(matches!(result, Err(BotError::Config(_))));
    }

    #[test]
    fn rejects_malformed_json() {
        assert!(matches!(
            Config::from_json("not json"),
            Err(BotError::Json(_))
        ));
    }
}
