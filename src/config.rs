use std::{fmt, fs, path::Path};

use anyhow::Context;
use serde::Deserialize;
use url::Url;

use crate::error::FatalError;

const SETTINGS_FILE: &str = "settings.json";

/// Contents of the `settings.json` that lives next to the bot.
///
/// Field names follow the file's original camel-case spelling. Parsing is
/// strict: a missing, mistyped, or unknown field fails the load instead of
/// sneaking a half-filled config into the run.
#[derive(Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Settings {
    #[serde(rename = "baseURL")]
    pub base_url: Url,
    #[serde(rename = "botUser")]
    pub bot_user: String,
    #[serde(rename = "botPassword")]
    pub bot_password: String,
    #[serde(rename = "communityId")]
    pub community_id: i32,
}

impl Settings {
    pub fn load() -> Result<Self, FatalError> {
        Self::load_from(Path::new(SETTINGS_FILE))
    }

    fn load_from(path: &Path) -> Result<Self, FatalError> {
        tracing::info!(path = %path.display(), "Reading settings at path");

        let read = || -> anyhow::Result<Self> {
            let text = fs::read_to_string(path)
                .with_context(|| format!("Failed reading {}", path.display()))?;
            let settings = serde_json::from_str(&text)
                .with_context(|| format!("Failed parsing {}", path.display()))?;
            Ok(settings)
        };

        read().map_err(FatalError::ConfigNotFound)
    }
}

impl fmt::Debug for Settings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Keep the bot's password out of logs and panic messages
        f.debug_struct("Settings")
            .field("base_url", &self.base_url.as_str())
            .field("bot_user", &self.bot_user)
            .field("bot_password", &"<redacted>")
            .field("community_id", &self.community_id)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"
    {
        "baseURL": "https://lemmy.example.org",
        "botUser": "daily_bot",
        "botPassword": "hunter2",
        "communityId": 3
    }
    "#;

    #[test]
    fn sanity() {
        let settings: Settings = serde_json::from_str(SAMPLE).unwrap();
        insta::assert_debug_snapshot!(settings);
    }

    #[test]
    fn loads_from_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(SETTINGS_FILE);
        fs::write(&path, SAMPLE).unwrap();

        let settings = Settings::load_from(&path).unwrap();
        assert_eq!(settings.bot_user, "daily_bot");
        assert_eq!(settings.community_id, 3);
    }

    #[test]
    fn missing_file_is_config_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join(SETTINGS_FILE);

        let err = Settings::load_from(&missing).unwrap_err();
        assert!(matches!(err, FatalError::ConfigNotFound(_)));
    }

    #[test]
    fn rejects_missing_fields() {
        let truncated = r#"{ "baseURL": "https://lemmy.example.org", "botUser": "daily_bot" }"#;
        assert!(serde_json::from_str::<Settings>(truncated).is_err());
    }

    #[test]
    fn rejects_unknown_fields() {
        let extra = r#"
        {
            "baseURL": "https://lemmy.example.org",
            "botUser": "daily_bot",
            "botPassword": "hunter2",
            "communityId": 3,
            "communityID": 4
        }
        "#;
        assert!(serde_json::from_str::<Settings>(extra).is_err());
    }

    #[test]
    fn rejects_invalid_base_url() {
        let bad_url = r#"
        {
            "baseURL": "not a url",
            "botUser": "daily_bot",
            "botPassword": "hunter2",
            "communityId": 3
        }
        "#;
        assert!(serde_json::from_str::<Settings>(bad_url).is_err());
    }
}
