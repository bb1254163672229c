//! Persistent configuration model and defaults.

use crate::protocol::{AutoJoinPolicy, CastOptions, MediaMetadata, DEFAULT_MEDIA_RECEIVER_APP_ID};

/// Root configuration persisted to `castsync.toml`.
#[derive(Debug, Clone, Default, PartialEq, serde::Deserialize, serde::Serialize)]
pub struct Config {
    #[serde(default)]
    /// Session provider options.
    pub cast: CastConfig,
    #[serde(default)]
    /// Metadata attached to load requests.
    pub media: MediaConfig,
}

/// Options handed to the session provider on initialization.
#[derive(Debug, Clone, PartialEq, serde::Deserialize, serde::Serialize)]
pub struct CastConfig {
    /// Receiver application launched on the cast device.
    #[serde(default = "default_receiver_app_id")]
    pub receiver_app_id: String,
    #[serde(default)]
    pub auto_join_policy: AutoJoinPolicy,
}

/// Display metadata shown by the receiver while casting.
#[derive(Debug, Clone, PartialEq, Default, serde::Deserialize, serde::Serialize)]
pub struct MediaConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
}

impl Default for CastConfig {
    fn default() -> Self {
        Self {
            receiver_app_id: default_receiver_app_id(),
            auto_join_policy: AutoJoinPolicy::default(),
        }
    }
}

impl CastConfig {
    pub fn to_options(&self) -> CastOptions {
        CastOptions {
            receiver_app_id: self.receiver_app_id.clone(),
            auto_join_policy: self.auto_join_policy,
        }
    }
}

impl MediaConfig {
    pub fn to_metadata(&self) -> MediaMetadata {
        MediaMetadata {
            title: self.title.clone(),
        }
    }
}

fn default_receiver_app_id() -> String {
    DEFAULT_MEDIA_RECEIVER_APP_ID.to_string()
}

/// Normalizes values a hand-edited file may get wrong.
pub fn sanitize_config(config: Config) -> Config {
    let receiver_app_id = config.cast.receiver_app_id.trim();
    let receiver_app_id = if receiver_app_id.is_empty() {
        default_receiver_app_id()
    } else {
        receiver_app_id.to_string()
    };
    let title = config
        .media
        .title
        .as_deref()
        .map(str::trim)
        .filter(|title| !title.is_empty())
        .map(ToString::to_string);

    Config {
        cast: CastConfig {
            receiver_app_id,
            auto_join_policy: config.cast.auto_join_policy,
        },
        media: MediaConfig { title },
    }
}

#[cfg(test)]
mod tests {
    use super::{sanitize_config, CastConfig, Config, MediaConfig};
    use crate::protocol::{AutoJoinPolicy, DEFAULT_MEDIA_RECEIVER_APP_ID};

    #[test]
    fn test_default_config_targets_default_media_receiver() {
        let config = Config::default();

        assert_eq!(config.cast.receiver_app_id, DEFAULT_MEDIA_RECEIVER_APP_ID);
        assert_eq!(config.cast.auto_join_policy, AutoJoinPolicy::OriginScoped);
        assert_eq!(config.media.title, None);
    }

    #[test]
    fn test_empty_config_deserializes_to_defaults() {
        let parsed: Config = toml::from_str("").expect("config should parse");
        assert_eq!(parsed, Config::default());
    }

    #[test]
    fn test_config_parses_policy_and_title() {
        let parsed: Config = toml::from_str(
            r#"
[cast]
receiver_app_id = "ABCD1234"
auto_join_policy = "page_scoped"

[media]
title = "Sintel Trailer"
"#,
        )
        .expect("config should parse");

        let options = parsed.cast.to_options();
        assert_eq!(options.receiver_app_id, "ABCD1234");
        assert_eq!(options.auto_join_policy, AutoJoinPolicy::PageScoped);
        assert_eq!(
            parsed.media.to_metadata().title.as_deref(),
            Some("Sintel Trailer")
        );
    }

    #[test]
    fn test_unknown_policy_is_rejected() {
        let parsed = toml::from_str::<Config>("[cast]\nauto_join_policy = \"everywhere\"\n");
        assert!(parsed.is_err());
    }

    #[test]
    fn test_sanitize_restores_blank_receiver_and_drops_blank_title() {
        let config = Config {
            cast: CastConfig {
                receiver_app_id: "   ".to_string(),
                auto_join_policy: AutoJoinPolicy::TabAndOriginScoped,
            },
            media: MediaConfig {
                title: Some(" ".to_string()),
            },
        };

        let sanitized = sanitize_config(config);
        assert_eq!(sanitized.cast.receiver_app_id, DEFAULT_MEDIA_RECEIVER_APP_ID);
        assert_eq!(
            sanitized.cast.auto_join_policy,
            AutoJoinPolicy::TabAndOriginScoped
        );
        assert_eq!(sanitized.media.title, None);
    }
}
