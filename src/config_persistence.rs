use std::path::{Path, PathBuf};

use log::{info, warn};
use toml_edit::{value, DocumentMut, Item, Table};

use crate::config::{sanitize_config, Config};

const CONFIG_FILE_NAME: &str = "castsync.toml";

/// Location of the config file in the platform config directory.
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join(CONFIG_FILE_NAME))
}

fn set_table_value_preserving_decor(table: &mut Table, key: &str, item: Item) {
    let existing_value_decor = table
        .get(key)
        .and_then(|current| current.as_value().map(|value| value.decor().clone()));
    table[key] = item;
    if let Some(existing_value_decor) = existing_value_decor {
        if let Some(next_value) = table[key].as_value_mut() {
            *next_value.decor_mut() = existing_value_decor;
        }
    }
}

fn set_table_string_if_changed(table: &mut Table, key: &str, previous: &str, next: &str) {
    if table.contains_key(key) && previous == next {
        return;
    }
    set_table_value_preserving_decor(table, key, value(next));
}

fn ensure_section_table<'a>(
    document: &'a mut DocumentMut,
    key: &str,
) -> Result<&'a mut Table, String> {
    let root = document.as_table_mut();
    if !root.get(key).is_some_and(Item::is_table) {
        root.insert(key, Item::Table(Table::new()));
    }
    root.get_mut(key)
        .and_then(Item::as_table_mut)
        .ok_or_else(|| format!("config section [{}] is not a table", key))
}

fn write_config_to_document(
    document: &mut DocumentMut,
    previous: &Config,
    config: &Config,
) -> Result<(), String> {
    {
        let cast = ensure_section_table(document, "cast")?;
        set_table_string_if_changed(
            cast,
            "receiver_app_id",
            &previous.cast.receiver_app_id,
            &config.cast.receiver_app_id,
        );
        set_table_string_if_changed(
            cast,
            "auto_join_policy",
            previous.cast.auto_join_policy.as_str(),
            config.cast.auto_join_policy.as_str(),
        );
    }

    let media = ensure_section_table(document, "media")?;
    match config.media.title.as_deref() {
        Some(title) => set_table_string_if_changed(
            media,
            "title",
            previous.media.title.as_deref().unwrap_or(""),
            title,
        ),
        None => {
            media.remove("title");
        }
    }
    Ok(())
}

/// Serializes `config` on top of `existing_text`, keeping its comments and
/// formatting for unchanged keys.
pub fn serialize_config_with_preserved_comments(
    existing_text: &str,
    config: &Config,
) -> Result<String, String> {
    let previous = toml::from_str::<Config>(existing_text)
        .map_err(|err| format!("failed to parse existing config as Config: {}", err))?;
    let mut document = existing_text
        .parse::<DocumentMut>()
        .map_err(|err| format!("failed to parse existing config as TOML document: {}", err))?;
    write_config_to_document(&mut document, &previous, config)?;
    Ok(document.to_string())
}

pub fn persist_config_file(config: &Config, path: &Path) {
    let existing_text = std::fs::read_to_string(path).ok();
    let config_text = if let Some(existing_text) = existing_text {
        match serialize_config_with_preserved_comments(&existing_text, config) {
            Ok(updated_text) => Some(updated_text),
            Err(err) => {
                warn!(
                    "Failed to preserve config comments for {} ({}). Falling back to plain serialization.",
                    path.display(),
                    err
                );
                toml::to_string(config).ok()
            }
        }
    } else {
        toml::to_string(config).ok()
    };

    let Some(config_text) = config_text else {
        log::error!("Failed to serialize config for {}", path.display());
        return;
    };

    if let Some(parent) = path.parent() {
        if let Err(err) = std::fs::create_dir_all(parent) {
            log::error!(
                "Failed to create config directory {}: {}",
                parent.display(),
                err
            );
            return;
        }
    }
    if let Err(err) = std::fs::write(path, config_text) {
        log::error!("Failed to persist config to {}: {}", path.display(), err);
    }
}

/// Loads the config at `path`, writing defaults first if the file is missing.
/// Unreadable or invalid files fall back to defaults.
pub fn load_or_create_config(path: &Path) -> Config {
    if !path.exists() {
        info!(
            "Config file not found. Creating default config. path={}",
            path.display()
        );
        persist_config_file(&Config::default(), path);
    }

    let config = match std::fs::read_to_string(path) {
        Ok(content) => match toml::from_str::<Config>(&content) {
            Ok(config) => config,
            Err(err) => {
                warn!(
                    "Invalid config at {} ({}). Using defaults.",
                    path.display(),
                    err
                );
                Config::default()
            }
        },
        Err(err) => {
            warn!(
                "Failed to read config at {} ({}). Using defaults.",
                path.display(),
                err
            );
            Config::default()
        }
    };
    sanitize_config(config)
}

#[cfg(test)]
mod tests {
    use super::{
        load_or_create_config, persist_config_file, serialize_config_with_preserved_comments,
    };
    use crate::config::{Config, MediaConfig};
    use crate::protocol::{AutoJoinPolicy, DEFAULT_MEDIA_RECEIVER_APP_ID};

    #[test]
    fn test_missing_config_is_created_with_defaults() {
        let dir = tempfile::tempdir().expect("temp dir should be created");
        let path = dir.path().join("nested").join("castsync.toml");

        let config = load_or_create_config(&path);

        assert_eq!(config, Config::default());
        assert!(path.exists());
        let written = std::fs::read_to_string(&path).expect("config should be readable");
        assert!(written.contains(DEFAULT_MEDIA_RECEIVER_APP_ID));
    }

    #[test]
    fn test_invalid_config_falls_back_to_defaults() {
        let dir = tempfile::tempdir().expect("temp dir should be created");
        let path = dir.path().join("castsync.toml");
        std::fs::write(&path, "[cast\nreceiver_app_id = ").expect("write should succeed");

        assert_eq!(load_or_create_config(&path), Config::default());
    }

    #[test]
    fn test_serialize_preserves_comments_and_updates_values() {
        let existing = r#"# cast settings
[cast]
# receiver used for the living room TV
receiver_app_id = "CC1AD845"
auto_join_policy = "origin_scoped"
"#;
        let mut config = Config::default();
        config.cast.auto_join_policy = AutoJoinPolicy::PageScoped;
        config.media = MediaConfig {
            title: Some("Trailer".to_string()),
        };

        let updated = serialize_config_with_preserved_comments(existing, &config)
            .expect("serialization should succeed");

        assert!(updated.contains("# receiver used for the living room TV"));
        assert!(updated.contains("auto_join_policy = \"page_scoped\""));
        assert!(updated.contains("title = \"Trailer\""));
        let reparsed: Config = toml::from_str(&updated).expect("output should parse");
        assert_eq!(reparsed, config);
    }

    #[test]
    fn test_serialize_expands_inline_section_into_table() {
        let existing = "cast = { receiver_app_id = \"ABCD1234\" }\n";
        let mut config = Config::default();
        config.cast.receiver_app_id = "ABCD1234".to_string();

        let updated = serialize_config_with_preserved_comments(existing, &config)
            .expect("serialization should succeed");

        assert!(updated.contains("[cast]"));
        assert!(updated.contains("receiver_app_id = \"ABCD1234\""));
        let reparsed: Config = toml::from_str(&updated).expect("output should parse");
        assert_eq!(reparsed, config);
    }

    #[test]
    fn test_persist_then_load_keeps_title() {
        let dir = tempfile::tempdir().expect("temp dir should be created");
        let path = dir.path().join("castsync.toml");
        let mut config = Config::default();
        config.media.title = Some("Sintel Trailer".to_string());

        persist_config_file(&config, &path);

        assert_eq!(load_or_create_config(&path), config);
    }
}
