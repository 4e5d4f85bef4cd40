use std::collections::HashMap;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

const DEFAULT_ENV_PREFIX: &str = "RECVIEW";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct Config {
    #[serde(default)]
    pub api: ApiConfig,
    #[serde(default)]
    pub ui: UIConfig,
    #[serde(default)]
    pub export: ExportConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ApiConfig {
    #[serde(default)]
    pub base_url: String,
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
    #[serde(default = "default_object")]
    pub object: String,
    #[serde(default)]
    pub record_id: String,
    #[serde(default)]
    pub viewer_id: String,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: String::new(),
            user_agent: default_user_agent(),
            object: default_object(),
            record_id: String::new(),
            viewer_id: String::new(),
        }
    }
}

fn default_user_agent() -> String {
    "recview-dev/0.1 (+https://github.com/recview/recview)".to_string()
}

fn default_object() -> String {
    "Account".to_string()
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct UIConfig {
    #[serde(default = "default_theme")]
    pub theme: String,
    #[serde(default = "default_page_size")]
    pub page_size: u64,
    #[serde(default)]
    pub editable: bool,
}

impl Default for UIConfig {
    fn default() -> Self {
        Self {
            theme: default_theme(),
            page_size: default_page_size(),
            editable: false,
        }
    }
}

fn default_theme() -> String {
    "default".into()
}

fn default_page_size() -> u64 {
    10
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ExportConfig {
    #[serde(default = "default_export_dir")]
    pub dir: Option<PathBuf>,
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            dir: default_export_dir(),
        }
    }
}

fn default_export_dir() -> Option<PathBuf> {
    dirs::download_dir()
        .or_else(dirs::home_dir)
        .map(|dir| dir.join("recview"))
}

#[derive(Debug, Clone, Default)]
pub struct LoadOptions {
    pub config_file: Option<PathBuf>,
    pub env_prefix: Option<String>,
}

pub fn load(options: LoadOptions) -> Result<Config> {
    let mut cfg = Config::default();

    if let Some(path) = options.config_file.as_ref() {
        if path.exists() {
            let from_file = read_config_file(path)?;
            cfg = merge_config(cfg, from_file);
        }
    } else if let Some(default_path) = default_config_path() {
        if default_path.exists() {
            let from_file = read_config_file(&default_path)?;
            cfg = merge_config(cfg, from_file);
        }
    }

    let prefix = options.env_prefix.as_deref().unwrap_or(DEFAULT_ENV_PREFIX);
    cfg = merge_config(cfg, load_env(prefix)?);

    Ok(cfg)
}

fn read_config_file(path: &Path) -> Result<Config> {
    let data = fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file at {}", path.display()))?;
    let config: Config = serde_yaml::from_str(&data)
        .with_context(|| format!("Failed to parse config file at {}", path.display()))?;
    Ok(config)
}

fn merge_config(mut base: Config, other: Config) -> Config {
    if !other.api.base_url.is_empty() {
        base.api.base_url = other.api.base_url;
    }
    if !other.api.user_agent.is_empty() {
        base.api.user_agent = other.api.user_agent;
    }
    if !other.api.object.is_empty() {
        base.api.object = other.api.object;
    }
    if !other.api.record_id.is_empty() {
        base.api.record_id = other.api.record_id;
    }
    if !other.api.viewer_id.is_empty() {
        base.api.viewer_id = other.api.viewer_id;
    }

    if !other.ui.theme.is_empty() {
        base.ui.theme = other.ui.theme;
    }
    if other.ui.page_size != 0 {
        base.ui.page_size = other.ui.page_size;
    }
    if other.ui.editable {
        base.ui.editable = true;
    }

    if other.export.dir.is_some() {
        base.export.dir = other.export.dir;
    }

    base
}

fn load_env(prefix: &str) -> Result<Config> {
    let mut map: HashMap<String, String> = HashMap::new();
    let upper_prefix = format!("{}_", prefix.to_uppercase());

    for (key, value) in env::vars() {
        if let Some(stripped) = key.strip_prefix(&upper_prefix) {
            let normalized = stripped.to_ascii_lowercase().replace("__", ".");
            map.insert(normalized, value);
        }
    }

    // Start from empty sentinels rather than defaults so the merge only
    // overrides what the environment actually set.
    let mut cfg = empty_config();

    for (key, value) in map {
        apply_env_value(&mut cfg, &key, value);
    }

    Ok(cfg)
}

fn empty_config() -> Config {
    Config {
        api: ApiConfig {
            base_url: String::new(),
            user_agent: String::new(),
            object: String::new(),
            record_id: String::new(),
            viewer_id: String::new(),
        },
        ui: UIConfig {
            theme: String::new(),
            page_size: 0,
            editable: false,
        },
        export: ExportConfig { dir: None },
    }
}

fn apply_env_value(cfg: &mut Config, key: &str, value: String) {
    match key {
        "api.base_url" => cfg.api.base_url = value,
        "api.user_agent" => cfg.api.user_agent = value,
        "api.object" => cfg.api.object = value,
        "api.record_id" => cfg.api.record_id = value,
        "api.viewer_id" => cfg.api.viewer_id = value,
        "ui.theme" => cfg.ui.theme = value,
        "ui.page_size" => {
            if let Ok(parsed) = value.parse::<u64>() {
                cfg.ui.page_size = parsed;
            }
        }
        "ui.editable" => {
            cfg.ui.editable = matches!(value.as_str(), "1" | "true" | "TRUE" | "True");
        }
        "export.dir" => cfg.export.dir = Some(PathBuf::from(value)),
        _ => {}
    }
}

pub fn default_path() -> Option<PathBuf> {
    default_config_path()
}

fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("recview").join("config.yaml"))
}

pub fn save_api_settings(
    path: Option<PathBuf>,
    base_url: &str,
    user_agent: &str,
    object: &str,
) -> Result<PathBuf> {
    let base_url = base_url.trim();
    let user_agent = user_agent.trim();
    let object = object.trim();

    anyhow::ensure!(!base_url.is_empty(), "config: api.base_url is required");
    anyhow::ensure!(!user_agent.is_empty(), "config: api.user_agent is required");

    let path = if let Some(path) = path {
        path
    } else {
        default_config_path().context("config: unable to determine default config path")?
    };

    let mut cfg = if path.exists() {
        read_config_file(&path)?
    } else {
        Config::default()
    };

    cfg.api.base_url = base_url.to_string();
    cfg.api.user_agent = user_agent.to_string();
    if !object.is_empty() {
        cfg.api.object = object.to_string();
    }

    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("config: failed to create directory {}", parent.display()))?;
    }

    let contents = serde_yaml::to_string(&cfg).context("config: failed to serialize config")?;
    fs::write(&path, contents)
        .with_context(|| format!("config: failed to write file {}", path.display()))?;

    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::env;
    use tempfile::tempdir;

    #[test]
    fn load_defaults_without_files() {
        let cfg = load(LoadOptions::default()).unwrap();
        assert_eq!(cfg.ui.theme, "default");
        assert_eq!(cfg.ui.page_size, 10);
        assert_eq!(cfg.api.object, "Account");
        assert_eq!(cfg.api.user_agent, default_user_agent());
    }

    #[test]
    fn save_api_settings_creates_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.yaml");
        save_api_settings(
            Some(path.clone()),
            "https://example.test/api",
            "agent/1.0",
            "Contact",
        )
        .unwrap();
        let saved = read_config_file(&path).unwrap();
        assert_eq!(saved.api.base_url, "https://example.test/api");
        assert_eq!(saved.api.object, "Contact");
    }

    #[test]
    fn env_overrides() {
        env::set_var("RECVIEW_UI__PAGE_SIZE", "25");
        let cfg = load(LoadOptions::default()).unwrap();
        assert_eq!(cfg.ui.page_size, 25);
        env::remove_var("RECVIEW_UI__PAGE_SIZE");
    }

    #[test]
    fn file_values_survive_merge() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.yaml");
        fs::write(
            &path,
            "api:\n  base_url: https://example.test/api\nui:\n  page_size: 50\n",
        )
        .unwrap();
        let cfg = load(LoadOptions {
            config_file: Some(path),
            env_prefix: Some("RECVIEW_TEST_UNSET".into()),
        })
        .unwrap();
        assert_eq!(cfg.api.base_url, "https://example.test/api");
        assert_eq!(cfg.ui.page_size, 50);
        // Untouched sections keep their defaults.
        assert_eq!(cfg.api.object, "Account");
    }
}
