use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub source: SourceConfig,
    #[serde(default)]
    pub watch: WatchConfig,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub notify: NotifyConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceConfig {
    /// Which upstream variant to talk to: "session_rpc" or "rest_grid".
    #[serde(default = "default_variant")]
    pub variant: String,
    #[serde(default)]
    pub server: String,
    #[serde(default)]
    pub school: String,
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: String,
    /// Weekly-grid element to query (1 = class, 2 = teacher, 5 = student).
    #[serde(default)]
    pub element_type: Option<i64>,
    #[serde(default)]
    pub element_id: Option<i64>,
    #[serde(default = "default_days_ahead")]
    pub days_ahead: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WatchConfig {
    #[serde(default = "default_poll_interval")]
    pub poll_interval_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    #[serde(default = "default_snapshot_path")]
    pub snapshot_path: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotifyConfig {
    #[serde(default)]
    pub telegram_bot_token: String,
    #[serde(default)]
    pub telegram_chat_id: String,
    #[serde(default)]
    pub webhook_url: String,
    #[serde(default = "default_enable_stdout")]
    pub enable_stdout: bool,
}

#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub server: Option<String>,
    pub school: Option<String>,
    pub variant: Option<String>,
    pub days_ahead: Option<u32>,
}

impl Config {
    pub fn default_path() -> PathBuf {
        let home = dirs::home_dir().unwrap_or_else(|| PathBuf::from("."));
        home.join(".config/untis-watcher/config.toml")
    }

    pub fn load(path: Option<&Path>) -> Result<Self> {
        let path = path
            .map(|p| p.to_path_buf())
            .unwrap_or_else(Self::default_path);
        if !path.exists() {
            return Ok(Self::default());
        }
        let data = fs::read_to_string(&path)
            .with_context(|| format!("failed reading config: {}", path.display()))?;
        let parsed: Self = toml::from_str(&data)
            .with_context(|| format!("failed parsing TOML config: {}", path.display()))?;
        Ok(parsed)
    }

    pub fn apply_overrides(&mut self, overrides: ConfigOverrides) {
        if let Some(server) = overrides.server {
            self.source.server = server;
        }
        if let Some(school) = overrides.school {
            self.source.school = school;
        }
        if let Some(variant) = overrides.variant {
            self.source.variant = variant;
        }
        if let Some(days_ahead) = overrides.days_ahead {
            self.source.days_ahead = days_ahead;
        }
    }

    pub fn write_template(path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).with_context(|| {
                format!("failed creating config directory: {}", parent.display())
            })?;
        }
        fs::write(path, Self::default_template())
            .with_context(|| format!("failed writing config template: {}", path.display()))
    }

    pub fn resolved_snapshot_path(&self) -> PathBuf {
        expand_tilde(&self.storage.snapshot_path)
    }

    pub fn default_template() -> String {
        let template = r#"[source]
variant = "session_rpc"
server = "melpomene.webuntis.com"
school = "your-school-slug"
username = ""
password = ""
# element_type = 1
# element_id = 0
days_ahead = 7

[watch]
poll_interval_secs = 300

[storage]
snapshot_path = "~/.local/share/untis-watcher/last_timetable.json"

[notify]
telegram_bot_token = ""
telegram_chat_id = ""
webhook_url = ""
enable_stdout = true
"#;
        template.to_string()
    }
}

pub fn expand_tilde(path: &str) -> PathBuf {
    if let Some(stripped) = path.strip_prefix("~/") {
        if let Some(home) = dirs::home_dir() {
            return home.join(stripped);
        }
    }
    PathBuf::from(path)
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            variant: default_variant(),
            server: String::new(),
            school: String::new(),
            username: String::new(),
            password: String::new(),
            element_type: None,
            element_id: None,
            days_ahead: default_days_ahead(),
        }
    }
}

impl Default for WatchConfig {
    fn default() -> Self {
        Self {
            poll_interval_secs: default_poll_interval(),
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            snapshot_path: default_snapshot_path(),
        }
    }
}

impl Default for NotifyConfig {
    fn default() -> Self {
        Self {
            telegram_bot_token: String::new(),
            telegram_chat_id: String::new(),
            webhook_url: String::new(),
            enable_stdout: default_enable_stdout(),
        }
    }
}

fn default_variant() -> String {
    "session_rpc".to_string()
}

fn default_days_ahead() -> u32 {
    7
}

fn default_poll_interval() -> u64 {
    300
}

fn default_snapshot_path() -> String {
    "~/.local/share/untis-watcher/last_timetable.json".to_string()
}

fn default_enable_stdout() -> bool {
    true
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn template_parses_back_into_defaults() {
        let parsed: Config = toml::from_str(&Config::default_template()).unwrap();
        assert_eq!(parsed.source.variant, "session_rpc");
        assert_eq!(parsed.source.days_ahead, 7);
        assert_eq!(parsed.watch.poll_interval_secs, 300);
        assert!(parsed.notify.enable_stdout);
    }

    #[test]
    fn missing_sections_fall_back_to_defaults() {
        let parsed: Config = toml::from_str("[source]\nserver = \"example.com\"\n").unwrap();
        assert_eq!(parsed.source.server, "example.com");
        assert_eq!(parsed.source.days_ahead, 7);
        assert_eq!(
            parsed.storage.snapshot_path,
            "~/.local/share/untis-watcher/last_timetable.json"
        );
    }
}
