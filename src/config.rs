use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;

use crate::theme::ThemeMode;

fn default_chart_width() -> u32 {
    800
}

fn default_chart_height() -> u32 {
    450
}

#[derive(Debug, Deserialize, Serialize)]
pub struct Config {
    pub agent: AgentConfig,
    pub window: WindowConfig,
    #[serde(default)]
    pub ui: UiConfig,
    #[serde(default)]
    pub export: ExportConfig,
}

#[derive(Debug, Deserialize, Serialize)]
pub struct AgentConfig {
    pub host: String,
}

#[derive(Debug, Deserialize, Serialize)]
pub struct WindowConfig {
    pub width: u32,
    pub height: u32,
    pub min_width: u32,
    pub min_height: u32,
}

#[derive(Debug, Default, Deserialize, Serialize)]
pub struct UiConfig {
    #[serde(default)]
    pub theme: ThemeMode,
}

#[derive(Debug, Deserialize, Serialize)]
pub struct ExportConfig {
    /// Where downloads land. Defaults to `$HOME/Downloads`.
    #[serde(default)]
    pub directory: Option<PathBuf>,
    #[serde(default = "default_chart_width")]
    pub chart_width: u32,
    #[serde(default = "default_chart_height")]
    pub chart_height: u32,
}

impl Default for ExportConfig {
    fn default() -> Self {
        ExportConfig {
            directory: None,
            chart_width: default_chart_width(),
            chart_height: default_chart_height(),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Config {
            agent: AgentConfig {
                host: "http://localhost:8000".to_string(),
            },
            window: WindowConfig {
                width: 1400,
                height: 900,
                min_width: 900,
                min_height: 600,
            },
            ui: UiConfig::default(),
            export: ExportConfig::default(),
        }
    }
}

impl Config {
    pub fn load() -> Self {
        let config_path = Self::get_config_path();

        if config_path.exists() {
            match fs::read_to_string(&config_path) {
                Ok(contents) => match Self::from_toml(&contents) {
                    Ok(config) => return config,
                    Err(e) => tracing::warn!("Error parsing config.toml: {}. Using defaults.", e),
                },
                Err(e) => tracing::warn!("Error reading config.toml: {}. Using defaults.", e),
            }
        } else if let Some(parent) = config_path.parent() {
            let _ = fs::create_dir_all(parent);
        }

        Config::default()
    }

    pub fn from_toml(contents: &str) -> anyhow::Result<Self> {
        Ok(toml::from_str(contents)?)
    }

    pub fn get_config_path() -> PathBuf {
        Self::get_config_dir().join("config.toml")
    }

    pub fn get_config_dir() -> PathBuf {
        if let Some(home) = std::env::var_os("HOME") {
            PathBuf::from(home).join(".config/gmis-desk")
        } else {
            PathBuf::from(".")
        }
    }

    pub fn download_dir(&self) -> PathBuf {
        if let Some(dir) = &self.export.directory {
            return dir.clone();
        }
        match std::env::var_os("HOME") {
            Some(home) => PathBuf::from(home).join("Downloads"),
            None => PathBuf::from("."),
        }
    }

    pub fn chat_url(&self) -> String {
        format!("{}/api/chat", self.agent.host.trim_end_matches('/'))
    }

    pub fn knowledge_menu_url(&self) -> String {
        format!("{}/api/knowledge-menu", self.agent.host.trim_end_matches('/'))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_minimal_config_with_defaults() {
        let config = Config::from_toml(
            r#"
            [agent]
            host = "http://agent.internal:8000/"

            [window]
            width = 1200
            height = 800
            min_width = 800
            min_height = 500
            "#,
        )
        .unwrap();

        assert_eq!(config.ui.theme, ThemeMode::Dark);
        assert_eq!(config.export.chart_width, 800);
        assert_eq!(config.export.chart_height, 450);
        assert!(config.export.directory.is_none());
        assert_eq!(config.chat_url(), "http://agent.internal:8000/api/chat");
        assert_eq!(
            config.knowledge_menu_url(),
            "http://agent.internal:8000/api/knowledge-menu"
        );
    }

    #[test]
    fn parses_ui_and_export_sections() {
        let config = Config::from_toml(
            r#"
            [agent]
            host = "http://localhost:8000"

            [window]
            width = 1200
            height = 800
            min_width = 800
            min_height = 500

            [ui]
            theme = "light"

            [export]
            directory = "/tmp/out"
            chart_width = 1024
            "#,
        )
        .unwrap();

        assert_eq!(config.ui.theme, ThemeMode::Light);
        assert_eq!(config.download_dir(), PathBuf::from("/tmp/out"));
        assert_eq!(config.export.chart_width, 1024);
        assert_eq!(config.export.chart_height, 450);
    }

    #[test]
    fn rejects_config_without_agent_section() {
        assert!(Config::from_toml("[window]\nwidth = 1\nheight = 1\nmin_width = 1\nmin_height = 1\n").is_err());
    }
}
