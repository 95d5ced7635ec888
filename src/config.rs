use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{AppError, Result};

const APP_DIR: &str = "leet-tracker";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default = "default_db_path")]
    pub db_path: String,

    pub supabase_url: Option<String>,
    pub supabase_anon_key: Option<String>,

    pub openai_api_key: Option<String>,
    #[serde(default = "default_openai_model")]
    pub openai_model: String,
    #[serde(default = "default_openai_api_url")]
    pub openai_api_url: String,

    #[serde(default = "default_judge_api_url")]
    pub judge_api_url: String,
    pub judge_api_key: Option<String>,
    #[serde(default = "default_judge_max_polls")]
    pub judge_max_polls: u32,
    #[serde(default = "default_judge_poll_interval_ms")]
    pub judge_poll_interval_ms: u64,

    #[serde(default = "default_proxy_bind")]
    pub proxy_bind: String,
    #[serde(default = "default_proxy_port")]
    pub proxy_port: u16,
    #[serde(default = "default_proxy_url")]
    pub proxy_url: String,
    #[serde(default = "default_leetcode_graphql_url")]
    pub leetcode_graphql_url: String,
}

fn default_db_path() -> String {
    data_dir().join("tracker.db").to_string_lossy().to_string()
}

fn default_openai_model() -> String {
    "gpt-4.1".to_string()
}

fn default_openai_api_url() -> String {
    "https://api.openai.com/v1/chat/completions".to_string()
}

fn default_judge_api_url() -> String {
    "https://judge0-ce.p.rapidapi.com".to_string()
}

fn default_judge_max_polls() -> u32 {
    10
}

fn default_judge_poll_interval_ms() -> u64 {
    1000
}

fn default_proxy_bind() -> String {
    "127.0.0.1".to_string()
}

fn default_proxy_port() -> u16 {
    4000
}

fn default_proxy_url() -> String {
    "http://127.0.0.1:4000".to_string()
}

fn default_leetcode_graphql_url() -> String {
    "https://leetcode.com/graphql".to_string()
}

/// Per-user data directory, created on first use.
pub fn data_dir() -> PathBuf {
    let dir = dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(APP_DIR);
    std::fs::create_dir_all(&dir).ok();
    dir
}

impl Default for Config {
    fn default() -> Self {
        Self {
            db_path: default_db_path(),
            supabase_url: None,
            supabase_anon_key: None,
            openai_api_key: None,
            openai_model: default_openai_model(),
            openai_api_url: default_openai_api_url(),
            judge_api_url: default_judge_api_url(),
            judge_api_key: None,
            judge_max_polls: default_judge_max_polls(),
            judge_poll_interval_ms: default_judge_poll_interval_ms(),
            proxy_bind: default_proxy_bind(),
            proxy_port: default_proxy_port(),
            proxy_url: default_proxy_url(),
            leetcode_graphql_url: default_leetcode_graphql_url(),
        }
    }
}

impl Config {
    pub fn load() -> Result<Self> {
        let mut config = Self::load_from(&Self::config_path())?;
        config.apply_env(|key| std::env::var(key).ok());
        Ok(config)
    }

    /// Reads the file at `path`, writing the defaults there when it is missing.
    pub fn load_from(path: &Path) -> Result<Self> {
        if path.exists() {
            let content = std::fs::read_to_string(path)?;
            let config: Config = toml::from_str(&content)?;
            Ok(config)
        } else {
            let config = Config::default();
            config.save_to(path)?;
            Ok(config)
        }
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content =
            toml::to_string_pretty(self).map_err(|e| AppError::Config(e.to_string()))?;
        std::fs::write(path, content)?;
        Ok(())
    }

    pub fn config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(APP_DIR)
            .join("config.toml")
    }

    /// Secrets may come from the environment instead of the config file.
    fn apply_env<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(v) = non_empty("SUPABASE_URL") {
            self.supabase_url = Some(v);
        }
        if let Some(v) = non_empty("SUPABASE_ANON_KEY") {
            self.supabase_anon_key = Some(v);
        }
        if let Some(v) = non_empty("OPENAI_API_KEY") {
            self.openai_api_key = Some(v);
        }
        if let Some(v) = non_empty("JUDGE0_API_KEY") {
            self.judge_api_key = Some(v);
        }
    }

    /// Backend URL and anon key, required by every command that talks to Supabase.
    pub fn supabase(&self) -> Result<(&str, &str)> {
        match (self.supabase_url.as_deref(), self.supabase_anon_key.as_deref()) {
            (Some(url), Some(key)) if !url.is_empty() && !key.is_empty() => {
                Ok((url.trim_end_matches('/'), key))
            }
            _ => Err(AppError::Config(format!(
                "supabase_url and supabase_anon_key must be set in {} or via SUPABASE_URL / SUPABASE_ANON_KEY",
                Self::config_path().display()
            ))),
        }
    }
}
