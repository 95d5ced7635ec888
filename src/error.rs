use thiserror::Error;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Config parse error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("Database error: {0}")]
    Database(#[from] tokio_rusqlite::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Authentication failed: {0}")]
    Auth(String),

    #[error("Not signed in. Run `leet-tracker login` first")]
    NotSignedIn,

    #[error("Backend error: {0}")]
    Backend(String),

    #[error("AI API error: {0}")]
    AiApi(String),

    #[error("AI response was not in valid JSON format: {0}")]
    AiParse(String),

    #[error("Judge error: {0}")]
    Judge(String),

    #[error("LeetCode error: {0}")]
    LeetCode(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

pub type Result<T> = std::result::Result<T, AppError>;
