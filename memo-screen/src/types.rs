use std::env;
use url::Url;

pub use interfaces::{
    ChunkVerdict, Decision, Finding, JudgeTag, Pass, SubmissionState, Tag, VerificationOutcome,
};

#[derive(Debug, Clone)]
pub struct ScreenConfig {
    pub api_key: Option<String>,
    pub base_url: String,
    pub model: String,
    pub temperature: f32,
    pub timeout_seconds: u64,
    /// Hard output ceiling for the describer call.
    pub describe_max_tokens: u32,
    pub min_memo_chars: usize,
    pub submitter_address: String,
    pub database_url: Option<String>,
}

impl Default for ScreenConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: "https://api.openai.com".to_string(),
            model: "gpt-4o-mini-2024-07-18".to_string(),
            temperature: 0.0,
            timeout_seconds: 60,
            describe_max_tokens: 150,
            min_memo_chars: 10,
            submitter_address: "anonymous".to_string(),
            database_url: None,
        }
    }
}

impl ScreenConfig {
    /// Start from defaults and apply whatever is set in the environment.
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(key) = env::var("OPENAI_API_KEY") {
            if !key.trim().is_empty() {
                config.api_key = Some(key);
            }
        }
        if let Ok(base_url) = env::var("OPENAI_BASE_URL") {
            config.base_url = base_url;
        }
        if let Ok(model) = env::var("SCREEN_MODEL") {
            config.model = model;
        }
        if let Some(timeout) = env::var("SCREEN_TIMEOUT_SECONDS").ok().and_then(|v| v.parse().ok()) {
            config.timeout_seconds = timeout;
        }
        if let Some(max_tokens) = env::var("SCREEN_DESCRIBE_MAX_TOKENS").ok().and_then(|v| v.parse().ok()) {
            config.describe_max_tokens = max_tokens;
        }
        if let Ok(address) = env::var("SCREEN_SUBMITTER_ADDRESS") {
            config.submitter_address = address;
        }
        if let Ok(database_url) = env::var("DATABASE_URL") {
            config.database_url = Some(database_url);
        }

        config
    }

    pub fn validate(&self) -> Result<()> {
        self.completions_url()?;
        if self.model.trim().is_empty() {
            return Err(ScreenError::Config("model name must not be empty".to_string()));
        }
        if self.describe_max_tokens == 0 {
            return Err(ScreenError::Config("describe_max_tokens must be positive".to_string()));
        }
        if self.timeout_seconds == 0 {
            return Err(ScreenError::Config("timeout_seconds must be positive".to_string()));
        }
        Ok(())
    }

    pub fn completions_url(&self) -> Result<Url> {
        let url = Url::parse(&format!("{}/v1/chat/completions", self.base_url.trim_end_matches('/')))?;
        Ok(url)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ScreenError {
    #[error("Oracle contract violated: {0}")]
    OracleContract(String),

    #[error("Oracle refused to answer: {0}")]
    OracleRefusal(String),

    #[error("Aggregator contract violated: {0}")]
    AggregatorContract(String),

    #[error("Persistence error: {0}")]
    Persistence(String),

    #[error("Input text contains no words")]
    EmptyInput,

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl From<sqlx::Error> for ScreenError {
    fn from(err: sqlx::Error) -> Self {
        ScreenError::Persistence(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, ScreenError>;
