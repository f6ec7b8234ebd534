use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::env;
use config;

#[derive(Debug, Deserialize, Clone)]
pub struct WebConfig {
    pub host: String,
    pub port: u16,
}

/// Connection details for the OpenAI-compatible chat completion endpoint.
#[derive(Debug, Deserialize, Clone)]
pub struct ChatConfig {
    pub api_url: String,
    pub api_key: String,
    pub model: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub web: WebConfig,
    // Populated from the .env file
    pub database_path: String,
    pub media_path: String,
    pub static_dir: String,
    pub allowed_origins: String,
    pub log_level: String,
    pub session_secret_key: String,
    pub use_secure_cookies: bool,
    pub max_upload_mb: u64,
    pub bcrypt_cost: u32,
    pub chat: Option<ChatConfig>,
}

impl Config {
    pub fn from_env(env_path: &Path) -> Result<Self, config::ConfigError> {
        dotenvy::from_path(env_path)
            .map_err(|e| config::ConfigError::Message(format!(
                "FATAL: Failed to load .env file from '{}'. Error: {}", env_path.display(), e
            )))?;

        let database_path = required_var("DATABASE_PATH")?;
        let media_path = required_var("MEDIA_PATH")?;
        let session_secret_key = required_var("SESSION_SECRET_KEY")?;

        // 128 hex characters decode to the 64 bytes actix-session requires.
        if session_secret_key.len() != 128 || !session_secret_key.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(config::ConfigError::Message(
                "FATAL: 'SESSION_SECRET_KEY' must be 128 hexadecimal characters long (64 bytes).".to_string()
            ));
        }

        let allowed_origins = env::var("ALLOWED_ORIGINS").unwrap_or_else(|_| "".to_string());
        let log_level = env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_string());
        let static_dir = env::var("STATIC_DIR").unwrap_or_else(|_| "./frontend/dist".to_string());

        let use_secure_cookies = env::var("USE_SECURE_COOKIES")
            .unwrap_or_else(|_| "false".to_string())
            .parse::<bool>()
            .unwrap_or(false);

        let max_upload_mb = match env::var("MAX_UPLOAD_MB") {
            Ok(raw) => raw.trim().parse::<u64>().map_err(|_| config::ConfigError::Message(
                "FATAL: 'MAX_UPLOAD_MB' must be a whole number.".to_string()
            ))?,
            Err(_) => 10,
        };

        let bcrypt_cost = match env::var("BCRYPT_COST") {
            Ok(raw) => {
                let cost = raw.trim().parse::<u32>().map_err(|_| config::ConfigError::Message(
                    "FATAL: 'BCRYPT_COST' must be a whole number.".to_string()
                ))?;
                if !(4..=31).contains(&cost) {
                    return Err(config::ConfigError::Message(
                        "FATAL: 'BCRYPT_COST' must be between 4 and 31.".to_string()
                    ));
                }
                cost
            }
            Err(_) => bcrypt::DEFAULT_COST,
        };

        if Path::new(&database_path).is_relative() {
            return Err(config::ConfigError::Message(format!(
                "FATAL: The 'DATABASE_PATH' in your .env file is a relative path ('{}'). It MUST be an absolute path.",
                database_path
            )));
        }

        if Path::new(&media_path).is_relative() {
            return Err(config::ConfigError::Message(format!(
                "FATAL: The 'MEDIA_PATH' in your .env file is a relative path ('{}'). It MUST be an absolute path.",
                media_path
            )));
        }

        let mut builder = config::Config::builder()
            // Base settings (web host/port) from the TOML file.
            .add_source(config::File::new("config/default.toml", config::FileFormat::Toml))
            .set_override("database_path", database_path)?
            .set_override("media_path", media_path)?
            .set_override("static_dir", static_dir)?
            .set_override("session_secret_key", session_secret_key)?
            .set_override("allowed_origins", allowed_origins)?
            .set_override("log_level", log_level)?
            .set_override("use_secure_cookies", use_secure_cookies)?
            .set_override("max_upload_mb", max_upload_mb)?
            .set_override("bcrypt_cost", bcrypt_cost)?;

        // Chat stays disabled unless both the endpoint and the key are present.
        if let (Ok(api_url), Ok(api_key)) = (env::var("CHAT_API_URL"), env::var("CHAT_API_KEY")) {
            if !api_url.trim().is_empty() && !api_key.trim().is_empty() {
                let model = env::var("CHAT_MODEL").unwrap_or_else(|_| "gpt-4o-mini".to_string());
                builder = builder
                    .set_override("chat.api_url", api_url.trim().trim_end_matches('/').to_string())?
                    .set_override("chat.api_key", api_key.trim().to_string())?
                    .set_override("chat.model", model)?;
            }
        }

        builder.build()?.try_deserialize()
    }

    /// Returns the full path to the SQLite database file.
    pub fn db_file_path(&self) -> PathBuf {
        PathBuf::from(&self.database_path).join("papers.db")
    }

    pub fn max_upload_bytes(&self) -> u64 {
        self.max_upload_mb * 1024 * 1024
    }
}

fn required_var(name: &str) -> Result<String, config::ConfigError> {
    env::var(name).map_err(|_| config::ConfigError::Message(format!(
        "FATAL: Environment variable '{}' is not set in your .env file.", name
    )))
}
