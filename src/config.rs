//! Process configuration, assembled once at startup from the environment.

use std::path::PathBuf;
use std::time::Duration;

use crate::error::{Error, Result};

/// Full process configuration. Constructed once via [`Config::from_env`] and
/// held read-only for the lifetime of the process.
#[derive(Debug, Clone)]
pub struct Config {
    pub admin_api_key: String,
    pub llm_base_url: String,
    pub llm_model: String,
    pub vector_store_dir: PathBuf,
    pub collection_name: String,
    pub upload_dir: PathBuf,
    pub max_file_size_mb: u64,
    pub allowed_extensions: Vec<String>,
    pub chunk_size: usize,
    pub chunk_overlap: usize,
    pub top_k_results: usize,
    pub embedding_model: String,
    pub embedding_dimension: usize,
    pub cors_origins: Vec<String>,
    pub history_budget_tokens: usize,
    pub request_timeout: Duration,
    pub inter_chunk_timeout: Duration,
    pub host: String,
    pub port: u16,
}

fn env_or(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

fn env_parse<T: std::str::FromStr>(key: &str, default: T) -> Result<T> {
    match std::env::var(key) {
        Ok(raw) => raw
            .parse::<T>()
            .map_err(|_| Error::Config(format!("{} is not a valid value: '{}'", key, raw))),
        Err(_) => Ok(default),
    }
}

fn split_csv(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}

impl Config {
    /// Load configuration from the process environment, applying defaults,
    /// and validate it as a unit. Returns an error for any condition that is
    /// fatal at startup (missing/short admin key, `CHUNK_OVERLAP >=
    /// CHUNK_SIZE`).
    pub fn from_env() -> Result<Self> {
        let admin_api_key = std::env::var("ADMIN_API_KEY")
            .map_err(|_| Error::Config("ADMIN_API_KEY must be set".to_string()))?;
        if admin_api_key.len() < 16 {
            return Err(Error::Config(
                "ADMIN_API_KEY must be at least 16 characters".to_string(),
            ));
        }

        let chunk_size = env_parse("CHUNK_SIZE", 1024usize)?;
        let chunk_overlap = env_parse("CHUNK_OVERLAP", 200usize)?;
        if chunk_overlap >= chunk_size {
            return Err(Error::Config(format!(
                "CHUNK_OVERLAP ({}) must be < CHUNK_SIZE ({})",
                chunk_overlap, chunk_size
            )));
        }

        let allowed_extensions = split_csv(&env_or("ALLOWED_EXTENSIONS", ".pdf,.md,.txt,.docx"))
            .into_iter()
            .map(|ext| ext.to_lowercase())
            .collect();

        let cors_origins = split_csv(&env_or("CORS_ORIGINS", "http://localhost:3000"));

        let config = Self {
            admin_api_key,
            llm_base_url: env_or("LLM_BASE_URL", "http://localhost:11434"),
            llm_model: env_or("LLM_MODEL", "llama3.1"),
            vector_store_dir: PathBuf::from(env_or("VECTOR_STORE_DIR", "./data/vectors")),
            collection_name: env_or("COLLECTION_NAME", "documents"),
            upload_dir: PathBuf::from(env_or("UPLOAD_DIR", "./data/uploads")),
            max_file_size_mb: env_parse("MAX_FILE_SIZE_MB", 20u64)?,
            allowed_extensions,
            chunk_size,
            chunk_overlap,
            top_k_results: env_parse("TOP_K_RESULTS", 5usize)?,
            embedding_model: env_or("EMBEDDING_MODEL", "nomic-embed-text"),
            embedding_dimension: env_parse("EMBEDDING_DIMENSION", 768usize)?,
            cors_origins,
            history_budget_tokens: env_parse("HISTORY_BUDGET_TOKENS", 2048usize)?,
            request_timeout: Duration::from_secs(env_parse("REQUEST_TIMEOUT_SECS", 30u64)?),
            inter_chunk_timeout: Duration::from_secs(15),
            host: env_or("HOST", "0.0.0.0"),
            port: env_parse("PORT", 8080u16)?,
        };

        Ok(config)
    }

    pub fn max_file_size_bytes(&self) -> u64 {
        self.max_file_size_mb * 1024 * 1024
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    // Tests mutate process environment, so they must not run concurrently.
    static ENV_LOCK: Mutex<()> = Mutex::new(());

    fn clear_env() {
        for key in [
            "ADMIN_API_KEY",
            "CHUNK_SIZE",
            "CHUNK_OVERLAP",
            "ALLOWED_EXTENSIONS",
            "CORS_ORIGINS",
        ] {
            std::env::remove_var(key);
        }
    }

    #[test]
    fn rejects_missing_admin_key() {
        let _guard = ENV_LOCK.lock().unwrap();
        clear_env();
        let err = Config::from_env().unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[test]
    fn rejects_short_admin_key() {
        let _guard = ENV_LOCK.lock().unwrap();
        clear_env();
        std::env::set_var("ADMIN_API_KEY", "short");
        let err = Config::from_env().unwrap_err();
        assert!(matches!(err, Error::Config(_)));
        std::env::remove_var("ADMIN_API_KEY");
    }

    #[test]
    fn rejects_overlap_not_smaller_than_chunk_size() {
        let _guard = ENV_LOCK.lock().unwrap();
        clear_env();
        std::env::set_var("ADMIN_API_KEY", "0123456789abcdef");
        std::env::set_var("CHUNK_SIZE", "100");
        std::env::set_var("CHUNK_OVERLAP", "100");
        let err = Config::from_env().unwrap_err();
        assert!(matches!(err, Error::Config(_)));
        clear_env();
    }

    #[test]
    fn accepts_valid_configuration() {
        let _guard = ENV_LOCK.lock().unwrap();
        clear_env();
        std::env::set_var("ADMIN_API_KEY", "0123456789abcdef");
        let config = Config::from_env().unwrap();
        assert_eq!(config.allowed_extensions, vec![".pdf", ".md", ".txt", ".docx"]);
        assert!(config.chunk_overlap < config.chunk_size);
        clear_env();
    }
}
