use serde::Deserialize;
use std::path::{Path, PathBuf};

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    #[serde(default = "default_bind_addr")]
    pub bind_addr: String,
    #[serde(default = "default_database_url")]
    pub database_url: String,
    /// JSON document holding the feed and website lists
    #[serde(default = "default_feeds_file")]
    pub feeds_file: PathBuf,
    /// Origins the browser front end is served from
    #[serde(default = "default_cors_origins")]
    pub cors_origins: Vec<String>,
    #[serde(default)]
    pub fetch: FetchConfig,
    #[serde(default)]
    pub summarize: SummarizeConfig,
}

fn default_bind_addr() -> String {
    "0.0.0.0:8000".to_string()
}

fn default_database_url() -> String {
    "sqlite:newsdesk.db?mode=rwc".to_string()
}

fn default_feeds_file() -> PathBuf {
    PathBuf::from("feeds.json")
}

fn default_cors_origins() -> Vec<String> {
    vec![
        "http://localhost:3000".to_string(),
        "http://127.0.0.1:3000".to_string(),
    ]
}

#[derive(Debug, Deserialize, Clone)]
pub struct FetchConfig {
    /// Per-source timeout in seconds
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    /// Upper bound on simultaneous outbound feed requests
    #[serde(default = "default_max_concurrent")]
    pub max_concurrent: usize,
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

fn default_timeout_secs() -> u64 {
    10
}

fn default_max_concurrent() -> usize {
    16
}

fn default_user_agent() -> String {
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 Newsdesk/0.1".to_string()
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            timeout_secs: default_timeout_secs(),
            max_concurrent: default_max_concurrent(),
            user_agent: default_user_agent(),
        }
    }
}

/// Chat-completions endpoint used to draft a title, summary and category.
#[derive(Debug, Deserialize, Clone)]
pub struct SummarizeConfig {
    #[serde(default = "default_summarize_api_url")]
    pub api_url: String,
    /// Summarization is refused while this is unset
    #[serde(default)]
    pub api_key: Option<String>,
    #[serde(default = "default_summarize_model")]
    pub model: String,
    #[serde(default = "default_summarize_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_summarize_api_url() -> String {
    "https://api.deepseek.com/v1/chat/completions".to_string()
}

fn default_summarize_model() -> String {
    "deepseek-chat".to_string()
}

fn default_summarize_timeout_secs() -> u64 {
    30
}

impl Default for SummarizeConfig {
    fn default() -> Self {
        Self {
            api_url: default_summarize_api_url(),
            api_key: None,
            model: default_summarize_model(),
            timeout_secs: default_summarize_timeout_secs(),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            bind_addr: default_bind_addr(),
            database_url: default_database_url(),
            feeds_file: default_feeds_file(),
            cors_origins: default_cors_origins(),
            fetch: FetchConfig::default(),
            summarize: SummarizeConfig::default(),
        }
    }
}

impl Config {
    pub fn load<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        Ok(config)
    }

    /// Like [`Config::load`], but a missing file yields the defaults.
    pub fn load_or_default<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        if path.as_ref().exists() {
            Self::load(path)
        } else {
            Ok(Self::default())
        }
    }

    /// Parse config from a TOML string (useful for testing)
    pub fn from_str(content: &str) -> anyhow::Result<Self> {
        let config: Config = toml::from_str(content)?;
        Ok(config)
    }

    /// Apply `DATABASE_URL`, `FEEDS_FILE`, `BIND_ADDR`, `CORS_ORIGINS`,
    /// `DEEPSEEK_API_URL` and `DEEPSEEK_API_KEY` overrides.
    pub fn apply_env(mut self) -> Self {
        self.apply_overrides(|key| std::env::var(key).ok());
        self
    }

    fn apply_overrides<F: Fn(&str) -> Option<String>>(&mut self, lookup: F) {
        if let Some(url) = lookup("DATABASE_URL") {
            self.database_url = url;
        }
        if let Some(file) = lookup("FEEDS_FILE") {
            self.feeds_file = PathBuf::from(file);
        }
        if let Some(addr) = lookup("BIND_ADDR") {
            self.bind_addr = addr;
        }
        if let Some(origins) = lookup("CORS_ORIGINS") {
            self.cors_origins = origins
                .split(',')
                .map(str::trim)
                .filter(|o| !o.is_empty())
                .map(String::from)
                .collect();
        }
        if let Some(url) = lookup("DEEPSEEK_API_URL") {
            self.summarize.api_url = url;
        }
        if let Some(key) = lookup("DEEPSEEK_API_KEY").filter(|k| !k.is_empty()) {
            self.summarize.api_key = Some(key);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_fetch_defaults() {
        let fetch = FetchConfig::default();
        assert_eq!(fetch.timeout_secs, 10);
        assert_eq!(fetch.max_concurrent, 16);
        assert!(!fetch.user_agent.is_empty());
    }

    #[test]
    fn test_load_valid_config() {
        let content = r#"
            bind_addr = "127.0.0.1:9000"
            database_url = "sqlite::memory:"
            feeds_file = "/tmp/my-feeds.json"

            [fetch]
            timeout_secs = 5
            max_concurrent = 4
            user_agent = "TestAgent/1.0"
        "#;

        let mut temp_file = NamedTempFile::new().unwrap();
        temp_file.write_all(content.as_bytes()).unwrap();

        let config = Config::load(temp_file.path()).unwrap();

        assert_eq!(config.bind_addr, "127.0.0.1:9000");
        assert_eq!(config.database_url, "sqlite::memory:");
        assert_eq!(config.feeds_file, PathBuf::from("/tmp/my-feeds.json"));
        assert_eq!(config.fetch.timeout_secs, 5);
        assert_eq!(config.fetch.max_concurrent, 4);
        assert_eq!(config.fetch.user_agent, "TestAgent/1.0");
    }

    #[test]
    fn test_empty_config_uses_defaults() {
        let config = Config::from_str("").unwrap();

        assert_eq!(config.bind_addr, "0.0.0.0:8000");
        assert_eq!(config.feeds_file, PathBuf::from("feeds.json"));
        assert_eq!(config.fetch.timeout_secs, 10);
    }

    #[test]
    fn test_partial_fetch_section() {
        let content = r#"
            [fetch]
            timeout_secs = 3
        "#;

        let config = Config::from_str(content).unwrap();
        assert_eq!(config.fetch.timeout_secs, 3);
        assert_eq!(config.fetch.max_concurrent, 16);
    }

    #[test]
    fn test_load_config_missing_file() {
        let result = Config::load("/nonexistent/path/newsdesk.toml");
        assert!(result.is_err());
    }

    #[test]
    fn test_load_or_default_missing_file() {
        let config = Config::load_or_default("/nonexistent/path/newsdesk.toml").unwrap();
        assert_eq!(config.database_url, "sqlite:newsdesk.db?mode=rwc");
    }

    #[test]
    fn test_load_config_invalid_toml() {
        let content = "this is not valid toml {{{";

        let mut temp_file = NamedTempFile::new().unwrap();
        temp_file.write_all(content.as_bytes()).unwrap();

        let result = Config::load(temp_file.path());
        assert!(result.is_err());
    }

    #[test]
    fn test_wrong_type_rejected() {
        let result = Config::from_str("[fetch]\ntimeout_secs = \"ten\"");
        assert!(result.is_err());
    }

    #[test]
    fn test_env_overrides() {
        let vars: HashMap<&str, &str> = [
            ("DATABASE_URL", "sqlite:other.db"),
            ("FEEDS_FILE", "other.json"),
        ]
        .into_iter()
        .collect();

        let mut config = Config::default();
        config.apply_overrides(|key| vars.get(key).map(|v| v.to_string()));

        assert_eq!(config.database_url, "sqlite:other.db");
        assert_eq!(config.feeds_file, PathBuf::from("other.json"));
        assert_eq!(config.bind_addr, "0.0.0.0:8000"); // untouched
    }

    #[test]
    fn test_summarize_section() {
        let content = r#"
            cors_origins = ["https://news.example.com"]

            [summarize]
            api_url = "http://127.0.0.1:9999/v1/chat/completions"
            api_key = "sk-test"
        "#;

        let config = Config::from_str(content).unwrap();
        assert_eq!(config.cors_origins, vec!["https://news.example.com".to_string()]);
        assert_eq!(
            config.summarize.api_url,
            "http://127.0.0.1:9999/v1/chat/completions"
        );
        assert_eq!(config.summarize.api_key.as_deref(), Some("sk-test"));
        assert_eq!(config.summarize.model, "deepseek-chat");
        assert_eq!(config.summarize.timeout_secs, 30);
    }

    #[test]
    fn test_summarize_defaults() {
        let config = Config::default();
        assert!(config.summarize.api_key.is_none());
        assert_eq!(config.cors_origins.len(), 2);
    }

    #[test]
    fn test_cors_and_api_key_env_overrides() {
        let vars: HashMap<&str, &str> = [
            ("CORS_ORIGINS", "https://a.example.com, https://b.example.com,"),
            ("DEEPSEEK_API_KEY", "sk-env"),
        ]
        .into_iter()
        .collect();

        let mut config = Config::default();
        config.apply_overrides(|key| vars.get(key).map(|v| v.to_string()));

        assert_eq!(
            config.cors_origins,
            vec![
                "https://a.example.com".to_string(),
                "https://b.example.com".to_string()
            ]
        );
        assert_eq!(config.summarize.api_key.as_deref(), Some("sk-env"));
    }
}
