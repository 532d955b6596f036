use serde::Deserialize;
use std::env;
use std::path::PathBuf;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub host: String,
    pub port: u16,
    /// Base URL of the upstream synthesis server.
    pub upstream_url: String,
    /// Directory where synthesized audio lands.
    pub cache_dir: PathBuf,
    /// Host advertised in absolute download URLs (the bind host may be 0.0.0.0).
    pub public_host: String,
    /// Base URL of a master relay, when this relay is chained behind one.
    pub master_url: Option<String>,
    pub connect_master: bool,
    /// Stable identifier this relay uses when registering with a master.
    pub client_id: String,
    pub poll_max_attempts: u32,
    pub environment: Environment,
    pub log_format: LogFormat,
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    Development,
    Production,
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    Pretty,
    Json,
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();

        let host = env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string());

        let config = Config {
            public_host: env::var("PUBLIC_HOST").unwrap_or_else(|_| match host.as_str() {
                "0.0.0.0" => "127.0.0.1".to_string(),
                other => other.to_string(),
            }),
            host,
            port: env::var("PORT")
                .unwrap_or_else(|_| "8000".to_string())
                .parse()?,
            upstream_url: env::var("UPSTREAM_URL")
                .unwrap_or_else(|_| "http://127.0.0.1:5000".to_string())
                .trim_end_matches('/')
                .to_string(),
            cache_dir: env::var("CACHE_DIR")
                .unwrap_or_else(|_| "audio_cache".to_string())
                .into(),
            master_url: env::var("MASTER_URL")
                .ok()
                .filter(|s| !s.is_empty())
                .map(|s| s.trim_end_matches('/').to_string()),
            connect_master: env::var("CONNECT_MASTER")
                .map(|s| s.to_lowercase() == "true")
                .unwrap_or(false),
            client_id: env::var("CLIENT_ID").unwrap_or_else(|_| generate_client_id()),
            poll_max_attempts: env::var("POLL_MAX_ATTEMPTS")
                .unwrap_or_else(|_| "120".to_string())
                .parse()?,
            environment: env::var("ENVIRONMENT")
                .unwrap_or_else(|_| "development".to_string())
                .parse::<String>()
                .map(|s| match s.as_str() {
                    "production" => Environment::Production,
                    _ => Environment::Development,
                })?,
            log_format: env::var("LOG_FORMAT")
                .unwrap_or_else(|_| "pretty".to_string())
                .parse::<String>()
                .map(|s| match s.as_str() {
                    "json" => LogFormat::Json,
                    _ => LogFormat::Pretty,
                })?,
        };

        Ok(config)
    }

    /// Base URL this relay advertises to clients and callback targets.
    pub fn public_base_url(&self) -> String {
        format!("http://{}:{}", self.public_host, self.port)
    }

    pub fn is_development(&self) -> bool {
        self.environment == Environment::Development
    }
}

/// First-run client identifier, stable for the process lifetime.
fn generate_client_id() -> String {
    format!("client_{}", &uuid::Uuid::new_v4().simple().to_string()[..8])
}
