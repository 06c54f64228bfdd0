use clap::Args;
use serde::Deserialize;
use std::path::PathBuf;

/// Global options that shape the config, shared by every front end.
#[derive(Args, Debug, Clone, Default)]
pub struct ConfigArgs {
    /// Path to config file
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Base URL of the CookHUB API
    #[arg(long)]
    pub api_url: Option<String>,

    /// Path to data directory
    #[arg(long)]
    pub data_dir: Option<PathBuf>,
}

#[derive(Deserialize, Debug, Clone, Default)]
#[serde(default)]
pub struct Config {
    pub api: ApiConfig,
    pub session: SessionConfig,
}

#[derive(Deserialize, Debug, Clone)]
#[serde(default)]
pub struct ApiConfig {
    pub base_url: String,
    pub user_agent: String,
}

#[derive(Deserialize, Debug, Clone, Default)]
#[serde(default)]
pub struct SessionConfig {
    pub path: Option<PathBuf>,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8080/api".to_string(),
            user_agent: concat!("cookhub/", env!("CARGO_PKG_VERSION")).to_string(),
        }
    }
}

impl Config {
    pub fn load(cli: &ConfigArgs) -> anyhow::Result<Self> {
        let data_dir = Self::data_dir(cli);
        let config_path = cli
            .config
            .clone()
            .unwrap_or_else(|| data_dir.join("config.toml"));

        let mut config = if config_path.exists() {
            let content = std::fs::read_to_string(&config_path)?;
            toml::from_str(&content)?
        } else {
            Config::default()
        };

        // CLI overrides
        if let Some(ref url) = cli.api_url {
            config.api.base_url = url.clone();
        }

        url::Url::parse(&config.api.base_url)
            .map_err(|e| anyhow::anyhow!("Invalid API base URL {}: {}", config.api.base_url, e))?;

        if config.session.path.is_none() {
            config.session.path = Some(data_dir.join("credentials.json"));
        }

        Ok(config)
    }

    pub fn data_dir(cli: &ConfigArgs) -> PathBuf {
        cli.data_dir.clone().unwrap_or_else(|| {
            dirs::home_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join(".cookhub")
        })
    }

    pub fn credentials_path(&self) -> PathBuf {
        self.session
            .path
            .clone()
            .unwrap_or_else(|| PathBuf::from("credentials.json"))
    }
}
