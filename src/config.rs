use log::info;
use serde::{Deserialize, Serialize};
use std::{fs, path::Path, time::Duration};

pub const CONFIG_FILE: &str = ".folio.toml";
pub const DEFAULT_SERVER_URL: &str = "http://localhost:3000";
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(120);

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct AppConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub client: Option<ClientConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct ClientConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub server: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none", with = "humantime_serde")]
    pub timeout: Option<Duration>,
}

impl ClientConfig {
    pub fn new(server: String) -> Self {
        Self {
            server: Some(server),
            timeout: Some(DEFAULT_TIMEOUT),
        }
    }

    /// The command line wins over the file; defaults fill the rest.
    pub fn merge_cli(mut self, cli_server: Option<String>) -> Self {
        if let Some(server) = cli_server {
            self.server = Some(server);
        }
        if self.server.is_none() {
            self.server = Some(DEFAULT_SERVER_URL.to_string());
        }
        if self.timeout.is_none() {
            self.timeout = Some(DEFAULT_TIMEOUT);
        }
        self
    }

    pub fn server_url(&self) -> String {
        normalize_server(self.server.as_deref().unwrap_or(DEFAULT_SERVER_URL))
    }
}

impl AppConfig {
    pub fn load_from_file(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let content = fs::read_to_string(path)?;
        let config: AppConfig = toml::from_str(&content)?;
        Ok(config)
    }

    pub fn generate_config_file(path: impl AsRef<Path>, force: bool) -> anyhow::Result<()> {
        let path = path.as_ref();
        if path.exists() && !force {
            anyhow::bail!(
                "Configuration file {} already exists. Use --force to overwrite.",
                path.display()
            );
        }

        fs::write(path, Self::generate_full_config()?)?;

        info!("Configuration file generated: {}", path.display());
        info!("Please edit this file to customize configuration");
        Ok(())
    }

    pub fn generate_full_config() -> anyhow::Result<String> {
        let config = AppConfig {
            client: Some(ClientConfig::new(DEFAULT_SERVER_URL.to_string())),
        };
        let toml_content = toml::to_string_pretty(&config)?;
        Ok(format!(
            "# folio configuration file\n# All fields are optional, command line arguments override config file values\n\n{}",
            toml_content
        ))
    }
}

pub fn normalize_server(server: &str) -> String {
    server.trim().trim_end_matches('/').to_string()
}
