use std::{env, path::PathBuf};

pub const DEFAULT_PORT: u16 = 3000;
pub const WORKS_FILE_NAME: &str = "works.json";
pub const DEFAULT_ACCOUNTS_URL: &str = "https://accounts.spotify.com";
pub const DEFAULT_API_URL: &str = "https://api.spotify.com";

/// Spotify application credentials plus the upstream base URLs.
#[derive(Clone, Debug)]
pub struct SpotifyConfig {
    pub client_id: String,
    pub client_secret: String,
    pub refresh_token: String,
    pub accounts_url: String,
    pub api_url: String,
}

#[derive(Clone, Debug)]
pub struct ServerConfig {
    pub port: u16,
    /// Directory served as the static site.
    pub site_root: PathBuf,
    pub data_dir: PathBuf,
    pub uploads_dir: PathBuf,
    pub spotify: Option<SpotifyConfig>,
}

impl ServerConfig {
    /// Build a config rooted at `base`, the layout used by the site checkout.
    pub fn with_root(base: impl Into<PathBuf>) -> Self {
        let base = base.into();
        Self {
            port: DEFAULT_PORT,
            data_dir: base.join("data"),
            uploads_dir: base.join("uploads"),
            site_root: base,
            spotify: None,
        }
    }

    /// Read the config from the process environment. Call `dotenvy::dotenv()` first
    /// to pick up a `.env` file.
    pub fn from_env() -> Self {
        let site_root = env_path("SITE_ROOT").unwrap_or_else(|| PathBuf::from("."));
        let mut config = Self::with_root(site_root);

        if let Some(port) = env::var("PORT")
            .ok()
            .and_then(|value| value.parse::<u16>().ok())
        {
            config.port = port;
        }
        if let Some(dir) = env_path("DATA_DIR") {
            config.data_dir = dir;
        }
        if let Some(dir) = env_path("UPLOADS_DIR") {
            config.uploads_dir = dir;
        }
        config.spotify = SpotifyConfig::from_env();
        config
    }

    pub fn works_file(&self) -> PathBuf {
        self.data_dir.join(WORKS_FILE_NAME)
    }
}

impl SpotifyConfig {
    /// `None` unless all three credentials are set and non-empty.
    pub fn from_env() -> Option<Self> {
        let client_id = env_value("CLIENT_ID")?;
        let client_secret = env_value("CLIENT_SECRET")?;
        let refresh_token = env_value("REFRESH_TOKEN")?;

        Some(Self {
            client_id,
            client_secret,
            refresh_token,
            accounts_url: env_value("SPOTIFY_ACCOUNTS_URL")
                .unwrap_or_else(|| DEFAULT_ACCOUNTS_URL.to_string()),
            api_url: env_value("SPOTIFY_API_URL").unwrap_or_else(|| DEFAULT_API_URL.to_string()),
        })
    }
}

fn env_value(key: &str) -> Option<String> {
    env::var(key)
        .ok()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

fn env_path(key: &str) -> Option<PathBuf> {
    env_value(key).map(PathBuf::from)
}
