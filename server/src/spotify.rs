use log::error;
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::config::SpotifyConfig;

#[derive(Debug, thiserror::Error)]
pub enum SpotifyError {
    #[error("token refresh rejected ({status}): {details}")]
    TokenRefresh { status: u16, details: Value },

    #[error("spotify api error ({status}): {details}")]
    Api { status: u16, details: Value },

    #[error(transparent)]
    Http(#[from] reqwest::Error),
}

#[derive(Deserialize)]
struct TokenResponse {
    access_token: String,
}

#[derive(Debug, Deserialize)]
pub struct CurrentlyPlaying {
    #[serde(default)]
    pub item: Option<Track>,
    #[serde(default)]
    pub progress_ms: Option<u64>,
}

#[derive(Debug, Deserialize)]
pub struct Track {
    pub name: String,
    #[serde(default)]
    pub artists: Vec<Artist>,
    pub album: Album,
    #[serde(default)]
    pub external_urls: ExternalUrls,
    #[serde(default)]
    pub duration_ms: Option<u64>,
}

#[derive(Debug, Deserialize)]
pub struct Artist {
    pub name: String,
}

#[derive(Debug, Deserialize)]
pub struct Album {
    pub name: String,
    #[serde(default)]
    pub images: Vec<Image>,
}

#[derive(Debug, Deserialize)]
pub struct Image {
    pub url: String,
}

#[derive(Debug, Default, Deserialize)]
pub struct ExternalUrls {
    pub spotify: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RecentlyPlayed {
    #[serde(default)]
    items: Vec<PlayHistory>,
}

#[derive(Debug, Deserialize)]
struct PlayHistory {
    track: Track,
    played_at: Option<String>,
}

/// Shaped answer of the now-playing endpoint.
#[derive(Debug, Default, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct NowPlaying {
    pub is_playing: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub artist: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub album: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub album_image_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub song_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub progress: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub played_at: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl NowPlaying {
    fn from_track(track: &Track, is_playing: bool) -> Self {
        Self {
            is_playing,
            title: Some(track.name.clone()),
            artist: Some(
                track
                    .artists
                    .iter()
                    .map(|artist| artist.name.as_str())
                    .collect::<Vec<_>>()
                    .join(", "),
            ),
            album: Some(track.album.name.clone()),
            album_image_url: track.album.images.first().map(|image| image.url.clone()),
            song_url: track.external_urls.spotify.clone(),
            ..Default::default()
        }
    }

    fn idle() -> Self {
        Self {
            message: Some("No recent activity".to_string()),
            ..Default::default()
        }
    }
}

/// Refresh-token client for the player endpoints of the Spotify Web API.
#[derive(Clone)]
pub struct SpotifyClient {
    config: SpotifyConfig,
    http: reqwest::Client,
}

impl SpotifyClient {
    pub fn new(config: SpotifyConfig) -> Self {
        Self {
            config,
            http: reqwest::Client::new(),
        }
    }

    /// Exchange the stored refresh token for a short-lived access token.
    pub async fn access_token(&self) -> Result<String, SpotifyError> {
        let url = format!("{}/api/token", self.config.accounts_url.trim_end_matches('/'));
        let response = self
            .http
            .post(&url)
            .basic_auth(&self.config.client_id, Some(&self.config.client_secret))
            .form(&[
                ("grant_type", "refresh_token"),
                ("refresh_token", self.config.refresh_token.as_str()),
            ])
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let details = error_body(response).await;
            return Err(SpotifyError::TokenRefresh { status, details });
        }

        let token: TokenResponse = response.json().await?;
        Ok(token.access_token)
    }

    /// Raw currently-playing payload, `None` when nothing is playing.
    pub async fn currently_playing_raw(&self, access_token: &str) -> Result<Option<Value>, SpotifyError> {
        let response = self
            .http
            .get(self.api_url("/v1/me/player/currently-playing"))
            .bearer_auth(access_token)
            .send()
            .await?;

        match response.status() {
            StatusCode::NO_CONTENT => Ok(None),
            status if status.is_success() => {
                let bytes = response.bytes().await?;
                if bytes.is_empty() {
                    return Ok(None);
                }
                Ok(Some(serde_json::from_slice(&bytes).map_err(|e| SpotifyError::Api {
                    status: status.as_u16(),
                    details: Value::String(e.to_string()),
                })?))
            }
            status => Err(SpotifyError::Api {
                status: status.as_u16(),
                details: error_body(response).await,
            }),
        }
    }

    /// What is playing now, falling back to the most recently played track.
    pub async fn now_playing(&self) -> Result<NowPlaying, SpotifyError> {
        let token = self.access_token().await?;

        let current = match self.currently_playing_raw(&token).await? {
            Some(raw) => serde_json::from_value::<CurrentlyPlaying>(raw).ok(),
            None => None,
        };
        if let Some(CurrentlyPlaying {
            item: Some(track),
            progress_ms,
        }) = current
        {
            return Ok(NowPlaying {
                progress: progress_ms,
                duration: track.duration_ms,
                ..NowPlaying::from_track(&track, true)
            });
        }

        match self.recently_played(&token).await {
            Ok(Some(history)) => Ok(NowPlaying {
                played_at: history.played_at.clone(),
                ..NowPlaying::from_track(&history.track, false)
            }),
            Ok(None) => Ok(NowPlaying::idle()),
            Err(err) => {
                error!("Error getting recently played: {}", err);
                Ok(NowPlaying::idle())
            }
        }
    }

    async fn recently_played(&self, access_token: &str) -> Result<Option<PlayHistory>, SpotifyError> {
        let response = self
            .http
            .get(self.api_url("/v1/me/player/recently-played?limit=1"))
            .bearer_auth(access_token)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let details = error_body(response).await;
            return Err(SpotifyError::Api { status, details });
        }

        let recent: RecentlyPlayed = response.json().await?;
        Ok(recent.items.into_iter().next())
    }

    fn api_url(&self, path: &str) -> String {
        format!("{}{}", self.config.api_url.trim_end_matches('/'), path)
    }
}

async fn error_body(response: reqwest::Response) -> Value {
    let text = response.text().await.unwrap_or_default();
    serde_json::from_str(&text).unwrap_or(Value::String(text))
}
