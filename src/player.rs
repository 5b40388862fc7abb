use anyhow::{Context, Result};
use serde::Deserialize;

use crate::client::{ServerClient, check_response};

/// Shaped answer of `/api/spotify/now-playing`.
#[derive(Deserialize, Debug, Default)]
#[serde(rename_all = "camelCase", default)]
pub struct NowPlaying {
    pub is_playing: bool,
    pub title: Option<String>,
    pub artist: Option<String>,
    pub album: Option<String>,
    pub song_url: Option<String>,
    pub progress: Option<u64>,
    pub duration: Option<u64>,
    pub played_at: Option<String>,
    pub message: Option<String>,
}

pub fn now_playing(client: &ServerClient) -> Result<NowPlaying> {
    let response = client
        .http()
        .get(client.url("/api/spotify/now-playing"))
        .send()
        .context("Failed to send now-playing request")?;
    let response = check_response(response, "Now playing")?;
    response.json().context("Failed to parse now-playing response")
}

pub fn describe(now: &NowPlaying) -> String {
    let Some(title) = now.title.as_deref() else {
        return now
            .message
            .clone()
            .unwrap_or_else(|| "Not playing anything".to_string());
    };

    let artist = now.artist.as_deref().unwrap_or("Unknown artist");
    let mut line = if now.is_playing {
        format!("Now playing: {} - {}", title, artist)
    } else {
        format!("Last played: {} - {}", title, artist)
    };
    if let Some(album) = now.album.as_deref() {
        line.push_str(&format!(" ({})", album));
    }
    if let (Some(progress), Some(duration)) = (now.progress, now.duration) {
        line.push_str(&format!(" [{} / {}]", clock(progress), clock(duration)));
    }
    if let Some(played_at) = now.played_at.as_deref() {
        line.push_str(&format!(" at {}", played_at));
    }
    if let Some(url) = now.song_url.as_deref() {
        line.push_str(&format!("\n{}", url));
    }
    line
}

fn clock(millis: u64) -> String {
    let secs = millis / 1000;
    format!("{}:{:02}", secs / 60, secs % 60)
}
