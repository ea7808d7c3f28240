// Copyright (c) 2026 Robert L. Snyder, Sierra Vista, AZ
// Licensed under the MIT License. See LICENSE file in the project root for details.

//! Spotify Web API client (track search and audio features)

use serde::Deserialize;

use super::{fetch_text, http_client, parse_json, ApiError};

const SPOTIFY_BASE_URL: &str = "https://api.spotify.com";

/// A search hit
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Track {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub artists: Vec<Artist>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Artist {
    pub name: String,
}

impl Track {
    /// Comma-separated artist names
    pub fn artist_names(&self) -> String {
        self.artists
            .iter()
            .map(|artist| artist.name.as_str())
            .collect::<Vec<_>>()
            .join(", ")
    }
}

/// Audio analysis summary of a track
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct AudioFeatures {
    pub id: String,
    /// Estimated tempo in BPM
    pub tempo: f64,
    /// Pitch class of the key, -1 when undetected
    #[serde(default)]
    pub key: i32,
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    tracks: Paging,
}

#[derive(Debug, Deserialize)]
struct Paging {
    items: Vec<Track>,
}

/// Parse a `/v1/search` response into its tracks
pub fn parse_search(json: &str) -> Result<Vec<Track>, ApiError> {
    let response: SearchResponse = parse_json(json)?;
    Ok(response.tracks.items)
}

/// Parse a `/v1/audio-features` response
pub fn parse_audio_features(json: &str) -> Result<AudioFeatures, ApiError> {
    parse_json(json)
}

/// Spotify client bound to one access token
pub struct SpotifyClient {
    http_client: reqwest::Client,
    base_url: String,
    token: String,
}

impl SpotifyClient {
    pub fn new(token: impl Into<String>) -> Result<Self, ApiError> {
        Self::with_base_url(SPOTIFY_BASE_URL, token)
    }

    pub fn with_base_url(base_url: &str, token: impl Into<String>) -> Result<Self, ApiError> {
        Ok(Self {
            http_client: http_client()?,
            base_url: base_url.trim_end_matches('/').to_string(),
            token: token.into(),
        })
    }

    /// Search tracks by title, best match first
    pub async fn search_tracks(&self, title: &str, limit: u32) -> Result<Vec<Track>, ApiError> {
        let url = format!("{}/v1/search", self.base_url);
        tracing::debug!(title, limit, "Searching Spotify");

        let request = self
            .http_client
            .get(&url)
            .bearer_auth(&self.token)
            .query(&[("q", title), ("type", "track")])
            .query(&[("limit", limit)]);
        parse_search(&fetch_text(request).await?)
    }

    pub async fn audio_features(&self, track_id: &str) -> Result<AudioFeatures, ApiError> {
        let url = format!("{}/v1/audio-features/{}", self.base_url, track_id);
        tracing::debug!(track_id, "Fetching audio features");
        let body = fetch_text(self.http_client.get(&url).bearer_auth(&self.token)).await?;
        parse_audio_features(&body)
    }
}
