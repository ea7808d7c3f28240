// Copyright (c) 2026 Robert L. Snyder, Sierra Vista, AZ
// Licensed under the MIT License. See LICENSE file in the project root for details.

//! Remote song sources.
//!
//! Planning Center Online supplies the songs of a service plan, Spotify
//! supplies a tempo for each of them. Both are plain bearer-token REST APIs.

pub mod import;
pub mod pco;
pub mod spotify;

use std::time::Duration;

use serde::de::DeserializeOwned;
use thiserror::Error;

pub use import::{
    choose_songs, import_plan, parse_pick, plan_candidates, song_from_match, Candidate, MatchPicks,
    SongCandidates,
};
pub use pco::{PcoClient, PlanSong, PlanSummary, ServiceType};
pub use spotify::{AudioFeatures, SpotifyClient, Track};

const USER_AGENT: &str = concat!("axe-setlist/", env!("CARGO_PKG_VERSION"));
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// REST client errors
#[derive(Debug, Error)]
pub enum ApiError {
    /// Network communication error
    #[error("Network error: {0}")]
    Network(String),

    /// Server answered with a non-success status
    #[error("API error {status}: {body}")]
    Status { status: u16, body: String },

    /// Response body was not the expected JSON
    #[error("Parse error: {0}")]
    Parse(String),

    /// Track search came back empty
    #[error("No Spotify match for '{0}'")]
    NoMatch(String),

    /// Picked match does not exist
    #[error("'{title}' has {len} matches, no match {index}")]
    MatchIndex {
        title: String,
        index: usize,
        len: usize,
    },
}

fn http_client() -> Result<reqwest::Client, ApiError> {
    reqwest::Client::builder()
        .user_agent(USER_AGENT)
        .timeout(REQUEST_TIMEOUT)
        .build()
        .map_err(|e| ApiError::Network(e.to_string()))
}

/// Send a prepared request and return the body of a successful response
async fn fetch_text(request: reqwest::RequestBuilder) -> Result<String, ApiError> {
    let response = request
        .send()
        .await
        .map_err(|e| ApiError::Network(e.to_string()))?;

    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        return Err(ApiError::Status {
            status: status.as_u16(),
            body,
        });
    }

    response
        .text()
        .await
        .map_err(|e| ApiError::Network(e.to_string()))
}

fn parse_json<T: DeserializeOwned>(json: &str) -> Result<T, ApiError> {
    serde_json::from_str(json).map_err(|e| ApiError::Parse(e.to_string()))
}
