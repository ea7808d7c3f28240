// Copyright (c) 2026 Robert L. Snyder, Sierra Vista, AZ
// Licensed under the MIT License. See LICENSE file in the project root for details.

//! Building a song list from a Planning Center plan.
//!
//! Each plan song is looked up on Spotify by title. Every hit comes back with
//! its audio features so the operator can pick the right recording; without a
//! pick the first hit is used. Tempos are truncated to whole BPM.

use std::collections::HashMap;

use super::pco::{PcoClient, PlanSong};
use super::spotify::{AudioFeatures, SpotifyClient, Track};
use super::ApiError;
use crate::setlist::Song;

/// A Spotify hit with its analysis
#[derive(Debug, Clone, PartialEq)]
pub struct Candidate {
    pub track: Track,
    pub features: AudioFeatures,
}

/// A plan song and the tracks that might be it, best match first
#[derive(Debug, Clone, PartialEq)]
pub struct SongCandidates {
    pub plan_song: PlanSong,
    pub candidates: Vec<Candidate>,
}

/// Chosen candidate per song position; positions not listed use match 0
pub type MatchPicks = HashMap<usize, usize>;

/// Combine a plan song with the audio features of its chosen track
pub fn song_from_match(plan_song: &PlanSong, features: &AudioFeatures) -> Song {
    Song {
        title: plan_song.title.clone(),
        key: plan_song.key.clone().unwrap_or_default(),
        // `as` saturates and truncates toward zero
        tempo: features.tempo as u16,
    }
}

/// Parse a `SONG=MATCH` pick, both 0-based
pub fn parse_pick(text: &str) -> Option<(usize, usize)> {
    let (song, candidate) = text.split_once('=')?;
    Some((song.trim().parse().ok()?, candidate.trim().parse().ok()?))
}

/// Fetch the songs of a plan and up to `search_limit` candidates for each
pub async fn plan_candidates(
    pco: &PcoClient,
    spotify: &SpotifyClient,
    service_type_id: &str,
    plan_id: &str,
    search_limit: u32,
) -> Result<Vec<SongCandidates>, ApiError> {
    let plan_songs = pco.plan_songs(service_type_id, plan_id).await?;

    let mut all = Vec::with_capacity(plan_songs.len());
    for plan_song in plan_songs {
        let tracks = spotify.search_tracks(&plan_song.title, search_limit).await?;
        let mut candidates = Vec::with_capacity(tracks.len());
        for track in tracks {
            let features = spotify.audio_features(&track.id).await?;
            candidates.push(Candidate { track, features });
        }
        tracing::debug!(title = %plan_song.title, candidates = candidates.len(), "Searched plan song");
        all.push(SongCandidates {
            plan_song,
            candidates,
        });
    }
    Ok(all)
}

/// Resolve one `Song` per plan song, in plan order
pub fn choose_songs(songs: &[SongCandidates], picks: &MatchPicks) -> Result<Vec<Song>, ApiError> {
    songs
        .iter()
        .enumerate()
        .map(|(position, entry)| {
            let title = &entry.plan_song.title;
            if entry.candidates.is_empty() {
                return Err(ApiError::NoMatch(title.clone()));
            }
            let index = picks.get(&position).copied().unwrap_or(0);
            let chosen = entry
                .candidates
                .get(index)
                .ok_or_else(|| ApiError::MatchIndex {
                    title: title.clone(),
                    index,
                    len: entry.candidates.len(),
                })?;
            let song = song_from_match(&entry.plan_song, &chosen.features);

            tracing::info!(
                title = %song.title,
                track = %chosen.track.name,
                artists = %chosen.track.artist_names(),
                tempo = song.tempo,
                "Matched plan song"
            );
            Ok(song)
        })
        .collect()
}

/// Fetch a plan and resolve a tempo for each song, honouring `picks`
pub async fn import_plan(
    pco: &PcoClient,
    spotify: &SpotifyClient,
    service_type_id: &str,
    plan_id: &str,
    search_limit: u32,
    picks: &MatchPicks,
) -> Result<Vec<Song>, ApiError> {
    let songs = plan_candidates(pco, spotify, service_type_id, plan_id, search_limit).await?;
    choose_songs(&songs, picks)
}
