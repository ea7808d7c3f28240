// Copyright (c) 2026 Robert L. Snyder, Sierra Vista, AZ
// Licensed under the MIT License. See LICENSE file in the project root for details.

//! Song provisioning.
//!
//! Turns an ordered list of songs into the command sequence that copies a
//! template preset into one numbered slot per song, with the song's tempo
//! and a `[key] title` name, and sends that sequence to the device.
//!
//! Each song expands to five commands in a fixed order:
//!
//! 1. select the template preset,
//! 2. set its tempo,
//! 3. rename it,
//! 4. store it into the target slot,
//! 5. select the target slot.
//!
//! The template is edited in place before every store, so the groups must
//! reach the device in order and never interleave. Sending is not
//! transactional: if a send fails halfway, earlier slots stay rewritten and
//! later ones are untouched.

use std::time::Duration;

use thiserror::Error;

use crate::device::{self, Command, Model};
use crate::midi::OutputHandle;
use crate::setlist::Song;

/// Commands emitted per song
pub const COMMANDS_PER_SONG: usize = 5;

/// Planning errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PlanError {
    #[error("Template preset {base} lies inside the target range {first}..={last}")]
    BasePresetOverlap { base: u16, first: u16, last: u16 },

    #[error("Song {index} would target preset {preset}, but the {model} only has {count} presets")]
    PresetOutOfRange {
        index: usize,
        preset: u32,
        model: Model,
        count: u16,
    },

    #[error("Tempo {tempo} bpm for '{title}' is outside {min}..={max}")]
    TempoOutOfRange {
        title: String,
        tempo: u16,
        min: u16,
        max: u16,
    },
}

/// Sending errors
#[derive(Debug, Error)]
pub enum ProvisionError {
    #[error(transparent)]
    Plan(#[from] PlanError),

    #[error("Send failed after {sent} of {total} messages; the device is partially updated: {source}")]
    PartialSend {
        sent: usize,
        total: usize,
        #[source]
        source: anyhow::Error,
    },
}

/// Everything needed to plan one provisioning run
#[derive(Debug, Clone, PartialEq)]
pub struct ProvisionRequest {
    pub model: Model,
    pub base_preset: u16,
    pub starting_preset: u16,
    pub songs: Vec<Song>,
}

impl ProvisionRequest {
    pub fn plan(&self) -> Result<CommandSequence, PlanError> {
        plan(self.model, self.base_preset, self.starting_preset, &self.songs)
    }
}

/// Ordered device commands for one model
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandSequence {
    model: Model,
    commands: Vec<Command>,
}

impl CommandSequence {
    pub fn model(&self) -> Model {
        self.model
    }

    pub fn commands(&self) -> &[Command] {
        &self.commands
    }

    pub fn len(&self) -> usize {
        self.commands.len()
    }

    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }

    /// One SysEx frame per command, in order
    pub fn encode(&self) -> Vec<Vec<u8>> {
        self.commands
            .iter()
            .map(|command| device::encode(self.model, command))
            .collect()
    }
}

/// Preset name written for a song
pub fn preset_name(song: &Song) -> String {
    format!("[{}] {}", song.key, song.title)
}

/// Plan the command sequence that provisions `songs` into consecutive slots
/// starting at `starting_preset`, using `base_preset` as the template.
///
/// Pure: no I/O, same input gives the same output.
pub fn plan(
    model: Model,
    base_preset: u16,
    starting_preset: u16,
    songs: &[Song],
) -> Result<CommandSequence, PlanError> {
    validate(model, base_preset, starting_preset, songs)?;

    let commands = songs
        .iter()
        .zip(starting_preset..)
        .flat_map(|(song, target)| {
            [
                Command::SelectPreset(base_preset),
                Command::SetTempo(song.tempo),
                Command::SetPresetName(preset_name(song)),
                Command::StoreCurrentPresetTo(target),
                Command::SelectPreset(target),
            ]
        })
        .collect();

    Ok(CommandSequence { model, commands })
}

fn validate(
    model: Model,
    base_preset: u16,
    starting_preset: u16,
    songs: &[Song],
) -> Result<(), PlanError> {
    let Some(last_index) = songs.len().checked_sub(1) else {
        return Ok(());
    };

    let count = model.preset_count();
    let first = u32::from(starting_preset);
    let last = first + last_index as u32;
    if last >= u32::from(count) {
        // First song whose slot does not exist
        let index = u32::from(count).saturating_sub(first) as usize;
        return Err(PlanError::PresetOutOfRange {
            index,
            preset: first + index as u32,
            model,
            count,
        });
    }
    let last = last as u16;

    if (starting_preset..=last).contains(&base_preset) {
        return Err(PlanError::BasePresetOverlap {
            base: base_preset,
            first: starting_preset,
            last,
        });
    }

    if let Some(song) = songs
        .iter()
        .find(|song| !(device::MIN_TEMPO..=device::MAX_TEMPO).contains(&song.tempo))
    {
        return Err(PlanError::TempoOutOfRange {
            title: song.title.clone(),
            tempo: song.tempo,
            min: device::MIN_TEMPO,
            max: device::MAX_TEMPO,
        });
    }

    Ok(())
}

/// Send a planned sequence strictly in order, pausing `pacing` between
/// frames. Returns the number of frames sent.
pub async fn send_sequence(
    output: &OutputHandle,
    sequence: &CommandSequence,
    pacing: Duration,
) -> Result<usize, ProvisionError> {
    let frames = sequence.encode();
    let total = frames.len();

    tracing::info!(
        port = %output.name(),
        model = %sequence.model(),
        messages = total,
        "Sending provisioning sequence"
    );

    for (sent, (command, frame)) in sequence.commands().iter().zip(&frames).enumerate() {
        if sent > 0 && !pacing.is_zero() {
            tokio::time::sleep(pacing).await;
        }
        tracing::debug!(step = sent + 1, total, %command, "Sending");
        output
            .send(frame)
            .map_err(|source| ProvisionError::PartialSend {
                sent,
                total,
                source,
            })?;
    }

    tracing::info!(messages = total, "Provisioning sequence sent");
    Ok(total)
}
