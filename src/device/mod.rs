// Copyright (c) 2026 Robert L. Snyder, Sierra Vista, AZ
// Licensed under the MIT License. See LICENSE file in the project root for details.

//! Fractal Audio device vocabulary.
//!
//! This module defines the device models, the commands the planner and the
//! preset query service issue, and the typed events decoded from the
//! device's replies. The byte-level encoding lives in [`codec`].

pub mod codec;

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::midi::MidiMessage;

pub use codec::{decode, encode, stored_name, DecodeError};

/// Vendor name advertised by Fractal Audio ports
pub const VENDOR_NAME: &str = "Fractal Audio Systems";

/// Maximum preset name length stored by the device
pub const PRESET_NAME_LEN: usize = 32;

/// Lowest tempo the device accepts (BPM)
pub const MIN_TEMPO: u16 = 24;

/// Highest tempo the device accepts (BPM)
pub const MAX_TEMPO: u16 = 250;

/// Supported effects units
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Model {
    /// Axe-Fx II family (II, XL, XL+)
    #[serde(rename = "axe-fx-ii")]
    AxeFxII,
    /// AX8 floor unit
    Ax8,
}

impl Model {
    /// All known models, in resolution order
    pub const ALL: [Model; 2] = [Model::AxeFxII, Model::Ax8];

    /// Resolve a model from a port or device name.
    ///
    /// Matching is a case-insensitive substring search, so surrounding text
    /// such as `"AXE-FX II:AXE-FX II MIDI 1 20:0"` still resolves.
    pub fn resolve(device_name: &str) -> Option<Model> {
        let name = device_name.to_uppercase();
        Model::ALL
            .into_iter()
            .find(|model| name.contains(model.name_fragment()))
    }

    /// Name fragment identifying this model in port names
    pub fn name_fragment(self) -> &'static str {
        match self {
            Model::AxeFxII => "AXE-FX II",
            Model::Ax8 => "AX8",
        }
    }

    /// SysEx model byte
    pub fn sysex_id(self) -> u8 {
        match self {
            Model::AxeFxII => 0x03,
            Model::Ax8 => 0x08,
        }
    }

    /// Model for a SysEx model byte
    pub fn from_sysex_id(id: u8) -> Option<Model> {
        Model::ALL.into_iter().find(|model| model.sysex_id() == id)
    }

    /// Number of preset slots
    pub fn preset_count(self) -> u16 {
        match self {
            Model::AxeFxII => 768,
            Model::Ax8 => 512,
        }
    }
}

impl fmt::Display for Model {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Model::AxeFxII => write!(f, "Axe-Fx II"),
            Model::Ax8 => write!(f, "AX8"),
        }
    }
}

impl FromStr for Model {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "axe-fx-ii" | "axe-fx ii" | "axefx2" | "ii" => Ok(Model::AxeFxII),
            "ax8" => Ok(Model::Ax8),
            _ => Model::resolve(s).ok_or_else(|| format!("Unknown device model: {}", s)),
        }
    }
}

/// A high-level device command
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Load a preset as the working preset
    SelectPreset(u16),
    /// Set the working preset's tempo (BPM)
    SetTempo(u16),
    /// Rename the working preset
    SetPresetName(String),
    /// Store the working preset into a numbered slot
    StoreCurrentPresetTo(u16),
    /// Ask the device for a preset's name
    QueryPresetName(u16),
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Command::SelectPreset(preset) => write!(f, "select preset {}", preset),
            Command::SetTempo(bpm) => write!(f, "set tempo {} bpm", bpm),
            Command::SetPresetName(name) => write!(f, "set preset name {:?}", name),
            Command::StoreCurrentPresetTo(preset) => write!(f, "store to preset {}", preset),
            Command::QueryPresetName(preset) => write!(f, "query name of preset {}", preset),
        }
    }
}

/// Tag identifying a kind of decoded event, used to key listeners
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum EventType {
    PresetName,
    PresetNumber,
    TempoBeat,
    Acknowledge,
    Midi,
    Unknown,
    Foreign,
}

impl EventType {
    pub const ALL: [EventType; 7] = [
        EventType::PresetName,
        EventType::PresetNumber,
        EventType::TempoBeat,
        EventType::Acknowledge,
        EventType::Midi,
        EventType::Unknown,
        EventType::Foreign,
    ];
}

/// A decoded inbound message
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeviceEvent {
    /// Reply to a preset name query
    PresetName { preset: u16, name: String },
    /// The device reported its current preset number
    PresetNumber { preset: u16 },
    /// Tempo beat clock, sent on every beat
    TempoBeat,
    /// Multipurpose acknowledgement for a previously sent function
    Acknowledge { function: u8, code: u8 },
    /// Plain MIDI traffic
    Midi(MidiMessage),
    /// Fractal SysEx with a function this crate does not know. `model` is
    /// `None` when the model byte is not one we support.
    Unknown {
        model: Option<Model>,
        function: u8,
        payload: Vec<u8>,
    },
    /// SysEx from another manufacturer
    Foreign(Vec<u8>),
}

impl DeviceEvent {
    /// Tag used to route this event to listeners
    pub fn event_type(&self) -> EventType {
        match self {
            DeviceEvent::PresetName { .. } => EventType::PresetName,
            DeviceEvent::PresetNumber { .. } => EventType::PresetNumber,
            DeviceEvent::TempoBeat => EventType::TempoBeat,
            DeviceEvent::Acknowledge { .. } => EventType::Acknowledge,
            DeviceEvent::Midi(_) => EventType::Midi,
            DeviceEvent::Unknown { .. } => EventType::Unknown,
            DeviceEvent::Foreign(_) => EventType::Foreign,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_axe_fx_ii() {
        assert_eq!(Model::resolve("AXE-FX II"), Some(Model::AxeFxII));
        assert_eq!(
            Model::resolve("AXE-FX II:AXE-FX II MIDI 1 20:0"),
            Some(Model::AxeFxII)
        );
        assert_eq!(Model::resolve("Fractal AXE-FX II XL+ Out"), Some(Model::AxeFxII));
        assert_eq!(Model::resolve("axe-fx ii"), Some(Model::AxeFxII));
    }

    #[test]
    fn test_resolve_ax8() {
        assert_eq!(Model::resolve("AX8"), Some(Model::Ax8));
        assert_eq!(Model::resolve("AX8 MIDI Out 2"), Some(Model::Ax8));
    }

    #[test]
    fn test_resolve_unknown() {
        assert_eq!(Model::resolve("IAC Driver Bus 1"), None);
        assert_eq!(Model::resolve("Line 6 Helix"), None);
        assert_eq!(Model::resolve(""), None);
    }

    #[test]
    fn test_model_from_str() {
        assert_eq!("ax8".parse::<Model>(), Ok(Model::Ax8));
        assert_eq!("axe-fx-ii".parse::<Model>(), Ok(Model::AxeFxII));
        assert!("helix".parse::<Model>().is_err());
    }

    #[test]
    fn test_sysex_ids_round_trip() {
        for model in Model::ALL {
            assert_eq!(Model::from_sysex_id(model.sysex_id()), Some(model));
        }
        assert_eq!(Model::from_sysex_id(0x7F), None);
    }

    #[test]
    fn test_event_type_tags() {
        assert_eq!(
            DeviceEvent::PresetName {
                preset: 3,
                name: "Clean".to_string()
            }
            .event_type(),
            EventType::PresetName
        );
        assert_eq!(DeviceEvent::TempoBeat.event_type(), EventType::TempoBeat);
    }
}
