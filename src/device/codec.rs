// Copyright (c) 2026 Robert L. Snyder, Sierra Vista, AZ
// Licensed under the MIT License. See LICENSE file in the project root for details.

//! Fractal SysEx encoding and decoding.
//!
//! Every frame has the shape
//! `F0 00 01 74 <model> <function> <payload...> <checksum> F7`, where the
//! checksum is the XOR of all bytes from `F0` through the last payload byte,
//! masked to 7 bits. Multi-byte numbers are split into 7-bit groups.

use thiserror::Error;

use super::{Command, DeviceEvent, Model, PRESET_NAME_LEN};
use crate::midi::messages::{SYSEX_END, SYSEX_START};
use crate::midi::MidiMessage;

/// Fractal Audio manufacturer id
pub const MANUFACTURER_ID: [u8; 3] = [0x00, 0x01, 0x74];

/// SysEx function numbers
pub mod function {
    pub const SET_BLOCK_PARAMETER: u8 = 0x02;
    pub const SET_PRESET_NAME: u8 = 0x09;
    pub const PRESET_NAME: u8 = 0x0F;
    pub const TEMPO_BEAT: u8 = 0x10;
    pub const PRESET_NUMBER: u8 = 0x14;
    pub const STORE_PRESET: u8 = 0x1D;
    pub const SET_PRESET_NUMBER: u8 = 0x3C;
    pub const ACKNOWLEDGE: u8 = 0x64;
}

/// Controllers block, which owns the preset tempo
const CONTROLLERS_BLOCK: u16 = 141;
/// Tempo parameter within the controllers block
const TEMPO_PARAMETER: u16 = 32;
/// Trailing action byte for a parameter write
const PARAMETER_SET: u8 = 0x01;

/// Bytes before the function payload: F0, manufacturer, model, function
const HEADER_LEN: usize = 6;
/// Smallest well-formed Fractal frame: header, checksum, F7
const MIN_FRAME_LEN: usize = HEADER_LEN + 2;

/// Errors produced while decoding inbound bytes
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecodeError {
    #[error("Empty MIDI message")]
    Empty,

    #[error("SysEx message of {len} bytes is missing its F7 terminator")]
    Unterminated { len: usize },

    #[error("SysEx message of {len} bytes is too short for a Fractal frame")]
    TooShort { len: usize },

    #[error("Checksum mismatch: frame carries {actual:#04x}, computed {expected:#04x}")]
    Checksum { expected: u8, actual: u8 },

    #[error("Function {function:#04x} needs {needed} payload bytes, got {actual}")]
    Truncated {
        function: u8,
        needed: usize,
        actual: usize,
    },
}

/// Encode a command as one SysEx frame for the given model
pub fn encode(model: Model, command: &Command) -> Vec<u8> {
    match command {
        Command::SelectPreset(preset) => frame(
            model,
            function::SET_PRESET_NUMBER,
            &split_preset_number(*preset),
        ),
        Command::SetTempo(bpm) => {
            let mut payload = Vec::with_capacity(8);
            payload.extend_from_slice(&septets2(CONTROLLERS_BLOCK));
            payload.extend_from_slice(&septets2(TEMPO_PARAMETER));
            payload.extend_from_slice(&septets3(u32::from(*bpm)));
            payload.push(PARAMETER_SET);
            frame(model, function::SET_BLOCK_PARAMETER, &payload)
        }
        Command::SetPresetName(name) => {
            frame(model, function::SET_PRESET_NAME, &name_bytes(name))
        }
        Command::StoreCurrentPresetTo(preset) => {
            frame(model, function::STORE_PRESET, &split_preset_number(*preset))
        }
        Command::QueryPresetName(preset) => {
            frame(model, function::PRESET_NAME, &split_preset_number(*preset))
        }
    }
}

/// Decode one inbound message.
///
/// Plain MIDI is passed through the channel/real-time parser; SysEx from
/// other manufacturers is returned untouched as [`DeviceEvent::Foreign`].
pub fn decode(bytes: &[u8]) -> Result<DeviceEvent, DecodeError> {
    // The parser only gives up on empty input
    if bytes.first() != Some(&SYSEX_START) {
        return MidiMessage::parse(bytes)
            .map(DeviceEvent::Midi)
            .ok_or(DecodeError::Empty);
    }

    let len = bytes.len();
    if bytes[len - 1] != SYSEX_END {
        return Err(DecodeError::Unterminated { len });
    }

    if len < 4 || bytes[1..4] != MANUFACTURER_ID {
        return Ok(DeviceEvent::Foreign(bytes.to_vec()));
    }

    if len < MIN_FRAME_LEN {
        return Err(DecodeError::TooShort { len });
    }

    let actual = bytes[len - 2];
    let expected = checksum(&bytes[..len - 2]);
    if actual != expected {
        return Err(DecodeError::Checksum { expected, actual });
    }

    let model = bytes[4];
    let function = bytes[5];
    let payload = &bytes[HEADER_LEN..len - 2];

    match function {
        function::PRESET_NAME => {
            require(function, payload, 2)?;
            Ok(DeviceEvent::PresetName {
                preset: join_preset_number(payload[0], payload[1]),
                name: parse_name(&payload[2..]),
            })
        }
        function::TEMPO_BEAT => Ok(DeviceEvent::TempoBeat),
        function::PRESET_NUMBER => {
            require(function, payload, 2)?;
            Ok(DeviceEvent::PresetNumber {
                preset: join_preset_number(payload[0], payload[1]),
            })
        }
        function::ACKNOWLEDGE => {
            require(function, payload, 2)?;
            Ok(DeviceEvent::Acknowledge {
                function: payload[0],
                code: payload[1],
            })
        }
        _ => Ok(DeviceEvent::Unknown {
            model: Model::from_sysex_id(model),
            function,
            payload: payload.to_vec(),
        }),
    }
}

/// XOR checksum over a partial frame, masked to 7 bits
pub fn checksum(bytes: &[u8]) -> u8 {
    bytes.iter().fold(0u8, |acc, b| acc ^ b) & 0x7F
}

/// Build a complete frame around a payload
fn frame(model: Model, function: u8, payload: &[u8]) -> Vec<u8> {
    let mut bytes = Vec::with_capacity(MIN_FRAME_LEN + payload.len());
    bytes.push(SYSEX_START);
    bytes.extend_from_slice(&MANUFACTURER_ID);
    bytes.push(model.sysex_id());
    bytes.push(function);
    bytes.extend_from_slice(payload);
    bytes.push(checksum(&bytes));
    bytes.push(SYSEX_END);
    bytes
}

fn require(function: u8, payload: &[u8], needed: usize) -> Result<(), DecodeError> {
    if payload.len() < needed {
        return Err(DecodeError::Truncated {
            function,
            needed,
            actual: payload.len(),
        });
    }
    Ok(())
}

/// Preset numbers travel high group first
fn split_preset_number(preset: u16) -> [u8; 2] {
    [((preset >> 7) & 0x7F) as u8, (preset & 0x7F) as u8]
}

fn join_preset_number(high: u8, low: u8) -> u16 {
    (u16::from(high & 0x7F) << 7) | u16::from(low & 0x7F)
}

/// Parameter ids travel low group first
fn septets2(value: u16) -> [u8; 2] {
    [(value & 0x7F) as u8, ((value >> 7) & 0x7F) as u8]
}

fn septets3(value: u32) -> [u8; 3] {
    [
        (value & 0x7F) as u8,
        ((value >> 7) & 0x7F) as u8,
        ((value >> 14) & 0x7F) as u8,
    ]
}

/// A name as the device will store it: truncated, padded and with
/// unsupported characters replaced, read back without the padding.
pub fn stored_name(name: &str) -> String {
    parse_name(&name_bytes(name))
}

/// Fixed-width, space-padded ASCII; anything else becomes '?'
fn name_bytes(name: &str) -> [u8; PRESET_NAME_LEN] {
    let mut bytes = [b' '; PRESET_NAME_LEN];
    for (slot, ch) in bytes.iter_mut().zip(name.chars()) {
        *slot = if ch.is_ascii() && !ch.is_ascii_control() {
            ch as u8
        } else {
            b'?'
        };
    }
    bytes
}

fn parse_name(bytes: &[u8]) -> String {
    let end = bytes.iter().position(|&b| b == 0).unwrap_or(bytes.len());
    bytes[..end]
        .iter()
        .map(|&b| if b.is_ascii() { b as char } else { '?' })
        .collect::<String>()
        .trim_end()
        .to_string()
}
