// Copyright (c) 2026 Robert L. Snyder, Sierra Vista, AZ
// Licensed under the MIT License. See LICENSE file in the project root for details.

//! Parsing of plain (non-SysEx) MIDI traffic from the device.
//!
//! The effects unit mostly talks SysEx, but it also echoes program changes,
//! controller moves and real-time bytes. Those are surfaced to listeners as
//! `MidiMessage` values wrapped in a device event.

use super::messages;

/// Parsed MIDI message types
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MidiMessage {
    /// Note On: channel (0-15), note (0-127), velocity (0-127)
    NoteOn { channel: u8, note: u8, velocity: u8 },
    /// Note Off: channel (0-15), note (0-127), velocity (0-127)
    NoteOff { channel: u8, note: u8, velocity: u8 },
    /// Control Change: channel (0-15), controller (0-127), value (0-127)
    ControlChange { channel: u8, controller: u8, value: u8 },
    /// Program Change: channel (0-15), program (0-127)
    ProgramChange { channel: u8, program: u8 },
    /// Pitch Bend: channel (0-15), value (-8192 to 8191)
    PitchBend { channel: u8, value: i16 },
    /// MIDI Clock tick
    TimingClock,
    /// Start playback
    Start,
    /// Continue playback
    Continue,
    /// Stop playback
    Stop,
    /// Active sensing keep-alive
    ActiveSensing,
    /// Unknown/unparsed message
    Unknown(Vec<u8>),
}

impl MidiMessage {
    /// Parse raw MIDI bytes into a MidiMessage
    pub fn parse(data: &[u8]) -> Option<Self> {
        let (&status, rest) = data.split_first()?;

        // System Real-Time messages (single byte)
        match status {
            messages::TIMING_CLOCK => return Some(MidiMessage::TimingClock),
            messages::START => return Some(MidiMessage::Start),
            messages::CONTINUE => return Some(MidiMessage::Continue),
            messages::STOP => return Some(MidiMessage::Stop),
            messages::ACTIVE_SENSING => return Some(MidiMessage::ActiveSensing),
            _ => {}
        }

        let msg_type = status & 0xF0;
        let channel = status & 0x0F;

        match (msg_type, rest) {
            (messages::NOTE_OFF, [note, velocity, ..]) => Some(MidiMessage::NoteOff {
                channel,
                note: note & 0x7F,
                velocity: velocity & 0x7F,
            }),
            // Note On with velocity 0 is equivalent to Note Off
            (messages::NOTE_ON, [note, 0, ..]) => Some(MidiMessage::NoteOff {
                channel,
                note: note & 0x7F,
                velocity: 0,
            }),
            (messages::NOTE_ON, [note, velocity, ..]) => Some(MidiMessage::NoteOn {
                channel,
                note: note & 0x7F,
                velocity: velocity & 0x7F,
            }),
            (messages::CONTROL_CHANGE, [controller, value, ..]) => {
                Some(MidiMessage::ControlChange {
                    channel,
                    controller: controller & 0x7F,
                    value: value & 0x7F,
                })
            }
            (messages::PROGRAM_CHANGE, [program, ..]) => Some(MidiMessage::ProgramChange {
                channel,
                program: program & 0x7F,
            }),
            (messages::PITCH_BEND, [lsb, msb, ..]) => {
                let value = (((*msb as i16) << 7) | *lsb as i16) - 8192;
                Some(MidiMessage::PitchBend { channel, value })
            }
            _ => Some(MidiMessage::Unknown(data.to_vec())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_note_on() {
        let msg = MidiMessage::parse(&[0x90, 60, 100]);
        assert_eq!(
            msg,
            Some(MidiMessage::NoteOn {
                channel: 0,
                note: 60,
                velocity: 100
            })
        );
    }

    #[test]
    fn test_parse_note_on_velocity_zero() {
        let msg = MidiMessage::parse(&[0x91, 60, 0]);
        assert_eq!(
            msg,
            Some(MidiMessage::NoteOff {
                channel: 1,
                note: 60,
                velocity: 0
            })
        );
    }

    #[test]
    fn test_parse_program_change() {
        let msg = MidiMessage::parse(&[0xC0, 5]);
        assert_eq!(
            msg,
            Some(MidiMessage::ProgramChange {
                channel: 0,
                program: 5
            })
        );
    }

    #[test]
    fn test_parse_control_change() {
        // Bank select MSB, as sent alongside program changes
        let msg = MidiMessage::parse(&[0xB2, 0, 1]);
        assert_eq!(
            msg,
            Some(MidiMessage::ControlChange {
                channel: 2,
                controller: 0,
                value: 1
            })
        );
    }

    #[test]
    fn test_parse_pitch_bend_center() {
        let msg = MidiMessage::parse(&[0xE0, 0x00, 0x40]);
        assert_eq!(
            msg,
            Some(MidiMessage::PitchBend {
                channel: 0,
                value: 0
            })
        );
    }

    #[test]
    fn test_parse_real_time() {
        assert_eq!(MidiMessage::parse(&[0xF8]), Some(MidiMessage::TimingClock));
        assert_eq!(MidiMessage::parse(&[0xFA]), Some(MidiMessage::Start));
        assert_eq!(MidiMessage::parse(&[0xFB]), Some(MidiMessage::Continue));
        assert_eq!(MidiMessage::parse(&[0xFC]), Some(MidiMessage::Stop));
        assert_eq!(MidiMessage::parse(&[0xFE]), Some(MidiMessage::ActiveSensing));
    }

    #[test]
    fn test_parse_truncated_and_empty() {
        assert_eq!(MidiMessage::parse(&[]), None);
        assert_eq!(
            MidiMessage::parse(&[0x90, 60]),
            Some(MidiMessage::Unknown(vec![0x90, 60]))
        );
    }
}
