// Copyright (c) 2026 Robert L. Snyder, Sierra Vista, AZ
// Licensed under the MIT License. See LICENSE file in the project root for details.

//! MIDI I/O abstraction layer.
//!
//! This module provides a trait-based abstraction over the MIDI backend so
//! the connection logic can run against real ports (midir) or an in-memory
//! device in tests.

pub mod bus;
pub mod connection;
pub mod input;
pub mod midir_backend;

use std::fmt;
use std::sync::{Arc, Mutex, PoisonError};

use anyhow::Result;

pub use bus::{Delivery, EventBus, ListenerId, Subscription};
pub use connection::{ConnectOptions, Connection, TransportError};
pub use input::MidiMessage;
pub use midir_backend::{print_destinations, print_sources, MidirBackend};

/// Trait for MIDI output implementations.
pub trait MidiOutput: Send {
    /// Send a MIDI message immediately.
    ///
    /// # Arguments
    /// * `message` - Raw MIDI bytes, usually one complete SysEx frame
    ///
    /// # Returns
    /// * `Ok(())` on success
    /// * `Err` if the message could not be sent
    fn send(&mut self, message: &[u8]) -> Result<()>;
}

/// Handler invoked by a backend for every inbound message.
pub type InputHandler = Box<dyn FnMut(&[u8]) + Send + 'static>;

/// Marker for an open input port. Dropping it closes the port.
pub trait InputPort {
    /// Name of the port this input is connected to
    fn port_name(&self) -> &str;
}

/// A port advertised by a backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PortInfo {
    /// Display name of the port
    pub name: String,
    /// Vendor identity, when the backend reports one
    pub manufacturer: Option<String>,
}

impl PortInfo {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            manufacturer: None,
        }
    }

    pub fn with_manufacturer(mut self, manufacturer: impl Into<String>) -> Self {
        self.manufacturer = Some(manufacturer.into());
        self
    }
}

/// Port enumeration and opening for one MIDI system.
pub trait MidiBackend {
    /// List available input ports (sources)
    fn input_ports(&self) -> Result<Vec<PortInfo>>;

    /// List available output ports (destinations)
    fn output_ports(&self) -> Result<Vec<PortInfo>>;

    /// Open the named output port
    fn open_output(&self, port_name: &str) -> Result<Box<dyn MidiOutput>>;

    /// Open the named input port, delivering every inbound message to `handler`
    fn open_input(&self, port_name: &str, handler: InputHandler) -> Result<Box<dyn InputPort>>;
}

/// Shared, cloneable handle to the single output port.
///
/// Every caller (provisioning, preset queries) sends through the same port;
/// each frame is written under one lock so frames never interleave.
#[derive(Clone)]
pub struct OutputHandle {
    name: Arc<str>,
    port: Arc<Mutex<Box<dyn MidiOutput>>>,
}

impl OutputHandle {
    pub fn new(name: impl Into<String>, port: Box<dyn MidiOutput>) -> Self {
        Self {
            name: Arc::from(name.into()),
            port: Arc::new(Mutex::new(port)),
        }
    }

    /// Port name, used to resolve the device model
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Send one message
    pub fn send(&self, message: &[u8]) -> Result<()> {
        let mut port = self.port.lock().unwrap_or_else(PoisonError::into_inner);
        port.send(message)
    }
}

impl fmt::Debug for OutputHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OutputHandle").field("name", &self.name).finish()
    }
}

/// MIDI message constants
pub mod messages {
    // Channel Voice Messages (upper nibble, lower nibble is channel 0-15)
    pub const NOTE_OFF: u8 = 0x80;
    pub const NOTE_ON: u8 = 0x90;
    pub const CONTROL_CHANGE: u8 = 0xB0;
    pub const PROGRAM_CHANGE: u8 = 0xC0;
    pub const PITCH_BEND: u8 = 0xE0;

    // System Real-Time Messages
    pub const TIMING_CLOCK: u8 = 0xF8;
    pub const START: u8 = 0xFA;
    pub const CONTINUE: u8 = 0xFB;
    pub const STOP: u8 = 0xFC;
    pub const ACTIVE_SENSING: u8 = 0xFE;

    // System Common Messages
    pub const SYSEX_START: u8 = 0xF0;
    pub const SYSEX_END: u8 = 0xF7;
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Mock MIDI output for testing
    struct MockMidiOutput {
        messages: Arc<Mutex<Vec<Vec<u8>>>>,
    }

    impl MidiOutput for MockMidiOutput {
        fn send(&mut self, message: &[u8]) -> Result<()> {
            self.messages.lock().unwrap().push(message.to_vec());
            Ok(())
        }
    }

    #[test]
    fn test_output_handle_shares_port() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let handle = OutputHandle::new(
            "AXE-FX II MIDI Out",
            Box::new(MockMidiOutput {
                messages: log.clone(),
            }),
        );
        let clone = handle.clone();

        handle.send(&[messages::SYSEX_START, 0x00, messages::SYSEX_END]).unwrap();
        clone.send(&[messages::PROGRAM_CHANGE, 5]).unwrap();

        let sent = log.lock().unwrap();
        assert_eq!(sent.len(), 2);
        assert_eq!(sent[1], vec![0xC0, 5]);
        assert_eq!(clone.name(), "AXE-FX II MIDI Out");
    }

    #[test]
    fn test_port_info_builder() {
        let port = PortInfo::new("AX8").with_manufacturer("Fractal Audio Systems");
        assert_eq!(port.name, "AX8");
        assert_eq!(port.manufacturer.as_deref(), Some("Fractal Audio Systems"));
    }

    #[test]
    fn test_midi_message_constants() {
        assert_eq!(messages::SYSEX_START, 0xF0);
        assert_eq!(messages::SYSEX_END, 0xF7);
        assert_eq!(messages::TIMING_CLOCK, 0xF8);
    }
}
