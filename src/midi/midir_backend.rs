// Copyright (c) 2026 Robert L. Snyder, Sierra Vista, AZ
// Licensed under the MIT License. See LICENSE file in the project root for details.

//! midir backend.
//!
//! Cross-platform implementation of [`MidiBackend`] on top of midir. midir
//! does not expose a port's manufacturer, so every [`PortInfo`] it returns
//! has `manufacturer: None` and vendor matching falls back to port names.

use anyhow::{anyhow, Result};
use midir::{Ignore, MidiInputConnection, MidiOutputConnection};

use super::{InputHandler, InputPort, MidiBackend, MidiOutput, PortInfo};

const CLIENT_NAME: &str = "axe-setlist";

/// midir-backed port access
#[derive(Debug, Default, Clone, Copy)]
pub struct MidirBackend;

impl MidirBackend {
    pub fn new() -> Self {
        Self
    }
}

/// midir output connection
pub struct MidirOutput {
    connection: MidiOutputConnection,
}

impl MidiOutput for MidirOutput {
    fn send(&mut self, message: &[u8]) -> Result<()> {
        self.connection
            .send(message)
            .map_err(|e| anyhow!("Failed to send MIDI message: {}", e))
    }
}

/// midir input connection; closes when dropped
pub struct MidirInput {
    _connection: MidiInputConnection<()>,
    port_name: String,
}

impl InputPort for MidirInput {
    fn port_name(&self) -> &str {
        &self.port_name
    }
}

impl MidiBackend for MidirBackend {
    fn input_ports(&self) -> Result<Vec<PortInfo>> {
        Ok(list_sources()?
            .into_iter()
            .map(|(_, name)| PortInfo::new(name))
            .collect())
    }

    fn output_ports(&self) -> Result<Vec<PortInfo>> {
        Ok(list_destinations()?
            .into_iter()
            .map(|(_, name)| PortInfo::new(name))
            .collect())
    }

    fn open_output(&self, port_name: &str) -> Result<Box<dyn MidiOutput>> {
        let midi_out = midir::MidiOutput::new(CLIENT_NAME)
            .map_err(|e| anyhow!("Failed to create MIDI client: {}", e))?;

        let port = midi_out
            .ports()
            .into_iter()
            .find(|port| midi_out.port_name(port).ok().as_deref() == Some(port_name))
            .ok_or_else(|| anyhow!("MIDI destination '{}' not found", port_name))?;

        let connection = midi_out
            .connect(&port, "axe-setlist-out")
            .map_err(|e| anyhow!("Failed to connect to destination '{}': {}", port_name, e))?;

        Ok(Box::new(MidirOutput { connection }))
    }

    fn open_input(&self, port_name: &str, mut handler: InputHandler) -> Result<Box<dyn InputPort>> {
        let mut midi_in = midir::MidiInput::new(CLIENT_NAME)
            .map_err(|e| anyhow!("Failed to create MIDI client: {}", e))?;
        // SysEx replies are the whole point of listening
        midi_in.ignore(Ignore::None);

        let port = midi_in
            .ports()
            .into_iter()
            .find(|port| midi_in.port_name(port).ok().as_deref() == Some(port_name))
            .ok_or_else(|| anyhow!("MIDI source '{}' not found", port_name))?;

        let connection = midi_in
            .connect(
                &port,
                "axe-setlist-in",
                move |_timestamp, message, _| handler(message),
                (),
            )
            .map_err(|e| anyhow!("Failed to connect to source '{}': {}", port_name, e))?;

        Ok(Box::new(MidirInput {
            _connection: connection,
            port_name: port_name.to_string(),
        }))
    }
}

/// List all available MIDI destinations.
///
/// # Returns
/// A vector of (index, name) tuples.
pub fn list_destinations() -> Result<Vec<(usize, String)>> {
    let midi_out = midir::MidiOutput::new(CLIENT_NAME)
        .map_err(|e| anyhow!("Failed to create MIDI client: {}", e))?;

    Ok(midi_out
        .ports()
        .iter()
        .enumerate()
        .map(|(i, port)| {
            let name = midi_out
                .port_name(port)
                .unwrap_or_else(|_| format!("Unknown {}", i));
            (i, name)
        })
        .collect())
}

/// List all available MIDI sources.
pub fn list_sources() -> Result<Vec<(usize, String)>> {
    let midi_in = midir::MidiInput::new(CLIENT_NAME)
        .map_err(|e| anyhow!("Failed to create MIDI client: {}", e))?;

    Ok(midi_in
        .ports()
        .iter()
        .enumerate()
        .map(|(i, port)| {
            let name = midi_in
                .port_name(port)
                .unwrap_or_else(|_| format!("Unknown {}", i));
            (i, name)
        })
        .collect())
}

/// Print all available MIDI destinations to stdout.
pub fn print_destinations() -> Result<()> {
    print_ports("destinations (outputs)", list_destinations()?);
    Ok(())
}

/// Print all available MIDI sources to stdout.
pub fn print_sources() -> Result<()> {
    print_ports("sources (inputs)", list_sources()?);
    Ok(())
}

fn print_ports(label: &str, ports: Vec<(usize, String)>) {
    if ports.is_empty() {
        println!("No MIDI {} found.", label);
    } else {
        println!("Available MIDI {}:", label);
        for (i, name) in ports {
            println!("  {}: {}", i, name);
        }
    }
}
