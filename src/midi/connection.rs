// Copyright (c) 2026 Robert L. Snyder, Sierra Vista, AZ
// Licensed under the MIT License. See LICENSE file in the project root for details.

//! Connection to the one Fractal Audio unit on the MIDI system.
//!
//! A connection owns the output port, the input port and the event bus fed
//! by the input port's handler. Everything that talks to the device borrows
//! from here.

use thiserror::Error;

use super::bus::EventBus;
use super::{InputPort, MidiBackend, OutputHandle, PortInfo};
use crate::device::{self, DeviceEvent, EventType, Model};

/// Transport errors
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("No {vendor} MIDI input port found")]
    NoInputPort { vendor: String },

    #[error("No {vendor} MIDI output port found")]
    NoOutputPort { vendor: String },

    #[error("Cannot determine device model from port name '{0}'")]
    UnresolvedModel(String),

    #[error("MIDI backend error: {0}")]
    Backend(#[from] anyhow::Error),
}

/// Options for [`Connection::connect`]
#[derive(Debug, Clone)]
pub struct ConnectOptions {
    /// Log every decoded inbound event
    pub log_decoded_messages: bool,
    /// Event types never logged, even when logging is on
    pub quiet_events: Vec<EventType>,
    /// Extra port-name fragment accepted as the target device
    pub device_filter: Option<String>,
    /// Model to use instead of resolving it from the port name
    pub model: Option<Model>,
}

impl Default for ConnectOptions {
    fn default() -> Self {
        Self {
            log_decoded_messages: false,
            quiet_events: vec![EventType::TempoBeat],
            device_filter: None,
            model: None,
        }
    }
}

impl ConnectOptions {
    /// Whether a port belongs to the target vendor
    pub fn matches(&self, port: &PortInfo) -> bool {
        if let Some(manufacturer) = &port.manufacturer {
            return manufacturer == device::VENDOR_NAME;
        }
        if let Some(filter) = &self.device_filter {
            if port.name.to_lowercase().contains(&filter.to_lowercase()) {
                return true;
            }
        }
        Model::resolve(&port.name).is_some()
    }

    /// Whether a decoded event should be logged
    pub fn should_log(&self, event: &DeviceEvent) -> bool {
        self.log_decoded_messages && !self.quiet_events.contains(&event.event_type())
    }

    /// Event types worth showing to an operator watching the device
    pub fn audible_event_types(&self) -> Vec<EventType> {
        EventType::ALL
            .into_iter()
            .filter(|event_type| !self.quiet_events.contains(event_type))
            .collect()
    }
}

/// An open connection to the device
pub struct Connection {
    options: ConnectOptions,
    input_port: PortInfo,
    output: OutputHandle,
    input: Option<Box<dyn InputPort>>,
    bus: EventBus,
}

impl Connection {
    /// Discover the device's input/output pair, open both and start listening.
    pub fn connect(
        backend: &dyn MidiBackend,
        options: ConnectOptions,
    ) -> Result<Self, TransportError> {
        let input_port = backend
            .input_ports()?
            .into_iter()
            .find(|port| options.matches(port))
            .ok_or_else(|| TransportError::NoInputPort {
                vendor: device::VENDOR_NAME.to_string(),
            })?;

        let output_port = backend
            .output_ports()?
            .into_iter()
            .find(|port| options.matches(port))
            .ok_or_else(|| TransportError::NoOutputPort {
                vendor: device::VENDOR_NAME.to_string(),
            })?;

        tracing::info!(
            input = %input_port.name,
            output = %output_port.name,
            "Found device ports"
        );

        let output = OutputHandle::new(
            output_port.name.clone(),
            backend.open_output(&output_port.name)?,
        );

        let mut connection = Self {
            options,
            input_port,
            output,
            input: None,
            bus: EventBus::new(),
        };
        connection.listen(backend)?;
        Ok(connection)
    }

    /// Install the inbound handler. Calling this again is a no-op, so events
    /// are never fanned out twice for the same port.
    pub fn listen(&mut self, backend: &dyn MidiBackend) -> Result<(), TransportError> {
        if self.input.is_some() {
            tracing::debug!(port = %self.input_port.name, "Input handler already installed");
            return Ok(());
        }

        let bus = self.bus.clone();
        let options = self.options.clone();
        let port_name = self.input_port.name.clone();
        let handler = Box::new(move |bytes: &[u8]| match device::decode(bytes) {
            Ok(event) => {
                if options.should_log(&event) {
                    tracing::info!(port = %port_name, ?event, "Decoded device message");
                }
                bus.dispatch(&event);
            }
            Err(e) => {
                tracing::warn!(port = %port_name, error = %e, len = bytes.len(), "Dropping undecodable message");
            }
        });

        let input = backend.open_input(&self.input_port.name, handler)?;
        tracing::debug!(port = %input.port_name(), "Input handler installed");
        self.input = Some(input);
        Ok(())
    }

    /// Device model, from the options or resolved from the output port name
    pub fn model(&self) -> Result<Model, TransportError> {
        if let Some(model) = self.options.model {
            return Ok(model);
        }
        Model::resolve(self.output.name())
            .ok_or_else(|| TransportError::UnresolvedModel(self.output.name().to_string()))
    }

    /// Shared handle to the output port
    pub fn output(&self) -> OutputHandle {
        self.output.clone()
    }

    /// Event bus fed by the input port
    pub fn bus(&self) -> EventBus {
        self.bus.clone()
    }

    /// Name of the open input port, or of the discovered one before `listen`
    pub fn input_name(&self) -> &str {
        self.input
            .as_ref()
            .map_or(self.input_port.name.as_str(), |input| input.port_name())
    }

    pub fn output_name(&self) -> &str {
        self.output.name()
    }

    pub fn is_listening(&self) -> bool {
        self.input.is_some()
    }
}

impl Drop for Connection {
    fn drop(&mut self) {
        // Pending listeners would otherwise wait on a closed port
        self.bus.clear();
    }
}
