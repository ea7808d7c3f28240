// Copyright (c) 2026 Robert L. Snyder, Sierra Vista, AZ
// Licensed under the MIT License. See LICENSE file in the project root for details.

//! Integration tests for axe-setlist
//!
//! A simulated effects unit stands in for the hardware: it keeps preset
//! slots and an edit buffer, applies the SysEx it receives and answers
//! preset name requests through the input handler, like the real device.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use anyhow::Result;
use tempfile::TempDir;

use axe_setlist::config::AppConfig;
use axe_setlist::device::codec::{self, function};
use axe_setlist::device::{EventType, Model, PRESET_NAME_LEN};
use axe_setlist::midi::{
    ConnectOptions, Connection, InputHandler, InputPort, MidiBackend, MidiOutput, PortInfo,
    TransportError,
};
use axe_setlist::provision::{self, ProvisionRequest};
use axe_setlist::query::{PresetQueryService, QueryOptions};
use axe_setlist::setlist::{SetlistStore, Song};

#[derive(Debug, Clone, Default, PartialEq)]
struct Preset {
    name: String,
    tempo: u16,
}

#[derive(Default)]
struct DeviceState {
    presets: HashMap<u16, Preset>,
    current: u16,
    edit: Preset,
    defer_replies: bool,
    pending: Vec<Vec<u8>>,
}

#[derive(Clone)]
struct SimulatedDevice {
    port_name: String,
    model_id: u8,
    state: Arc<Mutex<DeviceState>>,
    handler: Arc<Mutex<Option<InputHandler>>>,
}

impl SimulatedDevice {
    fn new(port_name: &str, model_id: u8) -> Self {
        Self {
            port_name: port_name.to_string(),
            model_id,
            state: Arc::new(Mutex::new(DeviceState::default())),
            handler: Arc::new(Mutex::new(None)),
        }
    }

    fn store(&self, slot: u16, name: &str, tempo: u16) {
        self.state.lock().unwrap().presets.insert(
            slot,
            Preset {
                name: name.to_string(),
                tempo,
            },
        );
    }

    fn preset(&self, slot: u16) -> Option<Preset> {
        self.state.lock().unwrap().presets.get(&slot).cloned()
    }

    fn current(&self) -> u16 {
        self.state.lock().unwrap().current
    }

    /// Hold replies until `flush_reversed` is called
    fn defer_replies(&self) {
        self.state.lock().unwrap().defer_replies = true;
    }

    /// Deliver held replies, newest first
    fn flush_reversed(&self) {
        let pending = std::mem::take(&mut self.state.lock().unwrap().pending);
        for reply in pending.into_iter().rev() {
            self.deliver(&reply);
        }
    }

    fn sysex(&self, function: u8, payload: &[u8]) -> Vec<u8> {
        let mut bytes = vec![0xF0, 0x00, 0x01, 0x74, self.model_id, function];
        bytes.extend_from_slice(payload);
        bytes.push(codec::checksum(&bytes));
        bytes.push(0xF7);
        bytes
    }

    fn deliver(&self, bytes: &[u8]) {
        if let Some(handler) = self.handler.lock().unwrap().as_mut() {
            handler(bytes);
        }
    }

    fn receive(&self, bytes: &[u8]) {
        assert_eq!(bytes[0], 0xF0);
        assert_eq!(bytes[4], self.model_id, "frame for another model");
        let payload = &bytes[6..bytes.len() - 2];
        let slot = |p: &[u8]| (u16::from(p[0]) << 7) | u16::from(p[1]);

        let mut replies = Vec::new();
        {
            let mut state = self.state.lock().unwrap();
            match bytes[5] {
                function::SET_PRESET_NUMBER => {
                    state.current = slot(payload);
                    state.edit = state.presets.get(&state.current).cloned().unwrap_or_default();
                }
                function::SET_BLOCK_PARAMETER => {
                    state.edit.tempo = u16::from(payload[4])
                        | (u16::from(payload[5]) << 7)
                        | (u16::from(payload[6]) << 14);
                }
                function::SET_PRESET_NAME => {
                    state.edit.name = String::from_utf8_lossy(payload).trim_end().to_string();
                }
                function::STORE_PRESET => {
                    let edit = state.edit.clone();
                    state.presets.insert(slot(payload), edit);
                }
                function::PRESET_NAME => {
                    let name = state
                        .presets
                        .get(&slot(payload))
                        .map(|preset| preset.name.clone())
                        .unwrap_or_default();
                    let mut reply = payload[..2].to_vec();
                    reply.extend(format!("{:<width$}", name, width = PRESET_NAME_LEN).bytes());

                    // The beat clock keeps running while the device answers
                    replies.push(self.sysex(function::TEMPO_BEAT, &[]));
                    replies.push(self.sysex(function::PRESET_NAME, &reply));
                }
                other => panic!("unexpected function {:#04x}", other),
            }
            if state.defer_replies {
                state.pending.append(&mut replies);
            }
        }

        for reply in replies {
            self.deliver(&reply);
        }
    }
}

struct SimulatedOutput {
    device: SimulatedDevice,
}

impl MidiOutput for SimulatedOutput {
    fn send(&mut self, message: &[u8]) -> Result<()> {
        self.device.receive(message);
        Ok(())
    }
}

struct SimulatedInput {
    name: String,
}

impl InputPort for SimulatedInput {
    fn port_name(&self) -> &str {
        &self.name
    }
}

impl MidiBackend for SimulatedDevice {
    fn input_ports(&self) -> Result<Vec<PortInfo>> {
        Ok(vec![
            PortInfo::new("Midi Through Port-0"),
            PortInfo::new(format!("{} MIDI In", self.port_name)),
        ])
    }

    fn output_ports(&self) -> Result<Vec<PortInfo>> {
        Ok(vec![
            PortInfo::new("Midi Through Port-0"),
            PortInfo::new(format!("{} MIDI Out", self.port_name)),
        ])
    }

    fn open_output(&self, _port_name: &str) -> Result<Box<dyn MidiOutput>> {
        Ok(Box::new(SimulatedOutput {
            device: self.clone(),
        }))
    }

    fn open_input(&self, port_name: &str, handler: InputHandler) -> Result<Box<dyn InputPort>> {
        *self.handler.lock().unwrap() = Some(handler);
        Ok(Box::new(SimulatedInput {
            name: port_name.to_string(),
        }))
    }
}

fn query_service(connection: &Connection) -> PresetQueryService {
    PresetQueryService::new(
        connection.output(),
        connection.bus(),
        connection.model().unwrap(),
        QueryOptions {
            timeout: Duration::from_secs(2),
            retries: 0,
        },
    )
}

/// Songs go from the setlist store onto the device and read back intact
#[tokio::test]
async fn test_setlist_to_device_round_trip() {
    let dir = TempDir::new().unwrap();
    let config = AppConfig::default();
    let mut store = SetlistStore::open(dir.path().join("setlists.yaml")).unwrap();
    let id = store.create_setlist("default", "Sunday AM").unwrap();
    store.add_song("default", id, Song::new("Amazing Grace", "G", 80)).unwrap();
    store
        .add_song("default", id, Song::new("Great Are You Lord", "D", 140))
        .unwrap();

    let device = SimulatedDevice::new("AXE-FX II", 0x03);
    device.store(config.presets.base, "Worship Template", 120);

    let connection = Connection::connect(&device, config.connect_options()).unwrap();
    assert_eq!(connection.output_name(), "AXE-FX II MIDI Out");
    assert_eq!(connection.model().unwrap(), Model::AxeFxII);

    let request = ProvisionRequest {
        model: connection.model().unwrap(),
        base_preset: config.presets.base,
        starting_preset: config.presets.starting,
        songs: store.setlist("default", id).unwrap().songs.clone(),
    };
    let sequence = request.plan().unwrap();
    let sent = provision::send_sequence(&connection.output(), &sequence, Duration::ZERO)
        .await
        .unwrap();
    assert_eq!(sent, 10);

    assert_eq!(
        device.preset(217),
        Some(Preset {
            name: "[G] Amazing Grace".to_string(),
            tempo: 80
        })
    );
    assert_eq!(
        device.preset(218),
        Some(Preset {
            name: "[D] Great Are You Lord".to_string(),
            tempo: 140
        })
    );
    // Template untouched, last target selected
    assert_eq!(device.preset(209).unwrap().name, "Worship Template");
    assert_eq!(device.current(), 218);

    let names = query_service(&connection)
        .query_preset_names(217..219)
        .await
        .unwrap();
    assert_eq!(
        names,
        vec![
            (217, "[G] Amazing Grace".to_string()),
            (218, "[D] Great Are You Lord".to_string())
        ]
    );
    assert_eq!(connection.bus().listener_count(EventType::PresetName), 0);
}

/// Two outstanding queries, answered in reverse order
#[tokio::test]
async fn test_concurrent_queries_on_shared_connection() {
    let device = SimulatedDevice::new("AXE-FX II", 0x03);
    device.store(5, "Clean", 100);
    device.store(6, "Crunch", 100);
    device.defer_replies();

    let connection = Connection::connect(&device, ConnectOptions::default()).unwrap();
    let service = query_service(&connection);
    let bus = connection.bus();

    let (five, six, _) = tokio::join!(
        service.query_preset_name(5),
        service.query_preset_name(6),
        async {
            while bus.listener_count(EventType::PresetName) < 2 {
                tokio::task::yield_now().await;
            }
            device.flush_reversed();
        }
    );

    assert_eq!(five.unwrap(), "Clean");
    assert_eq!(six.unwrap(), "Crunch");
}

#[tokio::test]
async fn test_ax8_frames_carry_its_model_id() {
    let device = SimulatedDevice::new("AX8", 0x08);
    device.store(0, "Template", 120);

    let connection = Connection::connect(&device, ConnectOptions::default()).unwrap();
    let model = connection.model().unwrap();
    assert_eq!(model, Model::Ax8);

    let sequence = provision::plan(model, 0, 1, &[Song::new("Oceans", "D", 67)]).unwrap();
    // The simulator rejects frames addressed to another model
    provision::send_sequence(&connection.output(), &sequence, Duration::ZERO)
        .await
        .unwrap();

    assert_eq!(device.preset(1).unwrap().tempo, 67);
}

#[test]
fn test_no_fractal_ports() {
    let device = SimulatedDevice::new("Line 6 Helix", 0x03);
    let result = Connection::connect(&device, ConnectOptions::default());
    assert!(matches!(result, Err(TransportError::NoInputPort { .. })));
}

#[test]
fn test_device_filter_accepts_renamed_port() {
    let device = SimulatedDevice::new("USB Audio Device", 0x03);
    let options = ConnectOptions {
        device_filter: Some("usb audio".to_string()),
        model: Some(Model::AxeFxII),
        ..ConnectOptions::default()
    };

    let connection = Connection::connect(&device, options).unwrap();
    assert_eq!(connection.input_name(), "USB Audio Device MIDI In");
    assert_eq!(connection.model().unwrap(), Model::AxeFxII);
}
