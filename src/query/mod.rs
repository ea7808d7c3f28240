// Copyright (c) 2026 Robert L. Snyder, Sierra Vista, AZ
// Licensed under the MIT License. See LICENSE file in the project root for details.

//! Reading preset names back from the device.
//!
//! A query selects the preset, registers a one-shot listener for the preset
//! name reply and then sends the name request. Replies carry the preset
//! number, so several queries can be outstanding on the shared input port
//! without picking up each other's answers. Every wait is bounded: a query
//! that gets no reply deregisters its listener and fails with
//! [`QueryError::Timeout`].

use std::ops::Range;
use std::sync::{Mutex, PoisonError};
use std::time::Duration;

use thiserror::Error;
use tokio::sync::oneshot;

use crate::device::{self, Command, DeviceEvent, EventType, Model};
use crate::midi::{Delivery, EventBus, OutputHandle};

/// Default wait for a reply
pub const DEFAULT_TIMEOUT: Duration = Duration::from_millis(2000);

/// Query errors
#[derive(Debug, Error)]
pub enum QueryError {
    #[error("No name received for preset {preset} within {waited:?}")]
    Timeout { preset: u16, waited: Duration },

    #[error("Connection closed while waiting for the name of preset {preset}")]
    Closed { preset: u16 },

    #[error("Failed to send query for preset {preset}: {source}")]
    Send {
        preset: u16,
        #[source]
        source: anyhow::Error,
    },
}

/// Timeout and retry policy
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QueryOptions {
    /// How long to wait for each reply
    pub timeout: Duration,
    /// How many times to re-send an unanswered name request
    pub retries: u32,
}

impl QueryOptions {
    /// Sends of the name request, counting the first
    pub fn attempts(&self) -> u32 {
        self.retries.saturating_add(1)
    }

    /// Longest a query can wait across all attempts
    pub fn total_wait(&self) -> Duration {
        self.timeout.saturating_mul(self.attempts())
    }
}

impl Default for QueryOptions {
    fn default() -> Self {
        Self {
            timeout: DEFAULT_TIMEOUT,
            retries: 0,
        }
    }
}

/// Issues preset name queries over a shared connection
#[derive(Debug, Clone)]
pub struct PresetQueryService {
    output: OutputHandle,
    bus: EventBus,
    model: Model,
    options: QueryOptions,
}

impl PresetQueryService {
    pub fn new(output: OutputHandle, bus: EventBus, model: Model, options: QueryOptions) -> Self {
        Self {
            output,
            bus,
            model,
            options,
        }
    }

    pub fn model(&self) -> Model {
        self.model
    }

    /// Read the name stored in `preset`
    pub async fn query_preset_name(&self, preset: u16) -> Result<String, QueryError> {
        self.send(preset, &Command::SelectPreset(preset))?;

        let (tx, mut rx) = oneshot::channel();
        let reply = Mutex::new(Some(tx));
        let _subscription = self.bus.subscribe(EventType::PresetName, move |event| {
            let DeviceEvent::PresetName { preset: answered, name } = event else {
                return Delivery::Keep;
            };
            if *answered != preset {
                return Delivery::Keep;
            }
            if let Some(tx) = reply.lock().unwrap_or_else(PoisonError::into_inner).take() {
                let _ = tx.send(name.clone());
            }
            Delivery::Done
        });

        let attempts = self.options.attempts();
        for attempt in 1..=attempts {
            tracing::debug!(preset, attempt, "Requesting preset name");
            self.send(preset, &Command::QueryPresetName(preset))?;

            match tokio::time::timeout(self.options.timeout, &mut rx).await {
                Ok(Ok(name)) => {
                    tracing::debug!(preset, %name, "Preset name received");
                    return Ok(name);
                }
                Ok(Err(_)) => return Err(QueryError::Closed { preset }),
                Err(_) => {
                    tracing::warn!(preset, attempt, attempts, "No reply to preset name request");
                }
            }
        }

        Err(QueryError::Timeout {
            preset,
            waited: self.options.total_wait(),
        })
    }

    /// Read several presets one after another
    pub async fn query_preset_names(
        &self,
        presets: Range<u16>,
    ) -> Result<Vec<(u16, String)>, QueryError> {
        let mut names = Vec::with_capacity(presets.len());
        for preset in presets {
            let name = self.query_preset_name(preset).await?;
            names.push((preset, name));
        }
        Ok(names)
    }

    fn send(&self, preset: u16, command: &Command) -> Result<(), QueryError> {
        self.output
            .send(&device::encode(self.model, command))
            .map_err(|source| QueryError::Send { preset, source })
    }
}
