// Copyright (c) 2026 Robert L. Snyder, Sierra Vista, AZ
// Licensed under the MIT License. See LICENSE file in the project root for details.

//! Setlist provisioning for Fractal Audio effects units.
//!
//! Songs from a setlist are written into consecutive presets of an Axe-Fx II
//! or AX8 over MIDI SysEx, each a copy of one template preset with the
//! song's tempo and a `[key] title` name. Preset names can be read back to
//! verify the result.

pub mod config;
pub mod device;
pub mod midi;
pub mod provision;
pub mod query;
pub mod services;
pub mod setlist;
