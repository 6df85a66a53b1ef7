// SPDX-License-Identifier: MIT
// Copyright (c) 2026 ADNT Sarl <info@adnt.io>

//! Boot gatekeeper for network-connected RP2040 boards.
//!
//! Nothing after the gatekeeper is allowed to run until the device has a
//! network link and a wall-clock time it can trust. Either precondition
//! failing within its retry budget ends in a hardware restart.
//!
//! This crate supports both `no_std` (embedded) and `std` (host) environments:
//! - Default: `no_std` mode for embedded targets
//! - `std` feature: Enables `std` support for host tools and the build script
//! - `defmt` feature: Routes diagnostics to `defmt` and derives `defmt::Format`

#![cfg_attr(not(feature = "std"), no_std)]

#[macro_use]
mod fmt;

pub mod at;
pub mod config;
pub mod indicator;
pub mod network;
pub mod orchestrator;
pub mod time_sync;

// Re-export commonly used types
pub use at::{AtError, EspAtModem};
pub use config::{BootConfig, ConfigError, Credential, CredentialPolicy, NetworkCredentials};
pub use indicator::{PulsePattern, StatusIndicator};
pub use network::{ConnectionOutcome, NetworkConnector, StationInterface};
pub use orchestrator::{BootOrchestrator, BootState, BootVerdict, SystemReset};
pub use time_sync::{CivilDateTime, SyncOutcome, TimeSource, TimeSyncAttempt, TimeSynchronizer};
