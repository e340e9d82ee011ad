// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Shared test doubles and fixtures for TouchBridge crates.
#![forbid(unsafe_code)]
//!
//! # Modules
//!
//! - [`config`] - In-memory config store fake for testing without filesystem
//! - [`events`] - Terse contact event builders
//! - [`transport`] - Recording transport with scripted failures

pub mod config;
pub mod events;
pub mod transport;

pub use config::InMemoryConfigStore;
pub use events::{contact_id, end, moved, start};
pub use transport::RecordingTransport;
