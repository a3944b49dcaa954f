//! Access to the local AWS emulator
//!
//! - [`client`]: the [`EmulatorApi`] trait and its HTTP implementation
//! - [`types`]: request, response and health types
//! - [`error`]: [`EmulatorError`]
//! - [`mock`]: an in-memory emulator used by tests

pub mod client;
pub mod error;
pub mod mock;
pub mod types;

pub use client::{EmulatorApi, HttpEmulatorClient, HEALTH_PATH};
pub use error::EmulatorError;
pub use mock::MockEmulator;
pub use types::{EmulatorHealth, EmulatorRequest, EmulatorResponse, AMZ_JSON_1_0};
