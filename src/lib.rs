//! Doorbell publisher firmware library.
//!
//! Exposes the pure-logic modules for integration testing and host-side
//! simulation. All ESP-IDF-specific code is guarded by
//! `#[cfg(target_os = "espidf")]` within each module.

#![deny(unused_must_use)]

pub mod app;
pub mod config;
pub mod connectivity;
pub mod detector;
pub mod error;
pub mod events;
pub mod pins;
pub mod scheduler;

// The ESP-IDF-only pieces compile on the host through cfg-gated
// simulation stubs inside each module.
pub mod adapters;
pub mod drivers;
pub mod sensors;
