//! Application core — pure domain logic, zero I/O.
//!
//! Turns sensor samples into ring messages and routes them to the
//! publisher.  All interaction with hardware and the network happens
//! through **port traits** defined in [`ports`], keeping this layer fully
//! testable without real peripherals.

pub mod events;
pub mod messages;
pub mod ports;
pub mod service;
