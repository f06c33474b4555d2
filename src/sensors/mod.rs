//! Sensor subsystem — the doorbell pickup driver and its reading type.

pub mod bell;

pub use bell::BellSensor;

/// A single analog measurement.
///
/// Ephemeral: produced once per sample tick and consumed immediately by
/// the edge detector.  The timestamp is implied by the fixed cadence.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SampleReading {
    /// Raw ADC count as returned by the driver.
    pub raw: u16,
    /// Value compared against the detector threshold.
    pub value: f32,
}
