//! Hardware adapter — bridges real peripherals to domain port traits.
//!
//! Owns the [`BellSensor`] and exposes it through [`SensorPort`].  This is
//! the only module in the system that touches the ADC.  On non-espidf
//! targets the underlying driver uses a cfg-gated simulation stub.

use crate::app::ports::SensorPort;
use crate::error::SensorError;
use crate::sensors::{BellSensor, SampleReading};

/// Concrete adapter that puts the bell pickup behind the sensor port.
pub struct HardwareAdapter {
    bell: BellSensor,
}

impl HardwareAdapter {
    pub fn new(bell: BellSensor) -> Self {
        Self { bell }
    }

    pub fn bell(&self) -> &BellSensor {
        &self.bell
    }
}

// ── SensorPort implementation ─────────────────────────────────

impl SensorPort for HardwareAdapter {
    fn read_sample(&mut self) -> Result<SampleReading, SensorError> {
        self.bell.read()
    }
}
