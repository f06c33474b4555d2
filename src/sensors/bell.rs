//! Doorbell pickup driver.
//!
//! Reads the analog voltage of the bell pickup through an ADC1 channel
//! and scales it into the 0 – 1023 range the detector threshold is
//! expressed in.
//!
//! ## Dual-target design
//!
//! On ESP-IDF: reads ADC1 via the oneshot API (initialised by hw_init).
//! On host/test: reads from a static `AtomicU16` for injection.

#[cfg(not(target_os = "espidf"))]
use core::sync::atomic::{AtomicU16, Ordering};

use crate::error::SensorError;
use crate::pins;

use super::SampleReading;

#[cfg(not(target_os = "espidf"))]
static SIM_BELL_ADC: AtomicU16 = AtomicU16::new(0);

/// Inject the raw ADC value returned by every subsequent host-side read.
#[cfg(not(target_os = "espidf"))]
pub fn sim_set_bell_adc(raw: u16) {
    SIM_BELL_ADC.store(raw, Ordering::Relaxed);
}

pub struct BellSensor {
    channel: u32,
    shift: u32,
    total_reads: u64,
}

impl BellSensor {
    pub fn new(channel: u32) -> Self {
        Self {
            channel,
            shift: pins::BELL_ADC_SHIFT,
            total_reads: 0,
        }
    }

    /// Number of successful reads since boot.
    pub fn total_reads(&self) -> u64 {
        self.total_reads
    }

    pub fn read(&mut self) -> Result<SampleReading, SensorError> {
        let raw = self.read_adc()?;
        self.total_reads = self.total_reads.saturating_add(1);
        Ok(SampleReading {
            raw,
            value: f32::from(raw >> self.shift),
        })
    }

    #[cfg(target_os = "espidf")]
    fn read_adc(&self) -> Result<u16, SensorError> {
        crate::drivers::hw_init::adc1_read(self.channel)
    }

    #[cfg(not(target_os = "espidf"))]
    fn read_adc(&self) -> Result<u16, SensorError> {
        let _ = self.channel;
        Ok(SIM_BELL_ADC.load(Ordering::Relaxed))
    }
}
