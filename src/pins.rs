//! GPIO / peripheral pin assignments for the doorbell sensor board.
//!
//! Single source of truth — drivers reference this module rather than
//! hard-coding pin numbers.

// ---------------------------------------------------------------------------
// Sensor — Analog (ADC1)
// ---------------------------------------------------------------------------

/// Doorbell pickup (coil / microphone) — analog voltage into ADC1.
/// ADC1 channel 0 (GPIO 1 on ESP32-S3).
pub const BELL_ADC_GPIO: i32 = 1;
/// ADC1 channel number wired to [`BELL_ADC_GPIO`].
pub const BELL_ADC_CHANNEL: u32 = 0;

/// Bits dropped from the 12-bit ESP32 reading so samples land in the
/// 0 – 1023 range the detector threshold was tuned for.
pub const BELL_ADC_SHIFT: u32 = 2;

