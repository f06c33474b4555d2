//! Fuzz target: `EdgeDetector`
//!
//! The first four bytes pick a detector configuration; the rest is a
//! sample stream (one byte per sample, scaled ×4 onto the 0 – 1020 range).
//! Verifies:
//! - No panics, including with extreme limits
//! - Two rings are always separated by at least `cooldown + limit` samples
//! - No ring is ever reported while cooldown is active
//!
//! cargo fuzz run fuzz_detector

#![no_main]

use doorbell::config::DetectorConfig;
use doorbell::detector::{Detection, EdgeDetector};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    if data.len() < 4 {
        return;
    }

    let config = DetectorConfig {
        threshold: f32::from(data[0]) * 4.0,
        streak_limit: u32::from(data[1] % 32) + 1,
        cooldown_samples: u32::from(u16::from_le_bytes([data[2], data[3]]) % 2048),
    };
    let mut det = EdgeDetector::new(config);

    let mut last_ring: Option<usize> = None;
    for (i, &b) in data[4..].iter().enumerate() {
        let was_armed = det.is_armed();
        if det.feed(f32::from(b) * 4.0) == Detection::Ring {
            assert!(was_armed, "ring reported during cooldown at sample {}", i);
            if let Some(prev) = last_ring {
                let gap = (i - prev) as u32;
                assert!(
                    gap >= config.cooldown_samples + config.streak_limit,
                    "rings {} samples apart",
                    gap
                );
            }
            last_ring = Some(i);
        }
    }
});
