//! Fuzz target: `DoorbellConfig::from_json`
//!
//! Feeds arbitrary bytes to the build-time config override parser and
//! verifies:
//! - No panics under arbitrary input
//! - Anything accepted also passes `validate()`
//! - Accepted configs survive a serialise / parse round-trip unchanged
//!
//! cargo fuzz run fuzz_config_json

#![no_main]

use doorbell::config::DoorbellConfig;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let Ok(json) = core::str::from_utf8(data) else {
        return;
    };
    let Ok(config) = DoorbellConfig::from_json(json) else {
        return;
    };

    assert_eq!(config.validate(), Ok(()), "accepted config failed validation");

    let text = serde_json::to_string(&config).expect("serialise accepted config");
    let again = DoorbellConfig::from_json(&text).expect("re-parse accepted config");
    assert_eq!(config, again, "round-trip changed the config");
});
