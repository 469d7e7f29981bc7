//! Fuzz target for configuration parsing and settings conversion.
//!
//! Run with: cargo +nightly fuzz run fuzz_config_parser

#![no_main]

use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    if let Ok(s) = std::str::from_utf8(data)
        && let Ok(config) = cmdalias_config::AppConfig::parse(s)
    {
        // Anything that validates must convert into engine settings.
        assert!(cmdalias_core::EngineSettings::from_config(&config).is_ok());
    }
});
