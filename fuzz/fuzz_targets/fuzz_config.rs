//! Fuzz target for analysis configuration parsing and validation.

#![no_main]

use libfuzzer_sys::fuzz_target;
use sb_config::{validate_config, AnalysisConfig};

fuzz_target!(|data: &[u8]| {
    let Ok(text) = std::str::from_utf8(data) else {
        return;
    };
    if let Ok(config) = AnalysisConfig::from_json_str(text) {
        let _ = validate_config(&config);
    }
});
