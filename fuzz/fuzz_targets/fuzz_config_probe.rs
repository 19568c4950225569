//! Fuzz target for probe.json parsing and validation.

#![no_main]

use ap_config::{validate_probe_settings, ProbeSettings};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    if let Ok(settings) = serde_json::from_slice::<ProbeSettings>(data) {
        let _ = validate_probe_settings(&settings);
    }
});
