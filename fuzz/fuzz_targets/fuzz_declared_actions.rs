//! Fuzz target for `dumpsys package` action extraction.

#![no_main]

use ap_core::catalog::parse_declared_actions;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &str| {
    for action in parse_declared_actions(data) {
        assert!(!action.contains('"'));
        assert!(!action.contains('\n'));
    }
});
