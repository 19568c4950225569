//! Fuzz target for PID lookup output parsing.
//!
//! Anything that is not a bare PID must land in the rejected list so it
//! can never reach a kill command.

#![no_main]

use ap_core::action::parse_pid_list;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &str| {
    let (_pids, rejected) = parse_pid_list(data);
    for line in rejected {
        assert!(line.parse::<u32>().is_err());
    }
});
