//! Fuzz target for process list parsing.

#![no_main]

use ap_core::collect::parse_process_list;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &str| {
    let names = parse_process_list(data);
    // One name at most per line after the header.
    assert!(names.len() <= data.lines().count().saturating_sub(1));
    assert!(names.iter().all(|n| !n.is_empty() && !n.contains(char::is_whitespace)));
});
