//! Process inspection on the device.

pub mod process_list;
pub mod snapshot;

pub use process_list::{list_processes, parse_process_list};
pub use snapshot::ProcessSnapshot;
