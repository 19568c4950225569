//! Actions taken against device processes.

pub mod terminate;

pub use terminate::{kill, parse_pid_list, TerminationReport};
