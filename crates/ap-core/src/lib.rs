//! autoprobe core library.
//!
//! Detects whether an Android application is brought back to life by system
//! or vendor broadcasts after being killed. Everything talks to the device
//! through [`device::DeviceShell`], with `adb` as the real transport.

pub mod action;
pub mod catalog;
pub mod collect;
pub mod config;
pub mod device;
pub mod driver;
pub mod exit_codes;
pub mod logging;
pub mod monitor;

#[cfg(any(test, feature = "test-utils"))]
pub mod mock_device;

pub use exit_codes::ExitCode;
