//! keybridge Device - Finding and choosing attached signing devices
//!
//! This crate provides:
//! - Enumeration over pluggable device sources
//! - The single-device selection policy
//! - A software debug device driver

pub mod debug;
pub mod enumerate;
pub mod select;

pub use debug::{DebugDevice, MAX_DERIVATION_DEPTH};
pub use enumerate::{DebugDeviceSource, DeviceHandle, DeviceSource, Enumerate, Enumerator};
pub use select::{select_one, SelectionError};
