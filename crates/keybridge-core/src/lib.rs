//! keybridge Core - Core types, derivation paths, and device capabilities
//!
//! This crate provides the foundational types for keybridge:
//! - BIP32 derivation paths and the textual path resolver
//! - The table of compatible USB device types
//! - The capability trait implemented by every device driver

pub mod device;
pub mod path;

pub use device::{
    DeviceError, DeviceKind, DeviceSummary, DeviceType, FirmwareStatus, HardwareDevice, InfoMap,
    DEBUG_DEVICE, KNOWN_DEVICE_TYPES, LEDGER_NANO_S,
};
pub use path::{resolve, ChildIndex, DerivationPath, PathError};
