//! Device types and the capability set of a hardware signing device

use bitcoin::bip32::Xpub;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;
use tracing::debug;

use crate::path::DerivationPath;

/// Driver family of a known device type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeviceKind {
    /// Software device holding an in-memory master key
    Debug,
    /// Ledger Nano S over USB HID
    LedgerNanoS,
}

/// Static description of a compatible USB device
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DeviceType {
    pub vendor_id: u16,
    pub product_id: u16,
    pub vendor: &'static str,
    pub product: &'static str,
    pub kind: DeviceKind,
}

pub const DEBUG_DEVICE: DeviceType = DeviceType {
    vendor_id: 0xffff,
    product_id: 0x0001,
    vendor: "Debug",
    product: "Device",
    kind: DeviceKind::Debug,
};

pub const LEDGER_NANO_S: DeviceType = DeviceType {
    vendor_id: 0x2c97,
    product_id: 0x0001,
    vendor: "Ledger",
    product: "Nano S",
    kind: DeviceKind::LedgerNanoS,
};

/// Every device type the bridge knows how to talk to
pub static KNOWN_DEVICE_TYPES: &[DeviceType] = &[DEBUG_DEVICE, LEDGER_NANO_S];

impl DeviceType {
    /// Look up a compatible device type by USB identifiers
    pub fn find(vendor_id: u16, product_id: u16) -> Option<&'static DeviceType> {
        KNOWN_DEVICE_TYPES
            .iter()
            .find(|t| t.vendor_id == vendor_id && t.product_id == product_id)
    }
}

impl std::fmt::Display for DeviceType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} {} ({:04x}:{:04x})",
            self.vendor, self.product, self.vendor_id, self.product_id
        )
    }
}

/// Error reported by a device driver, surfaced to callers verbatim
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{0}")]
pub struct DeviceError(String);

impl DeviceError {
    pub fn new(msg: impl Into<String>) -> Self {
        Self(msg.into())
    }

    pub fn message(&self) -> &str {
        &self.0
    }
}

/// Structured device information as returned by the info capability
pub type InfoMap = Map<String, Value>;

/// Capabilities of one attached hardware signing device
///
/// A handle is only valid for the enumeration that produced it. Devices
/// cannot service overlapping transactions, hence `&mut self` everywhere.
pub trait HardwareDevice: Send {
    /// Static type of this device
    fn device_type(&self) -> &DeviceType;

    /// Query the firmware version string
    fn firmware_version(&mut self) -> Result<String, DeviceError>;

    /// Query structured device information
    ///
    /// Whatever was gathered before a failure is returned alongside the error.
    fn info(&mut self) -> (InfoMap, Result<(), DeviceError>);

    /// Derive the extended public key at `path`
    fn derive_xpub(&mut self, path: &DerivationPath) -> Result<Xpub, DeviceError>;

    /// Sign `message` with the key at `path`, returning the raw signature
    fn sign_message(
        &mut self,
        path: &DerivationPath,
        message: &[u8],
    ) -> Result<Vec<u8>, DeviceError>;
}

/// Outcome of the firmware query for one listed device
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum FirmwareStatus {
    #[serde(rename = "firmwareversion")]
    Version(String),
    #[serde(rename = "error")]
    Error(String),
}

/// One entry of a device listing
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DeviceSummary {
    pub vendor: String,
    pub product: String,
    #[serde(flatten)]
    pub firmware: FirmwareStatus,
}

impl DeviceSummary {
    /// Build a summary by querying the device's firmware version
    pub fn query(device: &mut dyn HardwareDevice) -> Self {
        let device_type = device.device_type();
        let vendor = device_type.vendor.to_string();
        let product = device_type.product.to_string();

        let firmware = match device.firmware_version() {
            Ok(version) => FirmwareStatus::Version(version),
            Err(e) => {
                debug!(vendor = %vendor, product = %product, error = %e, "Firmware query failed");
                FirmwareStatus::Error(e.to_string())
            }
        };

        Self {
            vendor,
            product,
            firmware,
        }
    }
}
