//! Device enumeration across all configured device sources

use anyhow::{Context, Result};
use bitcoin::{Network, NetworkKind};
use keybridge_core::HardwareDevice;
use tracing::{debug, info, warn};

use crate::debug::DebugDevice;

/// Owned handle to one enumerated device
pub type DeviceHandle = Box<dyn HardwareDevice>;

/// A transport or driver that can report attached devices
///
/// A scan returns a fresh snapshot; handles are never reused across scans.
pub trait DeviceSource: Send + Sync {
    /// Short name used in logs
    fn name(&self) -> &str;

    /// Scan for attached devices
    fn scan(&self) -> Result<Vec<DeviceHandle>>;
}

/// Anything that can produce a snapshot of attached devices
pub trait Enumerate: Send + Sync {
    /// Enumerate attached devices; an empty list means no usable device
    fn enumerate(&self) -> Vec<DeviceHandle>;
}

/// Enumerator that scans every registered source in order
#[derive(Default)]
pub struct Enumerator {
    sources: Vec<Box<dyn DeviceSource>>,
}

impl Enumerator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an additional device source
    pub fn add_source(&mut self, source: impl DeviceSource + 'static) {
        info!(source = source.name(), "Registered device source");
        self.sources.push(Box::new(source));
    }

    pub fn with_source(mut self, source: impl DeviceSource + 'static) -> Self {
        self.add_source(source);
        self
    }

    pub fn source_count(&self) -> usize {
        self.sources.len()
    }
}

impl Enumerate for Enumerator {
    fn enumerate(&self) -> Vec<DeviceHandle> {
        let mut devices = Vec::new();

        for source in &self.sources {
            match source.scan() {
                Ok(found) => {
                    debug!(source = source.name(), found = found.len(), "Scanned device source");
                    devices.extend(found);
                }
                Err(e) => {
                    warn!(source = source.name(), error = %e, "Device source scan failed");
                }
            }
        }

        debug!(
            "Enumerated {} devices from {} sources",
            devices.len(),
            self.sources.len()
        );
        devices
    }
}

/// Source that always reports a single software debug device
pub struct DebugDeviceSource {
    seed: Vec<u8>,
    network: NetworkKind,
}

impl DebugDeviceSource {
    pub fn new(seed: Vec<u8>, network: NetworkKind) -> Self {
        Self { seed, network }
    }

    /// Build from a hex seed and a network name (`bitcoin`, `testnet`, `signet`, `regtest`)
    pub fn from_hex(seed_hex: &str, network: &str) -> Result<Self> {
        let seed = hex::decode(seed_hex).context("Debug device seed is not valid hex")?;
        let network: Network = network
            .parse()
            .with_context(|| format!("Unknown network '{}'", network))?;
        Ok(Self::new(seed, NetworkKind::from(network)))
    }
}

impl DeviceSource for DebugDeviceSource {
    fn name(&self) -> &str {
        "debug"
    }

    fn scan(&self) -> Result<Vec<DeviceHandle>> {
        let device = DebugDevice::from_seed(&self.seed, self.network)?;
        Ok(vec![Box::new(device)])
    }
}
