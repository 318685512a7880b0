//! Scripted devices and enumerators for dispatcher tests

use bitcoin::bip32::Xpub;
use keybridge_core::{
    DerivationPath, DeviceError, DeviceType, HardwareDevice, InfoMap, LEDGER_NANO_S,
};
use keybridge_device::{DeviceHandle, Enumerate};
use serde_json::Value;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

/// BIP32 test vector 1, chain m/0H
pub const VECTOR_XPUB: &str = "xpub68Gmy5EdvgibQVfPdqkBBCHxA5htiqg55crXYuXoQRKfDBFA1WEjWgP6LHhwBZeNK1VTsfTFUHCdrfp1bgwQ9xv5ski8PX9rL2dZXvgGDnw";

/// Capability call seen by a fake device
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    FirmwareVersion,
    Info,
    DeriveXpub(Vec<u32>),
    SignMessage(Vec<u32>, Vec<u8>),
}

#[derive(Clone)]
pub struct FakeDevice {
    pub firmware: Result<String, DeviceError>,
    pub info_error: Option<DeviceError>,
    pub xpub: Result<Xpub, DeviceError>,
    pub signature: Result<Vec<u8>, DeviceError>,
    pub calls: Arc<Mutex<Vec<Call>>>,
}

impl Default for FakeDevice {
    fn default() -> Self {
        Self {
            firmware: Ok("1.6.0".to_string()),
            info_error: None,
            xpub: Ok(VECTOR_XPUB.parse().unwrap()),
            signature: Ok(vec![0x1f; 65]),
            calls: Arc::default(),
        }
    }
}

impl FakeDevice {
    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    fn record(&self, call: Call) {
        self.calls.lock().unwrap().push(call);
    }
}

impl HardwareDevice for FakeDevice {
    fn device_type(&self) -> &DeviceType {
        &LEDGER_NANO_S
    }

    fn firmware_version(&mut self) -> Result<String, DeviceError> {
        self.record(Call::FirmwareVersion);
        self.firmware.clone()
    }

    fn info(&mut self) -> (InfoMap, Result<(), DeviceError>) {
        self.record(Call::Info);
        let mut info = InfoMap::new();
        info.insert("model".into(), Value::from("nanos"));
        match &self.info_error {
            Some(e) => (info, Err(e.clone())),
            None => (info, Ok(())),
        }
    }

    fn derive_xpub(&mut self, path: &DerivationPath) -> Result<Xpub, DeviceError> {
        self.record(Call::DeriveXpub(path.to_u32_vec()));
        self.xpub.clone()
    }

    fn sign_message(
        &mut self,
        path: &DerivationPath,
        message: &[u8],
    ) -> Result<Vec<u8>, DeviceError> {
        self.record(Call::SignMessage(path.to_u32_vec(), message.to_vec()));
        self.signature.clone()
    }
}

/// Enumerator returning clones of a fixed set of fake devices
#[derive(Default)]
pub struct FakeEnumerator {
    pub devices: Vec<FakeDevice>,
    scans: AtomicUsize,
}

impl FakeEnumerator {
    pub fn new(devices: Vec<FakeDevice>) -> Self {
        Self {
            devices,
            scans: AtomicUsize::new(0),
        }
    }

    pub fn scans(&self) -> usize {
        self.scans.load(Ordering::SeqCst)
    }
}

impl Enumerate for FakeEnumerator {
    fn enumerate(&self) -> Vec<DeviceHandle> {
        self.scans.fetch_add(1, Ordering::SeqCst);
        self.devices
            .iter()
            .cloned()
            .map(|d| Box::new(d) as DeviceHandle)
            .collect()
    }
}
