//! Software debug device
//!
//! Behaves like an attached signing device but keeps its BIP32 master key
//! in memory. Meant for regression setups and tests, never for real funds.

use bitcoin::bip32::{self, Xpriv, Xpub};
use bitcoin::hashes::Hash;
use bitcoin::secp256k1::{All, Message, Secp256k1};
use bitcoin::sign_message::{signed_msg_hash, MessageSignature};
use bitcoin::NetworkKind;
use keybridge_core::{DerivationPath, DeviceError, DeviceType, HardwareDevice, InfoMap, DEBUG_DEVICE};
use serde_json::Value;
use tracing::{debug, info};

/// Deepest path the debug device will derive
pub const MAX_DERIVATION_DEPTH: usize = 10;

const MIN_SEED_LEN: usize = 16;
const MAX_SEED_LEN: usize = 64;

pub struct DebugDevice {
    master: Xpriv,
    network: NetworkKind,
    secp: Secp256k1<All>,
}

impl DebugDevice {
    /// Create a debug device whose master key is derived from `seed`
    pub fn from_seed(seed: &[u8], network: NetworkKind) -> Result<Self, DeviceError> {
        if !(MIN_SEED_LEN..=MAX_SEED_LEN).contains(&seed.len()) {
            return Err(DeviceError::new(format!(
                "Seed must be {} to {} bytes, got {}",
                MIN_SEED_LEN,
                MAX_SEED_LEN,
                seed.len()
            )));
        }
        let master = Xpriv::new_master(network, seed)
            .map_err(|e| DeviceError::new(format!("Invalid seed: {}", e)))?;
        Ok(Self {
            master,
            network,
            secp: Secp256k1::new(),
        })
    }

    fn derive_priv(&self, path: &DerivationPath) -> Result<Xpriv, DeviceError> {
        if path.len() > MAX_DERIVATION_DEPTH {
            return Err(DeviceError::new(format!(
                "Path depth {} exceeds device limit of {}",
                path.len(),
                MAX_DERIVATION_DEPTH
            )));
        }
        let bip32_path = bip32::DerivationPath::from(path);
        self.master
            .derive_priv(&self.secp, &bip32_path)
            .map_err(|e| DeviceError::new(format!("Derivation failed: {}", e)))
    }
}

fn network_name(network: NetworkKind) -> &'static str {
    match network {
        NetworkKind::Main => "main",
        NetworkKind::Test => "test",
    }
}

impl HardwareDevice for DebugDevice {
    fn device_type(&self) -> &DeviceType {
        &DEBUG_DEVICE
    }

    fn firmware_version(&mut self) -> Result<String, DeviceError> {
        Ok(format!("debug-{}", env!("CARGO_PKG_VERSION")))
    }

    fn info(&mut self) -> (InfoMap, Result<(), DeviceError>) {
        let mut info = InfoMap::new();
        info.insert("device".into(), Value::from("debug"));
        info.insert("network".into(), Value::from(network_name(self.network)));
        info.insert(
            "fingerprint".into(),
            Value::from(self.master.fingerprint(&self.secp).to_string()),
        );
        (info, Ok(()))
    }

    fn derive_xpub(&mut self, path: &DerivationPath) -> Result<Xpub, DeviceError> {
        let xpriv = self.derive_priv(path)?;
        debug!(path = %path, "Derived extended key");
        Ok(Xpub::from_priv(&self.secp, &xpriv))
    }

    fn sign_message(
        &mut self,
        path: &DerivationPath,
        message: &[u8],
    ) -> Result<Vec<u8>, DeviceError> {
        let text = std::str::from_utf8(message)
            .map_err(|_| DeviceError::new("Message is not valid UTF-8"))?;
        let xpriv = self.derive_priv(path)?;

        let digest = Message::from_digest(signed_msg_hash(text).to_byte_array());
        let signature = self.secp.sign_ecdsa_recoverable(&digest, &xpriv.private_key);

        info!(path = %path, len = message.len(), "Signed message with debug device");
        Ok(MessageSignature::new(signature, true).serialize().to_vec())
    }
}
