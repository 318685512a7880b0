//! Device command handlers
//!
//! Each operation is stateless: it enumerates, selects and resolves from
//! scratch so a device plugged or unplugged between calls is always seen.

use base64::Engine;
use keybridge_core::{resolve, DerivationPath, DeviceSummary, InfoMap, PathError};
use keybridge_device::{select_one, DeviceHandle, Enumerate, Enumerator, SelectionError};
use serde_json::Value;
use thiserror::Error;
use tracing::{debug, info, warn};

/// JSON-RPC style error codes
pub mod codes {
    pub const MISC_ERROR: i32 = -1;
    pub const INVALID_PARAMETER: i32 = -8;
    pub const METHOD_NOT_FOUND: i32 = -32601;
    pub const INTERNAL_ERROR: i32 = -32603;
}

#[derive(Error, Debug)]
pub enum DispatchError {
    #[error("No device found.")]
    NoDeviceFound,
    #[error("Multiple devices found ({count}).")]
    AmbiguousDevice { count: usize },
    #[error("Bad path: {0}.")]
    MalformedPath(#[from] PathError),
    #[error("Missing argument: {0}")]
    MissingArgument(&'static str),
    #[error("{command} takes at most {max} arguments, got {given}")]
    TooManyArguments {
        command: &'static str,
        max: usize,
        given: usize,
    },
    #[error("{operation} failed: {message}")]
    DeviceCapabilityFailure {
        operation: &'static str,
        message: String,
    },
}

impl From<SelectionError> for DispatchError {
    fn from(e: SelectionError) -> Self {
        match e {
            SelectionError::NoneFound => Self::NoDeviceFound,
            SelectionError::Ambiguous { count } => Self::AmbiguousDevice { count },
        }
    }
}

impl DispatchError {
    /// Numeric error code reported to RPC clients
    pub fn code(&self) -> i32 {
        match self {
            Self::MissingArgument(_) => codes::INVALID_PARAMETER,
            Self::TooManyArguments { .. } => codes::MISC_ERROR,
            Self::NoDeviceFound
            | Self::AmbiguousDevice { .. }
            | Self::MalformedPath(_)
            | Self::DeviceCapabilityFailure { .. } => codes::INTERNAL_ERROR,
        }
    }
}

/// Dispatches device commands to whichever single device is attached
pub struct Dispatcher<E = Enumerator> {
    enumerator: E,
}

impl<E: Enumerate> Dispatcher<E> {
    pub fn new(enumerator: E) -> Self {
        Self { enumerator }
    }

    pub fn enumerator(&self) -> &E {
        &self.enumerator
    }

    fn select_device(&self) -> Result<DeviceHandle, DispatchError> {
        let device = select_one(self.enumerator.enumerate()).map_err(|e| {
            warn!(error = %e, "Device selection failed");
            DispatchError::from(e)
        })?;
        debug!(device = %device.device_type(), "Selected device");
        Ok(device)
    }

    /// List every attached device with its firmware version
    ///
    /// Never fails; a device that cannot report its firmware carries an error instead.
    pub fn list_devices(&self) -> Vec<DeviceSummary> {
        let summaries: Vec<DeviceSummary> = self
            .enumerator
            .enumerate()
            .iter_mut()
            .map(|device| DeviceSummary::query(&mut **device))
            .collect();
        info!(count = summaries.len(), "Listed devices");
        summaries
    }

    /// Structured info from the selected device
    ///
    /// A device-side failure does not fail the call: it is reported in an
    /// `error` field next to whatever info was gathered.
    pub fn get_device_info(&self) -> Result<InfoMap, DispatchError> {
        let mut device = self.select_device()?;

        let (mut info, status) = device.info();
        if let Err(e) = status {
            warn!(error = %e, "Device info query reported an error");
            info.insert("error".to_string(), Value::from(e.to_string()));
        }
        Ok(info)
    }

    /// Extended public key at `path`, or at `m/0` when no path is given
    pub fn get_device_xpub(&self, path: Option<&str>) -> Result<String, DispatchError> {
        let mut device = self.select_device()?;

        let path = match path {
            Some(text) => resolve(text)?,
            None => DerivationPath::default_root(),
        };

        let xpub = device
            .derive_xpub(&path)
            .map_err(|e| DispatchError::DeviceCapabilityFailure {
                operation: "GetXPub",
                message: e.to_string(),
            })?;

        info!(path = %path, "Retrieved extended public key");
        Ok(xpub.to_string())
    }

    /// Sign `message` with the key at `path`, returning a base64 signature
    pub fn sign_message(
        &self,
        path: Option<&str>,
        message: Option<&str>,
    ) -> Result<String, DispatchError> {
        let path = path.ok_or(DispatchError::MissingArgument("path"))?;
        let message = message.ok_or(DispatchError::MissingArgument("message"))?;

        let mut device = self.select_device()?;
        let path = resolve(path)?;

        let signature = device
            .sign_message(&path, message.as_bytes())
            .map_err(|e| DispatchError::DeviceCapabilityFailure {
                operation: "SignMessage",
                message: e.to_string(),
            })?;

        info!(path = %path, "Signed message");
        Ok(base64::engine::general_purpose::STANDARD.encode(signature))
    }
}
