//! keybridge RPC - Device command dispatch
//!
//! Binds the device commands (`listdevices`, `getdeviceinfo`,
//! `getdevicexpub`, `devicesignmessage`) to a single selected device.

pub mod commands;
pub mod dispatch;

#[cfg(test)]
mod testing;

pub use commands::{register_commands, Command, CommandError, CommandSink, CommandTable, CATEGORY};
pub use dispatch::{codes, DispatchError, Dispatcher};
