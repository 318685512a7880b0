//! Device command registration
//!
//! Commands are bound into whatever server hosts them through [`CommandSink`],
//! so there is no global command table. [`CommandTable`] is the in-process sink
//! used by the CLI.

use keybridge_device::Enumerate;
use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, PoisonError};
use thiserror::Error;
use tracing::{info, warn};

use crate::dispatch::{codes, DispatchError, Dispatcher};

/// Category all device commands are registered under
pub const CATEGORY: &str = "usbdevice";

type Handler = Box<dyn Fn(&[String]) -> Result<Value, DispatchError> + Send + Sync>;

/// A named command bound to a handler
pub struct Command {
    pub category: &'static str,
    pub name: &'static str,
    pub usage: &'static str,
    pub help: &'static str,
    handler: Handler,
}

impl Command {
    pub fn new(
        category: &'static str,
        name: &'static str,
        usage: &'static str,
        help: &'static str,
        handler: impl Fn(&[String]) -> Result<Value, DispatchError> + Send + Sync + 'static,
    ) -> Self {
        Self {
            category,
            name,
            usage,
            help,
            handler: Box::new(handler),
        }
    }

    /// Invoke the handler with textual parameters
    pub fn call(&self, params: &[String]) -> Result<Value, DispatchError> {
        (self.handler)(params)
    }
}

impl std::fmt::Debug for Command {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Command")
            .field("category", &self.category)
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}

/// Anything commands can be registered into
pub trait CommandSink {
    fn register(&mut self, command: Command);
}

fn check_arity(command: &'static str, params: &[String], max: usize) -> Result<(), DispatchError> {
    if params.len() > max {
        return Err(DispatchError::TooManyArguments {
            command,
            max,
            given: params.len(),
        });
    }
    Ok(())
}

/// Register the four device commands into `sink`
pub fn register_commands<E>(sink: &mut impl CommandSink, dispatcher: Arc<Dispatcher<E>>)
where
    E: Enumerate + 'static,
{
    let d = dispatcher.clone();
    sink.register(Command::new(
        CATEGORY,
        "listdevices",
        "listdevices",
        "List available hardware devices.",
        move |params| {
            check_arity("listdevices", params, 0)?;
            Ok(serde_json::to_value(d.list_devices()).unwrap_or_default())
        },
    ));

    let d = dispatcher.clone();
    sink.register(Command::new(
        CATEGORY,
        "getdeviceinfo",
        "getdeviceinfo",
        "Get info from hardware device.",
        move |params| {
            check_arity("getdeviceinfo", params, 0)?;
            Ok(Value::Object(d.get_device_info()?))
        },
    ));

    let d = dispatcher.clone();
    sink.register(Command::new(
        CATEGORY,
        "getdevicexpub",
        "getdevicexpub [path]",
        "Get extended public key from hardware device.",
        move |params| {
            check_arity("getdevicexpub", params, 1)?;
            let path = params.first().map(String::as_str);
            Ok(Value::String(d.get_device_xpub(path)?))
        },
    ));

    let d = dispatcher;
    sink.register(Command::new(
        CATEGORY,
        "devicesignmessage",
        "devicesignmessage path message",
        "Sign message.",
        move |params| {
            check_arity("devicesignmessage", params, 2)?;
            let path = params.first().map(String::as_str);
            let message = params.get(1).map(String::as_str);
            Ok(Value::String(d.sign_message(path, message)?))
        },
    ));
}

#[derive(Error, Debug)]
pub enum CommandError {
    #[error("Method not found: {0}")]
    UnknownCommand(String),
    #[error(transparent)]
    Dispatch(#[from] DispatchError),
}

impl CommandError {
    pub fn code(&self) -> i32 {
        match self {
            Self::UnknownCommand(_) => codes::METHOD_NOT_FOUND,
            Self::Dispatch(e) => e.code(),
        }
    }
}

/// In-process command table
///
/// Executions are serialized: a hardware device cannot service two
/// transactions at once, so only one command runs at a time.
#[derive(Default)]
pub struct CommandTable {
    commands: BTreeMap<&'static str, Command>,
    in_flight: Mutex<()>,
}

impl CommandTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, name: &str) -> Option<&Command> {
        self.commands.get(name)
    }

    /// Registered commands in name order
    pub fn commands(&self) -> impl Iterator<Item = &Command> {
        self.commands.values()
    }

    /// Run a command by name
    pub fn execute(&self, name: &str, params: &[String]) -> Result<Value, CommandError> {
        let command = self
            .get(name)
            .ok_or_else(|| CommandError::UnknownCommand(name.to_string()))?;

        let _guard = self.in_flight.lock().unwrap_or_else(PoisonError::into_inner);
        info!(command = name, params = params.len(), "Executing command");
        Ok(command.call(params)?)
    }
}

impl CommandSink for CommandTable {
    fn register(&mut self, command: Command) {
        if let Some(previous) = self.commands.insert(command.name, command) {
            warn!(command = previous.name, "Replaced previously registered command");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{FakeDevice, FakeEnumerator, VECTOR_XPUB};

    fn table(devices: Vec<FakeDevice>) -> CommandTable {
        let mut table = CommandTable::new();
        let dispatcher = Arc::new(Dispatcher::new(FakeEnumerator::new(devices)));
        register_commands(&mut table, dispatcher);
        table
    }

    fn params(values: &[&str]) -> Vec<String> {
        values.iter().map(|v| v.to_string()).collect()
    }

    #[derive(Default)]
    struct RecordingSink {
        names: Vec<(&'static str, &'static str)>,
    }

    impl CommandSink for RecordingSink {
        fn register(&mut self, command: Command) {
            self.names.push((command.category, command.name));
        }
    }

    #[test]
    fn test_registers_four_commands() {
        let mut sink = RecordingSink::default();
        let dispatcher = Arc::new(Dispatcher::new(FakeEnumerator::default()));
        register_commands(&mut sink, dispatcher);
        assert_eq!(
            sink.names,
            vec![
                (CATEGORY, "listdevices"),
                (CATEGORY, "getdeviceinfo"),
                (CATEGORY, "getdevicexpub"),
                (CATEGORY, "devicesignmessage"),
            ]
        );
    }

    #[test]
    fn test_unknown_command() {
        let err = table(vec![]).execute("getbalance", &[]).unwrap_err();
        assert!(matches!(err, CommandError::UnknownCommand(ref name) if name == "getbalance"));
        assert_eq!(err.code(), codes::METHOD_NOT_FOUND);
    }

    #[test]
    fn test_listdevices_json() {
        let table = table(vec![FakeDevice::default()]);
        let result = table.execute("listdevices", &[]).unwrap();
        assert_eq!(
            result,
            serde_json::json!([{
                "vendor": "Ledger",
                "product": "Nano S",
                "firmwareversion": "1.6.0"
            }])
        );
    }

    #[test]
    fn test_listdevices_empty() {
        let result = table(vec![]).execute("listdevices", &[]).unwrap();
        assert_eq!(result, serde_json::json!([]));
    }

    #[test]
    fn test_getdevicexpub_with_and_without_path() {
        let table = table(vec![FakeDevice::default()]);
        assert_eq!(
            table.execute("getdevicexpub", &[]).unwrap(),
            Value::String(VECTOR_XPUB.to_string())
        );
        assert_eq!(
            table
                .execute("getdevicexpub", &params(&["m/44'/0'/0'"]))
                .unwrap(),
            Value::String(VECTOR_XPUB.to_string())
        );
    }

    #[test]
    fn test_devicesignmessage_requires_both_params() {
        let table = table(vec![FakeDevice::default()]);
        let err = table
            .execute("devicesignmessage", &params(&["m/0"]))
            .unwrap_err();
        assert!(matches!(
            err,
            CommandError::Dispatch(DispatchError::MissingArgument("message"))
        ));
        assert_eq!(err.code(), codes::INVALID_PARAMETER);
    }

    #[test]
    fn test_too_many_params() {
        let table = table(vec![FakeDevice::default()]);
        let err = table
            .execute("getdeviceinfo", &params(&["extra"]))
            .unwrap_err();
        assert_eq!(err.to_string(), "getdeviceinfo takes at most 0 arguments, got 1");

        let err = table
            .execute("devicesignmessage", &params(&["m/0", "a", "b"]))
            .unwrap_err();
        assert_eq!(err.code(), codes::MISC_ERROR);
    }

    #[test]
    fn test_device_errors_keep_codes() {
        let table = table(vec![FakeDevice::default(), FakeDevice::default()]);
        let err = table.execute("getdeviceinfo", &[]).unwrap_err();
        assert_eq!(err.to_string(), "Multiple devices found (2).");
        assert_eq!(err.code(), codes::INTERNAL_ERROR);
    }

    #[test]
    fn test_commands_sorted_by_name() {
        let table = table(vec![]);
        let names: Vec<&str> = table.commands().map(|c| c.name).collect();
        assert_eq!(
            names,
            vec!["devicesignmessage", "getdeviceinfo", "getdevicexpub", "listdevices"]
        );
        assert_eq!(table.get("getdevicexpub").unwrap().usage, "getdevicexpub [path]");
    }
}
