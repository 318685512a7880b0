//! keybridge - Main entry point
//!
//! Runs a single device command against the attached hardware and prints
//! the result as JSON.

mod config;

use anyhow::Result;
use clap::Parser;
use keybridge_rpc::{register_commands, CommandTable, Dispatcher};
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use tracing::{debug, Level};
use tracing_subscriber::FmtSubscriber;

#[derive(Parser, Debug)]
#[command(name = "keybridge")]
#[command(about = "Command bridge to hardware signing devices")]
#[command(version)]
struct Args {
    /// Path to configuration file
    #[arg(short, long, default_value = "keybridge.toml")]
    config: PathBuf,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long, default_value = "warn")]
    log_level: String,

    /// Enable the software debug device regardless of configuration
    #[arg(long)]
    debug_device: bool,

    /// Command to run, or `help` to list commands
    command: String,

    /// Command parameters
    #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
    params: Vec<String>,
}

fn main() -> Result<ExitCode> {
    let args = Args::parse();

    // Initialize logging
    let level = match args.log_level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::WARN,
    };

    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(true)
        .with_writer(std::io::stderr)
        .finish();

    tracing::subscriber::set_global_default(subscriber)?;

    debug!("keybridge v{}", env!("CARGO_PKG_VERSION"));

    // Load configuration
    let mut config = config::load_config(&args.config)?;
    if args.debug_device {
        config.debug_device.enabled = true;
    }

    let dispatcher = Arc::new(Dispatcher::new(config.build_enumerator()?));
    let mut table = CommandTable::new();
    register_commands(&mut table, dispatcher);

    if args.command == "help" {
        print_help(&table, args.params.first().map(String::as_str));
        return Ok(ExitCode::SUCCESS);
    }

    match table.execute(&args.command, &args.params) {
        Ok(result) => {
            println!("{}", serde_json::to_string_pretty(&result)?);
            Ok(ExitCode::SUCCESS)
        }
        Err(e) => {
            let error = serde_json::json!({
                "code": e.code(),
                "message": e.to_string(),
            });
            eprintln!("{}", serde_json::to_string_pretty(&error)?);
            Ok(ExitCode::FAILURE)
        }
    }
}

fn print_help(table: &CommandTable, name: Option<&str>) {
    match name.and_then(|n| table.get(n)) {
        Some(command) => println!("{}\n{}", command.usage, command.help),
        None => {
            let mut category = "";
            for command in table.commands() {
                if command.category != category {
                    category = command.category;
                    println!("== {} ==", category);
                }
                println!("  {:<36} {}", command.usage, command.help);
            }
        }
    }
}
