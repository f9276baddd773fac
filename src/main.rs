use clap::{Parser, Subcommand};
use serial_comm::config::{Config, ConfigLoader};
use serial_comm::{logging, AppError, AppResult, PortConfig, PortHandle, Registry};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::debug;

// Command-line arguments
#[derive(Parser, Debug)]
#[command(
    name = "serial-comm",
    version,
    about = "List, read from, and write to serial ports.",
    long_about = "A small front end to the serial_comm engine. Port names may be system names (COM3, ttyUSB0), device paths, or aliases from the configuration file."
)]
struct Args {
    /// Configuration file to use instead of the standard locations.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Log level when RUST_LOG is unset (trace, debug, info, warn, error).
    #[arg(long, global = true)]
    log_level: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// List the serial ports currently present.
    List {
        /// Print JSON instead of one line per port.
        #[arg(long)]
        json: bool,
    },
    /// Open a port and perform a few timed reads.
    Read {
        port: String,
        /// Number of reads to perform.
        #[arg(long, default_value_t = 3)]
        iterations: u32,
        /// Read timeout in milliseconds; 0 blocks until data arrives.
        #[arg(long, default_value_t = 50)]
        timeout: u32,
        /// Bytes requested per read.
        #[arg(long, default_value_t = 2048)]
        buffer: usize,
        #[arg(long)]
        baud: Option<u32>,
    },
    /// Open a port and write a string to it.
    Write {
        port: String,
        data: String,
        /// Write timeout in milliseconds; 0 blocks until everything is written.
        #[arg(long, default_value_t = 0)]
        timeout: u32,
        #[arg(long)]
        baud: Option<u32>,
    },
}

fn load_config(path: Option<&PathBuf>) -> AppResult<Config> {
    let loader = match path {
        Some(path) => ConfigLoader::load_from(path)?,
        None => ConfigLoader::load()?,
    };
    Ok(loader.into_config())
}

/// Resolve `name`, configure, and open it, printing the open result.
fn open_port(
    registry: &Registry,
    config: &Config,
    name: &str,
    port_config: PortConfig,
) -> AppResult<PortHandle> {
    let handle = registry.handle_for(&config.serial.resolve_port(name));
    handle.configure(port_config)?;

    let result = handle.try_open();
    println!("Opening {}: {}", handle.descriptive_name(), result.is_ok());
    result.map_err(|source| AppError::OpenFailed {
        port: handle.system_name().to_string(),
        source,
    })?;
    Ok(handle)
}

fn list(registry: &Registry, json: bool) -> AppResult<()> {
    let ports = registry.descriptors();
    if json {
        println!("{}", serde_json::to_string_pretty(&ports)?);
    } else {
        for port in &ports {
            println!("{port}");
        }
    }
    Ok(())
}

fn read(
    registry: &Registry,
    config: &Config,
    name: &str,
    iterations: u32,
    timeout: u32,
    buffer_len: usize,
    baud: Option<u32>,
) -> AppResult<()> {
    let base = config.serial.port_config()?;
    let port_config = base
        .with_baud_rate(baud.unwrap_or(base.baud_rate))
        .with_timeouts(timeout, base.write_timeout_ms);
    let handle = open_port(registry, config, name, port_config)?;

    let mut buffer = vec![0u8; buffer_len];
    for i in 0..iterations {
        println!("Reading #{i}");
        let n = handle.read_bytes(&mut buffer, buffer_len)?;
        println!("Read {n} bytes.");
        debug!(data = %String::from_utf8_lossy(&buffer[..n]), "received");
    }
    handle.close();
    Ok(())
}

fn write(
    registry: &Registry,
    config: &Config,
    name: &str,
    data: &str,
    timeout: u32,
    baud: Option<u32>,
) -> AppResult<()> {
    let base = config.serial.port_config()?;
    let port_config = base
        .with_baud_rate(baud.unwrap_or(base.baud_rate))
        .with_timeouts(base.read_timeout_ms, timeout);
    let handle = open_port(registry, config, name, port_config)?;

    let bytes = data.as_bytes();
    let n = handle.write_bytes(bytes, bytes.len())?;
    println!("Wrote {n} of {} bytes.", bytes.len());
    handle.close();
    Ok(())
}

fn run(args: Args) -> AppResult<()> {
    let config = load_config(args.config.as_ref())?;
    if let Err(err) = logging::init(&config.logging, args.log_level.as_deref()) {
        eprintln!("Logging unavailable: {err}");
    }
    let registry = Registry::system();

    match args.command {
        Command::List { json } => list(&registry, json),
        Command::Read {
            port,
            iterations,
            timeout,
            buffer,
            baud,
        } => read(&registry, &config, &port, iterations, timeout, buffer, baud),
        Command::Write {
            port,
            data,
            timeout,
            baud,
        } => write(&registry, &config, &port, &data, timeout, baud),
    }
}

fn main() -> ExitCode {
    match run(Args::parse()) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("Error: {err}");
            ExitCode::FAILURE
        }
    }
}
