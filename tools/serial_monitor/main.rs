// tools/serial_monitor/main.rs
//
// Serial monitor: list ports, or open one and dump received bytes as hex.
//
//   serial_monitor list
//   serial_monitor monitor /dev/ttyACM0 --baud 57600 --send f079f7 --duration 5

use std::error::Error;
use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use clap::{Parser, Subcommand};
use firmata_serial::{
    list_serial_ports, logging, settings, tlog, DataBits, Parity, SerialConfig, SerialTransport,
    StopBits,
};

#[derive(Parser)]
#[command(name = "serial_monitor", about = "Serial port monitor for Firmata devices")]
struct Cli {
    /// Also write the log to a timestamped file in this directory
    #[arg(long, global = true)]
    log_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// List available serial ports
    List,

    /// Open a port and print received bytes as hex
    Monitor {
        /// Port name, e.g. /dev/ttyACM0 or COM3
        port: Option<String>,

        /// Settings file with a [serial] table; flags below are ignored when given
        #[arg(long)]
        config: Option<PathBuf>,

        #[arg(short, long, default_value_t = 9600)]
        baud: u32,

        /// none, odd, even, mark or space
        #[arg(long, default_value = "none")]
        parity: Parity,

        #[arg(long, default_value_t = 8)]
        data_bits: u8,

        /// 1, 1.5 or 2
        #[arg(long, default_value = "1")]
        stop_bits: StopBits,

        /// Hex payload to send once the port is open
        #[arg(long)]
        send: Option<String>,

        /// Stop after this many seconds (runs until killed otherwise)
        #[arg(long)]
        duration: Option<u64>,
    },
}

fn main() -> Result<(), Box<dyn Error>> {
    let cli = Cli::parse();

    if let Some(dir) = &cli.log_dir {
        logging::init_file_logging(dir)?;
    }

    let result = match cli.command {
        Command::List => list(),
        Command::Monitor {
            port,
            config,
            baud,
            parity,
            data_bits,
            stop_bits,
            send,
            duration,
        } => {
            let config = match config {
                Some(path) => settings::load_config(&path)?,
                None => SerialConfig {
                    port: port.ok_or("a port name or --config is required")?,
                    baud_rate: baud,
                    parity,
                    data_bits: DataBits::try_from(data_bits)?,
                    stop_bits,
                },
            };
            monitor(config, send, duration.map(Duration::from_secs))
        }
    };

    logging::stop_file_logging();
    result
}

fn list() -> Result<(), Box<dyn Error>> {
    let ports = list_serial_ports()?;
    if ports.is_empty() {
        println!("No serial ports found");
    }
    for p in ports {
        println!("{}", p.describe());
    }
    Ok(())
}

fn monitor(config: SerialConfig, send: Option<String>, duration: Option<Duration>) -> Result<(), Box<dyn Error>> {
    let payload = send.map(|s| hex::decode(s.trim())).transpose()?;

    let transport = SerialTransport::native(config);
    transport.add_listener(Arc::new(|t: &SerialTransport| {
        let mut bytes = Vec::new();
        while let Some(byte) = t.read_byte() {
            bytes.push(byte);
        }
        if !bytes.is_empty() {
            let mut out = std::io::stdout().lock();
            let _ = writeln!(out, "{}", hex::encode(&bytes));
        }
    }));

    transport.start()?;
    tlog!(
        "[serial_monitor] Monitoring {} at {} baud ({})",
        transport.port_name(),
        transport.config().baud_rate,
        transport.config().line_settings()
    );

    if let Some(payload) = payload {
        transport.write(&payload)?;
        tlog!("[serial_monitor] Sent {} bytes: {}", payload.len(), hex::encode(&payload));
    }

    match duration {
        Some(duration) => std::thread::sleep(duration),
        None => loop {
            std::thread::sleep(Duration::from_secs(60));
        },
    }

    transport.stop()?;
    Ok(())
}
