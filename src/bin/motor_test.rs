//! motor_test - drive the motor controller by hand
//!
//! Sends a sequence of command letters (e.g. `LSRS`) over the serial link,
//! one byte per step, to check wiring and direction before running the
//! follower.

use anyhow::{anyhow, Result};
use clap::Parser;
use std::time::Duration;

use follow_cam::config::SerialSettings;
use follow_cam::{open_sink, Command};

#[derive(Parser, Debug)]
#[command(name = "motor_test", about = "Send manual commands to the motor controller")]
struct Args {
    /// Serial port of the motor controller (or stub://<name>)
    #[arg(long, env = "FOLLOW_SERIAL_PORT", default_value = "/dev/ttyACM0")]
    port: String,

    #[arg(long, default_value_t = 9600)]
    baud: u32,

    /// Wait after opening the port before the first write
    #[arg(long, default_value_t = 2000)]
    settle_ms: u64,

    /// Pause between commands
    #[arg(long, default_value_t = 1000)]
    interval_ms: u64,

    /// Commands to send: L (left), R (right), S (stop)
    #[arg(default_value = "LSRS")]
    sequence: String,
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();
    let commands = parse_sequence(&args.sequence)?;

    let settings = SerialSettings {
        port: args.port.clone(),
        baud_rate: args.baud,
        settle: Duration::from_millis(args.settle_ms),
        write_timeout: None,
    };
    let mut sink = open_sink(&settings)?;

    for (i, command) in commands.iter().enumerate() {
        if i > 0 {
            std::thread::sleep(Duration::from_millis(args.interval_ms));
        }
        sink.send(*command)?;
        log::info!("sent {} ({}) to {}", command, command.as_byte() as char, sink.name());
    }

    if commands.last() != Some(&Command::Stop) {
        std::thread::sleep(Duration::from_millis(args.interval_ms));
        sink.send(Command::Stop)?;
        log::info!("sent final stop to {}", sink.name());
    }
    Ok(())
}

fn parse_sequence(sequence: &str) -> Result<Vec<Command>> {
    let commands = sequence
        .bytes()
        .filter(|b| !b.is_ascii_whitespace() && *b != b',')
        .map(Command::from_byte)
        .collect::<Result<Vec<_>>>()?;
    if commands.is_empty() {
        return Err(anyhow!("command sequence is empty"));
    }
    Ok(commands)
}
