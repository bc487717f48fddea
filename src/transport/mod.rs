//! Command transport to the motor controller.
//!
//! - `CommandSink`: one byte out per command, no acknowledgment.
//! - `SerialSink`: real serial port via `serialport`.
//! - `MemorySink`: records commands in memory (tests and `stub://` ports).

mod memory;
mod serial;

use anyhow::Result;

use crate::config::SerialSettings;
use crate::policy::Command;

pub use memory::{CommandLog, MemorySink};
pub use serial::SerialSink;

/// Destination for motor commands.
pub trait CommandSink {
    /// Sink identifier for logs.
    fn name(&self) -> &str;

    /// Write one command. Fire-and-forget: returns once the byte is handed to the driver.
    fn send(&mut self, command: Command) -> Result<()>;
}

/// Open the sink described by the serial settings.
///
/// `stub://` ports get a `MemorySink`; anything else is opened as a serial device
/// and fails when the port cannot be opened.
pub fn open_sink(settings: &SerialSettings) -> Result<Box<dyn CommandSink>> {
    if settings.port.starts_with("stub://") {
        log::info!(
            "serial: {} is a stub port, commands are only logged",
            settings.port
        );
        let (sink, _log) = MemorySink::new(&settings.port);
        return Ok(Box::new(sink));
    }
    Ok(Box::new(SerialSink::connect(settings)?))
}
