use std::io::Write;
use std::time::Duration;

use anyhow::{Context, Result};
use serialport::SerialPort;

use super::CommandSink;
use crate::config::SerialSettings;
use crate::policy::Command;

/// Stand-in for "no timeout": the driver wants a finite value and converts it
/// to a signed millisecond count.
const BLOCKING_WRITE_TIMEOUT: Duration = Duration::from_millis(i32::MAX as u64);

fn write_timeout(settings: &SerialSettings) -> Duration {
    settings.write_timeout.unwrap_or(BLOCKING_WRITE_TIMEOUT)
}

/// Serial link to the motor controller.
///
/// The port is closed when the sink is dropped.
pub struct SerialSink {
    port: Box<dyn SerialPort>,
    name: String,
}

impl SerialSink {
    /// Open the port and wait for the controller to come out of reset.
    ///
    /// Many boards reset when the port is opened; bytes written before the
    /// settle delay has elapsed are lost.
    pub fn connect(settings: &SerialSettings) -> Result<Self> {
        let port = serialport::new(settings.port.as_str(), settings.baud_rate)
            .timeout(write_timeout(settings))
            .open()
            .with_context(|| {
                format!(
                    "failed to open serial port {} at {} baud",
                    settings.port, settings.baud_rate
                )
            })?;

        log::info!(
            "serial: opened {} at {} baud, settling for {} ms",
            settings.port,
            settings.baud_rate,
            settings.settle.as_millis()
        );
        std::thread::sleep(settings.settle);

        Ok(Self {
            port,
            name: settings.port.clone(),
        })
    }
}

impl CommandSink for SerialSink {
    fn name(&self) -> &str {
        &self.name
    }

    fn send(&mut self, command: Command) -> Result<()> {
        self.port
            .write_all(&[command.as_byte()])
            .with_context(|| format!("failed to write {} to {}", command, self.name))?;
        self.port
            .flush()
            .with_context(|| format!("failed to flush {}", self.name))?;
        Ok(())
    }
}
