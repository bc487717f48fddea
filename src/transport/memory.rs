use std::sync::{Arc, Mutex};

use anyhow::{anyhow, Result};

use super::CommandSink;
use crate::policy::Command;

/// Shared record of everything a `MemorySink` was asked to send.
#[derive(Clone, Debug, Default)]
pub struct CommandLog {
    commands: Arc<Mutex<Vec<Command>>>,
}

impl CommandLog {
    pub fn commands(&self) -> Vec<Command> {
        self.commands
            .lock()
            .map(|guard| guard.clone())
            .unwrap_or_default()
    }

    /// Commands as they would appear on the wire.
    pub fn bytes(&self) -> Vec<u8> {
        self.commands().into_iter().map(Command::as_byte).collect()
    }

    pub fn len(&self) -> usize {
        self.commands.lock().map(|guard| guard.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn last(&self) -> Option<Command> {
        self.commands
            .lock()
            .ok()
            .and_then(|guard| guard.last().copied())
    }
}

/// In-memory command sink.
pub struct MemorySink {
    name: String,
    log: CommandLog,
}

impl MemorySink {
    /// Create a sink and the log handle that observes it.
    pub fn new(name: &str) -> (Self, CommandLog) {
        let log = CommandLog::default();
        (
            Self {
                name: name.to_string(),
                log: log.clone(),
            },
            log,
        )
    }
}

impl CommandSink for MemorySink {
    fn name(&self) -> &str {
        &self.name
    }

    fn send(&mut self, command: Command) -> Result<()> {
        log::debug!("{}: {} ({})", self.name, command, command.as_byte() as char);
        self.log
            .commands
            .lock()
            .map_err(|_| anyhow!("command log lock poisoned"))?
            .push(command);
        Ok(())
    }
}
