//! Remote commands and their simulated processing states
//!
//! A command's status is never stored: it is recomputed from the creation
//! instant every time it is read. Lookup is by `(command_id, vehicle_id)`
//! across every command kind, so a status refresh can be polled through the
//! route of any other command.

use crate::error::{Result, SimError};
use crate::format::guid;
use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use std::collections::HashMap;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CommandKind {
    Unlock,
    Lock,
    StartEngine,
    StopEngine,
    Wake,
    Status,
    Location,
    StartCharge,
    StopCharge,
}

impl CommandKind {
    /// Charging commands only apply to electric vehicles
    pub fn requires_ev(self) -> bool {
        matches!(self, CommandKind::StartCharge | CommandKind::StopCharge)
    }

    /// Path segment of the command's route
    pub fn as_str(self) -> &'static str {
        match self {
            CommandKind::Unlock => "unlock",
            CommandKind::Lock => "lock",
            CommandKind::StartEngine => "startEngine",
            CommandKind::StopEngine => "stopEngine",
            CommandKind::Wake => "wake",
            CommandKind::Status => "status",
            CommandKind::Location => "location",
            CommandKind::StartCharge => "startCharge",
            CommandKind::StopCharge => "stopCharge",
        }
    }
}

impl fmt::Display for CommandKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum CommandStatus {
    PendingResponse,
    Completed,
    Failed,
}

impl CommandStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            CommandStatus::PendingResponse => "PENDINGRESPONSE",
            CommandStatus::Completed => "COMPLETED",
            CommandStatus::Failed => "FAILED",
        }
    }
}

/// Upper bound (exclusive) of a timeline entry
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Threshold {
    /// Applies while less than this many milliseconds have elapsed
    Before(i64),
    /// Applies from here on
    Terminal,
}

#[derive(Debug, Clone)]
pub struct Command {
    pub command_id: String,
    pub vehicle_id: String,
    pub kind: CommandKind,
    pub created_at: DateTime<Utc>,
    pub timeline: Vec<(Threshold, CommandStatus)>,
}

impl Command {
    /// Status at `now`, from the first timeline entry still in force
    pub fn status_at(&self, now: DateTime<Utc>) -> CommandStatus {
        self.timeline
            .iter()
            .find(|(threshold, _)| match threshold {
                Threshold::Terminal => true,
                Threshold::Before(ms) => now < self.created_at + Duration::milliseconds(*ms),
            })
            .map(|(_, status)| *status)
            .unwrap_or(CommandStatus::Completed)
    }
}

#[derive(Debug)]
pub struct CommandRegistry {
    commands: HashMap<(String, String), Command>,
    pending: Duration,
    timeout: Duration,
}

impl CommandRegistry {
    pub fn new(pending: Duration, timeout: Duration) -> Self {
        Self {
            commands: HashMap::new(),
            pending,
            timeout,
        }
    }

    /// Record a new command for `vehicle_id`
    pub fn create(&mut self, vehicle_id: &str, kind: CommandKind, now: DateTime<Utc>) -> Command {
        let command = Command {
            command_id: guid(),
            vehicle_id: vehicle_id.to_lowercase(),
            kind,
            created_at: now,
            timeline: vec![
                (
                    Threshold::Before(self.pending.num_milliseconds()),
                    CommandStatus::PendingResponse,
                ),
                (Threshold::Terminal, CommandStatus::Completed),
            ],
        };
        self.commands.insert(
            (command.command_id.clone(), command.vehicle_id.clone()),
            command.clone(),
        );
        command
    }

    /// Look up a command regardless of kind; expired commands are not found
    pub fn find(&self, vehicle_id: &str, command_id: &str, now: DateTime<Utc>) -> Result<&Command> {
        let key = (command_id.to_lowercase(), vehicle_id.to_lowercase());
        match self.commands.get(&key) {
            Some(command) if now - command.created_at <= self.timeout => Ok(command),
            _ => Err(SimError::command_not_found(command_id)),
        }
    }

    /// Current status of a command
    pub fn resolve_status(&self, command: &Command, now: DateTime<Utc>) -> CommandStatus {
        command.status_at(now)
    }

    /// Drop commands that can no longer be found
    pub fn prune(&mut self, now: DateTime<Utc>) -> usize {
        let before = self.commands.len();
        let timeout = self.timeout;
        self.commands
            .retain(|_, command| now - command.created_at <= timeout);
        before - self.commands.len()
    }

    pub fn len(&self) -> usize {
        self.commands.len()
    }

    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    const VEHICLE: &str = "12341234123412341234123412341234";

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2021, 3, 4, 12, 0, 0).unwrap()
    }

    fn registry() -> CommandRegistry {
        CommandRegistry::new(Duration::milliseconds(4000), Duration::seconds(120))
    }

    #[test]
    fn test_status_timeline() {
        let mut reg = registry();
        let cmd = reg.create(VEHICLE, CommandKind::Unlock, t0());

        assert_eq!(cmd.status_at(t0()), CommandStatus::PendingResponse);
        assert_eq!(
            cmd.status_at(t0() + Duration::milliseconds(3999)),
            CommandStatus::PendingResponse
        );
        assert_eq!(
            cmd.status_at(t0() + Duration::milliseconds(4000)),
            CommandStatus::Completed
        );
    }

    #[test]
    fn test_find_is_case_insensitive_and_cross_kind() {
        let mut reg = registry();
        let cmd = reg.create(&VEHICLE.to_uppercase(), CommandKind::Status, t0());
        assert_eq!(cmd.vehicle_id, VEHICLE);

        let found = reg
            .find(VEHICLE, &cmd.command_id.to_uppercase(), t0())
            .unwrap();
        assert_eq!(found.kind, CommandKind::Status);
    }

    #[test]
    fn test_find_requires_matching_vehicle() {
        let mut reg = registry();
        let cmd = reg.create(VEHICLE, CommandKind::Lock, t0());
        assert!(reg
            .find("22221111111111151111111111112222", &cmd.command_id, t0())
            .is_err());
    }

    #[test]
    fn test_commands_expire() {
        let mut reg = registry();
        let cmd = reg.create(VEHICLE, CommandKind::Wake, t0());

        assert!(reg
            .find(VEHICLE, &cmd.command_id, t0() + Duration::seconds(120))
            .is_ok());
        assert!(matches!(
            reg.find(VEHICLE, &cmd.command_id, t0() + Duration::seconds(121)),
            Err(SimError::CommandNotFoundOrExpired { .. })
        ));

        assert_eq!(reg.prune(t0() + Duration::seconds(121)), 1);
        assert!(reg.is_empty());
    }

    #[test]
    fn test_command_ids_unique() {
        let mut reg = registry();
        let a = reg.create(VEHICLE, CommandKind::StartEngine, t0());
        let b = reg.create(VEHICLE, CommandKind::StartEngine, t0());
        assert_ne!(a.command_id, b.command_id);
        assert_eq!(reg.len(), 2);
    }

    #[test]
    fn test_kind_metadata() {
        assert!(CommandKind::StartCharge.requires_ev());
        assert!(!CommandKind::Lock.requires_ev());
        assert_eq!(CommandKind::StartEngine.to_string(), "startEngine");
        assert_eq!(CommandStatus::PendingResponse.as_str(), "PENDINGRESPONSE");
    }
}
