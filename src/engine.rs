//! The simulation engine
//!
//! [`Simulator`] owns every registry plus the wall clock and exposes one
//! method per API operation. It is a plain value: the web layer wraps it in a
//! mutex, and tests build as many independent instances as they like.

use crate::clock::Clock;
use crate::command::{Command, CommandKind, CommandRegistry, CommandStatus};
use crate::config::{Config, MAX_TIMEOUT_SECS};
use crate::departure::{DepartureScheduler, NextDeparture, SimulatedClock};
use crate::error::{Result, SimError};
use crate::logging::{StructuredLogger, get_logger};
use crate::schedule::{ChargeSchedule, ScheduleMatcher};
use crate::state::{StatusSnapshot, VehicleRecord, VehicleStateStore};
use crate::token::{ClientPolicy, Token, TokenKind, TokenRegistry, TokenRequest, TokenResponse};
use crate::vehicle::{FleetEntry, Vehicle, VehicleLocation, default_fleet};
use chrono::{DateTime, Duration, Utc};
use serde::Deserialize;
use std::sync::Arc;

/// Which vehicle picture is requested
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageKind {
    Full,
    Thumbnail,
}

impl ImageKind {
    pub fn file_name(self) -> &'static str {
        match self {
            ImageKind::Full => "full-image.png",
            ImageKind::Thumbnail => "thumbnail.png",
        }
    }
}

/// Query string of the image routes
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ImageQuery {
    pub make: Option<String>,
    pub model: Option<String>,
    pub year: Option<String>,
}

/// Result of polling a command
#[derive(Debug, Clone, PartialEq)]
pub struct CommandPoll {
    pub command_id: String,
    pub status: CommandStatus,
}

pub struct Simulator {
    clock: Arc<dyn Clock>,
    tokens: TokenRegistry,
    commands: CommandRegistry,
    vehicles: VehicleStateStore,
    matcher: ScheduleMatcher,
    departures: DepartureScheduler,
    client_policy: ClientPolicy,
    application_id: String,
    require_application_id: bool,
    logger: StructuredLogger,
}

impl Simulator {
    /// Simulator with the built-in fleet
    pub fn new(config: &Config, clock: Arc<dyn Clock>) -> Self {
        Self::with_fleet(config, clock, default_fleet())
    }

    pub fn with_fleet(config: &Config, clock: Arc<dyn Clock>, fleet: Vec<FleetEntry>) -> Self {
        let now = clock.now();
        let sim = &config.simulator;

        let code = config
            .auth
            .code
            .clone()
            .filter(|c| !c.is_empty())
            .unwrap_or_else(|| format!("Code{}", now.timestamp_millis()));
        let mut tokens = TokenRegistry::new(
            code,
            now.checked_add_signed(seconds(sim.code_timeout_secs))
                .unwrap_or(DateTime::<Utc>::MAX_UTC),
            seconds(sim.access_token_timeout_secs),
        );
        if let Some(token) = config.auth.token.as_deref().filter(|t| !t.is_empty()) {
            tokens.issue(TokenKind::Access, Some(token), now);
        }

        Self {
            clock,
            tokens,
            commands: CommandRegistry::new(
                millis(sim.command_pending_ms),
                seconds(sim.command_timeout_secs),
            ),
            vehicles: VehicleStateStore::new(fleet, now),
            matcher: ScheduleMatcher::new(sim.schedule_match),
            departures: DepartureScheduler::default(),
            client_policy: ClientPolicy {
                client_id_prefix: config.auth.client_id_prefix.clone(),
                client_secret_prefix: config.auth.client_secret_prefix.clone(),
            },
            application_id: config.auth.application_id.clone(),
            require_application_id: config.auth.require_application_id,
            logger: get_logger("engine"),
        }
    }

    pub fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    pub fn authorization_code(&self) -> &str {
        self.tokens.code()
    }

    /// Issue an access token outside the OAuth flow
    pub fn issue_access_token(&mut self, key: Option<&str>) -> Token {
        let now = self.now();
        self.tokens.issue(TokenKind::Access, key, now)
    }

    pub fn request_token(&mut self, request: &TokenRequest) -> Result<TokenResponse> {
        let now = self.now();
        let grant = self.tokens.grant(request, &self.client_policy, now)?;
        Ok(grant.to_response())
    }

    /// Application-Id gate that precedes the bearer check
    pub fn check_application_id(&self, header: Option<&str>) -> Result<()> {
        if !self.require_application_id {
            return Ok(());
        }
        match header {
            None => Err(SimError::MissingApplicationId),
            Some(id) if id.starts_with(&self.application_id) => Ok(()),
            Some(_) => Err(SimError::InvalidApplicationId),
        }
    }

    pub fn authenticate(&self, bearer: &str) -> Result<()> {
        self.tokens.authenticate(bearer, self.now())
    }

    pub fn list_vehicles(&self) -> Vec<&Vehicle> {
        self.vehicles.vehicles()
    }

    pub fn vehicle(&self, vehicle_id: &str) -> Result<&VehicleRecord> {
        self.vehicles.resolve(vehicle_id)
    }

    /// Mutable access for simulation controls
    pub fn vehicle_mut(&mut self, vehicle_id: &str) -> Result<&mut VehicleRecord> {
        self.vehicles.resolve_mut(vehicle_id)
    }

    /// Accept a command and apply its side effects to the vehicle
    pub fn create_command(&mut self, vehicle_id: &str, kind: CommandKind) -> Result<Command> {
        let now = self.now();
        let record = self.vehicles.resolve_mut(vehicle_id)?;
        if kind.requires_ev() && record.is_known_non_ev() {
            return Err(SimError::VehicleUnsupportedForCommand {
                vehicle_id: vehicle_id.to_string(),
            });
        }
        record.apply_command(kind, now);
        let canonical_id = record.vehicle_id().to_string();

        let pruned = self.commands.prune(now);
        if pruned > 0 {
            self.logger.debug(&format!("Pruned {} expired commands", pruned));
        }
        let command = self.commands.create(&canonical_id, kind, now);
        self.logger
            .for_vehicle(&canonical_id)
            .info(&format!("Accepted {} command {}", kind, command.command_id));
        Ok(command)
    }

    /// Current status of a command issued through any command route
    pub fn poll_command(&self, vehicle_id: &str, command_id: &str) -> Result<CommandPoll> {
        let now = self.now();
        self.vehicles.resolve(vehicle_id)?;
        let command = self.commands.find(vehicle_id, command_id, now)?;
        let status = self.commands.resolve_status(command, now);
        self.logger.for_vehicle(vehicle_id).trace(&format!(
            "Polled {} command {}: {}",
            command.kind,
            command.command_id,
            status.as_str()
        ));
        Ok(CommandPoll {
            command_id: command.command_id.clone(),
            status,
        })
    }

    /// Poll plus the lock and alarm readings
    pub fn status_refresh(
        &self,
        vehicle_id: &str,
        command_id: &str,
    ) -> Result<(CommandPoll, StatusSnapshot)> {
        let poll = self.poll_command(vehicle_id, command_id)?;
        let snapshot = self.vehicles.resolve(vehicle_id)?.status_snapshot();
        Ok((poll, snapshot))
    }

    pub fn location(&self, vehicle_id: &str) -> Result<VehicleLocation> {
        let record = self.vehicles.resolve(vehicle_id)?;
        record
            .info
            .as_ref()
            .map(|info| info.vehicle_location.clone())
            .ok_or_else(|| SimError::VehicleNotAcceptable {
                vehicle_id: vehicle_id.to_string(),
            })
    }

    /// Charge windows for wherever the vehicle currently is
    pub fn charge_schedules(&self, vehicle_id: &str) -> Result<Vec<ChargeSchedule>> {
        let record = self.vehicles.resolve(vehicle_id)?;
        if !record.is_ev() {
            return Ok(Vec::new());
        }
        let (Some(info), Some(ev)) = (record.info.as_ref(), record.ev_data.as_ref()) else {
            return Ok(Vec::new());
        };
        let Some(position) = info.vehicle_location.position() else {
            self.logger
                .for_vehicle(vehicle_id)
                .warn("Vehicle location is not numeric; no schedule matched");
            return Ok(Vec::new());
        };
        Ok(self.matcher.find_schedule(&position, &ev.charge_schedules))
    }

    pub fn departure_times(&self, vehicle_id: &str) -> Result<NextDeparture> {
        let record = self.vehicles.resolve(vehicle_id)?;
        if record.is_known_non_ev() {
            return Err(SimError::VehicleNotAcceptable {
                vehicle_id: vehicle_id.to_string(),
            });
        }
        let prefs = record
            .ev_data
            .as_ref()
            .map(|ev| ev.departure_times.as_slice())
            .unwrap_or_default();
        Ok(self.departures.next_departure(prefs))
    }

    /// Validate an image request and name the file to serve
    pub fn image(
        &self,
        vehicle_id: &str,
        query: &ImageQuery,
        kind: ImageKind,
    ) -> Result<&'static str> {
        let missing = [
            ("make", &query.make),
            ("model", &query.model),
            ("year", &query.year),
        ]
        .into_iter()
        .find(|(_, v)| v.is_none());
        if let Some((name, _)) = missing {
            return Err(SimError::ImageParameterMissing {
                name: name.to_string(),
            });
        }

        let make = query.make.as_deref().unwrap_or_default().to_lowercase();
        if !matches!(make.as_str(), "f" | "ford" | "l" | "lincoln") {
            return Err(SimError::bad_parameter(
                "make",
                "Invalid make parameter.  Must be one of: \"F\", \"Ford\", \"L\", \"Lincoln\".",
            ));
        }

        let year_ok = query
            .year
            .as_deref()
            .and_then(leading_integer)
            .is_some_and(|y| y >= 2010);
        if !year_ok {
            return Err(SimError::bad_parameter(
                "year",
                "Invalid year parameter.  Must be four digit format (like 2019).",
            ));
        }

        self.vehicles.resolve(vehicle_id)?;
        Ok(kind.file_name())
    }

    pub fn today(&self) -> SimulatedClock {
        self.departures.today()
    }

    /// Move the simulated time of week
    pub fn set_today(&mut self, day: Option<&str>, time: Option<&str>) -> Result<SimulatedClock> {
        let today = SimulatedClock::parse(day, time)?;
        self.departures.set_today(today);
        self.logger.info(&format!(
            "Simulated time set to {} {}",
            today.day_of_week, today.time
        ));
        Ok(today)
    }
}

/// Lifetimes beyond the validated maximum are clamped to it
fn seconds(value: u64) -> Duration {
    Duration::seconds(value.min(MAX_TIMEOUT_SECS) as i64)
}

fn millis(value: u64) -> Duration {
    Duration::milliseconds(value.min(MAX_TIMEOUT_SECS * 1000) as i64)
}

/// Digits at the start of `raw`, ignoring what follows
fn leading_integer(raw: &str) -> Option<i64> {
    let trimmed = raw.trim();
    let end = trimmed
        .char_indices()
        .find(|(i, c)| !(c.is_ascii_digit() || (*i == 0 && (*c == '-' || *c == '+'))))
        .map(|(i, _)| i)
        .unwrap_or(trimmed.len());
    trimmed[..end].parse().ok()
}
