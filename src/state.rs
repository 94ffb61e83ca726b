//! Per-vehicle mutable state
//!
//! Each record pairs the static fleet data with the values commands and
//! simulation controls change. Every changed field is stamped with the
//! instant of the change.

use crate::command::CommandKind;
use crate::error::{Result, SimError};
use crate::format::timestamp;
use crate::vehicle::{
    EngineType, EvData, FleetEntry, LevelReading, RemoteStartStatus, TimedValue, Vehicle,
    VehicleInfo,
};
use chrono::{DateTime, Utc};
use serde::Serialize;

pub const VEHICLE_ID_LEN: usize = 32;

const DIRECTIONS: [&str; 8] = [
    "North",
    "NorthEast",
    "East",
    "SouthEast",
    "South",
    "SouthWest",
    "West",
    "NorthWest",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LockState {
    Locked,
    Unlocked,
    Error,
}

impl LockState {
    pub fn as_str(self) -> &'static str {
        match self {
            LockState::Locked => "LOCKED",
            LockState::Unlocked => "UNLOCKED",
            LockState::Error => "ERROR",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AlarmState {
    Disabled,
    Enabled,
    Triggered,
    Error,
}

impl AlarmState {
    pub fn as_str(self) -> &'static str {
        match self {
            AlarmState::Disabled => "NOTSET",
            AlarmState::Enabled => "SET",
            AlarmState::Triggered => "ACTIVE",
            AlarmState::Error => "ERROR",
        }
    }
}

/// Values not present in the static vehicle data
#[derive(Debug, Clone, PartialEq)]
pub struct VehicleExtraState {
    pub doors: LockState,
    pub doors_at: DateTime<Utc>,
    pub alarm: AlarmState,
    pub alarm_at: DateTime<Utc>,
    pub last_started: Option<DateTime<Utc>>,
    pub last_stopped: Option<DateTime<Utc>>,
    pub last_wake: Option<DateTime<Utc>>,
    pub last_start_charge: Option<DateTime<Utc>>,
    pub last_stop_charge: Option<DateTime<Utc>>,
}

impl VehicleExtraState {
    pub fn new(now: DateTime<Utc>) -> Self {
        Self {
            doors: LockState::Locked,
            doors_at: now,
            alarm: AlarmState::Disabled,
            alarm_at: now,
            last_started: None,
            last_stopped: None,
            last_wake: None,
            last_start_charge: None,
            last_stop_charge: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StatusValue {
    pub value: &'static str,
    pub timestamp: String,
}

/// `vehicleStatus` block of a status-refresh poll
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusSnapshot {
    pub lock_status: StatusValue,
    pub alarm: StatusValue,
}

/// List entry merged with detail data, as the single-vehicle route returns it
#[derive(Debug, Serialize)]
pub struct VehicleView<'a> {
    #[serde(flatten)]
    pub vehicle: &'a Vehicle,
    #[serde(flatten)]
    pub info: Option<&'a VehicleInfo>,
}

#[derive(Debug, Clone)]
pub struct VehicleRecord {
    pub vehicle: Vehicle,
    pub info: Option<VehicleInfo>,
    pub ev_data: Option<EvData>,
    pub extra: VehicleExtraState,
}

impl VehicleRecord {
    pub fn new(entry: FleetEntry, now: DateTime<Utc>) -> Self {
        Self {
            vehicle: entry.vehicle,
            info: entry.info,
            ev_data: entry.ev_data,
            extra: VehicleExtraState::new(now),
        }
    }

    pub fn vehicle_id(&self) -> &str {
        &self.vehicle.vehicle_id
    }

    pub fn engine_type(&self) -> Option<EngineType> {
        self.info.as_ref().map(|i| i.engine_type)
    }

    pub fn is_ev(&self) -> bool {
        self.engine_type() == Some(EngineType::Ev)
    }

    /// Vehicle known to run on something other than a battery
    ///
    /// A vehicle without detail data is not known to be non-EV.
    pub fn is_known_non_ev(&self) -> bool {
        matches!(self.engine_type(), Some(t) if t != EngineType::Ev)
    }

    pub fn view(&self) -> VehicleView<'_> {
        VehicleView {
            vehicle: &self.vehicle,
            info: self.info.as_ref(),
        }
    }

    pub fn status_snapshot(&self) -> StatusSnapshot {
        StatusSnapshot {
            lock_status: StatusValue {
                value: self.extra.doors.as_str(),
                timestamp: timestamp(self.extra.doors_at),
            },
            alarm: StatusValue {
                value: self.extra.alarm.as_str(),
                timestamp: timestamp(self.extra.alarm_at),
            },
        }
    }

    fn info_mut(&mut self) -> Result<&mut VehicleInfo> {
        let vehicle_id = self.vehicle.vehicle_id.clone();
        self.info
            .as_mut()
            .ok_or(SimError::VehicleNotAcceptable { vehicle_id })
    }

    /// Side effects of a newly accepted command
    pub fn apply_command(&mut self, kind: CommandKind, now: DateTime<Utc>) {
        let stamp = timestamp(now);
        match kind {
            CommandKind::Unlock => self.set_locks(LockState::Unlocked, now),
            CommandKind::Lock => self.set_locks(LockState::Locked, now),
            CommandKind::StartEngine => {
                self.extra.last_started = Some(now);
                if let Some(info) = self.info.as_mut() {
                    info.vehicle_status.remote_start_status = RemoteStartStatus {
                        status: "ENGINE_RUNNING".to_string(),
                        duration: 0,
                        time_stamp: stamp.clone(),
                    };
                    info.vehicle_status.ignition_status = TimedValue {
                        value: "ON".to_string(),
                        time_stamp: stamp,
                    };
                }
            }
            CommandKind::StopEngine => {
                self.extra.last_stopped = Some(now);
                if let Some(info) = self.info.as_mut() {
                    info.vehicle_status.remote_start_status = RemoteStartStatus {
                        status: "ENGINE_STOPPED".to_string(),
                        duration: 0,
                        time_stamp: stamp.clone(),
                    };
                    info.vehicle_status.ignition_status = TimedValue {
                        value: "OFF".to_string(),
                        time_stamp: stamp,
                    };
                }
            }
            CommandKind::Wake => self.extra.last_wake = Some(now),
            CommandKind::StartCharge => self.extra.last_start_charge = Some(now),
            CommandKind::StopCharge => self.extra.last_stop_charge = Some(now),
            CommandKind::Status | CommandKind::Location => {}
        }
    }

    pub fn set_locks(&mut self, state: LockState, now: DateTime<Utc>) {
        self.extra.doors = state;
        self.extra.doors_at = now;
    }

    pub fn set_alarm(&mut self, state: AlarmState, now: DateTime<Utc>) {
        self.extra.alarm = state;
        self.extra.alarm_at = now;
    }

    pub fn set_modem_enabled(&mut self, enabled: bool) {
        self.vehicle.modem_enabled = enabled;
    }

    pub fn set_tire_pressure_warning(&mut self, warning: bool) -> Result<()> {
        self.info_mut()?.vehicle_status.tire_pressure_warning = warning;
        Ok(())
    }

    pub fn set_deep_sleep(&mut self, sleep: bool) -> Result<()> {
        self.info_mut()?.vehicle_status.deep_sleep_in_progress = sleep;
        Ok(())
    }

    pub fn set_firmware_upgrade(&mut self, upgrade: bool) -> Result<()> {
        self.info_mut()?.vehicle_status.firmware_upgrade_in_progress = upgrade;
        Ok(())
    }

    pub fn set_plug_connected(&mut self, connected: bool, now: DateTime<Utc>) -> Result<()> {
        if !self.is_ev() {
            return Err(SimError::NotAnEv {
                vehicle_id: self.vehicle.vehicle_id.clone(),
            });
        }
        self.info_mut()?.vehicle_status.plug_status = Some(TimedValue {
            value: connected,
            time_stamp: timestamp(now),
        });
        Ok(())
    }

    pub fn set_battery(&mut self, level: f64, distance: Option<f64>, now: DateTime<Utc>) -> Result<()> {
        check_level(level)?;
        check_distance(distance)?;
        let details = &mut self.info_mut()?.vehicle_details;
        let previous = details
            .battery_charge_level
            .as_ref()
            .map(|r| r.distance_to_empty)
            .unwrap_or_default();
        details.battery_charge_level = Some(LevelReading {
            value: level,
            distance_to_empty: distance.unwrap_or(previous),
            timestamp: timestamp(now),
        });
        Ok(())
    }

    pub fn set_fuel(&mut self, level: f64, distance: Option<f64>, now: DateTime<Utc>) -> Result<()> {
        check_level(level)?;
        check_distance(distance)?;
        let reading = &mut self.info_mut()?.vehicle_details.fuel_level;
        reading.value = level;
        if let Some(d) = distance {
            reading.distance_to_empty = d;
        }
        reading.timestamp = timestamp(now);
        Ok(())
    }

    /// Open or close every door entry named `door`, narrowed by `role`
    ///
    /// Returns how many entries changed.
    pub fn set_door(
        &mut self,
        door: &str,
        role: Option<&str>,
        state: &str,
        now: DateTime<Utc>,
    ) -> Result<usize> {
        let stamp = timestamp(now);
        let mut changed = 0;
        for entry in self.info_mut()?.vehicle_status.door_status.iter_mut() {
            if entry.vehicle_door != door
                || role.is_some_and(|r| entry.vehicle_occupant_role != r)
            {
                continue;
            }
            entry.value = state.to_string();
            entry.time_stamp = stamp.clone();
            changed += 1;
        }
        if changed == 0 {
            return Err(SimError::bad_parameter(
                "door",
                "parameter 'door' does not match a door on this vehicle.",
            ));
        }
        Ok(changed)
    }

    pub fn set_location(
        &mut self,
        latitude: f64,
        longitude: f64,
        speed: Option<f64>,
        direction: Option<&str>,
        now: DateTime<Utc>,
    ) -> Result<()> {
        if !(-90.0..=90.0).contains(&latitude) {
            return Err(SimError::bad_parameter(
                "lat",
                "parameter 'lat' must be a number between -90 and 90.",
            ));
        }
        if !(-180.0..=180.0).contains(&longitude) {
            return Err(SimError::bad_parameter(
                "long",
                "parameter 'long' must be a number between -180 and 180.",
            ));
        }
        if speed.is_some_and(|s| s.is_nan() || s < 0.0) {
            return Err(SimError::bad_parameter(
                "speed",
                "parameter 'speed' must be a number greater than or equal to 0.",
            ));
        }
        let direction = direction.map(canonical_direction).transpose()?;

        let location = &mut self.info_mut()?.vehicle_location;
        location.latitude = format!("{:.6}", latitude);
        location.longitude = format!("{:.6}", longitude);
        if let Some(speed) = speed {
            location.speed = speed;
        }
        if let Some(direction) = direction {
            location.direction = direction.to_string();
        }
        location.time_stamp = timestamp(now);
        Ok(())
    }
}

fn check_level(level: f64) -> Result<()> {
    if (0.0..=100.0).contains(&level) {
        Ok(())
    } else {
        Err(SimError::bad_parameter(
            "level",
            "parameter 'level' must be a number between 0 and 100.",
        ))
    }
}

fn check_distance(distance: Option<f64>) -> Result<()> {
    if distance.is_some_and(|d| d.is_nan() || d < 0.0) {
        return Err(SimError::bad_parameter(
            "distance",
            "parameter 'distance' must be a number greater than or equal to 0.",
        ));
    }
    Ok(())
}

/// Compass direction with the casing the API reports
fn canonical_direction(raw: &str) -> Result<&'static str> {
    DIRECTIONS
        .iter()
        .find(|d| d.eq_ignore_ascii_case(raw.trim()))
        .copied()
        .ok_or_else(|| {
            SimError::bad_parameter(
                "direction",
                format!("parameter 'direction' must be ({}).", DIRECTIONS.join(", ")),
            )
        })
}

/// All simulated vehicles, addressable by id
#[derive(Debug, Clone)]
pub struct VehicleStateStore {
    records: Vec<VehicleRecord>,
}

impl VehicleStateStore {
    pub fn new(fleet: Vec<FleetEntry>, now: DateTime<Utc>) -> Self {
        Self {
            records: fleet
                .into_iter()
                .map(|entry| VehicleRecord::new(entry, now))
                .collect(),
        }
    }

    pub fn vehicles(&self) -> Vec<&Vehicle> {
        self.records.iter().map(|r| &r.vehicle).collect()
    }

    fn position(&self, vehicle_id: &str) -> Result<usize> {
        if vehicle_id.chars().count() != VEHICLE_ID_LEN {
            return Err(SimError::BadVehicleIdLength {
                vehicle_id: vehicle_id.to_string(),
            });
        }
        let index = self
            .records
            .iter()
            .position(|r| r.vehicle.vehicle_id.eq_ignore_ascii_case(vehicle_id))
            .ok_or_else(|| SimError::vehicle_not_found(vehicle_id))?;
        if !self.records[index].vehicle.is_authorized() {
            return Err(SimError::VehicleUnauthorized {
                vehicle_id: vehicle_id.to_string(),
            });
        }
        Ok(index)
    }

    /// Authorized vehicle with this id
    pub fn resolve(&self, vehicle_id: &str) -> Result<&VehicleRecord> {
        let index = self.position(vehicle_id)?;
        Ok(&self.records[index])
    }

    pub fn resolve_mut(&mut self, vehicle_id: &str) -> Result<&mut VehicleRecord> {
        let index = self.position(vehicle_id)?;
        Ok(&mut self.records[index])
    }
}
