//! Vehicle data model and the built-in mock fleet
//!
//! Field names follow the JSON the vehicle API emits, hence the camelCase
//! renames. [`default_fleet`] builds three vehicles: an authorized ICE car, an
//! unauthorized incompatible ICE van with no detail data, and an authorized
//! EV with a charge-schedule catalog and departure preferences.

use crate::departure::{DayOfWeek, DepartureTimePreference, PreConditioning, TimeOfDay};
use crate::schedule::{ChargeScheduleDay, ChargeScheduleEntry, ChargeWindow, Position};
use serde::{Deserialize, Serialize};

pub const ICE1_VEHICLE_ID: &str = "12341234123412341234123412341234";
pub const ICE2_VEHICLE_ID: &str = "52341234123412341234123412341235";
pub const EV1_VEHICLE_ID: &str = "22221111111111151111111111112222";

/// Entry of the vehicle list
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Vehicle {
    pub vehicle_id: String,
    pub make: String,
    pub model_name: String,
    pub model_year: String,
    pub color: String,
    pub nick_name: String,
    pub modem_enabled: bool,
    pub vehicle_authorization_indicator: u8,
    pub service_compatible: bool,
}

impl Vehicle {
    pub fn is_authorized(&self) -> bool {
        self.vehicle_authorization_indicator != 0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EngineType {
    #[serde(rename = "ICE")]
    Ice,
    #[serde(rename = "EV")]
    Ev,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LevelReading {
    pub value: f64,
    pub distance_to_empty: f64,
    pub timestamp: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VehicleDetails {
    pub fuel_level: LevelReading,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub battery_charge_level: Option<LevelReading>,
    pub mileage: f64,
    pub odometer: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoteStartStatus {
    pub status: String,
    pub duration: u32,
    pub time_stamp: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChargingStatus {
    pub value: String,
    pub time_stamp: String,
    pub charge_start_time: String,
    pub charge_end_time: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimedValue<T> {
    pub value: T,
    pub time_stamp: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DoorStatus {
    pub vehicle_door: String,
    pub value: String,
    pub vehicle_occupant_role: String,
    pub time_stamp: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VehicleStatus {
    pub tire_pressure_warning: bool,
    pub deep_sleep_in_progress: bool,
    pub firmware_upgrade_in_progress: bool,
    pub remote_start_status: RemoteStartStatus,
    pub charging_status: ChargingStatus,
    pub ignition_status: TimedValue<String>,
    pub door_status: Vec<DoorStatus>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub plug_status: Option<TimedValue<bool>>,
}

/// Last reported position; coordinates stay decimal strings on the wire
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VehicleLocation {
    pub speed: f64,
    pub direction: String,
    pub time_stamp: String,
    pub longitude: String,
    pub latitude: String,
}

impl VehicleLocation {
    pub fn position(&self) -> Option<Position> {
        Position::parse(&self.latitude, &self.longitude)
    }
}

/// Detail data merged into the single-vehicle response
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VehicleInfo {
    pub engine_type: EngineType,
    pub last_updated: String,
    pub vehicle_details: VehicleDetails,
    pub vehicle_status: VehicleStatus,
    pub vehicle_location: VehicleLocation,
}

/// EV-only catalogs
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EvData {
    pub charge_schedules: Vec<ChargeScheduleEntry>,
    pub departure_times: Vec<DepartureTimePreference>,
}

/// Static description of one simulated vehicle
#[derive(Debug, Clone)]
pub struct FleetEntry {
    pub vehicle: Vehicle,
    pub info: Option<VehicleInfo>,
    pub ev_data: Option<EvData>,
}

fn door(vehicle_door: &str, role: &str, time_stamp: &str) -> DoorStatus {
    DoorStatus {
        vehicle_door: vehicle_door.to_string(),
        value: "CLOSED".to_string(),
        vehicle_occupant_role: role.to_string(),
        time_stamp: time_stamp.to_string(),
    }
}

fn doors(time_stamp: &str, with_tailgate: bool) -> Vec<DoorStatus> {
    let mut list = vec![
        door("UNSPECIFIED_FRONT", "DRIVER", time_stamp),
        door("UNSPECIFIED_FRONT", "PASSENGER", time_stamp),
        door("REAR_LEFT", "PASSENGER", time_stamp),
        door("REAR_RIGHT", "PASSENGER", time_stamp),
        door("HOOD_DOOR", "NOT_APPLICABLE", time_stamp),
    ];
    if with_tailgate {
        list.push(door("TAILGATE", "NOT_APPLICABLE", time_stamp));
    } else {
        list.push(door("INNER_TAILGATE", "NOT_APPLICABLE", time_stamp));
    }
    list
}

fn window(start: &str, end: &str) -> ChargeWindow {
    ChargeWindow {
        start_time: start.to_string(),
        end_time: end.to_string(),
    }
}

fn schedule_entry(
    name: &str,
    latitude: &str,
    longitude: &str,
    desired_charge_level: u8,
    schedule: Vec<ChargeScheduleDay>,
) -> ChargeScheduleEntry {
    ChargeScheduleEntry {
        name: name.to_string(),
        latitude: latitude.to_string(),
        longitude: longitude.to_string(),
        desired_charge_level,
        schedule,
    }
}

fn departure(day: DayOfWeek, hour: u32, minute: u32, pc: PreConditioning) -> DepartureTimePreference {
    DepartureTimePreference {
        day_of_week: day,
        time: TimeOfDay { hour, minute },
        pre_conditioning_setting: pc,
    }
}

fn ice1() -> FleetEntry {
    let ts = "03-01-2021 16:33:53";
    FleetEntry {
        vehicle: Vehicle {
            vehicle_id: ICE1_VEHICLE_ID.to_string(),
            make: "F".to_string(),
            model_name: "Edge".to_string(),
            model_year: "2020".to_string(),
            color: "OXFORD WHITE SOLID C/C".to_string(),
            nick_name: "ICE test car #1".to_string(),
            modem_enabled: true,
            vehicle_authorization_indicator: 1,
            service_compatible: true,
        },
        info: Some(VehicleInfo {
            engine_type: EngineType::Ice,
            last_updated: ts.to_string(),
            vehicle_details: VehicleDetails {
                fuel_level: LevelReading {
                    value: 72.6,
                    distance_to_empty: 450.5,
                    timestamp: ts.to_string(),
                },
                battery_charge_level: None,
                mileage: 1656.1,
                odometer: 2665.2,
            },
            vehicle_status: VehicleStatus {
                tire_pressure_warning: false,
                deep_sleep_in_progress: false,
                firmware_upgrade_in_progress: false,
                remote_start_status: RemoteStartStatus {
                    status: "ENGINE_STOPPED".to_string(),
                    duration: 0,
                    time_stamp: ts.to_string(),
                },
                charging_status: ChargingStatus {
                    value: "NotReady".to_string(),
                    time_stamp: ts.to_string(),
                    charge_start_time: String::new(),
                    charge_end_time: String::new(),
                },
                ignition_status: TimedValue {
                    value: "OFF".to_string(),
                    time_stamp: ts.to_string(),
                },
                door_status: doors(ts, false),
                plug_status: None,
            },
            vehicle_location: VehicleLocation {
                speed: 0.0,
                direction: "NorthWest".to_string(),
                time_stamp: ts.to_string(),
                longitude: "-83.205202".to_string(),
                latitude: "42.300291".to_string(),
            },
        }),
        ev_data: None,
    }
}

fn ice2() -> FleetEntry {
    FleetEntry {
        vehicle: Vehicle {
            vehicle_id: ICE2_VEHICLE_ID.to_string(),
            make: "F".to_string(),
            model_name: "E-450".to_string(),
            model_year: "2018".to_string(),
            color: "OXFORD WHITE SOLID C/C".to_string(),
            nick_name: "ICE test car #2 (not compatible)".to_string(),
            modem_enabled: false,
            vehicle_authorization_indicator: 0,
            service_compatible: false,
        },
        info: None,
        ev_data: None,
    }
}

fn ev1() -> FleetEntry {
    let ts = "03-02-2021 08:12:40";
    let weekday_nights = ChargeScheduleDay {
        days: "WEEKDAY".to_string(),
        charge_windows: vec![window("00:00", "06:00"), window("22:00", "00:00")],
    };
    let weekend_mornings = ChargeScheduleDay {
        days: "WEEKEND".to_string(),
        charge_windows: vec![window("01:00", "11:00")],
    };

    FleetEntry {
        vehicle: Vehicle {
            vehicle_id: EV1_VEHICLE_ID.to_string(),
            make: "F".to_string(),
            model_name: "Mustang Mach-E".to_string(),
            model_year: "2021".to_string(),
            color: "RAPID RED METALLIC TINTED CLEARCOAT".to_string(),
            nick_name: "EV test car #1".to_string(),
            modem_enabled: true,
            vehicle_authorization_indicator: 1,
            service_compatible: true,
        },
        info: Some(VehicleInfo {
            engine_type: EngineType::Ev,
            last_updated: ts.to_string(),
            vehicle_details: VehicleDetails {
                fuel_level: LevelReading {
                    value: -5.0,
                    distance_to_empty: 0.0,
                    timestamp: ts.to_string(),
                },
                battery_charge_level: Some(LevelReading {
                    value: 81.0,
                    distance_to_empty: 303.0,
                    timestamp: ts.to_string(),
                }),
                mileage: 1234.5,
                odometer: 1986.3,
            },
            vehicle_status: VehicleStatus {
                tire_pressure_warning: false,
                deep_sleep_in_progress: false,
                firmware_upgrade_in_progress: false,
                remote_start_status: RemoteStartStatus {
                    status: "ENGINE_STOPPED".to_string(),
                    duration: 0,
                    time_stamp: ts.to_string(),
                },
                charging_status: ChargingStatus {
                    value: "ChargeTargetReached".to_string(),
                    time_stamp: ts.to_string(),
                    charge_start_time: "03-02-2021 01:00:00".to_string(),
                    charge_end_time: "03-02-2021 05:40:00".to_string(),
                },
                ignition_status: TimedValue {
                    value: "OFF".to_string(),
                    time_stamp: ts.to_string(),
                },
                door_status: doors(ts, true),
                plug_status: Some(TimedValue {
                    value: true,
                    time_stamp: ts.to_string(),
                }),
            },
            vehicle_location: VehicleLocation {
                speed: 0.0,
                direction: "North".to_string(),
                time_stamp: ts.to_string(),
                longitude: "-83.205202".to_string(),
                latitude: "42.300291".to_string(),
            },
        }),
        ev_data: Some(EvData {
            charge_schedules: vec![
                schedule_entry(
                    "Home",
                    "42.300291",
                    "-83.205202",
                    90,
                    vec![weekday_nights.clone(), weekend_mornings],
                ),
                schedule_entry(
                    "Work",
                    "36.105539",
                    "-95.885703",
                    80,
                    vec![ChargeScheduleDay {
                        days: "WEEKDAY".to_string(),
                        charge_windows: vec![window("09:00", "16:00")],
                    }],
                ),
                schedule_entry(
                    "Work visitor garage",
                    "36.107200",
                    "-95.885703",
                    100,
                    vec![ChargeScheduleDay {
                        days: "WEEKDAY".to_string(),
                        charge_windows: vec![window("08:00", "12:00")],
                    }],
                ),
                schedule_entry(
                    "Cabin",
                    "44.765621",
                    "-85.620934",
                    100,
                    vec![weekday_nights],
                ),
            ],
            departure_times: vec![
                departure(DayOfWeek::Monday, 7, 30, PreConditioning::Warm),
                departure(DayOfWeek::Wednesday, 8, 0, PreConditioning::Medium),
                departure(DayOfWeek::Friday, 17, 0, PreConditioning::Cool),
                departure(DayOfWeek::Saturday, 9, 15, PreConditioning::Off),
            ],
        }),
    }
}

/// The fleet every simulator starts with
pub fn default_fleet() -> Vec<FleetEntry> {
    vec![ice1(), ice2(), ev1()]
}
