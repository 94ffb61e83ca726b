//! Charge-schedule lookup by vehicle position
//!
//! A vehicle is "at" a known charging location when both coordinates are
//! within [`NEAR_EPSILON`] degrees of it.

use serde::{Deserialize, Serialize};

/// Roughly 110 m of latitude
pub const NEAR_EPSILON: f64 = 0.001;

/// Which entry wins when several catalog entries are near the vehicle
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MatchPolicy {
    /// The last matching entry in catalog order
    #[default]
    #[serde(rename = "last", alias = "last_match")]
    LastMatch,
    /// The matching entry with the smallest squared distance
    Nearest,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Position {
    pub latitude: f64,
    pub longitude: f64,
}

impl Position {
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
        }
    }

    /// Parse decimal-string coordinates as carried on the wire
    pub fn parse(latitude: &str, longitude: &str) -> Option<Self> {
        let latitude = latitude.trim().parse().ok()?;
        let longitude = longitude.trim().parse().ok()?;
        Some(Self::new(latitude, longitude))
    }

    fn distance_sq(&self, other: &Position) -> f64 {
        let dlat = self.latitude - other.latitude;
        let dlong = self.longitude - other.longitude;
        dlat * dlat + dlong * dlong
    }
}

pub fn near(a: &Position, b: &Position) -> bool {
    (a.latitude - b.latitude).abs() < NEAR_EPSILON && (a.longitude - b.longitude).abs() < NEAR_EPSILON
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChargeWindow {
    pub start_time: String,
    pub end_time: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChargeScheduleDay {
    pub days: String,
    pub charge_windows: Vec<ChargeWindow>,
}

/// A known charging location and its weekly charge windows
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChargeScheduleEntry {
    pub name: String,
    pub latitude: String,
    pub longitude: String,
    pub desired_charge_level: u8,
    pub schedule: Vec<ChargeScheduleDay>,
}

impl ChargeScheduleEntry {
    fn position(&self) -> Option<Position> {
        Position::parse(&self.latitude, &self.longitude)
    }
}

/// One item of the chargeSchedules response
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChargeSchedule {
    pub days: String,
    pub charge_windows: Vec<ChargeWindow>,
    pub desired_charge_level: u8,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct ScheduleMatcher {
    policy: MatchPolicy,
}

impl ScheduleMatcher {
    pub fn new(policy: MatchPolicy) -> Self {
        Self { policy }
    }

    pub fn policy(&self) -> MatchPolicy {
        self.policy
    }

    /// Catalog entry associated with `position`, if any
    pub fn find_entry<'a>(
        &self,
        position: &Position,
        catalog: &'a [ChargeScheduleEntry],
    ) -> Option<&'a ChargeScheduleEntry> {
        let matches = catalog.iter().filter_map(|entry| {
            let at = entry.position()?;
            near(position, &at).then(|| (entry, position.distance_sq(&at)))
        });

        match self.policy {
            MatchPolicy::LastMatch => matches.last().map(|(entry, _)| entry),
            MatchPolicy::Nearest => {
                let mut best: Option<(&ChargeScheduleEntry, f64)> = None;
                for (entry, d) in matches {
                    if best.is_none_or(|(_, min)| d < min) {
                        best = Some((entry, d));
                    }
                }
                best.map(|(entry, _)| entry)
            }
        }
    }

    /// Response items for `position`; empty when no location matches
    pub fn find_schedule(
        &self,
        position: &Position,
        catalog: &[ChargeScheduleEntry],
    ) -> Vec<ChargeSchedule> {
        self.find_entry(position, catalog)
            .map(|entry| {
                entry
                    .schedule
                    .iter()
                    .map(|day| ChargeSchedule {
                        days: day.days.clone(),
                        charge_windows: day.charge_windows.clone(),
                        desired_charge_level: entry.desired_charge_level,
                    })
                    .collect()
            })
            .unwrap_or_default()
    }
}
