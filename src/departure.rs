//! Next-departure lookup against a simulated time of week
//!
//! The simulated clock only knows a weekday and a time; it never advances on
//! its own. Departures are compared by projecting both onto one reference
//! week and wrapping negative differences into the following week.

use crate::error::{Result, SimError};
use chrono::{Duration, NaiveDate, NaiveDateTime, NaiveTime};
use serde::{Deserialize, Serialize};
use std::fmt;

const DAY_MESSAGE: &str =
    "parameter 'day' must be (MONDAY, TUESDAY, WEDNESDAY, THURSDAY, FRIDAY, SATURDAY, SUNDAY).";
const TIME_MESSAGE: &str = "parameter 'time' must be in 24 hour format (hh:mm).";

const MS_PER_WEEK: i64 = 7 * 24 * 60 * 60 * 1000;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum DayOfWeek {
    Monday,
    Tuesday,
    Wednesday,
    Thursday,
    Friday,
    Saturday,
    Sunday,
}

impl DayOfWeek {
    pub const ALL: [DayOfWeek; 7] = [
        DayOfWeek::Monday,
        DayOfWeek::Tuesday,
        DayOfWeek::Wednesday,
        DayOfWeek::Thursday,
        DayOfWeek::Friday,
        DayOfWeek::Saturday,
        DayOfWeek::Sunday,
    ];

    /// ISO number, Monday = 1 through Sunday = 7
    pub fn number(self) -> u32 {
        match self {
            DayOfWeek::Monday => 1,
            DayOfWeek::Tuesday => 2,
            DayOfWeek::Wednesday => 3,
            DayOfWeek::Thursday => 4,
            DayOfWeek::Friday => 5,
            DayOfWeek::Saturday => 6,
            DayOfWeek::Sunday => 7,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            DayOfWeek::Monday => "MONDAY",
            DayOfWeek::Tuesday => "TUESDAY",
            DayOfWeek::Wednesday => "WEDNESDAY",
            DayOfWeek::Thursday => "THURSDAY",
            DayOfWeek::Friday => "FRIDAY",
            DayOfWeek::Saturday => "SATURDAY",
            DayOfWeek::Sunday => "SUNDAY",
        }
    }

    /// Exact upper-case name only
    pub fn parse(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|d| d.as_str() == name)
    }
}

impl fmt::Display for DayOfWeek {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 24-hour wall time, serialized as `hh:mm`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct TimeOfDay {
    pub hour: u32,
    pub minute: u32,
}

impl TimeOfDay {
    pub fn new(hour: u32, minute: u32) -> Result<Self> {
        if hour > 23 || minute > 59 {
            return Err(SimError::bad_parameter("time", TIME_MESSAGE));
        }
        Ok(Self { hour, minute })
    }

    /// Parse `h:mm` / `hh:mm`
    ///
    /// The hour may carry leading zeros (`013:15`); minutes take at most two
    /// digits.
    pub fn parse(raw: &str) -> Result<Self> {
        let bad = || SimError::bad_parameter("time", TIME_MESSAGE);

        let (h, m) = raw.split_once(':').ok_or_else(bad)?;
        let digits = |s: &str| !s.is_empty() && s.bytes().all(|b| b.is_ascii_digit());
        if !digits(h) || !digits(m) || m.len() > 2 {
            return Err(bad());
        }
        let hour = h.parse().map_err(|_| bad())?;
        let minute = m.parse().map_err(|_| bad())?;
        Self::new(hour, minute)
    }

    fn as_naive(self) -> Option<NaiveTime> {
        NaiveTime::from_hms_opt(self.hour, self.minute, 0)
    }
}

impl fmt::Display for TimeOfDay {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02}:{:02}", self.hour, self.minute)
    }
}

impl TryFrom<String> for TimeOfDay {
    type Error = SimError;

    fn try_from(value: String) -> Result<Self> {
        TimeOfDay::parse(&value)
    }
}

impl From<TimeOfDay> for String {
    fn from(value: TimeOfDay) -> Self {
        value.to_string()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum PreConditioning {
    Off,
    Cool,
    Medium,
    Warm,
}

/// One configured weekly departure
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DepartureTimePreference {
    pub day_of_week: DayOfWeek,
    pub time: TimeOfDay,
    pub pre_conditioning_setting: PreConditioning,
}

/// Wire shape of the next departure
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NextDeparture {
    pub day_of_week: DayOfWeek,
    pub enabled: bool,
    pub hour: u32,
    pub minutes: u32,
    pub pre_conditioning_setting: PreConditioning,
}

impl NextDeparture {
    /// Reported when a vehicle has no departure preferences
    pub fn disabled() -> Self {
        Self {
            day_of_week: DayOfWeek::Monday,
            enabled: false,
            hour: 0,
            minutes: 0,
            pre_conditioning_setting: PreConditioning::Off,
        }
    }
}

impl From<&DepartureTimePreference> for NextDeparture {
    fn from(pref: &DepartureTimePreference) -> Self {
        Self {
            day_of_week: pref.day_of_week,
            enabled: true,
            hour: pref.time.hour,
            minutes: pref.time.minute,
            pre_conditioning_setting: pref.pre_conditioning_setting,
        }
    }
}

/// The simulator's notion of "now" within a week
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SimulatedClock {
    pub day_of_week: DayOfWeek,
    pub time: TimeOfDay,
}

impl Default for SimulatedClock {
    fn default() -> Self {
        Self {
            day_of_week: DayOfWeek::Thursday,
            time: TimeOfDay {
                hour: 16,
                minute: 10,
            },
        }
    }
}

impl SimulatedClock {
    /// Validate raw query values; the day is checked before the time
    pub fn parse(day: Option<&str>, time: Option<&str>) -> Result<Self> {
        let day_of_week = day
            .and_then(DayOfWeek::parse)
            .ok_or_else(|| SimError::bad_parameter("day", DAY_MESSAGE))?;
        let time = time
            .map(TimeOfDay::parse)
            .unwrap_or_else(|| Err(SimError::bad_parameter("time", TIME_MESSAGE)))?;
        Ok(Self { day_of_week, time })
    }
}

/// Place a weekday/time inside the week starting Monday 2021-03-01
fn reference_instant(day: DayOfWeek, time: TimeOfDay) -> Option<NaiveDateTime> {
    let monday = NaiveDate::from_ymd_opt(2021, 3, 1)?;
    let date = monday + Duration::days(i64::from(day.number()) - 1);
    Some(date.and_time(time.as_naive()?))
}

#[derive(Debug, Default)]
pub struct DepartureScheduler {
    today: SimulatedClock,
}

impl DepartureScheduler {
    pub fn new(today: SimulatedClock) -> Self {
        Self { today }
    }

    pub fn today(&self) -> SimulatedClock {
        self.today
    }

    pub fn set_today(&mut self, today: SimulatedClock) {
        self.today = today;
    }

    /// Milliseconds from the simulated now until `pref` next occurs
    pub fn ms_until_next(&self, pref: &DepartureTimePreference) -> i64 {
        let (Some(departure), Some(now)) = (
            reference_instant(pref.day_of_week, pref.time),
            reference_instant(self.today.day_of_week, self.today.time),
        ) else {
            return MS_PER_WEEK;
        };

        let diff = (departure - now).num_milliseconds();
        if diff < 0 { diff + MS_PER_WEEK } else { diff }
    }

    /// Soonest upcoming departure; earlier list entries win ties
    pub fn next_departure(&self, prefs: &[DepartureTimePreference]) -> NextDeparture {
        let mut best: Option<(&DepartureTimePreference, i64)> = None;
        for pref in prefs {
            let wait = self.ms_until_next(pref);
            if best.is_none_or(|(_, min)| wait < min) {
                best = Some((pref, wait));
            }
        }
        best.map(|(pref, _)| NextDeparture::from(pref))
            .unwrap_or_else(NextDeparture::disabled)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pref(day: DayOfWeek, time: &str, pc: PreConditioning) -> DepartureTimePreference {
        DepartureTimePreference {
            day_of_week: day,
            time: TimeOfDay::parse(time).unwrap(),
            pre_conditioning_setting: pc,
        }
    }

    #[test]
    fn test_day_parsing_is_exact() {
        assert_eq!(DayOfWeek::parse("FRIDAY"), Some(DayOfWeek::Friday));
        assert_eq!(DayOfWeek::parse("friday"), None);
        assert_eq!(DayOfWeek::Sunday.number(), 7);
    }

    #[test]
    fn test_time_parsing() {
        assert_eq!(TimeOfDay::parse("13:15").unwrap(), TimeOfDay { hour: 13, minute: 15 });
        assert_eq!(TimeOfDay::parse("7:05").unwrap().to_string(), "07:05");
        assert!(TimeOfDay::parse("24:00").is_err());
        assert!(TimeOfDay::parse("12:60").is_err());
        assert!(TimeOfDay::parse("12:005").is_err());
        assert!(TimeOfDay::parse("1215").is_err());
        assert!(TimeOfDay::parse("-1:10").is_err());
        assert!(TimeOfDay::parse("12:").is_err());
    }

    #[test]
    fn test_hour_accepts_leading_zeros() {
        assert_eq!(TimeOfDay::parse("013:15").unwrap(), TimeOfDay { hour: 13, minute: 15 });
        assert_eq!(TimeOfDay::parse("0007:5").unwrap().to_string(), "07:05");
        assert!(TimeOfDay::parse("024:00").is_err());
        assert!(TimeOfDay::parse("99999999999:00").is_err());
        assert!(TimeOfDay::parse("013:015").is_err());

        let clock = SimulatedClock::parse(Some("TUESDAY"), Some("013:15")).unwrap();
        assert_eq!(clock.time, TimeOfDay { hour: 13, minute: 15 });
    }

    #[test]
    fn test_simulated_clock_parse_order() {
        let err = SimulatedClock::parse(Some("someday"), Some("99:99")).unwrap_err();
        assert!(err.to_string().contains("parameter 'day'"));

        let err = SimulatedClock::parse(Some("MONDAY"), None).unwrap_err();
        assert!(err.to_string().contains("parameter 'time'"));

        let clock = SimulatedClock::parse(Some("SATURDAY"), Some("08:30")).unwrap();
        assert_eq!(clock.day_of_week, DayOfWeek::Saturday);
        assert_eq!(clock.time, TimeOfDay { hour: 8, minute: 30 });
    }

    #[test]
    fn test_ms_until_next_wraps() {
        let scheduler = DepartureScheduler::default();
        let friday = pref(DayOfWeek::Friday, "17:00", PreConditioning::Cool);
        assert_eq!(
            scheduler.ms_until_next(&friday),
            (24 * 60 + 50) * 60 * 1000
        );

        let thursday_earlier = pref(DayOfWeek::Thursday, "16:00", PreConditioning::Off);
        assert_eq!(
            scheduler.ms_until_next(&thursday_earlier),
            MS_PER_WEEK - 10 * 60 * 1000
        );

        let now = pref(DayOfWeek::Thursday, "16:10", PreConditioning::Off);
        assert_eq!(scheduler.ms_until_next(&now), 0);
    }

    #[test]
    fn test_ms_until_next_stays_within_one_week() {
        let times = ["00:00", "00:01", "07:30", "12:00", "16:10", "23:59"];
        for today_day in DayOfWeek::ALL {
            for today_time in times {
                let scheduler = DepartureScheduler::new(SimulatedClock {
                    day_of_week: today_day,
                    time: TimeOfDay::parse(today_time).unwrap(),
                });
                for day in DayOfWeek::ALL {
                    for time in times {
                        let wait = scheduler.ms_until_next(&pref(day, time, PreConditioning::Off));
                        assert!(
                            (0..MS_PER_WEEK).contains(&wait),
                            "{today_day} {today_time} -> {day} {time}: {wait}"
                        );
                        if day == today_day && time == today_time {
                            assert_eq!(wait, 0);
                        }
                    }
                }
            }
        }
    }

    #[test]
    fn test_next_departure_from_default_clock() {
        let scheduler = DepartureScheduler::default();
        let prefs = vec![
            pref(DayOfWeek::Monday, "07:30", PreConditioning::Warm),
            pref(DayOfWeek::Friday, "17:00", PreConditioning::Cool),
            pref(DayOfWeek::Saturday, "09:15", PreConditioning::Off),
        ];
        let next = scheduler.next_departure(&prefs);
        assert_eq!(next.day_of_week, DayOfWeek::Friday);
        assert!(next.enabled);
        assert_eq!((next.hour, next.minutes), (17, 0));
        assert_eq!(next.pre_conditioning_setting, PreConditioning::Cool);
    }

    #[test]
    fn test_next_departure_ties_and_empty() {
        let scheduler = DepartureScheduler::new(SimulatedClock {
            day_of_week: DayOfWeek::Sunday,
            time: TimeOfDay { hour: 23, minute: 0 },
        });
        let prefs = vec![
            pref(DayOfWeek::Monday, "07:30", PreConditioning::Warm),
            pref(DayOfWeek::Monday, "07:30", PreConditioning::Cool),
        ];
        let next = scheduler.next_departure(&prefs);
        assert_eq!(next.pre_conditioning_setting, PreConditioning::Warm);

        assert_eq!(scheduler.next_departure(&[]), NextDeparture::disabled());
    }

    #[test]
    fn test_preference_wire_format() {
        let p = pref(DayOfWeek::Friday, "17:00", PreConditioning::Medium);
        let json = serde_json::to_value(&p).unwrap();
        assert_eq!(json["dayOfWeek"], "FRIDAY");
        assert_eq!(json["time"], "17:00");
        assert_eq!(json["preConditioningSetting"], "MEDIUM");

        let next = serde_json::to_value(NextDeparture::disabled()).unwrap();
        assert_eq!(next["dayOfWeek"], "MONDAY");
        assert_eq!(next["enabled"], false);
        assert_eq!(next["minutes"], 0);
        assert_eq!(next["preConditioningSetting"], "OFF");
    }
}
