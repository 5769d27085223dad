//! 12-hour clock handling: parsing `H:MM`, converting to 24-hour form and
//! rendering times for display.

use std::fmt;
use std::str::FromStr;

use chrono::NaiveTime;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum TimeFormatError {
    #[error("hour {0} is outside 1-12")]
    HourOutOfRange(u8),
    #[error("minute {0} is outside 0-59")]
    MinuteOutOfRange(u8),
    #[error("expected H:MM or HH:MM, got {0:?}")]
    BadTime(String),
    #[error("expected AM or PM, got {0:?}")]
    BadMeridiem(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Meridiem {
    Am,
    Pm,
}

impl Meridiem {
    pub fn as_str(self) -> &'static str {
        match self {
            Meridiem::Am => "AM",
            Meridiem::Pm => "PM",
        }
    }
}

impl fmt::Display for Meridiem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Meridiem {
    type Err = TimeFormatError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "AM" => Ok(Meridiem::Am),
            "PM" => Ok(Meridiem::Pm),
            other => Err(TimeFormatError::BadMeridiem(other.to_string())),
        }
    }
}

/// A reading of a 12-hour clock face, without its meridiem.
///
/// Hour is always in `1..=12` and minute in `0..=59`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ClockTime {
    hour: u8,
    minute: u8,
}

impl ClockTime {
    pub fn new(hour: u8, minute: u8) -> Result<Self, TimeFormatError> {
        if !(1..=12).contains(&hour) {
            return Err(TimeFormatError::HourOutOfRange(hour));
        }
        if minute > 59 {
            return Err(TimeFormatError::MinuteOutOfRange(minute));
        }
        Ok(Self { hour, minute })
    }

    pub fn hour(self) -> u8 {
        self.hour
    }

    pub fn minute(self) -> u8 {
        self.minute
    }
}

/// Renders the stored form, `H:MM` with an unpadded hour.
impl fmt::Display for ClockTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{:02}", self.hour, self.minute)
    }
}

impl FromStr for ClockTime {
    type Err = TimeFormatError;

    /// Accepts one or two hour digits and exactly two minute digits.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let bad = || TimeFormatError::BadTime(s.to_string());
        let (hour, minute) = s.split_once(':').ok_or_else(bad)?;
        let all_digits = |part: &str| part.bytes().all(|b| b.is_ascii_digit());
        if hour.is_empty() || hour.len() > 2 || minute.len() != 2 {
            return Err(bad());
        }
        if !all_digits(hour) || !all_digits(minute) {
            return Err(bad());
        }
        let hour: u8 = hour.parse().map_err(|_| bad())?;
        let minute: u8 = minute.parse().map_err(|_| bad())?;
        ClockTime::new(hour, minute)
    }
}

/// Converts a 12-hour reading to `(hour24, minute)`.
///
/// 12 AM is midnight (hour 0) and 12 PM is noon (hour 12).
pub fn to_24_hour(time: ClockTime, meridiem: Meridiem) -> (u8, u8) {
    let hour = match (meridiem, time.hour) {
        (Meridiem::Am, 12) => 0,
        (Meridiem::Am, h) => h,
        (Meridiem::Pm, 12) => 12,
        (Meridiem::Pm, h) => h + 12,
    };
    (hour, time.minute)
}

/// Same as [`to_24_hour`], as a wall-clock time of day.
pub fn to_naive_time(time: ClockTime, meridiem: Meridiem) -> NaiveTime {
    let (hour, minute) = to_24_hour(time, meridiem);
    // Both components are range checked by ClockTime and the conversion above.
    NaiveTime::from_hms_opt(u32::from(hour), u32::from(minute), 0).unwrap_or(NaiveTime::MIN)
}

/// `H:MM AM` / `H:MM PM`.
pub fn format_display(time: ClockTime, meridiem: Meridiem) -> String {
    format!("{time} {meridiem}")
}
