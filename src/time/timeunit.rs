use crate::time::error::Error;
use core::str::FromStr;
use lazy_static::*;
use regex::Regex;
use std::convert::TryFrom;
use std::time::Duration;

lazy_static! {
    static ref DURATION_REGEX: Regex =
        Regex::new(r"^\s*(?P<value>\d+)\s*(?P<unit>ns|us|ms|s|m|h|d)\s*$")
            .expect("Regex compilation error");
}

/// A duration written as a number followed by a unit, e.g. `200ms` or `5s`.
#[derive(Debug, PartialEq)]
pub struct DurationUnit {
    value: u64,
    unit: TimeUnit,
}

#[derive(Debug, PartialEq)]
pub enum TimeUnit {
    Nanosecond,
    Microsecond,
    Millisecond,
    Second,
    Minute,
    Hour,
    Day,
}

impl FromStr for DurationUnit {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let caps = DURATION_REGEX
            .captures(s)
            .ok_or_else(|| Error::Syntax(s.to_owned()))?;
        let value = caps
            .name("value")
            .and_then(|v| v.as_str().parse().ok())
            .ok_or_else(|| Error::Syntax(s.to_owned()))?;
        let unit = caps
            .name("unit")
            .map(|u| u.as_str())
            .unwrap_or_default()
            .parse::<TimeUnit>()?;
        Ok(Self { value, unit })
    }
}

impl TryFrom<DurationUnit> for Duration {
    type Error = Error;

    fn try_from(unit: DurationUnit) -> Result<Duration, Self::Error> {
        let value = unit.value;
        let seconds = |factor: u64| {
            value
                .checked_mul(factor)
                .map(Duration::from_secs)
                .ok_or_else(|| Error::Overflow(format!("{}{}", value, unit.unit.symbol())))
        };
        match unit.unit {
            TimeUnit::Nanosecond => Ok(Duration::from_nanos(value)),
            TimeUnit::Microsecond => Ok(Duration::from_micros(value)),
            TimeUnit::Millisecond => Ok(Duration::from_millis(value)),
            TimeUnit::Second => Ok(Duration::from_secs(value)),
            TimeUnit::Minute => seconds(60),
            TimeUnit::Hour => seconds(60 * 60),
            TimeUnit::Day => seconds(60 * 60 * 24),
        }
    }
}

impl TimeUnit {
    fn symbol(&self) -> &'static str {
        match self {
            TimeUnit::Nanosecond => "ns",
            TimeUnit::Microsecond => "us",
            TimeUnit::Millisecond => "ms",
            TimeUnit::Second => "s",
            TimeUnit::Minute => "m",
            TimeUnit::Hour => "h",
            TimeUnit::Day => "d",
        }
    }
}

impl FromStr for TimeUnit {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "ns" | "nanosecond" | "nanos" | "nanoseconds" => Ok(TimeUnit::Nanosecond),
            "us" | "microsecond" | "micros" | "microseconds" => Ok(TimeUnit::Microsecond),
            "ms" | "millisecond" | "millis" | "milliseconds" => Ok(TimeUnit::Millisecond),
            "s" | "second" | "secs" | "seconds" => Ok(TimeUnit::Second),
            "m" | "minute" | "mins" | "minutes" => Ok(TimeUnit::Minute),
            "h" | "hour" | "hours" => Ok(TimeUnit::Hour),
            "d" | "day" | "days" => Ok(TimeUnit::Day),
            _ => Err(Error::UnitNotSupported(s.to_owned())),
        }
    }
}
