use chrono::{
    DateTime, FixedOffset, Local, LocalResult, NaiveDateTime, Offset, TimeDelta, TimeZone,
};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use crate::error::{Error, Result};

/// Default size of a single read from the lease stream.
pub const DEFAULT_READ_BUFFER_SIZE: usize = 8192;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub leases_file: PathBuf,
    pub time_zone: TimeZoneSetting,
    pub read_buffer_size: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            leases_file: PathBuf::from("leases-snapshot.txt"),
            time_zone: TimeZoneSetting::Utc,
            read_buffer_size: DEFAULT_READ_BUFFER_SIZE,
        }
    }
}

impl Config {
    /// Loads the configuration from `path`, falling back to defaults when
    /// the file does not exist.
    pub fn load_or_default<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();

        if path.exists() {
            let content = std::fs::read_to_string(path)?;
            let config: Config = serde_json::from_str(&content)?;
            config.validate()?;
            Ok(config)
        } else {
            Ok(Config::default())
        }
    }

    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        if self.read_buffer_size == 0 {
            return Err(Error::InvalidConfig(
                "read_buffer_size must be greater than 0".to_string(),
            ));
        }

        if self.leases_file.as_os_str().is_empty() {
            return Err(Error::InvalidConfig(
                "leases_file must not be empty".to_string(),
            ));
        }

        Ok(())
    }
}

/// The zone in which lease timestamps are interpreted.
///
/// `dhcpd.leases` does not record the offset its timestamps were written
/// in, so it has to be supplied by whoever reads the file. ISC dhcpd writes
/// UTC unless `db-time-format local` is set, hence the default.
///
/// Text forms: `utc`, `local`, an IANA zone name such as `America/New_York`,
/// or a fixed offset such as `-05:00`, `+0530` or `+09`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum TimeZoneSetting {
    #[default]
    Utc,
    /// The zone of the machine running the report.
    Local,
    /// A zone from the IANA database, with its DST rules.
    Named(Tz),
    Fixed(FixedOffset),
}

impl TimeZoneSetting {
    /// Attaches this zone to a wall-clock time read from the lease file.
    ///
    /// For zones with DST, an ambiguous time (fold) resolves to the earlier
    /// instant, and a time inside a gap is read with the offset in effect
    /// before the gap, which moves it forward by the size of the gap.
    /// `None` only when the result is out of chrono's range.
    pub fn localize(&self, naive: NaiveDateTime) -> Option<DateTime<FixedOffset>> {
        match self {
            TimeZoneSetting::Utc => Some(naive.and_utc().fixed_offset()),
            TimeZoneSetting::Local => resolve_wall_clock(&Local, naive),
            TimeZoneSetting::Named(tz) => resolve_wall_clock(tz, naive),
            TimeZoneSetting::Fixed(offset) => offset.from_local_datetime(&naive).single(),
        }
    }
}

fn resolve_wall_clock<Z: TimeZone>(
    zone: &Z,
    naive: NaiveDateTime,
) -> Option<DateTime<FixedOffset>> {
    match zone.from_local_datetime(&naive) {
        LocalResult::Single(time) => Some(time.fixed_offset()),
        LocalResult::Ambiguous(first, second) => Some(first.min(second).fixed_offset()),
        LocalResult::None => {
            let day_before = naive.checked_sub_signed(TimeDelta::days(1))?;
            let offset = zone.offset_from_utc_datetime(&day_before).fix();
            let utc =
                naive.checked_sub_signed(TimeDelta::seconds(offset.local_minus_utc().into()))?;
            Some(zone.from_utc_datetime(&utc).fixed_offset())
        }
    }
}

impl fmt::Display for TimeZoneSetting {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TimeZoneSetting::Utc => f.write_str("utc"),
            TimeZoneSetting::Local => f.write_str("local"),
            TimeZoneSetting::Named(tz) => f.write_str(tz.name()),
            TimeZoneSetting::Fixed(offset) => write!(f, "{}", offset),
        }
    }
}

impl FromStr for TimeZoneSetting {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let trimmed = s.trim();
        if trimmed.eq_ignore_ascii_case("utc") || trimmed == "Z" {
            return Ok(TimeZoneSetting::Utc);
        }
        if trimmed.eq_ignore_ascii_case("local") {
            return Ok(TimeZoneSetting::Local);
        }
        if trimmed.starts_with(['+', '-']) {
            return parse_offset(trimmed)
                .map(TimeZoneSetting::Fixed)
                .ok_or_else(|| Error::InvalidTimeZone(s.to_string()));
        }
        trimmed
            .parse::<Tz>()
            .map(TimeZoneSetting::Named)
            .map_err(|_| Error::InvalidTimeZone(s.to_string()))
    }
}

impl TryFrom<String> for TimeZoneSetting {
    type Error = Error;

    fn try_from(value: String) -> Result<Self> {
        value.parse()
    }
}

impl From<TimeZoneSetting> for String {
    fn from(value: TimeZoneSetting) -> Self {
        value.to_string()
    }
}

/// chrono's offset syntax, plus the `+HH` shorthand.
fn parse_offset(s: &str) -> Option<FixedOffset> {
    let (sign, hours) = s.split_at(1);
    if (1..=2).contains(&hours.len()) && hours.bytes().all(|b| b.is_ascii_digit()) {
        return format!("{}{:0>2}:00", sign, hours).parse().ok();
    }
    s.parse().ok()
}
