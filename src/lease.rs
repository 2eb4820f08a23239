//! Lease records and the entry parser.
//!
//! Each block produced by the [`scanner`](crate::scanner) is read line by
//! line. A block is a lease only if one of its lines declares it:
//!
//! ```text
//! lease 10.0.0.5 {
//!   starts 2 2023/01/10 08:00:00;
//!   ends 2 2023/01/10 20:00:00;
//!   hardware ethernet aa:bb:cc:dd:ee:ff;
//!   option agent.circuit-id "eth0/1/2";
//!   binding state active;
//! ```
//!
//! Every line after the declaration is trimmed, stripped of its trailing
//! `;` and matched on its leading keyword. Unknown statements (`cltt`,
//! `uid`, `next binding state`, `set ...`) are ignored, and a field that
//! appears twice keeps its last value.
//!
//! A field that cannot be parsed does not stop the scan; it is recorded in
//! [`LeaseRecord::parse_errors`] and the whole record is rejected once the
//! block is done.

use std::fmt;

use chrono::{DateTime, FixedOffset, NaiveDateTime, Utc};
use serde::Serialize;

use crate::config::TimeZoneSetting;

/// Layout of `starts`/`ends` timestamps in `dhcpd.leases`.
pub const LEASE_TIME_FORMAT: &str = "%Y/%m/%d %H:%M:%S";

/// The fields of a lease entry that are extracted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Field {
    Starts,
    Ends,
    Hardware,
    CircuitId,
    BindingState,
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Field::Starts => "starts",
            Field::Ends => "ends",
            Field::Hardware => "hardware",
            Field::CircuitId => "option agent.circuit-id",
            Field::BindingState => "binding state",
        };
        f.write_str(name)
    }
}

/// A single field of a lease entry that could not be parsed.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FieldError {
    /// The value does not match [`LEASE_TIME_FORMAT`].
    #[error("{field}: cannot parse timestamp {value:?}: {source}")]
    Timestamp {
        field: Field,
        value: String,
        #[source]
        source: chrono::ParseError,
    },

    /// The wall-clock time cannot be placed in the configured zone.
    #[error("{field}: {value:?} is out of range in time zone {zone}")]
    OutOfRange {
        field: Field,
        value: String,
        zone: TimeZoneSetting,
    },

    /// A `starts` or `ends` line without a date and time, e.g. `ends never`.
    #[error("{field}: missing timestamp")]
    MissingValue { field: Field },
}

/// One parsed lease entry.
///
/// Records are built fresh for every block and never modified once they
/// reach a [`LeaseStore`](crate::LeaseStore); a later entry for the same
/// address replaces the record instead.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LeaseRecord {
    /// The leased address, as written in the declaration line.
    pub address: String,

    /// Hardware address, e.g. `aa:bb:cc:dd:ee:ff`. Empty if the entry has
    /// no `hardware` line.
    pub hardware_identifier: String,

    /// Relay agent circuit ID (option 82), without surrounding quotes.
    pub circuit_identifier: Option<String>,

    /// Server-defined state such as `active`, `free` or `expired`. Empty if
    /// the entry has no `binding state` line.
    pub binding_state: String,

    pub starts_at: Option<DateTime<FixedOffset>>,

    pub ends_at: Option<DateTime<FixedOffset>>,

    #[serde(skip)]
    parse_errors: Vec<FieldError>,
}

impl LeaseRecord {
    /// Creates an empty record for `address`.
    pub fn new(address: impl Into<String>) -> Self {
        Self {
            address: address.into(),
            hardware_identifier: String::new(),
            circuit_identifier: None,
            binding_state: String::new(),
            starts_at: None,
            ends_at: None,
            parse_errors: Vec::new(),
        }
    }

    /// Field errors collected while parsing, in the order they were found.
    pub fn parse_errors(&self) -> &[FieldError] {
        &self.parse_errors
    }

    /// Returns true if `now` is before the end of the lease.
    pub fn is_active_at(&self, now: DateTime<Utc>) -> bool {
        self.ends_at.is_some_and(|ends| now < ends)
    }

    /// Returns true if the lease has not ended yet.
    pub fn is_active(&self) -> bool {
        self.is_active_at(Utc::now())
    }

    fn apply_line(&mut self, line: &str, zone: &TimeZoneSetting) {
        let (keyword, rest) = split_keyword(statement(line));
        match keyword {
            "starts" => self.starts_at = self.timestamp(Field::Starts, rest, zone),
            "ends" => self.ends_at = self.timestamp(Field::Ends, rest, zone),
            "hardware" => {
                let (_kind, identifier) = split_keyword(rest);
                self.hardware_identifier = identifier.to_string();
            }
            "option" => {
                let (name, value) = split_keyword(rest);
                if name == "agent.circuit-id" {
                    let value = unquote(value);
                    self.circuit_identifier = (!value.is_empty()).then(|| value.to_string());
                }
            }
            "binding" => {
                let (state_keyword, state) = split_keyword(rest);
                if state_keyword == "state" {
                    self.binding_state = state.to_string();
                }
            }
            _ => {}
        }
    }

    /// Parses `<weekday> <YYYY/MM/DD> <HH:MM:SS>`. The weekday is redundant
    /// and not checked.
    fn timestamp(
        &mut self,
        field: Field,
        rest: &str,
        zone: &TimeZoneSetting,
    ) -> Option<DateTime<FixedOffset>> {
        let (_weekday, value) = split_keyword(rest);
        if value.is_empty() {
            self.parse_errors.push(FieldError::MissingValue { field });
            return None;
        }

        let naive = match NaiveDateTime::parse_from_str(value, LEASE_TIME_FORMAT) {
            Ok(naive) => naive,
            Err(source) => {
                self.parse_errors.push(FieldError::Timestamp {
                    field,
                    value: value.to_string(),
                    source,
                });
                return None;
            }
        };

        let localized = zone.localize(naive);
        if localized.is_none() {
            self.parse_errors.push(FieldError::OutOfRange {
                field,
                value: value.to_string(),
                zone: *zone,
            });
        }
        localized
    }
}

/// What a single entry block turned out to be.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Entry {
    /// No `lease` declaration, e.g. a `host`, `group` or `failover` stanza
    /// or the comment header of the file.
    NotALease,
    /// A `lease` declaration without an address.
    MissingAddress,
    /// A lease with at least one unparsable field.
    Rejected(LeaseRecord),
    Lease(LeaseRecord),
}

/// Parses one entry block into a [`LeaseRecord`].
///
/// Lines before the `lease` declaration are skipped; every line after it is
/// scanned for fields.
pub fn parse_entry(block: &str, zone: &TimeZoneSetting) -> Entry {
    let mut lines = block.lines();
    let Some(address) = lines.by_ref().find_map(declared_address) else {
        return Entry::NotALease;
    };
    if address.is_empty() {
        return Entry::MissingAddress;
    }

    let mut record = LeaseRecord::new(address);
    for line in lines {
        record.apply_line(line, zone);
    }

    if record.parse_errors.is_empty() {
        Entry::Lease(record)
    } else {
        Entry::Rejected(record)
    }
}

/// Returns the address of a `lease <address> {` line, or an empty string if
/// the declaration has none. Other lines yield `None`.
fn declared_address(line: &str) -> Option<&str> {
    let mut tokens = line.split_whitespace();
    if tokens.next()? != "lease" {
        return None;
    }
    Some(tokens.next().filter(|token| *token != "{").unwrap_or(""))
}

fn statement(line: &str) -> &str {
    line.trim().trim_end_matches(';').trim_end()
}

fn split_keyword(s: &str) -> (&str, &str) {
    match s.split_once(char::is_whitespace) {
        Some((keyword, rest)) => (keyword, rest.trim_start()),
        None => (s, ""),
    }
}

fn unquote(value: &str) -> &str {
    value
        .strip_prefix('"')
        .and_then(|inner| inner.strip_suffix('"'))
        .unwrap_or(value)
}
