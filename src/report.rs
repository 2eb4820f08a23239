//! Rendering parsed leases for people and scripts.

use std::cmp::Ordering;
use std::io::Write;
use std::net::IpAddr;

use chrono::{DateTime, FixedOffset};

use crate::error::Result;
use crate::lease::LeaseRecord;
use crate::store::LeaseStore;

/// Column names of the CSV report, in output order.
pub const CSV_HEADER: [&str; 6] = ["IP", "MAC", "Circuit ID", "Binding State", "Starts", "Ends"];

/// Returns the stored leases ordered by address.
///
/// IP addresses sort numerically and come before anything that does not
/// parse as one.
pub fn sorted_leases(store: &LeaseStore) -> Vec<&LeaseRecord> {
    let mut leases: Vec<&LeaseRecord> = store.iter().collect();
    leases.sort_by(|a, b| compare_addresses(&a.address, &b.address));
    leases
}

fn compare_addresses(a: &str, b: &str) -> Ordering {
    match (a.parse::<IpAddr>(), b.parse::<IpAddr>()) {
        (Ok(a), Ok(b)) => a.cmp(&b),
        (Ok(_), Err(_)) => Ordering::Less,
        (Err(_), Ok(_)) => Ordering::Greater,
        (Err(_), Err(_)) => a.cmp(b),
    }
}

fn timestamp(time: Option<DateTime<FixedOffset>>) -> String {
    time.map(|time| time.to_string()).unwrap_or_default()
}

/// Writes a header row followed by one row per lease.
pub fn write_csv<W: Write>(out: W, leases: &[&LeaseRecord]) -> Result<()> {
    let mut writer = csv::Writer::from_writer(out);
    writer.write_record(CSV_HEADER)?;

    for lease in leases {
        writer.write_record([
            lease.address.as_str(),
            lease.hardware_identifier.as_str(),
            lease.circuit_identifier.as_deref().unwrap_or_default(),
            lease.binding_state.as_str(),
            timestamp(lease.starts_at).as_str(),
            timestamp(lease.ends_at).as_str(),
        ])?;
    }

    writer.flush()?;
    Ok(())
}

/// Writes the leases as a pretty-printed JSON array.
pub fn write_json<W: Write>(mut out: W, leases: &[&LeaseRecord]) -> Result<()> {
    serde_json::to_writer_pretty(&mut out, leases)?;
    writeln!(out)?;
    Ok(())
}
