//! The parse pass: scanner → entry parser → store.
//!
//! A pass is strictly sequential. Blocks are pulled from the
//! [`EntryScanner`], parsed with [`parse_entry`] and accepted records are
//! committed to the caller's [`LeaseStore`]. Entries that are not leases,
//! lack an address or contain an unparsable field are skipped without
//! stopping the pass; only a read error aborts it.

use std::io::Read;

use tracing::{debug, info, warn};

use crate::config::{Config, DEFAULT_READ_BUFFER_SIZE, TimeZoneSetting};
use crate::error::Result;
use crate::lease::{Entry, parse_entry};
use crate::scanner::EntryScanner;
use crate::store::LeaseStore;

/// Counts of what one parse pass saw.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ParseSummary {
    /// Complete blocks read from the stream.
    pub blocks: usize,
    /// Records committed to the store, replacements included.
    pub committed: usize,
    /// Commits that replaced an earlier record for the same address.
    pub replaced: usize,
    /// Blocks without a lease declaration.
    pub ignored: usize,
    pub missing_address: usize,
    /// Leases dropped because of field errors.
    pub rejected: usize,
}

/// Parses lease snapshots with a fixed time zone.
///
/// # Example
///
/// ```
/// use leasereport::{LeaseParser, LeaseStore, TimeZoneSetting};
///
/// let snapshot = "lease 10.0.0.5 {\n  binding state active;\n}\n";
/// let mut store = LeaseStore::new();
/// let summary = LeaseParser::new(TimeZoneSetting::Utc)
///     .parse(snapshot.as_bytes(), &mut store)
///     .unwrap();
///
/// assert_eq!(summary.committed, 1);
/// assert_eq!(store.get("10.0.0.5").unwrap().binding_state, "active");
/// ```
#[derive(Debug, Clone)]
pub struct LeaseParser {
    zone: TimeZoneSetting,
    read_buffer_size: usize,
}

impl LeaseParser {
    pub fn new(zone: TimeZoneSetting) -> Self {
        Self {
            zone,
            read_buffer_size: DEFAULT_READ_BUFFER_SIZE,
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(config.time_zone).with_read_buffer_size(config.read_buffer_size)
    }

    pub fn with_read_buffer_size(mut self, read_buffer_size: usize) -> Self {
        self.read_buffer_size = read_buffer_size;
        self
    }

    pub fn zone(&self) -> TimeZoneSetting {
        self.zone
    }

    /// Reads `reader` to the end, committing every valid lease to `store`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Io`](crate::Error::Io) if the reader fails. Records
    /// committed before the failure stay in the store.
    pub fn parse<R: Read>(&self, reader: R, store: &mut LeaseStore) -> Result<ParseSummary> {
        let mut summary = ParseSummary::default();

        for block in EntryScanner::with_read_size(reader, self.read_buffer_size) {
            let block = block?;
            summary.blocks += 1;

            match parse_entry(&block, &self.zone) {
                Entry::Lease(record) => {
                    let address = record.address.clone();
                    summary.committed += 1;
                    if store.commit(record).is_some() {
                        summary.replaced += 1;
                        debug!("Replaced earlier lease for {}", address);
                    }
                }
                Entry::Rejected(record) => {
                    summary.rejected += 1;
                    for error in record.parse_errors() {
                        warn!("Rejecting lease {}: {}", record.address, error);
                    }
                }
                Entry::MissingAddress => {
                    summary.missing_address += 1;
                    debug!("Skipping lease declaration without an address");
                }
                Entry::NotALease => {
                    summary.ignored += 1;
                }
            }
        }

        info!(
            "Parsed {} blocks: {} leases committed ({} replaced), {} rejected, {} ignored",
            summary.blocks, summary.committed, summary.replaced, summary.rejected, summary.ignored
        );

        Ok(summary)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    use crate::error::Error;

    const SNAPSHOT: &str = "\
# The format of this file is documented in the dhcpd.leases(5) manual page.
# This lease file was written by isc-dhcp-4.4.3

authoring-byte-order little-endian;

lease 10.0.0.5 {
  starts 2 2023/01/10 08:00:00;
  ends 2 2023/01/10 20:00:00;
  hardware ethernet aa:bb:cc:dd:ee:ff;
  binding state active;
}
host printer {
  hardware ethernet 00:11:22:33:44:55;
  fixed-address 10.0.0.50;
}
lease 10.0.0.6 {
  starts 2 2023/01/10 08:00:00;
  ends 2 2023/01/10 nonsense;
  binding state active;
}
lease {
  binding state free;
}
lease 10.0.0.5 {
  starts 2 2023/01/10 20:00:00;
  ends 3 2023/01/11 08:00:00;
  hardware ethernet aa:bb:cc:dd:ee:ff;
  binding state expired;
}
lease 10.0.0.7 {
  starts 2 2023/01/10 09:";

    struct FailingReader;

    impl Read for FailingReader {
        fn read(&mut self, _buf: &mut [u8]) -> std::io::Result<usize> {
            Err(std::io::Error::other("read failed"))
        }
    }

    #[test]
    fn test_parse_snapshot() {
        let mut store = LeaseStore::new();
        let summary = LeaseParser::new(TimeZoneSetting::Utc)
            .parse(Cursor::new(SNAPSHOT), &mut store)
            .unwrap();

        assert_eq!(
            summary,
            ParseSummary {
                blocks: 5,
                committed: 2,
                replaced: 1,
                ignored: 1,
                missing_address: 1,
                rejected: 1,
            }
        );

        assert_eq!(store.len(), 1);
        let lease = store.get("10.0.0.5").unwrap();
        assert_eq!(lease.binding_state, "expired");
        assert_eq!(
            lease.ends_at.unwrap().to_string(),
            "2023-01-11 08:00:00 +00:00"
        );
        assert!(store.get("10.0.0.6").is_none());
        assert!(store.get("10.0.0.7").is_none());
    }

    #[test]
    fn test_parse_with_small_reads_matches() {
        let mut whole = LeaseStore::new();
        LeaseParser::new(TimeZoneSetting::Utc)
            .parse(Cursor::new(SNAPSHOT), &mut whole)
            .unwrap();

        let mut chunked = LeaseStore::new();
        LeaseParser::new(TimeZoneSetting::Utc)
            .with_read_buffer_size(3)
            .parse(Cursor::new(SNAPSHOT), &mut chunked)
            .unwrap();

        assert_eq!(whole.all(), chunked.all());
    }

    #[test]
    fn test_parse_into_existing_store() {
        let parser = LeaseParser::new(TimeZoneSetting::Utc);
        let mut store = LeaseStore::new();
        parser
            .parse(Cursor::new("lease 10.0.0.1 {\n  binding state free;\n}"), &mut store)
            .unwrap();
        parser
            .parse(Cursor::new("lease 10.0.0.1 {\n  binding state active;\n}"), &mut store)
            .unwrap();

        assert_eq!(store.len(), 1);
        assert_eq!(store.get("10.0.0.1").unwrap().binding_state, "active");
    }

    #[test]
    fn test_from_config() {
        let config = Config {
            time_zone: TimeZoneSetting::Local,
            read_buffer_size: 64,
            ..Default::default()
        };
        let parser = LeaseParser::from_config(&config);
        assert_eq!(parser.zone(), TimeZoneSetting::Local);
        assert_eq!(parser.read_buffer_size, 64);
    }

    #[test]
    fn test_read_error_is_fatal() {
        let mut store = LeaseStore::new();
        let result = LeaseParser::new(TimeZoneSetting::Utc).parse(FailingReader, &mut store);
        assert!(matches!(result, Err(Error::Io(_))));
        assert!(store.is_empty());
    }
}
