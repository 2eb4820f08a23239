//! # leasereport
//!
//! Extracts lease records from ISC DHCP server `dhcpd.leases` snapshots.
//!
//! ## Features
//!
//! - Streaming tokenizer that splits the file into brace-delimited stanzas
//!   regardless of how reads are chunked
//! - Field extraction for address, hardware address, relay circuit ID
//!   (option 82), binding state and start/end times
//! - Explicit time zone for lease timestamps (`utc`, `local` or a fixed offset)
//! - Latest-wins store: later stanzas for an address replace earlier ones
//! - Whole-record rejection when any field fails to parse
//!
//! ## Quick Start
//!
//! ```no_run
//! use std::fs::File;
//! use leasereport::{Config, LeaseParser, LeaseStore};
//!
//! fn main() -> leasereport::Result<()> {
//!     let config = Config::load_or_default("leasereport.json")?;
//!     let file = File::open(&config.leases_file)?;
//!
//!     let mut store = LeaseStore::new();
//!     LeaseParser::from_config(&config).parse(file, &mut store)?;
//!
//!     for lease in &store {
//!         println!("{} {} {}", lease.address, lease.hardware_identifier, lease.binding_state);
//!     }
//!     Ok(())
//! }
//! ```
//!
//! ## Architecture
//!
//! - [`scanner`] - Splits a byte stream into entry blocks
//! - [`lease`] - [`LeaseRecord`] and the per-entry field parser
//! - [`LeaseStore`] - Latest record per address
//! - [`LeaseParser`] - Runs a full pass from reader to store
//! - [`Config`] - Lease file location and [`TimeZoneSetting`]
//! - [`report`] - CSV and JSON output

pub mod config;
pub mod error;
pub mod lease;
pub mod parser;
pub mod report;
pub mod scanner;
pub mod store;

pub use config::{Config, TimeZoneSetting};
pub use error::{Error, Result};
pub use lease::{Entry, Field, FieldError, LeaseRecord, parse_entry};
pub use parser::{LeaseParser, ParseSummary};
pub use scanner::EntryScanner;
pub use store::LeaseStore;
