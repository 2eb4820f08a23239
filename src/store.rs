//! Latest-wins storage of parsed leases.

use std::collections::HashMap;
use std::collections::hash_map::Values;

use crate::lease::LeaseRecord;

/// Parsed leases indexed by address.
///
/// ISC dhcpd appends a new stanza every time a lease changes, so one address
/// can appear many times in a snapshot. Committing a record replaces whatever
/// was stored for its address; nothing is ever removed. The store is owned by
/// a single parse pass and is not meant to be shared between writers.
#[derive(Debug, Clone, Default)]
pub struct LeaseStore {
    leases: HashMap<String, LeaseRecord>,
}

impl LeaseStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts `record`, returning the record it replaced, if any.
    pub fn commit(&mut self, record: LeaseRecord) -> Option<LeaseRecord> {
        self.leases.insert(record.address.clone(), record)
    }

    /// All stored leases by address. Iteration order is unspecified.
    pub fn all(&self) -> &HashMap<String, LeaseRecord> {
        &self.leases
    }

    pub fn get(&self, address: &str) -> Option<&LeaseRecord> {
        self.leases.get(address)
    }

    pub fn iter(&self) -> Values<'_, String, LeaseRecord> {
        self.leases.values()
    }

    pub fn len(&self) -> usize {
        self.leases.len()
    }

    pub fn is_empty(&self) -> bool {
        self.leases.is_empty()
    }
}

impl<'a> IntoIterator for &'a LeaseStore {
    type Item = &'a LeaseRecord;
    type IntoIter = Values<'a, String, LeaseRecord>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}
