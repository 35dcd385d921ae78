//! Input boundary: where raw filings come from.
//!
//! A store distinguishes a year that was never filed (`Filing::NotFiled`, an
//! ordinary outcome) from a fetch that failed (`Err`, which the series builder
//! propagates).

use crate::error::StoreError;
use crate::record::{CompanyId, RawRecord, RecordKey};
use futures::future::{self, BoxFuture, FutureExt};
use std::collections::BTreeMap;

#[derive(Debug, Clone, PartialEq)]
pub enum Filing {
    Filed(RawRecord),
    NotFiled,
}

impl From<Option<RawRecord>> for Filing {
    fn from(record: Option<RawRecord>) -> Self {
        match record {
            Some(record) => Filing::Filed(record),
            None => Filing::NotFiled,
        }
    }
}

pub trait RawRecordStore {
    fn fetch(&self, company: &CompanyId, fiscal_year: i32) -> Result<Filing, StoreError>;
}

/// Store whose fetch is an I/O suspension point. Years may be fetched
/// concurrently; each yields an independent record.
pub trait AsyncRawRecordStore: Sync {
    fn fetch<'a>(
        &'a self,
        company: &'a CompanyId,
        fiscal_year: i32,
    ) -> BoxFuture<'a, Result<Filing, StoreError>>;
}

/// Store backed by a map, for callers that already hold their filings in
/// memory and for tests.
#[derive(Debug, Clone, Default)]
pub struct MemoryRecordStore {
    records: BTreeMap<RecordKey, RawRecord>,
}

impl MemoryRecordStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds or replaces the filing for the record's company and year.
    pub fn insert(&mut self, record: RawRecord) -> Option<RawRecord> {
        self.records.insert(record.key().clone(), record)
    }

    pub fn remove(&mut self, company: &CompanyId, fiscal_year: i32) -> Option<RawRecord> {
        self.records.remove(&key(company, fiscal_year))
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    fn lookup(&self, company: &CompanyId, fiscal_year: i32) -> Filing {
        self.records
            .get(&key(company, fiscal_year))
            .cloned()
            .into()
    }
}

impl FromIterator<RawRecord> for MemoryRecordStore {
    fn from_iter<I: IntoIterator<Item = RawRecord>>(iter: I) -> Self {
        let mut store = Self::new();
        for record in iter {
            store.insert(record);
        }
        store
    }
}

impl RawRecordStore for MemoryRecordStore {
    fn fetch(&self, company: &CompanyId, fiscal_year: i32) -> Result<Filing, StoreError> {
        Ok(self.lookup(company, fiscal_year))
    }
}

impl AsyncRawRecordStore for MemoryRecordStore {
    fn fetch<'a>(
        &'a self,
        company: &'a CompanyId,
        fiscal_year: i32,
    ) -> BoxFuture<'a, Result<Filing, StoreError>> {
        future::ready(Ok(self.lookup(company, fiscal_year))).boxed()
    }
}

fn key(company: &CompanyId, fiscal_year: i32) -> RecordKey {
    RecordKey {
        company_id: company.clone(),
        fiscal_year,
    }
}
