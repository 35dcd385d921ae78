use crate::catalog::DerivationCatalog;
use crate::config::EngineConfig;
use crate::error::{DerivationError, Result, StoreError};
use crate::record::{CompanyId, RecordKey, ResolvedRecord};
use crate::resolver::FieldResolver;
use crate::schema::{AnalysisSchema, SchemaId};
use crate::store::{AsyncRawRecordStore, Filing, RawRecordStore};
use crate::utils::{descending_years, get_fiscal_year_end_date, window_range};
use chrono::NaiveDate;
use futures::future::try_join_all;
use log::{debug, info};
use rust_decimal::Decimal;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(tag = "status", content = "record", rename_all = "snake_case")]
pub enum YearData {
    /// The year was filed and every line of the schema resolved.
    Resolved(ResolvedRecord),
    /// No filing exists for the year. Kept as a placeholder so positions stay
    /// aligned with the year labels.
    Absent,
}

impl YearData {
    pub fn record(&self) -> Option<&ResolvedRecord> {
        match self {
            YearData::Resolved(record) => Some(record),
            YearData::Absent => None,
        }
    }

    pub fn is_absent(&self) -> bool {
        matches!(self, YearData::Absent)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct SeriesEntry {
    pub fiscal_year: i32,
    /// Closing date of the fiscal year.
    pub period_end: NaiveDate,
    pub data: YearData,
}

/// One company's analysis across consecutive fiscal years, most recent first.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct Series {
    pub company_id: CompanyId,
    pub schema: SchemaId,
    pub entries: Vec<SeriesEntry>,
}

impl Series {
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &SeriesEntry> {
        self.entries.iter()
    }

    pub fn years(&self) -> Vec<i32> {
        self.entries.iter().map(|e| e.fiscal_year).collect()
    }

    pub fn entry(&self, fiscal_year: i32) -> Option<&SeriesEntry> {
        self.entries.iter().find(|e| e.fiscal_year == fiscal_year)
    }

    pub fn record(&self, fiscal_year: i32) -> Option<&ResolvedRecord> {
        self.entry(fiscal_year).and_then(|e| e.data.record())
    }

    /// Resolved records only, most recent first.
    pub fn filed(&self) -> impl Iterator<Item = &ResolvedRecord> {
        self.entries.iter().filter_map(|e| e.data.record())
    }

    pub fn absent_years(&self) -> Vec<i32> {
        self.entries
            .iter()
            .filter(|e| e.data.is_absent())
            .map(|e| e.fiscal_year)
            .collect()
    }

    /// One field across the series, positionally aligned with [`Series::years`].
    pub fn values(&self, field: &str) -> Vec<Option<Decimal>> {
        self.entries
            .iter()
            .map(|e| e.data.record().and_then(|r| r.value(field)))
            .collect()
    }
}

/// Builds aligned series for a schema out of a record store.
pub struct TimeSeriesBuilder<'c> {
    catalog: &'c DerivationCatalog,
    window_years: u32,
    fiscal_year_end_month: u32,
}

impl<'c> TimeSeriesBuilder<'c> {
    pub fn new(catalog: &'c DerivationCatalog) -> Self {
        Self::with_config(catalog, &EngineConfig::default())
    }

    pub fn with_config(catalog: &'c DerivationCatalog, config: &EngineConfig) -> Self {
        Self {
            catalog,
            window_years: config.window_years,
            fiscal_year_end_month: config.fiscal_year_end_month,
        }
    }

    /// Series for the closed range `from_year..=to_year`, most recent first.
    pub fn build<S>(
        &self,
        store: &S,
        company: &CompanyId,
        from_year: i32,
        to_year: i32,
        schema_id: SchemaId,
    ) -> Result<Series>
    where
        S: RawRecordStore + ?Sized,
    {
        let years = descending_years(from_year, to_year)?;
        let schema = self.catalog.schema(schema_id)?;

        info!(
            "Building {} series for {} over {}..={}",
            schema_id, company, from_year, to_year
        );

        let mut filings = Vec::with_capacity(years.len());
        for &year in &years {
            let filing = store
                .fetch(company, year)
                .map_err(|source| store_error(company, year, source))?;
            filings.push(filing);
        }

        self.assemble(company, schema, years, filings)
    }

    /// Series for the configured window ending at `latest_year`.
    pub fn build_window<S>(
        &self,
        store: &S,
        company: &CompanyId,
        latest_year: i32,
        schema_id: SchemaId,
    ) -> Result<Series>
    where
        S: RawRecordStore + ?Sized,
    {
        let (from_year, to_year) = window_range(latest_year, self.window_years)?;
        self.build(store, company, from_year, to_year, schema_id)
    }

    /// Like [`TimeSeriesBuilder::build`], but fetches every year concurrently.
    /// Nothing is emitted unless all fetches complete.
    pub async fn build_async<S>(
        &self,
        store: &S,
        company: &CompanyId,
        from_year: i32,
        to_year: i32,
        schema_id: SchemaId,
    ) -> Result<Series>
    where
        S: AsyncRawRecordStore + ?Sized,
    {
        let years = descending_years(from_year, to_year)?;
        let schema = self.catalog.schema(schema_id)?;

        info!(
            "Building {} series for {} over {}..={} (concurrent fetch)",
            schema_id, company, from_year, to_year
        );

        let filings = try_join_all(years.iter().map(|&year| async move {
            store
                .fetch(company, year)
                .await
                .map_err(|source| store_error(company, year, source))
        }))
        .await?;

        self.assemble(company, schema, years, filings)
    }

    pub async fn build_window_async<S>(
        &self,
        store: &S,
        company: &CompanyId,
        latest_year: i32,
        schema_id: SchemaId,
    ) -> Result<Series>
    where
        S: AsyncRawRecordStore + ?Sized,
    {
        let (from_year, to_year) = window_range(latest_year, self.window_years)?;
        self.build_async(store, company, from_year, to_year, schema_id)
            .await
    }

    // `years` and `filings` are positionally paired.
    fn assemble(
        &self,
        company: &CompanyId,
        schema: &AnalysisSchema,
        years: Vec<i32>,
        filings: Vec<Filing>,
    ) -> Result<Series> {
        let mut resolver = FieldResolver::new(self.catalog);
        let mut entries = Vec::with_capacity(years.len());

        for (year, filing) in years.into_iter().zip(filings) {
            let data = match filing {
                Filing::Filed(record) => {
                    let requested = RecordKey {
                        company_id: company.clone(),
                        fiscal_year: year,
                    };
                    if record.key() != &requested {
                        return Err(DerivationError::RecordMismatch {
                            requested: requested.to_string(),
                            found: record.key().to_string(),
                        });
                    }
                    YearData::Resolved(resolver.resolve_schema(&record, schema)?)
                }
                Filing::NotFiled => {
                    debug!("No filing for {} in {}", company, year);
                    YearData::Absent
                }
            };

            entries.push(SeriesEntry {
                fiscal_year: year,
                period_end: get_fiscal_year_end_date(year, self.fiscal_year_end_month)?,
                data,
            });
        }

        Ok(Series {
            company_id: company.clone(),
            schema: schema.id,
            entries,
        })
    }
}

fn store_error(company: &CompanyId, fiscal_year: i32, source: StoreError) -> DerivationError {
    DerivationError::Store {
        company: company.to_string(),
        fiscal_year,
        source,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::RawRecord;
    use crate::standard::{standard_catalog, TOTAL_ASSETS};
    use crate::store::MemoryRecordStore;
    use rust_decimal_macros::dec;
    use std::cell::RefCell;
    use std::collections::BTreeMap;

    fn balance_record(company: &CompanyId, year: i32, cash: Decimal) -> RawRecord {
        RawRecord::from_pairs(
            company.clone(),
            year,
            [("cash_equivalents", cash), ("share_capital", cash)],
        )
        .unwrap()
    }

    struct FailingStore;

    impl RawRecordStore for FailingStore {
        fn fetch(
            &self,
            _company: &CompanyId,
            fiscal_year: i32,
        ) -> std::result::Result<Filing, StoreError> {
            if fiscal_year == 2021 {
                return Err("connection reset".into());
            }
            Ok(Filing::NotFiled)
        }
    }

    /// Records the order in which years were requested.
    struct RecordingStore {
        inner: MemoryRecordStore,
        requests: RefCell<Vec<i32>>,
    }

    impl RawRecordStore for RecordingStore {
        fn fetch(
            &self,
            company: &CompanyId,
            fiscal_year: i32,
        ) -> std::result::Result<Filing, StoreError> {
            self.requests.borrow_mut().push(fiscal_year);
            RawRecordStore::fetch(&self.inner, company, fiscal_year)
        }
    }

    #[test]
    fn test_series_is_descending_with_absent_placeholders() {
        let catalog = standard_catalog(&[]).unwrap();
        let acme = CompanyId::new("ACME");
        let store: MemoryRecordStore = [2019, 2021, 2023]
            .into_iter()
            .map(|y| balance_record(&acme, y, Decimal::from(y)))
            .collect();

        let series = TimeSeriesBuilder::new(&catalog)
            .build(&store, &acme, 2019, 2023, SchemaId::Balance)
            .unwrap();

        assert_eq!(series.years(), vec![2023, 2022, 2021, 2020, 2019]);
        assert_eq!(series.absent_years(), vec![2022, 2020]);
        assert_eq!(
            series.values(TOTAL_ASSETS),
            vec![Some(dec!(2023)), None, Some(dec!(2021)), None, Some(dec!(2019))]
        );
        assert_eq!(series.filed().count(), 3);
        assert_eq!(
            series.entry(2022).unwrap().period_end,
            NaiveDate::from_ymd_opt(2022, 12, 31).unwrap()
        );
    }

    #[test]
    fn test_store_failure_propagates() {
        let catalog = standard_catalog(&[]).unwrap();
        let result = TimeSeriesBuilder::new(&catalog).build(
            &FailingStore,
            &CompanyId::new("ACME"),
            2019,
            2023,
            SchemaId::Balance,
        );

        match result {
            Err(DerivationError::Store { fiscal_year, source, .. }) => {
                assert_eq!(fiscal_year, 2021);
                assert_eq!(source.to_string(), "connection reset");
            }
            other => panic!("expected a store error, got {:?}", other),
        }
    }

    #[test]
    fn test_window_uses_config() {
        let catalog = standard_catalog(&[]).unwrap();
        let acme = CompanyId::new("ACME");
        let store = RecordingStore {
            inner: MemoryRecordStore::new(),
            requests: RefCell::new(Vec::new()),
        };
        let config = EngineConfig {
            window_years: 3,
            fiscal_year_end_month: 6,
            ..EngineConfig::default()
        };

        let series = TimeSeriesBuilder::with_config(&catalog, &config)
            .build_window(&store, &acme, 2023, SchemaId::ProfitAndLoss)
            .unwrap();

        assert_eq!(series.years(), vec![2023, 2022, 2021]);
        assert_eq!(*store.requests.borrow(), vec![2023, 2022, 2021]);
        assert_eq!(
            series.entries[0].period_end,
            NaiveDate::from_ymd_opt(2023, 6, 30).unwrap()
        );
    }

    #[test]
    fn test_invalid_range() {
        let catalog = standard_catalog(&[]).unwrap();
        let result = TimeSeriesBuilder::new(&catalog).build(
            &MemoryRecordStore::new(),
            &CompanyId::new("ACME"),
            2024,
            2020,
            SchemaId::Balance,
        );
        assert!(matches!(result, Err(DerivationError::InvalidYearRange { .. })));
    }

    #[test]
    fn test_mismatched_record_rejected() {
        struct WrongYearStore;

        impl RawRecordStore for WrongYearStore {
            fn fetch(
                &self,
                company: &CompanyId,
                _year: i32,
            ) -> std::result::Result<Filing, StoreError> {
                let record = RawRecord::new(company.clone(), 1999, BTreeMap::new())
                    .map_err(|e| e.to_string())?;
                Ok(Filing::Filed(record))
            }
        }

        let catalog = standard_catalog(&[]).unwrap();
        let result = TimeSeriesBuilder::new(&catalog).build(
            &WrongYearStore,
            &CompanyId::new("ACME"),
            2023,
            2023,
            SchemaId::Balance,
        );
        assert!(matches!(result, Err(DerivationError::RecordMismatch { .. })));
    }

    #[test]
    fn test_async_build_matches_sync_build() {
        let catalog = standard_catalog(&[]).unwrap();
        let acme = CompanyId::new("ACME");
        let store: MemoryRecordStore = [2020, 2022]
            .into_iter()
            .map(|y| balance_record(&acme, y, dec!(1000)))
            .collect();
        let builder = TimeSeriesBuilder::new(&catalog);

        let sync = builder
            .build(&store, &acme, 2019, 2023, SchemaId::Balance)
            .unwrap();
        let concurrent = futures::executor::block_on(builder.build_window_async(
            &store,
            &acme,
            2023,
            SchemaId::Balance,
        ))
        .unwrap();

        assert_eq!(sync, concurrent);
    }

    #[test]
    fn test_series_serializes_absent_years() {
        let catalog = standard_catalog(&[]).unwrap();
        let acme = CompanyId::new("ACME");
        let series = TimeSeriesBuilder::new(&catalog)
            .build(&MemoryRecordStore::new(), &acme, 2023, 2023, SchemaId::Balance)
            .unwrap();

        let json = serde_json::to_value(&series).unwrap();
        assert_eq!(json["entries"][0]["data"]["status"], "absent");
        assert_eq!(json["entries"][0]["period_end"], "2023-12-31");
    }
}
