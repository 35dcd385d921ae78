//! # Financial Derivation Engine
//!
//! A library for turning raw annual filings into derived financial analyses:
//! an analytical profit and loss, a balance-sheet mass analysis and an
//! operating funds (NOF) analysis, laid out as aligned multi-year series.
//!
//! ## Core Concepts
//!
//! - **Raw Records**: One company's filed figures for one fiscal year, keyed by a fixed vocabulary
//! - **Derivation Catalog**: Named rules (items, subtotals, totals) whose formulas only add, subtract or take shares
//! - **Field Resolution**: Raw fields are read directly, derived ones recurse through the catalog with memoization
//! - **Series**: A schema resolved across consecutive years, most recent first, absent years kept as placeholders
//! - **Comparatives**: Year-over-year variation, percentage of a base, and the balance tie check
//!
//! ## Example
//!
//! ```rust,ignore
//! use financial_derivation_engine::*;
//! use rust_decimal_macros::dec;
//!
//! let acme = CompanyId::new("ACME");
//! let store: MemoryRecordStore = vec![RawRecord::from_pairs(
//!     acme.clone(),
//!     2023,
//!     [("net_turnover", dec!(1000000)), ("supplies", dec!(450000))],
//! )?]
//! .into_iter()
//! .collect();
//!
//! let engine = AnalysisEngine::new(EngineConfig::default())?;
//! let series = engine.build_window(&store, &acme, 2023, SchemaId::ProfitAndLoss)?;
//! ```

pub mod catalog;
pub mod comparative;
pub mod config;
pub mod error;
pub mod estimation;
pub mod record;
pub mod resolver;
pub mod schema;
pub mod series;
pub mod standard;
pub mod store;
pub mod utils;
pub mod vocabulary;

pub use catalog::{
    DerivationCatalog, DerivationRule, FieldSource, Formula, RuleKind, SignPolicy, Term, TermSign,
};
pub use comparative::{
    check_balance_ties, percent_of_base, variation, BalanceTie, ComparativeAnalyzer,
    LineComparison, LineShare, Variation, YearOverYear,
};
pub use config::EngineConfig;
pub use error::{DerivationError, Result, StoreError};
pub use estimation::EstimationRule;
pub use record::{CompanyId, RawRecord, RecordKey, ResolvedField, ResolvedRecord};
pub use resolver::FieldResolver;
pub use schema::*;
pub use series::{Series, SeriesEntry, TimeSeriesBuilder, YearData};
pub use standard::standard_catalog;
pub use store::{AsyncRawRecordStore, Filing, MemoryRecordStore, RawRecordStore};
pub use utils::*;
pub use vocabulary::{is_raw_field, raw_fields, VOCABULARY_VERSION};

use log::{debug, info};

/// Owns a frozen standard catalog and the settings every build shares.
pub struct AnalysisEngine {
    config: EngineConfig,
    catalog: DerivationCatalog,
}

impl AnalysisEngine {
    pub fn new(config: EngineConfig) -> Result<Self> {
        config.validate()?;

        info!(
            "Initializing analysis engine: {}-year window, fiscal year ending in month {}",
            config.window_years, config.fiscal_year_end_month
        );
        debug!(
            "Balance tolerance {}, {} estimation rules",
            config.balance_tolerance,
            config.estimations.len()
        );

        let catalog = standard_catalog(&config.estimations)?;
        Ok(Self { config, catalog })
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn catalog(&self) -> &DerivationCatalog {
        &self.catalog
    }

    pub fn schema(&self, id: SchemaId) -> Result<&AnalysisSchema> {
        self.catalog.schema(id)
    }

    pub fn builder(&self) -> TimeSeriesBuilder<'_> {
        TimeSeriesBuilder::with_config(&self.catalog, &self.config)
    }

    pub fn analyzer(&self) -> ComparativeAnalyzer {
        ComparativeAnalyzer::new(self.config.balance_tolerance)
    }

    /// Resolves one schema against a single record, outside any series.
    pub fn resolve(&self, record: &RawRecord, schema_id: SchemaId) -> Result<ResolvedRecord> {
        let schema = self.catalog.schema(schema_id)?;
        FieldResolver::new(&self.catalog).resolve_schema(record, schema)
    }

    pub fn build_series<S>(
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
        self.builder()
            .build(store, company, from_year, to_year, schema_id)
    }

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
        self.builder()
            .build_window(store, company, latest_year, schema_id)
    }

    pub async fn build_series_async<S>(
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
        self.builder()
            .build_async(store, company, from_year, to_year, schema_id)
            .await
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
        self.builder()
            .build_window_async(store, company, latest_year, schema_id)
            .await
    }

    /// Series for the window ending at `latest_year`, flagging every filed
    /// year whose balance does not tie.
    pub fn balance_series_with_ties<S>(
        &self,
        store: &S,
        company: &CompanyId,
        latest_year: i32,
    ) -> Result<(Series, Vec<i32>)>
    where
        S: RawRecordStore + ?Sized,
    {
        let series = self.build_window(store, company, latest_year, SchemaId::Balance)?;
        let analyzer = self.analyzer();
        let untied = series
            .filed()
            .filter(|record| !analyzer.check_balance_ties(record))
            .map(|record| record.fiscal_year())
            .collect();
        Ok((series, untied))
    }
}

/// JSON schema of the series every build emits.
pub fn output_json_schema() -> schemars::schema::RootSchema {
    schemars::schema_for!(Series)
}

pub fn config_json_schema() -> schemars::schema::RootSchema {
    schemars::schema_for!(EngineConfig)
}
