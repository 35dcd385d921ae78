use rust_decimal::Decimal;
use thiserror::Error;

/// Boxed error returned by a record store when a fetch actually fails
/// (as opposed to the year simply not being filed).
pub type StoreError = Box<dyn std::error::Error + Send + Sync + 'static>;

#[derive(Error, Debug)]
pub enum DerivationError {
    #[error("Field '{0}' is already registered in the catalog")]
    DuplicateField(String),

    #[error("Rule '{field}' depends on '{dependency}', which is neither a raw field nor a registered rule")]
    UnknownDependency { field: String, dependency: String },

    #[error("Catalog is frozen: cannot register '{0}'")]
    CatalogFrozen(String),

    #[error("Rule '{0}' shadows a raw field of the same name")]
    RawFieldShadowed(String),

    #[error("Unknown field: {0}")]
    UnknownField(String),

    #[error("Unknown schema: {0}")]
    UnknownSchema(String),

    #[error("Cyclic dependency while resolving '{field}': {}", .path.join(" -> "))]
    CyclicDependency { field: String, path: Vec<String> },

    #[error("Invalid year range {from}..={to}: start year is after end year")]
    InvalidYearRange { from: i32, to: i32 },

    #[error("Invalid window length {0}: must be at least 1 year")]
    InvalidWindow(u32),

    #[error("Invalid fiscal year end month {0}: must be between 1 and 12")]
    InvalidFiscalYearEndMonth(u32),

    #[error("Invalid balance tolerance {0}: must be greater than zero")]
    InvalidTolerance(Decimal),

    #[error("Invalid estimation rule '{name}': {details}")]
    InvalidEstimation { name: String, details: String },

    #[error("Record store failed for company {company} in {fiscal_year}: {source}")]
    Store {
        company: String,
        fiscal_year: i32,
        #[source]
        source: StoreError,
    },

    #[error("Record store returned the filing of {found} when asked for {requested}")]
    RecordMismatch { requested: String, found: String },

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),
}

impl DerivationError {
    /// Catalog-construction and resolution errors indicate a defective schema
    /// rather than bad input data and must not be retried.
    pub fn is_fatal(&self) -> bool {
        !matches!(self, DerivationError::Store { .. })
    }
}

pub type Result<T> = std::result::Result<T, DerivationError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_store_errors_are_not_fatal() {
        let err = DerivationError::Store {
            company: "ACME".to_string(),
            fiscal_year: 2023,
            source: "timeout".into(),
        };
        assert!(!err.is_fatal());
        assert_eq!(
            err.to_string(),
            "Record store failed for company ACME in 2023: timeout"
        );
    }

    #[test]
    fn test_schema_errors_are_fatal() {
        assert!(DerivationError::DuplicateField("turnover".to_string()).is_fatal());
        assert!(DerivationError::UnknownField("ebitda".to_string()).is_fatal());

        let cycle = DerivationError::CyclicDependency {
            field: "a".to_string(),
            path: vec!["a".to_string(), "b".to_string(), "a".to_string()],
        };
        assert!(cycle.is_fatal());
        assert_eq!(cycle.to_string(), "Cyclic dependency while resolving 'a': a -> b -> a");
    }
}
