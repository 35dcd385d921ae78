use crate::catalog::SignPolicy;
use crate::error::{DerivationError, Result};
use crate::schema::SchemaId;
use crate::vocabulary::is_raw_field;
use rust_decimal::Decimal;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(transparent)]
pub struct CompanyId(pub String);

impl CompanyId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }
}

impl fmt::Display for CompanyId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Identity of a raw record. Memoized values are keyed by it.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, JsonSchema)]
pub struct RecordKey {
    pub company_id: CompanyId,
    pub fiscal_year: i32,
}

impl fmt::Display for RecordKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.company_id, self.fiscal_year)
    }
}

/// One filing: the raw ledger aggregates of a company for a fiscal year.
///
/// Keys outside the raw vocabulary are rejected on construction. Keys the
/// filing does not contain read as zero.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RawRecord {
    key: RecordKey,
    fields: BTreeMap<String, Decimal>,
}

#[derive(Deserialize)]
struct RawRecordRepr {
    company_id: CompanyId,
    fiscal_year: i32,
    #[serde(default)]
    fields: BTreeMap<String, Decimal>,
}

impl RawRecord {
    pub fn new(
        company_id: CompanyId,
        fiscal_year: i32,
        fields: BTreeMap<String, Decimal>,
    ) -> Result<Self> {
        if let Some(unknown) = fields.keys().find(|name| !is_raw_field(name)) {
            return Err(DerivationError::UnknownField(unknown.clone()));
        }

        Ok(Self {
            key: RecordKey {
                company_id,
                fiscal_year,
            },
            fields,
        })
    }

    /// Convenience constructor from `(field, amount)` pairs.
    pub fn from_pairs<'a, I>(company_id: CompanyId, fiscal_year: i32, pairs: I) -> Result<Self>
    where
        I: IntoIterator<Item = (&'a str, Decimal)>,
    {
        let fields = pairs
            .into_iter()
            .map(|(name, value)| (name.to_string(), value))
            .collect();
        Self::new(company_id, fiscal_year, fields)
    }

    pub fn from_json(json: &str) -> Result<Self> {
        let repr: RawRecordRepr = serde_json::from_str(json)?;
        Self::new(repr.company_id, repr.fiscal_year, repr.fields)
    }

    pub fn key(&self) -> &RecordKey {
        &self.key
    }

    pub fn company_id(&self) -> &CompanyId {
        &self.key.company_id
    }

    pub fn fiscal_year(&self) -> i32 {
        self.key.fiscal_year
    }

    /// The filed amount, or zero when the filing omits the field.
    pub fn get(&self, field: &str) -> Decimal {
        self.fields.get(field).copied().unwrap_or(Decimal::ZERO)
    }

    pub fn is_filed(&self, field: &str) -> bool {
        self.fields.contains_key(field)
    }

    pub fn fields(&self) -> &BTreeMap<String, Decimal> {
        &self.fields
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct ResolvedField {
    pub field: String,
    pub value: Decimal,
    pub sign_policy: SignPolicy,
    /// Set when the value comes from an estimation rule rather than filed data.
    pub estimated: bool,
}

impl ResolvedField {
    pub fn display_value(&self) -> Decimal {
        self.sign_policy.apply(self.value)
    }
}

/// Every line of one schema evaluated against one raw record, in schema order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct ResolvedRecord {
    pub key: RecordKey,
    pub schema: SchemaId,
    pub fields: Vec<ResolvedField>,
}

impl ResolvedRecord {
    pub fn fiscal_year(&self) -> i32 {
        self.key.fiscal_year
    }

    pub fn field(&self, name: &str) -> Option<&ResolvedField> {
        self.fields.iter().find(|f| f.field == name)
    }

    pub fn value(&self, name: &str) -> Option<Decimal> {
        self.field(name).map(|f| f.value)
    }

    /// The value as the presentation layer shows it, with the sign policy applied.
    pub fn display_value(&self, name: &str) -> Option<Decimal> {
        self.field(name).map(ResolvedField::display_value)
    }

    pub fn has_estimates(&self) -> bool {
        self.fields.iter().any(|f| f.estimated)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_missing_fields_read_as_zero() {
        let record = RawRecord::from_pairs(
            CompanyId::new("ACME"),
            2023,
            [("net_turnover", dec!(1_000))],
        )
        .unwrap();

        assert_eq!(record.get("net_turnover"), dec!(1_000));
        assert_eq!(record.get("inventory"), Decimal::ZERO);
        assert!(!record.is_filed("inventory"));
    }

    #[test]
    fn test_unknown_raw_field_rejected() {
        let result = RawRecord::from_pairs(CompanyId::new("ACME"), 2023, [("ebitda", dec!(1))]);
        assert!(matches!(result, Err(DerivationError::UnknownField(name)) if name == "ebitda"));
    }

    #[test]
    fn test_from_json() {
        let json = r#"{
            "company_id": "ACME",
            "fiscal_year": 2022,
            "fields": { "inventory": "1500.50", "trade_payables": "-20" }
        }"#;

        let record = RawRecord::from_json(json).unwrap();
        assert_eq!(record.fiscal_year(), 2022);
        assert_eq!(record.company_id(), &CompanyId::new("ACME"));
        assert_eq!(record.get("inventory"), dec!(1500.50));
        assert_eq!(record.get("trade_payables"), dec!(-20));
    }
}
