//! Relational figures around resolved data: period-over-period variation,
//! percentage of a base, and the balance tie.
//!
//! Every percentage degrades to zero on a zero denominator. Callers rely on
//! that instead of special-casing, so growth from a zero base reads as 0 %.

use crate::config::DEFAULT_BALANCE_TOLERANCE;
use crate::record::ResolvedRecord;
use crate::schema::AnalysisSchema;
use crate::series::Series;
use crate::standard::{TOTAL_ASSETS, TOTAL_EQUITY_AND_LIABILITIES};
use log::warn;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

const ONE_HUNDRED: Decimal = dec!(100);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct Variation {
    pub absolute: Decimal,
    pub percent: Decimal,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct BalanceTie {
    pub total_assets: Decimal,
    pub total_equity_and_liabilities: Decimal,
    pub difference: Decimal,
    pub ties: bool,
}

/// One schema line compared between two periods.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct LineComparison {
    pub field: String,
    pub current: Decimal,
    pub previous: Decimal,
    pub variation: Variation,
}

/// One schema line as a percentage of the schema's base field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct LineShare {
    pub field: String,
    pub value: Decimal,
    pub percent_of_base: Decimal,
}

/// Variation of a field between a year and the fiscal year before it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct YearOverYear {
    pub fiscal_year: i32,
    /// `None` when either year is absent or lacks the field.
    pub variation: Option<Variation>,
}

pub fn variation(current: Decimal, previous: Decimal) -> Variation {
    let absolute = current - previous;
    Variation {
        absolute,
        percent: ratio_percent(absolute, previous.abs()),
    }
}

pub fn percent_of_base(value: Decimal, base: Decimal) -> Decimal {
    ratio_percent(value, base)
}

fn ratio_percent(numerator: Decimal, denominator: Decimal) -> Decimal {
    if denominator.is_zero() {
        return Decimal::ZERO;
    }
    numerator
        .checked_div(denominator)
        .and_then(|ratio| ratio.checked_mul(ONE_HUNDRED))
        .unwrap_or(Decimal::ZERO)
}

pub struct ComparativeAnalyzer {
    tolerance: Decimal,
}

impl Default for ComparativeAnalyzer {
    fn default() -> Self {
        Self::new(DEFAULT_BALANCE_TOLERANCE)
    }
}

impl ComparativeAnalyzer {
    pub fn new(tolerance: Decimal) -> Self {
        Self { tolerance }
    }

    pub fn tolerance(&self) -> Decimal {
        self.tolerance
    }

    pub fn variation(&self, current: Decimal, previous: Decimal) -> Variation {
        variation(current, previous)
    }

    pub fn percent_of_base(&self, value: Decimal, base: Decimal) -> Decimal {
        percent_of_base(value, base)
    }

    /// Both balance totals and whether they tie. `None` when the record is
    /// not a balance resolution (it lacks either total).
    pub fn balance_tie(&self, record: &ResolvedRecord) -> Option<BalanceTie> {
        let total_assets = record.value(TOTAL_ASSETS)?;
        let total_equity_and_liabilities = record.value(TOTAL_EQUITY_AND_LIABILITIES)?;
        let difference = total_assets - total_equity_and_liabilities;

        Some(BalanceTie {
            total_assets,
            total_equity_and_liabilities,
            difference,
            ties: difference.abs() < self.tolerance,
        })
    }

    /// Advisory: a record that does not tie is a data-quality signal, never
    /// an error.
    pub fn check_balance_ties(&self, record: &ResolvedRecord) -> bool {
        match self.balance_tie(record) {
            Some(tie) if tie.ties => true,
            Some(tie) => {
                warn!(
                    "Balance for {} does not tie: assets {} vs equity and liabilities {} (difference {})",
                    record.key, tie.total_assets, tie.total_equity_and_liabilities, tie.difference
                );
                false
            }
            None => false,
        }
    }

    /// Line-by-line variation of every schema line present in both records.
    pub fn compare_records(
        &self,
        current: &ResolvedRecord,
        previous: &ResolvedRecord,
        schema: &AnalysisSchema,
    ) -> Vec<LineComparison> {
        schema
            .fields()
            .filter_map(|field| {
                let current_value = current.value(field)?;
                let previous_value = previous.value(field)?;
                Some(LineComparison {
                    field: field.to_string(),
                    current: current_value,
                    previous: previous_value,
                    variation: variation(current_value, previous_value),
                })
            })
            .collect()
    }

    /// Every schema line as a percentage of the schema's base field. Empty
    /// when the schema declares no base.
    pub fn vertical_analysis(
        &self,
        record: &ResolvedRecord,
        schema: &AnalysisSchema,
    ) -> Vec<LineShare> {
        let Some(base) = schema
            .base_field
            .as_deref()
            .map(|field| record.value(field).unwrap_or(Decimal::ZERO))
        else {
            return Vec::new();
        };

        schema
            .fields()
            .filter_map(|field| {
                let value = record.value(field)?;
                Some(LineShare {
                    field: field.to_string(),
                    value,
                    percent_of_base: percent_of_base(value, base),
                })
            })
            .collect()
    }

    /// For each entry, the variation of `field` against the previous fiscal
    /// year, positionally aligned with the series.
    pub fn year_over_year(&self, series: &Series, field: &str) -> Vec<YearOverYear> {
        series
            .iter()
            .map(|entry| {
                let current = entry.data.record().and_then(|r| r.value(field));
                let previous = entry
                    .fiscal_year
                    .checked_sub(1)
                    .and_then(|year| series.record(year))
                    .and_then(|r| r.value(field));

                YearOverYear {
                    fiscal_year: entry.fiscal_year,
                    variation: current
                        .zip(previous)
                        .map(|(current, previous)| variation(current, previous)),
                }
            })
            .collect()
    }
}

pub fn check_balance_ties(record: &ResolvedRecord) -> bool {
    ComparativeAnalyzer::default().check_balance_ties(record)
}
