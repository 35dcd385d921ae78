//! Estimated sub-lines: fixed shares of a filed or derived parent, e.g. the
//! part of inventory taken to be raw materials. These are approximations, not
//! filed data, and every rule they produce is flagged `estimated`.

use crate::catalog::{DerivationCatalog, DerivationRule};
use crate::error::{DerivationError, Result};
use crate::schema::SchemaLine;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct EstimationRule {
    #[schemars(description = "Name of the estimated field, must not clash with an existing rule")]
    pub name: String,

    pub label: String,

    #[schemars(description = "Raw field or registered rule the share is taken from")]
    pub parent: String,

    #[schemars(description = "Fraction of the parent, between 0.0 and 1.0")]
    pub share: Decimal,
}

impl EstimationRule {
    pub fn new(
        name: impl Into<String>,
        label: impl Into<String>,
        parent: impl Into<String>,
        share: Decimal,
    ) -> Self {
        Self {
            name: name.into(),
            label: label.into(),
            parent: parent.into(),
            share,
        }
    }

    /// Conventional split of inventory into raw materials, work in progress
    /// and finished goods when the filing does not break it down.
    pub fn inventory_breakdown() -> Vec<Self> {
        vec![
            Self::new("raw_materials", "Raw materials (est.)", "inventory_stock", dec!(0.37)),
            Self::new(
                "work_in_progress",
                "Work in progress (est.)",
                "inventory_stock",
                dec!(0.18),
            ),
            Self::new(
                "finished_goods",
                "Finished goods (est.)",
                "inventory_stock",
                dec!(0.45),
            ),
        ]
    }

    pub fn to_rule(&self) -> DerivationRule {
        DerivationRule::estimated_share(self.name.clone(), self.parent.clone(), self.share)
    }

    pub fn to_line(&self, indent: u8) -> SchemaLine {
        SchemaLine::new(self.name.clone(), self.label.clone(), indent)
    }
}

/// Checks share bounds and that shares of one parent do not exceed the parent.
pub fn validate_estimations(rules: &[EstimationRule]) -> Result<()> {
    let mut per_parent: BTreeMap<&str, Decimal> = BTreeMap::new();

    for rule in rules {
        if rule.share < Decimal::ZERO || rule.share > Decimal::ONE {
            return Err(DerivationError::InvalidEstimation {
                name: rule.name.clone(),
                details: format!("share {} must be between 0 and 1", rule.share),
            });
        }

        let total = per_parent.entry(rule.parent.as_str()).or_default();
        *total += rule.share;
        if *total > Decimal::ONE {
            return Err(DerivationError::InvalidEstimation {
                name: rule.name.clone(),
                details: format!(
                    "shares of '{}' add up to {} (more than the parent)",
                    rule.parent, total
                ),
            });
        }
    }

    Ok(())
}

/// Validates and registers estimation rules, returning the schema lines to
/// append under the analysis that shows them.
pub fn register_estimations(
    catalog: &mut DerivationCatalog,
    rules: &[EstimationRule],
    indent: u8,
) -> Result<Vec<SchemaLine>> {
    validate_estimations(rules)?;

    let mut lines = Vec::with_capacity(rules.len());
    for rule in rules {
        catalog.register(rule.to_rule())?;
        lines.push(rule.to_line(indent));
    }
    Ok(lines)
}
