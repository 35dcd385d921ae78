use crate::error::{DerivationError, Result};
use crate::estimation::{validate_estimations, EstimationRule};
use crate::utils::validate_fiscal_year_end_month;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

pub const DEFAULT_WINDOW_YEARS: u32 = 5;
pub const DEFAULT_BALANCE_TOLERANCE: Decimal = dec!(0.01);

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(default)]
pub struct EngineConfig {
    #[schemars(description = "Number of consecutive fiscal years in a rolling window")]
    pub window_years: u32,

    #[schemars(
        description = "The month when the fiscal year ends (1 = January, 12 = December)"
    )]
    pub fiscal_year_end_month: u32,

    #[schemars(
        description = "Largest difference between total assets and total equity plus liabilities that still counts as balanced"
    )]
    pub balance_tolerance: Decimal,

    #[schemars(
        description = "Optional estimated sub-lines of the operating funds analysis. These are approximations, not filed data."
    )]
    pub estimations: Vec<EstimationRule>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            window_years: DEFAULT_WINDOW_YEARS,
            fiscal_year_end_month: 12,
            balance_tolerance: DEFAULT_BALANCE_TOLERANCE,
            estimations: Vec::new(),
        }
    }
}

impl EngineConfig {
    pub fn validate(&self) -> Result<()> {
        if self.window_years == 0 {
            return Err(DerivationError::InvalidWindow(self.window_years));
        }
        validate_fiscal_year_end_month(self.fiscal_year_end_month)?;
        // The tie check is strict, so a zero tolerance could never be met.
        if self.balance_tolerance <= Decimal::ZERO {
            return Err(DerivationError::InvalidTolerance(self.balance_tolerance));
        }
        validate_estimations(&self.estimations)
    }

    pub fn from_json(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn with_estimations(mut self, estimations: Vec<EstimationRule>) -> Self {
        self.estimations = estimations;
        self
    }
}
