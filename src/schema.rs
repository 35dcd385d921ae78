use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, JsonSchema,
)]
#[serde(rename_all = "PascalCase")]
pub enum SchemaId {
    #[schemars(
        description = "Analytical profit and loss: production value, added value, gross and net operating result down to net result"
    )]
    ProfitAndLoss,

    #[schemars(
        description = "Balance-sheet mass analysis: fixed and current assets against equity, non-current and current liabilities"
    )]
    Balance,

    #[schemars(
        description = "Working capital and operating funds needs (NOF): operating current assets net of trade payables"
    )]
    OperatingFunds,
}

impl SchemaId {
    pub const ALL: [SchemaId; 3] = [
        SchemaId::ProfitAndLoss,
        SchemaId::Balance,
        SchemaId::OperatingFunds,
    ];
}

impl fmt::Display for SchemaId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SchemaId::ProfitAndLoss => "profit_and_loss",
            SchemaId::Balance => "balance",
            SchemaId::OperatingFunds => "operating_funds",
        };
        f.write_str(name)
    }
}

/// One row of an analysis as the presentation layer lays it out. The engine
/// carries this metadata through untouched.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct SchemaLine {
    #[schemars(description = "Name of the derivation rule this row shows")]
    pub field: String,

    #[schemars(description = "Human readable row label")]
    pub label: String,

    #[schemars(description = "Indentation level, 0 for top-level masses")]
    pub indent: u8,

    #[serde(default)]
    #[schemars(description = "Row is rendered emphasised (subtotals)")]
    pub highlight: bool,

    #[serde(default)]
    #[schemars(description = "Row is the closing figure of the analysis")]
    pub is_final: bool,
}

impl SchemaLine {
    pub fn new(field: impl Into<String>, label: impl Into<String>, indent: u8) -> Self {
        Self {
            field: field.into(),
            label: label.into(),
            indent,
            highlight: false,
            is_final: false,
        }
    }

    pub fn highlighted(mut self) -> Self {
        self.highlight = true;
        self
    }

    pub fn final_line(mut self) -> Self {
        self.highlight = true;
        self.is_final = true;
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct AnalysisSchema {
    pub id: SchemaId,

    pub title: String,

    #[schemars(
        description = "Field every line is expressed against in percentage-of-base (vertical) analysis, e.g. net turnover or total assets"
    )]
    pub base_field: Option<String>,

    pub lines: Vec<SchemaLine>,
}

impl AnalysisSchema {
    pub fn fields(&self) -> impl Iterator<Item = &str> {
        self.lines.iter().map(|line| line.field.as_str())
    }

    pub fn line(&self, field: &str) -> Option<&SchemaLine> {
        self.lines.iter().find(|line| line.field == field)
    }

    pub fn final_line(&self) -> Option<&SchemaLine> {
        self.lines.iter().find(|line| line.is_final)
    }

    pub fn generate_json_schema() -> schemars::schema::RootSchema {
        schemars::schema_for!(AnalysisSchema)
    }
}
