//! The built-in analyses: analytical P&L, balance-sheet masses and operating
//! funds needs, over the PGC-style raw vocabulary.
//!
//! Expense and liability amounts are filed as positive figures; the rules that
//! subtract them carry `SignPolicy::Negate` so they display with a minus sign.

use crate::catalog::{DerivationCatalog, DerivationRule, RuleKind, Term};
use crate::error::Result;
use crate::estimation::{register_estimations, EstimationRule};
use crate::schema::{AnalysisSchema, SchemaId, SchemaLine};
use crate::vocabulary as raw;
use log::{info, warn};

// Analytical P&L
pub const TURNOVER: &str = "turnover";
pub const INVENTORY_CHANGE: &str = "inventory_change";
pub const OWN_WORK_CAPITALIZED: &str = "own_work_capitalized";
pub const PRODUCTION_VALUE: &str = "production_value";
pub const PURCHASES: &str = "purchases";
pub const OTHER_INCOME: &str = "other_income";
pub const EXTERNAL_EXPENSES: &str = "external_expenses";
pub const ADDED_VALUE: &str = "added_value";
pub const STAFF_COSTS: &str = "staff_costs";
pub const GROSS_OPERATING_RESULT: &str = "gross_operating_result";
pub const AMORTIZATION: &str = "amortization";
pub const IMPAIRMENT: &str = "impairment";
pub const NON_RECURRING_RESULTS: &str = "non_recurring_results";
pub const NET_OPERATING_RESULT: &str = "net_operating_result";
pub const FINANCE_INCOME: &str = "finance_income";
pub const FINANCE_COSTS: &str = "finance_costs";
pub const FINANCIAL_RESULT: &str = "financial_result";
pub const RESULT_BEFORE_TAX: &str = "result_before_tax";
pub const CORPORATE_TAX: &str = "corporate_tax";
pub const NET_RESULT: &str = "net_result";

// Balance masses
pub const FIXED_ASSETS: &str = "fixed_assets";
pub const INVENTORY_STOCK: &str = "inventory_stock";
pub const RECEIVABLES: &str = "receivables";
pub const OTHER_CURRENT_ASSETS: &str = "other_current_assets";
pub const CASH: &str = "cash";
pub const CURRENT_ASSETS: &str = "current_assets";
pub const TOTAL_ASSETS: &str = "total_assets";
pub const EQUITY: &str = "equity";
pub const NON_CURRENT_LIABILITIES: &str = "non_current_liabilities";
pub const PERMANENT_RESOURCES: &str = "permanent_resources";
pub const CURRENT_LIABILITIES: &str = "current_liabilities";
pub const TOTAL_EQUITY_AND_LIABILITIES: &str = "total_equity_and_liabilities";
pub const WORKING_CAPITAL: &str = "working_capital";

// Operating funds needs
pub const PREPAID_EXPENSES: &str = "prepaid_expenses";
pub const OPERATING_CURRENT_ASSETS: &str = "operating_current_assets";
pub const SUPPLIERS: &str = "suppliers";
pub const OPERATING_FUNDS_NEEDS: &str = "operating_funds_needs";
pub const FUNDING_SURPLUS: &str = "funding_surplus";

fn profit_and_loss_rules() -> Vec<DerivationRule> {
    vec![
        DerivationRule::item(TURNOVER, raw::NET_TURNOVER),
        DerivationRule::item(INVENTORY_CHANGE, raw::INVENTORY_VARIATION),
        DerivationRule::item(OWN_WORK_CAPITALIZED, raw::CAPITALIZED_WORK),
        DerivationRule::sum_of(
            PRODUCTION_VALUE,
            RuleKind::Subtotal,
            &[TURNOVER, INVENTORY_CHANGE, OWN_WORK_CAPITALIZED],
        ),
        DerivationRule::item(PURCHASES, raw::SUPPLIES).negated(),
        DerivationRule::item(OTHER_INCOME, raw::OTHER_OPERATING_INCOME),
        DerivationRule::item(EXTERNAL_EXPENSES, raw::OTHER_OPERATING_EXPENSES).negated(),
        DerivationRule::subtotal(
            ADDED_VALUE,
            vec![
                Term::plus(PRODUCTION_VALUE),
                Term::minus(PURCHASES),
                Term::plus(OTHER_INCOME),
                Term::minus(EXTERNAL_EXPENSES),
            ],
        ),
        DerivationRule::item(STAFF_COSTS, raw::PERSONNEL_EXPENSES).negated(),
        DerivationRule::subtotal(
            GROSS_OPERATING_RESULT,
            vec![Term::plus(ADDED_VALUE), Term::minus(STAFF_COSTS)],
        ),
        DerivationRule::item(AMORTIZATION, raw::DEPRECIATION).negated(),
        DerivationRule::item(IMPAIRMENT, raw::IMPAIRMENT_AND_DISPOSALS).negated(),
        DerivationRule::item(NON_RECURRING_RESULTS, raw::OTHER_RESULTS),
        DerivationRule::subtotal(
            NET_OPERATING_RESULT,
            vec![
                Term::plus(GROSS_OPERATING_RESULT),
                Term::minus(AMORTIZATION),
                Term::minus(IMPAIRMENT),
                Term::plus(NON_RECURRING_RESULTS),
            ],
        ),
        DerivationRule::item(FINANCE_INCOME, raw::FINANCIAL_INCOME),
        DerivationRule::item(FINANCE_COSTS, raw::FINANCIAL_EXPENSES).negated(),
        DerivationRule::subtotal(
            FINANCIAL_RESULT,
            vec![Term::plus(FINANCE_INCOME), Term::minus(FINANCE_COSTS)],
        ),
        DerivationRule::sum_of(
            RESULT_BEFORE_TAX,
            RuleKind::Subtotal,
            &[NET_OPERATING_RESULT, FINANCIAL_RESULT],
        ),
        DerivationRule::item(CORPORATE_TAX, raw::INCOME_TAX).negated(),
        DerivationRule::total(
            NET_RESULT,
            vec![Term::plus(RESULT_BEFORE_TAX), Term::minus(CORPORATE_TAX)],
        ),
    ]
}

fn profit_and_loss_schema() -> AnalysisSchema {
    AnalysisSchema {
        id: SchemaId::ProfitAndLoss,
        title: "Analytical profit and loss".to_string(),
        base_field: Some(TURNOVER.to_string()),
        lines: vec![
            SchemaLine::new(TURNOVER, "Net turnover", 1),
            SchemaLine::new(INVENTORY_CHANGE, "Change in inventories", 1),
            SchemaLine::new(OWN_WORK_CAPITALIZED, "Work performed for own assets", 1),
            SchemaLine::new(PRODUCTION_VALUE, "Production value", 0).highlighted(),
            SchemaLine::new(PURCHASES, "Supplies", 1),
            SchemaLine::new(OTHER_INCOME, "Other operating income", 1),
            SchemaLine::new(EXTERNAL_EXPENSES, "Other operating expenses", 1),
            SchemaLine::new(ADDED_VALUE, "Added value", 0).highlighted(),
            SchemaLine::new(STAFF_COSTS, "Personnel expenses", 1),
            SchemaLine::new(GROSS_OPERATING_RESULT, "Gross operating result", 0).highlighted(),
            SchemaLine::new(AMORTIZATION, "Depreciation", 1),
            SchemaLine::new(IMPAIRMENT, "Impairment and disposals", 1),
            SchemaLine::new(NON_RECURRING_RESULTS, "Other results", 1),
            SchemaLine::new(NET_OPERATING_RESULT, "Net operating result", 0).highlighted(),
            SchemaLine::new(FINANCE_INCOME, "Financial income", 1),
            SchemaLine::new(FINANCE_COSTS, "Financial expenses", 1),
            SchemaLine::new(FINANCIAL_RESULT, "Financial result", 0).highlighted(),
            SchemaLine::new(RESULT_BEFORE_TAX, "Result before tax", 0).highlighted(),
            SchemaLine::new(CORPORATE_TAX, "Income tax", 1),
            SchemaLine::new(NET_RESULT, "Net result", 0).final_line(),
        ],
    }
}

fn balance_rules() -> Vec<DerivationRule> {
    vec![
        DerivationRule::sum_of(FIXED_ASSETS, RuleKind::Subtotal, raw::NON_CURRENT_ASSET_FIELDS),
        DerivationRule::item(INVENTORY_STOCK, raw::INVENTORY),
        DerivationRule::item(RECEIVABLES, raw::TRADE_RECEIVABLES),
        DerivationRule::sum_of(
            OTHER_CURRENT_ASSETS,
            RuleKind::Subtotal,
            &[
                raw::ASSETS_HELD_FOR_SALE,
                raw::SHORT_TERM_FINANCIAL_INVESTMENTS,
                raw::SHORT_TERM_ACCRUALS,
            ],
        ),
        DerivationRule::item(CASH, raw::CASH_EQUIVALENTS),
        DerivationRule::sum_of(
            CURRENT_ASSETS,
            RuleKind::Subtotal,
            &[INVENTORY_STOCK, RECEIVABLES, OTHER_CURRENT_ASSETS, CASH],
        ),
        DerivationRule::sum_of(TOTAL_ASSETS, RuleKind::Total, &[FIXED_ASSETS, CURRENT_ASSETS]),
        DerivationRule::sum_of(EQUITY, RuleKind::Subtotal, raw::EQUITY_FIELDS),
        DerivationRule::sum_of(
            NON_CURRENT_LIABILITIES,
            RuleKind::Subtotal,
            raw::NON_CURRENT_LIABILITY_FIELDS,
        ),
        DerivationRule::sum_of(
            PERMANENT_RESOURCES,
            RuleKind::Subtotal,
            &[EQUITY, NON_CURRENT_LIABILITIES],
        ),
        DerivationRule::sum_of(
            CURRENT_LIABILITIES,
            RuleKind::Subtotal,
            raw::CURRENT_LIABILITY_FIELDS,
        ),
        DerivationRule::sum_of(
            TOTAL_EQUITY_AND_LIABILITIES,
            RuleKind::Total,
            &[PERMANENT_RESOURCES, CURRENT_LIABILITIES],
        ),
        DerivationRule::subtotal(
            WORKING_CAPITAL,
            vec![Term::plus(PERMANENT_RESOURCES), Term::minus(FIXED_ASSETS)],
        ),
    ]
}

fn balance_schema() -> AnalysisSchema {
    AnalysisSchema {
        id: SchemaId::Balance,
        title: "Balance-sheet mass analysis".to_string(),
        base_field: Some(TOTAL_ASSETS.to_string()),
        lines: vec![
            SchemaLine::new(FIXED_ASSETS, "Non-current assets", 0).highlighted(),
            SchemaLine::new(INVENTORY_STOCK, "Inventories", 1),
            SchemaLine::new(RECEIVABLES, "Trade receivables", 1),
            SchemaLine::new(OTHER_CURRENT_ASSETS, "Other current assets", 1),
            SchemaLine::new(CASH, "Cash and equivalents", 1),
            SchemaLine::new(CURRENT_ASSETS, "Current assets", 0).highlighted(),
            SchemaLine::new(TOTAL_ASSETS, "Total assets", 0).highlighted(),
            SchemaLine::new(EQUITY, "Equity", 1),
            SchemaLine::new(NON_CURRENT_LIABILITIES, "Non-current liabilities", 1),
            SchemaLine::new(PERMANENT_RESOURCES, "Permanent resources", 0).highlighted(),
            SchemaLine::new(CURRENT_LIABILITIES, "Current liabilities", 0).highlighted(),
            SchemaLine::new(
                TOTAL_EQUITY_AND_LIABILITIES,
                "Total equity and liabilities",
                0,
            )
            .highlighted(),
            SchemaLine::new(WORKING_CAPITAL, "Working capital", 0).final_line(),
        ],
    }
}

// Reuses the balance rules for inventories, receivables and working capital.
fn operating_funds_rules() -> Vec<DerivationRule> {
    vec![
        DerivationRule::item(PREPAID_EXPENSES, raw::SHORT_TERM_ACCRUALS),
        DerivationRule::sum_of(
            OPERATING_CURRENT_ASSETS,
            RuleKind::Subtotal,
            &[INVENTORY_STOCK, RECEIVABLES, PREPAID_EXPENSES],
        ),
        DerivationRule::item(SUPPLIERS, raw::TRADE_PAYABLES).negated(),
        DerivationRule::total(
            OPERATING_FUNDS_NEEDS,
            vec![Term::plus(OPERATING_CURRENT_ASSETS), Term::minus(SUPPLIERS)],
        ),
        DerivationRule::total(
            FUNDING_SURPLUS,
            vec![Term::plus(WORKING_CAPITAL), Term::minus(OPERATING_FUNDS_NEEDS)],
        ),
    ]
}

fn operating_funds_schema() -> AnalysisSchema {
    AnalysisSchema {
        id: SchemaId::OperatingFunds,
        title: "Working capital and operating funds needs".to_string(),
        base_field: Some(OPERATING_CURRENT_ASSETS.to_string()),
        lines: vec![
            SchemaLine::new(INVENTORY_STOCK, "Inventories", 1),
            SchemaLine::new(RECEIVABLES, "Trade receivables", 1),
            SchemaLine::new(PREPAID_EXPENSES, "Short-term accruals", 1),
            SchemaLine::new(OPERATING_CURRENT_ASSETS, "Operating current assets", 0)
                .highlighted(),
            SchemaLine::new(SUPPLIERS, "Trade payables", 1),
            SchemaLine::new(OPERATING_FUNDS_NEEDS, "Operating funds needs (NOF)", 0)
                .highlighted(),
            SchemaLine::new(WORKING_CAPITAL, "Working capital", 0).highlighted(),
            SchemaLine::new(FUNDING_SURPLUS, "Funding surplus / (deficit)", 0).final_line(),
        ],
    }
}

/// Places estimated lines right below their parent line (after any earlier
/// estimate of the same parent), or at the end when the parent is not shown.
fn place_estimated_lines(
    schema: &mut AnalysisSchema,
    estimations: &[EstimationRule],
    lines: Vec<SchemaLine>,
) {
    for (rule, mut line) in estimations.iter().zip(lines) {
        let anchor = schema.lines.iter().rposition(|existing| {
            existing.field == rule.parent
                || estimations
                    .iter()
                    .any(|e| e.name == existing.field && e.parent == rule.parent)
        });

        match anchor {
            Some(idx) => {
                let parent_indent = schema
                    .lines
                    .iter()
                    .find(|existing| existing.field == rule.parent)
                    .map_or(schema.lines[idx].indent, |parent| parent.indent);
                line.indent = parent_indent + 1;
                schema.lines.insert(idx + 1, line);
            }
            None => schema.lines.push(line),
        }
    }
}

/// Builds and freezes the catalog of the three standard analyses, with any
/// configured estimation rules registered under the operating funds analysis.
pub fn standard_catalog(estimations: &[EstimationRule]) -> Result<DerivationCatalog> {
    let mut catalog = DerivationCatalog::from_rules(
        profit_and_loss_rules()
            .into_iter()
            .chain(balance_rules())
            .chain(operating_funds_rules()),
    )?;

    let mut operating_funds = operating_funds_schema();
    if !estimations.is_empty() {
        warn!(
            "{} estimated sub-lines enabled; their values are approximations, not filed data",
            estimations.len()
        );
        let lines = register_estimations(&mut catalog, estimations, 2)?;
        place_estimated_lines(&mut operating_funds, estimations, lines);
    }

    catalog.register_schema(profit_and_loss_schema())?;
    catalog.register_schema(balance_schema())?;
    catalog.register_schema(operating_funds)?;
    catalog.freeze();

    info!(
        "Standard catalog ready: {} rules across {} analyses",
        catalog.len(),
        SchemaId::ALL.len()
    );

    Ok(catalog)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::SignPolicy;
    use crate::error::DerivationError;

    #[test]
    fn test_standard_catalog_builds_and_freezes() {
        let catalog = standard_catalog(&[]).unwrap();
        assert!(catalog.is_frozen());
        for id in SchemaId::ALL {
            let schema = catalog.schema(id).unwrap();
            assert!(schema.final_line().is_some(), "{} has no final line", id);
        }
    }

    #[test]
    fn test_expense_lines_display_negated() {
        let catalog = standard_catalog(&[]).unwrap();
        for name in [PURCHASES, EXTERNAL_EXPENSES, STAFF_COSTS, AMORTIZATION, SUPPLIERS] {
            assert_eq!(catalog.lookup(name).unwrap().sign_policy, SignPolicy::Negate);
        }
        assert_eq!(catalog.lookup(TURNOVER).unwrap().sign_policy, SignPolicy::AsIs);
    }

    #[test]
    fn test_estimated_lines_follow_parent() {
        let catalog = standard_catalog(&EstimationRule::inventory_breakdown()).unwrap();
        let schema = catalog.schema(SchemaId::OperatingFunds).unwrap();
        let fields: Vec<&str> = schema.fields().collect();

        assert_eq!(
            &fields[..5],
            &[
                INVENTORY_STOCK,
                "raw_materials",
                "work_in_progress",
                "finished_goods",
                RECEIVABLES
            ]
        );
        assert_eq!(schema.line("raw_materials").unwrap().indent, 2);
        assert!(catalog.lookup("finished_goods").unwrap().estimated);
    }

    #[test]
    fn test_estimation_cannot_shadow_standard_rule() {
        let rules = vec![EstimationRule::new(
            WORKING_CAPITAL,
            "Working capital (est.)",
            INVENTORY_STOCK,
            rust_decimal_macros::dec!(0.5),
        )];
        assert!(matches!(
            standard_catalog(&rules),
            Err(DerivationError::DuplicateField(name)) if name == WORKING_CAPITAL
        ));
    }
}
