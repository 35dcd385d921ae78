//! Fixed vocabulary of raw ledger-aggregate keys, following the PGC-style
//! chart of accounts. Adding a key is compatible; renaming one is breaking and
//! must bump [`VOCABULARY_VERSION`].

pub const VOCABULARY_VERSION: u32 = 1;

// Income statement
pub const NET_TURNOVER: &str = "net_turnover";
pub const INVENTORY_VARIATION: &str = "inventory_variation";
pub const CAPITALIZED_WORK: &str = "capitalized_work";
pub const SUPPLIES: &str = "supplies";
pub const OTHER_OPERATING_INCOME: &str = "other_operating_income";
pub const OTHER_OPERATING_EXPENSES: &str = "other_operating_expenses";
pub const PERSONNEL_EXPENSES: &str = "personnel_expenses";
pub const DEPRECIATION: &str = "depreciation";
pub const IMPAIRMENT_AND_DISPOSALS: &str = "impairment_and_disposals";
pub const OTHER_RESULTS: &str = "other_results";
pub const FINANCIAL_INCOME: &str = "financial_income";
pub const FINANCIAL_EXPENSES: &str = "financial_expenses";
pub const INCOME_TAX: &str = "income_tax";

// Non-current assets
pub const INTANGIBLE_ASSETS: &str = "intangible_assets";
pub const TANGIBLE_ASSETS: &str = "tangible_assets";
pub const REAL_ESTATE_INVESTMENTS: &str = "real_estate_investments";
pub const LONG_TERM_FINANCIAL_INVESTMENTS: &str = "long_term_financial_investments";
pub const DEFERRED_TAX_ASSETS: &str = "deferred_tax_assets";

// Current assets
pub const ASSETS_HELD_FOR_SALE: &str = "assets_held_for_sale";
pub const INVENTORY: &str = "inventory";
pub const TRADE_RECEIVABLES: &str = "trade_receivables";
pub const SHORT_TERM_FINANCIAL_INVESTMENTS: &str = "short_term_financial_investments";
pub const SHORT_TERM_ACCRUALS: &str = "short_term_accruals";
pub const CASH_EQUIVALENTS: &str = "cash_equivalents";

// Equity
pub const SHARE_CAPITAL: &str = "share_capital";
pub const SHARE_PREMIUM: &str = "share_premium";
pub const RESERVES: &str = "reserves";
pub const RETAINED_EARNINGS: &str = "retained_earnings";
pub const PROFIT_FOR_YEAR: &str = "profit_for_year";
pub const GRANTS_AND_DONATIONS: &str = "grants_and_donations";

// Non-current liabilities
pub const LONG_TERM_PROVISIONS: &str = "long_term_provisions";
pub const LONG_TERM_DEBTS: &str = "long_term_debts";
pub const LONG_TERM_GROUP_DEBTS: &str = "long_term_group_debts";
pub const DEFERRED_TAX_LIABILITIES: &str = "deferred_tax_liabilities";

// Current liabilities
pub const SHORT_TERM_PROVISIONS: &str = "short_term_provisions";
pub const SHORT_TERM_DEBTS: &str = "short_term_debts";
pub const TRADE_PAYABLES: &str = "trade_payables";
pub const OTHER_CURRENT_LIABILITIES: &str = "other_current_liabilities";

pub const INCOME_STATEMENT_FIELDS: &[&str] = &[
    NET_TURNOVER,
    INVENTORY_VARIATION,
    CAPITALIZED_WORK,
    SUPPLIES,
    OTHER_OPERATING_INCOME,
    OTHER_OPERATING_EXPENSES,
    PERSONNEL_EXPENSES,
    DEPRECIATION,
    IMPAIRMENT_AND_DISPOSALS,
    OTHER_RESULTS,
    FINANCIAL_INCOME,
    FINANCIAL_EXPENSES,
    INCOME_TAX,
];

pub const NON_CURRENT_ASSET_FIELDS: &[&str] = &[
    INTANGIBLE_ASSETS,
    TANGIBLE_ASSETS,
    REAL_ESTATE_INVESTMENTS,
    LONG_TERM_FINANCIAL_INVESTMENTS,
    DEFERRED_TAX_ASSETS,
];

pub const CURRENT_ASSET_FIELDS: &[&str] = &[
    ASSETS_HELD_FOR_SALE,
    INVENTORY,
    TRADE_RECEIVABLES,
    SHORT_TERM_FINANCIAL_INVESTMENTS,
    SHORT_TERM_ACCRUALS,
    CASH_EQUIVALENTS,
];

pub const EQUITY_FIELDS: &[&str] = &[
    SHARE_CAPITAL,
    SHARE_PREMIUM,
    RESERVES,
    RETAINED_EARNINGS,
    PROFIT_FOR_YEAR,
    GRANTS_AND_DONATIONS,
];

pub const NON_CURRENT_LIABILITY_FIELDS: &[&str] = &[
    LONG_TERM_PROVISIONS,
    LONG_TERM_DEBTS,
    LONG_TERM_GROUP_DEBTS,
    DEFERRED_TAX_LIABILITIES,
];

pub const CURRENT_LIABILITY_FIELDS: &[&str] = &[
    SHORT_TERM_PROVISIONS,
    SHORT_TERM_DEBTS,
    TRADE_PAYABLES,
    OTHER_CURRENT_LIABILITIES,
];

/// Every raw key, grouped by statement section.
pub const RAW_FIELD_GROUPS: &[&[&str]] = &[
    INCOME_STATEMENT_FIELDS,
    NON_CURRENT_ASSET_FIELDS,
    CURRENT_ASSET_FIELDS,
    EQUITY_FIELDS,
    NON_CURRENT_LIABILITY_FIELDS,
    CURRENT_LIABILITY_FIELDS,
];

pub fn is_raw_field(name: &str) -> bool {
    RAW_FIELD_GROUPS
        .iter()
        .any(|group| group.contains(&name))
}

pub fn raw_fields() -> impl Iterator<Item = &'static str> {
    RAW_FIELD_GROUPS.iter().flat_map(|group| group.iter().copied())
}
