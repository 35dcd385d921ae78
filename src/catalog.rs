//! Declarative derivation rules and the catalog that holds them.
//!
//! Rules must be registered in dependency order: a rule may only reference raw
//! vocabulary keys or rules registered before it, so a catalog built through
//! [`DerivationCatalog::register`] is acyclic by construction.

use crate::error::{DerivationError, Result};
use crate::schema::{AnalysisSchema, SchemaId};
use crate::vocabulary::is_raw_field;
use log::debug;
use rust_decimal::Decimal;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum RuleKind {
    #[default]
    Item,
    Subtotal,
    Total,
}

/// Whether the presentation layer shows the resolved value negated. Used for
/// lines that are subtracted in their analysis (expenses, payables).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum SignPolicy {
    #[default]
    AsIs,
    Negate,
}

impl SignPolicy {
    pub fn apply(self, value: Decimal) -> Decimal {
        match self {
            SignPolicy::AsIs => value,
            SignPolicy::Negate => -value,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum TermSign {
    Plus,
    Minus,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct Term {
    pub field: String,
    pub sign: TermSign,
}

impl Term {
    pub fn plus(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            sign: TermSign::Plus,
        }
    }

    pub fn minus(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            sign: TermSign::Minus,
        }
    }
}

/// Read-only accessor a formula evaluates against. Raw keys read from the
/// filing; derived names resolve recursively.
pub trait FieldSource {
    fn value(&mut self, field: &str) -> Result<Decimal>;
}

/// How a derived field is computed. Formulas only add, subtract or take a
/// fixed share; ratios belong to the comparative analysis.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum Formula {
    /// A single raw field as filed.
    Raw { field: String },

    /// Signed sum of raw or derived fields.
    Linear { terms: Vec<Term> },

    /// A fixed fraction of another field. Only estimation rules use this.
    Share { parent: String, share: Decimal },
}

impl Formula {
    pub fn dependencies(&self) -> Vec<&str> {
        match self {
            Formula::Raw { field } => vec![field.as_str()],
            Formula::Linear { terms } => terms.iter().map(|t| t.field.as_str()).collect(),
            Formula::Share { parent, .. } => vec![parent.as_str()],
        }
    }

    pub fn evaluate(&self, source: &mut dyn FieldSource) -> Result<Decimal> {
        match self {
            Formula::Raw { field } => source.value(field),
            Formula::Linear { terms } => {
                let mut total = Decimal::ZERO;
                for term in terms {
                    let value = source.value(&term.field)?;
                    match term.sign {
                        TermSign::Plus => total += value,
                        TermSign::Minus => total -= value,
                    }
                }
                Ok(total)
            }
            Formula::Share { parent, share } => Ok(source.value(parent)? * *share),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct DerivationRule {
    pub name: String,
    pub kind: RuleKind,
    #[serde(default)]
    pub sign_policy: SignPolicy,
    pub formula: Formula,
    /// Marks an approximation that is not backed by filed data.
    #[serde(default)]
    pub estimated: bool,
}

impl DerivationRule {
    /// A line that reads one raw field as filed.
    pub fn item(name: impl Into<String>, raw_field: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: RuleKind::Item,
            sign_policy: SignPolicy::AsIs,
            formula: Formula::Raw {
                field: raw_field.into(),
            },
            estimated: false,
        }
    }

    pub fn subtotal(name: impl Into<String>, terms: Vec<Term>) -> Self {
        Self {
            name: name.into(),
            kind: RuleKind::Subtotal,
            sign_policy: SignPolicy::AsIs,
            formula: Formula::Linear { terms },
            estimated: false,
        }
    }

    pub fn total(name: impl Into<String>, terms: Vec<Term>) -> Self {
        Self {
            kind: RuleKind::Total,
            ..Self::subtotal(name, terms)
        }
    }

    /// Sum of the given fields, all added.
    pub fn sum_of(name: impl Into<String>, kind: RuleKind, fields: &[&str]) -> Self {
        Self {
            kind,
            ..Self::subtotal(name, fields.iter().map(|f| Term::plus(*f)).collect())
        }
    }

    pub fn estimated_share(
        name: impl Into<String>,
        parent: impl Into<String>,
        share: Decimal,
    ) -> Self {
        Self {
            name: name.into(),
            kind: RuleKind::Item,
            sign_policy: SignPolicy::AsIs,
            formula: Formula::Share {
                parent: parent.into(),
                share,
            },
            estimated: true,
        }
    }

    pub fn negated(mut self) -> Self {
        self.sign_policy = SignPolicy::Negate;
        self
    }

    pub fn dependencies(&self) -> Vec<&str> {
        self.formula.dependencies()
    }
}

#[derive(Debug, Clone, Default)]
pub struct DerivationCatalog {
    rules: Vec<DerivationRule>,
    index: HashMap<String, usize>,
    schemas: BTreeMap<SchemaId, AnalysisSchema>,
    frozen: bool,
}

impl DerivationCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers rules in the given order.
    pub fn from_rules(rules: impl IntoIterator<Item = DerivationRule>) -> Result<Self> {
        let mut catalog = Self::new();
        for rule in rules {
            catalog.register(rule)?;
        }
        Ok(catalog)
    }

    pub fn register(&mut self, rule: DerivationRule) -> Result<()> {
        if self.frozen {
            return Err(DerivationError::CatalogFrozen(rule.name));
        }
        if self.index.contains_key(&rule.name) {
            return Err(DerivationError::DuplicateField(rule.name));
        }
        if is_raw_field(&rule.name) {
            return Err(DerivationError::RawFieldShadowed(rule.name));
        }

        if let Some(missing) = rule
            .dependencies()
            .into_iter()
            .find(|dep| !is_raw_field(dep) && !self.index.contains_key(*dep))
        {
            return Err(DerivationError::UnknownDependency {
                field: rule.name.clone(),
                dependency: missing.to_string(),
            });
        }

        debug!(
            "Registered rule '{}' ({:?}) with {} dependencies",
            rule.name,
            rule.kind,
            rule.dependencies().len()
        );

        self.index.insert(rule.name.clone(), self.rules.len());
        self.rules.push(rule);
        Ok(())
    }

    /// Adds a display schema. Every line must name a registered rule.
    pub fn register_schema(&mut self, schema: AnalysisSchema) -> Result<()> {
        if self.frozen {
            return Err(DerivationError::CatalogFrozen(schema.id.to_string()));
        }

        let referenced = schema
            .lines
            .iter()
            .map(|line| line.field.as_str())
            .chain(schema.base_field.as_deref());
        for field in referenced {
            if !self.index.contains_key(field) {
                return Err(DerivationError::UnknownField(field.to_string()));
            }
        }

        self.schemas.insert(schema.id, schema);
        Ok(())
    }

    pub fn lookup(&self, name: &str) -> Result<&DerivationRule> {
        self.index
            .get(name)
            .map(|&idx| &self.rules[idx])
            .ok_or_else(|| DerivationError::UnknownField(name.to_string()))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }

    pub fn schema(&self, id: SchemaId) -> Result<&AnalysisSchema> {
        self.schemas
            .get(&id)
            .ok_or_else(|| DerivationError::UnknownSchema(id.to_string()))
    }

    pub fn schemas(&self) -> impl Iterator<Item = &AnalysisSchema> {
        self.schemas.values()
    }

    pub fn freeze(&mut self) {
        self.frozen = true;
    }

    pub fn is_frozen(&self) -> bool {
        self.frozen
    }

    /// Rules in registration order.
    pub fn rules(&self) -> &[DerivationRule] {
        &self.rules
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// Replaces or inserts a rule without any validation, so tests can build
    /// the corrupt graphs the resolver has to survive.
    #[cfg(test)]
    pub(crate) fn insert_unchecked(&mut self, rule: DerivationRule) {
        if let Some(&idx) = self.index.get(&rule.name) {
            self.rules[idx] = rule;
            return;
        }
        self.index.insert(rule.name.clone(), self.rules.len());
        self.rules.push(rule);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::SchemaLine;
    use rust_decimal_macros::dec;

    fn base_catalog() -> DerivationCatalog {
        DerivationCatalog::from_rules([
            DerivationRule::item("turnover", "net_turnover"),
            DerivationRule::item("purchases", "supplies").negated(),
            DerivationRule::subtotal(
                "gross_margin",
                vec![Term::plus("turnover"), Term::minus("purchases")],
            ),
        ])
        .unwrap()
    }

    #[test]
    fn test_register_and_lookup() {
        let catalog = base_catalog();
        assert_eq!(catalog.len(), 3);

        let rule = catalog.lookup("purchases").unwrap();
        assert_eq!(rule.sign_policy, SignPolicy::Negate);
        assert_eq!(rule.dependencies(), vec!["supplies"]);

        let margin = catalog.lookup("gross_margin").unwrap();
        assert_eq!(margin.kind, RuleKind::Subtotal);
        assert_eq!(margin.dependencies(), vec!["turnover", "purchases"]);
    }

    #[test]
    fn test_lookup_unknown_field() {
        let catalog = base_catalog();
        assert!(matches!(
            catalog.lookup("ebitda"),
            Err(DerivationError::UnknownField(name)) if name == "ebitda"
        ));
    }

    #[test]
    fn test_duplicate_rule_rejected() {
        let mut catalog = base_catalog();
        let result = catalog.register(DerivationRule::item("turnover", "net_turnover"));
        assert!(matches!(result, Err(DerivationError::DuplicateField(name)) if name == "turnover"));
    }

    #[test]
    fn test_forward_reference_rejected() {
        let mut catalog = DerivationCatalog::new();
        let result = catalog.register(DerivationRule::subtotal(
            "a",
            vec![Term::plus("b")],
        ));
        assert!(matches!(
            result,
            Err(DerivationError::UnknownDependency { field, dependency })
                if field == "a" && dependency == "b"
        ));

        // Registering B afterwards does not retroactively admit A.
        catalog.register(DerivationRule::item("b", "inventory")).unwrap();
        assert!(!catalog.contains("a"));
    }

    #[test]
    fn test_self_reference_rejected() {
        let mut catalog = DerivationCatalog::new();
        let result = catalog.register(DerivationRule::subtotal("a", vec![Term::plus("a")]));
        assert!(matches!(result, Err(DerivationError::UnknownDependency { .. })));
    }

    #[test]
    fn test_raw_field_shadowing_rejected() {
        let mut catalog = DerivationCatalog::new();
        let result = catalog.register(DerivationRule::item("inventory", "inventory"));
        assert!(matches!(result, Err(DerivationError::RawFieldShadowed(_))));
    }

    #[test]
    fn test_frozen_catalog_rejects_registration() {
        let mut catalog = base_catalog();
        catalog.freeze();
        assert!(catalog.is_frozen());

        let result = catalog.register(DerivationRule::item("cash", "cash_equivalents"));
        assert!(matches!(result, Err(DerivationError::CatalogFrozen(name)) if name == "cash"));
        assert!(catalog.lookup("turnover").is_ok());
    }

    #[test]
    fn test_schema_must_reference_registered_rules() {
        let mut catalog = base_catalog();
        let schema = AnalysisSchema {
            id: SchemaId::ProfitAndLoss,
            title: "P&L".to_string(),
            base_field: Some("turnover".to_string()),
            lines: vec![
                SchemaLine::new("turnover", "Turnover", 0),
                SchemaLine::new("net_result", "Net result", 0),
            ],
        };

        let result = catalog.register_schema(schema);
        assert!(matches!(result, Err(DerivationError::UnknownField(name)) if name == "net_result"));
        assert!(matches!(
            catalog.schema(SchemaId::ProfitAndLoss),
            Err(DerivationError::UnknownSchema(_))
        ));
    }

    #[test]
    fn test_formula_json_shape() {
        let rule = DerivationRule::estimated_share("raw_materials", "inventory_stock", dec!(0.37));
        let json = serde_json::to_value(&rule).unwrap();
        assert_eq!(json["formula"]["op"], "share");
        assert_eq!(json["estimated"], true);

        let back: DerivationRule = serde_json::from_value(json).unwrap();
        assert_eq!(back, rule);
    }
}
