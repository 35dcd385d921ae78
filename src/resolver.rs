use crate::catalog::{DerivationCatalog, FieldSource};
use crate::error::{DerivationError, Result};
use crate::record::{RawRecord, RecordKey, ResolvedField, ResolvedRecord};
use crate::schema::AnalysisSchema;
use crate::vocabulary::is_raw_field;
use log::debug;
use rust_decimal::Decimal;
use std::collections::{BTreeMap, HashMap};

/// Evaluates derived fields against raw records, memoizing per record.
///
/// One resolver can serve every year of a series. Memoized values stay tied
/// to the filed figures they came from: resolving a different filing under an
/// already seen company and year discards what was cached for it.
pub struct FieldResolver<'c> {
    catalog: &'c DerivationCatalog,
    cache: HashMap<RecordKey, Memo>,
}

struct Memo {
    filed: BTreeMap<String, Decimal>,
    values: HashMap<String, Decimal>,
}

impl<'c> FieldResolver<'c> {
    pub fn new(catalog: &'c DerivationCatalog) -> Self {
        Self {
            catalog,
            cache: HashMap::new(),
        }
    }

    pub fn catalog(&self) -> &'c DerivationCatalog {
        self.catalog
    }

    pub fn resolve(&mut self, record: &RawRecord, field: &str) -> Result<Decimal> {
        self.track(record);
        let mut evaluation = Evaluation {
            resolver: self,
            record,
            in_progress: Vec::new(),
        };
        evaluation.value(field)
    }

    /// Resolves every line of `schema` eagerly.
    pub fn resolve_schema(
        &mut self,
        record: &RawRecord,
        schema: &AnalysisSchema,
    ) -> Result<ResolvedRecord> {
        let mut fields = Vec::with_capacity(schema.lines.len());

        for line in &schema.lines {
            let rule = self.catalog.lookup(&line.field)?;
            let value = self.resolve(record, &line.field)?;
            fields.push(ResolvedField {
                field: line.field.clone(),
                value,
                sign_policy: rule.sign_policy,
                estimated: rule.estimated,
            });
        }

        debug!(
            "Resolved {} fields of {} for {} / {}",
            fields.len(),
            schema.id,
            record.company_id(),
            record.fiscal_year()
        );

        Ok(ResolvedRecord {
            key: record.key().clone(),
            schema: schema.id,
            fields,
        })
    }

    /// Number of memoized derived values across all records.
    pub fn cached_len(&self) -> usize {
        self.cache.values().map(|memo| memo.values.len()).sum()
    }

    fn track(&mut self, record: &RawRecord) {
        match self.cache.get_mut(record.key()) {
            Some(memo) if memo.filed == *record.fields() => {}
            Some(memo) => {
                debug!("Filing for {} changed, dropping memoized values", record.key());
                memo.filed = record.fields().clone();
                memo.values.clear();
            }
            None => {
                self.cache.insert(
                    record.key().clone(),
                    Memo {
                        filed: record.fields().clone(),
                        values: HashMap::new(),
                    },
                );
            }
        }
    }

    fn cached(&self, key: &RecordKey, field: &str) -> Option<Decimal> {
        self.cache
            .get(key)
            .and_then(|memo| memo.values.get(field))
            .copied()
    }
}

// One top-level `resolve` call. `in_progress` holds the chain of rules being
// evaluated; meeting one of them again means the graph has a cycle.
struct Evaluation<'r, 'c> {
    resolver: &'r mut FieldResolver<'c>,
    record: &'r RawRecord,
    in_progress: Vec<String>,
}

impl FieldSource for Evaluation<'_, '_> {
    fn value(&mut self, field: &str) -> Result<Decimal> {
        if is_raw_field(field) {
            return Ok(self.record.get(field));
        }

        let catalog = self.resolver.catalog;
        let rule = catalog.lookup(field)?;

        if let Some(value) = self.resolver.cached(self.record.key(), field) {
            return Ok(value);
        }

        if self.in_progress.iter().any(|name| name == field) {
            let mut path = self.in_progress.clone();
            path.push(field.to_string());
            return Err(DerivationError::CyclicDependency {
                field: field.to_string(),
                path,
            });
        }

        self.in_progress.push(field.to_string());
        let result = rule.formula.evaluate(self);
        self.in_progress.pop();
        let value = result?;

        if let Some(memo) = self.resolver.cache.get_mut(self.record.key()) {
            memo.values.insert(field.to_string(), value);
        }

        Ok(value)
    }
}
