//! Filter compiler: condition trees and data maps to MySQL statements.
//!
//! The compiler is bound to one model snapshot. Every value goes through the
//! [`ValueCodec`] and every identifier through [`escape_identifier`], so no
//! caller-supplied text reaches the output unquoted.

use super::condition::{Condition, ConditionTree};
use super::filter::{Filter, OrderSpec, UpdateSpec};
use crate::catalog::{ModelSchema, ID_COLUMN};
use crate::codec::{escape_identifier, ValueCodec, NULL_LITERAL};
use crate::error::{Error, Result};
use crate::value::Value;

/// Compiles filters and data maps for one model.
#[derive(Debug, Clone, Copy)]
pub struct FilterCompiler<'a> {
    model: &'a ModelSchema,
    codec: ValueCodec<'a>,
}

impl<'a> FilterCompiler<'a> {
    /// Create a compiler for a model.
    pub fn new(model: &'a ModelSchema) -> Self {
        Self {
            model,
            codec: ValueCodec::new(model),
        }
    }

    /// The codec used for literals.
    pub fn codec(&self) -> &ValueCodec<'a> {
        &self.codec
    }

    /// Escaped table name.
    pub fn table(&self) -> String {
        escape_identifier(self.model.table_name())
    }

    /// Compile a condition tree to a WHERE body (without the keyword).
    ///
    /// An empty tree compiles to the empty string.
    pub fn compile_where(&self, tree: &ConditionTree) -> Result<String> {
        let clauses = tree
            .iter()
            .map(|(key, condition)| self.compile_condition(key, condition))
            .collect::<Result<Vec<_>>>()?;
        Ok(clauses.join(" AND "))
    }

    fn compile_condition(&self, key: &str, condition: &Condition) -> Result<String> {
        let column = escape_identifier(key);
        let sql = match condition {
            Condition::Scalar(Value::Null) => format!("{column} IS NULL"),
            Condition::Scalar(Value::Array(values)) => {
                return self.compile_condition(
                    key,
                    &Condition::List {
                        values: values.clone(),
                        negated: false,
                    },
                )
            }
            Condition::Scalar(value) => {
                format!("{column} = {}", self.codec.scalar_literal(key, value)?)
            }
            Condition::Or(disjuncts) => return self.compile_or(disjuncts),
            Condition::List { values, negated } if values.is_empty() => {
                // No candidates: IN matches nothing, NOT IN matches everything.
                String::from(if *negated { "1" } else { "0" })
            }
            Condition::List { negated, .. } => {
                let op = if *negated { "NOT IN" } else { "IN" };
                format!("{column} {op} ({})", self.codec.operand_literal(key, condition)?)
            }
            Condition::Compare(op, _) => format!(
                "{column} {} {}",
                op.as_sql(),
                self.codec.operand_literal(key, condition)?
            ),
            Condition::Range(..) => format!(
                "{column} BETWEEN {}",
                self.codec.operand_literal(key, condition)?
            ),
            Condition::Like(_) => format!(
                "{column} LIKE {}",
                self.codec.operand_literal(key, condition)?
            ),
        };
        Ok(sql)
    }

    fn compile_or(&self, disjuncts: &[ConditionTree]) -> Result<String> {
        if disjuncts.is_empty() {
            return Err(Error::InvalidFilter(
                "`or` needs at least one condition".into(),
            ));
        }
        let parts = disjuncts
            .iter()
            .map(|tree| {
                if tree.is_empty() {
                    Err(Error::InvalidFilter("`or` contains an empty condition".into()))
                } else {
                    self.compile_where(tree)
                }
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(format!("({})", parts.join(" OR ")))
    }

    /// Compile a `find` query.
    pub fn compile_select(&self, filter: &Filter) -> Result<String> {
        let projection = match &filter.attributes {
            Some(columns) if !columns.is_empty() => columns
                .iter()
                .map(|c| escape_identifier(c))
                .collect::<Vec<_>>()
                .join(", "),
            _ => "*".to_string(),
        };

        let mut sql = format!("SELECT {projection} FROM {}", self.table());
        if let Some(tree) = &filter.where_clause {
            if tree.is_empty() {
                return Err(Error::InvalidFilter("Where field is empty".into()));
            }
            sql.push_str(" WHERE ");
            sql.push_str(&self.compile_where(tree)?);
        }
        if !filter.group.is_empty() {
            sql.push_str(" GROUP BY ");
            sql.push_str(&order_clause(&filter.group));
        }
        if !filter.order.is_empty() {
            sql.push_str(" ORDER BY ");
            sql.push_str(&order_clause(&filter.order));
        }
        if let Some(limit) = filter.limit.filter(|n| *n > 0) {
            match filter.skip.filter(|n| *n > 0) {
                Some(skip) => sql.push_str(&format!(" LIMIT {skip}, {limit}")),
                None => sql.push_str(&format!(" LIMIT {limit}")),
            }
        }
        Ok(sql)
    }

    /// Compile a row count. An absent or empty tree counts every row.
    pub fn compile_count(&self, where_clause: Option<&ConditionTree>) -> Result<String> {
        let mut sql = format!("SELECT count(*) as cnt FROM {}", self.table());
        if let Some(tree) = where_clause.filter(|t| !t.is_empty()) {
            sql.push_str(" WHERE ");
            sql.push_str(&self.compile_where(tree)?);
        }
        Ok(sql)
    }

    /// Compile an INSERT. Keys that are neither declared nor `id` are skipped.
    pub fn compile_insert(&self, data: &[(String, Value)]) -> Result<String> {
        let assignments = self
            .columns_of(data)
            .map(|(key, value)| {
                Ok(format!(
                    "{} = {}",
                    escape_identifier(key),
                    self.codec.scalar_literal(key, value)?
                ))
            })
            .collect::<Result<Vec<_>>>()?;

        if assignments.is_empty() {
            Ok(format!("INSERT INTO {} VALUES ()", self.table()))
        } else {
            Ok(format!(
                "INSERT INTO {} SET {}",
                self.table(),
                assignments.join(", ")
            ))
        }
    }

    /// Compile an insert-or-update keyed by the primary key.
    pub fn compile_upsert(&self, data: &[(String, Value)]) -> Result<String> {
        let mut names = Vec::new();
        let mut values = Vec::new();
        let mut reassign = Vec::new();
        for (key, value) in self.columns_of(data) {
            let column = escape_identifier(key);
            let literal = self.codec.scalar_literal(key, value)?;
            if key != ID_COLUMN {
                reassign.push(format!("{column} = {literal}"));
            }
            names.push(column);
            values.push(literal);
        }

        if names.is_empty() {
            return Err(Error::InvalidData(format!(
                "nothing to upsert into {}",
                self.model.table_name()
            )));
        }
        if reassign.is_empty() {
            let id = escape_identifier(ID_COLUMN);
            reassign.push(format!("{id} = {id}"));
        }

        Ok(format!(
            "INSERT INTO {} ({}) VALUES ({}) ON DUPLICATE KEY UPDATE {}",
            self.table(),
            names.join(", "),
            values.join(", "),
            reassign.join(", ")
        ))
    }

    /// Compile a single UPDATE.
    ///
    /// Fails with [`Error::MissingWhereOrUpdate`] when either part is absent
    /// or empty.
    pub fn compile_update(&self, spec: &UpdateSpec) -> Result<String> {
        let tree = spec
            .where_clause
            .as_ref()
            .filter(|t| !t.is_empty())
            .ok_or(Error::MissingWhereOrUpdate)?;
        let update = spec
            .update
            .as_ref()
            .filter(|u| !u.is_empty())
            .ok_or(Error::MissingWhereOrUpdate)?;

        let assignments = update
            .iter()
            .map(|(key, value)| {
                let literal = if value.is_null() {
                    NULL_LITERAL.to_string()
                } else {
                    self.codec.scalar_literal(key, value)?
                };
                Ok(format!("{} = {literal}", escape_identifier(key)))
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(format!(
            "UPDATE {} SET {} WHERE {}",
            self.table(),
            assignments.join(", "),
            self.compile_where(tree)?
        ))
    }

    /// Compile every item of a bulk update.
    ///
    /// Results are positional: item `i` of the output belongs to `specs[i]`,
    /// and a bad item does not affect the others.
    pub fn compile_bulk_update(&self, specs: &[UpdateSpec]) -> Vec<Result<String>> {
        specs.iter().map(|spec| self.compile_update(spec)).collect()
    }

    fn columns_of<'d>(
        &self,
        data: &'d [(String, Value)],
    ) -> impl Iterator<Item = (&'d str, &'d Value)> + 'd
    where
        'a: 'd,
    {
        let model = self.model;
        data.iter()
            .filter(move |(key, _)| key == ID_COLUMN || model.get_property(key).is_some())
            .map(|(key, value)| (key.as_str(), value))
    }
}

fn order_clause(terms: &[OrderSpec]) -> String {
    terms
        .iter()
        .map(|term| match term.direction {
            Some(direction) => format!("{} {}", escape_identifier(&term.column), direction.as_sql()),
            None => escape_identifier(&term.column),
        })
        .collect::<Vec<_>>()
        .join(", ")
}
