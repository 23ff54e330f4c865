//! Table metadata consumed by the DML and DDL assemblers.
//!
//! A [`SchemaProvider`] hands out [`TableSchema`] snapshots. Reading them from a live
//! database is the job of the provider, [`MemorySchema`] serves metadata declared in code.

use std::sync::Arc;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use smol_str::SmolStr;

use crate::{
    expr::{Expr, JsonExpr},
    operand::Operand,
    value::{Param, ParamType, Value},
};

pub mod constraint;

pub use constraint::{
    CheckConstraint, Constraint, DefaultValueConstraint, ForeignKeyConstraint, IndexConstraint,
};

/// Value category of a column, drives typecasting before binding.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ColumnKind {
    #[default]
    String,
    Integer,
    Boolean,
    Double,
    Binary,
    Json,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ColumnSchema {
    pub name: SmolStr,
    /// Physical type as declared, e.g. `varchar(255)`.
    pub db_type: String,
    /// Abstract type, e.g. `string`.
    pub ty: SmolStr,
    pub kind: ColumnKind,
    pub allow_null: bool,
    /// Default as SQL text.
    pub default_value: Option<String>,
    pub size: Option<u32>,
    pub precision: Option<u32>,
    pub scale: Option<u32>,
    pub is_primary_key: bool,
    pub auto_increment: bool,
    pub unsigned: bool,
    pub comment: Option<String>,
}

impl ColumnSchema {
    pub fn new(name: impl Into<SmolStr>, kind: ColumnKind, db_type: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            db_type: db_type.into(),
            kind,
            allow_null: true,
            ..Self::default()
        }
    }

    pub fn not_null(mut self) -> Self {
        self.allow_null = false;
        self
    }

    pub fn primary_key(mut self) -> Self {
        self.is_primary_key = true;
        self.allow_null = false;
        self
    }

    pub fn auto_increment(mut self) -> Self {
        self.auto_increment = true;
        self
    }

    pub fn default_value(mut self, default: impl Into<String>) -> Self {
        self.default_value = Some(default.into());
        self
    }

    pub fn comment(mut self, comment: impl Into<String>) -> Self {
        self.comment = Some(comment.into());
        self
    }

    /// Converts an application value into the representation the column expects.
    ///
    /// Expressions pass through untouched. An empty string becomes NULL on every column that
    /// does not hold text.
    pub fn db_typecast(&self, value: Operand) -> Operand {
        let value = match value {
            Operand::Expr(expr) => return Operand::Expr(expr),
            Operand::Value(Value::String(s))
                if s.is_empty() && !matches!(self.kind, ColumnKind::String | ColumnKind::Binary) =>
            {
                return Operand::null();
            }
            Operand::Value(Value::Null) => return Operand::null(),
            other => other,
        };

        match self.kind {
            ColumnKind::Json => {
                let mut json = JsonExpr::new(value);
                if matches!(self.db_type.as_str(), "json" | "jsonb") {
                    json = json.typed(self.db_type.clone());
                }
                Operand::Expr(Expr::Json(json))
            }
            ColumnKind::Binary => match value {
                Operand::Value(value) => Operand::Expr(Expr::Param(Param::new(value, ParamType::Lob))),
                other => other,
            },
            ColumnKind::Integer => map_value(value, |value| match value {
                Value::String(s) => match s.trim().parse::<i64>() {
                    Ok(i) => Value::Int(i),
                    Err(_) => Value::String(s),
                },
                Value::Float(f) => Value::Int(f as i64),
                Value::Bool(b) => Value::Int(i64::from(b)),
                other => other,
            }),
            ColumnKind::Double => map_value(value, |value| match value {
                Value::String(s) => match s.trim().parse::<f64>() {
                    Ok(f) => Value::Float(f),
                    Err(_) => Value::String(s),
                },
                Value::Int(i) => Value::Float(i as f64),
                Value::UInt(u) => Value::Float(u as f64),
                other => other,
            }),
            ColumnKind::Boolean => map_value(value, |value| match value {
                Value::Int(i) => Value::Bool(i != 0),
                Value::UInt(u) => Value::Bool(u != 0),
                Value::Float(f) => Value::Bool(f != 0.0),
                Value::String(s) => Value::Bool(!(s.is_empty() || s == "0")),
                other => other,
            }),
            ColumnKind::String => map_value(value, |value| match value {
                Value::Bool(b) => Value::String(if b { "1" } else { "0" }.into()),
                Value::Int(_) | Value::UInt(_) | Value::Float(_) => Value::String(value.to_string()),
                other => other,
            }),
        }
    }
}

fn map_value(operand: Operand, map: impl FnOnce(Value) -> Value) -> Operand {
    match operand {
        Operand::Value(value) => Operand::Value(map(value)),
        other => other,
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TableSchema {
    pub name: SmolStr,
    pub schema_name: Option<SmolStr>,
    pub columns: IndexMap<SmolStr, ColumnSchema>,
    pub primary_key: Option<Constraint>,
    pub indexes: Vec<IndexConstraint>,
    pub uniques: Vec<Constraint>,
    pub checks: Vec<CheckConstraint>,
    pub foreign_keys: Vec<ForeignKeyConstraint>,
    pub default_values: Vec<DefaultValueConstraint>,
    /// Sequence feeding the auto-increment primary key, PostgreSQL only.
    pub sequence_name: Option<String>,
    pub comment: Option<String>,
}

impl TableSchema {
    pub fn new(name: impl Into<SmolStr>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    pub fn column(mut self, column: ColumnSchema) -> Self {
        self.columns.insert(column.name.clone(), column);
        self
    }

    pub fn primary_key<I, S>(mut self, columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<SmolStr>,
    {
        let constraint = Constraint::unnamed(columns);
        for name in &constraint.column_names {
            if let Some(column) = self.columns.get_mut(name) {
                column.is_primary_key = true;
            }
        }
        self.primary_key = Some(constraint);
        self
    }

    pub fn index(mut self, index: IndexConstraint) -> Self {
        self.indexes.push(index);
        self
    }

    pub fn unique(mut self, unique: Constraint) -> Self {
        self.uniques.push(unique);
        self
    }

    pub fn check(mut self, check: CheckConstraint) -> Self {
        self.checks.push(check);
        self
    }

    pub fn foreign_key(mut self, foreign_key: ForeignKeyConstraint) -> Self {
        self.foreign_keys.push(foreign_key);
        self
    }

    pub fn sequence_name(mut self, name: impl Into<String>) -> Self {
        self.sequence_name = Some(name.into());
        self
    }

    pub fn get_column(&self, name: &str) -> Option<&ColumnSchema> {
        self.columns.get(name)
    }

    pub fn column_names(&self) -> impl Iterator<Item = &str> {
        self.columns.keys().map(SmolStr::as_str)
    }
}

/// Source of table metadata. Names are raw table names, without quotes or prefix markers.
pub trait SchemaProvider: Send + Sync {
    fn table_schema(&self, name: &str) -> Option<Arc<TableSchema>>;

    fn table_primary_key(&self, name: &str) -> Option<Constraint> {
        self.table_schema(name)
            .and_then(|table| table.primary_key.clone())
    }

    fn table_indexes(&self, name: &str) -> Vec<IndexConstraint> {
        self.table_schema(name)
            .map(|table| table.indexes.clone())
            .unwrap_or_default()
    }

    fn table_uniques(&self, name: &str) -> Vec<Constraint> {
        self.table_schema(name)
            .map(|table| table.uniques.clone())
            .unwrap_or_default()
    }

    fn table_checks(&self, name: &str) -> Vec<CheckConstraint> {
        self.table_schema(name)
            .map(|table| table.checks.clone())
            .unwrap_or_default()
    }

    fn table_foreign_keys(&self, name: &str) -> Vec<ForeignKeyConstraint> {
        self.table_schema(name)
            .map(|table| table.foreign_keys.clone())
            .unwrap_or_default()
    }

    fn table_default_values(&self, name: &str) -> Vec<DefaultValueConstraint> {
        self.table_schema(name)
            .map(|table| table.default_values.clone())
            .unwrap_or_default()
    }
}

/// Metadata declared in code.
#[derive(Debug, Clone, Default)]
pub struct MemorySchema {
    tables: IndexMap<SmolStr, Arc<TableSchema>>,
}

impl MemorySchema {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_table(mut self, table: TableSchema) -> Self {
        self.insert(table);
        self
    }

    pub fn insert(&mut self, table: TableSchema) -> &mut Self {
        self.tables.insert(table.name.clone(), Arc::new(table));
        self
    }

    pub fn remove(&mut self, name: &str) -> Option<Arc<TableSchema>> {
        self.tables.shift_remove(name)
    }

    pub fn table_names(&self) -> impl Iterator<Item = &str> {
        self.tables.keys().map(SmolStr::as_str)
    }
}

impl SchemaProvider for MemorySchema {
    fn table_schema(&self, name: &str) -> Option<Arc<TableSchema>> {
        self.tables.get(name).cloned()
    }
}
