use smol_str::SmolStr;

use crate::{
    builder::BuildContext,
    dialect::Dialect,
    error::Result,
    operand::{Operand, Row},
};

use super::{Expr, ExpressionBuilder, mismatch};

/// Composite value. PostgreSQL renders `ROW(...)`, other dialects bind JSON text.
#[derive(Debug, Clone, PartialEq)]
pub struct StructuredExpr {
    /// A map of field values, a positional list, or a sub-query.
    pub value: Box<Operand>,
    /// Composite type name, e.g. `currency_money`.
    pub maybe_type: Option<SmolStr>,
    /// Field order of the composite type. Missing fields render as NULL.
    pub columns: Vec<SmolStr>,
}

impl StructuredExpr {
    pub fn new(value: impl Into<Operand>) -> Self {
        Self {
            value: Box::new(value.into()),
            maybe_type: None,
            columns: Vec::new(),
        }
    }

    pub fn typed(mut self, ty: impl Into<SmolStr>) -> Self {
        self.maybe_type = Some(ty.into());
        self
    }

    pub fn columns<I, S>(mut self, columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<SmolStr>,
    {
        self.columns = columns.into_iter().map(Into::into).collect();
        self
    }

    fn ordered(&self, row: &Row) -> Vec<Operand> {
        if self.columns.is_empty() {
            return row.values().cloned().collect();
        }
        self.columns
            .iter()
            .map(|column| row.get(column.as_str()).cloned().unwrap_or_default())
            .collect()
    }

    fn type_hint(&self) -> String {
        self.maybe_type
            .as_ref()
            .map(|ty| format!("::{ty}"))
            .unwrap_or_default()
    }
}

impl From<StructuredExpr> for Expr {
    fn from(value: StructuredExpr) -> Self {
        Expr::Structured(value)
    }
}

pub struct StructuredBuilder;

impl ExpressionBuilder for StructuredBuilder {
    fn build(&self, expr: &Expr, context: &mut BuildContext<'_>) -> Result<String> {
        let Expr::Structured(structured) = expr else {
            return Err(mismatch("StructuredBuilder", expr));
        };

        if structured.value.is_null() {
            return Ok("NULL".into());
        }

        if context.dialect() != Dialect::Postgres {
            return match structured.value.as_ref() {
                Operand::Expr(inner) => context.build_expression(inner),
                Operand::Map(row) if !structured.columns.is_empty() => {
                    let mut ordered = Row::new();
                    for column in &structured.columns {
                        let value = row.get(column.as_str()).cloned().unwrap_or_default();
                        ordered.insert(column.to_string(), value);
                    }
                    let json = Operand::Map(ordered).to_json()?;
                    Ok(context.bind(serde_json::to_string(&json)?))
                }
                value => {
                    let json = value.to_json()?;
                    Ok(context.bind(serde_json::to_string(&json)?))
                }
            };
        }

        let values = match structured.value.as_ref() {
            Operand::Expr(inner @ Expr::Query(_)) => {
                let sql = context.build_expression(inner)?;
                return Ok(format!("{sql}{}", structured.type_hint()));
            }
            Operand::Expr(inner) => return context.build_expression(inner),
            Operand::Map(row) => structured.ordered(row),
            Operand::List(items) => items.clone(),
            scalar => vec![scalar.clone()],
        };

        let mut parts = Vec::with_capacity(values.len());
        for value in &values {
            parts.push(context.build_value(value)?);
        }
        Ok(format!("ROW({}){}", parts.join(", "), structured.type_hint()))
    }
}
