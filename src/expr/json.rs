use smol_str::SmolStr;

use crate::{builder::BuildContext, dialect::Dialect, error::Result, operand::Operand};

use super::{Expr, ExpressionBuilder, mismatch};

/// JSON document bound as encoded text.
#[derive(Debug, Clone, PartialEq)]
pub struct JsonExpr {
    pub value: Box<Operand>,
    /// Declared column type, PostgreSQL casts to it instead of `jsonb`.
    pub maybe_type: Option<SmolStr>,
}

impl JsonExpr {
    pub fn new(value: impl Into<Operand>) -> Self {
        Self {
            value: Box::new(value.into()),
            maybe_type: None,
        }
    }

    pub fn typed(mut self, ty: impl Into<SmolStr>) -> Self {
        self.maybe_type = Some(ty.into());
        self
    }
}

impl From<JsonExpr> for Expr {
    fn from(value: JsonExpr) -> Self {
        Expr::Json(value)
    }
}

pub struct JsonBuilder;

impl ExpressionBuilder for JsonBuilder {
    fn build(&self, expr: &Expr, context: &mut BuildContext<'_>) -> Result<String> {
        let Expr::Json(json) = expr else {
            return Err(mismatch("JsonBuilder", expr));
        };

        if json.value.is_null() {
            return Ok("NULL".into());
        }

        let placeholder = match json.value.as_ref() {
            Operand::Expr(inner @ Expr::Query(_)) => context.build_expression(inner)?,
            Operand::Expr(inner) => return context.build_expression(inner),
            value => {
                let encoded = serde_json::to_string(&value.to_json()?)?;
                context.bind(encoded)
            }
        };

        Ok(match context.dialect() {
            Dialect::Postgres => {
                let ty = json.maybe_type.as_deref().unwrap_or("jsonb");
                format!("{placeholder}::{ty}")
            }
            Dialect::MySql => format!("CAST({placeholder} AS JSON)"),
            Dialect::Sqlite | Dialect::Ansi => placeholder,
        })
    }
}

#[cfg(test)]
mod tests {
    use crate::{Dialect, Params, QueryBuilder, map, value::Value};

    use super::*;

    fn build(dialect: Dialect, expr: JsonExpr) -> (String, Params) {
        let qb = QueryBuilder::new(dialect);
        let mut params = Params::new();
        let sql = qb.build_expression(&expr.into(), &mut params).unwrap();
        (sql, params)
    }

    #[test]
    fn test_json_per_dialect() {
        let value = map! {"a" => 1, "b" => vec!["x"]};
        let (sql, params) = build(Dialect::Postgres, JsonExpr::new(value.clone()));
        assert_eq!(":qp0::jsonb", sql);
        assert_eq!(
            Some(&Value::from(r#"{"a":1,"b":["x"]}"#)),
            params.value(":qp0")
        );

        let (sql, _) = build(Dialect::Postgres, JsonExpr::new(value.clone()).typed("json"));
        assert_eq!(":qp0::json", sql);
        let (sql, _) = build(Dialect::MySql, JsonExpr::new(value.clone()));
        assert_eq!("CAST(:qp0 AS JSON)", sql);
        let (sql, _) = build(Dialect::Sqlite, JsonExpr::new(value));
        assert_eq!(":qp0", sql);
    }

    #[test]
    fn test_json_null() {
        let (sql, params) = build(Dialect::MySql, JsonExpr::new(()));
        assert_eq!("NULL", sql);
        assert!(params.is_empty());
    }
}
