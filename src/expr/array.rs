use smol_str::SmolStr;

use crate::{
    builder::BuildContext,
    dialect::Dialect,
    error::Result,
    operand::Operand,
    query::Query,
};

use super::{Expr, ExpressionBuilder, mismatch};

/// Array value. PostgreSQL renders a native `ARRAY[...]`, other dialects bind JSON text.
#[derive(Debug, Clone, PartialEq)]
pub struct ArrayExpr {
    /// A list, a sub-query or null.
    pub value: Box<Operand>,
    /// Element type, e.g. `integer`. Suffixed with `[]` per dimension when cast.
    pub maybe_type: Option<SmolStr>,
    pub dimension: usize,
}

impl ArrayExpr {
    pub fn new(value: impl Into<Operand>) -> Self {
        Self {
            value: Box::new(value.into()),
            maybe_type: None,
            dimension: 1,
        }
    }

    pub fn from_query(query: Query) -> Self {
        Self::new(query)
    }

    pub fn typed(mut self, ty: impl Into<SmolStr>) -> Self {
        self.maybe_type = Some(ty.into());
        self
    }

    pub fn dimension(mut self, dimension: usize) -> Self {
        self.dimension = dimension.max(1);
        self
    }

    fn type_hint(&self) -> String {
        let Some(ty) = &self.maybe_type else {
            return String::new();
        };
        if ty.ends_with("[]") {
            return format!("::{ty}");
        }
        format!("::{ty}{}", "[]".repeat(self.dimension))
    }
}

impl From<ArrayExpr> for Expr {
    fn from(value: ArrayExpr) -> Self {
        Expr::Array(value)
    }
}

pub struct ArrayBuilder;

impl ExpressionBuilder for ArrayBuilder {
    fn build(&self, expr: &Expr, context: &mut BuildContext<'_>) -> Result<String> {
        let Expr::Array(array) = expr else {
            return Err(mismatch("ArrayBuilder", expr));
        };

        if array.value.is_null() {
            return Ok("NULL".into());
        }

        if context.dialect() != Dialect::Postgres {
            return match array.value.as_ref() {
                Operand::Expr(inner) => context.build_expression(inner),
                value => {
                    let json = value.to_json()?;
                    Ok(context.bind(serde_json::to_string(&json)?))
                }
            };
        }

        match array.value.as_ref() {
            Operand::Expr(Expr::Query(query)) => {
                let sql = context.build_query(query)?;
                Ok(format!("ARRAY({sql}){}", array.type_hint()))
            }
            Operand::Expr(inner) => context.build_expression(inner),
            Operand::List(items) if items.is_empty() && array.maybe_type.is_none() => {
                Ok("'{}'".into())
            }
            Operand::List(items) => {
                let sql = build_elements(items, context)?;
                Ok(format!("{sql}{}", array.type_hint()))
            }
            Operand::Map(row) => {
                let items: Vec<Operand> = row.values().cloned().collect();
                let sql = build_elements(&items, context)?;
                Ok(format!("{sql}{}", array.type_hint()))
            }
            scalar => {
                let sql = build_elements(std::slice::from_ref(scalar), context)?;
                Ok(format!("{sql}{}", array.type_hint()))
            }
        }
    }
}

fn build_elements(items: &[Operand], context: &mut BuildContext<'_>) -> Result<String> {
    let mut parts = Vec::with_capacity(items.len());
    for item in items {
        let part = match item {
            Operand::List(nested) => build_elements(nested, context)?,
            Operand::Map(row) => {
                let nested: Vec<Operand> = row.values().cloned().collect();
                build_elements(&nested, context)?
            }
            Operand::Expr(expr) => context.build_expression(expr)?,
            Operand::Value(value) if value.is_null() => "NULL".to_string(),
            Operand::Value(value) => context.bind(value.clone()),
        };
        parts.push(part);
    }
    Ok(format!("ARRAY[{}]", parts.join(", ")))
}

#[cfg(test)]
mod tests {
    use crate::{Dialect, Params, QueryBuilder, list, query::sub, value::Value};

    use super::*;

    fn build(dialect: Dialect, expr: ArrayExpr) -> (String, Params) {
        let qb = QueryBuilder::new(dialect);
        let mut params = Params::new();
        let sql = qb.build_expression(&expr.into(), &mut params).unwrap();
        (sql, params)
    }

    #[test]
    fn test_postgres_array() {
        let (sql, params) = build(Dialect::Postgres, ArrayExpr::new(list![1, 2]).typed("integer"));
        assert_eq!("ARRAY[:qp0, :qp1]::integer[]", sql);
        assert_eq!(2, params.len());
    }

    #[test]
    fn test_postgres_nested_array() {
        let expr = ArrayExpr::new(list![list![1, 2], list![3, ()]])
            .typed("int")
            .dimension(2);
        let (sql, _) = build(Dialect::Postgres, expr);
        assert_eq!("ARRAY[ARRAY[:qp0, :qp1], ARRAY[:qp2, NULL]]::int[][]", sql);
    }

    #[test]
    fn test_postgres_array_from_query() {
        let query = sub(|q| {
            q.select(["id"]).from("users");
        });
        let (sql, _) = build(Dialect::Postgres, ArrayExpr::from_query(query));
        assert_eq!("ARRAY(SELECT \"id\" FROM \"users\")", sql);
    }

    #[test]
    fn test_array_of_array_expressions() {
        let inner = ArrayExpr::new(list![1, 2]).typed("int");
        let outer = ArrayExpr::new(list![Expr::from(inner), ()]);
        assert!(matches!(outer.value.as_ref(), Operand::List(items) if items.len() == 2));
        let (sql, params) = build(Dialect::Postgres, outer);
        assert_eq!("ARRAY[ARRAY[:qp0, :qp1]::int[], NULL]", sql);
        assert_eq!(2, params.len());
    }

    #[test]
    fn test_json_encoded_elsewhere() {
        let (sql, params) = build(Dialect::MySql, ArrayExpr::new(list![1, "a"]));
        assert_eq!(":qp0", sql);
        assert_eq!(Some(&Value::from(r#"[1,"a"]"#)), params.value(":qp0"));
    }

    #[test]
    fn test_null_and_empty() {
        let (sql, _) = build(Dialect::Postgres, ArrayExpr::new(()));
        assert_eq!("NULL", sql);
        let (sql, _) = build(Dialect::Postgres, ArrayExpr::new(list![]));
        assert_eq!("'{}'", sql);
        let (sql, _) = build(Dialect::Postgres, ArrayExpr::new(list![]).typed("text"));
        assert_eq!("ARRAY[]::text[]", sql);
    }
}
