use std::collections::HashMap;

use tracing::trace;

use crate::{
    builder::BuildContext,
    error::Result,
    scan::rename_placeholders,
    value::{Param, Params},
};

use super::{Expr, ExpressionBuilder, mismatch};

/// Raw SQL carried verbatim, together with the named parameters it references.
#[derive(Debug, Clone, PartialEq)]
pub struct RawExpr {
    pub sql: String,
    pub params: Params,
}

impl RawExpr {
    pub fn new(sql: impl Into<String>) -> Self {
        Self {
            sql: sql.into(),
            params: Params::new(),
        }
    }

    pub fn with_params(sql: impl Into<String>, params: Params) -> Self {
        Self {
            sql: sql.into(),
            params,
        }
    }

    pub fn param<N, P>(mut self, name: N, param: P) -> Self
    where
        N: AsRef<str>,
        P: Into<Param>,
    {
        self.params.insert(name, param);
        self
    }
}

pub fn raw(sql: impl Into<String>) -> Expr {
    Expr::Raw(RawExpr::new(sql))
}

pub struct RawBuilder;

impl ExpressionBuilder for RawBuilder {
    fn build(&self, expr: &Expr, context: &mut BuildContext<'_>) -> Result<String> {
        let Expr::Raw(raw) = expr else {
            return Err(mismatch("RawBuilder", expr));
        };

        let mut renames = HashMap::new();
        for (name, param) in raw.params.iter() {
            match context.params().get(name) {
                Some(existing) if existing == param => {}
                Some(_) => {
                    let fresh = context.params().next_name();
                    trace!(from = name, to = %fresh, "renaming colliding parameter");
                    context.params_mut().insert(&fresh, param.clone());
                    renames.insert(name.to_string(), fresh);
                }
                None => {
                    context.params_mut().insert(name, param.clone());
                }
            }
        }

        Ok(rename_placeholders(&raw.sql, &renames))
    }
}

pub struct ParamBuilder;

impl ExpressionBuilder for ParamBuilder {
    fn build(&self, expr: &Expr, context: &mut BuildContext<'_>) -> Result<String> {
        match expr {
            Expr::Param(param) => Ok(context.bind(param.clone())),
            _ => Err(mismatch("ParamBuilder", expr)),
        }
    }
}

pub struct ValueBuilder;

impl ExpressionBuilder for ValueBuilder {
    fn build(&self, expr: &Expr, context: &mut BuildContext<'_>) -> Result<String> {
        match expr {
            Expr::Value(value) => Ok(context.bind(value.clone())),
            _ => Err(mismatch("ValueBuilder", expr)),
        }
    }
}

pub struct ColumnNameBuilder;

impl ExpressionBuilder for ColumnNameBuilder {
    fn build(&self, expr: &Expr, context: &mut BuildContext<'_>) -> Result<String> {
        match expr {
            Expr::ColumnName(name) => Ok(context.quoter().quote_column_name(name)),
            _ => Err(mismatch("ColumnNameBuilder", expr)),
        }
    }
}

/// Renders a sub-query in parentheses, sharing the outer parameters.
pub struct QueryBuilderExpr;

impl ExpressionBuilder for QueryBuilderExpr {
    fn build(&self, expr: &Expr, context: &mut BuildContext<'_>) -> Result<String> {
        match expr {
            Expr::Query(query) => Ok(format!("({})", context.build_query(query)?)),
            _ => Err(mismatch("QueryBuilderExpr", expr)),
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::{Dialect, QueryBuilder, value::Value};

    use super::*;

    #[test]
    fn test_raw_merges_params() {
        let qb = QueryBuilder::new(Dialect::Postgres);
        let mut params = Params::new();
        let expr = RawExpr::new("a > :min").param(":min", 3);
        let sql = qb.build_expression(&expr.into(), &mut params).unwrap();
        assert_eq!("a > :min", sql);
        assert_eq!(Some(&Value::Int(3)), params.value(":min"));
    }

    #[test]
    fn test_raw_renames_colliding_param() {
        let qb = QueryBuilder::new(Dialect::Postgres);
        let mut params = Params::from([(":min", 1)]);
        let expr = RawExpr::new("a > :min AND b = ':min'").param(":min", 3);
        let sql = qb.build_expression(&expr.into(), &mut params).unwrap();
        assert_eq!("a > :qp1 AND b = ':min'", sql);
        assert_eq!(Some(&Value::Int(1)), params.value(":min"));
        assert_eq!(Some(&Value::Int(3)), params.value(":qp1"));
    }

    #[test]
    fn test_raw_same_value_is_shared() {
        let qb = QueryBuilder::new(Dialect::Postgres);
        let mut params = Params::from([(":min", 3)]);
        let expr = RawExpr::new("a > :min").param("min", 3);
        let sql = qb.build_expression(&expr.into(), &mut params).unwrap();
        assert_eq!("a > :min", sql);
        assert_eq!(1, params.len());
    }

    #[test]
    fn test_value_and_column_name() {
        let qb = QueryBuilder::new(Dialect::MySql);
        let mut params = Params::new();
        assert_eq!(
            ":qp0",
            qb.build_expression(&Expr::value("x"), &mut params).unwrap()
        );
        assert_eq!(
            "`t`.`c`",
            qb.build_expression(&Expr::column("t.c"), &mut params).unwrap()
        );
    }
}
