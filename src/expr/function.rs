use std::fmt;

use smol_str::SmolStr;

use crate::{
    builder::BuildContext,
    condition::build_column,
    dialect::Dialect,
    error::{Error, Result},
    operand::{ColumnRef, Operand},
};

use super::{ArrayExpr, Expr, ExpressionBuilder, mismatch};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Function {
    Length,
    Greatest,
    Least,
    /// Operand with the greatest length.
    Longest,
    /// Operand with the smallest length.
    Shortest,
    /// Union of array operands without duplicates.
    ArrayMerge,
    Count,
    Sum,
    Avg,
    Min,
    Max,
}

impl fmt::Display for Function {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Function::Length => "LENGTH",
            Function::Greatest => "GREATEST",
            Function::Least => "LEAST",
            Function::Longest => "LONGEST",
            Function::Shortest => "SHORTEST",
            Function::ArrayMerge => "ARRAY_MERGE",
            Function::Count => "COUNT",
            Function::Sum => "SUM",
            Function::Avg => "AVG",
            Function::Min => "MIN",
            Function::Max => "MAX",
        };
        f.write_str(name)
    }
}

/// A function call. String operands are column names, other values are bound.
#[derive(Debug, Clone, PartialEq)]
pub struct FunctionExpr {
    pub function: Function,
    pub operands: Vec<Operand>,
    /// Element type of `ArrayMerge` results on PostgreSQL.
    pub maybe_type: Option<SmolStr>,
    /// Sort merged arrays.
    pub ordered: bool,
}

impl FunctionExpr {
    pub fn new<I, O>(function: Function, operands: I) -> Self
    where
        I: IntoIterator<Item = O>,
        O: Into<Operand>,
    {
        Self {
            function,
            operands: operands.into_iter().map(Into::into).collect(),
            maybe_type: None,
            ordered: false,
        }
    }

    pub fn length(operand: impl Into<Operand>) -> Self {
        Self::new(Function::Length, [operand])
    }

    pub fn count_all() -> Self {
        Self::new(Function::Count, Vec::<Operand>::new())
    }

    pub fn typed(mut self, ty: impl Into<SmolStr>) -> Self {
        self.maybe_type = Some(ty.into());
        self
    }

    pub fn ordered(mut self) -> Self {
        self.ordered = true;
        self
    }
}

impl From<FunctionExpr> for Expr {
    fn from(value: FunctionExpr) -> Self {
        Expr::Function(value)
    }
}

pub struct FunctionBuilder;

impl ExpressionBuilder for FunctionBuilder {
    fn build(&self, expr: &Expr, context: &mut BuildContext<'_>) -> Result<String> {
        let Expr::Function(function) = expr else {
            return Err(mismatch("FunctionBuilder", expr));
        };

        let name = function.function;
        match name {
            Function::Count if function.operands.is_empty() => return Ok("COUNT(*)".into()),
            Function::Length
            | Function::Count
            | Function::Sum
            | Function::Avg
            | Function::Min
            | Function::Max => {
                let [operand] = function.operands.as_slice() else {
                    return Err(Error::invalid_argument(format!(
                        "{name}() requires exactly one operand."
                    )));
                };
                let operand = build_operand(operand, context)?;
                return Ok(format!("{name}({operand})"));
            }
            _ => {}
        }

        if function.operands.is_empty() {
            return Err(Error::invalid_argument(format!(
                "{name}() requires at least one operand."
            )));
        }
        if function.operands.len() == 1 && name != Function::ArrayMerge {
            return build_operand(&function.operands[0], context);
        }

        let dialect = context.dialect();
        match name {
            Function::Greatest | Function::Least => {
                let operands = build_operands(&function.operands, context)?;
                let sql_name = match (name, dialect) {
                    (Function::Greatest, Dialect::Sqlite) => "MAX",
                    (Function::Least, Dialect::Sqlite) => "MIN",
                    (Function::Greatest, _) => "GREATEST",
                    _ => "LEAST",
                };
                Ok(format!("{sql_name}({})", operands.join(", ")))
            }
            Function::Longest | Function::Shortest => {
                let operands = build_operands(&function.operands, context)?;
                let order = if name == Function::Longest { "DESC" } else { "ASC" };
                let union = operands
                    .iter()
                    .map(|operand| format!("SELECT {operand} AS value"))
                    .collect::<Vec<_>>()
                    .join(" UNION ");
                Ok(format!(
                    "(SELECT value FROM ({union}) AS t ORDER BY LENGTH(value) {order} LIMIT 1)"
                ))
            }
            Function::ArrayMerge => build_array_merge(function, context),
            Function::Length
            | Function::Count
            | Function::Sum
            | Function::Avg
            | Function::Min
            | Function::Max => {
                Err(Error::invalid_argument(format!(
                    "{name}() requires exactly one operand."
                )))
            }
        }
    }
}

fn build_operand(operand: &Operand, context: &mut BuildContext<'_>) -> Result<String> {
    match operand {
        Operand::Value(value) => match value.as_str() {
            Some(name) => build_column(&ColumnRef::from(name), context),
            None => context.build_value(operand),
        },
        other => context.build_value(other),
    }
}

fn build_operands(operands: &[Operand], context: &mut BuildContext<'_>) -> Result<Vec<String>> {
    operands
        .iter()
        .map(|operand| build_operand(operand, context))
        .collect()
}

fn build_array_merge(function: &FunctionExpr, context: &mut BuildContext<'_>) -> Result<String> {
    let dialect = context.dialect();
    if dialect == Dialect::Ansi {
        return Err(Error::not_supported("ARRAY_MERGE()"));
    }

    let mut arrays = Vec::with_capacity(function.operands.len());
    for operand in &function.operands {
        let sql = match operand {
            Operand::List(_) | Operand::Map(_) => {
                let mut array = ArrayExpr::new(operand.clone());
                if let Some(ty) = &function.maybe_type {
                    array = array.typed(ty.clone());
                }
                context.build_expression(&Expr::Array(array))?
            }
            other => build_operand(other, context)?,
        };
        arrays.push(sql);
    }

    let order = if function.ordered { " ORDER BY value" } else { "" };
    Ok(match dialect {
        Dialect::Postgres => {
            let cast = function
                .maybe_type
                .as_ref()
                .map(|ty| {
                    if ty.ends_with("[]") {
                        format!("::{ty}")
                    } else {
                        format!("::{ty}[]")
                    }
                })
                .unwrap_or_default();
            let unions = arrays
                .iter()
                .map(|array| format!("SELECT UNNEST({array}) AS value"))
                .collect::<Vec<_>>()
                .join(" UNION ");
            format!("ARRAY(SELECT value FROM ({unions}) AS t{order}){cast}")
        }
        Dialect::MySql => {
            let unions = arrays
                .iter()
                .map(|array| {
                    format!(
                        "SELECT value FROM JSON_TABLE({array}, '$[*]' COLUMNS(value json PATH '$')) AS t"
                    )
                })
                .collect::<Vec<_>>()
                .join(" UNION ");
            format!("(SELECT JSON_ARRAYAGG(value) AS value FROM ({unions}{order}) AS t)")
        }
        Dialect::Sqlite | Dialect::Ansi => {
            let unions = arrays
                .iter()
                .map(|array| format!("SELECT value FROM json_each({array})"))
                .collect::<Vec<_>>()
                .join(" UNION ");
            format!("(SELECT json_group_array(value) AS value FROM ({unions}{order}))")
        }
    })
}

#[cfg(test)]
mod tests {
    use crate::{Dialect, Params, QueryBuilder, list};

    use super::*;

    fn build(dialect: Dialect, expr: FunctionExpr) -> Result<(String, Params)> {
        let qb = QueryBuilder::new(dialect);
        let mut params = Params::new();
        let sql = qb.build_expression(&expr.into(), &mut params)?;
        Ok((sql, params))
    }

    #[test]
    fn test_greatest_per_dialect() {
        let expr = FunctionExpr::new(Function::Greatest, [Operand::from("a"), Operand::from(5)]);
        let (sql, params) = build(Dialect::Postgres, expr.clone()).unwrap();
        assert_eq!("GREATEST(\"a\", :qp0)", sql);
        assert_eq!(1, params.len());
        let (sql, _) = build(Dialect::Sqlite, expr).unwrap();
        assert_eq!("MAX(\"a\", :qp0)", sql);
    }

    #[test]
    fn test_single_operand_is_itself() {
        let (sql, _) = build(Dialect::MySql, FunctionExpr::new(Function::Least, ["price"])).unwrap();
        assert_eq!("`price`", sql);
    }

    #[test]
    fn test_count() {
        let (sql, _) = build(Dialect::Postgres, FunctionExpr::count_all()).unwrap();
        assert_eq!("COUNT(*)", sql);
        let (sql, _) = build(Dialect::Postgres, FunctionExpr::new(Function::Count, ["id"])).unwrap();
        assert_eq!("COUNT(\"id\")", sql);
    }

    #[test]
    fn test_length_arity() {
        let err = build(Dialect::Postgres, FunctionExpr::new(Function::Length, ["a", "b"]))
            .unwrap_err();
        assert_eq!(
            "Invalid argument: LENGTH() requires exactly one operand.",
            err.to_string()
        );
    }

    #[test]
    fn test_longest() {
        let (sql, _) = build(
            Dialect::Postgres,
            FunctionExpr::new(Function::Longest, ["a", "b"]),
        )
        .unwrap();
        assert_eq!(
            "(SELECT value FROM (SELECT \"a\" AS value UNION SELECT \"b\" AS value) AS t ORDER BY LENGTH(value) DESC LIMIT 1)",
            sql
        );
    }

    #[test]
    fn test_array_merge() {
        let expr = FunctionExpr::new(Function::ArrayMerge, [list![1, 2], list![2, 3]]).typed("int");
        let (sql, params) = build(Dialect::Postgres, expr.clone()).unwrap();
        assert_eq!(
            "ARRAY(SELECT value FROM (SELECT UNNEST(ARRAY[:qp0, :qp1]::int[]) AS value UNION SELECT UNNEST(ARRAY[:qp2, :qp3]::int[]) AS value) AS t)::int[]",
            sql
        );
        assert_eq!(4, params.len());

        let err = build(Dialect::Ansi, expr).unwrap_err();
        assert!(err.is_not_supported());
    }
}
