use crate::{
    builder::BuildContext,
    error::Result,
    expr::{Expr, ExpressionBuilder, mismatch},
    operand::{ColumnRef, Operand, Row},
};

use super::{Condition, InColumns, InCondition, build_column};

/// Implicit AND of `column = value` pairs. Iterable and sub-query values become IN conditions.
#[derive(Debug, Clone, PartialEq)]
pub struct HashCondition {
    pub hash: Row,
}

impl HashCondition {
    pub fn new(hash: Row) -> Self {
        Self { hash }
    }
}

pub struct HashBuilder;

impl ExpressionBuilder for HashBuilder {
    fn build(&self, expr: &Expr, context: &mut BuildContext<'_>) -> Result<String> {
        let Expr::Condition(condition) = expr else {
            return Err(mismatch("HashBuilder", expr));
        };
        let Condition::Hash(hash) = condition.as_ref() else {
            return Err(mismatch("HashBuilder", expr));
        };

        let mut parts = Vec::with_capacity(hash.hash.len());
        for (name, value) in &hash.hash {
            let column = ColumnRef::from(name);
            let sql = match value {
                Operand::List(_) | Operand::Map(_) | Operand::Expr(Expr::Query(_)) => {
                    let condition =
                        Condition::In(InCondition::new(InColumns::One(column), false, value.clone()));
                    context.build_expression(&Expr::from(condition))?
                }
                _ if value.is_null() => format!("{} IS NULL", build_column(&column, context)?),
                Operand::Expr(expr) => {
                    let column = build_column(&column, context)?;
                    format!("{column}={}", context.build_expression(expr)?)
                }
                Operand::Value(value) => {
                    let column = build_column(&column, context)?;
                    format!("{column}={}", context.bind(value.clone()))
                }
            };
            if !sql.is_empty() {
                parts.push(sql);
            }
        }

        Ok(match parts.len() {
            0 => String::new(),
            1 => parts.remove(0),
            _ => format!("({})", parts.join(") AND (")),
        })
    }
}
