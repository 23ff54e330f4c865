use crate::{
    builder::BuildContext,
    error::{Error, Result},
    expr::{Expr, ExpressionBuilder, mismatch},
    operand::Operand,
    query::Query,
};

use super::Condition;

#[derive(Debug, Clone, PartialEq)]
pub struct ExistsCondition {
    pub not: bool,
    pub query: Box<Query>,
}

impl ExistsCondition {
    pub fn new(not: bool, query: Query) -> Self {
        Self {
            not,
            query: Box::new(query),
        }
    }

    pub fn from_array_definition(operator: &str, operands: &[Operand]) -> Result<Self> {
        match operands.first().and_then(Operand::as_query) {
            Some(query) => Ok(Self::new(operator.starts_with("NOT"), query.clone())),
            None => Err(Error::invalid_argument(
                "Sub query for EXISTS operator must be a Query object.",
            )),
        }
    }
}

pub struct ExistsBuilder;

impl ExpressionBuilder for ExistsBuilder {
    fn build(&self, expr: &Expr, context: &mut BuildContext<'_>) -> Result<String> {
        let Expr::Condition(condition) = expr else {
            return Err(mismatch("ExistsBuilder", expr));
        };
        let Condition::Exists(exists) = condition.as_ref() else {
            return Err(mismatch("ExistsBuilder", expr));
        };

        let sql = context.build_query(&exists.query)?;
        let operator = if exists.not { "NOT EXISTS" } else { "EXISTS" };
        Ok(format!("{operator} ({sql})"))
    }
}
