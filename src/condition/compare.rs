use smol_str::SmolStr;

use crate::{
    builder::BuildContext,
    error::Result,
    expr::{Expr, ExpressionBuilder, mismatch},
    operand::{ColumnRef, Operand},
};

use super::{Condition, build_column, build_placeholder, requires_operands};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CompareOperator {
    Eq,
    /// `<>`
    NotEq,
    /// `!=`, kept as written
    BangEq,
    Gt,
    Gte,
    Lt,
    Lte,
}

impl CompareOperator {
    pub fn parse(operator: &str) -> Option<Self> {
        match operator {
            "=" => Some(CompareOperator::Eq),
            "<>" => Some(CompareOperator::NotEq),
            "!=" => Some(CompareOperator::BangEq),
            ">" => Some(CompareOperator::Gt),
            ">=" => Some(CompareOperator::Gte),
            "<" => Some(CompareOperator::Lt),
            "<=" => Some(CompareOperator::Lte),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            CompareOperator::Eq => "=",
            CompareOperator::NotEq => "<>",
            CompareOperator::BangEq => "!=",
            CompareOperator::Gt => ">",
            CompareOperator::Gte => ">=",
            CompareOperator::Lt => "<",
            CompareOperator::Lte => "<=",
        }
    }
}

/// `column <op> value`. Equality against NULL renders `IS NULL` / `IS NOT NULL`.
#[derive(Debug, Clone, PartialEq)]
pub struct CompareCondition {
    pub column: ColumnRef,
    pub operator: CompareOperator,
    pub value: Operand,
}

impl CompareCondition {
    pub fn from_array_definition(operator: &str, operands: &[Operand]) -> Result<Self> {
        let ([column, value], Some(compare)) = (operands, CompareOperator::parse(operator)) else {
            return Err(requires_operands(operator, "two operands"));
        };
        Ok(Self {
            column: ColumnRef::from_operand(column, operator)?,
            operator: compare,
            value: value.clone(),
        })
    }
}

/// Fallback for operators without a dedicated condition: `column OP value`.
#[derive(Debug, Clone, PartialEq)]
pub struct SimpleCondition {
    pub column: ColumnRef,
    pub operator: SmolStr,
    pub value: Operand,
}

impl SimpleCondition {
    pub fn new(
        column: impl Into<ColumnRef>,
        operator: impl Into<SmolStr>,
        value: impl Into<Operand>,
    ) -> Self {
        Self {
            column: column.into(),
            operator: operator.into(),
            value: value.into(),
        }
    }

    pub fn from_array_definition(operator: &str, operands: &[Operand]) -> Result<Self> {
        let [column, value] = operands else {
            return Err(requires_operands(operator, "two operands"));
        };
        Ok(Self {
            column: ColumnRef::from_operand(column, operator)?,
            operator: operator.into(),
            value: value.clone(),
        })
    }
}

pub struct CompareBuilder;

impl ExpressionBuilder for CompareBuilder {
    fn build(&self, expr: &Expr, context: &mut BuildContext<'_>) -> Result<String> {
        let Expr::Condition(condition) = expr else {
            return Err(mismatch("CompareBuilder", expr));
        };
        let Condition::Compare(compare) = condition.as_ref() else {
            return Err(mismatch("CompareBuilder", expr));
        };

        let column = build_column(&compare.column, context)?;
        let operator = compare.operator.as_str();
        if compare.value.is_null() {
            return Ok(match compare.operator {
                CompareOperator::Eq => format!("{column} IS NULL"),
                CompareOperator::NotEq | CompareOperator::BangEq => {
                    format!("{column} IS NOT NULL")
                }
                _ => format!("{column} {operator} NULL"),
            });
        }
        let value = build_placeholder(&compare.value, operator, context)?;
        Ok(format!("{column} {operator} {value}"))
    }
}

pub struct SimpleBuilder;

impl ExpressionBuilder for SimpleBuilder {
    fn build(&self, expr: &Expr, context: &mut BuildContext<'_>) -> Result<String> {
        let Expr::Condition(condition) = expr else {
            return Err(mismatch("SimpleBuilder", expr));
        };
        let Condition::Simple(simple) = condition.as_ref() else {
            return Err(mismatch("SimpleBuilder", expr));
        };

        let column = build_column(&simple.column, context)?;
        let operator = simple.operator.as_str();
        if simple.value.is_null() {
            return Ok(format!("{column} {operator} NULL"));
        }
        let value = build_placeholder(&simple.value, operator, context)?;
        Ok(format!("{column} {operator} {value}"))
    }
}
