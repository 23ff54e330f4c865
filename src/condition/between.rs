use crate::{
    builder::BuildContext,
    error::Result,
    expr::{Expr, ExpressionBuilder, mismatch},
    operand::{ColumnRef, Operand},
};

use super::{Condition, build_column, build_placeholder, requires_operands};

/// `column [NOT] BETWEEN start AND end`
#[derive(Debug, Clone, PartialEq)]
pub struct BetweenCondition {
    pub column: ColumnRef,
    pub not: bool,
    pub start: Operand,
    pub end: Operand,
}

impl BetweenCondition {
    pub fn new(
        column: impl Into<ColumnRef>,
        not: bool,
        start: impl Into<Operand>,
        end: impl Into<Operand>,
    ) -> Self {
        Self {
            column: column.into(),
            not,
            start: start.into(),
            end: end.into(),
        }
    }

    pub fn from_array_definition(operator: &str, operands: &[Operand]) -> Result<Self> {
        let [column, start, end] = operands else {
            return Err(requires_operands(operator, "three operands"));
        };
        Ok(Self {
            column: ColumnRef::from_operand(column, operator)?,
            not: operator.starts_with("NOT"),
            start: start.clone(),
            end: end.clone(),
        })
    }

    fn operator(&self) -> &'static str {
        if self.not { "NOT BETWEEN" } else { "BETWEEN" }
    }
}

/// `value [NOT] BETWEEN start_column AND end_column`, the value is the bound side.
#[derive(Debug, Clone, PartialEq)]
pub struct BetweenColumnsCondition {
    pub value: Operand,
    pub not: bool,
    pub start_column: ColumnRef,
    pub end_column: ColumnRef,
}

impl BetweenColumnsCondition {
    pub fn new(
        value: impl Into<Operand>,
        not: bool,
        start_column: impl Into<ColumnRef>,
        end_column: impl Into<ColumnRef>,
    ) -> Self {
        Self {
            value: value.into(),
            not,
            start_column: start_column.into(),
            end_column: end_column.into(),
        }
    }

    fn operator(&self) -> &'static str {
        if self.not { "NOT BETWEEN" } else { "BETWEEN" }
    }
}

impl From<BetweenColumnsCondition> for Condition {
    fn from(value: BetweenColumnsCondition) -> Self {
        Condition::BetweenColumns(value)
    }
}

pub struct BetweenBuilder;

impl ExpressionBuilder for BetweenBuilder {
    fn build(&self, expr: &Expr, context: &mut BuildContext<'_>) -> Result<String> {
        let Expr::Condition(condition) = expr else {
            return Err(mismatch("BetweenBuilder", expr));
        };
        let Condition::Between(between) = condition.as_ref() else {
            return Err(mismatch("BetweenBuilder", expr));
        };

        let operator = between.operator();
        let column = build_column(&between.column, context)?;
        let start = build_placeholder(&between.start, operator, context)?;
        let end = build_placeholder(&between.end, operator, context)?;
        Ok(format!("{column} {operator} {start} AND {end}"))
    }
}

pub struct BetweenColumnsBuilder;

impl ExpressionBuilder for BetweenColumnsBuilder {
    fn build(&self, expr: &Expr, context: &mut BuildContext<'_>) -> Result<String> {
        let Expr::Condition(condition) = expr else {
            return Err(mismatch("BetweenColumnsBuilder", expr));
        };
        let Condition::BetweenColumns(between) = condition.as_ref() else {
            return Err(mismatch("BetweenColumnsBuilder", expr));
        };

        let operator = between.operator();
        let value = build_placeholder(&between.value, operator, context)?;
        let start = build_column(&between.start_column, context)?;
        let end = build_column(&between.end_column, context)?;
        Ok(format!("{value} {operator} {start} AND {end}"))
    }
}

#[cfg(test)]
mod tests {
    use crate::{Dialect, Params, QueryBuilder, expr::Expr, list};

    use super::*;

    #[test]
    fn test_between() {
        let qb = QueryBuilder::new(Dialect::Postgres);
        let mut params = Params::new();
        let sql = qb
            .build_condition(&list!["between", "age", 18, 65], &mut params)
            .unwrap();
        assert_eq!("\"age\" BETWEEN :qp0 AND :qp1", sql);
        assert_eq!(2, params.len());

        let sql = qb
            .build_condition(
                &list!["not between", "at", Expr::raw("NOW()"), 5],
                &mut params,
            )
            .unwrap();
        assert_eq!("\"at\" NOT BETWEEN NOW() AND :qp2", sql);
    }

    #[test]
    fn test_between_arity() {
        let qb = QueryBuilder::new(Dialect::Postgres);
        let err = qb
            .build_condition(&list!["between", "age", 18], &mut Params::new())
            .unwrap_err();
        assert_eq!(
            "Invalid argument: Operator 'BETWEEN' requires three operands.",
            err.to_string()
        );
    }

    #[test]
    fn test_between_columns() {
        let qb = QueryBuilder::new(Dialect::MySql);
        let mut params = Params::new();
        let condition = BetweenColumnsCondition::new(42, false, "min_price", "max_price");
        let sql = qb
            .build_condition(&Condition::from(condition).into(), &mut params)
            .unwrap();
        assert_eq!(":qp0 BETWEEN `min_price` AND `max_price`", sql);
        assert_eq!(1, params.len());
    }
}
