use std::fmt;

use crate::{
    builder::BuildContext,
    error::Result,
    expr::{Expr, ExpressionBuilder, mismatch},
    operand::Operand,
};

use super::{Condition, requires_operands};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Conjunction {
    And,
    Or,
}

impl fmt::Display for Conjunction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Conjunction::And => f.write_str("AND"),
            Conjunction::Or => f.write_str("OR"),
        }
    }
}

/// Children joined by AND or OR. Children rendering to nothing are skipped.
#[derive(Debug, Clone, PartialEq)]
pub struct ConjunctionCondition {
    pub conjunction: Conjunction,
    pub conditions: Vec<Operand>,
}

impl ConjunctionCondition {
    pub fn new<I, C>(conjunction: Conjunction, conditions: I) -> Self
    where
        I: IntoIterator<Item = C>,
        C: Into<Operand>,
    {
        Self {
            conjunction,
            conditions: conditions.into_iter().map(Into::into).collect(),
        }
    }

    pub fn from_array_definition(operator: &str, operands: &[Operand]) -> Result<Self> {
        let conjunction = if operator == "OR" {
            Conjunction::Or
        } else {
            Conjunction::And
        };
        Ok(Self {
            conjunction,
            conditions: operands.to_vec(),
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct NotCondition {
    pub condition: Operand,
}

impl NotCondition {
    pub fn new(condition: impl Into<Operand>) -> Self {
        Self {
            condition: condition.into(),
        }
    }

    pub fn from_array_definition(operator: &str, operands: &[Operand]) -> Result<Self> {
        let [condition] = operands else {
            return Err(requires_operands(operator, "exactly one operand"));
        };
        Ok(Self::new(condition.clone()))
    }
}

pub struct ConjunctionBuilder;

impl ExpressionBuilder for ConjunctionBuilder {
    fn build(&self, expr: &Expr, context: &mut BuildContext<'_>) -> Result<String> {
        let Expr::Condition(condition) = expr else {
            return Err(mismatch("ConjunctionBuilder", expr));
        };
        let Condition::Conjunction(conjunction) = condition.as_ref() else {
            return Err(mismatch("ConjunctionBuilder", expr));
        };

        let mut parts = Vec::with_capacity(conjunction.conditions.len());
        for child in &conjunction.conditions {
            let sql = context.build_condition(child)?;
            if !sql.is_empty() {
                parts.push(sql);
            }
        }

        Ok(match parts.len() {
            0 => String::new(),
            1 => parts.remove(0),
            _ => format!(
                "({})",
                parts.join(&format!(") {} (", conjunction.conjunction))
            ),
        })
    }
}

pub struct NotBuilder;

impl ExpressionBuilder for NotBuilder {
    fn build(&self, expr: &Expr, context: &mut BuildContext<'_>) -> Result<String> {
        let Expr::Condition(condition) = expr else {
            return Err(mismatch("NotBuilder", expr));
        };
        let Condition::Not(not) = condition.as_ref() else {
            return Err(mismatch("NotBuilder", expr));
        };

        let sql = context.build_condition(&not.condition)?;
        if sql.is_empty() {
            return Ok(sql);
        }
        Ok(format!("NOT ({sql})"))
    }
}

#[cfg(test)]
mod tests {
    use crate::{Dialect, Params, QueryBuilder, list, map};

    use super::*;

    fn build(condition: Operand) -> String {
        let qb = QueryBuilder::new(Dialect::Postgres);
        qb.build_condition(&condition, &mut Params::new()).unwrap()
    }

    #[test]
    fn test_and_or_nesting() {
        let sql = build(list![
            "and",
            map! {"type" => 1},
            list!["or", list!["=", "id", 1], "status = 2"]
        ]);
        assert_eq!(
            "(\"type\"=:qp0) AND ((\"id\" = :qp1) OR (status = 2))",
            sql
        );
    }

    #[test]
    fn test_conjunction_skips_empty() {
        assert_eq!("a = 1", build(list!["and", "a = 1", list![], map! {}]));
        assert_eq!("", build(list!["or", list![]]));
    }

    #[test]
    fn test_not() {
        assert_eq!("NOT (a = 1)", build(list!["not", "a = 1"]));
        assert_eq!("", build(list!["not", list![]]));
    }

    #[test]
    fn test_not_arity() {
        let qb = QueryBuilder::new(Dialect::Postgres);
        let err = qb
            .build_condition(&list!["not", "a", "b"], &mut Params::new())
            .unwrap_err();
        assert_eq!(
            "Invalid argument: Operator 'NOT' requires exactly one operand.",
            err.to_string()
        );
    }

    #[test]
    fn test_conjunction_constructor() {
        let condition = Condition::and([Condition::eq("a", 1), Condition::eq("b", 2)]);
        let qb = QueryBuilder::new(Dialect::Postgres);
        let sql = qb
            .build_condition(&condition.into(), &mut Params::new())
            .unwrap();
        assert_eq!("(\"a\" = :qp0) AND (\"b\" = :qp1)", sql);
    }
}
