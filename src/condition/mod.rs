//! Condition model: one variant per operator family, each with its own builder.
//!
//! Array-form conditions (`["in", "id", [1, 2]]`) are normalized into this tree by
//! [`Condition::from_array_definition`]. Unknown operators fall back to [`SimpleCondition`].

use std::fmt;

use smol_str::SmolStr;

use crate::{
    builder::BuildContext,
    error::{Error, Result},
    expr::{CustomExpr, ExprKind},
    operand::{ColumnRef, Operand, Row},
    query::Query,
};

pub mod between;
pub mod compare;
pub mod exists;
pub mod filter;
pub mod hash;
pub mod r#in;
pub mod like;
pub mod logical;

pub use between::{BetweenColumnsCondition, BetweenCondition};
pub use compare::{CompareCondition, CompareOperator, SimpleCondition};
pub use exists::ExistsCondition;
pub use hash::HashCondition;
pub use r#in::{InColumns, InCondition};
pub use like::{LikeCondition, LikeEscape};
pub use logical::{Conjunction, ConjunctionCondition, NotCondition};

#[derive(Debug, Clone, PartialEq)]
pub enum Condition {
    Compare(CompareCondition),
    Simple(SimpleCondition),
    Between(BetweenCondition),
    BetweenColumns(BetweenColumnsCondition),
    In(InCondition),
    Like(LikeCondition),
    Exists(ExistsCondition),
    Conjunction(ConjunctionCondition),
    Not(NotCondition),
    Hash(HashCondition),
    /// Rendered by the builder registered for the custom expression name.
    Custom(CustomExpr),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConditionKind {
    Compare,
    Simple,
    Between,
    BetweenColumns,
    In,
    Like,
    Exists,
    Conjunction,
    Not,
    Hash,
}

impl fmt::Display for ConditionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// Builds conditions for an operator registered on the [`crate::QueryBuilder`].
pub trait ConditionFactory: Send + Sync {
    fn create(&self, operator: &str, operands: &[Operand]) -> Result<Condition>;
}

impl<F> ConditionFactory for F
where
    F: Fn(&str, &[Operand]) -> Result<Condition> + Send + Sync,
{
    fn create(&self, operator: &str, operands: &[Operand]) -> Result<Condition> {
        self(operator, operands)
    }
}

impl Condition {
    pub(crate) fn expr_kind(&self) -> ExprKind {
        let kind = match self {
            Condition::Compare(_) => ConditionKind::Compare,
            Condition::Simple(_) => ConditionKind::Simple,
            Condition::Between(_) => ConditionKind::Between,
            Condition::BetweenColumns(_) => ConditionKind::BetweenColumns,
            Condition::In(_) => ConditionKind::In,
            Condition::Like(_) => ConditionKind::Like,
            Condition::Exists(_) => ConditionKind::Exists,
            Condition::Conjunction(_) => ConditionKind::Conjunction,
            Condition::Not(_) => ConditionKind::Not,
            Condition::Hash(_) => ConditionKind::Hash,
            Condition::Custom(custom) => return ExprKind::Custom(SmolStr::new(custom.0.name())),
        };
        ExprKind::Condition(kind)
    }

    /// Creates the condition for an upper-cased operator keyword and its operands.
    pub fn from_array_definition(operator: &str, operands: &[Operand]) -> Result<Self> {
        match operator {
            "AND" | "OR" => ConjunctionCondition::from_array_definition(operator, operands)
                .map(Condition::Conjunction),
            "NOT" => NotCondition::from_array_definition(operator, operands).map(Condition::Not),
            "BETWEEN" | "NOT BETWEEN" => {
                BetweenCondition::from_array_definition(operator, operands).map(Condition::Between)
            }
            "IN" | "NOT IN" => {
                InCondition::from_array_definition(operator, operands).map(Condition::In)
            }
            "LIKE" | "NOT LIKE" | "OR LIKE" | "OR NOT LIKE" | "ILIKE" | "NOT ILIKE"
            | "OR ILIKE" | "OR NOT ILIKE" => {
                LikeCondition::from_array_definition(operator, operands).map(Condition::Like)
            }
            "EXISTS" | "NOT EXISTS" => {
                ExistsCondition::from_array_definition(operator, operands).map(Condition::Exists)
            }
            "=" | "<>" | "!=" | ">" | ">=" | "<" | "<=" => {
                CompareCondition::from_array_definition(operator, operands).map(Condition::Compare)
            }
            _ => SimpleCondition::from_array_definition(operator, operands).map(Condition::Simple),
        }
    }

    pub fn eq(column: impl Into<ColumnRef>, value: impl Into<Operand>) -> Self {
        Self::compare(column, CompareOperator::Eq, value)
    }

    pub fn not_eq(column: impl Into<ColumnRef>, value: impl Into<Operand>) -> Self {
        Self::compare(column, CompareOperator::NotEq, value)
    }

    pub fn compare(
        column: impl Into<ColumnRef>,
        operator: CompareOperator,
        value: impl Into<Operand>,
    ) -> Self {
        Condition::Compare(CompareCondition {
            column: column.into(),
            operator,
            value: value.into(),
        })
    }

    pub fn between(
        column: impl Into<ColumnRef>,
        start: impl Into<Operand>,
        end: impl Into<Operand>,
    ) -> Self {
        Condition::Between(BetweenCondition::new(column, false, start, end))
    }

    pub fn not_between(
        column: impl Into<ColumnRef>,
        start: impl Into<Operand>,
        end: impl Into<Operand>,
    ) -> Self {
        Condition::Between(BetweenCondition::new(column, true, start, end))
    }

    pub fn in_values(column: impl Into<ColumnRef>, values: impl Into<Operand>) -> Self {
        Condition::In(InCondition::new(InColumns::One(column.into()), false, values))
    }

    pub fn not_in_values(column: impl Into<ColumnRef>, values: impl Into<Operand>) -> Self {
        Condition::In(InCondition::new(InColumns::One(column.into()), true, values))
    }

    pub fn like(column: impl Into<ColumnRef>, value: impl Into<Operand>) -> Self {
        Condition::Like(LikeCondition::new(column, "LIKE", value))
    }

    pub fn exists(query: Query) -> Self {
        Condition::Exists(ExistsCondition::new(false, query))
    }

    pub fn not_exists(query: Query) -> Self {
        Condition::Exists(ExistsCondition::new(true, query))
    }

    pub fn and<I, C>(conditions: I) -> Self
    where
        I: IntoIterator<Item = C>,
        C: Into<Operand>,
    {
        Condition::Conjunction(ConjunctionCondition::new(Conjunction::And, conditions))
    }

    pub fn or<I, C>(conditions: I) -> Self
    where
        I: IntoIterator<Item = C>,
        C: Into<Operand>,
    {
        Condition::Conjunction(ConjunctionCondition::new(Conjunction::Or, conditions))
    }

    pub fn not(condition: impl Into<Operand>) -> Self {
        Condition::Not(NotCondition::new(condition))
    }

    pub fn hash(hash: Row) -> Self {
        Condition::Hash(HashCondition { hash })
    }
}

/// Renders a column operand, names containing `(` are kept verbatim.
pub(crate) fn build_column(column: &ColumnRef, context: &mut BuildContext<'_>) -> Result<String> {
    match column {
        ColumnRef::Name(name) if name.contains('(') => Ok(name.to_string()),
        ColumnRef::Name(name) => Ok(context.quoter().quote_column_name(name)),
        ColumnRef::Expr(expr) => context.build_expression(expr),
    }
}

/// Renders a scalar operand as an expression or a fresh placeholder.
pub(crate) fn build_placeholder(
    operand: &Operand,
    operator: &str,
    context: &mut BuildContext<'_>,
) -> Result<String> {
    match operand {
        Operand::Expr(expr) => context.build_expression(expr),
        Operand::Value(value) => Ok(context.bind(value.clone())),
        Operand::List(_) | Operand::Map(_) => Err(Error::invalid_argument(format!(
            "Operator '{operator}' does not accept a list operand."
        ))),
    }
}

pub(crate) fn requires_operands(operator: &str, count: &str) -> Error {
    Error::invalid_argument(format!("Operator '{operator}' requires {count}."))
}

#[cfg(test)]
mod tests {
    use crate::{expr::Expr, list};

    use super::*;

    #[test]
    fn test_unknown_operator_is_simple() {
        let condition = Condition::from_array_definition("@>", &[
            Operand::from("tags"),
            Operand::from("{a}"),
        ])
        .unwrap();
        assert!(matches!(condition, Condition::Simple(ref simple) if simple.operator == "@>"));
    }

    #[test]
    fn test_dispatch() {
        let in_condition =
            Condition::from_array_definition("NOT IN", &[Operand::from("id"), list![1, 2]])
                .unwrap();
        assert!(matches!(in_condition, Condition::In(ref c) if c.not));
        let like = Condition::from_array_definition("OR NOT LIKE", &[
            Operand::from("name"),
            Operand::from("x"),
        ])
        .unwrap();
        assert!(matches!(like, Condition::Like(_)));
    }

    #[test]
    fn test_expr_kind() {
        let condition = Condition::eq("a", 1);
        assert_eq!(
            ExprKind::Condition(ConditionKind::Compare),
            Expr::from(condition).kind()
        );
    }
}
