use crate::{
    builder::BuildContext,
    condition::build_column,
    error::{Error, Result},
    operand::{ColumnRef, Operand},
};

use super::{Expr, ExpressionBuilder, mismatch};

/// `CASE [subject] WHEN .. THEN .. [ELSE ..] END`
///
/// With a subject, WHEN operands are values compared to it. Without one they are conditions.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CaseExpr {
    pub maybe_subject: Option<Operand>,
    pub whens: Vec<(Operand, Operand)>,
    pub maybe_else: Option<Operand>,
}

impl CaseExpr {
    pub fn new() -> Self {
        Self::default()
    }

    /// Case on a value. A string subject is a column name.
    pub fn subject(subject: impl Into<Operand>) -> Self {
        Self {
            maybe_subject: Some(subject.into()),
            ..Self::default()
        }
    }

    pub fn when(mut self, when: impl Into<Operand>, then: impl Into<Operand>) -> Self {
        self.whens.push((when.into(), then.into()));
        self
    }

    pub fn otherwise(mut self, result: impl Into<Operand>) -> Self {
        self.maybe_else = Some(result.into());
        self
    }
}

impl From<CaseExpr> for Expr {
    fn from(value: CaseExpr) -> Self {
        Expr::Case(Box::new(value))
    }
}

pub struct CaseBuilder;

impl ExpressionBuilder for CaseBuilder {
    fn build(&self, expr: &Expr, context: &mut BuildContext<'_>) -> Result<String> {
        let Expr::Case(case) = expr else {
            return Err(mismatch("CaseBuilder", expr));
        };
        if case.whens.is_empty() {
            return Err(Error::invalid_argument(
                "The CASE expression must have at least one WHEN clause.",
            ));
        }

        let mut sql = String::from("CASE");
        if let Some(subject) = &case.maybe_subject {
            let subject = match subject {
                Operand::Value(value) => match value.as_str() {
                    Some(name) => build_column(&ColumnRef::from(name), context)?,
                    None => context.build_value(subject)?,
                },
                other => context.build_value(other)?,
            };
            sql.push(' ');
            sql.push_str(&subject);
        }

        for (when, then) in &case.whens {
            let when = if case.maybe_subject.is_some() {
                context.build_value(when)?
            } else {
                context.build_condition(when)?
            };
            let then = context.build_value(then)?;
            sql.push_str(&format!(" WHEN {when} THEN {then}"));
        }

        if let Some(otherwise) = &case.maybe_else {
            let otherwise = context.build_value(otherwise)?;
            sql.push_str(&format!(" ELSE {otherwise}"));
        }

        sql.push_str(" END");
        Ok(sql)
    }
}

#[cfg(test)]
mod tests {
    use crate::{Dialect, Params, QueryBuilder, expr::Expr, list, value::Value};

    use super::*;

    #[test]
    fn test_case_with_subject() {
        let qb = QueryBuilder::new(Dialect::Postgres);
        let mut params = Params::new();
        let case = CaseExpr::subject("status")
            .when(1, "active")
            .when(2, Expr::raw("'closed'"))
            .otherwise(());
        let sql = qb.build_expression(&case.into(), &mut params).unwrap();
        assert_eq!(
            "CASE \"status\" WHEN :qp0 THEN :qp1 WHEN :qp2 THEN 'closed' ELSE NULL END",
            sql
        );
        assert_eq!(Some(&Value::from("active")), params.value(":qp1"));
    }

    #[test]
    fn test_case_with_conditions() {
        let qb = QueryBuilder::new(Dialect::Sqlite);
        let mut params = Params::new();
        let case = CaseExpr::new()
            .when(list![">", "age", 17], true)
            .otherwise(false);
        let sql = qb.build_expression(&case.into(), &mut params).unwrap();
        assert_eq!("CASE WHEN \"age\" > :qp0 THEN 1 ELSE 0 END", sql);
    }

    #[test]
    fn test_case_without_when() {
        let qb = QueryBuilder::new(Dialect::Postgres);
        let err = qb
            .build_expression(&CaseExpr::subject("a").into(), &mut Params::new())
            .unwrap_err();
        assert!(err.is_invalid_argument());
    }
}
