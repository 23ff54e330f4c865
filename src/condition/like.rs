use std::sync::LazyLock;

use regex::Regex;
use smol_str::SmolStr;

use crate::{
    builder::BuildContext,
    dialect::Dialect,
    error::{Error, Result},
    expr::{Expr, ExpressionBuilder, mismatch},
    operand::{ColumnRef, Operand},
    value::Value,
};

use super::{Condition, build_column, build_placeholder, requires_operands};

static LIKE_OPERATOR: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(AND |OR |)(((NOT |))I?LIKE)$").expect("valid like operator regex")
});

const DEFAULT_ESCAPES: [(&str, &str); 3] = [("%", "\\%"), ("_", "\\_"), ("\\", "\\\\")];

/// How LIKE values are escaped before binding.
#[derive(Debug, Clone, Default, PartialEq)]
pub enum LikeEscape {
    /// Escape `%`, `_`, `\` and wrap the value in `%`.
    #[default]
    Default,
    /// Bind the value verbatim.
    None,
    /// Custom replacement pairs, the value is wrapped in `%`.
    Custom(Vec<(String, String)>),
}

/// `column [NOT] [I]LIKE value`, a value list joins its parts with AND, or OR for the `OR ...`
/// operators.
#[derive(Debug, Clone, PartialEq)]
pub struct LikeCondition {
    pub column: ColumnRef,
    pub operator: SmolStr,
    pub value: Operand,
    pub escape: LikeEscape,
}

impl LikeCondition {
    pub fn new(
        column: impl Into<ColumnRef>,
        operator: impl Into<SmolStr>,
        value: impl Into<Operand>,
    ) -> Self {
        Self {
            column: column.into(),
            operator: operator.into(),
            value: value.into(),
            escape: LikeEscape::Default,
        }
    }

    pub fn escape(mut self, escape: LikeEscape) -> Self {
        self.escape = escape;
        self
    }

    pub fn from_array_definition(operator: &str, operands: &[Operand]) -> Result<Self> {
        let (column, value, escape) = match operands {
            [column, value] => (column, value, LikeEscape::Default),
            [column, value, escape] => (column, value, parse_escape(escape, operator)?),
            _ => return Err(requires_operands(operator, "two operands")),
        };
        Ok(Self {
            column: ColumnRef::from_operand(column, operator)?,
            operator: operator.into(),
            value: value.clone(),
            escape,
        })
    }
}

fn parse_escape(escape: &Operand, operator: &str) -> Result<LikeEscape> {
    match escape {
        Operand::Value(Value::Bool(false)) | Operand::Value(Value::Null) => Ok(LikeEscape::None),
        Operand::Value(Value::Bool(true)) => Ok(LikeEscape::Default),
        Operand::Map(pairs) => pairs
            .iter()
            .map(|(from, to)| match to.as_str() {
                Some(to) => Ok((from.clone(), to.to_string())),
                None => Err(Error::invalid_argument(format!(
                    "Operator '{operator}' requires escape replacements to be strings."
                ))),
            })
            .collect::<Result<Vec<_>>>()
            .map(LikeEscape::Custom),
        _ => Err(Error::invalid_argument(format!(
            "Operator '{operator}' requires the escape operand to be false or a map."
        ))),
    }
}

/// Single-pass replacement that prefers the longest matching key.
fn escape_value(value: &str, pairs: &[(&str, &str)]) -> String {
    let mut out = String::with_capacity(value.len() + 2);
    let mut rest = value;
    while !rest.is_empty() {
        let mut best: Option<(&str, &str)> = None;
        for &(from, to) in pairs {
            if !from.is_empty()
                && rest.starts_with(from)
                && best.is_none_or(|(b, _)| from.len() > b.len())
            {
                best = Some((from, to));
            }
        }
        if let Some((from, to)) = best {
            out.push_str(to);
            rest = &rest[from.len()..];
            continue;
        }
        let mut chars = rest.chars();
        if let Some(c) = chars.next() {
            out.push(c);
        }
        rest = chars.as_str();
    }
    out
}

pub struct LikeBuilder;

impl ExpressionBuilder for LikeBuilder {
    fn build(&self, expr: &Expr, context: &mut BuildContext<'_>) -> Result<String> {
        let Expr::Condition(condition) = expr else {
            return Err(mismatch("LikeBuilder", expr));
        };
        let Condition::Like(like) = condition.as_ref() else {
            return Err(mismatch("LikeBuilder", expr));
        };

        let operator = like.operator.to_uppercase();
        let Some(caps) = LIKE_OPERATOR.captures(&operator) else {
            return Err(Error::invalid_argument(format!(
                "Invalid operator in like condition: \"{operator}\""
            )));
        };
        let conjunction = if caps.get(1).is_some_and(|m| m.as_str() == "OR ") {
            " OR "
        } else {
            " AND "
        };
        let like_operator = caps.get(2).map_or("LIKE", |m| m.as_str());
        let not = caps.get(4).is_some_and(|m| !m.as_str().is_empty());

        let dialect = context.dialect();
        if like_operator.contains("ILIKE") && dialect != Dialect::Postgres {
            return Err(Error::not_supported(format!("{like_operator} operator")));
        }

        let values = match &like.value {
            Operand::List(items) => items.clone(),
            Operand::Map(row) => row.values().cloned().collect(),
            Operand::Value(Value::Null) => Vec::new(),
            other => vec![other.clone()],
        };
        if values.is_empty() {
            return Ok(if not { String::new() } else { "0=1".into() });
        }

        let pairs: Vec<(&str, &str)> = match &like.escape {
            LikeEscape::Default => DEFAULT_ESCAPES.to_vec(),
            LikeEscape::None => Vec::new(),
            LikeEscape::Custom(pairs) => pairs
                .iter()
                .map(|(from, to)| (from.as_str(), to.as_str()))
                .collect(),
        };
        let escaping = like.escape != LikeEscape::None;
        let escape_sql = if escaping && dialect == Dialect::Sqlite {
            " ESCAPE '\\'"
        } else {
            ""
        };

        let column = build_column(&like.column, context)?;
        let mut parts = Vec::with_capacity(values.len());
        for value in values {
            let placeholder = match value {
                Operand::Value(value) if escaping => {
                    let text = escape_value(&value.to_string(), &pairs);
                    let placeholder = context.bind(format!("%{text}%"));
                    format!("{placeholder}{escape_sql}")
                }
                Operand::Value(value) => context.bind(value.to_string()),
                other => build_placeholder(&other, like_operator, context)?,
            };
            parts.push(format!("{column} {like_operator} {placeholder}"));
        }
        Ok(parts.join(conjunction))
    }
}

#[cfg(test)]
mod tests {
    use crate::{Dialect, Params, QueryBuilder, list, map, value::Value};

    use super::*;

    fn build(dialect: Dialect, condition: Operand) -> Result<(String, Params)> {
        let qb = QueryBuilder::new(dialect);
        let mut params = Params::new();
        let sql = qb.build_condition(&condition, &mut params)?;
        Ok((sql, params))
    }

    #[test]
    fn test_like_escapes_and_wraps() {
        let (sql, params) = build(Dialect::Postgres, list!["like", "name", "10%_a\\b"]).unwrap();
        assert_eq!("\"name\" LIKE :qp0", sql);
        assert_eq!(
            Some(&Value::from("%10\\%\\_a\\\\b%")),
            params.value(":qp0")
        );
    }

    #[test]
    fn test_or_not_like_list() {
        let (sql, params) =
            build(Dialect::MySql, list!["or not like", "name", list!["a", "b"]]).unwrap();
        assert_eq!("`name` NOT LIKE :qp0 OR `name` NOT LIKE :qp1", sql);
        assert_eq!(2, params.len());
    }

    #[test]
    fn test_like_without_escape() {
        let (sql, params) = build(Dialect::Postgres, list!["like", "name", "a%", false]).unwrap();
        assert_eq!("\"name\" LIKE :qp0", sql);
        assert_eq!(Some(&Value::from("a%")), params.value(":qp0"));
    }

    #[test]
    fn test_like_custom_escape() {
        let (_, params) =
            build(Dialect::Postgres, list!["like", "name", "a*b", map! {"*" => "\\*"}]).unwrap();
        assert_eq!(Some(&Value::from("%a\\*b%")), params.value(":qp0"));
    }

    #[test]
    fn test_like_sqlite_escape_clause() {
        let (sql, _) = build(Dialect::Sqlite, list!["like", "name", "x"]).unwrap();
        assert_eq!("\"name\" LIKE :qp0 ESCAPE '\\'", sql);
    }

    #[test]
    fn test_like_empty_values() {
        let (sql, _) = build(Dialect::Postgres, list!["like", "name", list![]]).unwrap();
        assert_eq!("0=1", sql);
        let (sql, _) = build(Dialect::Postgres, list!["not like", "name", list![]]).unwrap();
        assert_eq!("", sql);
    }

    #[test]
    fn test_ilike() {
        let (sql, _) = build(Dialect::Postgres, list!["ilike", "name", "x"]).unwrap();
        assert_eq!("\"name\" ILIKE :qp0", sql);
        let err = build(Dialect::MySql, list!["ilike", "name", "x"]).unwrap_err();
        assert!(err.is_not_supported());
    }

    #[test]
    fn test_escape_prefers_longest_key() {
        assert_eq!(
            "[ab]c",
            escape_value("abc", &[("a", "[a]"), ("ab", "[ab]")])
        );
    }
}
