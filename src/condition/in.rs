use smol_str::SmolStr;

use crate::{
    builder::BuildContext,
    error::{Error, Result},
    expr::{Expr, ExpressionBuilder, mismatch},
    operand::{ColumnRef, Operand},
};

use super::{Condition, build_column, build_placeholder, requires_operands};

/// Left side of an IN condition: one column, or a composite column tuple.
#[derive(Debug, Clone, PartialEq)]
pub enum InColumns {
    One(ColumnRef),
    Many(Vec<SmolStr>),
}

impl From<ColumnRef> for InColumns {
    fn from(value: ColumnRef) -> Self {
        InColumns::One(value)
    }
}

impl From<&str> for InColumns {
    fn from(value: &str) -> Self {
        InColumns::One(value.into())
    }
}

impl<S: Into<SmolStr>> From<Vec<S>> for InColumns {
    fn from(values: Vec<S>) -> Self {
        InColumns::Many(values.into_iter().map(Into::into).collect())
    }
}

/// `column [NOT] IN (values)`, values are a list, a single scalar or a sub-query.
#[derive(Debug, Clone, PartialEq)]
pub struct InCondition {
    pub columns: InColumns,
    pub not: bool,
    pub values: Operand,
}

impl InCondition {
    pub fn new(columns: impl Into<InColumns>, not: bool, values: impl Into<Operand>) -> Self {
        Self {
            columns: columns.into(),
            not,
            values: values.into(),
        }
    }

    pub fn from_array_definition(operator: &str, operands: &[Operand]) -> Result<Self> {
        let [column, values] = operands else {
            return Err(requires_operands(operator, "two operands"));
        };
        let columns = match column {
            Operand::List(names) => InColumns::Many(
                names
                    .iter()
                    .map(|name| {
                        name.as_str().map(SmolStr::new).ok_or_else(|| {
                            Error::invalid_argument(format!(
                                "Operator '{operator}' requires column names to be strings."
                            ))
                        })
                    })
                    .collect::<Result<_>>()?,
            ),
            other => InColumns::One(ColumnRef::from_operand(other, operator)?),
        };
        Ok(Self {
            columns,
            not: operator.starts_with("NOT"),
            values: values.clone(),
        })
    }

    fn operator(&self) -> &'static str {
        if self.not { "NOT IN" } else { "IN" }
    }
}

pub struct InBuilder;

impl ExpressionBuilder for InBuilder {
    fn build(&self, expr: &Expr, context: &mut BuildContext<'_>) -> Result<String> {
        let Expr::Condition(condition) = expr else {
            return Err(mismatch("InBuilder", expr));
        };
        let Condition::In(condition) = condition.as_ref() else {
            return Err(mismatch("InBuilder", expr));
        };

        let operator = condition.operator();
        if let Operand::Expr(sub @ (Expr::Query(_) | Expr::Raw(_))) = &condition.values {
            let sql = context.build_expression(sub)?;
            let columns = build_columns(&condition.columns, context)?;
            return Ok(match sub {
                Expr::Query(_) => format!("{columns} {operator} {sql}"),
                _ => format!("{columns} {operator} ({sql})"),
            });
        }
        let values: Vec<Operand> = match &condition.values {
            Operand::List(items) => items.clone(),
            Operand::Map(row) => row.values().cloned().collect(),
            scalar => vec![scalar.clone()],
        };

        if values.is_empty() {
            return Ok(if condition.not { String::new() } else { "0=1".into() });
        }

        match &condition.columns {
            InColumns::Many(names) if names.len() > 1 => {
                build_composite(names, &values, operator, context)
            }
            InColumns::Many(names) => {
                let column = ColumnRef::Name(names.first().cloned().unwrap_or_default());
                build_single(&column, condition.not, &values, context)
            }
            InColumns::One(column) => build_single(column, condition.not, &values, context),
        }
    }
}

fn build_columns(columns: &InColumns, context: &mut BuildContext<'_>) -> Result<String> {
    match columns {
        InColumns::One(column) => build_column(column, context),
        InColumns::Many(names) if names.len() == 1 => {
            Ok(context.quoter().quote_column_name(&names[0]))
        }
        InColumns::Many(names) => Ok(format!("({})", quote_names(names, context))),
    }
}

fn quote_names(names: &[SmolStr], context: &BuildContext<'_>) -> String {
    names
        .iter()
        .map(|name| context.quoter().quote_column_name(name))
        .collect::<Vec<_>>()
        .join(", ")
}

fn build_single(
    column: &ColumnRef,
    not: bool,
    values: &[Operand],
    context: &mut BuildContext<'_>,
) -> Result<String> {
    let operator = if not { "NOT IN" } else { "IN" };
    let name = column.name().unwrap_or_default();
    let mut has_null = false;
    let mut placeholders = Vec::with_capacity(values.len());
    for value in values {
        // rows given as maps contribute their value for this column
        let value = match value {
            Operand::Map(row) => row.get(name).cloned().unwrap_or_default(),
            other => other.clone(),
        };
        if value.is_null() {
            has_null = true;
            continue;
        }
        placeholders.push(build_placeholder(&value, operator, context)?);
    }

    let column = build_column(column, context)?;
    let null_condition = if not {
        format!("{column} IS NOT NULL")
    } else {
        format!("{column} IS NULL")
    };

    let sql = match placeholders.as_slice() {
        [] => return Ok(null_condition),
        [single] if not => format!("{column}<>{single}"),
        [single] => format!("{column}={single}"),
        many => format!("{column} {operator} ({})", many.join(", ")),
    };
    if !has_null {
        return Ok(sql);
    }
    Ok(if not {
        format!("{sql} AND {null_condition}")
    } else {
        format!("{sql} OR {null_condition}")
    })
}

fn build_composite(
    names: &[SmolStr],
    rows: &[Operand],
    operator: &str,
    context: &mut BuildContext<'_>,
) -> Result<String> {
    let mut tuples = Vec::with_capacity(rows.len());
    for row in rows {
        let mut parts = Vec::with_capacity(names.len());
        for (index, name) in names.iter().enumerate() {
            let value = match row {
                Operand::Map(row) => row.get(name.as_str()).cloned(),
                Operand::List(items) => items.get(index).cloned(),
                _ => {
                    return Err(Error::invalid_argument(format!(
                        "Operator '{operator}' requires every value of a composite column to be a list or a map."
                    )));
                }
            };
            match value {
                Some(value) if !value.is_null() => {
                    parts.push(build_placeholder(&value, operator, context)?)
                }
                _ => parts.push("NULL".to_string()),
            }
        }
        tuples.push(format!("({})", parts.join(", ")));
    }
    let columns = quote_names(names, context);
    Ok(format!("({columns}) {operator} ({})", tuples.join(", ")))
}

#[cfg(test)]
mod tests {
    use crate::{Dialect, Params, QueryBuilder, list, map, query::Query};

    use super::*;

    fn build(condition: Operand) -> (String, Params) {
        let qb = QueryBuilder::new(Dialect::Postgres);
        let mut params = Params::new();
        let sql = qb.build_condition(&condition, &mut params).unwrap();
        (sql, params)
    }

    #[test]
    fn test_in_list() {
        let (sql, params) = build(list!["in", "id", list![1, 2, 3]]);
        assert_eq!("\"id\" IN (:qp0, :qp1, :qp2)", sql);
        assert_eq!(3, params.len());
    }

    #[test]
    fn test_in_single_value() {
        let (sql, _) = build(list!["in", "id", list![1]]);
        assert_eq!("\"id\"=:qp0", sql);
        let (sql, _) = build(list!["not in", "id", 5]);
        assert_eq!("\"id\"<>:qp0", sql);
    }

    #[test]
    fn test_in_empty() {
        let (sql, params) = build(list!["in", "id", list![]]);
        assert_eq!("0=1", sql);
        assert!(params.is_empty());
        let (sql, _) = build(list!["not in", "id", list![]]);
        assert_eq!("", sql);
    }

    #[test]
    fn test_in_with_null() {
        let (sql, params) = build(list!["in", "id", list![1, (), 2]]);
        assert_eq!("\"id\" IN (:qp0, :qp1) OR \"id\" IS NULL", sql);
        assert_eq!(2, params.len());
        let (sql, _) = build(list!["not in", "id", list![()]]);
        assert_eq!("\"id\" IS NOT NULL", sql);
    }

    #[test]
    fn test_in_sub_query() {
        let mut sub = Query::new();
        sub.select(["id"]).from("orders");
        let (sql, _) = build(list!["in", "user_id", sub.clone()]);
        assert_eq!("\"user_id\" IN (SELECT \"id\" FROM \"orders\")", sql);

        let (sql, _) = build(list!["in", list!["a", "b"], sub]);
        assert_eq!("(\"a\", \"b\") IN (SELECT \"id\" FROM \"orders\")", sql);
    }

    #[test]
    fn test_in_composite() {
        let (sql, params) = build(list![
            "in",
            list!["id", "name"],
            list![map! {"id" => 1, "name" => "a"}, map! {"id" => 2}]
        ]);
        assert_eq!(
            "(\"id\", \"name\") IN ((:qp0, :qp1), (:qp2, NULL))",
            sql
        );
        assert_eq!(3, params.len());
    }
}
