//! SELECT assembly.
//!
//! Clauses render in a fixed order: SELECT, FROM, JOIN, WHERE, GROUP BY, HAVING, then ORDER BY
//! and LIMIT are appended. A query with unions is wrapped in parentheses before its UNION
//! clauses, and WITH clauses go in front of everything.

use std::sync::LazyLock;

use regex::Regex;

use crate::{
    dialect::Dialect,
    error::Result,
    expr::Expr,
    operand::{ColumnRef, Operand},
    query::{Aliased, Join, Limit, Order, OrderBy, Query, Union, With},
    value::Params,
};

use super::{BuildContext, QueryBuilder};

/// `expr AS alias` or `expr alias` in a select list.
pub(crate) static SELECT_ALIAS: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(.*?)(?i:\s+as\s+|\s+)([\w\-_.]+)$").expect("valid select alias regex")
});

/// `table AS alias` or `table alias` in a from list.
static TABLE_ALIAS: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(.*?)(?i:\s+as|)\s+([^ ]+)$").expect("valid table alias regex")
});

const MYSQL_MAX_LIMIT: &str = "18446744073709551615";
const SQLITE_MAX_LIMIT: &str = "9223372036854775807";

impl QueryBuilder {
    /// Renders a SELECT. `params` is merged with the query's own parameters and every value
    /// bound while rendering is added to it.
    pub fn build(&self, query: &Query, params: Params) -> Result<(String, Params)> {
        let mut params = params;
        let sql = BuildContext::new(self, &mut params).build_query(query)?;
        self.log_statement("select", &sql, &params);
        Ok((sql, params))
    }

    pub fn select_exists(&self, sql: &str) -> String {
        format!("SELECT EXISTS({sql})")
    }
}

impl BuildContext<'_> {
    pub(crate) fn build_select_query(&mut self, query: &Query) -> Result<String> {
        let separator = self.builder.separator();

        let clauses = [
            self.build_select(&query.select, query.distinct, query.maybe_select_option.as_deref())?,
            self.build_from(&query.from)?,
            self.build_join(&query.joins)?,
            self.build_where(query.maybe_where.as_ref())?,
            self.build_group_by(&query.group_by)?,
            self.build_having(query.maybe_having.as_ref())?,
        ];
        let mut sql = clauses
            .into_iter()
            .filter(|clause| !clause.is_empty())
            .collect::<Vec<_>>()
            .join(separator);

        let order_by = self.build_order_by(&query.order_by)?;
        if !order_by.is_empty() {
            sql.push_str(separator);
            sql.push_str(&order_by);
        }
        let limit = self.build_limit(query.maybe_limit.as_ref(), query.maybe_offset.as_ref())?;
        if !limit.is_empty() {
            sql.push_str(separator);
            sql.push_str(&limit);
        }
        for clause in &query.for_clauses {
            sql.push_str(separator);
            sql.push_str(clause);
        }

        let union = self.build_union(&query.unions)?;
        if !union.is_empty() {
            sql = format!("({sql}){separator}{union}");
        }

        let with = self.build_with(&query.withs)?;
        if !with.is_empty() {
            sql = format!("{with}{separator}{sql}");
        }

        Ok(sql)
    }

    // select stuff

    pub fn build_select(
        &mut self,
        columns: &[Aliased],
        distinct: bool,
        maybe_option: Option<&str>,
    ) -> Result<String> {
        let mut select = String::from(if distinct { "SELECT DISTINCT" } else { "SELECT" });
        if let Some(option) = maybe_option {
            select.push(' ');
            select.push_str(option);
        }
        if columns.is_empty() {
            return Ok(select + " *");
        }

        let mut rendered = Vec::with_capacity(columns.len());
        for column in columns {
            rendered.push(self.build_select_column(column)?);
        }
        Ok(format!("{select} {}", rendered.join(", ")))
    }

    fn build_select_column(&mut self, column: &Aliased) -> Result<String> {
        let quoter = self.quoter();
        match (&column.item, &column.alias) {
            (ColumnRef::Expr(expr), Some(alias)) => {
                let alias = quoter.quote_column_name(alias);
                Ok(format!("{} AS {alias}", self.build_expression(expr)?))
            }
            (ColumnRef::Expr(expr), None) => self.build_expression(expr),
            (ColumnRef::Name(name), Some(alias)) => {
                let name = if name.contains('(') {
                    name.to_string()
                } else {
                    quoter.quote_column_name(name)
                };
                Ok(format!("{name} AS {}", quoter.quote_column_name(alias)))
            }
            (ColumnRef::Name(name), None) if name.contains('(') => Ok(name.to_string()),
            (ColumnRef::Name(name), None) => match SELECT_ALIAS.captures(name) {
                Some(caps) => {
                    let expr = caps.get(1).map_or("", |m| m.as_str());
                    let alias = caps.get(2).map_or("", |m| m.as_str());
                    Ok(format!(
                        "{} AS {}",
                        quoter.quote_column_name(expr),
                        quoter.quote_column_name(alias)
                    ))
                }
                None => Ok(quoter.quote_column_name(name)),
            },
        }
    }

    // from stuff

    pub fn build_from(&mut self, tables: &[Aliased]) -> Result<String> {
        if tables.is_empty() {
            return Ok(String::new());
        }
        let mut rendered = Vec::with_capacity(tables.len());
        for table in tables {
            rendered.push(self.build_table(table)?);
        }
        Ok(format!("FROM {}", rendered.join(", ")))
    }

    fn build_table(&mut self, table: &Aliased) -> Result<String> {
        let quoter = self.quoter();
        match (&table.item, &table.alias) {
            (ColumnRef::Expr(expr), Some(alias)) => {
                let alias = quoter.quote_table_name(alias);
                Ok(format!("{} {alias}", self.build_expression(expr)?))
            }
            (ColumnRef::Expr(expr), None) => self.build_expression(expr),
            (ColumnRef::Name(name), Some(alias)) => {
                let name = if name.contains('(') {
                    name.to_string()
                } else {
                    quoter.quote_table_name(name)
                };
                Ok(format!("{name} {}", quoter.quote_table_name(alias)))
            }
            (ColumnRef::Name(name), None) if name.contains('(') => Ok(name.to_string()),
            (ColumnRef::Name(name), None) => match TABLE_ALIAS.captures(name) {
                Some(caps) => {
                    let table = caps.get(1).map_or("", |m| m.as_str());
                    let alias = caps.get(2).map_or("", |m| m.as_str());
                    Ok(format!(
                        "{} {}",
                        quoter.quote_table_name(table),
                        quoter.quote_table_name(alias)
                    ))
                }
                None => Ok(quoter.quote_table_name(name)),
            },
        }
    }

    // join stuff

    pub fn build_join(&mut self, joins: &[Join]) -> Result<String> {
        let mut rendered = Vec::with_capacity(joins.len());
        for join in joins {
            let mut sql = format!("{} {}", join.kind, self.build_table(&join.table)?);
            if let Some(on) = &join.on {
                let condition = self.build_condition(on)?;
                if !condition.is_empty() {
                    sql.push_str(" ON ");
                    sql.push_str(&condition);
                }
            }
            rendered.push(sql);
        }
        Ok(rendered.join(self.builder.separator()))
    }

    // where stuff

    pub fn build_where(&mut self, condition: Option<&Operand>) -> Result<String> {
        self.build_prefixed_condition("WHERE", condition)
    }

    pub fn build_having(&mut self, condition: Option<&Operand>) -> Result<String> {
        self.build_prefixed_condition("HAVING", condition)
    }

    fn build_prefixed_condition(&mut self, keyword: &str, condition: Option<&Operand>) -> Result<String> {
        let Some(condition) = condition else {
            return Ok(String::new());
        };
        let sql = self.build_condition(condition)?;
        if sql.is_empty() {
            Ok(sql)
        } else {
            Ok(format!("{keyword} {sql}"))
        }
    }

    // group stuff

    pub fn build_group_by(&mut self, columns: &[ColumnRef]) -> Result<String> {
        if columns.is_empty() {
            return Ok(String::new());
        }
        let mut rendered = Vec::with_capacity(columns.len());
        for column in columns {
            let sql = match column {
                ColumnRef::Name(name) => self.quoter().quote_column_name(name),
                ColumnRef::Expr(expr) => self.build_expression(expr)?,
            };
            rendered.push(sql);
        }
        Ok(format!("GROUP BY {}", rendered.join(", ")))
    }

    // order stuff

    pub fn build_order_by(&mut self, columns: &[OrderBy]) -> Result<String> {
        if columns.is_empty() {
            return Ok(String::new());
        }
        let mut rendered = Vec::with_capacity(columns.len());
        for column in columns {
            let sql = match column {
                OrderBy::Column(name, order) => {
                    let name = self.quoter().quote_column_name(name);
                    match order {
                        Order::Asc => name,
                        Order::Desc => format!("{name} DESC"),
                    }
                }
                OrderBy::Expr(expr) => self.build_expression(expr)?,
            };
            rendered.push(sql);
        }
        Ok(format!("ORDER BY {}", rendered.join(", ")))
    }

    // pagination

    /// Negative counts are not rendered and an offset of 0 means no offset.
    pub fn build_limit(&mut self, limit: Option<&Limit>, offset: Option<&Limit>) -> Result<String> {
        let limit = match limit {
            Some(Limit::Count(count)) if *count >= 0 => Some(count.to_string()),
            Some(Limit::Expr(expr)) => Some(self.build_expression(expr)?),
            _ => None,
        };
        let offset = match offset {
            Some(Limit::Count(count)) if *count > 0 => Some(count.to_string()),
            Some(Limit::Expr(expr)) => Some(self.build_expression(expr)?),
            _ => None,
        };

        Ok(match (limit, offset) {
            (Some(limit), Some(offset)) => format!("LIMIT {limit} OFFSET {offset}"),
            (Some(limit), None) => format!("LIMIT {limit}"),
            (None, Some(offset)) => match self.dialect() {
                Dialect::MySql => format!("LIMIT {offset}, {MYSQL_MAX_LIMIT}"),
                Dialect::Sqlite => format!("LIMIT {SQLITE_MAX_LIMIT} OFFSET {offset}"),
                Dialect::Postgres | Dialect::Ansi => format!("OFFSET {offset}"),
            },
            (None, None) => String::new(),
        })
    }

    // compound stuff

    pub fn build_union(&mut self, unions: &[Union]) -> Result<String> {
        let mut rendered = Vec::with_capacity(unions.len());
        for union in unions {
            let sql = self.build_compound_query(&union.query)?;
            let all = if union.all { "ALL " } else { "" };
            rendered.push(format!("UNION {all}( {sql} )"));
        }
        Ok(rendered.join(self.builder.separator()))
    }

    pub fn build_with(&mut self, withs: &[With]) -> Result<String> {
        if withs.is_empty() {
            return Ok(String::new());
        }
        let recursive = withs.iter().any(|with| with.recursive);
        let mut rendered = Vec::with_capacity(withs.len());
        for with in withs {
            let sql = self.build_compound_query(&with.query)?;
            rendered.push(format!("{} AS ({sql})", with.alias));
        }
        let keyword = if recursive { "WITH RECURSIVE" } else { "WITH" };
        Ok(format!("{keyword} {}", rendered.join(", ")))
    }

    /// A query without the parentheses its expression form would add.
    fn build_compound_query(&mut self, query: &Expr) -> Result<String> {
        match query {
            Expr::Query(query) => self.build_query(query),
            other => self.build_expression(other),
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::{
        expr::{Function, FunctionExpr},
        list, map,
        query::sub,
        tests::replace_quotes,
        value::Value,
    };

    use super::*;

    fn build(dialect: Dialect, query: &Query) -> (String, Params) {
        QueryBuilder::new(dialect)
            .build(query, Params::new())
            .unwrap()
    }

    #[test]
    fn test_simple_select() {
        let mut query = Query::new();
        query
            .select(["id", "name"])
            .from("user")
            .where_condition(map! {"status" => 1});
        for dialect in [Dialect::Postgres, Dialect::MySql, Dialect::Sqlite] {
            let (sql, params) = build(dialect, &query);
            assert_eq!(
                replace_quotes(
                    "SELECT [[id]], [[name]] FROM [[user]] WHERE [[status]]=:qp0",
                    dialect
                ),
                sql
            );
            assert_eq!(Some(&Value::Int(1)), params.value(":qp0"));
        }
    }

    #[test]
    fn test_clause_order() {
        let mut query = Query::new();
        query
            .select(["id", "COUNT(*) AS cnt"])
            .from_as("u", "user")
            .left_join("profile p", "p.user_id = u.id")
            .where_condition(map! {"status" => 1})
            .group_by(["id"])
            .having(list![">", "cnt", 2])
            .order_by("id", Order::Desc)
            .limit(10)
            .offset(20);
        let (sql, params) = build(Dialect::Postgres, &query);
        assert_eq!(
            "SELECT \"id\", COUNT(*) AS cnt FROM \"user\" \"u\" LEFT JOIN \"profile\" \"p\" ON p.user_id = u.id WHERE \"status\"=:qp0 GROUP BY \"id\" HAVING \"cnt\" > :qp1 ORDER BY \"id\" DESC LIMIT 10 OFFSET 20",
            sql
        );
        assert_eq!(2, params.len());
    }

    #[test]
    fn test_select_aliases() {
        let mut query = Query::new();
        query
            .select_str("id, t.name AS n, email e, *")
            .select_as("total", Expr::from(FunctionExpr::new(Function::Sum, ["amount"])))
            .from("t");
        let (sql, _) = build(Dialect::MySql, &query);
        assert_eq!(
            "SELECT `id`, `t`.`name` AS `n`, `email` AS `e`, *, SUM(`amount`) AS `total` FROM `t`",
            sql
        );
    }

    #[test]
    fn test_distinct_and_option() {
        let mut query = Query::new();
        query.distinct().select_option("SQL_CALC_FOUND_ROWS").from("t");
        let (sql, _) = build(Dialect::MySql, &query);
        assert_eq!("SELECT DISTINCT SQL_CALC_FOUND_ROWS * FROM `t`", sql);
    }

    #[test]
    fn test_where_zero() {
        let mut query = Query::new();
        query.from("t").where_condition("0");
        let (sql, params) = build(Dialect::Sqlite, &query);
        assert_eq!("SELECT * FROM \"t\" WHERE 0", sql);
        assert!(params.is_empty());
    }

    #[test]
    fn test_offset_without_limit() {
        let mut query = Query::new();
        query.from("t").offset(5);
        assert_eq!("SELECT * FROM \"t\" OFFSET 5", build(Dialect::Postgres, &query).0);
        assert_eq!(
            "SELECT * FROM `t` LIMIT 5, 18446744073709551615",
            build(Dialect::MySql, &query).0
        );
        assert_eq!(
            "SELECT * FROM \"t\" LIMIT 9223372036854775807 OFFSET 5",
            build(Dialect::Sqlite, &query).0
        );
    }

    #[test]
    fn test_zero_offset_and_negative_limit_omitted() {
        let mut query = Query::new();
        query.from("t").limit(-1).offset(0);
        assert_eq!("SELECT * FROM \"t\"", build(Dialect::Postgres, &query).0);
        query.limit(3);
        assert_eq!("SELECT * FROM \"t\" LIMIT 3", build(Dialect::Postgres, &query).0);
    }

    #[test]
    fn test_union_and_with() {
        let archived = sub(|q| {
            q.select(["id"]).from("archive").where_condition(map! {"y" => 2020});
        });
        let recent = sub(|q| {
            q.select(["id"]).from("events");
        });
        let mut query = Query::new();
        query
            .select(["id"])
            .from("recent")
            .where_condition(map! {"kind" => "a"})
            .union(archived, true)
            .with_query(recent, "recent", false);
        let (sql, params) = build(Dialect::Postgres, &query);
        assert_eq!(
            "WITH recent AS (SELECT \"id\" FROM \"events\") (SELECT \"id\" FROM \"recent\" WHERE \"kind\"=:qp0) UNION ALL ( SELECT \"id\" FROM \"archive\" WHERE \"y\"=:qp1 )",
            sql
        );
        assert_eq!(Some(&Value::Int(2020)), params.value(":qp1"));
    }

    #[test]
    fn test_sub_query_in_from_and_select() {
        let inner = sub(|q| {
            q.select(["id"]).from("orders").where_condition(map! {"paid" => true});
        });
        let mut query = Query::new();
        query
            .select_as("n", Query::new().select(["COUNT(*)"]).from("items").take())
            .from_as("o", inner)
            .for_update();
        let (sql, params) = build(Dialect::Postgres, &query);
        assert_eq!(
            "SELECT (SELECT COUNT(*) FROM \"items\") AS \"n\" FROM (SELECT \"id\" FROM \"orders\" WHERE \"paid\"=:qp0) \"o\" FOR UPDATE",
            sql
        );
        assert_eq!(Some(&Value::Bool(true)), params.value(":qp0"));
    }

    #[test]
    fn test_query_params_are_merged() {
        let mut query = Query::new();
        query
            .from("t")
            .where_condition("a = :a")
            .add_params(&Params::from([(":a", 5)]))
            .and_where(map! {"b" => 6});
        let (sql, params) = build(Dialect::Postgres, &query);
        assert_eq!("SELECT * FROM \"t\" WHERE (a = :a) AND (\"b\"=:qp1)", sql);
        assert_eq!(2, params.len());
    }

    #[test]
    fn test_select_exists() {
        let qb = QueryBuilder::new(Dialect::Postgres);
        assert_eq!("SELECT EXISTS(SELECT 1)", qb.select_exists("SELECT 1"));
    }
}
