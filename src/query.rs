use std::sync::LazyLock;

use regex::Regex;
use smol_str::SmolStr;

use crate::{
    condition::filter::filter_condition,
    error::{Error, Result},
    expr::Expr,
    operand::{ColumnRef, Operand},
    value::Params,
};

static COMMA_LIST: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s*,\s*").expect("valid comma list regex"));

static ORDER_ITEM: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^(.*?)\s+(asc|desc)$").expect("valid order item regex")
});

const JOIN_SHAPE: &str =
    "A join clause must be specified as an array of join type, join table, and optionally join condition.";

/// Column or table, optionally aliased.
#[derive(Debug, Clone, PartialEq)]
pub struct Aliased {
    pub alias: Option<SmolStr>,
    pub item: ColumnRef,
}

impl Aliased {
    pub fn new(item: impl Into<ColumnRef>) -> Self {
        Self {
            alias: None,
            item: item.into(),
        }
    }

    pub fn aliased(alias: impl Into<SmolStr>, item: impl Into<ColumnRef>) -> Self {
        Self {
            alias: Some(alias.into()),
            item: item.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Join {
    /// Join keyword, e.g. `LEFT JOIN`.
    pub kind: SmolStr,
    pub table: Aliased,
    pub on: Option<Operand>,
}

impl Join {
    pub fn new(kind: impl Into<SmolStr>, table: impl Into<ColumnRef>, on: impl Into<Operand>) -> Self {
        let on = on.into();
        Self {
            kind: kind.into(),
            table: Aliased::new(table),
            on: (!on.is_null()).then_some(on),
        }
    }
}

/// Reads the `[type, table, condition?]` join definition. A one-entry map as table is
/// `{alias => table}`.
impl TryFrom<&Operand> for Join {
    type Error = Error;

    fn try_from(definition: &Operand) -> Result<Self> {
        let Operand::List(items) = definition else {
            return Err(Error::invalid_argument(JOIN_SHAPE));
        };
        let (Some(kind), Some(table)) = (items.first().and_then(Operand::as_str), items.get(1))
        else {
            return Err(Error::invalid_argument(JOIN_SHAPE));
        };
        let table = match table {
            Operand::Value(value) => match value.as_str() {
                Some(name) => Aliased::new(name),
                None => return Err(Error::invalid_argument(JOIN_SHAPE)),
            },
            Operand::Expr(expr) => Aliased::new(expr.clone()),
            Operand::Map(map) if map.len() == 1 => {
                let Some((alias, table)) = map.first() else {
                    return Err(Error::invalid_argument(JOIN_SHAPE));
                };
                let item = match table {
                    Operand::Expr(expr) => ColumnRef::Expr(expr.clone()),
                    other => match other.as_str() {
                        Some(name) => ColumnRef::from(name),
                        None => return Err(Error::invalid_argument(JOIN_SHAPE)),
                    },
                };
                Aliased {
                    alias: Some(SmolStr::new(alias)),
                    item,
                }
            }
            _ => return Err(Error::invalid_argument(JOIN_SHAPE)),
        };
        Ok(Self {
            kind: kind.into(),
            table,
            on: items.get(2).filter(|on| !on.is_null()).cloned(),
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Order {
    #[default]
    Asc,
    Desc,
}

#[derive(Debug, Clone, PartialEq)]
pub enum OrderBy {
    Column(SmolStr, Order),
    Expr(Expr),
}

/// LIMIT or OFFSET value. Negative counts are not rendered.
#[derive(Debug, Clone, PartialEq)]
pub enum Limit {
    Count(i64),
    Expr(Expr),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Union {
    /// A query or raw SQL.
    pub query: Expr,
    pub all: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct With {
    pub query: Expr,
    pub alias: SmolStr,
    pub recursive: bool,
}

/// Mutable SELECT descriptor, assembled through chained setters and rendered by
/// [`crate::QueryBuilder::build`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Query {
    pub(crate) select: Vec<Aliased>,
    pub(crate) distinct: bool,
    pub(crate) maybe_select_option: Option<String>,
    pub(crate) from: Vec<Aliased>,
    pub(crate) joins: Vec<Join>,
    pub(crate) maybe_where: Option<Operand>,
    pub(crate) group_by: Vec<ColumnRef>,
    pub(crate) maybe_having: Option<Operand>,
    pub(crate) order_by: Vec<OrderBy>,
    pub(crate) maybe_limit: Option<Limit>,
    pub(crate) maybe_offset: Option<Limit>,
    pub(crate) unions: Vec<Union>,
    pub(crate) withs: Vec<With>,
    pub(crate) for_clauses: Vec<String>,
    pub(crate) params: Params,
}

/// Builds a sub-query in a closure.
pub fn sub<F>(closure: F) -> Query
where
    F: FnOnce(&mut Query),
{
    let mut query = Query::new();
    closure(&mut query);
    query
}

impl Query {
    pub fn new() -> Self {
        Self::default()
    }

    // select stuff

    pub fn select<I, C>(&mut self, columns: I) -> &mut Self
    where
        I: IntoIterator<Item = C>,
        C: Into<ColumnRef>,
    {
        self.select = columns.into_iter().map(Aliased::new).collect();
        self
    }

    /// Selects a comma separated list such as `"id, name AS n"`.
    pub fn select_str(&mut self, columns: &str) -> &mut Self {
        self.select = split_list(columns).map(Aliased::new).collect();
        self
    }

    pub fn add_select<I, C>(&mut self, columns: I) -> &mut Self
    where
        I: IntoIterator<Item = C>,
        C: Into<ColumnRef>,
    {
        self.select.extend(columns.into_iter().map(Aliased::new));
        self
    }

    pub fn select_as<A, C>(&mut self, alias: A, column: C) -> &mut Self
    where
        A: Into<SmolStr>,
        C: Into<ColumnRef>,
    {
        self.select.push(Aliased::aliased(alias, column));
        self
    }

    pub fn reset_select(&mut self) -> &mut Self {
        self.select.clear();
        self
    }

    pub fn distinct(&mut self) -> &mut Self {
        self.distinct = true;
        self
    }

    /// Option placed after `SELECT`, e.g. `SQL_CALC_FOUND_ROWS`.
    pub fn select_option(&mut self, option: impl Into<String>) -> &mut Self {
        self.maybe_select_option = Some(option.into());
        self
    }

    // from stuff

    pub fn from<T: Into<ColumnRef>>(&mut self, table: T) -> &mut Self {
        self.from = vec![Aliased::new(table)];
        self
    }

    pub fn from_as<A, T>(&mut self, alias: A, table: T) -> &mut Self
    where
        A: Into<SmolStr>,
        T: Into<ColumnRef>,
    {
        self.from = vec![Aliased::aliased(alias, table)];
        self
    }

    pub fn add_from<T: Into<ColumnRef>>(&mut self, table: T) -> &mut Self {
        self.from.push(Aliased::new(table));
        self
    }

    // join stuff

    pub fn join<K, T, C>(&mut self, kind: K, table: T, on: C) -> &mut Self
    where
        K: Into<SmolStr>,
        T: Into<ColumnRef>,
        C: Into<Operand>,
    {
        self.joins.push(Join::new(kind, table, on));
        self
    }

    pub fn join_as<K, A, T, C>(&mut self, kind: K, alias: A, table: T, on: C) -> &mut Self
    where
        K: Into<SmolStr>,
        A: Into<SmolStr>,
        T: Into<ColumnRef>,
        C: Into<Operand>,
    {
        let mut join = Join::new(kind, table, on);
        join.table.alias = Some(alias.into());
        self.joins.push(join);
        self
    }

    pub fn inner_join<T: Into<ColumnRef>, C: Into<Operand>>(&mut self, table: T, on: C) -> &mut Self {
        self.join("INNER JOIN", table, on)
    }

    pub fn left_join<T: Into<ColumnRef>, C: Into<Operand>>(&mut self, table: T, on: C) -> &mut Self {
        self.join("LEFT JOIN", table, on)
    }

    pub fn right_join<T: Into<ColumnRef>, C: Into<Operand>>(&mut self, table: T, on: C) -> &mut Self {
        self.join("RIGHT JOIN", table, on)
    }

    pub fn add_join(&mut self, join: Join) -> &mut Self {
        self.joins.push(join);
        self
    }

    // where stuff

    pub fn where_condition<C: Into<Operand>>(&mut self, condition: C) -> &mut Self {
        self.maybe_where = Some(condition.into());
        self
    }

    pub fn and_where<C: Into<Operand>>(&mut self, condition: C) -> &mut Self {
        self.maybe_where = Some(and_condition(self.maybe_where.take(), condition.into()));
        self
    }

    pub fn or_where<C: Into<Operand>>(&mut self, condition: C) -> &mut Self {
        self.maybe_where = Some(or_condition(self.maybe_where.take(), condition.into()));
        self
    }

    /// Sets the condition after dropping its blank operands. Nothing happens if all vanish.
    pub fn filter_where<C: Into<Operand>>(&mut self, condition: C) -> &mut Self {
        let condition = filter_condition(condition.into());
        if !condition.is_empty() {
            self.maybe_where = Some(condition);
        }
        self
    }

    pub fn and_filter_where<C: Into<Operand>>(&mut self, condition: C) -> &mut Self {
        let condition = filter_condition(condition.into());
        if !condition.is_empty() {
            self.and_where(condition);
        }
        self
    }

    pub fn or_filter_where<C: Into<Operand>>(&mut self, condition: C) -> &mut Self {
        let condition = filter_condition(condition.into());
        if !condition.is_empty() {
            self.or_where(condition);
        }
        self
    }

    // group stuff

    pub fn group_by<I, C>(&mut self, columns: I) -> &mut Self
    where
        I: IntoIterator<Item = C>,
        C: Into<ColumnRef>,
    {
        self.group_by = columns.into_iter().map(Into::into).collect();
        self
    }

    pub fn group_by_str(&mut self, columns: &str) -> &mut Self {
        self.group_by = split_list(columns).map(ColumnRef::from).collect();
        self
    }

    pub fn add_group_by<I, C>(&mut self, columns: I) -> &mut Self
    where
        I: IntoIterator<Item = C>,
        C: Into<ColumnRef>,
    {
        self.group_by.extend(columns.into_iter().map(Into::into));
        self
    }

    pub fn having<C: Into<Operand>>(&mut self, condition: C) -> &mut Self {
        self.maybe_having = Some(condition.into());
        self
    }

    pub fn and_having<C: Into<Operand>>(&mut self, condition: C) -> &mut Self {
        self.maybe_having = Some(and_condition(self.maybe_having.take(), condition.into()));
        self
    }

    pub fn or_having<C: Into<Operand>>(&mut self, condition: C) -> &mut Self {
        self.maybe_having = Some(or_condition(self.maybe_having.take(), condition.into()));
        self
    }

    // order stuff

    pub fn order_by(&mut self, column: impl Into<SmolStr>, order: Order) -> &mut Self {
        self.order_by.push(OrderBy::Column(column.into(), order));
        self
    }

    pub fn order_by_expr(&mut self, expr: Expr) -> &mut Self {
        self.order_by.push(OrderBy::Expr(expr));
        self
    }

    /// Replaces the ordering with a list such as `"name, created_at DESC"`.
    pub fn order_by_str(&mut self, columns: &str) -> &mut Self {
        self.order_by.clear();
        for item in split_list(columns) {
            if item.contains('(') {
                self.order_by.push(OrderBy::Expr(Expr::raw(item)));
                continue;
            }
            let order = match ORDER_ITEM.captures(item) {
                Some(caps) => {
                    let column = caps.get(1).map(|m| m.as_str()).unwrap_or(item);
                    let desc = caps
                        .get(2)
                        .is_some_and(|m| m.as_str().eq_ignore_ascii_case("desc"));
                    let order = if desc { Order::Desc } else { Order::Asc };
                    OrderBy::Column(column.into(), order)
                }
                None => OrderBy::Column(item.into(), Order::Asc),
            };
            self.order_by.push(order);
        }
        self
    }

    pub fn reset_order_by(&mut self) -> &mut Self {
        self.order_by.clear();
        self
    }

    // pagination

    pub fn limit(&mut self, limit: i64) -> &mut Self {
        self.maybe_limit = Some(Limit::Count(limit));
        self
    }

    pub fn limit_expr(&mut self, limit: Expr) -> &mut Self {
        self.maybe_limit = Some(Limit::Expr(limit));
        self
    }

    pub fn offset(&mut self, offset: i64) -> &mut Self {
        self.maybe_offset = Some(Limit::Count(offset));
        self
    }

    pub fn offset_expr(&mut self, offset: Expr) -> &mut Self {
        self.maybe_offset = Some(Limit::Expr(offset));
        self
    }

    // compound stuff

    pub fn union(&mut self, query: impl Into<Expr>, all: bool) -> &mut Self {
        self.unions.push(Union {
            query: query.into(),
            all,
        });
        self
    }

    pub fn with_query(
        &mut self,
        query: impl Into<Expr>,
        alias: impl Into<SmolStr>,
        recursive: bool,
    ) -> &mut Self {
        self.withs.push(With {
            query: query.into(),
            alias: alias.into(),
            recursive,
        });
        self
    }

    /// Locking clause rendered after LIMIT, e.g. `FOR UPDATE`.
    pub fn for_clause(&mut self, clause: impl Into<String>) -> &mut Self {
        self.for_clauses.push(clause.into());
        self
    }

    pub fn for_update(&mut self) -> &mut Self {
        self.for_clause("FOR UPDATE")
    }

    pub fn add_params(&mut self, params: &Params) -> &mut Self {
        self.params.extend(params);
        self
    }

    pub fn params(&self) -> &Params {
        &self.params
    }

    /// Whether every selected column is named, i.e. the select list is neither empty nor `*`.
    pub fn is_enumerated(&self) -> bool {
        !self.select.is_empty()
            && !self
                .select
                .iter()
                .any(|column| matches!(&column.item, ColumnRef::Name(name) if name == "*"))
    }

    /// Detaches a finished query from the builder chain.
    pub fn take(&mut self) -> Self {
        std::mem::take(self)
    }
}

fn split_list(list: &str) -> impl Iterator<Item = &str> {
    COMMA_LIST
        .split(list.trim())
        .filter(|item| !item.is_empty())
}

fn is_operator(items: &[Operand], operator: &str) -> bool {
    items
        .first()
        .and_then(Operand::as_str)
        .is_some_and(|op| op.eq_ignore_ascii_case(operator))
}

fn and_condition(current: Option<Operand>, condition: Operand) -> Operand {
    match current {
        None => condition,
        Some(Operand::List(mut items)) if is_operator(&items, "and") => {
            items.push(condition);
            Operand::List(items)
        }
        Some(current) => Operand::List(vec!["and".into(), current, condition]),
    }
}

fn or_condition(current: Option<Operand>, condition: Operand) -> Operand {
    match current {
        None => condition,
        Some(current) => Operand::List(vec!["or".into(), current, condition]),
    }
}

#[cfg(test)]
mod tests {
    use crate::{list, map};

    use super::*;

    #[test]
    fn test_and_where_appends_to_and() {
        let mut query = Query::new();
        query
            .where_condition(map! {"a" => 1})
            .and_where(list!["=", "b", 2])
            .and_where(list![">", "c", 3]);
        let Some(Operand::List(items)) = &query.maybe_where else {
            panic!("expected an operator list");
        };
        assert_eq!(4, items.len());
        assert_eq!(Some("and"), items[0].as_str());
    }

    #[test]
    fn test_or_where_wraps() {
        let mut query = Query::new();
        query.where_condition("a = 1").or_where("b = 2");
        assert_eq!(
            Some(list!["or", "a = 1", "b = 2"]),
            query.maybe_where
        );
    }

    #[test]
    fn test_filter_where_skips_blank() {
        let mut query = Query::new();
        query.filter_where(map! {"name" => "", "status" => ()});
        assert_eq!(None, query.maybe_where);
        query.filter_where(map! {"name" => "", "status" => 1});
        assert_eq!(Some(map! {"status" => 1}), query.maybe_where);
    }

    #[test]
    fn test_order_by_str() {
        let mut query = Query::new();
        query.order_by_str("name, created_at DESC, LENGTH(x)");
        assert_eq!(
            vec![
                OrderBy::Column("name".into(), Order::Asc),
                OrderBy::Column("created_at".into(), Order::Desc),
                OrderBy::Expr(Expr::raw("LENGTH(x)")),
            ],
            query.order_by
        );
    }

    #[test]
    fn test_join_from_definition() {
        let join = Join::try_from(&list!["LEFT JOIN", "profile p", "p.user_id = u.id"]).unwrap();
        assert_eq!("LEFT JOIN", join.kind);
        assert_eq!(Some(Operand::from("p.user_id = u.id")), join.on);

        let join = Join::try_from(&list!["INNER JOIN", map! {"p" => "profile"}]).unwrap();
        assert_eq!(Some(SmolStr::new("p")), join.table.alias);
        assert_eq!(None, join.on);
    }

    #[test]
    fn test_join_malformed() {
        let err = Join::try_from(&list!["LEFT JOIN"]).unwrap_err();
        assert!(err.is_invalid_argument());
        assert_eq!(format!("Invalid argument: {JOIN_SHAPE}"), err.to_string());
        assert!(Join::try_from(&Operand::from("LEFT JOIN t")).is_err());
    }

    #[test]
    fn test_is_enumerated() {
        let mut query = Query::new();
        assert!(!query.is_enumerated());
        query.select(["*"]);
        assert!(!query.is_enumerated());
        query.select(["id", "name"]);
        assert!(query.is_enumerated());
    }
}
