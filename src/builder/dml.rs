//! INSERT, UPDATE, DELETE and UPSERT assembly.
//!
//! Values are typecast against the declared column types of the schema provider before they
//! are rendered, so NULL and booleans are inlined and everything else becomes a placeholder.

use std::sync::Arc;

use indexmap::IndexMap;
use smol_str::SmolStr;

use crate::{
    dialect::Dialect,
    error::{Error, Result},
    expr::Expr,
    operand::{ColumnRef, Operand, Row},
    query::Query,
    schema::{Constraint, TableSchema},
    tokenizer::SqlTokenizer,
    value::Params,
};

use super::{BuildContext, QueryBuilder, dql::SELECT_ALIAS};

/// Source of an INSERT: a row of values or a SELECT.
#[derive(Debug, Clone, PartialEq)]
pub enum InsertValues {
    Row(Row),
    Query(Box<Query>),
}

impl From<Row> for InsertValues {
    fn from(value: Row) -> Self {
        InsertValues::Row(value)
    }
}

impl From<Query> for InsertValues {
    fn from(value: Query) -> Self {
        InsertValues::Query(Box::new(value))
    }
}

impl TryFrom<Operand> for InsertValues {
    type Error = Error;

    fn try_from(value: Operand) -> Result<Self> {
        match value {
            Operand::Map(row) => Ok(InsertValues::Row(row)),
            Operand::Expr(Expr::Query(query)) => Ok(InsertValues::Query(query)),
            _ => Err(Error::invalid_argument(
                "Insert values must be a column map or a select query.",
            )),
        }
    }
}

/// What an upsert updates when the row already exists.
#[derive(Debug, Clone, Default, PartialEq)]
pub enum UpdateColumns {
    /// Every inserted column that is not part of the uniqueness key.
    #[default]
    All,
    /// Keep the existing row.
    None,
    Columns(Row),
}

impl From<bool> for UpdateColumns {
    fn from(value: bool) -> Self {
        if value {
            UpdateColumns::All
        } else {
            UpdateColumns::None
        }
    }
}

impl From<Row> for UpdateColumns {
    fn from(value: Row) -> Self {
        UpdateColumns::Columns(value)
    }
}

impl QueryBuilder {
    /// `INSERT INTO table (...) VALUES (...)`, or `INSERT ... SELECT` for a query source.
    pub fn insert(&self, table: &str, values: &InsertValues, params: &mut Params) -> Result<String> {
        let sql = self.insert_sql(table, values, params, false)?;
        self.log_statement("insert", &sql, params);
        Ok(sql)
    }

    fn insert_sql(
        &self,
        table: &str,
        values: &InsertValues,
        params: &mut Params,
        upsert: bool,
    ) -> Result<String> {
        let quoter = self.quoter();
        let table_name = quoter.quote_table_name(table);
        let mut context = BuildContext::new(self, params);

        match values {
            InsertValues::Row(row) => {
                if row.is_empty() {
                    return Ok(match self.dialect() {
                        Dialect::MySql => format!("INSERT INTO {table_name} () VALUES ()"),
                        _ => format!("INSERT INTO {table_name} DEFAULT VALUES"),
                    });
                }
                let schema = self.typecast_schema(table);
                let mut names = Vec::with_capacity(row.len());
                let mut placeholders = Vec::with_capacity(row.len());
                for (name, value) in row {
                    let value = typecast(schema.as_deref(), name, value);
                    names.push(quoter.quote_column_name(name));
                    placeholders.push(context.build_value(&value)?);
                }
                Ok(format!(
                    "INSERT INTO {table_name} ({}) VALUES ({})",
                    names.join(", "),
                    placeholders.join(", ")
                ))
            }
            InsertValues::Query(query) => {
                let names = select_column_names(query)?
                    .iter()
                    .map(|name| quoter.quote_column_name(name))
                    .collect::<Vec<_>>();
                let mut select = context.build_query(query)?;
                if upsert && self.dialect() == Dialect::Sqlite && !has_top_level_where(&select)? {
                    // SQLite reads ON CONFLICT after a bare FROM as a join constraint
                    select = if has_trailing_clauses(query) {
                        format!("SELECT * FROM ({select}) WHERE TRUE")
                    } else {
                        format!("{select} WHERE TRUE")
                    };
                }
                Ok(format!(
                    "INSERT INTO {table_name} ({}) {select}",
                    names.join(", ")
                ))
            }
        }
    }

    /// Multi-row insert. Rows are lists matched to `columns` by position, or maps. Without
    /// explicit columns the keys of the first map row are used. No rows render nothing.
    pub fn insert_batch<S: AsRef<str>>(
        &self,
        table: &str,
        rows: &[Operand],
        columns: &[S],
        params: &mut Params,
    ) -> Result<String> {
        if rows.is_empty() {
            return Ok(String::new());
        }

        let mut columns: Vec<String> = columns.iter().map(|c| c.as_ref().to_string()).collect();
        if columns.is_empty() {
            if let Some(Operand::Map(first)) = rows.first() {
                columns = first.keys().cloned().collect();
            }
        }

        let quoter = self.quoter();
        let schema = self.typecast_schema(table);
        let mut context = BuildContext::new(self, params);
        let mut values = Vec::with_capacity(rows.len());
        for row in rows {
            let cells: Vec<(Option<&str>, &Operand)> = match row {
                Operand::List(items) => {
                    if !columns.is_empty() && items.len() != columns.len() {
                        return Err(Error::invalid_argument(format!(
                            "Batch insert row has {} values for {} columns.",
                            items.len(),
                            columns.len()
                        )));
                    }
                    items
                        .iter()
                        .enumerate()
                        .map(|(i, value)| (columns.get(i).map(String::as_str), value))
                        .collect()
                }
                Operand::Map(map) => {
                    let mut cells = Vec::with_capacity(columns.len());
                    for column in &columns {
                        let Some(value) = map.get(column) else {
                            return Err(Error::invalid_argument(format!(
                                "Batch insert row is missing column '{column}'."
                            )));
                        };
                        cells.push((Some(column.as_str()), value));
                    }
                    cells
                }
                _ => {
                    return Err(Error::invalid_argument(
                        "Batch insert rows must be lists or maps.",
                    ));
                }
            };

            let mut placeholders = Vec::with_capacity(cells.len());
            for (column, value) in cells {
                let value = match column {
                    Some(column) => typecast(schema.as_deref(), column, value),
                    None => value.clone(),
                };
                placeholders.push(context.build_value(&value)?);
            }
            values.push(placeholders.join(", "));
        }

        let table_name = quoter.quote_table_name(table);
        let mut sql = format!("INSERT INTO {table_name}");
        if !columns.is_empty() {
            let names = columns
                .iter()
                .map(|name| quoter.quote_column_name(name))
                .collect::<Vec<_>>();
            sql.push_str(&format!(" ({})", names.join(", ")));
        }
        sql.push_str(&format!(" VALUES ({})", values.join("), (")));

        self.log_statement("insert_batch", &sql, params);
        Ok(sql)
    }

    /// `UPDATE table SET ... [WHERE ...]`.
    pub fn update(
        &self,
        table: &str,
        columns: &Row,
        condition: &Operand,
        params: &mut Params,
    ) -> Result<String> {
        if columns.is_empty() {
            return Err(Error::invalid_argument("Update requires at least one column."));
        }
        let mut context = BuildContext::new(self, params);
        let sets = context.build_update_sets(table, columns)?;
        let mut sql = format!(
            "UPDATE {} SET {}",
            self.quoter().quote_table_name(table),
            sets.join(", ")
        );
        let where_clause = context.build_where(Some(condition))?;
        if !where_clause.is_empty() {
            sql.push(' ');
            sql.push_str(&where_clause);
        }
        self.log_statement("update", &sql, params);
        Ok(sql)
    }

    /// `DELETE FROM table [WHERE ...]`.
    pub fn delete(&self, table: &str, condition: &Operand, params: &mut Params) -> Result<String> {
        let mut sql = format!("DELETE FROM {}", self.quoter().quote_table_name(table));
        let where_clause = BuildContext::new(self, params).build_where(Some(condition))?;
        if !where_clause.is_empty() {
            sql.push(' ');
            sql.push_str(&where_clause);
        }
        self.log_statement("delete", &sql, params);
        Ok(sql)
    }

    /// Insert that updates, or keeps, the existing row on a uniqueness conflict.
    ///
    /// Without a uniqueness key covered by the inserted columns this is a plain insert.
    pub fn upsert(
        &self,
        table: &str,
        values: &InsertValues,
        update: &UpdateColumns,
        params: &mut Params,
    ) -> Result<String> {
        if self.dialect() == Dialect::Ansi {
            return Err(Error::not_supported("upsert"));
        }

        let insert_names = insert_column_names(values)?;
        let unique_names = self.upsert_key_columns(table, &insert_names);
        let mut sql = self.insert_sql(table, values, params, true)?;
        if unique_names.is_empty() {
            self.log_statement("upsert", &sql, params);
            return Ok(sql);
        }

        let update_names: Vec<&SmolStr> = insert_names
            .iter()
            .filter(|name| !unique_names.contains(*name))
            .collect();
        let update = match update {
            // every inserted column belongs to the key
            UpdateColumns::All if update_names.is_empty() => &UpdateColumns::None,
            other => other,
        };

        let quoter = self.quoter();
        let table_name = quoter.quote_table_name(table);
        let mut context = BuildContext::new(self, params);

        match self.dialect() {
            Dialect::MySql => {
                let sets = match update {
                    UpdateColumns::None => {
                        let key = quoter.quote_column_name(&unique_names[0]);
                        vec![format!("{key}={table_name}.{key}")]
                    }
                    UpdateColumns::All => update_names
                        .iter()
                        .map(|name| {
                            let name = quoter.quote_column_name(name);
                            format!("{name}=VALUES({name})")
                        })
                        .collect(),
                    UpdateColumns::Columns(columns) => context.build_update_sets(table, columns)?,
                };
                sql.push_str(" ON DUPLICATE KEY UPDATE ");
                sql.push_str(&sets.join(", "));
            }
            Dialect::Postgres | Dialect::Sqlite => {
                let sets = match update {
                    UpdateColumns::None => {
                        sql.push_str(" ON CONFLICT DO NOTHING");
                        self.log_statement("upsert", &sql, params);
                        return Ok(sql);
                    }
                    UpdateColumns::All => update_names
                        .iter()
                        .map(|name| {
                            let name = quoter.quote_column_name(name);
                            format!("{name}=EXCLUDED.{name}")
                        })
                        .collect::<Vec<_>>(),
                    UpdateColumns::Columns(columns) => context.build_update_sets(table, columns)?,
                };
                let keys = unique_names
                    .iter()
                    .map(|name| quoter.quote_column_name(name))
                    .collect::<Vec<_>>();
                sql.push_str(&format!(
                    " ON CONFLICT ({}) DO UPDATE SET {}",
                    keys.join(", "),
                    sets.join(", ")
                ));
            }
            Dialect::Ansi => return Err(Error::not_supported("upsert")),
        }

        self.log_statement("upsert", &sql, params);
        Ok(sql)
    }

    /// Union of the primary key, unique indexes and unique constraints of `table` whose
    /// columns are all among `insert_columns`. Constraints on the same column set count once.
    pub fn upsert_key_columns<S: AsRef<str>>(&self, table: &str, insert_columns: &[S]) -> Vec<SmolStr> {
        let Some(schema) = self.schema() else {
            return Vec::new();
        };
        let raw_name = self.quoter().get_raw_table_name(table);

        let mut constraints: Vec<Constraint> = Vec::new();
        constraints.extend(schema.table_primary_key(&raw_name));
        constraints.extend(
            schema
                .table_indexes(&raw_name)
                .into_iter()
                .filter(|index| index.is_unique)
                .map(|index| index.constraint),
        );
        constraints.extend(schema.table_uniques(&raw_name));

        let mut by_identity: IndexMap<String, Constraint> = IndexMap::new();
        for constraint in constraints {
            by_identity.insert(constraint.identity(), constraint);
        }

        let mut names: Vec<SmolStr> = Vec::new();
        for constraint in by_identity.values() {
            if !constraint.is_covered_by(insert_columns) {
                continue;
            }
            for name in &constraint.column_names {
                if !names.contains(name) {
                    names.push(name.clone());
                }
            }
        }
        names
    }

    /// Table metadata for typecasting, when enabled and known.
    fn typecast_schema(&self, table: &str) -> Option<Arc<TableSchema>> {
        if !self.config().typecasting {
            return None;
        }
        let schema = self.schema()?;
        schema.table_schema(&self.quoter().get_raw_table_name(table))
    }
}

impl BuildContext<'_> {
    /// `"column"=value` pairs of a SET list.
    fn build_update_sets(&mut self, table: &str, columns: &Row) -> Result<Vec<String>> {
        let schema = self.builder.typecast_schema(table);
        let mut sets = Vec::with_capacity(columns.len());
        for (name, value) in columns {
            let value = typecast(schema.as_deref(), name, value);
            let name = self.quoter().quote_column_name(name);
            sets.push(format!("{name}={}", self.build_value(&value)?));
        }
        Ok(sets)
    }
}

fn typecast(schema: Option<&TableSchema>, column: &str, value: &Operand) -> Operand {
    match schema.and_then(|table| table.get_column(column)) {
        Some(column) => column.db_typecast(value.clone()),
        None => value.clone(),
    }
}

/// Unquoted names of the inserted columns.
fn insert_column_names(values: &InsertValues) -> Result<Vec<SmolStr>> {
    match values {
        InsertValues::Row(row) => Ok(row.keys().map(SmolStr::new).collect()),
        InsertValues::Query(query) => select_column_names(query),
    }
}

/// Column names an INSERT ... SELECT writes, taken from the select list.
fn select_column_names(query: &Query) -> Result<Vec<SmolStr>> {
    if !query.is_enumerated() {
        return Err(Error::invalid_argument(
            "Expected select query object with enumerated (named) parameters",
        ));
    }
    let mut names = Vec::with_capacity(query.select.len());
    for column in &query.select {
        if let Some(alias) = &column.alias {
            names.push(alias.clone());
            continue;
        }
        match &column.item {
            ColumnRef::Name(name) => match SELECT_ALIAS.captures(name) {
                Some(caps) if !name.contains('(') => {
                    names.push(caps.get(2).map_or_else(|| name.clone(), |m| m.as_str().into()));
                }
                _ => names.push(name.clone()),
            },
            ColumnRef::Expr(Expr::ColumnName(name)) => names.push(name.clone()),
            ColumnRef::Expr(expr) => {
                return Err(Error::invalid_argument(format!(
                    "Select column of type {} needs an alias to be inserted.",
                    expr.kind()
                )));
            }
        }
    }
    Ok(names)
}

/// Clauses rendered after WHERE, a WHERE cannot simply be appended to them.
fn has_trailing_clauses(query: &Query) -> bool {
    !query.group_by.is_empty()
        || query.maybe_having.is_some()
        || !query.order_by.is_empty()
        || query.maybe_limit.is_some()
        || query.maybe_offset.is_some()
        || !query.unions.is_empty()
        || !query.for_clauses.is_empty()
}

/// Whether the first statement of `sql` has a WHERE outside any parentheses.
fn has_top_level_where(sql: &str) -> Result<bool> {
    let code = SqlTokenizer::new(sql).tokenize()?;
    Ok(code
        .statements()
        .next()
        .is_some_and(|statement| statement.find_keyword("WHERE").is_some()))
}
