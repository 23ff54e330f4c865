//! Schema statements: tables, columns, constraints, indexes, views, comments, sequences.

use std::sync::{Arc, LazyLock};

use regex::Regex;
use tracing::{debug, warn};

use crate::{
    column::ColumnDef,
    dialect::Dialect,
    error::{Error, Result},
    expr::Expr,
    schema::{
        CheckConstraint, ColumnSchema, Constraint, DefaultValueConstraint, ForeignKeyConstraint,
        TableSchema,
    },
    scan::inline_params,
    value::Params,
};

use super::{BuildContext, QueryBuilder};

static ALTER_ACTION: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)^(DROP|SET|RESET)\s+").expect("valid alter action regex"));

static ALTER_DEFAULT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?i)\s+DEFAULT\s+(["']?\w*["']?)"#).expect("valid alter default regex")
});

static ALTER_NOT_NULL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\s+NOT\s+NULL").expect("valid alter not null regex"));

static ALTER_NULL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\s+NULL").expect("valid alter null regex"));

static ALTER_CHECK: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\s+CHECK\s+\((.+)\)").expect("valid alter check regex"));

static ALTER_UNIQUE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\s+UNIQUE").expect("valid alter unique regex"));

static CONSTRAINT_PREFIX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[^A-Za-z0-9_]").expect("valid constraint prefix regex"));

const DEFAULT_SCHEMA: &str = "public";

/// Column of a CREATE TABLE. A nameless entry is a table constraint line such as
/// `PRIMARY KEY (id)`.
pub type TableColumn<'a> = (Option<&'a str>, ColumnDef);

impl QueryBuilder {
    fn ddl(&self, statement: &str, sql: String) -> String {
        debug!(dialect = %self.dialect(), statement, sql = %sql, "built statement");
        sql
    }

    fn quote_columns<S: AsRef<str>>(&self, columns: &[S]) -> String {
        columns
            .iter()
            .map(|column| self.quoter().quote_column_name(column.as_ref()))
            .collect::<Vec<_>>()
            .join(", ")
    }

    fn table_schema_of(&self, table: &str) -> Option<Arc<TableSchema>> {
        let raw_name = self.quoter().get_raw_table_name(table);
        self.schema()?.table_schema(&raw_name)
    }

    // table stuff

    /// ```
    /// use qsmith::{Dialect, QueryBuilder};
    /// let qb = QueryBuilder::new(Dialect::Sqlite);
    /// let sql = qb.create_table(
    ///     "user",
    ///     &[(Some("id"), "pk".into()), (Some("name"), "string(64) NOT NULL".into())],
    ///     None,
    /// );
    /// assert_eq!(
    ///     "CREATE TABLE \"user\" (\n\t\"id\" integer PRIMARY KEY AUTOINCREMENT NOT NULL,\n\t\"name\" varchar(64) NOT NULL\n)",
    ///     sql
    /// );
    /// ```
    pub fn create_table(&self, table: &str, columns: &[TableColumn<'_>], options: Option<&str>) -> String {
        let quoter = self.quoter();
        let lines = columns
            .iter()
            .map(|(name, definition)| match (name, definition) {
                (Some(name), definition) => format!(
                    "\t{} {}",
                    quoter.quote_column_name(name),
                    self.build_column_definition(definition)
                ),
                (None, ColumnDef::Raw(line)) => format!("\t{line}"),
                (None, ColumnDef::Builder(column)) => format!("\t{}", self.build_column(column)),
            })
            .collect::<Vec<_>>();
        let mut sql = format!(
            "CREATE TABLE {} (\n{}\n)",
            quoter.quote_table_name(table),
            lines.join(",\n")
        );
        if let Some(options) = options {
            sql.push(' ');
            sql.push_str(options);
        }
        self.ddl("create_table", sql)
    }

    pub fn drop_table(&self, table: &str, if_exists: bool, cascade: bool) -> String {
        let mut sql = String::from("DROP TABLE ");
        if if_exists {
            sql.push_str("IF EXISTS ");
        }
        sql.push_str(&self.quoter().quote_table_name(table));
        if cascade {
            sql.push_str(" CASCADE");
        }
        self.ddl("drop_table", sql)
    }

    pub fn rename_table(&self, table: &str, new_name: &str) -> String {
        let quoter = self.quoter();
        let (table, new_name) = (quoter.quote_table_name(table), quoter.quote_table_name(new_name));
        let sql = match self.dialect() {
            Dialect::Postgres | Dialect::Sqlite => format!("ALTER TABLE {table} RENAME TO {new_name}"),
            Dialect::MySql | Dialect::Ansi => format!("RENAME TABLE {table} TO {new_name}"),
        };
        self.ddl("rename_table", sql)
    }

    pub fn truncate_table(&self, table: &str) -> String {
        let table = self.quoter().quote_table_name(table);
        let sql = match self.dialect() {
            Dialect::Sqlite => format!("DELETE FROM {table}"),
            _ => format!("TRUNCATE TABLE {table}"),
        };
        self.ddl("truncate_table", sql)
    }

    // column stuff

    pub fn add_column(&self, table: &str, column: &str, definition: &ColumnDef) -> String {
        let quoter = self.quoter();
        let sql = format!(
            "ALTER TABLE {} ADD {} {}",
            quoter.quote_table_name(table),
            quoter.quote_column_name(column),
            self.build_column_definition(definition)
        );
        self.ddl("add_column", sql)
    }

    pub fn drop_column(&self, table: &str, column: &str) -> String {
        let quoter = self.quoter();
        let sql = format!(
            "ALTER TABLE {} DROP COLUMN {}",
            quoter.quote_table_name(table),
            quoter.quote_column_name(column)
        );
        self.ddl("drop_column", sql)
    }

    pub fn rename_column(&self, table: &str, column: &str, new_name: &str) -> String {
        let quoter = self.quoter();
        let sql = format!(
            "ALTER TABLE {} RENAME COLUMN {} TO {}",
            quoter.quote_table_name(table),
            quoter.quote_column_name(column),
            quoter.quote_column_name(new_name)
        );
        self.ddl("rename_column", sql)
    }

    /// Changes the definition of a column.
    ///
    /// PostgreSQL cannot take a full definition, so it is split into `TYPE`, default,
    /// nullability, check and unique actions. A raw definition starting with `DROP`, `SET` or
    /// `RESET` is passed to `ALTER COLUMN` as it is.
    pub fn alter_column(&self, table: &str, column: &str, definition: &ColumnDef) -> Result<String> {
        let quoter = self.quoter();
        let table_name = quoter.quote_table_name(table);
        let column_name = quoter.quote_column_name(column);

        let sql = match self.dialect() {
            Dialect::Sqlite => return Err(Error::not_supported("alter_column")),
            Dialect::MySql | Dialect::Ansi => format!(
                "ALTER TABLE {table_name} CHANGE {column_name} {column_name} {}",
                self.build_column_definition(definition)
            ),
            Dialect::Postgres => match definition {
                ColumnDef::Raw(action) if ALTER_ACTION.is_match(action) => {
                    format!("ALTER TABLE {table_name} ALTER COLUMN {column_name} {action}")
                }
                definition => {
                    let definition = self.build_column_definition(definition);
                    let prefix = CONSTRAINT_PREFIX
                        .replace_all(&format!("{table}_{column}"), "")
                        .into_owned();
                    let actions = split_alter_definition(&definition, &column_name, &prefix);
                    format!("ALTER TABLE {table_name} {}", actions.join(", "))
                }
            },
        };
        Ok(self.ddl("alter_column", sql))
    }

    // constraint stuff

    pub fn add_primary_key(&self, table: &str, constraint: &Constraint) -> Result<String> {
        self.ensure_alter_constraints("add_primary_key")?;
        let sql = format!(
            "ALTER TABLE {} {}PRIMARY KEY ({})",
            self.quoter().quote_table_name(table),
            self.add_constraint_prefix(constraint),
            self.quote_columns(&constraint.column_names)
        );
        Ok(self.ddl("add_primary_key", sql))
    }

    pub fn drop_primary_key(&self, table: &str, name: &str) -> Result<String> {
        self.ensure_alter_constraints("drop_primary_key")?;
        let table = self.quoter().quote_table_name(table);
        let sql = match self.dialect() {
            Dialect::MySql => format!("ALTER TABLE {table} DROP PRIMARY KEY"),
            _ => format!("ALTER TABLE {table} DROP CONSTRAINT {}", self.quoter().quote_column_name(name)),
        };
        Ok(self.ddl("drop_primary_key", sql))
    }

    pub fn add_foreign_key(&self, table: &str, foreign_key: &ForeignKeyConstraint) -> Result<String> {
        self.ensure_alter_constraints("add_foreign_key")?;
        let quoter = self.quoter();
        let foreign_table = match &foreign_key.foreign_schema_name {
            Some(schema) => format!("{schema}.{}", foreign_key.foreign_table_name),
            None => foreign_key.foreign_table_name.to_string(),
        };
        let mut sql = format!(
            "ALTER TABLE {} {}FOREIGN KEY ({}) REFERENCES {} ({})",
            quoter.quote_table_name(table),
            self.add_constraint_prefix(&foreign_key.constraint),
            self.quote_columns(&foreign_key.constraint.column_names),
            quoter.quote_table_name(&foreign_table),
            self.quote_columns(&foreign_key.foreign_column_names)
        );
        if let Some(action) = &foreign_key.on_delete {
            sql.push_str(&format!(" ON DELETE {action}"));
        }
        if let Some(action) = &foreign_key.on_update {
            sql.push_str(&format!(" ON UPDATE {action}"));
        }
        Ok(self.ddl("add_foreign_key", sql))
    }

    pub fn drop_foreign_key(&self, table: &str, name: &str) -> Result<String> {
        self.drop_constraint("drop_foreign_key", table, name, "FOREIGN KEY")
    }

    pub fn add_unique(&self, table: &str, constraint: &Constraint) -> Result<String> {
        self.ensure_alter_constraints("add_unique")?;
        let sql = format!(
            "ALTER TABLE {} {}UNIQUE ({})",
            self.quoter().quote_table_name(table),
            self.add_constraint_prefix(constraint),
            self.quote_columns(&constraint.column_names)
        );
        Ok(self.ddl("add_unique", sql))
    }

    pub fn drop_unique(&self, table: &str, name: &str) -> Result<String> {
        self.drop_constraint("drop_unique", table, name, "INDEX")
    }

    pub fn add_check(&self, table: &str, check: &CheckConstraint) -> Result<String> {
        self.ensure_alter_constraints("add_check")?;
        let sql = format!(
            "ALTER TABLE {} {}CHECK ({})",
            self.quoter().quote_table_name(table),
            self.add_constraint_prefix(&check.constraint),
            check.expression
        );
        Ok(self.ddl("add_check", sql))
    }

    pub fn drop_check(&self, table: &str, name: &str) -> Result<String> {
        self.drop_constraint("drop_check", table, name, "CHECK")
    }

    pub fn add_default_value(&self, _table: &str, _default: &DefaultValueConstraint) -> Result<String> {
        Err(Error::not_supported("add_default_value"))
    }

    pub fn drop_default_value(&self, _table: &str, _name: &str) -> Result<String> {
        Err(Error::not_supported("drop_default_value"))
    }

    fn ensure_alter_constraints(&self, operation: &str) -> Result<()> {
        if self.dialect() == Dialect::Sqlite {
            return Err(Error::not_supported(operation));
        }
        Ok(())
    }

    fn add_constraint_prefix(&self, constraint: &Constraint) -> String {
        match &constraint.name {
            Some(name) => format!("ADD CONSTRAINT {} ", self.quoter().quote_column_name(name)),
            None => "ADD ".into(),
        }
    }

    /// MySQL drops constraints through their own kind keyword.
    fn drop_constraint(&self, operation: &str, table: &str, name: &str, mysql_kind: &str) -> Result<String> {
        self.ensure_alter_constraints(operation)?;
        let quoter = self.quoter();
        let kind = match self.dialect() {
            Dialect::MySql => mysql_kind,
            _ => "CONSTRAINT",
        };
        let sql = format!(
            "ALTER TABLE {} DROP {kind} {}",
            quoter.quote_table_name(table),
            quoter.quote_column_name(name)
        );
        Ok(self.ddl(operation, sql))
    }

    // index stuff

    /// `CREATE [UNIQUE|FULLTEXT|...] INDEX`, optionally with an index method such as `btree`.
    pub fn create_index<S: AsRef<str>>(
        &self,
        table: &str,
        name: &str,
        columns: &[S],
        index_type: Option<&str>,
        method: Option<&str>,
    ) -> String {
        let quoter = self.quoter();
        let create = match index_type {
            Some(index_type) => format!("CREATE {index_type} INDEX"),
            None => "CREATE INDEX".into(),
        };
        let columns = self.quote_columns(columns);

        let sql = match self.dialect() {
            Dialect::MySql => {
                let using = method.map(|m| format!(" USING {m}")).unwrap_or_default();
                format!(
                    "{create} {}{using} ON {} ({columns})",
                    quoter.quote_table_name(name),
                    quoter.quote_table_name(table)
                )
            }
            Dialect::Sqlite => {
                if let Some(method) = method {
                    warn!(method, "index method ignored");
                }
                // the schema qualifies the index, not the table
                let parts = quoter.table_name_parts(table);
                let (index, table) = match parts.as_slice() {
                    [schema, table] => (format!("{schema}.{name}"), (*table).to_string()),
                    _ => (name.to_string(), table.to_string()),
                };
                format!(
                    "{create} {} ON {} ({columns})",
                    quoter.quote_table_name(&index),
                    quoter.quote_table_name(&table)
                )
            }
            Dialect::Postgres | Dialect::Ansi => {
                let using = method.map(|m| format!(" USING {m}")).unwrap_or_default();
                format!(
                    "{create} {} ON {}{using} ({columns})",
                    quoter.quote_table_name(name),
                    quoter.quote_table_name(table)
                )
            }
        };
        self.ddl("create_index", sql)
    }

    pub fn drop_index(&self, table: &str, name: &str) -> String {
        let quoter = self.quoter();
        let sql = match self.dialect() {
            Dialect::Postgres => {
                let parts = quoter.table_name_parts(table);
                let name = match parts.as_slice() {
                    [schema, _] if !name.contains('.') => format!("{schema}.{name}"),
                    _ => name.to_string(),
                };
                format!("DROP INDEX {}", quoter.quote_table_name(&name))
            }
            Dialect::Sqlite => format!("DROP INDEX {}", quoter.quote_table_name(name)),
            Dialect::MySql | Dialect::Ansi => format!(
                "DROP INDEX {} ON {}",
                quoter.quote_table_name(name),
                quoter.quote_table_name(table)
            ),
        };
        self.ddl("drop_index", sql)
    }

    // view stuff

    /// `CREATE VIEW name AS ...`. Views cannot carry bind parameters, so the parameters of the
    /// query are inlined as literals.
    pub fn create_view(&self, name: &str, query: &Expr) -> Result<String> {
        let mut params = Params::new();
        let mut context = BuildContext::new(self, &mut params);
        let sql = match query {
            Expr::Query(query) => context.build_query(query)?,
            other => context.build_expression(other)?,
        };
        let sql = inline_params(&sql, &params, self.quoter());
        let sql = format!("CREATE VIEW {} AS {sql}", self.quoter().quote_table_name(name));
        Ok(self.ddl("create_view", sql))
    }

    pub fn drop_view(&self, name: &str) -> String {
        let sql = format!("DROP VIEW {}", self.quoter().quote_table_name(name));
        self.ddl("drop_view", sql)
    }

    // comment stuff

    pub fn add_comment_on_column(&self, table: &str, column: &str, comment: &str) -> Result<String> {
        let quoter = self.quoter();
        let sql = match self.dialect() {
            Dialect::Sqlite => return Err(Error::not_supported("add_comment_on_column")),
            Dialect::MySql => {
                let column_name = quoter.quote_column_name(column);
                let definition = self
                    .table_schema_of(table)
                    .and_then(|schema| schema.get_column(column).map(mysql_column_definition))
                    .map(|definition| format!(" {definition}"))
                    .unwrap_or_default();
                format!(
                    "ALTER TABLE {} CHANGE {column_name} {column_name}{definition} COMMENT {}",
                    quoter.quote_table_name(table),
                    quoter.quote_str(comment)
                )
            }
            Dialect::Postgres | Dialect::Ansi => format!(
                "COMMENT ON COLUMN {}.{} IS {}",
                quoter.quote_table_name(table),
                quoter.quote_column_name(column),
                quoter.quote_str(comment)
            ),
        };
        Ok(self.ddl("add_comment_on_column", sql))
    }

    pub fn add_comment_on_table(&self, table: &str, comment: &str) -> Result<String> {
        let quoter = self.quoter();
        let table = quoter.quote_table_name(table);
        let sql = match self.dialect() {
            Dialect::Sqlite => return Err(Error::not_supported("add_comment_on_table")),
            Dialect::MySql => format!("ALTER TABLE {table} COMMENT {}", quoter.quote_str(comment)),
            Dialect::Postgres | Dialect::Ansi => {
                format!("COMMENT ON TABLE {table} IS {}", quoter.quote_str(comment))
            }
        };
        Ok(self.ddl("add_comment_on_table", sql))
    }

    pub fn drop_comment_from_column(&self, table: &str, column: &str) -> Result<String> {
        let quoter = self.quoter();
        match self.dialect() {
            Dialect::Sqlite => Err(Error::not_supported("drop_comment_from_column")),
            Dialect::MySql => self.add_comment_on_column(table, column, ""),
            Dialect::Postgres | Dialect::Ansi => {
                let sql = format!(
                    "COMMENT ON COLUMN {}.{} IS NULL",
                    quoter.quote_table_name(table),
                    quoter.quote_column_name(column)
                );
                Ok(self.ddl("drop_comment_from_column", sql))
            }
        }
    }

    pub fn drop_comment_from_table(&self, table: &str) -> Result<String> {
        match self.dialect() {
            Dialect::Sqlite => Err(Error::not_supported("drop_comment_from_table")),
            Dialect::MySql => self.add_comment_on_table(table, ""),
            Dialect::Postgres | Dialect::Ansi => {
                let sql = format!("COMMENT ON TABLE {} IS NULL", self.quoter().quote_table_name(table));
                Ok(self.ddl("drop_comment_from_table", sql))
            }
        }
    }

    // integrity and sequences

    /// Enables or disables foreign key checks. PostgreSQL toggles the triggers of one table,
    /// in `public` unless a schema is given.
    pub fn check_integrity(&self, schema: Option<&str>, table: Option<&str>, check: bool) -> Result<String> {
        let sql = match self.dialect() {
            Dialect::Postgres => {
                let Some(table) = table else {
                    return Err(Error::invalid_argument(
                        "Table name is required to toggle integrity checks.",
                    ));
                };
                let schema = schema.unwrap_or(DEFAULT_SCHEMA);
                let action = if check { "ENABLE" } else { "DISABLE" };
                format!(
                    "ALTER TABLE {} {action} TRIGGER ALL",
                    self.quoter().quote_table_name(&format!("{schema}.{table}"))
                )
            }
            Dialect::MySql => format!("SET FOREIGN_KEY_CHECKS = {}", u8::from(check)),
            Dialect::Sqlite => format!("PRAGMA foreign_keys={}", u8::from(check)),
            Dialect::Ansi => return Err(Error::not_supported("check_integrity")),
        };
        Ok(self.ddl("check_integrity", sql))
    }

    /// Sets the next value of the primary key sequence.
    ///
    /// Without a value PostgreSQL and SQLite continue after the current maximum key. MySQL
    /// renders `AUTO_INCREMENT=1` instead, the server then raises it to `MAX(pk)+1` itself.
    pub fn reset_sequence(&self, table: &str, value: Option<i64>) -> Result<String> {
        if self.dialect() == Dialect::Ansi {
            return Err(Error::not_supported("reset_sequence"));
        }
        let Some(schema) = self.table_schema_of(table) else {
            return Err(Error::invalid_argument(format!("Table not found: '{table}'.")));
        };
        let has_sequence = schema.sequence_name.is_some()
            || schema.columns.values().any(|column| column.auto_increment);
        if !has_sequence {
            return Err(Error::invalid_argument(format!(
                "There is no sequence associated with table '{table}'."
            )));
        }

        let quoter = self.quoter();
        let table_name = quoter.quote_table_name(table);
        let primary_key = || {
            schema
                .primary_key
                .as_ref()
                .and_then(|pk| pk.column_names.first())
                .map(|name| quoter.quote_column_name(name))
                .ok_or_else(|| Error::invalid_argument(format!("Table '{table}' has no primary key.")))
        };

        let sql = match self.dialect() {
            Dialect::Postgres => {
                let Some(sequence) = &schema.sequence_name else {
                    return Err(Error::invalid_argument(format!(
                        "There is no sequence associated with table '{table}'."
                    )));
                };
                let value = match value {
                    Some(value) => value.to_string(),
                    None => format!("(SELECT COALESCE(MAX({}),0) FROM {table_name})+1", primary_key()?),
                };
                format!("SELECT SETVAL('{}',{value},false)", quoter.quote_table_name(sequence))
            }
            Dialect::MySql => format!("ALTER TABLE {table_name} AUTO_INCREMENT={}", value.unwrap_or(1)),
            Dialect::Sqlite => {
                let seq = match value {
                    Some(value) => format!("'{}'", value.saturating_sub(1)),
                    None => format!("(SELECT MAX({}) FROM {table_name})", primary_key()?),
                };
                format!(
                    "UPDATE sqlite_sequence SET seq={seq} WHERE name={}",
                    quoter.quote_str(&schema.name)
                )
            }
            Dialect::Ansi => return Err(Error::not_supported("reset_sequence")),
        };
        Ok(self.ddl("reset_sequence", sql))
    }
}

/// PostgreSQL `ALTER TABLE` actions equivalent to a full column definition.
fn split_alter_definition(definition: &str, column: &str, constraint_prefix: &str) -> Vec<String> {
    let mut ty = format!("TYPE {definition}");
    let mut actions = Vec::new();

    if let Some(default) = ALTER_DEFAULT
        .captures(&ty)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().to_string())
    {
        ty = ALTER_DEFAULT.replace(&ty, "").into_owned();
        actions.push(format!("ALTER COLUMN {column} SET DEFAULT {default}"));
    } else {
        actions.push(format!("ALTER COLUMN {column} DROP DEFAULT"));
    }

    if ALTER_NOT_NULL.is_match(&ty) {
        ty = ALTER_NOT_NULL.replace_all(&ty, "").into_owned();
        actions.push(format!("ALTER COLUMN {column} SET NOT NULL"));
    } else {
        ty = ALTER_NULL.replace_all(&ty, "").into_owned();
        actions.push(format!("ALTER COLUMN {column} DROP NOT NULL"));
    }

    if let Some(check) = ALTER_CHECK
        .captures(&ty)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().to_string())
    {
        ty = ALTER_CHECK.replace(&ty, "").into_owned();
        actions.push(format!("ADD CONSTRAINT {constraint_prefix}_check CHECK ({check})"));
    }

    if ALTER_UNIQUE.is_match(&ty) {
        ty = ALTER_UNIQUE.replace_all(&ty, "").into_owned();
        actions.push(format!("ADD UNIQUE ({column})"));
    }

    actions.insert(0, format!("ALTER COLUMN {column} {ty}"));
    actions
}

/// Definition of an existing column, repeated by MySQL `CHANGE` statements.
fn mysql_column_definition(column: &ColumnSchema) -> String {
    let mut definition = column.db_type.clone();
    if column.unsigned && !definition.to_lowercase().contains("unsigned") {
        definition.push_str(" UNSIGNED");
    }
    if !column.allow_null {
        definition.push_str(" NOT NULL");
    }
    if let Some(default) = &column.default_value {
        definition.push_str(&format!(" DEFAULT {default}"));
    }
    if column.auto_increment {
        definition.push_str(" AUTO_INCREMENT");
    }
    definition
}

#[cfg(test)]
mod tests {
    use crate::{
        column::{ColumnBuilder, ColumnReference},
        map,
        query::sub,
        schema::{ColumnKind, MemorySchema},
        tests::replace_quotes,
    };

    use super::*;

    fn schema() -> Arc<MemorySchema> {
        Arc::new(
            MemorySchema::new()
                .with_table(
                    TableSchema::new("user")
                        .column(
                            ColumnSchema::new("id", ColumnKind::Integer, "int(11)")
                                .primary_key()
                                .auto_increment(),
                        )
                        .column(
                            ColumnSchema::new("name", ColumnKind::String, "varchar(64)")
                                .not_null()
                                .default_value("''"),
                        )
                        .primary_key(["id"])
                        .sequence_name("user_id_seq"),
                )
                .with_table(
                    TableSchema::new("tag")
                        .column(ColumnSchema::new("label", ColumnKind::String, "text")),
                ),
        )
    }

    fn builder(dialect: Dialect) -> QueryBuilder {
        QueryBuilder::new(dialect).with_schema(schema())
    }

    #[test]
    fn test_create_table() {
        let qb = QueryBuilder::new(Dialect::Postgres);
        let sql = qb.create_table(
            "order",
            &[
                (Some("id"), ColumnBuilder::primary_key().into()),
                (
                    Some("customer_id"),
                    ColumnBuilder::integer()
                        .not_null()
                        .references(ColumnReference::new("customer", ["id"]))
                        .into(),
                ),
                (Some("total"), "money".into()),
                (None, "UNIQUE (customer_id, total)".into()),
            ],
            Some("WITH (fillfactor = 70)"),
        );
        assert_eq!(
            "CREATE TABLE \"order\" (\n\t\"id\" serial NOT NULL PRIMARY KEY,\n\t\"customer_id\" integer NOT NULL REFERENCES \"customer\" (\"id\"),\n\t\"total\" numeric(19,4),\n\tUNIQUE (customer_id, total)\n) WITH (fillfactor = 70)",
            sql
        );
    }

    #[test]
    fn test_table_statements() {
        let pg = QueryBuilder::new(Dialect::Postgres);
        let mysql = QueryBuilder::new(Dialect::MySql);
        let sqlite = QueryBuilder::new(Dialect::Sqlite);
        assert_eq!("DROP TABLE IF EXISTS \"t\" CASCADE", pg.drop_table("t", true, true));
        assert_eq!("DROP TABLE `t`", mysql.drop_table("t", false, false));
        assert_eq!("ALTER TABLE \"a\" RENAME TO \"b\"", pg.rename_table("a", "b"));
        assert_eq!("RENAME TABLE `a` TO `b`", mysql.rename_table("a", "b"));
        assert_eq!("TRUNCATE TABLE \"t\"", pg.truncate_table("t"));
        assert_eq!("DELETE FROM \"t\"", sqlite.truncate_table("t"));
    }

    #[test]
    fn test_column_statements() {
        let qb = QueryBuilder::new(Dialect::MySql);
        assert_eq!(
            "ALTER TABLE `user` ADD `age` int(11) UNSIGNED NOT NULL AFTER `name`",
            qb.add_column(
                "user",
                "age",
                &ColumnBuilder::integer().unsigned().not_null().after("name").into()
            )
        );
        assert_eq!("ALTER TABLE `user` DROP COLUMN `age`", qb.drop_column("user", "age"));
        assert_eq!(
            "ALTER TABLE `user` RENAME COLUMN `a` TO `b`",
            qb.rename_column("user", "a", "b")
        );
        assert_eq!(
            "ALTER TABLE `user` CHANGE `name` `name` varchar(32) NOT NULL",
            qb.alter_column("user", "name", &"string(32) NOT NULL".into()).unwrap()
        );
    }

    #[test]
    fn test_alter_column_postgres() {
        let qb = QueryBuilder::new(Dialect::Postgres);
        assert_eq!(
            "ALTER TABLE \"foo\" ALTER COLUMN \"bar\" TYPE varchar(32), ALTER COLUMN \"bar\" DROP DEFAULT, ALTER COLUMN \"bar\" SET NOT NULL, ADD UNIQUE (\"bar\")",
            qb.alter_column("foo", "bar", &"string(32) NOT NULL UNIQUE".into()).unwrap()
        );
        assert_eq!(
            "ALTER TABLE \"foo\" ALTER COLUMN \"bar\" TYPE integer, ALTER COLUMN \"bar\" SET DEFAULT 0, ALTER COLUMN \"bar\" DROP NOT NULL, ADD CONSTRAINT foo_bar_check CHECK (bar > 0)",
            qb.alter_column("foo", "bar", &"integer DEFAULT 0 CHECK (bar > 0)".into()).unwrap()
        );
        assert_eq!(
            "ALTER TABLE \"foo\" ALTER COLUMN \"bar\" SET NOT NULL",
            qb.alter_column("foo", "bar", &"SET NOT NULL".into()).unwrap()
        );
    }

    #[test]
    fn test_alter_column_not_supported_on_sqlite() {
        let err = QueryBuilder::new(Dialect::Sqlite)
            .alter_column("foo", "bar", &"integer".into())
            .unwrap_err();
        assert_eq!("alter_column is not supported by this DBMS.", err.to_string());
    }

    #[test]
    fn test_constraints() {
        let pg = QueryBuilder::new(Dialect::Postgres);
        assert_eq!(
            "ALTER TABLE \"user\" ADD CONSTRAINT \"pk_user\" PRIMARY KEY (\"id\", \"tenant\")",
            pg.add_primary_key("user", &Constraint::new("pk_user", ["id", "tenant"]))
                .unwrap()
        );
        assert_eq!(
            "ALTER TABLE \"user\" ADD UNIQUE (\"email\")",
            pg.add_unique("user", &Constraint::unnamed(["email"])).unwrap()
        );
        let check = CheckConstraint {
            constraint: Constraint::new("chk_age", Vec::<&str>::new()),
            expression: "age > 0".into(),
        };
        assert_eq!(
            "ALTER TABLE \"user\" ADD CONSTRAINT \"chk_age\" CHECK (age > 0)",
            pg.add_check("user", &check).unwrap()
        );
        assert_eq!(
            "ALTER TABLE \"user\" DROP CONSTRAINT \"chk_age\"",
            pg.drop_check("user", "chk_age").unwrap()
        );

        let mysql = QueryBuilder::new(Dialect::MySql);
        assert_eq!(
            "ALTER TABLE `user` DROP PRIMARY KEY",
            mysql.drop_primary_key("user", "pk_user").unwrap()
        );
        assert_eq!(
            "ALTER TABLE `user` DROP FOREIGN KEY `fk_x`",
            mysql.drop_foreign_key("user", "fk_x").unwrap()
        );
        assert_eq!(
            "ALTER TABLE `user` DROP INDEX `uq_email`",
            mysql.drop_unique("user", "uq_email").unwrap()
        );

        let sqlite = QueryBuilder::new(Dialect::Sqlite);
        assert!(sqlite.drop_unique("user", "uq").unwrap_err().is_not_supported());
        assert!(
            sqlite
                .add_primary_key("user", &Constraint::unnamed(["id"]))
                .unwrap_err()
                .is_not_supported()
        );
    }

    #[test]
    fn test_foreign_key() {
        let foreign_key = ForeignKeyConstraint {
            constraint: Constraint::new("fk_order_customer", ["customer_id"]),
            foreign_schema_name: Some("sales".into()),
            foreign_table_name: "customer".into(),
            foreign_column_names: vec!["id".into()],
            on_delete: Some("CASCADE".into()),
            on_update: None,
        };
        let sql = QueryBuilder::new(Dialect::Postgres)
            .add_foreign_key("order", &foreign_key)
            .unwrap();
        assert_eq!(
            "ALTER TABLE \"order\" ADD CONSTRAINT \"fk_order_customer\" FOREIGN KEY (\"customer_id\") REFERENCES \"sales\".\"customer\" (\"id\") ON DELETE CASCADE",
            sql
        );
    }

    #[test]
    fn test_default_value_constraints_not_supported() {
        for dialect in [Dialect::Postgres, Dialect::MySql, Dialect::Sqlite, Dialect::Ansi] {
            let qb = QueryBuilder::new(dialect);
            let err = qb
                .add_default_value("t", &DefaultValueConstraint::default())
                .unwrap_err();
            assert_eq!("add_default_value is not supported by this DBMS.", err.to_string());
            assert!(qb.drop_default_value("t", "df").unwrap_err().is_not_supported());
        }
    }

    #[test]
    fn test_indexes() {
        let columns = ["name", "LOWER(email)"];
        assert_eq!(
            "CREATE UNIQUE INDEX \"idx\" ON \"user\" USING btree (\"name\", LOWER(email))",
            QueryBuilder::new(Dialect::Postgres).create_index(
                "user",
                "idx",
                &columns,
                Some("UNIQUE"),
                Some("btree")
            )
        );
        assert_eq!(
            "CREATE FULLTEXT INDEX `idx` USING btree ON `user` (`name`, LOWER(email))",
            QueryBuilder::new(Dialect::MySql).create_index(
                "user",
                "idx",
                &columns,
                Some("FULLTEXT"),
                Some("btree")
            )
        );
        assert_eq!(
            "CREATE INDEX \"main\".\"idx\" ON \"user\" (\"name\")",
            QueryBuilder::new(Dialect::Sqlite).create_index(
                "main.user",
                "idx",
                &["name"],
                None,
                Some("btree")
            )
        );

        assert_eq!(
            "DROP INDEX \"app\".\"idx\"",
            QueryBuilder::new(Dialect::Postgres).drop_index("app.user", "idx")
        );
        assert_eq!(
            "DROP INDEX `idx` ON `user`",
            QueryBuilder::new(Dialect::MySql).drop_index("user", "idx")
        );
        assert_eq!(
            "DROP INDEX \"idx\"",
            QueryBuilder::new(Dialect::Sqlite).drop_index("user", "idx")
        );
    }

    #[test]
    fn test_create_view_inlines_params() {
        let query = sub(|q| {
            q.select(["id", "name"])
                .from("user")
                .where_condition(map! {"status" => "it's", "role" => 2});
        });
        for dialect in [Dialect::Postgres, Dialect::Sqlite] {
            let sql = QueryBuilder::new(dialect)
                .create_view("active_user", &query.clone().into())
                .unwrap();
            assert_eq!(
                replace_quotes(
                    "CREATE VIEW [[active_user]] AS SELECT [[id]], [[name]] FROM [[user]] WHERE ([[status]]='it''s') AND ([[role]]=2)",
                    dialect
                ),
                sql
            );
        }
        assert_eq!(
            "CREATE VIEW `v` AS SELECT 1",
            QueryBuilder::new(Dialect::MySql)
                .create_view("v", &Expr::raw("SELECT 1"))
                .unwrap()
        );
        assert_eq!("DROP VIEW `v`", QueryBuilder::new(Dialect::MySql).drop_view("v"));
    }

    #[test]
    fn test_comments() {
        let pg = QueryBuilder::new(Dialect::Postgres);
        assert_eq!(
            "COMMENT ON COLUMN \"user\".\"name\" IS 'display name'",
            pg.add_comment_on_column("user", "name", "display name").unwrap()
        );
        assert_eq!(
            "COMMENT ON TABLE \"user\" IS NULL",
            pg.drop_comment_from_table("user").unwrap()
        );
        assert_eq!(
            "COMMENT ON COLUMN \"user\".\"name\" IS NULL",
            pg.drop_comment_from_column("user", "name").unwrap()
        );

        let mysql = builder(Dialect::MySql);
        assert_eq!(
            "ALTER TABLE `user` CHANGE `name` `name` varchar(64) NOT NULL DEFAULT '' COMMENT 'it\\'s'",
            mysql.add_comment_on_column("user", "name", "it's").unwrap()
        );
        assert_eq!(
            "ALTER TABLE `user` COMMENT ''",
            mysql.drop_comment_from_table("user").unwrap()
        );

        let sqlite = QueryBuilder::new(Dialect::Sqlite);
        assert!(
            sqlite
                .add_comment_on_table("user", "x")
                .unwrap_err()
                .is_not_supported()
        );
    }

    #[test]
    fn test_check_integrity() {
        assert_eq!(
            "ALTER TABLE \"public\".\"user\" DISABLE TRIGGER ALL",
            QueryBuilder::new(Dialect::Postgres)
                .check_integrity(None, Some("user"), false)
                .unwrap()
        );
        assert_eq!(
            "SET FOREIGN_KEY_CHECKS = 1",
            QueryBuilder::new(Dialect::MySql)
                .check_integrity(None, None, true)
                .unwrap()
        );
        assert_eq!(
            "PRAGMA foreign_keys=0",
            QueryBuilder::new(Dialect::Sqlite)
                .check_integrity(None, None, false)
                .unwrap()
        );
        assert!(
            QueryBuilder::new(Dialect::Ansi)
                .check_integrity(None, Some("user"), true)
                .unwrap_err()
                .is_not_supported()
        );
    }

    #[test]
    fn test_reset_sequence() {
        assert_eq!(
            "SELECT SETVAL('\"user_id_seq\"',(SELECT COALESCE(MAX(\"id\"),0) FROM \"user\")+1,false)",
            builder(Dialect::Postgres).reset_sequence("user", None).unwrap()
        );
        assert_eq!(
            "SELECT SETVAL('\"user_id_seq\"',5,false)",
            builder(Dialect::Postgres).reset_sequence("user", Some(5)).unwrap()
        );
        assert_eq!(
            "ALTER TABLE `user` AUTO_INCREMENT=5",
            builder(Dialect::MySql).reset_sequence("user", Some(5)).unwrap()
        );
        assert_eq!(
            "UPDATE sqlite_sequence SET seq='4' WHERE name='user'",
            builder(Dialect::Sqlite).reset_sequence("user", Some(5)).unwrap()
        );
        assert_eq!(
            "UPDATE sqlite_sequence SET seq=(SELECT MAX(\"id\") FROM \"user\") WHERE name='user'",
            builder(Dialect::Sqlite).reset_sequence("user", None).unwrap()
        );
    }

    #[test]
    fn test_reset_sequence_bounds() {
        assert_eq!(
            "ALTER TABLE `user` AUTO_INCREMENT=1",
            builder(Dialect::MySql).reset_sequence("user", None).unwrap()
        );
        assert_eq!(
            format!("UPDATE sqlite_sequence SET seq='{}' WHERE name='user'", i64::MIN),
            builder(Dialect::Sqlite).reset_sequence("user", Some(i64::MIN)).unwrap()
        );
    }

    #[test]
    fn test_reset_sequence_errors() {
        let qb = builder(Dialect::Postgres);
        assert_eq!(
            "Invalid argument: Table not found: 'missing'.",
            qb.reset_sequence("missing", None).unwrap_err().to_string()
        );
        assert!(qb.reset_sequence("tag", None).unwrap_err().is_invalid_argument());
        assert!(
            QueryBuilder::new(Dialect::Ansi)
                .reset_sequence("user", None)
                .unwrap_err()
                .is_not_supported()
        );
    }
}
