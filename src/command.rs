//! Hand-off of built SQL to an execution layer.

use indexmap::IndexMap;
use smol_str::SmolStr;
use tracing::debug;

use crate::{
    dialect::Dialect,
    error::Result,
    quoter::Quoter,
    scan::inline_params,
    tokenizer::SqlTokenizer,
    value::{Params, Value},
};

/// One result row, column name to value in select order.
pub type Record = IndexMap<String, Value>;

/// Runs SQL against a database. The builders never call it, only [`Command`] forwards to it.
pub trait Executor {
    /// Runs a statement and returns the number of affected rows.
    fn execute(&self, sql: &str, params: &Params) -> Result<u64>;

    fn query(&self, sql: &str, params: &Params) -> Result<Vec<Record>>;
}

/// Built SQL with its bound parameters.
#[derive(Debug, Clone)]
pub struct Command {
    sql: String,
    params: Params,
    quoter: Quoter,
}

impl Command {
    pub fn new(sql: impl Into<String>, params: Params, dialect: Dialect, table_prefix: impl Into<SmolStr>) -> Self {
        Self {
            sql: sql.into(),
            params,
            quoter: Quoter::new(dialect, table_prefix),
        }
    }

    pub fn sql(&self) -> &str {
        &self.sql
    }

    pub fn params(&self) -> &Params {
        &self.params
    }

    pub fn dialect(&self) -> Dialect {
        self.quoter.dialect()
    }

    /// SQL with `{{table}}` and `[[column]]` resolved, as it is sent to the database.
    pub fn quoted_sql(&self) -> String {
        self.quoter.quote_sql(&self.sql)
    }

    /// SQL with every parameter inlined as a literal. For logging only.
    pub fn raw_sql(&self) -> String {
        inline_params(&self.quoted_sql(), &self.params, &self.quoter)
    }

    /// The statements of a `;` separated script.
    pub fn statements(&self) -> Result<Vec<String>> {
        let sql = self.quoted_sql();
        let code = SqlTokenizer::new(&sql).tokenize()?;
        Ok(code
            .statements()
            .filter(|statement| !statement.is_empty())
            .map(|statement| statement.sql(&sql).trim().to_string())
            .collect())
    }

    pub fn execute<E: Executor + ?Sized>(&self, executor: &E) -> Result<u64> {
        let sql = self.quoted_sql();
        debug!(sql = %sql, params = self.params.len(), "execute");
        executor.execute(&sql, &self.params)
    }

    pub fn query<E: Executor + ?Sized>(&self, executor: &E) -> Result<Vec<Record>> {
        let sql = self.quoted_sql();
        debug!(sql = %sql, params = self.params.len(), "query");
        executor.query(&sql, &self.params)
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;

    use crate::{QueryBuilder, error::Error};

    use super::*;

    #[derive(Default)]
    struct Recorder {
        calls: RefCell<Vec<(String, usize)>>,
    }

    impl Executor for Recorder {
        fn execute(&self, sql: &str, params: &Params) -> Result<u64> {
            self.calls.borrow_mut().push((sql.to_string(), params.len()));
            Ok(1)
        }

        fn query(&self, sql: &str, _params: &Params) -> Result<Vec<Record>> {
            if sql.contains("missing") {
                return Err(Error::Execution("no such table".into()));
            }
            let mut record = Record::new();
            record.insert("id".into(), Value::Int(1));
            Ok(vec![record])
        }
    }

    #[test]
    fn test_quoted_and_raw_sql() {
        let command = Command::new(
            "SELECT [[id]] FROM {{%user}} WHERE [[name]] = :qp0",
            Params::from([(":qp0", "o'neil")]),
            Dialect::Postgres,
            "app_",
        );
        assert_eq!(
            "SELECT \"id\" FROM \"app_user\" WHERE \"name\" = :qp0",
            command.quoted_sql()
        );
        assert_eq!(
            "SELECT \"id\" FROM \"app_user\" WHERE \"name\" = 'o''neil'",
            command.raw_sql()
        );
    }

    #[test]
    fn test_statements() {
        let command = Command::new(
            "DELETE FROM t; INSERT INTO t VALUES (';'); ",
            Params::new(),
            Dialect::Sqlite,
            "",
        );
        assert_eq!(
            vec!["DELETE FROM t".to_string(), "INSERT INTO t VALUES (';')".to_string()],
            command.statements().unwrap()
        );
    }

    #[test]
    fn test_forwards_to_executor() {
        let qb = QueryBuilder::new(Dialect::MySql);
        let command = qb.command("UPDATE {{t}} SET [[a]] = :qp0", Params::from([(":qp0", 1)]));
        let recorder = Recorder::default();
        assert_eq!(1, command.execute(&recorder).unwrap());
        assert_eq!(
            vec![("UPDATE `t` SET `a` = :qp0".to_string(), 1)],
            *recorder.calls.borrow()
        );

        let rows = command.query(&recorder).unwrap();
        assert_eq!(Some(&Value::Int(1)), rows[0].get("id"));

        let command = qb.command("SELECT * FROM missing", Params::new());
        assert!(matches!(command.query(&recorder), Err(Error::Execution(_))));
    }
}
