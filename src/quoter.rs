use std::{
    collections::HashMap,
    sync::{LazyLock, RwLock},
};

use regex::{Captures, Regex};
use smol_str::SmolStr;
use tracing::trace;

use crate::{dialect::Dialect, value::Value};

static PLACEHOLDER_NAMES: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\{\{(%?[\w\-. ]+%?)\}\}|\[\[([\w\-. ]+)\]\]").expect("valid placeholder regex")
});

static TABLE_PLACEHOLDER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\{\{(.*?)\}\}").expect("valid table placeholder regex"));

#[derive(Debug, Default)]
struct QuoteCache {
    tables: RwLock<HashMap<String, String>>,
    columns: RwLock<HashMap<String, String>>,
}

impl QuoteCache {
    fn get(map: &RwLock<HashMap<String, String>>, name: &str) -> Option<String> {
        let guard = map.read().ok()?;
        guard.get(name).cloned()
    }

    fn put(map: &RwLock<HashMap<String, String>>, name: &str, quoted: &str) {
        // a poisoned lock only disables memoization
        if let Ok(mut guard) = map.write() {
            guard.insert(name.to_string(), quoted.to_string());
        }
    }
}

/// Quotes identifiers and values for one dialect and resolves `{{table}}`/`[[column]]`
/// placeholders embedded in raw SQL.
#[derive(Debug)]
pub struct Quoter {
    dialect: Dialect,
    table_prefix: SmolStr,
    cache: Option<QuoteCache>,
}

impl Clone for Quoter {
    fn clone(&self) -> Self {
        Self {
            dialect: self.dialect,
            table_prefix: self.table_prefix.clone(),
            cache: self.cache.as_ref().map(|_| QuoteCache::default()),
        }
    }
}

impl Quoter {
    pub fn new(dialect: Dialect, table_prefix: impl Into<SmolStr>) -> Self {
        Self {
            dialect,
            table_prefix: table_prefix.into(),
            cache: None,
        }
    }

    /// Memoizes quoted names for the lifetime of the quoter.
    pub fn with_cache(mut self) -> Self {
        self.cache = Some(QuoteCache::default());
        self
    }

    pub fn dialect(&self) -> Dialect {
        self.dialect
    }

    pub fn table_prefix(&self) -> &str {
        &self.table_prefix
    }

    /// Quotes a possibly schema-qualified table name. Names containing `(` or `{{` are
    /// returned untouched, already quoted parts are kept as they are.
    pub fn quote_table_name(&self, name: &str) -> String {
        if let Some(cache) = &self.cache {
            if let Some(quoted) = QuoteCache::get(&cache.tables, name) {
                trace!(name, "quoted table name cache hit");
                return quoted;
            }
            let quoted = self.quote_table_name_uncached(name);
            trace!(name, quoted = %quoted, "quoted table name cache miss");
            QuoteCache::put(&cache.tables, name, &quoted);
            return quoted;
        }
        self.quote_table_name_uncached(name)
    }

    fn quote_table_name_uncached(&self, name: &str) -> String {
        if name.contains('(') || name.contains("{{") {
            return name.to_string();
        }
        let parts = self.table_name_parts(name);
        if parts.len() == 1 {
            return self.quote_simple_table_name(name);
        }
        parts
            .iter()
            .map(|part| self.quote_simple_table_name(part))
            .collect::<Vec<_>>()
            .join(".")
    }

    /// Quotes a column name, optionally prefixed by a table name. `*` is never quoted.
    pub fn quote_column_name(&self, name: &str) -> String {
        if let Some(cache) = &self.cache {
            if let Some(quoted) = QuoteCache::get(&cache.columns, name) {
                trace!(name, "quoted column name cache hit");
                return quoted;
            }
            let quoted = self.quote_column_name_uncached(name);
            trace!(name, quoted = %quoted, "quoted column name cache miss");
            QuoteCache::put(&cache.columns, name, &quoted);
            return quoted;
        }
        self.quote_column_name_uncached(name)
    }

    fn quote_column_name_uncached(&self, name: &str) -> String {
        if name.contains('(') || name.contains("[[") {
            return name.to_string();
        }
        let (prefix, column) = match self.last_dot(name) {
            Some(index) => (
                format!("{}.", self.quote_table_name(&name[..index])),
                &name[index + 1..],
            ),
            None => (String::new(), name),
        };
        if column.contains("{{") {
            return name.to_string();
        }
        prefix + &self.quote_simple_column_name(column)
    }

    pub fn quote_simple_table_name(&self, name: &str) -> String {
        if self.is_quoted(name) {
            return name.to_string();
        }
        self.wrap(name)
    }

    pub fn quote_simple_column_name(&self, name: &str) -> String {
        if name == "*" || self.is_quoted(name) {
            return name.to_string();
        }
        self.wrap(name)
    }

    /// Removes the dialect quotes from a simple name.
    pub fn unquote_simple_name(&self, name: &str) -> String {
        if !self.is_quoted(name) {
            return name.to_string();
        }
        let (open, close) = self.dialect.quote_chars();
        let inner = &name[open.len_utf8()..name.len() - close.len_utf8()];
        let doubled: String = [close, close].iter().collect();
        inner.replace(&doubled, &close.to_string())
    }

    /// Splits a qualified name on dots that are not inside quotes.
    pub fn table_name_parts<'a>(&self, name: &'a str) -> Vec<&'a str> {
        let (open, close) = self.dialect.quote_chars();
        let mut parts = Vec::new();
        let mut quoted = false;
        let mut start = 0;
        for (index, char) in name.char_indices() {
            if !quoted && char == open {
                quoted = true;
            } else if quoted && char == close {
                quoted = false;
            } else if !quoted && char == '.' {
                parts.push(&name[start..index]);
                start = index + 1;
            }
        }
        parts.push(&name[start..]);
        parts
    }

    /// Name without `{{ }}` markers and with `%` resolved to the table prefix.
    pub fn get_raw_table_name(&self, name: &str) -> String {
        if name.contains("{{") {
            let name = TABLE_PLACEHOLDER.replace_all(name, "$1");
            return name.replace('%', &self.table_prefix);
        }
        name.to_string()
    }

    /// Rewrites `{{table}}` and `[[column]]` placeholders into quoted names.
    pub fn quote_sql(&self, sql: &str) -> String {
        PLACEHOLDER_NAMES
            .replace_all(sql, |caps: &Captures<'_>| {
                if let Some(column) = caps.get(2) {
                    return self.quote_column_name(column.as_str());
                }
                let table = caps.get(1).map(|m| m.as_str()).unwrap_or_default();
                self.quote_table_name(table).replace('%', &self.table_prefix)
            })
            .into_owned()
    }

    /// Renders a string as a SQL literal.
    pub fn quote_str(&self, value: &str) -> String {
        let mut quoted = String::with_capacity(value.len() + 2);
        quoted.push('\'');
        match self.dialect {
            Dialect::MySql => {
                for char in value.chars() {
                    match char {
                        '\\' => quoted.push_str("\\\\"),
                        '\0' => quoted.push_str("\\0"),
                        '\n' => quoted.push_str("\\n"),
                        '\r' => quoted.push_str("\\r"),
                        '\'' => quoted.push_str("\\'"),
                        '"' => quoted.push_str("\\\""),
                        '\x1a' => quoted.push_str("\\Z"),
                        _ => quoted.push(char),
                    }
                }
            }
            Dialect::Postgres | Dialect::Sqlite | Dialect::Ansi => {
                for char in value.chars() {
                    match char {
                        '\'' => quoted.push_str("''"),
                        // text columns cannot hold NUL
                        '\0' => {}
                        _ => quoted.push(char),
                    }
                }
            }
        }
        quoted.push('\'');
        quoted
    }

    /// Renders a value as a SQL literal.
    pub fn quote_value(&self, value: &Value) -> String {
        match value {
            Value::Null => "NULL".to_string(),
            Value::Bool(b) => self.dialect.bool_literal(*b).to_string(),
            Value::Int(_) | Value::UInt(_) => value.to_string(),
            Value::Float(v) if v.is_finite() => value.to_string(),
            // NaN and infinities only exist as string input, e.g. 'NaN'::float
            Value::Float(_) => self.quote_str(&value.to_string()),
            Value::String(s) => self.quote_str(s),
            Value::Bytes(b) => self.quote_str(&String::from_utf8_lossy(b)),
            Value::Json(json) => self.quote_str(&json.to_string()),
        }
    }

    fn is_quoted(&self, name: &str) -> bool {
        let (open, close) = self.dialect.quote_chars();
        name.len() >= 2 && name.starts_with(open) && name.ends_with(close)
    }

    fn wrap(&self, name: &str) -> String {
        let (open, close) = self.dialect.quote_chars();
        let mut quoted = String::with_capacity(name.len() + 2);
        quoted.push(open);
        // duplicate the quote if present
        for char in name.chars() {
            if char == close {
                quoted.push(close);
            }
            quoted.push(char);
        }
        quoted.push(close);
        quoted
    }

    fn last_dot(&self, name: &str) -> Option<usize> {
        let parts = self.table_name_parts(name);
        if parts.len() < 2 {
            return None;
        }
        let last = parts[parts.len() - 1];
        Some(name.len() - last.len() - 1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pg() -> Quoter {
        Quoter::new(Dialect::Postgres, "")
    }

    #[test]
    fn test_quote_table_name_simple() {
        assert_eq!("\"users\"", pg().quote_table_name("users"));
        let mysql = Quoter::new(Dialect::MySql, "");
        assert_eq!("`users`", mysql.quote_table_name("users"));
    }

    #[test]
    fn test_quote_table_name_dot() {
        assert_eq!("\"public\".\"users\"", pg().quote_table_name("public.users"));
        let mysql = Quoter::new(Dialect::MySql, "");
        assert_eq!("`x`.`y`", mysql.quote_table_name("x.y"));
    }

    #[test]
    fn test_quote_table_name_idempotent() {
        let quoter = pg();
        for name in ["users", "public.users", "an sql table", "us\"ers", "x.\"y.z\""] {
            let once = quoter.quote_table_name(name);
            assert_eq!(once, quoter.quote_table_name(&once), "{name}");
        }
    }

    #[test]
    fn test_quote_doubles_embedded_quote() {
        assert_eq!("\"us\"\"ers\"", pg().quote_table_name("us\"ers"));
        assert_eq!("\"us`ers\"", pg().quote_table_name("us`ers"));
        let mysql = Quoter::new(Dialect::MySql, "");
        assert_eq!("`us``ers`", mysql.quote_table_name("us`ers"));
    }

    #[test]
    fn test_quote_table_name_untouched() {
        assert_eq!("(select 1)", pg().quote_table_name("(select 1)"));
        assert_eq!("{{users}}", pg().quote_table_name("{{users}}"));
    }

    #[test]
    fn test_quote_column_name() {
        let quoter = pg();
        assert_eq!("\"id\"", quoter.quote_column_name("id"));
        assert_eq!("\"u\".\"id\"", quoter.quote_column_name("u.id"));
        assert_eq!("\"u\".*", quoter.quote_column_name("u.*"));
        assert_eq!("*", quoter.quote_column_name("*"));
        assert_eq!("count(*)", quoter.quote_column_name("count(*)"));
        assert_eq!("[[id]]", quoter.quote_column_name("[[id]]"));
        assert_eq!("u.{{x}}", quoter.quote_column_name("u.{{x}}"));
    }

    #[test]
    fn test_quote_sql() {
        let quoter = Quoter::new(Dialect::Postgres, "tbl_");
        assert_eq!(
            "SELECT \"id\" FROM \"tbl_user\" JOIN \"profile\"",
            quoter.quote_sql("SELECT [[id]] FROM {{%user}} JOIN {{profile}}")
        );
        assert_eq!(
            "\"t\".\"c\"",
            quoter.quote_sql("[[t.c]]")
        );
    }

    #[test]
    fn test_get_raw_table_name() {
        let quoter = Quoter::new(Dialect::Postgres, "tbl_");
        assert_eq!("tbl_user", quoter.get_raw_table_name("{{%user}}"));
        assert_eq!("user", quoter.get_raw_table_name("user"));
    }

    #[test]
    fn test_quote_value() {
        assert_eq!("'it''s'", pg().quote_str("it's"));
        let mysql = Quoter::new(Dialect::MySql, "");
        assert_eq!("'it\\'s \\\\ \\n'", mysql.quote_str("it's \\ \n"));
        assert_eq!("NULL", pg().quote_value(&Value::Null));
        assert_eq!("1.5", pg().quote_value(&Value::Float(1.5)));
        assert_eq!("'Infinity'", pg().quote_value(&Value::Float(f64::INFINITY)));
        assert_eq!("'NaN'", pg().quote_value(&Value::Float(f64::NAN)));
        let sqlite = Quoter::new(Dialect::Sqlite, "");
        assert_eq!("1", sqlite.quote_value(&Value::Bool(true)));
    }

    #[test]
    fn test_unquote_simple_name() {
        assert_eq!("us\"ers", pg().unquote_simple_name("\"us\"\"ers\""));
        assert_eq!("users", pg().unquote_simple_name("users"));
    }

    #[test]
    fn test_cache_returns_same_result() {
        let quoter = pg().with_cache();
        let first = quoter.quote_column_name("t.id");
        assert_eq!(first, quoter.quote_column_name("t.id"));
        assert_eq!("\"t\".\"id\"", first);
    }
}
