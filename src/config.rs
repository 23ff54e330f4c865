use smol_str::SmolStr;

/// Configuration shared by a [`crate::QueryBuilder`] and its quoter.
#[derive(Debug, Clone)]
pub struct Config {
    /// Replaces `%` inside `{{%name}}` table placeholders.
    pub table_prefix: SmolStr,
    /// Typecast DML values against the declared column types of the schema provider.
    pub typecasting: bool,
    /// Memoize quoted table and column names.
    pub quote_cache: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            table_prefix: SmolStr::default(),
            typecasting: true,
            quote_cache: true,
        }
    }
}

impl Config {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn table_prefix(mut self, prefix: impl Into<SmolStr>) -> Self {
        self.table_prefix = prefix.into();
        self
    }

    pub fn typecasting(mut self, enabled: bool) -> Self {
        self.typecasting = enabled;
        self
    }

    pub fn quote_cache(mut self, enabled: bool) -> Self {
        self.quote_cache = enabled;
        self
    }

    /// Separator placed between rendered clauses.
    pub fn separator(&self) -> &'static str {
        " "
    }
}
