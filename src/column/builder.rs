use smol_str::SmolStr;

use crate::value::Value;

use super::types;

#[derive(Debug, Clone, PartialEq)]
pub enum ColumnDefault {
    Value(Value),
    /// SQL rendered verbatim, e.g. `CURRENT_TIMESTAMP`.
    Expr(String),
}

/// MySQL column placement.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ColumnPosition {
    First,
    After(SmolStr),
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ColumnReference {
    /// Referenced table, optionally schema-qualified.
    pub table: SmolStr,
    pub columns: Vec<SmolStr>,
    pub on_delete: Option<SmolStr>,
    pub on_update: Option<SmolStr>,
}

impl ColumnReference {
    pub fn new<I, S>(table: impl Into<SmolStr>, columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<SmolStr>,
    {
        Self {
            table: table.into(),
            columns: columns.into_iter().map(Into::into).collect(),
            on_delete: None,
            on_update: None,
        }
    }

    pub fn on_delete(mut self, action: impl Into<SmolStr>) -> Self {
        self.on_delete = Some(action.into());
        self
    }

    pub fn on_update(mut self, action: impl Into<SmolStr>) -> Self {
        self.on_update = Some(action.into());
        self
    }
}

/// Column description for DDL, rendered by [`super::ColumnDefinitionBuilder`].
///
/// ```
/// use qsmith::column::ColumnBuilder;
/// let column = ColumnBuilder::string(64).not_null().unique().default_value("guest");
/// assert_eq!(Some("64"), column.length());
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct ColumnBuilder {
    pub(crate) ty: SmolStr,
    pub(crate) maybe_size: Option<String>,
    /// `None` leaves nullability to the database.
    pub(crate) maybe_not_null: Option<bool>,
    pub(crate) unique: bool,
    pub(crate) primary_key: bool,
    pub(crate) auto_increment: bool,
    pub(crate) unsigned: bool,
    pub(crate) maybe_default: Option<ColumnDefault>,
    pub(crate) maybe_check: Option<String>,
    pub(crate) maybe_comment: Option<String>,
    pub(crate) maybe_reference: Option<ColumnReference>,
    pub(crate) maybe_extra: Option<String>,
    pub(crate) maybe_position: Option<ColumnPosition>,
}

impl ColumnBuilder {
    /// Column of an abstract or physical type.
    pub fn new(ty: impl Into<SmolStr>) -> Self {
        Self {
            ty: ty.into(),
            maybe_size: None,
            maybe_not_null: None,
            unique: false,
            primary_key: false,
            auto_increment: false,
            unsigned: false,
            maybe_default: None,
            maybe_check: None,
            maybe_comment: None,
            maybe_reference: None,
            maybe_extra: None,
            maybe_position: None,
        }
    }

    fn sized(ty: &str, size: impl ToString) -> Self {
        Self::new(ty).size(size)
    }

    // type shorthands

    pub fn primary_key() -> Self {
        Self::new(types::PK)
    }

    pub fn big_primary_key() -> Self {
        Self::new(types::BIGPK)
    }

    pub fn uuid_primary_key() -> Self {
        Self::new(types::UUID_PK)
    }

    pub fn char(length: u32) -> Self {
        Self::sized(types::CHAR, length)
    }

    pub fn string(length: u32) -> Self {
        Self::sized(types::STRING, length)
    }

    pub fn text() -> Self {
        Self::new(types::TEXT)
    }

    pub fn tiny_integer() -> Self {
        Self::new(types::TINYINT)
    }

    pub fn small_integer() -> Self {
        Self::new(types::SMALLINT)
    }

    pub fn integer() -> Self {
        Self::new(types::INTEGER)
    }

    pub fn big_integer() -> Self {
        Self::new(types::BIGINT)
    }

    pub fn float() -> Self {
        Self::new(types::FLOAT)
    }

    pub fn double() -> Self {
        Self::new(types::DOUBLE)
    }

    pub fn decimal(precision: u32, scale: u32) -> Self {
        Self::sized(types::DECIMAL, format!("{precision},{scale}"))
    }

    pub fn money(precision: u32, scale: u32) -> Self {
        Self::sized(types::MONEY, format!("{precision},{scale}"))
    }

    pub fn date() -> Self {
        Self::new(types::DATE)
    }

    pub fn time() -> Self {
        Self::new(types::TIME)
    }

    pub fn datetime() -> Self {
        Self::new(types::DATETIME)
    }

    pub fn timestamp() -> Self {
        Self::new(types::TIMESTAMP)
    }

    pub fn binary() -> Self {
        Self::new(types::BINARY)
    }

    pub fn boolean() -> Self {
        Self::new(types::BOOLEAN)
    }

    pub fn json() -> Self {
        Self::new(types::JSON)
    }

    pub fn uuid() -> Self {
        Self::new(types::UUID)
    }

    // modifiers

    /// Length, or `precision,scale`.
    pub fn size(mut self, size: impl ToString) -> Self {
        self.maybe_size = Some(size.to_string());
        self
    }

    pub fn not_null(mut self) -> Self {
        self.maybe_not_null = Some(true);
        self
    }

    pub fn null(mut self) -> Self {
        self.maybe_not_null = Some(false);
        self
    }

    pub fn unique(mut self) -> Self {
        self.unique = true;
        self
    }

    pub fn primary(mut self) -> Self {
        self.primary_key = true;
        self
    }

    pub fn auto_increment(mut self) -> Self {
        self.auto_increment = true;
        self
    }

    pub fn unsigned(mut self) -> Self {
        self.unsigned = true;
        self
    }

    pub fn default_value(mut self, value: impl Into<Value>) -> Self {
        self.maybe_default = Some(ColumnDefault::Value(value.into()));
        self
    }

    pub fn default_expression(mut self, sql: impl Into<String>) -> Self {
        self.maybe_default = Some(ColumnDefault::Expr(sql.into()));
        self
    }

    pub fn check(mut self, check: impl Into<String>) -> Self {
        self.maybe_check = Some(check.into());
        self
    }

    pub fn comment(mut self, comment: impl Into<String>) -> Self {
        self.maybe_comment = Some(comment.into());
        self
    }

    pub fn references(mut self, reference: ColumnReference) -> Self {
        self.maybe_reference = Some(reference);
        self
    }

    /// SQL appended after every other modifier.
    pub fn extra(mut self, extra: impl Into<String>) -> Self {
        self.maybe_extra = Some(extra.into());
        self
    }

    pub fn first(mut self) -> Self {
        self.maybe_position = Some(ColumnPosition::First);
        self
    }

    pub fn after(mut self, column: impl Into<SmolStr>) -> Self {
        self.maybe_position = Some(ColumnPosition::After(column.into()));
        self
    }

    pub fn ty(&self) -> &str {
        &self.ty
    }

    pub fn length(&self) -> Option<&str> {
        self.maybe_size.as_deref()
    }
}
