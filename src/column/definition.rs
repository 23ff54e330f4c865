use tracing::warn;

use crate::{builder::QueryBuilder, dialect::Dialect, value::Value};

use super::{
    ColumnBuilder, ColumnDefault, ColumnPosition, TypeCategory,
    builder::ColumnReference, types,
};

/// Column type accepted by the DDL operations: an abstract type string such as
/// `string(32) not null`, or a fluent [`ColumnBuilder`].
#[derive(Debug, Clone, PartialEq)]
pub enum ColumnDef {
    Raw(String),
    Builder(ColumnBuilder),
}

impl From<&str> for ColumnDef {
    fn from(value: &str) -> Self {
        ColumnDef::Raw(value.to_string())
    }
}

impl From<String> for ColumnDef {
    fn from(value: String) -> Self {
        ColumnDef::Raw(value)
    }
}

impl From<ColumnBuilder> for ColumnDef {
    fn from(value: ColumnBuilder) -> Self {
        ColumnDef::Builder(value)
    }
}

/// Renders a [`ColumnBuilder`] for the dialect of a [`QueryBuilder`].
///
/// Modifiers always come in this order: type, unsigned, null, primary key, auto increment,
/// unique, default, comment, check, references, extra. Primary key shorthands (`pk`, `bigpk`,
/// ...) already carry their key modifiers and only take check, comment and extra.
pub struct ColumnDefinitionBuilder<'a> {
    builder: &'a QueryBuilder,
}

impl<'a> ColumnDefinitionBuilder<'a> {
    pub fn new(builder: &'a QueryBuilder) -> Self {
        Self { builder }
    }

    pub fn build(&self, column: &ColumnBuilder) -> String {
        let mut sql = self.build_type(column);
        if TypeCategory::of(self.abstract_type(column)) != TypeCategory::Pk {
            sql.push_str(&self.build_unsigned(column));
            sql.push_str(&self.build_null(column));
            sql.push_str(&self.build_primary_key(column));
            sql.push_str(&self.build_auto_increment(column));
            sql.push_str(&self.build_unique(column));
            sql.push_str(&self.build_default(column));
        }
        sql.push_str(&self.build_comment(column));
        sql.push_str(&self.build_check(column));
        if TypeCategory::of(self.abstract_type(column)) != TypeCategory::Pk {
            sql.push_str(&self.build_references(column));
        }
        sql.push_str(&self.build_extra(column));
        sql.push_str(&self.build_position(column));
        sql
    }

    fn dialect(&self) -> Dialect {
        self.builder.dialect()
    }

    /// MySQL spells unsigned keys as their own abstract types.
    fn abstract_type<'c>(&self, column: &'c ColumnBuilder) -> &'c str {
        if column.unsigned && self.dialect() == Dialect::MySql {
            match column.ty.as_str() {
                types::PK => return types::UPK,
                types::BIGPK => return types::UBIGPK,
                _ => {}
            }
        }
        &column.ty
    }

    fn build_type(&self, column: &ColumnBuilder) -> String {
        let ty = self.abstract_type(column);
        match &column.maybe_size {
            Some(size) => self.builder.get_column_type(&format!("{ty}({size})")),
            None => self.builder.get_column_type(ty),
        }
    }

    fn build_unsigned(&self, column: &ColumnBuilder) -> String {
        if !column.unsigned {
            return String::new();
        }
        if self.dialect() == Dialect::MySql {
            return " UNSIGNED".into();
        }
        warn!(dialect = %self.dialect(), column_type = %column.ty, "unsigned modifier ignored");
        String::new()
    }

    fn build_null(&self, column: &ColumnBuilder) -> String {
        match column.maybe_not_null {
            Some(true) => " NOT NULL".into(),
            Some(false) => " NULL".into(),
            None => String::new(),
        }
    }

    fn build_primary_key(&self, column: &ColumnBuilder) -> String {
        if column.primary_key {
            " PRIMARY KEY".into()
        } else {
            String::new()
        }
    }

    fn build_auto_increment(&self, column: &ColumnBuilder) -> String {
        if !column.auto_increment {
            return String::new();
        }
        match self.dialect() {
            Dialect::MySql => " AUTO_INCREMENT".into(),
            Dialect::Sqlite => " AUTOINCREMENT".into(),
            Dialect::Postgres | Dialect::Ansi => " GENERATED BY DEFAULT AS IDENTITY".into(),
        }
    }

    fn build_unique(&self, column: &ColumnBuilder) -> String {
        // a primary key is unique already
        if column.unique && !column.primary_key {
            " UNIQUE".into()
        } else {
            String::new()
        }
    }

    fn build_default(&self, column: &ColumnBuilder) -> String {
        match &column.maybe_default {
            Some(default) => format!(" DEFAULT {}", self.default_literal(default)),
            None => String::new(),
        }
    }

    /// Numbers are rendered with `Display`, which never depends on the host locale.
    fn default_literal(&self, default: &ColumnDefault) -> String {
        let quoter = self.builder.quoter();
        match default {
            ColumnDefault::Expr(sql) => sql.clone(),
            ColumnDefault::Value(value) => match value {
                Value::Null => "NULL".into(),
                Value::Bool(true) => "TRUE".into(),
                Value::Bool(false) => "FALSE".into(),
                Value::Int(_) | Value::UInt(_) => value.to_string(),
                Value::Float(_) => quoter.quote_value(value),
                Value::String(s) => quoter.quote_str(s),
                Value::Bytes(_) | Value::Json(_) => quoter.quote_str(&value.to_string()),
            },
        }
    }

    fn build_comment(&self, column: &ColumnBuilder) -> String {
        let Some(comment) = &column.maybe_comment else {
            return String::new();
        };
        if self.dialect() == Dialect::MySql {
            return format!(" COMMENT {}", self.builder.quoter().quote_str(comment));
        }
        warn!(
            dialect = %self.dialect(),
            "inline column comment ignored, use add_comment_on_column"
        );
        String::new()
    }

    fn build_check(&self, column: &ColumnBuilder) -> String {
        match &column.maybe_check {
            Some(check) => format!(" CHECK ({check})"),
            None => String::new(),
        }
    }

    fn build_references(&self, column: &ColumnBuilder) -> String {
        let Some(ColumnReference {
            table,
            columns,
            on_delete,
            on_update,
        }) = &column.maybe_reference
        else {
            return String::new();
        };
        let quoter = self.builder.quoter();
        let columns = columns
            .iter()
            .map(|name| quoter.quote_column_name(name))
            .collect::<Vec<_>>()
            .join(", ");
        let mut sql = format!(" REFERENCES {} ({columns})", quoter.quote_table_name(table));
        if let Some(action) = on_delete {
            sql.push_str(&format!(" ON DELETE {action}"));
        }
        if let Some(action) = on_update {
            sql.push_str(&format!(" ON UPDATE {action}"));
        }
        sql
    }

    fn build_extra(&self, column: &ColumnBuilder) -> String {
        match &column.maybe_extra {
            Some(extra) => format!(" {extra}"),
            None => String::new(),
        }
    }

    fn build_position(&self, column: &ColumnBuilder) -> String {
        let Some(position) = &column.maybe_position else {
            return String::new();
        };
        if self.dialect() != Dialect::MySql {
            warn!(dialect = %self.dialect(), "column position ignored");
            return String::new();
        }
        match position {
            ColumnPosition::First => " FIRST".into(),
            ColumnPosition::After(name) => {
                format!(" AFTER {}", self.builder.quoter().quote_column_name(name))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn render(dialect: Dialect, column: ColumnBuilder) -> String {
        let qb = QueryBuilder::new(dialect);
        ColumnDefinitionBuilder::new(&qb).build(&column)
    }

    #[test]
    fn test_modifier_order() {
        let column = ColumnBuilder::string(32)
            .extra("COLLATE \"C\"")
            .check("length(name) > 2")
            .default_value("guest")
            .unique()
            .not_null();
        assert_eq!(
            "varchar(32) NOT NULL UNIQUE DEFAULT 'guest' CHECK (length(name) > 2) COLLATE \"C\"",
            render(Dialect::Postgres, column)
        );
    }

    #[test]
    fn test_primary_key_short_form() {
        let column = ColumnBuilder::primary_key().not_null().unique().comment("id");
        assert_eq!(
            "int(11) NOT NULL AUTO_INCREMENT PRIMARY KEY COMMENT 'id'",
            render(Dialect::MySql, column)
        );
        let column = ColumnBuilder::primary_key().unsigned();
        assert_eq!(
            "int(10) UNSIGNED NOT NULL AUTO_INCREMENT PRIMARY KEY",
            render(Dialect::MySql, column)
        );
    }

    #[test]
    fn test_default_literals() {
        let column = ColumnBuilder::decimal(10, 2).default_value(2.5);
        assert_eq!("numeric(10,2) DEFAULT 2.5", render(Dialect::Postgres, column));
        let column = ColumnBuilder::boolean().default_value(false);
        assert_eq!("boolean DEFAULT FALSE", render(Dialect::Sqlite, column));
        let column = ColumnBuilder::timestamp().default_expression("CURRENT_TIMESTAMP");
        assert_eq!("timestamp(0) DEFAULT CURRENT_TIMESTAMP", render(Dialect::MySql, column));
        let column = ColumnBuilder::text().null().default_value(());
        assert_eq!("text NULL DEFAULT NULL", render(Dialect::Postgres, column));
        let column = ColumnBuilder::double().default_value(f64::NAN);
        assert_eq!("double precision DEFAULT 'NaN'", render(Dialect::Postgres, column));
    }

    #[test]
    fn test_references() {
        let column = ColumnBuilder::integer().references(
            ColumnReference::new("customer", ["id"])
                .on_delete("CASCADE")
                .on_update("NO ACTION"),
        );
        assert_eq!(
            "integer REFERENCES \"customer\" (\"id\") ON DELETE CASCADE ON UPDATE NO ACTION",
            render(Dialect::Sqlite, column)
        );
    }

    #[test]
    fn test_dialect_specific_modifiers() {
        let column = ColumnBuilder::integer().unsigned().auto_increment().after("id");
        assert_eq!(
            "int(11) UNSIGNED AUTO_INCREMENT AFTER `id`",
            render(Dialect::MySql, column.clone())
        );
        assert_eq!(
            "integer GENERATED BY DEFAULT AS IDENTITY",
            render(Dialect::Postgres, column)
        );
    }
}
