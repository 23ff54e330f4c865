//! Abstract column types and their physical spelling per dialect.

use std::sync::LazyLock;

use indexmap::IndexMap;
use regex::{NoExpand, Regex};
use smol_str::SmolStr;

use crate::dialect::Dialect;

pub mod builder;
pub mod definition;

pub use builder::{ColumnBuilder, ColumnDefault, ColumnPosition, ColumnReference};
pub use definition::{ColumnDef, ColumnDefinitionBuilder};

static TYPE_WITH_ARGS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(\w+)\((.+?)\)(.*)$").expect("valid type args regex"));

static TYPE_WITH_TRAILER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(\w+)\s+").expect("valid type trailer regex"));

static MAPPED_ARGS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\(.+\)").expect("valid mapped args regex"));

static LEADING_WORD: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\w+").expect("valid leading word regex"));

/// Abstract type names.
pub mod types {
    pub const PK: &str = "pk";
    pub const UPK: &str = "upk";
    pub const BIGPK: &str = "bigpk";
    pub const UBIGPK: &str = "ubigpk";
    pub const UUID_PK: &str = "uuid_pk";
    pub const CHAR: &str = "char";
    pub const STRING: &str = "string";
    pub const TEXT: &str = "text";
    pub const TINYINT: &str = "tinyint";
    pub const SMALLINT: &str = "smallint";
    pub const INTEGER: &str = "integer";
    pub const BIGINT: &str = "bigint";
    pub const FLOAT: &str = "float";
    pub const DOUBLE: &str = "double";
    pub const DECIMAL: &str = "decimal";
    pub const DATETIME: &str = "datetime";
    pub const TIMESTAMP: &str = "timestamp";
    pub const TIME: &str = "time";
    pub const DATE: &str = "date";
    pub const BINARY: &str = "binary";
    pub const BOOLEAN: &str = "boolean";
    pub const MONEY: &str = "money";
    pub const JSON: &str = "json";
    pub const UUID: &str = "uuid";
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TypeCategory {
    /// Primary key shorthands, their mapped type already carries the key modifiers.
    Pk,
    String,
    Numeric,
    Time,
    Other,
}

impl TypeCategory {
    pub fn of(ty: &str) -> Self {
        use types::*;
        match ty {
            PK | UPK | BIGPK | UBIGPK | UUID_PK => TypeCategory::Pk,
            CHAR | STRING | TEXT => TypeCategory::String,
            TINYINT | SMALLINT | INTEGER | BIGINT | FLOAT | DOUBLE | DECIMAL | MONEY => {
                TypeCategory::Numeric
            }
            DATETIME | TIMESTAMP | TIME | DATE => TypeCategory::Time,
            _ => TypeCategory::Other,
        }
    }
}

/// Abstract to physical type map of a dialect.
pub fn default_type_map(dialect: Dialect) -> IndexMap<SmolStr, String> {
    use types::*;
    let entries: [(&str, &str); 24] = match dialect {
        Dialect::Postgres => [
            (PK, "serial NOT NULL PRIMARY KEY"),
            (UPK, "serial NOT NULL PRIMARY KEY"),
            (BIGPK, "bigserial NOT NULL PRIMARY KEY"),
            (UBIGPK, "bigserial NOT NULL PRIMARY KEY"),
            (UUID_PK, "uuid PRIMARY KEY"),
            (CHAR, "char(1)"),
            (STRING, "varchar(255)"),
            (TEXT, "text"),
            (TINYINT, "smallint"),
            (SMALLINT, "smallint"),
            (INTEGER, "integer"),
            (BIGINT, "bigint"),
            (FLOAT, "double precision"),
            (DOUBLE, "double precision"),
            (DECIMAL, "numeric(10,0)"),
            (DATETIME, "timestamp(0)"),
            (TIMESTAMP, "timestamp(0)"),
            (TIME, "time(0)"),
            (DATE, "date"),
            (BINARY, "bytea"),
            (BOOLEAN, "boolean"),
            (MONEY, "numeric(19,4)"),
            (JSON, "jsonb"),
            (UUID, "uuid"),
        ],
        Dialect::MySql => [
            (PK, "int(11) NOT NULL AUTO_INCREMENT PRIMARY KEY"),
            (UPK, "int(10) UNSIGNED NOT NULL AUTO_INCREMENT PRIMARY KEY"),
            (BIGPK, "bigint(20) NOT NULL AUTO_INCREMENT PRIMARY KEY"),
            (UBIGPK, "bigint(20) UNSIGNED NOT NULL AUTO_INCREMENT PRIMARY KEY"),
            (UUID_PK, "binary(16) PRIMARY KEY"),
            (CHAR, "char(1)"),
            (STRING, "varchar(255)"),
            (TEXT, "text"),
            (TINYINT, "tinyint(3)"),
            (SMALLINT, "smallint(6)"),
            (INTEGER, "int(11)"),
            (BIGINT, "bigint(20)"),
            (FLOAT, "float"),
            (DOUBLE, "double"),
            (DECIMAL, "decimal(10,0)"),
            (DATETIME, "datetime(0)"),
            (TIMESTAMP, "timestamp(0)"),
            (TIME, "time(0)"),
            (DATE, "date"),
            (BINARY, "blob"),
            (BOOLEAN, "bit(1)"),
            (MONEY, "decimal(19,4)"),
            (JSON, "json"),
            (UUID, "binary(16)"),
        ],
        Dialect::Sqlite => [
            (PK, "integer PRIMARY KEY AUTOINCREMENT NOT NULL"),
            (UPK, "integer PRIMARY KEY AUTOINCREMENT NOT NULL"),
            (BIGPK, "integer PRIMARY KEY AUTOINCREMENT NOT NULL"),
            (UBIGPK, "integer PRIMARY KEY AUTOINCREMENT NOT NULL"),
            (UUID_PK, "blob(16) PRIMARY KEY"),
            (CHAR, "char(1)"),
            (STRING, "varchar(255)"),
            (TEXT, "text"),
            (TINYINT, "tinyint"),
            (SMALLINT, "smallint"),
            (INTEGER, "integer"),
            (BIGINT, "bigint"),
            (FLOAT, "float"),
            (DOUBLE, "double"),
            (DECIMAL, "decimal(10,0)"),
            (DATETIME, "datetime"),
            (TIMESTAMP, "timestamp"),
            (TIME, "time"),
            (DATE, "date"),
            (BINARY, "blob"),
            (BOOLEAN, "boolean"),
            (MONEY, "decimal(19,4)"),
            (JSON, "json"),
            (UUID, "blob(16)"),
        ],
        Dialect::Ansi => [
            (PK, "integer NOT NULL PRIMARY KEY"),
            (UPK, "integer NOT NULL PRIMARY KEY"),
            (BIGPK, "bigint NOT NULL PRIMARY KEY"),
            (UBIGPK, "bigint NOT NULL PRIMARY KEY"),
            (UUID_PK, "char(36) PRIMARY KEY"),
            (CHAR, "char(1)"),
            (STRING, "varchar(255)"),
            (TEXT, "text"),
            (TINYINT, "smallint"),
            (SMALLINT, "smallint"),
            (INTEGER, "integer"),
            (BIGINT, "bigint"),
            (FLOAT, "float"),
            (DOUBLE, "double precision"),
            (DECIMAL, "decimal(10,0)"),
            (DATETIME, "timestamp"),
            (TIMESTAMP, "timestamp"),
            (TIME, "time"),
            (DATE, "date"),
            (BINARY, "blob"),
            (BOOLEAN, "boolean"),
            (MONEY, "decimal(19,4)"),
            (JSON, "json"),
            (UUID, "char(36)"),
        ],
    };
    entries
        .into_iter()
        .map(|(name, ty)| (SmolStr::new(name), ty.to_string()))
        .collect()
}

/// Physical type for an abstract one, e.g. `string(32) not null` → `varchar(32) not null`.
///
/// Unknown types pass through unchanged so dialect-native type strings keep working.
pub fn resolve_column_type(type_map: &IndexMap<SmolStr, String>, ty: &str) -> String {
    if let Some(mapped) = type_map.get(ty) {
        return mapped.clone();
    }

    if let Some(caps) = TYPE_WITH_ARGS.captures(ty) {
        let (Some(name), Some(args)) = (caps.get(1), caps.get(2)) else {
            return ty.to_string();
        };
        if let Some(mapped) = type_map.get(name.as_str()) {
            let trailer = caps.get(3).map_or("", |m| m.as_str());
            let args = format!("({})", args.as_str());
            let substituted = MAPPED_ARGS.replace(mapped, NoExpand(&args));
            return format!("{substituted}{trailer}");
        }
    } else if let Some(name) = TYPE_WITH_TRAILER.captures(ty).and_then(|caps| caps.get(1)) {
        if let Some(mapped) = type_map.get(name.as_str()) {
            return LEADING_WORD.replace(ty, NoExpand(mapped)).into_owned();
        }
    }

    ty.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exact_match() {
        let map = default_type_map(Dialect::MySql);
        assert_eq!("varchar(255)", resolve_column_type(&map, "string"));
        assert_eq!(
            "int(11) NOT NULL AUTO_INCREMENT PRIMARY KEY",
            resolve_column_type(&map, "pk")
        );
    }

    #[test]
    fn test_args_substituted_and_trailer_kept() {
        let map = default_type_map(Dialect::Postgres);
        assert_eq!(
            "varchar(32) not null",
            resolve_column_type(&map, "string(32) not null")
        );
        assert_eq!("numeric(12,2)", resolve_column_type(&map, "decimal(12,2)"));
        // mapped type without parenthesis keeps its spelling
        assert_eq!("text", resolve_column_type(&map, "text(100)"));
    }

    #[test]
    fn test_trailer_only() {
        let map = default_type_map(Dialect::Sqlite);
        assert_eq!(
            "integer PRIMARY KEY AUTOINCREMENT NOT NULL FIRST",
            resolve_column_type(&map, "pk FIRST")
        );
        assert_eq!("boolean NOT NULL", resolve_column_type(&map, "boolean NOT NULL"));
    }

    #[test]
    fn test_unknown_passes_through() {
        let map = default_type_map(Dialect::Postgres);
        assert_eq!("tsvector", resolve_column_type(&map, "tsvector"));
        assert_eq!("geometry(Point, 4326)", resolve_column_type(&map, "geometry(Point, 4326)"));
    }

    #[test]
    fn test_category() {
        assert_eq!(TypeCategory::Pk, TypeCategory::of("bigpk"));
        assert_eq!(TypeCategory::Numeric, TypeCategory::of("money"));
        assert_eq!(TypeCategory::Other, TypeCategory::of("json"));
    }
}
