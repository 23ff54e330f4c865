use serde::{Deserialize, Serialize};
use smol_str::SmolStr;

/// Named set of columns: primary keys, unique constraints and the base of the other kinds.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Constraint {
    pub name: Option<SmolStr>,
    pub column_names: Vec<SmolStr>,
}

impl Constraint {
    pub fn new<I, S>(name: impl Into<SmolStr>, columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<SmolStr>,
    {
        Self {
            name: Some(name.into()),
            column_names: columns.into_iter().map(Into::into).collect(),
        }
    }

    pub fn unnamed<I, S>(columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<SmolStr>,
    {
        Self {
            name: None,
            column_names: columns.into_iter().map(Into::into).collect(),
        }
    }

    /// Order independent identity: the sorted, de-duplicated column names as JSON.
    pub fn identity(&self) -> String {
        let mut names: Vec<&str> = self.column_names.iter().map(SmolStr::as_str).collect();
        names.sort_unstable();
        names.dedup();
        serde_json::Value::from(names).to_string()
    }

    /// Whether every column of the constraint is in `columns`.
    pub fn is_covered_by<S: AsRef<str>>(&self, columns: &[S]) -> bool {
        self.column_names
            .iter()
            .all(|name| columns.iter().any(|column| column.as_ref() == name.as_str()))
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckConstraint {
    #[serde(flatten)]
    pub constraint: Constraint,
    pub expression: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DefaultValueConstraint {
    #[serde(flatten)]
    pub constraint: Constraint,
    pub value: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ForeignKeyConstraint {
    #[serde(flatten)]
    pub constraint: Constraint,
    pub foreign_schema_name: Option<SmolStr>,
    pub foreign_table_name: SmolStr,
    pub foreign_column_names: Vec<SmolStr>,
    pub on_delete: Option<SmolStr>,
    pub on_update: Option<SmolStr>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexConstraint {
    #[serde(flatten)]
    pub constraint: Constraint,
    pub is_unique: bool,
    pub is_primary: bool,
}

impl IndexConstraint {
    pub fn new<I, S>(name: impl Into<SmolStr>, columns: I, is_unique: bool) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<SmolStr>,
    {
        Self {
            constraint: Constraint::new(name, columns),
            is_unique,
            is_primary: false,
        }
    }
}
