use indexmap::IndexMap;
use smol_str::SmolStr;

use crate::{
    condition::Condition,
    error::{Error, Result},
    expr::Expr,
    query::Query,
    value::{Param, Value},
};

/// Ordered column → value map used for hash conditions and DML rows.
pub type Row = IndexMap<String, Operand>;

/// Dynamic input tree of the array-form condition syntax and of DML rows.
///
/// A top-level string condition is raw SQL. Inside an operator list the first element is the
/// operator keyword and the rest are its operands.
#[derive(Debug, Clone, PartialEq)]
pub enum Operand {
    Value(Value),
    List(Vec<Operand>),
    Map(Row),
    Expr(Expr),
}

impl Default for Operand {
    fn default() -> Self {
        Operand::Value(Value::Null)
    }
}

impl Operand {
    pub fn null() -> Self {
        Operand::Value(Value::Null)
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Operand::Value(Value::Null))
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Operand::Value(value) => value.as_str(),
            _ => None,
        }
    }

    pub fn as_expr(&self) -> Option<&Expr> {
        match self {
            Operand::Expr(expr) => Some(expr),
            _ => None,
        }
    }

    pub fn as_query(&self) -> Option<&Query> {
        match self {
            Operand::Expr(Expr::Query(query)) => Some(query),
            _ => None,
        }
    }

    /// Blank operand for filtering: null, empty or whitespace-only string, empty list or map.
    pub fn is_empty(&self) -> bool {
        match self {
            Operand::Value(Value::Null) => true,
            Operand::Value(Value::String(s)) => s.trim().is_empty(),
            Operand::List(items) => items.is_empty(),
            Operand::Map(map) => map.is_empty(),
            Operand::Value(_) | Operand::Expr(_) => false,
        }
    }

    /// An iterable value list, as opposed to a scalar or expression.
    pub fn is_iterable(&self) -> bool {
        matches!(self, Operand::List(_) | Operand::Map(_))
    }

    /// JSON view of the operand. Expressions cannot be encoded.
    pub fn to_json(&self) -> Result<serde_json::Value> {
        match self {
            Operand::Value(value) => Ok(value.to_json()),
            Operand::List(items) => items
                .iter()
                .map(Operand::to_json)
                .collect::<Result<Vec<_>>>()
                .map(serde_json::Value::Array),
            Operand::Map(map) => {
                let mut object = serde_json::Map::with_capacity(map.len());
                for (key, value) in map {
                    object.insert(key.clone(), value.to_json()?);
                }
                Ok(serde_json::Value::Object(object))
            }
            Operand::Expr(expr) => Err(Error::invalid_argument(format!(
                "Cannot encode a {} expression as JSON.",
                expr.kind()
            ))),
        }
    }
}

macro_rules! operand_from_value {
    ($($ty:ty),+) => {
        $(
            impl From<$ty> for Operand {
                fn from(value: $ty) -> Self {
                    Operand::Value(value.into())
                }
            }
        )+
    };
}

operand_from_value!(
    i8,
    i16,
    i32,
    i64,
    u8,
    u16,
    u32,
    u64,
    usize,
    f32,
    f64,
    bool,
    String,
    &str,
    &String,
    SmolStr,
    (),
    Value,
    serde_json::Value
);

impl<T> From<Option<T>> for Operand
where
    T: Into<Operand>,
{
    fn from(value: Option<T>) -> Self {
        match value {
            Some(value) => value.into(),
            None => Operand::null(),
        }
    }
}

impl<T> From<Vec<T>> for Operand
where
    T: Into<Operand>,
{
    fn from(values: Vec<T>) -> Self {
        Operand::List(values.into_iter().map(Into::into).collect())
    }
}

impl<T, const N: usize> From<[T; N]> for Operand
where
    T: Into<Operand>,
{
    fn from(values: [T; N]) -> Self {
        Operand::List(values.into_iter().map(Into::into).collect())
    }
}

impl<T> From<IndexMap<String, T>> for Operand
where
    T: Into<Operand>,
{
    fn from(values: IndexMap<String, T>) -> Self {
        Operand::Map(values.into_iter().map(|(k, v)| (k, v.into())).collect())
    }
}

impl From<Param> for Operand {
    fn from(value: Param) -> Self {
        Operand::Expr(Expr::Param(value))
    }
}

impl From<Expr> for Operand {
    fn from(value: Expr) -> Self {
        Operand::Expr(value)
    }
}

impl From<Query> for Operand {
    fn from(value: Query) -> Self {
        Operand::Expr(Expr::Query(Box::new(value)))
    }
}

impl From<Condition> for Operand {
    fn from(value: Condition) -> Self {
        Operand::Expr(Expr::Condition(Box::new(value)))
    }
}

/// A column given either by name or as an expression.
#[derive(Debug, Clone, PartialEq)]
pub enum ColumnRef {
    Name(SmolStr),
    Expr(Expr),
}

impl ColumnRef {
    pub fn name(&self) -> Option<&str> {
        match self {
            ColumnRef::Name(name) => Some(name.as_str()),
            ColumnRef::Expr(_) => None,
        }
    }

    /// Reads a column operand of an operator-form condition.
    pub(crate) fn from_operand(operand: &Operand, operator: &str) -> Result<Self> {
        match operand {
            Operand::Value(Value::String(name)) => Ok(ColumnRef::Name(name.into())),
            Operand::Expr(expr) => Ok(ColumnRef::Expr(expr.clone())),
            _ => Err(Error::invalid_argument(format!(
                "Operator '{operator}' requires column to be a string or an expression."
            ))),
        }
    }
}

impl From<&str> for ColumnRef {
    fn from(value: &str) -> Self {
        ColumnRef::Name(value.into())
    }
}

impl From<String> for ColumnRef {
    fn from(value: String) -> Self {
        ColumnRef::Name(value.into())
    }
}

impl From<&String> for ColumnRef {
    fn from(value: &String) -> Self {
        ColumnRef::Name(value.into())
    }
}

impl From<SmolStr> for ColumnRef {
    fn from(value: SmolStr) -> Self {
        ColumnRef::Name(value)
    }
}

impl From<Expr> for ColumnRef {
    fn from(value: Expr) -> Self {
        ColumnRef::Expr(value)
    }
}

impl From<Query> for ColumnRef {
    fn from(value: Query) -> Self {
        ColumnRef::Expr(Expr::Query(Box::new(value)))
    }
}

/// Builds an [`Operand::List`].
///
/// ```
/// use qsmith::{list, Operand};
/// let condition = list!["between", "age", 18, 65];
/// assert!(matches!(condition, Operand::List(ref items) if items.len() == 4));
/// ```
#[macro_export]
macro_rules! list {
    () => {
        $crate::Operand::List(::std::vec::Vec::new())
    };
    ( $($item:expr),+ $(,)? ) => {
        $crate::Operand::List(::std::vec![$( $crate::Operand::from($item) ),+])
    };
}

/// Builds an [`Operand::Map`], keys keep their insertion order.
#[macro_export]
macro_rules! map {
    () => {
        $crate::Operand::Map($crate::Row::new())
    };
    ( $($key:expr => $value:expr),+ $(,)? ) => {{
        let mut row = $crate::Row::new();
        $( row.insert(::std::string::String::from($key), $crate::Operand::from($value)); )+
        $crate::Operand::Map(row)
    }};
}
