use std::fmt;

use indexmap::IndexMap;
use smol_str::SmolStr;

pub const PARAM_PREFIX: &str = ":qp";

#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Bool(bool),
    Int(i64),
    UInt(u64),
    Float(f64),
    String(String),
    Bytes(Vec<u8>),
    Json(serde_json::Value),
}

impl Value {
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s.as_str()),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Int(i) => Some(*i),
            Value::UInt(u) => i64::try_from(*u).ok(),
            _ => None,
        }
    }

    /// JSON view of the value, used when a dialect encodes arrays or rows as JSON text.
    pub fn to_json(&self) -> serde_json::Value {
        match self {
            Value::Null => serde_json::Value::Null,
            Value::Bool(b) => serde_json::Value::Bool(*b),
            Value::Int(i) => serde_json::Value::from(*i),
            Value::UInt(u) => serde_json::Value::from(*u),
            Value::Float(f) => serde_json::Number::from_f64(*f)
                .map(serde_json::Value::Number)
                .unwrap_or(serde_json::Value::Null),
            Value::String(s) => serde_json::Value::String(s.clone()),
            Value::Bytes(b) => serde_json::Value::String(String::from_utf8_lossy(b).into_owned()),
            Value::Json(json) => json.clone(),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => f.write_str("NULL"),
            Value::Bool(b) => write!(f, "{b}"),
            Value::Int(i) => write!(f, "{i}"),
            Value::UInt(u) => write!(f, "{u}"),
            // Display is locale independent and never switches to exponent notation
            Value::Float(v) if v.is_finite() => write!(f, "{v}"),
            Value::Float(v) if v.is_nan() => f.write_str("NaN"),
            Value::Float(v) if *v > 0.0 => f.write_str("Infinity"),
            Value::Float(_) => f.write_str("-Infinity"),
            Value::String(s) => f.write_str(s),
            Value::Bytes(b) => f.write_str(&String::from_utf8_lossy(b)),
            Value::Json(json) => write!(f, "{json}"),
        }
    }
}

macro_rules! value_from {
    ($variant:ident => $($ty:ty),+) => {
        $(
            impl From<$ty> for Value {
                fn from(value: $ty) -> Self {
                    Value::$variant(value.into())
                }
            }
        )+
    };
}

value_from!(Int => i8, i16, i32, i64, u8, u16, u32);
value_from!(Float => f32, f64);
value_from!(Bool => bool);
value_from!(String => String, &str, &String, Box<str>);
value_from!(Bytes => Vec<u8>, &[u8]);
value_from!(Json => serde_json::Value);

impl From<u64> for Value {
    fn from(value: u64) -> Self {
        Value::UInt(value)
    }
}

impl From<usize> for Value {
    fn from(value: usize) -> Self {
        Value::UInt(value as u64)
    }
}

impl From<SmolStr> for Value {
    fn from(value: SmolStr) -> Self {
        Value::String(value.to_string())
    }
}

impl From<()> for Value {
    fn from(_: ()) -> Self {
        Value::Null
    }
}

impl<T> From<Option<T>> for Value
where
    T: Into<Value>,
{
    fn from(value: Option<T>) -> Self {
        match value {
            Some(value) => value.into(),
            None => Value::Null,
        }
    }
}

#[cfg(feature = "chrono")]
impl From<chrono::NaiveDateTime> for Value {
    fn from(value: chrono::NaiveDateTime) -> Self {
        Value::String(value.format("%Y-%m-%d %H:%M:%S%.f").to_string())
    }
}

#[cfg(feature = "chrono")]
impl From<chrono::NaiveDate> for Value {
    fn from(value: chrono::NaiveDate) -> Self {
        Value::String(value.format("%Y-%m-%d").to_string())
    }
}

#[cfg(feature = "chrono")]
impl<Tz> From<chrono::DateTime<Tz>> for Value
where
    Tz: chrono::TimeZone,
    Tz::Offset: fmt::Display,
{
    fn from(value: chrono::DateTime<Tz>) -> Self {
        Value::String(value.to_rfc3339())
    }
}

#[cfg(feature = "time")]
impl From<time::OffsetDateTime> for Value {
    fn from(value: time::OffsetDateTime) -> Self {
        let format = time::macros::format_description!(
            "[year]-[month]-[day] [hour]:[minute]:[second][offset_hour sign:mandatory]:[offset_minute]"
        );
        match value.format(&format) {
            Ok(text) => Value::String(text),
            Err(_) => Value::Null,
        }
    }
}

#[cfg(feature = "time")]
impl From<time::Date> for Value {
    fn from(value: time::Date) -> Self {
        let format = time::macros::format_description!("[year]-[month]-[day]");
        match value.format(&format) {
            Ok(text) => Value::String(text),
            Err(_) => Value::Null,
        }
    }
}

#[cfg(feature = "uuid")]
impl From<uuid::Uuid> for Value {
    fn from(value: uuid::Uuid) -> Self {
        Value::String(value.hyphenated().to_string())
    }
}

/// Native type hint attached to a bound parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ParamType {
    Null,
    Bool,
    Int,
    Str,
    Lob,
}

impl ParamType {
    pub fn infer(value: &Value) -> Self {
        match value {
            Value::Null => ParamType::Null,
            Value::Bool(_) => ParamType::Bool,
            Value::Int(_) | Value::UInt(_) => ParamType::Int,
            Value::Bytes(_) => ParamType::Lob,
            Value::Float(_) | Value::String(_) | Value::Json(_) => ParamType::Str,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Param {
    pub value: Value,
    pub ty: ParamType,
}

impl Param {
    pub fn new<V: Into<Value>>(value: V, ty: ParamType) -> Self {
        Self {
            value: value.into(),
            ty,
        }
    }
}

impl<T> From<T> for Param
where
    T: Into<Value>,
{
    fn from(value: T) -> Self {
        let value = value.into();
        let ty = ParamType::infer(&value);
        Self { value, ty }
    }
}

/// Ordered placeholder → parameter map shared by every builder of one statement.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Params(IndexMap<String, Param>);

impl Params {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.0.contains_key(normalize_name(name).as_str())
    }

    pub fn get(&self, name: &str) -> Option<&Param> {
        self.0.get(normalize_name(name).as_str())
    }

    /// Bound value of a placeholder, `:qp0` and `qp0` are the same name.
    pub fn value(&self, name: &str) -> Option<&Value> {
        self.get(name).map(|param| &param.value)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Param)> {
        self.0.iter().map(|(name, param)| (name.as_str(), param))
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    /// Inserts or replaces a named parameter.
    pub fn insert<N, P>(&mut self, name: N, param: P) -> &mut Self
    where
        N: AsRef<str>,
        P: Into<Param>,
    {
        self.0.insert(normalize_name(name.as_ref()), param.into());
        self
    }

    pub fn with<N, P>(mut self, name: N, param: P) -> Self
    where
        N: AsRef<str>,
        P: Into<Param>,
    {
        self.insert(name, param);
        self
    }

    /// Merges `other` into this map, later values win like an array merge.
    pub fn extend(&mut self, other: &Params) {
        for (name, param) in other.iter() {
            self.0.insert(name.to_string(), param.clone());
        }
    }

    /// Next free placeholder name: `:qp<N>` where N is the map size, `:qp<N>_<k>` on collision.
    pub fn next_name(&self) -> String {
        let count = self.0.len();
        let mut name = format!("{PARAM_PREFIX}{count}");
        let mut additional = 0;
        while self.0.contains_key(&name) {
            name = format!("{PARAM_PREFIX}{count}_{additional}");
            additional += 1;
        }
        name
    }

    /// Binds a value under a fresh placeholder and returns the placeholder.
    pub fn bind<P: Into<Param>>(&mut self, param: P) -> String {
        let name = self.next_name();
        self.0.insert(name.clone(), param.into());
        name
    }
}

impl<N, P, const L: usize> From<[(N, P); L]> for Params
where
    N: AsRef<str>,
    P: Into<Param>,
{
    fn from(values: [(N, P); L]) -> Self {
        let mut params = Params::new();
        for (name, param) in values {
            params.insert(name, param);
        }
        params
    }
}

impl IntoIterator for Params {
    type Item = (String, Param);
    type IntoIter = indexmap::map::IntoIter<String, Param>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

fn normalize_name(name: &str) -> String {
    if name.starts_with(':') {
        name.to_string()
    } else {
        format!(":{name}")
    }
}
