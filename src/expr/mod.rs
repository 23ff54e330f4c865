//! Expression model and the overridable builder registry.

use std::{any::Any, collections::HashMap, fmt, sync::Arc};

use smol_str::SmolStr;

use crate::{
    builder::BuildContext,
    condition::{Condition, ConditionKind},
    error::{Error, Result},
    query::Query,
    value::{Param, Value},
};

pub mod array;
pub mod case;
pub mod function;
pub mod json;
pub mod raw;
pub mod structured;

pub use array::ArrayExpr;
pub use case::CaseExpr;
pub use function::{Function, FunctionExpr};
pub use json::JsonExpr;
pub use raw::RawExpr;
pub use structured::StructuredExpr;

#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    /// Raw SQL with its own named parameters.
    Raw(RawExpr),
    /// A bound parameter with an explicit type hint.
    Param(Param),
    /// A bound value with an inferred type hint.
    Value(Value),
    Array(ArrayExpr),
    Json(JsonExpr),
    Structured(StructuredExpr),
    Case(Box<CaseExpr>),
    ColumnName(SmolStr),
    Function(FunctionExpr),
    /// A sub-query, rendered in parentheses.
    Query(Box<Query>),
    Condition(Box<Condition>),
    Custom(CustomExpr),
}

impl Expr {
    pub fn raw(sql: impl Into<String>) -> Self {
        Expr::Raw(RawExpr::new(sql))
    }

    pub fn column(name: impl Into<SmolStr>) -> Self {
        Expr::ColumnName(name.into())
    }

    pub fn value(value: impl Into<Value>) -> Self {
        Expr::Value(value.into())
    }

    pub fn query(query: Query) -> Self {
        Expr::Query(Box::new(query))
    }

    pub fn kind(&self) -> ExprKind {
        match self {
            Expr::Raw(_) => ExprKind::Raw,
            Expr::Param(_) => ExprKind::Param,
            Expr::Value(_) => ExprKind::Value,
            Expr::Array(_) => ExprKind::Array,
            Expr::Json(_) => ExprKind::Json,
            Expr::Structured(_) => ExprKind::Structured,
            Expr::Case(_) => ExprKind::Case,
            Expr::ColumnName(_) => ExprKind::ColumnName,
            Expr::Function(_) => ExprKind::Function,
            Expr::Query(_) => ExprKind::Query,
            Expr::Condition(condition) => condition.expr_kind(),
            Expr::Custom(custom) => ExprKind::Custom(SmolStr::new(custom.0.name())),
        }
    }
}

impl From<RawExpr> for Expr {
    fn from(value: RawExpr) -> Self {
        Expr::Raw(value)
    }
}

impl From<Query> for Expr {
    fn from(value: Query) -> Self {
        Expr::Query(Box::new(value))
    }
}

impl From<Condition> for Expr {
    fn from(value: Condition) -> Self {
        Expr::Condition(Box::new(value))
    }
}

/// Identity of an expression variant in the builder registry.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ExprKind {
    Raw,
    Param,
    Value,
    Array,
    Json,
    Structured,
    Case,
    ColumnName,
    Function,
    Query,
    Condition(ConditionKind),
    Custom(SmolStr),
}

impl fmt::Display for ExprKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExprKind::Condition(kind) => write!(f, "Condition({kind:?})"),
            ExprKind::Custom(name) => write!(f, "Custom({name})"),
            other => write!(f, "{other:?}"),
        }
    }
}

/// A caller-defined expression, rendered by the builder registered under its name.
pub trait CustomExpression: fmt::Debug + Send + Sync {
    fn name(&self) -> &str;

    fn as_any(&self) -> &dyn Any;
}

#[derive(Debug, Clone)]
pub struct CustomExpr(pub Arc<dyn CustomExpression>);

impl CustomExpr {
    pub fn new<T: CustomExpression + 'static>(expr: T) -> Self {
        Self(Arc::new(expr))
    }

    pub fn downcast_ref<T: 'static>(&self) -> Option<&T> {
        self.0.as_any().downcast_ref::<T>()
    }
}

impl PartialEq for CustomExpr {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

/// Renders one expression variant to SQL, binding values into the context parameters.
pub trait ExpressionBuilder: Send + Sync {
    fn build(&self, expr: &Expr, context: &mut BuildContext<'_>) -> Result<String>;
}

impl<F> ExpressionBuilder for F
where
    F: Fn(&Expr, &mut BuildContext<'_>) -> Result<String> + Send + Sync,
{
    fn build(&self, expr: &Expr, context: &mut BuildContext<'_>) -> Result<String> {
        self(expr, context)
    }
}

/// Explicit map from expression variant to builder. Registering a kind replaces its builder.
#[derive(Clone, Default)]
pub struct ExpressionBuilders {
    builders: HashMap<ExprKind, Arc<dyn ExpressionBuilder>>,
}

impl fmt::Debug for ExpressionBuilders {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.builders.keys()).finish()
    }
}

impl ExpressionBuilders {
    pub fn empty() -> Self {
        Self::default()
    }

    /// Registry holding every built-in builder.
    pub fn with_defaults() -> Self {
        use crate::condition::{
            between::{BetweenBuilder, BetweenColumnsBuilder},
            compare::{CompareBuilder, SimpleBuilder},
            exists::ExistsBuilder,
            hash::HashBuilder,
            r#in::InBuilder,
            like::LikeBuilder,
            logical::{ConjunctionBuilder, NotBuilder},
        };

        let mut registry = Self::default();
        registry
            .register(ExprKind::Raw, raw::RawBuilder)
            .register(ExprKind::Param, raw::ParamBuilder)
            .register(ExprKind::Value, raw::ValueBuilder)
            .register(ExprKind::ColumnName, raw::ColumnNameBuilder)
            .register(ExprKind::Query, raw::QueryBuilderExpr)
            .register(ExprKind::Array, array::ArrayBuilder)
            .register(ExprKind::Json, json::JsonBuilder)
            .register(ExprKind::Structured, structured::StructuredBuilder)
            .register(ExprKind::Case, case::CaseBuilder)
            .register(ExprKind::Function, function::FunctionBuilder)
            .register(ExprKind::Condition(ConditionKind::Compare), CompareBuilder)
            .register(ExprKind::Condition(ConditionKind::Simple), SimpleBuilder)
            .register(ExprKind::Condition(ConditionKind::Between), BetweenBuilder)
            .register(
                ExprKind::Condition(ConditionKind::BetweenColumns),
                BetweenColumnsBuilder,
            )
            .register(ExprKind::Condition(ConditionKind::In), InBuilder)
            .register(ExprKind::Condition(ConditionKind::Like), LikeBuilder)
            .register(ExprKind::Condition(ConditionKind::Exists), ExistsBuilder)
            .register(ExprKind::Condition(ConditionKind::Conjunction), ConjunctionBuilder)
            .register(ExprKind::Condition(ConditionKind::Not), NotBuilder)
            .register(ExprKind::Condition(ConditionKind::Hash), HashBuilder);
        registry
    }

    pub fn register<B>(&mut self, kind: ExprKind, builder: B) -> &mut Self
    where
        B: ExpressionBuilder + 'static,
    {
        self.builders.insert(kind, Arc::new(builder));
        self
    }

    pub fn register_arc(&mut self, kind: ExprKind, builder: Arc<dyn ExpressionBuilder>) -> &mut Self {
        self.builders.insert(kind, builder);
        self
    }

    pub fn remove(&mut self, kind: &ExprKind) -> Option<Arc<dyn ExpressionBuilder>> {
        self.builders.remove(kind)
    }

    pub fn get(&self, kind: &ExprKind) -> Result<Arc<dyn ExpressionBuilder>> {
        self.builders
            .get(kind)
            .cloned()
            .ok_or_else(|| Error::UnsupportedExpression(kind.to_string()))
    }
}

/// Error for a builder invoked with an expression of another variant.
pub(crate) fn mismatch(builder: &str, expr: &Expr) -> Error {
    Error::invalid_argument(format!(
        "{builder} cannot render an expression of type {}.",
        expr.kind()
    ))
}
