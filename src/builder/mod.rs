//! SQL assembly. [`QueryBuilder`] owns the dialect facts, the builder registries and the
//! optional schema provider; [`BuildContext`] threads one statement's parameters through the
//! expression builders.

use std::{collections::HashMap, fmt, sync::Arc};

use indexmap::IndexMap;
use smol_str::SmolStr;
use tracing::debug;

use crate::{
    column::{self, ColumnBuilder, ColumnDef, ColumnDefinitionBuilder},
    command::Command,
    condition::{Condition, ConditionFactory},
    config::Config,
    dialect::{Dialect, HasDialect},
    error::{Error, Result},
    expr::{Expr, ExprKind, ExpressionBuilder, ExpressionBuilders},
    operand::Operand,
    query::Query,
    quoter::Quoter,
    schema::SchemaProvider,
    value::{Param, Params, Value},
};

pub mod ddl;
pub mod dml;
pub mod dql;

pub use dml::{InsertValues, UpdateColumns};

/// Dialect-aware SQL assembler.
///
/// ```
/// use qsmith::{map, Dialect, Query, QueryBuilder};
///
/// let qb = QueryBuilder::new(Dialect::Postgres);
/// let mut query = Query::new();
/// query.select(["id", "name"]).from("user").where_condition(map! {"status" => 1});
/// let (sql, params) = qb.build(&query, Default::default()).unwrap();
/// assert_eq!(r#"SELECT "id", "name" FROM "user" WHERE "status"=:qp0"#, sql);
/// assert_eq!(1, params.len());
/// ```
#[derive(Clone)]
pub struct QueryBuilder {
    dialect: Dialect,
    config: Config,
    quoter: Quoter,
    builders: ExpressionBuilders,
    conditions: HashMap<String, Arc<dyn ConditionFactory>>,
    type_map: IndexMap<SmolStr, String>,
    maybe_schema: Option<Arc<dyn SchemaProvider>>,
}

impl fmt::Debug for QueryBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("QueryBuilder")
            .field("dialect", &self.dialect)
            .field("config", &self.config)
            .field("builders", &self.builders)
            .field("conditions", &self.conditions.keys().collect::<Vec<_>>())
            .field("has_schema", &self.maybe_schema.is_some())
            .finish()
    }
}

impl QueryBuilder {
    pub fn new(dialect: Dialect) -> Self {
        Self::with_config(dialect, Config::default())
    }

    pub fn with_config(dialect: Dialect, config: Config) -> Self {
        let mut quoter = Quoter::new(dialect, config.table_prefix.clone());
        if config.quote_cache {
            quoter = quoter.with_cache();
        }
        Self {
            dialect,
            config,
            quoter,
            builders: ExpressionBuilders::with_defaults(),
            conditions: HashMap::new(),
            type_map: column::default_type_map(dialect),
            maybe_schema: None,
        }
    }

    pub fn for_dialect<D: HasDialect>() -> Self {
        Self::new(D::DIALECT)
    }

    /// Table metadata used for typecasting and upsert key resolution.
    pub fn with_schema(mut self, schema: Arc<dyn SchemaProvider>) -> Self {
        self.maybe_schema = Some(schema);
        self
    }

    pub fn dialect(&self) -> Dialect {
        self.dialect
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn quoter(&self) -> &Quoter {
        &self.quoter
    }

    pub fn schema(&self) -> Option<&Arc<dyn SchemaProvider>> {
        self.maybe_schema.as_ref()
    }

    pub fn separator(&self) -> &'static str {
        self.config.separator()
    }

    // registries

    /// Replaces the builder of an expression kind, or adds one for a custom expression.
    pub fn register_expression_builder<B>(&mut self, kind: ExprKind, builder: B) -> &mut Self
    where
        B: ExpressionBuilder + 'static,
    {
        self.builders.register(kind, builder);
        self
    }

    pub fn expression_builders(&self) -> &ExpressionBuilders {
        &self.builders
    }

    pub fn expression_builders_mut(&mut self) -> &mut ExpressionBuilders {
        &mut self.builders
    }

    /// Registers an operator for the array condition syntax. Registered operators shadow the
    /// built-in ones.
    pub fn register_condition<F>(&mut self, operator: &str, factory: F) -> &mut Self
    where
        F: ConditionFactory + 'static,
    {
        self.conditions
            .insert(operator.to_uppercase(), Arc::new(factory));
        self
    }

    // column types

    pub fn type_map(&self) -> &IndexMap<SmolStr, String> {
        &self.type_map
    }

    /// Overrides the physical spelling of an abstract type.
    pub fn set_type_mapping(&mut self, ty: impl Into<SmolStr>, physical: impl Into<String>) -> &mut Self {
        self.type_map.insert(ty.into(), physical.into());
        self
    }

    pub fn get_column_type(&self, ty: &str) -> String {
        column::resolve_column_type(&self.type_map, ty)
    }

    /// Full column definition, from an abstract type string or a [`ColumnBuilder`].
    pub fn build_column_definition(&self, column: &ColumnDef) -> String {
        match column {
            ColumnDef::Raw(ty) => self.get_column_type(ty),
            ColumnDef::Builder(column) => self.build_column(column),
        }
    }

    pub fn build_column(&self, column: &ColumnBuilder) -> String {
        ColumnDefinitionBuilder::new(self).build(column)
    }

    // fragments

    pub fn build_expression(&self, expr: &Expr, params: &mut Params) -> Result<String> {
        BuildContext::new(self, params).build_expression(expr)
    }

    pub fn build_condition(&self, condition: &Operand, params: &mut Params) -> Result<String> {
        BuildContext::new(self, params).build_condition(condition)
    }

    pub fn build_value(&self, value: &Operand, params: &mut Params) -> Result<String> {
        BuildContext::new(self, params).build_value(value)
    }

    /// Binds a value under a fresh `:qp<N>` placeholder.
    pub fn bind_param(&self, param: impl Into<Param>, params: &mut Params) -> String {
        BuildContext::new(self, params).bind(param)
    }

    /// Normalizes an operator-form list (`["in", "id", [1, 2]]`) into a condition.
    pub fn create_condition_from_array(&self, definition: &[Operand]) -> Result<Condition> {
        let Some(operator) = definition.first().and_then(Operand::as_str) else {
            return Err(Error::invalid_argument("Condition operator must be a string."));
        };
        let operator = operator.trim().to_uppercase();
        let operands = &definition[1..];
        match self.conditions.get(&operator) {
            Some(factory) => factory.create(&operator, operands),
            None => Condition::from_array_definition(&operator, operands),
        }
    }

    /// Hands built SQL to the execution layer.
    pub fn command(&self, sql: impl Into<String>, params: Params) -> Command {
        Command::new(sql, params, self.dialect, self.config.table_prefix.clone())
    }

    fn log_statement(&self, statement: &str, sql: &str, params: &Params) {
        debug!(
            dialect = %self.dialect,
            statement,
            sql,
            params = params.len(),
            "built statement"
        );
    }
}

/// Per-statement state handed to expression builders.
pub struct BuildContext<'a> {
    builder: &'a QueryBuilder,
    params: &'a mut Params,
}

impl<'a> BuildContext<'a> {
    pub(crate) fn new(builder: &'a QueryBuilder, params: &'a mut Params) -> Self {
        Self { builder, params }
    }

    pub fn builder(&self) -> &QueryBuilder {
        self.builder
    }

    pub fn dialect(&self) -> Dialect {
        self.builder.dialect
    }

    pub fn quoter(&self) -> &Quoter {
        &self.builder.quoter
    }

    pub fn params(&self) -> &Params {
        self.params
    }

    pub fn params_mut(&mut self) -> &mut Params {
        self.params
    }

    pub fn bind(&mut self, param: impl Into<Param>) -> String {
        self.params.bind(param)
    }

    pub fn build_expression(&mut self, expr: &Expr) -> Result<String> {
        let builder = self.builder.builders.get(&expr.kind())?;
        builder.build(expr, self)
    }

    /// Renders a condition tree. Blank conditions render as an empty string, a string is raw
    /// SQL, so `"0"` stays the always-false `0`.
    pub fn build_condition(&mut self, condition: &Operand) -> Result<String> {
        match condition {
            Operand::Value(Value::Null) => Ok(String::new()),
            Operand::Value(Value::String(sql)) => Ok(sql.clone()),
            Operand::Value(value) => Ok(self.quoter().quote_value(value)),
            Operand::List(items) if items.is_empty() => Ok(String::new()),
            Operand::Map(hash) if hash.is_empty() => Ok(String::new()),
            Operand::List(items) => {
                let condition = self.builder.create_condition_from_array(items)?;
                self.build_expression(&Expr::from(condition))
            }
            Operand::Map(hash) => self.build_expression(&Expr::from(Condition::hash(hash.clone()))),
            Operand::Expr(expr) => self.build_expression(expr),
        }
    }

    /// Renders a value: NULL and booleans inline, expressions as their SQL, lists and maps as
    /// bound JSON text, anything else as a bound placeholder.
    pub fn build_value(&mut self, value: &Operand) -> Result<String> {
        match value {
            Operand::Value(Value::Null) => Ok("NULL".into()),
            Operand::Value(Value::Bool(b)) => Ok(self.dialect().bool_literal(*b).into()),
            Operand::Value(value) => Ok(self.bind(value.clone())),
            Operand::Expr(expr) => self.build_expression(expr),
            Operand::List(_) | Operand::Map(_) => {
                let json = value.to_json()?;
                Ok(self.bind(Value::String(json.to_string())))
            }
        }
    }

    /// Renders a sub-query sharing this statement's parameters.
    pub fn build_query(&mut self, query: &Query) -> Result<String> {
        self.params.extend(&query.params);
        self.build_select_query(query)
    }
}

#[cfg(test)]
mod tests {
    use crate::{list, map, tests::replace_quotes};

    use super::*;

    #[test]
    fn test_bind_param_allocates_next_name() {
        let qb = QueryBuilder::new(Dialect::Sqlite);
        let mut params = Params::from([(":qp0", "taken")]);
        assert_eq!(":qp1", qb.bind_param(5, &mut params));
        assert_eq!(Some(&Value::Int(5)), params.value(":qp1"));
    }

    #[test]
    fn test_condition_operator_must_be_string() {
        let qb = QueryBuilder::new(Dialect::Postgres);
        let err = qb
            .build_condition(&list![1, "a", 2], &mut Params::new())
            .unwrap_err();
        assert_eq!(
            "Invalid argument: Condition operator must be a string.",
            err.to_string()
        );
    }

    #[test]
    fn test_raw_and_blank_conditions() {
        let qb = QueryBuilder::new(Dialect::Postgres);
        let mut params = Params::new();
        assert_eq!("0", qb.build_condition(&"0".into(), &mut params).unwrap());
        assert_eq!("", qb.build_condition(&Operand::null(), &mut params).unwrap());
        assert_eq!("", qb.build_condition(&list![], &mut params).unwrap());
        assert_eq!("", qb.build_condition(&map! {}, &mut params).unwrap());
        assert!(params.is_empty());
    }

    #[test]
    fn test_operator_case_insensitive() {
        let qb = QueryBuilder::new(Dialect::MySql);
        let mut params = Params::new();
        let sql = qb
            .build_condition(&list!["not in", "id", list![1, 2]], &mut params)
            .unwrap();
        assert_eq!(replace_quotes("[[id]] NOT IN (:qp0, :qp1)", Dialect::MySql), sql);
    }

    #[test]
    fn test_registered_condition_shadows_builtin() {
        fn first_is_zero(_: &str, operands: &[Operand]) -> Result<Condition> {
            let column = operands[0].as_str().unwrap_or_default().to_string();
            Ok(Condition::eq(column, 0))
        }

        let mut qb = QueryBuilder::new(Dialect::Postgres);
        qb.register_condition("in", first_is_zero);
        let mut params = Params::new();
        let sql = qb
            .build_condition(&list!["IN", "id", list![1, 2]], &mut params)
            .unwrap();
        assert_eq!("\"id\" = :qp0", sql);
    }

    #[test]
    fn test_override_expression_builder() {
        fn bracketed(expr: &Expr, _: &mut BuildContext<'_>) -> Result<String> {
            match expr {
                Expr::ColumnName(name) => Ok(format!("[{name}]")),
                _ => Ok(String::new()),
            }
        }

        let mut qb = QueryBuilder::new(Dialect::Sqlite);
        qb.register_expression_builder(ExprKind::ColumnName, bracketed);
        let sql = qb
            .build_expression(&Expr::column("id"), &mut Params::new())
            .unwrap();
        assert_eq!("[id]", sql);
    }

    #[test]
    fn test_unregistered_kind() {
        let mut qb = QueryBuilder::new(Dialect::Postgres);
        qb.expression_builders_mut().remove(&ExprKind::Raw);
        let err = qb
            .build_expression(&Expr::raw("1"), &mut Params::new())
            .unwrap_err();
        assert!(matches!(err, Error::UnsupportedExpression(ref kind) if kind == "Raw"));
    }

    #[test]
    fn test_build_value() {
        let qb = QueryBuilder::new(Dialect::Sqlite);
        let mut params = Params::new();
        assert_eq!("NULL", qb.build_value(&Operand::null(), &mut params).unwrap());
        assert_eq!("1", qb.build_value(&true.into(), &mut params).unwrap());
        assert_eq!(":qp0", qb.build_value(&"x".into(), &mut params).unwrap());
        assert_eq!(":qp1", qb.build_value(&list![1, 2], &mut params).unwrap());
        assert_eq!(Some(&Value::from("[1,2]")), params.value(":qp1"));
    }
}
