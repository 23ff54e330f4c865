//! Dialect-aware SQL generation.
//!
//! Queries are described with [`Query`], conditions with plain [`Operand`] trees built by the
//! [`list!`] and [`map!`] macros, and rendered by a [`QueryBuilder`] bound to one [`Dialect`].
//! Values never end up in the SQL text, they are bound as `:qpN` parameters.
//!
//! ```
//! use qsmith::{Dialect, Params, Query, QueryBuilder, map};
//!
//! let mut query = Query::new();
//! query.select(["id", "name"]).from("user").where_condition(map! { "id" => 1 });
//!
//! let (sql, params) = QueryBuilder::new(Dialect::MySql).build(&query, Params::new()).unwrap();
//! assert_eq!("SELECT `id`, `name` FROM `user` WHERE `id`=:qp0", sql);
//! assert_eq!(1, params.len());
//! ```

pub mod builder;
pub mod column;
pub mod command;
pub mod condition;
pub mod config;
pub mod dialect;
pub mod error;
pub mod expr;
pub mod operand;
pub mod query;
pub mod quoter;
pub mod scan;
pub mod schema;
pub mod tokenizer;
pub mod value;

pub use builder::{BuildContext, InsertValues, QueryBuilder, UpdateColumns};
pub use column::{ColumnBuilder, ColumnDef};
pub use command::{Command, Executor, Record};
pub use condition::{Condition, ConditionFactory, ConditionKind};
pub use config::Config;
pub use dialect::Dialect;
pub use error::{Error, Result};
pub use expr::{CustomExpression, Expr, ExprKind, ExpressionBuilder, raw::raw};
pub use operand::{ColumnRef, Operand, Row};
pub use query::{Order, Query, sub};
pub use quoter::Quoter;
pub use schema::{ColumnSchema, MemorySchema, SchemaProvider, TableSchema};
pub use value::{Param, ParamType, Params, Value};
