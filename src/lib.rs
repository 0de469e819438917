//! # Qrel
//! Relational algebra on database tables, compiled into SQL
//!
//! ## Query expressions
//! An [`Expression`] describes an entity set: a base [table](expression::Table), or the result
//! of restriction, projection, join, union or aggregation of other entity sets.
//! Operators build new expressions lazily and never touch the database.
//!
//! ## SQL compilation
//! Any expression compiles into a single `SELECT` statement with [`Expression::make_sql`].
//! Inputs are wrapped into subqueries only when their SQL cannot be extended in place.
//!
//! ## Fetching
//! Expressions carrying a [connection](io::Connection) can be fetched, counted and iterated
//! over, see the [`fetch`] module.
//!

pub mod builder;
pub mod condition;
pub mod data_type;
pub mod expression;
pub mod fetch;
pub mod heading;
pub mod io;
pub mod namer;
pub mod setup;

pub use builder::{Ready, With, WithIterator};
pub use condition::{AndList, Condition};
pub use data_type::{value::Value, DataType};
pub use expression::{Expression, Projection, U};
pub use fetch::Fetch;
pub use heading::{attribute::Attribute, Heading};
pub use io::{Connection, Row};
/// Expose sqlparser's tokenizer, used to scan SQL conditions
pub use sqlparser::{dialect, tokenizer};
