//! # Fetching
//!
//! Running compiled expressions on their connection: cursors with ordering and limits,
//! counts, single rows and the key-based iteration protocol of [`iter::KeyIter`].
//!

pub mod iter;

use log::debug;
use std::{error, fmt, result, sync::Arc};

use crate::{
    condition::Condition,
    data_type::Value,
    expression::{self, Expression, Projection, Variant},
    io::{self, Connection, Row},
};
pub use iter::KeyIter;

/// The pseudo attribute standing for the primary key in an ordering
pub const KEY: &str = "KEY";
/// The default number of rows of [`Expression::head`] and [`Expression::tail`]
pub const DEFAULT_LIMIT: usize = 25;

// Error management

#[derive(Debug, Clone, PartialEq)]
pub enum Error {
    IteratorNotInitialized(String),
    NotConnected(String),
    InvalidFetch(String),
    Expression(String),
    Io(String),
}

impl Error {
    pub fn iterator_not_initialized() -> Error {
        Error::IteratorNotInitialized(
            "The iterator must be initialized before rows are requested".to_string(),
        )
    }
    pub fn not_connected() -> Error {
        Error::NotConnected("The expression has no connection".to_string())
    }
    pub fn invalid_fetch(desc: impl fmt::Display) -> Error {
        Error::InvalidFetch(format!("{}", desc))
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::IteratorNotInitialized(desc) => {
                writeln!(f, "IteratorNotInitialized: {}", desc)
            }
            Error::NotConnected(desc) => writeln!(f, "NotConnected: {}", desc),
            Error::InvalidFetch(desc) => writeln!(f, "InvalidFetch: {}", desc),
            Error::Expression(desc) => writeln!(f, "Expression: {}", desc),
            Error::Io(desc) => writeln!(f, "Io: {}", desc),
        }
    }
}

impl error::Error for Error {}

impl From<expression::Error> for Error {
    fn from(err: expression::Error) -> Self {
        Error::Expression(err.to_string())
    }
}

impl From<io::Error> for Error {
    fn from(err: io::Error) -> Self {
        Error::Io(err.to_string())
    }
}

pub type Result<T> = result::Result<T, Error>;

/// Parameters of a fetch
#[derive(Clone, Debug, Default, Hash, PartialEq, Eq)]
pub struct Fetch {
    order_by: Vec<String>,
    limit: Option<usize>,
    offset: Option<usize>,
}

impl Fetch {
    pub fn new() -> Self {
        Fetch::default()
    }

    /// Order by an attribute, optionally followed by `ASC` or `DESC`; [`KEY`] stands for the primary key
    pub fn order_by<S: Into<String>>(mut self, order_by: S) -> Self {
        self.order_by.push(order_by.into());
        self
    }

    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn offset(mut self, offset: usize) -> Self {
        self.offset = Some(offset);
        self
    }

    /// The ordering with [`KEY`] expanded to the primary key attributes
    fn expand_order_by(&self, primary_key: &[&str]) -> Vec<String> {
        self.order_by
            .iter()
            .flat_map(|item| {
                let item = item.trim();
                match item.strip_prefix(KEY).map(str::trim) {
                    Some("") => primary_key.iter().map(|name| format!("`{}`", name)).collect(),
                    Some(direction)
                        if direction.eq_ignore_ascii_case("asc")
                            || direction.eq_ignore_ascii_case("desc") =>
                    {
                        primary_key
                            .iter()
                            .map(|name| format!("`{}` {}", name, direction.to_uppercase()))
                            .collect()
                    }
                    _ => vec![item.to_string()],
                }
            })
            .collect()
    }

    /// The SELECT statement of `expression` with ordering and limits
    pub fn sql(&self, expression: &Expression) -> Result<String> {
        if matches!(self.offset, Some(offset) if offset > 0) && self.limit.is_none() {
            return Err(Error::invalid_fetch("limit is required when offset is set"));
        }
        let mut sql = expression.make_sql()?;
        let order_by = self.expand_order_by(&expression.primary_key());
        if !order_by.is_empty() {
            sql.push_str(&format!(" ORDER BY {}", order_by.join(", ")));
        }
        if let Some(limit) = self.limit {
            sql.push_str(&format!(" LIMIT {}", limit));
            if let Some(offset) = self.offset.filter(|offset| *offset > 0) {
                sql.push_str(&format!(" OFFSET {}", offset));
            }
        }
        Ok(sql)
    }
}

impl Expression {
    fn connection_or_err(&self) -> Result<Arc<dyn Connection>> {
        self.connection().cloned().ok_or_else(Error::not_connected)
    }

    /// The cursor statement of a fetch
    pub fn cursor_sql(&self, fetch: &Fetch) -> Result<String> {
        fetch.sql(self)
    }

    /// Fetch rows
    pub fn fetch(&self, fetch: &Fetch) -> Result<Vec<Row>> {
        let connection = self.connection_or_err()?;
        let sql = fetch.sql(self)?;
        debug!("{}: {}", connection.name(), sql);
        Ok(connection.query(&sql)?)
    }

    /// Fetch every row
    pub fn fetch_all(&self) -> Result<Vec<Row>> {
        self.fetch(&Fetch::new())
    }

    /// Fetch the primary keys, ordered
    pub fn fetch_keys(&self) -> Result<Vec<Row>> {
        if self.primary_key().is_empty() {
            return Err(Error::invalid_fetch("the expression has no primary key"));
        }
        self.proj(Projection::new())?
            .fetch(&Fetch::new().order_by(KEY))
    }

    /// Fetch the only row
    pub fn fetch1(&self) -> Result<Row> {
        let rows = self.fetch_all()?;
        match rows.len() {
            1 => Ok(rows.into_iter().next().unwrap_or_default()),
            count => Err(Error::invalid_fetch(format!(
                "fetch1 requires exactly one row, got {}",
                count
            ))),
        }
    }

    /// The first rows in primary key order
    pub fn head(&self, limit: usize) -> Result<Vec<Row>> {
        self.fetch(&Fetch::new().order_by(KEY).limit(limit))
    }

    /// The last rows in primary key order
    pub fn tail(&self, limit: usize) -> Result<Vec<Row>> {
        let mut rows = self.fetch(&Fetch::new().order_by(format!("{} DESC", KEY)).limit(limit))?;
        rows.reverse();
        Ok(rows)
    }

    /// The number of elements
    pub fn len(&self) -> Result<usize> {
        let connection = self.connection_or_err()?;
        let sql = self.len_sql()?;
        debug!("{}: {}", connection.name(), sql);
        let rows = connection.query(&sql)?;
        match rows.first().and_then(|row| row.values().next()) {
            Some(Value::Integer(count)) => Ok(*count as usize),
            Some(Value::Unsigned(count)) => Ok(*count as usize),
            value => Err(Error::invalid_fetch(format!(
                "invalid count {}",
                value.map_or_else(|| "NONE".to_string(), Value::to_string)
            ))),
        }
    }

    pub fn is_empty(&self) -> Result<bool> {
        Ok(self.len()? == 0)
    }

    /// True if some element satisfies the condition
    pub fn contains<C: Into<Condition>>(&self, condition: C) -> Result<bool> {
        Ok(!self.restrict(condition)?.is_empty()?)
    }

    /// Iterate over the elements, one query per element
    pub fn iter(&self) -> Result<KeyIter> {
        let mut iter = KeyIter::new(self.clone());
        iter.init()?;
        Ok(iter)
    }
}
