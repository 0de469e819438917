//! # Typed values
//!
//! Values appear in attribute-equality restrictions (rendered as SQL literals) and in
//! fetched rows (decoded from the database).
//!

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use itertools::Itertools;
use serde::{Deserialize, Serialize};
use std::fmt;

/// A scalar value
#[derive(Clone, Debug, PartialEq, PartialOrd, Serialize, Deserialize)]
pub enum Value {
    Null,
    Boolean(bool),
    Integer(i64),
    Unsigned(u64),
    Float(f64),
    Text(String),
    Bytes(Vec<u8>),
    Date(NaiveDate),
    Time(NaiveTime),
    DateTime(NaiveDateTime),
}

impl Value {
    pub fn null() -> Value {
        Value::Null
    }
    pub fn boolean(b: bool) -> Value {
        Value::Boolean(b)
    }
    pub fn integer(i: i64) -> Value {
        Value::Integer(i)
    }
    pub fn unsigned(u: u64) -> Value {
        Value::Unsigned(u)
    }
    pub fn float(f: f64) -> Value {
        Value::Float(f)
    }
    pub fn text<S: Into<String>>(s: S) -> Value {
        Value::Text(s.into())
    }
    pub fn bytes<B: Into<Vec<u8>>>(b: B) -> Value {
        Value::Bytes(b.into())
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Render the value as an SQL literal
    pub fn to_sql(&self) -> String {
        match self {
            Value::Null => "NULL".to_string(),
            Value::Boolean(b) => if *b { "TRUE" } else { "FALSE" }.to_string(),
            Value::Integer(i) => i.to_string(),
            Value::Unsigned(u) => u.to_string(),
            Value::Float(f) => format!("{:?}", f),
            Value::Text(t) => quote(t),
            Value::Bytes(b) => format!("X'{}'", b.iter().map(|byte| format!("{:02x}", byte)).join("")),
            Value::Date(d) => quote(&d.format("%Y-%m-%d").to_string()),
            Value::Time(t) => quote(&t.format("%H:%M:%S").to_string()),
            Value::DateTime(dt) => quote(&dt.format("%Y-%m-%d %H:%M:%S").to_string()),
        }
    }
}

/// Single-quote a string literal, doubling embedded quotes
fn quote(s: &str) -> String {
    format!("'{}'", s.replace('\'', "''"))
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => write!(f, "null"),
            Value::Boolean(b) => write!(f, "{}", b),
            Value::Integer(i) => write!(f, "{}", i),
            Value::Unsigned(u) => write!(f, "{}", u),
            Value::Float(x) => write!(f, "{}", x),
            Value::Text(t) => write!(f, "{}", t),
            Value::Bytes(b) => write!(f, "<{} bytes>", b.len()),
            Value::Date(d) => write!(f, "{}", d),
            Value::Time(t) => write!(f, "{}", t),
            Value::DateTime(dt) => write!(f, "{}", dt),
        }
    }
}

macro_rules! impl_from {
    ($Type:ty, $Variant:ident) => {
        impl From<$Type> for Value {
            fn from(v: $Type) -> Self {
                Value::$Variant(v.into())
            }
        }
    };
}

impl_from!(bool, Boolean);
impl_from!(i8, Integer);
impl_from!(i16, Integer);
impl_from!(i32, Integer);
impl_from!(i64, Integer);
impl_from!(u8, Integer);
impl_from!(u16, Integer);
impl_from!(u32, Integer);
impl_from!(u64, Unsigned);
impl_from!(f32, Float);
impl_from!(f64, Float);
impl_from!(String, Text);
impl_from!(&str, Text);
impl_from!(Vec<u8>, Bytes);
impl_from!(NaiveDate, Date);
impl_from!(NaiveTime, Time);
impl_from!(NaiveDateTime, DateTime);

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        v.map_or(Value::Null, Into::into)
    }
}
