//! # Attribute data types
//!
//! The declared type of an attribute ([`DataType`]) and the native representation
//! a fetched value is decoded into ([`NativeType`]).
//!

pub mod decode;
pub mod value;

use serde::{Deserialize, Serialize};
use std::{error, fmt, result, str::FromStr};

pub use decode::NativeType;
pub use value::Value;

// Error management

#[derive(Debug, Clone)]
pub enum Error {
    InvalidDataType(String),
    Other(String),
}

impl Error {
    pub fn invalid_data_type(data_type: impl fmt::Display) -> Error {
        Error::InvalidDataType(format!("{} is not a supported type", data_type))
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::InvalidDataType(desc) => writeln!(f, "InvalidDataType: {}", desc),
            Error::Other(err) => writeln!(f, "{}", err),
        }
    }
}

impl error::Error for Error {}

pub type Result<T> = result::Result<T, Error>;

/// Generalized attribute types
#[derive(Clone, Copy, Debug, Default, Hash, PartialEq, Eq, Serialize, Deserialize)]
pub enum DataType {
    #[default]
    Unknown,
    Boolean,
    TinyInt,
    TinyIntUnsigned,
    SmallInt,
    SmallIntUnsigned,
    MediumInt,
    MediumIntUnsigned,
    Int,
    IntUnsigned,
    BigInt,
    BigIntUnsigned,
    Enum,
    Date,
    Time,
    DateTime,
    Timestamp,
    CharN,
    VarCharN,
    Float,
    Double,
    Decimal,
    TinyBlob,
    MediumBlob,
    Blob,
    LongBlob,
    Binary,
}

impl DataType {
    /// The native type values of this type decode into
    pub fn native_type(&self) -> NativeType {
        match self {
            DataType::Unknown => NativeType::None,
            DataType::Boolean => NativeType::Bool,
            DataType::TinyInt => NativeType::Int8,
            DataType::TinyIntUnsigned => NativeType::UInt8,
            DataType::SmallInt => NativeType::Int16,
            DataType::SmallIntUnsigned => NativeType::UInt16,
            DataType::MediumInt | DataType::Int => NativeType::Int32,
            DataType::MediumIntUnsigned | DataType::IntUnsigned => NativeType::UInt32,
            DataType::BigInt => NativeType::Int64,
            DataType::BigIntUnsigned => NativeType::UInt64,
            DataType::Float => NativeType::Float32,
            DataType::Double => NativeType::Float64,
            DataType::Enum
            | DataType::Date
            | DataType::Time
            | DataType::DateTime
            | DataType::Timestamp
            | DataType::CharN
            | DataType::VarCharN
            | DataType::Decimal => NativeType::String,
            DataType::TinyBlob
            | DataType::MediumBlob
            | DataType::Blob
            | DataType::LongBlob
            | DataType::Binary => NativeType::Bytes,
        }
    }

    pub fn is_numeric(&self) -> bool {
        matches!(
            self.native_type(),
            NativeType::Int8
                | NativeType::UInt8
                | NativeType::Int16
                | NativeType::UInt16
                | NativeType::Int32
                | NativeType::UInt32
                | NativeType::Int64
                | NativeType::UInt64
                | NativeType::Float32
                | NativeType::Float64
        )
    }

    pub fn is_blob(&self) -> bool {
        self.native_type() == NativeType::Bytes
    }
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            DataType::Unknown => "unknown",
            DataType::Boolean => "boolean",
            DataType::TinyInt => "tinyint",
            DataType::TinyIntUnsigned => "tinyint unsigned",
            DataType::SmallInt => "smallint",
            DataType::SmallIntUnsigned => "smallint unsigned",
            DataType::MediumInt => "mediumint",
            DataType::MediumIntUnsigned => "mediumint unsigned",
            DataType::Int => "int",
            DataType::IntUnsigned => "int unsigned",
            DataType::BigInt => "bigint",
            DataType::BigIntUnsigned => "bigint unsigned",
            DataType::Enum => "enum",
            DataType::Date => "date",
            DataType::Time => "time",
            DataType::DateTime => "datetime",
            DataType::Timestamp => "timestamp",
            DataType::CharN => "char",
            DataType::VarCharN => "varchar",
            DataType::Float => "float",
            DataType::Double => "double",
            DataType::Decimal => "decimal",
            DataType::TinyBlob => "tinyblob",
            DataType::MediumBlob => "mediumblob",
            DataType::Blob => "blob",
            DataType::LongBlob => "longblob",
            DataType::Binary => "binary",
        };
        write!(f, "{}", name)
    }
}

/// Parse a declared SQL type such as `int unsigned`, `varchar(64)` or `enum('a','b')`
impl FromStr for DataType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let declared = s.trim().to_lowercase();
        let unsigned = declared.ends_with("unsigned");
        let base = declared
            .split(|c: char| c == '(' || c.is_whitespace())
            .next()
            .unwrap_or_default();
        let data_type = match (base, unsigned) {
            ("bool" | "boolean", _) => DataType::Boolean,
            ("tinyint", false) => DataType::TinyInt,
            ("tinyint", true) => DataType::TinyIntUnsigned,
            ("smallint", false) => DataType::SmallInt,
            ("smallint", true) => DataType::SmallIntUnsigned,
            ("mediumint", false) => DataType::MediumInt,
            ("mediumint", true) => DataType::MediumIntUnsigned,
            ("int" | "integer", false) => DataType::Int,
            ("int" | "integer", true) => DataType::IntUnsigned,
            ("bigint", false) => DataType::BigInt,
            ("bigint", true) => DataType::BigIntUnsigned,
            ("enum", _) => DataType::Enum,
            ("date", _) => DataType::Date,
            ("time", _) => DataType::Time,
            ("datetime", _) => DataType::DateTime,
            ("timestamp", _) => DataType::Timestamp,
            ("char", _) => DataType::CharN,
            ("varchar" | "text", _) => DataType::VarCharN,
            ("float", _) => DataType::Float,
            ("double" | "real", _) => DataType::Double,
            ("decimal" | "numeric", _) => DataType::Decimal,
            ("tinyblob", _) => DataType::TinyBlob,
            ("mediumblob", _) => DataType::MediumBlob,
            ("blob", _) => DataType::Blob,
            ("longblob", _) => DataType::LongBlob,
            ("binary" | "varbinary", _) => DataType::Binary,
            _ => return Err(Error::invalid_data_type(s)),
        };
        Ok(data_type)
    }
}
