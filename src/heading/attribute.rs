use colored::Colorize;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::data_type::DataType;

/// An attribute of a heading
///
/// An attribute either maps to a plain column or, when it carries an `sql_expression`,
/// is computed (or renamed) and only exists once it has been produced by a SELECT.
#[derive(Clone, Debug, Hash, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attribute {
    name: String,
    data_type: DataType,
    in_key: bool,
    nullable: bool,
    comment: String,
    sql_expression: Option<String>,
}

impl Attribute {
    /// Constructor
    pub fn new<S: Into<String>>(name: S, data_type: DataType) -> Attribute {
        Attribute {
            name: name.into(),
            data_type,
            in_key: false,
            nullable: false,
            comment: String::new(),
            sql_expression: None,
        }
    }

    /// A primary key attribute
    pub fn key<S: Into<String>>(name: S, data_type: DataType) -> Attribute {
        Attribute::new(name, data_type).with_in_key(true)
    }

    /// A secondary attribute computed from an SQL expression
    pub fn computed<S: Into<String>, E: Into<String>>(name: S, sql_expression: E) -> Attribute {
        Attribute::new(name, DataType::Unknown).with_sql_expression(Some(sql_expression.into()))
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn data_type(&self) -> DataType {
        self.data_type
    }

    pub fn in_key(&self) -> bool {
        self.in_key
    }

    pub fn nullable(&self) -> bool {
        self.nullable
    }

    pub fn comment(&self) -> &str {
        &self.comment
    }

    pub fn sql_expression(&self) -> Option<&str> {
        self.sql_expression.as_deref()
    }

    /// True if the attribute is renamed or computed
    pub fn is_computed(&self) -> bool {
        self.sql_expression.is_some()
    }

    pub fn with_name<S: Into<String>>(self, name: S) -> Attribute {
        Attribute {
            name: name.into(),
            ..self
        }
    }

    pub fn with_in_key(self, in_key: bool) -> Attribute {
        Attribute { in_key, ..self }
    }

    pub fn with_nullable(self, nullable: bool) -> Attribute {
        Attribute { nullable, ..self }
    }

    pub fn with_comment<S: Into<String>>(self, comment: S) -> Attribute {
        Attribute {
            comment: comment.into(),
            ..self
        }
    }

    pub fn with_sql_expression(self, sql_expression: Option<String>) -> Attribute {
        Attribute {
            sql_expression,
            ..self
        }
    }

    /// The SELECT item producing this attribute
    pub fn as_sql(&self) -> String {
        match &self.sql_expression {
            Some(expression) => format!("{} as `{}`", expression, self.name),
            None => format!("`{}`", self.name),
        }
    }
}

impl fmt::Display for Attribute {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = if self.in_key {
            self.name.bold().to_string()
        } else {
            self.name.clone()
        };
        match &self.sql_expression {
            Some(expression) => write!(f, "{}: {} = {}", name, self.data_type, expression.yellow()),
            None => write!(f, "{}: {}", name, self.data_type),
        }
    }
}

impl<S: Into<String>> From<(S, DataType)> for Attribute {
    fn from((name, data_type): (S, DataType)) -> Self {
        Attribute::new(name, data_type)
    }
}
