use log::debug;
use std::{fmt, sync::Arc};

use super::{display_sql, same_connection, Error, Expression, Properties, Result, Variant};
use crate::{condition::assert_join_compatibility, io::Connection, namer::Aliases};

/// A natural join of two expressions
#[derive(Clone, Debug, PartialEq)]
pub struct Join {
    properties: Properties,
    left: Arc<Expression>,
    right: Arc<Expression>,
    /// Keep the rows of `left` without match
    keep_all_rows: bool,
}

impl Join {
    /// Join two expressions
    ///
    /// The arguments must only share attributes that are in the key of one of them and
    /// must originate from the same connection.
    pub fn create(left: &Expression, right: &Expression, keep_all_rows: bool) -> Result<Join> {
        assert_join_compatibility(left.heading(), right.heading())?;
        if !same_connection(left.connection(), right.connection()) {
            return Err(Error::connection_mismatch());
        }
        let left = Join::argument(left);
        let right = Join::argument(right);
        let mut properties = Properties::new(left.heading().join(right.heading()));
        properties.distinct = left.distinct() || right.distinct();
        Ok(Join {
            properties,
            left,
            right,
            keep_all_rows,
        })
    }

    /// The argument as it enters the FROM clause of a join
    ///
    /// Aggregations, unions, restricted and projected expressions cannot be joined on their
    /// raw FROM clause and are wrapped in a subquery.
    pub fn argument(expression: &Expression) -> Arc<Expression> {
        if expression.is_group_by()
            || expression.is_union()
            || !expression.restriction().is_empty()
            || expression.projected()
        {
            debug!("Join argument requires a subquery");
            Arc::new(Expression::subquery(Arc::new(expression.clone())))
        } else {
            Arc::new(expression.clone())
        }
    }

    pub fn left(&self) -> &Expression {
        &self.left
    }

    pub fn right(&self) -> &Expression {
        &self.right
    }

    pub fn keep_all_rows(&self) -> bool {
        self.keep_all_rows
    }
}

impl fmt::Display for Join {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        display_sql(&self.clone().into(), f)
    }
}

impl Variant for Join {
    fn properties(&self) -> &Properties {
        &self.properties
    }

    fn properties_mut(&mut self) -> &mut Properties {
        &mut self.properties
    }

    fn inputs(&self) -> Vec<&Expression> {
        vec![&self.left, &self.right]
    }

    fn connection(&self) -> Option<&Arc<dyn Connection>> {
        self.left.connection()
    }

    fn from_clause(&self, aliases: &Aliases) -> Result<String> {
        let left = self.left.from_clause(aliases)?;
        let right = self.right.from_clause(aliases)?;
        Ok(format!(
            "{} NATURAL{} JOIN {}",
            left,
            if self.keep_all_rows { " LEFT" } else { "" },
            right
        ))
    }
}
