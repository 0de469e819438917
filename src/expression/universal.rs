//! # Universal sets
//!
//! `U(a, b)` stands for every combination of values of the attributes `a` and `b`.
//! It has no source and cannot be compiled on its own, but restricting, joining or
//! aggregating with it derives useful expressions:
//!
//! - `U(a, b) & e` is the set of distinct `(a, b)` in `e`,
//! - `e * U(a, b)` is `e` with `a` and `b` promoted to its primary key,
//! - `U(a).aggr(e, ..)` aggregates `e` per distinct `a`, and `U().aggr(e, ..)` over all of `e`.
//!

use itertools::Itertools;
use std::{fmt, ops, sync::Arc};

use super::{Error, Expression, GroupBy, Join, Projection, Result, Variant};
use crate::{condition::Condition, heading::Selection};

/// A universal set over some attributes
#[derive(Clone, Debug, Default, Hash, PartialEq, Eq)]
pub struct U {
    primary_key: Vec<String>,
}

impl U {
    pub fn new<S: Into<String>, I: IntoIterator<Item = S>>(primary_key: I) -> Self {
        U {
            primary_key: primary_key.into_iter().map(Into::into).collect(),
        }
    }

    pub fn primary_key(&self) -> &[String] {
        &self.primary_key
    }

    /// The distinct combinations of the attributes found in an expression
    pub fn restrict<C: Into<Condition>>(&self, condition: C) -> Result<Expression> {
        match condition.into() {
            Condition::Expression(expression) => {
                if self.primary_key.is_empty() {
                    return Err(Error::invalid_restriction_type(
                        "A universal set without attributes cannot be restricted",
                    ));
                }
                let selection = Selection {
                    attributes: self.primary_key.clone(),
                    ..Selection::default()
                };
                let result = expression.select(&selection)?;
                let heading = result.heading().set_primary_key(&self.primary_key)?;
                Ok(result.with_heading(heading).with_distinct(true))
            }
            condition => Err(Error::invalid_restriction_type(format!(
                "A universal set can only be restricted by a query expression, not {}",
                condition
            ))),
        }
    }

    /// Promote the attributes to the primary key of `expression`
    pub fn join(&self, expression: &Expression) -> Result<Expression> {
        let heading = expression
            .heading()
            .extend_primary_key(&self.primary_key)?;
        Ok(expression.clone().with_heading(heading))
    }

    /// Aggregate `group` per distinct combination of the attributes
    ///
    /// Without attributes the result has a single element aggregating the whole group.
    pub fn aggr(&self, group: &Expression, projection: Projection) -> Result<Expression> {
        if self.primary_key.is_empty() {
            let group = if group.is_group_by() || group.distinct() {
                Expression::subquery(Arc::new(group.clone()))
            } else {
                group.clone()
            };
            let selection = projection.resolve(group.heading(), &[], &[])?;
            let result = group.select(&selection)?;
            let heading = result.heading().set_primary_key::<&str>(&[])?;
            Ok(result.with_heading(heading))
        } else {
            let primary_key = self.primary_key.iter().map(String::as_str).collect_vec();
            Ok(GroupBy::from_input(Join::argument(group), &primary_key, &[], &projection)?.into())
        }
    }
}

impl fmt::Display for U {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "U({})", self.primary_key.iter().join(", "))
    }
}

impl<C: Into<Condition>> ops::BitAnd<C> for &U {
    type Output = Result<Expression>;

    fn bitand(self, condition: C) -> Self::Output {
        self.restrict(condition)
    }
}

impl ops::Mul<&Expression> for &U {
    type Output = Result<Expression>;

    fn mul(self, expression: &Expression) -> Self::Output {
        self.join(expression)
    }
}
