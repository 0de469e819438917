//! # Query expressions
//!
//! An [`Expression`] is the lazy representation of an entity set.
//! Operators (restriction, projection, join, union, aggregation) derive new expressions
//! and never modify their inputs. The tree is only compiled into a single SQL `SELECT`
//! statement when [`Expression::make_sql`] is called.
//!
//! A node wraps its input in a subquery only when the SQL of the input could not be extended
//! in place, typically when a later clause would refer to an alias not yet in scope.
//!

pub mod group_by;
pub mod join;
pub mod projection;
pub mod sql;
pub mod subquery;
pub mod table;
pub mod union;
pub mod universal;

use colored::Colorize;
use log::debug;
use std::{error, fmt, ops, result, sync::Arc};

use crate::{
    condition::{self, AndList, Condition},
    heading::{self, Attribute, Heading, Selection},
    io::Connection,
    namer::Aliases,
};
pub use group_by::GroupBy;
pub use join::Join;
pub use projection::Projection;
pub use subquery::Subquery;
pub use table::{Table, TableBuilder, WithHeading, WithoutHeading};
pub use union::Union;
pub use universal::U;

// Error management

#[derive(Debug, Clone, PartialEq)]
pub enum Error {
    AttributeNotFound(String),
    PrimaryKeyExclusion(String),
    JoinCompatibility(String),
    ConnectionMismatch(String),
    UnionIncompatibility(String),
    SecondaryAttribute(String),
    InvalidRestrictionType(String),
    InvalidProjection(String),
    Other(String),
}

impl Error {
    pub fn attribute_not_found(name: impl fmt::Display) -> Error {
        Error::AttributeNotFound(format!("Attribute `{}` is not found in query", name))
    }
    pub fn primary_key_exclusion(name: impl fmt::Display) -> Error {
        Error::PrimaryKeyExclusion(format!("Cannot exclude primary key attribute `{}`", name))
    }
    pub fn connection_mismatch() -> Error {
        Error::ConnectionMismatch(
            "Cannot operate on query expressions from different connections".to_string(),
        )
    }
    pub fn union_incompatibility(desc: impl fmt::Display) -> Error {
        Error::UnionIncompatibility(format!("{}", desc))
    }
    pub fn secondary_attribute(name: impl fmt::Display) -> Error {
        Error::SecondaryAttribute(format!(
            "Union arguments must not have any secondary attributes, found `{}`",
            name
        ))
    }
    pub fn invalid_restriction_type(desc: impl fmt::Display) -> Error {
        Error::InvalidRestrictionType(format!("{}", desc))
    }
    pub fn invalid_projection(desc: impl fmt::Display) -> Error {
        Error::InvalidProjection(format!("{}", desc))
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::AttributeNotFound(desc) => writeln!(f, "AttributeNotFound: {}", desc),
            Error::PrimaryKeyExclusion(desc) => writeln!(f, "PrimaryKeyExclusion: {}", desc),
            Error::JoinCompatibility(desc) => writeln!(f, "JoinCompatibility: {}", desc),
            Error::ConnectionMismatch(desc) => writeln!(f, "ConnectionMismatch: {}", desc),
            Error::UnionIncompatibility(desc) => writeln!(f, "UnionIncompatibility: {}", desc),
            Error::SecondaryAttribute(desc) => writeln!(f, "SecondaryAttribute: {}", desc),
            Error::InvalidRestrictionType(desc) => {
                writeln!(f, "InvalidRestrictionType: {}", desc)
            }
            Error::InvalidProjection(desc) => writeln!(f, "InvalidProjection: {}", desc),
            Error::Other(err) => writeln!(f, "{}", err),
        }
    }
}

impl error::Error for Error {}

impl From<heading::Error> for Error {
    fn from(err: heading::Error) -> Self {
        match err {
            heading::Error::AttributeNotFound(desc) => Error::AttributeNotFound(desc),
            heading::Error::InvalidHeading(desc) => Error::InvalidProjection(desc),
            heading::Error::Other(desc) => Error::Other(desc),
        }
    }
}

impl From<condition::Error> for Error {
    fn from(err: condition::Error) -> Self {
        match err {
            condition::Error::AttributeNotFound(desc) => Error::AttributeNotFound(desc),
            condition::Error::JoinCompatibility(desc) => Error::JoinCompatibility(desc),
            condition::Error::InvalidRestrictionType(desc) => Error::InvalidRestrictionType(desc),
            condition::Error::Other(desc) => Error::Other(desc),
        }
    }
}

pub type Result<T> = result::Result<T, Error>;

/// The state every expression node carries
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Properties {
    /// The heading of the result
    heading: Heading,
    /// Conditions applied to the input, before the heading is produced
    restriction: AndList,
    /// The result needs a `SELECT DISTINCT`
    distinct: bool,
    /// The heading was derived by a projection and no longer matches the input columns
    projected: bool,
}

impl Properties {
    pub fn new(heading: Heading) -> Self {
        Properties {
            heading,
            ..Properties::default()
        }
    }
}

/// Two optional connections are the same if both are absent or both point to the same object
pub fn same_connection(
    left: Option<&Arc<dyn Connection>>,
    right: Option<&Arc<dyn Connection>>,
) -> bool {
    match (left, right) {
        (None, None) => true,
        (Some(left), Some(right)) => {
            Arc::as_ptr(left) as *const () == Arc::as_ptr(right) as *const ()
        }
        _ => false,
    }
}

/// A trait shared by all expression variants
pub trait Variant: Clone + fmt::Debug + fmt::Display + PartialEq + Into<Expression> {
    /// Return the node state
    fn properties(&self) -> &Properties;
    /// Return a mutable reference to the node state
    fn properties_mut(&mut self) -> &mut Properties;
    /// Return the inputs
    fn inputs(&self) -> Vec<&Expression>;
    /// Return the connection the node originates from
    fn connection(&self) -> Option<&Arc<dyn Connection>>;
    /// Render the FROM clause
    fn from_clause(&self, aliases: &Aliases) -> Result<String>;

    /// Return the Heading
    fn heading(&self) -> &Heading {
        &self.properties().heading
    }
    /// Return the restriction
    fn restriction(&self) -> &AndList {
        &self.properties().restriction
    }
    fn distinct(&self) -> bool {
        self.properties().distinct
    }
    fn projected(&self) -> bool {
        self.properties().projected
    }
    /// Return the primary key attribute names
    fn primary_key(&self) -> Vec<&str> {
        self.heading().primary_key()
    }
}

/// An entity set
#[derive(Clone, Debug, PartialEq)]
pub enum Expression {
    Table(Table),
    Subquery(Subquery),
    Join(Join),
    Union(Union),
    GroupBy(GroupBy),
}

impl Expression {
    /// A builder for tables
    pub fn table() -> TableBuilder<WithoutHeading> {
        TableBuilder::new()
    }

    /// Wrap an expression in a subquery
    pub fn subquery(input: Arc<Expression>) -> Expression {
        Subquery::new(input).into()
    }

    pub fn is_group_by(&self) -> bool {
        matches!(self, Expression::GroupBy(_))
    }

    pub fn is_union(&self) -> bool {
        matches!(self, Expression::Union(_))
    }

    /// Restrict the entity set
    ///
    /// Returns a clone if the condition is always true.
    /// A subquery is introduced when the condition refers to renamed or computed attributes,
    /// except on aggregations where it ends up in the HAVING clause.
    pub fn restrict<C: Into<Condition>>(&self, condition: C) -> Result<Expression> {
        let condition = condition.into();
        let predicate = condition.compile(self.heading(), &Aliases::new())?;
        if predicate.is_true() {
            return Ok(self.clone());
        }
        let attributes = condition.attributes(self.heading())?;
        if let Some(name) = attributes.iter().find(|name| !self.heading().contains(name)) {
            return Err(Error::attribute_not_found(name));
        }
        let need_subquery = !self.is_group_by() && self.any_computed(attributes.iter());
        let mut result = if need_subquery {
            debug!("Restriction on {:?} requires a subquery", attributes);
            Expression::subquery(Arc::new(self.clone()))
        } else {
            self.clone()
        };
        match condition {
            Condition::And(conditions) => result.properties_mut().restriction.extend(conditions),
            condition => result.properties_mut().restriction.push(condition),
        }
        Ok(result)
    }

    /// Restrict by the negation of the condition
    pub fn exclude<C: Into<Condition>>(&self, condition: C) -> Result<Expression> {
        self.restrict(Condition::not(condition.into()))
    }

    /// Natural join
    pub fn join(&self, other: &Expression) -> Result<Expression> {
        Ok(Join::create(self, other, false)?.into())
    }

    /// Natural left join, keeping the rows of `self` without match
    pub fn left_join(&self, other: &Expression) -> Result<Expression> {
        Ok(Join::create(self, other, true)?.into())
    }

    /// Union of two primary key only entity sets
    pub fn union(&self, other: &Expression) -> Result<Expression> {
        Ok(Union::create(self, other)?.into())
    }

    /// Aggregate `group` per element of `self`
    pub fn aggr(&self, group: &Expression, projection: Projection) -> Result<Expression> {
        Ok(GroupBy::create(self, group, projection, false)?.into())
    }

    /// Aggregate `group` per element of `self`, keeping elements of `self` without match
    pub fn aggr_all(&self, group: &Expression, projection: Projection) -> Result<Expression> {
        Ok(GroupBy::create(self, group, projection, true)?.into())
    }

    /// Derive the heading by `selection`, wrapping the expression first if required
    ///
    /// A subquery is required when a renamed or duplicated attribute is itself computed,
    /// when a computation refers to a computed attribute, when the restriction refers
    /// to a computed attribute, or when it matches on an attribute the selection drops.
    pub(crate) fn select(&self, selection: &Selection) -> Result<Expression> {
        let heading = self.heading();
        let selected = heading.select(selection)?;
        let mut need_subquery = self.any_computed(
            selection
                .rename
                .iter()
                .chain(selection.duplicate.iter())
                .map(|(_, old)| old),
        );
        if !need_subquery {
            for (_, expression) in &selection.compute {
                let names = condition::attributes::attribute_names(expression)
                    .map_err(|err| Error::Other(err.to_string()))?;
                need_subquery |= self.any_computed(names.iter());
            }
        }
        if !need_subquery && !self.restriction().is_empty() {
            let attributes = self.restriction().attributes(heading)?;
            need_subquery = self.any_computed(attributes.iter())
                || self
                    .restriction()
                    .matched_attributes(heading)
                    .iter()
                    .any(|name| {
                        selected
                            .attribute(name)
                            .map_or(true, |attribute| attribute.sql_expression().is_some())
                    });
        }
        let mut result = if need_subquery {
            debug!("Projection {:?} requires a subquery", selection);
            let subquery = Expression::subquery(Arc::new(self.clone()));
            let heading = subquery.heading().select(selection)?;
            subquery.with_heading(heading)
        } else {
            self.clone().with_heading(selected)
        };
        result.properties_mut().projected = true;
        Ok(result)
    }

    /// True if one of the named attributes is renamed or computed
    fn any_computed<S: AsRef<str>, I: IntoIterator<Item = S>>(&self, names: I) -> bool {
        names.into_iter().any(|name| {
            self.heading()
                .attribute(name.as_ref())
                .map_or(false, Attribute::is_computed)
        })
    }

    pub(crate) fn with_heading(mut self, heading: Heading) -> Expression {
        self.properties_mut().heading = heading;
        self
    }

    pub(crate) fn with_distinct(mut self, distinct: bool) -> Expression {
        self.properties_mut().distinct = distinct;
        self
    }
}

// Implements the dispatch of Variant and Display to the variants
macro_rules! impl_traits {
    ( $( $Variant:ident ),* ) => {
        impl Variant for Expression {
            fn properties(&self) -> &Properties {
                match self {
                    $(Expression::$Variant(variant) => variant.properties(),)*
                }
            }

            fn properties_mut(&mut self) -> &mut Properties {
                match self {
                    $(Expression::$Variant(variant) => variant.properties_mut(),)*
                }
            }

            fn inputs(&self) -> Vec<&Expression> {
                match self {
                    $(Expression::$Variant(variant) => variant.inputs(),)*
                }
            }

            fn connection(&self) -> Option<&Arc<dyn Connection>> {
                match self {
                    $(Expression::$Variant(variant) => variant.connection(),)*
                }
            }

            fn from_clause(&self, aliases: &Aliases) -> Result<String> {
                match self {
                    $(Expression::$Variant(variant) => variant.from_clause(aliases),)*
                }
            }
        }

        impl fmt::Display for Expression {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                match self {
                    $(Expression::$Variant(variant) => variant.fmt(f),)*
                }
            }
        }

        $(
            impl From<$Variant> for Expression {
                fn from(variant: $Variant) -> Self {
                    Expression::$Variant(variant)
                }
            }

            impl TryFrom<Expression> for $Variant {
                type Error = Error;

                fn try_from(expression: Expression) -> Result<Self> {
                    if let Expression::$Variant(variant) = expression {
                        Ok(variant)
                    } else {
                        Err(Error::Other(format!(
                            "Cannot convert to {}",
                            stringify!($Variant)
                        )))
                    }
                }
            }
        )*
    }
}

impl_traits!(Table, Subquery, Join, Union, GroupBy);

/// Display a variant as its SQL with highlighted keywords
pub(crate) fn display_sql(
    expression: &Expression,
    f: &mut fmt::Formatter<'_>,
) -> fmt::Result {
    let sql = expression.make_sql().map_err(|_| fmt::Error)?;
    let highlighted = [
        "SELECT", "DISTINCT", "FROM", "WHERE", "NATURAL", "LEFT", "JOIN", "UNION", "GROUP BY",
        "HAVING", "EXISTS", "NOT", "IN", "AND", "OR",
    ]
    .iter()
    .fold(sql, |sql, keyword| {
        sql.replace(
            &format!(" {} ", keyword),
            &format!(" {} ", keyword.blue()),
        )
    });
    let highlighted = match highlighted.strip_prefix("SELECT ") {
        Some(rest) => format!("{} {}", "SELECT".blue(), rest),
        None => highlighted,
    };
    write!(f, "{}", highlighted)
}

// Operators

impl<C: Into<Condition>> ops::BitAnd<C> for &Expression {
    type Output = Result<Expression>;

    fn bitand(self, condition: C) -> Self::Output {
        self.restrict(condition)
    }
}

impl<C: Into<Condition>> ops::Sub<C> for &Expression {
    type Output = Result<Expression>;

    fn sub(self, condition: C) -> Self::Output {
        self.exclude(condition)
    }
}

impl ops::Mul<&Expression> for &Expression {
    type Output = Result<Expression>;

    fn mul(self, other: &Expression) -> Self::Output {
        self.join(other)
    }
}

impl ops::Mul<&U> for &Expression {
    type Output = Result<Expression>;

    fn mul(self, universal: &U) -> Self::Output {
        universal.join(self)
    }
}

impl ops::Add<&Expression> for &Expression {
    type Output = Result<Expression>;

    fn add(self, other: &Expression) -> Self::Output {
        self.union(other)
    }
}

impl From<&Expression> for Condition {
    fn from(expression: &Expression) -> Self {
        Condition::Expression(Arc::new(expression.clone()))
    }
}
