//! # Restriction conditions
//!
//! A [`Condition`] is any value an entity set can be restricted by: a boolean, an SQL fragment,
//! attribute equalities, a disjunction, an [`AndList`], another [`Expression`] or a negation.
//! [`Condition::compile`] renders it against a [`Heading`] into a [`Predicate`]:
//! either a literal truth value or an SQL boolean expression.
//!

pub mod attributes;

use colored::Colorize;
use itertools::Itertools;
use std::{
    collections::BTreeSet,
    error, fmt, ops,
    result,
    sync::Arc,
};

use crate::{
    data_type::Value,
    expression::{self, Expression, Variant as _},
    heading::{self, Heading},
    namer::Aliases,
};

// Error management

#[derive(Debug, Clone, PartialEq)]
pub enum Error {
    AttributeNotFound(String),
    JoinCompatibility(String),
    InvalidRestrictionType(String),
    Other(String),
}

impl Error {
    pub fn attribute_not_found(name: impl fmt::Display) -> Error {
        Error::AttributeNotFound(format!("Attribute `{}` is not found in query", name))
    }
    pub fn join_compatibility(name: impl fmt::Display) -> Error {
        Error::JoinCompatibility(format!(
            "Cannot join query expressions on dependent attribute `{}`",
            name
        ))
    }
    pub fn invalid_restriction_type(desc: impl fmt::Display) -> Error {
        Error::InvalidRestrictionType(format!("{}", desc))
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::AttributeNotFound(desc) => writeln!(f, "AttributeNotFound: {}", desc),
            Error::JoinCompatibility(desc) => writeln!(f, "JoinCompatibility: {}", desc),
            Error::InvalidRestrictionType(desc) => writeln!(f, "InvalidRestrictionType: {}", desc),
            Error::Other(err) => writeln!(f, "{}", err),
        }
    }
}

impl error::Error for Error {}

impl From<heading::Error> for Error {
    fn from(err: heading::Error) -> Self {
        match err {
            heading::Error::AttributeNotFound(desc) => Error::AttributeNotFound(desc),
            err => Error::Other(err.to_string()),
        }
    }
}

impl From<expression::Error> for Error {
    fn from(err: expression::Error) -> Self {
        match err {
            expression::Error::AttributeNotFound(desc) => Error::AttributeNotFound(desc),
            expression::Error::JoinCompatibility(desc) => Error::JoinCompatibility(desc),
            expression::Error::InvalidRestrictionType(desc) => Error::InvalidRestrictionType(desc),
            err => Error::Other(err.to_string()),
        }
    }
}

impl From<sqlparser::tokenizer::TokenizerError> for Error {
    fn from(err: sqlparser::tokenizer::TokenizerError) -> Self {
        Error::Other(err.to_string())
    }
}

pub type Result<T> = result::Result<T, Error>;

/// Two headings can be joined (or matched) only on attributes that are in the key of at least one of them
pub fn assert_join_compatibility(left: &Heading, right: &Heading) -> Result<()> {
    let right_secondary = right.secondary_attributes();
    match left
        .secondary_attributes()
        .into_iter()
        .find(|name| right_secondary.contains(name))
    {
        Some(name) => Err(Error::join_compatibility(name)),
        None => Ok(()),
    }
}

/// A compiled condition
#[derive(Clone, Debug, Hash, PartialEq, Eq)]
pub enum Predicate {
    Literal(bool),
    Sql(String),
}

impl Predicate {
    pub fn is_true(&self) -> bool {
        matches!(self, Predicate::Literal(true))
    }

    pub fn is_false(&self) -> bool {
        matches!(self, Predicate::Literal(false))
    }

    pub fn to_sql(&self) -> String {
        match self {
            Predicate::Literal(true) => "TRUE".to_string(),
            Predicate::Literal(false) => "FALSE".to_string(),
            Predicate::Sql(sql) => sql.clone(),
        }
    }
}

impl fmt::Display for Predicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_sql())
    }
}

/// `(a) AND (b)`, or `NOT ((a) AND (b))` when negated
fn conjunction<S: AsRef<str>>(items: &[S], negate: bool) -> String {
    let items = items.iter().map(AsRef::as_ref).join(") AND (");
    if negate {
        format!("NOT (({}))", items)
    } else {
        format!("({})", items)
    }
}

/// A restriction
#[derive(Clone, Debug, PartialEq)]
pub enum Condition {
    /// Always true or always false
    Bool(bool),
    /// An SQL boolean expression, `TRUE` and `FALSE` are recognized as literals
    Sql(String),
    /// Attributes equal to values, attributes absent from the restricted heading are ignored
    Equality(Vec<(String, Value)>),
    /// Any of the conditions, an empty disjunction is false
    Or(Vec<Condition>),
    /// All of the conditions, an empty conjunction is true
    And(AndList),
    /// Matches the elements of an entity set on the shared attributes
    Expression(Arc<Expression>),
    /// Negation
    Not(Box<Condition>),
}

impl Condition {
    pub fn sql<S: Into<String>>(sql: S) -> Condition {
        Condition::Sql(sql.into())
    }

    pub fn equality<S: Into<String>, V: Into<Value>, I: IntoIterator<Item = (S, V)>>(
        pairs: I,
    ) -> Condition {
        Condition::Equality(
            pairs
                .into_iter()
                .map(|(name, value)| (name.into(), value.into()))
                .collect(),
        )
    }

    pub fn or<I: IntoIterator<Item = Condition>>(conditions: I) -> Condition {
        Condition::Or(conditions.into_iter().collect())
    }

    pub fn and<I: IntoIterator<Item = Condition>>(conditions: I) -> Condition {
        Condition::And(conditions.into_iter().collect())
    }

    pub fn not(condition: Condition) -> Condition {
        Condition::Not(Box::new(condition))
    }

    /// The absent restriction, restricting by it yields the empty set
    pub fn none() -> Condition {
        Condition::Or(vec![])
    }

    /// Compile the condition into a predicate over the attributes of `heading`
    pub fn compile(&self, heading: &Heading, aliases: &Aliases) -> Result<Predicate> {
        self.compile_with_negation(heading, aliases, false)
    }

    fn compile_with_negation(
        &self,
        heading: &Heading,
        aliases: &Aliases,
        negate: bool,
    ) -> Result<Predicate> {
        let not = if negate { "NOT " } else { "" };
        match self {
            Condition::Not(condition) => {
                condition.compile_with_negation(heading, aliases, !negate)
            }
            Condition::Bool(value) => Ok(Predicate::Literal(negate != *value)),
            Condition::Sql(sql) => {
                let sql = sql.trim();
                if sql.eq_ignore_ascii_case("true") {
                    Ok(Predicate::Literal(!negate))
                } else if sql.eq_ignore_ascii_case("false") {
                    Ok(Predicate::Literal(negate))
                } else if negate {
                    Ok(Predicate::Sql(format!("NOT ({})", sql)))
                } else {
                    Ok(Predicate::Sql(sql.to_string()))
                }
            }
            Condition::Equality(pairs) => {
                let equalities = pairs
                    .iter()
                    .filter(|(name, _)| heading.contains(name))
                    .map(|(name, value)| {
                        if value.is_null() {
                            format!("`{}` IS NULL", name)
                        } else {
                            format!("`{}`={}", name, value.to_sql())
                        }
                    })
                    .collect_vec();
                if equalities.is_empty() {
                    Ok(Predicate::Literal(!negate))
                } else {
                    Ok(Predicate::Sql(conjunction(&equalities, negate)))
                }
            }
            Condition::And(conditions) => {
                let mut items = vec![];
                for condition in conditions.iter() {
                    match condition.compile_with_negation(heading, aliases, false)? {
                        Predicate::Literal(true) => {}
                        Predicate::Literal(false) => return Ok(Predicate::Literal(negate)),
                        Predicate::Sql(sql) => items.push(sql),
                    }
                }
                if items.is_empty() {
                    Ok(Predicate::Literal(!negate))
                } else {
                    Ok(Predicate::Sql(conjunction(&items, negate)))
                }
            }
            Condition::Or(conditions) => {
                let mut items = vec![];
                for condition in conditions {
                    match condition.compile_with_negation(heading, aliases, false)? {
                        Predicate::Literal(false) => {}
                        Predicate::Literal(true) => return Ok(Predicate::Literal(!negate)),
                        Predicate::Sql(sql) => items.push(sql),
                    }
                }
                if items.is_empty() {
                    Ok(Predicate::Literal(negate))
                } else if negate {
                    Ok(Predicate::Sql(format!("NOT (({}))", items.iter().join(") OR ("))))
                } else {
                    Ok(Predicate::Sql(format!("({})", items.iter().join(") OR ("))))
                }
            }
            Condition::Expression(expression) => {
                assert_join_compatibility(heading, expression.heading())?;
                let operand = if expression.is_group_by() {
                    Arc::new(Expression::subquery(expression.clone()))
                } else {
                    expression.clone()
                };
                let common = heading
                    .names()
                    .into_iter()
                    .filter(|name| operand.heading().contains(name))
                    .collect_vec();
                if common.is_empty() {
                    Ok(Predicate::Sql(format!(
                        "{}EXISTS ({})",
                        not,
                        operand.make_sql_with(aliases)?
                    )))
                } else {
                    Ok(Predicate::Sql(format!(
                        "({}) {}IN ({})",
                        common.iter().map(|name| format!("`{}`", name)).join(","),
                        not,
                        operand.make_select(&common, aliases)?
                    )))
                }
            }
        }
    }

    /// The attributes of `heading` this condition refers to, or unknown attributes named in SQL text
    pub fn attributes(&self, heading: &Heading) -> Result<BTreeSet<String>> {
        Ok(match self {
            Condition::Bool(_) => BTreeSet::new(),
            Condition::Sql(sql) => attributes::attribute_names(sql)?,
            Condition::Equality(pairs) => pairs
                .iter()
                .filter(|(name, _)| heading.contains(name))
                .map(|(name, _)| name.clone())
                .collect(),
            Condition::Or(conditions) => conditions
                .iter()
                .map(|condition| condition.attributes(heading))
                .collect::<Result<Vec<_>>>()?
                .into_iter()
                .flatten()
                .collect(),
            Condition::And(conditions) => conditions.attributes(heading)?,
            Condition::Expression(expression) => heading
                .names()
                .into_iter()
                .filter(|name| expression.heading().contains(name))
                .map(String::from)
                .collect(),
            Condition::Not(condition) => condition.attributes(heading)?,
        })
    }
}

impl Condition {
    /// The attributes of `heading` matched by equalities or entity sets
    ///
    /// Unlike SQL text, these conditions compile differently once the attributes leave the heading.
    pub fn matched_attributes(&self, heading: &Heading) -> BTreeSet<String> {
        match self {
            Condition::Bool(_) | Condition::Sql(_) => BTreeSet::new(),
            Condition::Or(conditions) => conditions
                .iter()
                .flat_map(|condition| condition.matched_attributes(heading))
                .collect(),
            Condition::And(conditions) => conditions.matched_attributes(heading),
            Condition::Not(condition) => condition.matched_attributes(heading),
            Condition::Equality(_) | Condition::Expression(_) => {
                self.attributes(heading).unwrap_or_default()
            }
        }
    }
}

impl fmt::Display for Condition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Condition::Bool(value) => write!(f, "{}", value.to_string().to_uppercase().bold()),
            Condition::Sql(sql) => write!(f, "{}", sql),
            Condition::Equality(pairs) => write!(
                f,
                "{{{}}}",
                pairs
                    .iter()
                    .map(|(name, value)| format!("{}: {}", name, value))
                    .join(", ")
            ),
            Condition::Or(conditions) => write!(f, "[{}]", conditions.iter().join(", ")),
            Condition::And(conditions) => write!(f, "{}", conditions),
            Condition::Expression(expression) => {
                write!(f, "{} {}", "MATCHES".blue(), expression.heading())
            }
            Condition::Not(condition) => write!(f, "{} ({})", "NOT".red(), condition),
        }
    }
}

impl ops::Not for Condition {
    type Output = Condition;

    fn not(self) -> Self::Output {
        Condition::not(self)
    }
}

impl From<bool> for Condition {
    fn from(value: bool) -> Self {
        Condition::Bool(value)
    }
}

impl From<&str> for Condition {
    fn from(sql: &str) -> Self {
        Condition::Sql(sql.to_string())
    }
}

impl From<String> for Condition {
    fn from(sql: String) -> Self {
        Condition::Sql(sql)
    }
}

/// A sequence of conditions is a disjunction
impl From<Vec<Condition>> for Condition {
    fn from(conditions: Vec<Condition>) -> Self {
        Condition::Or(conditions)
    }
}

impl From<AndList> for Condition {
    fn from(conditions: AndList) -> Self {
        Condition::And(conditions)
    }
}

impl From<Expression> for Condition {
    fn from(expression: Expression) -> Self {
        Condition::Expression(Arc::new(expression))
    }
}

impl From<Arc<Expression>> for Condition {
    fn from(expression: Arc<Expression>) -> Self {
        Condition::Expression(expression)
    }
}

impl<C: Into<Condition>> From<Option<C>> for Condition {
    fn from(condition: Option<C>) -> Self {
        condition.map_or_else(Condition::none, Into::into)
    }
}

/// A conjunction of conditions
#[derive(Clone, Debug, Default, PartialEq)]
pub struct AndList(Vec<Condition>);

impl AndList {
    pub fn new(conditions: Vec<Condition>) -> Self {
        AndList(conditions)
    }

    pub fn push<C: Into<Condition>>(&mut self, condition: C) {
        self.0.push(condition.into())
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Condition> {
        self.0.iter()
    }

    /// Compile as a conjunction
    pub fn compile(&self, heading: &Heading, aliases: &Aliases) -> Result<Predicate> {
        Condition::And(self.clone()).compile(heading, aliases)
    }

    pub fn matched_attributes(&self, heading: &Heading) -> BTreeSet<String> {
        self.iter()
            .flat_map(|condition| condition.matched_attributes(heading))
            .collect()
    }

    pub fn attributes(&self, heading: &Heading) -> Result<BTreeSet<String>> {
        Ok(self
            .iter()
            .map(|condition| condition.attributes(heading))
            .collect::<Result<Vec<_>>>()?
            .into_iter()
            .flatten()
            .collect())
    }
}

impl fmt::Display for AndList {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}",
            self.iter()
                .map(|condition| format!("({})", condition))
                .join(&format!(" {} ", "AND".blue()))
        )
    }
}

impl<C: Into<Condition>> FromIterator<C> for AndList {
    fn from_iter<I: IntoIterator<Item = C>>(iter: I) -> Self {
        AndList(iter.into_iter().map(Into::into).collect())
    }
}

impl<C: Into<Condition>> Extend<C> for AndList {
    fn extend<I: IntoIterator<Item = C>>(&mut self, iter: I) {
        self.0.extend(iter.into_iter().map(Into::into))
    }
}

impl IntoIterator for AndList {
    type Item = Condition;
    type IntoIter = <Vec<Condition> as IntoIterator>::IntoIter;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        builder::{Ready, With},
        data_type::DataType,
    };

    fn person() -> Heading {
        Heading::builder()
            .key("id", DataType::Int)
            .with(("name", DataType::VarCharN))
            .with(("age", DataType::TinyIntUnsigned))
            .build()
    }

    fn compile<C: Into<Condition>>(condition: C) -> Predicate {
        let predicate = condition
            .into()
            .compile(&person(), &Aliases::new())
            .unwrap();
        println!("predicate = {}", predicate);
        predicate
    }

    #[test]
    fn test_literals() {
        assert!(compile(true).is_true());
        assert!(compile(false).is_false());
        assert!(compile(" TRUE ").is_true());
        assert!(compile("false").is_false());
        assert!(compile(!Condition::sql("TRUE")).is_false());
        assert!(compile(Condition::none()).is_false());
        assert!(compile(!Condition::none()).is_true());
        assert!(compile(Condition::or(vec![])).is_false());
        assert!(compile(AndList::default()).is_true());
        assert!(compile(!Condition::from(AndList::default())).is_false());
    }

    #[test]
    fn test_sql() {
        assert_eq!(compile("age > 30"), Predicate::Sql("age > 30".into()));
        assert_eq!(compile(!Condition::sql("age > 30")), Predicate::Sql("NOT (age > 30)".into()));
        assert_eq!(compile(!!Condition::sql("age > 30")), Predicate::Sql("age > 30".into()));
    }

    #[test]
    fn test_and_or() {
        let and: AndList = ["age > 30", "name = 'Bob'"].into_iter().collect();
        assert_eq!(
            compile(and.clone()),
            Predicate::Sql("(age > 30) AND (name = 'Bob')".into())
        );
        assert_eq!(
            compile(!Condition::from(and)),
            Predicate::Sql("NOT ((age > 30) AND (name = 'Bob'))".into())
        );
        let with_true: AndList = [Condition::Bool(true), Condition::sql("age > 30")]
            .into_iter()
            .collect();
        assert_eq!(compile(with_true), Predicate::Sql("(age > 30)".into()));
        let with_false: AndList = [Condition::Bool(false), Condition::sql("age > 30")]
            .into_iter()
            .collect();
        assert!(compile(with_false).is_false());
        let or = Condition::or([Condition::sql("age > 30"), Condition::sql("age < 10")]);
        assert_eq!(compile(or.clone()), Predicate::Sql("(age > 30) OR (age < 10)".into()));
        assert_eq!(
            compile(!or),
            Predicate::Sql("NOT ((age > 30) OR (age < 10))".into())
        );
        let or_true = Condition::or([Condition::sql("age > 30"), Condition::Bool(true)]);
        assert!(compile(or_true).is_true());
    }

    #[test]
    fn test_equality() {
        let condition = Condition::equality([
            ("id", Value::from(3)),
            ("name", Value::from("O'Brien")),
            ("species", Value::from("cat")),
        ]);
        assert_eq!(
            compile(condition),
            Predicate::Sql("(`id`=3) AND (`name`='O''Brien')".into())
        );
        assert_eq!(
            compile(Condition::equality([("age", Value::Null)])),
            Predicate::Sql("(`age` IS NULL)".into())
        );
        assert!(compile(Condition::equality([("species", "cat")])).is_true());
        assert!(compile(!Condition::equality([("species", "cat")])).is_false());
        assert_eq!(
            compile(!Condition::equality([("id", 1), ("age", 30)])),
            Predicate::Sql("NOT ((`id`=1) AND (`age`=30))".into())
        );
        assert_eq!(
            compile(!Condition::equality([("id", 1)])),
            Predicate::Sql("NOT ((`id`=1))".into())
        );
    }

    #[test]
    fn test_attributes() {
        let condition = Condition::and([
            Condition::sql("age > 30"),
            !Condition::equality([("id", 1), ("weight", 2)]),
            Condition::or([Condition::sql("`name` like 'A%'")]),
        ]);
        let attributes = condition.attributes(&person()).unwrap();
        assert_eq!(
            attributes.into_iter().collect_vec(),
            vec!["age", "id", "name"]
        );
    }

    #[test]
    fn test_join_compatibility() {
        let other = Heading::builder()
            .key("pet_id", DataType::Int)
            .with(("name", DataType::VarCharN))
            .build();
        assert!(matches!(
            assert_join_compatibility(&person(), &other),
            Err(Error::JoinCompatibility(_))
        ));
        let keyed = Heading::builder()
            .key("name", DataType::VarCharN)
            .with(("color", DataType::VarCharN))
            .build();
        assert!(assert_join_compatibility(&person(), &keyed).is_ok());
    }
}
