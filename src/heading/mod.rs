//! # Headings
//!
//! A [`Heading`] is the schema of an entity set: its ordered attributes, which of them
//! form the primary key and which are computed (or renamed) from an SQL expression.
//!
//! Headings are values: every operator derives a new heading, none is modified in place.
//!

pub mod attribute;

use itertools::Itertools;
use serde::{Deserialize, Serialize};
use std::{collections::HashSet, error, fmt, ops::Deref, result};

use crate::{
    builder::{Ready, With},
    data_type::DataType,
};
pub use attribute::Attribute;

// Error management

#[derive(Debug, Clone, PartialEq)]
pub enum Error {
    AttributeNotFound(String),
    InvalidHeading(String),
    Other(String),
}

impl Error {
    pub fn attribute_not_found(name: impl fmt::Display) -> Error {
        Error::AttributeNotFound(format!("Attribute `{}` is not found", name))
    }
    pub fn invalid_heading(desc: impl fmt::Display) -> Error {
        Error::InvalidHeading(format!("{}", desc))
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::AttributeNotFound(desc) => writeln!(f, "AttributeNotFound: {}", desc),
            Error::InvalidHeading(desc) => writeln!(f, "InvalidHeading: {}", desc),
            Error::Other(err) => writeln!(f, "{}", err),
        }
    }
}

impl error::Error for Error {}

pub type Result<T> = result::Result<T, Error>;

/// Parameters of a heading derivation by projection
///
/// In relational algebra terms: project (`attributes`), rename, and extend
/// (`duplicate`, `compute`). Pairs are `(new_name, source)`.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Selection {
    /// Existing attributes kept under their own name
    pub attributes: Vec<String>,
    /// New name -> existing attribute, the existing attribute is dropped
    pub rename: Vec<(String, String)>,
    /// New name -> existing attribute, the existing attribute may be kept
    pub duplicate: Vec<(String, String)>,
    /// New name -> SQL expression
    pub compute: Vec<(String, String)>,
}

impl Selection {
    /// Names of the existing attributes the selection refers to
    pub fn sources(&self) -> impl Iterator<Item = &str> {
        self.attributes
            .iter()
            .map(String::as_str)
            .chain(self.rename.iter().map(|(_, old)| old.as_str()))
            .chain(self.duplicate.iter().map(|(_, old)| old.as_str()))
    }

    /// Names of the attributes the selection produces
    pub fn targets(&self) -> impl Iterator<Item = &str> {
        self.attributes
            .iter()
            .map(String::as_str)
            .chain(self.rename.iter().map(|(new, _)| new.as_str()))
            .chain(self.duplicate.iter().map(|(new, _)| new.as_str()))
            .chain(self.compute.iter().map(|(new, _)| new.as_str()))
    }
}

/// The heading of an entity set
#[derive(Clone, Debug, Default, Hash, PartialEq, Eq, Serialize, Deserialize)]
pub struct Heading {
    attributes: Vec<Attribute>,
}

impl Heading {
    /// Heading constructor, checking for name collisions
    pub fn try_new(attributes: Vec<Attribute>) -> Result<Self> {
        let mut names = HashSet::new();
        if let Some(attribute) = attributes.iter().find(|a| !names.insert(a.name())) {
            return Err(Error::invalid_heading(format!(
                "Attribute `{}` appears more than once",
                attribute.name()
            )));
        }
        Ok(Heading { attributes })
    }

    /// Create an empty heading
    pub fn empty() -> Self {
        Heading::default()
    }

    /// Builder
    pub fn builder() -> Builder {
        Builder::new()
    }

    // Accessors

    pub fn attributes(&self) -> &[Attribute] {
        &self.attributes
    }

    /// Access an attribute by name
    pub fn attribute(&self, name: &str) -> Result<&Attribute> {
        self.attributes
            .iter()
            .find(|a| a.name() == name)
            .ok_or_else(|| Error::attribute_not_found(name))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.attributes.iter().any(|a| a.name() == name)
    }

    /// All attribute names, in heading order
    pub fn names(&self) -> Vec<&str> {
        self.attributes.iter().map(Attribute::name).collect()
    }

    /// Primary key attribute names, in heading order
    pub fn primary_key(&self) -> Vec<&str> {
        self.attributes
            .iter()
            .filter(|a| a.in_key())
            .map(Attribute::name)
            .collect()
    }

    /// Non-key attribute names, in heading order
    pub fn secondary_attributes(&self) -> Vec<&str> {
        self.attributes
            .iter()
            .filter(|a| !a.in_key())
            .map(Attribute::name)
            .collect()
    }

    /// True if some attribute is renamed or computed
    pub fn has_computed_attributes(&self) -> bool {
        self.attributes.iter().any(Attribute::is_computed)
    }

    /// Fail on the first name that is not in the heading
    pub fn check_names<'a, I: IntoIterator<Item = &'a str>>(&self, names: I) -> Result<()> {
        match names.into_iter().find(|name| !self.contains(name)) {
            Some(name) => Err(Error::attribute_not_found(name)),
            None => Ok(()),
        }
    }

    /// The SELECT list producing this heading
    pub fn as_sql(&self) -> String {
        self.attributes.iter().map(Attribute::as_sql).join(",")
    }

    // Derivations

    /// The heading restricted to `names`, in the order given
    pub fn project<S: AsRef<str>>(&self, names: &[S]) -> Result<Heading> {
        let attributes = names
            .iter()
            .map(|name| self.attribute(name.as_ref()).cloned())
            .collect::<Result<Vec<_>>>()?;
        Heading::try_new(attributes)
    }

    /// Derive a heading by selecting, renaming, duplicating and computing attributes
    ///
    /// Renamed attributes take the place of their source and keep its key membership,
    /// duplicates are secondary, computed attributes are appended as secondary.
    pub fn select(&self, selection: &Selection) -> Result<Heading> {
        self.check_names(selection.sources())?;
        let mut attributes = Vec::new();
        for attribute in &self.attributes {
            let name = attribute.name();
            if selection.attributes.iter().any(|a| a == name) {
                attributes.push(attribute.clone());
            }
            attributes.extend(
                selection
                    .rename
                    .iter()
                    .filter(|(_, old)| old == name)
                    .map(|(new, old)| {
                        attribute
                            .clone()
                            .with_name(new.as_str())
                            .with_sql_expression(Some(format!("`{}`", old)))
                    }),
            );
            attributes.extend(
                selection
                    .duplicate
                    .iter()
                    .filter(|(_, old)| old == name)
                    .map(|(new, old)| {
                        attribute
                            .clone()
                            .with_name(new.as_str())
                            .with_in_key(false)
                            .with_sql_expression(Some(format!("`{}`", old)))
                    }),
            );
        }
        attributes.extend(
            selection
                .compute
                .iter()
                .map(|(new, expression)| Attribute::computed(new.as_str(), expression.as_str())),
        );
        Heading::try_new(attributes)
    }

    /// The heading seen from outside a subquery: every attribute is a plain column
    pub fn make_subquery_heading(&self) -> Heading {
        Heading {
            attributes: self
                .attributes
                .iter()
                .map(|a| a.clone().with_sql_expression(None))
                .collect(),
        }
    }

    /// Join two headings
    ///
    /// Shared attributes appear once, keys of both sides first.
    /// Assumes the two headings share no secondary attribute.
    pub fn join(&self, other: &Heading) -> Heading {
        let self_key = self.primary_key();
        let other_key = other.primary_key();
        let attributes = self
            .attributes
            .iter()
            .filter(|a| a.in_key())
            .chain(
                other
                    .attributes
                    .iter()
                    .filter(|a| a.in_key() && !self_key.contains(&a.name())),
            )
            .chain(
                self.attributes
                    .iter()
                    .filter(|a| !a.in_key() && !other_key.contains(&a.name())),
            )
            .chain(
                other
                    .attributes
                    .iter()
                    .filter(|a| !a.in_key() && !self.contains(a.name())),
            )
            .cloned()
            .collect();
        Heading { attributes }
    }

    /// A heading whose primary key also includes `names`
    pub fn extend_primary_key<S: AsRef<str>>(&self, names: &[S]) -> Result<Heading> {
        self.check_names(names.iter().map(AsRef::as_ref))?;
        Ok(Heading {
            attributes: self
                .attributes
                .iter()
                .map(|a| {
                    let in_key = a.in_key() || names.iter().any(|n| n.as_ref() == a.name());
                    a.clone().with_in_key(in_key)
                })
                .collect(),
        })
    }

    /// A heading whose primary key is exactly `names`, moved to the front in that order
    pub fn set_primary_key<S: AsRef<str>>(&self, names: &[S]) -> Result<Heading> {
        let key = names
            .iter()
            .map(|name| Ok(self.attribute(name.as_ref())?.clone().with_in_key(true)))
            .collect::<Result<Vec<_>>>()?;
        let rest = self
            .attributes
            .iter()
            .filter(|a| !names.iter().any(|n| n.as_ref() == a.name()))
            .map(|a| a.clone().with_in_key(false));
        Heading::try_new(key.into_iter().chain(rest).collect())
    }
}

impl fmt::Display for Heading {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{{{}}}",
            self.attributes.iter().map(|a| format!("{a}")).join(", ")
        )
    }
}

impl Deref for Heading {
    type Target = [Attribute];

    fn deref(&self) -> &Self::Target {
        &self.attributes
    }
}

impl IntoIterator for Heading {
    type Item = Attribute;
    type IntoIter = <Vec<Attribute> as IntoIterator>::IntoIter;

    fn into_iter(self) -> Self::IntoIter {
        self.attributes.into_iter()
    }
}

/// A conversion from a fixed size array of attributes, panics on duplicates
impl<const N: usize> From<[Attribute; N]> for Heading {
    fn from(attributes: [Attribute; N]) -> Self {
        Heading::builder().with_iter_attributes(attributes).build()
    }
}

#[derive(Debug, Default)]
pub struct Builder {
    /// Heading attributes
    attributes: Vec<Attribute>,
}

impl Builder {
    pub fn new() -> Builder {
        Builder::default()
    }

    /// Add a primary key attribute
    pub fn key<S: Into<String>>(mut self, name: S, data_type: DataType) -> Self {
        self.attributes.push(Attribute::key(name, data_type));
        self
    }

    fn with_iter_attributes<I: IntoIterator<Item = Attribute>>(mut self, attributes: I) -> Self {
        self.attributes.extend(attributes);
        self
    }
}

impl With<Attribute> for Builder {
    fn with(mut self, attribute: Attribute) -> Self {
        self.attributes.push(attribute);
        self
    }
}

impl<S: Into<String>> With<(S, DataType)> for Builder {
    fn with(mut self, (name, data_type): (S, DataType)) -> Self {
        self.attributes.push(Attribute::new(name, data_type));
        self
    }
}

impl Ready<Heading> for Builder {
    type Error = Error;

    fn try_build(self) -> Result<Heading> {
        Heading::try_new(self.attributes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn person() -> Heading {
        Heading::builder()
            .key("id", DataType::Int)
            .with(("name", DataType::VarCharN))
            .with(("age", DataType::TinyIntUnsigned))
            .build()
    }

    fn pet() -> Heading {
        Heading::builder()
            .key("pet_id", DataType::Int)
            .with(("id", DataType::Int))
            .with(("species", DataType::VarCharN))
            .build()
    }

    #[test]
    fn test_builder() {
        let heading = person();
        println!("heading = {}", heading);
        assert_eq!(heading.names(), vec!["id", "name", "age"]);
        assert_eq!(heading.primary_key(), vec!["id"]);
        assert_eq!(heading.secondary_attributes(), vec!["name", "age"]);
        assert_eq!(heading.as_sql(), "`id`,`name`,`age`");
        assert!(Heading::builder()
            .with(("a", DataType::Int))
            .with(("a", DataType::Int))
            .try_build()
            .is_err());
    }

    #[test]
    fn test_attribute_not_found() {
        let heading = person();
        assert!(matches!(
            heading.attribute("weight"),
            Err(Error::AttributeNotFound(_))
        ));
        assert!(heading.check_names(["id", "age"]).is_ok());
        assert!(heading.check_names(["id", "weight"]).is_err());
    }

    #[test]
    fn test_select() {
        let heading = person();
        let selection = Selection {
            attributes: vec!["id".into(), "name".into()],
            rename: vec![("age_group".into(), "age".into())],
            duplicate: vec![("name_copy".into(), "name".into())],
            compute: vec![("double_age".into(), "2*age".into())],
        };
        let selected = heading.select(&selection).unwrap();
        println!("selected = {}", selected);
        assert_eq!(
            selected.names(),
            vec!["id", "name", "name_copy", "age_group", "double_age"]
        );
        assert_eq!(selected.primary_key(), vec!["id"]);
        assert_eq!(
            selected.as_sql(),
            "`id`,`name`,`name` as `name_copy`,`age` as `age_group`,2*age as `double_age`"
        );
        assert!(selected.has_computed_attributes());
        let plain = selected.make_subquery_heading();
        assert!(!plain.has_computed_attributes());
        assert_eq!(plain.names(), selected.names());
    }

    #[test]
    fn test_renamed_key_stays_in_key() {
        let selection = Selection {
            rename: vec![("person_id".into(), "id".into())],
            ..Selection::default()
        };
        let selected = person().select(&selection).unwrap();
        assert_eq!(selected.primary_key(), vec!["person_id"]);
    }

    #[test]
    fn test_join() {
        let joined = person().join(&pet());
        println!("joined = {}", joined);
        assert_eq!(joined.names(), vec!["id", "pet_id", "name", "age", "species"]);
        assert_eq!(joined.primary_key(), vec!["id", "pet_id"]);
    }

    #[test]
    fn test_primary_key_changes() {
        let extended = pet().extend_primary_key(&["species"]).unwrap();
        assert_eq!(extended.primary_key(), vec!["pet_id", "species"]);
        assert!(pet().extend_primary_key(&["color"]).is_err());
        let set = pet().set_primary_key(&["species"]).unwrap();
        assert_eq!(set.names(), vec!["species", "pet_id", "id"]);
        assert_eq!(set.primary_key(), vec!["species"]);
    }

    #[test]
    fn test_project() {
        let projected = person().project(&["age", "id"]).unwrap();
        assert_eq!(projected.as_sql(), "`age`,`id`");
        assert!(person().project(&["weight"]).is_err());
    }
}
