//! The projection operator and its argument builder

use itertools::Itertools;

use super::{Error, Expression, Result, Variant};
use crate::{
    builder::{With, WithIterator},
    heading::{Heading, Selection},
};

/// Positional name standing for every secondary attribute not otherwise listed
pub const ALL: &str = "...";

/// How a named attribute of a projection is produced
#[derive(Clone, Debug, Hash, PartialEq, Eq)]
pub enum Named {
    /// Rename an existing attribute, dropping the original
    Rename(String),
    /// Copy an existing attribute under a new name, the original may be kept
    Duplicate(String),
    /// Compute an attribute from an SQL expression
    Compute(String),
}

impl Named {
    /// Classify a value the way it would be written in a projection:
    /// `"(x)"` duplicates `x`, a bare identifier renames it, anything else is computed
    pub fn parse(value: &str) -> Named {
        let trimmed = value.trim();
        if let Some(name) = trimmed
            .strip_prefix('(')
            .and_then(|inner| inner.strip_suffix(')'))
            .map(str::trim)
            .filter(|name| is_identifier(name))
        {
            Named::Duplicate(name.to_string())
        } else if is_identifier(trimmed) {
            Named::Rename(trimmed.to_string())
        } else {
            Named::Compute(value.to_string())
        }
    }
}

fn is_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    matches!(chars.next(), Some(c) if c.is_ascii_lowercase())
        && chars.all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_')
}

/// The arguments of a projection
///
/// Positional names are kept, [`ALL`] expands to the remaining secondary attributes and
/// `-name` excludes a secondary attribute. The primary key is always kept unless renamed.
#[derive(Clone, Debug, Default, Hash, PartialEq, Eq)]
pub struct Projection {
    attributes: Vec<String>,
    named: Vec<(String, Named)>,
}

impl Projection {
    pub fn new() -> Self {
        Projection::default()
    }

    /// Keep an attribute
    pub fn attribute<S: Into<String>>(mut self, name: S) -> Self {
        self.attributes.push(name.into());
        self
    }

    /// Keep all secondary attributes
    pub fn all(self) -> Self {
        self.attribute(ALL)
    }

    /// Drop a secondary attribute
    pub fn exclude<S: AsRef<str>>(self, name: S) -> Self {
        self.attribute(format!("-{}", name.as_ref()))
    }

    pub fn rename<N: Into<String>, O: Into<String>>(mut self, new: N, old: O) -> Self {
        self.named.push((new.into(), Named::Rename(old.into())));
        self
    }

    pub fn duplicate<N: Into<String>, O: Into<String>>(mut self, new: N, old: O) -> Self {
        self.named.push((new.into(), Named::Duplicate(old.into())));
        self
    }

    pub fn compute<N: Into<String>, E: Into<String>>(mut self, new: N, expression: E) -> Self {
        self.named.push((new.into(), Named::Compute(expression.into())));
        self
    }

    pub fn attributes(&self) -> &[String] {
        &self.attributes
    }

    pub fn named(&self) -> &[(String, Named)] {
        &self.named
    }

    /// Resolve against `heading` into the selection deriving the new heading
    ///
    /// `primary_key` is kept unless renamed and `secondary` is what [`ALL`] expands to.
    pub fn resolve(
        &self,
        heading: &Heading,
        primary_key: &[&str],
        secondary: &[&str],
    ) -> Result<Selection> {
        let mut selection = Selection::default();
        for (new, named) in &self.named {
            match named {
                Named::Rename(old) => selection.rename.push((new.clone(), old.clone())),
                Named::Duplicate(old) => selection.duplicate.push((new.clone(), old.clone())),
                Named::Compute(expression) => {
                    selection.compute.push((new.clone(), expression.clone()))
                }
            }
        }
        let mut attributes: Vec<String> = primary_key
            .iter()
            .filter(|name| !selection.rename.iter().any(|(_, old)| old == *name))
            .map(|name| name.to_string())
            .collect();
        let mut all = false;
        let mut excluded = vec![];
        for name in self.attributes.iter().map(|name| name.trim()) {
            if name == ALL {
                all = true;
            } else if let Some(name) = name.strip_prefix('-') {
                excluded.push(name.trim());
            } else if !attributes.iter().any(|attribute| attribute == name) {
                attributes.push(name.to_string());
            }
        }
        if all {
            for name in secondary {
                if !attributes.iter().any(|attribute| attribute == name) {
                    attributes.push(name.to_string());
                }
            }
        }
        if let Some(name) = excluded.iter().find(|name| primary_key.contains(name)) {
            return Err(Error::primary_key_exclusion(name));
        }
        attributes.retain(|attribute| !excluded.contains(&attribute.as_str()));
        selection.attributes = attributes;
        heading.check_names(selection.sources())?;
        let targets = selection.targets().collect_vec();
        if let Some(name) = targets.iter().duplicates().next() {
            return Err(Error::invalid_projection(format!(
                "Attribute `{}` is produced more than once",
                name
            )));
        }
        Ok(selection)
    }
}

impl With<&str> for Projection {
    fn with(self, name: &str) -> Self {
        self.attribute(name)
    }
}

impl<S: Into<String>, T: AsRef<str>> With<(S, T)> for Projection {
    fn with(mut self, (new, value): (S, T)) -> Self {
        self.named.push((new.into(), Named::parse(value.as_ref())));
        self
    }
}

impl<const N: usize> From<[&str; N]> for Projection {
    fn from(names: [&str; N]) -> Self {
        Projection::new().with_iter(names)
    }
}

impl Expression {
    /// Project the entity set
    ///
    /// The primary key is always part of the result, possibly renamed.
    pub fn proj<P: Into<Projection>>(&self, projection: P) -> Result<Expression> {
        let projection = projection.into();
        let heading = self.heading();
        let selection = projection.resolve(
            heading,
            &heading.primary_key(),
            &heading.secondary_attributes(),
        )?;
        self.select(&selection)
    }
}
