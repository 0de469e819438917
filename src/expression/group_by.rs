use itertools::Itertools;
use std::{fmt, sync::Arc};

use super::{display_sql, Expression, Join, Projection, Properties, Result, Variant};
use crate::{condition::Predicate, heading::Heading, io::Connection, namer::Aliases};

/// An aggregation of a group per element of an entity set
///
/// The primary key of the result is the primary key of the entity set, the other attributes
/// are typically aggregates computed over the matching elements of the group.
#[derive(Clone, Debug, PartialEq)]
pub struct GroupBy {
    properties: Properties,
    /// The joined entity set and group
    input: Arc<Expression>,
    /// The input columns grouped by
    group_by: Vec<String>,
}

impl GroupBy {
    /// Aggregate `group` per element of `arg`
    pub fn create(
        arg: &Expression,
        group: &Expression,
        projection: Projection,
        keep_all_rows: bool,
    ) -> Result<GroupBy> {
        let input: Expression = Join::create(arg, group, keep_all_rows)?.into();
        GroupBy::from_input(
            Arc::new(input),
            &arg.primary_key(),
            &arg.heading().secondary_attributes(),
            &projection,
        )
    }

    /// Aggregate `input` grouping by `primary_key`
    ///
    /// The primary key is always selected, possibly renamed, and stays the primary key of the result.
    pub(crate) fn from_input(
        input: Arc<Expression>,
        primary_key: &[&str],
        secondary: &[&str],
        projection: &Projection,
    ) -> Result<GroupBy> {
        input.heading().check_names(primary_key.iter().copied())?;
        let selection = projection.resolve(input.heading(), primary_key, secondary)?;
        let key = primary_key
            .iter()
            .map(|name| {
                selection
                    .rename
                    .iter()
                    .find(|(_, old)| old == name)
                    .map_or_else(|| name.to_string(), |(new, _)| new.clone())
            })
            .collect_vec();
        let heading = input.heading().select(&selection)?.set_primary_key(&key)?;
        let mut properties = Properties::new(heading);
        properties.projected = true;
        Ok(GroupBy {
            properties,
            input,
            group_by: primary_key.iter().map(|name| name.to_string()).collect(),
        })
    }

    pub fn input(&self) -> &Expression {
        &self.input
    }

    pub fn group_by(&self) -> &[String] {
        &self.group_by
    }

    /// `SELECT <fields> FROM <input> GROUP BY <key> HAVING <restriction>`
    pub(crate) fn select_sql(&self, heading: &Heading, aliases: &Aliases) -> Result<String> {
        let from = self.input.from_clause(aliases)?;
        let input_where = self.input.where_clause(aliases)?;
        let group_by = if self.group_by.is_empty() {
            String::new()
        } else {
            format!(
                " GROUP BY {}",
                self.group_by.iter().map(|name| format!("`{}`", name)).join(",")
            )
        };
        let having = match self.restriction().compile(self.heading(), aliases)? {
            Predicate::Literal(true) => String::new(),
            predicate => format!(" HAVING {}", predicate),
        };
        Ok(format!(
            "SELECT {}{} FROM {}{}{}{}",
            if self.distinct() { "DISTINCT " } else { "" },
            heading.as_sql(),
            from,
            input_where,
            group_by,
            having
        ))
    }
}

impl fmt::Display for GroupBy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        display_sql(&self.clone().into(), f)
    }
}

impl Variant for GroupBy {
    fn properties(&self) -> &Properties {
        &self.properties
    }

    fn properties_mut(&mut self) -> &mut Properties {
        &mut self.properties
    }

    fn inputs(&self) -> Vec<&Expression> {
        vec![&self.input]
    }

    fn connection(&self) -> Option<&Arc<dyn Connection>> {
        self.input.connection()
    }

    /// The FROM clause of the aggregated input
    fn from_clause(&self, aliases: &Aliases) -> Result<String> {
        self.input.from_clause(aliases)
    }
}
