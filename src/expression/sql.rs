//! SQL assembly
//!
//! `SELECT [DISTINCT] <fields> FROM <from>[ WHERE <condition>]`, where each variant renders
//! its own FROM clause and aggregations render their own statement.
//!

use super::{Expression, Result, Variant};
use crate::{condition::Predicate, heading::Heading, namer::Aliases};

impl Expression {
    /// Compile the expression into a SELECT statement with fresh aliases
    pub fn make_sql(&self) -> Result<String> {
        self.make_sql_with(&Aliases::new())
    }

    /// Compile the expression into a SELECT statement, drawing aliases from `aliases`
    pub fn make_sql_with(&self, aliases: &Aliases) -> Result<String> {
        self.select_sql(self.heading(), aliases)
    }

    /// Compile the expression into a SELECT statement of the `fields` only
    pub fn make_select<S: AsRef<str>>(&self, fields: &[S], aliases: &Aliases) -> Result<String> {
        self.select_sql(&self.heading().project(fields)?, aliases)
    }

    /// The WHERE clause with its leading space, empty when unrestricted
    pub fn where_clause(&self, aliases: &Aliases) -> Result<String> {
        Ok(
            match self.restriction().compile(self.heading(), aliases)? {
                Predicate::Literal(true) => String::new(),
                predicate => format!(" WHERE {}", predicate),
            },
        )
    }

    /// Count the elements of the entity set
    ///
    /// Distinct sets, aggregations and aggregates without primary key are counted as subqueries.
    pub fn len_sql(&self) -> Result<String> {
        let aliases = Aliases::new();
        if self.distinct() || self.is_group_by() || self.primary_key().is_empty() {
            Ok(format!(
                "SELECT count(*) FROM ({}) as `{}`",
                self.make_sql_with(&aliases)?,
                aliases.subquery()
            ))
        } else {
            let from = self.from_clause(&aliases)?;
            Ok(format!(
                "SELECT count(*) FROM {}{}",
                from,
                self.where_clause(&aliases)?
            ))
        }
    }

    fn select_sql(&self, heading: &Heading, aliases: &Aliases) -> Result<String> {
        match self {
            Expression::GroupBy(group_by) => group_by.select_sql(heading, aliases),
            _ => {
                let from = self.from_clause(aliases)?;
                Ok(format!(
                    "SELECT {}{} FROM {}{}",
                    if self.distinct() { "DISTINCT " } else { "" },
                    heading.as_sql(),
                    from,
                    self.where_clause(aliases)?
                ))
            }
        }
    }
}
