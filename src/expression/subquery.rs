use std::{fmt, sync::Arc};

use super::{display_sql, Expression, Properties, Result, Variant};
use crate::{io::Connection, namer::Aliases};

/// An expression selecting from the result of another expression
///
/// The attributes of the input are plain columns of the derived table.
#[derive(Clone, Debug, PartialEq)]
pub struct Subquery {
    properties: Properties,
    input: Arc<Expression>,
}

impl Subquery {
    pub fn new(input: Arc<Expression>) -> Self {
        Subquery {
            properties: Properties::new(input.heading().make_subquery_heading()),
            input,
        }
    }

    pub fn input(&self) -> &Expression {
        &self.input
    }
}

impl fmt::Display for Subquery {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        display_sql(&self.clone().into(), f)
    }
}

impl Variant for Subquery {
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

    fn from_clause(&self, aliases: &Aliases) -> Result<String> {
        let sql = self.input.make_sql_with(aliases)?;
        Ok(format!("({}) as `{}`", sql, aliases.subquery()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::expression::tests::person;

    #[test]
    fn test_subquery() {
        let renamed = person()
            .proj(
                crate::expression::Projection::new()
                    .attribute("name")
                    .rename("years", "age"),
            )
            .unwrap();
        let subquery = Subquery::new(Arc::new(renamed));
        assert!(!subquery.heading().has_computed_attributes());
        assert_eq!(subquery.inputs().len(), 1);
        let sql = Expression::from(subquery).make_sql().unwrap();
        println!("{sql}");
        assert_eq!(
            sql,
            "SELECT `id`,`name`,`years` FROM (SELECT `id`,`name`,`age` as `years` FROM `main`.`person`) as `_s0`"
        );
    }
}
