use itertools::Itertools;
use std::{collections::BTreeSet, fmt, sync::Arc};

use super::{display_sql, same_connection, Error, Expression, Properties, Result, Variant};
use crate::{io::Connection, namer::Aliases};

/// The union of two primary key only entity sets
#[derive(Clone, Debug, PartialEq)]
pub struct Union {
    properties: Properties,
    /// The columns selected from both arguments
    attributes: Vec<String>,
    left: Arc<Expression>,
    right: Arc<Expression>,
}

impl Union {
    pub fn create(left: &Expression, right: &Expression) -> Result<Union> {
        if !same_connection(left.connection(), right.connection()) {
            return Err(Error::union_incompatibility(
                "Cannot unite query expressions from different connections",
            ));
        }
        let left_names: BTreeSet<&str> = left.heading().names().into_iter().collect();
        let right_names: BTreeSet<&str> = right.heading().names().into_iter().collect();
        if left_names != right_names {
            return Err(Error::union_incompatibility(format!(
                "Union requires the same attributes in both arguments, got {} and {}",
                left_names.iter().join(", "),
                right_names.iter().join(", ")
            )));
        }
        if let Some(name) = left
            .heading()
            .secondary_attributes()
            .into_iter()
            .chain(right.heading().secondary_attributes())
            .next()
        {
            return Err(Error::secondary_attribute(name));
        }
        Ok(Union {
            properties: Properties::new(left.heading().make_subquery_heading()),
            attributes: left.heading().names().into_iter().map(String::from).collect(),
            left: Union::argument(left),
            right: Union::argument(right),
        })
    }

    /// Aggregations render a whole statement and cannot be inlined in the union
    fn argument(expression: &Expression) -> Arc<Expression> {
        if expression.is_group_by() {
            Arc::new(Expression::subquery(Arc::new(expression.clone())))
        } else {
            Arc::new(expression.clone())
        }
    }

    /// The columns of the union, projections of the union select from them
    pub fn attributes(&self) -> &[String] {
        &self.attributes
    }

    pub fn left(&self) -> &Expression {
        &self.left
    }

    pub fn right(&self) -> &Expression {
        &self.right
    }
}

impl fmt::Display for Union {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        display_sql(&self.clone().into(), f)
    }
}

impl Variant for Union {
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
        let names = &self.attributes;
        let left_fields = self.left.heading().project(names)?.as_sql();
        let left_from = self.left.from_clause(aliases)?;
        let left_where = self.left.where_clause(aliases)?;
        let right_fields = self.right.heading().project(names)?.as_sql();
        let right_from = self.right.from_clause(aliases)?;
        let right_where = self.right.where_clause(aliases)?;
        Ok(format!(
            "(SELECT {} FROM {}{} UNION SELECT {} FROM {}{}) as `{}`",
            left_fields,
            left_from,
            left_where,
            right_fields,
            right_from,
            right_where,
            aliases.union()
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        builder::Ready,
        data_type::DataType,
        expression::{
            tests::{person, pet},
            Projection, U,
        },
        heading::Heading,
    };

    fn keys(name: &str) -> Expression {
        Expression::table()
            .database("main")
            .name(name)
            .heading(
                Heading::builder()
                    .key("id", DataType::Int)
                    .key("session", DataType::SmallInt)
                    .build(),
            )
            .build()
            .into()
    }

    #[test]
    fn test_union() {
        let morning = keys("morning").restrict("session < 3").unwrap();
        let evening = keys("evening");
        let united = (&morning + &evening).unwrap();
        let sql = united.make_sql().unwrap();
        println!("{sql}");
        assert_eq!(
            sql,
            "SELECT `id`,`session` FROM (SELECT `id`,`session` FROM `main`.`morning` WHERE (session < 3) UNION SELECT `id`,`session` FROM `main`.`evening`) as `_u0`"
        );
        let restricted = united.restrict("id > 10").unwrap();
        assert!(restricted.make_sql().unwrap().ends_with("as `_u0` WHERE (id > 10)"));
    }

    #[test]
    fn test_derived_from_union() {
        let united = (&keys("morning") + &keys("evening")).unwrap();
        let renamed = united
            .proj(Projection::new().attribute("session").rename("pid", "id"))
            .unwrap();
        let sql = renamed.make_sql().unwrap();
        println!("{sql}");
        assert_eq!(
            sql,
            "SELECT `id` as `pid`,`session` FROM (SELECT `id`,`session` FROM `main`.`morning` UNION SELECT `id`,`session` FROM `main`.`evening`) as `_u0`"
        );
        let count = U::new(Vec::<String>::new())
            .aggr(&united, Projection::new().compute("n", "count(*)"))
            .unwrap();
        let sql = count.make_sql().unwrap();
        println!("{sql}");
        assert_eq!(
            sql,
            "SELECT count(*) as `n` FROM (SELECT `id`,`session` FROM `main`.`morning` UNION SELECT `id`,`session` FROM `main`.`evening`) as `_u0`"
        );
        assert!(count.len_sql().is_ok());
    }

    #[test]
    fn test_union_column_order() {
        let reordered: Expression = Expression::table()
            .database("main")
            .name("evening")
            .heading(
                Heading::builder()
                    .key("session", DataType::SmallInt)
                    .key("id", DataType::Int)
                    .build(),
            )
            .build()
            .into();
        let united = keys("morning").union(&reordered).unwrap();
        assert!(united
            .make_sql()
            .unwrap()
            .contains("UNION SELECT `id`,`session` FROM `main`.`evening`"));
    }

    #[test]
    fn test_union_errors() {
        assert!(matches!(
            person().union(&person()),
            Err(Error::SecondaryAttribute(_))
        ));
        assert!(matches!(
            keys("morning").union(&pet().proj(Projection::new()).unwrap()),
            Err(Error::UnionIncompatibility(_))
        ));
    }
}
