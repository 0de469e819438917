use qrel::{
    builder::{Ready, With, WithIterator},
    condition::{AndList, Condition},
    data_type::{DataType, Value},
    expression::{self, Expression, Projection, Variant, U},
    heading::Heading,
    setup,
};

fn table(name: &str, heading: Heading) -> Expression {
    Expression::table()
        .database("main")
        .name(name)
        .heading(heading)
        .build()
        .into()
}

fn person() -> Expression {
    table(
        "person",
        Heading::builder()
            .key("id", DataType::Int)
            .with(("name", DataType::VarCharN))
            .with(("age", DataType::TinyIntUnsigned))
            .build(),
    )
}

fn pet() -> Expression {
    table(
        "pet",
        Heading::builder()
            .key("pet_id", DataType::Int)
            .with(("id", DataType::Int))
            .with(("species", DataType::VarCharN))
            .build(),
    )
}

#[test]
fn test_trivial_restrictions() {
    setup::try_init();
    let person = person();
    assert_eq!((&person & true).unwrap(), person);
    let empty = (&person & false).unwrap();
    let sql = empty.make_sql().unwrap();
    println!("{sql}");
    assert!(sql.ends_with(" WHERE FALSE"));
}

#[test]
fn test_successive_restrictions() {
    let person = person();
    let successive = person
        .restrict("age > 30")
        .and_then(|r| r.restrict(Condition::equality([("name", "Ann")])))
        .unwrap();
    let conjunction = person
        .restrict(AndList::from_iter([
            Condition::sql("age > 30"),
            Condition::equality([("name", "Ann")]),
        ]))
        .unwrap();
    assert_eq!(
        successive.make_sql().unwrap(),
        conjunction.make_sql().unwrap()
    );
}

#[test]
fn test_exclusion() {
    let person = person();
    let excluded = (&person - "age > 30").unwrap();
    let negated = (&person & Condition::not(Condition::sql("age > 30"))).unwrap();
    assert_eq!(excluded.make_sql().unwrap(), negated.make_sql().unwrap());
}

#[test]
fn test_projection_keeps_primary_key() {
    let person = person();
    for attributes in [vec![], vec!["name"], vec!["age", "name"], vec!["..."]] {
        let projection = Projection::new().with_iter(attributes.iter().copied());
        let projected = person.proj(projection).unwrap();
        println!("{}", projected.heading());
        assert_eq!(projected.primary_key(), person.primary_key());
    }
    assert!(matches!(
        person.proj(Projection::new().all().exclude("id")),
        Err(expression::Error::PrimaryKeyExclusion(_))
    ));
}

#[test]
fn test_join_primary_key() {
    let joined = (&person() * &pet()).unwrap();
    let primary_key = joined.primary_key();
    assert!(primary_key.contains(&"id"));
    assert!(primary_key.contains(&"pet_id"));
    let namesake = table(
        "namesake",
        Heading::builder()
            .key("namesake_id", DataType::Int)
            .with(("name", DataType::VarCharN))
            .build(),
    );
    assert!(matches!(
        &person() * &namesake,
        Err(expression::Error::JoinCompatibility(_))
    ));
}

#[test]
fn test_union_attribute_sets() {
    let adults = (&person() & "age >= 18").unwrap().proj(Projection::new()).unwrap();
    let children = (&person() & "age < 18").unwrap().proj(Projection::new()).unwrap();
    let union = (&adults + &children).unwrap();
    println!("{}", union.make_sql().unwrap());
    assert_eq!(union.primary_key(), vec!["id"]);
    assert!(matches!(
        &adults + &pet().proj(Projection::new()).unwrap(),
        Err(expression::Error::UnionIncompatibility(_))
    ));
}

#[test]
fn test_restrict_then_project() {
    let names = (&person() & "age > 30")
        .unwrap()
        .proj(["name"])
        .unwrap();
    assert_eq!(names.heading().names(), vec!["id", "name"]);
    assert_eq!(
        names.make_sql().unwrap(),
        "SELECT `id`,`name` FROM `main`.`person` WHERE (age > 30)"
    );
}

#[test]
fn test_renamed_restriction() {
    let renamed = person()
        .proj(Projection::new().attribute("name").rename("age_group", "age"))
        .unwrap();
    let by_group = (&renamed & "age_group > 3").unwrap().make_sql().unwrap();
    println!("{by_group}");
    assert!(by_group.contains("FROM (SELECT"));
    let by_id = (&renamed & "id = 1").unwrap().make_sql().unwrap();
    println!("{by_id}");
    assert!(!by_id.contains("FROM (SELECT"));
}

#[test]
fn test_species_count_sql() {
    let counts = U::new(["species"])
        .aggr(&pet(), Projection::new().compute("n", "count(*)"))
        .unwrap();
    let sql = counts.make_sql().unwrap();
    println!("{sql}");
    assert_eq!(counts.primary_key(), vec!["species"]);
    assert!(sql.ends_with("GROUP BY `species`"));
    assert!(sql.contains("count(*) as `n`"));
}

#[test]
fn test_semijoin_sql() {
    let owners = (&person() & &pet()).unwrap();
    let not_owners = (&person() - &pet()).unwrap();
    let owners = owners.make_sql().unwrap();
    let not_owners = not_owners.make_sql().unwrap();
    println!("{owners}\n{not_owners}");
    assert!(owners.contains("(`id`) IN (SELECT"));
    assert!(not_owners.contains("(`id`) NOT IN (SELECT"));
}

#[cfg(feature = "sqlite")]
mod sqlite {
    use super::*;
    use qrel::{
        fetch::{Fetch, KEY},
        io::sqlite::test_database,
        Row,
    };

    fn names(rows: &[Row]) -> Vec<Value> {
        rows.iter()
            .filter_map(|row| row.get("name").cloned())
            .collect()
    }

    #[test]
    fn test_count_all() {
        setup::try_init();
        let database = test_database().unwrap();
        let pet: Expression = database.table("pet").unwrap().into();
        let count = U::new(Vec::<String>::new())
            .aggr(&pet, Projection::new().compute("n", "count(*)"))
            .unwrap();
        let row = count.fetch1().unwrap();
        println!("{row}");
        assert_eq!(row.get("n"), Some(&Value::from(pet.len().unwrap() as i64)));
        assert_eq!(count.len().unwrap(), 1);
    }

    #[test]
    fn test_species_count() {
        let database = test_database().unwrap();
        let pet: Expression = database.table("pet").unwrap().into();
        let counts = U::new(["species"])
            .aggr(&pet, Projection::new().compute("n", "count(*)"))
            .unwrap();
        let rows = counts.fetch(&Fetch::new().order_by(KEY)).unwrap();
        for row in &rows {
            println!("{row}");
        }
        let counts: Vec<(Value, Value)> = rows
            .iter()
            .filter_map(|row| Some((row.get("species")?.clone(), row.get("n")?.clone())))
            .collect();
        assert_eq!(
            counts,
            vec![
                (Value::from("cat"), Value::from(3)),
                (Value::from("dog"), Value::from(1)),
                (Value::from("fish"), Value::from(1)),
            ]
        );
        assert_eq!(counts.len(), 3);
    }

    #[test]
    fn test_join_and_semijoin() {
        let database = test_database().unwrap();
        let person: Expression = database.table("person").unwrap().into();
        let pet: Expression = database.table("pet").unwrap().into();
        assert_eq!((&person * &pet).unwrap().len().unwrap(), 5);
        assert_eq!((&person & &pet).unwrap().len().unwrap(), 3);
        let not_owners = (&person - &pet).unwrap();
        assert_eq!(names(&not_owners.fetch_all().unwrap()), vec![Value::from("Dee")]);
        let cat_owners = (&person & &(&pet & "species = 'cat'").unwrap()).unwrap();
        assert!(cat_owners.contains(Condition::equality([("name", "Ann")])).unwrap());
        assert!(!cat_owners.contains(Condition::equality([("name", "Dee")])).unwrap());
    }

    #[test]
    fn test_aggregation() {
        let database = test_database().unwrap();
        let person: Expression = database.table("person").unwrap().into();
        let pet: Expression = database.table("pet").unwrap().into();
        let pets = Projection::new().attribute("name").compute("n", "count(`pet_id`)");
        let owners = person.aggr(&pet, pets.clone()).unwrap();
        assert_eq!(owners.len().unwrap(), 3);
        let everyone = person.aggr_all(&pet, pets).unwrap();
        let rows = everyone.fetch(&Fetch::new().order_by(KEY)).unwrap();
        for row in &rows {
            println!("{row}");
        }
        let counts: Vec<Value> = rows.iter().filter_map(|row| row.get("n").cloned()).collect();
        assert_eq!(
            counts,
            vec![Value::from(2), Value::from(1), Value::from(2), Value::from(0)]
        );
        let many = (&everyone & "n > 1").unwrap();
        assert_eq!(names(&many.fetch_all().unwrap()).len(), 2);
    }

    #[test]
    fn test_union() {
        let database = test_database().unwrap();
        let person: Expression = database.table("person").unwrap().into();
        let old = (&person & "age > 40").unwrap().proj(Projection::new()).unwrap();
        let young = (&person & "age < 20").unwrap().proj(Projection::new()).unwrap();
        let union = (&old + &young).unwrap();
        let keys = union.fetch_keys().unwrap();
        assert_eq!(
            keys.iter().filter_map(|row| row.get("id").cloned()).collect::<Vec<_>>(),
            vec![Value::from(3), Value::from(4)]
        );
    }

    #[test]
    fn test_negated_conjunction() {
        let database = test_database().unwrap();
        let person: Expression = database.table("person").unwrap().into();
        let both = AndList::from_iter(["age > 30", "name = 'Ann'"]);
        let excluded = (&person - both).unwrap();
        println!("{}", excluded.make_sql().unwrap());
        assert_eq!(excluded.len().unwrap(), 3);
        let either = (&person
            & vec![
                Condition::not(Condition::sql("age > 30")),
                Condition::not(Condition::sql("name = 'Ann'")),
            ])
            .unwrap();
        assert_eq!(
            names(&excluded.fetch(&Fetch::new().order_by(KEY)).unwrap()),
            names(&either.fetch(&Fetch::new().order_by(KEY)).unwrap())
        );
    }

    #[test]
    fn test_exclude_composite_key() {
        let database = test_database().unwrap();
        database
            .execute_batch(
                "CREATE TABLE visit (id INTEGER, session INTEGER, room TEXT, PRIMARY KEY (id, session));
                INSERT INTO visit VALUES (1, 1, 'a'), (1, 2, 'b'), (2, 2, 'c');",
            )
            .unwrap();
        let visit: Expression = database.table("visit").unwrap().into();
        assert_eq!(visit.primary_key(), vec!["id", "session"]);
        let key: Row = [("id", 1), ("session", 2)].into_iter().collect();
        let others = (&visit - &key).unwrap();
        let rooms: Vec<Value> = others
            .fetch(&Fetch::new().order_by(KEY))
            .unwrap()
            .iter()
            .filter_map(|row| row.get("room").cloned())
            .collect();
        assert_eq!(rooms, vec![Value::from("a"), Value::from("c")]);
        assert!(!others.contains(&key).unwrap());
    }

    #[test]
    fn test_count_union() {
        let database = test_database().unwrap();
        let person: Expression = database.table("person").unwrap().into();
        let old = (&person & "age > 40").unwrap().proj(Projection::new()).unwrap();
        let young = (&person & "age < 20").unwrap().proj(Projection::new()).unwrap();
        let union = (&old + &young).unwrap();
        let count = U::new(Vec::<String>::new())
            .aggr(&union, Projection::new().compute("n", "count(*)"))
            .unwrap();
        let row = count.fetch1().unwrap();
        println!("{row}");
        assert_eq!(row.get("n"), Some(&Value::from(2)));
        let renamed = union.proj(Projection::new().rename("pid", "id")).unwrap();
        let keys: Vec<Value> = renamed
            .fetch(&Fetch::new().order_by(KEY))
            .unwrap()
            .iter()
            .filter_map(|row| row.get("pid").cloned())
            .collect();
        assert_eq!(keys, vec![Value::from(3), Value::from(4)]);
    }

    #[test]
    fn test_iteration() {
        let database = test_database().unwrap();
        let person: Expression = database.table("person").unwrap().into();
        let adults = (&person & "age > 30").unwrap();
        let rows = adults
            .iter()
            .unwrap()
            .collect::<qrel::fetch::Result<Vec<_>>>()
            .unwrap();
        assert_eq!(names(&rows), vec![Value::from("Ann"), Value::from("Cid")]);
    }

    #[test]
    fn test_head_and_tail() {
        let database = test_database().unwrap();
        let person: Expression = database.table("person").unwrap().into();
        assert_eq!(
            names(&person.head(2).unwrap()),
            vec![Value::from("Ann"), Value::from("Bob")]
        );
        assert_eq!(
            names(&person.tail(2).unwrap()),
            vec![Value::from("Cid"), Value::from("Dee")]
        );
        let page = person
            .fetch(&Fetch::new().order_by("age DESC").limit(2).offset(1))
            .unwrap();
        assert_eq!(names(&page), vec![Value::from("Ann"), Value::from("Bob")]);
    }

    #[test]
    fn test_renamed_fetch() {
        let database = test_database().unwrap();
        let person: Expression = database.table("person").unwrap().into();
        let renamed = person
            .proj(Projection::new().rename("years", "age"))
            .unwrap();
        let old = (&renamed & "years > 40").unwrap();
        let row = old.fetch1().unwrap();
        assert_eq!(row.get("years"), Some(&Value::from(41)));
        assert_eq!(row.get("id"), Some(&Value::from(3)));
    }
}
