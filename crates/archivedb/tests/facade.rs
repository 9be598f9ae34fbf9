//! The facade alone is enough to declare, persist and relate records.

use archivedb::prelude::*;
use archivedb_query::testing::{MockExecutor, row};
use pretty_assertions::assert_eq;

#[derive(Debug, Clone, Default, Entity)]
#[entity(table = "collections")]
struct Collection {
    #[entity(primary_key, default)]
    id: i64,
    uid: String,
    #[entity(skip)]
    r: Option<Box<CollectionR>>,
}

#[derive(Debug, Clone, Default)]
struct CollectionR {
    units: RelatedMany<Unit>,
}

#[derive(Debug, Clone, Default, Entity)]
#[entity(table = "units")]
struct Unit {
    #[entity(primary_key, default)]
    id: i64,
    collection_id: Option<i64>,
}

fn units(c: &mut Collection) -> &mut RelatedMany<Unit> {
    &mut c.r.get_or_insert_with(Default::default).units
}

const UNITS: HasMany<Collection, Unit> = HasMany {
    name: "Units",
    foreign_key: "collection_id",
    local_key: "id",
    slot: units,
    inverse: Inverse::None,
};

#[test]
fn insert_then_load_through_the_prelude() {
    let mock = MockExecutor::new();
    mock.push_row(row(["id"], [Value::BigInt(4)]));

    let mut c = Collection {
        uid: "c4".to_string(),
        ..Collection::default()
    };
    c.insert(&mock, &[] as &[&str]).must();
    assert_eq!(c.id, 4);

    mock.push_rows(vec![row(
        ["id", "collection_id"],
        [Value::BigInt(1), Value::BigInt(4)],
    )]);
    UNITS.load_one(&mock, &mut c).must();
    assert_eq!(units(&mut c).len(), 1);
    assert_eq!(
        mock.sql(),
        vec![
            "INSERT INTO \"collections\" (\"uid\") VALUES ($1) RETURNING \"id\"",
            "SELECT * FROM \"units\" WHERE \"collection_id\" IN ($1)",
        ]
    );
}

#[test]
#[should_panic(expected = "archivedb:")]
fn must_panics_on_error() {
    let mock = MockExecutor::new();
    let mut c = Collection::default();
    c.update(&mock, &["id"]).must();
}
