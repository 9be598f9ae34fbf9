//! Relationship loading and mutation against a scripted executor.

mod common;

use archivedb_core::{Entity, Error, Value};
use archivedb_query::testing::{MockExecutor, db_error, row};
use common::*;
use pretty_assertions::assert_eq;

fn cover_row(id: i64, folder_id: i64, url: &str) -> archivedb_core::Row {
    row(
        ["id", "folder_id", "url"],
        [Value::BigInt(id), Value::BigInt(folder_id), Value::from(url)],
    )
}

#[test]
fn belongs_to_loads_in_one_query() {
    init_tracing();
    let mock = MockExecutor::new();
    mock.push_rows(vec![folder_row(11, "b", None), folder_row(10, "a", None)]);

    let mut notes = vec![
        note(1, Some(10), "one"),
        note(2, None, "two"),
        note(3, Some(11), "three"),
        note(4, Some(10), "four"),
    ];
    NOTE_FOLDER.load(&mock, &mut notes).unwrap();

    let stmt = mock.last().unwrap();
    assert_eq!(stmt.sql, "SELECT * FROM \"folders\" WHERE \"id\" IN ($1,$2)");
    assert_eq!(stmt.params, vec![Value::BigInt(10), Value::BigInt(11)]);

    assert_eq!(notes[0].rels().folder.get().unwrap().name, "a");
    assert_eq!(notes[2].rels().folder.get().unwrap().name, "b");
    // NULL foreign key: loaded, nothing attached.
    assert!(notes[1].rels().folder.is_loaded());
    assert!(notes[1].rels().folder.is_empty());
    // Owners sharing a foreign key share the loaded row.
    let first = notes[0].rels().folder.get_arc().cloned().unwrap();
    let fourth = notes[3].rels().folder.get_arc().cloned().unwrap();
    assert_eq!(fourth.id, 10);
    assert!(std::sync::Arc::ptr_eq(&first, &fourth));
}

#[test]
fn has_many_feeds_every_owner_with_the_key() {
    let mock = MockExecutor::new();
    mock.push_rows(vec![note_row(10, Some(1), "a"), note_row(11, Some(1), "b")]);

    let mut folders = vec![folder(1, "one", None), folder(1, "one again", None)];
    FOLDER_NOTES.load(&mock, &mut folders).unwrap();

    assert_eq!(mock.last().unwrap().params, vec![Value::BigInt(1)]);
    for f in &mut folders {
        let ids: Vec<_> = f.rels().notes.iter().map(|n| n.id).collect();
        assert_eq!(ids, vec![10, 11]);
    }
}

#[test]
fn has_one_and_many_to_many_share_rows_between_equal_owners() {
    let mock = MockExecutor::new();
    mock.push_rows(vec![cover_row(7, 2, "two.png")]);
    let mut folders = vec![folder(2, "two", None), folder(2, "two", None)];
    FOLDER_COVER.load(&mock, &mut folders).unwrap();
    assert_eq!(folders[0].rels().cover.get().unwrap().id, 7);
    assert_eq!(folders[1].rels().cover.get().unwrap().id, 7);

    mock.push_rows(vec![label_row(100, "x", 1)]);
    let mut notes = vec![note(1, None, "one"), note(1, None, "one")];
    NOTE_LABELS.load(&mock, &mut notes).unwrap();
    for n in &mut notes {
        let ids: Vec<_> = n.rels().labels.iter().map(|l| l.id).collect();
        assert_eq!(ids, vec![100]);
    }
}

#[test]
fn loads_do_not_set_back_references() {
    let mock = MockExecutor::new();
    mock.push_rows(vec![folder_row(10, "a", None)]);
    let mut notes = vec![note(1, Some(10), "one")];
    NOTE_FOLDER.load(&mock, &mut notes).unwrap();

    let owner = notes[0].rels().folder.get().unwrap();
    assert!(owner.r.is_none());
}

#[test]
fn load_without_keys_issues_no_query() {
    let mock = MockExecutor::new();
    let mut notes = vec![note(1, None, "one"), note(2, None, "two")];
    NOTE_FOLDER.load(&mock, &mut notes).unwrap();

    assert_eq!(mock.call_count(), 0);
    assert!(notes.iter_mut().all(|n| n.rels().folder.is_loaded()));

    let mut empty: Vec<Folder> = Vec::new();
    FOLDER_NOTES.load(&mock, &mut empty).unwrap();
    assert_eq!(mock.call_count(), 0);
}

#[test]
fn has_many_groups_rows_by_owner() {
    let mock = MockExecutor::new();
    mock.push_rows(vec![
        note_row(10, Some(1), "a"),
        note_row(12, Some(2), "c"),
        note_row(11, Some(1), "b"),
    ]);

    let mut folders = vec![folder(1, "one", None), folder(2, "two", None), folder(3, "three", None)];
    FOLDER_NOTES.load(&mock, &mut folders).unwrap();

    assert_eq!(
        mock.sql(),
        vec!["SELECT * FROM \"notes\" WHERE \"folder_id\" IN ($1,$2,$3)"]
    );
    let titles: Vec<_> = folders[0].rels().notes.iter().map(|n| n.title.clone()).collect();
    assert_eq!(titles, vec!["a", "b"]);
    assert_eq!(folders[1].rels().notes.len(), 1);
    assert!(folders[2].rels().notes.is_loaded());
    assert!(folders[2].rels().notes.is_empty());
}

#[test]
fn has_one_attaches_single_row() {
    let mock = MockExecutor::new();
    mock.push_rows(vec![cover_row(7, 2, "two.png")]);

    let mut folders = vec![folder(1, "one", None), folder(2, "two", None)];
    FOLDER_COVER.load(&mock, &mut folders).unwrap();

    assert_eq!(
        mock.sql(),
        vec!["SELECT * FROM \"covers\" WHERE \"folder_id\" IN ($1,$2)"]
    );
    assert!(folders[0].rels().cover.is_empty());
    assert_eq!(folders[1].rels().cover.get().unwrap().url, "two.png");
}

#[test]
fn many_to_many_joins_through_bridge() {
    let mock = MockExecutor::new();
    mock.push_rows(vec![
        label_row(100, "x", 1),
        label_row(101, "y", 1),
        label_row(100, "x", 2),
    ]);

    let mut notes = vec![note(1, None, "one"), note(2, None, "two")];
    NOTE_LABELS.load(&mock, &mut notes).unwrap();

    assert_eq!(
        mock.sql(),
        vec![
            "SELECT \"a\".*, \"b\".\"note_id\" AS \"__owner_key\" FROM \"labels\" AS \"a\" \
             INNER JOIN \"note_labels\" AS \"b\" ON \"a\".\"id\" = \"b\".\"label_id\" \
             WHERE \"b\".\"note_id\" IN ($1,$2)"
        ]
    );
    assert_eq!(notes[0].rels().labels.len(), 2);
    let second: Vec<_> = notes[1].rels().labels.iter().map(|l| l.id).collect();
    assert_eq!(second, vec![100]);
}

#[test]
fn failed_load_leaves_owners_untouched() {
    let mock = MockExecutor::new();
    mock.fail_next(db_error("57014", "canceling statement"));
    let mut folders = vec![folder(1, "one", None)];
    let err = FOLDER_NOTES.load(&mock, &mut folders).unwrap_err();
    assert_eq!(err.sqlstate(), Some("57014"));
    assert!(folders[0].r.is_none());

    // A row that fails to decode aborts before anything is attached.
    mock.push_rows(vec![note_row(10, Some(1), "ok"), row(["id"], [Value::BigInt(11)])]);
    assert!(matches!(
        FOLDER_NOTES.load(&mock, &mut folders).unwrap_err(),
        Error::Type(_)
    ));
    assert!(folders[0].r.is_none());
}

#[test]
fn belongs_to_set_inserts_and_points_owner() {
    let mock = MockExecutor::new();
    mock.push_row(row(["id"], [Value::BigInt(20)]));

    let mut n = note(5, None, "orphan");
    let parent = NOTE_FOLDER
        .set(&mock, &mut n, folder(0, "new", None), true)
        .unwrap();

    let stmts = mock.statements();
    assert_eq!(
        stmts[0].sql,
        "INSERT INTO \"folders\" (\"name\",\"parent_id\") VALUES ($1,$2) RETURNING \"id\""
    );
    assert_eq!(stmts[1].sql, "UPDATE \"notes\" SET \"folder_id\"=$1 WHERE \"id\"=$2");
    assert_eq!(stmts[1].params, vec![Value::BigInt(20), Value::BigInt(5)]);

    assert_eq!(n.folder_id, Some(20));
    assert_eq!(n.rels().folder.get().unwrap().id, 20);
    let back: Vec<_> = parent.r.as_ref().unwrap().notes.iter().map(|n| n.id).collect();
    assert_eq!(back, vec![5]);
}

#[test]
fn belongs_to_remove_nulls_foreign_key() {
    let mock = MockExecutor::new();
    let mut n = note(5, None, "child");
    let mut parent = folder(20, "p", None);
    NOTE_FOLDER.set(&mock, &mut n, parent.clone(), false).unwrap();
    parent.rels().notes.push(std::sync::Arc::new(n.detached()));
    mock.clear();

    NOTE_FOLDER.remove(&mock, &mut n, &mut parent).unwrap();

    let stmt = mock.last().unwrap();
    assert_eq!(stmt.sql, "UPDATE \"notes\" SET \"folder_id\"=$1 WHERE \"id\"=$2");
    assert_eq!(stmt.params, vec![Value::Null, Value::BigInt(5)]);
    assert_eq!(n.folder_id, None);
    assert!(n.rels().folder.is_loaded());
    assert!(n.rels().folder.is_empty());
    assert!(parent.rels().notes.is_empty());
}

#[test]
fn failed_remove_keeps_foreign_key_in_memory() {
    let mock = MockExecutor::new();
    let mut n = note(5, Some(20), "child");
    let mut parent = folder(20, "p", None);

    mock.fail_next(db_error("40P01", "deadlock detected"));
    let err = NOTE_FOLDER.remove(&mock, &mut n, &mut parent).unwrap_err();
    assert_eq!(err.sqlstate(), Some("40P01"));
    assert_eq!(n.folder_id, Some(20));

    let mut f = folder(1, "one", None);
    let mut gone = vec![note(10, Some(1), "a")];
    mock.fail_next(db_error("40P01", "deadlock detected"));
    FOLDER_NOTES.remove(&mock, &mut f, &mut gone).unwrap_err();
    assert_eq!(gone[0].folder_id, Some(1));
}

#[test]
fn self_referencing_parent() {
    let mock = MockExecutor::new();
    let mut child = folder(2, "child", None);
    let parent = FOLDER_PARENT
        .set(&mock, &mut child, folder(1, "root", None), false)
        .unwrap();

    assert_eq!(
        mock.sql(),
        vec!["UPDATE \"folders\" SET \"parent_id\"=$1 WHERE \"id\"=$2"]
    );
    assert_eq!(child.parent_id, Some(1));
    let children: Vec<_> = parent.r.as_ref().unwrap().children.iter().map(|f| f.id).collect();
    assert_eq!(children, vec![2]);
}

#[test]
fn non_nullable_foreign_key_cannot_be_removed() {
    let mock = MockExecutor::new();
    let mut f = folder(1, "one", None);
    let mut c = Cover {
        id: 7,
        folder_id: 1,
        url: "x.png".to_string(),
        r: None,
    };
    let err = FOLDER_COVER.remove(&mock, &mut f, &mut c).unwrap_err();
    assert!(matches!(err, Error::Relationship(ref e) if e.relationship == "Cover"));
    assert_eq!(mock.call_count(), 0);
}

#[test]
fn has_one_set_inserts_with_owner_key() {
    let mock = MockExecutor::new();
    mock.push_row(row(["id"], [Value::BigInt(7)]));

    let mut f = folder(1, "one", None);
    let cover = Cover {
        url: "one.png".to_string(),
        ..Cover::default()
    };
    let cover = FOLDER_COVER.set(&mock, &mut f, cover, true).unwrap();

    let stmt = mock.last().unwrap();
    assert_eq!(
        stmt.sql,
        "INSERT INTO \"covers\" (\"folder_id\",\"url\") VALUES ($1,$2) RETURNING \"id\""
    );
    assert_eq!(stmt.params, vec![Value::BigInt(1), Value::from("one.png")]);
    assert_eq!(cover.id, 7);
    assert_eq!(cover.r.as_ref().unwrap().folder.get().unwrap().id, 1);
    assert_eq!(f.rels().cover.get().unwrap().id, 7);
}

#[test]
fn has_many_add_inserts_each_record() {
    let mock = MockExecutor::new();
    mock.push_row(row(["id"], [Value::BigInt(10)]))
        .push_row(row(["id"], [Value::BigInt(11)]));

    let mut f = folder(1, "one", None);
    let added = FOLDER_NOTES
        .add(&mock, &mut f, vec![note(0, None, "a"), note(0, None, "b")], true)
        .unwrap();

    assert_eq!(mock.call_count(), 2);
    assert!(mock.statements().iter().all(|s| s.params[0] == Value::BigInt(1)));
    assert_eq!(added.iter().map(|n| n.id).collect::<Vec<_>>(), vec![10, 11]);
    assert_eq!(added[0].folder_id, Some(1));
    assert_eq!(added[1].r.as_ref().unwrap().folder.get().unwrap().id, 1);
    assert_eq!(f.rels().notes.len(), 2);
}

#[test]
fn has_many_add_existing_updates_foreign_keys() {
    let mock = MockExecutor::new();
    let mut f = folder(1, "one", None);
    FOLDER_NOTES
        .add(&mock, &mut f, vec![note(10, None, "a")], false)
        .unwrap();

    let stmt = mock.last().unwrap();
    assert_eq!(stmt.sql, "UPDATE \"notes\" SET \"folder_id\"=$1 WHERE \"id\"=$2");
    assert_eq!(stmt.params, vec![Value::BigInt(1), Value::BigInt(10)]);
}

#[test]
fn has_many_set_detaches_previous_rows_first() {
    let mock = MockExecutor::new();
    let mut f = folder(1, "one", None);
    FOLDER_NOTES
        .add(&mock, &mut f, vec![note(10, None, "a")], false)
        .unwrap();
    mock.clear();

    FOLDER_NOTES
        .set(&mock, &mut f, vec![note(11, None, "b")], false)
        .unwrap();

    assert_eq!(
        mock.sql(),
        vec![
            "UPDATE \"notes\" SET \"folder_id\"=NULL WHERE \"folder_id\"=$1",
            "UPDATE \"notes\" SET \"folder_id\"=$1 WHERE \"id\"=$2",
        ]
    );
    let ids: Vec<_> = f.rels().notes.iter().map(|n| n.id).collect();
    assert_eq!(ids, vec![11]);
}

#[test]
fn has_many_remove_drops_only_named_rows() {
    let mock = MockExecutor::new();
    let mut f = folder(1, "one", None);
    let added = FOLDER_NOTES
        .add(&mock, &mut f, vec![note(10, None, "a"), note(11, None, "b")], false)
        .unwrap();
    mock.clear();

    let mut gone = vec![(*added[0]).clone()];
    FOLDER_NOTES.remove(&mock, &mut f, &mut gone).unwrap();

    let stmt = mock.last().unwrap();
    assert_eq!(stmt.sql, "UPDATE \"notes\" SET \"folder_id\"=$1 WHERE \"id\"=$2");
    assert_eq!(stmt.params, vec![Value::Null, Value::BigInt(10)]);
    assert_eq!(gone[0].folder_id, None);
    assert!(gone[0].r.as_ref().unwrap().folder.is_empty());
    let ids: Vec<_> = f.rels().notes.iter().map(|n| n.id).collect();
    assert_eq!(ids, vec![11]);
}

#[test]
fn many_to_many_add_set_remove() {
    let mock = MockExecutor::new();
    let mut n = note(1, None, "one");

    let added = NOTE_LABELS
        .add(&mock, &mut n, vec![label(100, "x")], false)
        .unwrap();
    let stmt = mock.last().unwrap();
    assert_eq!(
        stmt.sql,
        "INSERT INTO \"note_labels\" (\"note_id\",\"label_id\") VALUES ($1,$2)"
    );
    assert_eq!(stmt.params, vec![Value::BigInt(1), Value::BigInt(100)]);
    let back: Vec<_> = added[0].r.as_ref().unwrap().notes.iter().map(|n| n.id).collect();
    assert_eq!(back, vec![1]);

    mock.clear();
    NOTE_LABELS
        .set(&mock, &mut n, vec![label(101, "y"), label(102, "z")], false)
        .unwrap();
    assert_eq!(
        mock.sql()[0],
        "DELETE FROM \"note_labels\" WHERE \"note_id\"=$1"
    );
    assert_eq!(mock.call_count(), 3);
    assert_eq!(n.rels().labels.len(), 2);

    mock.clear();
    let mut gone = vec![label(101, "y"), label(102, "z")];
    NOTE_LABELS.remove(&mock, &mut n, &mut gone).unwrap();
    let stmt = mock.last().unwrap();
    assert_eq!(
        stmt.sql,
        "DELETE FROM \"note_labels\" WHERE \"note_id\"=$1 AND \"label_id\" IN ($2,$3)"
    );
    assert_eq!(
        stmt.params,
        vec![Value::BigInt(1), Value::BigInt(101), Value::BigInt(102)]
    );
    assert!(n.rels().labels.is_empty());

    mock.clear();
    NOTE_LABELS.remove(&mock, &mut n, &mut []).unwrap();
    assert_eq!(mock.call_count(), 0);
}

#[test]
fn many_to_many_insert_before_linking() {
    let mock = MockExecutor::new();
    mock.push_row(row(["id"], [Value::BigInt(300)]));
    let mut n = note(1, None, "one");
    NOTE_LABELS
        .add(&mock, &mut n, vec![label(0, "fresh")], true)
        .unwrap();

    let sql = mock.sql();
    assert_eq!(sql[0], "INSERT INTO \"labels\" (\"name\") VALUES ($1) RETURNING \"id\"");
    assert_eq!(mock.last().unwrap().params, vec![Value::BigInt(1), Value::BigInt(300)]);
}
