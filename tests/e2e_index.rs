//! End-to-end property index tests: transactional registration, exact and
//! single lookups, removal, and consistency with committed state.

use graphdb_embedded::{Error, GraphDatabase, GraphRead, NodeId, RelType, Value};
use pretty_assertions::assert_eq;
use proptest::prelude::*;

fn create_user(db: &GraphDatabase, username: &str) -> NodeId {
    let users = db.node_index("users");
    let mut tx = db.begin().unwrap();
    let id = tx.create_node().unwrap();
    tx.set_property(id, "username", username).unwrap();
    users.add(&mut tx, id, "username", username).unwrap();
    tx.success();
    tx.finish().unwrap();
    id
}

#[test]
fn test_lookup_by_username() {
    let db = GraphDatabase::open_in_memory().unwrap();
    let ids: Vec<NodeId> = (1..=10).map(|i| create_user(&db, &format!("user{i}@example.org"))).collect();

    let users = db.node_index("users");
    let found = users.get_single(&db, "username", "user7@example.org").unwrap();
    assert_eq!(found, ids[6]);
    assert_eq!(
        db.get_property(found, "username").unwrap(),
        Some(Value::from("user7@example.org"))
    );
    assert_eq!(users.query(&db, "username").unwrap(), ids);
}

#[test]
fn test_get_single_errors() {
    let db = GraphDatabase::open_in_memory().unwrap();
    create_user(&db, "twin");
    create_user(&db, "twin");

    let users = db.node_index("users");
    assert_eq!(users.get(&db, "username", "twin").unwrap().len(), 2);
    assert!(matches!(
        users.get_single(&db, "username", "twin"),
        Err(Error::AmbiguousMatch { count: 2, .. })
    ));
    assert!(matches!(users.get_single(&db, "username", "nobody"), Err(Error::NotFound(_))));
}

#[test]
fn test_rolled_back_registration_is_absent() {
    let db = GraphDatabase::open_in_memory().unwrap();
    let users = db.node_index("users");

    let mut tx = db.begin().unwrap();
    let id = tx.create_node().unwrap();
    users.add(&mut tx, id, "username", "ghost").unwrap();
    tx.rollback().unwrap();
    drop(tx);

    assert!(users.get(&db, "username", "ghost").unwrap().is_empty());
    assert!(!db.contains_node(id).unwrap());
    assert!(db.index_names().unwrap().is_empty());
}

#[test]
fn test_index_entry_for_missing_entity_fails_commit() {
    let db = GraphDatabase::open_in_memory().unwrap();
    let users = db.node_index("users");

    let mut tx = db.begin().unwrap();
    users.add(&mut tx, NodeId(77), "username", "nobody").unwrap();
    assert!(matches!(tx.commit(), Err(Error::NotFound(_))));
    drop(tx);

    assert!(users.get(&db, "username", "nobody").unwrap().is_empty());
}

#[test]
fn test_multiple_keys_and_removal() {
    let db = GraphDatabase::open_in_memory().unwrap();
    let people = db.node_index("people");

    let mut tx = db.begin().unwrap();
    let ada = tx.create_node().unwrap();
    people.add(&mut tx, ada, "name", "Ada").unwrap();
    people.add(&mut tx, ada, "born", 1815).unwrap();
    tx.commit().unwrap();
    drop(tx);

    assert_eq!(people.get(&db, "born", 1815).unwrap(), vec![ada]);
    // Exact per variant.
    assert!(people.get(&db, "born", 1815.0).unwrap().is_empty());

    let mut tx = db.begin().unwrap();
    people.remove(&mut tx, ada, "born", 1815).unwrap();
    tx.commit().unwrap();
    drop(tx);
    assert!(people.get(&db, "born", 1815).unwrap().is_empty());
    assert_eq!(people.get(&db, "name", "Ada").unwrap(), vec![ada]);

    let mut tx = db.begin().unwrap();
    people.remove_entity(&mut tx, ada).unwrap();
    tx.commit().unwrap();
    drop(tx);
    assert!(people.query(&db, "name").unwrap().is_empty());
}

#[test]
fn test_detach_delete_purges_entries() {
    let db = GraphDatabase::open_in_memory().unwrap();
    let people = db.node_index("people");
    let follows = db.relationship_index("follows");

    let mut tx = db.begin().unwrap();
    let a = tx.create_node().unwrap();
    let b = tx.create_node().unwrap();
    let rel = tx.create_relationship(a, b, RelType::from_static("FOLLOWS")).unwrap();
    people.add(&mut tx, a, "name", "a").unwrap();
    follows.add(&mut tx, rel, "since", 2020).unwrap();
    tx.commit().unwrap();
    drop(tx);
    assert_eq!(follows.get_single(&db, "since", 2020).unwrap(), rel);

    let mut tx = db.begin().unwrap();
    tx.detach_delete_node(a).unwrap();
    tx.commit().unwrap();
    drop(tx);

    assert!(people.get(&db, "name", "a").unwrap().is_empty());
    assert!(follows.get(&db, "since", 2020).unwrap().is_empty());
    assert_eq!(db.relationship_count().unwrap(), 0);
}

#[test]
fn test_node_and_relationship_indexes_are_separate() {
    let db = GraphDatabase::open_in_memory().unwrap();
    let nodes = db.node_index("shared");
    let rels = db.relationship_index("shared");

    let mut tx = db.begin().unwrap();
    let a = tx.create_node().unwrap();
    nodes.add(&mut tx, a, "k", true).unwrap();
    tx.commit().unwrap();
    drop(tx);

    assert_eq!(nodes.get(&db, "k", true).unwrap(), vec![a]);
    assert!(rels.get(&db, "k", true).unwrap().is_empty());
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    #[test]
    fn prop_index_matches_committed_properties(names in prop::collection::vec("[a-c]", 1..20)) {
        let db = GraphDatabase::open_in_memory().unwrap();
        let idx = db.node_index("by_name");

        let mut tx = db.begin().unwrap();
        let mut created = Vec::new();
        for name in &names {
            let id = tx.create_node().unwrap();
            tx.set_property(id, "name", name.as_str()).unwrap();
            idx.add(&mut tx, id, "name", name.as_str()).unwrap();
            created.push((id, name.clone()));
        }
        tx.commit().unwrap();
        drop(tx);

        for letter in ["a", "b", "c"] {
            let expected: Vec<NodeId> = created
                .iter()
                .filter(|(_, n)| n == letter)
                .map(|(id, _)| *id)
                .collect();
            let found = idx.get(&db, "name", letter).unwrap();
            prop_assert_eq!(&found, &expected);
            for id in found {
                prop_assert_eq!(db.get_property(id, "name").unwrap(), Some(Value::from(letter)));
            }
        }
    }
}
