//! Role-based access walk: user -[HAS_ROLE]-> role -[HAS_PERMISSION]-> permission.

use graphdb_embedded::traversal::evaluator;
use graphdb_embedded::{
    Direction, GraphDatabase, NodeId, RelType, TraversalDescription, Value,
};
use pretty_assertions::assert_eq;

const HAS_ROLE: RelType = RelType::from_static("HAS_ROLE");
const HAS_PERMISSION: RelType = RelType::from_static("HAS_PERMISSION");

struct Acl {
    db: GraphDatabase,
    alice: NodeId,
    bob: NodeId,
}

fn setup_acl() -> Acl {
    let db = GraphDatabase::open_in_memory().unwrap();
    let mut tx = db.begin().unwrap();

    let mut entity = |kind: &str, name: &str| {
        let id = tx.create_node().unwrap();
        tx.set_property(id, "kind", kind).unwrap();
        tx.set_property(id, "name", name).unwrap();
        id
    };
    let alice = entity("user", "alice");
    let bob = entity("user", "bob");
    let admin = entity("role", "admin");
    let reader = entity("role", "reader");
    let write = entity("permission", "write");
    let read = entity("permission", "read");

    tx.create_relationship(alice, admin, HAS_ROLE).unwrap();
    tx.create_relationship(bob, reader, HAS_ROLE).unwrap();
    tx.create_relationship(admin, write, HAS_PERMISSION).unwrap();
    tx.create_relationship(admin, read, HAS_PERMISSION).unwrap();
    tx.create_relationship(reader, read, HAS_PERMISSION).unwrap();
    tx.success();
    tx.finish().unwrap();

    Acl { db, alice, bob }
}

fn acl_walk() -> TraversalDescription {
    TraversalDescription::new()
        .breadth_first()
        .return_evaluator(evaluator::ALL_BUT_START_NODE)
        .relationships(HAS_ROLE, Direction::Outgoing)
        .relationships(HAS_PERMISSION, Direction::Outgoing)
}

fn walk(acl: &Acl, user: NodeId, description: &TraversalDescription) -> Vec<(String, String, usize)> {
    let mut walk = acl.db.traverse(user, description).unwrap();
    let mut out = Vec::new();
    while let Some(node) = walk.next() {
        let node = node.unwrap();
        let field = |key: &str| node.get(key).and_then(Value::as_str).unwrap_or_default().to_string();
        out.push((field("kind"), field("name"), walk.current_position().unwrap().depth()));
    }
    out
}

#[test]
fn test_role_then_permission_depths() {
    let acl = setup_acl();
    let found = walk(&acl, acl.alice, &acl_walk());

    assert_eq!(
        found,
        vec![
            ("role".to_string(), "admin".to_string(), 1),
            ("permission".to_string(), "write".to_string(), 2),
            ("permission".to_string(), "read".to_string(), 2),
        ]
    );
}

#[test]
fn test_permissions_only() {
    let acl = setup_acl();
    let description = acl_walk().return_evaluator(evaluator::include_where(|p| {
        p.last_relationship()
            .is_some_and(|rel| rel.rel_type == HAS_PERMISSION)
    }));

    let names: Vec<String> = walk(&acl, acl.bob, &description).into_iter().map(|(_, name, _)| name).collect();
    assert_eq!(names, vec!["read"]);
}

#[test]
fn test_depth_one_stops_at_roles() {
    let acl = setup_acl();
    let description = acl_walk().stop_evaluator(evaluator::DEPTH_ONE);
    let found = walk(&acl, acl.alice, &description);
    assert_eq!(found, vec![("role".to_string(), "admin".to_string(), 1)]);
}

#[test]
fn test_depth_first_visits_same_set() {
    let acl = setup_acl();
    let mut bfs = walk(&acl, acl.alice, &acl_walk());
    let mut dfs = walk(&acl, acl.alice, &acl_walk().depth_first());
    bfs.sort();
    dfs.sort();
    assert_eq!(bfs, dfs);
}

#[test]
fn test_reverse_lookup_who_can_read() {
    let acl = setup_acl();
    let read = acl
        .db
        .traverse(acl.bob, &acl_walk().return_evaluator(evaluator::include_where(|p| p.depth() == 2)))
        .unwrap()
        .next()
        .unwrap()
        .unwrap()
        .id;

    let who = TraversalDescription::new()
        .return_evaluator(evaluator::include_where(|p| p.depth() == 2))
        .relationships(HAS_PERMISSION, Direction::Incoming)
        .relationships(HAS_ROLE, Direction::Incoming);
    let users: Vec<NodeId> = acl.db.traverse(read, &who).unwrap().map(|n| n.unwrap().id).collect();
    assert_eq!(users, vec![acl.alice, acl.bob]);
}
