//! Pathfinding algorithms
//!
//! Dijkstra (weighted, cost read from a relationship property) and
//! breadth-first (unweighted, hop count) single-path search.

use std::cmp::Ordering;
use std::collections::{BinaryHeap, VecDeque};

use hashbrown::HashMap;
use tracing::trace;

use crate::model::*;
use crate::storage::GraphRead;
use crate::traversal::Expander;
use crate::{Error, Result};

/// Cost of traversing `rel`, or `None` if the relationship cannot be part of
/// a weighted path (property missing, non-numeric, negative or NaN).
pub fn edge_cost(rel: &Relationship, cost_property: &str) -> Option<f64> {
    rel.get(cost_property)
        .and_then(Value::as_float)
        .filter(|w| w.is_finite() && *w >= 0.0)
}

/// State for Dijkstra priority queue
#[derive(Debug, Clone, Copy)]
struct State {
    cost: f64,
    /// Discovery order; breaks cost ties in favour of the earlier entry.
    seq: u64,
    node: NodeId,
}

impl PartialEq for State {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for State {}

impl Ord for State {
    fn cmp(&self, other: &Self) -> Ordering {
        // Reversed for a min-heap on (cost, seq).
        other.cost.total_cmp(&self.cost).then_with(|| other.seq.cmp(&self.seq))
    }
}

impl PartialOrd for State {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Dijkstra's algorithm from `start` to `end`.
///
/// A tentative distance is only replaced by a strictly smaller one, and
/// neighbours are enumerated in expander order then relationship-id order,
/// so among equal-weight paths the first one discovered is returned.
///
/// Costs are summed as `f64`. A total past `f64::MAX` saturates to infinity:
/// the path is still found and reported with an infinite weight, but paths
/// that all overflow are no longer told apart by cost.
pub fn dijkstra<G: GraphRead>(
    graph: &G,
    expander: &Expander,
    cost_property: &str,
    start: NodeId,
    end: NodeId,
) -> Result<Path> {
    ensure_node(graph, start)?;
    ensure_node(graph, end)?;

    let mut tentative: HashMap<NodeId, f64> = HashMap::new();
    let mut finalized: HashMap<NodeId, f64> = HashMap::new();
    let mut parent: HashMap<NodeId, (Relationship, NodeId)> = HashMap::new();
    let mut heap = BinaryHeap::new();
    let mut seq = 0u64;

    tentative.insert(start, 0.0);
    heap.push(State { cost: 0.0, seq, node: start });

    while let Some(State { cost, node, .. }) = heap.pop() {
        if finalized.contains_key(&node) {
            continue;
        }
        if cost > *tentative.get(&node).unwrap_or(&f64::INFINITY) {
            continue;
        }
        finalized.insert(node, cost);
        trace!(node = %node, cost, "finalized");
        if node == end {
            break;
        }

        for (rel, next) in expander.expand(graph, node)? {
            if finalized.contains_key(&next) {
                continue;
            }
            let Some(weight) = edge_cost(&rel, cost_property) else {
                trace!(rel = %rel.id, property = cost_property, "skipping relationship without usable cost");
                continue;
            };

            // Can overflow to +inf; an unreached node still takes it.
            let next_cost = cost + weight;
            if tentative.get(&next).is_none_or(|&known| next_cost < known) {
                tentative.insert(next, next_cost);
                parent.insert(next, (rel, node));
                seq += 1;
                heap.push(State { cost: next_cost, seq, node: next });
            }
        }
    }

    let Some(&weight) = finalized.get(&end) else {
        return Err(Error::NoPathFound { start, end });
    };

    let mut path = build_path(graph, &parent, start, end, |rel| {
        edge_cost(rel, cost_property).unwrap_or_default()
    })?;
    path.weight = weight;
    Ok(path)
}

/// Breadth-first search for a path with the fewest hops, up to `max_depth`.
pub fn shortest_path<G: GraphRead>(
    graph: &G,
    expander: &Expander,
    max_depth: usize,
    start: NodeId,
    end: NodeId,
) -> Result<Path> {
    ensure_node(graph, start)?;
    ensure_node(graph, end)?;

    let mut queue = VecDeque::new();
    let mut depth: HashMap<NodeId, usize> = HashMap::new();
    let mut parent: HashMap<NodeId, (Relationship, NodeId)> = HashMap::new();

    queue.push_back(start);
    depth.insert(start, 0);

    while let Some(node) = queue.pop_front() {
        if node == end {
            return build_path(graph, &parent, start, end, |_| 1.0);
        }
        let current = depth[&node];
        if current >= max_depth {
            continue;
        }
        for (rel, next) in expander.expand(graph, node)? {
            if depth.contains_key(&next) {
                continue;
            }
            depth.insert(next, current + 1);
            parent.insert(next, (rel, node));
            queue.push_back(next);
        }
    }

    Err(Error::NoPathFound { start, end })
}

fn ensure_node<G: GraphRead>(graph: &G, id: NodeId) -> Result<()> {
    if graph.contains_node(id)? {
        Ok(())
    } else {
        Err(Error::NotFound(format!("Node {id}")))
    }
}

/// Walk parent pointers back from `end`, then replay forwards into a `Path`.
fn build_path<G: GraphRead>(
    graph: &G,
    parent: &HashMap<NodeId, (Relationship, NodeId)>,
    start: NodeId,
    end: NodeId,
    cost: impl Fn(&Relationship) -> f64,
) -> Result<Path> {
    let mut hops = Vec::new();
    let mut current = end;
    while current != start {
        let (rel, prev) = parent
            .get(&current)
            .ok_or_else(|| Error::NotFound(format!("predecessor of node {current}")))?;
        hops.push((rel.clone(), current));
        current = *prev;
    }
    hops.reverse();

    let mut path = Path::single(graph.node(start)?);
    for (rel, node) in hops {
        let c = cost(&rel);
        path.append(rel, graph.node(node)?, c);
    }
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::GraphState;
    use crate::tx::Mutation;

    const ROAD: RelType = RelType::from_static("ROAD");

    /// Diamond 1→2→4 and 1→3→4, each leg cost `legs[i]`.
    fn diamond(legs: [Value; 4]) -> GraphState {
        let mut state = GraphState::new();
        for i in 1..=4 {
            state.apply(Mutation::CreateNode(NodeId(i))).unwrap();
        }
        let edges = [(1, 2), (2, 4), (1, 3), (3, 4)];
        for (i, ((s, e), cost)) in edges.into_iter().zip(legs).enumerate() {
            let id = RelId(i as u64 + 1);
            state.apply(Mutation::CreateRelationship { id, start: NodeId(s), end: NodeId(e), rel_type: ROAD }).unwrap();
            state.apply(Mutation::SetProperty { entity: id.into(), key: "cost".into(), value: cost }).unwrap();
        }
        state
    }

    #[test]
    fn test_dijkstra_prefers_cheaper_leg() {
        let state = diamond([Value::Int(5), Value::Int(5), Value::Int(1), Value::Float(2.5)]);
        let path = dijkstra(&state, &Expander::for_type(ROAD, Direction::Outgoing), "cost", NodeId(1), NodeId(4)).unwrap();
        assert_eq!(path.node_ids(), vec![NodeId(1), NodeId(3), NodeId(4)]);
        assert_eq!(path.weight, 3.5);
    }

    #[test]
    fn test_dijkstra_tie_is_deterministic() {
        let state = diamond([Value::Int(1), Value::Int(1), Value::Int(1), Value::Int(1)]);
        let expander = Expander::for_type(ROAD, Direction::Outgoing);
        for _ in 0..5 {
            let path = dijkstra(&state, &expander, "cost", NodeId(1), NodeId(4)).unwrap();
            // Leg via node 2 uses the lower relationship ids and is discovered first.
            assert_eq!(path.node_ids(), vec![NodeId(1), NodeId(2), NodeId(4)]);
            assert_eq!(path.weight, 2.0);
        }
    }

    #[test]
    fn test_dijkstra_skips_edges_without_cost() {
        let mut state = diamond([Value::Int(1), Value::Int(1), Value::Int(1), Value::Int(1)]);
        for rel in [RelId(1), RelId(3)] {
            state.apply(Mutation::RemoveProperty { entity: rel.into(), key: "cost".into() }).unwrap();
        }
        let err = dijkstra(&state, &Expander::all(), "cost", NodeId(1), NodeId(4)).unwrap_err();
        assert!(matches!(err, Error::NoPathFound { .. }));
    }

    #[test]
    fn test_non_numeric_and_negative_costs_are_unusable() {
        let rel = Relationship::new(RelId(1), NodeId(1), NodeId(2), ROAD)
            .with_property("a", "10")
            .with_property("b", -1)
            .with_property("c", f64::NAN)
            .with_property("d", 0);
        assert_eq!(edge_cost(&rel, "a"), None);
        assert_eq!(edge_cost(&rel, "b"), None);
        assert_eq!(edge_cost(&rel, "c"), None);
        assert_eq!(edge_cost(&rel, "d"), Some(0.0));
        assert_eq!(edge_cost(&rel, "missing"), None);
    }

    #[test]
    fn test_overflowing_total_still_finds_path() {
        let state = diamond([Value::Float(f64::MAX), Value::Float(f64::MAX), Value::Float(f64::MAX), Value::Float(f64::MAX)]);
        let expander = Expander::for_type(ROAD, Direction::Outgoing);
        let path = dijkstra(&state, &expander, "cost", NodeId(1), NodeId(4)).unwrap();
        assert_eq!(path.node_ids(), vec![NodeId(1), NodeId(2), NodeId(4)]);
        assert!(path.weight.is_infinite() && path.weight > 0.0);
    }

    #[test]
    fn test_direction_matters() {
        let state = diamond([Value::Int(1), Value::Int(1), Value::Int(1), Value::Int(1)]);
        let outgoing = Expander::for_type(ROAD, Direction::Outgoing);
        assert!(dijkstra(&state, &outgoing, "cost", NodeId(4), NodeId(1)).is_err());
        let both = Expander::for_type(ROAD, Direction::Both);
        assert_eq!(dijkstra(&state, &both, "cost", NodeId(4), NodeId(1)).unwrap().weight, 2.0);
    }

    #[test]
    fn test_start_equals_end() {
        let state = diamond([Value::Int(1), Value::Int(1), Value::Int(1), Value::Int(1)]);
        let path = dijkstra(&state, &Expander::all(), "cost", NodeId(2), NodeId(2)).unwrap();
        assert!(path.is_empty());
        assert_eq!(path.weight, 0.0);
    }

    #[test]
    fn test_bfs_hops_and_depth_limit() {
        let state = diamond([Value::Int(9), Value::Int(9), Value::Int(1), Value::Int(1)]);
        let expander = Expander::for_type(ROAD, Direction::Outgoing);
        let path = shortest_path(&state, &expander, 5, NodeId(1), NodeId(4)).unwrap();
        assert_eq!(path.len(), 2);
        assert_eq!(path.weight, 2.0);
        assert!(shortest_path(&state, &expander, 1, NodeId(1), NodeId(4)).is_err());
    }
}
