//! Graph traversal.
//!
//! A `TraversalDescription` bundles the walk order, the stop and return
//! evaluators, and the relationship filter. Applying it to a start node
//! yields a `Traverser`: a lazy iterator over nodes that also reports the
//! position (depth and path) of the node it last yielded.
//!
//! ```rust,no_run
//! use graphdb_embedded::{GraphDatabase, GraphRead, Direction, NodeId, RelType};
//! use graphdb_embedded::traversal::{TraversalDescription, evaluator};
//!
//! const KNOWS: RelType = RelType::from_static("KNOWS");
//!
//! # fn example(db: &GraphDatabase, peter: NodeId) -> graphdb_embedded::Result<()> {
//! let description = TraversalDescription::new()
//!     .breadth_first()
//!     .stop_evaluator(evaluator::END_OF_GRAPH)
//!     .return_evaluator(evaluator::ALL_BUT_START_NODE)
//!     .relationships(KNOWS, Direction::Outgoing);
//!
//! let mut friends = db.traverse(peter, &description)?;
//! while let Some(node) = friends.next() {
//!     let node = node?;
//!     let depth = friends.current_position().map(|p| p.depth()).unwrap_or(0);
//!     println!("{:?} at depth {depth}", node.get("name"));
//! }
//! # Ok(())
//! # }
//! ```
//!
//! Every node is visited at most once per walk: a neighbour is marked
//! visited when it is queued, so cycles cannot cause revisits.

pub mod evaluator;
pub mod expander;

use std::collections::VecDeque;
use std::sync::Arc;

use hashbrown::HashSet;
use tracing::trace;

use crate::model::*;
use crate::storage::GraphRead;
use crate::{Error, Result};

pub use evaluator::Evaluator;
pub use expander::Expander;

/// Walk order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Order {
    #[default]
    BreadthFirst,
    DepthFirst,
}

// ============================================================================
// Position
// ============================================================================

/// Where the walk is: a node, its depth, and how it was reached.
#[derive(Debug, Clone, PartialEq)]
pub struct Position {
    node: NodeId,
    depth: usize,
    path: Vec<RelId>,
    last_relationship: Option<Relationship>,
}

impl Position {
    pub(crate) fn start(node: NodeId) -> Self {
        Self { node, depth: 0, path: Vec::new(), last_relationship: None }
    }

    pub(crate) fn child(&self, rel: Relationship, node: NodeId) -> Self {
        let mut path = Vec::with_capacity(self.path.len() + 1);
        path.extend_from_slice(&self.path);
        path.push(rel.id);
        Self { node, depth: self.depth + 1, path, last_relationship: Some(rel) }
    }

    pub fn node(&self) -> NodeId { self.node }

    /// Hops from the start node (start = 0).
    pub fn depth(&self) -> usize { self.depth }

    /// Relationships traversed from the start node, in order.
    pub fn path(&self) -> &[RelId] { &self.path }

    /// The relationship used to reach this node; `None` at the start node.
    pub fn last_relationship(&self) -> Option<&Relationship> {
        self.last_relationship.as_ref()
    }

    pub fn is_start(&self) -> bool { self.depth == 0 }
}

// ============================================================================
// TraversalDescription
// ============================================================================

/// Reusable traversal settings.
///
/// Defaults: breadth-first, `END_OF_GRAPH`, `ALL`, every relationship in
/// both directions.
#[derive(Clone)]
pub struct TraversalDescription {
    order: Order,
    stop: Arc<dyn Evaluator>,
    returns: Arc<dyn Evaluator>,
    expander: Expander,
}

impl TraversalDescription {
    pub fn new() -> Self {
        Self {
            order: Order::BreadthFirst,
            stop: Arc::new(evaluator::END_OF_GRAPH),
            returns: Arc::new(evaluator::ALL),
            expander: Expander::all(),
        }
    }

    pub fn order(mut self, order: Order) -> Self {
        self.order = order;
        self
    }

    pub fn breadth_first(self) -> Self { self.order(Order::BreadthFirst) }

    pub fn depth_first(self) -> Self { self.order(Order::DepthFirst) }

    pub fn stop_evaluator(mut self, stop: impl Evaluator + 'static) -> Self {
        self.stop = Arc::new(stop);
        self
    }

    pub fn return_evaluator(mut self, returns: impl Evaluator + 'static) -> Self {
        self.returns = Arc::new(returns);
        self
    }

    /// Add a `(type, direction)` pair to the relationship filter.
    pub fn relationships(mut self, rel_type: impl Into<RelType>, dir: Direction) -> Self {
        self.expander = self.expander.add(rel_type, dir);
        self
    }

    pub fn expander(mut self, expander: Expander) -> Self {
        self.expander = expander;
        self
    }

    /// Start a walk at `start` over `graph`.
    pub fn traverse<G: GraphRead>(&self, graph: G, start: NodeId) -> Traverser<G> {
        Traverser {
            graph,
            start,
            order: self.order,
            stop: Arc::clone(&self.stop),
            returns: Arc::clone(&self.returns),
            expander: self.expander.clone(),
            frontier: VecDeque::new(),
            visited: HashSet::new(),
            current: None,
            started: false,
            done: false,
        }
    }
}

impl Default for TraversalDescription {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for TraversalDescription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TraversalDescription")
            .field("order", &self.order)
            .field("expander", &self.expander)
            .finish_non_exhaustive()
    }
}

// ============================================================================
// Traverser
// ============================================================================

/// Lazy, single-use walk. Yields `Result<Node>`; after an error the
/// iterator is exhausted.
pub struct Traverser<G> {
    graph: G,
    start: NodeId,
    order: Order,
    stop: Arc<dyn Evaluator>,
    returns: Arc<dyn Evaluator>,
    expander: Expander,
    /// Queue for breadth-first, stack (back = top) for depth-first.
    frontier: VecDeque<Position>,
    visited: HashSet<NodeId>,
    current: Option<Position>,
    started: bool,
    done: bool,
}

impl<G: GraphRead> Traverser<G> {
    /// Position of the node most recently yielded.
    pub fn current_position(&self) -> Option<&Position> {
        self.current.as_ref()
    }

    fn pop(&mut self) -> Option<Position> {
        match self.order {
            Order::BreadthFirst => self.frontier.pop_front(),
            Order::DepthFirst => self.frontier.pop_back(),
        }
    }

    fn expand(&mut self, position: &Position) -> Result<()> {
        let mut discovered = Vec::new();
        for (rel, neighbor) in self.expander.expand(&self.graph, position.node)? {
            if !self.visited.insert(neighbor) {
                continue;
            }
            trace!(from = %position.node, to = %neighbor, rel = %rel.id, depth = position.depth + 1, "queue node");
            discovered.push(position.child(rel, neighbor));
        }

        match self.order {
            Order::BreadthFirst => self.frontier.extend(discovered),
            // First-enumerated neighbour ends on top of the stack.
            Order::DepthFirst => self.frontier.extend(discovered.into_iter().rev()),
        }
        Ok(())
    }

    fn fail(&mut self, err: Error) -> Option<Result<Node>> {
        self.done = true;
        self.frontier.clear();
        Some(Err(err))
    }
}

impl<G: GraphRead> Iterator for Traverser<G> {
    type Item = Result<Node>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }

        if !self.started {
            self.started = true;
            match self.graph.contains_node(self.start) {
                Ok(true) => {}
                Ok(false) => return self.fail(Error::NotFound(format!("Node {}", self.start))),
                Err(e) => return self.fail(e),
            }
            self.visited.insert(self.start);
            self.frontier.push_back(Position::start(self.start));
        }

        while let Some(position) = self.pop() {
            if self.stop.should_expand(&position) {
                if let Err(e) = self.expand(&position) {
                    return self.fail(e);
                }
            }

            if self.returns.should_include(&position) {
                return match self.graph.node(position.node) {
                    Ok(node) => {
                        self.current = Some(position);
                        Some(Ok(node))
                    }
                    Err(e) => self.fail(e),
                };
            }
        }

        self.done = true;
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::GraphState;
    use crate::tx::Mutation;
    use pretty_assertions::assert_eq;

    const KNOWS: RelType = RelType::from_static("KNOWS");

    /// 1 → 2 → 3 → 1 (cycle) plus 2 → 4.
    fn cyclic() -> GraphState {
        let mut state = GraphState::new();
        for i in 1..=4 {
            state.apply(Mutation::CreateNode(NodeId(i))).unwrap();
        }
        for (id, (s, e)) in [(1, 2), (2, 3), (3, 1), (2, 4)].into_iter().enumerate() {
            state.apply(Mutation::CreateRelationship {
                id: RelId(id as u64 + 1),
                start: NodeId(s),
                end: NodeId(e),
                rel_type: KNOWS,
            }).unwrap();
        }
        state
    }

    fn walk(state: &GraphState, description: &TraversalDescription, start: u64) -> Vec<(u64, usize)> {
        let mut traverser = description.traverse(state, NodeId(start));
        let mut seen = Vec::new();
        while let Some(node) = traverser.next() {
            let node = node.unwrap();
            seen.push((node.id.0, traverser.current_position().unwrap().depth()));
        }
        seen
    }

    #[test]
    fn test_breadth_first_on_cycle() {
        let state = cyclic();
        let description = TraversalDescription::new().relationships(KNOWS, Direction::Outgoing);
        assert_eq!(walk(&state, &description, 1), vec![(1, 0), (2, 1), (3, 2), (4, 2)]);
    }

    #[test]
    fn test_both_directions_reach_everything_once() {
        let state = cyclic();
        let description = TraversalDescription::new()
            .return_evaluator(evaluator::ALL_BUT_START_NODE);
        let seen = walk(&state, &description, 3);
        let mut ids: Vec<u64> = seen.iter().map(|(id, _)| *id).collect();
        ids.sort();
        assert_eq!(ids, vec![1, 2, 4]);
    }

    #[test]
    fn test_depth_first_follows_first_branch() {
        let state = cyclic();
        let description = TraversalDescription::new()
            .depth_first()
            .relationships(KNOWS, Direction::Outgoing);
        // From 2: rel 2 (→3) enumerates before rel 4 (→4), so 3 is popped first.
        assert_eq!(walk(&state, &description, 2), vec![(2, 0), (3, 1), (1, 2), (4, 1)]);
    }

    #[test]
    fn test_stop_evaluator_still_returns_boundary_node() {
        let state = cyclic();
        let description = TraversalDescription::new()
            .stop_evaluator(evaluator::DEPTH_ONE)
            .return_evaluator(evaluator::ALL_BUT_START_NODE)
            .relationships(KNOWS, Direction::Outgoing);
        assert_eq!(walk(&state, &description, 1), vec![(2, 1)]);
    }

    #[test]
    fn test_incoming_direction() {
        let state = cyclic();
        let description = TraversalDescription::new()
            .return_evaluator(evaluator::ALL_BUT_START_NODE)
            .relationships(KNOWS, Direction::Incoming);
        assert_eq!(walk(&state, &description, 1), vec![(3, 1), (2, 2)]);
    }

    #[test]
    fn test_no_matching_relationships() {
        let state = cyclic();
        let description = TraversalDescription::new()
            .return_evaluator(evaluator::ALL_BUT_START_NODE)
            .relationships(RelType::from_static("LEADS_TO"), Direction::Both);
        assert!(walk(&state, &description, 1).is_empty());
    }

    #[test]
    fn test_unknown_start_node() {
        let state = cyclic();
        let mut traverser = TraversalDescription::new().traverse(&state, NodeId(99));
        assert!(matches!(traverser.next(), Some(Err(Error::NotFound(_)))));
        assert!(traverser.next().is_none());
    }

    #[test]
    fn test_position_path() {
        let state = cyclic();
        let mut traverser = TraversalDescription::new()
            .relationships(KNOWS, Direction::Outgoing)
            .return_evaluator(evaluator::include_where(|p| p.depth() == 2))
            .traverse(&state, NodeId(1));
        let node = traverser.next().unwrap().unwrap();
        assert_eq!(node.id, NodeId(3));
        let position = traverser.current_position().unwrap();
        assert_eq!(position.path(), &[RelId(1), RelId(2)]);
        assert_eq!(position.last_relationship().map(|r| r.id), Some(RelId(2)));
    }
}
