//! Stop and return policies.
//!
//! A traversal consults two evaluators for every node it pops: the stop
//! evaluator's `should_expand` decides whether the node's neighbours are
//! queued, the return evaluator's `should_include` decides whether the node
//! is yielded. Both methods default to `true`, so an implementation only
//! overrides the one it cares about.

use super::Position;

/// Traversal policy.
pub trait Evaluator: Send + Sync {
    fn should_expand(&self, _position: &Position) -> bool {
        true
    }

    fn should_include(&self, _position: &Position) -> bool {
        true
    }
}

/// Never stop: expand until the reachable graph is exhausted.
#[derive(Debug, Clone, Copy, Default)]
pub struct EndOfGraph;

impl Evaluator for EndOfGraph {}

/// Yield every node, the start node included.
#[derive(Debug, Clone, Copy, Default)]
pub struct All;

impl Evaluator for All {}

/// Yield every node except the start node.
#[derive(Debug, Clone, Copy, Default)]
pub struct AllButStartNode;

impl Evaluator for AllButStartNode {
    fn should_include(&self, position: &Position) -> bool {
        !position.is_start()
    }
}

/// Stop expanding once `depth` is reached.
#[derive(Debug, Clone, Copy)]
pub struct MaxDepth(pub usize);

impl Evaluator for MaxDepth {
    fn should_expand(&self, position: &Position) -> bool {
        position.depth() < self.0
    }
}

pub const END_OF_GRAPH: EndOfGraph = EndOfGraph;
pub const ALL: All = All;
pub const ALL_BUT_START_NODE: AllButStartNode = AllButStartNode;
pub const DEPTH_ONE: MaxDepth = MaxDepth(1);

/// Stop evaluator from a closure: expand while `f` returns true.
pub fn expand_while<F>(f: F) -> ExpandWhile<F>
where
    F: Fn(&Position) -> bool + Send + Sync,
{
    ExpandWhile(f)
}

/// Return evaluator from a closure: yield nodes where `f` returns true.
pub fn include_where<F>(f: F) -> IncludeWhere<F>
where
    F: Fn(&Position) -> bool + Send + Sync,
{
    IncludeWhere(f)
}

pub struct ExpandWhile<F>(F);

impl<F> Evaluator for ExpandWhile<F>
where
    F: Fn(&Position) -> bool + Send + Sync,
{
    fn should_expand(&self, position: &Position) -> bool {
        (self.0)(position)
    }
}

pub struct IncludeWhere<F>(F);

impl<F> Evaluator for IncludeWhere<F>
where
    F: Fn(&Position) -> bool + Send + Sync,
{
    fn should_include(&self, position: &Position) -> bool {
        (self.0)(position)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{NodeId, RelId, RelType, Relationship};

    fn at_depth(depth: usize) -> Position {
        let mut pos = Position::start(NodeId(1));
        for i in 0..depth {
            let rel = Relationship::new(RelId(i as u64 + 1), NodeId(i as u64 + 1), NodeId(i as u64 + 2), RelType::from_static("KNOWS"));
            pos = pos.child(rel, NodeId(i as u64 + 2));
        }
        pos
    }

    #[test]
    fn test_builtins() {
        let start = at_depth(0);
        let deep = at_depth(3);

        assert!(END_OF_GRAPH.should_expand(&deep));
        assert!(!ALL_BUT_START_NODE.should_include(&start));
        assert!(ALL_BUT_START_NODE.should_include(&deep));
        assert!(ALL.should_include(&start));

        assert!(DEPTH_ONE.should_expand(&start));
        assert!(!DEPTH_ONE.should_expand(&at_depth(1)));
    }

    #[test]
    fn test_closure_evaluators() {
        let stop = expand_while(|p| p.depth() < 2);
        let only_odd = include_where(|p| p.depth() % 2 == 1);

        assert!(stop.should_expand(&at_depth(1)));
        assert!(!stop.should_expand(&at_depth(2)));
        assert!(stop.should_include(&at_depth(2)));
        assert!(only_odd.should_include(&at_depth(3)));
        assert!(!only_odd.should_include(&at_depth(2)));
    }
}
