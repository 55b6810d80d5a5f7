//! Graph algorithms.
//!
//! `PathFinder` is the configured entry point; the free functions in
//! `pathfinding` do the work.

pub mod pathfinding;

use tracing::debug;

use crate::model::{NodeId, Path};
use crate::storage::GraphRead;
use crate::traversal::Expander;
use crate::Result;

#[derive(Debug, Clone, PartialEq)]
enum Strategy {
    Dijkstra { cost_property: String },
    Unweighted { max_depth: usize },
}

/// A configured single-path search.
///
/// ```rust,no_run
/// use graphdb_embedded::{Direction, GraphDatabase, NodeId, RelType};
/// use graphdb_embedded::algo::PathFinder;
/// use graphdb_embedded::traversal::Expander;
///
/// const LEADS_TO: RelType = RelType::from_static("LEADS_TO");
///
/// # fn example(db: &GraphDatabase, london: NodeId, bristol: NodeId) -> graphdb_embedded::Result<()> {
/// let finder = PathFinder::dijkstra(Expander::for_type(LEADS_TO, Direction::Both), "distance");
/// let path = finder.find_single_path(&db.snapshot()?, london, bristol)?;
/// println!("distance {} via {} stops", path.weight, path.nodes.len());
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct PathFinder {
    expander: Expander,
    strategy: Strategy,
}

impl PathFinder {
    /// Minimum total `cost_property` path. Relationships without a usable
    /// cost are not traversed.
    pub fn dijkstra(expander: Expander, cost_property: impl Into<String>) -> Self {
        Self {
            expander,
            strategy: Strategy::Dijkstra { cost_property: cost_property.into() },
        }
    }

    /// Fewest-hops path of at most `max_depth` relationships.
    pub fn shortest_path(expander: Expander, max_depth: usize) -> Self {
        Self {
            expander,
            strategy: Strategy::Unweighted { max_depth },
        }
    }

    pub fn expander(&self) -> &Expander {
        &self.expander
    }

    /// Find one best path from `start` to `end`.
    ///
    /// Fails with `NoPathFound` if `end` is unreachable, `NotFound` if either
    /// node does not exist.
    pub fn find_single_path<G: GraphRead>(&self, graph: &G, start: NodeId, end: NodeId) -> Result<Path> {
        let path = match &self.strategy {
            Strategy::Dijkstra { cost_property } => {
                pathfinding::dijkstra(graph, &self.expander, cost_property, start, end)?
            }
            Strategy::Unweighted { max_depth } => {
                pathfinding::shortest_path(graph, &self.expander, *max_depth, start, end)?
            }
        };
        debug!(start = %start, end = %end, hops = path.len(), weight = path.weight, "path found");
        Ok(path)
    }
}
