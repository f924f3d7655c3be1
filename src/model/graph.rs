//! Directed relation graph built from a [`Model`] on demand.
//!
//! Nodes are cubes, edges run from a relation's left cube to its right cube
//! and carry the relation id. Outgoing edges are visited in relation id
//! order so traversals are deterministic.

use std::collections::{HashMap, VecDeque};

use petgraph::algo::{has_path_connecting, toposort};
use petgraph::graph::{DiGraph, EdgeIndex, EdgeReference, NodeIndex};
use petgraph::visit::{EdgeFiltered, EdgeRef};

use super::{Model, ModelError, ModelResult, RelationId};

pub(crate) struct RelationGraph<'a> {
    graph: DiGraph<&'a str, RelationId>,
    node_indices: HashMap<&'a str, NodeIndex>,
}

impl<'a> RelationGraph<'a> {
    /// Build the graph, leaving out the relation `exclude` if given.
    pub(crate) fn build(model: &'a Model, exclude: Option<RelationId>) -> Self {
        let mut graph = DiGraph::new();
        let mut node_indices = HashMap::new();

        for name in model.cube_names() {
            node_indices.insert(name, graph.add_node(name));
        }

        for (id, rel) in model.relations() {
            if Some(id) == exclude {
                continue;
            }
            let (Some(&from), Some(&to)) = (
                node_indices.get(rel.left_cube()),
                node_indices.get(rel.right_cube()),
            ) else {
                continue;
            };
            graph.add_edge(from, to, id);
        }

        Self {
            graph,
            node_indices,
        }
    }

    /// Add an edge for a relation that isn't in the graph yet. Both cubes
    /// must already be nodes.
    pub(crate) fn with_edge(mut self, from: &str, to: &str, id: RelationId) -> Self {
        if let (Some(&a), Some(&b)) = (self.node_indices.get(from), self.node_indices.get(to)) {
            self.graph.add_edge(a, b, id);
        }
        self
    }

    /// The first relation whose right cube stays reachable from its left
    /// cube without it, i.e. one that duplicates another path.
    pub(crate) fn redundant_relation(&self) -> Option<RelationId> {
        self.graph.edge_references().find_map(|edge| {
            let skip = edge.id();
            let rest =
                EdgeFiltered::from_fn(&self.graph, |e: EdgeReference<'_, RelationId>| {
                    e.id() != skip
                });
            has_path_connecting(&rest, edge.source(), edge.target(), None)
                .then(|| *edge.weight())
        })
    }

    /// Can `to` be reached from `from` by following relations?
    pub(crate) fn is_reachable(&self, from: &str, to: &str) -> bool {
        match (self.node_indices.get(from), self.node_indices.get(to)) {
            (Some(&a), Some(&b)) => has_path_connecting(&self.graph, a, b, None),
            _ => false,
        }
    }

    /// BFS join distance from `from` to every cube it reaches.
    pub(crate) fn distances_from(&self, from: &str) -> HashMap<String, usize> {
        let mut distances = HashMap::new();
        let Some(&start) = self.node_indices.get(from) else {
            return distances;
        };

        let mut queue = VecDeque::from([(start, 0usize)]);
        while let Some((current, dist)) = queue.pop_front() {
            for (_, target) in self.outgoing(current) {
                let name = self.graph[target];
                if target != start && !distances.contains_key(name) {
                    distances.insert(name.to_string(), dist + 1);
                    queue.push_back((target, dist + 1));
                }
            }
        }
        distances
    }

    /// BFS tree rooted at `from`: for every reached cube, the relation used
    /// to reach it.
    pub(crate) fn bfs_parents(&self, from: &str) -> HashMap<&'a str, RelationId> {
        let mut parents = HashMap::new();
        let Some(&start) = self.node_indices.get(from) else {
            return parents;
        };

        let mut queue = VecDeque::from([start]);
        while let Some(current) = queue.pop_front() {
            for (edge, target) in self.outgoing(current) {
                let name = self.graph[target];
                if target != start && !parents.contains_key(name) {
                    parents.insert(name, self.graph[edge]);
                    queue.push_back(target);
                }
            }
        }
        parents
    }

    /// Cube names with dependencies (left cubes) first.
    pub(crate) fn topological_order(&self) -> ModelResult<Vec<String>> {
        toposort(&self.graph, None)
            .map(|order| {
                order
                    .into_iter()
                    .map(|idx| self.graph[idx].to_string())
                    .collect()
            })
            .map_err(|cycle| {
                ModelError::Integrity(format!(
                    "Relation graph contains a cycle through cube '{}'",
                    self.graph[cycle.node_id()]
                ))
            })
    }

    /// Outgoing edges of `node` in relation id order.
    fn outgoing(&self, node: NodeIndex) -> Vec<(EdgeIndex, NodeIndex)> {
        let mut edges: Vec<_> = self
            .graph
            .edges(node)
            .map(|e| (e.id(), e.target()))
            .collect();
        edges.sort_by_key(|(id, _)| *id);
        edges
    }
}
