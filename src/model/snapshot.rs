//! Graph snapshot for rendering layers.
//!
//! The snapshot is a plain node/edge list that serializes to
//! `{"nodes": [...], "edges": [...]}`.

use serde::{Deserialize, Serialize};

use super::{Cardinality, Model};

/// A node in the graph snapshot (one per cube).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GraphNode {
    pub id: String,
    pub label: String,
    pub columns: Vec<String>,
}

/// An edge in the graph snapshot (one per relation).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GraphEdge {
    pub id: String,
    pub source: String,
    pub target: String,
    /// `"left_column = right_column"`
    pub label: String,
    pub cardinality: Cardinality,
}

/// Nodes in cube insertion order, edges in relation id order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GraphData {
    pub nodes: Vec<GraphNode>,
    pub edges: Vec<GraphEdge>,
}

impl Model {
    /// Export the model as graph data for visualization.
    pub fn to_graph_data(&self) -> GraphData {
        let nodes = self
            .cubes()
            .iter()
            .map(|cube| GraphNode {
                id: cube.name().to_string(),
                label: cube.name().to_string(),
                columns: cube.columns().to_vec(),
            })
            .collect();

        let edges = self
            .relations()
            .map(|(id, rel)| GraphEdge {
                id: format!("edge_{}", id),
                source: rel.left_cube().to_string(),
                target: rel.right_cube().to_string(),
                label: format!("{} = {}", rel.left_column(), rel.right_column()),
                cardinality: rel.cardinality(),
            })
            .collect();

        GraphData { nodes, edges }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Cube, Relation};

    #[test]
    fn test_snapshot_json() {
        let mut model = Model::new("shop");
        model
            .add_cube(Cube::new("customers", ["id", "name"]).unwrap())
            .unwrap();
        model
            .add_cube(Cube::new("orders", ["id", "customer_id"]).unwrap())
            .unwrap();
        let rel = Relation::new(
            model.get_cube("orders").unwrap(),
            model.get_cube("customers").unwrap(),
            "customer_id",
            "id",
        )
        .unwrap()
        .with_cardinality(Cardinality::ManyToOne);
        model.add_relation(rel).unwrap();

        let json = serde_json::to_string(&model.to_graph_data()).unwrap();
        insta::assert_snapshot!(json, @r#"{"nodes":[{"id":"customers","label":"customers","columns":["id","name"]},{"id":"orders","label":"orders","columns":["id","customer_id"]}],"edges":[{"id":"edge_1","source":"orders","target":"customers","label":"customer_id = id","cardinality":"many-to-one"}]}"#);
    }

    #[test]
    fn test_empty_model() {
        let data = Model::default().to_graph_data();
        assert!(data.nodes.is_empty());
        assert!(data.edges.is_empty());
    }
}
