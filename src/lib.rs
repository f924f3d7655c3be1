//! # cubegraph
//!
//! A small graph of cubes (database tables) and the relations (joins)
//! between them, persisted to SQLite and exported as a node/edge snapshot
//! for rendering.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────┐
//! │        Presentation (CLI / any graph renderer)           │
//! └─────────────────────────────────────────────────────────┘
//!              │ edits                     ▲ to_graph_data()
//!              ▼                           │
//! ┌─────────────────────────────────────────────────────────┐
//! │   ModelController (validate in memory, then persist)     │
//! └─────────────────────────────────────────────────────────┘
//!              │                           │
//!              ▼                           ▼
//! ┌──────────────────────────┐  ┌──────────────────────────┐
//! │  Model (Cube, Relation,  │  │  CubeStore (SQLite:      │
//! │  DAG checks, join paths) │◄─┤  cubes + relations rows) │
//! └──────────────────────────┘  └──────────────────────────┘
//! ```
//!
//! ## Example
//!
//! ```
//! use cubegraph::{Cube, Model, Relation};
//!
//! let mut model = Model::new("shop");
//! model.add_cube(Cube::new("customers", ["id", "name", "email"])?)?;
//! model.add_cube(Cube::new("orders", ["id", "customer_id", "total"])?)?;
//!
//! let rel = Relation::new(
//!     model.get_cube("orders")?,
//!     model.get_cube("customers")?,
//!     "customer_id",
//!     "id",
//! )?;
//! model.add_relation(rel)?;
//!
//! let graph = model.to_graph_data();
//! assert_eq!(graph.nodes.len(), 2);
//! assert_eq!(graph.edges[0].label, "customer_id = id");
//! # Ok::<(), cubegraph::ModelError>(())
//! ```

pub mod config;
pub mod controller;
pub mod model;
pub mod store;

pub use controller::ModelController;
pub use model::{
    Cardinality, Cube, GraphData, GraphEdge, GraphNode, Join, Model, ModelError, ModelResult,
    Relation, RelationEdit, RelationId,
};
pub use store::{CubeStore, CubeUpdate, RelationRow, StoreError, StoreResult};
