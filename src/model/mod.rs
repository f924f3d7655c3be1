//! In-memory cube model.
//!
//! A [`Model`] owns a set of [`Cube`]s and the [`Relation`]s between them.
//! Relations reference cubes by name; names are resolved against the model
//! whenever a relation is validated or exported.
//!
//! The relation graph is kept a DAG:
//! - no relation joins a cube to itself
//! - no relation closes a cycle
//! - no relation adds a second path between two cubes already connected

pub mod cube;
pub mod error;
mod graph;
pub mod join;
pub mod relation;
pub mod snapshot;

#[cfg(test)]
mod tests;

use std::collections::{HashMap, HashSet};

pub use cube::Cube;
pub use error::{EntityKind, ModelError, ModelResult};
pub use join::Join;
pub use relation::{Cardinality, Relation, RelationEdit, RelationId};
pub use snapshot::{GraphData, GraphEdge, GraphNode};

use graph::RelationGraph;

/// Name given to models that aren't named explicitly.
pub const DEFAULT_MODEL_NAME: &str = "Model";

/// Cubes in insertion order and relations in id order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Model {
    name: String,
    cubes: Vec<Cube>,
    relations: Vec<(RelationId, Relation)>,
}

impl Default for Model {
    fn default() -> Self {
        Self::new(DEFAULT_MODEL_NAME)
    }
}

impl Model {
    /// Create an empty model.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            cubes: Vec::new(),
            relations: Vec::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    // ========================================================================
    // Cubes
    // ========================================================================

    /// Cubes in insertion order.
    pub fn cubes(&self) -> &[Cube] {
        &self.cubes
    }

    pub fn cube_names(&self) -> impl Iterator<Item = &str> {
        self.cubes.iter().map(|c| c.name())
    }

    pub fn contains_cube(&self, name: &str) -> bool {
        self.cube_index(name).is_some()
    }

    /// Get a cube by name.
    pub fn get_cube(&self, name: &str) -> ModelResult<&Cube> {
        self.cube_index(name)
            .map(|i| &self.cubes[i])
            .ok_or_else(|| ModelError::cube_not_found(name))
    }

    /// Add a cube. Fails if a cube with the same name exists.
    pub fn add_cube(&mut self, cube: Cube) -> ModelResult<()> {
        if self.contains_cube(cube.name()) {
            return Err(ModelError::DuplicateName(cube.name().to_string()));
        }
        self.cubes.push(cube);
        Ok(())
    }

    /// Remove a cube and every relation referencing it.
    ///
    /// Returns the relations removed by the cascade.
    pub fn remove_cube(&mut self, name: &str) -> ModelResult<Vec<(RelationId, Relation)>> {
        let idx = self
            .cube_index(name)
            .ok_or_else(|| ModelError::cube_not_found(name))?;
        self.cubes.remove(idx);

        let (removed, kept): (Vec<_>, Vec<_>) = std::mem::take(&mut self.relations)
            .into_iter()
            .partition(|(_, rel)| rel.references(name));
        self.relations = kept;
        Ok(removed)
    }

    /// Rename a cube, rewriting every relation that references it.
    pub fn rename_cube(&mut self, old_name: &str, new_name: &str) -> ModelResult<()> {
        let idx = self
            .cube_index(old_name)
            .ok_or_else(|| ModelError::cube_not_found(old_name))?;
        if old_name == new_name {
            return Ok(());
        }
        if self.contains_cube(new_name) {
            return Err(ModelError::DuplicateName(new_name.to_string()));
        }

        self.cubes[idx].rename(new_name)?;
        for (_, rel) in &mut self.relations {
            rel.rename_cube(old_name, new_name);
        }
        Ok(())
    }

    /// Append a column to a cube.
    pub fn add_column(&mut self, cube: &str, column: &str) -> ModelResult<()> {
        let idx = self
            .cube_index(cube)
            .ok_or_else(|| ModelError::cube_not_found(cube))?;
        self.cubes[idx].add_column(column)
    }

    /// Remove a column from a cube.
    ///
    /// Fails if a relation joins on the column; the relation has to be
    /// removed first.
    pub fn remove_column(&mut self, cube: &str, column: &str) -> ModelResult<()> {
        let idx = self
            .cube_index(cube)
            .ok_or_else(|| ModelError::cube_not_found(cube))?;
        self.ensure_column_unused(cube, column)?;
        self.cubes[idx].remove_column(column)
    }

    /// Replace a cube's column list.
    ///
    /// Fails if a column dropped by the replacement is used by a relation.
    pub fn set_columns(&mut self, cube: &str, columns: &[String]) -> ModelResult<()> {
        let idx = self
            .cube_index(cube)
            .ok_or_else(|| ModelError::cube_not_found(cube))?;
        for existing in self.cubes[idx].columns() {
            if !columns.contains(existing) {
                self.ensure_column_unused(cube, existing)?;
            }
        }
        self.cubes[idx].set_columns(columns.iter().cloned())
    }

    fn ensure_column_unused(&self, cube: &str, column: &str) -> ModelResult<()> {
        if let Some((id, rel)) = self
            .relations
            .iter()
            .find(|(_, rel)| rel.uses_column(cube, column))
        {
            return Err(ModelError::validation(format!(
                "Column '{}.{}' is used by relation {} ({})",
                cube,
                column,
                id,
                rel.label()
            )));
        }
        Ok(())
    }

    fn cube_index(&self, name: &str) -> Option<usize> {
        self.cubes.iter().position(|c| c.name() == name)
    }

    // ========================================================================
    // Relations
    // ========================================================================

    /// Relations in id order.
    pub fn relations(&self) -> impl Iterator<Item = (RelationId, &Relation)> {
        self.relations.iter().map(|(id, rel)| (*id, rel))
    }

    pub fn relation_count(&self) -> usize {
        self.relations.len()
    }

    pub fn relation(&self, id: RelationId) -> ModelResult<&Relation> {
        self.relation_index(id)
            .map(|i| &self.relations[i].1)
            .ok_or_else(|| ModelError::relation_not_found(id))
    }

    /// Find the id of a relation by its endpoints and columns.
    pub fn find_relation(
        &self,
        left_cube: &str,
        right_cube: &str,
        left_column: &str,
        right_column: &str,
    ) -> Option<RelationId> {
        self.relations
            .iter()
            .find(|(_, r)| {
                r.left_cube() == left_cube
                    && r.right_cube() == right_cube
                    && r.left_column() == left_column
                    && r.right_column() == right_column
            })
            .map(|(id, _)| *id)
    }

    /// Add a relation, assigning it the next free id.
    pub fn add_relation(&mut self, relation: Relation) -> ModelResult<RelationId> {
        let id = self.next_relation_id();
        self.add_relation_with_id(id, relation)?;
        Ok(id)
    }

    /// Add a relation under an externally chosen id (e.g. a store row id).
    ///
    /// Relations stay sorted by id, so the order doesn't depend on the
    /// order ids were added in.
    pub fn add_relation_with_id(&mut self, id: RelationId, relation: Relation) -> ModelResult<()> {
        if self.relation_index(id).is_some() {
            return Err(ModelError::validation(format!(
                "Relation id {} is already in use",
                id
            )));
        }
        self.validate_relation(&relation)?;
        let pos = self.relations.partition_point(|(rid, _)| *rid < id);
        self.relations.insert(pos, (id, relation));
        Ok(())
    }

    /// Check that `relation` could be added to this model.
    pub fn validate_relation(&self, relation: &Relation) -> ModelResult<()> {
        self.check_relation(relation, None)
    }

    /// Apply `edit` to a relation, re-running every check.
    pub fn update_relation(&mut self, id: RelationId, edit: &RelationEdit) -> ModelResult<()> {
        let idx = self
            .relation_index(id)
            .ok_or_else(|| ModelError::relation_not_found(id))?;
        let candidate = self.relations[idx].1.edited(edit);
        self.check_relation(&candidate, Some(id))?;
        self.relations[idx].1 = candidate;
        Ok(())
    }

    /// Remove a relation by id.
    pub fn remove_relation(&mut self, id: RelationId) -> ModelResult<Relation> {
        let idx = self
            .relation_index(id)
            .ok_or_else(|| ModelError::relation_not_found(id))?;
        Ok(self.relations.remove(idx).1)
    }

    fn relation_index(&self, id: RelationId) -> Option<usize> {
        self.relations.iter().position(|(rid, _)| *rid == id)
    }

    fn next_relation_id(&self) -> RelationId {
        self.relations.iter().map(|(id, _)| *id).max().unwrap_or(0) + 1
    }

    /// Validate a relation against the cubes and the DAG rules.
    ///
    /// `exclude` names a relation to leave out of the graph, so an edit
    /// isn't judged against its own previous version.
    fn check_relation(&self, relation: &Relation, exclude: Option<RelationId>) -> ModelResult<()> {
        let left_name = relation.left_cube();
        let right_name = relation.right_cube();

        if left_name == right_name {
            return Err(ModelError::validation(format!(
                "Cannot add relation: cube '{}' cannot connect to itself",
                left_name
            )));
        }

        let left = self.get_cube(left_name).map_err(|_| {
            ModelError::validation(format!("Left cube '{}' not found in model", left_name))
        })?;
        let right = self.get_cube(right_name).map_err(|_| {
            ModelError::validation(format!("Right cube '{}' not found in model", right_name))
        })?;
        relation.check_columns(left, right)?;

        let graph = RelationGraph::build(self, exclude);
        if graph.is_reachable(left_name, right_name) {
            return Err(ModelError::validation(format!(
                "Adding relation {} -> {} would create a duplicate path",
                left_name, right_name
            )));
        }
        if graph.is_reachable(right_name, left_name) {
            return Err(ModelError::validation(format!(
                "Adding relation {} -> {} would create a cycle",
                left_name, right_name
            )));
        }

        // The new edge can also make an existing relation a second path.
        let candidate_id = exclude.unwrap_or_else(|| self.next_relation_id());
        let graph = graph.with_edge(left_name, right_name, candidate_id);
        if let Some(id) = graph.redundant_relation() {
            let existing = self.relation(id)?;
            return Err(ModelError::validation(format!(
                "Adding relation {} -> {} would create a duplicate path alongside relation {} ({})",
                left_name,
                right_name,
                id,
                existing.label()
            )));
        }
        Ok(())
    }

    // ========================================================================
    // Graph analysis
    // ========================================================================

    /// For each cube, the cubes reachable along relation direction and the
    /// number of joins needed to reach them.
    pub fn reachability(&self) -> HashMap<String, HashMap<String, usize>> {
        let graph = RelationGraph::build(self, None);
        self.cube_names()
            .map(|name| (name.to_string(), graph.distances_from(name)))
            .collect()
    }

    /// For each cube, every cube that can be queried together with it.
    ///
    /// If A reaches B, then A and B (and everything else A reaches) can be
    /// queried together. A cube is always queryable with itself.
    pub fn queryable_with(&self) -> HashMap<String, HashSet<String>> {
        let mut result: HashMap<String, HashSet<String>> = self
            .cube_names()
            .map(|name| (name.to_string(), HashSet::new()))
            .collect();

        for (cube, reachable) in self.reachability() {
            let mut connected: HashSet<String> = reachable.into_keys().collect();
            connected.insert(cube);
            for target in &connected {
                if let Some(set) = result.get_mut(target) {
                    set.extend(connected.iter().cloned());
                }
            }
        }
        result
    }

    /// Cubes with no incoming relations, in insertion order.
    pub fn root_cubes(&self) -> Vec<&str> {
        let targets: HashSet<&str> = self.relations.iter().map(|(_, r)| r.right_cube()).collect();
        self.cube_names().filter(|n| !targets.contains(n)).collect()
    }

    /// Cubes ordered so that every relation's left cube comes before its
    /// right cube.
    pub fn topological_order(&self) -> ModelResult<Vec<String>> {
        RelationGraph::build(self, None).topological_order()
    }
}
