//! Model controller.
//!
//! Every edit is validated against a copy of the in-memory model first,
//! then persisted, and only then swapped in. A rejected edit leaves both
//! the model and the store as they were.

use crate::model::{Cardinality, Cube, Model, Relation, RelationEdit, RelationId};
use crate::store::{CubeStore, CubeUpdate, RelationRow, StoreResult};

/// Validated cube model operations backed by a [`CubeStore`].
pub struct ModelController {
    store: CubeStore,
    model: Option<Model>,
}

impl ModelController {
    pub fn new(store: CubeStore) -> Self {
        Self { store, model: None }
    }

    /// The current model, loading it from the store on first use.
    pub fn model(&mut self) -> StoreResult<&Model> {
        let model = match self.model.take() {
            Some(model) => model,
            None => self.store.load_model_from_db()?,
        };
        Ok(self.model.insert(model))
    }

    /// Drop the cached model and reload it from the store.
    pub fn refresh(&mut self) -> StoreResult<&Model> {
        self.model = None;
        self.model()
    }

    pub fn store(&self) -> &CubeStore {
        &self.store
    }

    /// Seed the sample model if the store is empty.
    pub fn init_sample_data(&mut self) -> StoreResult<bool> {
        let seeded = self.store.init_sample_data()?;
        if seeded {
            self.model = None;
        }
        Ok(seeded)
    }

    /// Rename the model itself.
    pub fn set_model_name(&mut self, name: &str) -> StoreResult<()> {
        self.store.set_model_name(name)?;
        self.model = None;
        Ok(())
    }

    // ===== Cubes =====

    /// Create a cube.
    pub fn create_cube(&mut self, name: &str, columns: &[String]) -> StoreResult<Cube> {
        let mut next = self.model()?.clone();
        next.add_cube(Cube::new(name, columns.iter().cloned())?)?;

        let cube = self.store.create_cube(name, columns)?;
        self.model = Some(next);
        Ok(cube)
    }

    /// Rename a cube and/or replace its columns.
    pub fn update_cube(&mut self, name: &str, update: &CubeUpdate) -> StoreResult<Cube> {
        let mut next = self.model()?.clone();
        next.get_cube(name)?;
        if let Some(columns) = &update.columns {
            next.set_columns(name, columns)?;
        }
        if let Some(new_name) = &update.new_name {
            next.rename_cube(name, new_name)?;
        }

        let cube = self.store.update_cube(name, update)?;
        self.model = Some(next);
        Ok(cube)
    }

    /// Append a column to a cube.
    pub fn add_column(&mut self, cube: &str, column: &str) -> StoreResult<Cube> {
        let mut columns = self.model()?.get_cube(cube)?.columns().to_vec();
        columns.push(column.to_string());
        self.update_cube(
            cube,
            &CubeUpdate {
                new_name: None,
                columns: Some(columns),
            },
        )
    }

    /// Remove a column from a cube. Fails if a relation uses it.
    pub fn remove_column(&mut self, cube: &str, column: &str) -> StoreResult<Cube> {
        let mut next = self.model()?.clone();
        next.remove_column(cube, column)?;
        let columns = next.get_cube(cube)?.columns().to_vec();

        let updated = self.store.update_cube(
            cube,
            &CubeUpdate {
                new_name: None,
                columns: Some(columns),
            },
        )?;
        self.model = Some(next);
        Ok(updated)
    }

    /// Delete a cube and every relation referencing it.
    pub fn delete_cube(&mut self, name: &str) -> StoreResult<Vec<(RelationId, Relation)>> {
        let mut next = self.model()?.clone();
        let removed = next.remove_cube(name)?;

        self.store.delete_cube(name)?;
        self.model = Some(next);
        Ok(removed)
    }

    // ===== Relations =====

    /// Create a relation. Rejects missing cubes or columns, self-relations,
    /// cycles, and duplicate paths.
    pub fn create_relation(
        &mut self,
        left_cube: &str,
        right_cube: &str,
        left_column: &str,
        right_column: &str,
        cardinality: Cardinality,
    ) -> StoreResult<RelationId> {
        let mut next = self.model()?.clone();
        let relation = Relation::new(
            next.get_cube(left_cube)?,
            next.get_cube(right_cube)?,
            left_column,
            right_column,
        )?
        .with_cardinality(cardinality);
        next.validate_relation(&relation)?;

        let id = self.store.create_relation(
            left_cube,
            right_cube,
            left_column,
            right_column,
            cardinality,
        )?;
        next.add_relation_with_id(id, relation)?;
        self.model = Some(next);
        Ok(id)
    }

    /// Edit a relation's endpoints, columns, or cardinality.
    pub fn update_relation(&mut self, id: RelationId, edit: &RelationEdit) -> StoreResult<()> {
        let mut next = self.model()?.clone();
        next.update_relation(id, edit)?;

        self.store.update_relation(id, edit)?;
        self.model = Some(next);
        Ok(())
    }

    /// Delete a relation by id.
    pub fn delete_relation(&mut self, id: RelationId) -> StoreResult<Relation> {
        let mut next = self.model()?.clone();
        let removed = next.remove_relation(id)?;

        self.store.delete_relation(id)?;
        self.model = Some(next);
        Ok(removed)
    }

    /// All persisted relation rows.
    pub fn list_relations(&self) -> StoreResult<Vec<RelationRow>> {
        self.store.list_relations()
    }
}
