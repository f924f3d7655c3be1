//! SQLite persistence for cube models.
//!
//! Cubes and relations live in two tables; relations point at cube rows by
//! id, so renaming a cube never touches relation rows.
//!
//! # Schema
//!
//! ```text
//! cubes     (id, name UNIQUE, columns JSON array)
//! relations (id, left_cube_id → cubes, right_cube_id → cubes,
//!            left_column, right_column, cardinality)
//! meta      (key, value)   -- schema version, model name
//! ```
//!
//! Every public operation runs in its own transaction: it commits on
//! success and rolls back when the transaction is dropped on an error path.

pub mod sample;

use std::path::{Path, PathBuf};

use rusqlite::{params, Connection, OptionalExtension, Transaction};

use crate::model::{
    Cardinality, Cube, Model, ModelError, Relation, RelationEdit, RelationId,
};

/// Current schema version. Bump this when the table layout changes.
const SCHEMA_VERSION: i32 = 1;

/// Model name used when the store has none recorded.
pub const DEFAULT_STORE_MODEL_NAME: &str = "Cube Model";

/// Errors that can occur during store operations.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to determine data directory")]
    NoDataDir,

    #[error("Unsupported schema version {found} (expected {expected})")]
    SchemaVersion { found: i32, expected: i32 },

    #[error(transparent)]
    Model(#[from] ModelError),
}

impl StoreError {
    /// The model error behind this store error, if any.
    pub fn model_error(&self) -> Option<&ModelError> {
        match self {
            StoreError::Model(e) => Some(e),
            _ => None,
        }
    }
}

pub type StoreResult<T> = Result<T, StoreError>;

/// A persisted relation row with cube names resolved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RelationRow {
    pub id: RelationId,
    pub left_cube: String,
    pub right_cube: String,
    pub left_column: String,
    pub right_column: String,
    pub cardinality: Cardinality,
}

/// A partial change to a cube row. `None` fields keep their current value.
#[derive(Debug, Clone, Default)]
pub struct CubeUpdate {
    pub new_name: Option<String>,
    pub columns: Option<Vec<String>>,
}

/// Handle to a cube model database.
pub struct CubeStore {
    conn: Connection,
}

impl CubeStore {
    /// Open or create a store at `path`, creating parent directories.
    pub fn open(path: impl AsRef<Path>) -> StoreResult<Self> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let conn = Connection::open(path)?;
        Self::from_connection(conn)
    }

    /// Open an in-memory store (for testing).
    pub fn open_in_memory() -> StoreResult<Self> {
        Self::from_connection(Connection::open_in_memory()?)
    }

    /// Default database location: `<data_dir>/cubegraph/cube_model.db`.
    pub fn default_path() -> StoreResult<PathBuf> {
        let base = dirs::data_dir().ok_or(StoreError::NoDataDir)?;
        Ok(base.join("cubegraph").join("cube_model.db"))
    }

    fn from_connection(conn: Connection) -> StoreResult<Self> {
        conn.pragma_update(None, "foreign_keys", true)?;
        let mut store = Self { conn };
        store.init_db()?;
        Ok(store)
    }

    /// Create the schema if it doesn't exist. Safe to call repeatedly.
    pub fn init_db(&mut self) -> StoreResult<()> {
        let tx = self.conn.transaction()?;
        tx.execute_batch(
            "
            CREATE TABLE IF NOT EXISTS cubes (
                id INTEGER PRIMARY KEY,
                name TEXT NOT NULL UNIQUE,
                columns TEXT NOT NULL DEFAULT '[]'
            );

            CREATE TABLE IF NOT EXISTS relations (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                left_cube_id INTEGER NOT NULL REFERENCES cubes(id) ON DELETE CASCADE,
                right_cube_id INTEGER NOT NULL REFERENCES cubes(id) ON DELETE CASCADE,
                left_column TEXT NOT NULL,
                right_column TEXT NOT NULL,
                cardinality TEXT NOT NULL DEFAULT 'one-to-many'
            );

            CREATE TABLE IF NOT EXISTS meta (
                key TEXT PRIMARY KEY,
                value TEXT NOT NULL
            );
            ",
        )?;

        let stored_version: Option<i32> = tx
            .query_row("SELECT value FROM meta WHERE key = 'version'", [], |row| {
                let s: String = row.get(0)?;
                Ok(s.parse().unwrap_or(0))
            })
            .optional()?;

        match stored_version {
            Some(v) if v == SCHEMA_VERSION => {}
            Some(found) => {
                return Err(StoreError::SchemaVersion {
                    found,
                    expected: SCHEMA_VERSION,
                })
            }
            None => {
                tx.execute(
                    "INSERT INTO meta (key, value) VALUES ('version', ?)",
                    params![SCHEMA_VERSION.to_string()],
                )?;
            }
        }

        tx.commit()?;
        tracing::info!(version = SCHEMA_VERSION, "cube store schema ready");
        Ok(())
    }

    /// True if the store holds no cubes.
    pub fn is_empty(&self) -> StoreResult<bool> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM cubes", [], |row| row.get(0))?;
        Ok(count == 0)
    }

    /// Delete every cube and relation.
    pub fn delete_all(&mut self) -> StoreResult<()> {
        let tx = self.conn.transaction()?;
        tx.execute("DELETE FROM relations", [])?;
        tx.execute("DELETE FROM cubes", [])?;
        tx.commit()?;
        tracing::debug!("deleted all cubes and relations");
        Ok(())
    }

    // ===== Cube rows =====

    /// Insert a new cube row.
    pub fn create_cube(&mut self, name: &str, columns: &[String]) -> StoreResult<Cube> {
        let cube = Cube::new(name, columns.iter().cloned())?;

        let tx = self.conn.transaction()?;
        if cube_id(&tx, name)?.is_some() {
            return Err(ModelError::DuplicateName(name.to_string()).into());
        }
        tx.execute(
            "INSERT INTO cubes (name, columns) VALUES (?, ?)",
            params![name, serde_json::to_string(cube.columns())?],
        )?;
        tx.commit()?;

        tracing::debug!(cube = name, columns = cube.columns().len(), "created cube");
        Ok(cube)
    }

    /// Get a cube by name.
    pub fn get_cube(&self, name: &str) -> StoreResult<Option<Cube>> {
        let row: Option<(String, String)> = self
            .conn
            .query_row(
                "SELECT name, columns FROM cubes WHERE name = ?",
                params![name],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )
            .optional()?;

        row.map(|(name, columns)| decode_cube(&name, &columns))
            .transpose()
    }

    /// All cubes, in creation order.
    pub fn list_cubes(&self) -> StoreResult<Vec<Cube>> {
        Ok(self
            .cube_rows()?
            .into_iter()
            .map(|(_, cube)| cube)
            .collect())
    }

    /// Rename a cube and/or replace its columns.
    ///
    /// Relation rows reference the cube by id and follow a rename as is.
    pub fn update_cube(&mut self, name: &str, update: &CubeUpdate) -> StoreResult<Cube> {
        let tx = self.conn.transaction()?;
        let (id, columns): (i64, String) = tx
            .query_row(
                "SELECT id, columns FROM cubes WHERE name = ?",
                params![name],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )
            .optional()?
            .ok_or_else(|| ModelError::cube_not_found(name))?;

        let mut cube = decode_cube(name, &columns)?;
        if let Some(columns) = &update.columns {
            for dropped in cube.columns().iter().filter(|c| !columns.contains(*c)) {
                if let Some(relation) = relation_using_column(&tx, id, dropped)? {
                    return Err(ModelError::validation(format!(
                        "Column '{}.{}' is used by relation {}",
                        name, dropped, relation
                    ))
                    .into());
                }
            }
            cube.set_columns(columns.iter().cloned())?;
        }
        if let Some(new_name) = update.new_name.as_deref().filter(|n| *n != name) {
            if cube_id(&tx, new_name)?.is_some() {
                return Err(ModelError::DuplicateName(new_name.to_string()).into());
            }
            cube.rename(new_name)?;
        }

        tx.execute(
            "UPDATE cubes SET name = ?, columns = ? WHERE id = ?",
            params![cube.name(), serde_json::to_string(cube.columns())?, id],
        )?;
        tx.commit()?;

        tracing::debug!(cube = name, new_name = cube.name(), "updated cube");
        Ok(cube)
    }

    /// Delete a cube and every relation row referencing it.
    pub fn delete_cube(&mut self, name: &str) -> StoreResult<()> {
        let tx = self.conn.transaction()?;
        let id = cube_id(&tx, name)?.ok_or_else(|| ModelError::cube_not_found(name))?;

        let relations = tx.execute(
            "DELETE FROM relations WHERE left_cube_id = ?1 OR right_cube_id = ?1",
            params![id],
        )?;
        tx.execute("DELETE FROM cubes WHERE id = ?", params![id])?;
        tx.commit()?;

        tracing::debug!(cube = name, relations, "deleted cube");
        Ok(())
    }

    fn cube_rows(&self) -> StoreResult<Vec<(i64, Cube)>> {
        let mut stmt = self
            .conn
            .prepare("SELECT id, name, columns FROM cubes ORDER BY id")?;
        let rows = stmt
            .query_map([], |row| {
                Ok((
                    row.get::<_, i64>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, String>(2)?,
                ))
            })?
            .collect::<Result<Vec<_>, _>>()?;

        rows.into_iter()
            .map(|(id, name, columns)| -> StoreResult<(i64, Cube)> {
                Ok((id, decode_cube(&name, &columns)?))
            })
            .collect()
    }

    // ===== Relation rows =====

    /// Insert a relation row. Returns the new relation id.
    ///
    /// Both cubes must exist and both columns must belong to their cube.
    pub fn create_relation(
        &mut self,
        left_cube: &str,
        right_cube: &str,
        left_column: &str,
        right_column: &str,
        cardinality: Cardinality,
    ) -> StoreResult<RelationId> {
        let tx = self.conn.transaction()?;
        let (left_id, left) = load_cube(&tx, left_cube)?;
        let (right_id, right) = load_cube(&tx, right_cube)?;
        Relation::new(&left, &right, left_column, right_column)?;

        let endpoints = RelationEndpoints {
            left_id,
            right_id,
            left_column,
            right_column,
        };
        if let Some(existing) = matching_relation(&tx, &endpoints, None)? {
            return Err(ModelError::validation(format!(
                "Relation {}.{} -> {}.{} already exists (id {})",
                left_cube, left_column, right_cube, right_column, existing
            ))
            .into());
        }

        tx.execute(
            "INSERT INTO relations (left_cube_id, right_cube_id, left_column, right_column, cardinality)
             VALUES (?, ?, ?, ?, ?)",
            params![left_id, right_id, left_column, right_column, cardinality.as_str()],
        )?;
        let id = tx.last_insert_rowid();
        tx.commit()?;

        tracing::debug!(id, left_cube, right_cube, "created relation");
        Ok(id)
    }

    /// Get a relation row by id.
    pub fn get_relation(&self, id: RelationId) -> StoreResult<Option<RelationRow>> {
        relation_row(&self.conn, id)
    }

    /// All relation rows, in id order.
    pub fn list_relations(&self) -> StoreResult<Vec<RelationRow>> {
        self.relation_rows()
    }

    /// Apply `edit` to a relation row, re-validating its columns.
    pub fn update_relation(&mut self, id: RelationId, edit: &RelationEdit) -> StoreResult<()> {
        let tx = self.conn.transaction()?;
        let current =
            relation_row(&tx, id)?.ok_or_else(|| ModelError::relation_not_found(id))?;
        let cardinality = edit.cardinality.unwrap_or(current.cardinality);
        let left_name = edit.left_cube.as_deref().unwrap_or(&current.left_cube);
        let right_name = edit.right_cube.as_deref().unwrap_or(&current.right_cube);
        let left_column = edit.left_column.as_deref().unwrap_or(&current.left_column);
        let right_column = edit.right_column.as_deref().unwrap_or(&current.right_column);

        let (left_id, left) = load_cube(&tx, left_name)?;
        let (right_id, right) = load_cube(&tx, right_name)?;
        Relation::new(&left, &right, left_column, right_column)?;

        let endpoints = RelationEndpoints {
            left_id,
            right_id,
            left_column,
            right_column,
        };
        if let Some(existing) = matching_relation(&tx, &endpoints, Some(id))? {
            return Err(ModelError::validation(format!(
                "Relation {}.{} -> {}.{} already exists (id {})",
                left_name, left_column, right_name, right_column, existing
            ))
            .into());
        }

        tx.execute(
            "UPDATE relations
             SET left_cube_id = ?, right_cube_id = ?, left_column = ?, right_column = ?, cardinality = ?
             WHERE id = ?",
            params![
                left_id,
                right_id,
                left_column,
                right_column,
                cardinality.as_str(),
                id
            ],
        )?;
        tx.commit()?;

        tracing::debug!(id, "updated relation");
        Ok(())
    }

    /// Delete a relation row by id.
    pub fn delete_relation(&mut self, id: RelationId) -> StoreResult<()> {
        let tx = self.conn.transaction()?;
        let rows = tx.execute("DELETE FROM relations WHERE id = ?", params![id])?;
        if rows == 0 {
            return Err(ModelError::relation_not_found(id).into());
        }
        tx.commit()?;

        tracing::debug!(id, "deleted relation");
        Ok(())
    }

    fn relation_rows(&self) -> StoreResult<Vec<RelationRow>> {
        let mut stmt = self
            .conn
            .prepare(&format!("{} ORDER BY r.id", RELATION_SELECT))?;
        let rows = stmt
            .query_map([], raw_relation_row)?
            .collect::<Result<Vec<_>, _>>()?;

        rows.into_iter().map(decode_relation_row).collect()
    }

    // ===== Whole models =====

    /// Read every cube and relation row and rebuild the model.
    ///
    /// Fails with [`ModelError::Integrity`] if any row breaks a model
    /// invariant; nothing is silently dropped.
    pub fn load_model_from_db(&self) -> StoreResult<Model> {
        let name: Option<String> = self
            .conn
            .query_row("SELECT value FROM meta WHERE key = 'model_name'", [], |row| {
                row.get(0)
            })
            .optional()?;
        let mut model = Model::new(name.unwrap_or_else(|| DEFAULT_STORE_MODEL_NAME.to_string()));

        for (_, cube) in self.cube_rows()? {
            model.add_cube(cube).map_err(into_integrity)?;
        }

        for row in self.relation_rows()? {
            let relation = Relation::new(
                model.get_cube(&row.left_cube).map_err(into_integrity)?,
                model.get_cube(&row.right_cube).map_err(into_integrity)?,
                row.left_column,
                row.right_column,
            )
            .map_err(into_integrity)?
            .with_cardinality(row.cardinality);

            model
                .add_relation_with_id(row.id, relation)
                .map_err(|e| {
                    let err = into_integrity(e);
                    tracing::warn!(relation = row.id, error = %err, "corrupt relation row");
                    err
                })?;
        }

        tracing::info!(
            model = model.name(),
            cubes = model.cubes().len(),
            relations = model.relation_count(),
            "loaded model"
        );
        Ok(model)
    }

    /// Record the name the model loads under.
    pub fn set_model_name(&mut self, name: &str) -> StoreResult<()> {
        let tx = self.conn.transaction()?;
        tx.execute(
            "INSERT OR REPLACE INTO meta (key, value) VALUES ('model_name', ?)",
            params![name],
        )?;
        tx.commit()?;
        Ok(())
    }

    /// Replace the store contents with `model`, keeping relation ids.
    pub fn save_model(&mut self, model: &Model) -> StoreResult<()> {
        let tx = self.conn.transaction()?;
        tx.execute("DELETE FROM relations", [])?;
        tx.execute("DELETE FROM cubes", [])?;
        tx.execute(
            "INSERT OR REPLACE INTO meta (key, value) VALUES ('model_name', ?)",
            params![model.name()],
        )?;

        for cube in model.cubes() {
            tx.execute(
                "INSERT INTO cubes (name, columns) VALUES (?, ?)",
                params![cube.name(), serde_json::to_string(cube.columns())?],
            )?;
        }

        for (id, rel) in model.relations() {
            let (left_id, _) = load_cube(&tx, rel.left_cube())?;
            let (right_id, _) = load_cube(&tx, rel.right_cube())?;
            tx.execute(
                "INSERT INTO relations (id, left_cube_id, right_cube_id, left_column, right_column, cardinality)
                 VALUES (?, ?, ?, ?, ?, ?)",
                params![
                    id,
                    left_id,
                    right_id,
                    rel.left_column(),
                    rel.right_column(),
                    rel.cardinality().as_str()
                ],
            )?;
        }
        tx.commit()?;

        tracing::info!(
            model = model.name(),
            cubes = model.cubes().len(),
            relations = model.relation_count(),
            "saved model"
        );
        Ok(())
    }

    /// Seed the sample e-commerce model if the store is empty.
    ///
    /// Returns true if data was written.
    pub fn init_sample_data(&mut self) -> StoreResult<bool> {
        if !self.is_empty()? {
            return Ok(false);
        }
        self.save_model(&sample::sample_model())?;
        tracing::info!("seeded sample model");
        Ok(true)
    }
}

fn cube_id(tx: &Transaction<'_>, name: &str) -> StoreResult<Option<i64>> {
    Ok(tx
        .query_row(
            "SELECT id FROM cubes WHERE name = ?",
            params![name],
            |row| row.get(0),
        )
        .optional()?)
}

fn load_cube(tx: &Transaction<'_>, name: &str) -> StoreResult<(i64, Cube)> {
    let (id, columns): (i64, String) = tx
        .query_row(
            "SELECT id, columns FROM cubes WHERE name = ?",
            params![name],
            |row| Ok((row.get(0)?, row.get(1)?)),
        )
        .optional()?
        .ok_or_else(|| ModelError::cube_not_found(name))?;
    Ok((id, decode_cube(name, &columns)?))
}

/// Decode a cube row. A row that doesn't form a valid cube is an
/// integrity failure.
fn decode_cube(name: &str, columns: &str) -> StoreResult<Cube> {
    let columns: Vec<String> = serde_json::from_str(columns).map_err(|e| {
        ModelError::Integrity(format!("Cube '{}' has malformed columns: {}", name, e))
    })?;
    Cube::new(name, columns).map_err(|e| into_integrity(e).into())
}

/// Relation rows with cube names resolved. Names come from a LEFT JOIN so a
/// dangling cube id shows up as NULL instead of hiding the row.
const RELATION_SELECT: &str =
    "SELECT r.id, l.name, rc.name, r.left_column, r.right_column, r.cardinality
     FROM relations r
     LEFT JOIN cubes l ON l.id = r.left_cube_id
     LEFT JOIN cubes rc ON rc.id = r.right_cube_id";

type RawRelationRow = (i64, Option<String>, Option<String>, String, String, String);

fn raw_relation_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<RawRelationRow> {
    Ok((
        row.get(0)?,
        row.get(1)?,
        row.get(2)?,
        row.get(3)?,
        row.get(4)?,
        row.get(5)?,
    ))
}

fn relation_row(conn: &Connection, id: RelationId) -> StoreResult<Option<RelationRow>> {
    conn.query_row(
        &format!("{} WHERE r.id = ?", RELATION_SELECT),
        params![id],
        raw_relation_row,
    )
    .optional()?
    .map(decode_relation_row)
    .transpose()
}

struct RelationEndpoints<'a> {
    left_id: i64,
    right_id: i64,
    left_column: &'a str,
    right_column: &'a str,
}

/// Id of a relation row with the same endpoints, other than `exclude`.
fn matching_relation(
    tx: &Transaction<'_>,
    endpoints: &RelationEndpoints<'_>,
    exclude: Option<RelationId>,
) -> StoreResult<Option<RelationId>> {
    Ok(tx
        .query_row(
            "SELECT id FROM relations
             WHERE left_cube_id = ? AND right_cube_id = ? AND left_column = ? AND right_column = ?
               AND id IS NOT ?",
            params![
                endpoints.left_id,
                endpoints.right_id,
                endpoints.left_column,
                endpoints.right_column,
                exclude
            ],
            |row| row.get(0),
        )
        .optional()?)
}

/// Id of a relation row joining on `column` of the cube with row id `cube_id`.
fn relation_using_column(
    tx: &Transaction<'_>,
    cube_id: i64,
    column: &str,
) -> StoreResult<Option<RelationId>> {
    Ok(tx
        .query_row(
            "SELECT id FROM relations
             WHERE (left_cube_id = ?1 AND left_column = ?2)
                OR (right_cube_id = ?1 AND right_column = ?2)
             ORDER BY id LIMIT 1",
            params![cube_id, column],
            |row| row.get(0),
        )
        .optional()?)
}

/// Decode a relation row. Cube names come from a LEFT JOIN, so a missing
/// name means the row points at a cube that no longer exists.
fn decode_relation_row(raw: RawRelationRow) -> StoreResult<RelationRow> {
    let (id, left, right, left_column, right_column, cardinality) = raw;
    let dangling = |side: &str| {
        ModelError::Integrity(format!(
            "Relation {} references a missing {} cube",
            id, side
        ))
    };
    let cardinality = cardinality.parse::<Cardinality>().map_err(|_| {
        ModelError::Integrity(format!(
            "Relation {} has unknown cardinality '{}'",
            id, cardinality
        ))
    })?;

    Ok(RelationRow {
        id,
        left_cube: left.ok_or_else(|| dangling("left"))?,
        right_cube: right.ok_or_else(|| dangling("right"))?,
        left_column,
        right_column,
        cardinality,
    })
}

fn into_integrity(err: ModelError) -> ModelError {
    match err {
        ModelError::Integrity(_) => err,
        other => ModelError::Integrity(format!("Stored model is inconsistent: {}", other)),
    }
}
