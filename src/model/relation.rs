//! Relation - a directed join between two cubes.

use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::cube::Cube;
use super::error::{ModelError, ModelResult};

/// Identifier of a relation within a model.
///
/// For models loaded from the store this is the relation row id.
pub type RelationId = i64;

/// Cardinality of a relation between two cubes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Cardinality {
    /// One-to-one relationship
    OneToOne,
    /// One-to-many relationship
    #[default]
    OneToMany,
    /// Many-to-one relationship
    ManyToOne,
}

impl Cardinality {
    /// All cardinalities, in display order.
    pub const ALL: [Cardinality; 3] = [
        Cardinality::OneToOne,
        Cardinality::OneToMany,
        Cardinality::ManyToOne,
    ];

    /// Stored/serialized form, e.g. `"one-to-many"`.
    pub fn as_str(&self) -> &'static str {
        match self {
            Cardinality::OneToOne => "one-to-one",
            Cardinality::OneToMany => "one-to-many",
            Cardinality::ManyToOne => "many-to-one",
        }
    }

    /// The SQL join kind used when following this relation.
    pub fn sql_join(&self) -> &'static str {
        match self {
            Cardinality::OneToOne => "INNER JOIN",
            Cardinality::OneToMany => "LEFT JOIN",
            Cardinality::ManyToOne => "RIGHT JOIN",
        }
    }
}

impl std::fmt::Display for Cardinality {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for Cardinality {
    type Err = ModelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Cardinality::ALL
            .into_iter()
            .find(|c| c.as_str() == s)
            .ok_or_else(|| ModelError::validation(format!("Unknown cardinality: '{}'", s)))
    }
}

/// A directed join `left_cube.left_column → right_cube.right_column`.
///
/// Cubes are referenced by name. A relation only checks that its columns
/// belong to the cubes it was built from; whether those cubes exist in a
/// model is checked by [`crate::model::Model`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct Relation {
    left_cube: String,
    right_cube: String,
    left_column: String,
    right_column: String,
    cardinality: Cardinality,
}

/// A partial change to a relation. `None` fields keep their current value.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RelationEdit {
    pub left_cube: Option<String>,
    pub right_cube: Option<String>,
    pub left_column: Option<String>,
    pub right_column: Option<String>,
    pub cardinality: Option<Cardinality>,
}

impl RelationEdit {
    pub fn is_empty(&self) -> bool {
        self == &RelationEdit::default()
    }

    pub fn left_column(mut self, column: impl Into<String>) -> Self {
        self.left_column = Some(column.into());
        self
    }

    pub fn right_column(mut self, column: impl Into<String>) -> Self {
        self.right_column = Some(column.into());
        self
    }

    pub fn left_cube(mut self, cube: impl Into<String>) -> Self {
        self.left_cube = Some(cube.into());
        self
    }

    pub fn right_cube(mut self, cube: impl Into<String>) -> Self {
        self.right_cube = Some(cube.into());
        self
    }

    pub fn cardinality(mut self, cardinality: Cardinality) -> Self {
        self.cardinality = Some(cardinality);
        self
    }
}

impl Relation {
    /// Create a relation with the default cardinality.
    ///
    /// Fails if either column is not a member of its cube.
    pub fn new(
        left: &Cube,
        right: &Cube,
        left_column: impl Into<String>,
        right_column: impl Into<String>,
    ) -> ModelResult<Self> {
        let relation = Self {
            left_cube: left.name().to_string(),
            right_cube: right.name().to_string(),
            left_column: left_column.into(),
            right_column: right_column.into(),
            cardinality: Cardinality::default(),
        };
        relation.check_columns(left, right)?;
        Ok(relation)
    }

    /// Set the cardinality.
    pub fn with_cardinality(mut self, cardinality: Cardinality) -> Self {
        self.cardinality = cardinality;
        self
    }

    pub fn left_cube(&self) -> &str {
        &self.left_cube
    }

    pub fn right_cube(&self) -> &str {
        &self.right_cube
    }

    pub fn left_column(&self) -> &str {
        &self.left_column
    }

    pub fn right_column(&self) -> &str {
        &self.right_column
    }

    pub fn cardinality(&self) -> Cardinality {
        self.cardinality
    }

    /// Does either endpoint refer to `cube`?
    pub fn references(&self, cube: &str) -> bool {
        self.left_cube == cube || self.right_cube == cube
    }

    /// Does this relation join on `cube.column`?
    pub fn uses_column(&self, cube: &str, column: &str) -> bool {
        (self.left_cube == cube && self.left_column == column)
            || (self.right_cube == cube && self.right_column == column)
    }

    /// Descriptive label, e.g. `orders.customer_id → customers.id (many-to-one)`.
    pub fn label(&self) -> String {
        format!(
            "{}.{} → {}.{} ({})",
            self.left_cube, self.left_column, self.right_cube, self.right_column, self.cardinality
        )
    }

    /// Apply `edit`, validating columns against `left` and `right`.
    ///
    /// `left` and `right` must be the cubes the relation points at after
    /// the edit. On error the relation is unchanged.
    pub fn edit(&mut self, left: &Cube, right: &Cube, edit: &RelationEdit) -> ModelResult<()> {
        let candidate = self.edited(edit);
        if candidate.left_cube != left.name() || candidate.right_cube != right.name() {
            return Err(ModelError::validation(format!(
                "Relation endpoints '{}' -> '{}' do not match the supplied cubes '{}' -> '{}'",
                candidate.left_cube,
                candidate.right_cube,
                left.name(),
                right.name()
            )));
        }
        candidate.check_columns(left, right)?;
        *self = candidate;
        Ok(())
    }

    /// The relation with `edit` applied, unvalidated.
    pub(crate) fn edited(&self, edit: &RelationEdit) -> Relation {
        Relation {
            left_cube: edit.left_cube.clone().unwrap_or_else(|| self.left_cube.clone()),
            right_cube: edit
                .right_cube
                .clone()
                .unwrap_or_else(|| self.right_cube.clone()),
            left_column: edit
                .left_column
                .clone()
                .unwrap_or_else(|| self.left_column.clone()),
            right_column: edit
                .right_column
                .clone()
                .unwrap_or_else(|| self.right_column.clone()),
            cardinality: edit.cardinality.unwrap_or(self.cardinality),
        }
    }

    pub(crate) fn check_columns(&self, left: &Cube, right: &Cube) -> ModelResult<()> {
        if !left.has_column(&self.left_column) {
            return Err(ModelError::validation(format!(
                "Column '{}' not found in cube '{}'",
                self.left_column,
                left.name()
            )));
        }
        if !right.has_column(&self.right_column) {
            return Err(ModelError::validation(format!(
                "Column '{}' not found in cube '{}'",
                self.right_column,
                right.name()
            )));
        }
        Ok(())
    }

    /// Point both endpoint references at `new` wherever they say `old`.
    pub(crate) fn rename_cube(&mut self, old: &str, new: &str) {
        if self.left_cube == old {
            self.left_cube = new.to_string();
        }
        if self.right_cube == old {
            self.right_cube = new.to_string();
        }
    }
}
