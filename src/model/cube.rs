//! Cube - a modeled database table.

use serde::Serialize;

use super::error::{ModelError, ModelResult};

/// A database table (cube) with a name and an ordered list of columns.
///
/// Column names are non-empty and unique within the cube. The fields are
/// private so every mutation goes through a validating method.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Cube {
    name: String,
    columns: Vec<String>,
}

impl Cube {
    /// Create a cube, validating its name and columns.
    pub fn new<S: Into<String>>(
        name: impl Into<String>,
        columns: impl IntoIterator<Item = S>,
    ) -> ModelResult<Self> {
        let name = name.into();
        validate_name(&name)?;

        let mut cube = Self {
            name,
            columns: Vec::new(),
        };
        for column in columns {
            cube.add_column(column)?;
        }
        Ok(cube)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn has_column(&self, column: &str) -> bool {
        self.columns.iter().any(|c| c == column)
    }

    /// Rename the cube. Relation references are the model's concern.
    pub fn rename(&mut self, new_name: impl Into<String>) -> ModelResult<()> {
        let new_name = new_name.into();
        validate_name(&new_name)?;
        self.name = new_name;
        Ok(())
    }

    /// Append a column.
    pub fn add_column(&mut self, column: impl Into<String>) -> ModelResult<()> {
        let column = column.into();
        if column.trim().is_empty() {
            return Err(ModelError::validation(format!(
                "Cube '{}' cannot have an empty column name",
                self.name
            )));
        }
        if self.has_column(&column) {
            return Err(ModelError::validation(format!(
                "Column '{}' already exists in cube '{}'",
                column, self.name
            )));
        }
        self.columns.push(column);
        Ok(())
    }

    /// Remove a column, preserving the order of the rest.
    pub fn remove_column(&mut self, column: &str) -> ModelResult<()> {
        let pos = self.columns.iter().position(|c| c == column).ok_or_else(|| {
            ModelError::validation(format!(
                "Column '{}' not found in cube '{}'",
                column, self.name
            ))
        })?;
        self.columns.remove(pos);
        Ok(())
    }

    /// Replace the full column list. The cube is untouched on error.
    pub fn set_columns<S: Into<String>>(
        &mut self,
        columns: impl IntoIterator<Item = S>,
    ) -> ModelResult<()> {
        let replacement = Cube::new(self.name.clone(), columns)?;
        self.columns = replacement.columns;
        Ok(())
    }
}

fn validate_name(name: &str) -> ModelResult<()> {
    if name.trim().is_empty() {
        return Err(ModelError::validation("Cube name cannot be empty"));
    }
    Ok(())
}
