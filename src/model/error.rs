//! Error types for the in-memory cube model.

/// Result type for model operations.
pub type ModelResult<T> = Result<T, ModelError>;

/// Errors raised by cube, relation, and model operations.
///
/// The same taxonomy is reused by the store, which wraps these in
/// [`crate::store::StoreError::Model`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ModelError {
    /// Malformed or inconsistent entity data.
    #[error("Validation error: {0}")]
    Validation(String),

    /// A cube with this name already exists.
    #[error("Cube '{0}' already exists")]
    DuplicateName(String),

    /// Referenced a cube or relation that doesn't exist.
    #[error("{kind} '{name}' not found")]
    NotFound { kind: EntityKind, name: String },

    /// Persisted data violates a model invariant.
    #[error("Integrity error: {0}")]
    Integrity(String),
}

impl ModelError {
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    pub fn cube_not_found(name: impl Into<String>) -> Self {
        Self::NotFound {
            kind: EntityKind::Cube,
            name: name.into(),
        }
    }

    pub fn relation_not_found(id: impl std::fmt::Display) -> Self {
        Self::NotFound {
            kind: EntityKind::Relation,
            name: id.to_string(),
        }
    }

    /// Is this a `NotFound` error?
    pub fn is_not_found(&self) -> bool {
        matches!(self, ModelError::NotFound { .. })
    }
}

/// Kind of entity named in a [`ModelError::NotFound`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntityKind {
    Cube,
    Relation,
}

impl std::fmt::Display for EntityKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EntityKind::Cube => write!(f, "Cube"),
            EntityKind::Relation => write!(f, "Relation"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        assert_eq!(
            ModelError::DuplicateName("users".into()).to_string(),
            "Cube 'users' already exists"
        );
        assert_eq!(
            ModelError::cube_not_found("users").to_string(),
            "Cube 'users' not found"
        );
        assert_eq!(
            ModelError::relation_not_found(7).to_string(),
            "Relation '7' not found"
        );
    }

    #[test]
    fn test_is_not_found() {
        assert!(ModelError::cube_not_found("x").is_not_found());
        assert!(!ModelError::validation("x").is_not_found());
    }
}
