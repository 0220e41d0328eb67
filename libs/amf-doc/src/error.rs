//! # Document Errors
//!
//! Error types shared by the document model and the geometry engines.
//!
//! ## Error Policy
//!
//! - Failures documented as atomic leave the Document untouched
//! - Every error renders a human-readable message for the last-error cell

use std::fmt;

use thiserror::Error;

/// Kind of entity an index refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntityKind {
    Object,
    Mesh,
    Volume,
    Vertex,
    Material,
    Composite,
    Constellation,
    Instance,
    Texture,
    RenderItem,
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            EntityKind::Object => "object",
            EntityKind::Mesh => "mesh",
            EntityKind::Volume => "volume",
            EntityKind::Vertex => "vertex",
            EntityKind::Material => "material",
            EntityKind::Composite => "composite",
            EntityKind::Constellation => "constellation",
            EntityKind::Instance => "instance",
            EntityKind::Texture => "texture",
            EntityKind::RenderItem => "render item",
        };
        f.write_str(name)
    }
}

/// Errors that can occur while editing or processing a Document.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum AmfError {
    /// An index argument refers to a non-existent entity.
    #[error("Invalid {kind} index {index} (count: {len})")]
    IndexOutOfRange {
        kind: EntityKind,
        index: usize,
        len: usize,
    },

    /// The edit would make an entity reference itself, directly or transitively.
    #[error("Cannot reference {kind} {to} from {kind} {from}: it would create a self-referencing cycle")]
    ReferenceCycle {
        kind: EntityKind,
        from: usize,
        to: usize,
    },

    /// Imported or loaded data violates the expected structure.
    #[error("Malformed input: {0}")]
    MalformedInput(String),

    /// An external resource named by the input could not be located.
    #[error("Could not locate resource: {path}")]
    MissingResource { path: String },

    /// The operation observed a cancellation request.
    #[error("Operation cancelled")]
    Cancelled,

    /// The projected triangle count exceeds the configured limit.
    #[error("Too many triangles: {count} (max: {max})")]
    TooManyTriangles { count: usize, max: usize },

    /// The requested slice grid exceeds the configured pixel limit.
    #[error("Slice too large: {width} x {height} pixels (max: {max})")]
    TooManyPixels { width: f64, height: f64, max: usize },

    /// A numeric or structural argument is not acceptable.
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),
}

impl AmfError {
    /// Creates an index-out-of-range error.
    pub fn out_of_range(kind: EntityKind, index: usize, len: usize) -> Self {
        Self::IndexOutOfRange { kind, index, len }
    }

    /// Creates a malformed input error.
    pub fn malformed(message: impl Into<String>) -> Self {
        Self::MalformedInput(message.into())
    }

    /// Creates an invalid argument error.
    pub fn invalid(message: impl Into<String>) -> Self {
        Self::InvalidArgument(message.into())
    }

    /// Returns true for [`AmfError::Cancelled`].
    pub fn is_cancelled(&self) -> bool {
        matches!(self, AmfError::Cancelled)
    }
}

/// Result type alias for document operations.
pub type AmfResult<T> = Result<T, AmfError>;

/// Returns `slice[index]` or an [`AmfError::IndexOutOfRange`].
pub(crate) fn checked<T>(slice: &[T], kind: EntityKind, index: usize) -> AmfResult<&T> {
    slice
        .get(index)
        .ok_or_else(|| AmfError::out_of_range(kind, index, slice.len()))
}

/// Mutable counterpart of [`checked`].
pub(crate) fn checked_mut<T>(
    slice: &mut [T],
    kind: EntityKind,
    index: usize,
) -> AmfResult<&mut T> {
    let len = slice.len();
    slice
        .get_mut(index)
        .ok_or_else(|| AmfError::out_of_range(kind, index, len))
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = AmfError::out_of_range(EntityKind::Object, 4, 2);
        assert_eq!(err.to_string(), "Invalid object index 4 (count: 2)");

        let err = AmfError::ReferenceCycle {
            kind: EntityKind::Material,
            from: 1,
            to: 2,
        };
        assert!(err.to_string().contains("cycle"));

        let err = AmfError::MissingResource {
            path: "wood.png".to_string(),
        };
        assert!(err.to_string().contains("wood.png"));
    }

    #[test]
    fn test_checked_helpers() {
        let mut items = vec![1, 2, 3];
        assert_eq!(checked(&items, EntityKind::Texture, 1), Ok(&2));
        assert_eq!(
            checked(&items, EntityKind::Texture, 3),
            Err(AmfError::out_of_range(EntityKind::Texture, 3, 3))
        );
        *checked_mut(&mut items, EntityKind::Texture, 0).unwrap() = 9;
        assert_eq!(items[0], 9);
    }

    #[test]
    fn test_error_is_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<AmfError>();
    }
}
