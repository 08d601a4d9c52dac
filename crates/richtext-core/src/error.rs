//! Error types.
//!
//! Operations never partially apply. A failed edit surfaces as an [`EditError`] from the
//! `try_*` form of an operation, or as a `tracing` warning plus an unchanged session from the
//! plain form.

use crate::model::{BlockKey, EntityKey};
use thiserror::Error;

/// Failure reported by the external HTML conversion collaborator.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("html conversion failed: {message}")]
pub struct ConversionError {
    /// Human readable reason supplied by the converter.
    pub message: String,
}

impl ConversionError {
    /// Create a conversion error from any message.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
/// Errors produced while constructing a new document value.
pub enum EditError {
    #[error("unknown block: {0}")]
    /// The addressed block does not exist in the document.
    UnknownBlock(BlockKey),

    #[error("unknown entity: {0}")]
    /// The addressed entity does not exist in the entity table.
    UnknownEntity(EntityKey),

    #[error("entity type must not be empty")]
    /// An entity was requested with an empty type tag.
    InvalidEntityType,

    #[error("selection does not address blocks of this document")]
    /// One of the selection endpoints names a block that is not in the document.
    InvalidSelection,

    #[error(transparent)]
    /// The HTML collaborator rejected its input.
    Conversion(#[from] ConversionError),

    #[error("unknown key command: {0}")]
    /// A key command name did not match any [`KeyCommand`](crate::keys::KeyCommand).
    UnknownKeyCommand(String),

    #[error("no html converter configured")]
    /// An HTML command was executed without a converter.
    MissingConverter,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
/// Structural invariant violations. These indicate a programming defect, not a user error.
pub enum InvariantViolation {
    #[error("document has no blocks")]
    /// A document must always hold at least one block.
    EmptyDocument,

    #[error("block {key}: {text_len} characters but {meta_len} metadata entries")]
    /// Character metadata is out of step with the block text.
    LengthMismatch {
        /// Offending block.
        key: BlockKey,
        /// Length of the text in characters.
        text_len: usize,
        /// Length of the metadata list.
        meta_len: usize,
    },

    #[error("block {key} references missing entity {entity}")]
    /// A character references an entity that is not in the entity table.
    DanglingEntity {
        /// Offending block.
        key: BlockKey,
        /// Missing entity.
        entity: EntityKey,
    },

    #[error("duplicate block key: {0}")]
    /// Two blocks share a key.
    DuplicateBlockKey(BlockKey),
}
