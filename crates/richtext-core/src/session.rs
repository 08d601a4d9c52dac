//! Editing Session
//!
//! An [`EditingSession`] bundles the current document, the selection, the carried-over inline
//! style and the undo/redo history. Sessions are values: every operation takes `&EditingSession`
//! and returns a new session, leaving the input intact.
//!
//! # History
//!
//! - **edit** ([`EditingSession::push`]): the previous `(document, selection)` is pushed onto the
//!   undo stack tagged with a [`ChangeType`], and the redo stack is cleared
//! - **undo**: pops the undo stack; the current state moves to the redo stack
//! - **redo**: the mirror image of undo
//! - **selection change** ([`EditingSession::force_selection`]): touches neither stack
//!
//! # Example
//!
//! ```rust
//! use richtext_core::{EditingSession, Selection, style, text};
//!
//! let session = EditingSession::create_empty(None);
//! let session = text::insert_text(&session, "Hello world", true);
//! let session = session.force_selection(Selection::within("b0", 0, 5));
//! let session = style::toggle_color(&session, "#ff0000");
//!
//! assert!(style::selection_has_style(&session, "COLOR-FF0000"));
//!
//! let undone = session.undo();
//! assert!(!style::selection_has_style(&undone, "COLOR-FF0000"));
//! assert_eq!(undone.redo().document(), session.document());
//! ```

use crate::config::EditorConfig;
use crate::error::EditError;
use crate::model::{Document, StyleSet};
use crate::selection::{ResolvedSelection, Selection, SelectionPoint};
use serde::{Deserialize, Serialize};
use std::any::Any;
use std::fmt;
use std::sync::Arc;

/// Opaque host decorator handed to the session constructors and carried along unexamined.
pub type Decorator = Arc<dyn Any + Send + Sync>;

/// Label attached to every undo entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ChangeType {
    /// Characters inserted at a caret.
    InsertCharacters,
    /// A selected range replaced by new text.
    ReplaceText,
    /// Converted content or an atomic block spliced in.
    InsertFragment,
    /// Text removed.
    RemoveRange,
    /// Text before a caret deleted, or a block joined with its predecessor.
    BackspaceCharacter,
    /// Text after a caret deleted, or a block joined with its successor.
    DeleteCharacter,
    /// A block split in two.
    SplitBlock,
    /// Inline style tags changed.
    ChangeInlineStyle,
    /// Block types changed.
    ChangeBlockType,
    /// Block data or entity data changed.
    ChangeBlockData,
    /// Entity references applied or cleared.
    ApplyEntity,
}

impl ChangeType {
    /// Stable label, e.g. `insert-characters`.
    pub fn as_str(&self) -> &'static str {
        match self {
            ChangeType::InsertCharacters => "insert-characters",
            ChangeType::ReplaceText => "replace-text",
            ChangeType::InsertFragment => "insert-fragment",
            ChangeType::RemoveRange => "remove-range",
            ChangeType::BackspaceCharacter => "backspace-character",
            ChangeType::DeleteCharacter => "delete-character",
            ChangeType::SplitBlock => "split-block",
            ChangeType::ChangeInlineStyle => "change-inline-style",
            ChangeType::ChangeBlockType => "change-block-type",
            ChangeType::ChangeBlockData => "change-block-data",
            ChangeType::ApplyEntity => "apply-entity",
        }
    }

    /// Change types that keep the carried-over inline style alive.
    fn preserves_style_override(&self) -> bool {
        matches!(self, ChangeType::ChangeBlockType | ChangeType::SplitBlock)
    }
}

impl fmt::Display for ChangeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One undo/redo entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HistoryEntry {
    /// Document before (undo) or after (redo) the change.
    pub document: Arc<Document>,
    /// Selection paired with `document`.
    pub selection: Selection,
    /// Kind of change that separated this entry from its neighbor.
    pub change_type: ChangeType,
}

/// Document + selection + style carry-over + undo/redo history.
#[derive(Clone)]
pub struct EditingSession {
    document: Arc<Document>,
    selection: Selection,
    inline_style_override: Option<StyleSet>,
    undo_stack: Arc<Vec<HistoryEntry>>,
    redo_stack: Arc<Vec<HistoryEntry>>,
    last_change_type: Option<ChangeType>,
    config: Arc<EditorConfig>,
    decorator: Option<Decorator>,
}

impl fmt::Debug for EditingSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EditingSession")
            .field("document", &self.document)
            .field("selection", &self.selection)
            .field("inline_style_override", &self.inline_style_override)
            .field("undo_depth", &self.undo_stack.len())
            .field("redo_depth", &self.redo_stack.len())
            .field("last_change_type", &self.last_change_type)
            .field("has_decorator", &self.decorator.is_some())
            .finish()
    }
}

impl EditingSession {
    /// Create a session with the caret at the start of the first block.
    pub fn new(document: Document) -> Self {
        let selection = Selection::collapsed(SelectionPoint::new(
            document.first_block().key().clone(),
            0,
        ));
        Self {
            document: Arc::new(document),
            selection,
            inline_style_override: None,
            undo_stack: Arc::new(Vec::new()),
            redo_stack: Arc::new(Vec::new()),
            last_change_type: None,
            config: Arc::new(EditorConfig::default()),
            decorator: None,
        }
    }

    /// Create a session over an empty document.
    pub fn create_empty(decorator: Option<Decorator>) -> Self {
        Self::create_with_content(Document::new(), decorator)
    }

    /// Create a session over existing content.
    pub fn create_with_content(document: Document, decorator: Option<Decorator>) -> Self {
        Self {
            decorator,
            ..Self::new(document)
        }
    }

    /// Replace the configuration.
    pub fn with_config(mut self, config: EditorConfig) -> Self {
        self.config = Arc::new(config);
        self
    }

    /// Current document.
    pub fn document(&self) -> &Document {
        &self.document
    }

    /// Current document as a shared handle (for identity comparisons).
    pub fn document_arc(&self) -> &Arc<Document> {
        &self.document
    }

    /// Current selection.
    pub fn selection(&self) -> &Selection {
        &self.selection
    }

    /// Style applied to the next insertion at a caret, if one was set.
    pub fn inline_style_override(&self) -> Option<&StyleSet> {
        self.inline_style_override.as_ref()
    }

    /// Session configuration.
    pub fn config(&self) -> &EditorConfig {
        &self.config
    }

    /// Host decorator.
    pub fn decorator(&self) -> Option<&Decorator> {
        self.decorator.as_ref()
    }

    /// Undo entries, oldest first.
    pub fn undo_stack(&self) -> &[HistoryEntry] {
        &self.undo_stack
    }

    /// Redo entries, oldest first (the next redo is the last element).
    pub fn redo_stack(&self) -> &[HistoryEntry] {
        &self.redo_stack
    }

    /// Can undo
    pub fn can_undo(&self) -> bool {
        !self.undo_stack.is_empty()
    }

    /// Can redo
    pub fn can_redo(&self) -> bool {
        !self.redo_stack.is_empty()
    }

    /// Undo stack depth
    pub fn undo_depth(&self) -> usize {
        self.undo_stack.len()
    }

    /// Redo stack depth
    pub fn redo_depth(&self) -> usize {
        self.redo_stack.len()
    }

    /// Change type of the most recent edit, cleared by undo/redo and selection changes.
    pub fn last_change_type(&self) -> Option<ChangeType> {
        self.last_change_type
    }

    /// Returns `true` if `other` holds the very same document value (by identity) and an equal
    /// selection. Rejected operations return sessions for which this holds.
    pub fn is_same_state(&self, other: &EditingSession) -> bool {
        Arc::ptr_eq(&self.document, &other.document) && self.selection == other.selection
    }

    /// Install an edited document.
    ///
    /// The current state is pushed onto the undo stack tagged with `change_type` and the redo
    /// stack is cleared. With [`EditorConfig::coalesce_typing`] set, an `insert-characters` edit
    /// directly following another one extends the previous undo step instead.
    pub fn push(&self, document: Document, selection: Selection, change_type: ChangeType) -> Self {
        let coalesce = self.config.coalesce_typing
            && change_type == ChangeType::InsertCharacters
            && self.last_change_type == Some(ChangeType::InsertCharacters)
            && self.can_undo();

        let mut undo_stack = self.undo_stack.as_ref().clone();
        if !coalesce {
            undo_stack.push(HistoryEntry {
                document: Arc::clone(&self.document),
                selection: self.selection.clone(),
                change_type,
            });
            let limit = self.config.history_limit;
            if undo_stack.len() > limit {
                let excess = undo_stack.len() - limit;
                undo_stack.drain(..excess);
            }
        }

        tracing::trace!(
            target: "richtext.session",
            change = change_type.as_str(),
            coalesce,
            undo_depth = undo_stack.len(),
            "push"
        );

        let inline_style_override = if change_type.preserves_style_override() {
            self.inline_style_override.clone()
        } else {
            None
        };

        Self {
            document: Arc::new(document),
            selection,
            inline_style_override,
            undo_stack: Arc::new(undo_stack),
            redo_stack: Arc::new(Vec::new()),
            last_change_type: Some(change_type),
            config: Arc::clone(&self.config),
            decorator: self.decorator.clone(),
        }
    }

    /// Step back one entry. No-op when there is nothing to undo.
    pub fn undo(&self) -> Self {
        let Some(entry) = self.undo_stack.last().cloned() else {
            return self.clone();
        };

        let mut undo_stack = self.undo_stack.as_ref().clone();
        undo_stack.pop();
        let mut redo_stack = self.redo_stack.as_ref().clone();
        redo_stack.push(HistoryEntry {
            document: Arc::clone(&self.document),
            selection: self.selection.clone(),
            change_type: entry.change_type,
        });

        tracing::trace!(
            target: "richtext.session",
            change = entry.change_type.as_str(),
            undo_depth = undo_stack.len(),
            redo_depth = redo_stack.len(),
            "undo"
        );

        self.restore(entry, undo_stack, redo_stack)
    }

    /// Step forward one entry. No-op when there is nothing to redo.
    pub fn redo(&self) -> Self {
        let Some(entry) = self.redo_stack.last().cloned() else {
            return self.clone();
        };

        let mut redo_stack = self.redo_stack.as_ref().clone();
        redo_stack.pop();
        let mut undo_stack = self.undo_stack.as_ref().clone();
        undo_stack.push(HistoryEntry {
            document: Arc::clone(&self.document),
            selection: self.selection.clone(),
            change_type: entry.change_type,
        });

        tracing::trace!(
            target: "richtext.session",
            change = entry.change_type.as_str(),
            undo_depth = undo_stack.len(),
            redo_depth = redo_stack.len(),
            "redo"
        );

        self.restore(entry, undo_stack, redo_stack)
    }

    fn restore(
        &self,
        entry: HistoryEntry,
        undo_stack: Vec<HistoryEntry>,
        redo_stack: Vec<HistoryEntry>,
    ) -> Self {
        Self {
            document: entry.document,
            selection: entry.selection,
            inline_style_override: None,
            undo_stack: Arc::new(undo_stack),
            redo_stack: Arc::new(redo_stack),
            last_change_type: None,
            config: Arc::clone(&self.config),
            decorator: self.decorator.clone(),
        }
    }

    /// Move the selection without editing. History is untouched.
    pub fn force_selection(&self, selection: Selection) -> Self {
        Self {
            selection,
            inline_style_override: None,
            last_change_type: None,
            ..self.clone()
        }
    }

    /// Set the style carried over to the next insertion at a caret.
    pub fn set_inline_style_override(&self, style: StyleSet) -> Self {
        Self {
            inline_style_override: Some(style),
            ..self.clone()
        }
    }

    pub(crate) fn resolved(&self) -> Option<ResolvedSelection> {
        self.selection.resolve(&self.document)
    }

    /// Return an unchanged copy, recording why the operation did nothing.
    pub(crate) fn rejected(&self, operation: &'static str, reason: &'static str) -> Self {
        tracing::debug!(target: "richtext.edit", operation, reason, "rejected");
        self.clone()
    }

    /// Unwrap the result of a fallible operation, falling back to an unchanged copy.
    pub(crate) fn recover(&self, operation: &'static str, result: Result<Self, EditError>) -> Self {
        result.unwrap_or_else(|error| {
            tracing::warn!(target: "richtext.edit", operation, %error, "edit_failed");
            self.clone()
        })
    }
}
