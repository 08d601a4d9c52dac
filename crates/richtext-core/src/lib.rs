#![warn(missing_docs)]
//! Richtext Core - Selection-Scoped Rich Text Editing Engine
//!
//! # Overview
//!
//! `richtext-core` edits immutable rich-text documents: an ordered list of blocks, each holding
//! text, one metadata entry (style tags + optional entity reference) per character, and a free-form
//! data map. Every operation takes an [`EditingSession`] and returns a new one; the input session
//! and its document are never touched, and unchanged blocks are shared between the two.
//!
//! The engine does not render, parse HTML or handle input events. HTML conversion is delegated to
//! a host-supplied [`HtmlConverter`].
//!
//! # Core Features
//!
//! - **Style Engine**: inline style toggles with mutually exclusive style groups (`COLOR-`,
//!   `FONTSIZE-`, ...)
//! - **Block/Entity Mutation Engine**: block data, alignment, indentation, block types, links,
//!   atomic media blocks
//! - **Strict Blocks**: block types (atomic by default) that refuse text, style and type edits
//! - **Key Commands**: grapheme-aware backspace/delete, block joins, style shortcuts, line breaks
//! - **Undo/Redo**: every edit records the previous document and selection
//!
//! # Architecture Layers
//!
//! ```text
//! ┌─────────────────────────────────────────────┐
//! │  Command Interface                          │  ← Data-driven API
//! ├─────────────────────────────────────────────┤
//! │  Editing Session (selection + history)      │  ← Public API
//! ├─────────────────────────────────────────────┤
//! │  Style / Block / Entity / Text operations   │  ← Session-level edits
//! ├─────────────────────────────────────────────┤
//! │  Document Modifier (pure transforms)        │  ← Structural sharing
//! ├─────────────────────────────────────────────┤
//! │  Selection Resolver                         │  ← Block ranges
//! ├─────────────────────────────────────────────┤
//! │  Document Model + Registries                │  ← Data
//! └─────────────────────────────────────────────┘
//! ```
//!
//! # Quick Start
//!
//! ```rust
//! use richtext_core::{EditingSession, Selection, blocks, style, text};
//!
//! let session = EditingSession::create_empty(None);
//! let session = text::insert_text(&session, "Hello world", true);
//!
//! let session = session.force_selection(Selection::within("b0", 0, 5));
//! let session = style::toggle_font_size(&session, 24);
//! let session = blocks::toggle_alignment(&session, "center");
//!
//! let block = session.document().first_block();
//! assert_eq!(block.chars()[0].style.iter().next().map(|s| s.as_str()), Some("FONTSIZE-24"));
//! assert_eq!(block.data_value("textAlign"), Some(&serde_json::json!("center")));
//! assert_eq!(session.undo_depth(), 3);
//! ```
//!
//! # Module Description
//!
//! - [`model`] - Blocks, entities, character metadata and the document
//! - [`registry`] - Strict block types and style group prefixes
//! - [`selection`] - Selections and their resolution into block ranges
//! - [`session`] - Editing session and undo/redo history
//! - [`style`] - Style Engine
//! - [`blocks`] - Block data, indentation, block types and removal
//! - [`entities`] - Entities, links, atomic blocks and media
//! - [`text`] - Text and HTML insertion
//! - [`keys`] - Key commands: caret deletion, style shortcuts and line breaks
//! - [`convert`] - HTML conversion interfaces
//! - [`commands`] - Unified command interface
//! - [`config`] - Engine configuration
//!
//! # Logging
//!
//! The crate emits [`tracing`] events and never installs a subscriber:
//!
//! - `richtext.session` (trace): history pushes, undo, redo, command dispatch
//! - `richtext.edit` (debug): operations rejected as no-ops, with the reason
//! - `richtext.edit` (warn): failed edits (conversion errors, unknown keys) that were recovered
//! - `richtext.registry` (debug): registry additions

pub mod blocks;
pub mod commands;
pub mod config;
pub mod convert;
pub mod entities;
pub mod error;
pub mod keys;
pub mod model;
mod modifier;
pub mod registry;
pub mod selection;
pub mod session;
pub mod style;
pub mod text;

pub use commands::{Command, execute};
pub use config::EditorConfig;
pub use convert::{ContentFragment, ConvertOptions, ConvertSource, FragmentBlock, HtmlConverter};
pub use entities::{EntityDescriptor, LinkHref, Media};
pub use error::{ConversionError, EditError, InvariantViolation};
pub use keys::{KeyCommand, LineBreak};
pub use model::{
    Block, BlockKey, BlockType, CharMetadata, DataMap, Document, Entity, EntityKey, EntityType,
    InlineStyle, Mutability, StyleSet,
};
pub use selection::{ResolvedSelection, Selection, SelectionDirection, SelectionPoint};
pub use session::{ChangeType, Decorator, EditingSession, HistoryEntry};
