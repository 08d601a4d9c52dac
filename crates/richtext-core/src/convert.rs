//! HTML conversion interfaces.
//!
//! The engine does not parse or print HTML. Hosts plug a converter in through [`HtmlConverter`];
//! the engine only splices the [`ContentFragment`] it returns into the document (see
//! [`insert_html`](crate::text::insert_html)) or hands it the document to print (see
//! [`to_html`]).

use crate::error::{ConversionError, EditError};
use crate::model::{BlockType, CharMetadata, DataMap, Document, Entity, EntityKey};
use crate::session::EditingSession;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Where converted content is headed. Passed through to the converter untouched.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ConvertSource {
    /// Building a fresh document.
    Create,
    /// Programmatic insertion at the selection.
    #[default]
    Insert,
    /// Clipboard paste.
    Paste,
}

/// Converter options, opaque to the engine.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConvertOptions {
    /// Free-form option values.
    #[serde(default)]
    pub values: DataMap,
}

/// One block of converted content.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FragmentBlock {
    /// Block type.
    #[serde(rename = "type", default)]
    pub block_type: BlockType,
    /// Block text.
    #[serde(default)]
    pub text: String,
    /// Per-character metadata. May be left empty for plain text. Entity references point into
    /// [`ContentFragment::entities`].
    #[serde(default)]
    pub chars: Vec<CharMetadata>,
    /// Block data.
    #[serde(default)]
    pub data: DataMap,
}

impl FragmentBlock {
    /// A plain-text block.
    pub fn plain(block_type: BlockType, text: impl Into<String>) -> Self {
        Self {
            block_type,
            text: text.into(),
            chars: Vec::new(),
            data: DataMap::new(),
        }
    }
}

/// Converted content: blocks plus the entities they reference (keyed locally).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContentFragment {
    /// Blocks in reading order.
    pub blocks: Vec<FragmentBlock>,
    /// Entities referenced by the blocks. Keys are local to the fragment and are re-allocated
    /// when the fragment is spliced into a document.
    #[serde(default)]
    pub entities: BTreeMap<EntityKey, Entity>,
}

/// HTML <-> document conversion collaborator.
pub trait HtmlConverter {
    /// Convert an HTML string into a content fragment.
    fn html_to_fragment(
        &self,
        html: &str,
        options: &ConvertOptions,
        source: ConvertSource,
    ) -> Result<ContentFragment, ConversionError>;

    /// Print a document as HTML.
    fn document_to_html(
        &self,
        document: &Document,
        options: &ConvertOptions,
    ) -> Result<String, ConversionError>;
}

/// Print the session's current document through `converter`.
pub fn to_html(
    session: &EditingSession,
    converter: &dyn HtmlConverter,
    options: &ConvertOptions,
) -> Result<String, EditError> {
    Ok(converter.document_to_html(session.document(), options)?)
}
