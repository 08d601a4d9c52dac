//! Document Model
//!
//! Immutable value types for block documents.
//!
//! # Overview
//!
//! A [`Document`] is an ordered list of [`Block`]s plus an entity table. Each block owns its
//! text and one [`CharMetadata`] entry per character (inline style tags plus an optional
//! [`EntityKey`]). Blocks and entities are held behind [`Arc`], so deriving a new document from an
//! old one only allocates for the blocks an edit actually touches; every other block keeps its
//! identity (`Arc::ptr_eq`) across the edit.
//!
//! # Invariants
//!
//! - a document always holds at least one block
//! - `chars.len()` equals the number of characters in `text` for every block
//! - block keys are unique; generated keys are never handed out twice for one document lineage
//! - every entity reference resolves to a live entry of the entity table
//!
//! [`Document::check_invariants`] verifies all of them. Internal transforms assert it in debug
//! builds.

use crate::error::InvariantViolation;
use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use std::collections::{BTreeMap, BTreeSet, HashSet};
use std::fmt;
use std::ops::Range;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

/// Free-form key/value mapping used for block data and entity data.
pub type DataMap = BTreeMap<String, serde_json::Value>;

/// Set of inline style tags carried by one character.
pub type StyleSet = BTreeSet<InlineStyle>;

/// Stable identity of a block.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BlockKey(String);

impl BlockKey {
    /// Create a block key from any string.
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    /// The key as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Numeric suffix of keys produced by the document key generator (`b0`, `b1`, ...).
    fn generated_index(&self) -> Option<u64> {
        self.0.strip_prefix('b')?.parse().ok()
    }
}

impl fmt::Display for BlockKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for BlockKey {
    fn from(key: &str) -> Self {
        Self::new(key)
    }
}

/// Open, host-extensible block type tag (`unstyled`, `atomic`, `unordered-list-item`, ...).
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BlockType(Cow<'static, str>);

impl BlockType {
    /// The default block type.
    pub const UNSTYLED: BlockType = BlockType(Cow::Borrowed("unstyled"));
    /// Embedded content (media, horizontal rules). Strict by default.
    pub const ATOMIC: BlockType = BlockType(Cow::Borrowed("atomic"));

    /// Create a block type from any name.
    pub fn new(name: impl Into<Cow<'static, str>>) -> Self {
        Self(name.into())
    }

    /// The type name.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for BlockType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl Default for BlockType {
    fn default() -> Self {
        Self::UNSTYLED
    }
}

/// Open entity type tag (`LINK`, `HR`, `IMAGE`, ...).
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EntityType(Cow<'static, str>);

impl EntityType {
    /// Hyperlink entity.
    pub const LINK: EntityType = EntityType(Cow::Borrowed("LINK"));
    /// Horizontal rule entity.
    pub const HORIZONTAL_RULE: EntityType = EntityType(Cow::Borrowed("HR"));

    /// Create an entity type from any name.
    pub fn new(name: impl Into<Cow<'static, str>>) -> Self {
        Self(name.into())
    }

    /// The type name.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for EntityType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Inline style tag, conventionally `GROUP-VALUE` (e.g. `COLOR-FF0000`) or a bare name (`BOLD`).
///
/// Tags are upper-cased on construction.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub struct InlineStyle(Cow<'static, str>);

impl InlineStyle {
    /// Create a style tag. The name is upper-cased.
    pub fn new(name: impl AsRef<str>) -> Self {
        Self(Cow::Owned(name.as_ref().to_uppercase()))
    }

    /// Create the `PREFIX-VALUE` tag of a style group.
    pub fn grouped(prefix: &str, value: impl fmt::Display) -> Self {
        Self::new(format!("{prefix}-{value}"))
    }

    /// The tag as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns `true` if this tag belongs to the group named `prefix` (`PREFIX-...`).
    pub fn in_group(&self, prefix: &str) -> bool {
        self.0
            .strip_prefix(prefix)
            .is_some_and(|rest| rest.starts_with('-'))
    }
}

impl fmt::Display for InlineStyle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for InlineStyle {
    fn from(name: &str) -> Self {
        Self::new(name)
    }
}

impl From<String> for InlineStyle {
    fn from(name: String) -> Self {
        Self::new(name)
    }
}

impl From<InlineStyle> for String {
    fn from(style: InlineStyle) -> Self {
        style.0.into_owned()
    }
}

/// Key of an entry in the entity table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EntityKey(pub u64);

impl fmt::Display for EntityKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Whether an applied entity may be edited in place.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Mutability {
    /// Text covered by the entity can be edited freely (links).
    Mutable,
    /// The entity is replaced wholesale rather than edited (media, rules).
    Immutable,
}

/// Per-character metadata: style tags plus an optional entity reference.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CharMetadata {
    /// Inline style tags.
    #[serde(default, skip_serializing_if = "BTreeSet::is_empty")]
    pub style: StyleSet,
    /// Entity reference.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub entity: Option<EntityKey>,
}

impl CharMetadata {
    /// Create metadata from a style set and an optional entity.
    pub fn new(style: StyleSet, entity: Option<EntityKey>) -> Self {
        Self { style, entity }
    }

    /// Returns `true` if the character carries no style and no entity.
    pub fn is_empty(&self) -> bool {
        self.style.is_empty() && self.entity.is_none()
    }

    /// Returns `true` if the character carries `style`.
    pub fn has_style(&self, style: &InlineStyle) -> bool {
        self.style.contains(style)
    }
}

/// One block of the document (a paragraph, a list item, an atomic media block, ...).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Block {
    key: BlockKey,
    #[serde(rename = "type")]
    block_type: BlockType,
    text: String,
    chars: Vec<CharMetadata>,
    #[serde(default)]
    data: DataMap,
}

impl Block {
    /// Create a block with plain text (no styles, no entities) and no data.
    pub fn new(key: BlockKey, block_type: BlockType, text: impl Into<String>) -> Self {
        let text = text.into();
        let chars = vec![CharMetadata::default(); text.chars().count()];
        Self {
            key,
            block_type,
            text,
            chars,
            data: DataMap::new(),
        }
    }

    /// Create a block from all of its parts.
    ///
    /// `chars` must hold one entry per character of `text`; documents built from such blocks
    /// reject mismatches with [`InvariantViolation::LengthMismatch`].
    pub fn from_parts(
        key: BlockKey,
        block_type: BlockType,
        text: impl Into<String>,
        chars: Vec<CharMetadata>,
        data: DataMap,
    ) -> Self {
        Self {
            key,
            block_type,
            text: text.into(),
            chars,
            data,
        }
    }

    /// Replace the block data.
    pub fn with_data(mut self, data: DataMap) -> Self {
        self.data = data;
        self
    }

    /// Replace the block type.
    pub fn with_type(mut self, block_type: BlockType) -> Self {
        self.block_type = block_type;
        self
    }

    /// Block key.
    pub fn key(&self) -> &BlockKey {
        &self.key
    }

    /// Block type.
    pub fn block_type(&self) -> &BlockType {
        &self.block_type
    }

    /// Block text.
    pub fn text(&self) -> &str {
        &self.text
    }

    /// Per-character metadata.
    pub fn chars(&self) -> &[CharMetadata] {
        &self.chars
    }

    /// Block data.
    pub fn data(&self) -> &DataMap {
        &self.data
    }

    /// A single block data value.
    pub fn data_value(&self, name: &str) -> Option<&serde_json::Value> {
        self.data.get(name)
    }

    /// Length in characters.
    pub fn len(&self) -> usize {
        self.chars.len()
    }

    /// Returns `true` if the block has no text.
    pub fn is_empty(&self) -> bool {
        self.chars.is_empty()
    }

    /// Metadata of the character at `offset`.
    pub fn char_at(&self, offset: usize) -> Option<&CharMetadata> {
        self.chars.get(offset)
    }

    /// Entity referenced by the character at `offset`.
    pub fn entity_at(&self, offset: usize) -> Option<EntityKey> {
        self.chars.get(offset).and_then(|c| c.entity)
    }

    /// Text of a character range.
    pub fn text_slice(&self, range: Range<usize>) -> &str {
        let start = byte_offset(&self.text, range.start);
        let end = byte_offset(&self.text, range.end);
        &self.text[start..end]
    }

    pub(crate) fn slice(&self, range: Range<usize>) -> (String, Vec<CharMetadata>) {
        (
            self.text_slice(range.clone()).to_string(),
            self.chars[range].to_vec(),
        )
    }

    /// Replace `range` with `text`/`chars`, keeping key, type and data.
    pub(crate) fn splice(&self, range: Range<usize>, text: &str, chars: &[CharMetadata]) -> Block {
        debug_assert_eq!(text.chars().count(), chars.len());
        let start = byte_offset(&self.text, range.start);
        let end = byte_offset(&self.text, range.end);

        let mut new_text = String::with_capacity(self.text.len() - (end - start) + text.len());
        new_text.push_str(&self.text[..start]);
        new_text.push_str(text);
        new_text.push_str(&self.text[end..]);

        let mut new_chars = Vec::with_capacity(self.chars.len() - range.len() + chars.len());
        new_chars.extend_from_slice(&self.chars[..range.start]);
        new_chars.extend_from_slice(chars);
        new_chars.extend_from_slice(&self.chars[range.end..]);

        Block {
            key: self.key.clone(),
            block_type: self.block_type.clone(),
            text: new_text,
            chars: new_chars,
            data: self.data.clone(),
        }
    }

    pub(crate) fn with_chars(&self, chars: Vec<CharMetadata>) -> Block {
        debug_assert_eq!(chars.len(), self.chars.len());
        Block {
            chars,
            ..self.clone()
        }
    }
}

/// Out-of-band record (link, media, rule) referenced by characters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Entity {
    /// Entity type tag.
    #[serde(rename = "type")]
    pub entity_type: EntityType,
    /// Mutability flag.
    pub mutability: Mutability,
    /// Entity data.
    #[serde(default)]
    pub data: DataMap,
}

impl Entity {
    /// Create an entity record.
    pub fn new(entity_type: EntityType, mutability: Mutability, data: DataMap) -> Self {
        Self {
            entity_type,
            mutability,
            data,
        }
    }

    /// A string-valued data entry.
    pub fn data_str(&self, name: &str) -> Option<&str> {
        self.data.get(name).and_then(|v| v.as_str())
    }
}

/// Immutable rich-text document.
///
/// # Example
///
/// ```rust
/// use richtext_core::{BlockKey, Document};
///
/// let doc = Document::new();
/// assert_eq!(doc.blocks().len(), 1);
/// assert_eq!(doc.first_block().key(), &BlockKey::new("b0"));
/// ```
#[derive(Debug, Clone)]
pub struct Document {
    blocks: Vec<Arc<Block>>,
    entities: BTreeMap<EntityKey, Arc<Entity>>,
    keys: Arc<KeySequence>,
}

/// Block and entity key counters shared by every document derived from the same root.
///
/// Undo restores an earlier document value together with its handle on the sequence, so keys
/// handed out after an undo never collide with keys of blocks the undo removed.
#[derive(Debug)]
struct KeySequence {
    next_block: AtomicU64,
    next_entity: AtomicU64,
}

impl KeySequence {
    fn starting_at(next_block: u64, next_entity: u64) -> Arc<Self> {
        Arc::new(Self {
            next_block: AtomicU64::new(next_block),
            next_entity: AtomicU64::new(next_entity),
        })
    }
}

impl PartialEq for Document {
    fn eq(&self, other: &Self) -> bool {
        self.blocks == other.blocks && self.entities == other.entities
    }
}

impl Eq for Document {}

impl Default for Document {
    fn default() -> Self {
        Self::new()
    }
}

impl Document {
    /// Create an empty document: one empty `unstyled` block with key `b0`.
    pub fn new() -> Self {
        Self {
            blocks: vec![Arc::new(Block::new(
                BlockKey::new("b0"),
                BlockType::UNSTYLED,
                "",
            ))],
            entities: BTreeMap::new(),
            keys: KeySequence::starting_at(1, 0),
        }
    }

    /// Create a document with one `unstyled` block per line of `text`.
    pub fn from_text(text: &str) -> Self {
        let blocks = text
            .split('\n')
            .enumerate()
            .map(|(i, line)| {
                Arc::new(Block::new(
                    BlockKey::new(format!("b{i}")),
                    BlockType::UNSTYLED,
                    line,
                ))
            })
            .collect::<Vec<_>>();
        let next_block = blocks.len() as u64;
        Self {
            blocks,
            entities: BTreeMap::new(),
            keys: KeySequence::starting_at(next_block, 0),
        }
    }

    /// Create a document from externally supplied content.
    pub fn from_blocks(
        blocks: Vec<Block>,
        entities: BTreeMap<EntityKey, Entity>,
    ) -> Result<Self, InvariantViolation> {
        let next_block = blocks
            .iter()
            .filter_map(|b| b.key.generated_index())
            .max()
            .map_or(0, |max| max + 1);
        let next_entity = entities.keys().next_back().map_or(0, |k| k.0 + 1);

        let document = Self {
            blocks: blocks.into_iter().map(Arc::new).collect(),
            entities: entities
                .into_iter()
                .map(|(key, entity)| (key, Arc::new(entity)))
                .collect(),
            keys: KeySequence::starting_at(next_block, next_entity),
        };
        document.check_invariants()?;
        Ok(document)
    }

    /// All blocks in reading order.
    pub fn blocks(&self) -> &[Arc<Block>] {
        &self.blocks
    }

    /// Look up a block by key.
    pub fn block(&self, key: &BlockKey) -> Option<&Arc<Block>> {
        self.blocks.iter().find(|b| &b.key == key)
    }

    /// Position of a block in reading order.
    pub fn block_index(&self, key: &BlockKey) -> Option<usize> {
        self.blocks.iter().position(|b| &b.key == key)
    }

    /// The block following `key`.
    pub fn block_after(&self, key: &BlockKey) -> Option<&Arc<Block>> {
        self.block_index(key).and_then(|i| self.blocks.get(i + 1))
    }

    /// The block preceding `key`.
    pub fn block_before(&self, key: &BlockKey) -> Option<&Arc<Block>> {
        self.block_index(key)
            .and_then(|i| i.checked_sub(1))
            .and_then(|i| self.blocks.get(i))
    }

    /// First block. Documents always hold at least one block.
    pub fn first_block(&self) -> &Arc<Block> {
        &self.blocks[0]
    }

    /// Last block.
    pub fn last_block(&self) -> &Arc<Block> {
        &self.blocks[self.blocks.len() - 1]
    }

    /// Look up an entity.
    pub fn entity(&self, key: EntityKey) -> Option<&Arc<Entity>> {
        self.entities.get(&key)
    }

    /// All entities, ordered by key.
    pub fn entities(&self) -> impl Iterator<Item = (EntityKey, &Arc<Entity>)> {
        self.entities.iter().map(|(k, e)| (*k, e))
    }

    /// Number of entity records.
    pub fn entity_count(&self) -> usize {
        self.entities.len()
    }

    /// Plain text of the whole document, blocks joined by `'\n'`.
    pub fn plain_text(&self) -> String {
        self.blocks
            .iter()
            .map(|b| b.text.as_str())
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// Verify the structural invariants.
    pub fn check_invariants(&self) -> Result<(), InvariantViolation> {
        if self.blocks.is_empty() {
            return Err(InvariantViolation::EmptyDocument);
        }

        let mut seen: HashSet<&BlockKey> = HashSet::with_capacity(self.blocks.len());
        for block in &self.blocks {
            if !seen.insert(&block.key) {
                return Err(InvariantViolation::DuplicateBlockKey(block.key.clone()));
            }

            let text_len = block.text.chars().count();
            if text_len != block.chars.len() {
                return Err(InvariantViolation::LengthMismatch {
                    key: block.key.clone(),
                    text_len,
                    meta_len: block.chars.len(),
                });
            }

            if let Some(entity) = block
                .chars
                .iter()
                .filter_map(|c| c.entity)
                .find(|e| !self.entities.contains_key(e))
            {
                return Err(InvariantViolation::DanglingEntity {
                    key: block.key.clone(),
                    entity,
                });
            }
        }
        Ok(())
    }

    pub(crate) fn debug_validate(&self) {
        debug_assert_eq!(self.check_invariants(), Ok(()));
    }

    pub(crate) fn fresh_block_key(&mut self) -> BlockKey {
        let index = self.keys.next_block.fetch_add(1, Ordering::Relaxed);
        BlockKey::new(format!("b{index}"))
    }

    pub(crate) fn add_entity(&mut self, entity: Entity) -> EntityKey {
        let key = EntityKey(self.keys.next_entity.fetch_add(1, Ordering::Relaxed));
        self.entities.insert(key, Arc::new(entity));
        key
    }

    pub(crate) fn replace_entity(&mut self, key: EntityKey, entity: Entity) {
        self.entities.insert(key, Arc::new(entity));
    }

    pub(crate) fn replace_block(&mut self, index: usize, block: Block) {
        self.blocks[index] = Arc::new(block);
    }

    pub(crate) fn splice_blocks(&mut self, range: Range<usize>, blocks: Vec<Block>) {
        self.blocks
            .splice(range, blocks.into_iter().map(Arc::new));
    }
}

/// Byte index of the `char_offset`-th character (clamped to the end of `text`).
pub(crate) fn byte_offset(text: &str, char_offset: usize) -> usize {
    text.char_indices()
        .nth(char_offset)
        .map_or(text.len(), |(i, _)| i)
}
