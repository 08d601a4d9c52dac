//! Pure document transforms.
//!
//! Every function takes a document by reference and returns a new one; the input is never
//! touched. Blocks outside the edited range are carried over by `Arc` clone, so they keep their
//! identity. Session-level operations in [`style`](crate::style), [`blocks`](crate::blocks),
//! [`entities`](crate::entities) and [`text`](crate::text) are built from these.

use crate::convert::{ContentFragment, FragmentBlock};
use crate::error::{ConversionError, EditError};
use crate::model::{Block, BlockType, CharMetadata, DataMap, Document, Entity, EntityKey};
use crate::selection::{BlockRange, ResolvedSelection, Selection};
use std::collections::BTreeMap;
use std::sync::Arc;

/// A derived document plus the selection it leaves behind.
#[derive(Debug, Clone)]
pub(crate) struct Transformed {
    pub document: Document,
    pub selection: Selection,
}

/// Delete the selected characters, joining the first and last block of a multi-block range.
pub(crate) fn remove_range(document: &Document, range: &ResolvedSelection) -> Transformed {
    let selection = range.collapse_to_start();
    if range.is_collapsed() {
        return Transformed {
            document: document.clone(),
            selection,
        };
    }

    let mut next = document.clone();
    let blocks = document.blocks();
    let start_block = &blocks[range.start_index];

    if range.start_index == range.end_index {
        next.replace_block(
            range.start_index,
            start_block.splice(range.start.offset..range.end.offset, "", &[]),
        );
    } else {
        let end_block = &blocks[range.end_index];
        let (tail_text, tail_chars) = end_block.slice(range.end.offset..end_block.len());
        let joined = start_block.splice(
            range.start.offset..start_block.len(),
            &tail_text,
            &tail_chars,
        );
        next.splice_blocks(range.start_index..range.end_index + 1, vec![joined]);
    }

    next.debug_validate();
    Transformed {
        document: next,
        selection,
    }
}

/// Replace the selected characters with `text`, every inserted character carrying `meta`.
pub(crate) fn replace_range(
    document: &Document,
    range: &ResolvedSelection,
    text: &str,
    meta: &CharMetadata,
) -> Transformed {
    let removed = remove_range(document, range);
    let index = range.start_index;
    let offset = range.start.offset;

    let mut next = removed.document;
    let block = Arc::clone(&next.blocks()[index]);
    let chars = vec![meta.clone(); text.chars().count()];
    next.replace_block(index, block.splice(offset..offset, text, &chars));
    next.debug_validate();

    Transformed {
        document: next,
        selection: Selection::caret(block.key().clone(), offset + chars.len()),
    }
}

/// Split the block at the (collapsed) start of `range`; the caret moves to the new block.
pub(crate) fn split_block(document: &Document, range: &ResolvedSelection) -> Transformed {
    let removed = remove_range(document, range);
    let index = range.start_index;
    let offset = range.start.offset;

    let mut next = removed.document;
    let block = Arc::clone(&next.blocks()[index]);
    let (tail_text, tail_chars) = block.slice(offset..block.len());
    let head = block.splice(offset..block.len(), "", &[]);
    let tail_key = next.fresh_block_key();
    let tail = Block::from_parts(
        tail_key.clone(),
        block.block_type().clone(),
        tail_text,
        tail_chars,
        DataMap::new(),
    );
    next.splice_blocks(index..index + 1, vec![head, tail]);
    next.debug_validate();

    Transformed {
        document: next,
        selection: Selection::caret(tail_key, 0),
    }
}

/// Set the type of every block in range.
pub(crate) fn set_block_type(
    document: &Document,
    range: &ResolvedSelection,
    block_type: &BlockType,
) -> Document {
    let mut next = document.clone();
    for index in range.start_index..=range.end_index {
        let block = &document.blocks()[index];
        if block.block_type() != block_type {
            next.replace_block(index, block.as_ref().clone().with_type(block_type.clone()));
        }
    }
    next
}

/// Replace the data of the block at `index`.
pub(crate) fn set_block_data(document: &Document, index: usize, data: DataMap) -> Document {
    let mut next = document.clone();
    let block = &document.blocks()[index];
    next.replace_block(index, block.as_ref().clone().with_data(data));
    next
}

/// Drop the block at `index`. The last remaining block is replaced by an empty `unstyled` block
/// under the same key instead.
pub(crate) fn remove_block_at(document: &Document, index: usize) -> Document {
    let mut next = document.clone();
    if document.blocks().len() == 1 {
        let key = document.blocks()[index].key().clone();
        next.replace_block(index, Block::new(key, BlockType::UNSTYLED, ""));
    } else {
        next.splice_blocks(index..index + 1, Vec::new());
    }
    next.debug_validate();
    next
}

/// Rewrite the metadata of every character in `ranges`.
///
/// Blocks whose metadata comes out unchanged keep their identity. Returns `None` when no
/// character changed at all.
pub(crate) fn map_chars(
    document: &Document,
    ranges: &[BlockRange],
    f: impl Fn(&CharMetadata) -> CharMetadata,
) -> Option<Document> {
    let mut next = document.clone();
    let mut changed = false;
    for BlockRange {
        index,
        block,
        range,
    } in ranges
    {
        if range.is_empty() {
            continue;
        }
        let mut chars = block.chars().to_vec();
        for meta in &mut chars[range.clone()] {
            *meta = f(meta);
        }
        if chars.as_slice() != block.chars() {
            next.replace_block(*index, block.with_chars(chars));
            changed = true;
        }
    }
    if !changed {
        return None;
    }
    next.debug_validate();
    Some(next)
}

/// Append a new entity, returning the new document and the fresh key.
pub(crate) fn create_entity(
    document: &Document,
    entity: Entity,
) -> Result<(Document, EntityKey), EditError> {
    if entity.entity_type.as_str().is_empty() {
        return Err(EditError::InvalidEntityType);
    }
    let mut next = document.clone();
    let key = next.add_entity(entity);
    Ok((next, key))
}

/// Shallow-merge `data` onto an existing entity's data.
pub(crate) fn merge_entity_data(
    document: &Document,
    key: EntityKey,
    data: &DataMap,
) -> Result<Document, EditError> {
    let entity = document.entity(key).ok_or(EditError::UnknownEntity(key))?;
    let mut merged = entity.as_ref().clone();
    merged
        .data
        .extend(data.iter().map(|(k, v)| (k.clone(), v.clone())));
    let mut next = document.clone();
    next.replace_entity(key, merged);
    Ok(next)
}

/// Replace the selected range with a converted fragment.
///
/// Fragment entities are copied into the entity table under fresh keys.
pub(crate) fn insert_fragment(
    document: &Document,
    range: &ResolvedSelection,
    fragment: &ContentFragment,
) -> Result<Transformed, EditError> {
    let removed = remove_range(document, range);
    if fragment.blocks.is_empty() {
        return Ok(removed);
    }

    let mut next = removed.document;
    let mut rekeyed: BTreeMap<EntityKey, EntityKey> = BTreeMap::new();
    for (local, entity) in &fragment.entities {
        if entity.entity_type.as_str().is_empty() {
            return Err(EditError::InvalidEntityType);
        }
        rekeyed.insert(*local, next.add_entity(entity.clone()));
    }

    let mut blocks = Vec::with_capacity(fragment.blocks.len());
    for block in &fragment.blocks {
        blocks.push(normalize_fragment_block(block, &rekeyed)?);
    }

    Ok(insert_blocks(
        next,
        range.start_index,
        range.start.offset,
        blocks,
    ))
}

/// Split the caret block and insert an atomic block referencing `entity`.
///
/// The caret ends at the start of the block following the atomic block.
pub(crate) fn insert_atomic_block(
    document: &Document,
    range: &ResolvedSelection,
    entity: EntityKey,
    character: char,
) -> Transformed {
    let split = split_block(document, range);
    let index = range.start_index + 1;
    let meta = CharMetadata::new(Default::default(), Some(entity));

    let atomic = FragmentBlock {
        block_type: BlockType::ATOMIC,
        text: character.to_string(),
        chars: vec![meta],
        data: DataMap::new(),
    };
    let after = FragmentBlock::plain(BlockType::UNSTYLED, "");

    insert_blocks(split.document, index, 0, vec![atomic, after])
}

fn normalize_fragment_block(
    block: &FragmentBlock,
    rekeyed: &BTreeMap<EntityKey, EntityKey>,
) -> Result<FragmentBlock, EditError> {
    let text_len = block.text.chars().count();
    let chars = if block.chars.is_empty() {
        vec![CharMetadata::default(); text_len]
    } else if block.chars.len() == text_len {
        block
            .chars
            .iter()
            .map(|meta| {
                let entity = match meta.entity {
                    Some(local) => Some(*rekeyed.get(&local).ok_or_else(|| {
                        ConversionError::new(format!(
                            "fragment references undeclared entity {local}"
                        ))
                    })?),
                    None => None,
                };
                Ok(CharMetadata::new(meta.style.clone(), entity))
            })
            .collect::<Result<Vec<_>, EditError>>()?
    } else {
        return Err(ConversionError::new(format!(
            "fragment block has {text_len} characters but {} metadata entries",
            block.chars.len()
        ))
        .into());
    };

    Ok(FragmentBlock {
        block_type: block.block_type.clone(),
        text: block.text.clone(),
        chars,
        data: block.data.clone(),
    })
}

/// Insert resolved fragment blocks at `offset` of the block at `index`.
fn insert_blocks(
    mut next: Document,
    index: usize,
    offset: usize,
    mut blocks: Vec<FragmentBlock>,
) -> Transformed {
    let target = Arc::clone(&next.blocks()[index]);

    if blocks.len() == 1 {
        let only = &blocks[0];
        next.replace_block(index, target.splice(offset..offset, &only.text, &only.chars));
        next.debug_validate();
        return Transformed {
            selection: Selection::caret(target.key().clone(), offset + only.chars.len()),
            document: next,
        };
    }

    let last = blocks.pop().unwrap_or_default();
    let mut rest = blocks.into_iter();
    let first = rest.next().unwrap_or_default();

    let mut head = target.splice(offset..target.len(), &first.text, &first.chars);
    if offset == 0 {
        head = head.with_type(first.block_type).with_data(first.data);
    }

    let mut replacement = vec![head];
    for middle in rest {
        let key = next.fresh_block_key();
        replacement.push(Block::from_parts(
            key,
            middle.block_type,
            middle.text,
            middle.chars,
            middle.data,
        ));
    }

    let (trailing_text, trailing_chars) = target.slice(offset..target.len());
    let caret_offset = last.chars.len();
    let tail_key = next.fresh_block_key();
    let mut tail_chars = last.chars;
    tail_chars.extend(trailing_chars);
    replacement.push(Block::from_parts(
        tail_key.clone(),
        last.block_type,
        last.text + &trailing_text,
        tail_chars,
        last.data,
    ));

    next.splice_blocks(index..index + 1, replacement);
    next.debug_validate();
    Transformed {
        document: next,
        selection: Selection::caret(tail_key, caret_offset),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{BlockKey, InlineStyle, Mutability, StyleSet};
    use crate::selection::SelectionPoint;

    fn resolve(doc: &Document, selection: &Selection) -> ResolvedSelection {
        selection.resolve(doc).unwrap()
    }

    #[test]
    fn test_remove_range_joins_blocks() {
        let doc = Document::from_text("hello\nbig\nworld");
        let sel = Selection::new(
            SelectionPoint::new(BlockKey::new("b0"), 2),
            SelectionPoint::new(BlockKey::new("b2"), 3),
        );
        let out = remove_range(&doc, &resolve(&doc, &sel));
        assert_eq!(out.document.plain_text(), "held");
        assert_eq!(out.document.blocks().len(), 1);
        assert_eq!(out.document.first_block().key().as_str(), "b0");
        assert_eq!(out.selection, Selection::caret("b0", 2));
    }

    #[test]
    fn test_split_block_creates_fresh_key() {
        let doc = Document::from_text("abcd");
        let out = split_block(&doc, &resolve(&doc, &Selection::caret("b0", 1)));
        let texts: Vec<_> = out.document.blocks().iter().map(|b| b.text()).collect();
        assert_eq!(texts, vec!["a", "bcd"]);
        assert_eq!(out.selection, Selection::caret("b1", 0));
    }

    #[test]
    fn test_map_chars_keeps_untouched_block_identity() {
        let doc = Document::from_text("one\ntwo");
        let sel = Selection::within("b0", 0, 3);
        let ranges = resolve(&doc, &sel).block_ranges(&doc);
        let bold = InlineStyle::new("BOLD");
        let out = map_chars(&doc, &ranges, |meta| {
            let mut meta = meta.clone();
            meta.style.insert(bold.clone());
            meta
        })
        .unwrap();
        assert!(!Arc::ptr_eq(&doc.blocks()[0], &out.blocks()[0]));
        assert!(Arc::ptr_eq(&doc.blocks()[1], &out.blocks()[1]));
        assert!(out.blocks()[0].chars().iter().all(|c| c.has_style(&bold)));
    }

    #[test]
    fn test_insert_fragment_multi_block_rekeys_entities() {
        let doc = Document::from_text("abXY");
        let mut entities = BTreeMap::new();
        entities.insert(
            EntityKey(40),
            Entity::new(crate::model::EntityType::LINK, Mutability::Mutable, DataMap::new()),
        );
        let fragment = ContentFragment {
            blocks: vec![
                FragmentBlock {
                    block_type: BlockType::UNSTYLED,
                    text: "1".into(),
                    chars: vec![CharMetadata::new(StyleSet::new(), Some(EntityKey(40)))],
                    data: DataMap::new(),
                },
                FragmentBlock::plain(BlockType::new("header-one"), "2"),
                FragmentBlock::plain(BlockType::UNSTYLED, "3"),
            ],
            entities,
        };

        let out = insert_fragment(&doc, &resolve(&doc, &Selection::caret("b0", 2)), &fragment)
            .unwrap();
        let texts: Vec<_> = out.document.blocks().iter().map(|b| b.text()).collect();
        assert_eq!(texts, vec!["ab1", "2", "3XY"]);
        assert_eq!(out.document.blocks()[1].block_type().as_str(), "header-one");
        assert_eq!(out.document.blocks()[0].entity_at(2), Some(EntityKey(0)));
        assert_eq!(out.selection.focus.offset, 1);
        assert_eq!(out.selection.focus.key, *out.document.blocks()[2].key());
    }

    #[test]
    fn test_insert_fragment_rejects_undeclared_entity() {
        let doc = Document::new();
        let fragment = ContentFragment {
            blocks: vec![FragmentBlock {
                block_type: BlockType::UNSTYLED,
                text: "x".into(),
                chars: vec![CharMetadata::new(StyleSet::new(), Some(EntityKey(9)))],
                data: DataMap::new(),
            }],
            entities: BTreeMap::new(),
        };
        let result = insert_fragment(&doc, &resolve(&doc, &Selection::caret("b0", 0)), &fragment);
        assert!(matches!(result, Err(EditError::Conversion(_))));
    }
}
