//! Block-level operations: block data, alignment, indentation, block types, block removal and
//! block-addressed selection helpers.
//!
//! Block data edits target the selection's anchor block. A value of [`serde_json::Value::Null`]
//! in the supplied data removes the key, which is how callers delete entries.

use crate::error::EditError;
use crate::model::{Block, BlockKey, BlockType, DataMap};
use crate::modifier;
use crate::selection::Selection;
use crate::session::{ChangeType, EditingSession};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;

/// Block data key holding the text alignment.
pub const TEXT_ALIGN: &str = "textAlign";
/// Block data key holding the indentation depth.
pub const TEXT_INDENT: &str = "textIndent";
/// Block data key holding a media float.
pub const FLOAT: &str = "float";
/// Block data key holding a media alignment.
pub const ALIGNMENT: &str = "alignment";

/// Float/alignment pair for [`set_media_position`]. `None` leaves the key untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MediaPosition {
    /// `left`, `right`, ...
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub float: Option<String>,
    /// `left`, `center`, `right`, ...
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alignment: Option<String>,
}

/// Returns `true` if the selection is a caret.
pub fn is_selection_collapsed(session: &EditingSession) -> bool {
    session.selection().is_collapsed()
}

/// The block holding the selection's anchor.
pub fn selection_block(session: &EditingSession) -> Option<Arc<Block>> {
    session
        .document()
        .block(&session.selection().anchor.key)
        .cloned()
}

/// One value of the anchor block's data.
pub fn selection_block_data(session: &EditingSession, name: &str) -> Option<Value> {
    selection_block(session).and_then(|block| block.data_value(name).cloned())
}

/// Type of the anchor block.
pub fn selection_block_type(session: &EditingSession) -> Option<BlockType> {
    selection_block(session).map(|block| block.block_type().clone())
}

/// Select the whole text of the block `key`. Unknown keys leave the session unchanged.
pub fn select_block(session: &EditingSession, key: &BlockKey) -> EditingSession {
    match session.document().block(key) {
        Some(block) => session.force_selection(Selection::over_block(block)),
        None => session.rejected("select_block", "unknown block"),
    }
}

/// Select the whole block following `key`, if there is one.
pub fn select_next_block(session: &EditingSession, key: &BlockKey) -> EditingSession {
    match session.document().block_after(key) {
        Some(next) => session.force_selection(Selection::over_block(next)),
        None => session.rejected("select_next_block", "no following block"),
    }
}

/// Merge `data` onto the anchor block's data, or replace it wholesale when `override_existing` is
/// set. Keys whose resulting value is `null` are dropped.
pub fn set_block_data(
    session: &EditingSession,
    data: &DataMap,
    override_existing: bool,
) -> EditingSession {
    const OPERATION: &str = "set_block_data";
    let Some(index) = session.document().block_index(&session.selection().anchor.key) else {
        return session.rejected(OPERATION, "unknown anchor block");
    };
    apply_block_data(session, index, data, override_existing, OPERATION)
}

/// Set `textAlign`, or clear it when the anchor block is already aligned that way.
pub fn toggle_alignment(session: &EditingSession, alignment: &str) -> EditingSession {
    let current = selection_block_data(session, TEXT_ALIGN);
    let value = if current.as_ref().and_then(Value::as_str) == Some(alignment) {
        Value::Null
    } else {
        Value::String(alignment.to_string())
    };
    set_block_data(session, &DataMap::from([(TEXT_ALIGN.to_string(), value)]), false)
}

/// Set `textIndent` to `depth`; depth 0 removes the key.
///
/// Negative depths and depths over `max_depth` leave the session unchanged.
pub fn toggle_indent(session: &EditingSession, depth: i64, max_depth: u32) -> EditingSession {
    if depth < 0 || depth > i64::from(max_depth) {
        return session.rejected("toggle_indent", "depth out of range");
    }
    let value = if depth == 0 {
        Value::Null
    } else {
        Value::from(depth)
    };
    set_block_data(session, &DataMap::from([(TEXT_INDENT.to_string(), value)]), false)
}

/// Current `textIndent` of the anchor block (0 when unset).
pub fn current_indent(session: &EditingSession) -> i64 {
    selection_block_data(session, TEXT_INDENT)
        .and_then(|value| value.as_i64())
        .unwrap_or(0)
}

/// Indent the anchor block one level, up to [`EditorConfig::max_indent`](crate::EditorConfig).
pub fn increase_indent(session: &EditingSession) -> EditingSession {
    match current_indent(session).checked_add(1) {
        Some(depth) => toggle_indent(session, depth, session.config().max_indent),
        None => session.rejected("increase_indent", "depth out of range"),
    }
}

/// Outdent the anchor block one level.
pub fn decrease_indent(session: &EditingSession) -> EditingSession {
    match current_indent(session).checked_sub(1) {
        Some(depth) => toggle_indent(session, depth, session.config().max_indent),
        None => session.rejected("decrease_indent", "depth out of range"),
    }
}

/// Set the type of every block in range, or reset them to `unstyled` when the first block in
/// range already has `block_type`. Ranges touching a strict block are left alone.
pub fn toggle_block_type(session: &EditingSession, block_type: &BlockType) -> EditingSession {
    const OPERATION: &str = "toggle_block_type";
    let Some(resolved) = session.resolved() else {
        return session.rejected(OPERATION, "unresolved selection");
    };
    let document = session.document();
    if resolved.touches_strict_block(document) {
        return session.rejected(OPERATION, "strict block in range");
    }

    let start_type = document.blocks()[resolved.start_index].block_type();
    let target = if start_type == block_type {
        BlockType::UNSTYLED
    } else {
        block_type.clone()
    };
    let unchanged = document.blocks()[resolved.start_index..=resolved.end_index]
        .iter()
        .all(|b| b.block_type() == &target);
    if unchanged {
        return session.rejected(OPERATION, "block type already in place");
    }

    let next = modifier::set_block_type(document, &resolved, &target);
    session.push(next, session.selection().clone(), ChangeType::ChangeBlockType)
}

/// Remove the content of block `key` and reset its type to `unstyled`.
///
/// The selection ends at `fallback` when given, otherwise where the removal left it. Unknown keys
/// leave the session unchanged.
pub fn remove_block(
    session: &EditingSession,
    key: &BlockKey,
    fallback: Option<Selection>,
) -> EditingSession {
    session.recover("remove_block", try_remove_block(session, key, fallback))
}

/// Fallible form of [`remove_block`].
pub fn try_remove_block(
    session: &EditingSession,
    key: &BlockKey,
    fallback: Option<Selection>,
) -> Result<EditingSession, EditError> {
    let document = session.document();
    let block = document
        .block(key)
        .ok_or_else(|| EditError::UnknownBlock(key.clone()))?;
    let range = Selection::over_block(block)
        .resolve(document)
        .ok_or_else(|| EditError::UnknownBlock(key.clone()))?;

    let removed = modifier::remove_range(document, &range);
    let caret = removed
        .selection
        .resolve(&removed.document)
        .ok_or(EditError::InvalidSelection)?;
    let next = modifier::set_block_type(&removed.document, &caret, &BlockType::UNSTYLED);
    if &next == document {
        return Ok(session.rejected("remove_block", "block already empty"));
    }

    let selection = fallback.unwrap_or(removed.selection);
    Ok(session.push(next, selection, ChangeType::RemoveRange))
}

/// Remove every block's content, leaving one empty `unstyled` block.
pub fn clear(session: &EditingSession) -> EditingSession {
    let document = session.document();
    let first = document.first_block();
    if document.blocks().len() == 1 && first.is_empty() && first.block_type() == &BlockType::UNSTYLED
    {
        return session.rejected("clear", "document already empty");
    }
    let Some(all) = Selection::all(document).resolve(document) else {
        return session.rejected("clear", "unresolved selection");
    };

    let removed = modifier::remove_range(document, &all);
    let Some(caret) = removed.selection.resolve(&removed.document) else {
        return session.rejected("clear", "unresolved selection");
    };
    let next = modifier::set_block_type(&removed.document, &caret, &BlockType::UNSTYLED);
    if &next == document {
        return session.rejected("clear", "document already empty");
    }
    session.push(next, removed.selection, ChangeType::RemoveRange)
}

/// Toggle the `float`/`alignment` data of block `key`: a value equal to the current one clears
/// the key. The selection is left where it is.
pub fn set_media_position(
    session: &EditingSession,
    key: &BlockKey,
    position: &MediaPosition,
) -> EditingSession {
    session.recover(
        "set_media_position",
        try_set_media_position(session, key, position),
    )
}

/// Fallible form of [`set_media_position`].
pub fn try_set_media_position(
    session: &EditingSession,
    key: &BlockKey,
    position: &MediaPosition,
) -> Result<EditingSession, EditError> {
    let document = session.document();
    let index = document
        .block_index(key)
        .ok_or_else(|| EditError::UnknownBlock(key.clone()))?;
    let block = &document.blocks()[index];

    let mut data = DataMap::new();
    for (name, wanted) in [(FLOAT, &position.float), (ALIGNMENT, &position.alignment)] {
        let Some(wanted) = wanted else {
            continue;
        };
        let current = block.data_value(name).and_then(Value::as_str);
        let value = if current == Some(wanted.as_str()) {
            Value::Null
        } else {
            Value::String(wanted.clone())
        };
        data.insert(name.to_string(), value);
    }

    Ok(apply_block_data(
        session,
        index,
        &data,
        false,
        "set_media_position",
    ))
}

fn apply_block_data(
    session: &EditingSession,
    index: usize,
    data: &DataMap,
    override_existing: bool,
    operation: &'static str,
) -> EditingSession {
    let document = session.document();
    let block = &document.blocks()[index];

    let mut merged = if override_existing {
        DataMap::new()
    } else {
        block.data().clone()
    };
    merged.extend(data.iter().map(|(k, v)| (k.clone(), v.clone())));
    merged.retain(|_, value| !value.is_null());

    if &merged == block.data() {
        return session.rejected(operation, "block data unchanged");
    }

    let next = modifier::set_block_data(document, index, merged);
    session.push(next, session.selection().clone(), ChangeType::ChangeBlockData)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Document;
    use serde_json::json;

    fn session(text: &str) -> EditingSession {
        EditingSession::new(Document::from_text(text))
    }

    #[test]
    fn test_set_block_data_merges_and_strips_null() {
        let s = session("abc");
        let s = set_block_data(&s, &DataMap::from([("a".into(), json!(1)), ("b".into(), json!(2))]), false);
        let s = set_block_data(&s, &DataMap::from([("a".into(), Value::Null), ("c".into(), json!(3))]), false);
        let data = s.document().first_block().data().clone();
        assert_eq!(data, DataMap::from([("b".into(), json!(2)), ("c".into(), json!(3))]));

        let s = set_block_data(&s, &DataMap::from([("z".into(), json!("x"))]), true);
        assert_eq!(s.document().first_block().data(), &DataMap::from([("z".into(), json!("x"))]));
    }

    #[test]
    fn test_toggle_alignment_clears_when_equal() {
        let s = toggle_alignment(&session("abc"), "center");
        assert_eq!(selection_block_data(&s, TEXT_ALIGN), Some(json!("center")));
        let s = toggle_alignment(&s, "center");
        assert_eq!(selection_block_data(&s, TEXT_ALIGN), None);
        assert_eq!(s.undo_depth(), 2);
    }

    #[test]
    fn test_indent_bounds() {
        let s = session("abc");
        assert!(toggle_indent(&s, 7, 6).is_same_state(&s));
        assert!(toggle_indent(&s, -1, 6).is_same_state(&s));

        let s = toggle_indent(&s, 3, 6);
        assert_eq!(current_indent(&s), 3);
        let s = toggle_indent(&s, 0, 6);
        assert!(!s.document().first_block().data().contains_key(TEXT_INDENT));
    }

    #[test]
    fn test_increase_and_decrease_indent() {
        let mut s = session("abc");
        for _ in 0..8 {
            s = increase_indent(&s);
        }
        assert_eq!(current_indent(&s), 6);
        let s = decrease_indent(&s);
        assert_eq!(current_indent(&s), 5);
        let s = session("abc");
        assert!(decrease_indent(&s).is_same_state(&s));
    }

    #[test]
    fn test_indent_steps_at_integer_limits() {
        for extreme in [i64::MAX, i64::MIN] {
            let data = DataMap::from([(TEXT_INDENT.to_string(), json!(extreme))]);
            let s = set_block_data(&session("abc"), &data, false);
            assert_eq!(current_indent(&s), extreme);
            assert!(increase_indent(&s).is_same_state(&s));
            assert!(decrease_indent(&s).is_same_state(&s));
        }
    }

    #[test]
    fn test_toggle_block_type_round_trip() {
        let s = session("one\ntwo").force_selection(Selection::new(
            crate::selection::SelectionPoint::new(BlockKey::new("b0"), 0),
            crate::selection::SelectionPoint::new(BlockKey::new("b1"), 1),
        ));
        let heading = BlockType::new("header-one");
        let s = toggle_block_type(&s, &heading);
        assert!(s.document().blocks().iter().all(|b| b.block_type() == &heading));
        let s = toggle_block_type(&s, &heading);
        assert!(s.document().blocks().iter().all(|b| b.block_type() == &BlockType::UNSTYLED));
    }

    #[test]
    fn test_remove_block_resets_type() {
        let doc = Document::from_blocks(
            vec![
                Block::new(BlockKey::new("b0"), BlockType::new("blockquote"), "quote"),
                Block::new(BlockKey::new("b1"), BlockType::UNSTYLED, "tail"),
            ],
            Default::default(),
        )
        .unwrap();
        let s = EditingSession::new(doc);
        let s = remove_block(&s, &BlockKey::new("b0"), None);
        let first = s.document().first_block();
        assert!(first.is_empty());
        assert_eq!(first.block_type(), &BlockType::UNSTYLED);
        assert_eq!(s.selection(), &Selection::caret("b0", 0));
        assert_eq!(s.last_change_type(), Some(ChangeType::RemoveRange));

        let fallback = Selection::caret("b1", 2);
        let s = remove_block(&s.undo(), &BlockKey::new("b0"), Some(fallback.clone()));
        assert_eq!(s.selection(), &fallback);
    }

    #[test]
    fn test_remove_unknown_block_is_noop() {
        let s = session("abc");
        assert!(remove_block(&s, &BlockKey::new("nope"), None).is_same_state(&s));
        assert!(matches!(
            try_remove_block(&s, &BlockKey::new("nope"), None),
            Err(EditError::UnknownBlock(_))
        ));
    }

    #[test]
    fn test_remove_empty_unstyled_block_records_nothing() {
        let s = session("\ntail");
        let out = remove_block(&s, &BlockKey::new("b0"), Some(Selection::caret("b1", 1)));
        assert!(out.is_same_state(&s));
        assert_eq!(out.undo_depth(), 0);
    }

    #[test]
    fn test_clear_keeps_data_of_lone_empty_block_without_history() {
        let s = set_block_data(&session(""), &DataMap::from([("k".into(), json!(1))]), false);
        assert_eq!(s.undo_depth(), 1);
        let out = clear(&s);
        assert!(out.is_same_state(&s));
        assert_eq!(out.undo_depth(), 1);
    }

    #[test]
    fn test_clear_leaves_single_empty_block() {
        let s = session("one\ntwo\nthree");
        let s = clear(&s);
        assert_eq!(s.document().blocks().len(), 1);
        assert_eq!(s.document().plain_text(), "");
        assert!(clear(&s).is_same_state(&s));
    }

    #[test]
    fn test_media_position_toggles_present_keys_only() {
        let s = session("x");
        let key = BlockKey::new("b0");
        let both = MediaPosition {
            float: Some("left".into()),
            alignment: Some("center".into()),
        };
        let s = set_media_position(&s, &key, &both);
        let float_only = MediaPosition {
            float: Some("left".into()),
            alignment: None,
        };
        let s = set_media_position(&s, &key, &float_only);
        let data = s.document().first_block().data();
        assert_eq!(data.get(FLOAT), None);
        assert_eq!(data.get(ALIGNMENT), Some(&json!("center")));
    }

    #[test]
    fn test_select_block_helpers() {
        let s = session("one\ntwo");
        let s = select_block(&s, &BlockKey::new("b0"));
        assert_eq!(s.selection(), &Selection::within("b0", 0, 3));
        let s = select_next_block(&s, &BlockKey::new("b0"));
        assert_eq!(s.selection(), &Selection::within("b1", 0, 3));
        assert!(select_next_block(&s, &BlockKey::new("b1")).is_same_state(&s));
        assert!(!is_selection_collapsed(&s));
        assert_eq!(selection_block_type(&s), Some(BlockType::UNSTYLED));
    }
}
