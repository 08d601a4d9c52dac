//! Text insertion, removal, block splitting and HTML insertion.

use crate::convert::{ConvertOptions, ConvertSource, HtmlConverter};
use crate::entities::EntityDescriptor;
use crate::error::EditError;
use crate::model::{CharMetadata, StyleSet};
use crate::modifier;
use crate::registry::is_strict_block_type;
use crate::session::{ChangeType, EditingSession};

/// Options for [`insert_text_with`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InsertTextOptions {
    /// Replace a selected range. When unset, a non-collapsed selection rejects the insertion.
    pub replace: bool,
    /// Style of the inserted run. Falls back to the session's carried-over style, then to no
    /// style.
    pub style: Option<StyleSet>,
    /// Entity created and attached to the inserted run.
    pub entity: Option<EntityDescriptor>,
}

impl Default for InsertTextOptions {
    fn default() -> Self {
        Self {
            replace: true,
            style: None,
            entity: None,
        }
    }
}

/// Insert `text` at the caret, or replace the selected range with it when `replace` is set.
pub fn insert_text(session: &EditingSession, text: &str, replace: bool) -> EditingSession {
    insert_text_with(
        session,
        text,
        InsertTextOptions {
            replace,
            ..InsertTextOptions::default()
        },
    )
}

/// [`insert_text`] with an explicit style and/or entity for the inserted run.
pub fn insert_text_with(
    session: &EditingSession,
    text: &str,
    options: InsertTextOptions,
) -> EditingSession {
    session.recover("insert_text", try_insert_text_with(session, text, options))
}

/// Fallible form of [`insert_text_with`].
pub fn try_insert_text_with(
    session: &EditingSession,
    text: &str,
    options: InsertTextOptions,
) -> Result<EditingSession, EditError> {
    const OPERATION: &str = "insert_text";
    let Some(resolved) = session.resolved() else {
        return Ok(session.rejected(OPERATION, "unresolved selection"));
    };
    if resolved.touches_strict_block(session.document()) {
        return Ok(session.rejected(OPERATION, "strict block in range"));
    }
    let collapsed = resolved.is_collapsed();
    if !collapsed && !options.replace {
        return Ok(session.rejected(OPERATION, "range selected without replace"));
    }
    if collapsed && text.is_empty() {
        return Ok(session.rejected(OPERATION, "nothing to insert"));
    }

    let style = options
        .style
        .or_else(|| session.inline_style_override().cloned())
        .unwrap_or_default();

    let (document, entity) = match options.entity {
        Some(descriptor) => {
            let (document, key) =
                modifier::create_entity(session.document(), descriptor.into_entity())?;
            (document, Some(key))
        }
        None => (session.document().clone(), None),
    };

    let inserted = modifier::replace_range(
        &document,
        &resolved,
        text,
        &CharMetadata::new(style, entity),
    );
    let change_type = if collapsed {
        ChangeType::InsertCharacters
    } else {
        ChangeType::ReplaceText
    };
    Ok(session.push(inserted.document, inserted.selection, change_type))
}

/// Delete the selected range.
pub fn remove_selection(session: &EditingSession) -> EditingSession {
    const OPERATION: &str = "remove_selection";
    let Some(resolved) = session.resolved() else {
        return session.rejected(OPERATION, "unresolved selection");
    };
    if resolved.is_collapsed() {
        return session.rejected(OPERATION, "collapsed selection");
    }
    let removed = modifier::remove_range(session.document(), &resolved);
    session.push(removed.document, removed.selection, ChangeType::RemoveRange)
}

/// Split the block at the selection, deleting any selected range first. The caret moves to the
/// start of the new block.
pub fn split_block(session: &EditingSession) -> EditingSession {
    const OPERATION: &str = "split_block";
    let Some(resolved) = session.resolved() else {
        return session.rejected(OPERATION, "unresolved selection");
    };
    if resolved.touches_strict_block(session.document()) {
        return session.rejected(OPERATION, "strict block in range");
    }
    let split = modifier::split_block(session.document(), &resolved);
    session.push(split.document, split.selection, ChangeType::SplitBlock)
}

/// Convert `html` through `converter` and splice the result over the selection.
///
/// Empty input is a no-op. Conversion failures are logged and leave the session unchanged.
pub fn insert_html(
    session: &EditingSession,
    html: &str,
    converter: &dyn HtmlConverter,
    options: &ConvertOptions,
) -> EditingSession {
    session.recover(
        "insert_html",
        try_insert_html(session, html, converter, options),
    )
}

/// Fallible form of [`insert_html`].
pub fn try_insert_html(
    session: &EditingSession,
    html: &str,
    converter: &dyn HtmlConverter,
    options: &ConvertOptions,
) -> Result<EditingSession, EditError> {
    const OPERATION: &str = "insert_html";
    if html.is_empty() {
        return Ok(session.rejected(OPERATION, "empty html"));
    }
    let Some(resolved) = session.resolved() else {
        return Ok(session.rejected(OPERATION, "unresolved selection"));
    };
    if resolved.touches_strict_block(session.document()) {
        return Ok(session.rejected(OPERATION, "strict block in range"));
    }

    let fragment = converter.html_to_fragment(html, options, ConvertSource::Insert)?;
    let inserted = modifier::insert_fragment(session.document(), &resolved, &fragment)?;
    if &inserted.document == session.document() {
        return Ok(session.rejected(OPERATION, "fragment changes nothing"));
    }
    tracing::debug!(
        target: "richtext.edit",
        blocks = fragment.blocks.len(),
        entities = fragment.entities.len(),
        "fragment_inserted"
    );
    Ok(session.push(
        inserted.document,
        inserted.selection,
        ChangeType::InsertFragment,
    ))
}

/// Text of the selected range, blocks joined by `'\n'`.
///
/// Empty for a caret or when the anchor block is strict.
pub fn selection_text(session: &EditingSession) -> String {
    let Some(resolved) = session.resolved() else {
        return String::new();
    };
    if resolved.is_collapsed() {
        return String::new();
    }
    let document = session.document();
    let anchor_strict = document
        .block(&session.selection().anchor.key)
        .is_some_and(|b| is_strict_block_type(b.block_type()));
    if anchor_strict {
        return String::new();
    }

    resolved
        .block_ranges(document)
        .iter()
        .map(|r| r.block.text_slice(r.range.clone()))
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::convert::{ContentFragment, FragmentBlock};
    use crate::error::ConversionError;
    use crate::model::{BlockKey, BlockType, Document, EntityType, InlineStyle, Mutability};
    use crate::selection::{Selection, SelectionPoint};

    /// Splits on `<p>` markers; fails on input containing `<broken>`.
    struct ParagraphConverter;

    impl HtmlConverter for ParagraphConverter {
        fn html_to_fragment(
            &self,
            html: &str,
            _options: &ConvertOptions,
            _source: ConvertSource,
        ) -> Result<ContentFragment, ConversionError> {
            if html.contains("<broken>") {
                return Err(ConversionError::new("unbalanced markup"));
            }
            let blocks = html
                .split("<p>")
                .filter(|p| !p.is_empty())
                .map(|p| FragmentBlock::plain(BlockType::UNSTYLED, p.replace("</p>", "")))
                .collect();
            Ok(ContentFragment {
                blocks,
                entities: Default::default(),
            })
        }

        fn document_to_html(
            &self,
            document: &Document,
            _options: &ConvertOptions,
        ) -> Result<String, ConversionError> {
            Ok(document
                .blocks()
                .iter()
                .map(|b| format!("<p>{}</p>", b.text()))
                .collect())
        }
    }

    fn session(text: &str, selection: Selection) -> EditingSession {
        EditingSession::new(Document::from_text(text)).force_selection(selection)
    }

    #[test]
    fn test_insert_at_caret_and_replace() {
        let s = session("abc", Selection::caret("b0", 1));
        let s = insert_text(&s, "XY", true);
        assert_eq!(s.document().plain_text(), "aXYbc");
        assert_eq!(s.selection(), &Selection::caret("b0", 3));
        assert_eq!(s.last_change_type(), Some(ChangeType::InsertCharacters));

        let s = s.force_selection(Selection::within("b0", 1, 3));
        assert!(insert_text(&s, "z", false).is_same_state(&s));
        let s = insert_text(&s, "z", true);
        assert_eq!(s.document().plain_text(), "azbc");
        assert_eq!(s.last_change_type(), Some(ChangeType::ReplaceText));
    }

    #[test]
    fn test_insert_uses_override_then_explicit_style() {
        let s = session("", Selection::caret("b0", 0))
            .set_inline_style_override(StyleSet::from([InlineStyle::new("BOLD")]));
        let s = insert_text(&s, "a", true);
        assert!(s.document().first_block().chars()[0].has_style(&InlineStyle::new("BOLD")));
        assert!(s.inline_style_override().is_none());

        let options = InsertTextOptions {
            style: Some(StyleSet::from([InlineStyle::new("ITALIC")])),
            entity: Some(EntityDescriptor::new(
                EntityType::new("MENTION"),
                Mutability::Immutable,
                Default::default(),
            )),
            ..InsertTextOptions::default()
        };
        let s = insert_text_with(&s, "b", options);
        let meta = &s.document().first_block().chars()[1];
        assert_eq!(meta.style, StyleSet::from([InlineStyle::new("ITALIC")]));
        assert!(meta.entity.is_some());
    }

    #[test]
    fn test_insert_rejected_in_strict_block() {
        let s = session("abc", Selection::caret("b0", 1));
        let s = crate::entities::insert_horizontal_line(&s);
        let atomic = s.document().blocks()[1].key().clone();
        let on_atomic = s.force_selection(Selection::caret(atomic, 0));
        let out = insert_text(&on_atomic, "x", true);
        assert!(std::sync::Arc::ptr_eq(out.document_arc(), on_atomic.document_arc()));
    }

    #[test]
    fn test_selection_text_spans_blocks() {
        let s = session(
            "hello\nworld",
            Selection::new(
                SelectionPoint::new(BlockKey::new("b1"), 3),
                SelectionPoint::new(BlockKey::new("b0"), 2),
            ),
        );
        assert_eq!(selection_text(&s), "llo\nwor");
        assert_eq!(selection_text(&s.force_selection(Selection::caret("b0", 1))), "");
    }

    #[test]
    fn test_split_and_remove() {
        let s = session("abcd", Selection::caret("b0", 2));
        let s = split_block(&s);
        assert_eq!(s.document().plain_text(), "ab\ncd");
        let all = Selection::all(s.document());
        let s = remove_selection(&s.force_selection(all));
        assert_eq!(s.document().plain_text(), "");
        assert_eq!(s.document().blocks().len(), 1);
    }

    #[test]
    fn test_insert_html_multi_block_and_failure() {
        let s = session("abXY", Selection::caret("b0", 2));
        let options = ConvertOptions::default();
        let out = insert_html(&s, "<p>1</p><p>2</p>", &ParagraphConverter, &options);
        assert_eq!(out.document().plain_text(), "ab1\n2XY");
        assert_eq!(out.last_change_type(), Some(ChangeType::InsertFragment));

        assert!(insert_html(&s, "", &ParagraphConverter, &options).is_same_state(&s));
        assert!(insert_html(&s, "<broken>", &ParagraphConverter, &options).is_same_state(&s));
        assert!(matches!(
            try_insert_html(&s, "<broken>", &ParagraphConverter, &options),
            Err(EditError::Conversion(_))
        ));

        let html = crate::convert::to_html(&out, &ParagraphConverter, &options).unwrap();
        assert_eq!(html, "<p>ab1</p><p>2XY</p>");
    }

    #[test]
    fn test_insert_html_with_empty_fragment_at_caret_records_nothing() {
        let s = session("abXY", Selection::caret("b0", 2));
        let options = ConvertOptions::default();
        let out = insert_html(&s, "<p>", &ParagraphConverter, &options);
        assert!(out.is_same_state(&s));
        assert_eq!(out.undo_depth(), 0);

        let ranged = session("abXY", Selection::within("b0", 1, 3));
        let out = insert_html(&ranged, "<p>", &ParagraphConverter, &options);
        assert_eq!(out.document().plain_text(), "aY");
        assert_eq!(out.undo_depth(), 1);
    }
}
