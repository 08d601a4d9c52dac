//! Every operation leaves its input session, document and blocks untouched.

use richtext_core::blocks::{self, MediaPosition};
use richtext_core::entities::{self, LinkHref};
use richtext_core::{
    BlockKey, BlockType, DataMap, Document, EditingSession, Selection, SelectionPoint, style, text,
};
use std::sync::Arc;

fn fixture() -> EditingSession {
    let session = EditingSession::new(Document::from_text("first line\nsecond line\nthird line"));
    session.force_selection(Selection::new(
        SelectionPoint::new(BlockKey::new("b0"), 2),
        SelectionPoint::new(BlockKey::new("b1"), 4),
    ))
}

type Operation = fn(&EditingSession) -> EditingSession;

fn op(name: &'static str, operation: Operation) -> (&'static str, Operation) {
    (name, operation)
}

fn operations() -> Vec<(&'static str, Operation)> {
    vec![
        op("toggle_color", |s| style::toggle_color(s, "#123456")),
        op("toggle_bold", |s| style::toggle_inline_style(s, "BOLD")),
        op("font_size", |s| style::toggle_font_size(s, 30)),
        op("alignment", |s| blocks::toggle_alignment(s, "right")),
        op("indent", |s| blocks::toggle_indent(s, 3, 6)),
        op("block_type", |s| blocks::toggle_block_type(s, &BlockType::new("code-block"))),
        op("remove_block", |s| blocks::remove_block(s, &BlockKey::new("b2"), None)),
        op("clear", blocks::clear),
        op("media_position", |s| {
            let position = MediaPosition {
                float: Some("left".into()),
                alignment: None,
            };
            blocks::set_media_position(s, &BlockKey::new("b0"), &position)
        }),
        op("link", |s| entities::toggle_selection_link(s, LinkHref::Url("u".into()), None)),
        op("hr", |s| entities::insert_horizontal_line(&s.force_selection(Selection::caret("b2", 3)))),
        op("insert_text", |s| text::insert_text(s, "new", true)),
        op("split", text::split_block),
        op("remove_selection", text::remove_selection),
        op("set_data", |s| {
            blocks::set_block_data(s, &DataMap::from([("k".into(), serde_json::json!(1))]), true)
        }),
    ]
}

#[test]
fn test_operations_do_not_mutate_input() {
    let input = fixture();
    let before_doc = input.document().clone();
    let before_blocks: Vec<_> = input.document().blocks().to_vec();

    for (name, operation) in operations() {
        let output = operation(&input);
        assert_ne!(output.document(), input.document(), "{name} should edit");
        assert_eq!(input.document(), &before_doc, "{name} changed its input");
        for (held, current) in before_blocks.iter().zip(input.document().blocks()) {
            assert!(Arc::ptr_eq(held, current), "{name} replaced an input block");
        }
        assert_eq!(input.undo_depth(), 0, "{name} touched input history");
    }
}

#[test]
fn test_untouched_blocks_are_shared() {
    let input = fixture();
    let output = style::toggle_inline_style(&input, "BOLD");
    let third_in = &input.document().blocks()[2];
    let third_out = &output.document().blocks()[2];
    assert!(Arc::ptr_eq(third_in, third_out));
    assert!(!Arc::ptr_eq(&input.document().blocks()[0], &output.document().blocks()[0]));
}

#[test]
fn test_undo_restores_the_same_document_value() {
    let input = fixture();
    let edited = text::insert_text(&input, "x", true);
    assert!(Arc::ptr_eq(edited.undo().document_arc(), input.document_arc()));
}
