use pretty_assertions::assert_eq;
use richtext_core::entities::{self, LinkData, LinkHref};
use richtext_core::{
    ChangeType, DataMap, Document, EditingSession, EditorConfig, EntityDescriptor, EntityType,
    Media, Mutability, Selection, style,
};
use serde_json::json;

fn session(text: &str, selection: Selection) -> EditingSession {
    EditingSession::new(Document::from_text(text)).force_selection(selection)
}

#[test]
fn test_unlink_removes_entity_from_every_character() {
    let s = session("see docs here", Selection::within("b0", 4, 8));
    let linked = entities::toggle_selection_link(&s, LinkHref::Url("https://docs".into()), None);
    let s = linked.force_selection(Selection::within("b0", 4, 8));
    assert_eq!(
        entities::selection_link(&s),
        Some(LinkData {
            href: Some("https://docs".into()),
            target: None,
        })
    );

    let unlinked = entities::toggle_selection_link(&s, LinkHref::Remove, None);
    assert!(unlinked.document().first_block().chars()[4..8].iter().all(|c| c.entity.is_none()));
    assert_eq!(unlinked.last_change_type(), Some(ChangeType::ApplyEntity));
}

#[test]
fn test_placeholder_link_is_mutable_without_href() {
    let s = session("abc", Selection::within("b0", 0, 3));
    let s = entities::toggle_selection_link(&s, LinkHref::Placeholder, Some("_blank"));
    let key = s.document().first_block().entity_at(1).unwrap();
    let entity = s.document().entity(key).unwrap();
    assert_eq!(entity.entity_type, EntityType::LINK);
    assert_eq!(entity.mutability, Mutability::Mutable);
    assert!(!entity.data.contains_key("href"));
}

#[test]
fn test_link_guard_follows_config() {
    let config = EditorConfig {
        link_guard: String::new(),
        ..EditorConfig::default()
    };
    let s = EditingSession::new(Document::from_text("abc"))
        .with_config(config)
        .force_selection(Selection::within("b0", 0, 3));
    let s = entities::toggle_selection_link(&s, LinkHref::Url("u".into()), None);
    assert_eq!(s.document().plain_text(), "abc");
    assert_eq!(s.selection(), &Selection::caret("b0", 3));
}

#[test]
fn test_link_rejected_on_collapsed_selection() {
    let s = session("abc", Selection::caret("b0", 2));
    let out = entities::toggle_selection_link(&s, LinkHref::Url("u".into()), None);
    assert!(out.is_same_state(&s));
}

#[test]
fn test_new_entity_replaces_previous_reference() {
    let s = session("abcdef", Selection::within("b0", 0, 6));
    let s = entities::toggle_selection_link(&s, LinkHref::Url("u".into()), None);
    let s = s.force_selection(Selection::within("b0", 0, 3));
    let tag = EntityDescriptor::new(EntityType::new("TAG"), Mutability::Immutable, DataMap::new());
    let s = entities::toggle_selection_entity(&s, Some(tag));

    let block = s.document().first_block();
    let tag_key = block.entity_at(0).unwrap();
    assert_eq!(s.document().entity(tag_key).unwrap().entity_type.as_str(), "TAG");
    assert_ne!(block.entity_at(4), Some(tag_key));
    assert_eq!(
        entities::selection_entity_data(&s, &EntityType::new("TAG")),
        DataMap::new()
    );
    assert!(entities::selection_entity_data(&s, &EntityType::LINK).is_empty());
}

#[test]
fn test_medias_land_in_order_and_keep_styles_untouched() {
    let s = session("intro", Selection::within("b0", 0, 5));
    let s = style::toggle_inline_style(&s, "BOLD");
    let s = s.force_selection(Selection::caret("b0", 5));
    let medias = vec![
        Media {
            url: "one.mp4".into(),
            link: Some("https://one".into()),
            name: "one".into(),
            media_type: EntityType::new("VIDEO"),
            width: Some(640),
            height: Some(360),
            meta: DataMap::from([("poster".to_string(), json!("one.jpg"))]),
        },
        Media {
            url: "two.png".into(),
            link: None,
            name: "two".into(),
            media_type: EntityType::new("IMAGE"),
            width: None,
            height: None,
            meta: DataMap::new(),
        },
    ];
    let s = entities::insert_medias(&s, &medias);
    let urls: Vec<_> = s
        .document()
        .blocks()
        .iter()
        .filter_map(|b| b.entity_at(0))
        .filter_map(|k| s.document().entity(k))
        .filter_map(|e| e.data_str("url").map(str::to_string))
        .collect();
    assert_eq!(urls, vec!["one.mp4", "two.png"]);
    let first = s.document().entity(s.document().blocks()[1].entity_at(0).unwrap()).unwrap();
    assert_eq!(first.data.get("meta"), Some(&json!({ "poster": "one.jpg" })));
    assert_eq!(first.mutability, Mutability::Immutable);
    assert_eq!(s.undo().document().blocks().len(), 1);
    assert!(entities::insert_medias(&s, &[]).is_same_state(&s));
}
