//! Entity application, links, atomic blocks and media.
//!
//! Entities are created on demand and referenced from character metadata. Applying one replaces
//! whatever entity the characters in range referenced before; clearing sets the reference to
//! `None` and leaves the entity record in the table.
//!
//! Atomic blocks (media, horizontal rules) always land on a caret outside strict content: a caret
//! inside a strict block first moves to the start of the next block.

use crate::blocks;
use crate::error::EditError;
use crate::model::{BlockKey, CharMetadata, DataMap, Document, Entity, EntityKey, EntityType, Mutability};
use crate::modifier::{self, Transformed};
use crate::registry::is_strict_block_type;
use crate::selection::{ResolvedSelection, Selection};
use crate::session::{ChangeType, EditingSession};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Placeholder character held by an atomic block.
pub const ATOMIC_CHARACTER: char = ' ';

/// Type, mutability and data of an entity to create.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntityDescriptor {
    /// Entity type.
    #[serde(rename = "type")]
    pub entity_type: EntityType,
    /// Mutability.
    pub mutability: Mutability,
    /// Entity data.
    #[serde(default)]
    pub data: DataMap,
}

impl EntityDescriptor {
    /// Create a descriptor.
    pub fn new(entity_type: EntityType, mutability: Mutability, data: DataMap) -> Self {
        Self {
            entity_type,
            mutability,
            data,
        }
    }

    pub(crate) fn into_entity(self) -> Entity {
        Entity::new(self.entity_type, self.mutability, self.data)
    }
}

/// Link target for [`toggle_selection_link`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case", tag = "kind", content = "url")]
pub enum LinkHref {
    /// Remove any link from the range.
    Remove,
    /// Create a link without an `href` (filled in later by the host).
    Placeholder,
    /// Link to a URL.
    Url(String),
}

/// `href`/`target` of a link entity.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LinkData {
    /// Link URL, absent for placeholder links.
    pub href: Option<String>,
    /// Link target (`_blank`, ...).
    pub target: Option<String>,
}

/// One media item for [`insert_medias`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Media {
    /// Source URL.
    pub url: String,
    /// Link target around the media, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub link: Option<String>,
    /// Display name.
    #[serde(default)]
    pub name: String,
    /// Media type, used as the entity type (`IMAGE`, `VIDEO`, ...).
    #[serde(rename = "type")]
    pub media_type: EntityType,
    /// Display width.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub width: Option<u32>,
    /// Display height.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub height: Option<u32>,
    /// Free-form metadata.
    #[serde(default)]
    pub meta: DataMap,
}

impl Media {
    fn entity_data(&self) -> DataMap {
        let mut data = DataMap::from([
            ("url".to_string(), Value::String(self.url.clone())),
            ("name".to_string(), Value::String(self.name.clone())),
            (
                "type".to_string(),
                Value::String(self.media_type.as_str().to_string()),
            ),
            (
                "meta".to_string(),
                Value::Object(self.meta.clone().into_iter().collect()),
            ),
        ]);
        if let Some(link) = &self.link {
            data.insert("link".to_string(), Value::String(link.clone()));
        }
        if let Some(width) = self.width {
            data.insert("width".to_string(), Value::from(width));
        }
        if let Some(height) = self.height {
            data.insert("height".to_string(), Value::from(height));
        }
        data
    }
}

/// The entity shared by every character in range.
///
/// For a caret this looks at the character before it (or the first character at offset 0).
pub fn selection_entity(session: &EditingSession) -> Option<EntityKey> {
    let resolved = session.resolved()?;
    let document = session.document();

    if resolved.is_collapsed() {
        let block = &document.blocks()[resolved.start_index];
        let offset = resolved.start.offset;
        let index = if offset == 0 { 0 } else { offset - 1 };
        return block.entity_at(index);
    }

    let mut shared: Option<Option<EntityKey>> = None;
    for range in resolved.block_ranges(document) {
        for meta in &range.block.chars()[range.range] {
            match shared {
                None => shared = Some(meta.entity),
                Some(entity) if entity != meta.entity => return None,
                Some(_) => {}
            }
        }
    }
    shared.flatten()
}

/// Data of the selection's entity when it has type `entity_type`; empty otherwise.
pub fn selection_entity_data(session: &EditingSession, entity_type: &EntityType) -> DataMap {
    selection_entity(session)
        .and_then(|key| session.document().entity(key))
        .filter(|entity| &entity.entity_type == entity_type)
        .map(|entity| entity.data.clone())
        .unwrap_or_default()
}

/// `href`/`target` of the link at the selection.
pub fn selection_link(session: &EditingSession) -> Option<LinkData> {
    let key = selection_entity(session)?;
    let entity = session.document().entity(key)?;
    if entity.entity_type != EntityType::LINK {
        return None;
    }
    Some(LinkData {
        href: entity.data_str("href").map(str::to_string),
        target: entity.data_str("target").map(str::to_string),
    })
}

/// Apply a new entity to the selected range, or clear entity references from it.
///
/// References are cleared when `descriptor` is `None` or names the type already active at the
/// selection. Collapsed selections and ranges touching a strict block are left alone.
pub fn toggle_selection_entity(
    session: &EditingSession,
    descriptor: Option<EntityDescriptor>,
) -> EditingSession {
    session.recover(
        "toggle_selection_entity",
        try_toggle_selection_entity(session, descriptor),
    )
}

/// Fallible form of [`toggle_selection_entity`].
pub fn try_toggle_selection_entity(
    session: &EditingSession,
    descriptor: Option<EntityDescriptor>,
) -> Result<EditingSession, EditError> {
    const OPERATION: &str = "toggle_selection_entity";
    let resolved = match entity_range(session) {
        Ok(resolved) => resolved,
        Err(reason) => return Ok(session.rejected(OPERATION, reason)),
    };

    let active_type = selection_entity(session)
        .and_then(|key| session.document().entity(key))
        .map(|entity| entity.entity_type.clone());

    let descriptor = match descriptor {
        Some(d) if Some(&d.entity_type) != active_type.as_ref() => d,
        _ => return Ok(clear_entities(session, &resolved, OPERATION)),
    };

    let (document, key) = modifier::create_entity(session.document(), descriptor.into_entity())?;
    let Some(next) = apply_entity(&document, &resolved, Some(key)) else {
        return Ok(session.rejected(OPERATION, "empty range"));
    };
    Ok(session.push(next, session.selection().clone(), ChangeType::ApplyEntity))
}

/// Link, unlink or placeholder-link the selected range.
///
/// A new link is followed by [`EditorConfig::link_guard`](crate::EditorConfig) inserted right
/// after the range, and the caret lands after it. Link and guard form one undo step.
pub fn toggle_selection_link(
    session: &EditingSession,
    href: LinkHref,
    target: Option<&str>,
) -> EditingSession {
    session.recover(
        "toggle_selection_link",
        try_toggle_selection_link(session, href, target),
    )
}

/// Fallible form of [`toggle_selection_link`].
pub fn try_toggle_selection_link(
    session: &EditingSession,
    href: LinkHref,
    target: Option<&str>,
) -> Result<EditingSession, EditError> {
    const OPERATION: &str = "toggle_selection_link";
    let resolved = match entity_range(session) {
        Ok(resolved) => resolved,
        Err(reason) => return Ok(session.rejected(OPERATION, reason)),
    };

    let mut data = DataMap::new();
    match href {
        LinkHref::Remove => return Ok(clear_entities(session, &resolved, OPERATION)),
        LinkHref::Placeholder => {}
        LinkHref::Url(url) => {
            data.insert("href".to_string(), Value::String(url));
        }
    }
    if let Some(target) = target {
        data.insert("target".to_string(), Value::String(target.to_string()));
    }

    let link = Entity::new(EntityType::LINK, Mutability::Mutable, data);
    let (document, key) = modifier::create_entity(session.document(), link)?;
    let Some(linked) = apply_entity(&document, &resolved, Some(key)) else {
        return Ok(session.rejected(OPERATION, "empty range"));
    };

    let guard = session.config().link_guard.as_str();
    let after = resolved.collapse_to_end();
    let (next, selection) = if guard.is_empty() {
        (linked, after)
    } else {
        let end = after.resolve(&linked).ok_or(EditError::InvalidSelection)?;
        let guarded = modifier::replace_range(&linked, &end, guard, &CharMetadata::default());
        (guarded.document, guarded.selection)
    };

    tracing::debug!(target: "richtext.edit", entity = %key, "link_applied");
    Ok(session.push(next, selection, ChangeType::ApplyEntity))
}

/// Insert an atomic block referencing a new entity at the caret.
///
/// Only valid at a caret; a caret inside a strict block first moves to the start of the next
/// non-strict block. The caret ends at the start of the block after the inserted one.
pub fn insert_atomic_block(
    session: &EditingSession,
    entity_type: EntityType,
    immutable: bool,
    data: DataMap,
) -> EditingSession {
    session.recover(
        "insert_atomic_block",
        try_insert_atomic_block(session, entity_type, immutable, data),
    )
}

/// Fallible form of [`insert_atomic_block`].
pub fn try_insert_atomic_block(
    session: &EditingSession,
    entity_type: EntityType,
    immutable: bool,
    data: DataMap,
) -> Result<EditingSession, EditError> {
    let mutability = if immutable {
        Mutability::Immutable
    } else {
        Mutability::Mutable
    };
    let descriptor = EntityDescriptor::new(entity_type, mutability, data);
    match atomic_insertion(session.document(), session.selection(), descriptor)? {
        Some(Transformed {
            document,
            selection,
        }) => Ok(session.push(document, selection, ChangeType::InsertFragment)),
        None => Ok(session.rejected("insert_atomic_block", "no caret outside strict blocks")),
    }
}

/// Insert a horizontal rule at the caret.
pub fn insert_horizontal_line(session: &EditingSession) -> EditingSession {
    insert_atomic_block(session, EntityType::HORIZONTAL_RULE, true, DataMap::new())
}

/// Insert one atomic block per media item, each at the caret the previous one left.
///
/// The whole list is a single undo step. Nothing is inserted if any insertion is rejected.
pub fn insert_medias(session: &EditingSession, medias: &[Media]) -> EditingSession {
    session.recover("insert_medias", try_insert_medias(session, medias))
}

/// Fallible form of [`insert_medias`].
pub fn try_insert_medias(
    session: &EditingSession,
    medias: &[Media],
) -> Result<EditingSession, EditError> {
    const OPERATION: &str = "insert_medias";
    if medias.is_empty() {
        return Ok(session.rejected(OPERATION, "no media"));
    }

    let mut document = session.document().clone();
    let mut selection = session.selection().clone();
    for media in medias {
        let descriptor = EntityDescriptor::new(
            media.media_type.clone(),
            Mutability::Immutable,
            media.entity_data(),
        );
        match atomic_insertion(&document, &selection, descriptor)? {
            Some(step) => {
                document = step.document;
                selection = step.selection;
            }
            None => return Ok(session.rejected(OPERATION, "no caret outside strict blocks")),
        }
    }

    tracing::debug!(target: "richtext.edit", count = medias.len(), "medias_inserted");
    Ok(session.push(document, selection, ChangeType::InsertFragment))
}

/// Shallow-merge `data` onto the entity `key`. Text and blocks are untouched.
pub fn set_media_data(session: &EditingSession, key: EntityKey, data: &DataMap) -> EditingSession {
    session.recover("set_media_data", try_set_media_data(session, key, data))
}

/// Fallible form of [`set_media_data`].
pub fn try_set_media_data(
    session: &EditingSession,
    key: EntityKey,
    data: &DataMap,
) -> Result<EditingSession, EditError> {
    let next = modifier::merge_entity_data(session.document(), key, data)?;
    Ok(session.push(next, session.selection().clone(), ChangeType::ChangeBlockData))
}

/// Remove a media block. See [`blocks::remove_block`].
pub fn remove_media(session: &EditingSession, key: &BlockKey) -> EditingSession {
    blocks::remove_block(session, key, None)
}

fn entity_range(session: &EditingSession) -> Result<ResolvedSelection, &'static str> {
    let resolved = session.resolved().ok_or("unresolved selection")?;
    if resolved.is_collapsed() {
        return Err("collapsed selection");
    }
    if resolved.touches_strict_block(session.document()) {
        return Err("strict block in range");
    }
    Ok(resolved)
}

fn apply_entity(
    document: &Document,
    resolved: &ResolvedSelection,
    entity: Option<EntityKey>,
) -> Option<Document> {
    let ranges = resolved.block_ranges(document);
    modifier::map_chars(document, &ranges, |meta| CharMetadata::new(meta.style.clone(), entity))
}

fn clear_entities(
    session: &EditingSession,
    resolved: &ResolvedSelection,
    operation: &'static str,
) -> EditingSession {
    match apply_entity(session.document(), resolved, None) {
        Some(next) => session.push(next, session.selection().clone(), ChangeType::ApplyEntity),
        None => session.rejected(operation, "no entity in range"),
    }
}

/// Move a caret out of strict blocks, then split and insert. `None` when no valid caret exists.
fn atomic_insertion(
    document: &Document,
    selection: &Selection,
    descriptor: EntityDescriptor,
) -> Result<Option<Transformed>, EditError> {
    let Some(mut resolved) = selection.resolve(document) else {
        return Err(EditError::InvalidSelection);
    };
    if !resolved.is_collapsed() {
        return Ok(None);
    }

    while is_strict_block_type(document.blocks()[resolved.start_index].block_type()) {
        let Some(next) = document.blocks().get(resolved.start_index + 1) else {
            return Ok(None);
        };
        let caret = Selection::caret(next.key().clone(), 0);
        resolved = caret.resolve(document).ok_or(EditError::InvalidSelection)?;
    }

    let (next, key) = modifier::create_entity(document, descriptor.into_entity())?;
    Ok(Some(modifier::insert_atomic_block(
        &next,
        &resolved,
        key,
        ATOMIC_CHARACTER,
    )))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::BlockType;

    fn session(text: &str, selection: Selection) -> EditingSession {
        EditingSession::new(Document::from_text(text)).force_selection(selection)
    }

    #[test]
    fn test_link_adds_guard_and_single_undo_step() {
        let s = session("click here", Selection::within("b0", 0, 5));
        let s = toggle_selection_link(&s, LinkHref::Url("https://a.b".into()), Some("_blank"));
        let block = s.document().first_block().clone();
        assert_eq!(block.text(), "click  here");
        assert!((0..5).all(|i| block.entity_at(i).is_some()));
        assert_eq!(block.entity_at(5), None);
        assert_eq!(s.selection(), &Selection::caret("b0", 6));
        assert_eq!(s.undo_depth(), 1);

        let linked = s.force_selection(Selection::within("b0", 0, 5));
        let link = selection_link(&linked).unwrap();
        assert_eq!(link.href.as_deref(), Some("https://a.b"));
        assert_eq!(link.target.as_deref(), Some("_blank"));
    }

    #[test]
    fn test_remove_link_clears_every_character() {
        let s = session("click here", Selection::within("b0", 0, 5));
        let s = toggle_selection_link(&s, LinkHref::Url("u".into()), None);
        let s = s.force_selection(Selection::within("b0", 0, 5));
        let s = toggle_selection_link(&s, LinkHref::Remove, None);
        assert!(s.document().first_block().chars().iter().all(|c| c.entity.is_none()));
    }

    #[test]
    fn test_placeholder_link_has_no_href() {
        let s = session("abc", Selection::within("b0", 0, 3));
        let s = toggle_selection_link(&s, LinkHref::Placeholder, Some("_self"));
        let key = s.document().first_block().entity_at(0).unwrap();
        let entity = s.document().entity(key).unwrap();
        assert_eq!(entity.mutability, Mutability::Mutable);
        assert!(!entity.data.contains_key("href"));
        assert_eq!(entity.data_str("target"), Some("_self"));
    }

    #[test]
    fn test_toggle_entity_same_type_clears() {
        let s = session("abc", Selection::within("b0", 0, 3));
        let mention = EntityDescriptor::new(
            EntityType::new("MENTION"),
            Mutability::Immutable,
            DataMap::new(),
        );
        let s = toggle_selection_entity(&s, Some(mention.clone()));
        assert!(selection_entity(&s).is_some());
        let s = toggle_selection_entity(&s, Some(mention));
        assert_eq!(selection_entity(&s), None);
        assert_eq!(s.document().entity_count(), 1);
    }

    #[test]
    fn test_empty_entity_type_is_reported_not_applied() {
        let s = session("abc", Selection::within("b0", 0, 3));
        let bad = EntityDescriptor::new(EntityType::new(""), Mutability::Mutable, DataMap::new());
        assert!(matches!(
            try_toggle_selection_entity(&s, Some(bad.clone())),
            Err(EditError::InvalidEntityType)
        ));
        assert!(toggle_selection_entity(&s, Some(bad)).is_same_state(&s));
    }

    #[test]
    fn test_atomic_insertion_splits_and_advances() {
        let s = session("abcd", Selection::caret("b0", 2));
        let s = insert_horizontal_line(&s);
        let blocks = s.document().blocks();
        let texts: Vec<_> = blocks.iter().map(|b| b.text()).collect();
        assert_eq!(texts, vec!["ab", " ", "cd"]);
        assert_eq!(blocks[1].block_type(), &BlockType::ATOMIC);
        assert_eq!(blocks[2].block_type(), &BlockType::UNSTYLED);
        assert_eq!(s.selection(), &Selection::caret(blocks[2].key().clone(), 0));

        let on_atomic = s.force_selection(Selection::caret(blocks[1].key().clone(), 0));
        let s2 = insert_horizontal_line(&on_atomic);
        let texts: Vec<_> = s2.document().blocks().iter().map(|b| b.text()).collect();
        assert_eq!(texts, vec!["ab", " ", "", " ", "cd"]);
        assert_eq!(s2.document().blocks()[3].block_type(), &BlockType::ATOMIC);
    }

    #[test]
    fn test_atomic_insertion_rejects_range() {
        let s = session("abcd", Selection::within("b0", 0, 2));
        assert!(insert_horizontal_line(&s).is_same_state(&s));
    }

    #[test]
    fn test_insert_medias_is_one_undo_step() {
        let s = session("", Selection::caret("b0", 0));
        let image = |url: &str| Media {
            url: url.into(),
            link: None,
            name: "pic".into(),
            media_type: EntityType::new("IMAGE"),
            width: Some(10),
            height: None,
            meta: DataMap::new(),
        };
        let s = insert_medias(&s, &[image("a.png"), image("b.png")]);
        let atomics: Vec<_> = s
            .document()
            .blocks()
            .iter()
            .filter(|b| b.block_type() == &BlockType::ATOMIC)
            .collect();
        assert_eq!(atomics.len(), 2);
        assert_eq!(s.undo_depth(), 1);
        let first = s.document().entity(atomics[0].entity_at(0).unwrap()).unwrap();
        assert_eq!(first.data_str("url"), Some("a.png"));
        assert_eq!(first.data.get("width"), Some(&Value::from(10)));
    }

    #[test]
    fn test_set_media_data_merges() {
        let s = session("", Selection::caret("b0", 0));
        let s = insert_atomic_block(
            &s,
            EntityType::new("IMAGE"),
            true,
            DataMap::from([("url".into(), Value::from("x"))]),
        );
        let key = s.document().blocks()[1].entity_at(0).unwrap();
        let s = set_media_data(&s, key, &DataMap::from([("width".into(), Value::from(5))]));
        let entity = s.document().entity(key).unwrap();
        assert_eq!(entity.data_str("url"), Some("x"));
        assert_eq!(entity.data.get("width"), Some(&Value::from(5)));
        assert_eq!(s.last_change_type(), Some(ChangeType::ChangeBlockData));

        assert!(matches!(
            try_set_media_data(&s, EntityKey(99), &DataMap::new()),
            Err(EditError::UnknownEntity(EntityKey(99)))
        ));
    }
}
