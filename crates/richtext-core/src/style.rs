//! Style Engine
//!
//! Per-character inline style tags with mutually exclusive style groups.
//!
//! A style group is a tag prefix (`COLOR`, `FONTSIZE`, ...). At most one tag of a group may sit on
//! a character: applying `FONTSIZE-24` strips `FONTSIZE-18` from every character in range. The
//! toggle itself follows the usual rule: if *every* character in range already carries the tag it
//! is removed everywhere, otherwise it is added everywhere.
//!
//! All toggles require a non-empty range that touches no strict block; anything else returns the
//! input session unchanged.

use crate::model::{InlineStyle, StyleSet};
use crate::modifier;
use crate::registry::style_group_of;
use crate::selection::ResolvedSelection;
use crate::session::{ChangeType, EditingSession};
use std::fmt;

/// The inline style at the current selection.
///
/// - caret: the carried-over style if one is set, otherwise the style of the character before the
///   caret (at offset 0: the first character of the block; in an empty block: the last character
///   of the nearest preceding non-empty block)
/// - range: the tags shared by every character in range
pub fn current_inline_style(session: &EditingSession) -> StyleSet {
    let Some(resolved) = session.resolved() else {
        return StyleSet::new();
    };

    if resolved.is_collapsed() {
        if let Some(style) = session.inline_style_override() {
            return style.clone();
        }
        return style_at_caret(session, &resolved);
    }

    let document = session.document();
    let mut shared: Option<StyleSet> = None;
    for block_range in resolved.block_ranges(document) {
        for meta in &block_range.block.chars()[block_range.range] {
            shared = Some(match shared {
                None => meta.style.clone(),
                Some(acc) => acc.intersection(&meta.style).cloned().collect(),
            });
            if shared.as_ref().is_some_and(|s| s.is_empty()) {
                return StyleSet::new();
            }
        }
    }
    shared.unwrap_or_default()
}

fn style_at_caret(session: &EditingSession, resolved: &ResolvedSelection) -> StyleSet {
    let blocks = session.document().blocks();
    let block = &blocks[resolved.start_index];
    let offset = resolved.start.offset;

    if offset > 0 {
        return block.chars()[offset - 1].style.clone();
    }
    if let Some(first) = block.char_at(0) {
        return first.style.clone();
    }
    blocks[..resolved.start_index]
        .iter()
        .rev()
        .find_map(|b| b.chars().last())
        .map(|meta| meta.style.clone())
        .unwrap_or_default()
}

/// Returns `true` if `style` is part of [`current_inline_style`].
pub fn selection_has_style(session: &EditingSession, style: &str) -> bool {
    current_inline_style(session).contains(&InlineStyle::new(style))
}

/// Toggle `PREFIX-VALUE` on the selection, removing every other tag of the `PREFIX` group.
pub fn apply_grouped_style(
    session: &EditingSession,
    group_prefix: &str,
    value: impl fmt::Display,
) -> EditingSession {
    let group = group_prefix.to_uppercase();
    let target = InlineStyle::grouped(&group, value);
    toggle_style(session, target, Some(&group), "apply_grouped_style")
}

/// Toggle a single tag. Tags of a registered style group stay exclusive within that group.
pub fn toggle_inline_style(session: &EditingSession, style: &str) -> EditingSession {
    let target = InlineStyle::new(style);
    let group = style_group_of(&target);
    toggle_style(session, target, group.as_deref(), "toggle_inline_style")
}

/// Remove every style tag from every character in range.
pub fn remove_all_inline_styles(session: &EditingSession) -> EditingSession {
    const OPERATION: &str = "remove_all_inline_styles";
    let resolved = match styleable_range(session) {
        Ok(resolved) => resolved,
        Err(reason) => return session.rejected(OPERATION, reason),
    };

    let document = session.document();
    let ranges = resolved.block_ranges(document);
    let cleared = modifier::map_chars(document, &ranges, |meta| {
        let mut meta = meta.clone();
        meta.style.clear();
        meta
    });
    match cleared {
        Some(next) => session.push(next, session.selection().clone(), ChangeType::ChangeInlineStyle),
        None => session.rejected(OPERATION, "no styles in range"),
    }
}

/// Strip a leading `#` from a hex color.
pub fn normalize_color(color: &str) -> &str {
    color.strip_prefix('#').unwrap_or(color)
}

/// Toggle a `COLOR-` tag. Accepts `#RRGGBB` or `RRGGBB`.
pub fn toggle_color(session: &EditingSession, color: &str) -> EditingSession {
    apply_grouped_style(session, "COLOR", normalize_color(color))
}

/// Toggle a `BGCOLOR-` tag. Accepts `#RRGGBB` or `RRGGBB`.
pub fn toggle_background_color(session: &EditingSession, color: &str) -> EditingSession {
    apply_grouped_style(session, "BGCOLOR", normalize_color(color))
}

/// Toggle a `FONTSIZE-` tag.
pub fn toggle_font_size(session: &EditingSession, size: impl fmt::Display) -> EditingSession {
    apply_grouped_style(session, "FONTSIZE", size)
}

/// Toggle a `LINEHEIGHT-` tag.
pub fn toggle_line_height(session: &EditingSession, height: impl fmt::Display) -> EditingSession {
    apply_grouped_style(session, "LINEHEIGHT", height)
}

/// Toggle a `FONTFAMILY-` tag.
pub fn toggle_font_family(session: &EditingSession, family: &str) -> EditingSession {
    apply_grouped_style(session, "FONTFAMILY", family)
}

/// Toggle a `LETTERSPACING-` tag.
pub fn toggle_letter_spacing(
    session: &EditingSession,
    spacing: impl fmt::Display,
) -> EditingSession {
    apply_grouped_style(session, "LETTERSPACING", spacing)
}

/// Toggle a character-level `INDENT-` tag.
pub fn toggle_text_indent(session: &EditingSession, indent: impl fmt::Display) -> EditingSession {
    apply_grouped_style(session, "INDENT", indent)
}

fn styleable_range(session: &EditingSession) -> Result<ResolvedSelection, &'static str> {
    let resolved = session.resolved().ok_or("unresolved selection")?;
    if resolved.is_collapsed() {
        return Err("collapsed selection");
    }
    if resolved.touches_strict_block(session.document()) {
        return Err("strict block in range");
    }
    Ok(resolved)
}

fn toggle_style(
    session: &EditingSession,
    target: InlineStyle,
    group: Option<&str>,
    operation: &'static str,
) -> EditingSession {
    let resolved = match styleable_range(session) {
        Ok(resolved) => resolved,
        Err(reason) => return session.rejected(operation, reason),
    };

    let document = session.document();
    let ranges = resolved.block_ranges(document);
    let mut selected = ranges
        .iter()
        .flat_map(|r| r.block.chars()[r.range.clone()].iter())
        .peekable();
    if selected.peek().is_none() {
        return session.rejected(operation, "empty range");
    }
    let active = selected.all(|meta| meta.has_style(&target));

    let next = modifier::map_chars(document, &ranges, |meta| {
        let mut meta = meta.clone();
        if let Some(prefix) = group {
            meta.style.retain(|s| s == &target || !s.in_group(prefix));
        }
        if active {
            meta.style.remove(&target);
        } else {
            meta.style.insert(target.clone());
        }
        meta
    });

    match next {
        Some(next) => session.push(next, session.selection().clone(), ChangeType::ChangeInlineStyle),
        None => session.rejected(operation, "style already in place"),
    }
}
