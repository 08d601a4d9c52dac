//! Key Commands
//!
//! Editing behavior bound to keys: deletion at a caret, the inline style shortcuts and line
//! breaks. Hosts map their key bindings to a [`KeyCommand`] (or parse one from its kebab-case
//! name) and call [`handle_key_command`]; Enter goes through [`handle_new_line`].
//!
//! # Deletion at a caret
//!
//! | position                 | backward (`backspace*`)              | forward (`delete*`)              |
//! |--------------------------|--------------------------------------|----------------------------------|
//! | inside a block           | previous grapheme / word / line head | next grapheme / word / block end |
//! | block boundary           | join with the previous block         | join with the next block         |
//! | next to a strict block   | remove the strict block              | remove the strict block          |
//! | inside a strict block    | remove the block                     | remove the block                 |
//! | start of the first block | reset a styled block to `unstyled`   |                                  |
//!
//! A selected range is deleted as a whole regardless of the command's direction.
//!
//! # Example
//!
//! ```rust
//! use richtext_core::keys::{handle_key_command, KeyCommand};
//! use richtext_core::{Document, EditingSession, Selection};
//!
//! let session = EditingSession::new(Document::from_text("one\ntwo"))
//!     .force_selection(Selection::caret("b1", 0));
//! let joined = handle_key_command(&session, KeyCommand::Backspace);
//! assert_eq!(joined.document().plain_text(), "onetwo");
//! assert_eq!(joined.selection(), &Selection::caret("b0", 3));
//! ```

use crate::error::EditError;
use crate::model::{BlockType, InlineStyle, byte_offset};
use crate::modifier;
use crate::registry::is_strict_block_type;
use crate::selection::{ResolvedSelection, Selection, SelectionPoint};
use crate::session::{ChangeType, EditingSession};
use crate::style;
use crate::text;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use unicode_segmentation::UnicodeSegmentation;

/// Block types whose empty blocks are turned back into paragraphs by a hard line break.
pub const LIST_BLOCK_TYPES: [&str; 2] = ["unordered-list-item", "ordered-list-item"];

/// Named editing commands
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum KeyCommand {
    /// Delete the grapheme before the caret
    Backspace,
    /// Delete the word before the caret
    BackspaceWord,
    /// Delete from the start of the block to the caret
    BackspaceToStartOfLine,
    /// Delete the grapheme after the caret
    Delete,
    /// Delete the word after the caret
    DeleteWord,
    /// Delete from the caret to the end of the block
    DeleteToEndOfBlock,
    /// Toggle `BOLD`
    Bold,
    /// Toggle `ITALIC`
    Italic,
    /// Toggle `UNDERLINE`
    Underline,
    /// Toggle `CODE`
    Code,
    /// Toggle `STRIKETHROUGH`
    Strikethrough,
    /// Split the block at the caret
    SplitBlock,
}

impl KeyCommand {
    /// Every command, in declaration order.
    pub const ALL: [KeyCommand; 12] = [
        KeyCommand::Backspace,
        KeyCommand::BackspaceWord,
        KeyCommand::BackspaceToStartOfLine,
        KeyCommand::Delete,
        KeyCommand::DeleteWord,
        KeyCommand::DeleteToEndOfBlock,
        KeyCommand::Bold,
        KeyCommand::Italic,
        KeyCommand::Underline,
        KeyCommand::Code,
        KeyCommand::Strikethrough,
        KeyCommand::SplitBlock,
    ];

    /// Kebab-case name, e.g. `backspace-word`.
    pub fn as_str(&self) -> &'static str {
        match self {
            KeyCommand::Backspace => "backspace",
            KeyCommand::BackspaceWord => "backspace-word",
            KeyCommand::BackspaceToStartOfLine => "backspace-to-start-of-line",
            KeyCommand::Delete => "delete",
            KeyCommand::DeleteWord => "delete-word",
            KeyCommand::DeleteToEndOfBlock => "delete-to-end-of-block",
            KeyCommand::Bold => "bold",
            KeyCommand::Italic => "italic",
            KeyCommand::Underline => "underline",
            KeyCommand::Code => "code",
            KeyCommand::Strikethrough => "strikethrough",
            KeyCommand::SplitBlock => "split-block",
        }
    }

    /// Style tag toggled by the command, if it is a style shortcut.
    pub fn inline_style(&self) -> Option<&'static str> {
        match self {
            KeyCommand::Bold => Some("BOLD"),
            KeyCommand::Italic => Some("ITALIC"),
            KeyCommand::Underline => Some("UNDERLINE"),
            KeyCommand::Code => Some("CODE"),
            KeyCommand::Strikethrough => Some("STRIKETHROUGH"),
            _ => None,
        }
    }

    fn deletion(&self) -> Option<Deletion> {
        let (direction, unit) = match self {
            KeyCommand::Backspace => (Direction::Backward, Unit::Grapheme),
            KeyCommand::BackspaceWord => (Direction::Backward, Unit::Word),
            KeyCommand::BackspaceToStartOfLine => (Direction::Backward, Unit::Block),
            KeyCommand::Delete => (Direction::Forward, Unit::Grapheme),
            KeyCommand::DeleteWord => (Direction::Forward, Unit::Word),
            KeyCommand::DeleteToEndOfBlock => (Direction::Forward, Unit::Block),
            _ => return None,
        };
        Some(Deletion { direction, unit })
    }
}

impl fmt::Display for KeyCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for KeyCommand {
    type Err = EditError;

    fn from_str(name: &str) -> Result<Self, Self::Err> {
        KeyCommand::ALL
            .into_iter()
            .find(|command| command.as_str() == name)
            .ok_or_else(|| EditError::UnknownKeyCommand(name.to_string()))
    }
}

/// Kind of line break
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum LineBreak {
    /// Enter: split the block
    #[default]
    Hard,
    /// Shift+Enter: a `'\n'` inside the block
    Soft,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Direction {
    Backward,
    Forward,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Unit {
    Grapheme,
    Word,
    Block,
}

#[derive(Debug, Clone, Copy)]
struct Deletion {
    direction: Direction,
    unit: Unit,
}

/// Run a key command.
///
/// Style shortcuts toggle the tag over a range, or flip it in the carried-over style at a caret.
/// `split-block` is [`text::split_block`]. Deletions follow the table in the module docs.
pub fn handle_key_command(session: &EditingSession, command: KeyCommand) -> EditingSession {
    if let Some(tag) = command.inline_style() {
        return toggle_shortcut_style(session, command, tag);
    }
    match command.deletion() {
        Some(deletion) => delete(session, command.as_str(), deletion),
        None => text::split_block(session),
    }
}

/// Handle Enter.
///
/// A soft break inserts `'\n'` over the selection. A hard break at the end of a styled non-list
/// block opens an `unstyled` block, in an empty list item turns it into an `unstyled` block, and
/// otherwise splits the block.
pub fn handle_new_line(session: &EditingSession, line_break: LineBreak) -> EditingSession {
    const OPERATION: &str = "handle_new_line";
    if line_break == LineBreak::Soft {
        return text::insert_text(session, "\n", true);
    }

    let Some(resolved) = session.resolved() else {
        return session.rejected(OPERATION, "unresolved selection");
    };
    if !resolved.is_collapsed() {
        return text::split_block(session);
    }

    let document = session.document();
    let block = &document.blocks()[resolved.start_index];
    let block_type = block.block_type();
    if is_strict_block_type(block_type) {
        return session.rejected(OPERATION, "strict block in range");
    }

    let is_list = LIST_BLOCK_TYPES.contains(&block_type.as_str());
    if is_list && block.is_empty() {
        let next = modifier::set_block_type(document, &resolved, &BlockType::UNSTYLED);
        return session.push(next, session.selection().clone(), ChangeType::ChangeBlockType);
    }
    if !is_list && block_type != &BlockType::UNSTYLED && resolved.start.offset == block.len() {
        let split = modifier::split_block(document, &resolved);
        let Some(caret) = split.selection.resolve(&split.document) else {
            return session.rejected(OPERATION, "unresolved selection");
        };
        let next = modifier::set_block_type(&split.document, &caret, &BlockType::UNSTYLED);
        return session.push(next, split.selection, ChangeType::SplitBlock);
    }

    text::split_block(session)
}

fn toggle_shortcut_style(
    session: &EditingSession,
    command: KeyCommand,
    tag: &str,
) -> EditingSession {
    let Some(resolved) = session.resolved() else {
        return session.rejected(command.as_str(), "unresolved selection");
    };
    if !resolved.is_collapsed() {
        return style::toggle_inline_style(session, tag);
    }
    if resolved.touches_strict_block(session.document()) {
        return session.rejected(command.as_str(), "strict block in range");
    }

    let tag = InlineStyle::new(tag);
    let mut carried = style::current_inline_style(session);
    if !carried.remove(&tag) {
        carried.insert(tag);
    }
    session.set_inline_style_override(carried)
}

fn delete(session: &EditingSession, operation: &'static str, deletion: Deletion) -> EditingSession {
    let Some(resolved) = session.resolved() else {
        return session.rejected(operation, "unresolved selection");
    };
    if !resolved.is_collapsed() {
        return text::remove_selection(session);
    }

    let document = session.document();
    let index = resolved.start_index;
    let block = &document.blocks()[index];
    if is_strict_block_type(block.block_type()) {
        return remove_strict_block(session, index, deletion.direction);
    }

    let offset = resolved.start.offset;
    let key = block.key().clone();
    match deletion.direction {
        Direction::Backward if offset == 0 => backspace_at_block_start(session, &resolved),
        Direction::Forward if offset == block.len() => delete_at_block_end(session, &resolved),
        Direction::Backward => {
            let from = backward_extent(block.text(), offset, deletion.unit);
            let range = Selection::within(key, from, offset);
            remove(session, operation, &range, ChangeType::BackspaceCharacter)
        }
        Direction::Forward => {
            let to = forward_extent(block.text(), offset, deletion.unit);
            let range = Selection::within(key, offset, to);
            remove(session, operation, &range, ChangeType::DeleteCharacter)
        }
    }
}

fn backspace_at_block_start(session: &EditingSession, resolved: &ResolvedSelection) -> EditingSession {
    const OPERATION: &str = "backspace";
    let document = session.document();
    let index = resolved.start_index;

    let Some(previous) = index.checked_sub(1).map(|i| &document.blocks()[i]) else {
        let block = &document.blocks()[index];
        if block.block_type() == &BlockType::UNSTYLED {
            return session.rejected(OPERATION, "start of document");
        }
        let next = modifier::set_block_type(document, resolved, &BlockType::UNSTYLED);
        return session.push(next, session.selection().clone(), ChangeType::ChangeBlockType);
    };

    if is_strict_block_type(previous.block_type()) {
        let next = modifier::remove_block_at(document, index - 1);
        return session.push(next, session.selection().clone(), ChangeType::RemoveRange);
    }

    let range = Selection::new(
        SelectionPoint::new(previous.key().clone(), previous.len()),
        resolved.start.clone(),
    );
    remove(session, OPERATION, &range, ChangeType::BackspaceCharacter)
}

fn delete_at_block_end(session: &EditingSession, resolved: &ResolvedSelection) -> EditingSession {
    const OPERATION: &str = "delete";
    let document = session.document();
    let index = resolved.start_index;

    let Some(following) = document.blocks().get(index + 1) else {
        return session.rejected(OPERATION, "end of document");
    };

    if is_strict_block_type(following.block_type()) {
        let next = modifier::remove_block_at(document, index + 1);
        return session.push(next, session.selection().clone(), ChangeType::RemoveRange);
    }

    let range = Selection::new(
        resolved.start.clone(),
        SelectionPoint::new(following.key().clone(), 0),
    );
    remove(session, OPERATION, &range, ChangeType::DeleteCharacter)
}

/// Drop the strict block at `index`; the caret lands on the neighbor in `direction`, falling back
/// to the other side.
fn remove_strict_block(
    session: &EditingSession,
    index: usize,
    direction: Direction,
) -> EditingSession {
    let document = session.document();
    let blocks = document.blocks();
    let before = index
        .checked_sub(1)
        .map(|i| Selection::caret(blocks[i].key().clone(), blocks[i].len()));
    let after = blocks
        .get(index + 1)
        .map(|b| Selection::caret(b.key().clone(), 0));
    let caret = match direction {
        Direction::Backward => before.or(after),
        Direction::Forward => after.or(before),
    };

    let next = modifier::remove_block_at(document, index);
    let selection =
        caret.unwrap_or_else(|| Selection::caret(next.first_block().key().clone(), 0));
    session.push(next, selection, ChangeType::RemoveRange)
}

fn remove(
    session: &EditingSession,
    operation: &'static str,
    range: &Selection,
    change_type: ChangeType,
) -> EditingSession {
    let Some(resolved) = range.resolve(session.document()) else {
        return session.rejected(operation, "unresolved selection");
    };
    if resolved.is_collapsed() {
        return session.rejected(operation, "nothing to delete");
    }
    let removed = modifier::remove_range(session.document(), &resolved);
    session.push(removed.document, removed.selection, change_type)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CharClass {
    Space,
    Word,
    Punctuation,
}

fn class(grapheme: &str) -> CharClass {
    if grapheme.chars().all(char::is_whitespace) {
        CharClass::Space
    } else if grapheme.chars().any(char::is_alphanumeric) {
        CharClass::Word
    } else {
        CharClass::Punctuation
    }
}

fn char_len(graphemes: &[&str]) -> usize {
    graphemes.iter().map(|g| g.chars().count()).sum()
}

/// Character offset where a backward deletion from `offset` starts.
fn backward_extent(text: &str, offset: usize, unit: Unit) -> usize {
    let head = &text[..byte_offset(text, offset)];
    let graphemes: Vec<&str> = head.graphemes(true).collect();
    let mut pos = graphemes.len();
    match unit {
        Unit::Grapheme => pos = pos.saturating_sub(1),
        Unit::Word => {
            while pos > 0 && class(graphemes[pos - 1]) == CharClass::Space {
                pos -= 1;
            }
            if let Some(target) = pos.checked_sub(1).map(|i| class(graphemes[i])) {
                while pos > 0 && class(graphemes[pos - 1]) == target {
                    pos -= 1;
                }
            }
        }
        Unit::Block => pos = 0,
    }
    char_len(&graphemes[..pos])
}

/// Character offset where a forward deletion from `offset` ends.
fn forward_extent(text: &str, offset: usize, unit: Unit) -> usize {
    let tail = &text[byte_offset(text, offset)..];
    let graphemes: Vec<&str> = tail.graphemes(true).collect();
    let mut pos = 0;
    match unit {
        Unit::Grapheme => pos = graphemes.len().min(1),
        Unit::Word => {
            while pos < graphemes.len() && class(graphemes[pos]) == CharClass::Space {
                pos += 1;
            }
            if let Some(target) = graphemes.get(pos).map(|g| class(g)) {
                while pos < graphemes.len() && class(graphemes[pos]) == target {
                    pos += 1;
                }
            }
        }
        Unit::Block => pos = graphemes.len(),
    }
    offset + char_len(&graphemes[..pos])
}
