//! Selection and Selection Resolver.
//!
//! A [`Selection`] names two points (anchor and focus) by block key and character offset.
//! [`Selection::resolve`] orders them by document position and [`ResolvedSelection::block_ranges`]
//! yields the per-block character ranges an operation applies to:
//!
//! ```text
//! sole block      [start, end)
//! first block     [start, len)
//! interior blocks [0, len)
//! last block      [0, end)
//! ```

use crate::model::{Block, BlockKey, Document};
use crate::registry::is_strict_block_type;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::ops::Range;
use std::sync::Arc;

/// A position inside a block.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SelectionPoint {
    /// Owning block.
    pub key: BlockKey,
    /// Zero-based character offset, `0 <= offset <= block length`.
    pub offset: usize,
}

impl SelectionPoint {
    /// Create a point.
    pub fn new(key: BlockKey, offset: usize) -> Self {
        Self { key, offset }
    }
}

/// Selection direction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SelectionDirection {
    /// Anchor precedes (or equals) focus in document order.
    Forward,
    /// Focus precedes anchor in document order.
    Backward,
}

/// Selection range: anchor and focus.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Selection {
    /// Fixed end of the selection.
    pub anchor: SelectionPoint,
    /// Moving end of the selection.
    pub focus: SelectionPoint,
}

impl Selection {
    /// Create a selection from two points.
    pub fn new(anchor: SelectionPoint, focus: SelectionPoint) -> Self {
        Self { anchor, focus }
    }

    /// A caret at `point`.
    pub fn collapsed(point: SelectionPoint) -> Self {
        Self {
            anchor: point.clone(),
            focus: point,
        }
    }

    /// A caret inside `key` at `offset`.
    pub fn caret(key: impl Into<BlockKey>, offset: usize) -> Self {
        Self::collapsed(SelectionPoint::new(key.into(), offset))
    }

    /// A selection inside a single block.
    pub fn within(key: impl Into<BlockKey>, anchor_offset: usize, focus_offset: usize) -> Self {
        let key = key.into();
        Self::new(
            SelectionPoint::new(key.clone(), anchor_offset),
            SelectionPoint::new(key, focus_offset),
        )
    }

    /// A selection covering the whole text of `block`.
    pub fn over_block(block: &Block) -> Self {
        Self::within(block.key().clone(), 0, block.len())
    }

    /// A selection covering the whole document.
    pub fn all(document: &Document) -> Self {
        let last = document.last_block();
        Self::new(
            SelectionPoint::new(document.first_block().key().clone(), 0),
            SelectionPoint::new(last.key().clone(), last.len()),
        )
    }

    /// Returns `true` if anchor and focus coincide.
    pub fn is_collapsed(&self) -> bool {
        self.anchor == self.focus
    }

    /// Order the endpoints by document position.
    ///
    /// Offsets past the end of a block are clamped. Returns `None` if either endpoint names a block
    /// that is not in `document`.
    pub fn resolve(&self, document: &Document) -> Option<ResolvedSelection> {
        let anchor_index = document.block_index(&self.anchor.key)?;
        let focus_index = document.block_index(&self.focus.key)?;
        let blocks = document.blocks();

        let anchor = SelectionPoint::new(
            self.anchor.key.clone(),
            self.anchor.offset.min(blocks[anchor_index].len()),
        );
        let focus = SelectionPoint::new(
            self.focus.key.clone(),
            self.focus.offset.min(blocks[focus_index].len()),
        );

        let order = anchor_index
            .cmp(&focus_index)
            .then_with(|| anchor.offset.cmp(&focus.offset));

        let resolved = match order {
            Ordering::Less | Ordering::Equal => ResolvedSelection {
                start: anchor,
                end: focus,
                start_index: anchor_index,
                end_index: focus_index,
                direction: SelectionDirection::Forward,
            },
            Ordering::Greater => ResolvedSelection {
                start: focus,
                end: anchor,
                start_index: focus_index,
                end_index: anchor_index,
                direction: SelectionDirection::Backward,
            },
        };
        Some(resolved)
    }
}

/// Character range of one block touched by a selection.
#[derive(Debug, Clone)]
pub struct BlockRange {
    /// Position of the block in the document.
    pub index: usize,
    /// The block itself.
    pub block: Arc<Block>,
    /// Affected characters.
    pub range: Range<usize>,
}

/// A selection with its endpoints in document order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedSelection {
    /// Earlier endpoint.
    pub start: SelectionPoint,
    /// Later endpoint.
    pub end: SelectionPoint,
    /// Block index of `start`.
    pub start_index: usize,
    /// Block index of `end`.
    pub end_index: usize,
    /// Whether the anchor is the earlier endpoint.
    pub direction: SelectionDirection,
}

impl ResolvedSelection {
    /// Returns `true` for an empty range.
    pub fn is_collapsed(&self) -> bool {
        self.start == self.end
    }

    /// Blocks from `start` to `end` inclusive, with their affected character ranges.
    pub fn block_ranges(&self, document: &Document) -> Vec<BlockRange> {
        let blocks = document.blocks();
        (self.start_index..=self.end_index)
            .map(|index| {
                let block = &blocks[index];
                let from = if index == self.start_index {
                    self.start.offset
                } else {
                    0
                };
                let to = if index == self.end_index {
                    self.end.offset
                } else {
                    block.len()
                };
                BlockRange {
                    index,
                    block: Arc::clone(block),
                    range: from..to,
                }
            })
            .collect()
    }

    /// Returns `true` if any block in range has a strict type.
    pub fn touches_strict_block(&self, document: &Document) -> bool {
        document.blocks()[self.start_index..=self.end_index]
            .iter()
            .any(|b| is_strict_block_type(b.block_type()))
    }

    /// The collapsed selection at `start`.
    pub fn collapse_to_start(&self) -> Selection {
        Selection::collapsed(self.start.clone())
    }

    /// The collapsed selection at `end`.
    pub fn collapse_to_end(&self) -> Selection {
        Selection::collapsed(self.end.clone())
    }
}
