//! Process-wide registries.
//!
//! Two append-only sets drive engine behavior that hosts may extend:
//!
//! - **strict block types**: blocks that reject in-place text/style/type edits
//!   (default: [`BlockType::ATOMIC`])
//! - **style groups**: prefixes of mutually exclusive inline style tags
//!   (default: [`DEFAULT_STYLE_GROUPS`])
//!
//! Entries are never removed. Both sets sit behind an `RwLock`, so registration from one thread
//! is safe while other threads read.

use crate::model::{BlockType, InlineStyle};
use std::collections::BTreeSet;
use std::sync::{LazyLock, PoisonError, RwLock};

/// Style groups known to every process.
pub const DEFAULT_STYLE_GROUPS: [&str; 7] = [
    "COLOR",
    "BGCOLOR",
    "FONTSIZE",
    "LINEHEIGHT",
    "FONTFAMILY",
    "LETTERSPACING",
    "INDENT",
];

static STRICT_BLOCK_TYPES: LazyLock<RwLock<BTreeSet<BlockType>>> =
    LazyLock::new(|| RwLock::new(BTreeSet::from([BlockType::ATOMIC])));

static STYLE_GROUPS: LazyLock<RwLock<BTreeSet<String>>> = LazyLock::new(|| {
    RwLock::new(
        DEFAULT_STYLE_GROUPS
            .iter()
            .map(|prefix| prefix.to_string())
            .collect(),
    )
});

/// Mark `block_type` as strict. Returns `false` if it already was.
pub fn register_strict_block_type(block_type: BlockType) -> bool {
    let mut types = STRICT_BLOCK_TYPES
        .write()
        .unwrap_or_else(PoisonError::into_inner);
    let added = types.insert(block_type.clone());
    if added {
        tracing::debug!(target: "richtext.registry", %block_type, "strict_block_type_registered");
    }
    added
}

/// Returns `true` if `block_type` is strict.
pub fn is_strict_block_type(block_type: &BlockType) -> bool {
    STRICT_BLOCK_TYPES
        .read()
        .unwrap_or_else(PoisonError::into_inner)
        .contains(block_type)
}

/// Snapshot of the strict block types.
pub fn strict_block_types() -> Vec<BlockType> {
    STRICT_BLOCK_TYPES
        .read()
        .unwrap_or_else(PoisonError::into_inner)
        .iter()
        .cloned()
        .collect()
}

/// Register a style group prefix (upper-cased). Returns `false` if it already existed.
pub fn register_style_group(prefix: &str) -> bool {
    let prefix = prefix.to_uppercase();
    let mut groups = STYLE_GROUPS.write().unwrap_or_else(PoisonError::into_inner);
    let added = groups.insert(prefix.clone());
    if added {
        tracing::debug!(target: "richtext.registry", %prefix, "style_group_registered");
    }
    added
}

/// Snapshot of the registered style group prefixes.
pub fn style_groups() -> Vec<String> {
    STYLE_GROUPS
        .read()
        .unwrap_or_else(PoisonError::into_inner)
        .iter()
        .cloned()
        .collect()
}

/// The registered group `style` belongs to, if any.
///
/// When several prefixes match, the longest wins.
pub fn style_group_of(style: &InlineStyle) -> Option<String> {
    STYLE_GROUPS
        .read()
        .unwrap_or_else(PoisonError::into_inner)
        .iter()
        .filter(|prefix| style.in_group(prefix))
        .max_by_key(|prefix| prefix.len())
        .cloned()
}
