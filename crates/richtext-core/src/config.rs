//! Engine configuration.

use serde::{Deserialize, Serialize};

/// Default bound for block indentation depth.
pub const DEFAULT_MAX_INDENT: u32 = 6;

/// Default number of undo entries kept per session.
pub const DEFAULT_HISTORY_LIMIT: usize = 1000;

/// Engine settings shared by every session derived from the same root.
///
/// Missing fields fall back to their defaults when deserializing, so hosts can keep partial
/// settings files:
///
/// ```rust
/// use richtext_core::EditorConfig;
///
/// let config: EditorConfig = serde_json::from_str(r#"{ "max_indent": 3 }"#).unwrap();
/// assert_eq!(config.max_indent, 3);
/// assert_eq!(config.link_guard, " ");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EditorConfig {
    /// Upper bound used by increase/decrease indent.
    pub max_indent: u32,
    /// Maximum undo depth; the oldest entries are dropped first.
    pub history_limit: usize,
    /// Text inserted after a freshly applied link so typing past it does not extend the link.
    pub link_guard: String,
    /// Merge consecutive character insertions into a single undo step.
    pub coalesce_typing: bool,
}

impl Default for EditorConfig {
    fn default() -> Self {
        Self {
            max_indent: DEFAULT_MAX_INDENT,
            history_limit: DEFAULT_HISTORY_LIMIT,
            link_guard: " ".to_string(),
            coalesce_typing: false,
        }
    }
}
