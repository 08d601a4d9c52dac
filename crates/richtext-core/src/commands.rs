//! Command Interface Layer
//!
//! A data-driven front door to the engine: every operation is available as a [`Command`] value
//! that can be queued, logged or sent over the wire (the enums are `serde`-serializable), then
//! dispatched with [`execute`].
//!
//! # Example
//!
//! ```rust
//! use richtext_core::commands::{execute, Command, StyleCommand, TextCommand};
//! use richtext_core::{EditingSession, Selection};
//!
//! let session = EditingSession::create_empty(None);
//! let commands = vec![
//!     Command::Text(TextCommand::Insert { text: "Hello".to_string(), replace: true }),
//!     Command::Select(richtext_core::commands::SelectionCommand::Set {
//!         selection: Selection::within("b0", 0, 5),
//!     }),
//!     Command::Style(StyleCommand::Toggle { style: "bold".to_string() }),
//! ];
//!
//! let session = commands
//!     .iter()
//!     .fold(session, |session, command| execute(&session, command, None));
//! assert!(richtext_core::style::selection_has_style(&session, "BOLD"));
//! ```

use crate::blocks::{self, MediaPosition};
use crate::convert::{ConvertOptions, HtmlConverter};
use crate::entities::{self, EntityDescriptor, LinkHref, Media};
use crate::error::EditError;
use crate::keys::{self, KeyCommand, LineBreak};
use crate::model::{BlockKey, BlockType, DataMap, EntityKey, EntityType, StyleSet};
use crate::selection::Selection;
use crate::session::EditingSession;
use crate::style;
use crate::text;
use serde::{Deserialize, Serialize};

/// Inline style commands
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "kebab-case")]
pub enum StyleCommand {
    /// Toggle a single tag
    Toggle {
        /// Style tag, case-insensitive.
        style: String,
    },
    /// Toggle `PREFIX-VALUE`, exclusive within the `PREFIX` group
    Grouped {
        /// Group prefix (`FONTSIZE`, ...).
        prefix: String,
        /// Group value (`24`, ...).
        value: String,
    },
    /// Toggle a text color
    Color {
        /// `#RRGGBB` or `RRGGBB`.
        color: String,
    },
    /// Toggle a background color
    BackgroundColor {
        /// `#RRGGBB` or `RRGGBB`.
        color: String,
    },
    /// Strip every tag from the range
    RemoveAll,
}

/// Block commands
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "kebab-case")]
pub enum BlockCommand {
    /// Merge or replace the anchor block's data
    SetData {
        /// Data to merge; `null` values delete keys.
        data: DataMap,
        /// Replace the data wholesale instead of merging.
        #[serde(default)]
        override_existing: bool,
    },
    /// Toggle `textAlign`
    ToggleAlignment {
        /// Alignment value.
        alignment: String,
    },
    /// Set `textIndent` (0 clears it)
    ToggleIndent {
        /// Requested depth.
        depth: i64,
    },
    /// Indent one level
    IncreaseIndent,
    /// Outdent one level
    DecreaseIndent,
    /// Toggle the block type of every block in range
    ToggleType {
        /// Target type.
        block_type: BlockType,
    },
    /// Empty a block and reset its type
    Remove {
        /// Block to remove.
        key: BlockKey,
        /// Selection to land on afterwards.
        #[serde(default)]
        fallback: Option<Selection>,
    },
    /// Empty the whole document
    Clear,
    /// Toggle a block's float/alignment
    SetMediaPosition {
        /// Media block.
        key: BlockKey,
        /// Requested position.
        position: MediaPosition,
    },
}

/// Entity, link and media commands
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "kebab-case")]
pub enum EntityCommand {
    /// Apply or clear an entity on the range
    Toggle {
        /// Entity to create; `None` clears.
        #[serde(default)]
        descriptor: Option<EntityDescriptor>,
    },
    /// Link, unlink or placeholder-link the range
    Link {
        /// Link target.
        href: LinkHref,
        /// Link window target.
        #[serde(default)]
        target: Option<String>,
    },
    /// Insert an atomic block at the caret
    InsertAtomicBlock {
        /// Entity type.
        entity_type: EntityType,
        /// Create an immutable entity.
        immutable: bool,
        /// Entity data.
        #[serde(default)]
        data: DataMap,
    },
    /// Insert a horizontal rule at the caret
    InsertHorizontalLine,
    /// Insert media blocks at the caret
    InsertMedias {
        /// Media items in insertion order.
        medias: Vec<Media>,
    },
    /// Merge data onto a media entity
    SetMediaData {
        /// Entity to update.
        key: EntityKey,
        /// Data to merge.
        data: DataMap,
    },
    /// Remove a media block
    RemoveMedia {
        /// Media block.
        key: BlockKey,
    },
}

/// Text commands
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "kebab-case")]
pub enum TextCommand {
    /// Insert at the caret or replace the range
    Insert {
        /// Text to insert.
        text: String,
        /// Replace a selected range.
        #[serde(default = "default_replace")]
        replace: bool,
    },
    /// Convert and splice HTML over the selection
    InsertHtml {
        /// HTML source.
        html: String,
        /// Converter options.
        #[serde(default)]
        options: ConvertOptions,
    },
    /// Split the block at the caret
    SplitBlock,
    /// Delete the selected range
    RemoveSelection,
    /// Enter, or Shift+Enter with `line_break: soft`
    NewLine {
        /// Hard or soft break.
        #[serde(default)]
        line_break: LineBreak,
    },
}

fn default_replace() -> bool {
    true
}

/// Selection commands (no history entry)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "kebab-case")]
pub enum SelectionCommand {
    /// Replace the selection
    Set {
        /// New selection.
        selection: Selection,
    },
    /// Select a whole block
    SelectBlock {
        /// Block to select.
        key: BlockKey,
    },
    /// Select the block following `key`
    SelectNextBlock {
        /// Reference block.
        key: BlockKey,
    },
    /// Set the style carried over to the next insertion
    SetStyleOverride {
        /// Style tags.
        styles: StyleSet,
    },
}

/// History commands
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum HistoryCommand {
    /// Undo last edit
    Undo,
    /// Redo last undone edit
    Redo,
}

/// Unified command enum
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "command", rename_all = "kebab-case")]
pub enum Command {
    /// Inline style commands
    Style(StyleCommand),
    /// Block commands
    Block(BlockCommand),
    /// Entity commands
    Entity(EntityCommand),
    /// Text commands
    Text(TextCommand),
    /// Key commands
    Key(KeyCommand),
    /// Selection commands
    Select(SelectionCommand),
    /// History commands
    History(HistoryCommand),
}

impl Command {
    /// Returns `true` for commands that may push a history entry.
    pub fn is_edit(&self) -> bool {
        !matches!(self, Command::Select(_) | Command::History(_))
    }
}

/// Run `command` against `session`.
///
/// Failures are logged and yield the input session unchanged; use [`try_execute`] to see them.
pub fn execute(
    session: &EditingSession,
    command: &Command,
    converter: Option<&dyn HtmlConverter>,
) -> EditingSession {
    session.recover("execute", try_execute(session, command, converter))
}

/// Fallible form of [`execute`].
///
/// HTML insertion without a converter fails with [`EditError::MissingConverter`].
pub fn try_execute(
    session: &EditingSession,
    command: &Command,
    converter: Option<&dyn HtmlConverter>,
) -> Result<EditingSession, EditError> {
    tracing::trace!(target: "richtext.session", ?command, "execute");
    match command {
        Command::Style(command) => Ok(execute_style(session, command)),
        Command::Block(command) => execute_block(session, command),
        Command::Entity(command) => execute_entity(session, command),
        Command::Text(command) => execute_text(session, command, converter),
        Command::Key(command) => Ok(keys::handle_key_command(session, *command)),
        Command::Select(command) => Ok(execute_selection(session, command)),
        Command::History(HistoryCommand::Undo) => Ok(session.undo()),
        Command::History(HistoryCommand::Redo) => Ok(session.redo()),
    }
}

/// Run commands in order, stopping at the first failure.
pub fn execute_batch<'a>(
    session: &EditingSession,
    commands: impl IntoIterator<Item = &'a Command>,
    converter: Option<&dyn HtmlConverter>,
) -> Result<EditingSession, EditError> {
    commands
        .into_iter()
        .try_fold(session.clone(), |session, command| {
            try_execute(&session, command, converter)
        })
}

fn execute_style(session: &EditingSession, command: &StyleCommand) -> EditingSession {
    match command {
        StyleCommand::Toggle { style } => style::toggle_inline_style(session, style),
        StyleCommand::Grouped { prefix, value } => {
            style::apply_grouped_style(session, prefix, value)
        }
        StyleCommand::Color { color } => style::toggle_color(session, color),
        StyleCommand::BackgroundColor { color } => style::toggle_background_color(session, color),
        StyleCommand::RemoveAll => style::remove_all_inline_styles(session),
    }
}

fn execute_block(
    session: &EditingSession,
    command: &BlockCommand,
) -> Result<EditingSession, EditError> {
    Ok(match command {
        BlockCommand::SetData {
            data,
            override_existing,
        } => blocks::set_block_data(session, data, *override_existing),
        BlockCommand::ToggleAlignment { alignment } => blocks::toggle_alignment(session, alignment),
        BlockCommand::ToggleIndent { depth } => {
            blocks::toggle_indent(session, *depth, session.config().max_indent)
        }
        BlockCommand::IncreaseIndent => blocks::increase_indent(session),
        BlockCommand::DecreaseIndent => blocks::decrease_indent(session),
        BlockCommand::ToggleType { block_type } => blocks::toggle_block_type(session, block_type),
        BlockCommand::Remove { key, fallback } => {
            blocks::try_remove_block(session, key, fallback.clone())?
        }
        BlockCommand::Clear => blocks::clear(session),
        BlockCommand::SetMediaPosition { key, position } => {
            blocks::try_set_media_position(session, key, position)?
        }
    })
}

fn execute_entity(
    session: &EditingSession,
    command: &EntityCommand,
) -> Result<EditingSession, EditError> {
    match command {
        EntityCommand::Toggle { descriptor } => {
            entities::try_toggle_selection_entity(session, descriptor.clone())
        }
        EntityCommand::Link { href, target } => {
            entities::try_toggle_selection_link(session, href.clone(), target.as_deref())
        }
        EntityCommand::InsertAtomicBlock {
            entity_type,
            immutable,
            data,
        } => entities::try_insert_atomic_block(
            session,
            entity_type.clone(),
            *immutable,
            data.clone(),
        ),
        EntityCommand::InsertHorizontalLine => Ok(entities::insert_horizontal_line(session)),
        EntityCommand::InsertMedias { medias } => entities::try_insert_medias(session, medias),
        EntityCommand::SetMediaData { key, data } => {
            entities::try_set_media_data(session, *key, data)
        }
        EntityCommand::RemoveMedia { key } => blocks::try_remove_block(session, key, None),
    }
}

fn execute_text(
    session: &EditingSession,
    command: &TextCommand,
    converter: Option<&dyn HtmlConverter>,
) -> Result<EditingSession, EditError> {
    match command {
        TextCommand::Insert { text, replace } => text::try_insert_text_with(
            session,
            text,
            text::InsertTextOptions {
                replace: *replace,
                ..Default::default()
            },
        ),
        TextCommand::InsertHtml { html, options } => {
            let converter = converter.ok_or(EditError::MissingConverter)?;
            text::try_insert_html(session, html, converter, options)
        }
        TextCommand::SplitBlock => Ok(text::split_block(session)),
        TextCommand::RemoveSelection => Ok(text::remove_selection(session)),
        TextCommand::NewLine { line_break } => Ok(keys::handle_new_line(session, *line_break)),
    }
}

fn execute_selection(session: &EditingSession, command: &SelectionCommand) -> EditingSession {
    match command {
        SelectionCommand::Set { selection } => session.force_selection(selection.clone()),
        SelectionCommand::SelectBlock { key } => blocks::select_block(session, key),
        SelectionCommand::SelectNextBlock { key } => blocks::select_next_block(session, key),
        SelectionCommand::SetStyleOverride { styles } => {
            session.set_inline_style_override(styles.clone())
        }
    }
}
