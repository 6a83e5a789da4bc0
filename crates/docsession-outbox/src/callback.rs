//! Engine notification kinds, their replay buckets, and their wire frames.

use crate::document::DocumentInfo;
use crate::item::EventItem;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::num::IntErrorKind;

/// Largest coordinate the engine uses for "the whole document".
pub const FULL_EXTENT: i32 = i32::MAX;

/// A notification category emitted by the rendering engine.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum CallbackKind {
    InvalidateTiles,
    InvalidateVisibleCursor,
    TextSelection,
    TextSelectionStart,
    TextSelectionEnd,
    CursorVisible,
    GraphicSelection,
    CellCursor,
    CellFormula,
    MousePointer,
    HyperlinkClicked,
    StateChanged,
    SearchNotFound,
    SearchResultSelection,
    DocumentSizeChanged,
    SetPart,
    UnoCommandResult,
    Error,
    ContextMenu,
    StatusIndicatorStart,
    StatusIndicatorSetValue,
    StatusIndicatorFinish,
    InvalidateViewCursor,
    TextViewSelection,
    CellViewCursor,
    GraphicViewSelection,
    ViewCursorVisible,
    ViewLock,
    RedlineTableSizeChanged,
    RedlineTableEntryModified,
    Comment,
    InvalidateHeader,
    CellAddress,
    RulerUpdate,
    Window,
    ValidityListButton,
    ClipboardChanged,
    SignatureStatus,
}

/// Where an event goes while its session is inactive.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RecordAs {
    /// Collapses into a single pending full invalidation.
    Invalidate,
    /// Latest value per kind.
    Scalar,
    /// Latest value per (kind, view).
    View,
    /// Latest value per state name.
    State,
    /// Appended in order, never merged.
    Sequence,
    /// Not kept; has no meaning for a client catching up.
    Drop,
}

impl CallbackKind {
    /// Every kind, in declaration order.
    pub const ALL: [CallbackKind; 38] = [
        Self::InvalidateTiles,
        Self::InvalidateVisibleCursor,
        Self::TextSelection,
        Self::TextSelectionStart,
        Self::TextSelectionEnd,
        Self::CursorVisible,
        Self::GraphicSelection,
        Self::CellCursor,
        Self::CellFormula,
        Self::MousePointer,
        Self::HyperlinkClicked,
        Self::StateChanged,
        Self::SearchNotFound,
        Self::SearchResultSelection,
        Self::DocumentSizeChanged,
        Self::SetPart,
        Self::UnoCommandResult,
        Self::Error,
        Self::ContextMenu,
        Self::StatusIndicatorStart,
        Self::StatusIndicatorSetValue,
        Self::StatusIndicatorFinish,
        Self::InvalidateViewCursor,
        Self::TextViewSelection,
        Self::CellViewCursor,
        Self::GraphicViewSelection,
        Self::ViewCursorVisible,
        Self::ViewLock,
        Self::RedlineTableSizeChanged,
        Self::RedlineTableEntryModified,
        Self::Comment,
        Self::InvalidateHeader,
        Self::CellAddress,
        Self::RulerUpdate,
        Self::Window,
        Self::ValidityListButton,
        Self::ClipboardChanged,
        Self::SignatureStatus,
    ];

    /// Tag of the frame sent to the client for this kind.
    pub fn wire_tag(self) -> &'static str {
        match self {
            Self::InvalidateTiles => "invalidatetiles",
            Self::InvalidateVisibleCursor => "invalidatecursor",
            Self::TextSelection => "textselection",
            Self::TextSelectionStart => "textselectionstart",
            Self::TextSelectionEnd => "textselectionend",
            Self::CursorVisible => "cursorvisible",
            Self::GraphicSelection => "graphicselection",
            Self::CellCursor => "cellcursor",
            Self::CellFormula => "cellformula",
            Self::MousePointer => "mousepointer",
            Self::HyperlinkClicked => "hyperlinkclicked",
            Self::StateChanged => "statechanged",
            Self::SearchNotFound => "searchnotfound",
            Self::SearchResultSelection => "searchresultselection",
            // Expanded into per-part tile invalidations.
            Self::DocumentSizeChanged => "invalidatetiles",
            Self::SetPart => "setpart",
            Self::UnoCommandResult => "unocommandresult",
            Self::Error => "error",
            Self::ContextMenu => "contextmenu",
            Self::StatusIndicatorStart => "statusindicatorstart",
            Self::StatusIndicatorSetValue => "statusindicatorsetvalue",
            Self::StatusIndicatorFinish => "statusindicatorfinish",
            Self::InvalidateViewCursor => "invalidateviewcursor",
            Self::TextViewSelection => "textviewselection",
            Self::CellViewCursor => "cellviewcursor",
            Self::GraphicViewSelection => "graphicviewselection",
            Self::ViewCursorVisible => "viewcursorvisible",
            Self::ViewLock => "viewlock",
            Self::RedlineTableSizeChanged => "redlinetablechanged",
            Self::RedlineTableEntryModified => "redlinetablemodified",
            Self::Comment => "comment",
            Self::InvalidateHeader => "invalidateheader",
            Self::CellAddress => "celladdress",
            Self::RulerUpdate => "rulerupdate",
            Self::Window => "window",
            Self::ValidityListButton => "validitylistbutton",
            Self::ClipboardChanged => "clipboardchanged",
            Self::SignatureStatus => "signaturestatus",
        }
    }

    /// Replay bucket used while the session is inactive.
    pub fn record_as(self) -> RecordAs {
        match self {
            Self::InvalidateTiles => RecordAs::Invalidate,

            Self::InvalidateVisibleCursor
            | Self::CursorVisible
            | Self::TextSelection
            | Self::TextSelectionStart
            | Self::TextSelectionEnd
            | Self::CellFormula
            | Self::CellCursor
            | Self::GraphicSelection
            | Self::DocumentSizeChanged
            | Self::InvalidateHeader
            | Self::CellAddress => RecordAs::Scalar,

            Self::InvalidateViewCursor
            | Self::TextViewSelection
            | Self::CellViewCursor
            | Self::GraphicViewSelection
            | Self::ViewCursorVisible
            | Self::ViewLock => RecordAs::View,

            Self::StateChanged => RecordAs::State,

            Self::RedlineTableSizeChanged | Self::RedlineTableEntryModified | Self::Comment => {
                RecordAs::Sequence
            }

            Self::MousePointer
            | Self::HyperlinkClicked
            | Self::SearchNotFound
            | Self::SearchResultSelection
            | Self::SetPart
            | Self::UnoCommandResult
            | Self::Error
            | Self::ContextMenu
            | Self::StatusIndicatorStart
            | Self::StatusIndicatorSetValue
            | Self::StatusIndicatorFinish
            | Self::RulerUpdate
            | Self::Window
            | Self::ValidityListButton
            | Self::ClipboardChanged
            | Self::SignatureStatus => RecordAs::Drop,
        }
    }

    /// Whether formatting this kind reads document geometry from the engine.
    pub fn needs_document_info(self) -> bool {
        matches!(self, Self::InvalidateTiles | Self::DocumentSizeChanged)
    }
}

/// Save results are forwarded even to inactive sessions.
pub fn is_save_notification(kind: CallbackKind, payload: &str) -> bool {
    kind == CallbackKind::UnoCommandResult && payload.contains(".uno:Save")
}

/// Splits a `name=value` state payload, returning the trimmed name.
pub fn state_name(payload: &str) -> Option<&str> {
    let (name, _) = payload.split_once('=')?;
    let name = name.trim();
    (!name.is_empty()).then_some(name)
}

/// Payload of a full-document tile invalidation for `part`.
pub fn full_invalidate_payload(part: i32) -> String {
    format!("0, 0, {FULL_EXTENT}, {FULL_EXTENT}, {part}")
}

/// Renders an engine notification into the frames sent to the client.
pub fn to_frames(kind: CallbackKind, payload: &str, doc: &DocumentInfo) -> Vec<EventItem> {
    let tag = kind.wire_tag();
    match kind {
        CallbackKind::InvalidateTiles => vec![invalidate_tiles_frame(payload, doc)],
        CallbackKind::DocumentSizeChanged => (0..doc.part_count.max(1))
            .map(|part| {
                EventItem::text(
                    tag,
                    &format!("part={part} x=0 y=0 width={FULL_EXTENT} height={FULL_EXTENT}"),
                )
            })
            .collect(),
        CallbackKind::Error => vec![error_frame(payload)],
        CallbackKind::StatusIndicatorStart | CallbackKind::StatusIndicatorFinish => {
            vec![EventItem::text(tag, "")]
        }
        _ => vec![EventItem::text(tag, payload)],
    }
}

fn invalidate_tiles_frame(payload: &str, doc: &DocumentInfo) -> EventItem {
    let tag = CallbackKind::InvalidateTiles.wire_tag();
    let tokens: Vec<&str> = payload
        .split(',')
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .collect();

    match tokens.as_slice() {
        [x, y, width, height, part] => {
            let parsed: Result<Vec<i32>, _> = [x, y, width, height, part]
                .iter()
                .map(|t| t.parse::<i32>())
                .collect();
            match parsed {
                Ok(values) => {
                    // Text documents render everything as part 0.
                    let part = if doc.is_text { 0 } else { values[4] };
                    EventItem::text(
                        tag,
                        &format!(
                            "part={part} x={} y={} width={} height={}",
                            values[0], values[1], values[2], values[3]
                        ),
                    )
                }
                Err(e)
                    if matches!(
                        e.kind(),
                        IntErrorKind::PosOverflow | IntErrorKind::NegOverflow
                    ) =>
                {
                    EventItem::text(
                        tag,
                        &format!("part=0 x=0 y=0 width={FULL_EXTENT} height={FULL_EXTENT}"),
                    )
                }
                Err(_) => EventItem::text(tag, payload),
            }
        }
        ["EMPTY", part] => {
            let part = if doc.is_text { "0" } else { part };
            EventItem::text(tag, &format!("EMPTY, {part}"))
        }
        _ => EventItem::text(tag, payload),
    }
}

fn error_frame(payload: &str) -> EventItem {
    let tag = CallbackKind::Error.wire_tag();
    let Ok(value) = serde_json::from_str::<Value>(payload) else {
        return EventItem::text(tag, payload);
    };

    let field = |name: &str| match value.get(name) {
        Some(Value::String(s)) => s.clone(),
        Some(Value::Null) | None => String::new(),
        Some(other) => other.to_string(),
    };

    EventItem::text(
        tag,
        &format!(
            "cmd={} kind={} code={}",
            field("cmd"),
            field("kind"),
            field("code")
        ),
    )
}
