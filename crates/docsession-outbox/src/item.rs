//! Outbound event items and their deduplication keys.
//!
//! An item is one frame destined for a client transport: a text first line
//! (`<tag>: <fields>`), optionally followed by a newline and binary content
//! (tile pixels). The tag and the dedup key are extracted once, when the item
//! is created, so the queue never re-parses payloads while holding its lock.

use crate::{OutboxError, OutboxResult};
use serde_json::Value;
use std::fmt;
use std::time::Instant;

/// Wire tag for rendered tiles.
pub const TAG_TILE: &str = "tile";
/// Wire tag for status indicator progress.
pub const TAG_STATUS_INDICATOR_SET_VALUE: &str = "statusindicatorsetvalue";
/// Wire tag for the local cursor rectangle.
pub const TAG_INVALIDATE_CURSOR: &str = "invalidatecursor";
/// Wire tag for a collaborator's cursor rectangle.
pub const TAG_INVALIDATE_VIEW_CURSOR: &str = "invalidateviewcursor";

/// Identifier of a collaborator view, normalised to its string form.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ViewId(String);

impl ViewId {
    /// Creates a view ID from an existing string.
    pub fn from_string(s: impl Into<String>) -> Self {
        Self(s.into())
    }

    /// Returns the view ID as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Reads `viewId` from a JSON object payload.
    ///
    /// Engines emit the field either as a number or as a string; both map to
    /// the same `ViewId`.
    pub fn from_json(json: &str) -> OutboxResult<Self> {
        let value: Value = serde_json::from_str(json.trim())?;
        match value.get("viewId") {
            Some(Value::String(s)) => Ok(Self(s.clone())),
            Some(Value::Number(n)) => Ok(Self(n.to_string())),
            Some(other) => Err(OutboxError::malformed(
                "viewId",
                format!("unexpected value {other}"),
            )),
            None => Err(OutboxError::malformed("viewId", "field missing")),
        }
    }
}

impl fmt::Display for ViewId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Geometry that identifies a tile: the same key means the newer tile
/// supersedes the older one.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct TileKey {
    pub part: i32,
    pub width: i32,
    pub height: i32,
    pub tile_pos_x: i32,
    pub tile_pos_y: i32,
    pub tile_width: i32,
    pub tile_height: i32,
}

impl TileKey {
    /// Parses the `name=value` fields of a `tile:` first line.
    pub fn parse(first_line: &str) -> OutboxResult<Self> {
        let mut part = None;
        let mut width = None;
        let mut height = None;
        let mut tile_pos_x = None;
        let mut tile_pos_y = None;
        let mut tile_width = None;
        let mut tile_height = None;

        for token in first_line.split_whitespace().skip(1) {
            let Some((name, value)) = token.split_once('=') else {
                continue;
            };
            let slot = match name {
                "part" => &mut part,
                "width" => &mut width,
                "height" => &mut height,
                "tileposx" => &mut tile_pos_x,
                "tileposy" => &mut tile_pos_y,
                "tilewidth" => &mut tile_width,
                "tileheight" => &mut tile_height,
                _ => continue,
            };
            let parsed = value.parse::<i32>().map_err(|e| {
                OutboxError::malformed(TAG_TILE, format!("{name}={value}: {e}"))
            })?;
            *slot = Some(parsed);
        }

        let require = |field: Option<i32>, name: &str| {
            field.ok_or_else(|| OutboxError::malformed(TAG_TILE, format!("missing {name}")))
        };

        Ok(Self {
            part: require(part, "part")?,
            width: require(width, "width")?,
            height: require(height, "height")?,
            tile_pos_x: require(tile_pos_x, "tileposx")?,
            tile_pos_y: require(tile_pos_y, "tileposy")?,
            tile_width: require(tile_width, "tilewidth")?,
            tile_height: require(tile_height, "tileheight")?,
        })
    }
}

/// Identity under which a newer queued item supersedes an older one.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum DedupKey {
    /// One tile per geometry.
    Tile(TileKey),
    /// One item per tag.
    Tag(&'static str),
    /// One collaborator cursor per view.
    ViewCursor(ViewId),
}

/// An immutable outbound frame.
#[derive(Clone)]
pub struct EventItem {
    data: Vec<u8>,
    first_line_len: usize,
    tag: String,
    dedup_key: Option<DedupKey>,
    arrival: Instant,
}

impl EventItem {
    /// Creates an item from raw frame bytes.
    ///
    /// Never fails: a payload whose dedup fields cannot be parsed is kept,
    /// just without a dedup key.
    pub fn new(data: impl Into<Vec<u8>>) -> Self {
        let data = data.into();
        let first_line_len = data
            .iter()
            .position(|b| *b == b'\n')
            .unwrap_or(data.len());
        let first_line = String::from_utf8_lossy(&data[..first_line_len]);
        let first_token = first_line.split_whitespace().next().unwrap_or("");
        let tag = first_token
            .strip_suffix(':')
            .unwrap_or(first_token)
            .to_string();

        let dedup_key = dedup_key_for(&tag, &first_line, &data).ok().flatten();

        Self {
            data,
            first_line_len,
            tag,
            dedup_key,
            arrival: Instant::now(),
        }
    }

    /// Creates a text item `"<tag>: <payload>"`, or `"<tag>:"` for an empty payload.
    pub fn text(tag: &str, payload: &str) -> Self {
        if payload.is_empty() {
            Self::new(format!("{tag}:"))
        } else {
            Self::new(format!("{tag}: {payload}"))
        }
    }

    /// The wire tag without its trailing colon.
    pub fn tag(&self) -> &str {
        &self.tag
    }

    /// The full frame, forwarded verbatim to the transport.
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// Consumes the item, returning the frame bytes.
    pub fn into_data(self) -> Vec<u8> {
        self.data
    }

    /// The text first line of the frame.
    pub fn first_line(&self) -> String {
        String::from_utf8_lossy(&self.data[..self.first_line_len]).into_owned()
    }

    pub fn dedup_key(&self) -> Option<&DedupKey> {
        self.dedup_key.as_ref()
    }

    /// True when the tag is deduplicated but the key could not be parsed.
    pub fn missing_dedup_key(&self) -> bool {
        self.dedup_key.is_none()
            && matches!(
                self.tag.as_str(),
                TAG_TILE
                    | TAG_STATUS_INDICATOR_SET_VALUE
                    | TAG_INVALIDATE_CURSOR
                    | TAG_INVALIDATE_VIEW_CURSOR
            )
    }

    /// The collaborator view this item targets, for per-view cursor items.
    pub fn view_id(&self) -> Option<&ViewId> {
        match &self.dedup_key {
            Some(DedupKey::ViewCursor(view_id)) => Some(view_id),
            _ => None,
        }
    }

    pub fn arrival(&self) -> Instant {
        self.arrival
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

impl fmt::Debug for EventItem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventItem")
            .field("first_line", &self.first_line())
            .field("len", &self.data.len())
            .field("dedup_key", &self.dedup_key)
            .finish()
    }
}

fn dedup_key_for(tag: &str, first_line: &str, data: &[u8]) -> OutboxResult<Option<DedupKey>> {
    match tag {
        TAG_TILE => Ok(Some(DedupKey::Tile(TileKey::parse(first_line)?))),
        TAG_STATUS_INDICATOR_SET_VALUE => Ok(Some(DedupKey::Tag(TAG_STATUS_INDICATOR_SET_VALUE))),
        TAG_INVALIDATE_CURSOR => Ok(Some(DedupKey::Tag(TAG_INVALIDATE_CURSOR))),
        TAG_INVALIDATE_VIEW_CURSOR => {
            let text = String::from_utf8_lossy(data);
            let json = text
                .find('{')
                .map(|start| &text[start..])
                .ok_or_else(|| OutboxError::malformed(tag, "no JSON object"))?;
            Ok(Some(DedupKey::ViewCursor(ViewId::from_json(json)?)))
        }
        _ => Ok(None),
    }
}
