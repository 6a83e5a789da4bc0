//! The engine-side document, as seen by a session.

use parking_lot::Mutex;

/// Geometry read from the engine when formatting frames.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DocumentInfo {
    /// Text documents render everything as part 0.
    pub is_text: bool,
    /// Part (sheet, slide) the session's view is on.
    pub current_part: i32,
    /// Number of parts in the document.
    pub part_count: i32,
}

impl Default for DocumentInfo {
    fn default() -> Self {
        Self {
            is_text: true,
            current_part: 0,
            part_count: 1,
        }
    }
}

/// Read access to the engine document.
///
/// Implementations take the engine's document lock inside `document_info`
/// and release it before returning; sessions call this before taking their
/// own locks.
pub trait DocumentView: Send + Sync {
    fn document_info(&self) -> DocumentInfo;
}

/// A document whose geometry is set by the caller.
#[derive(Debug, Default)]
pub struct StaticDocument {
    info: Mutex<DocumentInfo>,
}

impl StaticDocument {
    pub fn new(info: DocumentInfo) -> Self {
        Self {
            info: Mutex::new(info),
        }
    }

    /// Switch the current part.
    pub fn set_part(&self, part: i32) {
        self.info.lock().current_part = part;
    }
}

impl DocumentView for StaticDocument {
    fn document_info(&self) -> DocumentInfo {
        *self.info.lock()
    }
}
