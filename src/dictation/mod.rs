//! Cursor-aware insertion engine (per-field dictation)
//!
//! Tracks the last-known caret offset of each dictated field, splices
//! returned transcript text at that offset into the field's live value, and
//! defers caret restoration + refocus until after the value commit has taken
//! visual effect.

mod cursor;
mod surface;

pub use cursor::{CursorTracker, RenderScheduler};
pub use surface::{FieldSurface, TextField};
