use super::surface::FieldSurface;
use tracing::debug;

type Deferred = Box<dyn FnOnce(&mut dyn FieldSurface) + Send>;

/// Queue of continuations that must run after the committed value has taken
/// visual effect.
///
/// Caret restoration cannot run synchronously with the value commit: the
/// field's displayed text has to update first. The host flushes this queue
/// once its render pass for the field completes.
#[derive(Default)]
pub struct RenderScheduler {
    queue: Vec<Deferred>,
}

impl RenderScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn defer(&mut self, continuation: impl FnOnce(&mut dyn FieldSurface) + Send + 'static) {
        self.queue.push(Box::new(continuation));
    }

    /// Run all pending continuations against the freshly rendered field.
    pub fn flush(&mut self, surface: &mut dyn FieldSurface) {
        for continuation in self.queue.drain(..) {
            continuation(surface);
        }
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }
}

/// Last-known caret position for one dictated field.
///
/// Updated on every focus, selection, and manual-edit event, so a dictation
/// started after the clinician clicks mid-text inserts at that spot rather
/// than at the end. A stale offset (the value shrank underneath us) clamps to
/// end-of-text at insertion time instead of failing.
#[derive(Debug)]
pub struct CursorTracker {
    field_key: String,
    offset: usize,
}

impl CursorTracker {
    pub fn new(field_key: impl Into<String>) -> Self {
        Self {
            field_key: field_key.into(),
            offset: 0,
        }
    }

    pub fn field_key(&self) -> &str {
        &self.field_key
    }

    pub fn offset(&self) -> usize {
        self.offset
    }

    /// Record the caret on focus; a field focused without a caret position
    /// tracks end-of-text.
    pub fn note_focus(&mut self, surface: &dyn FieldSurface) {
        self.offset = surface.caret().unwrap_or_else(|| surface.value().len());
    }

    /// Record a selection or manual-edit caret move.
    pub fn note_caret(&mut self, offset: usize) {
        self.offset = offset;
    }

    /// Splice the transcript into the field at the tracked offset.
    ///
    /// Exactly one space separates the transcript from adjacent non-space
    /// text on either side; the tracked offset advances to just past the
    /// inserted transcript, so back-to-back dictations land in order. Caret
    /// restoration and refocus are deferred onto the scheduler.
    pub fn insert_transcript(
        &mut self,
        surface: &mut dyn FieldSurface,
        transcript: &str,
        scheduler: &mut RenderScheduler,
    ) -> usize {
        let transcript = transcript.trim();
        if transcript.is_empty() {
            return self.offset;
        }

        let value = surface.value().to_string();
        let at = clamp_offset(&value, self.offset);
        if at != self.offset {
            debug!(
                field = %self.field_key,
                tracked = self.offset,
                clamped = at,
                "stale cursor offset clamped"
            );
        }
        let (before, after) = value.split_at(at);

        let mut inserted = String::with_capacity(transcript.len() + 2);
        if !before.is_empty() && !before.ends_with(char::is_whitespace) {
            inserted.push(' ');
        }
        inserted.push_str(transcript);
        // Caret lands right after the transcript, before any trailing
        // separator added for the text that follows.
        let caret = at + inserted.len();
        if !after.is_empty() && !after.starts_with(char::is_whitespace) {
            inserted.push(' ');
        }

        let mut new_value = String::with_capacity(value.len() + inserted.len());
        new_value.push_str(before);
        new_value.push_str(&inserted);
        new_value.push_str(after);
        surface.set_value(new_value);

        self.offset = caret;
        scheduler.defer(move |surface| {
            surface.set_caret(caret);
            surface.focus();
        });
        caret
    }
}

/// Clamp to the value's length and back off to a char boundary.
fn clamp_offset(value: &str, offset: usize) -> usize {
    let mut at = offset.min(value.len());
    while at > 0 && !value.is_char_boundary(at) {
        at -= 1;
    }
    at
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dictation::TextField;

    #[test]
    fn clamp_backs_off_to_char_boundary() {
        let value = "héllo";
        // byte 2 is inside the two-byte é
        assert_eq!(clamp_offset(value, 2), 1);
        assert_eq!(clamp_offset(value, 100), value.len());
        assert_eq!(clamp_offset(value, 0), 0);
    }

    #[test]
    fn empty_transcript_is_a_no_op() {
        let mut field = TextField::new("note");
        let mut tracker = CursorTracker::new("plan");
        let mut scheduler = RenderScheduler::new();
        tracker.note_caret(2);

        tracker.insert_transcript(&mut field, "   ", &mut scheduler);
        assert_eq!(field.value(), "note");
        assert!(scheduler.is_empty());
    }
}
