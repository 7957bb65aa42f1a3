// Integration tests for cursor tracking and transcript insertion
//
// The insertion engine splices dictated text into a live field at the
// last-known caret, clamps stale offsets instead of failing, and defers
// caret restoration until the host has rendered the committed value.

use scribe_session::{CursorTracker, FieldSurface, RenderScheduler, TextField};

#[test]
fn inserts_at_tracked_caret_with_single_space_boundaries() {
    let mut field = TextField::new("Hello world");
    let mut tracker = CursorTracker::new("history");
    let mut scheduler = RenderScheduler::new();

    // Clinician clicked right after "Hello"
    tracker.note_caret(5);
    let caret = tracker.insert_transcript(&mut field, "there big", &mut scheduler);

    assert_eq!(field.value(), "Hello there big world");
    // Caret sits just past the inserted transcript
    assert_eq!(caret, "Hello there big".len());
}

#[test]
fn insertion_at_start_adds_no_leading_space() {
    let mut field = TextField::new("world");
    let mut tracker = CursorTracker::new("plan");
    let mut scheduler = RenderScheduler::new();

    tracker.note_caret(0);
    tracker.insert_transcript(&mut field, "Hello", &mut scheduler);

    assert_eq!(field.value(), "Hello world");
    assert_eq!(tracker.offset(), 5);
}

#[test]
fn insertion_into_empty_field_is_just_the_transcript() {
    let mut field = TextField::new("");
    let mut tracker = CursorTracker::new("plan");
    let mut scheduler = RenderScheduler::new();

    tracker.note_focus(&field);
    tracker.insert_transcript(&mut field, "Start antibiotics", &mut scheduler);

    assert_eq!(field.value(), "Start antibiotics");
    assert_eq!(tracker.offset(), field.value().len());
}

#[test]
fn stale_offset_clamps_to_end_of_text() {
    let mut field = TextField::new("0123456789");
    let mut tracker = CursorTracker::new("letter");
    let mut scheduler = RenderScheduler::new();

    // Tracked offset 50, but the value was truncated to 10 chars externally
    tracker.note_caret(50);
    tracker.insert_transcript(&mut field, "end", &mut scheduler);

    assert_eq!(field.value(), "0123456789 end");
    assert_eq!(tracker.offset(), field.value().len());
}

#[test]
fn external_truncation_between_edits_is_tolerated() {
    let mut field = TextField::new("a long paragraph of history text");
    let mut tracker = CursorTracker::new("history");
    let mut scheduler = RenderScheduler::new();

    tracker.note_caret(20);
    // Form reset shrank the value without a tracked caret update
    field.overwrite("short");
    tracker.insert_transcript(&mut field, "tail", &mut scheduler);

    assert_eq!(field.value(), "short tail");
}

#[test]
fn sequential_dictations_land_back_to_back() {
    let mut field = TextField::new("");
    let mut tracker = CursorTracker::new("plan");
    let mut scheduler = RenderScheduler::new();

    tracker.note_focus(&field);
    tracker.insert_transcript(&mut field, "T1", &mut scheduler);
    tracker.insert_transcript(&mut field, "T2", &mut scheduler);

    // Exactly one separating space, no overlap, no duplication
    assert_eq!(field.value(), "T1 T2");
    assert_eq!(tracker.offset(), 5);

    tracker.insert_transcript(&mut field, "T3", &mut scheduler);
    assert_eq!(field.value(), "T1 T2 T3");
}

#[test]
fn caret_restoration_waits_for_the_render_flush() {
    let mut field = TextField::new("note");
    field.set_caret(4);
    let mut tracker = CursorTracker::new("plan");
    let mut scheduler = RenderScheduler::new();

    tracker.note_focus(&field);
    field.blur();
    let caret = tracker.insert_transcript(&mut field, "added", &mut scheduler);

    // Value committed, but focus and caret wait for the render pass
    assert_eq!(field.value(), "note added");
    assert!(!field.is_focused());
    assert!(!scheduler.is_empty());

    scheduler.flush(&mut field);
    assert!(field.is_focused());
    assert_eq!(field.focus_count(), 1);
    assert_eq!(field.caret(), Some(caret));
    assert!(scheduler.is_empty());
}

#[test]
fn focus_without_caret_tracks_end_of_text() {
    let field = TextField::new("existing note");
    let mut tracker = CursorTracker::new("history");

    tracker.note_focus(&field);
    assert_eq!(tracker.offset(), "existing note".len());
}

#[test]
fn multibyte_boundary_offsets_are_clamped_to_char_boundaries() {
    let mut field = TextField::new("naïve");
    let mut tracker = CursorTracker::new("letter");
    let mut scheduler = RenderScheduler::new();

    // Byte 3 falls inside the two-byte ï
    tracker.note_caret(3);
    tracker.insert_transcript(&mut field, "X", &mut scheduler);

    // Insertion backed off to the nearest boundary rather than panicking
    assert_eq!(field.value(), "na X ïve");
}

#[test]
fn whitespace_boundaries_do_not_double_spaces() {
    let mut field = TextField::new("before  after");
    let mut tracker = CursorTracker::new("plan");
    let mut scheduler = RenderScheduler::new();

    // Caret between the two existing spaces
    tracker.note_caret(7);
    tracker.insert_transcript(&mut field, "mid", &mut scheduler);

    assert_eq!(field.value(), "before mid after");
}
