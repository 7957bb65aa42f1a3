/// The live text field as the insertion engine sees it.
///
/// The surrounding form owns the text; the engine reads the current value,
/// commits a new one, and restores caret/focus through this seam. Offsets are
/// byte offsets into the value.
pub trait FieldSurface {
    fn value(&self) -> &str;
    fn set_value(&mut self, value: String);
    /// Current caret position, if the field has one
    fn caret(&self) -> Option<usize>;
    fn set_caret(&mut self, offset: usize);
    fn focus(&mut self);
}

/// Plain in-memory field, used by tests and the demo binary as the host form
/// stand-in.
#[derive(Debug, Default)]
pub struct TextField {
    value: String,
    caret: Option<usize>,
    focused: bool,
    focus_count: usize,
}

impl TextField {
    pub fn new(value: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            ..Self::default()
        }
    }

    pub fn is_focused(&self) -> bool {
        self.focused
    }

    /// How many times focus was restored, for asserting deferred refocus
    pub fn focus_count(&self) -> usize {
        self.focus_count
    }

    pub fn blur(&mut self) {
        self.focused = false;
    }

    /// Simulate an external edit the tracker never saw (e.g. a form reset)
    pub fn overwrite(&mut self, value: impl Into<String>) {
        self.value = value.into();
        self.caret = None;
    }
}

impl FieldSurface for TextField {
    fn value(&self) -> &str {
        &self.value
    }

    fn set_value(&mut self, value: String) {
        self.value = value;
    }

    fn caret(&self) -> Option<usize> {
        self.caret
    }

    fn set_caret(&mut self, offset: usize) {
        self.caret = Some(offset.min(self.value.len()));
    }

    fn focus(&mut self) {
        self.focused = true;
        self.focus_count += 1;
    }
}
