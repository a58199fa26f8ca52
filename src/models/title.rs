//! Title formatting and two-phase text input.
//!
//! Goal titles are capped at 22 characters and displayed as at most 3 lines of
//! 8 characters. Multi-keystroke composition (IME) input is buffered untouched
//! until the composition commits, so partially composed sequences are never cut.

/// Maximum number of characters kept in a title.
pub const MAX_TITLE_CHARS: usize = 22;

/// Characters per display line.
pub const LINE_WIDTH: usize = 8;

/// Maximum number of display lines.
pub const MAX_LINES: usize = 3;

/// Normalize raw input into a stored title.
///
/// Strips newlines, truncates to [`MAX_TITLE_CHARS`], wraps into lines of
/// [`LINE_WIDTH`] and keeps at most [`MAX_LINES`] lines.
pub fn format_title(raw: &str) -> String {
    let flat: Vec<char> = raw
        .chars()
        .filter(|c| *c != '\n' && *c != '\r')
        .take(MAX_TITLE_CHARS)
        .collect();

    flat.chunks(LINE_WIDTH)
        .take(MAX_LINES)
        .map(|line| line.iter().collect::<String>())
        .collect::<Vec<_>>()
        .join("\n")
}

/// Title text with display line breaks removed.
pub fn plain_title(title: &str) -> String {
    title.replace('\n', "")
}

/// Input phase of a title editor.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum InputState {
    /// Every keystroke commits immediately
    #[default]
    Idle,
    /// A composition is in progress; raw text is buffered uncapped
    Composing { buffer: String },
}

/// Two-phase input model for a single title field.
#[derive(Debug, Clone, Default)]
pub struct TitleInput {
    state: InputState,
}

impl TitleInput {
    /// Create an idle input.
    pub fn new() -> Self {
        Self::default()
    }

    /// Current input phase.
    pub fn state(&self) -> &InputState {
        &self.state
    }

    /// Whether a composition is in progress.
    pub fn is_composing(&self) -> bool {
        matches!(self.state, InputState::Composing { .. })
    }

    /// Raw buffered text while composing.
    pub fn buffer(&self) -> Option<&str> {
        match &self.state {
            InputState::Composing { buffer } => Some(buffer),
            InputState::Idle => None,
        }
    }

    /// Enter the composing phase.
    pub fn start_composition(&mut self) {
        if !self.is_composing() {
            self.state = InputState::Composing {
                buffer: String::new(),
            };
        }
    }

    /// Feed the current field value.
    ///
    /// Returns the formatted title to commit, or `None` while composing.
    pub fn input(&mut self, raw: &str) -> Option<String> {
        match &mut self.state {
            InputState::Composing { buffer } => {
                buffer.clear();
                buffer.push_str(raw);
                None
            }
            InputState::Idle => Some(format_title(raw)),
        }
    }

    /// Finish composing with the final field value and return the formatted title.
    pub fn end_composition(&mut self, raw: &str) -> String {
        self.state = InputState::Idle;
        format_title(raw)
    }

    /// Drop any buffered composition without committing.
    pub fn cancel(&mut self) {
        self.state = InputState::Idle;
    }
}
