use exam_core::model::OptionId;

/// A key press as reported by the presentation layer.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Key {
    ArrowLeft,
    ArrowRight,
    Character(char),
    Other,
}

/// Where keyboard focus was when the key was pressed.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Focus {
    #[default]
    Page,
    /// A text input or text area; shortcuts are suppressed.
    TextInput,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct KeyPress {
    pub key: Key,
    pub focus: Focus,
}

impl KeyPress {
    #[must_use]
    pub fn new(key: Key) -> Self {
        Self {
            key,
            focus: Focus::Page,
        }
    }

    #[must_use]
    pub fn in_text_input(mut self) -> Self {
        self.focus = Focus::TextInput;
        self
    }
}

/// User intents the session host understands.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SessionIntent {
    Previous,
    Next,
    GoTo(usize),
    /// Select an option for the question in view.
    Answer(OptionId),
    /// Toggle the review flag on the question in view.
    ToggleFlag,
    ShowHelp,
    Submit,
}

/// Human-readable summary of the shortcuts below.
pub const SHORTCUT_HELP: &str = "Shortcuts: ←→ navigate • A/B/C/D select • F flag • ? help";

/// Map a key press to an intent. Returns `None` for unmapped keys and for any
/// key typed into a text input.
#[must_use]
pub fn intent_for_key(press: &KeyPress) -> Option<SessionIntent> {
    if press.focus == Focus::TextInput {
        return None;
    }

    match &press.key {
        Key::ArrowLeft => Some(SessionIntent::Previous),
        Key::ArrowRight => Some(SessionIntent::Next),
        Key::Character(c) => match c.to_ascii_lowercase() {
            option @ 'a'..='d' => Some(SessionIntent::Answer(OptionId::new(option.to_string()))),
            'f' => Some(SessionIntent::ToggleFlag),
            '?' => Some(SessionIntent::ShowHelp),
            _ => None,
        },
        Key::Other => None,
    }
}
