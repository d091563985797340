mod controller;
mod host;
mod keyboard;
mod progress;
mod runtime;

// Public API of the session subsystem.
pub use crate::error::SessionError;
pub use controller::{ExamSession, ExamSessionController, StartDisposition};
pub use host::{ExamSessionHost, OpenOutcome};
pub use keyboard::{Focus, Key, KeyPress, SHORTCUT_HELP, SessionIntent, intent_for_key};
pub use progress::SessionProgress;
pub use runtime::{HostCommand, SessionHandle, SessionView, spawn_session};
