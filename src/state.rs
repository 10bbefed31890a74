//! The viewer's state, folded from the stream of update messages.
//!
//! The state is never modified in place: applying a message consumes the old state and returns a
//! new one. A diff snapshot that fails to project leaves the previously displayed columns alone.

use crate::message::Message;
use crate::project::{self, Columns};
use log::{error, info};
use serde::Serialize;
use strum::Display;

/// What the viewer is currently showing.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ViewState {
    /// The most recent successfully projected diff.
    columns: Option<Columns>,
    /// Whether a rebuild is in progress.
    building: bool,
    /// The last build error, if the last build failed.
    build_error: Option<String>,
    /// Why the last diff snapshot was rejected, if it was.
    projection_error: Option<String>,
    /// Whether the rebuilt binary matched the original.
    matched: bool,
}

/// The overlay shown on top of the diff.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, Serialize)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum Overlay {
    Loading,
    Error,
    Match,
}

/// The status summary displayed with a frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "state", content = "message", rename_all = "snake_case")]
pub enum Status<'a> {
    Idle,
    Building,
    Matched,
    BuildError(&'a str),
    InvalidDiff(&'a str),
}

impl Status<'_> {
    pub fn overlay(&self) -> Option<Overlay> {
        match self {
            Status::Idle => None,
            Status::Building => Some(Overlay::Loading),
            Status::Matched => Some(Overlay::Match),
            Status::BuildError(_) | Status::InvalidDiff(_) => Some(Overlay::Error),
        }
    }
}

/// A change to the environment outside of the rendered output.
///
/// Renderers only write to their writer. Anything else the viewer does in reaction to a state
/// change, like retitling the terminal window, is described by one of these and applied by the
/// caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PresentationEffect {
    /// An overlay is showing.
    ShowOverlay { overlay: Overlay, title: String },
    /// No overlay is showing.
    Clear { title: String },
}

impl PresentationEffect {
    pub fn title(&self) -> &str {
        match self {
            PresentationEffect::ShowOverlay { title, .. } | PresentationEffect::Clear { title } => {
                title
            }
        }
    }
}

/// Everything needed to draw the current state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame<'a> {
    pub columns: Option<&'a Columns>,
    pub status: Status<'a>,
    pub effect: PresentationEffect,
}

/// The title used for the terminal window.
const TITLE: &str = "romdiff";

impl ViewState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn columns(&self) -> Option<&Columns> {
        self.columns.as_ref()
    }

    /// Return the state that results from applying `message`.
    pub fn apply(self, message: Message) -> Self {
        match message {
            Message::Building => {
                info!("Rebuild started");
                ViewState {
                    building: true,
                    build_error: None,
                    projection_error: None,
                    matched: false,
                    ..self
                }
            }
            Message::Diff(operations) => match project::project_raw(operations) {
                Ok(columns) => {
                    info!("Received a diff with {} rows", columns.len());
                    ViewState {
                        columns: Some(columns),
                        building: false,
                        projection_error: None,
                        ..self
                    }
                }
                Err(e) => {
                    error!("Discarding diff update: {e}");
                    ViewState {
                        building: false,
                        projection_error: Some(e.to_string()),
                        ..self
                    }
                }
            },
            Message::Match => ViewState {
                building: false,
                matched: true,
                ..self
            },
            Message::BuildError(output) => {
                info!("Rebuild failed");
                ViewState {
                    building: false,
                    build_error: Some(output),
                    ..self
                }
            }
        }
    }

    /// The status to display. Errors take priority over a running build, which takes priority
    /// over a match.
    pub fn status(&self) -> Status<'_> {
        if let Some(e) = &self.projection_error {
            Status::InvalidDiff(e)
        } else if let Some(e) = &self.build_error {
            Status::BuildError(e)
        } else if self.building {
            Status::Building
        } else if self.matched {
            Status::Matched
        } else {
            Status::Idle
        }
    }

    /// Derive the frame for the current state.
    pub fn frame(&self) -> Frame<'_> {
        let status = self.status();
        let effect = match status.overlay() {
            Some(overlay) => PresentationEffect::ShowOverlay {
                overlay,
                title: format!("{TITLE} ({overlay})"),
            },
            None => PresentationEffect::Clear {
                title: TITLE.into(),
            },
        };
        Frame {
            columns: self.columns(),
            status,
            effect,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diff::RawDiffOperation;
    use pretty_assertions::assert_eq;

    fn raw(opcode: &str, address: u64, size: u64, text: &str) -> RawDiffOperation {
        serde_json::from_value(serde_json::json!({
            "opcode": opcode,
            "kind": "code",
            "address": address,
            "size": size,
            "text": text,
        }))
        .unwrap()
    }

    fn valid_diff() -> Message {
        Message::Diff(vec![raw(" ", 0, 2, "push {lr}"), raw("+", 2, 2, "bx lr")])
    }

    #[test]
    fn test_initial_state() {
        let state = ViewState::new();
        assert_eq!(state.status(), Status::Idle);
        assert!(state.columns().is_none());
        assert_eq!(
            state.frame().effect,
            PresentationEffect::Clear {
                title: "romdiff".into()
            }
        );
    }

    #[test]
    fn test_build_cycle() {
        let state = ViewState::new().apply(Message::Building);
        assert_eq!(state.status(), Status::Building);
        assert_eq!(state.frame().effect.title(), "romdiff (loading)");

        let state = state.apply(valid_diff());
        assert_eq!(state.status(), Status::Idle);
        assert_eq!(state.columns().unwrap().len(), 2);

        let state = state.apply(Message::Match);
        assert_eq!(state.status(), Status::Matched);
        assert_eq!(state.frame().status.overlay(), Some(Overlay::Match));
    }

    #[test]
    fn test_build_error_is_cleared_by_next_build() {
        let state = ViewState::new().apply(Message::BuildError("error: expected ';'".into()));
        assert_eq!(state.status(), Status::BuildError("error: expected ';'"));
        let state = state.apply(Message::Building);
        assert_eq!(state.status(), Status::Building);
    }

    #[test]
    fn test_invalid_diff_keeps_previous_columns() {
        let state = ViewState::new().apply(valid_diff());
        let previous = state.columns().cloned();

        let state = state.apply(Message::Diff(vec![
            raw(" ", 0, 2, "nop"),
            raw(" ", 8, 2, "nop"),
        ]));
        assert_eq!(state.columns().cloned(), previous);
        assert!(matches!(state.status(), Status::InvalidDiff(_)));
        assert!(matches!(
            state.frame().effect,
            PresentationEffect::ShowOverlay {
                overlay: Overlay::Error,
                ..
            }
        ));
    }

    #[test]
    fn test_unrecognized_opcode_is_reported() {
        let state = ViewState::new().apply(Message::Diff(vec![raw("x", 0, 2, "nop")]));
        let Status::InvalidDiff(message) = state.status() else {
            panic!("expected an invalid diff status");
        };
        assert!(message.contains("\"x\""), "{message}");
    }

    #[test]
    fn test_valid_diff_clears_projection_error() {
        let state = ViewState::new()
            .apply(Message::Diff(vec![raw("?", 0, 2, "nop")]))
            .apply(valid_diff());
        assert_eq!(state.status(), Status::Idle);
    }
}
