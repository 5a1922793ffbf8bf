//! Editor session: the note page's view controller.
//!
//! The session owns the active note and the drawing canvas, and is the single
//! writer for both. Toolbar buttons, keyboard shortcuts and pointer input are
//! all expressed as [`SessionCommand`]s.

use crate::canvas::{CanvasEvent, SaveOutcome, StrokeCanvas};
use crate::color::InkColor;
use crate::config::CanvasConfig;
use crate::input::PointerEvent;
use crate::media::NoteId;
use crate::surface::Viewport;
use crate::tools::ToolKind;
use crate::upload::Uploader;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// A user intent routed to the session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "command", content = "value", rename_all = "snake_case")]
pub enum SessionCommand {
    SelectNote(NoteId),
    DeselectNote,
    /// Open the drawing view for the active note. Ignored without one.
    OpenDrawing,
    CloseDrawing,
    SelectTool(ToolKind),
    SelectColor(InkColor),
    Undo,
    Redo,
    Clear,
    Pointer(PointerEvent),
    Resize(Viewport),
}

/// Owns the active note and its drawing canvas.
#[derive(Debug)]
pub struct EditorSession {
    active_note: Option<NoteId>,
    canvas: StrokeCanvas,
}

impl EditorSession {
    pub fn new(uploader: Arc<dyn Uploader>) -> Self {
        Self::with_config(uploader, CanvasConfig::default())
    }

    pub fn with_config(uploader: Arc<dyn Uploader>, config: CanvasConfig) -> Self {
        Self {
            active_note: None,
            canvas: StrokeCanvas::with_config(uploader, config),
        }
    }

    pub fn active_note(&self) -> Option<NoteId> {
        self.active_note
    }

    pub fn canvas(&self) -> &StrokeCanvas {
        &self.canvas
    }

    /// Apply one command.
    pub fn apply(&mut self, command: SessionCommand) {
        match command {
            SessionCommand::SelectNote(note_id) => {
                if self.canvas.is_open() && self.active_note != Some(note_id) {
                    self.canvas.close();
                }
                self.active_note = Some(note_id);
                self.canvas.bind(Some(note_id));
            }
            SessionCommand::DeselectNote => {
                if self.canvas.is_open() {
                    self.canvas.close();
                }
                self.active_note = None;
                self.canvas.bind(None);
            }
            SessionCommand::OpenDrawing => match self.active_note {
                Some(note_id) => self.canvas.open(note_id),
                None => log::debug!("Open drawing ignored: no active note"),
            },
            SessionCommand::CloseDrawing => {
                if self.canvas.is_open() {
                    self.canvas.close();
                }
            }
            SessionCommand::SelectTool(tool) => self.canvas.set_tool(tool),
            SessionCommand::SelectColor(color) => self.canvas.set_color(color),
            SessionCommand::Undo => {
                self.canvas.undo();
            }
            SessionCommand::Redo => {
                self.canvas.redo();
            }
            SessionCommand::Clear => self.canvas.clear(),
            SessionCommand::Pointer(event) => {
                self.canvas.handle_pointer(event);
            }
            SessionCommand::Resize(viewport) => self.canvas.resize(viewport),
        }
    }

    /// Save the open drawing to the active note.
    pub async fn save(&mut self) -> SaveOutcome {
        self.canvas.save().await
    }

    /// Take the canvas notifications.
    pub fn drain_events(&mut self) -> Vec<CanvasEvent> {
        self.canvas.drain_events()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::input::InputPoint;
    use crate::testing::block_on;
    use crate::upload::MemoryUploader;

    fn session() -> (EditorSession, Arc<MemoryUploader>) {
        let uploader = Arc::new(MemoryUploader::new());
        let config = CanvasConfig {
            viewport: Viewport::new(64.0, 64.0, 1.0),
            ..CanvasConfig::default()
        };
        (EditorSession::with_config(uploader.clone(), config), uploader)
    }

    fn draw(session: &mut EditorSession) {
        session.apply(SessionCommand::Pointer(PointerEvent::Down(InputPoint::new(8.0, 20.0, 0.0))));
        session.apply(SessionCommand::Pointer(PointerEvent::Move(InputPoint::new(56.0, 20.0, 16.0))));
        session.apply(SessionCommand::Pointer(PointerEvent::Up));
    }

    #[test]
    fn test_open_without_note_is_ignored() {
        let (mut session, _) = session();
        session.apply(SessionCommand::OpenDrawing);
        assert!(!session.canvas().is_open());
        assert!(session.drain_events().is_empty());
    }

    #[test]
    fn test_select_note_then_open() {
        let (mut session, _) = session();
        session.apply(SessionCommand::SelectNote(NoteId(3)));
        session.apply(SessionCommand::OpenDrawing);
        assert!(session.canvas().is_open());
        assert_eq!(session.drain_events(), vec![CanvasEvent::Opened(NoteId(3))]);
    }

    #[test]
    fn test_switching_note_closes_drawing() {
        let (mut session, _) = session();
        session.apply(SessionCommand::SelectNote(NoteId(3)));
        session.apply(SessionCommand::OpenDrawing);
        draw(&mut session);
        session.apply(SessionCommand::SelectNote(NoteId(4)));

        assert!(!session.canvas().is_open());
        assert_eq!(session.canvas().note_id(), Some(NoteId(4)));
        assert!(session.canvas().surface().is_blank());
    }

    #[test]
    fn test_commands_reach_canvas() {
        let (mut session, _) = session();
        session.apply(SessionCommand::SelectNote(NoteId(3)));
        session.apply(SessionCommand::OpenDrawing);
        session.apply(SessionCommand::SelectTool(ToolKind::Marker));
        session.apply(SessionCommand::SelectColor(InkColor::new(255, 0, 0, 255)));
        assert_eq!(session.canvas().tool(), ToolKind::Marker);
        assert_eq!(session.canvas().color(), InkColor::new(255, 0, 0, 255));

        draw(&mut session);
        assert!(!session.canvas().surface().is_blank());
        session.apply(SessionCommand::Undo);
        assert!(session.canvas().surface().is_blank());
        session.apply(SessionCommand::Redo);
        assert!(!session.canvas().surface().is_blank());
        session.apply(SessionCommand::Clear);
        assert!(session.canvas().surface().is_blank());
    }

    #[test]
    fn test_save_goes_to_active_note() {
        let (mut session, uploader) = session();
        session.apply(SessionCommand::SelectNote(NoteId(42)));
        session.apply(SessionCommand::OpenDrawing);
        draw(&mut session);

        let outcome = block_on(session.save());
        assert!(matches!(outcome, SaveOutcome::Saved(_)));
        assert_eq!(uploader.submissions()[0].note_id, NoteId(42));
        assert!(!session.canvas().is_open());
        assert_eq!(session.active_note(), Some(NoteId(42)));
    }

    #[test]
    fn test_save_without_note() {
        let (mut session, uploader) = session();
        assert_eq!(block_on(session.save()), SaveOutcome::Unbound);
        assert!(uploader.submissions().is_empty());
    }

    #[test]
    fn test_command_json() {
        let cmd: SessionCommand =
            serde_json::from_str(r#"{"command":"select_tool","value":"highlighter"}"#).unwrap();
        assert_eq!(cmd, SessionCommand::SelectTool(ToolKind::Highlighter));
        let undo: SessionCommand = serde_json::from_str(r#"{"command":"undo"}"#).unwrap();
        assert_eq!(undo, SessionCommand::Undo);
    }
}
