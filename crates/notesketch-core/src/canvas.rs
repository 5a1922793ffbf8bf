//! The stroke canvas: drawing view state for one note at a time.

use crate::color::InkColor;
use crate::config::CanvasConfig;
use crate::history::{History, Step};
use crate::input::{InputPoint, PointerEvent};
use crate::media::{MediaItem, NoteId};
use crate::stroke::{StrokeParams, StrokeSession};
use crate::surface::{ExportError, Surface, Viewport};
use crate::tools::{ToolKind, UnknownTool};
use crate::upload::{UploadResult, Uploader};
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};
use uuid::Uuid;

/// Notifications for the surrounding view controller.
#[derive(Debug, Clone, PartialEq)]
pub enum CanvasEvent {
    /// The drawing view opened for a note.
    Opened(NoteId),
    /// The drawing view closed; its surface and history are gone.
    Closed,
    /// A drawing was uploaded and acknowledged.
    Saved { note_id: NoteId, media: MediaItem },
    /// The page should reload the note to show the new media.
    RefreshRequested,
}

/// Whether a save is outstanding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SaveState {
    #[default]
    Idle,
    Saving,
}

/// Result of [`StrokeCanvas::save`].
#[derive(Debug, Clone, PartialEq)]
pub enum SaveOutcome {
    /// No note is bound; nothing happened.
    Unbound,
    /// A save is already outstanding; nothing happened.
    Busy,
    /// Uploaded and acknowledged; the view is closed.
    Saved(MediaItem),
    /// Not acknowledged; the view stays open.
    Failed,
    /// No save was outstanding for that note; nothing happened.
    Ignored,
}

/// A drawing encoded and ready to hand to the uploader.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingSave {
    pub note_id: NoteId,
    pub filename: String,
    pub png: Vec<u8>,
}

/// Unique, time-based filename for a saved drawing.
pub fn drawing_filename() -> String {
    let millis = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis())
        .unwrap_or(0);
    let suffix = Uuid::new_v4().simple().to_string();
    format!("drawing_{}_{}.png", millis, &suffix[..8])
}

/// Raster drawing surface with tool presets and undo/redo.
///
/// The canvas is owned by one view controller (see
/// [`EditorSession`](crate::EditorSession)), which pushes the note id in and
/// drains [`CanvasEvent`]s out.
pub struct StrokeCanvas {
    uploader: Arc<dyn Uploader>,
    note_id: Option<NoteId>,
    open: bool,
    viewport: Viewport,
    surface: Surface,
    history: History,
    /// Live pixels differ from the history entry under the cursor.
    dirty: bool,
    stroke: Option<StrokeSession>,
    tool: ToolKind,
    color: InkColor,
    save_state: SaveState,
    events: Vec<CanvasEvent>,
}

impl std::fmt::Debug for StrokeCanvas {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StrokeCanvas")
            .field("note_id", &self.note_id)
            .field("open", &self.open)
            .field("viewport", &self.viewport)
            .field("history_len", &self.history.len())
            .field("cursor", &self.history.cursor())
            .field("dirty", &self.dirty)
            .field("tool", &self.tool)
            .field("color", &self.color)
            .field("save_state", &self.save_state)
            .finish()
    }
}

impl StrokeCanvas {
    /// Create a closed canvas with default configuration.
    pub fn new(uploader: Arc<dyn Uploader>) -> Self {
        Self::with_config(uploader, CanvasConfig::default())
    }

    /// Create a closed canvas.
    pub fn with_config(uploader: Arc<dyn Uploader>, config: CanvasConfig) -> Self {
        Self {
            uploader,
            note_id: None,
            open: false,
            viewport: config.viewport,
            surface: Surface::new(config.viewport),
            history: History::with_budget(config.max_history, config.max_history_bytes),
            dirty: false,
            stroke: None,
            tool: config.default_tool,
            color: config.default_color,
            save_state: SaveState::Idle,
            events: Vec::new(),
        }
    }

    pub fn note_id(&self) -> Option<NoteId> {
        self.note_id
    }

    pub fn is_open(&self) -> bool {
        self.open
    }

    pub fn viewport(&self) -> Viewport {
        self.viewport
    }

    pub fn surface(&self) -> &Surface {
        &self.surface
    }

    pub fn history(&self) -> &History {
        &self.history
    }

    pub fn tool(&self) -> ToolKind {
        self.tool
    }

    pub fn color(&self) -> InkColor {
        self.color
    }

    pub fn save_state(&self) -> SaveState {
        self.save_state
    }

    /// Whether a stroke is in progress.
    pub fn is_drawing(&self) -> bool {
        self.stroke.is_some()
    }

    /// Take the pending notifications.
    pub fn drain_events(&mut self) -> Vec<CanvasEvent> {
        std::mem::take(&mut self.events)
    }

    /// Bind (or unbind) the note a save will target, without opening the view.
    pub fn bind(&mut self, note_id: Option<NoteId>) {
        self.note_id = note_id;
    }

    /// Open the drawing view for `note_id` with a fresh surface and history.
    pub fn open(&mut self, note_id: NoteId) {
        self.note_id = Some(note_id);
        self.open = true;
        self.reset();
        log::debug!(
            "Drawing view opened for note {} ({}x{} px)",
            note_id,
            self.surface.width(),
            self.surface.height()
        );
        self.events.push(CanvasEvent::Opened(note_id));
    }

    /// Close the drawing view, discarding the drawing.
    pub fn close(&mut self) {
        self.open = false;
        self.reset();
        log::debug!("Drawing view closed");
        self.events.push(CanvasEvent::Closed);
    }

    fn reset(&mut self) {
        self.stroke = None;
        self.surface = Surface::new(self.viewport);
        self.history.clear();
        self.dirty = false;
        self.save_state = SaveState::Idle;
    }

    pub fn set_tool(&mut self, tool: ToolKind) {
        self.tool = tool;
    }

    /// Select a tool by its toolbar name.
    pub fn set_tool_named(&mut self, name: &str) -> Result<(), UnknownTool> {
        self.tool = name.parse()?;
        Ok(())
    }

    pub fn set_color(&mut self, color: InkColor) {
        self.color = color;
    }

    fn accepts_input(&self) -> bool {
        self.open && self.save_state == SaveState::Idle
    }

    /// Dispatch a unified pointer event.
    pub fn handle_pointer(&mut self, event: PointerEvent) -> Option<StrokeParams> {
        match event {
            PointerEvent::Down(point) => {
                self.pointer_down(point);
                None
            }
            PointerEvent::Move(point) => self.pointer_move(point),
            PointerEvent::Up | PointerEvent::Leave => {
                self.pointer_up();
                None
            }
        }
    }

    /// Capture the current pixels into history unless they already are the
    /// entry under the cursor, discarding the redo branch.
    fn checkpoint(&mut self) {
        if self.dirty {
            self.history.push(self.surface.snapshot());
            self.dirty = false;
        } else {
            self.history.truncate_future();
        }
    }

    /// Begin a stroke at `point`.
    pub fn pointer_down(&mut self, point: InputPoint) {
        if !self.accepts_input() {
            return;
        }
        if self.stroke.is_some() {
            self.pointer_up();
        }
        self.checkpoint();
        self.stroke = Some(StrokeSession::begin(self.tool, point, self.surface.snapshot()));
    }

    /// Extend the active stroke to `point`. Returns the parameters applied,
    /// or `None` when no stroke is active.
    pub fn pointer_move(&mut self, point: InputPoint) -> Option<StrokeParams> {
        if !self.accepts_input() {
            return None;
        }
        let stroke = self.stroke.as_mut()?;

        let params = stroke.params_to(self.color, &point);
        self.surface.set_blend(params.blend);
        self.surface.set_opacity(params.opacity);

        if let Some(rect) = stroke.extend(point, &params, self.surface.scale_factor()) {
            self.surface
                .composite(stroke.base(), stroke.mask(), params.color, rect);
            self.dirty = true;
        }
        Some(params)
    }

    /// End the active stroke and restore default compositing.
    pub fn pointer_up(&mut self) {
        if let Some(stroke) = self.stroke.take() {
            log::trace!("{} stroke ended after {} segments", stroke.tool(), stroke.segments());
        }
        self.surface.reset_compositing();
    }

    /// Whether `undo` would change anything.
    pub fn can_undo(&self) -> bool {
        self.dirty || self.history.can_undo()
    }

    /// Whether `redo` would change anything.
    pub fn can_redo(&self) -> bool {
        !self.dirty && self.history.can_redo()
    }

    /// Step back one stroke. Returns whether anything changed.
    pub fn undo(&mut self) -> bool {
        self.pointer_up();
        if self.dirty {
            // Keep the newest stroke so redo can bring it back.
            self.history.push(self.surface.snapshot());
            self.dirty = false;
        }

        match self.history.undo() {
            Some(Step::Restore(snapshot)) => self.surface.restore(snapshot),
            Some(Step::Cleared) => self.surface.clear(),
            None => return false,
        }
        log::debug!("Undo, cursor now {:?}", self.history.cursor());
        true
    }

    /// Step forward one stroke. Returns whether anything changed.
    pub fn redo(&mut self) -> bool {
        self.pointer_up();
        if self.dirty {
            return false;
        }

        match self.history.redo() {
            Some(snapshot) => self.surface.restore(snapshot),
            None => return false,
        }
        log::debug!("Redo, cursor now {:?}", self.history.cursor());
        true
    }

    /// Wipe the drawing as an undoable step.
    pub fn clear(&mut self) {
        self.pointer_up();
        if self.surface.is_blank() {
            return;
        }
        self.checkpoint();
        self.surface.clear();
        self.dirty = true;
    }

    /// Resize the surface for a new viewport, keeping the current drawing.
    pub fn resize(&mut self, viewport: Viewport) {
        // The stroke's base image and mask are sized for the old surface.
        self.pointer_up();
        self.viewport = viewport;
        self.surface.resize(viewport);

        if !self.dirty {
            if let Some(current) = self.history.current() {
                self.surface.restore(current);
            }
        }
    }

    /// Encode the current drawing as PNG.
    pub fn export_png(&self) -> Result<Vec<u8>, ExportError> {
        self.surface.to_png()
    }

    /// Encode the drawing for upload and enter [`SaveState::Saving`].
    ///
    /// Returns `None` when no note is bound, a save is outstanding, or
    /// encoding fails. Drawing input is ignored until [`finish_save`](Self::finish_save).
    pub fn begin_save(&mut self) -> Option<PendingSave> {
        let note_id = self.note_id?;
        if self.save_state == SaveState::Saving {
            return None;
        }
        self.pointer_up();

        let png = match self.surface.to_png() {
            Ok(png) => png,
            Err(e) => {
                log::error!("Failed to encode drawing for note {}: {}", note_id, e);
                return None;
            }
        };
        self.save_state = SaveState::Saving;
        Some(PendingSave {
            note_id,
            filename: drawing_filename(),
            png,
        })
    }

    /// Apply the uploader's answer for a save started with [`begin_save`](Self::begin_save).
    ///
    /// Answers for a note other than the bound one, or arriving when no save
    /// is outstanding, are ignored.
    pub fn finish_save(&mut self, note_id: NoteId, result: UploadResult<MediaItem>) -> SaveOutcome {
        if self.save_state != SaveState::Saving || self.note_id != Some(note_id) {
            log::debug!("Stale save answer for note {} ignored", note_id);
            return SaveOutcome::Ignored;
        }
        self.save_state = SaveState::Idle;
        match result {
            Ok(media) => {
                log::info!("Saved drawing for note {} as {}", note_id, media.url);
                self.events.push(CanvasEvent::Saved {
                    note_id,
                    media: media.clone(),
                });
                self.close();
                self.events.push(CanvasEvent::RefreshRequested);
                SaveOutcome::Saved(media)
            }
            Err(e) => {
                // The view stays open; the save affordance just resets.
                log::warn!("Saving drawing for note {} failed: {}", note_id, e);
                SaveOutcome::Failed
            }
        }
    }

    /// Encode, upload and, on acknowledgement, close the view.
    pub async fn save(&mut self) -> SaveOutcome {
        if self.note_id.is_none() {
            log::debug!("Save ignored: no note bound");
            return SaveOutcome::Unbound;
        }
        if self.save_state == SaveState::Saving {
            return SaveOutcome::Busy;
        }
        let Some(pending) = self.begin_save() else {
            return SaveOutcome::Failed;
        };

        let uploader = Arc::clone(&self.uploader);
        let result = uploader
            .submit(pending.note_id, &pending.filename, pending.png)
            .await;
        self.finish_save(pending.note_id, result)
    }
}
