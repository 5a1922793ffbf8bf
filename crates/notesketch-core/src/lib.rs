//! NoteSketch Core Library
//!
//! Freehand drawing for notes: a raster stroke canvas with tool presets,
//! snapshot undo/redo, PNG export and media upload.

pub mod canvas;
pub mod color;
pub mod config;
pub mod history;
pub mod input;
pub mod media;
pub mod raster;
pub mod session;
pub mod stroke;
pub mod surface;
pub mod tools;
pub mod upload;

#[cfg(test)]
mod testing;

pub use canvas::{CanvasEvent, PendingSave, SaveOutcome, SaveState, StrokeCanvas};
pub use color::{ColorParseError, InkColor};
pub use config::{CanvasConfig, ConfigError};
pub use history::{History, MAX_HISTORY_BYTES, MAX_UNDO_HISTORY};
pub use input::{InputPoint, PointerEvent};
pub use media::{MediaItem, MediaKind, MediaResponse, NoteId};
pub use session::{EditorSession, SessionCommand};
pub use stroke::StrokeParams;
pub use surface::{ExportError, Surface, Viewport};
pub use tools::{BlendMode, LineCap, LineJoin, ToolKind, ToolPreset, UnknownTool};
pub use upload::{MemoryUploader, UploadError, UploadResult, Uploader};

#[cfg(feature = "http")]
pub use upload::HttpUploader;
