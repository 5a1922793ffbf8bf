//! Drawing tools and their presets.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Error for a tool name that has no preset.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Unknown drawing tool: {0}")]
pub struct UnknownTool(pub String);

/// Available drawing tools.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ToolKind {
    #[default]
    Pen,
    Pencil,
    Fountain,
    Marker,
    Highlighter,
    Airbrush,
    Eraser,
}

impl ToolKind {
    /// Every tool, in toolbar order.
    pub const ALL: [ToolKind; 7] = [
        ToolKind::Pen,
        ToolKind::Pencil,
        ToolKind::Fountain,
        ToolKind::Marker,
        ToolKind::Highlighter,
        ToolKind::Airbrush,
        ToolKind::Eraser,
    ];

    /// Name used by toolbar buttons and configuration.
    pub fn name(self) -> &'static str {
        match self {
            ToolKind::Pen => "pen",
            ToolKind::Pencil => "pencil",
            ToolKind::Fountain => "fountain",
            ToolKind::Marker => "marker",
            ToolKind::Highlighter => "highlighter",
            ToolKind::Airbrush => "airbrush",
            ToolKind::Eraser => "eraser",
        }
    }

    /// The immutable preset for this tool.
    pub fn preset(self) -> &'static ToolPreset {
        match self {
            ToolKind::Pen => &PEN,
            ToolKind::Pencil => &PENCIL,
            ToolKind::Fountain => &FOUNTAIN,
            ToolKind::Marker => &MARKER,
            ToolKind::Highlighter => &HIGHLIGHTER,
            ToolKind::Airbrush => &AIRBRUSH,
            ToolKind::Eraser => &ERASER,
        }
    }

    /// Whether this tool removes ink instead of laying it down.
    pub fn is_eraser(self) -> bool {
        self == ToolKind::Eraser
    }
}

impl fmt::Display for ToolKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for ToolKind {
    type Err = UnknownTool;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ToolKind::ALL
            .into_iter()
            .find(|tool| tool.name() == s)
            .ok_or_else(|| UnknownTool(s.to_string()))
    }
}

/// How a stroke is composited onto the surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
pub enum BlendMode {
    /// Paint over existing pixels.
    #[default]
    SourceOver,
    /// Darken by multiplying with existing pixels.
    Multiply,
    /// Remove existing pixels where the stroke covers them.
    DestinationOut,
}

/// Shape drawn at the open ends of a stroke.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum LineCap {
    Butt,
    #[default]
    Round,
    Square,
}

/// Shape drawn where two segments of a stroke meet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum LineJoin {
    #[default]
    Round,
    Bevel,
    Miter,
}

/// Rendering configuration of one tool. Presets are read-only.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ToolPreset {
    /// Line width in CSS pixels.
    pub width: f64,
    /// Stroke opacity in `0.0..=1.0`.
    pub opacity: f64,
    /// Declared composite mode (the eraser's is overridden while drawing).
    pub composite: BlendMode,
    pub cap: LineCap,
    pub join: LineJoin,
    /// Width follows pointer speed instead of `width`.
    pub velocity_width: bool,
    /// Radius in CSS pixels of the soft falloff around the stroke, 0 for a hard edge.
    pub soft_edge: f64,
}

impl ToolPreset {
    const fn solid(width: f64, opacity: f64, composite: BlendMode) -> Self {
        Self {
            width,
            opacity,
            composite,
            cap: LineCap::Round,
            join: LineJoin::Round,
            velocity_width: false,
            soft_edge: 0.0,
        }
    }
}

pub static PEN: ToolPreset = ToolPreset::solid(3.0, 1.0, BlendMode::SourceOver);

pub static PENCIL: ToolPreset = ToolPreset::solid(1.5, 0.85, BlendMode::SourceOver);

pub static FOUNTAIN: ToolPreset = ToolPreset {
    velocity_width: true,
    ..ToolPreset::solid(10.0, 1.0, BlendMode::SourceOver)
};

pub static MARKER: ToolPreset = ToolPreset {
    cap: LineCap::Square,
    join: LineJoin::Miter,
    ..ToolPreset::solid(8.0, 0.7, BlendMode::Multiply)
};

pub static HIGHLIGHTER: ToolPreset = ToolPreset {
    cap: LineCap::Butt,
    join: LineJoin::Bevel,
    ..ToolPreset::solid(20.0, 0.35, BlendMode::Multiply)
};

pub static AIRBRUSH: ToolPreset = ToolPreset {
    soft_edge: 6.0,
    ..ToolPreset::solid(14.0, 0.4, BlendMode::SourceOver)
};

/// Declared as source-over; drawing forces destination-out.
pub static ERASER: ToolPreset = ToolPreset::solid(20.0, 1.0, BlendMode::SourceOver);
