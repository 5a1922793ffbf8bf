//! The transient stroke session between pointer-down and pointer-up.

use crate::color::InkColor;
use crate::input::InputPoint;
use crate::raster::{CoverageMask, PixelRect, Segment};
use crate::tools::{BlendMode, ToolKind, ToolPreset};
use image::RgbaImage;
use kurbo::Point;
use serde::Serialize;

/// Widest line the velocity-based width produces.
pub const VELOCITY_MAX_WIDTH: f64 = 10.0;
/// How much width is lost per pixel/millisecond of pointer speed.
pub const VELOCITY_WIDTH_FALLOFF: f64 = 2.0;

/// Width for a velocity-based tool moving from `last` to `point` in `elapsed_ms`.
///
/// Slow movement gives a thick line, fast movement a thin one, never below 1.
pub fn velocity_width(last: Point, point: Point, elapsed_ms: f64) -> f64 {
    // Floor the interval so simultaneous samples don't divide by zero.
    let elapsed = elapsed_ms.max(1.0);
    let speed = last.distance(point) / elapsed;
    (VELOCITY_MAX_WIDTH - VELOCITY_WIDTH_FALLOFF * speed).max(1.0)
}

/// Rendering parameters applied for one pointer move.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct StrokeParams {
    /// Line width in CSS pixels.
    pub width: f64,
    pub blend: BlendMode,
    pub color: InkColor,
    pub opacity: f64,
    /// Soft falloff radius in CSS pixels.
    pub soft_edge: f64,
}

impl StrokeParams {
    /// Compute the parameters for `tool` moving from `last` to `point`.
    pub fn compute(tool: ToolKind, color: InkColor, last: &InputPoint, point: &InputPoint) -> Self {
        let preset = tool.preset();
        let width = if preset.velocity_width {
            velocity_width(last.position(), point.position(), point.time_ms - last.time_ms)
        } else {
            preset.width
        };

        // The eraser always clears, whatever its preset declares.
        let (blend, color) = if tool.is_eraser() {
            (BlendMode::DestinationOut, InkColor::white())
        } else {
            (preset.composite, color)
        };

        Self {
            width,
            blend,
            color,
            opacity: preset.opacity,
            soft_edge: preset.soft_edge,
        }
    }
}

/// State of one stroke in progress.
#[derive(Debug, Clone)]
pub struct StrokeSession {
    tool: ToolKind,
    origin: InputPoint,
    last: InputPoint,
    /// Surface pixels before the stroke began.
    base: RgbaImage,
    mask: CoverageMask,
    segments: usize,
}

impl StrokeSession {
    /// Begin a stroke at `origin` over the given pre-stroke pixels.
    pub fn begin(tool: ToolKind, origin: InputPoint, base: RgbaImage) -> Self {
        let mask = CoverageMask::new(base.width(), base.height());
        Self {
            tool,
            origin,
            last: origin,
            base,
            mask,
            segments: 0,
        }
    }

    pub fn tool(&self) -> ToolKind {
        self.tool
    }

    pub fn preset(&self) -> &'static ToolPreset {
        self.tool.preset()
    }

    pub fn origin(&self) -> InputPoint {
        self.origin
    }

    pub fn last(&self) -> InputPoint {
        self.last
    }

    pub fn base(&self) -> &RgbaImage {
        &self.base
    }

    pub fn mask(&self) -> &CoverageMask {
        &self.mask
    }

    /// Number of segments drawn so far.
    pub fn segments(&self) -> usize {
        self.segments
    }

    /// Parameters for extending the stroke to `point`.
    pub fn params_to(&self, color: InkColor, point: &InputPoint) -> StrokeParams {
        StrokeParams::compute(self.tool, color, &self.last, point)
    }

    /// Rasterize the segment from the last point to `point` into the stroke
    /// mask and advance. Returns the rectangle that needs compositing.
    ///
    /// Points and params are in CSS pixels; `scale` maps them to device pixels.
    pub fn extend(&mut self, point: InputPoint, params: &StrokeParams, scale: f64) -> Option<PixelRect> {
        let preset = self.preset();
        let segment = Segment {
            from: (self.last.position().to_vec2() * scale).to_point(),
            to: (point.position().to_vec2() * scale).to_point(),
            width: params.width * scale,
            cap: preset.cap,
            join: (self.segments > 0).then_some(preset.join),
            soft_edge: params.soft_edge * scale,
        };

        let rect = self.mask.stamp(&segment);
        self.last = point;
        self.segments += 1;
        rect
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pt(x: f64, y: f64, t: f64) -> InputPoint {
        InputPoint::new(x, y, t)
    }

    #[test]
    fn test_velocity_width_slow() {
        let width = velocity_width(Point::new(0.0, 0.0), Point::new(10.0, 0.0), 10.0);
        assert!((width - 8.0).abs() < 1e-9);
    }

    #[test]
    fn test_velocity_width_fast_is_clamped() {
        let width = velocity_width(Point::new(0.0, 0.0), Point::new(10.0, 0.0), 1.0);
        assert_eq!(width, 1.0);
    }

    #[test]
    fn test_velocity_width_zero_elapsed() {
        let width = velocity_width(Point::new(0.0, 0.0), Point::new(3.0, 4.0), 0.0);
        assert_eq!(width, 1.0);
        let still = velocity_width(Point::new(5.0, 5.0), Point::new(5.0, 5.0), 0.0);
        assert_eq!(still, VELOCITY_MAX_WIDTH);
    }

    #[test]
    fn test_params_follow_preset() {
        let color = InkColor::new(1, 2, 3, 255);
        for tool in ToolKind::ALL {
            let preset = tool.preset();
            let params = StrokeParams::compute(tool, color, &pt(0.0, 0.0, 0.0), &pt(10.0, 0.0, 10.0));
            assert_eq!(params.opacity, preset.opacity, "{tool}");
            assert_eq!(params.soft_edge, preset.soft_edge, "{tool}");
            if preset.velocity_width {
                assert!((params.width - 8.0).abs() < 1e-9);
            } else {
                assert_eq!(params.width, preset.width, "{tool}");
            }
            if tool.is_eraser() {
                assert_eq!(params.blend, BlendMode::DestinationOut);
                assert_ne!(params.blend, preset.composite);
            } else {
                assert_eq!(params.blend, preset.composite, "{tool}");
                assert_eq!(params.color, color);
            }
        }
    }

    #[test]
    fn test_extend_tracks_last_point() {
        let base = RgbaImage::new(50, 50);
        let mut session = StrokeSession::begin(ToolKind::Pen, pt(5.0, 5.0, 0.0), base);
        let next = pt(20.0, 5.0, 16.0);
        let params = session.params_to(InkColor::black(), &next);
        let rect = session.extend(next, &params, 1.0).unwrap();
        assert!(!rect.is_empty());
        assert_eq!(session.last(), next);
        assert_eq!(session.origin(), pt(5.0, 5.0, 0.0));
        assert_eq!(session.segments(), 1);
        assert!(session.mask().get(12, 5) > 0.0);
    }

    #[test]
    fn test_extend_scales_to_device_pixels() {
        let base = RgbaImage::new(64, 64);
        let mut session = StrokeSession::begin(ToolKind::Pen, pt(4.0, 10.0, 0.0), base);
        let next = pt(28.0, 10.0, 16.0);
        let params = session.params_to(InkColor::black(), &next);
        session.extend(next, &params, 2.0).unwrap();

        // CSS y=10 lands on device y=20, pen width 3 becomes 6 device pixels.
        assert!(session.mask().get(30, 20) > 0.0);
        assert!(session.mask().get(30, 17) > 0.0);
        assert_eq!(session.mask().get(30, 10), 0.0);
        assert_eq!(session.mask().get(30, 24), 0.0);
    }
}
