//! Coverage rasterization of stroke segments.
//!
//! A stroke is rasterized into a [`CoverageMask`] that keeps, per pixel, the
//! highest coverage any segment of the stroke produced. The surface then
//! composites the mask once over the pre-stroke pixels, so translucent tools
//! do not darken where consecutive segments overlap.

use crate::tools::{LineCap, LineJoin};
use kurbo::Point;

/// Inclusive-exclusive pixel rectangle `[x0, x1) × [y0, y1)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PixelRect {
    pub x0: u32,
    pub y0: u32,
    pub x1: u32,
    pub y1: u32,
}

impl PixelRect {
    /// Whether the rectangle covers no pixels.
    pub fn is_empty(&self) -> bool {
        self.x0 >= self.x1 || self.y0 >= self.y1
    }
}

/// One straight piece of a stroke, in device pixels.
#[derive(Debug, Clone, Copy)]
pub struct Segment {
    pub from: Point,
    pub to: Point,
    /// Full line width.
    pub width: f64,
    pub cap: LineCap,
    /// Join drawn at `from` when it continues a previous segment.
    pub join: Option<LineJoin>,
    /// Soft falloff distance beyond the line edge; 0 for an anti-aliased hard edge.
    pub soft_edge: f64,
}

impl Segment {
    fn radius(&self) -> f64 {
        self.width / 2.0
    }

    /// Coverage in `0.0..=1.0` of the pixel whose center is `p`.
    fn coverage(&self, p: Point) -> f32 {
        let r = self.radius();
        let mut best = self.body_coverage(p, r);

        // Miter joins are rendered as bevels; both rely on the segment bodies only.
        if self.join == Some(LineJoin::Round) {
            best = best.max(self.edge_alpha(p.distance(self.from) - r));
        }
        best
    }

    fn body_coverage(&self, p: Point, r: f64) -> f32 {
        let dir = self.to - self.from;
        let len = dir.hypot();

        if len < f64::EPSILON {
            // A dot: round caps give a disc, square caps a box, butt caps nothing.
            return match self.cap {
                LineCap::Round => self.edge_alpha(p.distance(self.from) - r),
                LineCap::Square => {
                    let past = (p.x - self.from.x).abs().max((p.y - self.from.y).abs()) - r;
                    self.edge_alpha(past)
                }
                LineCap::Butt => 0.0,
            };
        }

        let unit = dir / len;
        let rel = p - self.from;
        let along = rel.dot(unit);
        let across = rel.cross(unit).abs();

        match self.cap {
            LineCap::Round => {
                let t = along.clamp(0.0, len);
                let nearest = self.from + unit * t;
                self.edge_alpha(p.distance(nearest) - r)
            }
            LineCap::Butt | LineCap::Square => {
                let extend = if self.cap == LineCap::Square { r } else { 0.0 };
                // Signed distance past the nearer end, negative between the ends.
                let overflow = (-extend - along).max(along - len - extend);
                let side = self.edge_alpha(across - r);
                let end = self.edge_alpha(overflow);
                side.min(end)
            }
        }
    }

    /// Alpha for a pixel `past` pixels outside the line edge (negative = inside).
    fn edge_alpha(&self, past: f64) -> f32 {
        if self.soft_edge > 0.0 {
            if past <= 0.0 {
                1.0
            } else if past >= self.soft_edge {
                0.0
            } else {
                // Smoothstep from 1 at the edge to 0 at the end of the falloff.
                let x = 1.0 - past / self.soft_edge;
                (x * x * (3.0 - 2.0 * x)) as f32
            }
        } else {
            (0.5 - past).clamp(0.0, 1.0) as f32
        }
    }

    /// Pixel bounds touched by this segment, clipped to `width × height`.
    fn bounds(&self, width: u32, height: u32) -> PixelRect {
        let pad = self.radius() + self.soft_edge + 1.0;
        let min_x = self.from.x.min(self.to.x) - pad;
        let min_y = self.from.y.min(self.to.y) - pad;
        let max_x = self.from.x.max(self.to.x) + pad;
        let max_y = self.from.y.max(self.to.y) + pad;

        let clip = |v: f64, limit: u32| v.clamp(0.0, limit as f64) as u32;
        PixelRect {
            x0: clip(min_x.floor(), width),
            y0: clip(min_y.floor(), height),
            x1: clip(max_x.ceil(), width),
            y1: clip(max_y.ceil(), height),
        }
    }
}

/// Per-stroke coverage buffer.
#[derive(Debug, Clone)]
pub struct CoverageMask {
    width: u32,
    height: u32,
    data: Vec<f32>,
}

impl CoverageMask {
    /// Create an empty mask.
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            data: vec![0.0; width as usize * height as usize],
        }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    /// Coverage of pixel `(x, y)`.
    pub fn get(&self, x: u32, y: u32) -> f32 {
        self.data[y as usize * self.width as usize + x as usize]
    }

    /// Rasterize a segment, keeping the maximum coverage per pixel.
    /// Returns the touched rectangle, or `None` when it falls outside the mask.
    pub fn stamp(&mut self, segment: &Segment) -> Option<PixelRect> {
        let rect = segment.bounds(self.width, self.height);
        if rect.is_empty() {
            return None;
        }

        for y in rect.y0..rect.y1 {
            let row = y as usize * self.width as usize;
            for x in rect.x0..rect.x1 {
                let center = Point::new(x as f64 + 0.5, y as f64 + 0.5);
                let coverage = segment.coverage(center);
                let slot = &mut self.data[row + x as usize];
                if coverage > *slot {
                    *slot = coverage;
                }
            }
        }
        Some(rect)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn segment(from: (f64, f64), to: (f64, f64), width: f64, cap: LineCap) -> Segment {
        Segment {
            from: Point::new(from.0, from.1),
            to: Point::new(to.0, to.1),
            width,
            cap,
            join: None,
            soft_edge: 0.0,
        }
    }

    #[test]
    fn test_round_cap_covers_past_endpoint() {
        let mut mask = CoverageMask::new(40, 40);
        mask.stamp(&segment((10.0, 20.0), (30.0, 20.0), 6.0, LineCap::Round));
        assert_eq!(mask.get(20, 19), 1.0);
        // Two pixels past the end, inside the cap radius.
        assert_eq!(mask.get(31, 19), 1.0);
        assert_eq!(mask.get(36, 19), 0.0);
    }

    #[test]
    fn test_butt_cap_stops_at_endpoint() {
        let mut mask = CoverageMask::new(40, 40);
        mask.stamp(&segment((10.0, 20.0), (30.0, 20.0), 6.0, LineCap::Butt));
        assert_eq!(mask.get(29, 19), 1.0);
        assert_eq!(mask.get(31, 19), 0.0);
    }

    #[test]
    fn test_square_cap_extends_by_half_width() {
        let mut mask = CoverageMask::new(40, 40);
        mask.stamp(&segment((10.0, 20.0), (30.0, 20.0), 6.0, LineCap::Square));
        assert_eq!(mask.get(31, 19), 1.0);
        assert_eq!(mask.get(35, 19), 0.0);
    }

    #[test]
    fn test_soft_edge_falls_off() {
        let mut mask = CoverageMask::new(60, 60);
        let mut seg = segment((10.0, 30.0), (50.0, 30.0), 4.0, LineCap::Round);
        seg.soft_edge = 6.0;
        mask.stamp(&seg);
        let inner = mask.get(30, 30);
        let falloff = mask.get(30, 34);
        let outside = mask.get(30, 40);
        assert_eq!(inner, 1.0);
        assert!(falloff > 0.0 && falloff < 1.0);
        assert_eq!(outside, 0.0);
    }

    #[test]
    fn test_stamp_keeps_maximum() {
        let mut mask = CoverageMask::new(20, 20);
        mask.stamp(&segment((5.0, 10.0), (15.0, 10.0), 4.0, LineCap::Round));
        let before = mask.get(10, 9);
        mask.stamp(&segment((10.0, 0.0), (10.0, 20.0), 1.0, LineCap::Round));
        assert_eq!(mask.get(10, 9), before);
    }

    #[test]
    fn test_outside_mask_is_ignored() {
        let mut mask = CoverageMask::new(10, 10);
        let rect = mask.stamp(&segment((100.0, 100.0), (120.0, 100.0), 4.0, LineCap::Round));
        assert!(rect.is_none());
    }
}
