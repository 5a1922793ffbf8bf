//! Raster surface the strokes are drawn on.

use crate::color::InkColor;
use crate::raster::{CoverageMask, PixelRect};
use crate::tools::BlendMode;
use image::{Rgba, RgbaImage};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors produced while exporting the surface.
#[derive(Debug, Error)]
pub enum ExportError {
    #[error("PNG encoding failed: {0}")]
    Encoding(#[from] png::EncodingError),
}

/// Largest backing store side in device pixels.
pub const MAX_SURFACE_DIMENSION: u32 = 8192;

/// Size of the drawing view in CSS pixels plus the device pixel ratio.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Viewport {
    pub width: f64,
    pub height: f64,
    /// Device pixel ratio (for HiDPI).
    pub scale_factor: f64,
}

impl Default for Viewport {
    fn default() -> Self {
        Self {
            width: 800.0,
            height: 600.0,
            scale_factor: 1.0,
        }
    }
}

impl Viewport {
    pub fn new(width: f64, height: f64, scale_factor: f64) -> Self {
        Self {
            width,
            height,
            scale_factor,
        }
    }

    /// Device pixel ratio, falling back to 1 for non-positive values.
    pub fn scale(&self) -> f64 {
        if self.scale_factor > 0.0 && self.scale_factor.is_finite() {
            self.scale_factor
        } else {
            1.0
        }
    }

    /// Backing store size in device pixels, between 1 and
    /// [`MAX_SURFACE_DIMENSION`] per side. Non-finite sizes give 1.
    pub fn pixel_size(&self) -> (u32, u32) {
        let to_px = |v: f64| {
            let px = (v * self.scale()).ceil();
            if px.is_finite() {
                px.clamp(1.0, MAX_SURFACE_DIMENSION as f64) as u32
            } else {
                1
            }
        };
        (to_px(self.width), to_px(self.height))
    }
}

/// The raster bitmap plus the compositing state used for the next draw.
#[derive(Debug, Clone)]
pub struct Surface {
    image: RgbaImage,
    scale_factor: f64,
    blend: BlendMode,
    opacity: f64,
}

impl Surface {
    /// Create a transparent surface sized for the viewport.
    pub fn new(viewport: Viewport) -> Self {
        let (width, height) = viewport.pixel_size();
        Self {
            image: RgbaImage::new(width, height),
            scale_factor: viewport.scale(),
            blend: BlendMode::default(),
            opacity: 1.0,
        }
    }

    pub fn width(&self) -> u32 {
        self.image.width()
    }

    pub fn height(&self) -> u32 {
        self.image.height()
    }

    /// Device pixel ratio the surface was sized with.
    pub fn scale_factor(&self) -> f64 {
        self.scale_factor
    }

    pub fn image(&self) -> &RgbaImage {
        &self.image
    }

    pub fn pixel(&self, x: u32, y: u32) -> [u8; 4] {
        self.image.get_pixel(x, y).0
    }

    /// Copy of the current pixels, for history.
    pub fn snapshot(&self) -> RgbaImage {
        self.image.clone()
    }

    /// Whether every pixel is fully transparent.
    pub fn is_blank(&self) -> bool {
        self.image.pixels().all(|p| p.0[3] == 0)
    }

    pub fn blend(&self) -> BlendMode {
        self.blend
    }

    pub fn opacity(&self) -> f64 {
        self.opacity
    }

    pub fn set_blend(&mut self, blend: BlendMode) {
        self.blend = blend;
    }

    pub fn set_opacity(&mut self, opacity: f64) {
        self.opacity = opacity.clamp(0.0, 1.0);
    }

    /// Back to source-over at full opacity.
    pub fn reset_compositing(&mut self) {
        self.blend = BlendMode::default();
        self.opacity = 1.0;
    }

    /// Clear every pixel to transparent.
    pub fn clear(&mut self) {
        for pixel in self.image.pixels_mut() {
            *pixel = Rgba([0, 0, 0, 0]);
        }
    }

    /// Replace the content with `snapshot`, anchored at the top-left corner.
    /// Parts of the snapshot outside the current size are dropped.
    pub fn restore(&mut self, snapshot: &RgbaImage) {
        if snapshot.dimensions() == self.image.dimensions() {
            self.image.clone_from(snapshot);
            return;
        }
        self.clear();
        blit(&mut self.image, snapshot);
    }

    /// Re-size the backing store for a new viewport, keeping the existing pixels.
    pub fn resize(&mut self, viewport: Viewport) {
        let (width, height) = viewport.pixel_size();
        self.scale_factor = viewport.scale();
        if (width, height) == self.image.dimensions() {
            return;
        }
        let mut resized = RgbaImage::new(width, height);
        blit(&mut resized, &self.image);
        self.image = resized;
    }

    /// Composite `color` through `mask` over `base` inside `rect`, using the
    /// current blend mode and opacity. Pixels outside the mask keep `base`.
    pub fn composite(
        &mut self,
        base: &RgbaImage,
        mask: &CoverageMask,
        color: InkColor,
        rect: PixelRect,
    ) {
        let x1 = rect.x1.min(self.width()).min(base.width()).min(mask.width());
        let y1 = rect.y1.min(self.height()).min(base.height()).min(mask.height());
        let opacity = self.opacity as f32;

        for y in rect.y0..y1 {
            for x in rect.x0..x1 {
                let under = *base.get_pixel(x, y);
                let coverage = mask.get(x, y);
                let out = if coverage > 0.0 {
                    blend_pixel(under, color, coverage * opacity, self.blend)
                } else {
                    under
                };
                self.image.put_pixel(x, y, out);
            }
        }
    }

    /// Encode the surface as an RGBA8 PNG.
    pub fn to_png(&self) -> Result<Vec<u8>, ExportError> {
        let (width, height) = self.image.dimensions();

        let mut png_data = Vec::new();
        {
            let mut encoder = png::Encoder::new(&mut png_data, width, height);
            encoder.set_color(png::ColorType::Rgba);
            encoder.set_depth(png::BitDepth::Eight);
            let mut writer = encoder.write_header()?;
            writer.write_image_data(self.image.as_raw())?;
            writer.finish()?;
        }
        Ok(png_data)
    }
}

/// Copy the overlapping region of `src` into `dst` at the origin.
fn blit(dst: &mut RgbaImage, src: &RgbaImage) {
    let width = dst.width().min(src.width());
    let height = dst.height().min(src.height());
    for y in 0..height {
        for x in 0..width {
            dst.put_pixel(x, y, *src.get_pixel(x, y));
        }
    }
}

/// Blend `color` at `alpha` (coverage × opacity) onto `base`. Straight alpha.
fn blend_pixel(base: Rgba<u8>, color: InkColor, alpha: f32, mode: BlendMode) -> Rgba<u8> {
    let base_rgb = [
        base[0] as f32 / 255.0,
        base[1] as f32 / 255.0,
        base[2] as f32 / 255.0,
    ];
    let base_a = base[3] as f32 / 255.0;
    let top_a = (alpha * color.a as f32 / 255.0).clamp(0.0, 1.0);

    if mode == BlendMode::DestinationOut {
        let out_a = base_a * (1.0 - top_a);
        if out_a <= 0.0 {
            return Rgba([0, 0, 0, 0]);
        }
        return Rgba([base[0], base[1], base[2], to_u8(out_a)]);
    }

    let top_rgb = [
        color.r as f32 / 255.0,
        color.g as f32 / 255.0,
        color.b as f32 / 255.0,
    ];

    // Multiply mixes the source with the backdrop where the backdrop is opaque.
    let mixed = match mode {
        BlendMode::Multiply => [
            top_rgb[0] * (1.0 - base_a) + top_rgb[0] * base_rgb[0] * base_a,
            top_rgb[1] * (1.0 - base_a) + top_rgb[1] * base_rgb[1] * base_a,
            top_rgb[2] * (1.0 - base_a) + top_rgb[2] * base_rgb[2] * base_a,
        ],
        _ => top_rgb,
    };

    let out_a = top_a + base_a * (1.0 - top_a);
    if out_a <= 0.0 {
        return Rgba([0, 0, 0, 0]);
    }
    let channel =
        |i: usize| to_u8((mixed[i] * top_a + base_rgb[i] * base_a * (1.0 - top_a)) / out_a);
    Rgba([channel(0), channel(1), channel(2), to_u8(out_a)])
}

fn to_u8(v: f32) -> u8 {
    (v * 255.0).round().clamp(0.0, 255.0) as u8
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::raster::Segment;
    use crate::tools::LineCap;
    use kurbo::Point;

    fn full_mask(width: u32, height: u32) -> (CoverageMask, PixelRect) {
        let mut mask = CoverageMask::new(width, height);
        let rect = mask
            .stamp(&Segment {
                from: Point::new(0.0, height as f64 / 2.0),
                to: Point::new(width as f64, height as f64 / 2.0),
                width: height as f64 * 4.0,
                cap: LineCap::Square,
                join: None,
                soft_edge: 0.0,
            })
            .unwrap();
        (mask, rect)
    }

    #[test]
    fn test_pixel_size_uses_scale_factor() {
        let viewport = Viewport::new(100.0, 50.5, 2.0);
        assert_eq!(viewport.pixel_size(), (200, 101));
        assert_eq!(Viewport::new(0.0, 0.0, 0.0).pixel_size(), (1, 1));
        assert_eq!(Viewport::new(-5.0, f64::NAN, 1.0).pixel_size(), (1, 1));
        assert_eq!(
            Viewport::new(f64::INFINITY, 1e9, 2.0).pixel_size(),
            (1, MAX_SURFACE_DIMENSION)
        );
    }

    #[test]
    fn test_source_over_opaque() {
        let mut surface = Surface::new(Viewport::new(4.0, 4.0, 1.0));
        let base = surface.snapshot();
        let (mask, rect) = full_mask(4, 4);
        surface.composite(&base, &mask, InkColor::new(255, 0, 0, 255), rect);
        assert_eq!(surface.pixel(1, 1), [255, 0, 0, 255]);
    }

    #[test]
    fn test_opacity_applies_once() {
        let mut surface = Surface::new(Viewport::new(4.0, 4.0, 1.0));
        surface.set_opacity(0.5);
        let base = surface.snapshot();
        let (mask, rect) = full_mask(4, 4);
        surface.composite(&base, &mask, InkColor::black(), rect);
        surface.composite(&base, &mask, InkColor::black(), rect);
        assert_eq!(surface.pixel(2, 2), [0, 0, 0, 128]);
    }

    #[test]
    fn test_destination_out_clears() {
        let mut surface = Surface::new(Viewport::new(4.0, 4.0, 1.0));
        let base = surface.snapshot();
        let (mask, rect) = full_mask(4, 4);
        surface.composite(&base, &mask, InkColor::black(), rect);

        let inked = surface.snapshot();
        surface.set_blend(BlendMode::DestinationOut);
        surface.composite(&inked, &mask, InkColor::white(), rect);
        assert!(surface.is_blank());
    }

    #[test]
    fn test_multiply_darkens() {
        let mut surface = Surface::new(Viewport::new(4.0, 4.0, 1.0));
        let base = surface.snapshot();
        let (mask, rect) = full_mask(4, 4);
        surface.composite(&base, &mask, InkColor::new(128, 255, 255, 255), rect);

        let first = surface.snapshot();
        surface.set_blend(BlendMode::Multiply);
        surface.composite(&first, &mask, InkColor::new(255, 128, 255, 255), rect);
        let [r, g, b, a] = surface.pixel(0, 0);
        assert_eq!((r, b, a), (128, 255, 255));
        assert_eq!(g, 128);
    }

    #[test]
    fn test_resize_keeps_pixels() {
        let mut surface = Surface::new(Viewport::new(4.0, 4.0, 1.0));
        let base = surface.snapshot();
        let (mask, rect) = full_mask(4, 4);
        surface.composite(&base, &mask, InkColor::black(), rect);

        surface.resize(Viewport::new(8.0, 2.0, 1.0));
        assert_eq!((surface.width(), surface.height()), (8, 2));
        assert_eq!(surface.pixel(3, 1), [0, 0, 0, 255]);
        assert_eq!(surface.pixel(6, 1), [0, 0, 0, 0]);
    }

    #[test]
    fn test_reset_compositing() {
        let mut surface = Surface::new(Viewport::default());
        surface.set_blend(BlendMode::Multiply);
        surface.set_opacity(0.3);
        surface.reset_compositing();
        assert_eq!(surface.blend(), BlendMode::SourceOver);
        assert_eq!(surface.opacity(), 1.0);
    }

    #[test]
    fn test_png_signature() {
        let surface = Surface::new(Viewport::new(3.0, 2.0, 1.0));
        let png = surface.to_png().unwrap();
        assert_eq!(&png[..8], b"\x89PNG\r\n\x1a\n");
    }
}
