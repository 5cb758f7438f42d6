//! Offscreen drawing surface.
//!
//! Pixels are held premultiplied so tiny-skia can fill anti-aliased circles
//! directly into the buffer. Text is drawn into the same buffer with
//! imageproc, blending each glyph's coverage against a premultiplied
//! color. Pixels nothing was drawn over come back exactly as they were in
//! the base image, translucent ones included.

use ab_glyph::{FontArc, PxScale};
use dotgrid_core::{Color, Point};
use image::{Rgba, RgbaImage};
use tiny_skia::{FillRule, Paint, PathBuilder, PixmapMut, Transform};

use crate::error::RenderError;

/// Premultiplied RGBA drawing surface.
#[derive(Debug, Clone)]
pub struct Canvas {
    base: RgbaImage,
    pixels: RgbaImage,
}

impl Canvas {
    /// Start from a copy of `base` (straight alpha).
    ///
    /// # Errors
    ///
    /// [`RenderError::Canvas`] for a zero-sized image.
    pub fn from_image(base: &RgbaImage) -> Result<Self, RenderError> {
        let (width, height) = base.dimensions();
        if width == 0 || height == 0 {
            return Err(RenderError::Canvas { width, height });
        }
        let mut pixels = base.clone();
        for p in pixels.pixels_mut() {
            *p = Rgba(premultiply(p.0));
        }
        Ok(Self {
            base: base.clone(),
            pixels,
        })
    }

    #[must_use]
    pub fn width(&self) -> u32 {
        self.pixels.width()
    }

    #[must_use]
    pub fn height(&self) -> u32 {
        self.pixels.height()
    }

    /// Fill an anti-aliased disc. Non-positive radii draw nothing.
    ///
    /// # Errors
    ///
    /// [`RenderError::Canvas`] if the buffer cannot be wrapped for drawing.
    #[allow(clippy::cast_possible_truncation)]
    pub fn fill_circle(&mut self, center: Point, radius: f64, color: Color) -> Result<(), RenderError> {
        let (width, height) = self.pixels.dimensions();
        let Some(path) = PathBuilder::from_circle(center.x as f32, center.y as f32, radius as f32) else {
            return Ok(());
        };
        let mut paint = Paint::default();
        paint.set_color_rgba8(color.r, color.g, color.b, color.a);
        paint.anti_alias = true;

        let buf: &mut [u8] = &mut self.pixels;
        let mut pixmap =
            PixmapMut::from_bytes(buf, width, height).ok_or(RenderError::Canvas { width, height })?;
        pixmap.fill_path(&path, &paint, FillRule::Winding, Transform::identity(), None);
        Ok(())
    }

    /// Draw `text` with its top-left corner at `origin`.
    #[allow(clippy::cast_possible_truncation)]
    pub fn draw_text(&mut self, origin: Point, text: &str, size: f64, color: Color, font: &FontArc) {
        if text.is_empty() || size <= 0.0 {
            return;
        }
        imageproc::drawing::draw_text_mut(
            &mut self.pixels,
            Rgba(premultiply(color.to_array())),
            origin.x.round() as i32,
            origin.y.round() as i32,
            PxScale::from(size as f32),
            font,
            text,
        );
    }

    /// Convert back to straight alpha, restoring untouched base pixels.
    #[must_use]
    pub fn into_image(self) -> RgbaImage {
        let Self { mut base, pixels } = self;
        for (out, drawn) in base.pixels_mut().zip(pixels.pixels()) {
            if drawn.0 != premultiply(out.0) {
                *out = Rgba(demultiply(drawn.0));
            }
        }
        base
    }
}

/// Width and height of `text` rendered at `size` pixels.
#[must_use]
#[allow(clippy::cast_possible_truncation)]
pub fn text_extent(text: &str, size: f64, font: &FontArc) -> (f64, f64) {
    let (w, h) = imageproc::drawing::text_size(PxScale::from(size as f32), font, text);
    (f64::from(w), f64::from(h))
}

#[allow(clippy::cast_possible_truncation)]
fn premultiply([r, g, b, a]: [u8; 4]) -> [u8; 4] {
    let scale = |c: u8| ((u16::from(c) * u16::from(a) + 127) / 255) as u8;
    [scale(r), scale(g), scale(b), a]
}

#[allow(clippy::cast_possible_truncation)]
fn demultiply([r, g, b, a]: [u8; 4]) -> [u8; 4] {
    if a == 0 {
        return [0, 0, 0, 0];
    }
    let scale = |c: u8| ((u16::from(c) * 255 + u16::from(a) / 2) / u16::from(a)).min(255) as u8;
    [scale(r), scale(g), scale(b), a]
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn opaque_round_trip_is_lossless() {
        let base = RgbaImage::from_fn(4, 4, |x, y| Rgba([x as u8 * 60, y as u8 * 60, 7, 255]));
        let out = Canvas::from_image(&base).unwrap().into_image();
        assert_eq!(out, base);
    }

    #[test]
    fn untouched_translucent_pixels_are_lossless() {
        let base = RgbaImage::from_fn(6, 1, |x, _| match x {
            0 => Rgba([200, 100, 50, 1]),
            1 => Rgba([10, 20, 30, 0]),
            2 => Rgba([255, 3, 77, 64]),
            _ => Rgba([9, 9, 9, 255]),
        });
        let out = Canvas::from_image(&base).unwrap().into_image();
        assert_eq!(out, base);
    }

    #[test]
    fn drawing_only_changes_covered_pixels() {
        let base = RgbaImage::from_pixel(20, 20, Rgba([120, 40, 200, 3]));
        let mut canvas = Canvas::from_image(&base).unwrap();
        canvas
            .fill_circle(Point::new(5.0, 5.0), 3.0, Color::BLACK)
            .unwrap();
        let out = canvas.into_image();
        assert_eq!(out.get_pixel(5, 5).0, [0, 0, 0, 255]);
        assert_eq!(out.get_pixel(15, 15).0, [120, 40, 200, 3]);
    }

    #[test]
    fn zero_sized_canvas_is_an_error() {
        assert!(matches!(
            Canvas::from_image(&RgbaImage::new(0, 5)),
            Err(RenderError::Canvas { width: 0, height: 5 })
        ));
    }

    #[test]
    fn circle_covers_centre_not_corners() {
        let base = RgbaImage::from_pixel(20, 20, Rgba([255, 255, 255, 255]));
        let mut canvas = Canvas::from_image(&base).unwrap();
        canvas
            .fill_circle(Point::new(10.0, 10.0), 4.0, Color::BLACK)
            .unwrap();
        let out = canvas.into_image();
        assert_eq!(out.get_pixel(10, 10).0, [0, 0, 0, 255]);
        assert_eq!(out.get_pixel(0, 0).0, [255, 255, 255, 255]);
        assert_eq!(out.get_pixel(19, 19).0, [255, 255, 255, 255]);
    }

    #[test]
    fn colored_circle_keeps_its_color() {
        let base = RgbaImage::from_pixel(10, 10, Rgba([0, 0, 0, 255]));
        let mut canvas = Canvas::from_image(&base).unwrap();
        canvas
            .fill_circle(Point::new(5.0, 5.0), 3.0, Color::rgb(200, 30, 90))
            .unwrap();
        assert_eq!(canvas.into_image().get_pixel(5, 5).0, [200, 30, 90, 255]);
    }

    #[test]
    fn degenerate_circle_draws_nothing() {
        let base = RgbaImage::from_pixel(10, 10, Rgba([9, 9, 9, 255]));
        let mut canvas = Canvas::from_image(&base).unwrap();
        canvas
            .fill_circle(Point::new(5.0, 5.0), 0.0, Color::WHITE)
            .unwrap();
        assert_eq!(canvas.into_image(), base);
    }

    #[test]
    fn premultiply_then_demultiply_is_close() {
        for a in [1u8, 64, 128, 200, 255] {
            let back = demultiply(premultiply([200, 100, 50, a]));
            assert_eq!(back[3], a);
            if a >= 128 {
                assert!(back[0].abs_diff(200) <= 2);
                assert!(back[1].abs_diff(100) <= 2);
            }
        }
    }
}
