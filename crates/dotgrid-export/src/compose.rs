//! Layer compositing.
//!
//! Draw order per image, back to front:
//!
//! 1. base image pixels;
//! 2. each visible layer in history order: its grid dots (each followed by
//!    its numbering label when the layer has numbering on), then its
//!    visible freeform texts, then its visible freeform dots;
//! 3. the record's uncommitted texts, then its uncommitted dots;
//! 4. for previews only, the live lattice.
//!
//! Preview and export share this path, so they match pixel for pixel.

use dotgrid_core::ingest::base_name;
use dotgrid_core::{
    Color, DecodedCache, Dimensions, DotElement, EditorDefaults, GridDot, ImageRecord, Layer,
    TextElement, label_origin, resolve_style,
};
use image::{ImageEncoder, RgbaImage};

use crate::canvas::{Canvas, text_extent};
use crate::error::RenderError;
use crate::fonts::FontBook;

/// Extra drawing for an on-screen preview.
#[derive(Debug, Clone, Copy)]
pub struct Overlay<'a> {
    /// History index of the layer being re-edited; skipped so it is not
    /// drawn twice.
    pub exclude_layer: Option<usize>,
    /// Live lattice drawn on top of everything else.
    pub live_dots: &'a [GridDot],
    /// Diameter of the live lattice dots.
    pub live_size: f64,
}

impl Overlay<'_> {
    /// No preview additions; what export uses.
    pub const NONE: Overlay<'static> = Overlay {
        exclude_layer: None,
        live_dots: &[],
        live_size: 0.0,
    };
}

/// A composited image ready for encoding.
#[derive(Debug, Clone)]
pub struct RenderedImage {
    /// Output file name (`<base>.png`).
    pub name: String,
    pub dimensions: Dimensions,
    pub pixels: RgbaImage,
}

/// Composite `record`'s annotations onto `base`.
///
/// # Errors
///
/// [`RenderError::Canvas`] for an empty base image,
/// [`RenderError::FontUnavailable`] when visible text or numbering needs a
/// font the book lacks.
pub fn compose(
    base: &RgbaImage,
    record: &ImageRecord,
    overlay: &Overlay<'_>,
    fonts: &FontBook,
    defaults: &EditorDefaults,
) -> Result<RgbaImage, RenderError> {
    let mut canvas = Canvas::from_image(base)?;

    for (index, layer) in record.edit_history.iter().enumerate() {
        if !layer.visible || overlay.exclude_layer == Some(index) {
            continue;
        }
        draw_layer(&mut canvas, layer, fonts, defaults)?;
    }

    draw_texts(&mut canvas, &record.current_texts, fonts)?;
    draw_free_dots(&mut canvas, &record.current_standalone_dots)?;

    let radius = overlay.live_size / 2.0;
    for dot in overlay.live_dots {
        canvas.fill_circle(dot.center(), radius, Color::BLACK)?;
    }

    Ok(canvas.into_image())
}

/// Decode `record` (through `cache`) and composite it for export.
///
/// # Errors
///
/// Decode failures and any [`compose`] error.
pub fn rasterize(
    record: &ImageRecord,
    cache: &mut DecodedCache,
    fonts: &FontBook,
    defaults: &EditorDefaults,
) -> Result<RenderedImage, RenderError> {
    let base = cache.get_or_decode(record)?;
    let pixels = compose(&base, record, &Overlay::NONE, fonts, defaults)?;
    let (width, height) = pixels.dimensions();
    log::debug!(
        "rasterized {} ({width}x{height}, {} layers)",
        record.name,
        record.edit_history.len()
    );
    Ok(RenderedImage {
        name: output_name(&record.name),
        dimensions: Dimensions { width, height },
        pixels,
    })
}

/// `<name without extension>.png`.
#[must_use]
pub fn output_name(name: &str) -> String {
    format!("{}.png", base_name(name))
}

/// Encode as PNG.
///
/// # Errors
///
/// Propagates encoder errors.
pub fn encode_png(pixels: &RgbaImage) -> Result<Vec<u8>, image::ImageError> {
    let mut buf = Vec::new();
    image::codecs::png::PngEncoder::new(&mut buf).write_image(
        pixels.as_raw(),
        pixels.width(),
        pixels.height(),
        image::ExtendedColorType::Rgba8,
    )?;
    Ok(buf)
}

fn draw_layer(
    canvas: &mut Canvas,
    layer: &Layer,
    fonts: &FontBook,
    defaults: &EditorDefaults,
) -> Result<(), RenderError> {
    let radius = layer.size / 2.0;
    let label_font = if layer.numbering_enabled() && !layer.dots.is_empty() {
        Some(fonts.label_font()?)
    } else {
        None
    };

    for (index, dot) in layer.dots.iter().enumerate() {
        let center = dot.center();
        canvas.fill_circle(center, radius, Color::BLACK)?;

        if let Some(font) = label_font {
            let style = resolve_style(&dot.label, &layer.settings.label, defaults);
            let text = (index + 1).to_string();
            let (w, h) = text_extent(&text, style.font_size, font);
            let origin = label_origin(center, radius, style.offset, style.position, w, h);
            canvas.draw_text(origin, &text, style.font_size, style.color, font);
        }
    }

    draw_texts(canvas, &layer.texts, fonts)?;
    draw_free_dots(canvas, &layer.standalone_dots)
}

fn draw_texts(canvas: &mut Canvas, texts: &[TextElement], fonts: &FontBook) -> Result<(), RenderError> {
    for text in texts.iter().filter(|t| t.visible) {
        let font = fonts.text_font(&text.font_family)?;
        canvas.draw_text(
            dotgrid_core::Point::new(text.x, text.y),
            &text.text,
            text.font_size,
            text.color,
            font,
        );
    }
    Ok(())
}

fn draw_free_dots(canvas: &mut Canvas, dots: &[DotElement]) -> Result<(), RenderError> {
    for dot in dots.iter().filter(|d| d.visible) {
        canvas.fill_circle(
            dotgrid_core::Point::new(dot.x, dot.y),
            dot.size / 2.0,
            dot.color,
        )?;
    }
    Ok(())
}
