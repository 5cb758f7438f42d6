//! Multi-page PDF output: one page per image, sized to the image.

use printpdf::image_crate::{DynamicImage, RgbImage};
use printpdf::{Image, ImageTransform, Mm, PdfDocument};

use crate::compose::RenderedImage;
use crate::error::PdfError;

/// Default document file name.
pub const DEFAULT_DOCUMENT_NAME: &str = "Результат.pdf";

/// Resolution at which one image pixel maps to one PDF point.
const POINTS_PER_INCH: f32 = 72.0;

/// Page edge length for `pixels` at one point per pixel.
#[allow(clippy::cast_precision_loss)]
fn page_extent(pixels: u32) -> Mm {
    Mm(pixels as f32 * 25.4 / POINTS_PER_INCH)
}

/// Build a PDF with one page per image, each page exactly the image's
/// pixel size in points and the image filling it with no margin.
///
/// Transparent pixels are flattened onto white.
///
/// # Errors
///
/// [`PdfError::Empty`] for no images; writer errors otherwise.
pub fn create_document(title: &str, images: &[RenderedImage]) -> Result<Vec<u8>, PdfError> {
    if images.is_empty() {
        return Err(PdfError::Empty);
    }

    let doc = PdfDocument::empty(title);
    for rendered in images {
        let (width, height) = rendered.pixels.dimensions();
        let (page, layer) = doc.add_page(page_extent(width), page_extent(height), rendered.name.as_str());
        let layer = doc.get_page(page).get_layer(layer);

        let rgb = RgbImage::from_fn(width, height, |x, y| {
            let [r, g, b, a] = rendered.pixels.get_pixel(x, y).0;
            printpdf::image_crate::Rgb([over_white(r, a), over_white(g, a), over_white(b, a)])
        });
        Image::from_dynamic_image(&DynamicImage::ImageRgb8(rgb)).add_to_layer(
            layer,
            ImageTransform {
                dpi: Some(POINTS_PER_INCH),
                ..ImageTransform::default()
            },
        );
    }
    log::info!("pdf: {} pages", images.len());
    Ok(doc.save_to_bytes()?)
}

#[allow(clippy::cast_possible_truncation)]
fn over_white(c: u8, a: u8) -> u8 {
    let (c, a) = (u16::from(c), u16::from(a));
    ((c * a + 255 * (255 - a) + 127) / 255) as u8
}
