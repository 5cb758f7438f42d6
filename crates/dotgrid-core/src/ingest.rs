//! Turn uploaded files into [`ImageRecord`]s.
//!
//! Raster images become one record each. PDFs are handed to a
//! [`PageRasterizer`] and every kept page becomes its own record, named so
//! that export can regroup the pages into one folder. Anything that is
//! neither a decodable raster format nor a PDF is dropped silently.

use std::collections::BTreeSet;
use std::io::Cursor;

use crate::elements::next_id;
use crate::types::{Dimensions, ImageRecord};

/// Marker between a PDF's base name and its page number in page record
/// names (`<pdf>_страница_<n>.png`).
pub const PAGE_MARKER: &str = "_страница_";

/// An uploaded file.
#[derive(Debug, Clone)]
pub struct InputFile {
    pub name: String,
    pub bytes: Vec<u8>,
}

impl InputFile {
    #[must_use]
    pub fn new(name: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            bytes,
        }
    }
}

/// What an uploaded file was recognised as.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputKind {
    Raster(image::ImageFormat),
    Pdf,
}

/// Classify a file by magic bytes, falling back to the `.pdf` extension.
#[must_use]
pub fn classify(file: &InputFile) -> Option<InputKind> {
    if file.bytes.starts_with(b"%PDF") || extension(&file.name).eq_ignore_ascii_case("pdf") {
        return Some(InputKind::Pdf);
    }
    image::guess_format(&file.bytes).ok().map(InputKind::Raster)
}

/// One page produced by a [`PageRasterizer`].
#[derive(Debug, Clone)]
pub struct RasterizedPage {
    /// 1-based page number.
    pub page_number: u32,
    /// Encoded raster image of the page.
    pub bytes: Vec<u8>,
    pub dimensions: Dimensions,
}

/// External collaborator that renders PDF pages to raster images.
pub trait PageRasterizer {
    /// Render every page of the PDF in `bytes`.
    ///
    /// # Errors
    ///
    /// Returns a message describing why the document could not be
    /// rendered.
    fn rasterize(&self, name: &str, bytes: &[u8]) -> Result<Vec<RasterizedPage>, String>;
}

/// Which rasterized pages to keep.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum PageSelection {
    #[default]
    All,
    /// Only these 1-based page numbers.
    Pages(BTreeSet<u32>),
}

impl PageSelection {
    #[must_use]
    pub fn keeps(&self, page_number: u32) -> bool {
        match self {
            Self::All => true,
            Self::Pages(pages) => pages.contains(&page_number),
        }
    }
}

/// Errors raised while ingesting uploads.
#[derive(Debug, thiserror::Error)]
pub enum IngestError {
    /// A raster upload or rasterized page could not be read.
    #[error("failed to read {name}: {source}")]
    Decode {
        name: String,
        #[source]
        source: image::ImageError,
    },

    /// The page rasterizer rejected a PDF.
    #[error("failed to rasterize {name}: {message}")]
    Rasterize { name: String, message: String },
}

/// Ingest uploads in order.
///
/// PDFs are skipped with a warning when no rasterizer is supplied.
/// `selection` applies to every PDF in the batch.
///
/// # Errors
///
/// Returns [`IngestError`] on the first file whose header cannot be read
/// or whose pages cannot be rasterized.
pub fn ingest(
    files: Vec<InputFile>,
    rasterizer: Option<&dyn PageRasterizer>,
    selection: &PageSelection,
) -> Result<Vec<ImageRecord>, IngestError> {
    let mut records = Vec::with_capacity(files.len());
    for file in files {
        match classify(&file) {
            Some(InputKind::Raster(format)) => {
                let dimensions = read_dimensions(&file.bytes, format).map_err(|source| {
                    IngestError::Decode {
                        name: file.name.clone(),
                        source,
                    }
                })?;
                log::debug!(
                    "ingest: {} ({}x{})",
                    file.name,
                    dimensions.width,
                    dimensions.height
                );
                records.push(ImageRecord::new(
                    next_id("image"),
                    file.name,
                    file.bytes,
                    dimensions,
                ));
            }
            Some(InputKind::Pdf) => {
                let Some(rasterizer) = rasterizer else {
                    log::warn!("ingest: skipping {}, no PDF rasterizer available", file.name);
                    continue;
                };
                let pages = rasterizer
                    .rasterize(&file.name, &file.bytes)
                    .map_err(|message| IngestError::Rasterize {
                        name: file.name.clone(),
                        message,
                    })?;
                let total = pages.len();
                let base = base_name(&file.name);
                for page in pages.into_iter().filter(|p| selection.keeps(p.page_number)) {
                    let mut record = ImageRecord::new(
                        next_id("image"),
                        page_name(base, page.page_number),
                        page.bytes,
                        page.dimensions,
                    );
                    record.source_file = Some(file.name.clone());
                    record.page_number = Some(page.page_number);
                    records.push(record);
                }
                log::info!("ingest: {} rasterized, {total} pages", file.name);
            }
            None => log::debug!("ingest: ignoring {}, not an image or PDF", file.name),
        }
    }
    Ok(records)
}

/// `<base>_страница_<n>.png`.
#[must_use]
pub fn page_name(base: &str, page_number: u32) -> String {
    format!("{base}{PAGE_MARKER}{page_number}.png")
}

/// File name with its last extension removed (`a.b.png` -> `a.b`).
/// Names without a dot, or starting with their only dot, are unchanged.
#[must_use]
pub fn base_name(name: &str) -> &str {
    match name.rfind('.') {
        Some(i) if i > 0 => &name[..i],
        _ => name,
    }
}

fn extension(name: &str) -> &str {
    match name.rfind('.') {
        Some(i) if i > 0 => &name[i + 1..],
        _ => "",
    }
}

fn read_dimensions(bytes: &[u8], format: image::ImageFormat) -> Result<Dimensions, image::ImageError> {
    let (width, height) = image::ImageReader::with_format(Cursor::new(bytes), format).into_dimensions()?;
    Ok(Dimensions { width, height })
}
