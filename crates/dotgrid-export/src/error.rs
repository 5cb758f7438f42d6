//! Error types for compositing and encoding.

/// Failure while rasterizing one image.
#[derive(Debug, thiserror::Error)]
pub enum RenderError {
    /// The record's bytes could not be decoded, or the result could not be
    /// encoded.
    #[error("image codec error: {0}")]
    Image(#[from] image::ImageError),

    /// The canvas could not be created for the image's dimensions.
    #[error("cannot create a {width}x{height} canvas")]
    Canvas { width: u32, height: u32 },

    /// Text needs drawing but no font is loaded for it.
    #[error("no font available for {0:?}")]
    FontUnavailable(String),

    /// Font bytes were not a usable TrueType/OpenType font.
    #[error("invalid font data: {0}")]
    InvalidFont(#[from] ab_glyph::InvalidFont),
}

/// Failure while writing the zip archive.
#[derive(Debug, thiserror::Error)]
pub enum ArchiveError {
    #[error("zip error: {0}")]
    Zip(#[from] zip::result::ZipError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Failure while writing the PDF document.
#[derive(Debug, thiserror::Error)]
pub enum PdfError {
    /// No pages to write.
    #[error("document has no pages")]
    Empty,

    #[error("pdf error: {0}")]
    Pdf(#[from] printpdf::Error),
}

/// Failure of a whole export run. Its `Display` text is the message shown
/// in the terminal error status.
#[derive(Debug, thiserror::Error)]
pub enum ExportError {
    #[error("failed to process {name}: {source}")]
    Render {
        name: String,
        #[source]
        source: RenderError,
    },

    #[error("failed to encode {name}: {source}")]
    Encode {
        name: String,
        #[source]
        source: image::ImageError,
    },

    #[error(transparent)]
    Archive(#[from] ArchiveError),

    #[error(transparent)]
    Pdf(#[from] PdfError),

    /// The sink rejected the finished artifact.
    #[error("failed to deliver {file_name}: {message}")]
    Deliver { file_name: String, message: String },

    #[error("export cancelled")]
    Cancelled,

    #[error("nothing to export")]
    NoImages,
}
