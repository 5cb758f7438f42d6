//! dotgrid-export: compositing and output serializers for dotgrid (sans-IO).
//!
//! Rasterizes image records with their visible annotation layers onto a
//! premultiplied canvas, encodes PNG, and bundles results into a zip
//! archive or a multi-page PDF. Everything works on in-memory buffers;
//! delivery of the finished bytes goes through an [`ExportSink`] supplied
//! by the host.

pub mod archive;
pub mod batch;
pub mod canvas;
pub mod compose;
pub mod error;
pub mod fonts;
pub mod pdf;

pub use archive::{ArchiveLayout, DEFAULT_ARCHIVE_NAME, archive_layout, create_archive};
pub use batch::{
    CancelToken, ExportArtifact, ExportContext, ExportFormat, ExportSink, ExportStatus, export,
};
pub use canvas::{Canvas, text_extent};
pub use compose::{Overlay, RenderedImage, compose, encode_png, output_name, rasterize};
pub use error::{ArchiveError, ExportError, PdfError, RenderError};
pub use fonts::{FontBook, font_from_bytes};
pub use pdf::{DEFAULT_DOCUMENT_NAME, create_document};
