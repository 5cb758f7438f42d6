//! Export orchestration: rasterize every record, bundle, hand off.
//!
//! A run reports its phase through a status callback. Errors in any phase
//! end the run with [`ExportStatus::Error`]; nothing already rasterized is
//! kept. A [`CancelToken`] is checked before each image and before
//! bundling.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use dotgrid_core::{DecodedCache, EditorDefaults, ImageRecord};

use crate::archive::{DEFAULT_ARCHIVE_NAME, create_archive};
use crate::compose::{RenderedImage, encode_png, rasterize};
use crate::error::ExportError;
use crate::fonts::FontBook;
use crate::pdf::{DEFAULT_DOCUMENT_NAME, create_document};

/// Bundle produced by an export run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ExportFormat {
    /// PNG files in a zip archive.
    #[default]
    Zip,
    /// One PDF page per image.
    Pdf,
}

impl ExportFormat {
    #[must_use]
    pub const fn default_file_name(self) -> &'static str {
        match self {
            Self::Zip => DEFAULT_ARCHIVE_NAME,
            Self::Pdf => DEFAULT_DOCUMENT_NAME,
        }
    }

    #[must_use]
    pub const fn mime_type(self) -> &'static str {
        match self {
            Self::Zip => "application/zip",
            Self::Pdf => "application/pdf",
        }
    }
}

/// Progress of an export run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExportStatus {
    /// Rasterizing image `index` (0-based) of `total`.
    Processing {
        index: usize,
        total: usize,
        name: String,
    },
    /// Bundling into the archive or document.
    Encoding,
    /// Handing the artifact to the sink.
    Delivering,
    Completed { file_name: String },
    /// Terminal failure with a human-readable message.
    Error(String),
    Cancelled,
}

impl ExportStatus {
    /// Overall progress in percent, for a progress bar.
    ///
    /// Rasterization spans 0..80, bundling sits at 90, hand-off at 95.
    /// Failed and cancelled runs report no progress.
    #[must_use]
    pub const fn percent(&self) -> Option<u8> {
        match self {
            #[allow(clippy::cast_possible_truncation)]
            Self::Processing { index, total, .. } => {
                if *total == 0 {
                    Some(0)
                } else {
                    Some((*index * 80 / *total) as u8)
                }
            }
            Self::Encoding => Some(90),
            Self::Delivering => Some(95),
            Self::Completed { .. } => Some(100),
            Self::Error(_) | Self::Cancelled => None,
        }
    }

    /// Whether the run has ended.
    #[must_use]
    pub const fn is_terminal(&self) -> bool {
        matches!(
            self,
            Self::Completed { .. } | Self::Error(_) | Self::Cancelled
        )
    }
}

/// Shared flag for aborting a run from elsewhere.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

/// Finished export bytes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportArtifact {
    pub file_name: String,
    pub mime_type: &'static str,
    pub bytes: Vec<u8>,
}

/// Receives the finished artifact: a file write, a download, a buffer.
pub trait ExportSink {
    /// Take ownership of `artifact`.
    ///
    /// # Errors
    ///
    /// A message describing why delivery failed.
    fn deliver(&mut self, artifact: ExportArtifact) -> Result<(), String>;
}

impl ExportSink for Vec<ExportArtifact> {
    fn deliver(&mut self, artifact: ExportArtifact) -> Result<(), String> {
        self.push(artifact);
        Ok(())
    }
}

/// Fonts, defaults and decoded-image cache used while rasterizing.
#[derive(Debug, Clone)]
pub struct ExportContext {
    pub fonts: FontBook,
    pub defaults: EditorDefaults,
    pub cache: DecodedCache,
    /// Artifact file name; the format's default when `None`.
    pub file_name: Option<String>,
}

impl ExportContext {
    /// Context with a cache sized from `defaults`.
    #[must_use]
    pub fn new(fonts: FontBook, defaults: EditorDefaults) -> Self {
        let cache = DecodedCache::new(defaults.cache_capacity);
        Self {
            fonts,
            defaults,
            cache,
            file_name: None,
        }
    }
}

/// Rasterize `images` in order, bundle them as `format`, and deliver the
/// artifact to `sink`.
///
/// Decoded pixels cached for images no longer in `images` are released
/// first, so exporting a session's records after removals frees them.
///
/// `on_status` sees every phase transition and exactly one terminal
/// status.
///
/// # Errors
///
/// [`ExportError::NoImages`] for empty input, [`ExportError::Cancelled`]
/// when `cancel` fires, otherwise the first render, encode, bundle or
/// delivery failure.
pub fn export(
    images: &[ImageRecord],
    format: ExportFormat,
    ctx: &mut ExportContext,
    cancel: &CancelToken,
    on_status: &mut dyn FnMut(&ExportStatus),
    sink: &mut dyn ExportSink,
) -> Result<(), ExportError> {
    let result = run(images, format, ctx, cancel, on_status, sink);
    match &result {
        Ok(()) => {}
        Err(ExportError::Cancelled) => {
            log::info!("export: cancelled");
            on_status(&ExportStatus::Cancelled);
        }
        Err(e) => {
            log::error!("export: {e}");
            on_status(&ExportStatus::Error(e.to_string()));
        }
    }
    result
}

fn run(
    images: &[ImageRecord],
    format: ExportFormat,
    ctx: &mut ExportContext,
    cancel: &CancelToken,
    on_status: &mut dyn FnMut(&ExportStatus),
    sink: &mut dyn ExportSink,
) -> Result<(), ExportError> {
    if images.is_empty() {
        return Err(ExportError::NoImages);
    }

    ctx.cache.retain_images(images);
    let total = images.len();
    let mut rendered = Vec::with_capacity(total);
    for (index, record) in images.iter().enumerate() {
        if cancel.is_cancelled() {
            return Err(ExportError::Cancelled);
        }
        on_status(&ExportStatus::Processing {
            index,
            total,
            name: record.name.clone(),
        });
        let image = rasterize(record, &mut ctx.cache, &ctx.fonts, &ctx.defaults).map_err(
            |source| ExportError::Render {
                name: record.name.clone(),
                source,
            },
        )?;
        rendered.push(image);
    }

    if cancel.is_cancelled() {
        return Err(ExportError::Cancelled);
    }
    on_status(&ExportStatus::Encoding);
    let file_name = ctx
        .file_name
        .clone()
        .unwrap_or_else(|| format.default_file_name().to_owned());
    let bytes = match format {
        ExportFormat::Zip => create_archive(&encode_all(rendered)?)?,
        ExportFormat::Pdf => create_document(stem(&file_name), &rendered)?,
    };
    log::info!("export: {} ({} bytes)", file_name, bytes.len());

    on_status(&ExportStatus::Delivering);
    sink.deliver(ExportArtifact {
        file_name: file_name.clone(),
        mime_type: format.mime_type(),
        bytes,
    })
    .map_err(|message| ExportError::Deliver {
        file_name: file_name.clone(),
        message,
    })?;

    on_status(&ExportStatus::Completed { file_name });
    Ok(())
}

fn encode_all(rendered: Vec<RenderedImage>) -> Result<Vec<(String, Vec<u8>)>, ExportError> {
    rendered
        .into_iter()
        .map(|image| {
            let bytes = encode_png(&image.pixels).map_err(|source| ExportError::Encode {
                name: image.name.clone(),
                source,
            })?;
            Ok((image.name, bytes))
        })
        .collect()
}

fn stem(file_name: &str) -> &str {
    file_name
        .rsplit_once('.')
        .map_or(file_name, |(stem, _)| stem)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use dotgrid_core::Dimensions;
    use image::{Rgba, RgbaImage};

    use super::*;

    fn record(id: &str, name: &str) -> ImageRecord {
        let bytes = encode_png(&RgbaImage::from_pixel(6, 4, Rgba([50, 60, 70, 255]))).unwrap();
        ImageRecord::new(
            id,
            name,
            bytes,
            Dimensions {
                width: 6,
                height: 4,
            },
        )
    }

    fn ctx() -> ExportContext {
        ExportContext::new(FontBook::empty(), EditorDefaults::default())
    }

    fn run_export(
        images: &[ImageRecord],
        format: ExportFormat,
        cancel: &CancelToken,
    ) -> (Result<(), ExportError>, Vec<ExportStatus>, Vec<ExportArtifact>) {
        let mut statuses = Vec::new();
        let mut sink: Vec<ExportArtifact> = Vec::new();
        let result = export(
            images,
            format,
            &mut ctx(),
            cancel,
            &mut |s| statuses.push(s.clone()),
            &mut sink,
        );
        (result, statuses, sink)
    }

    // --- Status tests ---

    #[test]
    fn percent_by_phase() {
        let processing = ExportStatus::Processing {
            index: 1,
            total: 2,
            name: String::new(),
        };
        assert_eq!(processing.percent(), Some(40));
        assert_eq!(ExportStatus::Encoding.percent(), Some(90));
        assert_eq!(ExportStatus::Delivering.percent(), Some(95));
        assert_eq!(ExportStatus::Cancelled.percent(), None);
        assert!(ExportStatus::Error("x".to_owned()).is_terminal());
        assert!(!ExportStatus::Encoding.is_terminal());
    }

    // --- Run tests ---

    #[test]
    fn zip_run_reports_every_phase() {
        let images = [record("a", "one.jpg"), record("b", "two.png")];
        let (result, statuses, sink) = run_export(&images, ExportFormat::Zip, &CancelToken::new());
        result.unwrap();

        assert_eq!(
            statuses,
            vec![
                ExportStatus::Processing {
                    index: 0,
                    total: 2,
                    name: "one.jpg".to_owned()
                },
                ExportStatus::Processing {
                    index: 1,
                    total: 2,
                    name: "two.png".to_owned()
                },
                ExportStatus::Encoding,
                ExportStatus::Delivering,
                ExportStatus::Completed {
                    file_name: DEFAULT_ARCHIVE_NAME.to_owned()
                },
            ]
        );
        assert_eq!(sink.len(), 1);
        assert_eq!(sink[0].mime_type, "application/zip");
        assert!(sink[0].bytes.starts_with(b"PK"));
    }

    #[test]
    fn pdf_run_delivers_a_document() {
        let (result, _, sink) =
            run_export(&[record("a", "one.png")], ExportFormat::Pdf, &CancelToken::new());
        result.unwrap();
        assert_eq!(sink[0].file_name, DEFAULT_DOCUMENT_NAME);
        assert!(sink[0].bytes.starts_with(b"%PDF"));
    }

    #[test]
    fn empty_input_is_an_error_status() {
        let (result, statuses, sink) = run_export(&[], ExportFormat::Zip, &CancelToken::new());
        assert!(matches!(result, Err(ExportError::NoImages)));
        assert_eq!(statuses, vec![ExportStatus::Error("nothing to export".to_owned())]);
        assert!(sink.is_empty());
    }

    #[test]
    fn decode_failure_aborts_the_batch() {
        let mut broken = record("b", "broken.png");
        broken.bytes = Arc::from(&b"not an image"[..]);
        let images = [broken, record("c", "fine.png")];
        let (result, statuses, sink) = run_export(&images, ExportFormat::Zip, &CancelToken::new());

        assert!(matches!(result, Err(ExportError::Render { ref name, .. }) if name == "broken.png"));
        assert_eq!(statuses.len(), 2);
        assert!(matches!(statuses.last(), Some(ExportStatus::Error(m)) if m.contains("broken.png")));
        assert!(sink.is_empty());
    }

    #[test]
    fn cancel_mid_run_stops_before_next_image() {
        let cancel = CancelToken::new();
        let trigger = cancel.clone();
        let images = [record("a", "a.png"), record("b", "b.png"), record("c", "c.png")];
        let mut statuses = Vec::new();
        let mut sink: Vec<ExportArtifact> = Vec::new();
        let result = export(
            &images,
            ExportFormat::Zip,
            &mut ctx(),
            &cancel,
            &mut |s| {
                if matches!(s, ExportStatus::Processing { index: 0, .. }) {
                    trigger.cancel();
                }
                statuses.push(s.clone());
            },
            &mut sink,
        );

        assert!(matches!(result, Err(ExportError::Cancelled)));
        assert_eq!(statuses.len(), 2);
        assert_eq!(statuses[1], ExportStatus::Cancelled);
        assert!(sink.is_empty());
    }

    #[test]
    fn sink_failure_is_reported() {
        struct Refuse;
        impl ExportSink for Refuse {
            fn deliver(&mut self, _: ExportArtifact) -> Result<(), String> {
                Err("disk full".to_owned())
            }
        }
        let mut statuses = Vec::new();
        let result = export(
            &[record("a", "a.png")],
            ExportFormat::Zip,
            &mut ctx(),
            &CancelToken::new(),
            &mut |s| statuses.push(s.clone()),
            &mut Refuse,
        );
        assert!(matches!(result, Err(ExportError::Deliver { ref message, .. }) if message == "disk full"));
        assert!(matches!(statuses.last(), Some(ExportStatus::Error(m)) if m.contains("disk full")));
    }

    #[test]
    fn same_output_name_from_two_uploads() {
        let images = [record("a", "photo.jpg"), record("b", "photo.png")];
        let (result, _, sink) = run_export(&images, ExportFormat::Zip, &CancelToken::new());
        result.unwrap();
        let zip = zip::ZipArchive::new(std::io::Cursor::new(sink[0].bytes.clone())).unwrap();
        let mut names: Vec<&str> = zip.file_names().collect();
        names.sort_unstable();
        assert_eq!(names, vec!["photo (2).png", "photo.png"]);
    }

    #[test]
    fn export_releases_decoded_pixels_of_removed_images() {
        let mut ctx = ctx();
        let mut sink: Vec<ExportArtifact> = Vec::new();
        let both = [record("kept", "kept.png"), record("gone", "gone.png")];
        export(&both, ExportFormat::Zip, &mut ctx, &CancelToken::new(), &mut |_| {}, &mut sink).unwrap();
        assert!(ctx.cache.contains("gone"));

        export(&both[..1], ExportFormat::Zip, &mut ctx, &CancelToken::new(), &mut |_| {}, &mut sink).unwrap();
        assert!(ctx.cache.contains("kept"));
        assert!(!ctx.cache.contains("gone"));
    }

    #[test]
    fn custom_file_name_and_pdf_title_stem() {
        let mut ctx = ctx();
        ctx.file_name = Some("scans.pdf".to_owned());
        let mut sink: Vec<ExportArtifact> = Vec::new();
        export(
            &[record("a", "a.png")],
            ExportFormat::Pdf,
            &mut ctx,
            &CancelToken::new(),
            &mut |_| {},
            &mut sink,
        )
        .unwrap();
        assert_eq!(sink[0].file_name, "scans.pdf");
        assert_eq!(stem("scans.pdf"), "scans");
        assert_eq!(stem("plain"), "plain");
    }
}
