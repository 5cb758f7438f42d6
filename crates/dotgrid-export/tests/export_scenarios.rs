//! Integration tests: ingest uploads, annotate through a session, and
//! export the result as a zip archive or PDF.

#![allow(clippy::unwrap_used, clippy::expect_used)]

use std::io::{Cursor, Read};

use dotgrid_core::{
    Dimensions, EditorDefaults, ImageRecord, InputFile, PageRasterizer, PageSelection, Point,
    RasterizedPage, Session, ingest,
};
use dotgrid_export::{
    CancelToken, ExportArtifact, ExportContext, ExportFormat, ExportStatus, FontBook, Overlay,
    compose, encode_png, export,
};
use image::{Rgba, RgbaImage};

fn white_png(width: u32, height: u32) -> Vec<u8> {
    encode_png(&RgbaImage::from_pixel(width, height, Rgba([255, 255, 255, 255]))).unwrap()
}

fn square(x0: f64, y0: f64, side: f64) -> Vec<Point> {
    vec![
        Point::new(x0, y0),
        Point::new(x0 + side, y0),
        Point::new(x0 + side, y0 + side),
        Point::new(x0, y0 + side),
    ]
}

/// Renders every PDF as `pages` blank pages.
struct BlankPages {
    pages: u32,
}

impl PageRasterizer for BlankPages {
    fn rasterize(&self, _name: &str, _bytes: &[u8]) -> Result<Vec<RasterizedPage>, String> {
        Ok((1..=self.pages)
            .map(|page_number| RasterizedPage {
                page_number,
                bytes: white_png(10, 14),
                dimensions: Dimensions {
                    width: 10,
                    height: 14,
                },
            })
            .collect())
    }
}

fn export_to_memory(records: &[ImageRecord], format: ExportFormat) -> (ExportArtifact, Vec<ExportStatus>) {
    let mut ctx = ExportContext::new(FontBook::empty(), EditorDefaults::default());
    let mut statuses = Vec::new();
    let mut sink: Vec<ExportArtifact> = Vec::new();
    export(
        records,
        format,
        &mut ctx,
        &CancelToken::new(),
        &mut |s| statuses.push(s.clone()),
        &mut sink,
    )
    .expect("export should succeed");
    (sink.pop().expect("one artifact"), statuses)
}

fn dark_pixels(image: &RgbaImage, x0: u32, y0: u32, x1: u32, y1: u32) -> usize {
    (y0..y1)
        .flat_map(|y| (x0..x1).map(move |x| (x, y)))
        .filter(|&(x, y)| image.get_pixel(x, y).0[0] < 128)
        .count()
}

#[test]
fn hidden_layer_is_absent_from_export() {
    let mut session = Session::with_seed(EditorDefaults::default(), 7);
    session.add_images(vec![ImageRecord::new(
        "img",
        "photo.jpg",
        white_png(80, 80),
        Dimensions {
            width: 80,
            height: 80,
        },
    )]);
    session.set_size(6.0);
    session.set_gap(4.0);
    session.set_amount(50);

    session.set_polygon(square(0.0, 0.0, 30.0));
    assert_eq!(session.commit_layer().unwrap(), 0);
    session.set_polygon(square(45.0, 45.0, 30.0));
    assert_eq!(session.commit_layer().unwrap(), 1);
    assert!(!session.toggle_visibility(0).unwrap());

    let (artifact, statuses) = export_to_memory(&session.export_records(), ExportFormat::Zip);
    assert!(matches!(statuses.last(), Some(ExportStatus::Completed { .. })));

    let mut zip = zip::ZipArchive::new(Cursor::new(artifact.bytes)).unwrap();
    let mut png = Vec::new();
    zip.by_name("photo.png").unwrap().read_to_end(&mut png).unwrap();
    let out = image::load_from_memory(&png).unwrap().into_rgba8();

    assert_eq!(dark_pixels(&out, 0, 0, 40, 40), 0, "hidden layer was drawn");
    assert!(dark_pixels(&out, 44, 44, 80, 80) > 0, "visible layer is missing");
}

#[test]
fn pdf_pages_are_grouped_into_a_folder() {
    let files = vec![
        InputFile::new("report.pdf", b"%PDF-1.7 stub".to_vec()),
        InputFile::new("photo.png", white_png(12, 8)),
    ];
    let records = ingest(files, Some(&BlankPages { pages: 3 }), &PageSelection::All).unwrap();
    assert_eq!(records.len(), 4);

    let (artifact, _) = export_to_memory(&records, ExportFormat::Zip);
    let zip = zip::ZipArchive::new(Cursor::new(artifact.bytes)).unwrap();
    let names: Vec<&str> = zip.file_names().collect();

    let root: Vec<&str> = names.iter().copied().filter(|n| !n.contains('/')).collect();
    assert_eq!(root, vec!["photo.png"]);

    let mut pages: Vec<&str> = names
        .iter()
        .copied()
        .filter(|n| n.starts_with("report/") && !n.ends_with('/'))
        .collect();
    pages.sort_unstable();
    assert_eq!(
        pages,
        vec![
            "report/страница_1.png",
            "report/страница_2.png",
            "report/страница_3.png"
        ]
    );
}

#[test]
fn pdf_export_writes_a_document() {
    let files = vec![
        InputFile::new("a.png", white_png(20, 10)),
        InputFile::new("b.png", white_png(10, 20)),
    ];
    let records = ingest(files, None, &PageSelection::All).unwrap();
    let (artifact, _) = export_to_memory(&records, ExportFormat::Pdf);
    assert_eq!(artifact.mime_type, "application/pdf");
    assert!(artifact.bytes.starts_with(b"%PDF"));

    assert_eq!(artifact.file_name, "Результат.pdf");
    assert!(String::from_utf8_lossy(&artifact.bytes).contains("%%EOF"));
}

#[test]
fn preview_matches_export_pixel_for_pixel() {
    let mut session = Session::with_seed(EditorDefaults::default(), 3);
    session.add_images(vec![ImageRecord::new(
        "img",
        "scan.png",
        white_png(64, 64),
        Dimensions {
            width: 64,
            height: 64,
        },
    )]);
    session.set_size(5.0);
    session.set_gap(3.0);
    session.set_rotation(30.0);
    session.set_amount(40);
    session.set_polygon(vec![
        Point::new(4.0, 6.0),
        Point::new(58.0, 10.0),
        Point::new(40.0, 60.0),
    ]);

    let base = white_png(64, 64);
    let base = image::load_from_memory(&base).unwrap().into_rgba8();
    let fonts = FontBook::empty();
    let defaults = EditorDefaults::default();

    let live = session.preview().to_vec();
    assert!(!live.is_empty());
    let before = session.export_records().remove(0);
    let preview = compose(
        &base,
        &before,
        &Overlay {
            exclude_layer: session.edit_index(),
            live_dots: &live,
            live_size: session.params().size,
        },
        &fonts,
        &defaults,
    )
    .unwrap();

    session.commit_layer().unwrap();
    let after = session.export_records().remove(0);
    let exported = compose(&base, &after, &Overlay::NONE, &fonts, &defaults).unwrap();

    assert_eq!(preview, exported);
}
