//! Font discovery for the CLI.
//!
//! Explicit `--font`/`--label-font` paths win. Otherwise well-known system
//! locations are searched for each offered family, a general fallback, and a
//! bold face for numbering labels.

use std::path::Path;

use ab_glyph::FontArc;
use dotgrid_core::EditorDefaults;
use dotgrid_export::{FontBook, font_from_bytes};

/// Candidate files per family, first readable one wins.
const FAMILY_FILES: &[(&str, &[&str])] = &[
    (
        "Arial",
        &[
            "/usr/share/fonts/truetype/msttcorefonts/Arial.ttf",
            "/System/Library/Fonts/Supplemental/Arial.ttf",
            "C:\\Windows\\Fonts\\arial.ttf",
        ],
    ),
    (
        "Times New Roman",
        &[
            "/usr/share/fonts/truetype/msttcorefonts/Times_New_Roman.ttf",
            "/System/Library/Fonts/Supplemental/Times New Roman.ttf",
            "C:\\Windows\\Fonts\\times.ttf",
        ],
    ),
    (
        "Georgia",
        &[
            "/usr/share/fonts/truetype/msttcorefonts/Georgia.ttf",
            "/System/Library/Fonts/Supplemental/Georgia.ttf",
            "C:\\Windows\\Fonts\\georgia.ttf",
        ],
    ),
    (
        "Verdana",
        &[
            "/usr/share/fonts/truetype/msttcorefonts/Verdana.ttf",
            "/System/Library/Fonts/Supplemental/Verdana.ttf",
            "C:\\Windows\\Fonts\\verdana.ttf",
        ],
    ),
    (
        "Courier New",
        &[
            "/usr/share/fonts/truetype/msttcorefonts/Courier_New.ttf",
            "/System/Library/Fonts/Supplemental/Courier New.ttf",
            "C:\\Windows\\Fonts\\cour.ttf",
        ],
    ),
    (
        "Impact",
        &[
            "/usr/share/fonts/truetype/msttcorefonts/Impact.ttf",
            "/System/Library/Fonts/Supplemental/Impact.ttf",
            "C:\\Windows\\Fonts\\impact.ttf",
        ],
    ),
    (
        "Comic Sans MS",
        &[
            "/usr/share/fonts/truetype/msttcorefonts/Comic_Sans_MS.ttf",
            "/System/Library/Fonts/Supplemental/Comic Sans MS.ttf",
            "C:\\Windows\\Fonts\\comic.ttf",
        ],
    ),
];

const FALLBACK_FILES: &[&str] = &[
    "/usr/share/fonts/truetype/dejavu/DejaVuSans.ttf",
    "/usr/share/fonts/TTF/DejaVuSans.ttf",
    "/usr/share/fonts/truetype/liberation/LiberationSans-Regular.ttf",
    "/System/Library/Fonts/Supplemental/Arial Unicode.ttf",
    "/System/Library/Fonts/Supplemental/Arial.ttf",
    "C:\\Windows\\Fonts\\arial.ttf",
];

const LABEL_FILES: &[&str] = &[
    "/usr/share/fonts/truetype/dejavu/DejaVuSans-Bold.ttf",
    "/usr/share/fonts/TTF/DejaVuSans-Bold.ttf",
    "/usr/share/fonts/truetype/liberation/LiberationSans-Bold.ttf",
    "/System/Library/Fonts/Supplemental/Arial Bold.ttf",
    "C:\\Windows\\Fonts\\arialbd.ttf",
];

/// Build the font book used for rendering.
///
/// # Errors
///
/// Returns a message if an explicitly given font cannot be read or parsed.
pub fn load_font_book(font: Option<&Path>, label_font: Option<&Path>) -> Result<FontBook, String> {
    let mut book = FontBook::empty();

    for (family, candidates) in FAMILY_FILES {
        debug_assert!(EditorDefaults::FONT_FAMILIES.contains(family));
        if let Some(found) = first_readable(candidates) {
            book.insert(family, found);
        }
    }

    match font {
        Some(path) => book.set_fallback(load_explicit(path)?),
        None => {
            if let Some(found) = first_readable(FALLBACK_FILES) {
                book.set_fallback(found);
            } else {
                log::warn!("no system font found; text and numbering need --font");
            }
        }
    }

    match label_font {
        Some(path) => book.set_label_font(load_explicit(path)?),
        None => {
            if let Some(found) = first_readable(LABEL_FILES) {
                book.set_label_font(found);
            }
        }
    }

    log::debug!("fonts: {book:?}");
    Ok(book)
}

fn load_explicit(path: &Path) -> Result<FontArc, String> {
    let bytes =
        std::fs::read(path).map_err(|e| format!("Error reading font {}: {e}", path.display()))?;
    font_from_bytes(bytes).map_err(|e| format!("Error loading font {}: {e}", path.display()))
}

fn first_readable(candidates: &[&str]) -> Option<FontArc> {
    candidates.iter().find_map(|path| {
        let bytes = std::fs::read(path).ok()?;
        match font_from_bytes(bytes) {
            Ok(font) => {
                log::debug!("fonts: loaded {path}");
                Some(font)
            }
            Err(e) => {
                log::warn!("fonts: skipping {path}: {e}");
                None
            }
        }
    })
}
