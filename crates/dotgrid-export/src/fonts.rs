//! Fonts for freeform text and numbering labels.
//!
//! The book maps family names to loaded fonts, with a fallback used for
//! any family that is missing and a separate slot for the bold face used
//! by numbering labels. Loading font files is left to the caller.

use std::collections::HashMap;

use ab_glyph::FontArc;

use crate::error::RenderError;

/// Loaded fonts keyed by family name.
#[derive(Clone, Default)]
pub struct FontBook {
    families: HashMap<String, FontArc>,
    fallback: Option<FontArc>,
    label: Option<FontArc>,
}

impl std::fmt::Debug for FontBook {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut families: Vec<&str> = self.families.keys().map(String::as_str).collect();
        families.sort_unstable();
        f.debug_struct("FontBook")
            .field("families", &families)
            .field("fallback", &self.fallback.is_some())
            .field("label", &self.label.is_some())
            .finish()
    }
}

/// Parse TrueType/OpenType bytes.
///
/// # Errors
///
/// [`RenderError::InvalidFont`] if the bytes are not a font.
pub fn font_from_bytes(bytes: Vec<u8>) -> Result<FontArc, RenderError> {
    Ok(FontArc::try_from_vec(bytes)?)
}

impl FontBook {
    /// A book with no fonts. Rendering anything with text fails with
    /// [`RenderError::FontUnavailable`].
    #[must_use]
    pub fn empty() -> Self {
        Self::default()
    }

    /// A book that uses `font` for every family and for labels.
    #[must_use]
    pub fn with_fallback(font: FontArc) -> Self {
        Self {
            fallback: Some(font),
            ..Self::default()
        }
    }

    /// Register `font` under `family` (matched case-insensitively).
    pub fn insert(&mut self, family: &str, font: FontArc) {
        self.families.insert(family.to_lowercase(), font);
    }

    pub fn set_fallback(&mut self, font: FontArc) {
        self.fallback = Some(font);
    }

    /// Set the bold face used for numbering labels.
    pub fn set_label_font(&mut self, font: FontArc) {
        self.label = Some(font);
    }

    #[must_use]
    pub fn contains(&self, family: &str) -> bool {
        self.families.contains_key(&family.to_lowercase())
    }

    /// Font for freeform text in `family`, or the fallback.
    ///
    /// # Errors
    ///
    /// [`RenderError::FontUnavailable`] when neither is loaded.
    pub fn text_font(&self, family: &str) -> Result<&FontArc, RenderError> {
        self.families
            .get(&family.to_lowercase())
            .or(self.fallback.as_ref())
            .ok_or_else(|| RenderError::FontUnavailable(family.to_owned()))
    }

    /// Font for numbering labels, or the fallback.
    ///
    /// # Errors
    ///
    /// [`RenderError::FontUnavailable`] when neither is loaded.
    pub fn label_font(&self) -> Result<&FontArc, RenderError> {
        self.label
            .as_ref()
            .or(self.fallback.as_ref())
            .ok_or_else(|| RenderError::FontUnavailable("numbering label".to_owned()))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn empty_book_reports_missing_family() {
        let book = FontBook::empty();
        let err = book.text_font("Georgia").unwrap_err();
        assert!(matches!(err, RenderError::FontUnavailable(ref f) if f == "Georgia"));
        assert!(book.label_font().is_err());
    }

    #[test]
    fn garbage_bytes_are_rejected() {
        assert!(matches!(
            font_from_bytes(b"definitely not a font".to_vec()),
            Err(RenderError::InvalidFont(_))
        ));
    }
}
