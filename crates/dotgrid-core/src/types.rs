//! Shared types for the dotgrid annotation engine.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Re-export `RgbaImage` so downstream crates can reference decoded
/// pixel data without depending on `image` directly.
pub use image::RgbaImage;

/// A 2D point in image pixel coordinates (not screen space).
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Point {
    /// Horizontal position (pixels from left edge).
    pub x: f64,
    /// Vertical position (pixels from top edge).
    pub y: f64,
}

impl Point {
    /// Create a new point.
    #[must_use]
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Squared Euclidean distance to another point.
    #[must_use]
    pub fn distance_squared(self, other: Self) -> f64 {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        dx.mul_add(dx, dy * dy)
    }

    /// Euclidean distance to another point.
    #[must_use]
    pub fn distance(self, other: Self) -> f64 {
        self.distance_squared(other).sqrt()
    }

    /// Component-wise translation.
    #[must_use]
    pub fn offset(self, dx: f64, dy: f64) -> Self {
        Self::new(self.x + dx, self.y + dy)
    }
}

/// An ordered lasso outline. Edges run between consecutive vertices and
/// wrap from the last vertex back to the first.
///
/// Fewer than three vertices is representable (an in-progress or cleared
/// lasso) but is not a valid region: [`Polygon::is_region`] is `false`
/// and lattice generation yields nothing.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Polygon(Vec<Point>);

impl Polygon {
    /// Create a polygon from its vertices in edge order.
    #[must_use]
    pub const fn new(points: Vec<Point>) -> Self {
        Self(points)
    }

    /// Returns `true` if the polygon has no vertices.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Returns the number of vertices.
    #[must_use]
    pub const fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns `true` if the polygon has enough vertices to enclose an area.
    #[must_use]
    pub const fn is_region(&self) -> bool {
        self.0.len() >= 3
    }

    /// Returns a slice of all vertices.
    #[must_use]
    pub fn points(&self) -> &[Point] {
        &self.0
    }

    /// Iterate the closed edge list as `(start, end)` pairs, including the
    /// wrap-around edge from the last vertex to the first.
    pub fn edges(&self) -> impl Iterator<Item = (Point, Point)> + '_ {
        let n = self.0.len();
        (0..n).map(move |i| (self.0[i], self.0[(i + 1) % n]))
    }

    /// Consumes the polygon and returns its vertices.
    #[must_use]
    pub fn into_points(self) -> Vec<Point> {
        self.0
    }
}

impl From<Vec<Point>> for Polygon {
    fn from(points: Vec<Point>) -> Self {
        Self(points)
    }
}

/// Axis-aligned bounding box.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Bounds {
    pub min_x: f64,
    pub min_y: f64,
    pub max_x: f64,
    pub max_y: f64,
}

impl Bounds {
    /// Returns `true` if `p` lies within the box grown by `margin` on
    /// every side (edges inclusive).
    #[must_use]
    pub fn contains_with_margin(&self, p: Point, margin: f64) -> bool {
        p.x >= self.min_x - margin
            && p.x <= self.max_x + margin
            && p.y >= self.min_y - margin
            && p.y <= self.max_y + margin
    }
}

/// Image dimensions in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dimensions {
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
}

// ---------------------------------------------------------------------------
// Color
// ---------------------------------------------------------------------------

/// An sRGB color with straight (non-premultiplied) alpha.
///
/// Parsed from `#rgb`, `#rrggbb`, `#rrggbbaa`, `black`, or `white`;
/// serialized as lowercase hex.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl Color {
    pub const BLACK: Self = Self::rgb(0, 0, 0);
    pub const WHITE: Self = Self::rgb(255, 255, 255);

    /// An opaque color.
    #[must_use]
    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b, a: 255 }
    }

    /// Channels as an `[r, g, b, a]` array.
    #[must_use]
    pub const fn to_array(self) -> [u8; 4] {
        [self.r, self.g, self.b, self.a]
    }
}

impl Default for Color {
    fn default() -> Self {
        Self::BLACK
    }
}

/// Error returned when a color string cannot be parsed.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid color {0:?}: expected #rgb, #rrggbb, #rrggbbaa, black, or white")]
pub struct ParseColorError(String);

impl FromStr for Color {
    type Err = ParseColorError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        match trimmed.to_ascii_lowercase().as_str() {
            "black" => return Ok(Self::BLACK),
            "white" => return Ok(Self::WHITE),
            _ => {}
        }
        let err = || ParseColorError(s.to_owned());
        let hex = trimmed.strip_prefix('#').ok_or_else(err)?;
        if !hex.is_ascii() {
            return Err(err());
        }
        let byte = |i: usize| u8::from_str_radix(&hex[i..i + 2], 16).map_err(|_| err());
        let nibble = |i: usize| {
            u8::from_str_radix(&hex[i..=i], 16)
                .map(|v| v * 17)
                .map_err(|_| err())
        };
        match hex.len() {
            3 => Ok(Self::rgb(nibble(0)?, nibble(1)?, nibble(2)?)),
            6 => Ok(Self::rgb(byte(0)?, byte(2)?, byte(4)?)),
            8 => Ok(Self {
                r: byte(0)?,
                g: byte(2)?,
                b: byte(4)?,
                a: byte(6)?,
            }),
            _ => Err(err()),
        }
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{:02x}{:02x}{:02x}", self.r, self.g, self.b)?;
        if self.a != 255 {
            write!(f, "{:02x}", self.a)?;
        }
        Ok(())
    }
}

impl TryFrom<String> for Color {
    type Error = ParseColorError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Color> for String {
    fn from(color: Color) -> Self {
        color.to_string()
    }
}

// ---------------------------------------------------------------------------
// Numbering labels
// ---------------------------------------------------------------------------

/// Where a numbering label sits relative to its dot.
///
/// The set is closed; serialized names are kebab-case
/// (`top`, `top-right`, ... `top-left`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum LabelPosition {
    #[default]
    Top,
    TopRight,
    Right,
    BottomRight,
    Bottom,
    BottomLeft,
    Left,
    TopLeft,
}

impl LabelPosition {
    /// Every position in clockwise order starting at the top.
    pub const ALL: [Self; 8] = [
        Self::Top,
        Self::TopRight,
        Self::Right,
        Self::BottomRight,
        Self::Bottom,
        Self::BottomLeft,
        Self::Left,
        Self::TopLeft,
    ];

    /// Axis signs of the direction from the dot toward the label
    /// (`-1`, `0`, or `1` on each axis; y grows downward).
    #[must_use]
    pub const fn direction(self) -> (i8, i8) {
        match self {
            Self::Top => (0, -1),
            Self::TopRight => (1, -1),
            Self::Right => (1, 0),
            Self::BottomRight => (1, 1),
            Self::Bottom => (0, 1),
            Self::BottomLeft => (-1, 1),
            Self::Left => (-1, 0),
            Self::TopLeft => (-1, -1),
        }
    }
}

/// Optional numbering-label style fields.
///
/// Used both as layer-level settings and as per-dot overrides. Each
/// unset field falls back to the next level, see
/// [`crate::numbering::resolve_style`].
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LabelStyle {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label_font_size: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label_offset: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label_color: Option<Color>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label_position: Option<LabelPosition>,
}

impl LabelStyle {
    /// Returns `true` if no field is set.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.label_font_size.is_none()
            && self.label_offset.is_none()
            && self.label_color.is_none()
            && self.label_position.is_none()
    }

    /// Overwrite each field that is set in `patch`, leaving the rest.
    pub fn merge(&mut self, patch: &Self) {
        if patch.label_font_size.is_some() {
            self.label_font_size = patch.label_font_size;
        }
        if patch.label_offset.is_some() {
            self.label_offset = patch.label_offset;
        }
        if patch.label_color.is_some() {
            self.label_color = patch.label_color;
        }
        if patch.label_position.is_some() {
            self.label_position = patch.label_position;
        }
    }
}

// ---------------------------------------------------------------------------
// Annotation elements
// ---------------------------------------------------------------------------

/// One accepted lattice point, plus optional per-dot label overrides.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GridDot {
    pub cx: f64,
    pub cy: f64,
    #[serde(flatten)]
    pub label: LabelStyle,
}

impl GridDot {
    /// A dot at `p` with no label overrides.
    #[must_use]
    pub fn at(p: Point) -> Self {
        Self {
            cx: p.x,
            cy: p.y,
            label: LabelStyle::default(),
        }
    }

    /// The dot centre.
    #[must_use]
    pub const fn center(&self) -> Point {
        Point::new(self.cx, self.cy)
    }
}

/// A freeform text label placed by the user. `(x, y)` is the top-left
/// corner of the text box.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TextElement {
    pub id: String,
    pub x: f64,
    pub y: f64,
    pub text: String,
    pub font_size: f64,
    pub font_family: String,
    pub color: Color,
    pub visible: bool,
}

/// A freeform dot placed by the user. `(x, y)` is the centre.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DotElement {
    pub id: String,
    pub x: f64,
    pub y: f64,
    pub size: f64,
    pub color: Color,
    pub visible: bool,
    #[serde(flatten)]
    pub label: LabelStyle,
}

/// The parameters a layer was committed with.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LayerSettings {
    pub points: Polygon,
    pub size: f64,
    pub gap: f64,
    pub padding: f64,
    pub rotation: f64,
    /// Target dot count at commit time.
    pub amount: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub numbering_enabled: Option<bool>,
    #[serde(flatten)]
    pub label: LabelStyle,
}

/// One committed annotation pass on an image.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Layer {
    pub dots: Vec<GridDot>,
    pub texts: Vec<TextElement>,
    pub standalone_dots: Vec<DotElement>,
    pub visible: bool,
    /// Grid dot diameter in pixels.
    pub size: f64,
    pub settings: LayerSettings,
}

impl Layer {
    /// Whether numbering labels are drawn for this layer's grid dots.
    #[must_use]
    pub fn numbering_enabled(&self) -> bool {
        self.settings.numbering_enabled.unwrap_or(false)
    }
}

// ---------------------------------------------------------------------------
// Image records
// ---------------------------------------------------------------------------

/// One uploaded image or rasterized PDF page with its annotation history.
///
/// `bytes` is the encoded source file; it is shared, never mutated, and
/// decoded lazily through [`crate::cache::DecodedCache`].
#[derive(Debug, Clone, PartialEq)]
pub struct ImageRecord {
    pub id: String,
    pub name: String,
    pub bytes: std::sync::Arc<[u8]>,
    pub dimensions: Dimensions,
    pub edit_history: crate::history::History,
    pub current_texts: Vec<TextElement>,
    pub current_standalone_dots: Vec<DotElement>,
    /// Name of the PDF this page was rasterized from.
    pub source_file: Option<String>,
    /// 1-based page number within `source_file`.
    pub page_number: Option<u32>,
}

impl ImageRecord {
    /// A fresh record with empty history and overlays.
    #[must_use]
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        bytes: impl Into<std::sync::Arc<[u8]>>,
        dimensions: Dimensions,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            bytes: bytes.into(),
            dimensions,
            edit_history: crate::history::History::default(),
            current_texts: Vec::new(),
            current_standalone_dots: Vec::new(),
            source_file: None,
            page_number: None,
        }
    }
}
