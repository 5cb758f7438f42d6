//! Numbering label style resolution and placement.

use std::f64::consts::FRAC_1_SQRT_2;

use crate::config::EditorDefaults;
use crate::types::{Color, LabelPosition, LabelStyle, Point};

/// A label style with every field filled in.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ResolvedLabel {
    pub font_size: f64,
    pub offset: f64,
    pub color: Color,
    pub position: LabelPosition,
}

/// Resolve each field as per-dot override, then layer setting, then the
/// built-in default.
#[must_use]
pub fn resolve_style(dot: &LabelStyle, layer: &LabelStyle, defaults: &EditorDefaults) -> ResolvedLabel {
    ResolvedLabel {
        font_size: dot
            .label_font_size
            .or(layer.label_font_size)
            .unwrap_or(defaults.label_font_size),
        offset: dot
            .label_offset
            .or(layer.label_offset)
            .unwrap_or(defaults.label_offset),
        color: dot
            .label_color
            .or(layer.label_color)
            .unwrap_or(defaults.label_color),
        position: dot
            .label_position
            .or(layer.label_position)
            .unwrap_or(defaults.label_position),
    }
}

/// Top-left corner of a `text_width` x `text_height` label box for a dot
/// of `radius` at `center`.
///
/// The anchor sits `radius + offset` away from the centre in the
/// position's direction (diagonals at 45 degrees). On each axis with a
/// non-zero direction the box's near edge touches the anchor; on a zero
/// axis the box is centred on it.
#[must_use]
pub fn label_origin(
    center: Point,
    radius: f64,
    offset: f64,
    position: LabelPosition,
    text_width: f64,
    text_height: f64,
) -> Point {
    let (sx, sy) = position.direction();
    let distance = radius + offset;
    let scale = if sx != 0 && sy != 0 { FRAC_1_SQRT_2 } else { 1.0 };
    let anchor = Point::new(
        center.x + f64::from(sx) * distance * scale,
        center.y + f64::from(sy) * distance * scale,
    );
    let align = |sign: i8, extent: f64| match sign {
        0 => -extent / 2.0,
        s if s < 0 => -extent,
        _ => 0.0,
    };
    Point::new(
        anchor.x + align(sx, text_width),
        anchor.y + align(sy, text_height),
    )
}
