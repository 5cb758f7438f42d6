//! Editor defaults: initial lattice parameters, freeform element styles,
//! numbering label style, keyboard nudge steps, and cache sizing.

use serde::{Deserialize, Serialize};

use crate::types::{Color, LabelPosition};

/// Tunable defaults for a [`Session`](crate::session::Session).
///
/// Every field has a matching `DEFAULT_*` constant so front ends can use
/// the same values for their own argument defaults.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EditorDefaults {
    /// Lattice dot diameter in pixels.
    pub dot_size: f64,
    /// Clear space between lattice dots in pixels.
    pub gap: f64,
    /// Minimum distance between lattice dots and polygon edges.
    pub padding: f64,
    /// Lattice rotation in degrees.
    pub rotation: f64,
    /// Upper bound for the random offset added to jittered dots.
    pub jitter_magnitude: f64,

    pub text_font_size: f64,
    pub text_font_family: String,
    pub text_color: Color,
    /// Content given to newly placed text elements.
    pub text_content: String,

    pub free_dot_size: f64,
    pub free_dot_color: Color,

    pub label_font_size: f64,
    pub label_offset: f64,
    pub label_color: Color,
    pub label_position: LabelPosition,

    /// Arrow-key nudge distance in pixels.
    pub nudge_step: f64,
    /// Arrow-key nudge distance with the coarse modifier held.
    pub nudge_step_coarse: f64,

    /// Maximum number of decoded images held in memory.
    pub cache_capacity: usize,
}

impl EditorDefaults {
    pub const DEFAULT_DOT_SIZE: f64 = 13.0;
    pub const DEFAULT_GAP: f64 = 10.0;
    pub const DEFAULT_PADDING: f64 = 0.0;
    pub const DEFAULT_ROTATION: f64 = 0.0;
    pub const DEFAULT_JITTER_MAGNITUDE: f64 = 2.0;
    pub const DEFAULT_TEXT_FONT_SIZE: f64 = 75.0;
    pub const DEFAULT_TEXT_FONT_FAMILY: &str = "Arial";
    pub const DEFAULT_TEXT_COLOR: Color = Color::BLACK;
    pub const DEFAULT_TEXT_CONTENT: &str = "Текст";
    pub const DEFAULT_FREE_DOT_SIZE: f64 = 13.0;
    pub const DEFAULT_FREE_DOT_COLOR: Color = Color::BLACK;
    pub const DEFAULT_LABEL_FONT_SIZE: f64 = 12.0;
    pub const DEFAULT_LABEL_OFFSET: f64 = 5.0;
    pub const DEFAULT_LABEL_COLOR: Color = Color::BLACK;
    pub const DEFAULT_LABEL_POSITION: LabelPosition = LabelPosition::Top;
    pub const DEFAULT_NUDGE_STEP: f64 = 1.0;
    pub const DEFAULT_NUDGE_STEP_COARSE: f64 = 10.0;
    pub const DEFAULT_CACHE_CAPACITY: usize = 50;

    /// Font families offered for freeform text.
    pub const FONT_FAMILIES: [&str; 7] = [
        "Arial",
        "Times New Roman",
        "Georgia",
        "Verdana",
        "Courier New",
        "Impact",
        "Comic Sans MS",
    ];
}

impl Default for EditorDefaults {
    fn default() -> Self {
        Self {
            dot_size: Self::DEFAULT_DOT_SIZE,
            gap: Self::DEFAULT_GAP,
            padding: Self::DEFAULT_PADDING,
            rotation: Self::DEFAULT_ROTATION,
            jitter_magnitude: Self::DEFAULT_JITTER_MAGNITUDE,
            text_font_size: Self::DEFAULT_TEXT_FONT_SIZE,
            text_font_family: Self::DEFAULT_TEXT_FONT_FAMILY.to_owned(),
            text_color: Self::DEFAULT_TEXT_COLOR,
            text_content: Self::DEFAULT_TEXT_CONTENT.to_owned(),
            free_dot_size: Self::DEFAULT_FREE_DOT_SIZE,
            free_dot_color: Self::DEFAULT_FREE_DOT_COLOR,
            label_font_size: Self::DEFAULT_LABEL_FONT_SIZE,
            label_offset: Self::DEFAULT_LABEL_OFFSET,
            label_color: Self::DEFAULT_LABEL_COLOR,
            label_position: Self::DEFAULT_LABEL_POSITION,
            nudge_step: Self::DEFAULT_NUDGE_STEP,
            nudge_step_coarse: Self::DEFAULT_NUDGE_STEP_COARSE,
            cache_capacity: Self::DEFAULT_CACHE_CAPACITY,
        }
    }
}
