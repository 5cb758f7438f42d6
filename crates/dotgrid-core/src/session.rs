//! Editing session state.
//!
//! A [`Session`] owns every loaded [`ImageRecord`], the active image's live
//! freeform overlays, the in-progress lasso polygon, the live lattice
//! parameters, and the index of the layer being re-edited. All mutation
//! goes through methods here so the invariants between those pieces hold:
//!
//! - the live overlays always belong to the active image and are stashed
//!   into its record when another image becomes active;
//! - the area flag is set only while the polygon is a valid region;
//! - committing clears the polygon, the area flag, and the live overlays.

use rand::SeedableRng;
use rand::rngs::StdRng;
use serde::{Deserialize, Serialize};

use crate::allocate::{RegionShare, image_shares, layer_shares};
use crate::config::EditorDefaults;
use crate::elements::{ElementStore, next_id};
use crate::history::{History, HistoryError, NumberingPatch};
use crate::lattice::{Jitter, LatticeCache, LatticeParams};
use crate::types::{
    DotElement, GridDot, ImageRecord, LabelStyle, Layer, LayerSettings, Point, Polygon,
    TextElement,
};

/// What pointer input on the canvas does.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum EditorMode {
    /// Draw a lasso polygon to fill with a lattice.
    #[default]
    Lasso,
    /// Place and move freeform text.
    Text,
    /// Place and move freeform dots.
    Dot,
}

/// Errors from session operations.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SessionError {
    /// The operation needs an active image and none is selected.
    #[error("no image is active")]
    NoActiveImage,

    /// No loaded image has the given id.
    #[error("unknown image {0:?}")]
    UnknownImage(String),

    /// Commit requested with no lasso region and no freeform elements.
    #[error("nothing to commit: draw a region or place text or dots first")]
    NothingToCommit,

    /// Element placement attempted in the wrong editor mode.
    #[error("placing {wanted:?} elements requires {wanted:?} mode, editor is in {actual:?} mode")]
    WrongMode {
        wanted: EditorMode,
        actual: EditorMode,
    },

    #[error(transparent)]
    History(#[from] HistoryError),
}

/// Application state for one editing session.
#[derive(Debug, Clone)]
pub struct Session {
    defaults: EditorDefaults,
    images: Vec<ImageRecord>,
    active: Option<String>,
    mode: EditorMode,
    polygon: Polygon,
    area: bool,
    params: LatticeParams,
    edit_index: Option<usize>,
    texts: ElementStore<TextElement>,
    dots: ElementStore<DotElement>,
    lattice: LatticeCache,
    rng: StdRng,
}

impl Session {
    /// An empty session with entropy-seeded jitter.
    #[must_use]
    pub fn new(defaults: EditorDefaults) -> Self {
        Self::with_rng(defaults, StdRng::from_entropy())
    }

    /// An empty session with reproducible jitter.
    #[must_use]
    pub fn with_seed(defaults: EditorDefaults, seed: u64) -> Self {
        Self::with_rng(defaults, StdRng::seed_from_u64(seed))
    }

    fn with_rng(defaults: EditorDefaults, rng: StdRng) -> Self {
        let params = initial_params(&defaults);
        Self {
            defaults,
            images: Vec::new(),
            active: None,
            mode: EditorMode::default(),
            polygon: Polygon::default(),
            area: false,
            params,
            edit_index: None,
            texts: ElementStore::default(),
            dots: ElementStore::default(),
            lattice: LatticeCache::default(),
            rng,
        }
    }

    // -----------------------------------------------------------------------
    // Accessors
    // -----------------------------------------------------------------------

    #[must_use]
    pub const fn defaults(&self) -> &EditorDefaults {
        &self.defaults
    }

    #[must_use]
    pub fn images(&self) -> &[ImageRecord] {
        &self.images
    }

    #[must_use]
    pub fn image(&self, id: &str) -> Option<&ImageRecord> {
        self.images.iter().find(|r| r.id == id)
    }

    #[must_use]
    pub fn active_id(&self) -> Option<&str> {
        self.active.as_deref()
    }

    #[must_use]
    pub fn active_image(&self) -> Option<&ImageRecord> {
        self.active.as_deref().and_then(|id| self.image(id))
    }

    /// The active image's committed layers.
    ///
    /// # Errors
    ///
    /// [`SessionError::NoActiveImage`] when no image is active.
    pub fn history(&self) -> Result<&History, SessionError> {
        self.active_image()
            .map(|r| &r.edit_history)
            .ok_or(SessionError::NoActiveImage)
    }

    #[must_use]
    pub const fn mode(&self) -> EditorMode {
        self.mode
    }

    #[must_use]
    pub const fn polygon(&self) -> &Polygon {
        &self.polygon
    }

    /// Whether a valid lasso region is active and the preview is live.
    #[must_use]
    pub const fn has_area(&self) -> bool {
        self.area
    }

    #[must_use]
    pub const fn params(&self) -> &LatticeParams {
        &self.params
    }

    /// Index of the layer being re-edited, if any.
    #[must_use]
    pub const fn edit_index(&self) -> Option<usize> {
        self.edit_index
    }

    #[must_use]
    pub const fn texts(&self) -> &ElementStore<TextElement> {
        &self.texts
    }

    pub const fn texts_mut(&mut self) -> &mut ElementStore<TextElement> {
        &mut self.texts
    }

    #[must_use]
    pub const fn dots(&self) -> &ElementStore<DotElement> {
        &self.dots
    }

    pub const fn dots_mut(&mut self) -> &mut ElementStore<DotElement> {
        &mut self.dots
    }

    // -----------------------------------------------------------------------
    // Images
    // -----------------------------------------------------------------------

    /// Append uploaded records. The first one becomes active if no image
    /// was active.
    pub fn add_images(&mut self, records: Vec<ImageRecord>) {
        let first = records.first().map(|r| r.id.clone());
        log::info!("session: {} images added", records.len());
        self.images.extend(records);
        if self.active.is_none()
            && let Some(id) = first
        {
            self.activate(&id);
        }
    }

    /// Make `id` the active image.
    ///
    /// The live overlays are stashed into the previously active record and
    /// replaced by the new record's. The polygon, preview, and edit index
    /// are reset.
    ///
    /// # Errors
    ///
    /// [`SessionError::UnknownImage`] when no record has `id`.
    pub fn select_image(&mut self, id: &str) -> Result<(), SessionError> {
        if self.image(id).is_none() {
            return Err(SessionError::UnknownImage(id.to_owned()));
        }
        if self.active.as_deref() != Some(id) {
            self.activate(id);
        }
        Ok(())
    }

    fn activate(&mut self, id: &str) {
        self.stash_overlays();
        let (texts, dots) = self
            .images
            .iter_mut()
            .find(|r| r.id == id)
            .map(|r| {
                (
                    std::mem::take(&mut r.current_texts),
                    std::mem::take(&mut r.current_standalone_dots),
                )
            })
            .unwrap_or_default();
        self.texts = ElementStore::from_items(texts);
        self.dots = ElementStore::from_items(dots);
        self.active = Some(id.to_owned());
        self.clear_region();
        self.edit_index = None;
        log::debug!("session: active image {id}");
    }

    fn stash_overlays(&mut self) {
        let texts = self.texts.take();
        let dots = self.dots.take();
        if let Some(record) = self.active_record_mut() {
            record.current_texts = texts;
            record.current_standalone_dots = dots;
        }
    }

    /// Remove an image. Removing the active image leaves no image active
    /// and discards the live overlays.
    ///
    /// # Errors
    ///
    /// [`SessionError::UnknownImage`] when no record has `id`.
    pub fn remove_image(&mut self, id: &str) -> Result<ImageRecord, SessionError> {
        let index = self
            .images
            .iter()
            .position(|r| r.id == id)
            .ok_or_else(|| SessionError::UnknownImage(id.to_owned()))?;
        if self.active.as_deref() == Some(id) {
            self.active = None;
            self.texts.clear();
            self.dots.clear();
            self.clear_region();
            self.edit_index = None;
        }
        Ok(self.images.remove(index))
    }

    /// Drop every image and reset all session state to defaults.
    ///
    /// Returns the removed records so the host can release anything keyed
    /// on them, such as decoded pixels.
    pub fn clear_all(&mut self) -> Vec<ImageRecord> {
        let removed = std::mem::take(&mut self.images);
        self.active = None;
        self.mode = EditorMode::default();
        self.texts.clear();
        self.dots.clear();
        self.clear_region();
        self.edit_index = None;
        self.params = initial_params(&self.defaults);
        log::info!("session: cleared {} images", removed.len());
        removed
    }

    /// Every record with the active image's live overlays folded in,
    /// ready for compositing.
    #[must_use]
    pub fn export_records(&self) -> Vec<ImageRecord> {
        let mut records = self.images.clone();
        if let Some(active) = self.active.as_deref()
            && let Some(record) = records.iter_mut().find(|r| r.id == active)
        {
            record.current_texts = self.texts.items().to_vec();
            record.current_standalone_dots = self.dots.items().to_vec();
        }
        records
    }

    // -----------------------------------------------------------------------
    // Lasso and lattice parameters
    // -----------------------------------------------------------------------

    pub const fn set_mode(&mut self, mode: EditorMode) {
        self.mode = mode;
    }

    /// Complete a lasso. Fewer than three points clears the region.
    pub fn set_polygon(&mut self, points: Vec<Point>) {
        let polygon = Polygon::new(points);
        if polygon.is_region() {
            self.polygon = polygon;
            self.area = true;
        } else {
            self.clear_region();
        }
    }

    pub const fn set_amount(&mut self, amount: usize) {
        self.params.target_count = amount;
    }

    pub const fn set_size(&mut self, size: f64) {
        self.params.size = size;
    }

    pub const fn set_gap(&mut self, gap: f64) {
        self.params.gap = gap;
    }

    pub const fn set_padding(&mut self, padding: f64) {
        self.params.padding = padding;
    }

    pub const fn set_rotation(&mut self, rotation: f64) {
        self.params.rotation = rotation;
    }

    pub const fn set_jitter(&mut self, jitter: Jitter) {
        self.params.jitter = jitter;
    }

    /// Replace every lattice parameter at once.
    pub const fn set_params(&mut self, params: LatticeParams) {
        self.params = params;
    }

    /// The live lattice for the current polygon and parameters.
    ///
    /// Empty while no region is active. Results are memoized on the full
    /// parameter tuple, so jitter is sampled once per distinct tuple.
    pub fn preview(&mut self) -> &[GridDot] {
        if !self.area {
            return &[];
        }
        self.lattice
            .get_or_generate(&self.polygon, &self.params, &mut self.rng)
    }

    fn clear_region(&mut self) {
        self.polygon = Polygon::default();
        self.area = false;
        self.lattice.invalidate();
    }

    fn active_record_mut(&mut self) -> Option<&mut ImageRecord> {
        let id = self.active.as_deref()?;
        self.images.iter_mut().find(|r| r.id == id)
    }

    fn active_history_mut(&mut self) -> Result<&mut History, SessionError> {
        self.active_record_mut()
            .map(|r| &mut r.edit_history)
            .ok_or(SessionError::NoActiveImage)
    }

    // -----------------------------------------------------------------------
    // Layer history
    // -----------------------------------------------------------------------

    /// Snapshot the live lattice and overlays into a layer on the active
    /// image.
    ///
    /// Replaces the layer being re-edited, or appends. Clears the polygon,
    /// the area flag, the live overlays, and the edit index. Returns the
    /// index the layer was stored at.
    ///
    /// # Errors
    ///
    /// [`SessionError::NoActiveImage`] without an active image;
    /// [`SessionError::NothingToCommit`] with no region and no freeform
    /// elements.
    pub fn commit_layer(&mut self) -> Result<usize, SessionError> {
        if self.active.is_none() {
            return Err(SessionError::NoActiveImage);
        }
        if !self.area && self.texts.is_empty() && self.dots.is_empty() {
            return Err(SessionError::NothingToCommit);
        }

        let dots = self.preview().to_vec();
        let params = self.params;
        let layer = Layer {
            dots,
            texts: self.texts.take(),
            standalone_dots: self.dots.take(),
            visible: true,
            size: params.size,
            settings: LayerSettings {
                points: self.polygon.clone(),
                size: params.size,
                gap: params.gap,
                padding: params.padding,
                rotation: params.rotation,
                amount: params.target_count,
                numbering_enabled: None,
                label: LabelStyle::default(),
            },
        };
        let replace = self.edit_index.take();
        let dot_count = layer.dots.len();
        let index = self.active_history_mut()?.commit(layer, replace);
        self.clear_region();
        log::info!("session: committed layer {index} with {dot_count} dots");
        Ok(index)
    }

    /// Load a committed layer's settings back into the live parameters and
    /// mark it as being re-edited.
    ///
    /// # Errors
    ///
    /// [`SessionError::NoActiveImage`] or an out-of-range index.
    pub fn begin_edit(&mut self, index: usize) -> Result<(), SessionError> {
        let history = self.history()?;
        let settings = history
            .get(index)
            .map(|l| l.settings.clone())
            .ok_or(HistoryError::LayerOutOfRange {
                index,
                len: history.len(),
            })?;

        self.params.size = settings.size;
        self.params.gap = settings.gap;
        self.params.padding = settings.padding;
        self.params.rotation = settings.rotation;
        self.params.target_count = settings.amount;
        self.area = settings.points.is_region();
        self.polygon = settings.points;
        self.lattice.invalidate();
        self.edit_index = Some(index);
        self.mode = EditorMode::Lasso;
        log::debug!("session: editing layer {index}");
        Ok(())
    }

    /// Abandon any edit in progress along with the current lasso, or, in
    /// text mode, the live texts. Live freeform dots are kept.
    pub fn reset(&mut self) {
        if self.mode == EditorMode::Text {
            self.texts.clear();
        } else {
            self.clear_region();
        }
        self.edit_index = None;
    }

    /// Flip a layer's visibility on the active image.
    ///
    /// # Errors
    ///
    /// [`SessionError::NoActiveImage`] or an out-of-range index.
    pub fn toggle_visibility(&mut self, index: usize) -> Result<bool, SessionError> {
        Ok(self.active_history_mut()?.toggle_visibility(index)?)
    }

    /// Remove a layer from the active image.
    ///
    /// The edit index is left untouched. If it pointed at or past the
    /// removed layer it now refers to a different layer (or none), which is
    /// logged as a warning.
    ///
    /// # Errors
    ///
    /// [`SessionError::NoActiveImage`] or an out-of-range index.
    pub fn delete_layer(&mut self, index: usize) -> Result<Layer, SessionError> {
        let removed = self.active_history_mut()?.remove(index)?;
        if let Some(editing) = self.edit_index
            && editing >= index
        {
            log::warn!("session: layer {index} deleted while layer {editing} is being edited");
        }
        Ok(removed)
    }

    /// Patch numbering style on a layer or on one of its grid dots.
    ///
    /// # Errors
    ///
    /// [`SessionError::NoActiveImage`] or an out-of-range layer or dot.
    pub fn patch_numbering(
        &mut self,
        index: usize,
        dot: Option<usize>,
        patch: &NumberingPatch,
    ) -> Result<(), SessionError> {
        Ok(self
            .active_history_mut()?
            .patch_numbering(index, dot, patch)?)
    }

    /// Drop one grid dot's label overrides.
    ///
    /// # Errors
    ///
    /// [`SessionError::NoActiveImage`] or an out-of-range layer or dot.
    pub fn clear_numbering_override(&mut self, index: usize, dot: usize) -> Result<(), SessionError> {
        Ok(self
            .active_history_mut()?
            .clear_numbering_override(index, dot)?)
    }

    // -----------------------------------------------------------------------
    // Freeform elements
    // -----------------------------------------------------------------------

    /// Place a default-styled text element with its top-left at `at`.
    /// Returns the new element's id; it becomes selected.
    ///
    /// # Errors
    ///
    /// [`SessionError::WrongMode`] outside text mode,
    /// [`SessionError::NoActiveImage`] without an active image.
    pub fn place_text(&mut self, at: Point) -> Result<String, SessionError> {
        self.require_placement(EditorMode::Text)?;
        let d = &self.defaults;
        let element = TextElement {
            id: next_id("text"),
            x: at.x,
            y: at.y,
            text: d.text_content.clone(),
            font_size: d.text_font_size,
            font_family: d.text_font_family.clone(),
            color: d.text_color,
            visible: true,
        };
        let id = element.id.clone();
        self.texts.insert(element);
        Ok(id)
    }

    /// Place a default-styled dot centred at `at`.
    /// Returns the new element's id; it becomes selected.
    ///
    /// # Errors
    ///
    /// [`SessionError::WrongMode`] outside dot mode,
    /// [`SessionError::NoActiveImage`] without an active image.
    pub fn place_dot(&mut self, at: Point) -> Result<String, SessionError> {
        self.require_placement(EditorMode::Dot)?;
        let element = DotElement {
            id: next_id("dot"),
            x: at.x,
            y: at.y,
            size: self.defaults.free_dot_size,
            color: self.defaults.free_dot_color,
            visible: true,
            label: LabelStyle::default(),
        };
        let id = element.id.clone();
        self.dots.insert(element);
        Ok(id)
    }

    fn require_placement(&self, wanted: EditorMode) -> Result<(), SessionError> {
        if self.mode != wanted {
            return Err(SessionError::WrongMode {
                wanted,
                actual: self.mode,
            });
        }
        if self.active.is_none() {
            return Err(SessionError::NoActiveImage);
        }
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Reports
    // -----------------------------------------------------------------------

    /// Area share and dot allocation per layer of the active image.
    ///
    /// # Errors
    ///
    /// [`SessionError::NoActiveImage`] when no image is active.
    pub fn layer_report(&self, total: usize) -> Result<Vec<RegionShare>, SessionError> {
        Ok(layer_shares(self.history()?, total))
    }

    /// Area share and dot allocation per loaded image.
    #[must_use]
    pub fn image_report(&self, total: usize) -> Vec<RegionShare> {
        image_shares(&self.images, total)
    }
}

impl Default for Session {
    fn default() -> Self {
        Self::new(EditorDefaults::default())
    }
}

const fn initial_params(defaults: &EditorDefaults) -> LatticeParams {
    LatticeParams {
        size: defaults.dot_size,
        gap: defaults.gap,
        padding: defaults.padding,
        rotation: defaults.rotation,
        target_count: 0,
        jitter: Jitter {
            enabled: false,
            magnitude: defaults.jitter_magnitude,
        },
    }
}
