//! Freeform text and dot elements that are not tied to a lattice.
//!
//! Each kind lives in a flat [`ElementStore`] with a single optional
//! selection. Elements are addressed by their string id.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

use crate::types::{DotElement, Point, TextElement};

/// Average glyph advance as a fraction of the font size, used to estimate
/// text extents for hit testing without a font.
pub const TEXT_WIDTH_FACTOR: f64 = 0.6;

static NEXT_ID: AtomicU64 = AtomicU64::new(0);

/// A process-unique id of the form `<prefix>-<millis>-<seq>`.
#[must_use]
pub fn next_id(prefix: &str) -> String {
    let millis = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_or(0, |d| d.as_millis());
    let seq = NEXT_ID.fetch_add(1, Ordering::Relaxed);
    format!("{prefix}-{millis}-{seq}")
}

/// Behaviour shared by movable freeform elements.
pub trait Element {
    fn id(&self) -> &str;

    /// The element's anchor: top-left for text, centre for dots.
    fn position(&self) -> Point;

    fn set_position(&mut self, p: Point);

    fn is_visible(&self) -> bool;

    /// Whether `p` falls on the element.
    fn hit(&self, p: Point) -> bool;
}

impl Element for TextElement {
    fn id(&self) -> &str {
        &self.id
    }

    fn position(&self) -> Point {
        Point::new(self.x, self.y)
    }

    fn set_position(&mut self, p: Point) {
        self.x = p.x;
        self.y = p.y;
    }

    fn is_visible(&self) -> bool {
        self.visible
    }

    #[allow(clippy::cast_precision_loss)]
    fn hit(&self, p: Point) -> bool {
        let width = self.text.chars().count() as f64 * self.font_size * TEXT_WIDTH_FACTOR;
        p.x >= self.x && p.x <= self.x + width && p.y >= self.y && p.y <= self.y + self.font_size
    }
}

impl Element for DotElement {
    fn id(&self) -> &str {
        &self.id
    }

    fn position(&self) -> Point {
        Point::new(self.x, self.y)
    }

    fn set_position(&mut self, p: Point) {
        self.x = p.x;
        self.y = p.y;
    }

    fn is_visible(&self) -> bool {
        self.visible
    }

    fn hit(&self, p: Point) -> bool {
        let r = self.size / 2.0;
        p.distance_squared(self.position()) <= r * r
    }
}

/// Ordered elements of one kind plus the current selection.
#[derive(Debug, Clone, PartialEq)]
pub struct ElementStore<T> {
    items: Vec<T>,
    selected: Option<String>,
}

impl<T> Default for ElementStore<T> {
    fn default() -> Self {
        Self {
            items: Vec::new(),
            selected: None,
        }
    }
}

impl<T: Element> ElementStore<T> {
    /// Wrap existing elements with nothing selected.
    #[must_use]
    pub const fn from_items(items: Vec<T>) -> Self {
        Self {
            items,
            selected: None,
        }
    }

    #[must_use]
    pub fn items(&self) -> &[T] {
        &self.items
    }

    #[must_use]
    pub const fn len(&self) -> usize {
        self.items.len()
    }

    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    #[must_use]
    pub fn get(&self, id: &str) -> Option<&T> {
        self.items.iter().find(|e| e.id() == id)
    }

    /// Append an element and select it.
    pub fn insert(&mut self, element: T) {
        self.selected = Some(element.id().to_owned());
        self.items.push(element);
    }

    /// Apply `patch` to the element with `id`. Returns `false` if absent.
    pub fn update(&mut self, id: &str, patch: impl FnOnce(&mut T)) -> bool {
        match self.items.iter_mut().find(|e| e.id() == id) {
            Some(element) => {
                patch(element);
                true
            }
            None => false,
        }
    }

    /// Remove the element with `id`, clearing the selection if it pointed
    /// there.
    pub fn delete(&mut self, id: &str) -> Option<T> {
        let index = self.items.iter().position(|e| e.id() == id)?;
        if self.selected.as_deref() == Some(id) {
            self.selected = None;
        }
        Some(self.items.remove(index))
    }

    /// Select an element by id, or clear the selection with `None`.
    /// Unknown ids clear the selection.
    pub fn select(&mut self, id: Option<&str>) {
        self.selected = id
            .filter(|id| self.items.iter().any(|e| e.id() == *id))
            .map(str::to_owned);
    }

    #[must_use]
    pub fn selected(&self) -> Option<&T> {
        self.selected.as_deref().and_then(|id| self.get(id))
    }

    #[must_use]
    pub fn selected_id(&self) -> Option<&str> {
        self.selected.as_deref()
    }

    /// Topmost visible element under `p`.
    #[must_use]
    pub fn hit_test(&self, p: Point) -> Option<&T> {
        self.items
            .iter()
            .rev()
            .find(|e| e.is_visible() && e.hit(p))
    }

    /// Remove every element and the selection.
    pub fn clear(&mut self) {
        self.items.clear();
        self.selected = None;
    }

    /// Take every element out, leaving the store empty.
    pub fn take(&mut self) -> Vec<T> {
        self.selected = None;
        std::mem::take(&mut self.items)
    }
}
