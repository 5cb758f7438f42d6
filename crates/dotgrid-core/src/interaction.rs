//! Pointer and keyboard handling for freeform elements.
//!
//! Dragging is modal. Once a drag captures an element, every pointer move
//! until release moves that element by the pointer's total displacement,
//! without hit-testing again. Release always ends the drag.

use crate::elements::{Element, ElementStore};
use crate::session::{EditorMode, Session};
use crate::types::{Dimensions, Point};

/// Which store an element lives in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ElementKind {
    Text,
    Dot,
}

/// A captured element.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ElementRef {
    pub kind: ElementKind,
    pub id: String,
}

/// Drag state machine.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum DragState {
    #[default]
    Idle,
    Dragging {
        target: ElementRef,
        /// Pointer position when the drag started.
        pointer_origin: Point,
        /// Element position when the drag started.
        element_origin: Point,
    },
}

/// Keys with editing meaning.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Key {
    ArrowUp,
    ArrowDown,
    ArrowLeft,
    ArrowRight,
    Delete,
}

/// Input handler for one canvas. Coordinates are in image space; convert
/// screen deltas with [`screen_to_image`] first.
#[derive(Debug, Clone, Default)]
pub struct Interaction {
    drag: DragState,
}

impl Interaction {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            drag: DragState::Idle,
        }
    }

    #[must_use]
    pub const fn state(&self) -> &DragState {
        &self.drag
    }

    /// Start dragging the topmost visible element under `p`, selecting it.
    ///
    /// Only elements of the current mode's kind respond. Returns the
    /// captured element, or `None` (leaving the state idle and clearing the
    /// selection) when nothing was hit.
    pub fn pointer_down(&mut self, session: &mut Session, p: Point) -> Option<ElementRef> {
        let kind = match session.mode() {
            EditorMode::Text => ElementKind::Text,
            EditorMode::Dot => ElementKind::Dot,
            EditorMode::Lasso => return None,
        };
        let hit = match kind {
            ElementKind::Text => capture(session.texts_mut(), p),
            ElementKind::Dot => capture(session.dots_mut(), p),
        };
        let Some((id, element_origin)) = hit else {
            self.drag = DragState::Idle;
            return None;
        };
        let target = ElementRef { kind, id };
        log::debug!("interaction: dragging {:?} {}", target.kind, target.id);
        self.drag = DragState::Dragging {
            target: target.clone(),
            pointer_origin: p,
            element_origin,
        };
        Some(target)
    }

    /// Move the captured element to follow the pointer. No-op when idle.
    pub fn pointer_move(&self, session: &mut Session, p: Point) {
        let DragState::Dragging {
            target,
            pointer_origin,
            element_origin,
        } = &self.drag
        else {
            return;
        };
        let to = element_origin.offset(p.x - pointer_origin.x, p.y - pointer_origin.y);
        move_element(session, target, to);
    }

    /// End any drag.
    pub fn pointer_up(&mut self) {
        self.drag = DragState::Idle;
    }

    /// Apply a key to the selected element of the current mode.
    ///
    /// Arrow keys nudge by the configured step (`coarse` selects the larger
    /// step); Delete removes the element. Returns `true` if an element was
    /// affected.
    pub fn key(&mut self, session: &mut Session, key: Key, coarse: bool) -> bool {
        let kind = match session.mode() {
            EditorMode::Text => ElementKind::Text,
            EditorMode::Dot => ElementKind::Dot,
            EditorMode::Lasso => return false,
        };
        let selected = match kind {
            ElementKind::Text => session.texts().selected_id(),
            ElementKind::Dot => session.dots().selected_id(),
        };
        let Some(id) = selected.map(str::to_owned) else {
            return false;
        };
        let target = ElementRef { kind, id };

        let step = if coarse {
            session.defaults().nudge_step_coarse
        } else {
            session.defaults().nudge_step
        };
        let (dx, dy) = match key {
            Key::ArrowUp => (0.0, -step),
            Key::ArrowDown => (0.0, step),
            Key::ArrowLeft => (-step, 0.0),
            Key::ArrowRight => (step, 0.0),
            Key::Delete => {
                if matches!(&self.drag, DragState::Dragging { target: t, .. } if *t == target) {
                    self.drag = DragState::Idle;
                }
                return match kind {
                    ElementKind::Text => session.texts_mut().delete(&target.id).is_some(),
                    ElementKind::Dot => session.dots_mut().delete(&target.id).is_some(),
                };
            }
        };
        let Some(from) = position_of(session, &target) else {
            return false;
        };
        move_element(session, &target, from.offset(dx, dy))
    }
}

fn capture<T: Element>(store: &mut ElementStore<T>, p: Point) -> Option<(String, Point)> {
    let hit = store
        .hit_test(p)
        .map(|e| (e.id().to_owned(), e.position()));
    store.select(hit.as_ref().map(|(id, _)| id.as_str()));
    hit
}

fn position_of(session: &Session, target: &ElementRef) -> Option<Point> {
    match target.kind {
        ElementKind::Text => session.texts().get(&target.id).map(Element::position),
        ElementKind::Dot => session.dots().get(&target.id).map(Element::position),
    }
}

fn move_element(session: &mut Session, target: &ElementRef, to: Point) -> bool {
    match target.kind {
        ElementKind::Text => session
            .texts_mut()
            .update(&target.id, |e| e.set_position(to)),
        ElementKind::Dot => session
            .dots_mut()
            .update(&target.id, |e| e.set_position(to)),
    }
}

/// Convert a pointer displacement measured on a rendered image of
/// `rendered` size (in screen pixels) to image pixels.
#[must_use]
pub fn screen_to_image(delta: Point, rendered: (f64, f64), image: Dimensions) -> Point {
    let scale = |extent: f64, pixels: u32| {
        if extent > 0.0 {
            f64::from(pixels) / extent
        } else {
            1.0
        }
    };
    Point::new(
        delta.x * scale(rendered.0, image.width),
        delta.y * scale(rendered.1, image.height),
    )
}
