//! Per-image layer history.
//!
//! A [`History`] is the ordered list of committed layers for one image.
//! Order is z-order: later layers draw on top. Layers are replaced
//! wholesale on re-commit; the only in-place mutations are visibility
//! toggling and numbering style patches.

use serde::{Deserialize, Serialize};

use crate::types::{GridDot, LabelStyle, Layer};

/// Errors from history operations that address a layer or dot by index.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum HistoryError {
    /// No layer at the requested index.
    #[error("layer {index} out of range (history has {len} layers)")]
    LayerOutOfRange { index: usize, len: usize },

    /// The layer has no grid dot at the requested index.
    #[error("dot {dot} out of range (layer {layer} has {len} dots)")]
    DotOutOfRange { layer: usize, dot: usize, len: usize },
}

/// A partial numbering-style update.
///
/// Applied to layer settings when no dot is addressed, otherwise to that
/// dot's overrides. `enabled` only applies at layer level.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct NumberingPatch {
    #[serde(default)]
    pub enabled: Option<bool>,
    #[serde(flatten)]
    pub style: LabelStyle,
}

/// Ordered list of committed layers for one image.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct History(Vec<Layer>);

impl History {
    /// Create a history from existing layers.
    #[must_use]
    pub const fn new(layers: Vec<Layer>) -> Self {
        Self(layers)
    }

    #[must_use]
    pub const fn len(&self) -> usize {
        self.0.len()
    }

    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    #[must_use]
    pub fn get(&self, index: usize) -> Option<&Layer> {
        self.0.get(index)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Layer> {
        self.0.iter()
    }

    #[must_use]
    pub fn layers(&self) -> &[Layer] {
        &self.0
    }

    /// Store `layer`, replacing the entry at `replace` when it is in range
    /// and appending otherwise. Returns the index the layer landed at.
    pub fn commit(&mut self, layer: Layer, replace: Option<usize>) -> usize {
        match replace {
            Some(index) if index < self.0.len() => {
                log::debug!("history: replacing layer {index}");
                self.0[index] = layer;
                index
            }
            Some(index) => {
                log::warn!(
                    "history: edit target {index} no longer exists ({} layers), appending",
                    self.0.len()
                );
                self.0.push(layer);
                self.0.len() - 1
            }
            None => {
                self.0.push(layer);
                self.0.len() - 1
            }
        }
    }

    /// Flip a layer's visibility and return the new value.
    pub fn toggle_visibility(&mut self, index: usize) -> Result<bool, HistoryError> {
        let layer = self.layer_mut(index)?;
        layer.visible = !layer.visible;
        Ok(layer.visible)
    }

    /// Remove and return a layer.
    pub fn remove(&mut self, index: usize) -> Result<Layer, HistoryError> {
        self.check(index)?;
        Ok(self.0.remove(index))
    }

    /// Merge `patch` into layer settings (`dot == None`) or into one grid
    /// dot's overrides.
    pub fn patch_numbering(
        &mut self,
        index: usize,
        dot: Option<usize>,
        patch: &NumberingPatch,
    ) -> Result<(), HistoryError> {
        let layer = self.layer_mut(index)?;
        match dot {
            None => {
                if patch.enabled.is_some() {
                    layer.settings.numbering_enabled = patch.enabled;
                }
                layer.settings.label.merge(&patch.style);
            }
            Some(dot) => {
                let target = dot_mut(layer, index, dot)?;
                target.label.merge(&patch.style);
            }
        }
        Ok(())
    }

    /// Strip every label override from one grid dot.
    pub fn clear_numbering_override(&mut self, index: usize, dot: usize) -> Result<(), HistoryError> {
        let layer = self.layer_mut(index)?;
        dot_mut(layer, index, dot)?.label = LabelStyle::default();
        Ok(())
    }

    fn check(&self, index: usize) -> Result<(), HistoryError> {
        if index < self.0.len() {
            Ok(())
        } else {
            Err(HistoryError::LayerOutOfRange {
                index,
                len: self.0.len(),
            })
        }
    }

    fn layer_mut(&mut self, index: usize) -> Result<&mut Layer, HistoryError> {
        let len = self.0.len();
        self.0
            .get_mut(index)
            .ok_or(HistoryError::LayerOutOfRange { index, len })
    }
}

fn dot_mut(layer: &mut Layer, index: usize, dot: usize) -> Result<&mut GridDot, HistoryError> {
    let len = layer.dots.len();
    layer.dots.get_mut(dot).ok_or(HistoryError::DotOutOfRange {
        layer: index,
        dot,
        len,
    })
}

impl<'a> IntoIterator for &'a History {
    type Item = &'a Layer;
    type IntoIter = std::slice::Iter<'a, Layer>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::types::{Color, LabelPosition, LayerSettings, Point, Polygon};

    fn layer(tag: f64) -> Layer {
        Layer {
            dots: vec![
                GridDot::at(Point::new(tag, tag)),
                GridDot::at(Point::new(tag + 1.0, tag)),
            ],
            texts: Vec::new(),
            standalone_dots: Vec::new(),
            visible: true,
            size: 13.0,
            settings: LayerSettings {
                points: Polygon::default(),
                size: 13.0,
                gap: 10.0,
                padding: 0.0,
                rotation: tag,
                amount: 2,
                numbering_enabled: None,
                label: LabelStyle::default(),
            },
        }
    }

    #[test]
    fn commit_appends_without_edit_target() {
        let mut h = History::default();
        assert_eq!(h.commit(layer(1.0), None), 0);
        assert_eq!(h.commit(layer(2.0), None), 1);
        assert_eq!(h.len(), 2);
    }

    #[test]
    fn commit_replaces_edit_target() {
        let mut h = History::new(vec![layer(1.0), layer(2.0)]);
        assert_eq!(h.commit(layer(9.0), Some(0)), 0);
        assert_eq!(h.len(), 2);
        assert!((h.get(0).unwrap().settings.rotation - 9.0).abs() < f64::EPSILON);
    }

    #[test]
    fn commit_with_stale_target_appends() {
        let mut h = History::new(vec![layer(1.0)]);
        assert_eq!(h.commit(layer(2.0), Some(5)), 1);
        assert_eq!(h.len(), 2);
    }

    #[test]
    fn toggle_flips_only_visibility() {
        let mut h = History::new(vec![layer(1.0)]);
        let before = h.get(0).unwrap().clone();
        assert!(!h.toggle_visibility(0).unwrap());
        let after = h.get(0).unwrap();
        assert!(!after.visible);
        assert_eq!(after.dots, before.dots);
        assert_eq!(after.settings, before.settings);
        assert!(h.toggle_visibility(0).unwrap());
    }

    #[test]
    fn out_of_range_is_reported() {
        let mut h = History::new(vec![layer(1.0)]);
        assert_eq!(
            h.toggle_visibility(3),
            Err(HistoryError::LayerOutOfRange { index: 3, len: 1 })
        );
        assert!(h.remove(1).is_err());
        assert_eq!(
            h.clear_numbering_override(0, 9),
            Err(HistoryError::DotOutOfRange {
                layer: 0,
                dot: 9,
                len: 2
            })
        );
    }

    #[test]
    fn remove_shifts_later_layers_down() {
        let mut h = History::new(vec![layer(1.0), layer(2.0), layer(3.0)]);
        let removed = h.remove(1).unwrap();
        assert!((removed.settings.rotation - 2.0).abs() < f64::EPSILON);
        assert!((h.get(1).unwrap().settings.rotation - 3.0).abs() < f64::EPSILON);
    }

    #[test]
    fn patch_layer_settings() {
        let mut h = History::new(vec![layer(1.0)]);
        let patch = NumberingPatch {
            enabled: Some(true),
            style: LabelStyle {
                label_position: Some(LabelPosition::Right),
                ..LabelStyle::default()
            },
        };
        h.patch_numbering(0, None, &patch).unwrap();
        let l = h.get(0).unwrap();
        assert!(l.numbering_enabled());
        assert_eq!(l.settings.label.label_position, Some(LabelPosition::Right));
        assert!(l.dots.iter().all(|d| d.label.is_empty()));
    }

    #[test]
    fn patch_single_dot_then_clear() {
        let mut h = History::new(vec![layer(1.0)]);
        let patch = NumberingPatch {
            enabled: Some(true),
            style: LabelStyle {
                label_color: Some(Color::WHITE),
                label_offset: Some(9.0),
                ..LabelStyle::default()
            },
        };
        h.patch_numbering(0, Some(1), &patch).unwrap();
        let l = h.get(0).unwrap();
        assert_eq!(l.dots[1].label.label_color, Some(Color::WHITE));
        assert!(l.dots[0].label.is_empty());
        // Dot-level patches never touch the layer switch.
        assert!(!l.numbering_enabled());

        h.clear_numbering_override(0, 1).unwrap();
        assert!(h.get(0).unwrap().dots[1].label.is_empty());
    }
}
