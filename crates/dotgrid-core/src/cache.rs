//! Bounded cache of decoded image pixels.
//!
//! Records keep only their encoded bytes. Decoding happens on first use
//! and the result is shared through an [`Arc`] until the entry is evicted
//! (oldest insertion first once capacity is reached), released with its
//! image through [`DecodedCache::remove`] or [`DecodedCache::retain_images`],
//! or the cache is cleared.

use std::collections::{HashMap, VecDeque};
use std::sync::Arc;

use image::RgbaImage;

use crate::types::ImageRecord;

/// Decoded pixels keyed by image id.
#[derive(Debug, Clone)]
pub struct DecodedCache {
    capacity: usize,
    order: VecDeque<String>,
    entries: HashMap<String, Arc<RgbaImage>>,
}

impl DecodedCache {
    /// A cache holding at most `capacity` decoded images. Zero disables
    /// caching; every lookup decodes afresh.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            order: VecDeque::with_capacity(capacity),
            entries: HashMap::with_capacity(capacity),
        }
    }

    #[must_use]
    pub const fn capacity(&self) -> usize {
        self.capacity
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    #[must_use]
    pub fn contains(&self, id: &str) -> bool {
        self.entries.contains_key(id)
    }

    /// Decoded RGBA pixels for `record`, decoding on a miss.
    ///
    /// # Errors
    ///
    /// Returns the decoder error if the record's bytes are not a readable
    /// image.
    pub fn get_or_decode(&mut self, record: &ImageRecord) -> Result<Arc<RgbaImage>, image::ImageError> {
        if let Some(hit) = self.entries.get(&record.id) {
            return Ok(Arc::clone(hit));
        }

        let decoded = Arc::new(image::load_from_memory(&record.bytes)?.into_rgba8());
        if self.capacity == 0 {
            return Ok(decoded);
        }

        while self.entries.len() >= self.capacity {
            let Some(oldest) = self.order.pop_front() else {
                break;
            };
            self.entries.remove(&oldest);
            log::debug!("cache: evicted {oldest}");
        }
        self.order.push_back(record.id.clone());
        self.entries.insert(record.id.clone(), Arc::clone(&decoded));
        Ok(decoded)
    }

    /// Release the entry for `id`, if any.
    pub fn remove(&mut self, id: &str) -> bool {
        if self.entries.remove(id).is_some() {
            self.order.retain(|k| k != id);
            true
        } else {
            false
        }
    }

    /// Release entries whose image is not in `images`, returning how many
    /// were dropped. Call after removing images from a session.
    pub fn retain_images(&mut self, images: &[ImageRecord]) -> usize {
        let before = self.entries.len();
        self.entries
            .retain(|id, _| images.iter().any(|r| &r.id == id));
        let entries = &self.entries;
        self.order.retain(|id| entries.contains_key(id));
        let dropped = before - self.entries.len();
        if dropped > 0 {
            log::debug!("cache: released {dropped} removed images");
        }
        dropped
    }

    /// Release every entry.
    pub fn clear(&mut self) {
        self.order.clear();
        self.entries.clear();
    }
}

impl Default for DecodedCache {
    fn default() -> Self {
        Self::new(crate::config::EditorDefaults::DEFAULT_CACHE_CAPACITY)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use image::ImageEncoder;

    use super::*;
    use crate::types::Dimensions;

    fn record(id: &str) -> ImageRecord {
        let img = RgbaImage::from_pixel(2, 3, image::Rgba([10, 20, 30, 255]));
        let mut buf = Vec::new();
        image::codecs::png::PngEncoder::new(&mut buf)
            .write_image(img.as_raw(), 2, 3, image::ExtendedColorType::Rgba8)
            .unwrap();
        ImageRecord::new(
            id,
            format!("{id}.png"),
            buf,
            Dimensions {
                width: 2,
                height: 3,
            },
        )
    }

    #[test]
    fn decodes_and_shares() {
        let mut cache = DecodedCache::new(4);
        let r = record("a");
        let first = cache.get_or_decode(&r).unwrap();
        let second = cache.get_or_decode(&r).unwrap();
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(first.dimensions(), (2, 3));
        assert_eq!(first.get_pixel(1, 2).0, [10, 20, 30, 255]);
    }

    #[test]
    fn evicts_oldest_first() {
        let mut cache = DecodedCache::new(2);
        for id in ["a", "b", "c"] {
            cache.get_or_decode(&record(id)).unwrap();
        }
        assert_eq!(cache.len(), 2);
        assert!(!cache.contains("a"));
        assert!(cache.contains("b"));
        assert!(cache.contains("c"));
    }

    #[test]
    fn hits_do_not_refresh_age() {
        let mut cache = DecodedCache::new(2);
        let a = record("a");
        cache.get_or_decode(&a).unwrap();
        cache.get_or_decode(&record("b")).unwrap();
        cache.get_or_decode(&a).unwrap();
        cache.get_or_decode(&record("c")).unwrap();
        assert!(!cache.contains("a"));
    }

    #[test]
    fn remove_and_clear_release_entries() {
        let mut cache = DecodedCache::new(3);
        cache.get_or_decode(&record("a")).unwrap();
        cache.get_or_decode(&record("b")).unwrap();
        assert!(cache.remove("a"));
        assert!(!cache.remove("a"));
        assert_eq!(cache.len(), 1);
        cache.clear();
        assert!(cache.is_empty());
    }

    #[test]
    fn retain_images_drops_removed_ids() {
        let mut cache = DecodedCache::new(4);
        let kept = record("kept");
        cache.get_or_decode(&kept).unwrap();
        cache.get_or_decode(&record("gone")).unwrap();
        assert_eq!(cache.retain_images(std::slice::from_ref(&kept)), 1);
        assert!(cache.contains("kept"));
        assert!(!cache.contains("gone"));
        assert_eq!(cache.retain_images(&[]), 1);
        assert!(cache.is_empty());

        // Freed slots are reusable without evicting live entries.
        let mut cache = DecodedCache::new(2);
        for id in ["a", "b"] {
            cache.get_or_decode(&record(id)).unwrap();
        }
        cache.retain_images(&[record("b")]);
        cache.get_or_decode(&record("c")).unwrap();
        assert!(cache.contains("b"));
        assert!(cache.contains("c"));
    }

    #[test]
    fn zero_capacity_never_stores() {
        let mut cache = DecodedCache::new(0);
        cache.get_or_decode(&record("a")).unwrap();
        assert!(cache.is_empty());
    }

    #[test]
    fn undecodable_bytes_error() {
        let mut cache = DecodedCache::new(1);
        let mut r = record("bad");
        r.bytes = Arc::from(&b"not an image"[..]);
        assert!(cache.get_or_decode(&r).is_err());
        assert!(cache.is_empty());
    }
}
