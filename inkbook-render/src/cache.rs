//! Thumbnail cache kept index-aligned with the document model.
//!
//! Every slot carries a [`Generation`]. Scheduling a render hands out a fresh
//! generation for the slot; a finished render is applied only if some slot
//! still holds that exact generation. Renders for drawings that were replaced,
//! removed or invalidated in the meantime are discarded. Because generations
//! travel with their slot, a render still lands on the right thumbnail after
//! earlier slots were removed and later ones shifted down.

use inkbook_core::RenderContext;

use crate::RasterImage;

/// Version tag of a thumbnail slot's render request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Generation(u64);

impl Generation {
    /// Raw counter value.
    #[must_use]
    pub const fn value(self) -> u64 {
        self.0
    }
}

/// A render the cache wants performed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RenderTicket {
    /// Index of the slot at scheduling time.
    pub index: usize,
    /// Generation the result must match to be applied.
    pub generation: Generation,
}

/// One cached thumbnail.
#[derive(Debug, Clone)]
struct ThumbnailSlot {
    /// Last rendered image; `None` is a placeholder.
    image: Option<RasterImage>,
    /// Generation of the newest render requested for this slot.
    generation: Generation,
    /// Set while a newer render than `image` is outstanding.
    stale: bool,
}

/// Cache statistics for monitoring.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CacheStats {
    /// Renders applied to a slot.
    pub applied: u64,
    /// Renders discarded because their slot moved on.
    pub discarded: u64,
    /// Full invalidations (render context changes and model swaps).
    pub invalidations: u64,
}

/// Thumbnails for every drawing of a document, in model order.
#[derive(Debug)]
pub struct ThumbnailCache {
    slots: Vec<ThumbnailSlot>,
    context: RenderContext,
    next_generation: u64,
    stats: CacheStats,
}

impl ThumbnailCache {
    /// Create an empty cache for the given render context.
    #[must_use]
    pub fn new(context: RenderContext) -> Self {
        Self {
            slots: Vec::new(),
            context,
            next_generation: 0,
            stats: CacheStats::default(),
        }
    }

    fn bump(&mut self) -> Generation {
        self.next_generation += 1;
        Generation(self.next_generation)
    }

    /// Render context the cached images belong to.
    #[must_use]
    pub fn context(&self) -> RenderContext {
        self.context
    }

    /// Number of slots (always equal to the model length once settled).
    #[must_use]
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    /// Check if the cache has no slots.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Thumbnail at `index`, or `None` for a placeholder / out of range.
    #[must_use]
    pub fn get(&self, index: usize) -> Option<&RasterImage> {
        self.slots.get(index).and_then(|s| s.image.as_ref())
    }

    /// Whether a newer render is outstanding for `index`.
    #[must_use]
    pub fn is_stale(&self, index: usize) -> bool {
        self.slots.get(index).is_some_and(|s| s.stale)
    }

    /// Number of slots waiting for a render.
    #[must_use]
    pub fn stale_count(&self) -> usize {
        self.slots.iter().filter(|s| s.stale).count()
    }

    /// Current generation of the slot at `index`.
    #[must_use]
    pub fn generation(&self, index: usize) -> Option<Generation> {
        self.slots.get(index).map(|s| s.generation)
    }

    /// Append a placeholder slot and return the render it needs.
    pub fn push_placeholder(&mut self) -> RenderTicket {
        let generation = self.bump();
        self.slots.push(ThumbnailSlot {
            image: None,
            generation,
            stale: true,
        });
        RenderTicket {
            index: self.slots.len() - 1,
            generation,
        }
    }

    /// Mark the slot at `index` stale, keeping its old image as placeholder.
    ///
    /// Returns `None` if `index` is out of range.
    pub fn mark_stale(&mut self, index: usize) -> Option<RenderTicket> {
        if index >= self.slots.len() {
            return None;
        }
        let generation = self.bump();
        let slot = &mut self.slots[index];
        slot.generation = generation;
        slot.stale = true;
        Some(RenderTicket { index, generation })
    }

    /// Remove the slot at `index`. Later slots shift down with their images.
    pub fn remove(&mut self, index: usize) -> bool {
        if index >= self.slots.len() {
            return false;
        }
        self.slots.remove(index);
        true
    }

    /// Drop every cached image, switch to `context`, and return the renders
    /// needed to refill the cache.
    pub fn invalidate_all(&mut self, context: RenderContext) -> Vec<RenderTicket> {
        self.context = context;
        self.stats.invalidations += 1;
        let len = self.slots.len();
        self.rebuild(len)
    }

    /// Resize to `len` placeholder slots (the model was swapped wholesale) and
    /// return the renders needed to fill them.
    pub fn reset(&mut self, len: usize) -> Vec<RenderTicket> {
        self.stats.invalidations += 1;
        self.rebuild(len)
    }

    fn rebuild(&mut self, len: usize) -> Vec<RenderTicket> {
        self.slots.clear();
        (0..len).map(|_| self.push_placeholder()).collect()
    }

    /// Apply a finished render.
    ///
    /// `index_hint` is where the slot was when the render was scheduled; the
    /// slot is found by generation if it has since moved. Returns the slot's
    /// current index, or `None` if the render was superseded and discarded.
    pub fn apply(
        &mut self,
        index_hint: usize,
        generation: Generation,
        image: RasterImage,
    ) -> Option<usize> {
        let index = if self
            .slots
            .get(index_hint)
            .is_some_and(|s| s.generation == generation)
        {
            Some(index_hint)
        } else {
            self.slots.iter().position(|s| s.generation == generation)
        };

        match index {
            Some(i) => {
                let slot = &mut self.slots[i];
                slot.image = Some(image);
                slot.stale = false;
                self.stats.applied += 1;
                Some(i)
            }
            None => {
                self.stats.discarded += 1;
                None
            }
        }
    }

    /// Record a failed render. The slot keeps its previous image.
    ///
    /// Returns `true` if the failure belonged to the slot's current
    /// generation, which then stops counting as stale.
    pub fn fail(&mut self, generation: Generation) -> bool {
        match self.slots.iter_mut().find(|s| s.generation == generation) {
            Some(slot) => {
                slot.stale = false;
                true
            }
            None => false,
        }
    }

    /// Cache statistics.
    #[must_use]
    pub fn stats(&self) -> &CacheStats {
        &self.stats
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn img(shade: u8) -> RasterImage {
        RasterImage::solid(2, 2, [shade, shade, shade, 255])
    }

    #[test]
    fn test_placeholder_then_apply() {
        let mut cache = ThumbnailCache::new(RenderContext::default());
        let ticket = cache.push_placeholder();
        assert_eq!(cache.len(), 1);
        assert!(cache.get(0).is_none());
        assert!(cache.is_stale(0));

        assert_eq!(cache.apply(ticket.index, ticket.generation, img(1)), Some(0));
        assert_eq!(cache.get(0), Some(&img(1)));
        assert!(!cache.is_stale(0));
    }

    #[test]
    fn test_superseded_render_is_discarded() {
        let mut cache = ThumbnailCache::new(RenderContext::default());
        let first = cache.push_placeholder();
        let second = cache.mark_stale(0).expect("in range");

        assert_eq!(cache.apply(second.index, second.generation, img(2)), Some(0));
        assert_eq!(cache.apply(first.index, first.generation, img(1)), None);
        assert_eq!(cache.get(0), Some(&img(2)));
        assert_eq!(cache.stats().discarded, 1);
    }

    #[test]
    fn test_mark_stale_keeps_old_image() {
        let mut cache = ThumbnailCache::new(RenderContext::default());
        let t = cache.push_placeholder();
        cache.apply(t.index, t.generation, img(5));
        cache.mark_stale(0);
        assert_eq!(cache.get(0), Some(&img(5)));
        assert!(cache.is_stale(0));
    }

    #[test]
    fn test_render_follows_slot_after_removal() {
        let mut cache = ThumbnailCache::new(RenderContext::default());
        let _a = cache.push_placeholder();
        let _b = cache.push_placeholder();
        let c = cache.push_placeholder();

        assert!(cache.remove(0));
        assert_eq!(cache.apply(c.index, c.generation, img(3)), Some(1));
        assert_eq!(cache.get(1), Some(&img(3)));
    }

    #[test]
    fn test_render_for_removed_slot_is_discarded() {
        let mut cache = ThumbnailCache::new(RenderContext::default());
        let a = cache.push_placeholder();
        cache.remove(0);
        assert_eq!(cache.apply(a.index, a.generation, img(1)), None);
        assert!(cache.is_empty());
    }

    #[test]
    fn test_removal_shifts_images_without_rerender() {
        let mut cache = ThumbnailCache::new(RenderContext::default());
        for shade in 0..4 {
            let t = cache.push_placeholder();
            cache.apply(t.index, t.generation, img(shade));
        }
        cache.remove(1);
        assert_eq!(cache.len(), 3);
        assert_eq!(cache.get(1), Some(&img(2)));
        assert_eq!(cache.get(2), Some(&img(3)));
        assert_eq!(cache.stale_count(), 0);
    }

    #[test]
    fn test_invalidate_all_discards_in_flight_renders() {
        let mut cache = ThumbnailCache::new(RenderContext::default());
        let old = cache.push_placeholder();
        let dark = RenderContext::default().with_appearance(inkbook_core::Appearance::Dark);

        let tickets = cache.invalidate_all(dark);
        assert_eq!(tickets.len(), 1);
        assert_eq!(cache.context(), dark);
        assert_eq!(cache.apply(old.index, old.generation, img(1)), None);
        assert_eq!(
            cache.apply(tickets[0].index, tickets[0].generation, img(2)),
            Some(0)
        );
    }

    #[test]
    fn test_failed_render_clears_stale() {
        let mut cache = ThumbnailCache::new(RenderContext::default());
        let t = cache.push_placeholder();
        assert!(cache.fail(t.generation));
        assert!(!cache.is_stale(0));
        assert!(cache.get(0).is_none());
    }
}
