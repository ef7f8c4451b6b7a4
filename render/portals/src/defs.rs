//! Shared portal bookkeeping types: the per-scene dedup tables, the
//! visited map-section bitset, and the sky/horizon descriptions that
//! key them.

use gameplay::{Sector, SectorPlane};

/// Description of one sky as a sector selects it. Surfaces showing the
/// same sky share one portal through the dedup table.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct SkyInfo {
    /// Sector sky selector, resolved to dome textures by the sky
    /// renderer
    pub sky: usize,
    pub x_offset: f32,
    pub mirrored: bool,
}

/// Description of one horizon plane
#[derive(Debug, Clone, PartialEq)]
pub struct HorizonInfo {
    pub plane: SectorPlane,
    pub lightlevel: i32,
}

impl HorizonInfo {
    pub fn from_sector(sector: &Sector, plane: usize) -> Self {
        Self {
            plane: *sector.plane(plane),
            lightlevel: clamp_light(sector.lightlevel),
        }
    }
}

#[inline]
pub fn clamp_light(level: i32) -> i32 {
    level.clamp(0, 255)
}

/// Value-keyed handle table. Equal items get the same handle, so two
/// surfaces describing the same logical destination merge into one
/// portal. Cleared once per scene.
#[derive(Debug, Default)]
pub struct UniqueList<T: Clone + PartialEq> {
    items: Vec<T>,
}

impl<T: Clone + PartialEq> UniqueList<T> {
    pub fn new() -> Self {
        Self { items: Vec::new() }
    }

    /// Handle for `item`, allocating one if it is new
    pub fn get(&mut self, item: &T) -> usize {
        if let Some(i) = self.items.iter().position(|t| t == item) {
            return i;
        }
        self.items.push(item.clone());
        self.items.len() - 1
    }

    #[inline]
    pub fn item(&self, handle: usize) -> &T {
        &self.items[handle]
    }

    pub fn clear(&mut self) {
        self.items.clear();
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

/// Bitset over map sections marking which have been drawn in the
/// current recursion branch. Saved (and zeroed) before a nested portal
/// draw, restored after, so sibling branches don't see each other's
/// visited state.
#[derive(Debug, Default)]
pub struct SectionTrack {
    bits: Vec<u8>,
}

impl SectionTrack {
    pub fn reset(&mut self, sections: usize) {
        self.bits.clear();
        self.bits.resize(sections.div_ceil(8), 0);
    }

    #[inline]
    pub fn mark(&mut self, section: u32) {
        let section = section as usize;
        if section >> 3 < self.bits.len() {
            self.bits[section >> 3] |= 1 << (section & 7);
        }
    }

    #[inline]
    pub fn is_marked(&self, section: u32) -> bool {
        let section = section as usize;
        section >> 3 < self.bits.len() && self.bits[section >> 3] & (1 << (section & 7)) != 0
    }

    /// Take the current bits (zeroing them) for restoring after a
    /// nested draw
    pub fn save(&mut self) -> Vec<u8> {
        let saved = self.bits.clone();
        self.bits.fill(0);
        saved
    }

    pub fn restore(&mut self, saved: Vec<u8>) {
        self.bits = saved;
    }
}
