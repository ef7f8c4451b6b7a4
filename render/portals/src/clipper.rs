//! Angular visibility clipping over binary angles. The clipper tracks
//! which horizontal view angles are already occluded; a portal resets
//! it to the wedge visible through its own boundary before recursing.
//!
//! Ranges are kept sorted, disjoint and inclusive over the raw `u32`
//! angle space. Wrap-around inputs are split at zero by the `safe_`
//! entry points, so the core operations never see `first > last`.

use math::Angle;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct ClipRange {
    first: u32,
    last: u32,
}

#[derive(Debug, Default)]
pub struct Clipper {
    ranges: Vec<ClipRange>,
    /// Ranges locked by `set_silhouette`; removals cannot re-open them
    silhouette: Vec<ClipRange>,
}

impl Clipper {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn clear(&mut self) {
        self.ranges.clear();
        self.silhouette.clear();
    }

    /// Mark `from..to` as occluded, splitting at the zero crossing
    pub fn safe_add_clip_range(&mut self, from: Angle, to: Angle) {
        let (a, b) = (from.bam(), to.bam());
        if a > b {
            self.add(a, u32::MAX);
            self.add(0, b);
        } else {
            self.add(a, b);
        }
    }

    /// Re-open `from..to`, except where the silhouette has locked it
    pub fn safe_remove_clip_range(&mut self, from: Angle, to: Angle) {
        let (a, b) = (from.bam(), to.bam());
        if a > b {
            self.remove(a, u32::MAX);
            self.remove(0, b);
        } else {
            self.remove(a, b);
        }
    }

    /// Lock everything currently clipped so the recursive draw cannot
    /// re-open geometry the parent already covered
    pub fn set_silhouette(&mut self) {
        self.silhouette = self.ranges.clone();
    }

    /// True if any part of `from..to` is still unclipped
    pub fn safe_check_range(&self, from: Angle, to: Angle) -> bool {
        let (a, b) = (from.bam(), to.bam());
        if a > b {
            !(self.covered(a, u32::MAX) && self.covered(0, b))
        } else {
            !self.covered(a, b)
        }
    }

    fn add(&mut self, first: u32, last: u32) {
        debug_assert!(first <= last);
        let mut new_first = first as u64;
        let mut new_last = last as u64;
        let mut out = Vec::with_capacity(self.ranges.len() + 1);
        let mut placed = false;

        for r in &self.ranges {
            let (rf, rl) = (r.first as u64, r.last as u64);
            if rl + 1 < new_first {
                out.push(*r);
            } else if rf > new_last + 1 {
                if !placed {
                    out.push(ClipRange {
                        first: new_first as u32,
                        last: new_last as u32,
                    });
                    placed = true;
                }
                out.push(*r);
            } else {
                // overlapping or touching, absorb
                new_first = new_first.min(rf);
                new_last = new_last.max(rl);
            }
        }
        if !placed {
            out.push(ClipRange {
                first: new_first as u32,
                last: new_last as u32,
            });
        }
        self.ranges = out;
    }

    fn remove(&mut self, first: u32, last: u32) {
        debug_assert!(first <= last);
        let mut out = Vec::with_capacity(self.ranges.len() + 1);
        for r in &self.ranges {
            if r.last < first || r.first > last {
                out.push(*r);
                continue;
            }
            if r.first < first {
                out.push(ClipRange {
                    first: r.first,
                    last: first - 1,
                });
            }
            if r.last > last {
                out.push(ClipRange {
                    first: last + 1,
                    last: r.last,
                });
            }
        }
        self.ranges = out;

        // silhouetted parts stay clipped
        let locked: Vec<ClipRange> = self
            .silhouette
            .iter()
            .filter_map(|s| {
                let f = s.first.max(first);
                let l = s.last.min(last);
                (f <= l).then_some(ClipRange { first: f, last: l })
            })
            .collect();
        for s in locked {
            self.add(s.first, s.last);
        }
    }

    /// Whole of `first..last` occluded?
    fn covered(&self, first: u32, last: u32) -> bool {
        let mut pos = first as u64;
        let last = last as u64;
        for r in &self.ranges {
            if (r.last as u64) < pos {
                continue;
            }
            if (r.first as u64) > pos {
                return false;
            }
            pos = r.last as u64 + 1;
            if pos > last {
                return true;
            }
        }
        pos > last
    }
}
