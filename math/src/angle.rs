use glam::DVec2;
use std::ops::{Add, AddAssign, Neg, Sub, SubAssign};

/// One BAM unit expressed in degrees
const BAM_TO_DEG: f64 = 90.0 / 0x4000_0000u32 as f64;
const DEG_TO_BAM: f64 = 0x4000_0000u32 as f64 / 90.0;

/// A binary angle (BAM). The full `u32` range is one turn, so wrapping
/// arithmetic gives free angle normalisation. Comparisons of raw BAMs
/// are used by the clipper; degree/radian views are used everywhere the
/// view maths needs real numbers.
#[derive(Debug, Default, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Angle(u32);

impl Angle {
    pub const ANG45: Angle = Angle(0x2000_0000);
    pub const ANG90: Angle = Angle(0x4000_0000);
    pub const ANG180: Angle = Angle(0x8000_0000);
    pub const ANG270: Angle = Angle(0xC000_0000);

    #[inline]
    pub const fn from_bam(bam: u32) -> Self {
        Angle(bam)
    }

    #[inline]
    pub const fn bam(self) -> u32 {
        self.0
    }

    #[inline]
    pub fn from_degrees(deg: f64) -> Self {
        // rem_euclid keeps the cast in range for very large inputs
        Angle((deg * DEG_TO_BAM).rem_euclid(4294967296.0) as u32)
    }

    #[inline]
    pub fn degrees(self) -> f64 {
        self.0 as f64 * BAM_TO_DEG
    }

    #[inline]
    pub fn from_radians(rad: f64) -> Self {
        Self::from_degrees(rad.to_degrees())
    }

    #[inline]
    pub fn rad(self) -> f64 {
        self.degrees().to_radians()
    }

    #[inline]
    pub fn from_vector(v: DVec2) -> Self {
        Self::from_radians(v.y.atan2(v.x))
    }

    #[inline]
    pub fn sin_cos(self) -> (f64, f64) {
        self.rad().sin_cos()
    }

    /// Signed difference `other - self` in degrees, in (-180, 180]
    #[inline]
    pub fn delta(self, other: Angle) -> f64 {
        other.0.wrapping_sub(self.0) as i32 as f64 * BAM_TO_DEG
    }

    /// Mirror this angle across `axis`: `2 * axis - self`
    #[inline]
    pub fn mirrored_about(self, axis: Angle) -> Angle {
        Angle(axis.0.wrapping_mul(2).wrapping_sub(self.0))
    }
}

impl Add for Angle {
    type Output = Angle;
    #[inline]
    fn add(self, other: Angle) -> Angle {
        Angle(self.0.wrapping_add(other.0))
    }
}

impl AddAssign for Angle {
    #[inline]
    fn add_assign(&mut self, other: Angle) {
        self.0 = self.0.wrapping_add(other.0);
    }
}

impl Sub for Angle {
    type Output = Angle;
    #[inline]
    fn sub(self, other: Angle) -> Angle {
        Angle(self.0.wrapping_sub(other.0))
    }
}

impl SubAssign for Angle {
    #[inline]
    fn sub_assign(&mut self, other: Angle) {
        self.0 = self.0.wrapping_sub(other.0);
    }
}

impl Neg for Angle {
    type Output = Angle;
    #[inline]
    fn neg(self) -> Angle {
        Angle(self.0.wrapping_neg())
    }
}
