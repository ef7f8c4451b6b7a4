//! Portal records built at map load: sector portals (skyboxes, stacked
//! sectors, flat-plane horizons), paired line portals with their
//! precomputed coordinate translation, and sky viewpoint anchors.

use crate::level::map_defs::Line;
use glam::{DVec2, DVec3};
use math::Angle;

/// What a sector portal shows on the flagged plane
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SectorPortalKind {
    /// View teleports to a sky viewpoint anchor
    SkyViewpoint { viewpoint: u32 },
    /// Eternity-style flat horizon plane
    Plane,
    /// Linked sector stack, view shifted by a fixed displacement
    Linked,
}

#[derive(Debug, Clone)]
pub struct SectorPortal {
    pub kind: SectorPortalKind,
    /// Sector this portal originates from
    pub sector: u32,
    /// Plane the portal sits on: `PLANE_FLOOR`/`PLANE_CEILING`, or -1
    /// when the portal is not plane-bound
    pub plane: i32,
    pub displacement: DVec2,
}

/// A paired line portal with its origin→destination transform frozen
/// at load time. The mapping sends the origin line's v1 onto the
/// destination's v2 (the lines face each other).
#[derive(Debug, Clone, PartialEq)]
pub struct LinePortal {
    pub origin: u32,
    pub destination: u32,
    src_anchor: DVec2,
    dst_anchor: DVec2,
    rotation: Angle,
    z_displacement: f64,
}

impl LinePortal {
    pub fn new(lines: &[Line], origin: u32, destination: u32, z_displacement: f64) -> Self {
        let src = &lines[origin as usize];
        let dst = &lines[destination as usize];
        Self {
            origin,
            destination,
            src_anchor: src.v1,
            dst_anchor: dst.v2,
            rotation: dst.angle() + Angle::ANG180 - src.angle(),
            z_displacement,
        }
    }

    /// `P_TranslatePortalXY`
    #[inline]
    pub fn translate_xy(&self, p: DVec2) -> DVec2 {
        let (s, c) = self.rotation.sin_cos();
        let rel = p - self.src_anchor;
        self.dst_anchor + DVec2::new(rel.x * c - rel.y * s, rel.x * s + rel.y * c)
    }

    /// `P_TranslatePortalAngle`
    #[inline]
    pub fn translate_angle(&self, a: Angle) -> Angle {
        a + self.rotation
    }

    /// `P_TranslatePortalZ`
    #[inline]
    pub fn translate_z(&self, z: f64) -> f64 {
        z + self.z_displacement
    }
}

/// A skybox anchor actor. Interpolation between the previous and
/// current tic state keeps moving skyboxes smooth.
#[derive(Debug, Clone)]
pub struct SkyViewpoint {
    pub pos: DVec3,
    pub prev_pos: DVec3,
    pub angle: Angle,
    pub prev_angle: Angle,
    pub sector: u32,
    /// Subsector the anchor was spawned in, used for map-section lookup
    pub subsector: u32,
}

impl SkyViewpoint {
    #[inline]
    pub fn interpolated_pos(&self, frac: f64) -> DVec3 {
        self.prev_pos + (self.pos - self.prev_pos) * frac
    }

    #[inline]
    pub fn interpolated_angle(&self, frac: f64) -> Angle {
        self.prev_angle + Angle::from_degrees(self.prev_angle.delta(self.angle) * frac)
    }
}
