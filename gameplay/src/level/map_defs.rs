use crate::level::portals::{LinePortal, SectorPortal, SkyViewpoint};
use glam::DVec2;
use math::Angle;

/// Index into the flat/texture store owned by the resource system
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TextureId(pub usize);

pub const PLANE_FLOOR: usize = 0;
pub const PLANE_CEILING: usize = 1;

/// A sector flat plane. Only horizontal planes are carried: the plane
/// equation is `c * z + d = 0` with `c` either 1.0 (facing up) or -1.0.
#[derive(Debug, Default, Clone, Copy, PartialEq)]
pub struct SectorPlane {
    pub c: f64,
    pub d: f64,
    /// `None` marks a missing or invalid flat
    pub texture: Option<TextureId>,
    /// Height the flat texture is anchored at
    pub texheight: f64,
}

impl SectorPlane {
    pub fn new(height: f64, facing_up: bool, texture: Option<TextureId>) -> Self {
        let c = if facing_up { 1.0 } else { -1.0 };
        Self {
            c,
            d: -height * c,
            texture,
            texheight: height,
        }
    }

    #[inline]
    pub fn z_at(&self, _point: DVec2) -> f64 {
        -self.d / self.c
    }
}

/// The SECTORS record, trimmed to what the portal renderer chases
#[derive(Debug, Default, Clone)]
pub struct Sector {
    pub num: u32,
    pub floorplane: SectorPlane,
    pub ceilingplane: SectorPlane,
    /// Flat is the sky marker rather than a real texture
    pub floor_sky: bool,
    pub ceiling_sky: bool,
    pub lightlevel: i32,
    /// Sky texture selector for this sector
    pub sky: usize,
    /// Subsectors cut from this sector, first entry is the seed used
    /// for map-section lookups through line portals
    pub subsectors: Vec<u32>,
}

impl Sector {
    #[inline]
    pub fn plane(&self, which: usize) -> &SectorPlane {
        if which == PLANE_FLOOR {
            &self.floorplane
        } else {
            &self.ceilingplane
        }
    }
}

/// The LINEDEF record, trimmed likewise
#[derive(Debug, Clone)]
pub struct Line {
    pub v1: DVec2,
    pub v2: DVec2,
    pub front_sector: u32,
    /// Paired line this one teleports view/things to, if any
    pub portal_destination: Option<u32>,
}

impl Line {
    #[inline]
    pub fn delta(&self) -> DVec2 {
        self.v2 - self.v1
    }

    #[inline]
    pub fn angle(&self) -> Angle {
        Angle::from_vector(self.delta())
    }

    /// 0 if `point` is on the front side, 1 on the back.
    /// `P_PointOnLineSidePrecise` equivalent.
    #[inline]
    pub fn point_on_side(&self, point: DVec2) -> usize {
        let d = self.delta();
        if (point.y - self.v1.y) * d.x >= (point.x - self.v1.x) * d.y {
            1
        } else {
            0
        }
    }
}

#[derive(Debug, Default, Clone)]
pub struct SubSector {
    pub sector: u32,
    /// Coarse connected-region id used for visited tracking
    pub mapsection: u32,
    /// Destination subsectors made visible through a stack portal on
    /// the given plane, precomputed at map load
    pub coverage: [Vec<u32>; 2],
}

/// The level data the portal machine walks. Loading is done by the wad
/// side; render code only ever reads this.
#[derive(Debug, Default)]
pub struct MapData {
    pub sectors: Vec<Sector>,
    pub lines: Vec<Line>,
    pub subsectors: Vec<SubSector>,
    pub sector_portals: Vec<SectorPortal>,
    pub line_portals: Vec<LinePortal>,
    pub sky_viewpoints: Vec<SkyViewpoint>,
    /// Count of map sections, sizes the visited bitsets
    pub map_sections: usize,
}
