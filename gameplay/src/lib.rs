//! Level-side data the renderer consumes: sectors and their planes,
//! lines, subsectors grouped into map sections, and the portal records
//! built at map load (sector portals, line-portal pairs, sky
//! viewpoints). The BSP itself and full map loading live elsewhere;
//! this crate only carries what the render crates chase through.

mod level;

pub use glam;
pub use level::map_defs::{
    Line, MapData, Sector, SectorPlane, SubSector, TextureId, PLANE_CEILING, PLANE_FLOOR,
};
pub use level::portals::{LinePortal, SectorPortal, SectorPortalKind, SkyViewpoint};
pub use log;
pub use math::Angle;
