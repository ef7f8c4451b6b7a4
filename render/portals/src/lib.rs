//! Portal maintenance for the hardware renderer: skyboxes, mirrors,
//! sector stacks, line portals and horizons. Requires a stencil buffer.
//!
//! Scene traversal registers portals as it recognises their boundary
//! walls; at the end of a frame the stack drains them, opening a
//! stencil window per portal, substituting the view, and re-entering
//! the scene renderer. Recursion is bounded and balanced: every draw
//! restores the shared view/clip/stencil state exactly as it found it.

mod clipper;
mod config;
mod defs;
mod horizon;
mod mirrors;
mod skies;
mod stack;
mod stacks;

#[cfg(test)]
mod tests;

pub use clipper::Clipper;
pub use config::PortalConfig;
pub use defs::{HorizonInfo, SectionTrack, SkyInfo, UniqueList, clamp_light};
pub use stack::{PortalStack, RenderSession};

use gameplay::{Angle, MapData};
use glam::{DVec2, DVec3};
use render_trait::{GlCommands, GlSeg};

/// The mutable camera context every portal saves and restores around
/// its own recursive draw. Copied by value into the bracket, compared
/// by value in tests.
#[derive(Debug, Default, Clone, Copy, PartialEq)]
pub struct ViewState {
    pub pos: DVec3,
    pub angle: Angle,
    /// Active render area tag the traversal is in
    pub area: i32,
    /// Whether the viewer's own body is drawn (mirrors force it on)
    pub show_viewer: bool,
    /// Last two points of the viewer's movement path, used by line
    /// portals to decide far-side viewer visibility
    pub path: [DVec3; 2],
}

/// One boundary wall of a portal: the wall quad the renderer built
/// plus the linedef it came from (where one exists).
#[derive(Debug, Clone, Copy)]
pub struct PortalLine {
    pub seg: GlSeg,
    pub linedef: Option<u32>,
}

/// Identity of the map construct a portal originates from, used to
/// attach further boundary walls to an already-pending portal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PortalSource {
    Sky(usize),
    Horizon(usize),
    PlaneMirror(usize),
    SectorPortal(usize),
    LinePortal(usize),
    Line(usize),
}

#[derive(Debug, Clone)]
pub enum PortalKind {
    /// Sky dome drawn with the view unchanged
    Sky { sky: usize },
    /// View teleported to a sky viewpoint anchor
    Skybox { portal: usize, viewpoint: u32 },
    /// View shifted by the stack displacement
    SectorStack { portal: usize, subsectors: Vec<u32> },
    /// View reflected across a flat plane
    PlaneMirror { plane: gameplay::SectorPlane, key: usize },
    /// View reflected across a mirror line
    Mirror { linedef: usize },
    /// View translated through a line-portal pair
    LineToLine { portal: usize },
    /// Flat plane drawn out to the far boundary, no recursion
    Horizon { horizon: usize },
    /// Eternity-style horizon: sky and/or two horizon planes
    EEHorizon { portal: usize },
}

/// A pending portal. Owned by the stack from registration until its
/// draw at frame end; never survives a frame.
#[derive(Debug, Clone)]
pub struct Portal {
    pub lines: Vec<PortalLine>,
    pub kind: PortalKind,
}

impl Portal {
    pub fn new(kind: PortalKind) -> Self {
        Self {
            lines: Vec::new(),
            kind,
        }
    }

    pub fn add_line(&mut self, seg: GlSeg, linedef: Option<u32>) {
        self.lines.push(PortalLine { seg, linedef });
    }

    /// Attach a source subsector to a sector-stack portal
    pub fn add_subsector(&mut self, subsector: u32) {
        if let PortalKind::SectorStack { subsectors, .. } = &mut self.kind {
            subsectors.push(subsector);
        }
    }

    pub fn source(&self) -> PortalSource {
        match &self.kind {
            PortalKind::Sky { sky } => PortalSource::Sky(*sky),
            PortalKind::Skybox { portal, .. } => PortalSource::SectorPortal(*portal),
            PortalKind::SectorStack { portal, .. } => PortalSource::SectorPortal(*portal),
            PortalKind::PlaneMirror { key, .. } => PortalSource::PlaneMirror(*key),
            PortalKind::Mirror { linedef } => PortalSource::Line(*linedef),
            PortalKind::LineToLine { portal } => PortalSource::LinePortal(*portal),
            PortalKind::Horizon { horizon } => PortalSource::Horizon(*horizon),
            PortalKind::EEHorizon { portal } => PortalSource::SectorPortal(*portal),
        }
    }

    pub fn name(&self) -> &'static str {
        match self.kind {
            PortalKind::Sky { .. } => "Sky",
            PortalKind::Skybox { .. } => "Skybox",
            PortalKind::SectorStack { .. } => "Sectorstack",
            PortalKind::PlaneMirror { .. } => "Planemirror",
            PortalKind::Mirror { .. } => "Mirror",
            PortalKind::LineToLine { .. } => "LineToLine",
            PortalKind::Horizon { .. } => "Horizon",
            PortalKind::EEHorizon { .. } => "EEHorizon",
        }
    }

    /// Sky-like portals are candidates for the unstenciled fast path
    pub fn is_sky(&self) -> bool {
        matches!(
            self.kind,
            PortalKind::Sky { .. } | PortalKind::Skybox { .. } | PortalKind::EEHorizon { .. }
        )
    }

    /// Whether the recursive contents need their own depth range.
    /// Pure dome/plane fills do not, so they skip the query machinery.
    pub fn needs_depth_buffer(&self) -> bool {
        !matches!(
            self.kind,
            PortalKind::Sky { .. } | PortalKind::Horizon { .. }
        )
    }

    /// Whether the stencil silhouette gets far-distance cap quads
    pub fn needs_cap(&self) -> bool {
        self.needs_depth_buffer()
    }
}

/// Classification of geometry against the active mirror/line portal
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineClip {
    InFront,
    Inside,
}

/// The scene rasterizer the portal machine re-enters. The walls,
/// planes and things drawing all live behind this; portals only
/// substitute view state around `draw_scene` calls.
pub trait SceneRenderer {
    /// Render one full view into the current view/clip state. The
    /// scene brackets its own portal recursion: it calls
    /// `portals.start_frame()` before traversal and
    /// `portals.end_frame(..)` after drawing.
    fn draw_scene(&mut self, level: &MapData, portals: &mut PortalStack, gl: &mut dyn GlCommands);

    /// Half-angle of the current view frustum
    fn frustum_angle(&self) -> Angle;

    /// Rebuild the camera transform, flipping winding per mirror parity
    fn setup_view(&mut self, pos: DVec3, angle: Angle, mirror: bool, plane_mirror: bool);

    /// Area tag at a view position
    fn view_area(&self, level: &MapData, pos: DVec3) -> i32;

    /// Draw the sky dome for the current view
    fn draw_sky(&mut self, sky: &SkyInfo, gl: &mut dyn GlCommands);

    /// A stack portal determined `subsector` is visible through its
    /// window even though traversal never reached it
    fn mark_subsector_seen(&mut self, _subsector: u32) {}

    /// Bracket draw-list state around a depth-isolated recursive draw
    fn start_draw_info(&mut self);
    fn end_draw_info(&mut self);
}

/// Classify a point against a line-backed portal boundary. Points on
/// the back side are completely in front of the portal view and can
/// be culled by the traversal.
#[inline]
pub(crate) fn clip_point_to_line(line: &gameplay::Line, point: DVec2) -> LineClip {
    if line.point_on_side(point) == 0 {
        LineClip::Inside
    } else {
        LineClip::InFront
    }
}
