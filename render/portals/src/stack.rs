//! The per-frame portal stack and the stencil/occlusion-query bracket
//! around each portal's recursive draw.
//!
//! Traversal pushes portals while the scene is walked; `end_frame`
//! drains the current recursion level last-registered-first. Each
//! drained portal goes through the visibility gate: silhouette into
//! the stencil buffer, optional occlusion query to skip invisible
//! portals, view substitution, recursive scene draw, then exact
//! restoration of stencil, depth and view state.

use crate::clipper::Clipper;
use crate::config::PortalConfig;
use crate::defs::{HorizonInfo, SectionTrack, SkyInfo, UniqueList};
use crate::{LineClip, Portal, PortalKind, PortalSource, SceneRenderer, ViewState, clip_point_to_line};
#[cfg(feature = "hprof")]
use coarse_prof::profile;
use gameplay::log::{debug, info};
use gameplay::{LinePortal, MapData, SectorPlane};
use glam::DVec2;
use math::{Angle, point_to_angle_2};
use render_trait::{DepthFunc, FlatVertex, GlCommands, StencilOp};

/// Far-clip distance the stencil cap quads reach to
const FAR_CLIP: f32 = 32767.0;
/// Nested skyboxes beyond this fill flat instead of recursing
const MAX_SKYBOX_RECURSION: u32 = 3;

/// The shared render-session context: every counter and flag a
/// recursion level saves around its nested draws. One per stack, so
/// concurrent render sessions (render-to-texture) don't corrupt each
/// other.
#[derive(Debug, Default)]
pub struct RenderSession {
    /// Stencil nesting depth. Must stay within the stencil bit depth;
    /// bounded in practice by the recursion ceilings.
    pub recursion: u32,
    /// Logical recursion depth across all portal kinds
    pub renderdepth: u32,
    /// Low bit selects the winding flip for mirrored geometry
    pub mirror_flag: u32,
    pub plane_mirror_flag: u32,
    /// -1 below a ceiling mirror, 1 above a floor mirror, 0 outside
    pub plane_mirror_mode: i32,
    /// Weapon-flash light boost, zeroed inside skyboxes
    pub extralight: i32,
    pub in_skybox: bool,
    pub skybox_recursion: u32,
    /// Per-plane counters keeping a sector stack from re-entering
    /// itself through the same plane
    pub instack: [u32; 2],
    /// Map sections drawn in the current recursion branch
    pub visited: SectionTrack,
    /// The mirror/line portal whose boundary currently clips the scene
    pub current_portal: Option<PortalSource>,
    /// Sector portals whose skybox is being drawn right now
    pub active_skyboxes: Vec<usize>,
    /// Interpolation fraction within the current tic
    pub tic_frac: f64,
}

/// State the gate saves across one portal's recursive draw
pub(crate) struct GateSave {
    pub(crate) saved_view: ViewState,
    clip_save: bool,
    saved_current: Option<PortalSource>,
}

pub struct PortalStack {
    /// Pending portals, one list per recursion level, drained in
    /// reverse registration order
    levels: Vec<Vec<Portal>>,
    pub view: ViewState,
    pub clipper: Clipper,
    pub session: RenderSession,
    pub config: PortalConfig,
    unique_skies: UniqueList<SkyInfo>,
    unique_horizons: UniqueList<HorizonInfo>,
    unique_plane_mirrors: UniqueList<SectorPlane>,
    unique_line_portals: UniqueList<LinePortal>,
    /// Query object creation failed once; queries stay off for the
    /// session and portals recurse unconditionally
    query_broken: bool,
    rendered_portals: usize,
    portal_info: bool,
    indent: String,
}

impl PortalStack {
    pub fn new(config: PortalConfig) -> Self {
        Self {
            levels: Vec::new(),
            view: ViewState::default(),
            clipper: Clipper::new(),
            session: RenderSession::default(),
            config,
            unique_skies: UniqueList::new(),
            unique_horizons: UniqueList::new(),
            unique_plane_mirrors: UniqueList::new(),
            unique_line_portals: UniqueList::new(),
            query_broken: false,
            rendered_portals: 0,
            portal_info: false,
            indent: String::new(),
        }
    }

    /// Once per rendered frame, before traversal
    pub fn begin_scene(&mut self, level: &MapData, tic_frac: f64) {
        self.unique_skies.clear();
        self.unique_horizons.clear();
        self.unique_plane_mirrors.clear();
        self.unique_line_portals.clear();
        self.session.visited.reset(level.map_sections);
        self.session.tic_frac = tic_frac;
        self.rendered_portals = 0;
    }

    /// Establish a new recursion scope for portals discovered while
    /// drawing the scene that is about to start
    pub fn start_frame(&mut self) {
        self.levels.push(Vec::new());
        if self.session.renderdepth == 0 {
            self.session.in_skybox = false;
            self.session.active_skyboxes.clear();
            self.session.instack = [0, 0];
        }
        self.session.renderdepth += 1;
    }

    /// Append a fully populated portal to the current recursion level
    pub fn register_portal(&mut self, portal: Portal) {
        if let Some(level) = self.levels.last_mut() {
            level.push(portal);
        } else {
            // registration outside a frame scope, keep it anyway
            self.levels.push(vec![portal]);
        }
    }

    /// Backward scan of the current level for a pending portal with
    /// the same origin, to attach further boundary walls to
    pub fn find_portal_by_origin(&mut self, source: PortalSource) -> Option<&mut Portal> {
        self.levels
            .last_mut()?
            .iter_mut()
            .rev()
            .find(|p| p.source() == source)
    }

    pub fn unique_sky(&mut self, info: &SkyInfo) -> usize {
        self.unique_skies.get(info)
    }

    pub fn unique_horizon(&mut self, info: &HorizonInfo) -> usize {
        self.unique_horizons.get(info)
    }

    pub fn unique_plane_mirror(&mut self, plane: &SectorPlane) -> usize {
        self.unique_plane_mirrors.get(plane)
    }

    pub fn unique_line_portal(&mut self, portal: &LinePortal) -> usize {
        self.unique_line_portals.get(portal)
    }

    pub(crate) fn sky_info(&self, handle: usize) -> &SkyInfo {
        self.unique_skies.item(handle)
    }

    pub(crate) fn horizon_info(&self, handle: usize) -> &HorizonInfo {
        self.unique_horizons.item(handle)
    }

    pub(crate) fn line_portal_info(&self, handle: usize) -> &LinePortal {
        self.unique_line_portals.item(handle)
    }

    /// Portals pending at the current recursion level
    pub fn pending_at_current_depth(&self) -> usize {
        self.levels.last().map_or(0, Vec::len)
    }

    /// Portals processed since `begin_scene`
    pub fn rendered_portals(&self) -> usize {
        self.rendered_portals
    }

    /// Print the drain tree for the next frame, then disarm
    pub fn arm_portal_info(&mut self) {
        self.portal_info = true;
    }

    /// Whether a sector stack is currently recursing through `plane`
    pub fn in_stack(&self, plane: usize) -> bool {
        self.session.instack[plane] > 0
    }

    /// Whether `portal` (sector-portal index) is the skybox being drawn
    pub fn is_skybox_active(&self, portal: usize) -> bool {
        self.session.active_skyboxes.contains(&portal)
    }

    /// Classify `point` against the active mirror/line-portal boundary
    pub fn clip_point(&self, level: &MapData, point: DVec2) -> LineClip {
        match self.active_clip_line() {
            Some(line) => clip_point_to_line(&level.lines[line], point),
            None => LineClip::Inside,
        }
    }

    /// A segment is culled only when both ends are in front
    pub fn clip_segment(&self, level: &MapData, v1: DVec2, v2: DVec2) -> LineClip {
        match self.active_clip_line() {
            Some(line) => {
                let l = &level.lines[line];
                if clip_point_to_line(l, v1) == LineClip::InFront
                    && clip_point_to_line(l, v2) == LineClip::InFront
                {
                    LineClip::InFront
                } else {
                    LineClip::Inside
                }
            }
            None => LineClip::Inside,
        }
    }

    fn active_clip_line(&self) -> Option<usize> {
        match self.session.current_portal? {
            PortalSource::Line(l) => Some(l),
            PortalSource::LinePortal(p) => {
                Some(self.unique_line_portals.item(p).destination as usize)
            }
            _ => None,
        }
    }

    #[inline]
    pub(crate) fn mirror_parity(&self) -> bool {
        self.session.mirror_flag & 1 != 0
    }

    #[inline]
    pub(crate) fn plane_mirror_parity(&self) -> bool {
        self.session.plane_mirror_flag & 1 != 0
    }

    pub(crate) fn apply_view(&self, scene: &mut dyn SceneRenderer) {
        scene.setup_view(
            self.view.pos,
            self.view.angle,
            self.mirror_parity(),
            self.plane_mirror_parity(),
        );
    }

    /// Drain and draw every portal registered at the current level,
    /// then close the recursion scope
    pub fn end_frame(
        &mut self,
        level: &MapData,
        scene: &mut dyn SceneRenderer,
        gl: &mut dyn GlCommands,
    ) {
        let mut pending = self.levels.pop().unwrap_or_default();

        if self.portal_info {
            info!(
                "{}{} portals, depth = {}",
                self.indent,
                pending.len(),
                self.session.renderdepth
            );
            info!("{}{{", self.indent);
            self.indent.push_str("  ");
        }

        // Query overhead only pays off with enough portals pending
        let usequery = pending.len() > self.config.query_min_portals;

        while let Some(portal) = pending.pop() {
            if self.portal_info {
                info!(
                    "{}Processing {}, depth = {}, query = {}",
                    self.indent,
                    portal.name(),
                    self.session.renderdepth,
                    usequery
                );
            }
            if !portal.lines.is_empty() {
                self.render_portal(&portal, true, usequery, level, scene, gl);
            }
        }
        self.session.renderdepth -= 1;

        if self.portal_info {
            self.indent.truncate(self.indent.len().saturating_sub(2));
            info!("{}}}", self.indent);
            if self.levels.is_empty() {
                self.portal_info = false;
            }
        }
    }

    /// Draw one sky-like portal plainly before the scene itself.
    /// Skies are common and expensive when stenciled but rarely more
    /// than one is visible, so the biggest pending one (by boundary
    /// count) skips the stencil entirely. Returns whether one drew.
    pub fn render_first_sky_portal(
        &mut self,
        current_recursion: u32,
        level: &MapData,
        scene: &mut dyn SceneRenderer,
        gl: &mut dyn GlCommands,
    ) -> bool {
        let mut best: Option<usize> = None;
        if let Some(pending) = self.levels.last() {
            for (i, p) in pending.iter().enumerate() {
                if p.lines.is_empty() || !p.is_sky() {
                    continue;
                }
                // The depth buffer cannot be cleared inside recursion
                if current_recursion > 0 && p.needs_depth_buffer() {
                    continue;
                }
                if best.is_none_or(|b| p.lines.len() > pending[b].lines.len()) {
                    best = Some(i);
                }
            }
        }

        if let Some(i) = best {
            if let Some(pending) = self.levels.last_mut() {
                let portal = pending.remove(i);
                self.render_portal(&portal, false, false, level, scene, gl);
                return true;
            }
        }
        false
    }

    fn render_portal(
        &mut self,
        p: &Portal,
        usestencil: bool,
        doquery: bool,
        level: &MapData,
        scene: &mut dyn SceneRenderer,
        gl: &mut dyn GlCommands,
    ) {
        #[cfg(feature = "hprof")]
        profile!("render_portal");
        self.rendered_portals += 1;
        if let Some(gate) = self.start(p, usestencil, doquery, scene, gl) {
            self.draw_contents(p, &gate.saved_view, level, scene, gl);
            self.end(p, gate, usestencil, scene, gl);
        }
    }

    fn draw_contents(
        &mut self,
        p: &Portal,
        saved: &ViewState,
        level: &MapData,
        scene: &mut dyn SceneRenderer,
        gl: &mut dyn GlCommands,
    ) {
        match &p.kind {
            PortalKind::Sky { sky } => {
                let sky = self.sky_info(*sky).clone();
                scene.draw_sky(&sky, gl);
            }
            PortalKind::Skybox { portal, viewpoint } => {
                self.draw_skybox(p, *portal, *viewpoint, saved, level, scene, gl);
            }
            PortalKind::SectorStack { portal, subsectors } => {
                self.draw_sector_stack(p, *portal, subsectors, saved, level, scene, gl);
            }
            PortalKind::PlaneMirror { plane, .. } => {
                self.draw_plane_mirror(p, plane, saved, level, scene, gl);
            }
            PortalKind::Mirror { linedef } => {
                self.draw_mirror(p, *linedef, level, scene, gl);
            }
            PortalKind::LineToLine { portal } => {
                self.draw_line_to_line(p, *portal, saved, level, scene, gl);
            }
            PortalKind::Horizon { horizon } => {
                let horizon = self.horizon_info(*horizon).clone();
                self.draw_horizon_info(&horizon, gl);
            }
            PortalKind::EEHorizon { portal } => {
                self.draw_ee_horizon(*portal, level, scene, gl);
            }
        }
    }

    /// Open the visibility gate for one portal. `None` means the
    /// portal is skipped entirely: portal rendering disabled, or the
    /// occlusion query saw no visible samples.
    fn start(
        &mut self,
        p: &Portal,
        usestencil: bool,
        mut doquery: bool,
        scene: &mut dyn SceneRenderer,
        gl: &mut dyn GlCommands,
    ) -> Option<GateSave> {
        #[cfg(feature = "hprof")]
        profile!("portal_gate");
        let needdepth = p.needs_depth_buffer();

        if usestencil {
            if !self.config.portals {
                return None;
            }

            // mark the window: increment stencil of pixels at the
            // current recursion value
            gl.stencil_func(self.session.recursion);
            gl.stencil_op(StencilOp::Increment);
            gl.color_mask(false);
            gl.set_texture_enabled(false);
            gl.depth_func(DepthFunc::Less);

            if needdepth {
                gl.depth_mask(false);
                if self.config.no_query || self.query_broken {
                    doquery = false;
                }
                if doquery && !gl.begin_samples_query() {
                    // some kind of error happened, fall back to
                    // unconditional recursion for the session
                    debug!("samples query creation failed, portal queries disabled");
                    self.query_broken = true;
                    doquery = false;
                }

                self.draw_portal_stencil(p, gl);

                if doquery {
                    gl.end_samples_query();
                }

                // push the window's depth to the far plane
                gl.stencil_func(self.session.recursion + 1);
                gl.stencil_op(StencilOp::Keep);
                gl.depth_mask(true);
                gl.depth_range(1.0, 1.0);
                gl.depth_func(DepthFunc::Always);
                self.draw_portal_stencil(p, gl);

                gl.set_texture_enabled(true);
                gl.color_mask(true);
                gl.depth_func(DepthFunc::Less);
                gl.depth_range(0.0, 1.0);

                if doquery && gl.samples_result() == 0 {
                    // not visible, undo the stencil setup and skip
                    debug!("{} portal fully occluded, skipped", p.name());
                    gl.stencil_op(StencilOp::Keep);
                    gl.stencil_func(self.session.recursion);
                    return None;
                }
                scene.start_draw_info();
            } else {
                // No depth isolation needed, so no query either; the
                // overhead outweighs the benefit for these portals.
                // The stencil must be drawn with z-write enabled here
                // because there is no second pass.
                gl.depth_mask(true);
                self.draw_portal_stencil(p, gl);
                gl.stencil_func(self.session.recursion + 1);
                gl.stencil_op(StencilOp::Keep);
                gl.set_texture_enabled(true);
                gl.color_mask(true);
                gl.set_depth_test(false);
                gl.depth_mask(false);
            }
            self.session.recursion += 1;
        } else if needdepth {
            scene.start_draw_info();
        } else {
            gl.depth_mask(false);
            gl.set_depth_test(false);
        }

        // The clip plane from the parent recursion level must not
        // restrict this one
        let clip_save = self.session.renderdepth >= 1 && {
            let slot = self.session.renderdepth as usize - 1;
            gl.clip_plane_active(slot)
        };
        if clip_save {
            gl.disable_clip_plane(self.session.renderdepth as usize - 1);
        }

        Some(GateSave {
            saved_view: self.view,
            clip_save,
            saved_current: self.session.current_portal.take(),
        })
    }

    /// Close the gate: restore view, rewind the window's depth and
    /// stencil to the parent's values
    fn end(
        &mut self,
        p: &Portal,
        gate: GateSave,
        usestencil: bool,
        scene: &mut dyn SceneRenderer,
        gl: &mut dyn GlCommands,
    ) {
        #[cfg(feature = "hprof")]
        profile!("portal_gate");
        let needdepth = p.needs_depth_buffer();

        self.session.current_portal = gate.saved_current;
        if gate.clip_save {
            gl.enable_clip_plane(self.session.renderdepth as usize - 1);
        }

        if usestencil {
            if needdepth {
                scene.end_draw_info();
            }

            self.view = gate.saved_view;
            self.apply_view(scene);

            gl.color_mask(false);
            gl.set_texture_enabled(false);

            if needdepth {
                // reset the window's depth buffer to max depth so the
                // recursive draw's values can't occlude the parent
                gl.depth_range(1.0, 1.0);
                gl.depth_func(DepthFunc::Always);
                self.draw_portal_stencil(p, gl);
            } else {
                gl.set_depth_test(true);
            }

            // restore depth and drop the stencil back one level
            gl.depth_func(DepthFunc::LessEqual);
            gl.depth_range(0.0, 1.0);
            gl.stencil_op(StencilOp::Decrement);
            gl.stencil_func(self.session.recursion);
            self.draw_portal_stencil(p, gl);
            gl.depth_func(DepthFunc::Less);
            gl.set_texture_enabled(true);
            gl.color_mask(true);

            self.session.recursion -= 1;
            gl.stencil_op(StencilOp::Keep);
            gl.stencil_func(self.session.recursion);
        } else {
            if needdepth {
                scene.end_draw_info();
                gl.clear_depth();
            } else {
                gl.set_depth_test(true);
                gl.depth_mask(true);
            }

            self.view = gate.saved_view;
            self.apply_view(scene);

            // write a valid depth buffer over the portal's contents so
            // later level geometry doesn't overdraw it
            gl.depth_func(DepthFunc::LessEqual);
            gl.depth_range(0.0, 1.0);
            gl.color_mask(false);
            gl.set_texture_enabled(false);
            self.draw_portal_stencil(p, gl);
            gl.set_texture_enabled(true);
            gl.color_mask(true);
            gl.depth_func(DepthFunc::Less);
        }
    }

    /// The portal's boundary silhouette: its walls, plus far-distance
    /// cap quads when the boundary can be open at top or bottom
    fn draw_portal_stencil(&self, p: &Portal, gl: &mut dyn GlCommands) {
        for line in &p.lines {
            gl.draw_wall(&line.seg);
        }

        if p.needs_cap() && p.lines.len() > 1 {
            let f = FAR_CLIP;
            let cap = |y: f32| -> [FlatVertex; 4] {
                [
                    FlatVertex { pos: [-f, y, -f], uv: [0.0, 0.0] },
                    FlatVertex { pos: [-f, y, f], uv: [0.0, 0.0] },
                    FlatVertex { pos: [f, y, f], uv: [0.0, 0.0] },
                    FlatVertex { pos: [f, y, -f], uv: [0.0, 0.0] },
                ]
            };
            gl.draw_quad(&cap(f));
            gl.draw_quad(&cap(-f));
        }
    }

    /// Reset the clipper to the wedge visible through the portal's
    /// boundary, then lock everything outside it
    pub(crate) fn clear_clipper(
        &mut self,
        p: &Portal,
        saved: &ViewState,
        scene: &dyn SceneRenderer,
    ) {
        let offset = Angle::from_degrees(saved.angle.delta(self.view.angle));

        self.clipper.clear();
        self.clipper
            .safe_add_clip_range(Angle::from_bam(0), Angle::from_bam(u32::MAX));

        for line in &p.lines {
            let seg = &line.seg;
            let start = point_to_angle_2(
                DVec2::new(seg.x2 as f64, seg.y2 as f64),
                saved.pos.truncate(),
            ) + offset;
            let end = point_to_angle_2(
                DVec2::new(seg.x1 as f64, seg.y1 as f64),
                saved.pos.truncate(),
            ) + offset;
            if end.delta(start) < 0.0 {
                self.clipper.safe_remove_clip_range(start, end);
            }
        }

        // and clip to the visible frustum
        let fa = scene.frustum_angle();
        if fa < Angle::ANG180 {
            self.clipper
                .safe_add_clip_range(self.view.angle + fa, self.view.angle - fa);
        }

        // lock the parts that have just been clipped out
        self.clipper.set_silhouette();
    }

    pub(crate) fn skybox_recursion_exceeded(&self) -> bool {
        self.session.skybox_recursion >= MAX_SKYBOX_RECURSION
    }

    pub(crate) fn mirror_recursion_exceeded(&self) -> bool {
        self.session.renderdepth > self.config.mirror_recursions
    }
}
