//! Wall and flat mirrors. Both reflect the viewpoint, flip a winding
//! parity counter and draw the scene again; past the recursion ceiling
//! they fill the window flat instead.

use crate::stack::PortalStack;
use crate::{Portal, PortalSource, SceneRenderer, ViewState};
use gameplay::log::debug;
use gameplay::{MapData, SectorPlane};
use glam::DVec2;
use math::{Angle, point_to_angle_2, reflect_across_line};
use render_trait::GlCommands;

impl PortalStack {
    /// Reflect the view across a horizontal sector plane. A clip plane
    /// keeps the reflected scene from bleeding through the mirror.
    pub(crate) fn draw_plane_mirror(
        &mut self,
        p: &Portal,
        plane: &SectorPlane,
        saved: &ViewState,
        level: &MapData,
        scene: &mut dyn SceneRenderer,
        gl: &mut dyn GlCommands,
    ) {
        if self.mirror_recursion_exceeded() {
            debug!("plane mirror at recursion ceiling, flat filled");
            gl.clear_screen();
            return;
        }
        let old_pm = self.session.plane_mirror_mode;

        let planez = plane.z_at(self.view.pos.truncate());
        self.view.pos.z = 2.0 * planez - self.view.pos.z;
        // the player's own body shows up in reflections
        self.view.show_viewer = true;
        self.session.plane_mirror_mode = if plane.c < 0.0 { -1 } else { 1 };

        self.session.plane_mirror_flag += 1;
        self.apply_view(scene);
        self.clear_clipper(p, saved, scene);

        let slot = self.session.renderdepth as usize;
        gl.set_clip_plane(
            slot,
            [0.0, self.session.plane_mirror_mode as f64, 0.0, plane.d],
        );
        gl.enable_clip_plane(slot);

        scene.draw_scene(level, self, gl);

        gl.disable_clip_plane(slot);
        self.session.plane_mirror_flag -= 1;
        self.session.plane_mirror_mode = old_pm;
    }

    /// Reflect the view across a mirror linedef and draw the scene
    /// behind it
    pub(crate) fn draw_mirror(
        &mut self,
        _p: &Portal,
        linedef: usize,
        level: &MapData,
        scene: &mut dyn SceneRenderer,
        gl: &mut dyn GlCommands,
    ) {
        if self.mirror_recursion_exceeded() {
            debug!("mirror at recursion ceiling, flat filled");
            gl.clear_screen();
            return;
        }
        self.session.current_portal = Some(PortalSource::Line(linedef));

        let line = &level.lines[linedef];
        let start = self.view.pos.truncate();
        let d = line.delta();
        let mut pos = start;

        if d.x == 0.0 {
            // vertical mirror
            pos.x = 2.0 * line.v1.x - start.x;
            // compensation for rendering inaccuracies
            if start.x < line.v1.x {
                pos.x -= 0.1;
            } else {
                pos.x += 0.1;
            }
        } else if d.y == 0.0 {
            // horizontal mirror
            pos.y = 2.0 * line.v1.y - start.y;
            if start.y < line.v1.y {
                pos.y -= 0.1;
            } else {
                pos.y += 0.1;
            }
        } else {
            pos = reflect_across_line(start, line.v1, line.v2);
            // nudge along the mirror normal, harder the deeper the
            // recursion, to keep the boundary wall out of the view
            let v = DVec2::new(-d.x, d.y).normalize();
            let depth = self.session.renderdepth as f64;
            pos.x += v.y * depth / 2.0;
            pos.y += v.x * depth / 2.0;
        }

        self.view.pos.x = pos.x;
        self.view.pos.y = pos.y;
        self.view.angle = self.view.angle.mirrored_about(line.angle());
        // the player's own body shows up in reflections
        self.view.show_viewer = true;

        self.session.mirror_flag += 1;
        self.apply_view(scene);

        // the cached clip wedge is useless from a reflected viewpoint,
        // rebuild it from the frustum and the mirror line
        self.clipper.clear();
        let fa = scene.frustum_angle();
        if fa < Angle::ANG180 {
            self.clipper
                .safe_add_clip_range(self.view.angle + fa, self.view.angle - fa);
        }
        let a2 = point_to_angle_2(line.v1, pos);
        let a1 = point_to_angle_2(line.v2, pos);
        self.clipper.safe_add_clip_range(a1, a2);

        scene.draw_scene(level, self, gl);

        self.session.mirror_flag -= 1;
    }
}
