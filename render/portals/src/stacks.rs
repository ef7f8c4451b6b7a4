//! Stacked-sector and line-to-line portals. These displace rather
//! than reflect: the view teleports by the portal offset and the
//! scene on the other side is drawn through the window.

use crate::stack::PortalStack;
use crate::{Portal, PortalSource, SceneRenderer, ViewState};
use gameplay::MapData;
use gameplay::log::debug;
use math::EQUAL_EPSILON;
use render_trait::GlCommands;

impl PortalStack {
    /// Draw the upper or lower level of a stacked sector through its
    /// plane. The `instack` counter keeps traversal from registering
    /// the return portal and bouncing between the two levels forever.
    pub(crate) fn draw_sector_stack(
        &mut self,
        p: &Portal,
        portal: usize,
        subsectors: &[u32],
        saved: &ViewState,
        level: &MapData,
        scene: &mut dyn SceneRenderer,
        gl: &mut dyn GlCommands,
    ) {
        let sp = &level.sector_portals[portal];
        self.view.pos.x += sp.displacement.x;
        self.view.pos.y += sp.displacement.y;
        self.view.show_viewer = false;

        let plane = sp.plane;
        if plane != -1 {
            self.session.instack[plane as usize] += 1;
        }

        self.apply_view(scene);
        let outer = self.session.visited.save();

        // The view position is in the portal's own sector, so every
        // section visible through the window has to be marked up front
        // from the precomputed coverage.
        if plane != -1 {
            for &sub in subsectors {
                for &dsub in &level.subsectors[sub as usize].coverage[plane as usize] {
                    self.session.visited.mark(level.subsectors[dsub as usize].mapsection);
                    scene.mark_subsector_seen(dsub);
                }
            }
        }

        self.clear_clipper(p, saved, scene);
        scene.draw_scene(level, self, gl);

        self.session.visited.restore(outer);
        if plane != -1 {
            self.session.instack[plane as usize] -= 1;
        }
    }

    /// Teleport the view through a paired-line portal and draw the
    /// destination area
    pub(crate) fn draw_line_to_line(
        &mut self,
        p: &Portal,
        portal: usize,
        saved: &ViewState,
        level: &MapData,
        scene: &mut dyn SceneRenderer,
        gl: &mut dyn GlCommands,
    ) {
        if self.mirror_recursion_exceeded() {
            debug!("line portal at recursion ceiling, flat filled");
            gl.clear_screen();
            return;
        }
        self.session.current_portal = Some(PortalSource::LinePortal(portal));

        let lp = self.line_portal_info(portal).clone();
        let xy = lp.translate_xy(self.view.pos.truncate());
        self.view.pos.x = xy.x;
        self.view.pos.y = xy.y;
        self.view.pos.z = lp.translate_z(self.view.pos.z);
        self.view.angle = lp.translate_angle(self.view.angle);
        for point in &mut self.view.path {
            let xy = lp.translate_xy(point.truncate());
            point.x = xy.x;
            point.y = xy.y;
            point.z = lp.translate_z(point.z);
        }

        // A camera still on the translated movement path is inside the
        // viewer model, so it stays hidden; off the path it comes back.
        if !self.view.show_viewer {
            let distp = (self.view.path[0] - self.view.path[1]).length();
            if distp > EQUAL_EPSILON {
                let dist1 = (self.view.pos - self.view.path[0]).length();
                let dist2 = (self.view.pos - self.view.path[1]).length();
                if dist1 + dist2 > distp + 1.0 {
                    self.view.show_viewer = true;
                }
            }
        }

        let outer = self.session.visited.save();
        for line in &p.lines {
            let Some(linedef) = line.linedef else { continue };
            let Some(dest) = level.lines[linedef as usize].portal_destination else {
                continue;
            };
            let sector = &level.sectors[level.lines[dest as usize].front_sector as usize];
            if let Some(&sub) = sector.subsectors.first() {
                self.session
                    .visited
                    .mark(level.subsectors[sub as usize].mapsection);
            }
        }

        self.apply_view(scene);
        self.clear_clipper(p, saved, scene);
        scene.draw_scene(level, self, gl);

        self.session.visited.restore(outer);
    }
}
