//! Skybox and EE-style horizon-portal draws.
//!
//! The plain sky portal never reaches here; its contents are just the
//! renderer's sky dome. Skyboxes teleport the view to a viewpoint
//! thing in a hidden sector, EE horizons fan out into a sky and up to
//! two horizon planes.

use crate::defs::{HorizonInfo, SkyInfo};
use crate::stack::PortalStack;
use crate::{Portal, SceneRenderer, ViewState};
use gameplay::log::debug;
use gameplay::{MapData, PLANE_CEILING, PLANE_FLOOR, SectorPortalKind};
use render_trait::GlCommands;

impl PortalStack {
    /// Draw the scene around a skybox viewpoint through the portal
    /// window
    pub(crate) fn draw_skybox(
        &mut self,
        p: &Portal,
        portal: usize,
        viewpoint: u32,
        saved: &ViewState,
        level: &MapData,
        scene: &mut dyn SceneRenderer,
        gl: &mut dyn GlCommands,
    ) {
        if self.skybox_recursion_exceeded() {
            debug!("skybox nesting cap hit, flat filled");
            gl.clear_screen();
            return;
        }

        let old_pm = self.session.plane_mirror_mode;
        let old_light = self.session.extralight;
        self.session.skybox_recursion += 1;
        self.session.plane_mirror_mode = 0;
        self.session.extralight = 0;

        gl.set_depth_clamp(false);

        let vp = &level.sky_viewpoints[viewpoint as usize];
        let frac = self.session.tic_frac;
        let mut pos = vp.interpolated_pos(frac);

        // don't let the viewpoint sit on a floor or ceiling
        let sector = &level.sectors[vp.sector as usize];
        let floorh = sector.floorplane.z_at(pos.truncate());
        let ceilh = sector.ceilingplane.z_at(pos.truncate());
        pos.z = pos.z.max(floorh + 4.0).min(ceilh - 4.0);

        self.view.pos = pos;
        self.view.angle += vp.interpolated_angle(frac);
        self.view.show_viewer = false;

        self.session.in_skybox = true;
        self.session.active_skyboxes.push(portal);
        self.apply_view(scene);
        self.view.area = scene.view_area(level, pos);
        self.clear_clipper(p, saved, scene);

        let mapsection = level.subsectors[vp.subsector as usize].mapsection;
        let outer = self.session.visited.save();
        self.session.visited.mark(mapsection);

        scene.draw_scene(level, self, gl);

        self.session.active_skyboxes.pop();
        self.session.in_skybox = false;
        gl.set_depth_clamp(true);
        self.session.skybox_recursion -= 1;

        self.session.plane_mirror_mode = old_pm;
        self.session.extralight = old_light;
        self.session.visited.restore(outer);
    }

    /// An Eternity-style horizon portal is a sky plus up to two flat
    /// horizon planes taken from the origin sector
    pub(crate) fn draw_ee_horizon(
        &mut self,
        portal: usize,
        level: &MapData,
        scene: &mut dyn SceneRenderer,
        gl: &mut dyn GlCommands,
    ) {
        let sp = &level.sector_portals[portal];
        let sector = &level.sectors[sp.sector as usize];

        if sector.floor_sky || sector.ceiling_sky {
            let sky = SkyInfo {
                sky: sector.sky,
                x_offset: 0.0,
                mirrored: false,
            };
            scene.draw_sky(&sky, gl);
        }

        // plane-type portals anchor the texture to the view height
        let is_plane = matches!(sp.kind, SectorPortalKind::Plane);

        if !sector.ceiling_sky {
            let mut horz = HorizonInfo::from_sector(sector, PLANE_CEILING);
            if is_plane {
                horz.plane.texheight = self.view.pos.z + horz.plane.texheight.abs();
            }
            self.draw_horizon_info(&horz, gl);
        }
        if !sector.floor_sky {
            let mut horz = HorizonInfo::from_sector(sector, PLANE_FLOOR);
            if is_plane {
                horz.plane.texheight = self.view.pos.z - horz.plane.texheight.abs();
            }
            self.draw_horizon_info(&horz, gl);
        }
    }
}
