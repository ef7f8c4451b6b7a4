//! Horizon portals fake an infinite flat plane: a large tiled field
//! around the viewer plus a skirt strip that closes the gap between
//! the field's far edge and the true horizon line.

use crate::defs::HorizonInfo;
use crate::stack::PortalStack;
#[cfg(feature = "hprof")]
use coarse_prof::profile;
use render_trait::{FlatVertex, GlCommands};

/// Half-extent of the tiled field
const FIELD: f32 = 32768.0;
/// Edge length of one field tile
const TILE: f32 = 4096.0;

impl PortalStack {
    pub(crate) fn draw_horizon_info(&self, horizon: &HorizonInfo, gl: &mut dyn GlCommands) {
        #[cfg(feature = "hprof")]
        profile!("horizon");

        let Some(texture) = horizon.plane.texture else {
            return;
        };
        let z = horizon.plane.texheight as f32;

        gl.bind_flat(texture);
        gl.set_plane_light(horizon.lightlevel, self.session.extralight);

        // flats repeat every 64 units
        let vx = self.view.pos.x as f32;
        let vy = self.view.pos.y as f32;
        for i in 0..16 {
            let x = vx - FIELD + TILE * i as f32;
            for j in 0..16 {
                let y = vy - FIELD + TILE * j as f32;
                let (u, v) = (x / 64.0, -y / 64.0);
                gl.draw_quad(&[
                    FlatVertex { pos: [x, z, y], uv: [u, v] },
                    FlatVertex { pos: [x + TILE, z, y], uv: [u + 64.0, v] },
                    FlatVertex { pos: [x + TILE, z, y + TILE], uv: [u + 64.0, v - 64.0] },
                    FlatVertex { pos: [x, z, y + TILE], uv: [u, v - 64.0] },
                ]);
            }
        }

        // The field cannot reach infinity, so a thin vertical skirt
        // around its rim hides the seam against the horizon.
        let vz = self.view.pos.z as f32;
        let tz = z - vz;
        let rim = [
            (512.0, vx - FIELD, vy - FIELD),
            (-512.0, vx - FIELD, vy + FIELD),
            (512.0, vx + FIELD, vy + FIELD),
            (-512.0, vx + FIELD, vy - FIELD),
            (512.0, vx - FIELD, vy - FIELD),
        ];
        let mut verts = Vec::with_capacity(rim.len() * 2);
        for (u, x, y) in rim {
            verts.push(FlatVertex { pos: [x, z, y], uv: [u, 0.0] });
            verts.push(FlatVertex { pos: [x, vz, y], uv: [u, tz] });
        }
        gl.draw_strip(&verts);
    }
}
