//! The GL command surface the portal machine drives. A hardware
//! backend implements [`GlCommands`] over real stencil/depth/query
//! state; the tests drive the same protocol through a recording
//! double. Stencil comparison is always EQUAL with a full mask, so
//! only the reference value is plumbed through.

use gameplay::TextureId;

/// Stencil operation applied on depth-pass
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StencilOp {
    Keep,
    Increment,
    Decrement,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DepthFunc {
    Less,
    LessEqual,
    Always,
}

/// One wall quad of a portal boundary as the renderer built it:
/// 2D endpoints plus top/bottom heights at each end.
#[derive(Debug, Default, Clone, Copy, PartialEq)]
pub struct GlSeg {
    pub x1: f32,
    pub y1: f32,
    pub x2: f32,
    pub y2: f32,
    pub ztop: [f32; 2],
    pub zbottom: [f32; 2],
}

/// A textured vertex for flat-plane (horizon) drawing
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FlatVertex {
    pub pos: [f32; 3],
    pub uv: [f32; 2],
}

pub trait GlCommands {
    /// EQUAL comparison against `ref_value`, mask all-ones
    fn stencil_func(&mut self, ref_value: u32);
    fn stencil_op(&mut self, on_pass: StencilOp);
    fn color_mask(&mut self, on: bool);
    fn depth_mask(&mut self, on: bool);
    fn depth_func(&mut self, func: DepthFunc);
    fn depth_range(&mut self, near: f32, far: f32);
    fn set_depth_test(&mut self, on: bool);
    fn set_depth_clamp(&mut self, on: bool);
    fn set_texture_enabled(&mut self, on: bool);

    /// Begin a samples-passed occlusion query. Returns false when no
    /// query object could be created; callers must then skip
    /// `end_samples_query`/`samples_result`.
    fn begin_samples_query(&mut self) -> bool;
    fn end_samples_query(&mut self);
    fn samples_result(&mut self) -> u32;

    /// Install a clip half-space into a depth-indexed slot. The plane
    /// stays associated with the slot until overwritten, so a disabled
    /// slot can be re-enabled without re-supplying the equation.
    fn set_clip_plane(&mut self, slot: usize, eq: [f64; 4]);
    fn enable_clip_plane(&mut self, slot: usize);
    fn disable_clip_plane(&mut self, slot: usize);
    fn clip_plane_active(&self, slot: usize) -> bool;

    fn clear_depth(&mut self);
    /// Flat dim fill of the whole viewport, the degrade fallback for
    /// over-deep or disabled recursion
    fn clear_screen(&mut self);

    fn draw_wall(&mut self, seg: &GlSeg);
    fn bind_flat(&mut self, texture: TextureId);
    fn set_plane_light(&mut self, lightlevel: i32, extralight: i32);
    fn draw_quad(&mut self, verts: &[FlatVertex; 4]);
    fn draw_strip(&mut self, verts: &[FlatVertex]);
}
