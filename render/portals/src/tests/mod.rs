//! Protocol-level tests: a recording GL double and a scripted scene
//! renderer drive whole portal frames, then the recorded command
//! stream and the stack's state are checked against the expected
//! stencil/depth/view discipline.

use crate::defs::{HorizonInfo, SkyInfo};
use crate::{
    LineClip, Portal, PortalConfig, PortalKind, PortalSource, PortalStack, SceneRenderer,
    ViewState,
};
use gameplay::{
    Line, LinePortal, MapData, PLANE_CEILING, Sector, SectorPlane, SectorPortal,
    SectorPortalKind, SkyViewpoint, SubSector, TextureId,
};
use glam::{DVec2, DVec3};
use math::{Angle, reflect_across_line};
use render_trait::{DepthFunc, FlatVertex, GlCommands, GlSeg, StencilOp};
use std::collections::VecDeque;

#[derive(Debug, Clone, PartialEq)]
enum Op {
    StencilFunc(u32),
    Stencil(StencilOp),
    ColorMask(bool),
    DepthMask(bool),
    Depth(DepthFunc),
    DepthRange(f32, f32),
    DepthTest(bool),
    DepthClamp(bool),
    Texture(bool),
    BeginQuery,
    EndQuery,
    SetClip(usize),
    EnableClip(usize),
    DisableClip(usize),
    ClearDepth,
    ClearScreen,
    Wall,
    BindFlat(usize),
    PlaneLight(i32, i32),
    Quad,
    Strip,
}

/// Records every command and plays back scripted occlusion results
#[derive(Default)]
struct RecordingGl {
    ops: Vec<Op>,
    query_results: VecDeque<u32>,
    fail_query: bool,
    clip_enabled: [bool; 16],
    strips: Vec<Vec<FlatVertex>>,
}

impl RecordingGl {
    fn count(&self, f: impl Fn(&Op) -> bool) -> usize {
        self.ops.iter().filter(|op| f(op)).count()
    }
}

impl GlCommands for RecordingGl {
    fn stencil_func(&mut self, ref_value: u32) {
        self.ops.push(Op::StencilFunc(ref_value));
    }
    fn stencil_op(&mut self, on_pass: StencilOp) {
        self.ops.push(Op::Stencil(on_pass));
    }
    fn color_mask(&mut self, on: bool) {
        self.ops.push(Op::ColorMask(on));
    }
    fn depth_mask(&mut self, on: bool) {
        self.ops.push(Op::DepthMask(on));
    }
    fn depth_func(&mut self, func: DepthFunc) {
        self.ops.push(Op::Depth(func));
    }
    fn depth_range(&mut self, near: f32, far: f32) {
        self.ops.push(Op::DepthRange(near, far));
    }
    fn set_depth_test(&mut self, on: bool) {
        self.ops.push(Op::DepthTest(on));
    }
    fn set_depth_clamp(&mut self, on: bool) {
        self.ops.push(Op::DepthClamp(on));
    }
    fn set_texture_enabled(&mut self, on: bool) {
        self.ops.push(Op::Texture(on));
    }
    fn begin_samples_query(&mut self) -> bool {
        if self.fail_query {
            return false;
        }
        self.ops.push(Op::BeginQuery);
        true
    }
    fn end_samples_query(&mut self) {
        self.ops.push(Op::EndQuery);
    }
    fn samples_result(&mut self) -> u32 {
        self.query_results.pop_front().unwrap_or(1)
    }
    fn set_clip_plane(&mut self, slot: usize, _eq: [f64; 4]) {
        self.ops.push(Op::SetClip(slot));
    }
    fn enable_clip_plane(&mut self, slot: usize) {
        self.clip_enabled[slot] = true;
        self.ops.push(Op::EnableClip(slot));
    }
    fn disable_clip_plane(&mut self, slot: usize) {
        self.clip_enabled[slot] = false;
        self.ops.push(Op::DisableClip(slot));
    }
    fn clip_plane_active(&self, slot: usize) -> bool {
        self.clip_enabled[slot]
    }
    fn clear_depth(&mut self) {
        self.ops.push(Op::ClearDepth);
    }
    fn clear_screen(&mut self) {
        self.ops.push(Op::ClearScreen);
    }
    fn draw_wall(&mut self, _seg: &GlSeg) {
        self.ops.push(Op::Wall);
    }
    fn bind_flat(&mut self, texture: TextureId) {
        self.ops.push(Op::BindFlat(texture.0));
    }
    fn set_plane_light(&mut self, lightlevel: i32, extralight: i32) {
        self.ops.push(Op::PlaneLight(lightlevel, extralight));
    }
    fn draw_quad(&mut self, _verts: &[FlatVertex; 4]) {
        self.ops.push(Op::Quad);
    }
    fn draw_strip(&mut self, verts: &[FlatVertex]) {
        self.strips.push(verts.to_vec());
        self.ops.push(Op::Strip);
    }
}

/// What the scene double saw at the moment of a recursive draw
#[derive(Debug, Clone)]
struct Snapshot {
    view: ViewState,
    instack: [u32; 2],
    in_skybox: bool,
    extralight: i32,
}

/// Scripted stand-in for the scene renderer. Each recursive draw pops
/// the next batch of portals to register, so nesting can be staged.
#[derive(Default)]
struct TestScene {
    nested: VecDeque<Vec<Portal>>,
    snapshots: Vec<Snapshot>,
    views: Vec<(DVec3, Angle, bool, bool)>,
    skies: Vec<SkyInfo>,
    seen: Vec<u32>,
    draw_info_depth: i32,
}

impl SceneRenderer for TestScene {
    fn draw_scene(&mut self, level: &MapData, portals: &mut PortalStack, gl: &mut dyn GlCommands) {
        self.snapshots.push(Snapshot {
            view: portals.view,
            instack: portals.session.instack,
            in_skybox: portals.session.in_skybox,
            extralight: portals.session.extralight,
        });
        portals.start_frame();
        if let Some(batch) = self.nested.pop_front() {
            for p in batch {
                portals.register_portal(p);
            }
        }
        portals.end_frame(level, self, gl);
    }

    fn frustum_angle(&self) -> Angle {
        Angle::ANG90
    }

    fn setup_view(&mut self, pos: DVec3, angle: Angle, mirror: bool, plane_mirror: bool) {
        self.views.push((pos, angle, mirror, plane_mirror));
    }

    fn view_area(&self, _level: &MapData, _pos: DVec3) -> i32 {
        0
    }

    fn draw_sky(&mut self, sky: &SkyInfo, _gl: &mut dyn GlCommands) {
        self.skies.push(sky.clone());
    }

    fn mark_subsector_seen(&mut self, subsector: u32) {
        self.seen.push(subsector);
    }

    fn start_draw_info(&mut self) {
        self.draw_info_depth += 1;
    }

    fn end_draw_info(&mut self) {
        self.draw_info_depth -= 1;
    }
}

fn seg(x1: f32, y1: f32, x2: f32, y2: f32) -> GlSeg {
    GlSeg {
        x1,
        y1,
        x2,
        y2,
        ztop: [64.0; 2],
        zbottom: [0.0; 2],
    }
}

fn sector(num: u32, floor: f64, ceil: f64, subsectors: Vec<u32>) -> Sector {
    Sector {
        num,
        floorplane: SectorPlane::new(floor, true, Some(TextureId(1))),
        ceilingplane: SectorPlane::new(ceil, false, Some(TextureId(2))),
        floor_sky: false,
        ceiling_sky: false,
        lightlevel: 160,
        sky: 0,
        subsectors,
    }
}

fn test_level() -> MapData {
    let lines = vec![
        // an oblique mirror line
        Line {
            v1: DVec2::new(0.0, 0.0),
            v2: DVec2::new(128.0, 64.0),
            front_sector: 0,
            portal_destination: None,
        },
        // paired portal lines facing each other
        Line {
            v1: DVec2::new(0.0, 0.0),
            v2: DVec2::new(64.0, 0.0),
            front_sector: 0,
            portal_destination: Some(2),
        },
        Line {
            v1: DVec2::new(64.0, 512.0),
            v2: DVec2::new(0.0, 512.0),
            front_sector: 1,
            portal_destination: Some(1),
        },
        // axis-aligned mirror lines
        Line {
            v1: DVec2::new(64.0, -64.0),
            v2: DVec2::new(64.0, 64.0),
            front_sector: 0,
            portal_destination: None,
        },
        Line {
            v1: DVec2::new(-64.0, 64.0),
            v2: DVec2::new(64.0, 64.0),
            front_sector: 0,
            portal_destination: None,
        },
    ];
    let line_portals = vec![LinePortal::new(&lines, 1, 2, 16.0)];
    MapData {
        sectors: vec![sector(0, 0.0, 128.0, vec![0]), sector(1, 0.0, 128.0, vec![1])],
        lines,
        subsectors: vec![
            SubSector {
                sector: 0,
                mapsection: 0,
                coverage: [vec![1], vec![1]],
            },
            SubSector {
                sector: 1,
                mapsection: 1,
                coverage: [Vec::new(), Vec::new()],
            },
        ],
        sector_portals: vec![
            SectorPortal {
                kind: SectorPortalKind::SkyViewpoint { viewpoint: 0 },
                sector: 1,
                plane: -1,
                displacement: DVec2::ZERO,
            },
            SectorPortal {
                kind: SectorPortalKind::Linked,
                sector: 1,
                plane: PLANE_CEILING as i32,
                displacement: DVec2::new(0.0, 256.0),
            },
        ],
        line_portals,
        sky_viewpoints: vec![SkyViewpoint {
            pos: DVec3::new(500.0, 500.0, 200.0),
            prev_pos: DVec3::new(500.0, 500.0, 200.0),
            angle: Angle::default(),
            prev_angle: Angle::default(),
            sector: 1,
            subsector: 1,
        }],
        map_sections: 2,
    }
}

fn start_view() -> ViewState {
    let pos = DVec3::new(100.0, 50.0, 41.0);
    ViewState {
        pos,
        angle: Angle::from_degrees(30.0),
        area: 0,
        show_viewer: true,
        path: [pos - DVec3::new(16.0, 0.0, 0.0), pos],
    }
}

fn fresh_stack(level: &MapData) -> PortalStack {
    let mut stack = PortalStack::new(PortalConfig::default());
    stack.begin_scene(level, 0.5);
    stack.view = start_view();
    stack
}

fn mirror_portal(linedef: usize) -> Portal {
    let mut p = Portal::new(PortalKind::Mirror { linedef });
    p.add_line(seg(0.0, 0.0, 128.0, 64.0), Some(linedef as u32));
    p
}

fn mirror_on(level: &MapData, linedef: usize) -> Portal {
    let line = &level.lines[linedef];
    let mut p = Portal::new(PortalKind::Mirror { linedef });
    p.add_line(
        seg(
            line.v1.x as f32,
            line.v1.y as f32,
            line.v2.x as f32,
            line.v2.y as f32,
        ),
        Some(linedef as u32),
    );
    p
}

#[test]
fn mirror_frame_balances_stencil_and_restores_view() {
    let level = test_level();
    let mut stack = fresh_stack(&level);
    stack.view.show_viewer = false;
    let mut scene = TestScene::default();
    let mut gl = RecordingGl::default();
    let view = stack.view;

    stack.start_frame();
    stack.register_portal(mirror_portal(0));
    stack.end_frame(&level, &mut scene, &mut gl);

    assert_eq!(scene.snapshots.len(), 1);
    assert_eq!(stack.rendered_portals(), 1);
    assert_eq!(stack.view, view);
    assert_eq!(stack.session.recursion, 0);
    assert_eq!(stack.session.renderdepth, 0);
    assert_eq!(stack.session.mirror_flag, 0);
    assert_eq!(scene.draw_info_depth, 0);

    // one increment pass, one decrement pass, back at level 0
    assert_eq!(gl.count(|op| *op == Op::Stencil(StencilOp::Increment)), 1);
    assert_eq!(gl.count(|op| *op == Op::Stencil(StencilOp::Decrement)), 1);
    assert_eq!(gl.ops.last(), Some(&Op::StencilFunc(0)));

    // far-plane pushes always rewound
    assert_eq!(
        gl.count(|op| matches!(op, Op::DepthRange(n, f) if *n == 1.0 && *f == 1.0)),
        gl.count(|op| matches!(op, Op::DepthRange(n, f) if *n == 0.0 && *f == 1.0)),
    );

    // the recursive draw saw the reflected view with flipped winding,
    // with the viewer's body made visible for the reflection
    let mirrored = &scene.snapshots[0].view;
    assert_ne!(mirrored.pos.truncate(), view.pos.truncate());
    assert!(mirrored.show_viewer);
    assert_eq!(scene.views[0].2, true);
    assert_eq!(scene.views.last().unwrap().2, false);
}

#[test]
fn oblique_mirror_nudges_off_the_mirror_plane() {
    let level = test_level();
    let mut stack = fresh_stack(&level);
    let mut scene = TestScene::default();
    let mut gl = RecordingGl::default();
    let view = stack.view;

    stack.start_frame();
    stack.register_portal(mirror_portal(0));
    stack.end_frame(&level, &mut scene, &mut gl);

    let line = &level.lines[0];
    let reflected = reflect_across_line(view.pos.truncate(), line.v1, line.v2);
    let nudge = scene.snapshots[0].view.pos.truncate() - reflected;
    // drift compensation pushes straight off the mirror line
    assert!(nudge.dot(line.delta()).abs() < 1e-9);
    assert!((nudge.length() - 0.5).abs() < 1e-9);
}

#[test]
fn axis_aligned_mirror_round_trip_returns_the_view() {
    let level = test_level();
    for linedef in [3, 4] {
        let mut stack = fresh_stack(&level);
        let mut scene = TestScene::default();
        let mut gl = RecordingGl::default();
        let view = stack.view;

        // the same mirror seen again inside its own reflection
        scene.nested.push_back(vec![mirror_on(&level, linedef)]);

        stack.start_frame();
        stack.register_portal(mirror_on(&level, linedef));
        stack.end_frame(&level, &mut scene, &mut gl);

        assert_eq!(scene.snapshots.len(), 2);
        let twice = &scene.snapshots[1].view;
        // two reflections cancel, up to the 0.1 accuracy nudges
        assert!((twice.pos - view.pos).length() <= 0.2 + 1e-9);
        assert_eq!(twice.angle, view.angle);
        assert_eq!(stack.view, view);
    }
}

#[test]
fn clear_clipper_opens_front_facing_boundary() {
    let level = test_level();
    let mut stack = fresh_stack(&level);
    let scene = TestScene::default();
    stack.view.pos = DVec3::new(0.0, 0.0, 41.0);
    stack.view.angle = Angle::default();
    let saved = stack.view;

    // wall crossing the view with its front side toward us
    let mut front = Portal::new(PortalKind::Mirror { linedef: 0 });
    front.add_line(seg(64.0, 64.0, 64.0, -64.0), None);
    stack.clear_clipper(&front, &saved, &scene);
    assert!(
        stack
            .clipper
            .safe_check_range(Angle::from_degrees(-40.0), Angle::from_degrees(40.0))
    );

    // the same wall seen from behind keeps the wedge closed
    let mut back = Portal::new(PortalKind::Mirror { linedef: 0 });
    back.add_line(seg(64.0, -64.0, 64.0, 64.0), None);
    stack.clear_clipper(&back, &saved, &scene);
    assert!(
        !stack
            .clipper
            .safe_check_range(Angle::from_degrees(-40.0), Angle::from_degrees(40.0))
    );
}

#[test]
fn single_portal_runs_without_query() {
    let level = test_level();
    let mut stack = fresh_stack(&level);
    let mut scene = TestScene::default();
    let mut gl = RecordingGl::default();

    stack.start_frame();
    stack.register_portal(mirror_portal(0));
    stack.end_frame(&level, &mut scene, &mut gl);

    assert_eq!(gl.count(|op| *op == Op::BeginQuery), 0);
    assert_eq!(scene.snapshots.len(), 1);
}

#[test]
fn occluded_portal_is_skipped_but_stencil_stays_balanced() {
    let level = test_level();
    let mut stack = fresh_stack(&level);
    let mut scene = TestScene::default();
    let mut gl = RecordingGl::default();
    // first drained portal reports zero visible samples
    gl.query_results = VecDeque::from(vec![0, 7, 7]);

    stack.start_frame();
    for _ in 0..3 {
        stack.register_portal(mirror_portal(0));
    }
    stack.end_frame(&level, &mut scene, &mut gl);

    assert_eq!(gl.count(|op| *op == Op::BeginQuery), 3);
    assert_eq!(scene.snapshots.len(), 2);
    assert_eq!(stack.rendered_portals(), 3);
    assert_eq!(stack.session.recursion, 0);
    assert_eq!(gl.ops.last(), Some(&Op::StencilFunc(0)));
    assert_eq!(
        gl.count(|op| *op == Op::Stencil(StencilOp::Increment)),
        gl.count(|op| *op == Op::Stencil(StencilOp::Decrement)) + 1,
    );
}

#[test]
fn broken_query_object_falls_back_to_unconditional_recursion() {
    let level = test_level();
    let mut stack = fresh_stack(&level);
    let mut scene = TestScene::default();
    let mut gl = RecordingGl::default();
    gl.fail_query = true;

    stack.start_frame();
    for _ in 0..3 {
        stack.register_portal(mirror_portal(0));
    }
    stack.end_frame(&level, &mut scene, &mut gl);

    assert_eq!(scene.snapshots.len(), 3);
    assert_eq!(gl.count(|op| *op == Op::EndQuery), 0);
}

#[test]
fn recursion_ceiling_fills_flat_instead_of_recursing() {
    let level = test_level();
    let mut stack = fresh_stack(&level);
    stack.config.mirror_recursions = 0;
    let mut scene = TestScene::default();
    let mut gl = RecordingGl::default();

    stack.start_frame();
    stack.register_portal(mirror_portal(0));
    stack.end_frame(&level, &mut scene, &mut gl);

    assert_eq!(scene.snapshots.len(), 0);
    assert_eq!(gl.count(|op| *op == Op::ClearScreen), 1);
    assert_eq!(stack.session.recursion, 0);
    assert_eq!(gl.ops.last(), Some(&Op::StencilFunc(0)));
}

#[test]
fn empty_frame_touches_nothing() {
    let level = test_level();
    let mut stack = fresh_stack(&level);
    let mut scene = TestScene::default();
    let mut gl = RecordingGl::default();

    stack.start_frame();
    stack.end_frame(&level, &mut scene, &mut gl);

    assert!(gl.ops.is_empty());
    assert_eq!(stack.session.renderdepth, 0);
    assert_eq!(stack.rendered_portals(), 0);
}

#[test]
fn first_sky_portal_draws_unstenciled_and_prefers_the_biggest() {
    let level = test_level();
    let mut stack = fresh_stack(&level);
    let mut scene = TestScene::default();
    let mut gl = RecordingGl::default();

    let small = stack.unique_sky(&SkyInfo {
        sky: 0,
        x_offset: 0.0,
        mirrored: false,
    });
    let big = stack.unique_sky(&SkyInfo {
        sky: 1,
        x_offset: 0.0,
        mirrored: false,
    });

    stack.start_frame();
    let mut p = Portal::new(PortalKind::Sky { sky: small });
    p.add_line(seg(0.0, 0.0, 64.0, 0.0), None);
    stack.register_portal(p);
    let mut p = Portal::new(PortalKind::Sky { sky: big });
    p.add_line(seg(0.0, 0.0, 64.0, 0.0), None);
    p.add_line(seg(64.0, 0.0, 64.0, 64.0), None);
    stack.register_portal(p);

    assert!(stack.render_first_sky_portal(0, &level, &mut scene, &mut gl));
    assert_eq!(stack.pending_at_current_depth(), 1);
    assert_eq!(scene.skies.len(), 1);
    assert_eq!(scene.skies[0].sky, 1);
    // the fast path never touches the stencil
    assert_eq!(gl.count(|op| matches!(op, Op::StencilFunc(_))), 0);

    stack.end_frame(&level, &mut scene, &mut gl);
    assert_eq!(scene.skies.len(), 2);
}

#[test]
fn first_sky_portal_skips_depth_users_inside_recursion() {
    let level = test_level();
    let mut stack = fresh_stack(&level);
    let mut scene = TestScene::default();
    let mut gl = RecordingGl::default();

    stack.start_frame();
    let mut p = Portal::new(PortalKind::Skybox {
        portal: 0,
        viewpoint: 0,
    });
    p.add_line(seg(0.0, 0.0, 64.0, 0.0), None);
    stack.register_portal(p);

    assert!(!stack.render_first_sky_portal(1, &level, &mut scene, &mut gl));
    assert_eq!(stack.pending_at_current_depth(), 1);
    stack.end_frame(&level, &mut scene, &mut gl);
}

#[test]
fn plane_mirror_clips_and_restores_parent_plane() {
    let level = test_level();
    let mut stack = fresh_stack(&level);
    let mut scene = TestScene::default();
    let mut gl = RecordingGl::default();

    let plane = level.sectors[0].ceilingplane;
    let key = stack.unique_plane_mirror(&plane);
    let mut p = Portal::new(PortalKind::PlaneMirror { plane, key });
    p.add_line(seg(0.0, 0.0, 64.0, 0.0), None);

    // a mirror portal discovered inside the plane-mirrored scene
    scene.nested.push_back(vec![mirror_portal(0)]);

    stack.start_frame();
    stack.register_portal(p);
    stack.end_frame(&level, &mut scene, &mut gl);

    assert_eq!(scene.snapshots.len(), 2);
    // reflected below the ceiling plane, viewer visible
    assert_eq!(scene.snapshots[0].view.pos.z, 2.0 * 128.0 - 41.0);
    assert!(scene.snapshots[0].view.show_viewer);
    assert_eq!(stack.session.plane_mirror_flag, 0);
    assert_eq!(stack.session.plane_mirror_mode, 0);

    // slot 1 enabled by the plane mirror, suspended and resumed around
    // the nested portal, then disabled again
    let clip_ops: Vec<&Op> = gl
        .ops
        .iter()
        .filter(|op| matches!(op, Op::SetClip(_) | Op::EnableClip(_) | Op::DisableClip(_)))
        .collect();
    assert_eq!(
        clip_ops,
        vec![
            &Op::SetClip(1),
            &Op::EnableClip(1),
            &Op::DisableClip(1),
            &Op::EnableClip(1),
            &Op::DisableClip(1),
        ]
    );
}

#[test]
fn sector_stack_displaces_view_and_marks_coverage() {
    let level = test_level();
    let mut stack = fresh_stack(&level);
    let mut scene = TestScene::default();
    let mut gl = RecordingGl::default();
    let view = stack.view;

    let mut p = Portal::new(PortalKind::SectorStack {
        portal: 1,
        subsectors: vec![0],
    });
    p.add_line(seg(0.0, 0.0, 64.0, 0.0), None);

    stack.start_frame();
    stack.register_portal(p);
    stack.end_frame(&level, &mut scene, &mut gl);

    let snap = &scene.snapshots[0];
    assert_eq!(snap.view.pos.y, view.pos.y + 256.0);
    assert_eq!(snap.instack, [0, 1]);
    assert_eq!(scene.seen, vec![1]);
    assert_eq!(stack.session.instack, [0, 0]);
    assert_eq!(stack.view, view);
    assert!(!stack.in_stack(1));
}

#[test]
fn line_portal_translates_view_and_keeps_onpath_viewer_hidden() {
    let level = test_level();
    let mut stack = fresh_stack(&level);
    // camera hidden, sitting still on its own movement path
    stack.view.show_viewer = false;
    stack.view.path = [stack.view.pos, stack.view.pos];
    let mut scene = TestScene::default();
    let mut gl = RecordingGl::default();
    let view = stack.view;

    let h = stack.unique_line_portal(&level.line_portals[0]);
    let mut p = Portal::new(PortalKind::LineToLine { portal: h });
    p.add_line(seg(0.0, 0.0, 64.0, 0.0), Some(1));

    stack.start_frame();
    stack.register_portal(p);
    stack.end_frame(&level, &mut scene, &mut gl);

    let snap = &scene.snapshots[0];
    let expect = level.line_portals[0].translate_xy(view.pos.truncate());
    assert!((snap.view.pos.truncate() - expect).length() < 1e-9);
    assert_eq!(snap.view.pos.z, view.pos.z + 16.0);
    assert!(!snap.view.show_viewer);
    assert_eq!(stack.view, view);
    assert!(!stack.view.show_viewer);
}

#[test]
fn line_portal_reveals_offpath_viewer() {
    let level = test_level();
    let mut stack = fresh_stack(&level);
    // a camera well away from the player's movement path has left the
    // body behind, so it has to come back into view on the far side
    stack.view.show_viewer = false;
    let pos = stack.view.pos;
    stack.view.path = [pos + DVec3::new(100.0, 0.0, 0.0), pos + DVec3::new(116.0, 0.0, 0.0)];
    let mut scene = TestScene::default();
    let mut gl = RecordingGl::default();
    let view = stack.view;

    let h = stack.unique_line_portal(&level.line_portals[0]);
    let mut p = Portal::new(PortalKind::LineToLine { portal: h });
    p.add_line(seg(0.0, 0.0, 64.0, 0.0), Some(1));

    stack.start_frame();
    stack.register_portal(p);
    stack.end_frame(&level, &mut scene, &mut gl);

    assert!(scene.snapshots[0].view.show_viewer);
    assert_eq!(stack.view, view);
    assert!(!stack.view.show_viewer);
}

#[test]
fn skybox_teleports_viewpoint_with_height_clamp() {
    let level = test_level();
    let mut stack = fresh_stack(&level);
    stack.session.extralight = 2;
    let mut scene = TestScene::default();
    let mut gl = RecordingGl::default();

    let mut p = Portal::new(PortalKind::Skybox {
        portal: 0,
        viewpoint: 0,
    });
    p.add_line(seg(0.0, 0.0, 64.0, 0.0), None);

    stack.start_frame();
    stack.register_portal(p);
    stack.end_frame(&level, &mut scene, &mut gl);

    let snap = &scene.snapshots[0];
    assert_eq!(snap.view.pos.truncate(), DVec2::new(500.0, 500.0));
    // anchor z of 200 clamped below the 128 ceiling
    assert_eq!(snap.view.pos.z, 124.0);
    assert!(snap.in_skybox);
    assert_eq!(snap.extralight, 0);
    assert!(!stack.session.in_skybox);
    assert_eq!(stack.session.extralight, 2);
    assert!(!stack.is_skybox_active(0));
}

#[test]
fn skybox_nesting_cap_fills_flat() {
    let level = test_level();

    // the third nested level still draws
    let mut stack = fresh_stack(&level);
    stack.session.skybox_recursion = 2;
    let mut scene = TestScene::default();
    let mut gl = RecordingGl::default();

    let mut p = Portal::new(PortalKind::Skybox {
        portal: 0,
        viewpoint: 0,
    });
    p.add_line(seg(0.0, 0.0, 64.0, 0.0), None);

    stack.start_frame();
    stack.register_portal(p.clone());
    stack.end_frame(&level, &mut scene, &mut gl);

    assert_eq!(scene.snapshots.len(), 1);
    assert_eq!(gl.count(|op| *op == Op::ClearScreen), 0);
    assert_eq!(stack.session.skybox_recursion, 2);

    // the fourth is flat filled instead
    let mut stack = fresh_stack(&level);
    stack.session.skybox_recursion = 3;
    let mut scene = TestScene::default();
    let mut gl = RecordingGl::default();

    stack.start_frame();
    stack.register_portal(p);
    stack.end_frame(&level, &mut scene, &mut gl);

    assert_eq!(scene.snapshots.len(), 0);
    assert_eq!(gl.count(|op| *op == Op::ClearScreen), 1);
    assert_eq!(stack.session.skybox_recursion, 3);
}

#[test]
fn horizon_tiles_the_plane_and_closes_the_rim() {
    let level = test_level();
    let mut stack = fresh_stack(&level);
    let mut scene = TestScene::default();
    let mut gl = RecordingGl::default();

    let h = stack.unique_horizon(&HorizonInfo::from_sector(&level.sectors[0], 0));
    let mut p = Portal::new(PortalKind::Horizon { horizon: h });
    p.add_line(seg(0.0, 0.0, 64.0, 0.0), None);

    stack.start_frame();
    stack.register_portal(p);
    stack.end_frame(&level, &mut scene, &mut gl);

    assert_eq!(gl.count(|op| *op == Op::Quad), 256);
    assert_eq!(gl.count(|op| *op == Op::Strip), 1);
    assert_eq!(gl.count(|op| *op == Op::BindFlat(1)), 1);
    assert_eq!(gl.count(|op| *op == Op::PlaneLight(160, 0)), 1);

    // skirt u alternates around the ring, two verts per corner
    let skirt: Vec<f32> = gl.strips[0].iter().map(|v| v.uv[0]).collect();
    assert_eq!(
        skirt,
        vec![512.0, 512.0, -512.0, -512.0, 512.0, 512.0, -512.0, -512.0, 512.0, 512.0]
    );
}

#[test]
fn horizon_without_texture_draws_nothing() {
    let level = test_level();
    let stack = fresh_stack(&level);
    let mut gl = RecordingGl::default();

    let horizon = HorizonInfo {
        plane: SectorPlane::new(0.0, true, None),
        lightlevel: 160,
    };
    stack.draw_horizon_info(&horizon, &mut gl);
    assert!(gl.ops.is_empty());
}

#[test]
fn ee_horizon_fans_out_into_sky_and_planes() {
    let mut level = test_level();
    level.sectors[1].ceiling_sky = true;
    level.sectors[1].sky = 3;
    level.sector_portals[0].kind = SectorPortalKind::Plane;
    let mut stack = fresh_stack(&level);
    let mut scene = TestScene::default();
    let mut gl = RecordingGl::default();

    let mut p = Portal::new(PortalKind::EEHorizon { portal: 0 });
    p.add_line(seg(0.0, 0.0, 64.0, 0.0), None);

    stack.start_frame();
    stack.register_portal(p);
    stack.end_frame(&level, &mut scene, &mut gl);

    // sky for the ceiling, one horizon field for the floor
    assert_eq!(scene.skies.len(), 1);
    assert_eq!(scene.skies[0].sky, 3);
    assert_eq!(gl.count(|op| *op == Op::Quad), 256);
}

#[test]
fn portals_disabled_skips_stenciled_portals() {
    let level = test_level();
    let mut stack = fresh_stack(&level);
    stack.config.portals = false;
    let mut scene = TestScene::default();
    let mut gl = RecordingGl::default();

    stack.start_frame();
    stack.register_portal(mirror_portal(0));
    stack.end_frame(&level, &mut scene, &mut gl);

    assert_eq!(scene.snapshots.len(), 0);
    assert!(gl.ops.is_empty());
}

#[test]
fn active_portal_clips_geometry_behind_its_line() {
    let level = test_level();
    let mut stack = fresh_stack(&level);

    // nothing to clip against outside a mirror/line-portal draw
    assert_eq!(
        stack.clip_point(&level, DVec2::new(0.0, 100.0)),
        LineClip::Inside
    );

    stack.session.current_portal = Some(PortalSource::Line(0));
    assert_eq!(
        stack.clip_point(&level, DVec2::new(0.0, 100.0)),
        LineClip::InFront
    );
    assert_eq!(
        stack.clip_point(&level, DVec2::new(100.0, 0.0)),
        LineClip::Inside
    );
    // straddling segments are kept, fully-in-front ones are culled
    assert_eq!(
        stack.clip_segment(&level, DVec2::new(0.0, 100.0), DVec2::new(100.0, 0.0)),
        LineClip::Inside
    );
    assert_eq!(
        stack.clip_segment(&level, DVec2::new(0.0, 100.0), DVec2::new(10.0, 100.0)),
        LineClip::InFront
    );
}

#[test]
fn find_portal_merges_boundaries_by_origin() {
    let level = test_level();
    let mut stack = fresh_stack(&level);

    stack.start_frame();
    stack.register_portal(mirror_portal(0));
    let found = stack
        .find_portal_by_origin(PortalSource::Line(0))
        .expect("portal just registered");
    found.add_line(seg(128.0, 64.0, 160.0, 64.0), Some(0));
    assert_eq!(found.lines.len(), 2);
    assert!(stack.find_portal_by_origin(PortalSource::Line(99)).is_none());
}

#[test]
fn deep_nesting_unwinds_to_ground_state() {
    let level = test_level();
    let mut stack = fresh_stack(&level);
    let mut scene = TestScene::default();
    let mut gl = RecordingGl::default();
    let view = stack.view;

    // mirror within mirror within mirror
    scene.nested.push_back(vec![mirror_portal(0)]);
    scene.nested.push_back(vec![mirror_portal(0)]);

    stack.start_frame();
    stack.register_portal(mirror_portal(0));
    stack.end_frame(&level, &mut scene, &mut gl);

    assert_eq!(scene.snapshots.len(), 3);
    assert_eq!(stack.session.recursion, 0);
    assert_eq!(stack.session.renderdepth, 0);
    assert_eq!(stack.session.mirror_flag, 0);
    assert_eq!(stack.view, view);
    assert_eq!(gl.ops.last(), Some(&Op::StencilFunc(0)));
    assert_eq!(
        gl.count(|op| *op == Op::Stencil(StencilOp::Increment)),
        gl.count(|op| *op == Op::Stencil(StencilOp::Decrement)),
    );
}
