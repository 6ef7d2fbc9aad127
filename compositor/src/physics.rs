//! Rigid-body simulation driving window placement.
//!
//! Wraps a rapier2d world. The public API speaks logical pixels and
//! radians with y pointing down the screen; values are divided by
//! `pixels_per_meter` before they reach rapier so the solver works at
//! human scale instead of with thousand-unit boxes.
//!
//! Every output's floor and walls live in a collision group of their own,
//! and a window only collides with the group of the output it spawned
//! over. Neighbouring outputs' walls overlap each other's edges, so
//! without this a window near a shared edge would rest on the wrong wall.

use crate::config::PhysicsConfig;
use rapier2d::geometry::{Group, InteractionGroups};
use rapier2d::prelude::*;
use std::collections::HashMap;
use tracing::{debug, trace};

/// Collision group every window collider belongs to.
const WINDOW_GROUP: Group = Group::GROUP_1;
/// Output slots use group bits 1..32; bit 0 is taken by windows.
const MAX_OUTPUT_SLOT: u8 = 31;

fn slot_group(slot: u8) -> Group {
    Group::from_bits_truncate(1u32 << slot)
}

/// Handle to a window's rigid body.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BodyHandle(RigidBodyHandle);

/// Static colliders bounding one output: floor, left wall, right wall.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OutputBounds {
    colliders: [ColliderHandle; 3],
    slot: u8,
}

/// Axis-aligned box in logical pixels.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Aabb {
    pub min_x: f32,
    pub min_y: f32,
    pub max_x: f32,
    pub max_y: f32,
}

impl Aabb {
    pub fn width(&self) -> f32 {
        self.max_x - self.min_x
    }

    pub fn height(&self) -> f32 {
        self.max_y - self.min_y
    }
}

/// Centre and orientation of a window body, in logical pixels and radians.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Pose {
    pub x: f32,
    pub y: f32,
    pub angle: f32,
}

impl Pose {
    /// Map a global point into the body frame (origin at the centre, unrotated).
    pub fn to_local(&self, px: f32, py: f32) -> (f32, f32) {
        let (s, c) = self.angle.sin_cos();
        let dx = px - self.x;
        let dy = py - self.y;
        (c * dx + s * dy, -s * dx + c * dy)
    }

    /// Map a global point into window coordinates (origin at the window's top-left).
    pub fn to_window(&self, px: f32, py: f32, w: f32, h: f32) -> (f32, f32) {
        let (lx, ly) = self.to_local(px, py);
        (lx + w / 2.0, ly + h / 2.0)
    }

    /// Whether the global point lies inside the rotated `w`×`h` rectangle.
    pub fn contains(&self, px: f32, py: f32, w: f32, h: f32) -> bool {
        let (wx, wy) = self.to_window(px, py, w, h);
        (0.0..w).contains(&wx) && (0.0..h).contains(&wy)
    }

    /// Axis-aligned bounds of the rotated `w`×`h` rectangle.
    pub fn bounding_box(&self, w: f32, h: f32) -> Aabb {
        let (s, c) = self.angle.sin_cos();
        let half_w = (c.abs() * w + s.abs() * h) / 2.0;
        let half_h = (s.abs() * w + c.abs() * h) / 2.0;
        Aabb {
            min_x: self.x - half_w,
            min_y: self.y - half_h,
            max_x: self.x + half_w,
            max_y: self.y + half_h,
        }
    }
}

/// An output's fence and the rectangle it encloses, in pixels.
#[derive(Debug, Clone, Copy)]
struct OutputRecord {
    bounds: OutputBounds,
    x: f32,
    y: f32,
    w: f32,
    h: f32,
}

impl OutputRecord {
    fn contains_x(&self, px: f32) -> bool {
        px >= self.x && px < self.x + self.w
    }

    /// Whether a body centred at (`px`, `py`) can no longer land on this
    /// output: beside it, or already below its floor.
    fn lost(&self, px: f32, py: f32) -> bool {
        px < self.x || px > self.x + self.w || py > self.y + self.h
    }

    fn respawn_point(&self, spawn_height: f32) -> (f32, f32) {
        (self.x + self.w / 2.0, self.y + spawn_height)
    }
}

#[derive(Debug, Clone, Copy)]
struct Material {
    friction: f32,
    restitution: f32,
    density: f32,
}

pub struct PhysicsWorld {
    gravity: Vector<Real>,
    params: IntegrationParameters,
    pipeline: PhysicsPipeline,
    islands: IslandManager,
    broad_phase: DefaultBroadPhase,
    narrow_phase: NarrowPhase,
    bodies: RigidBodySet,
    colliders: ColliderSet,
    impulse_joints: ImpulseJointSet,
    multibody_joints: MultibodyJointSet,
    ccd: CCDSolver,
    pixels_per_meter: f32,
    wall_thickness: f32,
    spawn_height: f32,
    material: Material,
    outputs: Vec<OutputRecord>,
    /// Output slot each window collides with.
    homes: HashMap<RigidBodyHandle, u8>,
}

impl PhysicsWorld {
    pub fn new(config: &PhysicsConfig) -> Self {
        let pixels_per_meter = config.pixels_per_meter;
        let gravity = vector![
            config.gravity[0] / pixels_per_meter,
            config.gravity[1] / pixels_per_meter
        ];
        debug!(?gravity, pixels_per_meter, "physics world created");
        Self {
            gravity,
            params: IntegrationParameters::default(),
            pipeline: PhysicsPipeline::new(),
            islands: IslandManager::new(),
            broad_phase: DefaultBroadPhase::new(),
            narrow_phase: NarrowPhase::new(),
            bodies: RigidBodySet::new(),
            colliders: ColliderSet::new(),
            impulse_joints: ImpulseJointSet::new(),
            multibody_joints: MultibodyJointSet::new(),
            ccd: CCDSolver::new(),
            pixels_per_meter,
            wall_thickness: config.wall_thickness,
            spawn_height: config.spawn_height,
            material: Material {
                friction: config.friction,
                restitution: config.restitution,
                density: config.density,
            },
            outputs: Vec::new(),
            homes: HashMap::new(),
        }
    }

    fn to_world(&self, px: f32) -> f32 {
        px / self.pixels_per_meter
    }

    fn to_pixels(&self, m: f32) -> f32 {
        m * self.pixels_per_meter
    }

    /// Gravity in px/s².
    pub fn gravity(&self) -> [f32; 2] {
        [self.to_pixels(self.gravity.x), self.to_pixels(self.gravity.y)]
    }

    /// Change gravity (px/s²) and wake every body so resting windows react.
    pub fn set_gravity(&mut self, x: f32, y: f32) {
        self.gravity = vector![self.to_world(x), self.to_world(y)];
        for (_, body) in self.bodies.iter_mut() {
            body.wake_up(true);
        }
        debug!(x, y, "gravity changed");
    }

    fn static_box(&mut self, cx: f32, cy: f32, half_w: f32, half_h: f32, slot: u8) -> ColliderHandle {
        let collider = ColliderBuilder::cuboid(self.to_world(half_w), self.to_world(half_h))
            .translation(vector![self.to_world(cx), self.to_world(cy)])
            .friction(self.material.friction)
            .restitution(self.material.restitution)
            .collision_groups(InteractionGroups::new(slot_group(slot), WINDOW_GROUP))
            .build();
        self.colliders.insert(collider)
    }

    fn fence(&mut self, x: f32, y: f32, w: f32, h: f32, slot: u8) -> OutputBounds {
        let t = self.wall_thickness;
        let floor = self.static_box(x + w / 2.0, y + h + t / 2.0, w / 2.0 + t, t / 2.0, slot);
        let left = self.static_box(x - t / 2.0, y, t / 2.0, h, slot);
        let right = self.static_box(x + w + t / 2.0, y, t / 2.0, h, slot);
        OutputBounds {
            colliders: [floor, left, right],
            slot,
        }
    }

    fn drop_fence(&mut self, bounds: OutputBounds) {
        for handle in bounds.colliders {
            self.colliders
                .remove(handle, &mut self.islands, &mut self.bodies, true);
        }
    }

    fn free_slot(&self) -> u8 {
        (1..=MAX_OUTPUT_SLOT)
            .find(|slot| !self.outputs.iter().any(|o| o.bounds.slot == *slot))
            .unwrap_or(MAX_OUTPUT_SLOT)
    }

    /// Add a floor and two walls around the output occupying `x, y, w, h`.
    ///
    /// The inner faces sit on the output edges. Walls reach one output
    /// height above the top edge so windows spawned there drop between them.
    /// Windows that have no output yet and hang over this one adopt it.
    pub fn add_output_bounds(&mut self, x: f32, y: f32, w: f32, h: f32) -> OutputBounds {
        let slot = self.free_slot();
        let bounds = self.fence(x, y, w, h, slot);
        let record = OutputRecord { bounds, x, y, w, h };
        self.outputs.push(record);

        let homeless: Vec<RigidBodyHandle> = self
            .bodies
            .iter()
            .filter(|(handle, body)| {
                !self.homes.contains_key(handle)
                    && record.contains_x(self.to_pixels(body.translation().x))
            })
            .map(|(handle, _)| handle)
            .collect();
        for handle in homeless {
            self.set_home(handle, Some(slot));
        }

        debug!(x, y, w, h, slot, "output bounds added");
        bounds
    }

    /// Move an output's fence to a new rectangle, keeping the windows that
    /// live on it. Windows left beside the new rectangle or below its floor
    /// are put back at the output's spawn point.
    pub fn replace_output_bounds(
        &mut self,
        old: OutputBounds,
        x: f32,
        y: f32,
        w: f32,
        h: f32,
    ) -> OutputBounds {
        self.drop_fence(old);
        let bounds = self.fence(x, y, w, h, old.slot);
        let record = OutputRecord { bounds, x, y, w, h };
        match self.outputs.iter_mut().find(|o| o.bounds == old) {
            Some(existing) => *existing = record,
            None => self.outputs.push(record),
        }

        let (sx, sy) = record.respawn_point(self.spawn_height);
        let residents: Vec<RigidBodyHandle> = self
            .homes
            .iter()
            .filter(|(_, slot)| **slot == old.slot)
            .map(|(handle, _)| *handle)
            .collect();
        // Stranded windows are stacked upwards from the spawn point so
        // they do not respawn inside each other.
        let mut lift = 0.0;
        for handle in residents {
            let extent = self.window_extent(handle);
            let Some(body) = self.bodies.get_mut(handle) else {
                continue;
            };
            let t = *body.translation();
            let (px, py) = (t.x * self.pixels_per_meter, t.y * self.pixels_per_meter);
            if record.lost(px, py) {
                let target = vector![sx, sy - lift - extent / 2.0] / self.pixels_per_meter;
                body.set_translation(target, true);
                body.set_linvel(vector![0.0, 0.0], true);
                body.set_angvel(0.0, true);
                lift += extent;
                debug!(?handle, "window outside resized output, respawned");
            } else {
                body.wake_up(true);
            }
        }

        debug!(x, y, w, h, slot = old.slot, "output bounds replaced");
        bounds
    }

    /// Remove an output's fence. Windows living on it lose their floor.
    pub fn remove_output_bounds(&mut self, bounds: OutputBounds) {
        self.drop_fence(bounds);
        self.outputs.retain(|o| o.bounds != bounds);
        let orphans: Vec<RigidBodyHandle> = self
            .homes
            .iter()
            .filter(|(_, slot)| **slot == bounds.slot)
            .map(|(handle, _)| *handle)
            .collect();
        for handle in orphans {
            self.set_home(handle, None);
        }
        // Windows resting on the removed floor must start falling again.
        for (_, body) in self.bodies.iter_mut() {
            body.wake_up(true);
        }
    }

    /// Largest side of a window's collider, in pixels.
    fn window_extent(&self, handle: RigidBodyHandle) -> f32 {
        let Some(body) = self.bodies.get(handle) else {
            return 0.0;
        };
        body.colliders()
            .iter()
            .filter_map(|c| self.colliders.get(*c))
            .map(|c| {
                let e = c.compute_aabb().extents();
                self.to_pixels(e.x.max(e.y))
            })
            .fold(0.0, f32::max)
    }

    /// The output a window spawned at `x` belongs to: the one spanning
    /// `x`, else the one whose centre is nearest.
    fn home_for(&self, x: f32) -> Option<u8> {
        if let Some(record) = self.outputs.iter().find(|o| o.contains_x(x)) {
            return Some(record.bounds.slot);
        }
        self.outputs
            .iter()
            .map(|o| ((o.x + o.w / 2.0 - x).abs(), o.bounds.slot))
            .min_by(|a, b| a.0.total_cmp(&b.0))
            .map(|(_, slot)| slot)
    }

    fn window_groups(home: Option<u8>) -> InteractionGroups {
        let filter = match home {
            Some(slot) => WINDOW_GROUP | slot_group(slot),
            None => WINDOW_GROUP,
        };
        InteractionGroups::new(WINDOW_GROUP, filter)
    }

    fn set_home(&mut self, handle: RigidBodyHandle, home: Option<u8>) {
        match home {
            Some(slot) => self.homes.insert(handle, slot),
            None => self.homes.remove(&handle),
        };
        let Some(body) = self.bodies.get(handle) else {
            return;
        };
        for collider in body.colliders().to_vec() {
            if let Some(c) = self.colliders.get_mut(collider) {
                c.set_collision_groups(Self::window_groups(home));
            }
        }
    }

    fn window_collider(&self, w: f32, h: f32, home: Option<u8>) -> Collider {
        ColliderBuilder::cuboid(self.to_world(w / 2.0), self.to_world(h / 2.0))
            .collision_groups(Self::window_groups(home))
            .friction(self.material.friction)
            .restitution(self.material.restitution)
            .density(self.material.density)
            .build()
    }

    /// Create a dynamic box body for a window of `size` centred on `center`.
    ///
    /// The window collides with the bounds of the output below `center`.
    pub fn add_window(&mut self, center: (f32, f32), size: (f32, f32), rotation: f32) -> BodyHandle {
        let body = RigidBodyBuilder::dynamic()
            .translation(vector![self.to_world(center.0), self.to_world(center.1)])
            .rotation(rotation)
            .ccd_enabled(true)
            .build();
        let handle = self.bodies.insert(body);
        let home = self.home_for(center.0);
        if let Some(slot) = home {
            self.homes.insert(handle, slot);
        }
        let collider = self.window_collider(size.0, size.1, home);
        self.colliders
            .insert_with_parent(collider, handle, &mut self.bodies);
        trace!(?center, ?size, rotation, ?home, "window body added");
        BodyHandle(handle)
    }

    /// Replace the body's collider after the window changed size.
    pub fn resize_window(&mut self, handle: BodyHandle, size: (f32, f32)) {
        let Some(body) = self.bodies.get(handle.0) else {
            return;
        };
        let old: Vec<ColliderHandle> = body.colliders().to_vec();
        for collider in old {
            self.colliders
                .remove(collider, &mut self.islands, &mut self.bodies, true);
        }
        let home = self.homes.get(&handle.0).copied();
        let collider = self.window_collider(size.0, size.1, home);
        self.colliders
            .insert_with_parent(collider, handle.0, &mut self.bodies);
        if let Some(body) = self.bodies.get_mut(handle.0) {
            body.wake_up(true);
        }
    }

    /// Take a body out of (or back into) the simulation without losing its pose.
    pub fn set_window_enabled(&mut self, handle: BodyHandle, enabled: bool) {
        if let Some(body) = self.bodies.get_mut(handle.0) {
            body.set_enabled(enabled);
            if enabled {
                body.wake_up(true);
            }
        }
    }

    pub fn remove_window(&mut self, handle: BodyHandle) {
        self.homes.remove(&handle.0);
        self.bodies.remove(
            handle.0,
            &mut self.islands,
            &mut self.colliders,
            &mut self.impulse_joints,
            &mut self.multibody_joints,
            true,
        );
    }

    pub fn pose(&self, handle: BodyHandle) -> Option<Pose> {
        let body = self.bodies.get(handle.0)?;
        let t = body.translation();
        Some(Pose {
            x: self.to_pixels(t.x),
            y: self.to_pixels(t.y),
            angle: body.rotation().angle(),
        })
    }

    /// Advance the simulation by `dt` seconds.
    pub fn step(&mut self, dt: f32) {
        self.params.dt = dt;
        self.pipeline.step(
            &self.gravity,
            &self.params,
            &mut self.islands,
            &mut self.broad_phase,
            &mut self.narrow_phase,
            &mut self.bodies,
            &mut self.colliders,
            &mut self.impulse_joints,
            &mut self.multibody_joints,
            &mut self.ccd,
            None,
            &(),
            &(),
        );
    }

    pub fn window_count(&self) -> usize {
        self.bodies.len()
    }

    pub fn bounds_count(&self) -> usize {
        self.outputs.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f32::consts::FRAC_PI_2;

    fn world() -> PhysicsWorld {
        PhysicsWorld::new(&PhysicsConfig::default())
    }

    fn run(world: &mut PhysicsWorld, secs: f32) {
        let steps = (secs * 60.0) as usize;
        for _ in 0..steps {
            world.step(1.0 / 60.0);
        }
    }

    #[test]
    fn test_pose_local_roundtrip_unrotated() {
        let pose = Pose { x: 100.0, y: 50.0, angle: 0.0 };
        assert_eq!(pose.to_local(110.0, 45.0), (10.0, -5.0));
        assert_eq!(pose.to_window(100.0, 50.0, 40.0, 20.0), (20.0, 10.0));
        assert!(pose.contains(81.0, 41.0, 40.0, 20.0));
        assert!(!pose.contains(79.0, 50.0, 40.0, 20.0));
    }

    #[test]
    fn test_pose_quarter_turn() {
        let pose = Pose { x: 0.0, y: 0.0, angle: FRAC_PI_2 };
        // A 40x20 window turned a quarter is 20 wide and 40 tall on screen.
        assert!(pose.contains(0.0, 15.0, 40.0, 20.0));
        assert!(!pose.contains(15.0, 0.0, 40.0, 20.0));

        let bb = pose.bounding_box(40.0, 20.0);
        assert!((bb.width() - 20.0).abs() < 1e-3);
        assert!((bb.height() - 40.0).abs() < 1e-3);
    }

    #[test]
    fn test_bounding_box_grows_when_tilted() {
        let flat = Pose { x: 0.0, y: 0.0, angle: 0.0 }.bounding_box(100.0, 50.0);
        let tilted = Pose { x: 0.0, y: 0.0, angle: 0.4 }.bounding_box(100.0, 50.0);
        assert!(tilted.height() > flat.height());
        assert!((flat.width() - 100.0).abs() < 1e-3);
    }

    #[test]
    fn test_window_falls_onto_floor() {
        let mut world = world();
        world.add_output_bounds(0.0, 0.0, 800.0, 600.0);
        let body = world.add_window((400.0, -400.0), (200.0, 100.0), 0.0);

        run(&mut world, 4.0);

        let pose = world.pose(body).unwrap();
        let bb = pose.bounding_box(200.0, 100.0);
        assert!((bb.max_y - 600.0).abs() < 3.0, "resting bottom at {}", bb.max_y);
        assert!(bb.min_x >= -1.0 && bb.max_x <= 801.0);
    }

    #[test]
    fn test_tilted_window_settles_inside_walls() {
        let mut world = world();
        world.add_output_bounds(0.0, 0.0, 800.0, 600.0);
        let body = world.add_window((400.0, -400.0), (300.0, 200.0), 0.8);

        run(&mut world, 8.0);

        let pose = world.pose(body).unwrap();
        let bb = pose.bounding_box(300.0, 200.0);
        assert!(bb.max_y <= 603.0, "sank through floor: {}", bb.max_y);
        assert!(bb.max_y > 560.0, "did not land: {}", bb.max_y);
        assert!(bb.min_x >= -3.0 && bb.max_x <= 803.0);
    }

    #[test]
    fn test_sideways_gravity_pins_to_wall() {
        let mut world = world();
        world.add_output_bounds(0.0, 0.0, 800.0, 600.0);
        let body = world.add_window((400.0, 300.0), (100.0, 100.0), 0.0);
        world.set_gravity(1500.0, 0.0);
        assert_eq!(world.gravity(), [1500.0, 0.0]);

        run(&mut world, 4.0);

        let bb = world.pose(body).unwrap().bounding_box(100.0, 100.0);
        assert!((bb.max_x - 800.0).abs() < 3.0, "right edge at {}", bb.max_x);
    }

    #[test]
    fn test_disabled_body_does_not_move() {
        let mut world = world();
        let body = world.add_window((0.0, 0.0), (50.0, 50.0), 0.0);
        world.set_window_enabled(body, false);
        run(&mut world, 1.0);
        assert_eq!(world.pose(body).unwrap().y, 0.0);

        world.set_window_enabled(body, true);
        run(&mut world, 1.0);
        assert!(world.pose(body).unwrap().y > 0.0);
    }

    #[test]
    fn test_remove_window_and_bounds() {
        let mut world = world();
        let bounds = world.add_output_bounds(0.0, 0.0, 640.0, 480.0);
        let body = world.add_window((320.0, 0.0), (64.0, 64.0), 0.0);
        assert_eq!(world.window_count(), 1);
        assert_eq!(world.bounds_count(), 1);

        world.remove_window(body);
        assert!(world.pose(body).is_none());
        assert_eq!(world.window_count(), 0);

        world.remove_output_bounds(bounds);
        assert_eq!(world.bounds_count(), 0);
    }

    #[test]
    fn test_window_falls_through_without_bounds() {
        let mut world = world();
        let body = world.add_window((0.0, 0.0), (64.0, 64.0), 0.0);
        run(&mut world, 1.0);
        // Free fall for one second at 1500 px/s² covers roughly 750 px.
        let y = world.pose(body).unwrap().y;
        assert!(y > 600.0 && y < 800.0, "y = {}", y);
    }

    #[test]
    fn test_resize_keeps_pose() {
        let mut world = world();
        world.add_output_bounds(0.0, 0.0, 800.0, 600.0);
        let body = world.add_window((400.0, 500.0), (100.0, 100.0), 0.0);
        run(&mut world, 2.0);
        let before = world.pose(body).unwrap();

        world.resize_window(body, (100.0, 40.0));
        run(&mut world, 2.0);
        let after = world.pose(body).unwrap();
        assert!((after.x - before.x).abs() < 5.0);
        let bb = after.bounding_box(100.0, 40.0);
        assert!((bb.max_y - 600.0).abs() < 3.0, "resting bottom at {}", bb.max_y);
    }

    #[test]
    fn test_window_near_shared_edge_stays_on_its_output() {
        let mut world = world();
        world.add_output_bounds(0.0, 0.0, 800.0, 600.0);
        world.add_output_bounds(800.0, 0.0, 800.0, 600.0);
        let left = world.add_window((740.0, -400.0), (100.0, 100.0), 0.0);
        let right = world.add_window((860.0, -400.0), (100.0, 100.0), 0.0);

        run(&mut world, 5.0);

        let l = world.pose(left).unwrap().bounding_box(100.0, 100.0);
        let r = world.pose(right).unwrap().bounding_box(100.0, 100.0);
        assert!(l.min_x > 680.0 && l.max_x <= 801.0, "left window at {}..{}", l.min_x, l.max_x);
        assert!(r.min_x >= 799.0 && r.max_x < 920.0, "right window at {}..{}", r.min_x, r.max_x);
        assert!((l.max_y - 600.0).abs() < 3.0);
        assert!((r.max_y - 600.0).abs() < 3.0);
    }

    #[test]
    fn test_wide_window_fits_between_own_walls() {
        let mut world = world();
        world.add_output_bounds(0.0, 0.0, 800.0, 600.0);
        world.add_output_bounds(800.0, 0.0, 800.0, 600.0);
        let body = world.add_window((400.0, -400.0), (760.0, 200.0), 0.0);

        run(&mut world, 6.0);

        let bb = world.pose(body).unwrap().bounding_box(760.0, 200.0);
        assert!((bb.max_y - 600.0).abs() < 3.0, "bottom edge at {}", bb.max_y);
    }

    #[test]
    fn test_output_slots_are_distinct_and_reused() {
        let mut world = world();
        let a = world.add_output_bounds(0.0, 0.0, 800.0, 600.0);
        let b = world.add_output_bounds(800.0, 0.0, 800.0, 600.0);
        assert_ne!(a.slot, b.slot);

        world.remove_output_bounds(a);
        let c = world.add_output_bounds(1600.0, 0.0, 800.0, 600.0);
        assert_eq!(c.slot, a.slot);
        assert_eq!(world.bounds_count(), 2);
    }

    #[test]
    fn test_shrunk_output_respawns_stranded_windows() {
        let mut world = world();
        let bounds = world.add_output_bounds(0.0, 0.0, 1200.0, 800.0);
        let stranded = world.add_window((1000.0, 400.0), (100.0, 100.0), 0.0);
        let below_floor = world.add_window((200.0, 400.0), (100.0, 100.0), 0.0);
        run(&mut world, 3.0);
        assert!((world.pose(stranded).unwrap().y - 750.0).abs() < 3.0);

        let shrunk = world.replace_output_bounds(bounds, 0.0, 0.0, 640.0, 480.0);
        assert_eq!(shrunk.slot, bounds.slot);
        assert_eq!(world.bounds_count(), 1);
        run(&mut world, 5.0);

        for body in [stranded, below_floor] {
            let bb = world.pose(body).unwrap().bounding_box(100.0, 100.0);
            assert!(bb.max_y <= 483.0 && bb.max_y > 250.0, "bottom edge at {}", bb.max_y);
            assert!(bb.min_x >= -3.0 && bb.max_x <= 643.0, "x range {}..{}", bb.min_x, bb.max_x);
        }
    }

    #[test]
    fn test_shrink_keeps_windows_still_inside() {
        let mut world = world();
        let bounds = world.add_output_bounds(0.0, 0.0, 1200.0, 800.0);
        let body = world.add_window((200.0, 400.0), (100.0, 100.0), 0.0);
        run(&mut world, 3.0);

        // Taller output: the resting window is inside and simply drops.
        world.replace_output_bounds(bounds, 0.0, 0.0, 640.0, 1000.0);
        run(&mut world, 3.0);
        let pose = world.pose(body).unwrap();
        assert!((pose.x - 200.0).abs() < 5.0, "x = {}", pose.x);
        assert!((pose.y - 950.0).abs() < 3.0, "y = {}", pose.y);
    }

    #[test]
    fn test_window_added_before_output_adopts_it() {
        let mut world = world();
        let body = world.add_window((400.0, -400.0), (100.0, 100.0), 0.0);
        world.add_output_bounds(0.0, 0.0, 800.0, 600.0);

        run(&mut world, 4.0);

        let bb = world.pose(body).unwrap().bounding_box(100.0, 100.0);
        assert!((bb.max_y - 600.0).abs() < 3.0, "bottom edge at {}", bb.max_y);
    }
}
