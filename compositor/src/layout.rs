//! Window and output placement that does not touch Wayland objects.
//!
//! `GravState` keeps the Smithay objects and leans on these pieces for
//! placement, hit-testing and the rigid body behind each window.

use crate::physics::{BodyHandle, PhysicsWorld, Pose};
use smithay::utils::{Logical, Point, Rectangle, Size};
use tracing::{debug, info};

// ── Outputs ─────────────────────────────────────────────────

/// Where the next auto-placed output goes: right of every existing one.
pub fn next_output_location(
    geometries: impl IntoIterator<Item = Rectangle<i32, Logical>>,
) -> Point<i32, Logical> {
    let x = geometries
        .into_iter()
        .map(|geo| geo.loc.x + geo.size.w)
        .max()
        .unwrap_or(0);
    Point::from((x, 0))
}

/// Clamp `point` to the pixels covered by `rect`.
pub fn clamp_to_rect(point: Point<f64, Logical>, rect: Rectangle<i32, Logical>) -> Point<f64, Logical> {
    let min_x = f64::from(rect.loc.x);
    let min_y = f64::from(rect.loc.y);
    let max_x = f64::from(rect.loc.x + rect.size.w - 1).max(min_x);
    let max_y = f64::from(rect.loc.y + rect.size.h - 1).max(min_y);
    Point::from((point.x.clamp(min_x, max_x), point.y.clamp(min_y, max_y)))
}

/// Spawn centre for a new window: above the horizontal centre of the first
/// output, `spawn_height` px from its top edge.
pub fn spawn_point(first_output: Option<Rectangle<i32, Logical>>, spawn_height: f32) -> (f32, f32) {
    first_output
        .map(|geo| {
            (
                geo.loc.x as f32 + geo.size.w as f32 / 2.0,
                geo.loc.y as f32 + spawn_height,
            )
        })
        .unwrap_or((0.0, spawn_height))
}

// ── Hit-testing ─────────────────────────────────────────────

/// Surface origin to report for a pointer at `point` over a window at
/// `pose`, so that `point - origin` is the pointer in the window's own
/// rotated coordinates.
pub fn surface_origin(pose: Pose, size: (f32, f32), point: Point<f64, Logical>) -> Point<f64, Logical> {
    let (lx, ly) = pose.to_window(point.x as f32, point.y as f32, size.0, size.1);
    Point::from((point.x - f64::from(lx), point.y - f64::from(ly)))
}

/// Topmost window under `point`. `windows` runs bottom to top.
pub fn topmost_hit<I>(windows: I, point: Point<f64, Logical>) -> Option<(u64, Point<f64, Logical>)>
where
    I: DoubleEndedIterator<Item = (u64, Pose, (f32, f32))>,
{
    let (px, py) = (point.x as f32, point.y as f32);
    windows
        .rev()
        .find(|(_, pose, (w, h))| pose.contains(px, py, *w, *h))
        .map(|(id, pose, size)| (id, surface_origin(pose, size, point)))
}

// ── Stacking ────────────────────────────────────────────────

/// IDs of mapped windows, bottom to top.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Stacking {
    ids: Vec<u64>,
}

impl Stacking {
    /// Put `id` on top, moving it if it is already stacked.
    pub fn raise(&mut self, id: u64) {
        self.ids.retain(|s| *s != id);
        self.ids.push(id);
    }

    pub fn remove(&mut self, id: u64) -> bool {
        let before = self.ids.len();
        self.ids.retain(|s| *s != id);
        self.ids.len() != before
    }

    pub fn top(&self) -> Option<u64> {
        self.ids.last().copied()
    }

    pub fn contains(&self, id: u64) -> bool {
        self.ids.contains(&id)
    }

    pub fn ids(&self) -> &[u64] {
        &self.ids
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }
}

// ── Window bodies ───────────────────────────────────────────

/// What a map did to a window's body.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MapChange {
    /// The body was created by this map.
    pub created: bool,
    /// The window was unmapped before and now shows again.
    pub shown: bool,
    pub resized: bool,
}

/// The simulated half of a toplevel.
#[derive(Debug, Clone)]
pub struct WindowBody {
    /// Where the body is created on first map (centre, logical px).
    pub spawn: (f32, f32),
    /// Size of the committed buffer, in logical px.
    pub size: Option<Size<i32, Logical>>,
    pub body: Option<BodyHandle>,
    pub mapped: bool,
}

impl WindowBody {
    pub fn new(spawn: (f32, f32)) -> Self {
        Self {
            spawn,
            size: None,
            body: None,
            mapped: false,
        }
    }

    pub fn size_f32(&self) -> Option<(f32, f32)> {
        self.size.map(|s| (s.w as f32, s.h as f32))
    }

    /// The window committed a buffer of `size`.
    ///
    /// The first map creates the body at the spawn point tilted by
    /// `rotation`; later maps resume the existing body where it was left.
    pub fn map(&mut self, physics: &mut PhysicsWorld, size: Size<i32, Logical>, rotation: f32) -> MapChange {
        let resized = self.size.is_some_and(|s| s != size);
        self.size = Some(size);
        let dims = (size.w as f32, size.h as f32);

        let mut change = MapChange {
            shown: !self.mapped,
            ..MapChange::default()
        };
        match self.body {
            None => {
                self.body = Some(physics.add_window(self.spawn, dims, rotation));
                change.created = true;
                info!(w = size.w, h = size.h, rotation, "window body created");
            }
            Some(body) => {
                if !self.mapped {
                    physics.set_window_enabled(body, true);
                }
                if resized {
                    physics.resize_window(body, dims);
                    change.resized = true;
                    debug!(w = size.w, h = size.h, "window body resized");
                }
            }
        }
        self.mapped = true;
        change
    }

    /// Freeze the body in place. Returns false if the window was not mapped.
    pub fn unmap(&mut self, physics: &mut PhysicsWorld) -> bool {
        if !self.mapped {
            return false;
        }
        self.mapped = false;
        if let Some(body) = self.body {
            physics.set_window_enabled(body, false);
        }
        true
    }

    /// Drop the body for good.
    pub fn release(&mut self, physics: &mut PhysicsWorld) {
        if let Some(body) = self.body.take() {
            physics.remove_window(body);
        }
        self.mapped = false;
    }

    pub fn pose(&self, physics: &PhysicsWorld) -> Option<Pose> {
        physics.pose(self.body?)
    }
}
