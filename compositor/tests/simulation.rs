//! Headless integration tests for the gravwm simulation layer.
//!
//! These drive the physics world, the fixed-step ticker and configuration
//! loading together without a Wayland display, so they run in CI and in
//! containers.

use gravwm_compositor::clock::{FixedStepper, FrameTicker, TestClock};
use gravwm_compositor::config::{Config, ConfigError};
use gravwm_compositor::keybindings::{Action, Keybindings};
use gravwm_compositor::physics::{BodyHandle, PhysicsWorld};
use gravwm_compositor::render::window_draw_geometry;

use smithay::input::keyboard::{Keysym, ModifiersState};
use smithay::utils::{Point, Size};
use std::io::Write;
use std::sync::Arc;
use std::time::Duration;

fn run_for(world: &mut PhysicsWorld, ticker: &mut FrameTicker, clock: &TestClock, secs: u64) {
    let frame = Duration::from_millis(16);
    let frames = secs * 1000 / 16;
    for _ in 0..frames {
        clock.advance(frame);
        let steps = ticker.tick();
        for _ in 0..steps {
            world.step(ticker.step_secs());
        }
    }
}

fn ticked_world(config: &Config) -> (PhysicsWorld, FrameTicker, Arc<TestClock>) {
    let clock = Arc::new(TestClock::new());
    let ticker = FrameTicker::new(
        clock.clone(),
        FixedStepper::new(config.physics.tick_hz, config.physics.max_substeps),
    );
    (PhysicsWorld::new(&config.physics), ticker, clock)
}

fn bottom(world: &PhysicsWorld, body: BodyHandle, w: f32, h: f32) -> f32 {
    world.pose(body).unwrap().bounding_box(w, h).max_y
}

// ── Falling and settling ────────────────────────────────────

#[test]
fn test_window_settles_on_floor_with_frame_ticker() {
    let config = Config::default();
    let (mut world, mut ticker, clock) = ticked_world(&config);
    world.add_output_bounds(0.0, 0.0, 1280.0, 720.0);
    let body = world.add_window((640.0, config.physics.spawn_height), (400.0, 300.0), 0.0);

    run_for(&mut world, &mut ticker, &clock, 5);

    let resting = bottom(&world, body, 400.0, 300.0);
    assert!((resting - 720.0).abs() < 3.0, "bottom edge at {}", resting);
}

#[test]
fn test_window_lands_on_its_own_output() {
    let config = Config::default();
    let (mut world, mut ticker, clock) = ticked_world(&config);
    world.add_output_bounds(0.0, 0.0, 1920.0, 1080.0);
    world.add_output_bounds(1920.0, 0.0, 1920.0, 1080.0);
    assert_eq!(world.bounds_count(), 2);

    let body = world.add_window((2880.0, -400.0), (300.0, 200.0), 0.0);
    run_for(&mut world, &mut ticker, &clock, 5);

    let bb = world.pose(body).unwrap().bounding_box(300.0, 200.0);
    assert!(bb.min_x >= 1917.0 && bb.max_x <= 3843.0, "x range {}..{}", bb.min_x, bb.max_x);
    assert!((bb.max_y - 1080.0).abs() < 3.0, "bottom edge at {}", bb.max_y);
}

#[test]
fn test_windows_stack_on_each_other() {
    let config = Config::default();
    let (mut world, mut ticker, clock) = ticked_world(&config);
    world.add_output_bounds(0.0, 0.0, 800.0, 600.0);

    let lower = world.add_window((400.0, -200.0), (200.0, 100.0), 0.0);
    let upper = world.add_window((400.0, -500.0), (200.0, 100.0), 0.0);
    run_for(&mut world, &mut ticker, &clock, 6);

    let lower_bb = world.pose(lower).unwrap().bounding_box(200.0, 100.0);
    let upper_bb = world.pose(upper).unwrap().bounding_box(200.0, 100.0);
    assert!((lower_bb.max_y - 600.0).abs() < 3.0, "lower bottom at {}", lower_bb.max_y);
    assert!(
        (upper_bb.max_y - lower_bb.min_y).abs() < 5.0,
        "upper bottom {} vs lower top {}",
        upper_bb.max_y,
        lower_bb.min_y
    );
}

#[test]
fn test_removing_output_bounds_drops_resting_window() {
    let config = Config::default();
    let (mut world, mut ticker, clock) = ticked_world(&config);
    let bounds = world.add_output_bounds(0.0, 0.0, 800.0, 600.0);
    let body = world.add_window((400.0, 0.0), (100.0, 100.0), 0.0);
    run_for(&mut world, &mut ticker, &clock, 4);
    assert!((bottom(&world, body, 100.0, 100.0) - 600.0).abs() < 3.0);

    world.remove_output_bounds(bounds);
    run_for(&mut world, &mut ticker, &clock, 1);
    assert!(bottom(&world, body, 100.0, 100.0) > 700.0);
}

#[test]
fn test_windows_either_side_of_shared_edge_settle_on_floor() {
    let config = Config::default();
    let (mut world, mut ticker, clock) = ticked_world(&config);
    world.add_output_bounds(0.0, 0.0, 1280.0, 720.0);
    world.add_output_bounds(1280.0, 0.0, 1280.0, 720.0);

    let left = world.add_window((1200.0, -300.0), (150.0, 150.0), 0.0);
    let right = world.add_window((1360.0, -300.0), (150.0, 150.0), 0.0);
    run_for(&mut world, &mut ticker, &clock, 6);

    let left_bb = world.pose(left).unwrap().bounding_box(150.0, 150.0);
    let right_bb = world.pose(right).unwrap().bounding_box(150.0, 150.0);
    assert!(left_bb.max_x <= 1283.0, "left window reaches {}", left_bb.max_x);
    assert!(right_bb.min_x >= 1277.0, "right window starts at {}", right_bb.min_x);
    assert!((left_bb.max_y - 720.0).abs() < 3.0, "left bottom at {}", left_bb.max_y);
    assert!((right_bb.max_y - 720.0).abs() < 3.0, "right bottom at {}", right_bb.max_y);
}

#[test]
fn test_shrinking_output_keeps_every_window_on_screen() {
    let config = Config::default();
    let (mut world, mut ticker, clock) = ticked_world(&config);
    let bounds = world.add_output_bounds(0.0, 0.0, 1600.0, 900.0);
    let windows: Vec<BodyHandle> = [200.0, 800.0, 1400.0]
        .into_iter()
        .map(|x| world.add_window((x, -200.0), (150.0, 100.0), 0.0))
        .collect();
    run_for(&mut world, &mut ticker, &clock, 5);

    world.replace_output_bounds(bounds, 0.0, 0.0, 800.0, 600.0);
    run_for(&mut world, &mut ticker, &clock, 8);

    for body in windows {
        let bb = world.pose(body).unwrap().bounding_box(150.0, 100.0);
        assert!(bb.min_x >= -3.0 && bb.max_x <= 803.0, "x range {}..{}", bb.min_x, bb.max_x);
        assert!(bb.max_y <= 603.0 && bb.max_y > 0.0, "bottom edge at {}", bb.max_y);
    }
}

#[test]
fn test_unmapped_window_resumes_where_it_stopped() {
    let config = Config::default();
    let (mut world, mut ticker, clock) = ticked_world(&config);
    world.add_output_bounds(0.0, 0.0, 800.0, 600.0);
    let body = world.add_window((400.0, -300.0), (100.0, 100.0), 0.0);

    run_for(&mut world, &mut ticker, &clock, 1);
    world.set_window_enabled(body, false);
    let frozen = world.pose(body).unwrap();
    run_for(&mut world, &mut ticker, &clock, 2);
    assert_eq!(world.pose(body).unwrap(), frozen);

    world.set_window_enabled(body, true);
    run_for(&mut world, &mut ticker, &clock, 4);
    assert!((bottom(&world, body, 100.0, 100.0) - 600.0).abs() < 3.0);
}

// ── Fixed-step accounting ───────────────────────────────────

#[test]
fn test_stalled_compositor_runs_bounded_substeps() {
    let config = Config::default();
    let (_, mut ticker, clock) = ticked_world(&config);

    clock.advance(Duration::from_secs(10));
    assert_eq!(ticker.tick(), config.physics.max_substeps);

    // The backlog was dropped, so a normal frame afterwards is a single step.
    clock.advance(Duration::from_millis(17));
    assert_eq!(ticker.tick(), 1);
}

// ── Configuration ───────────────────────────────────────────

#[test]
fn test_config_file_drives_world() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(
        file,
        r#"
[physics]
gravity = [-900.0, 0.0]
tick_hz = 120

[keybindings]
quit = "Super+q"

[startup]
command = "foot"
"#
    )
    .unwrap();

    let config = Config::load_or_default(Some(file.path())).unwrap();
    assert_eq!(config.physics.tick_hz, 120);
    assert_eq!(config.startup.command.as_deref(), Some("foot"));
    // Untouched sections keep their defaults.
    assert_eq!(config.keybindings.focus_latest, "Alt+F1");

    let world = PhysicsWorld::new(&config.physics);
    assert_eq!(world.gravity(), [-900.0, 0.0]);

    let bindings = Keybindings::from_config(&config.keybindings).unwrap();
    let logo = ModifiersState {
        logo: true,
        ..Default::default()
    };
    assert_eq!(bindings.action_for(&logo, &[Keysym::q]), Some(Action::Quit));
}

#[test]
fn test_missing_explicit_config_is_an_error() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("absent.toml");
    match Config::load_or_default(Some(&path)) {
        Err(ConfigError::Io { path: p, .. }) => assert_eq!(p, path),
        other => panic!("expected Io error, got {:?}", other.map(|_| ())),
    }
}

#[test]
fn test_invalid_config_file_is_rejected() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(file, "[physics]\ntick_hz = 0").unwrap();
    assert!(matches!(
        Config::load(file.path()),
        Err(ConfigError::Invalid(_))
    ));
}

// ── Rendering geometry of a simulated window ────────────────

#[test]
fn test_settled_window_draws_inside_output() {
    let config = Config::default();
    let (mut world, mut ticker, clock) = ticked_world(&config);
    world.add_output_bounds(1920.0, 0.0, 1280.0, 720.0);
    let body = world.add_window((2560.0, -400.0), (320.0, 240.0), 0.5);
    run_for(&mut world, &mut ticker, &clock, 8);

    let pose = world.pose(body).unwrap();
    let geo = window_draw_geometry(pose, Size::from((320, 240)), Point::from((1920, 0)), 1.0);
    assert!(geo.dest.loc.x >= -3 && geo.dest.loc.x + geo.dest.size.w <= 1283);
    assert!(geo.dest.loc.y + geo.dest.size.h <= 723);
}
