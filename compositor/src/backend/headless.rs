//! Headless backend: virtual outputs, no rendering.
//!
//! The simulation still runs on its fixed tick and clients still receive
//! frame callbacks, so windows fall and settle exactly as they would on
//! screen. Used for CI and for driving the compositor from scripts.

use crate::{spawn, state::GravState};
use crate::config::Config;
use super::{create_output, HeadlessOptions};
use smithay::reexports::{
    calloop::{
        signals::{Signal, Signals},
        timer::{TimeoutAction, Timer},
        EventLoop,
    },
    wayland_server::Display,
};
use std::time::Duration;
use tracing::info;

const STATUS_INTERVAL: Duration = Duration::from_secs(60);
const POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Create `options.output_count` virtual outputs side by side.
pub fn create_virtual_outputs(state: &mut GravState, options: &HeadlessOptions) {
    let count = options.output_count.max(1);
    for i in 0..count {
        let output = create_output(
            &format!("headless-{}", i),
            "Headless",
            (options.width, options.height).into(),
        );
        state.add_output(&output, None);
    }
    info!(
        "Created {} virtual output(s) at {}x{}",
        count, options.width, options.height
    );
}

pub fn run(
    config: Config,
    socket_name: Option<String>,
    options: HeadlessOptions,
) -> anyhow::Result<()> {
    let mut event_loop = EventLoop::<GravState>::try_new()?;
    let display = Display::<GravState>::new()?;
    let mut state = GravState::new(&display, event_loop.handle(), config)?;

    create_virtual_outputs(&mut state, &options);
    state.init_wayland_listener(display, socket_name)?;

    // Signal handling: SIGTERM and SIGINT for graceful shutdown
    let signals = Signals::new(&[Signal::SIGTERM, Signal::SIGINT])
        .map_err(|e| anyhow::anyhow!("failed to create signal source: {}", e))?;
    event_loop
        .handle()
        .insert_source(signals, |event, _, state: &mut GravState| {
            info!("Received signal {:?}, shutting down", event.signal());
            state.quit();
        })
        .map_err(|e| anyhow::anyhow!("failed to register signal handler: {}", e.error))?;

    if let Some(after) = options.exit_after {
        info!("Will exit after {:?}", after);
        event_loop
            .handle()
            .insert_source(Timer::from_duration(after), |_, _, state: &mut GravState| {
                info!("Headless exit timer fired");
                state.quit();
                TimeoutAction::Drop
            })
            .map_err(|e| anyhow::anyhow!("failed to register exit timer: {}", e.error))?;
    }

    let step = state.ticker.step();
    event_loop
        .handle()
        .insert_source(Timer::from_duration(step), move |_, _, state: &mut GravState| {
            state.tick();
            let outputs: Vec<_> = state.outputs.iter().map(|e| e.output.clone()).collect();
            for output in &outputs {
                state.send_frame_callbacks(output);
            }
            TimeoutAction::ToDuration(step)
        })
        .map_err(|e| anyhow::anyhow!("failed to register tick timer: {}", e.error))?;

    event_loop
        .handle()
        .insert_source(Timer::from_duration(STATUS_INTERVAL), |_, _, state: &mut GravState| {
            spawn::reap(&mut state.children);
            info!(
                "Headless status: {} window(s), {} mapped, {} bodies, {} output(s), {} child process(es)",
                state.toplevels.len(),
                state.stacking.len(),
                state.physics.window_count(),
                state.outputs.len(),
                state.children.len()
            );
            TimeoutAction::ToDuration(STATUS_INTERVAL)
        })
        .map_err(|e| anyhow::anyhow!("failed to register status timer: {}", e.error))?;

    state.run_startup_command();
    info!("Headless backend initialized, entering event loop");

    while state.running {
        event_loop.dispatch(Some(POLL_INTERVAL), &mut state)?;
        state.display_handle.flush_clients()?;
    }

    info!(
        "Headless backend shutting down ({} window(s))",
        state.toplevels.len()
    );
    Ok(())
}
