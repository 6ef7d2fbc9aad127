//! Winit backend: development mode, the compositor runs inside a window.

use crate::{handlers::seat::host_cursor_icon, input, render::WindowRenderer, spawn, state::GravState};
use crate::config::Config;
use super::create_output;
use smithay::{
    backend::{
        renderer::gles::GlesRenderer,
        winit::{self as winit_backend, WinitEvent},
    },
    reexports::{calloop::EventLoop, wayland_server::Display},
    utils::Rectangle,
};
use std::time::Duration;
use tracing::{error, info};

pub fn run(config: Config, socket_name: Option<String>) -> anyhow::Result<()> {
    let mut event_loop = EventLoop::<GravState>::try_new()?;
    let display = Display::<GravState>::new()?;
    let mut state = GravState::new(&display, event_loop.handle(), config)?;

    let (mut backend, winit) = winit_backend::init::<GlesRenderer>()
        .map_err(|e| anyhow::anyhow!("failed to initialize winit backend: {}", e))?;

    // Output matches the window size
    let output = create_output("winit-0", "Winit", backend.window_size());
    state.add_output(&output, Some((0, 0).into()));

    state.init_wayland_listener(display, socket_name)?;

    let mut window_renderer = WindowRenderer::new();
    let mut host_cursor = host_cursor_icon(&state.cursor_status);
    backend.window().request_redraw();
    event_loop
        .handle()
        .insert_source(winit, move |event, _, state: &mut GravState| match event {
            WinitEvent::Resized { size, .. } => {
                info!("window resized to {}x{}", size.w, size.h);
                state.update_output_mode(&output, size);
            }
            WinitEvent::Input(event) => input::handle_input(state, event),
            WinitEvent::Redraw => {
                state.tick();
                let wanted = host_cursor_icon(&state.cursor_status);
                if wanted != host_cursor {
                    let window = backend.window();
                    match wanted {
                        Some(icon) => {
                            window.set_cursor(icon);
                            window.set_cursor_visible(true);
                        }
                        None => window.set_cursor_visible(false),
                    }
                    host_cursor = wanted;
                }
                let size = backend.window_size();
                let rendered = match backend.bind() {
                    Ok((renderer, mut framebuffer)) => window_renderer
                        .render_output(renderer, &mut framebuffer, size, state, &output)
                        .map_err(|e| anyhow::anyhow!("render failed: {}", e)),
                    Err(e) => Err(anyhow::anyhow!("failed to bind winit surface: {}", e)),
                };
                match rendered {
                    Ok(()) => {
                        if let Err(e) = backend.submit(Some(&[Rectangle::from_size(size)])) {
                            error!("failed to submit frame: {}", e);
                        }
                    }
                    Err(e) => error!("{:#}", e),
                }
                backend.window().request_redraw();
            }
            WinitEvent::CloseRequested => state.quit(),
            _ => {}
        })
        .map_err(|e| anyhow::anyhow!("failed to register winit source: {}", e.error))?;

    state.run_startup_command();
    info!("Winit backend initialized, entering event loop");

    while state.running {
        event_loop.dispatch(Some(Duration::from_millis(16)), &mut state)?;
        state.display_handle.flush_clients()?;
        spawn::reap(&mut state.children);
    }

    info!("Winit backend shutting down");
    Ok(())
}
