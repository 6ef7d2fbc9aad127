//! Compositor state: the central struct holding all Smithay state.
//!
//! A single `GravState` owns everything and is passed as `&mut self` to
//! all handler trait implementations. Window placement is not decided
//! here: each mapped toplevel owns a rigid body and the space simply
//! mirrors where the simulation put it.

use smithay::{
    desktop::{PopupManager, Space, Window},
    input::{
        keyboard::XkbConfig,
        pointer::{CursorIcon, CursorImageStatus},
        Seat, SeatState,
    },
    output::{Mode as OutputMode, Output},
    reexports::{
        calloop::{generic::Generic, Interest, LoopHandle, Mode, PostAction},
        wayland_server::{
            backend::{ClientData, ClientId, DisconnectReason},
            protocol::wl_surface::WlSurface,
            Display, DisplayHandle,
        },
    },
    utils::{Logical, Physical, Point, Rectangle, Size, SERIAL_COUNTER},
    wayland::{
        compositor::{CompositorClientState, CompositorState},
        output::OutputManagerState,
        selection::data_device::DataDeviceState,
        shell::xdg::{ToplevelSurface, XdgShellState},
        shm::ShmState,
        socket::ListeningSocketSource,
    },
};
use std::{
    ffi::OsString,
    process::Child,
    sync::{
        atomic::{AtomicU64, Ordering},
        Arc,
    },
    time::Duration,
};
use tracing::{debug, info, warn};

use crate::clock::{Clock, FixedStepper, FrameTicker, SystemClock};
use crate::config::Config;
use crate::keybindings::Keybindings;
use crate::layout::{self, Stacking, WindowBody};
use crate::physics::{OutputBounds, PhysicsWorld, Pose};
use crate::spawn;

/// Monotonically increasing toplevel ID generator.
static NEXT_TOPLEVEL_ID: AtomicU64 = AtomicU64::new(1);

pub fn next_toplevel_id() -> u64 {
    NEXT_TOPLEVEL_ID.fetch_add(1, Ordering::Relaxed)
}

/// An output and the static colliders fencing it in.
#[derive(Debug)]
pub struct OutputEntry {
    pub output: Output,
    pub bounds: OutputBounds,
}

/// A client window and its physics bookkeeping.
#[derive(Debug)]
pub struct Toplevel {
    pub id: u64,
    pub window: Window,
    pub sim: WindowBody,
}

impl Toplevel {
    pub fn wl_surface(&self) -> Option<&WlSurface> {
        self.window.toplevel().map(|t| t.wl_surface())
    }
}

/// Central compositor state.
pub struct GravState {
    // Wayland core
    pub display_handle: DisplayHandle,
    pub loop_handle: LoopHandle<'static, Self>,
    pub socket_name: Option<OsString>,

    // Protocol states
    pub compositor_state: CompositorState,
    pub xdg_shell_state: XdgShellState,
    pub shm_state: ShmState,
    pub output_manager_state: OutputManagerState,
    pub seat_state: SeatState<Self>,
    pub data_device_state: DataDeviceState,
    pub popups: PopupManager,

    // Input
    pub seat: Seat<Self>,
    pub pointer_location: Point<f64, Logical>,
    /// Last cursor image requested by the focused client.
    pub cursor_status: CursorImageStatus,
    pub keybindings: Keybindings,

    // Window management
    pub space: Space<Window>,
    pub outputs: Vec<OutputEntry>,
    /// Every live toplevel, in creation order.
    pub toplevels: Vec<Toplevel>,
    pub stacking: Stacking,
    pub focused: Option<u64>,

    // Simulation
    pub physics: PhysicsWorld,
    pub ticker: FrameTicker,

    pub config: Config,
    pub children: Vec<Child>,
    pub running: bool,
}

impl GravState {
    pub fn new(
        display: &Display<Self>,
        loop_handle: LoopHandle<'static, Self>,
        config: Config,
    ) -> anyhow::Result<Self> {
        Self::with_clock(display, loop_handle, config, Arc::new(SystemClock))
    }

    pub fn with_clock(
        display: &Display<Self>,
        loop_handle: LoopHandle<'static, Self>,
        config: Config,
        clock: Arc<dyn Clock>,
    ) -> anyhow::Result<Self> {
        let display_handle = display.handle();

        let compositor_state = CompositorState::new::<Self>(&display_handle);
        let xdg_shell_state = XdgShellState::new::<Self>(&display_handle);
        let shm_state = ShmState::new::<Self>(&display_handle, vec![]);
        let output_manager_state = OutputManagerState::new_with_xdg_output::<Self>(&display_handle);
        let mut seat_state = SeatState::new();
        let data_device_state = DataDeviceState::new::<Self>(&display_handle);

        let mut seat = seat_state.new_wl_seat(&display_handle, "seat0");
        let kb = &config.keyboard;
        let xkb_config = XkbConfig {
            layout: kb.layout.as_deref().unwrap_or_default(),
            variant: kb.variant.as_deref().unwrap_or_default(),
            options: kb.options.clone(),
            ..XkbConfig::default()
        };
        seat.add_keyboard(xkb_config, kb.repeat_delay_ms, kb.repeat_rate)
            .map_err(|e| anyhow::anyhow!("failed to set up keyboard: {:?}", e))?;
        seat.add_pointer();

        let keybindings = Keybindings::from_config(&config.keybindings)
            .map_err(|e| anyhow::anyhow!("invalid keybinding: {}", e))?;

        let physics = PhysicsWorld::new(&config.physics);
        let ticker = FrameTicker::new(
            clock,
            FixedStepper::new(config.physics.tick_hz, config.physics.max_substeps),
        );

        info!("GravState initialized");

        Ok(Self {
            display_handle,
            loop_handle,
            socket_name: None,
            compositor_state,
            xdg_shell_state,
            shm_state,
            output_manager_state,
            seat_state,
            data_device_state,
            popups: PopupManager::default(),
            seat,
            pointer_location: Point::from((0.0, 0.0)),
            cursor_status: CursorImageStatus::Named(CursorIcon::Default),
            keybindings,
            space: Space::default(),
            outputs: Vec::new(),
            toplevels: Vec::new(),
            stacking: Stacking::default(),
            focused: None,
            physics,
            ticker,
            config,
            children: Vec::new(),
            running: true,
        })
    }

    /// Bind the Wayland socket and hook the display into the event loop.
    ///
    /// Exports `WAYLAND_DISPLAY` for child processes and returns the socket name.
    pub fn init_wayland_listener(
        &mut self,
        display: Display<Self>,
        socket_name: Option<String>,
    ) -> anyhow::Result<OsString> {
        let listening_socket = match socket_name {
            Some(ref name) => ListeningSocketSource::with_name(name)
                .map_err(|e| anyhow::anyhow!("failed to bind wayland socket '{}': {}", name, e))?,
            None => ListeningSocketSource::new_auto()
                .map_err(|e| anyhow::anyhow!("failed to bind wayland socket: {}", e))?,
        };
        let socket_name = listening_socket.socket_name().to_os_string();

        self.loop_handle
            .insert_source(listening_socket, |client_stream, _, state: &mut GravState| {
                if let Err(e) = state
                    .display_handle
                    .insert_client(client_stream, Arc::new(ClientState::default()))
                {
                    warn!("Failed to accept wayland client: {}", e);
                }
            })
            .map_err(|e| anyhow::anyhow!("failed to register listening socket: {}", e.error))?;

        self.loop_handle
            .insert_source(
                Generic::new(display, Interest::READ, Mode::Level),
                |_, display, state: &mut GravState| {
                    // Safety: the display is never dropped while the source is registered.
                    unsafe {
                        display.get_mut().dispatch_clients(state)?;
                    }
                    Ok(PostAction::Continue)
                },
            )
            .map_err(|e| anyhow::anyhow!("failed to register display source: {}", e.error))?;

        info!("Wayland socket: {}", socket_name.to_string_lossy());
        std::env::set_var("WAYLAND_DISPLAY", &socket_name);
        self.socket_name = Some(socket_name.clone());
        Ok(socket_name)
    }

    /// Launch the configured startup command, if any.
    pub fn run_startup_command(&mut self) {
        let (Some(command), Some(socket)) =
            (self.config.startup.command.clone(), self.socket_name.clone())
        else {
            return;
        };
        match spawn::spawn_command(&command, &socket) {
            Ok(child) => self.children.push(child),
            Err(e) => warn!(command, "failed to spawn startup command: {}", e),
        }
    }

    // ── Outputs ─────────────────────────────────────────────

    fn output_geometries(&self) -> impl Iterator<Item = Rectangle<i32, Logical>> + '_ {
        self.outputs
            .iter()
            .filter_map(|e| self.space.output_geometry(&e.output))
    }

    /// Advertise an output, lay it out and fence it with a floor and walls.
    ///
    /// The output's current mode must already be set.
    pub fn add_output(&mut self, output: &Output, location: Option<Point<i32, Logical>>) {
        let location = location.unwrap_or_else(|| layout::next_output_location(self.output_geometries()));
        output.create_global::<Self>(&self.display_handle);
        output.change_current_state(None, None, None, Some(location));
        self.space.map_output(output, location);

        let Some(geo) = self.space.output_geometry(output) else {
            warn!(output = output.name(), "output has no mode, skipping physics bounds");
            return;
        };
        let bounds = self.physics.add_output_bounds(
            geo.loc.x as f32,
            geo.loc.y as f32,
            geo.size.w as f32,
            geo.size.h as f32,
        );
        info!(
            output = output.name(),
            "output added: {}x{} at ({}, {})",
            geo.size.w,
            geo.size.h,
            geo.loc.x,
            geo.loc.y
        );
        self.outputs.push(OutputEntry {
            output: output.clone(),
            bounds,
        });
    }

    /// Switch `output` to a new mode size and refence it.
    pub fn update_output_mode(&mut self, output: &Output, size: Size<i32, Physical>) {
        let mode = OutputMode {
            size,
            refresh: output.current_mode().map(|m| m.refresh).unwrap_or(60_000),
        };
        output.change_current_state(Some(mode), None, None, None);
        output.set_preferred(mode);
        self.update_output_bounds(output);
    }

    /// Refence an output after its mode changed. Windows left outside the
    /// new rectangle are dropped back in from above.
    pub fn update_output_bounds(&mut self, output: &Output) {
        let Some(idx) = self.outputs.iter().position(|e| &e.output == output) else {
            return;
        };
        let Some(geo) = self.space.output_geometry(output) else {
            return;
        };
        let old = self.outputs[idx].bounds;
        self.outputs[idx].bounds = self.physics.replace_output_bounds(
            old,
            geo.loc.x as f32,
            geo.loc.y as f32,
            geo.size.w as f32,
            geo.size.h as f32,
        );
        debug!(output = output.name(), ?geo, "output bounds rebuilt");
        let ids: Vec<u64> = self.stacking.ids().to_vec();
        for id in ids {
            self.sync_window(id);
        }
    }

    /// Union of all output geometries; the cursor is kept inside it.
    pub fn output_union(&self) -> Option<Rectangle<i32, Logical>> {
        self.output_geometries().reduce(|acc, geo| acc.merge(geo))
    }

    pub fn clamp_to_outputs(&self, point: Point<f64, Logical>) -> Point<f64, Logical> {
        match self.output_union() {
            Some(geo) => layout::clamp_to_rect(point, geo),
            None => point,
        }
    }

    // ── Toplevel lifecycle ──────────────────────────────────

    /// Register a new toplevel. It gets a body only once it commits a buffer.
    pub fn add_toplevel(&mut self, surface: ToplevelSurface) -> u64 {
        let id = next_toplevel_id();
        let first = self
            .outputs
            .first()
            .and_then(|e| self.space.output_geometry(&e.output));
        let spawn = layout::spawn_point(first, self.config.physics.spawn_height);

        self.toplevels.push(Toplevel {
            id,
            window: Window::new_wayland_window(surface),
            sim: WindowBody::new(spawn),
        });
        debug!(id, ?spawn, "toplevel created");
        id
    }

    pub fn toplevel_index(&self, surface: &WlSurface) -> Option<usize> {
        self.toplevels
            .iter()
            .position(|t| t.wl_surface() == Some(surface))
    }

    pub fn toplevel(&self, id: u64) -> Option<&Toplevel> {
        self.toplevels.iter().find(|t| t.id == id)
    }

    /// The toplevel committed a buffer of `size`.
    pub fn map_toplevel(&mut self, idx: usize, size: Size<i32, Logical>) {
        let rotation = rand::random::<f32>() * self.config.physics.max_initial_rotation;
        let toplevel = &mut self.toplevels[idx];
        let id = toplevel.id;
        let change = toplevel.sim.map(&mut self.physics, size, rotation);
        if change.shown {
            debug!(id, created = change.created, "toplevel mapped");
            self.stacking.raise(id);
            self.sync_window(id);
        }
    }

    /// The toplevel attached a null buffer: hide it and freeze its body.
    pub fn unmap_toplevel(&mut self, idx: usize) {
        let toplevel = &mut self.toplevels[idx];
        if !toplevel.sim.unmap(&mut self.physics) {
            return;
        }
        let id = toplevel.id;
        let window = toplevel.window.clone();
        self.stacking.remove(id);
        self.space.unmap_elem(&window);
        if self.focused == Some(id) {
            self.focused = None;
        }
        debug!(id, "toplevel unmapped");
    }

    pub fn destroy_toplevel(&mut self, surface: &WlSurface) {
        let Some(idx) = self.toplevel_index(surface) else {
            return;
        };
        let mut toplevel = self.toplevels.remove(idx);
        toplevel.sim.release(&mut self.physics);
        self.stacking.remove(toplevel.id);
        self.space.unmap_elem(&toplevel.window);
        if self.focused == Some(toplevel.id) {
            self.focused = None;
        }
        info!(id = toplevel.id, "toplevel destroyed");
    }

    // ── Focus ───────────────────────────────────────────────

    /// Activate `id` and give it keyboard focus, deactivating the previous one.
    pub fn focus_toplevel(&mut self, id: u64) {
        if self.focused == Some(id) {
            return;
        }
        let Some(surface) = self.toplevel(id).and_then(|t| t.wl_surface().cloned()) else {
            return;
        };

        if let Some(prev) = self.focused.and_then(|p| self.toplevel(p)) {
            prev.window.set_activated(false);
            if let Some(t) = prev.window.toplevel() {
                t.send_pending_configure();
            }
        }
        if let Some(t) = self.toplevel(id) {
            t.window.set_activated(true);
            if let Some(t) = t.window.toplevel() {
                t.send_pending_configure();
            }
        }

        self.focused = Some(id);
        if let Some(keyboard) = self.seat.get_keyboard() {
            keyboard.set_focus(self, Some(surface), SERIAL_COUNTER.next_serial());
        }
        debug!(id, "toplevel focused");
    }

    /// Focus the most recently mapped toplevel.
    pub fn focus_latest(&mut self) {
        if let Some(id) = self.stacking.top() {
            self.focus_toplevel(id);
        }
    }

    // ── Simulation ──────────────────────────────────────────

    /// Advance physics by however many fixed steps are due and mirror the
    /// result into the space.
    pub fn tick(&mut self) {
        let steps = self.ticker.tick();
        let dt = self.ticker.step_secs();
        for _ in 0..steps {
            self.physics.step(dt);
        }
        if steps > 0 {
            let ids: Vec<u64> = self.stacking.ids().to_vec();
            for id in ids {
                self.sync_window(id);
            }
        }
        self.space.refresh();
        self.popups.cleanup();
    }

    /// Place a window in the space at the bounding box of its rotated body.
    fn sync_window(&mut self, id: u64) {
        let Some((window, pose, (w, h))) = self.toplevel(id).and_then(|t| {
            let pose = t.sim.pose(&self.physics)?;
            Some((t.window.clone(), pose, t.sim.size_f32()?))
        }) else {
            return;
        };
        let bb = pose.bounding_box(w, h);
        self.space
            .map_element(window, (bb.min_x.round() as i32, bb.min_y.round() as i32), false);
    }

    /// Mapped toplevels bottom to top, with their current pose.
    pub fn visible_toplevels(&self) -> Vec<(&Toplevel, Pose)> {
        self.stacking
            .ids()
            .iter()
            .filter_map(|id| {
                let t = self.toplevel(*id)?;
                let pose = t.sim.pose(&self.physics)?;
                Some((t, pose))
            })
            .collect()
    }

    /// Topmost toplevel under `point`, with the surface origin to report so
    /// that `point - origin` equals the pointer position in the window's own
    /// (rotated) coordinates.
    pub fn toplevel_under(
        &self,
        point: Point<f64, Logical>,
    ) -> Option<(u64, WlSurface, Point<f64, Logical>)> {
        let visible = self.visible_toplevels();
        let windows = visible
            .iter()
            .filter_map(|(t, pose)| Some((t.id, *pose, t.sim.size_f32()?)));
        let (id, origin) = layout::topmost_hit(windows, point)?;
        let surface = self.toplevel(id)?.wl_surface()?.clone();
        Some((id, surface, origin))
    }

    /// Send frame-done to every visible toplevel on `output`.
    pub fn send_frame_callbacks(&self, output: &Output) {
        let time = self.ticker.elapsed();
        for (toplevel, _) in self.visible_toplevels() {
            toplevel
                .window
                .send_frame(output, time, Some(Duration::ZERO), |_, _| Some(output.clone()));
        }
    }

    pub fn quit(&mut self) {
        info!("quit requested");
        self.running = false;
    }
}

/// Per-client state required by Smithay's CompositorHandler.
#[derive(Default)]
pub struct ClientState {
    pub compositor_state: CompositorClientState,
}

impl ClientData for ClientState {
    fn initialized(&self, client_id: ClientId) {
        debug!(?client_id, "client connected");
    }

    fn disconnected(&self, client_id: ClientId, reason: DisconnectReason) {
        debug!(?client_id, ?reason, "client disconnected");
    }
}
