//! xdg_wm_base handler: toplevel and popup lifecycle.

use crate::state::GravState;
use smithay::{
    delegate_xdg_shell,
    desktop::PopupKind,
    reexports::wayland_server::protocol::wl_seat::WlSeat,
    utils::Serial,
    wayland::shell::xdg::{
        PopupSurface, PositionerState, ToplevelSurface, XdgShellHandler, XdgShellState,
    },
};
use tracing::{debug, warn};

impl XdgShellHandler for GravState {
    fn xdg_shell_state(&mut self) -> &mut XdgShellState {
        &mut self.xdg_shell_state
    }

    fn new_toplevel(&mut self, surface: ToplevelSurface) {
        // Initial configure goes out on the first commit.
        self.add_toplevel(surface);
    }

    fn toplevel_destroyed(&mut self, surface: ToplevelSurface) {
        self.destroy_toplevel(surface.wl_surface());
    }

    fn new_popup(&mut self, surface: PopupSurface, positioner: PositionerState) {
        surface.with_pending_state(|state| {
            state.geometry = positioner.get_geometry();
        });
        if let Err(e) = self.popups.track_popup(PopupKind::Xdg(surface)) {
            warn!("failed to track popup: {:?}", e);
        }
        debug!("popup created");
    }

    fn grab(&mut self, _surface: PopupSurface, _seat: WlSeat, _serial: Serial) {}

    fn reposition_request(&mut self, surface: PopupSurface, positioner: PositionerState, token: u32) {
        surface.with_pending_state(|state| {
            state.geometry = positioner.get_geometry();
            state.positioner = positioner;
        });
        surface.send_repositioned(token);
        if let Err(e) = surface.send_configure() {
            warn!("popup reposition configure failed: {:?}", e);
        }
    }
}

delegate_xdg_shell!(GravState);
