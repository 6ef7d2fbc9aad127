//! wl_compositor, wl_shm and wl_buffer handlers.
//!
//! Commits are where windows come and go: a toplevel is mapped the
//! first time it commits a buffer after its initial configure, and
//! unmapped when it attaches a null buffer.

use crate::state::{ClientState, GravState};
use smithay::{
    backend::renderer::utils::{on_commit_buffer_handler, with_renderer_surface_state},
    delegate_compositor, delegate_shm,
    desktop::PopupKind,
    reexports::wayland_server::{
        protocol::{wl_buffer::WlBuffer, wl_surface::WlSurface},
        Client,
    },
    wayland::{
        buffer::BufferHandler,
        compositor::{
            get_parent, is_sync_subsurface, with_states, CompositorClientState,
            CompositorHandler, CompositorState,
        },
        shell::xdg::XdgToplevelSurfaceData,
        shm::{ShmHandler, ShmState},
    },
};
use tracing::{trace, warn};

impl CompositorHandler for GravState {
    fn compositor_state(&mut self) -> &mut CompositorState {
        &mut self.compositor_state
    }

    fn client_compositor_state<'a>(&self, client: &'a Client) -> &'a CompositorClientState {
        match client.get_data::<ClientState>() {
            Some(data) => &data.compositor_state,
            None => panic!("client inserted without ClientState"),
        }
    }

    fn commit(&mut self, surface: &WlSurface) {
        on_commit_buffer_handler::<Self>(surface);

        if !is_sync_subsurface(surface) {
            let mut root = surface.clone();
            while let Some(parent) = get_parent(&root) {
                root = parent;
            }
            if let Some(idx) = self.toplevel_index(&root) {
                self.toplevels[idx].window.on_commit();
            }
        }

        self.handle_toplevel_commit(surface);
        self.handle_popup_commit(surface);
    }
}

impl GravState {
    fn handle_toplevel_commit(&mut self, surface: &WlSurface) {
        let Some(idx) = self.toplevel_index(surface) else {
            return;
        };

        let initial_configure_sent = with_states(surface, |states| {
            states
                .data_map
                .get::<XdgToplevelSurfaceData>()
                .and_then(|data| data.lock().ok().map(|d| d.initial_configure_sent))
                .unwrap_or(true)
        });
        if !initial_configure_sent {
            if let Some(toplevel) = self.toplevels[idx].window.toplevel() {
                toplevel.send_configure();
            }
            return;
        }

        let size = with_renderer_surface_state(surface, |state| state.surface_size()).flatten();
        match size {
            Some(size) if size.w > 0 && size.h > 0 => self.map_toplevel(idx, size),
            _ => self.unmap_toplevel(idx),
        }
    }

    fn handle_popup_commit(&mut self, surface: &WlSurface) {
        self.popups.commit(surface);
        if let Some(PopupKind::Xdg(popup)) = self.popups.find_popup(surface) {
            if !popup.is_initial_configure_sent() {
                trace!("sending initial popup configure");
                if let Err(e) = popup.send_configure() {
                    warn!("initial popup configure failed: {:?}", e);
                }
            }
        }
    }
}

impl BufferHandler for GravState {
    fn buffer_destroyed(&mut self, _buffer: &WlBuffer) {}
}

impl ShmHandler for GravState {
    fn shm_state(&self) -> &ShmState {
        &self.shm_state
    }
}

delegate_compositor!(GravState);
delegate_shm!(GravState);
