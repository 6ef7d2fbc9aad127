//! wl_seat handler: input focus, clipboard and output advertisement.

use crate::state::GravState;
use smithay::{
    delegate_data_device, delegate_output, delegate_seat,
    input::{
        pointer::{CursorIcon, CursorImageStatus},
        Seat, SeatHandler, SeatState,
    },
    reexports::wayland_server::{protocol::wl_surface::WlSurface, Resource},
    wayland::{
        output::OutputHandler,
        selection::{
            data_device::{
                set_data_device_focus, ClientDndGrabHandler, DataDeviceHandler, DataDeviceState,
                ServerDndGrabHandler,
            },
            SelectionHandler,
        },
    },
};
use tracing::{debug, trace};

/// Cursor to show on the host for `status`, or `None` to hide it.
///
/// Client cursor surfaces are not composited, so they fall back to the
/// default arrow.
pub(crate) fn host_cursor_icon(status: &CursorImageStatus) -> Option<CursorIcon> {
    match status {
        CursorImageStatus::Hidden => None,
        CursorImageStatus::Named(icon) => Some(*icon),
        CursorImageStatus::Surface(_) => Some(CursorIcon::Default),
    }
}

impl SeatHandler for GravState {
    type KeyboardFocus = WlSurface;
    type PointerFocus = WlSurface;
    type TouchFocus = WlSurface;

    fn seat_state(&mut self) -> &mut SeatState<Self> {
        &mut self.seat_state
    }

    fn cursor_image(&mut self, _seat: &Seat<Self>, image: CursorImageStatus) {
        trace!(?image, "cursor image changed");
        self.cursor_status = image;
    }

    fn focus_changed(&mut self, seat: &Seat<Self>, focused: Option<&WlSurface>) {
        debug!(surface = ?focused.map(|s| s.id()), "keyboard focus changed");
        let client = focused.and_then(|s| self.display_handle.get_client(s.id()).ok());
        set_data_device_focus(&self.display_handle, seat, client);
    }
}

impl SelectionHandler for GravState {
    type SelectionUserData = ();
}

impl DataDeviceHandler for GravState {
    fn data_device_state(&self) -> &DataDeviceState {
        &self.data_device_state
    }
}

impl ClientDndGrabHandler for GravState {}
impl ServerDndGrabHandler for GravState {}

impl OutputHandler for GravState {}

delegate_seat!(GravState);
delegate_data_device!(GravState);
delegate_output!(GravState);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_host_cursor_follows_client_request() {
        assert_eq!(host_cursor_icon(&CursorImageStatus::Hidden), None);
        assert_eq!(
            host_cursor_icon(&CursorImageStatus::Named(CursorIcon::Text)),
            Some(CursorIcon::Text)
        );
        assert_eq!(
            host_cursor_icon(&CursorImageStatus::Named(CursorIcon::Default)),
            Some(CursorIcon::Default)
        );
    }
}
