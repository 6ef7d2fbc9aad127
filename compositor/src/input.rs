//! Routes keyboard and pointer events from the backend to the seat.

use crate::keybindings::Action;
use crate::state::GravState;
use smithay::{
    backend::input::{
        AbsolutePositionEvent, Axis, AxisSource, ButtonState, Event, InputBackend, InputEvent,
        KeyState, KeyboardKeyEvent, PointerAxisEvent, PointerButtonEvent, PointerMotionEvent,
    },
    input::{
        keyboard::FilterResult,
        pointer::{AxisFrame, ButtonEvent, MotionEvent, RelativeMotionEvent},
    },
    reexports::wayland_server::protocol::wl_surface::WlSurface,
    utils::{Logical, Point, SERIAL_COUNTER},
};
use tracing::{debug, trace};

/// Scroll distance of one v120 detent step, in logical pixels.
const SCROLL_PER_DETENT: f64 = 15.0;

/// Dispatch one backend input event.
pub fn handle_input<B: InputBackend>(state: &mut GravState, event: InputEvent<B>) {
    match event {
        InputEvent::Keyboard { event } => state.on_keyboard::<B>(event),
        InputEvent::PointerMotion { event } => state.on_pointer_motion::<B>(event),
        InputEvent::PointerMotionAbsolute { event } => state.on_pointer_motion_absolute::<B>(event),
        InputEvent::PointerButton { event } => state.on_pointer_button::<B>(event),
        InputEvent::PointerAxis { event } => state.on_pointer_axis::<B>(event),
        _ => {}
    }
}

impl GravState {
    fn on_keyboard<B: InputBackend>(&mut self, event: B::KeyboardKeyEvent) {
        let Some(keyboard) = self.seat.get_keyboard() else {
            return;
        };
        let serial = SERIAL_COUNTER.next_serial();
        let time = Event::time_msec(&event);
        let key_state = event.state();

        let action = keyboard.input::<Action, _>(
            self,
            event.key_code(),
            key_state,
            serial,
            time,
            |state, modifiers, handle| {
                if key_state == KeyState::Pressed {
                    if let Some(action) = state.keybindings.action_for(modifiers, &handle.raw_syms()) {
                        return FilterResult::Intercept(action);
                    }
                }
                FilterResult::Forward
            },
        );

        if let Some(action) = action {
            debug!(?action, "keybinding triggered");
            self.run_action(action);
        }
    }

    pub fn run_action(&mut self, action: Action) {
        match action {
            Action::Quit => self.quit(),
            Action::FocusLatest => self.focus_latest(),
        }
    }

    fn on_pointer_motion<B: InputBackend>(&mut self, event: B::PointerMotionEvent) {
        let delta = event.delta();
        let location = self.clamp_to_outputs(self.pointer_location + delta);
        let time = event.time_msec();
        self.pointer_moved(location, time);

        if let Some(pointer) = self.seat.get_pointer() {
            let under = self.surface_under(location);
            pointer.relative_motion(
                self,
                under,
                &RelativeMotionEvent {
                    delta,
                    delta_unaccel: event.delta_unaccel(),
                    utime: event.time(),
                },
            );
            pointer.frame(self);
        }
    }

    fn on_pointer_motion_absolute<B: InputBackend>(&mut self, event: B::PointerMotionAbsoluteEvent) {
        let Some(geo) = self
            .outputs
            .first()
            .and_then(|e| self.space.output_geometry(&e.output))
        else {
            return;
        };
        let location = event.position_transformed(geo.size) + geo.loc.to_f64();
        self.pointer_moved(location, event.time_msec());
        if let Some(pointer) = self.seat.get_pointer() {
            pointer.frame(self);
        }
    }

    fn surface_under(&self, location: Point<f64, Logical>) -> Option<(WlSurface, Point<f64, Logical>)> {
        self.toplevel_under(location)
            .map(|(_, surface, origin)| (surface, origin))
    }

    fn pointer_moved(&mut self, location: Point<f64, Logical>, time: u32) {
        self.pointer_location = location;
        let Some(pointer) = self.seat.get_pointer() else {
            return;
        };
        let under = self.surface_under(location);
        trace!(x = location.x, y = location.y, "pointer moved");
        pointer.motion(
            self,
            under,
            &MotionEvent {
                location,
                serial: SERIAL_COUNTER.next_serial(),
                time,
            },
        );
    }

    fn on_pointer_button<B: InputBackend>(&mut self, event: B::PointerButtonEvent) {
        let Some(pointer) = self.seat.get_pointer() else {
            return;
        };
        let serial = SERIAL_COUNTER.next_serial();
        let button_state = event.state();

        if button_state == ButtonState::Pressed && !pointer.is_grabbed() {
            if let Some((id, _, _)) = self.toplevel_under(self.pointer_location) {
                self.focus_toplevel(id);
            }
        }

        pointer.button(
            self,
            &ButtonEvent {
                button: event.button_code(),
                state: button_state,
                serial,
                time: event.time_msec(),
            },
        );
        pointer.frame(self);
    }

    fn on_pointer_axis<B: InputBackend>(&mut self, event: B::PointerAxisEvent) {
        let Some(pointer) = self.seat.get_pointer() else {
            return;
        };
        let source = event.source();
        let mut frame = AxisFrame::new(event.time_msec()).source(source);

        for axis in [Axis::Horizontal, Axis::Vertical] {
            let v120 = event.amount_v120(axis);
            let amount = axis_amount(event.amount(axis), v120);
            if amount != 0.0 {
                frame = frame.value(axis, amount);
                if let Some(discrete) = v120 {
                    frame = frame.v120(axis, discrete as i32);
                }
            }
            if source == AxisSource::Finger && event.amount(axis) == Some(0.0) {
                frame = frame.stop(axis);
            }
        }

        pointer.axis(self, frame);
        pointer.frame(self);
    }
}

/// Scroll amount for one axis: the continuous value, else the v120 value
/// converted to pixels.
fn axis_amount(continuous: Option<f64>, v120: Option<f64>) -> f64 {
    continuous.unwrap_or_else(|| v120.unwrap_or(0.0) * SCROLL_PER_DETENT / 120.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_axis_amount_prefers_continuous() {
        assert_eq!(axis_amount(Some(3.5), Some(120.0)), 3.5);
    }

    #[test]
    fn test_axis_amount_from_detents() {
        assert_eq!(axis_amount(None, Some(120.0)), SCROLL_PER_DETENT);
        assert_eq!(axis_amount(None, Some(-240.0)), -2.0 * SCROLL_PER_DETENT);
        assert_eq!(axis_amount(None, None), 0.0);
    }
}
