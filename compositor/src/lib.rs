//! gravwm: a Wayland compositor where windows are rigid bodies.
//!
//! Toplevels fall under gravity, tumble and come to rest against a floor
//! and walls fencing each output. This library crate exposes the
//! compositor's core modules for integration testing. The binary entry
//! point lives in `main.rs`.

pub mod backend;
pub mod clock;
pub mod config;
pub(crate) mod handlers;
pub mod input;
pub mod keybindings;
pub mod layout;
pub mod physics;
pub mod render;
pub mod spawn;
pub mod state;
