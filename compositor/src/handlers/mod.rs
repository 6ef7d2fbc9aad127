//! Wayland protocol handler implementations.

pub mod compositor;
pub mod seat;
pub mod xdg_shell;
