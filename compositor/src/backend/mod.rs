//! Backends: a nested winit window for development and a headless mode
//! with virtual outputs for CI.

use smithay::{
    output::{Mode as OutputMode, Output, PhysicalProperties, Subpixel},
    utils::{Physical, Size, Transform},
};
use std::time::Duration;

use crate::config::Config;

pub mod headless;
#[cfg(feature = "winit")]
pub mod winit;

/// Backend type selector.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackendType {
    #[cfg(feature = "winit")]
    Winit,
    Headless,
}

/// Virtual output layout for the headless backend.
#[derive(Debug, Clone)]
pub struct HeadlessOptions {
    /// Number of virtual outputs, laid out left to right.
    pub output_count: u32,
    pub width: i32,
    pub height: i32,
    /// Stop the event loop after this long.
    pub exit_after: Option<Duration>,
}

/// Run the compositor with the selected backend until it quits.
pub fn run(
    backend: BackendType,
    config: Config,
    socket_name: Option<String>,
    headless: HeadlessOptions,
) -> anyhow::Result<()> {
    match backend {
        #[cfg(feature = "winit")]
        BackendType::Winit => winit::run(config, socket_name),
        BackendType::Headless => headless::run(config, socket_name, headless),
    }
}

/// Create an output with a single 60 Hz mode of `size`.
pub(crate) fn create_output(name: &str, model: &str, size: Size<i32, Physical>) -> Output {
    let mode = OutputMode {
        size,
        refresh: 60_000,
    };
    let output = Output::new(
        name.to_string(),
        PhysicalProperties {
            size: (0, 0).into(),
            subpixel: Subpixel::Unknown,
            make: "gravwm".into(),
            model: model.into(),
        },
    );
    output.change_current_state(Some(mode), Some(Transform::Normal), None, None);
    output.set_preferred(mode);
    output
}
