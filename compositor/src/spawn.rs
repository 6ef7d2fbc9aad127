//! Launching client programs against the compositor's socket.

use std::ffi::OsStr;
use std::process::{Child, Command, Stdio};
use tracing::{debug, info, warn};

/// Run `command` through `/bin/sh -c` with `WAYLAND_DISPLAY` pointed at `socket`.
pub fn spawn_command(command: &str, socket: &OsStr) -> std::io::Result<Child> {
    let child = Command::new("/bin/sh")
        .arg("-c")
        .arg(command)
        .env("WAYLAND_DISPLAY", socket)
        .stdin(Stdio::null())
        .spawn()?;
    info!(pid = child.id(), command, "spawned client");
    Ok(child)
}

/// Drop children that have exited, logging their status.
pub fn reap(children: &mut Vec<Child>) {
    children.retain_mut(|child| match child.try_wait() {
        Ok(Some(status)) => {
            debug!(pid = child.id(), %status, "client exited");
            false
        }
        Ok(None) => true,
        Err(e) => {
            warn!(pid = child.id(), "failed to poll child: {}", e);
            false
        }
    });
}
