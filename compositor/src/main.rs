//! gravwm - a Wayland compositor where windows fall under gravity.

use gravwm_compositor::backend::{self, BackendType, HeadlessOptions};
use gravwm_compositor::config::{parse_gravity, parse_resolution, Config};

use anyhow::Context;
use clap::Parser;
use std::path::PathBuf;
use std::time::Duration;
use tracing::{info, warn};

#[derive(Parser, Debug)]
#[command(name = "gravwm", about = "Wayland compositor with rigid-body window physics")]
struct Cli {
    /// Backend to use: winit, headless, or auto
    #[arg(long, default_value = "auto")]
    backend: String,

    /// Wayland socket name (default: auto-assigned)
    #[arg(long)]
    wayland_socket: Option<String>,

    /// Config file (default: $XDG_CONFIG_HOME/gravwm/config.toml if present)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Command to launch once the socket is up (overrides startup.command)
    #[arg(long)]
    spawn: Option<String>,

    /// Gravity in px/s² as X,Y (overrides physics.gravity)
    #[arg(long, allow_hyphen_values = true)]
    gravity: Option<String>,

    /// Number of virtual outputs in headless mode
    #[arg(long, default_value = "1")]
    headless_outputs: u32,

    /// Virtual output resolution (WxH)
    #[arg(long, default_value = "1920x1080")]
    headless_resolution: String,

    /// Exit after N seconds (headless mode testing)
    #[arg(long)]
    headless_exit_after: Option<u64>,

    /// Show version and exit
    #[arg(long)]
    version: bool,
}

fn select_backend(name: &str) -> anyhow::Result<BackendType> {
    match name {
        #[cfg(feature = "winit")]
        "winit" => Ok(BackendType::Winit),
        "headless" => Ok(BackendType::Headless),
        "auto" => {
            #[cfg(feature = "winit")]
            {
                if std::env::var_os("DISPLAY").is_some()
                    || std::env::var_os("WAYLAND_DISPLAY").is_some()
                {
                    info!("auto-detected: running under existing display, using winit backend");
                    return Ok(BackendType::Winit);
                }
            }
            info!("auto-detected: no display found, using headless backend");
            Ok(BackendType::Headless)
        }
        #[cfg(not(feature = "winit"))]
        "winit" => anyhow::bail!(
            "backend 'winit' requires the 'winit' feature; rebuild with --features winit"
        ),
        other => anyhow::bail!("unknown backend '{}'; use winit, headless, or auto", other),
    }
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    if cli.version {
        println!("gravwm {}", env!("CARGO_PKG_VERSION"));
        return Ok(());
    }

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "gravwm=info,smithay=warn".into()),
        )
        .init();

    info!("gravwm v{} starting", env!("CARGO_PKG_VERSION"));

    let mut config = Config::load_or_default(cli.config.as_deref()).context("loading config")?;
    if let Some(command) = cli.spawn {
        config.startup.command = Some(command);
    }
    if let Some(gravity) = cli.gravity {
        config.physics.gravity = parse_gravity(&gravity)
            .with_context(|| format!("invalid --gravity '{}', expected X,Y", gravity))?;
    }
    config.validate().context("invalid configuration")?;

    let backend_type = select_backend(&cli.backend)?;
    info!("backend: {:?}", backend_type);

    let (width, height) = parse_resolution(&cli.headless_resolution).unwrap_or_else(|| {
        warn!(
            "Invalid headless resolution '{}', using 1920x1080",
            cli.headless_resolution
        );
        (1920, 1080)
    });
    let headless = HeadlessOptions {
        output_count: cli.headless_outputs,
        width,
        height,
        exit_after: cli.headless_exit_after.map(Duration::from_secs),
    };

    backend::run(backend_type, config, cli.wayland_socket, headless)
}
