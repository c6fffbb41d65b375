//! Screen-Relay server: entry point.
//!
//! Captures an X11 display (or a single window), JPEG-encodes every frame
//! under an adaptive size budget, and streams the frames to browser viewers
//! over WebSocket.  Viewers send short text commands back to change the
//! budget or frame rate, press keys, and move or click the pointer.
//!
//! # Usage
//!
//! ```text
//! screen-relay-server [OPTIONS]
//!
//! Options:
//!       --config <PATH>                TOML configuration file
//!   -w, --window <HEX_ID>              Capture one window instead of the whole display
//!   -c, --capture-multiplier <FACTOR>  Capture rate as a multiple of the send rate [default: 2]
//!       --fps <FPS>                    Frames per second sent to viewers [default: 60]
//!       --budget-kib <KIB>             Encoded frame size budget in KiB [default: 60]
//!       --bind <IP>                    Listener address [default: 0.0.0.0]
//!       --port <PORT>                  Listener port [default: 10034]
//!   -v, --verbose                      Log pipeline statistics once per second
//! ```
//!
//! # Precedence
//!
//! Built-in defaults, then the `--config` file, then explicit flags (or their
//! environment variables).  Later sources override earlier ones.
//!
//! | Variable      | Flag       |
//! |---------------|------------|
//! | `RELAY_BIND`  | `--bind`   |
//! | `RELAY_PORT`  | `--port`   |
//! | `RELAY_FPS`   | `--fps`    |
//!
//! # Startup sequence
//!
//! 1. Logging (`RUST_LOG`, default `info`).
//! 2. CLI + config file → validated [`ServerConfig`].
//! 3. Open the X display, check the XFixes and XTEST extensions, resolve the
//!    capture target and its size.
//! 4. Start the `StreamingSession` (capture, broadcast, diagnostics).
//! 5. Serve WebSocket viewers until Ctrl+C or SIGTERM.
//! 6. Stop and join the pipeline, then close the display.

use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use screen_relay_server::domain::{CaptureTarget, ServerConfig};

// ── CLI argument definitions ──────────────────────────────────────────────────

/// Screen-Relay server.
///
/// Every option is optional; anything not given falls back to the config
/// file and then to the built-in default.
#[derive(Debug, Default, Parser)]
#[command(
    name = "screen-relay-server",
    about = "Stream an X11 display to browsers and accept remote input",
    version
)]
struct Cli {
    /// TOML configuration file.
    #[arg(long, value_name = "PATH", env = "RELAY_CONFIG")]
    config: Option<PathBuf>,

    /// Hexadecimal X11 window id to capture (with or without `0x`).
    ///
    /// Without this option the whole display (root window) is captured.
    #[arg(short = 'w', long, value_name = "HEX_ID")]
    window: Option<String>,

    /// Capture rate as a multiple of the send rate.
    #[arg(short = 'c', long, value_name = "FACTOR")]
    capture_multiplier: Option<f64>,

    /// Frames per second sent to viewers.
    #[arg(long, env = "RELAY_FPS")]
    fps: Option<u32>,

    /// Encoded frame size budget in KiB.
    #[arg(long, value_name = "KIB")]
    budget_kib: Option<u32>,

    /// IP address to bind the WebSocket listener to.
    #[arg(long, value_name = "IP", env = "RELAY_BIND")]
    bind: Option<String>,

    /// TCP port for the WebSocket listener.
    #[arg(long, env = "RELAY_PORT")]
    port: Option<u16>,

    /// Log pipeline statistics once per diagnostics interval.
    #[arg(short = 'v', long)]
    verbose: bool,
}

impl Cli {
    /// Layers defaults, the config file and the explicit flags into a
    /// [`ServerConfig`].  Does not validate; see [`ServerConfig::validate`].
    ///
    /// # Errors
    ///
    /// Returns an error if the config file cannot be loaded, or if
    /// `--window` / `--bind` cannot be parsed.
    fn into_server_config(self) -> anyhow::Result<ServerConfig> {
        let mut config = match &self.config {
            Some(path) => ServerConfig::from_file(path)
                .with_context(|| format!("failed to load config {}", path.display()))?,
            None => ServerConfig::default(),
        };

        if let Some(raw) = &self.window {
            config.capture_target = CaptureTarget::parse_window_id(raw)?;
        }
        if let Some(multiplier) = self.capture_multiplier {
            config.capture_multiplier = multiplier;
        }
        if let Some(fps) = self.fps {
            config.target_fps = fps;
        }
        if let Some(kib) = self.budget_kib {
            config.size_budget_kib = kib;
        }
        if let Some(bind) = &self.bind {
            let ip: IpAddr = bind
                .parse()
                .with_context(|| format!("invalid bind address: '{bind}'"))?;
            config.bind_addr = SocketAddr::new(ip, config.bind_addr.port());
        }
        if let Some(port) = self.port {
            config.bind_addr.set_port(port);
        }
        config.verbose |= self.verbose;

        Ok(config)
    }
}

// ── Entry point ───────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = Cli::parse().into_server_config()?;
    config.validate().context("invalid configuration")?;

    info!(
        "Screen-Relay starting: listen={}, target={}, fps={}, budget={} KiB",
        config.bind_addr, config.capture_target, config.target_fps, config.size_budget_kib
    );

    run(config).await?;

    info!("Screen-Relay stopped");
    Ok(())
}

#[cfg(target_os = "linux")]
async fn run(config: ServerConfig) -> anyhow::Result<()> {
    use std::sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    };

    use screen_relay_server::application::{DiagnosticsOptions, SessionGateways, StreamingSession};
    use screen_relay_server::infrastructure::run_server;
    use screen_relay_server::infrastructure::x11::{
        X11Display, X11ScreenCapturer, XTestInputInjector,
    };
    use screen_relay_server::infrastructure::JpegFrameEncoder;

    // ── X11 setup ─────────────────────────────────────────────────────────────
    let x_display = Arc::new(X11Display::open().context("cannot connect to the X server")?);
    x_display.require_extensions()?;
    info!("connected to X display {}", x_display.name());

    let capturer = X11ScreenCapturer::new(Arc::clone(&x_display), config.capture_target)
        .with_context(|| format!("cannot capture {}", config.capture_target))?;
    let injector = XTestInputInjector::new(
        Arc::clone(&x_display),
        capturer.window(),
        config.capture_target.is_root(),
    );

    // ── Pipeline ──────────────────────────────────────────────────────────────
    let session = StreamingSession::start(
        config.session_params(),
        SessionGateways {
            capturer: Box::new(capturer),
            encoder: Box::new(JpegFrameEncoder::new()),
            injector: Arc::new(injector),
        },
        DiagnosticsOptions {
            enabled: config.verbose,
            interval: config.diagnostics_interval,
        },
    )?;

    // ── Graceful shutdown flag ────────────────────────────────────────────────
    //
    // The accept loop checks this flag every 200 ms and exits once it is
    // cleared by SIGINT or SIGTERM.
    let running = Arc::new(AtomicBool::new(true));
    let running_clone = Arc::clone(&running);
    tokio::spawn(async move {
        shutdown_signal().await;
        running_clone.store(false, Ordering::Relaxed);
    });

    let served = run_server(
        config.bind_addr,
        Arc::clone(session.registry()),
        session.control_channel(),
        running,
    )
    .await;

    // The pipeline threads hold the display; join them before it closes.
    session.shutdown();
    drop(x_display);
    served
}

/// Resolves on the first Ctrl+C (SIGINT) or, on Unix, SIGTERM.
///
/// A signal whose handler cannot be installed is logged and never fires;
/// the other one still does.
#[cfg_attr(not(target_os = "linux"), allow(dead_code))]
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("failed to listen for Ctrl+C signal: {e}");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};
        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                error!("failed to listen for SIGTERM: {e}");
                std::future::pending::<()>().await;
            }
        }
    };
    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => info!("received Ctrl+C, shutting down"),
        () = terminate => info!("received SIGTERM, shutting down"),
    }
}

#[cfg(not(target_os = "linux"))]
async fn run(_config: ServerConfig) -> anyhow::Result<()> {
    anyhow::bail!("screen capture and input injection require X11 on Linux")
}

// ── Tests ─────────────────────────────────────────────────────────────────────
