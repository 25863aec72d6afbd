//! # TANDEM Headless Runner
//!
//! Runs the test pattern engine for a fixed number of ticks with no window
//! and prints the session report.
//!
//! ```bash
//! # Defaults: built-in config, 600 ticks
//! ./tandem_headless
//!
//! # Custom config, 10 000 ticks, with handoff tracing
//! RUST_LOG=tandem_core=trace ./tandem_headless config/tandem.toml 10000
//! ```
//!
//! Every 100 ticks the runner flips the sync strategy and sends a pause
//! toggle, so both handoff paths and the input queue get exercised.

use std::process::ExitCode;

use tandem::core::{Frame, Geometry, TandemConfig};
use tandem::{Host, InputEvent, Presenter, TestPatternEngine, TickOutcome};
use tracing_subscriber::EnvFilter;

const DEFAULT_TICKS: u64 = 600;
const TOGGLE_EVERY: u64 = 100;

/// Presenter that only checksums what it is given.
#[derive(Debug, Default)]
struct ChecksumPresenter {
    geometry: Option<Geometry>,
    checksum: u64,
}

impl Presenter for ChecksumPresenter {
    fn reconfigure(&mut self, geometry: &Geometry) {
        tracing::info!(
            width = geometry.width,
            height = geometry.height,
            aspect = geometry.aspect_ratio,
            "presenter reconfigured"
        );
        self.geometry = Some(*geometry);
    }

    fn present(&mut self, frame: &Frame<'_>) {
        if frame.is_duplicate() {
            return;
        }
        self.checksum = frame
            .pixels()
            .iter()
            .fold(self.checksum, |sum, &pixel| sum.rotate_left(5) ^ u64::from(pixel));
    }
}

fn parse_args() -> Result<(TandemConfig, u64), String> {
    let mut args = std::env::args().skip(1);

    let config = match args.next() {
        Some(path) => TandemConfig::load(&path).map_err(|err| format!("{path}: {err}"))?,
        None => TandemConfig::default(),
    };
    let ticks = match args.next() {
        Some(text) => text
            .parse()
            .map_err(|err| format!("invalid tick count {text:?}: {err}"))?,
        None => DEFAULT_TICKS,
    };

    Ok((config, ticks))
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let (config, ticks) = match parse_args() {
        Ok(parsed) => parsed,
        Err(message) => {
            eprintln!("tandem_headless: {message}");
            eprintln!("usage: tandem_headless [config.toml] [ticks]");
            return ExitCode::from(2);
        }
    };

    println!("═══════════════════════════════════════════════════════════════════");
    println!("                    TANDEM HEADLESS v{}", env!("CARGO_PKG_VERSION"));
    println!("═══════════════════════════════════════════════════════════════════");
    println!("  strategy: {}  timing: {:?}  ticks: {ticks}", config.strategy, config.timing);
    println!();

    let mut host = match Host::start(&config, TestPatternEngine::new(), ChecksumPresenter::default()) {
        Ok(host) => host,
        Err(err) => {
            eprintln!("tandem_headless: {err}");
            return ExitCode::FAILURE;
        }
    };

    for tick in 1..=ticks {
        match host.tick() {
            Ok(TickOutcome::NoVideo) => tracing::debug!(tick, "no video mode yet"),
            Ok(_) => {}
            Err(_) => {
                tracing::info!(tick, "session cancelled");
                break;
            }
        }

        if tick % TOGGLE_EVERY == 0 {
            host.set_strategy(host.strategy().toggled());
            let _ = host.send_input(InputEvent::Key {
                code: TestPatternEngine::PAUSE_KEY,
                pressed: true,
            });
        }
    }

    let presenter = host.presenter();
    let checksum = presenter.checksum;
    let last_mode = presenter.geometry.map(|g| (g.width, g.height));
    let report = host.shutdown();

    println!();
    report.print_summary();
    println!();
    if let Some((width, height)) = last_mode {
        println!("  last mode: {width}x{height}");
    }
    println!("  checksum: {checksum:#018x}");

    ExitCode::SUCCESS
}
