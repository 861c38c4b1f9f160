mod input;
mod settings_file;
mod status;

use anyhow::{Context, Result};
use clap::Parser;
use snapline_core::{
    AppContext, ContextConfig, MemoryReader, OffsetsCollection, ProcessDescriptor, SharedSettings,
    Signal, apply_signatures,
};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use crate::settings_file::SettingsFile;

/// Pause between attach attempts
const ATTACH_RETRY: Duration = Duration::from_secs(5);

#[derive(Parser)]
#[command(name = "snapline")]
#[command(about = "Live world snapshots from a running game process")]
struct Args {
    /// Executable name of the process to attach to
    #[arg(short, long, default_value = "game_x64.exe")]
    process: String,

    #[arg(short, long, default_value = "offsets.json")]
    offsets: PathBuf,

    #[arg(short, long, default_value = "settings.txt")]
    settings: PathBuf,

    /// Attach to this process instead of searching by name
    #[arg(long)]
    self_attach: bool,

    /// Viewport used for screen projection
    #[arg(long, default_value_t = 1920.0)]
    width: f32,

    #[arg(long, default_value_t = 1080.0)]
    height: f32,

    /// Status line interval in milliseconds
    #[arg(long, default_value_t = 1000)]
    status_interval: u64,

    /// Disable the Esc/q keyboard monitor
    #[arg(long)]
    no_keyboard: bool,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("snapline=info".parse()?))
        .init();

    let args = Args::parse();

    info!("snapline starting...");

    let offsets = snapline_core::load_offsets(&args.offsets)
        .with_context(|| format!("loading offsets from {}", args.offsets.display()))?;
    info!("Loaded offsets version: {}", offsets.version);

    let mut settings_file = SettingsFile::new(args.settings.clone());
    let settings = SharedSettings::new(settings_file.load());

    let shutdown = Arc::new(Signal::new());
    {
        let shutdown = Arc::clone(&shutdown);
        ctrlc::set_handler(move || shutdown.set()).context("installing Ctrl-C handler")?;
    }
    let keyboard = if args.no_keyboard {
        None
    } else {
        Some(input::spawn_keyboard_monitor(Arc::clone(&shutdown)))
    };

    let descriptor = if args.self_attach {
        ProcessDescriptor::current(&args.process)
    } else {
        ProcessDescriptor::by_name(&args.process)
    };
    let config = ContextConfig::builder()
        .screen(args.width, args.height)
        .build();
    let status_interval = Duration::from_millis(args.status_interval.max(50));

    // Main loop: wait for process, run until it exits, repeat
    while !shutdown.is_set() {
        info!("Waiting for {}...", args.process);

        match MemoryReader::attach(&descriptor) {
            Ok(reader) => {
                info!(
                    "Found {} (pid {}, base: {:#x})",
                    args.process,
                    reader.process_id(),
                    reader.base_address()
                );

                let session = Session {
                    reader,
                    offsets: offsets.clone(),
                    settings: settings.clone(),
                    config,
                    status_interval,
                };
                if let Err(e) = session.run(&shutdown, &mut settings_file) {
                    error!("Session error: {:#}", e);
                }

                if !shutdown.is_set() {
                    info!("Process disconnected, waiting for reconnect...");
                }
            }
            Err(e) if e.is_transient() || matches!(e, snapline_core::Error::ProcessNotFound(_)) => {}
            Err(e) => warn!("Attach failed: {}", e),
        }

        shutdown.wait_timeout(ATTACH_RETRY);
    }

    info!("Shutting down");
    if let Some(handle) = keyboard {
        let _ = handle.join();
    }
    Ok(())
}

/// One attachment to one process instance.
struct Session {
    reader: MemoryReader,
    offsets: OffsetsCollection,
    settings: SharedSettings,
    config: ContextConfig,
    status_interval: Duration,
}

impl Session {
    fn run(mut self, shutdown: &Signal, settings_file: &mut SettingsFile) -> Result<()> {
        if !self.offsets.signatures.is_empty() {
            let applied = apply_signatures(&mut self.offsets, &self.reader);
            info!(
                "Resolved {}/{} offsets by signature",
                applied,
                self.offsets.signatures.len()
            );
        }

        let readiness = Arc::new(Signal::new());
        let context = AppContext::start(
            self.reader.clone(),
            self.offsets,
            self.settings.clone(),
            Arc::clone(&readiness),
            self.config,
        )
        .context("starting loops")?;

        // The process is attached and the offsets resolved; let the loops go.
        readiness.set();

        loop {
            if shutdown.wait_timeout(self.status_interval) {
                break;
            }
            if !self.reader.is_alive() {
                info!("Process terminated");
                break;
            }
            if context.is_stopped() {
                warn!("All loops stopped");
                break;
            }

            settings_file.reload_into(&self.settings);
            status::print_status(&context);
        }

        Ok(())
    }
}
