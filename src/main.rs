mod app;
mod config;
mod event;
mod format;
mod history;
mod logging;
mod metrics;
mod process_table;
mod sockets;
mod ui;
mod viewport;

use std::io::{self, Stdout};

use clap::Parser;
use color_eyre::{Result, eyre::WrapErr};
use crossterm::{
    execute,
    terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
};
use ratatui::{Terminal, backend::CrosstermBackend};
use tracing::{error, info};

use crate::{
    app::{Dashboard, run_app},
    config::Config,
    event::{Scheduler, TerminalInput},
    metrics::SysinfoSource,
};

/// Raw mode and the alternate screen, released on drop so every exit path
/// (including a panic unwinding through the loop) restores the terminal.
struct TerminalGuard {
    terminal: Terminal<CrosstermBackend<Stdout>>,
}

impl TerminalGuard {
    fn acquire() -> Result<Self> {
        enable_raw_mode().wrap_err("failed to enable raw mode")?;
        let mut stdout = io::stdout();
        if let Err(err) = execute!(stdout, EnterAlternateScreen) {
            let _ = disable_raw_mode();
            return Err(err).wrap_err("failed to enter alternate screen");
        }
        let terminal = match Terminal::new(CrosstermBackend::new(stdout)) {
            Ok(terminal) => terminal,
            Err(err) => {
                let _ = disable_raw_mode();
                let _ = execute!(io::stdout(), LeaveAlternateScreen);
                return Err(err).wrap_err("failed to initialize terminal");
            }
        };
        Ok(Self { terminal })
    }
}

impl Drop for TerminalGuard {
    fn drop(&mut self) {
        let _ = disable_raw_mode();
        let _ = execute!(self.terminal.backend_mut(), LeaveAlternateScreen);
        let _ = self.terminal.show_cursor();
    }
}

fn main() -> Result<()> {
    color_eyre::install()?;
    let config = Config::parse();

    let _log_guard = match logging::init(&config.log_file) {
        Ok(guard) => Some(guard),
        Err(err) => {
            eprintln!(
                "Failed to open log file {}: {err}",
                config.log_file.display()
            );
            None
        }
    };
    info!(
        interval_ms = config.interval().as_millis() as u64,
        history = config.history_len(),
        "=== raspi-monitor started ==="
    );

    let mut guard = TerminalGuard::acquire().inspect_err(|err| {
        error!("display initialization failed: {err:#}");
    })?;
    let size = guard.terminal.size()?;

    let source = SysinfoSource::new(config.thermal_path.clone());
    let mut dashboard = Dashboard::new(source, &config, size.width, size.height);
    let mut scheduler = Scheduler::new(TerminalInput, config.interval());

    let res = run_app(&mut guard.terminal, &mut dashboard, &mut scheduler);
    drop(guard);

    match &res {
        Ok(()) => info!("=== raspi-monitor stopped ==="),
        Err(err) => error!("event loop failed: {err:#}"),
    }
    res
}
