use std::{path::PathBuf, time::Duration};

use clap::Parser;

use crate::app::View;

const MIN_INTERVAL_MS: u64 = 100;
const MAX_INTERVAL_MS: u64 = 60_000;

/// Live system dashboard for single-board computers
#[derive(Debug, Clone, Parser)]
#[command(name = "raspi-monitor", version, about, long_about = None)]
pub struct Config {
    /// Refresh interval in milliseconds
    #[arg(short, long, default_value_t = 1000)]
    pub interval_ms: u64,

    /// Number of CPU samples kept for the sparkline
    #[arg(long, default_value_t = 20)]
    pub history: usize,

    /// Rows moved by PageUp/PageDown
    #[arg(long, default_value_t = 10)]
    pub page_step: usize,

    /// View shown at startup
    #[arg(long, value_enum, default_value_t = View::System)]
    pub view: View,

    /// Log file (filtered by RUST_LOG, default level info)
    #[arg(long, value_name = "PATH", default_value = "raspi-monitor.log")]
    pub log_file: PathBuf,

    /// Thermal zone file reporting millidegrees Celsius
    #[arg(
        long,
        value_name = "PATH",
        default_value = "/sys/class/thermal/thermal_zone0/temp"
    )]
    pub thermal_path: PathBuf,
}

impl Config {
    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms.clamp(MIN_INTERVAL_MS, MAX_INTERVAL_MS))
    }

    pub fn history_len(&self) -> usize {
        self.history.max(1)
    }

    pub fn page_step(&self) -> usize {
        self.page_step.max(1)
    }
}
