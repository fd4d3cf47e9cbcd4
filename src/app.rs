use std::time::{Duration, Instant};

use color_eyre::Result;
use ratatui::{Terminal, backend::Backend, layout::Rect};
use tracing::{debug, info, warn};

use crate::{
    config::Config,
    event::{Command, InputSource, LoopEvent, Scheduler},
    format,
    history::HistoryBuffer,
    metrics::{MetricsSource, Snapshot},
    process_table::ProcessTable,
    ui,
    viewport::Viewport,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum View {
    System,
    Process,
    Network,
}

impl View {
    fn next(self) -> Self {
        match self {
            Self::System => Self::Process,
            Self::Process => Self::Network,
            Self::Network => Self::System,
        }
    }
}

/// Upload/download speed from cumulative byte counters.
#[derive(Debug, Clone, Default)]
pub struct NetworkRate {
    baseline: Option<(u64, u64)>,
    upload_kbps: f64,
    download_kbps: f64,
}

impl NetworkRate {
    /// The first call only records the baseline and reports zero.
    pub fn update(&mut self, sent: u64, recv: u64, elapsed: Duration) {
        let secs = elapsed.as_secs_f64().max(0.001);
        if let Some((prev_sent, prev_recv)) = self.baseline {
            self.upload_kbps = sent.saturating_sub(prev_sent) as f64 / 1024.0 / secs;
            self.download_kbps = recv.saturating_sub(prev_recv) as f64 / 1024.0 / secs;
        }
        self.baseline = Some((sent, recv));
    }

    pub fn upload_kbps(&self) -> f64 {
        self.upload_kbps
    }

    pub fn download_kbps(&self) -> f64 {
        self.download_kbps
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Quit,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SystemPane {
    pub cpu: f64,
    pub mem: f64,
    pub disk: f64,
    pub mem_label: String,
    pub disk_label: String,
    pub history: Vec<u64>,
    pub info: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessRow {
    pub cells: [String; 9],
    pub selected: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ProcessPane {
    Empty,
    Rows { title: String, rows: Vec<ProcessRow> },
}

#[derive(Debug, Clone, PartialEq)]
pub struct NetworkPane {
    pub lines: Vec<String>,
}

/// Everything the renderer needs for one frame, per view.
#[derive(Debug, Clone, PartialEq)]
pub enum Screen {
    System(SystemPane),
    Process(ProcessPane),
    Network(NetworkPane),
}

/// All dashboard state, owned by the event loop.
pub struct Dashboard<M> {
    source: M,
    view: View,
    snapshot: Snapshot,
    history: HistoryBuffer,
    table: ProcessTable,
    viewport: Viewport,
    network: NetworkRate,
    page_step: usize,
    last_sample: Instant,
    empty_reported: bool,
}

impl<M: MetricsSource> Dashboard<M> {
    pub fn new(source: M, config: &Config, width: u16, height: u16) -> Self {
        let mut dashboard = Self {
            source,
            view: config.view,
            snapshot: Snapshot::default(),
            history: HistoryBuffer::new(config.history_len()),
            table: ProcessTable::default(),
            viewport: Viewport::new(ui::process_rows_visible(Rect::new(0, 0, width, height))),
            network: NetworkRate::default(),
            page_step: config.page_step(),
            last_sample: Instant::now(),
            empty_reported: false,
        };
        dashboard.refresh();
        dashboard
    }

    /// One refresh cycle: sample, record history, rebuild the table and
    /// bring the cursor back in bounds.
    pub fn refresh(&mut self) {
        let mut snapshot = self.source.sample();
        let now = Instant::now();
        let elapsed = now.duration_since(self.last_sample);
        self.last_sample = now;

        self.history.push(snapshot.average_cpu());
        self.network
            .update(snapshot.net_sent, snapshot.net_recv, elapsed);
        self.table.rebuild(std::mem::take(&mut snapshot.processes));
        let empty = self.table.is_empty();
        if empty && !self.empty_reported {
            warn!("metrics source reported no processes");
        }
        self.empty_reported = empty;
        self.viewport.set_len(self.table.len());
        self.snapshot = snapshot;
        debug!(
            processes = self.table.len(),
            cpu = self.history.latest(),
            "refreshed"
        );
    }

    pub fn handle(&mut self, command: Command) -> Flow {
        debug!(?command, view = ?self.view, "command");
        match command {
            Command::Quit => return Flow::Quit,
            Command::SwitchView => {
                self.view = self.view.next();
                info!(view = ?self.view, "switched view");
            }
            Command::Resize(width, height) => self.resize(width, height),
            nav if self.view == View::Process => self.navigate(nav),
            _ => {}
        }
        Flow::Continue
    }

    pub fn resize(&mut self, width: u16, height: u16) {
        self.viewport
            .set_height(ui::process_rows_visible(Rect::new(0, 0, width, height)));
        debug!(width, height, rows = self.viewport.height(), "resized");
    }

    fn navigate(&mut self, command: Command) {
        match command {
            Command::MoveUp => self.viewport.move_up(),
            Command::MoveDown => self.viewport.move_down(),
            Command::PageUp => self.viewport.page_up(self.page_step),
            Command::PageDown => self.viewport.page_down(self.page_step),
            Command::Home => self.viewport.home(),
            Command::End => self.viewport.end(),
            Command::Quit | Command::SwitchView | Command::Resize(..) => {}
        }
    }

    pub fn screen(&self) -> Screen {
        match self.view {
            View::System => Screen::System(self.system_pane()),
            View::Process => Screen::Process(self.process_pane()),
            View::Network => Screen::Network(self.network_pane()),
        }
    }

    fn system_pane(&self) -> SystemPane {
        let s = &self.snapshot;
        SystemPane {
            cpu: s.average_cpu(),
            mem: s.mem_percent(),
            disk: s.disk_percent(),
            mem_label: format!(
                "MEM {:.1}% {:.1}/{:.1}G",
                s.mem_percent(),
                format::gib(s.mem_used),
                format::gib(s.mem_total)
            ),
            disk_label: format!(
                "DSK {:.1}% {:.1}/{:.1}G",
                s.disk_percent(),
                format::gib(s.disk_used),
                format::gib(s.disk_total)
            ),
            history: self.history.sparkline_data(),
            info: vec![
                format!("Temp: {}", format::temperature(s.temperature)),
                format!("Uptime: {}", format::uptime(s.uptime_secs)),
                format!("Cores: {}", s.cpu_per_core.len()),
                format!("Procs: {}", s.process_count),
                format!(
                    "Load: {:.2} {:.2} {:.2}",
                    s.load_avg[0], s.load_avg[1], s.load_avg[2]
                ),
                format!("IP: {}", s.ip_address),
                format!("Mode: {}", s.network_mode),
            ],
        }
    }

    fn process_pane(&self) -> ProcessPane {
        let Some(selected) = self.viewport.selected() else {
            return ProcessPane::Empty;
        };
        let window = self.viewport.window();
        let rows = self.table.rows()[window.clone()]
            .iter()
            .zip(window)
            .map(|(p, idx)| ProcessRow {
                cells: [
                    p.pid.to_string(),
                    p.parent_pid.to_string(),
                    format::trim_text(&p.name, 12),
                    format!("{:.1}", p.cpu_percent),
                    format!("{:.1}", p.mem_percent),
                    p.status.to_string(),
                    format::trim_text(&p.user, 8),
                    p.connections.to_string(),
                    format::ports(&p.listening_ports),
                ],
                selected: idx == selected,
            })
            .collect();
        ProcessPane::Rows {
            title: format!(
                "Process (2/3) {}/{} [↑↓:Move]",
                selected + 1,
                self.viewport.len()
            ),
            rows,
        }
    }

    fn network_pane(&self) -> NetworkPane {
        let s = &self.snapshot;
        NetworkPane {
            lines: vec![
                "--Total Transfer--".to_string(),
                "Total Upload:".to_string(),
                format!("  {:.1} MB", format::megabytes(s.net_sent)),
                "Total Download:".to_string(),
                format!("  {:.1} MB", format::megabytes(s.net_recv)),
                String::new(),
                "--Current Speed--".to_string(),
                "Upload:".to_string(),
                format!("  {:.1} KB/s", self.network.upload_kbps()),
                "Download:".to_string(),
                format!("  {:.1} KB/s", self.network.download_kbps()),
                String::new(),
                format!("IP: {}", s.ip_address),
                format!("Mode: {}", s.network_mode),
            ],
        }
    }
}

#[cfg(test)]
impl<M> Dashboard<M> {
    pub fn view(&self) -> View {
        self.view
    }

    pub fn viewport(&self) -> &Viewport {
        &self.viewport
    }

    pub fn history(&self) -> &HistoryBuffer {
        &self.history
    }

    pub fn network(&self) -> &NetworkRate {
        &self.network
    }

    pub fn table(&self) -> &ProcessTable {
        &self.table
    }
}

/// Serves one event at a time until quit, redrawing after each.
pub fn run_app<B, I, M>(
    terminal: &mut Terminal<B>,
    dashboard: &mut Dashboard<M>,
    scheduler: &mut Scheduler<I>,
) -> Result<()>
where
    B: Backend,
    B::Error: std::error::Error + Send + Sync + 'static,
    I: InputSource,
    M: MetricsSource,
{
    terminal.draw(|f| ui::draw(f, &dashboard.screen()))?;
    loop {
        match scheduler.next_event()? {
            LoopEvent::Tick => dashboard.refresh(),
            LoopEvent::Input(command) => {
                if dashboard.handle(command) == Flow::Quit {
                    info!("quit requested");
                    return Ok(());
                }
                if let Command::Resize(..) = command {
                    terminal.clear()?;
                }
            }
        }
        terminal.draw(|f| ui::draw(f, &dashboard.screen()))?;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        event::ScriptedInput,
        metrics::{ProcessRecord, ScriptedSource, record},
    };
    use clap::Parser;
    use ratatui::backend::TestBackend;

    fn config(args: &[&str]) -> Config {
        Config::try_parse_from(std::iter::once("raspi-monitor").chain(args.iter().copied()))
            .unwrap()
    }

    fn snapshot(processes: Vec<ProcessRecord>) -> Snapshot {
        Snapshot {
            cpu_per_core: vec![20.0, 40.0],
            process_count: processes.len(),
            processes,
            ..Snapshot::default()
        }
    }

    fn procs(n: u32) -> Vec<ProcessRecord> {
        (1..=n).map(|pid| record(pid, "worker", f64::from(pid))).collect()
    }

    // 9 terminal rows leave 5 for process rows
    fn dashboard(script: Vec<Snapshot>) -> Dashboard<ScriptedSource> {
        Dashboard::new(
            ScriptedSource::new(script),
            &config(&["--view", "process"]),
            40,
            9,
        )
    }

    #[test]
    fn network_rate_uses_previous_sample_as_baseline() {
        let mut rate = NetworkRate::default();
        rate.update(1000, 0, Duration::from_secs(1));
        assert_eq!(rate.upload_kbps(), 0.0);
        rate.update(1500, 0, Duration::from_secs(1));
        assert_eq!(rate.upload_kbps(), (1500.0 - 1000.0) / 1024.0);
        rate.update(2524, 2048, Duration::from_secs(1));
        assert_eq!(rate.upload_kbps(), 1.0);
        assert_eq!(rate.download_kbps(), 2.0);
    }

    #[test]
    fn network_rate_saturates_on_counter_reset() {
        let mut rate = NetworkRate::default();
        rate.update(5000, 5000, Duration::from_secs(1));
        rate.update(10, 20, Duration::from_secs(1));
        assert_eq!(rate.upload_kbps(), 0.0);
        assert_eq!(rate.download_kbps(), 0.0);
    }

    #[test]
    fn refresh_feeds_history_and_sorted_table() {
        let dash = dashboard(vec![snapshot(procs(3))]);
        assert_eq!(dash.history().latest(), 30.0);
        let pids: Vec<u32> = dash.table().rows().iter().map(|r| r.pid).collect();
        assert_eq!(pids, vec![3, 2, 1]);
        assert_eq!(dash.viewport().selected(), Some(0));
    }

    #[test]
    fn table_shrink_on_tick_clamps_selection() {
        let mut dash = dashboard(vec![snapshot(procs(12)), snapshot(procs(2))]);
        dash.handle(Command::End);
        assert_eq!(dash.viewport().selected(), Some(11));
        dash.refresh();
        assert_eq!(dash.viewport().selected(), Some(1));
        assert_eq!(dash.viewport().window(), 0..2);
    }

    #[test]
    fn navigation_only_applies_in_process_view() {
        let mut dash = Dashboard::new(
            ScriptedSource::new(vec![snapshot(procs(5))]),
            &config(&[]),
            40,
            9,
        );
        assert_eq!(dash.view(), View::System);
        dash.handle(Command::MoveDown);
        assert_eq!(dash.viewport().selected(), Some(0));
        dash.handle(Command::SwitchView);
        assert_eq!(dash.view(), View::Process);
        dash.handle(Command::MoveDown);
        assert_eq!(dash.viewport().selected(), Some(1));
        dash.handle(Command::SwitchView);
        dash.handle(Command::SwitchView);
        assert_eq!(dash.view(), View::System);
        assert_eq!(dash.viewport().selected(), Some(1));
    }

    #[test]
    fn page_keys_use_configured_step() {
        let mut dash = Dashboard::new(
            ScriptedSource::new(vec![snapshot(procs(30))]),
            &config(&["--view", "process", "--page-step", "7"]),
            40,
            9,
        );
        dash.handle(Command::PageDown);
        assert_eq!(dash.viewport().selected(), Some(7));
        dash.handle(Command::PageUp);
        assert_eq!(dash.viewport().selected(), Some(0));
    }

    #[test]
    fn resize_changes_visible_rows() {
        let mut dash = dashboard(vec![snapshot(procs(30))]);
        assert_eq!(dash.viewport().height(), 5);
        dash.handle(Command::End);
        assert_eq!(dash.viewport().window(), 25..30);
        dash.handle(Command::Resize(40, 14));
        assert_eq!(dash.viewport().height(), 10);
        assert_eq!(dash.viewport().window(), 20..30);
    }

    #[test]
    fn empty_table_yields_placeholder() {
        let mut dash = dashboard(vec![snapshot(Vec::new())]);
        dash.handle(Command::MoveDown);
        dash.handle(Command::End);
        assert_eq!(dash.screen(), Screen::Process(ProcessPane::Empty));
    }

    #[test]
    fn process_pane_marks_selected_row() {
        let mut dash = dashboard(vec![snapshot(procs(8))]);
        dash.handle(Command::MoveDown);
        let Screen::Process(ProcessPane::Rows { title, rows }) = dash.screen() else {
            panic!("expected process rows");
        };
        assert_eq!(title, "Process (2/3) 2/8 [↑↓:Move]");
        assert_eq!(rows.len(), 5);
        let selected: Vec<&str> = rows
            .iter()
            .filter(|r| r.selected)
            .map(|r| r.cells[0].as_str())
            .collect();
        assert_eq!(selected, vec!["7"]);
    }

    #[test]
    fn process_pane_shows_parent_pid() {
        let child = ProcessRecord {
            parent_pid: 1,
            ..record(42, "sshd", 5.0)
        };
        let mut dash = dashboard(vec![snapshot(vec![record(1, "init", 1.0), child])]);
        dash.handle(Command::Home);
        let Screen::Process(ProcessPane::Rows { rows, .. }) = dash.screen() else {
            panic!("expected process rows");
        };
        assert_eq!(rows[0].cells[..3], ["42", "1", "sshd"]);
        assert_eq!(rows[1].cells[..3], ["1", "0", "init"]);
    }

    #[test]
    fn system_pane_reports_sentinel_temperature() {
        let dash = Dashboard::new(
            ScriptedSource::new(vec![snapshot(procs(1))]),
            &config(&[]),
            40,
            9,
        );
        let Screen::System(pane) = dash.screen() else {
            panic!("expected system pane");
        };
        assert_eq!(pane.cpu, 30.0);
        assert!(pane.info.contains(&"Temp: N/A".to_string()));
        assert_eq!(pane.history.len(), 20);
    }

    #[test]
    fn run_app_processes_commands_until_quit() {
        let mut dash = dashboard(vec![snapshot(procs(9))]);
        let mut terminal = Terminal::new(TestBackend::new(40, 9)).unwrap();
        let mut scheduler = Scheduler::new(
            ScriptedInput::new([
                Command::MoveDown,
                Command::MoveDown,
                Command::End,
                Command::MoveUp,
                Command::Quit,
            ]),
            Duration::from_secs(60),
        );
        run_app(&mut terminal, &mut dash, &mut scheduler).unwrap();
        assert_eq!(dash.viewport().selected(), Some(7));
        assert_eq!(dash.viewport().window(), 4..9);
    }

    #[test]
    fn run_app_applies_resize_before_redrawing() {
        let mut dash = dashboard(vec![snapshot(procs(9))]);
        let mut terminal = Terminal::new(TestBackend::new(40, 9)).unwrap();
        let mut scheduler = Scheduler::new(
            ScriptedInput::new([Command::End, Command::Resize(40, 14), Command::Quit]),
            Duration::from_secs(60),
        );
        run_app(&mut terminal, &mut dash, &mut scheduler).unwrap();
        assert_eq!(dash.viewport().height(), 10);
        assert_eq!(dash.viewport().selected(), Some(8));
        assert_eq!(dash.viewport().window(), 0..9);
    }

    #[test]
    fn empty_table_is_reported_once_per_outage() {
        let script = vec![
            snapshot(procs(2)),
            snapshot(Vec::new()),
            snapshot(Vec::new()),
            snapshot(Vec::new()),
            snapshot(procs(3)),
            snapshot(Vec::new()),
        ];
        let logs = CapturedLogs::default();
        let subscriber = tracing_subscriber::fmt()
            .with_writer(logs.clone())
            .with_max_level(tracing::Level::WARN)
            .with_ansi(false)
            .finish();
        tracing::subscriber::with_default(subscriber, || {
            let mut dash = dashboard(script);
            for _ in 0..5 {
                dash.refresh();
            }
        });
        assert_eq!(logs.text().matches("reported no processes").count(), 2);
    }

    #[derive(Clone, Default)]
    struct CapturedLogs(std::sync::Arc<std::sync::Mutex<Vec<u8>>>);

    impl CapturedLogs {
        fn text(&self) -> String {
            String::from_utf8_lossy(&self.0.lock().unwrap()).into_owned()
        }
    }

    impl std::io::Write for CapturedLogs {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    impl<'a> tracing_subscriber::fmt::MakeWriter<'a> for CapturedLogs {
        type Writer = Self;

        fn make_writer(&'a self) -> Self::Writer {
            self.clone()
        }
    }

    #[test]
    fn idle_input_yields_tick_that_resamples() {
        let script = vec![
            snapshot(procs(2)),
            Snapshot {
                net_sent: 4096,
                ..snapshot(procs(4))
            },
        ];
        let mut dash = dashboard(script);
        let mut scheduler = Scheduler::new(ScriptedInput::new([]), Duration::from_millis(10));
        assert_eq!(scheduler.next_event().unwrap(), LoopEvent::Tick);
        dash.refresh();
        assert_eq!(dash.table().len(), 4);
        assert_eq!(dash.viewport().len(), 4);
        assert!(dash.network().upload_kbps() > 0.0);
    }
}
