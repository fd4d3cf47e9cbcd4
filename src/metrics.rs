use std::{
    collections::BTreeSet,
    fs,
    net::{IpAddr, UdpSocket},
    path::{Path, PathBuf},
    time::{Duration, Instant},
};

use sysinfo::{
    CpuRefreshKind, Disks, MemoryRefreshKind, Networks, Pid, ProcessRefreshKind, ProcessStatus,
    ProcessesToUpdate, RefreshKind, System, UpdateKind, Users,
};

use crate::sockets::SocketTable;

const DISK_REFRESH: Duration = Duration::from_secs(5);
const IP_REFRESH: Duration = Duration::from_secs(15);
const USER_REFRESH: Duration = Duration::from_secs(60);

/// One process at sample time.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ProcessRecord {
    pub pid: u32,
    pub parent_pid: u32,
    pub name: String,
    pub user: String,
    pub cpu_percent: f64,
    pub mem_percent: f64,
    pub status: char,
    pub connections: usize,
    pub listening_ports: BTreeSet<u16>,
}

/// Point-in-time bundle of everything one refresh cycle shows.
///
/// Each field is best-effort: a reading that fails is left at its zero
/// value (temperature `0.0` means unavailable).
#[derive(Debug, Clone, Default)]
pub struct Snapshot {
    pub cpu_per_core: Vec<f64>,
    pub mem_used: u64,
    pub mem_total: u64,
    pub disk_used: u64,
    pub disk_total: u64,
    pub temperature: f64,
    pub uptime_secs: u64,
    pub net_sent: u64,
    pub net_recv: u64,
    pub load_avg: [f64; 3],
    pub process_count: usize,
    pub processes: Vec<ProcessRecord>,
    pub ip_address: String,
    pub network_mode: String,
}

impl Snapshot {
    pub fn average_cpu(&self) -> f64 {
        if self.cpu_per_core.is_empty() {
            return 0.0;
        }
        self.cpu_per_core.iter().sum::<f64>() / self.cpu_per_core.len() as f64
    }

    pub fn mem_percent(&self) -> f64 {
        percent(self.mem_used, self.mem_total)
    }

    pub fn disk_percent(&self) -> f64 {
        percent(self.disk_used, self.disk_total)
    }
}

fn percent(part: u64, total: u64) -> f64 {
    if total == 0 {
        0.0
    } else {
        part as f64 / total as f64 * 100.0
    }
}

/// Supplies one snapshot per call. Blocking and synchronous.
pub trait MetricsSource {
    fn sample(&mut self) -> Snapshot;
}

/// `MetricsSource` backed by `sysinfo` and procfs.
pub struct SysinfoSource {
    system: System,
    disks: Disks,
    networks: Networks,
    users: Users,
    sockets: SocketTable,
    thermal_path: PathBuf,
    ip_address: String,
    last_disk_refresh: Instant,
    last_ip_refresh: Option<Instant>,
    last_user_refresh: Instant,
}

impl SysinfoSource {
    pub fn new(thermal_path: PathBuf) -> Self {
        let system = System::new_with_specifics(
            RefreshKind::nothing()
                .with_cpu(CpuRefreshKind::nothing().with_cpu_usage())
                .with_memory(MemoryRefreshKind::nothing().with_ram()),
        );
        Self {
            system,
            disks: Disks::new_with_refreshed_list(),
            networks: Networks::new_with_refreshed_list(),
            users: Users::new_with_refreshed_list(),
            sockets: SocketTable::default(),
            thermal_path,
            ip_address: "No IP".to_string(),
            last_disk_refresh: Instant::now(),
            last_ip_refresh: None,
            last_user_refresh: Instant::now(),
        }
    }

    fn refresh(&mut self) {
        self.system
            .refresh_cpu_specifics(CpuRefreshKind::nothing().with_cpu_usage());
        self.system.refresh_memory();
        self.system.refresh_processes_specifics(
            ProcessesToUpdate::All,
            true,
            ProcessRefreshKind::nothing()
                .with_cpu()
                .with_memory()
                .with_user(UpdateKind::OnlyIfNotSet),
        );
        if self.last_disk_refresh.elapsed() >= DISK_REFRESH {
            self.disks.refresh(true);
            self.last_disk_refresh = Instant::now();
        }
        if self.last_user_refresh.elapsed() >= USER_REFRESH {
            self.users.refresh();
            self.last_user_refresh = Instant::now();
        }
        self.networks.refresh(true);
        self.sockets.refresh();
    }

    fn disk_usage(&self) -> (u64, u64) {
        let usage = |disk: &sysinfo::Disk| {
            let total = disk.total_space();
            (total.saturating_sub(disk.available_space()), total)
        };
        if let Some(root) = self
            .disks
            .list()
            .iter()
            .find(|d| d.mount_point() == Path::new("/"))
        {
            return usage(root);
        }
        self.disks
            .list()
            .iter()
            .map(usage)
            .fold((0, 0), |(u, t), (du, dt)| (u + du, t + dt))
    }

    fn network_totals(&self) -> (u64, u64) {
        self.networks
            .iter()
            .filter(|(name, _)| !name.starts_with("lo"))
            .fold((0, 0), |(sent, recv), (_, data)| {
                (
                    sent + data.total_transmitted(),
                    recv + data.total_received(),
                )
            })
    }

    fn refresh_ip_address(&mut self) {
        let due = self
            .last_ip_refresh
            .is_none_or(|at| at.elapsed() >= IP_REFRESH);
        if !due {
            return;
        }
        self.last_ip_refresh = Some(Instant::now());
        let from_interfaces = self
            .networks
            .iter()
            .filter(|(name, _)| !name.starts_with("lo"))
            .flat_map(|(_, data)| data.ip_networks().iter().map(|n| n.addr))
            .find(|addr| matches!(addr, IpAddr::V4(v4) if !v4.is_loopback()));
        self.ip_address = match from_interfaces {
            Some(addr) => addr.to_string(),
            None => detect_local_ip().unwrap_or_else(|| "No IP".to_string()),
        };
    }

    fn processes(&self) -> Vec<ProcessRecord> {
        let total_mem = self.system.total_memory().max(1) as f64;
        let mut records: Vec<ProcessRecord> = self
            .system
            .processes()
            .values()
            .map(|p| {
                let pid = p.pid().as_u32();
                let sockets = self.sockets.for_pid(pid);
                let cpu = f64::from(p.cpu_usage());
                ProcessRecord {
                    pid,
                    parent_pid: p.parent().map_or(0, Pid::as_u32),
                    name: p.name().to_string_lossy().into_owned(),
                    user: p
                        .user_id()
                        .and_then(|uid| self.users.get_user_by_id(uid))
                        .map_or_else(|| "-".to_string(), |u| u.name().to_string()),
                    cpu_percent: if cpu.is_finite() { cpu } else { 0.0 },
                    mem_percent: p.memory() as f64 / total_mem * 100.0,
                    status: status_char(p.status()),
                    connections: sockets.connections,
                    listening_ports: sockets.listening_ports,
                }
            })
            .collect();
        records.sort_by_key(|r| r.pid);
        records
    }
}

impl MetricsSource for SysinfoSource {
    fn sample(&mut self) -> Snapshot {
        self.refresh();
        self.refresh_ip_address();

        let processes = self.processes();
        let mode = network_mode(&processes);
        let (disk_used, disk_total) = self.disk_usage();
        let (net_sent, net_recv) = self.network_totals();
        let load = System::load_average();

        Snapshot {
            cpu_per_core: self
                .system
                .cpus()
                .iter()
                .map(|cpu| f64::from(cpu.cpu_usage()))
                .collect(),
            mem_used: self.system.used_memory(),
            mem_total: self.system.total_memory(),
            disk_used,
            disk_total,
            temperature: read_temperature(&self.thermal_path),
            uptime_secs: System::uptime(),
            net_sent,
            net_recv,
            load_avg: [load.one, load.five, load.fifteen],
            process_count: processes.len(),
            processes,
            ip_address: self.ip_address.clone(),
            network_mode: mode.to_string(),
        }
    }
}

fn status_char(status: ProcessStatus) -> char {
    match status {
        ProcessStatus::Run => 'R',
        ProcessStatus::Sleep => 'S',
        ProcessStatus::Idle => 'I',
        ProcessStatus::Stop => 'T',
        ProcessStatus::Zombie => 'Z',
        ProcessStatus::Tracing => 't',
        ProcessStatus::Dead => 'X',
        ProcessStatus::UninterruptibleDiskSleep => 'D',
        ProcessStatus::Parked => 'P',
        ProcessStatus::Waking => 'W',
        _ => '?',
    }
}

/// Reads a millidegree thermal file; `0.0` when unavailable.
pub fn read_temperature(path: &Path) -> f64 {
    match fs::read_to_string(path) {
        Ok(raw) => raw
            .trim()
            .parse::<f64>()
            .map(|milli| milli / 1000.0)
            .unwrap_or(0.0),
        Err(err) => {
            tracing::trace!(path = %path.display(), %err, "temperature unavailable");
            0.0
        }
    }
}

/// "AP Mode" while an access-point daemon is running.
pub fn network_mode(processes: &[ProcessRecord]) -> &'static str {
    if processes
        .iter()
        .any(|p| p.name.to_lowercase().contains("hostapd"))
    {
        "AP Mode"
    } else {
        "Client Mode"
    }
}

fn detect_local_ip() -> Option<String> {
    let socket = UdpSocket::bind("0.0.0.0:0").ok()?;
    socket.connect("8.8.8.8:80").ok()?;
    let addr = socket.local_addr().ok()?;
    Some(addr.ip().to_string())
}

/// Snapshot source that replays a fixed script; the last entry repeats.
#[cfg(test)]
pub struct ScriptedSource {
    script: Vec<Snapshot>,
    next: usize,
    pub calls: usize,
}

#[cfg(test)]
impl ScriptedSource {
    pub fn new(script: Vec<Snapshot>) -> Self {
        Self {
            script,
            next: 0,
            calls: 0,
        }
    }
}

#[cfg(test)]
impl MetricsSource for ScriptedSource {
    fn sample(&mut self) -> Snapshot {
        self.calls += 1;
        let idx = self.next.min(self.script.len().saturating_sub(1));
        self.next += 1;
        self.script.get(idx).cloned().unwrap_or_default()
    }
}

#[cfg(test)]
pub fn record(pid: u32, name: &str, cpu: f64) -> ProcessRecord {
    ProcessRecord {
        pid,
        name: name.to_string(),
        user: "root".to_string(),
        cpu_percent: cpu,
        status: 'S',
        ..ProcessRecord::default()
    }
}
