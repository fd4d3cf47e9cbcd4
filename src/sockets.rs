//! Per-process TCP socket ownership from procfs.
//!
//! The kernel TCP tables map socket inodes to state and local port; each
//! process's fd table (`socket:[inode]` targets) maps inodes to processes.

use std::collections::{BTreeSet, HashMap};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProcessSockets {
    pub connections: usize,
    pub listening_ports: BTreeSet<u16>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct SocketEntry {
    listening: bool,
    local_port: u16,
}

#[derive(Debug, Default)]
pub struct SocketTable {
    by_pid: HashMap<u32, ProcessSockets>,
}

impl SocketTable {
    pub fn refresh(&mut self) {
        self.by_pid.clear();
        #[cfg(target_os = "linux")]
        self.scan_procfs();
    }

    #[cfg(target_os = "linux")]
    fn scan_procfs(&mut self) {
        use procfs::{
            net::TcpState,
            process::{FDTarget, all_processes},
        };

        let mut inodes = HashMap::new();
        for (family, table) in [("tcp", procfs::net::tcp()), ("tcp6", procfs::net::tcp6())] {
            match table {
                Ok(entries) => inodes.extend(
                    entries
                        .into_iter()
                        // inode 0 is a socket in TIME_WAIT with no owner
                        .filter(|e| e.inode != 0)
                        .map(|e| {
                            let entry = SocketEntry {
                                listening: e.state == TcpState::Listen,
                                local_port: e.local_address.port(),
                            };
                            (e.inode, entry)
                        }),
                ),
                Err(err) => tracing::debug!(family, %err, "socket table unavailable"),
            }
        }
        if inodes.is_empty() {
            return;
        }
        let processes = match all_processes() {
            Ok(processes) => processes,
            Err(err) => {
                tracing::debug!(%err, "process list unavailable");
                return;
            }
        };
        for process in processes.flatten() {
            let Ok(pid) = u32::try_from(process.pid) else {
                continue;
            };
            // other users' fd tables are unreadable without privileges
            let Ok(fds) = process.fd() else {
                continue;
            };
            let owned = fds.flatten().filter_map(|fd| match fd.target {
                FDTarget::Socket(inode) => Some(inode),
                _ => None,
            });
            let sockets = summarize(owned.filter_map(|inode| inodes.get(&inode)));
            if sockets != ProcessSockets::default() {
                self.by_pid.insert(pid, sockets);
            }
        }
    }

    pub fn for_pid(&self, pid: u32) -> ProcessSockets {
        self.by_pid.get(&pid).cloned().unwrap_or_default()
    }
}

fn summarize<'a>(entries: impl Iterator<Item = &'a SocketEntry>) -> ProcessSockets {
    let mut sockets = ProcessSockets::default();
    for entry in entries {
        if entry.listening {
            sockets.listening_ports.insert(entry.local_port);
        } else {
            sockets.connections += 1;
        }
    }
    sockets
}
