use std::collections::BTreeSet;

pub fn trim_text(s: &str, max_chars: usize) -> String {
    if s.chars().count() <= max_chars {
        return s.to_string();
    }
    let kept: String = s.chars().take(max_chars.saturating_sub(2)).collect();
    format!("{kept}..")
}

/// Days and hours, e.g. `3d 4h`.
pub fn uptime(secs: u64) -> String {
    format!("{}d {}h", secs / 86_400, (secs % 86_400) / 3_600)
}

pub fn temperature(celsius: f64) -> String {
    if celsius > 0.0 {
        format!("{celsius:.1}°C")
    } else {
        "N/A".to_string()
    }
}

pub fn megabytes(bytes: u64) -> f64 {
    bytes as f64 / 1024.0 / 1024.0
}

pub fn gib(bytes: u64) -> f64 {
    bytes as f64 / 1_073_741_824.0
}

pub fn ports(ports: &BTreeSet<u16>) -> String {
    if ports.is_empty() {
        return "-".to_string();
    }
    ports
        .iter()
        .map(u16::to_string)
        .collect::<Vec<_>>()
        .join(",")
}
