//! Unit conversions shared by the panel's mixed conventions: user quotas are
//! expressed in GB, tunnel-binding quotas in bytes, and all expiry instants
//! in epoch milliseconds.

use chrono::Utc;

pub fn gb_to_bytes(gb: i64) -> i64 {
    gb * 1024 * 1024 * 1024
}

pub fn bytes_to_gb(bytes: i64) -> f64 {
    bytes as f64 / (1024.0 * 1024.0 * 1024.0)
}

pub fn days_to_ms(days: i64) -> i64 {
    days * 24 * 60 * 60 * 1000
}

/// Current wall-clock time in epoch milliseconds.
pub fn now_ms() -> i64 {
    Utc::now().timestamp_millis()
}

/// Human-readable byte count, 1024-based, at most two decimals with trailing
/// zeros dropped (`0 B`, `1.5 KB`, `1 GB`).
pub fn format_bytes(bytes: i64) -> String {
    const UNITS: [&str; 5] = ["B", "KB", "MB", "GB", "TB"];
    let bytes = bytes.max(0) as f64;
    let pow = if bytes > 0.0 {
        ((bytes.ln() / 1024f64.ln()).floor() as usize).min(UNITS.len() - 1)
    } else {
        0
    };
    let value = bytes / 1024f64.powi(pow as i32);
    let rounded = (value * 100.0).round() / 100.0;
    if rounded.fract() == 0.0 {
        format!("{} {}", rounded.trunc() as i64, UNITS[pow])
    } else {
        format!("{} {}", rounded, UNITS[pow])
    }
}

/// Random password over the panel's accepted character set.
pub fn generate_password(length: usize) -> String {
    use rand::Rng;
    const CHARS: &[u8] =
        b"abcdefghijklmnopqrstuvwxyzABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789!@#$%^&*";
    let mut rng = rand::rng();
    (0..length)
        .map(|_| CHARS[rng.random_range(0..CHARS.len())] as char)
        .collect()
}
