//! File size

const BYTES_PER_MB: f64 = 1024.0 * 1024.0;

/// Bytes to megabytes (MiB)
pub fn bytes_to_mb(bytes: u64) -> f64 {
    bytes as f64 / BYTES_PER_MB
}
