//! Byte unit helpers.

/// Bytes in one GB as the quota column counts it (binary gigabyte).
pub const BYTES_PER_GIB: f64 = 1024.0 * 1024.0 * 1024.0;

#[inline]
pub fn gib_to_bytes(gib: f64) -> f64 {
    gib * BYTES_PER_GIB
}

/// Format bytes to a human readable string.
pub fn format_bytes(bytes: f64) -> String {
    const LABELS: [&str; 5] = ["B", "KB", "MB", "GB", "TB"];

    let mut size = bytes.max(0.0);
    let mut unit = 0;
    while size >= 1024.0 && unit < LABELS.len() - 1 {
        size /= 1024.0;
        unit += 1;
    }
    if unit == 0 {
        format!("{size:.0} B")
    } else {
        format!("{size:.2} {}", LABELS[unit])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn formats_each_unit() {
        assert_eq!(format_bytes(512.0), "512 B");
        assert_eq!(format_bytes(1536.0), "1.50 KB");
        assert_eq!(format_bytes(BYTES_PER_GIB * 2.5), "2.50 GB");
        assert_eq!(format_bytes(BYTES_PER_GIB * 1024.0 * 3.0), "3.00 TB");
    }

    #[test]
    fn negative_clamps_to_zero() {
        assert_eq!(format_bytes(-5.0), "0 B");
    }
}
