//! Human-readable formatting for file sizes

/// Format a byte count as whole units ("512 B", "200 MB", "4 GB").
///
/// Returns `None` for a zero/absent size so callers can omit the line.
pub fn format_file_size(bytes: Option<u64>) -> Option<String> {
    const UNITS: &[&str] = &["B", "KB", "MB", "GB", "TB"];
    const THRESHOLD: f64 = 1024.0;

    let bytes = bytes.filter(|b| *b > 0)?;
    let mut size = bytes as f64;

    for (unit_index, unit) in UNITS.iter().enumerate() {
        if size < THRESHOLD {
            return Some(if unit_index == 0 {
                format!("{} {}", size as u64, unit)
            } else {
                format!("{size:.0} {unit}")
            });
        }
        size /= THRESHOLD;
    }

    Some(format!("{size:.0} PB"))
}
