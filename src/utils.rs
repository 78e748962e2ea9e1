/// Display helpers for sizes and reductions
///
/// These are shared by the CLI report and anything else that renders a
/// collection for people.

const UNITS: &[&str] = &["Bytes", "KB", "MB", "GB", "TB"];
const THRESHOLD: f64 = 1024.0;

/// Format a byte count with binary units, rounded to two decimals
///
/// Trailing zeros are dropped, so `1536` renders as `1.5 KB` and
/// `1048576` as `1 MB`.
pub fn format_bytes(bytes: u64) -> String {
    if bytes == 0 {
        return "0 Bytes".to_string();
    }

    let mut size = bytes as f64;
    let mut unit_index = 0;

    while size >= THRESHOLD && unit_index < UNITS.len() - 1 {
        size /= THRESHOLD;
        unit_index += 1;
    }

    let rounded = (size * 100.0).round() / 100.0;
    format!("{} {}", rounded, UNITS[unit_index])
}

/// Percentage saved going from `original` to `compressed`
///
/// `None` when either size is unknown or the original is empty. Negative
/// values mean the output grew.
pub fn reduction_percent(original: Option<u64>, compressed: Option<u64>) -> Option<f64> {
    let (original, compressed) = (original?, compressed?);
    if original == 0 {
        return None;
    }
    Some((original as f64 - compressed as f64) / original as f64 * 100.0)
}

/// One decimal place with a percent sign, or `N/A`
pub fn format_reduction(original: Option<u64>, compressed: Option<u64>) -> String {
    match reduction_percent(original, compressed) {
        Some(percent) => format!("{:.1}%", percent),
        None => "N/A".to_string(),
    }
}
