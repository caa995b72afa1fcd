pub fn mean(data: &[f64]) -> Option<f64> {
    let sum = data.iter().sum::<f64>();
    let count = data.len();

    match count {
        positive if positive > 0 => Some(sum / count as f64),
        _ => None,
    }
}

/// Render a millisecond duration as seconds with two decimals, e.g. "1.23s".
pub fn format_secs(ms: u64) -> String {
    format!("{:.2}s", ms as f64 / 1000.0)
}
