/// Precision beyond this would overflow the fixed-point intermediate values
/// for realistic campaign totals.
pub const MAX_DECIMALS: u32 = 12;

/// Splits `total` into `count` parts at `decimals` precision whose sum is
/// exactly `total` rounded to that precision.
///
/// Every part but the last gets the floored equal share; the last part takes
/// whatever remains. Arithmetic happens on scaled integers so the remainder
/// carries no rounding drift.
pub fn partition(total: f64, count: usize, decimals: u32) -> Vec<f64> {
    if count == 0 {
        return Vec::new();
    }

    let decimals = decimals.min(MAX_DECIMALS);
    let scale = 10f64.powi(decimals as i32);
    partition_units(total, count, decimals)
        .into_iter()
        .map(|units| units as f64 / scale)
        .collect()
}

/// Same split expressed in units of `10^-decimals`.
pub fn partition_units(total: f64, count: usize, decimals: u32) -> Vec<i128> {
    if count == 0 {
        return Vec::new();
    }

    let scale = 10f64.powi(decimals.min(MAX_DECIMALS) as i32);
    let total_units = (total * scale).round() as i128;
    let base = total_units.div_euclid(count as i128);
    let others = base * (count as i128 - 1);

    let mut parts = vec![base; count - 1];
    parts.push(total_units - others);
    parts
}

/// Integer split of a non-negative count, e.g. impressions across ads.
pub fn partition_count(total: u64, count: usize) -> Vec<u64> {
    partition_units(total as f64, count, 0)
        .into_iter()
        .map(|units| units.max(0) as u64)
        .collect()
}
