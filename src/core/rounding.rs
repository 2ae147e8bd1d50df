/// Round to two decimal places (used for percentage deltas)
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Clamp a heuristic component into the 0-100 range
pub fn clamp_component(value: f64) -> f64 {
    value.clamp(0.0, 100.0)
}

/// Round and clamp a weighted score into the valid 1-100 range
pub fn clamp_score(value: f64) -> i32 {
    let rounded = value.round();
    if rounded.is_nan() {
        return 1;
    }
    (rounded as i64).clamp(1, 100) as i32
}
