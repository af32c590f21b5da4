/// Mean of millisecond samples, rounded to the nearest millisecond (half
/// away from zero). Empty input has no mean.
pub fn mean_ms(samples: &[u64]) -> Option<u64> {
    if samples.is_empty() {
        return None;
    }

    let sum = samples.iter().sum::<u64>();
    Some((sum as f64 / samples.len() as f64).round() as u64)
}
