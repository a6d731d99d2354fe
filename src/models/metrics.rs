//! Regression metrics.

/// Mean squared error; `None` for empty input.
pub fn mean_squared_error(actual: &[f64], predicted: &[f64]) -> Option<f64> {
    if actual.is_empty() || actual.len() != predicted.len() {
        return None;
    }
    let sum: f64 = actual
        .iter()
        .zip(predicted)
        .map(|(a, p)| (a - p).powi(2))
        .sum();
    Some(sum / actual.len() as f64)
}

/// Coefficient of determination.
///
/// A constant target scores 1.0 when predicted exactly and 0.0 otherwise.
pub fn r2_score(actual: &[f64], predicted: &[f64]) -> Option<f64> {
    let mse = mean_squared_error(actual, predicted)?;
    let n = actual.len() as f64;
    let mean = actual.iter().sum::<f64>() / n;
    let variance = actual.iter().map(|a| (a - mean).powi(2)).sum::<f64>() / n;

    if variance <= f64::EPSILON {
        return Some(if mse <= f64::EPSILON { 1.0 } else { 0.0 });
    }
    Some(1.0 - mse / variance)
}
