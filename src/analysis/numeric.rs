//! Small numeric helpers shared by the parameter extractor.

use itertools::Itertools;

/// Index of the first sample with the smallest absolute value
pub fn nearest_zero(values: &[f64]) -> Option<usize> {
    values
        .iter()
        .position_min_by(|a, b| a.abs().total_cmp(&b.abs()))
}

/// Index of the first maximum
pub fn first_argmax(values: &[f64]) -> Option<usize> {
    // Reversed ordering: the first minimum of it is the first maximum
    values.iter().position_min_by(|a, b| b.total_cmp(a))
}

/// Slope of the ordinary least-squares line through `points`.
///
/// `None` for fewer than two points or when all x are equal.
pub fn least_squares_slope(points: &[(f64, f64)]) -> Option<f64> {
    if points.len() < 2 {
        return None;
    }
    let n = points.len() as f64;
    let mean_x = points.iter().map(|p| p.0).sum::<f64>() / n;
    let mean_y = points.iter().map(|p| p.1).sum::<f64>() / n;

    let sxx: f64 = points.iter().map(|p| (p.0 - mean_x).powi(2)).sum();
    if sxx <= f64::EPSILON * n {
        return None;
    }
    let sxy: f64 = points
        .iter()
        .map(|p| (p.0 - mean_x) * (p.1 - mean_y))
        .sum();
    Some(sxy / sxx)
}

/// Derivative of `f` with respect to a possibly non-uniform `x`.
///
/// Second-order central differences inside, one-sided differences at the
/// ends. Segments with zero spacing contribute a zero derivative.
pub fn gradient(f: &[f64], x: &[f64]) -> Vec<f64> {
    let n = f.len().min(x.len());
    if n < 2 {
        return vec![0.0; n];
    }

    let one_sided = |i: usize, j: usize| {
        let dx = x[j] - x[i];
        if dx == 0.0 {
            0.0
        } else {
            (f[j] - f[i]) / dx
        }
    };

    let mut out = Vec::with_capacity(n);
    out.push(one_sided(0, 1));
    for i in 1..n - 1 {
        let hs = x[i] - x[i - 1];
        let hd = x[i + 1] - x[i];
        let denom = hs * hd * (hs + hd);
        if denom == 0.0 {
            out.push(0.0);
        } else {
            out.push(
                (hs * hs * f[i + 1] + (hd * hd - hs * hs) * f[i] - hd * hd * f[i - 1]) / denom,
            );
        }
    }
    out.push(one_sided(n - 2, n - 1));
    out
}
