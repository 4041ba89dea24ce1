//! Savitzky-Golay polynomial smoothing.
//!
//! Fits a polynomial of degree `p` by least squares to each window of `w`
//! samples. Interior samples use the centred window. The first and last
//! `w/2` samples are evaluated on the edge window's polynomial instead of
//! mirroring the signal, so the ends of an I-V sweep are not folded back onto
//! themselves.

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum SgError {
    #[error("window length must be odd and at least 3, got {0}")]
    InvalidWindow(usize),
    #[error("polynomial order {order} >= window size {window}")]
    OrderTooHigh { order: usize, window: usize },
    #[error("normal equations are singular")]
    Singular,
}

/// Least-squares weights that evaluate the fitted polynomial at `position`
/// (0-based) inside a window of `window` samples.
pub fn fit_weights(window: usize, poly_order: usize, position: usize) -> Result<Vec<f64>, SgError> {
    if window < 3 || window % 2 == 0 {
        return Err(SgError::InvalidWindow(window));
    }
    if poly_order >= window {
        return Err(SgError::OrderTooHigh {
            order: poly_order,
            window,
        });
    }

    let p = poly_order + 1;

    // Vandermonde rows J[i][k] = (i - position)^k
    let j: Vec<Vec<f64>> = (0..window)
        .map(|i| {
            let x = i as f64 - position as f64;
            let mut xk = 1.0;
            (0..p)
                .map(|_| {
                    let v = xk;
                    xk *= x;
                    v
                })
                .collect()
        })
        .collect();

    let mut jtj = vec![vec![0.0; p]; p];
    for (row, out) in jtj.iter_mut().enumerate() {
        for (col, cell) in out.iter_mut().enumerate() {
            *cell = j.iter().map(|r| r[row] * r[col]).sum();
        }
    }

    let inv = invert(jtj)?;

    // Value at x = 0 is the constant coefficient: row 0 of (JᵀJ)⁻¹Jᵀ
    Ok(j
        .iter()
        .map(|r| (0..p).map(|k| inv[0][k] * r[k]).sum())
        .collect())
}

/// Gauss-Jordan inverse with partial pivoting
fn invert(mut a: Vec<Vec<f64>>) -> Result<Vec<Vec<f64>>, SgError> {
    let p = a.len();
    let mut aug: Vec<Vec<f64>> = a
        .iter_mut()
        .enumerate()
        .map(|(i, row)| {
            let mut r = std::mem::take(row);
            r.extend((0..p).map(|k| if k == i { 1.0 } else { 0.0 }));
            r
        })
        .collect();

    for col in 0..p {
        let max_row = (col..p)
            .max_by(|&x, &y| aug[x][col].abs().total_cmp(&aug[y][col].abs()))
            .unwrap_or(col);
        aug.swap(col, max_row);

        let pivot = aug[col][col];
        if pivot.abs() < 1e-15 {
            return Err(SgError::Singular);
        }
        for v in aug[col].iter_mut() {
            *v /= pivot;
        }

        for row in 0..p {
            if row != col {
                let factor = aug[row][col];
                if factor != 0.0 {
                    for k in 0..2 * p {
                        aug[row][k] -= factor * aug[col][k];
                    }
                }
            }
        }
    }

    Ok(aug.into_iter().map(|r| r[p..].to_vec()).collect())
}

/// Savitzky-Golay smoother with cached weights for every window position
#[derive(Debug, Clone)]
pub struct SavitzkyGolay {
    window: usize,
    poly_order: usize,
    weights: Vec<Vec<f64>>,
}

impl SavitzkyGolay {
    pub fn new(window: usize, poly_order: usize) -> Result<Self, SgError> {
        let weights = (0..window)
            .map(|pos| fit_weights(window, poly_order, pos))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self {
            window,
            poly_order,
            weights,
        })
    }

    /// Filter sized for a signal of `len` samples.
    ///
    /// The window shrinks to `len` (rounded down to odd) and the order to
    /// `window - 1`. Returns `None` when fewer than 3 samples remain.
    pub fn for_length(len: usize, window: usize, poly_order: usize) -> Option<Self> {
        let mut window = window.min(len);
        if window % 2 == 0 {
            window = window.saturating_sub(1);
        }
        if window < 3 {
            return None;
        }
        Self::new(window, poly_order.min(window - 1)).ok()
    }

    pub fn window_size(&self) -> usize {
        self.window
    }

    pub fn poly_order(&self) -> usize {
        self.poly_order
    }

    pub fn smooth(&self, data: &[f64]) -> Vec<f64> {
        let n = data.len();
        if n < self.window {
            return data.to_vec();
        }
        let half = self.window / 2;

        (0..n)
            .map(|i| {
                let start = i.saturating_sub(half).min(n - self.window);
                let weights = &self.weights[i - start];
                weights
                    .iter()
                    .zip(&data[start..start + self.window])
                    .map(|(w, y)| w * y)
                    .sum()
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_centre_weights_match_classic_table() {
        // 5-point quadratic: (-3, 12, 17, 12, -3) / 35
        let w = fit_weights(5, 2, 2).unwrap();
        let expected = [-3.0, 12.0, 17.0, 12.0, -3.0].map(|v| v / 35.0);
        for (a, b) in w.iter().zip(expected.iter()) {
            assert!((a - b).abs() < 1e-12);
        }
    }

    #[test]
    fn test_weights_sum_to_one_at_every_position() {
        for pos in 0..5 {
            let w = fit_weights(5, 2, pos).unwrap();
            assert!((w.iter().sum::<f64>() - 1.0).abs() < 1e-10);
        }
    }

    #[test]
    fn test_quadratic_preserved_including_edges() {
        let data: Vec<f64> = (0..12).map(|i| 0.5 * (i * i) as f64 - 3.0 * i as f64 + 2.0).collect();
        let sg = SavitzkyGolay::new(5, 2).unwrap();
        let smoothed = sg.smooth(&data);
        for (s, d) in smoothed.iter().zip(data.iter()) {
            assert!((s - d).abs() < 1e-8, "{} vs {}", s, d);
        }
    }

    #[test]
    fn test_reduces_alternating_noise() {
        let data: Vec<f64> = (0..40)
            .map(|i| 10.0 - 0.1 * i as f64 + if i % 2 == 0 { 0.2 } else { -0.2 })
            .collect();
        let smoothed = SavitzkyGolay::new(5, 2).unwrap().smooth(&data);
        let rough = |v: &[f64]| v.windows(2).map(|w| (w[1] - w[0]).powi(2)).sum::<f64>();
        assert!(rough(&smoothed) < rough(&data));
    }

    #[test]
    fn test_invalid_configurations() {
        assert_eq!(fit_weights(4, 2, 0), Err(SgError::InvalidWindow(4)));
        assert_eq!(fit_weights(1, 0, 0), Err(SgError::InvalidWindow(1)));
        assert_eq!(
            fit_weights(3, 3, 1),
            Err(SgError::OrderTooHigh { order: 3, window: 3 })
        );
    }

    #[test]
    fn test_for_length_boundaries() {
        assert!(SavitzkyGolay::for_length(2, 5, 2).is_none());

        let three = SavitzkyGolay::for_length(3, 5, 2).unwrap();
        assert_eq!((three.window_size(), three.poly_order()), (3, 2));

        // Even lengths round the window down to stay odd
        let four = SavitzkyGolay::for_length(4, 5, 2).unwrap();
        assert_eq!((four.window_size(), four.poly_order()), (3, 2));

        let six = SavitzkyGolay::for_length(6, 5, 2).unwrap();
        assert_eq!((six.window_size(), six.poly_order()), (5, 2));
    }

    #[test]
    fn test_window_equal_to_order_plus_one_interpolates() {
        // Three points, quadratic: the fit passes through every sample
        let sg = SavitzkyGolay::new(3, 2).unwrap();
        let data = vec![1.0, 4.0, 2.0];
        let smoothed = sg.smooth(&data);
        for (s, d) in smoothed.iter().zip(data.iter()) {
            assert!((s - d).abs() < 1e-9);
        }
    }

    #[test]
    fn test_short_signal_passthrough() {
        let sg = SavitzkyGolay::new(5, 2).unwrap();
        assert_eq!(sg.smooth(&[1.0, 2.0, 3.0]), vec![1.0, 2.0, 3.0]);
    }
}
