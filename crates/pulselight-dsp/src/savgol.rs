//! Savitzky-Golay least-squares smoothing.
//!
//! Coefficients come from the normal equations of a local polynomial fit
//! (Savitzky & Golay, 1964) and are cached per `(window, order)` pair. The
//! solve runs in `f64`; the convolution kernel is stored as `f32` like the
//! rest of the signal path.

use ndarray::Array1;

use crate::error::DspError;

/// Compute smoothing coefficients for an odd `window_size` and
/// `poly_order < window_size`.
pub(crate) fn coefficients(window_size: usize, poly_order: usize) -> Result<Vec<f32>, DspError> {
    if window_size < 3 || window_size % 2 == 0 {
        return Err(DspError::InvalidParameter(format!(
            "window size must be odd and >= 3, got {window_size}"
        )));
    }
    if poly_order >= window_size {
        return Err(DspError::InvalidParameter(format!(
            "polynomial order {poly_order} must be < window size {window_size}"
        )));
    }

    let m = (window_size - 1) / 2;
    let p = poly_order + 1;

    // Vandermonde-like design matrix J[i][k] = i^k for i in -m..=m
    let mut j = vec![vec![0.0f64; p]; window_size];
    for (idx, row) in j.iter_mut().enumerate() {
        let x = idx as f64 - m as f64;
        let mut xk = 1.0;
        for cell in row.iter_mut() {
            *cell = xk;
            xk *= x;
        }
    }

    // Normal equations J^T J
    let mut jtj = vec![vec![0.0f64; p]; p];
    for (row, jtj_row) in jtj.iter_mut().enumerate() {
        for (col, cell) in jtj_row.iter_mut().enumerate() {
            *cell = j.iter().map(|ji| ji[row] * ji[col]).sum();
        }
    }

    // Invert via Gauss-Jordan on [JTJ | I]
    let mut aug = vec![vec![0.0f64; 2 * p]; p];
    for i in 0..p {
        aug[i][..p].copy_from_slice(&jtj[i]);
        aug[i][p + i] = 1.0;
    }
    for col in 0..p {
        let mut pivot_row = col;
        let mut pivot_val = aug[col][col].abs();
        for row in (col + 1)..p {
            if aug[row][col].abs() > pivot_val {
                pivot_val = aug[row][col].abs();
                pivot_row = row;
            }
        }
        aug.swap(col, pivot_row);

        let pivot = aug[col][col];
        if pivot.abs() < 1e-12 {
            // Degenerate fit, retry with a lower order
            if poly_order == 0 {
                return Err(DspError::SingularMatrix(
                    "savitzky-golay normal equations".into(),
                ));
            }
            return coefficients(window_size, poly_order - 1);
        }
        for v in aug[col].iter_mut() {
            *v /= pivot;
        }
        for row in 0..p {
            if row != col {
                let factor = aug[row][col];
                for k in 0..2 * p {
                    aug[row][k] -= factor * aug[col][k];
                }
            }
        }
    }

    // Smoothing kernel: c_i = sum_k inv(JTJ)[0][k] * J[i][k]
    let coeffs = j
        .iter()
        .map(|ji| {
            let c: f64 = (0..p).map(|k| aug[0][p + k] * ji[k]).sum();
            c as f32
        })
        .collect();

    Ok(coeffs)
}

/// Convolve `signal` with `coeffs`, mirroring samples past both edges.
pub(crate) fn apply(signal: &Array1<f32>, coeffs: &[f32]) -> Array1<f32> {
    let n = signal.len();
    let m = coeffs.len() / 2;
    let mut out = Array1::zeros(n);
    for i in 0..n {
        let mut acc = 0.0f32;
        for (k, &c) in coeffs.iter().enumerate() {
            let j = i as i64 + k as i64 - m as i64;
            let idx = if j < 0 {
                (-j) as usize
            } else if j >= n as i64 {
                2 * (n - 1) - j as usize
            } else {
                j as usize
            };
            acc += c * signal[idx.min(n - 1)];
        }
        out[i] = acc;
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_coefficients_symmetric_and_normalized() {
        let c = coefficients(7, 2).unwrap();
        assert_eq!(c.len(), 7);
        let sum: f32 = c.iter().sum();
        assert_relative_eq!(sum, 1.0, epsilon = 1e-5);
        for i in 0..3 {
            assert_relative_eq!(c[i], c[6 - i], epsilon = 1e-5);
        }
    }

    #[test]
    fn test_even_window_rejected() {
        assert!(matches!(
            coefficients(6, 2),
            Err(DspError::InvalidParameter(_))
        ));
    }

    #[test]
    fn test_order_ge_window_rejected() {
        assert!(matches!(
            coefficients(5, 5),
            Err(DspError::InvalidParameter(_))
        ));
    }

    #[test]
    fn test_linear_ramp_preserved() {
        let signal: Array1<f32> = (0..40).map(|i| 0.5 * i as f32 + 2.0).collect();
        let coeffs = coefficients(7, 2).unwrap();
        let smoothed = apply(&signal, &coeffs);
        // Interior points; the mirrored edges fold the ramp
        for i in 3..37 {
            assert_relative_eq!(smoothed[i], signal[i], epsilon = 1e-3);
        }
    }

    #[test]
    fn test_constant_signal_unchanged_everywhere() {
        let signal = Array1::from(vec![4.2f32; 25]);
        let coeffs = coefficients(9, 2).unwrap();
        let smoothed = apply(&signal, &coeffs);
        for &v in smoothed.iter() {
            assert_relative_eq!(v, 4.2, epsilon = 1e-4);
        }
    }

    #[test]
    fn test_noise_variance_not_increased() {
        let signal: Array1<f32> = (0..120)
            .map(|i| {
                let t = i as f32 / 30.0;
                (2.0 * std::f32::consts::PI * t).sin() + 0.3 * ((i * 13 + 5) as f32 * 0.7).sin()
            })
            .collect();
        let coeffs = coefficients(9, 3).unwrap();
        let smoothed = apply(&signal, &coeffs);

        let roughness = |x: &Array1<f32>| -> f32 {
            x.iter()
                .zip(x.iter().skip(1))
                .map(|(a, b)| (b - a).powi(2))
                .sum()
        };
        assert!(roughness(&smoothed) < roughness(&signal));
    }

    #[test]
    fn test_peak_position_preserved() {
        let mut v = vec![0.0f32; 50];
        v[25] = 10.0;
        let signal = Array1::from(v);
        let coeffs = coefficients(7, 4).unwrap();
        let smoothed = apply(&signal, &coeffs);
        let peak_idx = smoothed
            .iter()
            .enumerate()
            .max_by(|a, b| a.1.partial_cmp(b.1).unwrap())
            .map(|(i, _)| i)
            .unwrap();
        assert_eq!(peak_idx, 25);
    }
}
