//! Principal-component analysis over column variables.

use nalgebra::DMatrix;
use ndarray::Array2;

use crate::error::DspError;

/// PCA decomposition result. Components are sorted by descending eigenvalue.
#[derive(Debug, Clone)]
pub struct Pca {
    /// Eigenvectors, one per component, each of length `n_variables`.
    pub components: Vec<Vec<f32>>,
    /// Eigenvalues of the covariance matrix.
    pub eigenvalues: Vec<f32>,
    /// Fraction of total variance per component, in [0, 1].
    pub explained_variance: Vec<f32>,
    /// Running sum of `explained_variance`.
    pub cumulative_variance: Vec<f32>,
    /// Input projected onto the components (`n_samples x n_components`).
    pub projected: Array2<f32>,
}

/// Decompose `data` (rows = samples, columns = variables).
pub(crate) fn principal_components(data: &Array2<f32>) -> Result<Pca, DspError> {
    let (rows, cols) = data.dim();
    if rows < 2 {
        return Err(DspError::InvalidInput(format!(
            "need at least 2 samples for PCA, got {rows}"
        )));
    }
    if cols == 0 {
        return Err(DspError::InvalidInput("data has no columns".into()));
    }

    // Center columns
    let mut centered = data.clone();
    for c in 0..cols {
        let mean = centered.column(c).mean().unwrap_or(0.0);
        for r in 0..rows {
            centered[[r, c]] -= mean;
        }
    }

    // Covariance matrix (cols x cols)
    let denom = (rows - 1) as f32;
    let mut cov = DMatrix::<f32>::zeros(cols, cols);
    for a in 0..cols {
        for b in a..cols {
            let mut sum = 0.0f32;
            for r in 0..rows {
                sum += centered[[r, a]] * centered[[r, b]];
            }
            let v = sum / denom;
            cov[(a, b)] = v;
            cov[(b, a)] = v;
        }
    }

    let eigen = cov.symmetric_eigen();

    // Sort eigenpairs descending
    let mut order: Vec<usize> = (0..cols).collect();
    order.sort_by(|&a, &b| {
        eigen.eigenvalues[b]
            .partial_cmp(&eigen.eigenvalues[a])
            .unwrap_or(std::cmp::Ordering::Equal)
    });

    let eigenvalues: Vec<f32> = order.iter().map(|&i| eigen.eigenvalues[i]).collect();
    let components: Vec<Vec<f32>> = order
        .iter()
        .map(|&i| eigen.eigenvectors.column(i).iter().copied().collect())
        .collect();

    let total: f32 = eigenvalues.iter().map(|v| v.max(0.0)).sum();
    let explained_variance: Vec<f32> = if total > 0.0 {
        eigenvalues
            .iter()
            .map(|v| (v.max(0.0) / total).clamp(0.0, 1.0))
            .collect()
    } else {
        vec![0.0; cols]
    };
    let cumulative_variance: Vec<f32> = explained_variance
        .iter()
        .scan(0.0f32, |acc, &v| {
            *acc += v;
            Some(acc.min(1.0))
        })
        .collect();

    // Project centered data onto the sorted components
    let mut projected = Array2::zeros((rows, cols));
    for r in 0..rows {
        for (k, comp) in components.iter().enumerate() {
            let mut dot = 0.0f32;
            for c in 0..cols {
                dot += centered[[r, c]] * comp[c];
            }
            projected[[r, k]] = dot;
        }
    }

    Ok(Pca {
        components,
        eigenvalues,
        explained_variance,
        cumulative_variance,
        projected,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_dominant_direction_found() {
        // Points along y = 2x with tiny orthogonal jitter
        let n = 50;
        let mut data = Array2::zeros((n, 2));
        for i in 0..n {
            let t = i as f32 / n as f32 - 0.5;
            let jitter = 0.01 * ((i * 7) as f32).sin();
            data[[i, 0]] = t - 2.0 * jitter;
            data[[i, 1]] = 2.0 * t + jitter;
        }

        let pca = principal_components(&data).unwrap();
        assert!(pca.eigenvalues[0] >= pca.eigenvalues[1]);
        assert!(
            pca.explained_variance[0] > 0.95,
            "line-like data should concentrate variance, got {}",
            pca.explained_variance[0]
        );

        // First component parallel to (1, 2)/sqrt(5)
        let c = &pca.components[0];
        let ratio = (c[1] / c[0]).abs();
        assert_relative_eq!(ratio, 2.0, epsilon = 0.1);
    }

    #[test]
    fn test_cumulative_variance_reaches_one() {
        let mut data = Array2::zeros((20, 3));
        for i in 0..20 {
            data[[i, 0]] = i as f32;
            data[[i, 1]] = (i as f32 * 0.7).sin();
            data[[i, 2]] = (i as f32 * 1.3).cos();
        }
        let pca = principal_components(&data).unwrap();
        let last = *pca.cumulative_variance.last().unwrap();
        assert_relative_eq!(last, 1.0, epsilon = 1e-3);
    }

    #[test]
    fn test_projection_shape() {
        let data = Array2::from_shape_fn((10, 4), |(r, c)| (r * 4 + c) as f32);
        let pca = principal_components(&data).unwrap();
        assert_eq!(pca.projected.dim(), (10, 4));
        assert_eq!(pca.components.len(), 4);
    }

    #[test]
    fn test_single_sample_rejected() {
        let data = Array2::zeros((1, 3));
        assert!(matches!(
            principal_components(&data),
            Err(DspError::InvalidInput(_))
        ));
    }
}
