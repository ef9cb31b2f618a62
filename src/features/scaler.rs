//! Per-dimension standardization (zero mean, unit variance)

use crate::error::{EvalSenseError, Result};
use ndarray::{Array1, Array2, ArrayView1, Axis};
use serde::{Deserialize, Serialize};

/// Fitted column means and scales
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StandardScaler {
    pub mean: Array1<f64>,
    /// Population standard deviation; constant columns keep a scale of 1
    pub scale: Array1<f64>,
}

impl StandardScaler {
    pub fn fit(data: &Array2<f64>) -> Result<Self> {
        let mean = data.mean_axis(Axis(0)).ok_or_else(|| {
            EvalSenseError::EmptyBatch("cannot fit a scaler on zero rows".to_string())
        })?;
        let scale = data
            .std_axis(Axis(0), 0.0)
            .mapv(|s| if s > f64::EPSILON { s } else { 1.0 });
        Ok(Self { mean, scale })
    }

    pub fn n_features(&self) -> usize {
        self.mean.len()
    }

    pub fn transform(&self, data: &Array2<f64>) -> Array2<f64> {
        (data - &self.mean) / &self.scale
    }

    pub fn transform_row(&self, row: ArrayView1<f64>) -> Array1<f64> {
        (&row - &self.mean) / &self.scale
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn test_fit_transform_standardizes() {
        let data = array![[1.0, 10.0], [2.0, 10.0], [3.0, 10.0]];
        let scaler = StandardScaler::fit(&data).unwrap();
        let scaled = scaler.transform(&data);

        let col0 = scaled.column(0);
        assert!(col0.mean().unwrap().abs() < 1e-12);
        assert!((col0.std(0.0) - 1.0).abs() < 1e-12);

        // Constant column is centred, not divided by zero
        assert!(scaled.column(1).iter().all(|v| *v == 0.0));
        assert_eq!(scaler.scale[1], 1.0);
    }

    #[test]
    fn test_transform_row_matches_matrix() {
        let data = array![[1.0, 4.0], [3.0, 0.0]];
        let scaler = StandardScaler::fit(&data).unwrap();
        let row = scaler.transform_row(data.row(0));
        assert_eq!(row, scaler.transform(&data).row(0));
    }

    #[test]
    fn test_empty_fails() {
        let data = Array2::<f64>::zeros((0, 3));
        assert!(StandardScaler::fit(&data).is_err());
    }
}
