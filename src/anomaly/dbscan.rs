//! Density-based clustering (DBSCAN) over rows of a feature matrix.
//!
//! A point is a core point when at least `min_samples` points, itself
//! included, lie within Euclidean distance `eps`. Clusters grow from core
//! points through their neighborhoods; points reachable from no core point
//! are noise.

use ndarray::{Array2, ArrayView1};

/// Label of points outside every cluster
pub const NOISE: i32 = -1;

#[derive(Debug, Clone, PartialEq)]
pub struct Clustering {
    /// Cluster id per row, or [`NOISE`]
    pub labels: Vec<i32>,
    /// Row indices of core points, ascending
    pub core_indices: Vec<usize>,
    pub n_clusters: usize,
}

impl Clustering {
    pub fn n_noise(&self) -> usize {
        self.labels.iter().filter(|l| **l == NOISE).count()
    }
}

pub fn euclidean(a: ArrayView1<f64>, b: ArrayView1<f64>) -> f64 {
    a.iter()
        .zip(b.iter())
        .map(|(x, y)| (x - y).powi(2))
        .sum::<f64>()
        .sqrt()
}

fn neighbors(x: &Array2<f64>, idx: usize, eps: f64) -> Vec<usize> {
    let row = x.row(idx);
    (0..x.nrows())
        .filter(|&j| euclidean(row, x.row(j)) <= eps)
        .collect()
}

pub fn dbscan(x: &Array2<f64>, eps: f64, min_samples: usize) -> Clustering {
    let n = x.nrows();
    let neighborhoods: Vec<Vec<usize>> = (0..n).map(|i| neighbors(x, i, eps)).collect();
    let is_core: Vec<bool> = neighborhoods.iter().map(|nb| nb.len() >= min_samples).collect();

    let mut labels = vec![NOISE; n];
    let mut cluster: i32 = 0;

    for start in 0..n {
        if labels[start] != NOISE || !is_core[start] {
            continue;
        }

        labels[start] = cluster;
        let mut frontier = vec![start];
        while let Some(point) = frontier.pop() {
            if !is_core[point] {
                continue;
            }
            for &next in &neighborhoods[point] {
                if labels[next] == NOISE {
                    labels[next] = cluster;
                    frontier.push(next);
                }
            }
        }
        cluster += 1;
    }

    let core_indices = (0..n).filter(|&i| is_core[i]).collect();
    Clustering {
        labels,
        core_indices,
        n_clusters: cluster as usize,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn test_two_blobs_and_noise() {
        let x = array![
            [0.0, 0.0],
            [0.1, 0.0],
            [0.0, 0.1],
            [5.0, 5.0],
            [5.1, 5.0],
            [5.0, 5.1],
            [20.0, 20.0]
        ];
        let result = dbscan(&x, 0.5, 3);

        assert_eq!(result.n_clusters, 2);
        assert_eq!(result.labels[6], NOISE);
        assert_eq!(result.n_noise(), 1);
        assert_eq!(result.labels[0], result.labels[2]);
        assert_ne!(result.labels[0], result.labels[3]);
        assert_eq!(result.core_indices, vec![0, 1, 2, 3, 4, 5]);
    }

    #[test]
    fn test_border_point_joins_cluster() {
        let x = array![[0.0], [0.1], [0.2], [0.6]];
        let result = dbscan(&x, 0.45, 3);

        assert_eq!(result.n_clusters, 1);
        assert_eq!(result.labels[3], 0);
        assert!(!result.core_indices.contains(&3));
    }

    #[test]
    fn test_sparse_data_is_all_noise() {
        let x = array![[0.0], [10.0], [20.0]];
        let result = dbscan(&x, 0.5, 2);
        assert_eq!(result.n_clusters, 0);
        assert_eq!(result.n_noise(), 3);
        assert!(result.core_indices.is_empty());
    }

    #[test]
    fn test_min_samples_one_makes_every_point_core() {
        let x = array![[0.0], [10.0]];
        let result = dbscan(&x, 0.5, 1);
        assert_eq!(result.n_clusters, 2);
        assert_eq!(result.n_noise(), 0);
    }
}
