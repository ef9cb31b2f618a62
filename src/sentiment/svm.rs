//! Kernel support-vector classifier with calibrated probabilities.
//!
//! # Training
//!
//! Each class gets a binary RBF-kernel SVM (class vs rest) solved by SMO
//! with maximal-violating-pair working-set selection. Decision values are
//! mapped to probabilities with a Platt sigmoid fitted on cross-validated
//! decision values, then the per-class probabilities are normalized to sum
//! to one.
//!
//! The predicted class is the arg-max of the normalized probabilities, so
//! the reported confidence always belongs to the reported class.

use crate::error::{EvalSenseError, Result};
use ndarray::{Array1, Array2, ArrayView1, Axis};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

/// Floor for a non-positive curvature in the two-variable subproblem
const TAU: f64 = 1e-12;

/// Solver settings
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SvmParams {
    pub c: f64,
    /// `None` selects 1 / (n_features * Var(X))
    pub gamma: Option<f64>,
    pub tolerance: f64,
    pub max_iterations: usize,
    pub calibration_folds: usize,
    pub seed: u64,
}

impl Default for SvmParams {
    fn default() -> Self {
        Self {
            c: 1.0,
            gamma: None,
            tolerance: 1e-3,
            max_iterations: 100_000,
            calibration_folds: 5,
            seed: 42,
        }
    }
}

/// `exp(-gamma * ||a - b||^2)`
fn rbf(a: ArrayView1<f64>, b: ArrayView1<f64>, gamma: f64) -> f64 {
    let dist: f64 = a.iter().zip(b.iter()).map(|(x, y)| (x - y).powi(2)).sum();
    (-gamma * dist).exp()
}

/// Full Gram matrix of the RBF kernel over the rows of `x`
fn kernel_matrix(x: &Array2<f64>, gamma: f64) -> Array2<f64> {
    let norms: Array1<f64> = x.map_axis(Axis(1), |row| row.dot(&row));
    let gram = x.dot(&x.t());
    let n = x.nrows();
    Array2::from_shape_fn((n, n), |(i, j)| {
        let dist = (norms[i] + norms[j] - 2.0 * gram[[i, j]]).max(0.0);
        (-gamma * dist).exp()
    })
}

/// The "scale" heuristic: 1 / (n_features * variance of all entries)
pub fn scale_gamma(x: &Array2<f64>) -> f64 {
    let n_features = x.ncols().max(1) as f64;
    let var = x.var(0.0);
    if var > 0.0 {
        1.0 / (n_features * var)
    } else {
        1.0
    }
}

/// Dual solution of one binary problem over a subset of rows
struct DualSolution {
    alpha: Vec<f64>,
    rho: f64,
}

/// Solve the C-SVC dual on rows `idx` of a precomputed kernel
fn solve_dual(
    kernel: &Array2<f64>,
    idx: &[usize],
    y: &[f64],
    c: f64,
    tolerance: f64,
    max_iterations: usize,
) -> DualSolution {
    let n = idx.len();
    let mut alpha = vec![0.0; n];
    let mut grad = vec![-1.0; n];
    let q = |a: usize, b: usize| y[a] * y[b] * kernel[[idx[a], idx[b]]];

    let in_up = |t: usize, alpha: &[f64]| {
        (y[t] > 0.0 && alpha[t] < c) || (y[t] < 0.0 && alpha[t] > 0.0)
    };
    let in_low = |t: usize, alpha: &[f64]| {
        (y[t] > 0.0 && alpha[t] > 0.0) || (y[t] < 0.0 && alpha[t] < c)
    };

    let mut iterations = 0;
    while iterations < max_iterations {
        let mut g_max = f64::NEG_INFINITY;
        let mut g_min = f64::INFINITY;
        let mut sel_i = None;
        let mut sel_j = None;

        for t in 0..n {
            let yg = -y[t] * grad[t];
            if in_up(t, &alpha) && yg > g_max {
                g_max = yg;
                sel_i = Some(t);
            }
            if in_low(t, &alpha) && yg < g_min {
                g_min = yg;
                sel_j = Some(t);
            }
        }

        let (i, j) = match (sel_i, sel_j) {
            (Some(i), Some(j)) if g_max - g_min >= tolerance => (i, j),
            _ => break,
        };

        let old_ai = alpha[i];
        let old_aj = alpha[j];
        let qd_i = kernel[[idx[i], idx[i]]];
        let qd_j = kernel[[idx[j], idx[j]]];
        let q_ij = q(i, j);

        if y[i] != y[j] {
            let mut quad = qd_i + qd_j + 2.0 * q_ij;
            if quad <= 0.0 {
                quad = TAU;
            }
            let delta = (-grad[i] - grad[j]) / quad;
            let diff = alpha[i] - alpha[j];
            alpha[i] += delta;
            alpha[j] += delta;

            if diff > 0.0 {
                if alpha[j] < 0.0 {
                    alpha[j] = 0.0;
                    alpha[i] = diff;
                }
            } else if alpha[i] < 0.0 {
                alpha[i] = 0.0;
                alpha[j] = -diff;
            }
            if diff > 0.0 {
                if alpha[i] > c {
                    alpha[i] = c;
                    alpha[j] = c - diff;
                }
            } else if alpha[j] > c {
                alpha[j] = c;
                alpha[i] = c + diff;
            }
        } else {
            let mut quad = qd_i + qd_j - 2.0 * q_ij;
            if quad <= 0.0 {
                quad = TAU;
            }
            let delta = (grad[i] - grad[j]) / quad;
            let sum = alpha[i] + alpha[j];
            alpha[i] -= delta;
            alpha[j] += delta;

            if sum > c {
                if alpha[i] > c {
                    alpha[i] = c;
                    alpha[j] = sum - c;
                }
            } else if alpha[j] < 0.0 {
                alpha[j] = 0.0;
                alpha[i] = sum;
            }
            if sum > c {
                if alpha[j] > c {
                    alpha[j] = c;
                    alpha[i] = sum - c;
                }
            } else if alpha[i] < 0.0 {
                alpha[i] = 0.0;
                alpha[j] = sum;
            }
        }

        let d_ai = alpha[i] - old_ai;
        let d_aj = alpha[j] - old_aj;
        for k in 0..n {
            grad[k] += q(i, k) * d_ai + q(j, k) * d_aj;
        }

        iterations += 1;
    }

    if iterations >= max_iterations {
        warn!(
            "SMO reached the iteration cap ({}) before converging",
            max_iterations
        );
    }

    // Bias from free vectors, or the midpoint of the feasible interval
    let mut ub = f64::INFINITY;
    let mut lb = f64::NEG_INFINITY;
    let mut free_sum = 0.0;
    let mut free_count = 0usize;
    for t in 0..n {
        let yg = y[t] * grad[t];
        if alpha[t] >= c {
            if y[t] < 0.0 {
                ub = ub.min(yg);
            } else {
                lb = lb.max(yg);
            }
        } else if alpha[t] <= 0.0 {
            if y[t] > 0.0 {
                ub = ub.min(yg);
            } else {
                lb = lb.max(yg);
            }
        } else {
            free_sum += yg;
            free_count += 1;
        }
    }
    let rho = if free_count > 0 {
        free_sum / free_count as f64
    } else {
        (ub + lb) / 2.0
    };

    debug!(
        "SMO finished after {} iterations ({} free vectors)",
        iterations, free_count
    );
    DualSolution { alpha, rho }
}

/// Decision value of a solved subset problem for another row of the kernel
fn subset_decision(kernel: &Array2<f64>, idx: &[usize], y: &[f64], sol: &DualSolution, row: usize) -> f64 {
    idx.iter()
        .zip(y)
        .zip(&sol.alpha)
        .filter(|(_, a)| **a > 0.0)
        .map(|((&s, &ys), &a)| a * ys * kernel[[s, row]])
        .sum::<f64>()
        - sol.rho
}

/// One fitted binary decision surface
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BinarySvm {
    support_vectors: Array2<f64>,
    /// `alpha_i * y_i` per support vector
    dual_coef: Vec<f64>,
    rho: f64,
    gamma: f64,
}

impl BinarySvm {
    pub fn decision(&self, x: ArrayView1<f64>) -> f64 {
        self.support_vectors
            .rows()
            .into_iter()
            .zip(&self.dual_coef)
            .map(|(sv, coef)| coef * rbf(sv, x, self.gamma))
            .sum::<f64>()
            - self.rho
    }

    pub fn n_support(&self) -> usize {
        self.dual_coef.len()
    }
}

/// `P(y = +1 | f) = 1 / (1 + exp(a * f + b))`
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PlattSigmoid {
    pub a: f64,
    pub b: f64,
}

impl PlattSigmoid {
    /// Fit by Newton's method with backtracking line search
    pub fn fit(decisions: &[f64], positive: &[bool]) -> Self {
        let prior1 = positive.iter().filter(|p| **p).count() as f64;
        let prior0 = positive.len() as f64 - prior1;
        let hi_target = (prior1 + 1.0) / (prior1 + 2.0);
        let lo_target = 1.0 / (prior0 + 2.0);
        let targets: Vec<f64> = positive
            .iter()
            .map(|p| if *p { hi_target } else { lo_target })
            .collect();

        let max_iter = 100;
        let min_step = 1e-10;
        let sigma = 1e-12;
        let eps = 1e-5;

        let objective = |a: f64, b: f64| -> f64 {
            decisions
                .iter()
                .zip(&targets)
                .map(|(f, t)| {
                    let f_apb = f * a + b;
                    if f_apb >= 0.0 {
                        t * f_apb + (1.0 + (-f_apb).exp()).ln()
                    } else {
                        (t - 1.0) * f_apb + (1.0 + f_apb.exp()).ln()
                    }
                })
                .sum()
        };

        let mut a = 0.0;
        let mut b = ((prior0 + 1.0) / (prior1 + 1.0)).ln();
        let mut fval = objective(a, b);

        for _ in 0..max_iter {
            let (mut h11, mut h22, mut h21, mut g1, mut g2) = (sigma, sigma, 0.0, 0.0, 0.0);
            for (f, t) in decisions.iter().zip(&targets) {
                let f_apb = f * a + b;
                let (p, q) = if f_apb >= 0.0 {
                    let e = (-f_apb).exp();
                    (e / (1.0 + e), 1.0 / (1.0 + e))
                } else {
                    let e = f_apb.exp();
                    (1.0 / (1.0 + e), e / (1.0 + e))
                };
                let d2 = p * q;
                h11 += f * f * d2;
                h22 += d2;
                h21 += f * d2;
                let d1 = t - p;
                g1 += f * d1;
                g2 += d1;
            }

            if g1.abs() < eps && g2.abs() < eps {
                break;
            }

            let det = h11 * h22 - h21 * h21;
            let d_a = -(h22 * g1 - h21 * g2) / det;
            let d_b = -(-h21 * g1 + h11 * g2) / det;
            let gd = g1 * d_a + g2 * d_b;

            let mut step = 1.0;
            while step >= min_step {
                let new_a = a + step * d_a;
                let new_b = b + step * d_b;
                let new_f = objective(new_a, new_b);
                if new_f < fval + 1e-4 * step * gd {
                    a = new_a;
                    b = new_b;
                    fval = new_f;
                    break;
                }
                step /= 2.0;
            }

            if step < min_step {
                debug!("Platt line search failed; keeping current sigmoid");
                break;
            }
        }

        Self { a, b }
    }

    pub fn probability(&self, decision: f64) -> f64 {
        let f_apb = decision * self.a + self.b;
        if f_apb >= 0.0 {
            let e = (-f_apb).exp();
            e / (1.0 + e)
        } else {
            1.0 / (1.0 + f_apb.exp())
        }
    }
}

/// Binary surface plus its probability calibration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CalibratedClassModel {
    pub svm: BinarySvm,
    pub sigmoid: PlattSigmoid,
}

/// Multi-class classifier: one calibrated surface per class seen in training
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OneVsRestSvm {
    n_classes: usize,
    /// Indexed by class; `None` for classes absent from training
    models: Vec<Option<CalibratedClassModel>>,
    gamma: f64,
}

impl OneVsRestSvm {
    /// Fit on rows of `x` labelled with class indices in `0..n_classes`
    pub fn fit(x: &Array2<f64>, labels: &[usize], n_classes: usize, params: &SvmParams) -> Result<Self> {
        if x.nrows() != labels.len() {
            return Err(EvalSenseError::TrainingData(format!(
                "{} rows but {} labels",
                x.nrows(),
                labels.len()
            )));
        }
        let present: Vec<usize> = (0..n_classes).filter(|c| labels.contains(c)).collect();
        if present.len() < 2 {
            return Err(EvalSenseError::TrainingData(
                "classifier needs at least two classes".to_string(),
            ));
        }

        let gamma = params.gamma.unwrap_or_else(|| scale_gamma(x));
        let kernel = kernel_matrix(x, gamma);
        let all: Vec<usize> = (0..x.nrows()).collect();
        let folds = make_folds(x.nrows(), params.calibration_folds, params.seed);

        let mut models = Vec::with_capacity(n_classes);
        for class in 0..n_classes {
            if !present.contains(&class) {
                models.push(None);
                continue;
            }

            let y: Vec<f64> = labels
                .iter()
                .map(|l| if *l == class { 1.0 } else { -1.0 })
                .collect();

            let decisions = cross_validated_decisions(&kernel, &y, &folds, params);
            let positive: Vec<bool> = y.iter().map(|v| *v > 0.0).collect();
            let sigmoid = PlattSigmoid::fit(&decisions, &positive);

            let sol = solve_dual(&kernel, &all, &y, params.c, params.tolerance, params.max_iterations);
            let sv_idx: Vec<usize> = (0..all.len()).filter(|&t| sol.alpha[t] > 0.0).collect();
            let support_vectors = x.select(Axis(0), &sv_idx);
            let dual_coef = sv_idx.iter().map(|&t| sol.alpha[t] * y[t]).collect();

            let svm = BinarySvm {
                support_vectors,
                dual_coef,
                rho: sol.rho,
                gamma,
            };
            debug!(
                "Class {} surface: {} support vectors, sigmoid a={:.4} b={:.4}",
                class,
                svm.n_support(),
                sigmoid.a,
                sigmoid.b
            );
            models.push(Some(CalibratedClassModel { svm, sigmoid }));
        }

        Ok(Self {
            n_classes,
            models,
            gamma,
        })
    }

    pub fn n_classes(&self) -> usize {
        self.n_classes
    }

    pub fn gamma(&self) -> f64 {
        self.gamma
    }

    /// Normalized class probabilities for one row
    pub fn predict_proba(&self, x: ArrayView1<f64>) -> Vec<f64> {
        let mut probs: Vec<f64> = self
            .models
            .iter()
            .map(|m| match m {
                Some(model) => model.sigmoid.probability(model.svm.decision(x)),
                None => 0.0,
            })
            .collect();

        let total: f64 = probs.iter().sum();
        if total > 0.0 {
            for p in probs.iter_mut() {
                *p /= total;
            }
        } else {
            let present = self.models.iter().filter(|m| m.is_some()).count().max(1) as f64;
            for (p, m) in probs.iter_mut().zip(&self.models) {
                *p = if m.is_some() { 1.0 / present } else { 0.0 };
            }
        }
        probs
    }

    /// Arg-max class and its probability
    pub fn predict(&self, x: ArrayView1<f64>) -> (usize, f64, Vec<f64>) {
        let probs = self.predict_proba(x);
        let (class, p) = probs
            .iter()
            .copied()
            .enumerate()
            .fold((0, f64::NEG_INFINITY), |best, (i, p)| if p > best.1 { (i, p) } else { best });
        (class, p, probs)
    }
}

/// Seeded partition of `0..n` into at most `k` folds
fn make_folds(n: usize, k: usize, seed: u64) -> Vec<Vec<usize>> {
    let k = k.min(n);
    if k < 2 {
        return Vec::new();
    }
    let mut order: Vec<usize> = (0..n).collect();
    order.shuffle(&mut StdRng::seed_from_u64(seed));

    let mut folds = vec![Vec::new(); k];
    for (pos, idx) in order.into_iter().enumerate() {
        folds[pos % k].push(idx);
    }
    folds
}

/// Out-of-fold decision values; in-sample when there are too few rows to fold
fn cross_validated_decisions(
    kernel: &Array2<f64>,
    y: &[f64],
    folds: &[Vec<usize>],
    params: &SvmParams,
) -> Vec<f64> {
    let n = y.len();
    if folds.is_empty() {
        let all: Vec<usize> = (0..n).collect();
        let sol = solve_dual(kernel, &all, y, params.c, params.tolerance, params.max_iterations);
        return (0..n).map(|t| subset_decision(kernel, &all, y, &sol, t)).collect();
    }

    let mut decisions = vec![0.0; n];
    for (f, held_out) in folds.iter().enumerate() {
        let train_idx: Vec<usize> = folds
            .iter()
            .enumerate()
            .filter(|(g, _)| *g != f)
            .flat_map(|(_, fold)| fold.iter().copied())
            .collect();
        let train_y: Vec<f64> = train_idx.iter().map(|&t| y[t]).collect();

        let has_pos = train_y.iter().any(|v| *v > 0.0);
        let has_neg = train_y.iter().any(|v| *v < 0.0);
        if !(has_pos && has_neg) {
            // Single-class training part: constant decision on the seen side
            let constant = if has_pos { 1.0 } else { -1.0 };
            for &t in held_out {
                decisions[t] = constant;
            }
            continue;
        }

        let sol = solve_dual(kernel, &train_idx, &train_y, params.c, params.tolerance, params.max_iterations);
        for &t in held_out {
            decisions[t] = subset_decision(kernel, &train_idx, &train_y, &sol, t);
        }
    }
    decisions
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    fn clusters() -> (Array2<f64>, Vec<usize>) {
        let x = array![
            [0.0, 0.1],
            [0.1, 0.0],
            [0.2, 0.1],
            [0.1, 0.2],
            [0.0, 0.0],
            [3.0, 3.1],
            [3.1, 3.0],
            [2.9, 3.0],
            [3.0, 2.9],
            [3.1, 3.1],
        ];
        let labels = vec![0, 0, 0, 0, 0, 1, 1, 1, 1, 1];
        (x, labels)
    }

    #[test]
    fn test_separable_clusters() {
        let (x, labels) = clusters();
        let params = SvmParams {
            gamma: Some(0.5),
            calibration_folds: 2,
            ..SvmParams::default()
        };
        let model = OneVsRestSvm::fit(&x, &labels, 2, &params).unwrap();

        let (class, p, probs) = model.predict(array![0.05, 0.05].view());
        assert_eq!(class, 0);
        assert!(p > 0.5);
        assert!((probs.iter().sum::<f64>() - 1.0).abs() < 1e-9);

        let (class, _, _) = model.predict(array![3.0, 3.0].view());
        assert_eq!(class, 1);
    }

    #[test]
    fn test_prediction_is_deterministic() {
        let (x, labels) = clusters();
        let params = SvmParams::default();
        let a = OneVsRestSvm::fit(&x, &labels, 2, &params).unwrap();
        let b = OneVsRestSvm::fit(&x, &labels, 2, &params).unwrap();
        assert_eq!(a, b);

        let row = array![1.4, 1.6];
        assert_eq!(a.predict_proba(row.view()), a.predict_proba(row.view()));
    }

    #[test]
    fn test_absent_class_gets_zero_probability() {
        let (x, labels) = clusters();
        let model = OneVsRestSvm::fit(&x, &labels, 3, &SvmParams::default()).unwrap();
        let probs = model.predict_proba(array![0.0, 0.0].view());
        assert_eq!(probs.len(), 3);
        assert_eq!(probs[2], 0.0);
    }

    #[test]
    fn test_single_class_rejected() {
        let (x, _) = clusters();
        let labels = vec![0; 10];
        assert!(OneVsRestSvm::fit(&x, &labels, 3, &SvmParams::default()).is_err());
    }

    #[test]
    fn test_platt_is_monotone_decreasing_in_a() {
        let decisions = [-2.0, -1.5, -1.0, 1.0, 1.5, 2.0];
        let positive = [false, false, false, true, true, true];
        let sigmoid = PlattSigmoid::fit(&decisions, &positive);
        assert!(sigmoid.a < 0.0);
        assert!(sigmoid.probability(2.0) > 0.5);
        assert!(sigmoid.probability(-2.0) < 0.5);
    }

    #[test]
    fn test_scale_gamma() {
        let x = array![[0.0, 2.0], [2.0, 0.0]];
        // Var of [0, 2, 2, 0] is 1
        assert!((scale_gamma(&x) - 0.5).abs() < 1e-12);
        assert_eq!(scale_gamma(&Array2::zeros((2, 2))), 1.0);
    }

    #[test]
    fn test_folds_cover_every_row_once() {
        let folds = make_folds(11, 5, 7);
        assert_eq!(folds.len(), 5);
        let mut all: Vec<usize> = folds.concat();
        all.sort();
        assert_eq!(all, (0..11).collect::<Vec<_>>());
        assert!(make_folds(1, 5, 7).is_empty());
    }
}
