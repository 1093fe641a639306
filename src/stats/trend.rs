//! Episode-rating summaries: the mean score and a smoothed trend line from a
//! least-squares polynomial fit.

use serde::Serialize;

use crate::models::EpisodeRating;
use crate::parse::round2;

/// Degree of the trend polynomial. Lowered when there are too few points.
pub const TREND_DEGREE: usize = 6;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EpisodeTrend {
    pub name: String,
    /// Mean of the rated episodes, `None` when nothing is rated.
    pub average: Option<f64>,
    /// (episode number, score) for rated episodes; episodes count from 1.
    pub points: Vec<(usize, f64)>,
    /// Fitted value at each rated episode.
    pub trend: Vec<f64>,
}

pub fn episode_trend(rating: &EpisodeRating) -> EpisodeTrend {
    let points: Vec<(usize, f64)> = rating
        .ratings
        .iter()
        .enumerate()
        .filter_map(|(i, r)| r.map(|r| (i + 1, r)))
        .collect();

    let average = if points.is_empty() {
        None
    } else {
        Some(round2(points.iter().map(|(_, r)| r).sum::<f64>() / points.len() as f64))
    };

    let xs: Vec<f64> = points.iter().map(|(x, _)| *x as f64).collect();
    let ys: Vec<f64> = points.iter().map(|(_, y)| *y).collect();
    let trend = match fit_polynomial(&xs, &ys, TREND_DEGREE) {
        Some(fit) => xs.iter().map(|x| round2(fit.eval(*x))).collect(),
        None => Vec::new(),
    };

    EpisodeTrend {
        name: rating.name.clone(),
        average,
        points,
        trend,
    }
}

/// A fitted polynomial over x rescaled to [0, 1].
#[derive(Debug, Clone)]
pub struct Polynomial {
    coefficients: Vec<f64>,
    x_min: f64,
    x_span: f64,
}

impl Polynomial {
    pub fn degree(&self) -> usize {
        self.coefficients.len().saturating_sub(1)
    }

    pub fn eval(&self, x: f64) -> f64 {
        let t = (x - self.x_min) / self.x_span;
        self.coefficients
            .iter()
            .rev()
            .fold(0.0, |acc, c| acc * t + c)
    }
}

/// Least-squares fit of the given degree (capped at `points - 1`).
/// Returns `None` for empty input or a singular system.
pub fn fit_polynomial(xs: &[f64], ys: &[f64], degree: usize) -> Option<Polynomial> {
    let n = xs.len().min(ys.len());
    if n == 0 {
        return None;
    }

    let x_min = xs[..n].iter().copied().fold(f64::INFINITY, f64::min);
    let x_max = xs[..n].iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let span = x_max - x_min;
    let (x_span, degree) = if span < 1e-12 {
        (1.0, 0)
    } else {
        (span, degree.min(n - 1))
    };
    let size = degree + 1;

    // Normal equations: A c = b with A[i][j] = Σ t^(i+j), b[i] = Σ y t^i
    let mut power_sums = vec![0.0; 2 * degree + 1];
    let mut b = vec![0.0; size];
    for (x, y) in xs[..n].iter().zip(&ys[..n]) {
        let t = (x - x_min) / x_span;
        let mut p = 1.0;
        for (k, s) in power_sums.iter_mut().enumerate() {
            *s += p;
            if k < size {
                b[k] += y * p;
            }
            p *= t;
        }
    }
    let mut a: Vec<Vec<f64>> = (0..size)
        .map(|i| (0..size).map(|j| power_sums[i + j]).collect())
        .collect();

    let coefficients = solve_linear(&mut a, &mut b)?;
    Some(Polynomial {
        coefficients,
        x_min,
        x_span,
    })
}

/// Gaussian elimination with partial pivoting. Consumes `a` and `b`.
fn solve_linear(a: &mut [Vec<f64>], b: &mut [f64]) -> Option<Vec<f64>> {
    let size = b.len();
    for col in 0..size {
        let pivot = (col..size).max_by(|&i, &j| {
            a[i][col]
                .abs()
                .partial_cmp(&a[j][col].abs())
                .unwrap_or(std::cmp::Ordering::Equal)
        })?;
        if a[pivot][col].abs() < 1e-12 {
            return None;
        }
        a.swap(col, pivot);
        b.swap(col, pivot);

        for row in col + 1..size {
            let factor = a[row][col] / a[col][col];
            for k in col..size {
                a[row][k] -= factor * a[col][k];
            }
            b[row] -= factor * b[col];
        }
    }

    let mut x = vec![0.0; size];
    for row in (0..size).rev() {
        let tail: f64 = (row + 1..size).map(|k| a[row][k] * x[k]).sum();
        x[row] = (b[row] - tail) / a[row][row];
    }
    Some(x)
}
