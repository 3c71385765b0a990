//! K-means clustering for raster data
//!
//! Unsupervised classification by iteratively partitioning pixels into k
//! clusters by squared Euclidean distance in feature space. Several random
//! starts are run and the one with the lowest total within-cluster sum of
//! squares is kept.

use ndarray::ArrayView2;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

use crate::classification::{labels_to_raster, PixelSamples};
use crate::maybe_rayon::*;
use canopy_core::raster::{Raster, RasterStack};
use canopy_core::{Algorithm, Error, Result};

/// Parameters for K-means clustering
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KmeansParams {
    /// Number of clusters
    pub k: usize,
    /// Maximum iterations per start (default: 100)
    pub max_iterations: usize,
    /// Number of random starts (default: 10)
    pub n_start: usize,
    /// Random seed; the same seed always gives the same labels
    pub seed: u64,
}

impl Default for KmeansParams {
    fn default() -> Self {
        Self {
            k: 5,
            max_iterations: 100,
            n_start: 10,
            seed: 42,
        }
    }
}

/// Fitted clustering of the best start
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KmeansModel {
    /// Cluster centers; `centroids[c]` belongs to label `c + 1`
    pub centroids: Vec<Vec<f64>>,
    /// Pixels per cluster
    pub sizes: Vec<usize>,
    /// Within-cluster sum of squares per cluster
    pub within_ss: Vec<f64>,
    pub total_within_ss: f64,
    /// Iterations run by the best start
    pub iterations: usize,
    /// Whether the best start stopped because no assignment changed
    pub converged: bool,
    pub seed: u64,
    pub n_start: usize,
    /// 0-based index of the start that was kept
    pub best_start: usize,
}

impl KmeansModel {
    pub fn k(&self) -> usize {
        self.centroids.len()
    }
}

/// Labels of every valid pixel plus the fitted model
#[derive(Debug, Clone)]
pub struct KmeansResult {
    /// One label in `1..=k` per valid pixel, in sample order
    pub labels: Vec<u32>,
    pub model: KmeansModel,
}

/// One converged (or exhausted) start
struct Run {
    assignment: Vec<usize>,
    centroids: Vec<Vec<f64>>,
    iterations: usize,
    converged: bool,
}

fn validate(params: &KmeansParams, n_valid: usize) -> Result<()> {
    if params.k < 2 {
        return Err(Error::invalid_parameter("k", params.k, "K-means requires k >= 2"));
    }
    if params.max_iterations == 0 {
        return Err(Error::invalid_parameter("max_iterations", 0, "must be >= 1"));
    }
    if params.n_start == 0 {
        return Err(Error::invalid_parameter("n_start", 0, "must be >= 1"));
    }
    if n_valid < params.k {
        return Err(Error::invalid_parameter(
            "k",
            params.k,
            format!("not enough valid pixels ({}) for {} clusters", n_valid, params.k),
        ));
    }
    Ok(())
}

#[inline]
fn squared_distance(a: &[f64], b: &[f64]) -> f64 {
    a.iter().zip(b).map(|(x, y)| (x - y) * (x - y)).sum()
}

/// Index of the nearest centroid; ties go to the lowest index
#[inline]
fn nearest(pixel: &[f64], centroids: &[Vec<f64>]) -> usize {
    let mut best = 0;
    let mut best_dist = f64::INFINITY;
    for (c, centroid) in centroids.iter().enumerate() {
        let d = squared_distance(pixel, centroid);
        if d < best_dist {
            best_dist = d;
            best = c;
        }
    }
    best
}

fn assign(values: &ArrayView2<'_, f64>, centroids: &[Vec<f64>]) -> Vec<usize> {
    (0..values.nrows())
        .into_par_iter()
        .map(|i| {
            let row = values.row(i);
            match row.as_slice() {
                Some(pixel) => nearest(pixel, centroids),
                None => nearest(&row.to_vec(), centroids),
            }
        })
        .collect()
}

/// Recompute centroids as cluster means. Empty clusters keep their center.
fn update(values: &ArrayView2<'_, f64>, assignment: &[usize], centroids: &mut [Vec<f64>]) {
    let d = values.ncols();
    let mut sums = vec![vec![0.0; d]; centroids.len()];
    let mut counts = vec![0usize; centroids.len()];

    for (row, &c) in values.rows().into_iter().zip(assignment) {
        for (s, v) in sums[c].iter_mut().zip(row.iter()) {
            *s += v;
        }
        counts[c] += 1;
    }

    for ((centroid, sum), &count) in centroids.iter_mut().zip(sums).zip(&counts) {
        if count > 0 {
            for (m, s) in centroid.iter_mut().zip(sum) {
                *m = s / count as f64;
            }
        }
    }
}

fn run_once(values: &ArrayView2<'_, f64>, k: usize, max_iterations: usize, seed: u64) -> Run {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut centroids: Vec<Vec<f64>> = rand::seq::index::sample(&mut rng, values.nrows(), k)
        .into_iter()
        .map(|i| values.row(i).to_vec())
        .collect();

    let mut assignment: Vec<usize> = Vec::new();
    let mut iterations = 0;
    let mut converged = false;

    while iterations < max_iterations {
        iterations += 1;
        let next = assign(values, &centroids);
        if next == assignment {
            converged = true;
            break;
        }
        assignment = next;
        update(values, &assignment, &mut centroids);
    }

    // The last update may already be a fixed point
    if !converged {
        converged = assign(values, &centroids) == assignment;
    }

    Run {
        assignment,
        centroids,
        iterations,
        converged,
    }
}

fn within_ss(values: &ArrayView2<'_, f64>, run: &Run) -> (Vec<usize>, Vec<f64>) {
    let k = run.centroids.len();
    let mut sizes = vec![0usize; k];
    let mut wss = vec![0.0; k];
    for (row, &c) in values.rows().into_iter().zip(&run.assignment) {
        wss[c] += match row.as_slice() {
            Some(pixel) => squared_distance(pixel, &run.centroids[c]),
            None => squared_distance(&row.to_vec(), &run.centroids[c]),
        };
        sizes[c] += 1;
    }
    (sizes, wss)
}

/// Cluster pixel samples with `n_start` seeded k-means starts.
///
/// Each start draws its own seed from a generator seeded with
/// `params.seed`, so the result is the same whether starts run in
/// parallel or not. The start with the lowest total within-cluster sum of
/// squares wins; on a tie the earliest start is kept.
///
/// # Returns
/// Labels in `1..=k`, one per valid pixel in sample order, with the model
/// of the winning start.
pub fn kmeans(samples: &PixelSamples, params: KmeansParams) -> Result<KmeansResult> {
    validate(&params, samples.len())?;
    let values = samples.values();

    let mut seeder = StdRng::seed_from_u64(params.seed);
    let start_seeds: Vec<u64> = (0..params.n_start).map(|_| seeder.gen()).collect();

    let runs: Vec<(Run, Vec<usize>, Vec<f64>)> = start_seeds
        .into_par_iter()
        .enumerate()
        .map(|(start, seed)| {
            let run = run_once(&values, params.k, params.max_iterations, seed);
            let (sizes, wss) = within_ss(&values, &run);
            tracing::debug!(
                start,
                iterations = run.iterations,
                converged = run.converged,
                total_within_ss = wss.iter().sum::<f64>(),
                "k-means start finished"
            );
            (run, sizes, wss)
        })
        .collect();

    let mut best_start = 0;
    let mut best_total = f64::INFINITY;
    for (start, (_, _, wss)) in runs.iter().enumerate() {
        let total: f64 = wss.iter().sum();
        if total < best_total {
            best_total = total;
            best_start = start;
        }
    }

    let (run, sizes, within_ss) = runs
        .into_iter()
        .nth(best_start)
        .ok_or_else(|| Error::Other("k-means produced no starts".into()))?;

    tracing::debug!(
        best_start,
        total_within_ss = best_total,
        iterations = run.iterations,
        "k-means kept start"
    );

    let labels = run.assignment.iter().map(|&c| c as u32 + 1).collect();

    Ok(KmeansResult {
        labels,
        model: KmeansModel {
            centroids: run.centroids,
            sizes,
            total_within_ss: within_ss.iter().sum(),
            within_ss,
            iterations: run.iterations,
            converged: run.converged,
            seed: params.seed,
            n_start: params.n_start,
            best_start,
        },
    })
}

/// K-means clustering on a single raster.
///
/// Treats each valid pixel as a 1D feature vector.
///
/// # Returns
/// Label raster (1..=k, no-data 0) on the input grid, and the model
pub fn kmeans_raster(raster: &Raster<f64>, params: KmeansParams) -> Result<(Raster<i32>, KmeansModel)> {
    let samples = PixelSamples::from_raster(raster)?;
    let result = kmeans(&samples, params)?;
    let labels = labels_to_raster(&result.labels, raster, samples.mask())?;
    Ok((labels, result.model))
}

/// K-means clustering on a band stack, one feature per band
pub fn kmeans_stack(stack: &RasterStack<f64>, params: KmeansParams) -> Result<(Raster<i32>, KmeansModel)> {
    let samples = PixelSamples::from_stack(stack)?;
    let result = kmeans(&samples, params)?;
    let labels = labels_to_raster(&result.labels, stack.band(1)?, samples.mask())?;
    Ok((labels, result.model))
}

/// Stack clustering as an [`Algorithm`]
#[derive(Debug, Clone, Copy, Default)]
pub struct Kmeans;

impl Algorithm for Kmeans {
    type Input = RasterStack<f64>;
    type Output = (Raster<i32>, KmeansModel);
    type Params = KmeansParams;
    type Error = Error;

    fn name(&self) -> &'static str {
        "K-means"
    }

    fn description(&self) -> &'static str {
        "Unsupervised multi-start k-means clustering of pixels"
    }

    fn execute(&self, input: Self::Input, params: Self::Params) -> Result<Self::Output> {
        kmeans_stack(&input, params)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use canopy_core::GeoTransform;

    fn two_groups() -> Raster<f64> {
        let mut r = Raster::new(10, 10);
        r.set_transform(GeoTransform::new(0.0, 10.0, 1.0, -1.0));
        for row in 0..10 {
            for col in 0..10 {
                let val = if row < 5 { 10.0 } else { 100.0 };
                r.set(row, col, val + col as f64 * 0.01).unwrap();
            }
        }
        r
    }

    #[test]
    fn test_kmeans_basic() {
        let r = two_groups();
        let (labels, model) = kmeans_raster(&r, KmeansParams { k: 2, ..Default::default() }).unwrap();

        let top = labels.get(0, 0).unwrap();
        let bottom = labels.get(9, 0).unwrap();
        assert_ne!(top, bottom, "Different value groups should get different clusters");
        assert!((1..=2).contains(&top) && (1..=2).contains(&bottom));
        assert_eq!(labels.transform(), r.transform());
        assert_eq!(model.sizes, vec![50, 50]);
        assert!(model.converged);

        let top_center = model.centroids[(top - 1) as usize][0];
        assert_relative_eq!(top_center, 10.045, epsilon = 1e-9);
    }

    #[test]
    fn test_reproducible_with_seed() {
        let values: Vec<f64> = (0..400).map(|i| ((i * 37) % 101) as f64 / 10.0).collect();
        let r = Raster::from_vec(values, 20, 20).unwrap();
        let samples = PixelSamples::from_raster(&r).unwrap();
        let params = KmeansParams { k: 4, max_iterations: 50, n_start: 5, seed: 7 };

        let a = kmeans(&samples, params.clone()).unwrap();
        let b = kmeans(&samples, params).unwrap();
        assert_eq!(a.labels, b.labels);
        assert_eq!(a.model, b.model);
        assert_eq!(a.model.sizes.iter().sum::<usize>(), 400);
        assert_relative_eq!(
            a.model.total_within_ss,
            a.model.within_ss.iter().sum::<f64>(),
            epsilon = 1e-9
        );
    }

    #[test]
    fn test_more_starts_never_worse() {
        let values: Vec<f64> = (0..300).map(|i| ((i * 53) % 97) as f64).collect();
        let samples = PixelSamples::from_parts(values, 1, 10, 30, vec![false; 300]).unwrap();

        let one = kmeans(&samples, KmeansParams { k: 6, n_start: 1, ..Default::default() }).unwrap();
        let many = kmeans(&samples, KmeansParams { k: 6, n_start: 8, ..Default::default() }).unwrap();
        // The first start is shared, so more starts can only match or improve it
        assert!(many.model.total_within_ss <= one.model.total_within_ss + 1e-9);
        assert_eq!(many.model.n_start, 8);
        assert!(many.model.best_start < 8);
    }

    #[test]
    fn test_nodata_excluded() {
        let mut r = two_groups();
        r.set(0, 0, f64::NAN).unwrap();
        r.set(9, 9, f64::NAN).unwrap();

        let (labels, model) = kmeans_raster(&r, KmeansParams { k: 2, ..Default::default() }).unwrap();
        assert_eq!(labels.get(0, 0).unwrap(), 0);
        assert_eq!(labels.get(9, 9).unwrap(), 0);
        assert_eq!(labels.nodata(), Some(0));
        assert_eq!(model.sizes.iter().sum::<usize>(), 98);
    }

    #[test]
    fn test_stack_two_features() {
        let a = Raster::from_vec(vec![0.0, 0.1, 5.0, 5.1], 2, 2).unwrap();
        let b = Raster::from_vec(vec![0.0, 0.2, 5.0, 4.9], 2, 2).unwrap();
        let stack = RasterStack::new(vec![a, b]).unwrap();

        let (labels, model) = Kmeans
            .execute(stack, KmeansParams { k: 2, n_start: 3, ..Default::default() })
            .unwrap();
        assert_eq!(labels.get(0, 0).unwrap(), labels.get(0, 1).unwrap());
        assert_eq!(labels.get(1, 0).unwrap(), labels.get(1, 1).unwrap());
        assert_ne!(labels.get(0, 0).unwrap(), labels.get(1, 0).unwrap());
        assert_eq!(model.centroids[0].len(), 2);
    }

    #[test]
    fn test_converged_at_iteration_limit() {
        let values: Vec<f64> = (0..200).map(|i| ((i * 29) % 83) as f64).collect();
        let samples = PixelSamples::from_parts(values, 1, 10, 20, vec![false; 200]).unwrap();
        let free = kmeans(&samples, KmeansParams { k: 3, n_start: 1, ..Default::default() }).unwrap();
        assert!(free.model.converged);

        // Stop right after the last changing iteration, before the confirming pass
        let limit = free.model.iterations - 1;
        let capped = kmeans(
            &samples,
            KmeansParams { k: 3, n_start: 1, max_iterations: limit, ..Default::default() },
        )
        .unwrap();
        assert_eq!(capped.model.iterations, limit);
        assert!(capped.model.converged);
        assert_eq!(capped.labels, free.labels);
    }

    #[test]
    fn test_invalid_params() {
        let r = Raster::filled(2, 2, 1.0);
        let bad = [
            KmeansParams { k: 1, ..Default::default() },
            KmeansParams { k: 10, ..Default::default() },
            KmeansParams { k: 2, max_iterations: 0, ..Default::default() },
            KmeansParams { k: 2, n_start: 0, ..Default::default() },
        ];
        for params in bad {
            assert!(matches!(
                kmeans_raster(&r, params),
                Err(Error::InvalidParameter { .. })
            ));
        }
    }

    #[test]
    fn test_large_grid_reproducible() {
        // 624 x 689 = 429,936 pixels
        let (rows, cols) = (624, 689);
        let values: Vec<f64> = (0..rows * cols)
            .map(|i| {
                let (r, c) = (i / cols, i % cols);
                ((r as f64 * 0.05).sin() + (c as f64 * 0.03).cos()) * 0.5
            })
            .collect();
        let r = Raster::from_vec(values, rows, cols).unwrap();
        let samples = PixelSamples::from_raster(&r).unwrap();
        let params = KmeansParams { k: 10, max_iterations: 20, n_start: 2, seed: 2024 };

        let a = kmeans(&samples, params.clone()).unwrap();
        let b = kmeans(&samples, params).unwrap();

        assert_eq!(a.labels.len(), 429_936);
        assert!(a.labels.iter().all(|l| (1..=10).contains(l)));
        assert_eq!(a.labels, b.labels);
    }
}
