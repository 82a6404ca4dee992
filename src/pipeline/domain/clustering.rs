//! Seeded k-means over HSV colors.
//!
//! Pixels are first folded into a histogram of distinct colors. Lloyd's
//! algorithm over the weighted histogram produces the same partition as over
//! the flat pixel list, but each iteration only costs one distance per
//! distinct color instead of one per pixel.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::collections::BTreeMap;

use crate::config::SegmentationConfig;
use crate::error::PipelineError;
use crate::pipeline::domain::buffer;
use crate::pipeline::domain::hsv::HsvImage;

type Point = [f64; 3];

/// Parameters for one clustering call.
#[derive(Debug, Clone)]
pub struct KMeansParams {
    pub k: usize,
    pub n_init: usize,
    pub max_iterations: usize,
    pub tolerance: f64,
    pub seed: u64,
}

impl From<&SegmentationConfig> for KMeansParams {
    fn from(config: &SegmentationConfig) -> Self {
        Self {
            k: config.cluster_count,
            n_init: config.n_init,
            max_iterations: config.max_iterations,
            tolerance: config.tolerance,
            seed: config.seed,
        }
    }
}

/// Label of every pixel, row-major. Immutable once built.
#[derive(Debug, Clone)]
pub struct ClusterAssignment {
    width: u32,
    height: u32,
    labels: Vec<u8>,
    sizes: Vec<usize>,
    inertia: f64,
}

impl ClusterAssignment {
    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn cluster_count(&self) -> usize {
        self.sizes.len()
    }

    pub fn labels(&self) -> &[u8] {
        &self.labels
    }

    pub fn label_at(&self, x: u32, y: u32) -> Option<u8> {
        if x >= self.width || y >= self.height {
            return None;
        }
        self.labels
            .get(y as usize * self.width as usize + x as usize)
            .copied()
    }

    pub fn cluster_size(&self, label: usize) -> usize {
        self.sizes.get(label).copied().unwrap_or(0)
    }

    /// Clusters with at least one member pixel.
    pub fn non_empty_clusters(&self) -> usize {
        self.sizes.iter().filter(|&&n| n > 0).count()
    }

    /// Pixel-weighted sum of squared distances to the assigned centroid.
    pub fn inertia(&self) -> f64 {
        self.inertia
    }
}

/// Distinct colors with their pixel counts, sorted by color.
struct ColorHistogram {
    colors: Vec<[u8; 3]>,
    points: Vec<Point>,
    weights: Vec<f64>,
}

impl ColorHistogram {
    fn build(hsv: &HsvImage) -> Self {
        let mut counts: BTreeMap<[u8; 3], u64> = BTreeMap::new();
        for px in hsv.pixels() {
            *counts.entry(*px).or_insert(0) += 1;
        }

        let mut colors = Vec::with_capacity(counts.len());
        let mut points = Vec::with_capacity(counts.len());
        let mut weights = Vec::with_capacity(counts.len());
        for (color, count) in counts {
            colors.push(color);
            points.push([color[0] as f64, color[1] as f64, color[2] as f64]);
            weights.push(count as f64);
        }

        Self {
            colors,
            points,
            weights,
        }
    }

    fn len(&self) -> usize {
        self.colors.len()
    }

    fn label_of(&self, color: &[u8; 3], color_labels: &[u8]) -> u8 {
        match self.colors.binary_search(color) {
            Ok(i) => color_labels[i],
            // Every pixel color went into the histogram.
            Err(_) => 0,
        }
    }

    /// Weighted mean of the per-channel variances, used to scale the
    /// convergence tolerance.
    fn mean_variance(&self) -> f64 {
        let total: f64 = self.weights.iter().sum();
        if total == 0.0 {
            return 0.0;
        }

        let mut mean = [0.0; 3];
        for (p, w) in self.points.iter().zip(&self.weights) {
            for c in 0..3 {
                mean[c] += p[c] * w;
            }
        }
        mean.iter_mut().for_each(|m| *m /= total);

        let mut variance = 0.0;
        for (p, w) in self.points.iter().zip(&self.weights) {
            for c in 0..3 {
                variance += (p[c] - mean[c]).powi(2) * w;
            }
        }
        variance / total / 3.0
    }
}

/// Result of a single k-means run over the histogram.
struct Run {
    centroids: Vec<Point>,
    color_labels: Vec<u8>,
    inertia: f64,
}

/// Partitions the HSV pixels into `params.k` clusters.
///
/// With at most `k` distinct colors every color becomes its own cluster and
/// the remaining clusters stay empty.
pub fn segment(hsv: &HsvImage, params: &KMeansParams) -> Result<ClusterAssignment, PipelineError> {
    if params.k == 0 || params.k > u8::MAX as usize {
        return Err(PipelineError::InvalidConfig(format!(
            "cluster count {} is outside 1..=255",
            params.k
        )));
    }

    let histogram = ColorHistogram::build(hsv);
    tracing::debug!(
        "Clustering {} pixels ({} distinct colors) into {} clusters",
        hsv.len(),
        histogram.len(),
        params.k
    );

    let best = if histogram.len() <= params.k {
        one_cluster_per_color(&histogram, params.k)
    } else {
        let mut rng = StdRng::seed_from_u64(params.seed);
        let tolerance = params.tolerance * histogram.mean_variance();
        let mut best: Option<Run> = None;
        for attempt in 0..params.n_init.max(1) {
            let run = lloyd(&histogram, params, tolerance, &mut rng);
            tracing::debug!("k-means attempt {} inertia {:.3}", attempt, run.inertia);
            if best.as_ref().is_none_or(|b| run.inertia < b.inertia) {
                best = Some(run);
            }
        }
        // n_init is at least one, so a run always exists.
        best.unwrap_or_else(|| one_cluster_per_color(&histogram, params.k))
    };

    let mut labels = buffer::try_with_capacity(hsv.len(), "segmenting")?;
    let mut sizes = vec![0usize; params.k];
    for px in hsv.pixels() {
        let label = histogram.label_of(px, &best.color_labels);
        sizes[label as usize] += 1;
        labels.push(label);
    }

    Ok(ClusterAssignment {
        width: hsv.width(),
        height: hsv.height(),
        labels,
        sizes,
        inertia: best.inertia,
    })
}

fn one_cluster_per_color(histogram: &ColorHistogram, k: usize) -> Run {
    let mut centroids = histogram.points.clone();
    // Unused clusters get a centroid no pixel is assigned to.
    centroids.resize(k, [f64::NAN; 3]);
    Run {
        centroids,
        color_labels: (0..histogram.len()).map(|i| i as u8).collect(),
        inertia: 0.0,
    }
}

fn lloyd(histogram: &ColorHistogram, params: &KMeansParams, tolerance: f64, rng: &mut StdRng) -> Run {
    let mut centroids = kmeans_plus_plus(histogram, params.k, rng);
    let mut color_labels = vec![0u8; histogram.len()];

    for iteration in 0..params.max_iterations {
        assign(histogram, &centroids, &mut color_labels);

        let mut sums = vec![[0.0f64; 3]; params.k];
        let mut totals = vec![0.0f64; params.k];
        for ((p, w), &label) in histogram.points.iter().zip(&histogram.weights).zip(&color_labels) {
            let label = label as usize;
            for c in 0..3 {
                sums[label][c] += p[c] * w;
            }
            totals[label] += w;
        }

        let mut shift = 0.0;
        for k in 0..params.k {
            // An emptied cluster keeps its previous centroid.
            if totals[k] > 0.0 {
                let updated = [
                    sums[k][0] / totals[k],
                    sums[k][1] / totals[k],
                    sums[k][2] / totals[k],
                ];
                shift += squared_distance(&updated, &centroids[k]);
                centroids[k] = updated;
            }
        }

        if shift <= tolerance {
            tracing::trace!("k-means converged after {} iterations", iteration + 1);
            break;
        }
    }

    let inertia = assign(histogram, &centroids, &mut color_labels);
    Run {
        centroids,
        color_labels,
        inertia,
    }
}

/// Assigns each color to its nearest centroid (lowest index on ties) and
/// returns the weighted inertia.
fn assign(histogram: &ColorHistogram, centroids: &[Point], color_labels: &mut [u8]) -> f64 {
    let mut inertia = 0.0;
    for ((p, w), label) in histogram.points.iter().zip(&histogram.weights).zip(color_labels.iter_mut()) {
        let (best, distance) = nearest(p, centroids);
        *label = best as u8;
        inertia += distance * w;
    }
    inertia
}

fn nearest(point: &Point, centroids: &[Point]) -> (usize, f64) {
    let mut best = 0;
    let mut best_distance = f64::INFINITY;
    for (k, centroid) in centroids.iter().enumerate() {
        let distance = squared_distance(point, centroid);
        if distance < best_distance {
            best = k;
            best_distance = distance;
        }
    }
    (best, best_distance)
}

/// Weighted k-means++ seeding: the first centroid is drawn proportionally to
/// pixel count, each following one proportionally to count × D².
fn kmeans_plus_plus(histogram: &ColorHistogram, k: usize, rng: &mut StdRng) -> Vec<Point> {
    let mut centroids = Vec::with_capacity(k);
    let first = sample_weighted(&histogram.weights, rng);
    centroids.push(histogram.points[first]);

    let mut closest: Vec<f64> = histogram
        .points
        .iter()
        .map(|p| squared_distance(p, &centroids[0]))
        .collect();

    while centroids.len() < k {
        let scores: Vec<f64> = closest
            .iter()
            .zip(&histogram.weights)
            .map(|(d, w)| d * w)
            .collect();
        let next = sample_weighted(&scores, rng);
        let centroid = histogram.points[next];
        centroids.push(centroid);

        for (d, p) in closest.iter_mut().zip(&histogram.points) {
            *d = d.min(squared_distance(p, &centroid));
        }
    }

    centroids
}

fn sample_weighted(weights: &[f64], rng: &mut StdRng) -> usize {
    let total: f64 = weights.iter().sum();
    if !(total > 0.0) {
        return 0;
    }

    let target = rng.random::<f64>() * total;
    let mut cumulative = 0.0;
    let mut last_positive = 0;
    for (i, &w) in weights.iter().enumerate() {
        if w > 0.0 {
            cumulative += w;
            last_positive = i;
            if cumulative > target {
                return i;
            }
        }
    }
    last_positive
}

fn squared_distance(a: &Point, b: &Point) -> f64 {
    (a[0] - b[0]).powi(2) + (a[1] - b[1]).powi(2) + (a[2] - b[2]).powi(2)
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgb, RgbImage};

    fn params(k: usize) -> KMeansParams {
        KMeansParams {
            k,
            n_init: 3,
            max_iterations: 100,
            tolerance: 1e-4,
            seed: 42,
        }
    }

    fn striped(colors: &[[u8; 3]], width: u32, height: u32) -> HsvImage {
        let stripe = height / colors.len() as u32;
        let rgb = RgbImage::from_fn(width, height, |_, y| {
            let idx = ((y / stripe.max(1)) as usize).min(colors.len() - 1);
            Rgb(colors[idx])
        });
        HsvImage::from_rgb(&rgb).unwrap()
    }

    #[test]
    fn uniform_image_has_one_cluster() {
        let hsv = striped(&[[0, 128, 0]], 8, 8);
        let assignment = segment(&hsv, &params(4)).unwrap();
        assert_eq!(assignment.cluster_count(), 4);
        assert_eq!(assignment.non_empty_clusters(), 1);
        assert_eq!(assignment.cluster_size(0), 64);
        assert!(assignment.labels().iter().all(|&l| l == 0));
        assert_eq!(assignment.inertia(), 0.0);
    }

    #[test]
    fn fewer_colors_than_clusters_leaves_empty_clusters() {
        let hsv = striped(&[[0, 128, 0], [120, 80, 40]], 4, 4);
        let assignment = segment(&hsv, &params(5)).unwrap();
        assert_eq!(assignment.non_empty_clusters(), 2);
        assert_eq!(assignment.cluster_size(0) + assignment.cluster_size(1), 16);
        assert_eq!(assignment.cluster_size(4), 0);
    }

    #[test]
    fn separates_distinct_color_groups() {
        // Three well separated families, two shades each.
        let colors = [
            [0, 150, 0],
            [10, 160, 10],
            [140, 90, 40],
            [150, 100, 50],
            [240, 240, 240],
            [250, 250, 250],
        ];
        let hsv = striped(&colors, 6, 60);
        let assignment = segment(&hsv, &params(3)).unwrap();
        assert_eq!(assignment.non_empty_clusters(), 3);

        // Both shades of each family share a label.
        for pair in [(0u32, 10u32), (20, 30), (40, 50)] {
            assert_eq!(assignment.label_at(0, pair.0), assignment.label_at(0, pair.1));
        }
        assert_ne!(assignment.label_at(0, 0), assignment.label_at(0, 20));
        assert_ne!(assignment.label_at(0, 20), assignment.label_at(0, 40));
    }

    #[test]
    fn seeded_runs_are_reproducible() {
        let rgb = RgbImage::from_fn(32, 32, |x, y| {
            Rgb([(x * 7 % 256) as u8, (y * 5 % 256) as u8, ((x + y) * 3 % 256) as u8])
        });
        let hsv = HsvImage::from_rgb(&rgb).unwrap();
        let a = segment(&hsv, &params(4)).unwrap();
        let b = segment(&hsv, &params(4)).unwrap();
        assert_eq!(a.labels(), b.labels());
        assert_eq!(a.inertia(), b.inertia());
    }

    #[test]
    fn more_restarts_never_worsen_inertia() {
        let rgb = RgbImage::from_fn(24, 24, |x, y| {
            Rgb([(x * 11 % 256) as u8, (y * 13 % 256) as u8, ((x * y) % 256) as u8])
        });
        let hsv = HsvImage::from_rgb(&rgb).unwrap();
        let single = segment(&hsv, &KMeansParams { n_init: 1, ..params(4) }).unwrap();
        let several = segment(&hsv, &KMeansParams { n_init: 5, ..params(4) }).unwrap();
        assert!(several.inertia() <= single.inertia());
    }

    #[test]
    fn rejects_zero_clusters() {
        let hsv = striped(&[[0, 128, 0]], 2, 2);
        assert!(matches!(
            segment(&hsv, &params(0)),
            Err(PipelineError::InvalidConfig(_))
        ));
    }

    #[test]
    fn weighted_sampling_skips_zero_weights() {
        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..100 {
            let i = sample_weighted(&[0.0, 3.0, 0.0, 1.0], &mut rng);
            assert!(i == 1 || i == 3);
        }
    }
}
