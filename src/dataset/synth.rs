//! Seeded synthetic dataset generation for harnesses and demos. An external
//! collaborator, not part of the renderer's contract (spec §1 carves
//! "dataset synthesis and seeded RNG" out of scope for the renderer proper).

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rand_distr::{Distribution, Normal};

use crate::dataset::{Dataset, Geometry};
use crate::error::Result;

const EUCLIDEAN_BLOB_SPREAD: f32 = 8.0;
const EUCLIDEAN_BLOB_STD_DEV: f32 = 1.2;

/// Generates `n` points of `geometry`, labeled `0..label_count`, from a
/// seeded RNG so repeated calls with the same arguments reproduce the exact
/// same dataset (spec §8's "seed 42" scenarios depend on this).
pub fn generate(n: u32, geometry: Geometry, seed: u64, label_count: u16) -> Result<Dataset> {
    let mut rng = StdRng::seed_from_u64(seed);
    let label_count = label_count.max(1);

    let mut positions = Vec::with_capacity(2 * n as usize);
    let mut labels = Vec::with_capacity(n as usize);

    match geometry {
        Geometry::Euclidean => {
            let blob_centers = blob_centers(label_count, &mut rng);
            let normal = Normal::new(0.0f32, EUCLIDEAN_BLOB_STD_DEV).expect("valid std dev");
            for i in 0..n {
                let label = (i % label_count as u32) as u16;
                let (cx, cy) = blob_centers[label as usize % blob_centers.len()];
                let x = cx + normal.sample(&mut rng);
                let y = cy + normal.sample(&mut rng);
                positions.push(x);
                positions.push(y);
                labels.push(label);
            }
        }
        Geometry::Poincare => {
            for i in 0..n {
                let label = (i % label_count as u32) as u16;
                let (x, y) = uniform_in_unit_disk(&mut rng);
                positions.push(x);
                positions.push(y);
                labels.push(label);
            }
        }
    }

    Dataset::new(positions, labels, geometry)
}

fn blob_centers(label_count: u16, rng: &mut StdRng) -> Vec<(f32, f32)> {
    (0..label_count)
        .map(|_| {
            let angle = rng.gen_range(0.0..std::f32::consts::TAU);
            let radius = rng.gen_range(0.0..EUCLIDEAN_BLOB_SPREAD);
            (radius * angle.cos(), radius * angle.sin())
        })
        .collect()
}

/// Rejection-samples a uniform point in the open unit disk: draw uniformly
/// in `[-1, 1]^2`, reject and retry while outside the disk.
fn uniform_in_unit_disk(rng: &mut StdRng) -> (f32, f32) {
    loop {
        let x = rng.gen_range(-1.0f32..1.0);
        let y = rng.gen_range(-1.0f32..1.0);
        if x * x + y * y < 1.0 {
            return (x, y);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn same_seed_is_reproducible() {
        let a = generate(500, Geometry::Euclidean, 42, 10).unwrap();
        let b = generate(500, Geometry::Euclidean, 42, 10).unwrap();
        assert_eq!(a.positions(), b.positions());
        assert_eq!(a.labels(), b.labels());
    }

    #[test]
    fn different_seeds_diverge() {
        let a = generate(500, Geometry::Euclidean, 1, 10).unwrap();
        let b = generate(500, Geometry::Euclidean, 2, 10).unwrap();
        assert_ne!(a.positions(), b.positions());
    }

    #[test]
    fn poincare_points_stay_inside_the_disk() {
        let ds = generate(2000, Geometry::Poincare, 7, 4).unwrap();
        for i in 0..ds.n() {
            let (x, y) = ds.point(i);
            assert!(x * x + y * y < 1.0);
        }
    }

    #[test]
    fn labels_stay_within_requested_count() {
        let ds = generate(300, Geometry::Euclidean, 3, 5).unwrap();
        assert!(ds.labels().iter().all(|&l| l < 5));
    }
}
