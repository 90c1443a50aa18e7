use nalgebra::Point2;
use thermo_align_core::{estimate_homography, homography_from_4pt, Homography};

use crate::error::RegisterError;
use crate::params::RansacParams;

/// Robust fit result. `inliers` is indexed like the input correspondences.
#[derive(Clone, Debug)]
pub struct RansacFit {
    pub homography: Homography,
    pub inliers: Vec<bool>,
    pub inlier_count: usize,
}

// Splitmix-style seeding plus a 64-bit LCG. Not a statistical RNG, just a
// cheap deterministic sequence for sample draws.
struct Lcg {
    state: u64,
}

impl Lcg {
    fn new(seed: u64) -> Self {
        Self {
            state: seed ^ 0x9E37_79B9_7F4A_7C15,
        }
    }

    fn next_index(&mut self, n: usize) -> usize {
        self.state = self
            .state
            .wrapping_mul(6_364_136_223_846_793_005)
            .wrapping_add(1);
        ((self.state >> 33) % n as u64) as usize
    }
}

// Draw four distinct indices by rejection. The attempt cap only matters
// for tiny n, where collisions are frequent.
fn sample_four(n: usize, seed: u64) -> Option<[usize; 4]> {
    let mut rng = Lcg::new(seed);
    let mut picked = [usize::MAX; 4];
    let mut count = 0usize;
    for _ in 0..128 {
        let idx = rng.next_index(n);
        if picked[..count].contains(&idx) {
            continue;
        }
        picked[count] = idx;
        count += 1;
        if count == 4 {
            return Some(picked);
        }
    }
    None
}

fn count_inliers(
    h: &Homography,
    src: &[Point2<f32>],
    dst: &[Point2<f32>],
    thr_sq: f32,
) -> (usize, Vec<bool>) {
    let mut mask = vec![false; src.len()];
    let mut count = 0usize;
    for i in 0..src.len() {
        let p = h.apply(src[i]);
        let dx = p.x - dst[i].x;
        let dy = p.y - dst[i].y;
        if dx * dx + dy * dy <= thr_sq {
            mask[i] = true;
            count += 1;
        }
    }
    (count, mask)
}

/// RANSAC homography from point correspondences (`dst ~ H * src`).
///
/// Each iteration derives its sample seed from the configured base seed, so
/// identical inputs always produce an identical fit. A consensus strictly
/// larger than the current best replaces it; ties keep the earlier
/// iteration. The winner is refit with the DLT over all of its inliers when
/// there are enough of them to overdetermine the solve.
pub fn ransac_homography(
    src: &[Point2<f32>],
    dst: &[Point2<f32>],
    params: &RansacParams,
) -> Result<RansacFit, RegisterError> {
    let n = src.len().min(dst.len());
    if n < 4 {
        return Err(RegisterError::InsufficientMatches { found: n, needed: 4 });
    }

    let thr_sq = params.inlier_threshold * params.inlier_threshold;
    let mut best: Option<RansacFit> = None;

    for iter in 0..params.iterations {
        let seed = params.seed.wrapping_add(iter as u64 + 1);
        let Some(idx) = sample_four(n, seed) else {
            continue;
        };
        let s = [src[idx[0]], src[idx[1]], src[idx[2]], src[idx[3]]];
        let d = [dst[idx[0]], dst[idx[1]], dst[idx[2]], dst[idx[3]]];
        let Some(h) = homography_from_4pt(&s, &d) else {
            continue;
        };
        let (count, mask) = count_inliers(&h, &src[..n], &dst[..n], thr_sq);
        if best.as_ref().map_or(true, |b| count > b.inlier_count) {
            best = Some(RansacFit {
                homography: h,
                inliers: mask,
                inlier_count: count,
            });
        }
    }

    let Some(fit) = best else {
        return Err(RegisterError::NoConsensus {
            iterations: params.iterations,
        });
    };

    // Refit on the consensus set; keep it only if it does not lose inliers.
    if fit.inlier_count >= 5 {
        let si: Vec<Point2<f32>> = (0..n).filter(|&i| fit.inliers[i]).map(|i| src[i]).collect();
        let di: Vec<Point2<f32>> = (0..n).filter(|&i| fit.inliers[i]).map(|i| dst[i]).collect();
        if let Some(refined) = estimate_homography(&si, &di) {
            let (count, mask) = count_inliers(&refined, &src[..n], &dst[..n], thr_sq);
            if count >= fit.inlier_count {
                return Ok(RansacFit {
                    homography: refined,
                    inliers: mask,
                    inlier_count: count,
                });
            }
        }
    }

    Ok(fit)
}
