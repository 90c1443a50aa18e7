use thermo_align_core::GrayImageView;

use crate::params::FeatureParams;

/// Detected corner with its orientation and segment-test response.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Keypoint {
    pub x: f32,
    pub y: f32,
    /// Intensity-centroid orientation, radians.
    pub angle: f32,
    pub response: f32,
}

/// Bresenham circle of radius 3 used by the segment test.
const RING: [(i32, i32); 16] = [
    (0, -3),
    (1, -3),
    (2, -2),
    (3, -1),
    (3, 0),
    (3, 1),
    (2, 2),
    (1, 3),
    (0, 3),
    (-1, 3),
    (-2, 2),
    (-3, 1),
    (-3, 0),
    (-3, -1),
    (-2, -2),
    (-1, -3),
];

/// Keypoints closer than this to any border are dropped so the descriptor
/// pattern samples inside the image even at the worst rotation.
pub(crate) const BORDER_MARGIN: usize = 17;

#[inline]
fn at(img: &GrayImageView<'_>, x: i32, y: i32) -> i32 {
    img.data[y as usize * img.width + x as usize] as i32
}

// Segment test: a contiguous arc of `arc` ring pixels all brighter than
// c + t, or all darker than c - t. The ring is walked twice to handle
// wrap-around runs.
fn has_contiguous_arc(classes: &[i8; 16], arc: usize) -> bool {
    for &want in &[1i8, -1i8] {
        let mut run = 0usize;
        for i in 0..32 {
            if classes[i % 16] == want {
                run += 1;
                if run >= arc {
                    return true;
                }
            } else {
                run = 0;
            }
        }
    }
    false
}

fn segment_response(img: &GrayImageView<'_>, x: i32, y: i32, center: i32, threshold: i32) -> f32 {
    let mut sum = 0.0f32;
    let mut count = 0u32;
    for &(dx, dy) in RING.iter() {
        let diff = (at(img, x + dx, y + dy) - center).abs();
        if diff > threshold {
            sum += (diff * diff) as f32;
            count += 1;
        }
    }
    if count > 0 {
        sum / count as f32
    } else {
        0.0
    }
}

// Intensity centroid over a circular patch; the angle points from the
// corner towards the brighter mass, which keeps descriptors comparable
// between rotated frames.
fn orientation(img: &GrayImageView<'_>, cx: i32, cy: i32, patch: usize) -> f32 {
    let half = (patch / 2) as i32;
    let r2 = half * half;
    let mut m10 = 0i64;
    let mut m01 = 0i64;
    for dy in -half..=half {
        for dx in -half..=half {
            if dx * dx + dy * dy > r2 {
                continue;
            }
            let x = cx + dx;
            let y = cy + dy;
            if x < 0 || y < 0 || x >= img.width as i32 || y >= img.height as i32 {
                continue;
            }
            let v = at(img, x, y) as i64;
            m10 += dx as i64 * v;
            m01 += dy as i64 * v;
        }
    }
    if m10 == 0 && m01 == 0 {
        0.0
    } else {
        (m01 as f32).atan2(m10 as f32)
    }
}

/// Segment-test corner detection with greedy distance suppression.
///
/// Candidates are gathered in scan order, stably sorted by response, then
/// greedily kept while at least `nms_distance` away from every stronger
/// survivor. The whole path is deterministic for identical inputs.
pub fn detect_keypoints(img: &GrayImageView<'_>, params: &FeatureParams) -> Vec<Keypoint> {
    let margin = BORDER_MARGIN;
    if img.width <= 2 * margin || img.height <= 2 * margin {
        return Vec::new();
    }

    let threshold = params.fast_threshold as i32;
    let arc = params.fast_arc.clamp(1, 16);

    let mut candidates: Vec<Keypoint> = Vec::new();
    for y in margin..img.height - margin {
        for x in margin..img.width - margin {
            if !params.region.contains(x, y, img.width, img.height) {
                continue;
            }
            let center = at(img, x as i32, y as i32);

            let mut classes = [0i8; 16];
            for (k, &(dx, dy)) in RING.iter().enumerate() {
                let p = at(img, x as i32 + dx, y as i32 + dy);
                classes[k] = if p > center + threshold {
                    1
                } else if p < center - threshold {
                    -1
                } else {
                    0
                };
            }
            if !has_contiguous_arc(&classes, arc) {
                continue;
            }

            candidates.push(Keypoint {
                x: x as f32,
                y: y as f32,
                angle: 0.0,
                response: segment_response(img, x as i32, y as i32, center, threshold),
            });
        }
    }

    // stable sort keeps scan order for equal responses
    candidates.sort_by(|a, b| b.response.total_cmp(&a.response));

    let min_dist_sq = params.nms_distance * params.nms_distance;
    let mut kept: Vec<Keypoint> = Vec::new();
    for cand in candidates {
        if kept.len() >= params.max_keypoints {
            break;
        }
        let crowded = kept.iter().any(|k| {
            let dx = cand.x - k.x;
            let dy = cand.y - k.y;
            dx * dx + dy * dy < min_dist_sq
        });
        if !crowded {
            kept.push(cand);
        }
    }

    for kp in kept.iter_mut() {
        kp.angle = orientation(img, kp.x as i32, kp.y as i32, params.orientation_patch);
    }
    log::debug!("detected {} keypoints", kept.len());
    kept
}
