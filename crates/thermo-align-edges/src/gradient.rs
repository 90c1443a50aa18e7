use std::collections::VecDeque;

use thermo_align_core::{GrayImage, GrayImageView};

use crate::params::EdgeParams;

#[inline]
fn px(src: &GrayImageView<'_>, x: i32, y: i32) -> f32 {
    let x = x.clamp(0, src.width as i32 - 1) as usize;
    let y = y.clamp(0, src.height as i32 - 1) as usize;
    src.data[y * src.width + x] as f32
}

/// Sobel gradient magnitude (L2 norm of the 3x3 derivative pair).
pub fn sobel_magnitude(src: &GrayImageView<'_>) -> Vec<f32> {
    let mut mag = vec![0.0_f32; src.width * src.height];
    for y in 0..src.height as i32 {
        for x in 0..src.width as i32 {
            let tl = px(src, x - 1, y - 1);
            let tc = px(src, x, y - 1);
            let tr = px(src, x + 1, y - 1);
            let ml = px(src, x - 1, y);
            let mr = px(src, x + 1, y);
            let bl = px(src, x - 1, y + 1);
            let bc = px(src, x, y + 1);
            let br = px(src, x + 1, y + 1);

            let gx = (tr + 2.0 * mr + br) - (tl + 2.0 * ml + bl);
            let gy = (bl + 2.0 * bc + br) - (tl + 2.0 * tc + tr);
            mag[y as usize * src.width + x as usize] = (gx * gx + gy * gy).sqrt();
        }
    }
    mag
}

fn dilate3(mask: &[bool], w: usize, h: usize) -> Vec<bool> {
    let mut out = vec![false; w * h];
    for y in 0..h as i32 {
        for x in 0..w as i32 {
            'probe: for dy in -1..=1 {
                for dx in -1..=1 {
                    let xx = x + dx;
                    let yy = y + dy;
                    if xx >= 0
                        && yy >= 0
                        && xx < w as i32
                        && yy < h as i32
                        && mask[yy as usize * w + xx as usize]
                    {
                        out[y as usize * w + x as usize] = true;
                        break 'probe;
                    }
                }
            }
        }
    }
    out
}

fn erode3(mask: &[bool], w: usize, h: usize) -> Vec<bool> {
    let mut out = vec![true; w * h];
    for y in 0..h as i32 {
        for x in 0..w as i32 {
            'probe: for dy in -1..=1 {
                for dx in -1..=1 {
                    let xx = x + dx;
                    let yy = y + dy;
                    let on = xx >= 0
                        && yy >= 0
                        && xx < w as i32
                        && yy < h as i32
                        && mask[yy as usize * w + xx as usize];
                    if !on {
                        out[y as usize * w + x as usize] = false;
                        break 'probe;
                    }
                }
            }
        }
    }
    out
}

// Strong pixels are edges; weak pixels survive only when 8-connected to a
// strong one, directly or through other weak pixels.
fn hysteresis(strong: &[bool], weak: &[bool], w: usize, h: usize) -> Vec<bool> {
    let mut kept = strong.to_vec();
    let mut queue: VecDeque<(i32, i32)> = strong
        .iter()
        .enumerate()
        .filter(|(_, &s)| s)
        .map(|(i, _)| ((i % w) as i32, (i / w) as i32))
        .collect();

    while let Some((x, y)) = queue.pop_front() {
        for dy in -1..=1 {
            for dx in -1..=1 {
                let xx = x + dx;
                let yy = y + dy;
                if xx < 0 || yy < 0 || xx >= w as i32 || yy >= h as i32 {
                    continue;
                }
                let idx = yy as usize * w + xx as usize;
                if weak[idx] && !kept[idx] {
                    kept[idx] = true;
                    queue.push_back((xx, yy));
                }
            }
        }
    }
    kept
}

/// Binary (0/255) edge map: double gradient threshold, optional 3x3 closing
/// of the strong mask, then 8-connected hysteresis.
pub fn edge_map(src: &GrayImageView<'_>, params: &EdgeParams) -> GrayImage {
    let mag = sobel_magnitude(src);
    let n = src.width * src.height;

    let mut strong = vec![false; n];
    let mut weak = vec![false; n];
    for i in 0..n {
        strong[i] = mag[i] >= params.high_threshold;
        weak[i] = mag[i] >= params.low_threshold;
    }

    if params.closing {
        strong = erode3(&dilate3(&strong, src.width, src.height), src.width, src.height);
    }

    let kept = hysteresis(&strong, &weak, src.width, src.height);

    let mut out = GrayImage::new(src.width, src.height);
    for (dst, &on) in out.data.iter_mut().zip(kept.iter()) {
        *dst = if on { 255 } else { 0 };
    }
    out
}
