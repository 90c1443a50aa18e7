use std::sync::OnceLock;

use thermo_align_core::{sample_bilinear, GrayImageView};

use crate::fast::Keypoint;

pub const DESCRIPTOR_BYTES: usize = 32;

/// 256-bit binary descriptor, one intensity comparison per bit.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Descriptor(pub [u8; DESCRIPTOR_BYTES]);

const PATTERN_SEED: u64 = 0xB1EF;

/// Offsets stay within +-12; a rotated corner offset reaches at most
/// ceil(12 * sqrt(2)) = 17 px, which the detection margin covers.
const PATTERN_SPAN: i64 = 12;

static PATTERN: OnceLock<Vec<(f32, f32, f32, f32)>> = OnceLock::new();

// Comparison pattern shared by every descriptor. Generated once from a
// fixed-seed LCG so the layout is identical across runs and platforms.
fn test_pattern() -> &'static [(f32, f32, f32, f32)] {
    PATTERN.get_or_init(|| {
        let mut state = PATTERN_SEED ^ 0x9E37_79B9_7F4A_7C15;
        let mut next = move || {
            state = state.wrapping_mul(6_364_136_223_846_793_005).wrapping_add(1);
            ((state >> 33) as i64 % (2 * PATTERN_SPAN + 1) - PATTERN_SPAN) as f32
        };
        let mut pairs = Vec::with_capacity(DESCRIPTOR_BYTES * 8);
        for _ in 0..DESCRIPTOR_BYTES * 8 {
            pairs.push((next(), next(), next(), next()));
        }
        pairs
    })
}

/// Describe one keypoint by 256 pairwise intensity tests.
///
/// The test pattern is rotated by the keypoint orientation before
/// sampling, so the same corner seen under an in-plane rotation yields
/// (approximately) the same bits.
pub fn describe(img: &GrayImageView<'_>, kp: &Keypoint) -> Descriptor {
    let (sin, cos) = kp.angle.sin_cos();
    let mut bytes = [0u8; DESCRIPTOR_BYTES];
    for (i, &(x1, y1, x2, y2)) in test_pattern().iter().enumerate() {
        let a = sample_bilinear(img, kp.x + cos * x1 - sin * y1, kp.y + sin * x1 + cos * y1);
        let b = sample_bilinear(img, kp.x + cos * x2 - sin * y2, kp.y + sin * x2 + cos * y2);
        if a < b {
            bytes[i / 8] |= 1 << (i % 8);
        }
    }
    Descriptor(bytes)
}
