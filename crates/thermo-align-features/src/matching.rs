use crate::brief::Descriptor;

/// Correspondence between a query descriptor and a train descriptor.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct KeypointMatch {
    pub query: usize,
    pub train: usize,
    pub distance: u32,
}

#[inline]
pub fn hamming(a: &Descriptor, b: &Descriptor) -> u32 {
    a.0.iter()
        .zip(b.0.iter())
        .map(|(x, y)| (x ^ y).count_ones())
        .sum()
}

fn nearest(from: &[Descriptor], to: &[Descriptor]) -> Vec<Option<(usize, u32)>> {
    from.iter()
        .map(|d| {
            let mut best: Option<(usize, u32)> = None;
            for (j, t) in to.iter().enumerate() {
                let dist = hamming(d, t);
                // strict comparison keeps the lowest index on ties
                if best.map_or(true, |(_, bd)| dist < bd) {
                    best = Some((j, dist));
                }
            }
            best
        })
        .collect()
}

/// Brute-force matching with a mutual nearest-neighbor check.
///
/// A pair survives only when each descriptor is the other's best match,
/// which discards most one-sided hits on repetitive structure. The result
/// is sorted by ascending distance; ties keep query order, so the output
/// is deterministic.
pub fn match_descriptors(query: &[Descriptor], train: &[Descriptor]) -> Vec<KeypointMatch> {
    if query.is_empty() || train.is_empty() {
        return Vec::new();
    }

    let q_best = nearest(query, train);
    let t_best = nearest(train, query);

    let mut matches: Vec<KeypointMatch> = Vec::new();
    for (qi, entry) in q_best.iter().enumerate() {
        let Some((ti, dist)) = *entry else { continue };
        let Some((back, _)) = t_best[ti] else { continue };
        if back == qi {
            matches.push(KeypointMatch {
                query: qi,
                train: ti,
                distance: dist,
            });
        }
    }

    matches.sort_by(|a, b| a.distance.cmp(&b.distance));
    matches
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::brief::DESCRIPTOR_BYTES;

    fn desc(bits: &[usize]) -> Descriptor {
        let mut bytes = [0u8; DESCRIPTOR_BYTES];
        for &b in bits {
            bytes[b / 8] |= 1 << (b % 8);
        }
        Descriptor(bytes)
    }

    #[test]
    fn hamming_counts_flipped_bits() {
        let a = desc(&[0, 7, 100]);
        let b = desc(&[0, 7, 101]);
        assert_eq!(hamming(&a, &a), 0);
        assert_eq!(hamming(&a, &b), 2);
    }

    #[test]
    fn exact_duplicates_match_with_zero_distance() {
        let q = vec![desc(&[1, 2, 3]), desc(&[40, 41, 42])];
        let t = vec![desc(&[40, 41, 42]), desc(&[1, 2, 3])];
        let m = match_descriptors(&q, &t);
        assert_eq!(m.len(), 2);
        assert!(m.iter().all(|mm| mm.distance == 0));
        assert!(m.contains(&KeypointMatch {
            query: 0,
            train: 1,
            distance: 0
        }));
        assert!(m.contains(&KeypointMatch {
            query: 1,
            train: 0,
            distance: 0
        }));
    }

    #[test]
    fn cross_check_drops_one_sided_matches() {
        // q0 is far from everything; its best train is t0, but t0 prefers q1.
        let q = vec![desc(&(0..64).collect::<Vec<_>>()), desc(&[10, 11])];
        let t = vec![desc(&[10, 11, 12])];
        let m = match_descriptors(&q, &t);
        assert_eq!(m.len(), 1);
        assert_eq!(m[0].query, 1);
        assert_eq!(m[0].train, 0);
    }

    #[test]
    fn results_come_back_sorted_by_distance() {
        let q = vec![desc(&[0]), desc(&[10, 11, 12, 13])];
        let t = vec![desc(&[0, 1]), desc(&[10, 11, 12, 13])];
        let m = match_descriptors(&q, &t);
        assert_eq!(m.len(), 2);
        assert!(m[0].distance <= m[1].distance);
        assert_eq!(m[0].query, 1);
    }
}
