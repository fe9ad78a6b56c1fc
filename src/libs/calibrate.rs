//! Pairwise alignment distance against k-mer distance, for choosing a k-mer cutoff.

use crate::libs::align::{align_subs, AlignParams};
use crate::libs::error::Result;
use crate::libs::kmer::{KmerProfile, KMER_SIZE};
use crate::libs::matrix::ScoreMatrix;
use crate::libs::nt::encode_seq;
use rayon::prelude::*;

/// Parallel vectors, one entry per sampled pair.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Calibration {
    /// Substitutions over the shorter length
    pub align: Vec<f64>,
    pub kmer: Vec<f64>,
}

impl Calibration {
    pub fn len(&self) -> usize {
        self.align.len()
    }

    pub fn is_empty(&self) -> bool {
        self.align.is_empty()
    }
}

/// Index pairs to compare, at most `max_aligns` of them.
///
/// When every pair fits, every pair is taken. Otherwise both indices step
/// through the sequences with a common stride so the sample is spread over
/// the whole input.
///
/// ```
/// use dada::libs::calibrate::sample_pairs;
/// assert_eq!(sample_pairs(3, 100), vec![(0, 1), (0, 2), (1, 2)]);
/// assert_eq!(sample_pairs(10, 5).len(), 5);
/// ```
pub fn sample_pairs(n: usize, max_aligns: usize) -> Vec<(usize, usize)> {
    let n_pairs = n * n.saturating_sub(1) / 2;

    let (max_aligns, stride) = if max_aligns < n_pairs {
        let n_iters = (2.0 * (max_aligns as f64).sqrt()).floor() as usize + 2;
        (max_aligns, (n / n_iters).max(1))
    } else {
        (n_pairs, 1)
    };

    let mut pairs = Vec::with_capacity(max_aligns);
    'outer: for i in (0..n).step_by(stride) {
        for j in (i + 1..n).step_by(stride) {
            if pairs.len() >= max_aligns {
                break 'outer;
            }
            pairs.push((i, j));
        }
    }

    if pairs.len() < max_aligns {
        log::warn!(
            "Sampled {} pairs, fewer than the {} requested",
            pairs.len(),
            max_aligns
        );
    }

    pairs
}

/// Alignment and k-mer distances of sampled sequence pairs.
pub fn calibrate_kmers(
    seqs: &[String],
    score: &ScoreMatrix,
    gap: f64,
    band: Option<usize>,
    max_aligns: usize,
) -> Result<Calibration> {
    let encoded = seqs
        .iter()
        .enumerate()
        .map(|(i, s)| encode_seq(s, i))
        .collect::<Result<Vec<_>>>()?;
    let profiles: Vec<KmerProfile> = encoded
        .par_iter()
        .map(|s| KmerProfile::new(s, KMER_SIZE))
        .collect();

    let params = AlignParams {
        score: *score,
        gap,
        band,
    };

    let pairs = sample_pairs(encoded.len(), max_aligns);
    log::info!("Aligning {} pairs of {} sequences", pairs.len(), encoded.len());

    let (align, kmer) = pairs
        .into_par_iter()
        .map(|(i, j)| {
            let sub = align_subs(&encoded[i], &encoded[j], &params);
            let minlen = encoded[i].len().min(encoded[j].len());
            (
                sub.nsubs as f64 / minlen as f64,
                profiles[i].dist(&profiles[j]),
            )
        })
        .unzip();

    Ok(Calibration { align, kmer })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::libs::error::DadaError;
    use approx::assert_relative_eq;

    const SEQS: [&str; 4] = [
        "TACGGAGGGTGCAAGCGTTAATCGGAATTACTGGGCGTAAAG",
        "TACGGAGGGTGCAAGCGTTAATCGGAATTACTGGGCGTAAAC",
        "TACGTAGGGGGCAAGCGTTATCCGGATTTACTGGGTGTAAAG",
        "GATGAACGCTGGCGGCGTGCCTAATACATGCAAGTCGAACGC",
    ];

    fn seqs(n: usize) -> Vec<String> {
        (0..n).map(|i| SEQS[i % SEQS.len()].to_string()).collect()
    }

    #[test]
    fn test_sample_all_pairs() {
        let pairs = sample_pairs(4, 6);
        assert_eq!(pairs, vec![(0, 1), (0, 2), (0, 3), (1, 2), (1, 3), (2, 3)]);
        // asking for more than exists caps at every pair
        assert_eq!(sample_pairs(4, 1000).len(), 6);
        assert!(sample_pairs(1, 10).is_empty());
        assert!(sample_pairs(0, 10).is_empty());
    }

    #[test]
    fn test_sample_strided() {
        // 100 sequences, 4950 pairs; 2 * sqrt(50) + 2 = 16 iterations, stride 6
        let pairs = sample_pairs(100, 50);
        assert_eq!(pairs.len(), 50);
        assert!(pairs.iter().all(|&(i, j)| i % 6 == 0 && (j - i) % 6 == 1 && j < 100));
        assert_eq!(pairs[17], (6, 7));

        // too few sequences for a stride, the first pairs in order
        let pairs = sample_pairs(10, 30);
        assert_eq!(pairs.len(), 30);
        assert_eq!(pairs[9], (1, 2));
    }

    #[test]
    fn test_calibrate_ten() {
        let cal = calibrate_kmers(&seqs(10), &ScoreMatrix::default(), -8.0, Some(16), 5).unwrap();
        assert_eq!(cal.len(), 5);
        assert_eq!(cal.kmer.len(), 5);
        for (&a, &k) in cal.align.iter().zip(cal.kmer.iter()) {
            assert!((0.0..=1.0).contains(&a));
            assert!((0.0..=1.0).contains(&k));
        }
    }

    #[test]
    fn test_calibrate_values() {
        let cal = calibrate_kmers(&seqs(2), &ScoreMatrix::default(), -8.0, Some(16), 10).unwrap();
        assert_eq!(cal.len(), 1);
        // one substitution at the last base
        assert_eq!(cal.align[0], 1.0 / 42.0);
        assert_relative_eq!(cal.kmer[0], 1.0 / 38.0);
    }

    #[test]
    fn test_calibrate_invalid() {
        let mut input = seqs(3);
        input[2] = "ACGU".to_string();
        assert!(matches!(
            calibrate_kmers(&input, &ScoreMatrix::default(), -8.0, None, 3),
            Err(DadaError::InvalidBase { index: 2, pos: 3, .. })
        ));
    }
}
