//! K-mer composition profiles and the k-mer distance used to skip alignments.

use crate::libs::nt::is_base;

pub const KMER_SIZE: usize = 5;

/// Counts of every k-mer made only of A/C/G/T, indexed by its 2-bit packing.
#[derive(Debug, Clone, PartialEq)]
pub struct KmerProfile {
    k: usize,
    len: usize,
    counts: Vec<u16>,
}

impl KmerProfile {
    /// Profile of an encoded sequence. K-mers spanning an `N` or a gap are skipped.
    pub fn new(seq: &[u8], k: usize) -> Self {
        assert!(k > 0 && k <= 8, "k-mer size {} out of range", k);

        let n_kmers = 1usize << (2 * k);
        let mask = n_kmers - 1;
        let mut counts = vec![0u16; n_kmers];

        let mut kmer = 0usize;
        let mut valid = 0usize;
        for &nt in seq {
            if is_base(nt) {
                kmer = ((kmer << 2) | nt as usize) & mask;
                valid += 1;
                if valid >= k {
                    counts[kmer] = counts[kmer].saturating_add(1);
                }
            } else {
                valid = 0;
            }
        }

        Self {
            k,
            len: seq.len(),
            counts,
        }
    }

    pub fn k(&self) -> usize {
        self.k
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn count(&self, index: usize) -> u16 {
        self.counts[index]
    }

    /// Fraction of the shorter sequence's k-mers not shared with the other.
    ///
    /// Symmetric and clamped to [0, 1]. Sequences shorter than k carry no
    /// k-mers and are reported at distance 0.
    ///
    /// ```
    /// use dada::libs::kmer::{KmerProfile, KMER_SIZE};
    /// use dada::libs::nt::encode_seq;
    ///
    /// let a = KmerProfile::new(&encode_seq("ACGTTGCAAGGCTTAC", 0).unwrap(), KMER_SIZE);
    /// let b = KmerProfile::new(&encode_seq("ACGTTGCAAGGCTTAC", 1).unwrap(), KMER_SIZE);
    /// assert_eq!(a.dist(&b), 0.0);
    /// ```
    pub fn dist(&self, other: &Self) -> f64 {
        debug_assert_eq!(self.k, other.k);

        let minlen = self.len.min(other.len);
        if minlen < self.k {
            return 0.0;
        }

        let dotsum: u64 = self
            .counts
            .iter()
            .zip(other.counts.iter())
            .map(|(&a, &b)| a.min(b) as u64)
            .sum();

        let dot = dotsum as f64 / (minlen - self.k + 1) as f64;
        (1.0 - dot).clamp(0.0, 1.0)
    }
}

/// Convenience for two encoded sequences.
pub fn kmer_dist(s1: &[u8], s2: &[u8], k: usize) -> f64 {
    KmerProfile::new(s1, k).dist(&KmerProfile::new(s2, k))
}
