//! Typed engine inputs, and their validation from loosely shaped caller data.

use crate::libs::align::AlignParams;
use crate::libs::error::{DadaError, Result};
use crate::libs::matrix::{ErrorMatrix, ScoreMatrix};
use crate::libs::nt::encode_seq;

/// Unique sequences (encoded) and their read counts.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Uniques {
    seqs: Vec<Vec<u8>>,
    abundances: Vec<u64>,
}

impl Uniques {
    /// ```
    /// let uniques = dada::libs::input::Uniques::from_vectors(
    ///     &["ACGT".to_string(), "ACGA".to_string()],
    ///     &[10, 2],
    /// )
    /// .unwrap();
    /// assert_eq!(uniques.len(), 2);
    /// assert_eq!(uniques.total_reads(), 12);
    /// ```
    pub fn from_vectors<S: AsRef<str>>(seqs: &[S], abundances: &[u64]) -> Result<Self> {
        if seqs.len() != abundances.len() {
            return Err(DadaError::LengthMismatch {
                seqs: seqs.len(),
                abundances: abundances.len(),
            });
        }

        let seqs = seqs
            .iter()
            .enumerate()
            .map(|(i, s)| encode_seq(s.as_ref(), i))
            .collect::<Result<Vec<_>>>()?;

        Ok(Self {
            seqs,
            abundances: abundances.to_vec(),
        })
    }

    pub fn len(&self) -> usize {
        self.seqs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.seqs.is_empty()
    }

    pub fn seq(&self, i: usize) -> &[u8] {
        &self.seqs[i]
    }

    pub fn abundance(&self, i: usize) -> u64 {
        self.abundances[i]
    }

    pub fn total_reads(&self) -> u64 {
        self.abundances.iter().sum()
    }
}

/// Engine parameters, read-only for a whole run.
#[derive(Debug, Clone, PartialEq)]
pub struct DadaParams {
    pub align: AlignParams,
    pub err: ErrorMatrix,
    /// Skip alignments whose k-mer distance exceeds `kdist_cutoff`.
    pub use_kmers: bool,
    pub kdist_cutoff: f64,
    pub omega_a: f64,
    /// Test abundance-1 families against `omega_s`.
    pub use_singletons: bool,
    pub omega_s: f64,
    /// Stop budding once this many clusters exist.
    pub max_clusters: Option<usize>,
}

impl Default for DadaParams {
    fn default() -> Self {
        Self {
            align: AlignParams::default(),
            err: ErrorMatrix::default(),
            use_kmers: true,
            kdist_cutoff: 0.5,
            omega_a: 0.01,
            use_singletons: false,
            omega_s: 1e-3,
            max_clusters: None,
        }
    }
}

impl DadaParams {
    pub fn check(&self) -> Result<()> {
        let unit = |name: &'static str, v: f64| {
            if (0.0..=1.0).contains(&v) {
                Ok(())
            } else {
                Err(DadaError::InvalidParameter {
                    name,
                    message: format!("{} is outside [0, 1]", v),
                })
            }
        };
        unit("kdist_cutoff", self.kdist_cutoff)?;
        unit("omegaA", self.omega_a)?;
        unit("omegaS", self.omega_s)?;

        if !self.align.gap.is_finite() {
            return Err(DadaError::InvalidParameter {
                name: "gap",
                message: format!("{} is not finite", self.align.gap),
            });
        }
        if self.max_clusters == Some(0) {
            return Err(DadaError::InvalidParameter {
                name: "max_clusters",
                message: "must be at least 1".to_string(),
            });
        }
        Ok(())
    }
}

/// Caller data as a binding layer hands it over: vectors, nested-vector
/// matrices and scalars that arrive as vectors of unknown length.
#[derive(Debug, Clone, Default)]
pub struct DadaInput {
    pub seqs: Vec<String>,
    pub abundances: Vec<u64>,
    pub score: Vec<Vec<f64>>,
    pub err: Vec<Vec<f64>>,
    pub gap: Vec<f64>,
    pub use_kmers: Vec<bool>,
    pub kdist_cutoff: Vec<f64>,
    pub omega_a: Vec<f64>,
    pub use_singletons: Vec<bool>,
    pub omega_s: Vec<f64>,
}

/// Exactly one value, or a multiplicity error.
pub fn scalar<T: Copy>(name: &'static str, values: &[T]) -> Result<T> {
    match values {
        [v] => Ok(*v),
        _ => Err(DadaError::ScalarMultiplicity {
            name,
            len: values.len(),
        }),
    }
}

impl DadaInput {
    /// Checks every precondition, in the order a caller would see them fail.
    ///
    /// Band and cluster cap are not part of the marshalled input and keep
    /// their defaults.
    pub fn validate(&self) -> Result<(Uniques, DadaParams)> {
        let uniques = Uniques::from_vectors(&self.seqs, &self.abundances)?;
        let score = ScoreMatrix::from_rows(&self.score)?;
        let err = ErrorMatrix::from_rows(&self.err)?;

        let params = DadaParams {
            align: AlignParams {
                score,
                gap: scalar("Gap penalty", &self.gap)?,
                ..Default::default()
            },
            err,
            use_kmers: scalar("Use_kmers", &self.use_kmers)?,
            kdist_cutoff: scalar("Kdist cutoff", &self.kdist_cutoff)?,
            omega_a: scalar("OmegaA", &self.omega_a)?,
            use_singletons: scalar("use_singletons", &self.use_singletons)?,
            omega_s: scalar("OmegaS", &self.omega_s)?,
            max_clusters: None,
        };
        params.check()?;

        Ok((uniques, params))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn input() -> DadaInput {
        DadaInput {
            seqs: vec!["ACGTAC".into(), "ACGTAA".into(), "ACGTTT".into()],
            abundances: vec![10, 3, 1],
            score: vec![
                vec![5.0, -4.0, -4.0, -4.0],
                vec![-4.0, 5.0, -4.0, -4.0],
                vec![-4.0, -4.0, 5.0, -4.0],
                vec![-4.0, -4.0, -4.0, 5.0],
            ],
            err: vec![vec![0.25; 4]; 4],
            gap: vec![-8.0],
            use_kmers: vec![true],
            kdist_cutoff: vec![0.5],
            omega_a: vec![0.01],
            use_singletons: vec![false],
            omega_s: vec![0.001],
        }
    }

    #[test]
    fn test_validate_ok() {
        let (uniques, params) = input().validate().unwrap();
        assert_eq!(uniques.len(), 3);
        assert_eq!(uniques.total_reads(), 14);
        assert_eq!(params.align.gap, -8.0);
        assert!(params.use_kmers);
        assert!(!params.use_singletons);
    }

    #[test]
    fn test_length_mismatch() {
        let mut inp = input();
        inp.abundances.push(4);
        assert_eq!(
            inp.validate().unwrap_err(),
            DadaError::LengthMismatch {
                seqs: 3,
                abundances: 4
            }
        );
    }

    #[test]
    fn test_matrix_shape() {
        let mut inp = input();
        inp.err.pop();
        assert!(matches!(
            inp.validate(),
            Err(DadaError::MatrixShape { name: "Error", rows: 3, .. })
        ));
    }

    #[test]
    fn test_scalar_multiplicity() {
        let mut inp = input();
        inp.gap = vec![-8.0, -4.0];
        assert_eq!(
            inp.validate().unwrap_err(),
            DadaError::ScalarMultiplicity {
                name: "Gap penalty",
                len: 2
            }
        );

        let mut inp = input();
        inp.omega_s.clear();
        assert!(matches!(
            inp.validate(),
            Err(DadaError::ScalarMultiplicity { name: "OmegaS", len: 0 })
        ));
    }

    #[test]
    fn test_bad_parameter() {
        let mut inp = input();
        inp.omega_a = vec![1.5];
        assert!(matches!(
            inp.validate(),
            Err(DadaError::InvalidParameter { name: "omegaA", .. })
        ));
    }

    #[test]
    fn test_invalid_base() {
        let mut inp = input();
        inp.seqs[1] = "ACXTAA".into();
        assert!(matches!(
            inp.validate(),
            Err(DadaError::InvalidBase { index: 1, pos: 2, base: 'X' })
        ));
    }
}
