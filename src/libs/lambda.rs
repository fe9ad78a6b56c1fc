use crate::libs::align::Sub;
use crate::libs::matrix::ErrorMatrix;
use crate::libs::nt::is_base;

/// Probability that a read of `seq` comes out of the sequencer without any error.
pub fn get_self(seq: &[u8], err: &ErrorMatrix) -> f64 {
    seq.iter()
        .filter(|&&nt| is_base(nt))
        .map(|&nt| err.rate(nt, nt).ln())
        .sum::<f64>()
        .exp()
}

/// Probability that a read of the true sequence is observed as the
/// substituted one.
///
/// `self_prob` is [`get_self`] of the true sequence. Gaps and `N` positions
/// contribute nothing.
///
/// ```
/// use dada::libs::align::align_subs;
/// use dada::libs::lambda::{compute_lambda, get_self};
/// use dada::libs::matrix::ErrorMatrix;
/// use dada::libs::nt::encode_seq;
///
/// let err = ErrorMatrix::uniform(0.001);
/// let center = encode_seq("ACGTACGTAC", 0).unwrap();
/// let read = encode_seq("ACGTACCTAC", 1).unwrap();
/// let sub = align_subs(&center, &read, &Default::default());
/// let lambda = compute_lambda(&sub, get_self(&center, &err), &err);
/// assert!((lambda - 0.997f64.powi(9) * 0.001).abs() < 1e-12);
/// ```
pub fn compute_lambda(sub: &Sub, self_prob: f64, err: &ErrorMatrix) -> f64 {
    sub.subs.iter().fold(self_prob, |lambda, s| {
        lambda * err.rate(s.nt0, s.nt1) / err.rate(s.nt0, s.nt0)
    })
}
