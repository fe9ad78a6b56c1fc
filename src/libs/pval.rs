//! Poisson significance tests on family abundances.
//!
//! All tails are accumulated relative to their largest term and combined in
//! log space, so p-values far below `f64::MIN_POSITIVE` still order correctly
//! until the final `exp`.

/// ln(n!)
pub fn ln_factorial(n: u64) -> f64 {
    if n < 256 {
        (2..=n).map(|i| (i as f64).ln()).sum()
    } else {
        // Stirling series
        let x = n as f64;
        x * x.ln() - x + 0.5 * (2.0 * std::f64::consts::PI * x).ln() + 1.0 / (12.0 * x)
            - 1.0 / (360.0 * x * x * x)
    }
}

fn ln_poisson_pmf(k: u64, e: f64) -> f64 {
    -e + k as f64 * e.ln() - ln_factorial(k)
}

/// ln P(X >= a) for X ~ Poisson(e).
pub fn ln_poisson_upper(a: u64, e: f64) -> f64 {
    if a == 0 {
        return 0.0;
    }
    if e <= 0.0 {
        return f64::NEG_INFINITY;
    }

    if a as f64 > e {
        // Upper tail, terms shrink from k = a on
        let ln_t = ln_poisson_pmf(a, e);
        let mut rel = 1.0;
        let mut ratio = 1.0;
        let mut k = a;
        loop {
            k += 1;
            ratio *= e / k as f64;
            rel += ratio;
            if ratio < rel * f64::EPSILON {
                break;
            }
        }
        ln_t + rel.ln()
    } else {
        // 1 - lower tail, terms shrink from k = a - 1 down
        let ln_t = ln_poisson_pmf(a - 1, e);
        let mut rel = 1.0;
        let mut ratio = 1.0;
        let mut k = a - 1;
        while k > 0 {
            ratio *= k as f64 / e;
            k -= 1;
            rel += ratio;
            if ratio < rel * f64::EPSILON {
                break;
            }
        }
        let ln_lower = (ln_t + rel.ln()).min(0.0);
        (-ln_lower.exp_m1()).ln()
    }
}

/// Abundance p-value: P(X >= reads | X >= 1) with X ~ Poisson(e_reads).
///
/// A family is only seen because it was sequenced at least once, so the
/// test conditions on that. Singletons always get 1.
///
/// ```
/// use dada::libs::pval::pval_abundance;
/// assert_eq!(pval_abundance(1, 0.5), 1.0);
/// assert_eq!(pval_abundance(3, 0.0), 0.0);
/// assert!((pval_abundance(3, 1.0) - 0.127035).abs() < 1e-6);
/// ```
pub fn pval_abundance(reads: u64, e_reads: f64) -> f64 {
    if reads <= 1 {
        return 1.0;
    }
    if e_reads <= 0.0 {
        return 0.0;
    }

    let ln_norm = (-(-e_reads).exp_m1()).ln();
    (ln_poisson_upper(reads, e_reads) - ln_norm).exp().min(1.0)
}

/// Singleton p-value: the unconditional chance of seeing a read at all, P(X >= 1).
pub fn pval_singleton(e_reads: f64) -> f64 {
    if e_reads <= 0.0 {
        return 0.0;
    }
    -(-e_reads).exp_m1()
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_ln_factorial() {
        assert_eq!(ln_factorial(0), 0.0);
        assert_eq!(ln_factorial(1), 0.0);
        assert_relative_eq!(ln_factorial(5), 120f64.ln(), epsilon = 1e-12);
        // Both branches agree at the switch
        let direct: f64 = (2..=300u64).map(|i| (i as f64).ln()).sum();
        assert_relative_eq!(ln_factorial(300), direct, max_relative = 1e-12);
    }

    #[test]
    fn test_poisson_upper() {
        // P(X >= 3 | 1) = 1 - 2.5 / e
        assert_relative_eq!(
            ln_poisson_upper(3, 1.0).exp(),
            1.0 - 2.5 * (-1.0f64).exp(),
            max_relative = 1e-10
        );
        // P(X >= 2 | 5) = 1 - 6 e^-5
        assert_relative_eq!(
            ln_poisson_upper(2, 5.0).exp(),
            1.0 - 6.0 * (-5.0f64).exp(),
            max_relative = 1e-10
        );
        assert_eq!(ln_poisson_upper(0, 3.0), 0.0);
        assert_eq!(ln_poisson_upper(4, 0.0), f64::NEG_INFINITY);
    }

    #[test]
    fn test_poisson_upper_large_mean() {
        // exp(-e) underflows here, the tail must not
        let p = ln_poisson_upper(1000, 1000.0).exp();
        assert!(p > 0.4 && p < 0.6);
        let p = ln_poisson_upper(1200, 1000.0).exp();
        assert!(p > 0.0 && p < 1e-8);
    }

    #[test]
    fn test_pval_abundance_monotone() {
        let mut last = 1.0;
        for reads in 2..20 {
            let p = pval_abundance(reads, 0.5);
            assert!(p < last);
            last = p;
        }
        // far out in the tail, still ordered
        assert!(pval_abundance(500, 1e-10) <= pval_abundance(400, 1e-10));
    }

    #[test]
    fn test_pval_singleton() {
        assert_eq!(pval_singleton(0.0), 0.0);
        assert_relative_eq!(pval_singleton(1e-3), 1.0 - (-1e-3f64).exp(), max_relative = 1e-12);
    }
}
