//! The divisive clustering engine.
//!
//! Raws, families and clusters live in arenas addressed by index. Raws never
//! change; families are rebuilt from scratch on every family update; clusters
//! only ever grow in number. Membership is kept in two maps, raw -> family and
//! family -> cluster, plus the member lists each cluster and family holds.
//!
//! One run walks the state machine
//!
//! ```text
//! Initialized -> FamiliesUpdated -> PValuesUpdated -> BudCreated(i) | Converged
//!                       ^                                  |
//!                       +-- consensus, lambda, shuffle ----+
//! ```

use crate::libs::align::{align_subs, Sub};
use crate::libs::error::Result;
use crate::libs::input::{DadaParams, Uniques};
use crate::libs::kmer::{KmerProfile, KMER_SIZE};
use crate::libs::lambda::{compute_lambda, get_self};
use crate::libs::matrix::TransMatrix;
use crate::libs::nt::decode_seq;
use crate::libs::pval::{pval_abundance, pval_singleton};
use fxhash::FxHashMap;
use indexmap::IndexMap;
use rayon::prelude::*;
use std::cmp::Ordering;

/// Alignments keyed by (cluster consensus raw, raw). `None` marks a pair the
/// k-mer prefilter ruled out.
type SubCache = FxHashMap<(usize, usize), Option<Sub>>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum State {
    Initialized,
    FamiliesUpdated,
    PValuesUpdated,
    /// Index of the new cluster
    BudCreated(usize),
    Converged,
}

#[derive(Debug, Clone)]
pub struct Raw {
    pub seq: Vec<u8>,
    pub reads: u64,
    kmers: Option<KmerProfile>,
}

/// Raws sharing one exact sequence inside a cluster.
#[derive(Debug, Clone)]
pub struct Fam {
    /// The most abundant member raw
    pub center: usize,
    pub raws: Vec<usize>,
    pub reads: u64,
    /// Relative to the owning cluster's consensus
    pub lambda: f64,
    pub p_a: f64,
    pub p_s: f64,
}

#[derive(Debug, Clone)]
pub struct Bi {
    /// Consensus raw
    pub center: usize,
    pub fams: Vec<usize>,
    pub reads: u64,
    /// Error-free probability of the consensus
    pub self_prob: f64,
    pub trans: TransMatrix,
    /// p-value that justified the bud, 1 for the first cluster
    pub birth_p: f64,
    pub birth_round: usize,
}

/// One inferred true sequence.
#[derive(Debug, Clone, PartialEq)]
pub struct Genotype {
    pub sequence: String,
    pub abundance: u64,
    pub n_uniques: usize,
    pub birth_pval: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DadaOutput {
    /// In cluster creation order
    pub genotypes: Vec<Genotype>,
    pub trans: TransMatrix,
    pub rounds: usize,
}

/// The whole clustering state of one run.
pub struct B {
    params: DadaParams,
    raws: Vec<Raw>,
    fams: Vec<Fam>,
    bis: Vec<Bi>,
    raw_fam: Vec<usize>,
    fam_bi: Vec<usize>,
    /// lambda of every family against every cluster, filled by `lambda_update`
    lambdas: Vec<Vec<f64>>,
    subs: SubCache,
    min_a: Option<usize>,
    min_s: Option<usize>,
    state: State,
    round: usize,
    n_aligns: usize,
    n_skips: usize,
}

impl B {
    /// All raws in one cluster holding one family.
    ///
    /// `uniques` must not be empty.
    pub fn new(uniques: &Uniques, params: DadaParams) -> Self {
        assert!(!uniques.is_empty(), "B needs at least one raw");

        let use_kmers = params.use_kmers;
        let raws: Vec<Raw> = (0..uniques.len())
            .into_par_iter()
            .map(|i| {
                let seq = uniques.seq(i).to_vec();
                let kmers = use_kmers.then(|| KmerProfile::new(&seq, KMER_SIZE));
                Raw {
                    seq,
                    reads: uniques.abundance(i),
                    kmers,
                }
            })
            .collect();

        let all: Vec<usize> = (0..raws.len()).collect();
        let center = most_abundant(&raws, &all);
        let reads = uniques.total_reads();
        let self_prob = get_self(&raws[center].seq, &params.err);

        let fam = Fam {
            center,
            raws: all,
            reads,
            lambda: self_prob,
            p_a: 1.0,
            p_s: 1.0,
        };
        let bi = Bi {
            center,
            fams: vec![0],
            reads,
            self_prob,
            trans: [[0; 4]; 4],
            birth_p: 1.0,
            birth_round: 0,
        };

        Self {
            params,
            raw_fam: vec![0; raws.len()],
            raws,
            fams: vec![fam],
            bis: vec![bi],
            fam_bi: vec![0],
            lambdas: vec![],
            subs: SubCache::default(),
            min_a: None,
            min_s: None,
            state: State::Initialized,
            round: 1,
            n_aligns: 0,
            n_skips: 0,
        }
    }

    pub fn state(&self) -> State {
        self.state
    }

    pub fn round(&self) -> usize {
        self.round
    }

    pub fn raws(&self) -> &[Raw] {
        &self.raws
    }

    pub fn fams(&self) -> &[Fam] {
        &self.fams
    }

    pub fn bis(&self) -> &[Bi] {
        &self.bis
    }

    pub fn nclust(&self) -> usize {
        self.bis.len()
    }

    pub fn cluster_of_raw(&self, raw: usize) -> usize {
        self.fam_bi[self.raw_fam[raw]]
    }

    pub fn total_reads(&self) -> u64 {
        self.bis.iter().map(|bi| bi.reads).sum()
    }

    /// Alignments performed and skipped by the k-mer prefilter so far.
    pub fn align_counts(&self) -> (usize, usize) {
        (self.n_aligns, self.n_skips)
    }

    /// Advances the state machine by one transition.
    pub fn step(&mut self) -> State {
        self.state = match self.state {
            State::Initialized => {
                self.fam_update();
                State::FamiliesUpdated
            }
            State::FamiliesUpdated => {
                self.p_update();
                State::PValuesUpdated
            }
            State::PValuesUpdated => match self.bud() {
                Some(newi) => State::BudCreated(newi),
                None => State::Converged,
            },
            State::BudCreated(_) => {
                self.round += 1;
                log::info!("----------- Round {} -----------", self.round);
                self.consensus_update();
                self.lambda_update();
                let moved = self.shuffle();
                log::debug!("Shuffled {} families", moved);
                self.consensus_update();
                self.fam_update();
                State::FamiliesUpdated
            }
            State::Converged => State::Converged,
        };

        debug_assert!(self.check_partition().is_ok());
        self.state
    }

    /// Steps until convergence.
    pub fn run(&mut self) -> usize {
        while self.step() != State::Converged {}

        let (aligned, skipped) = self.align_counts();
        log::info!(
            "Converged after {} rounds: {} clusters, {} alignments, {} skipped by k-mer distance",
            self.round,
            self.nclust(),
            aligned,
            skipped
        );
        self.round
    }

    /// Aligns every missing (consensus, raw) pair in parallel.
    ///
    /// With `prefilter`, pairs too far apart by k-mer distance are recorded
    /// as skipped instead. Without it, previously skipped pairs are aligned.
    fn fill_subs(&mut self, mut keys: Vec<(usize, usize)>, prefilter: bool) {
        keys.retain(|k| match self.subs.get(k) {
            Some(Some(_)) => false,
            Some(None) => !prefilter,
            None => true,
        });
        keys.sort_unstable();
        keys.dedup();

        let raws = &self.raws;
        let params = &self.params;
        let computed: Vec<((usize, usize), Option<Sub>)> = keys
            .into_par_iter()
            .map(|(center, raw)| {
                let skip = prefilter
                    && params.use_kmers
                    && match (&raws[center].kmers, &raws[raw].kmers) {
                        (Some(kc), Some(kr)) => kc.dist(kr) > params.kdist_cutoff,
                        _ => false,
                    };
                let sub = if skip {
                    None
                } else {
                    Some(align_subs(&raws[center].seq, &raws[raw].seq, &params.align))
                };
                ((center, raw), sub)
            })
            .collect();

        for (key, sub) in computed {
            if sub.is_some() {
                self.n_aligns += 1;
            } else {
                self.n_skips += 1;
            }
            self.subs.insert(key, sub);
        }
    }

    /// Regroups every cluster's raws into families of identical sequence,
    /// then refreshes family lambdas and cluster totals.
    pub fn fam_update(&mut self) {
        let mut fams = Vec::with_capacity(self.fams.len());
        let mut fam_bi = Vec::with_capacity(self.fams.len());

        for (i, bi) in self.bis.iter_mut().enumerate() {
            let mut members: Vec<usize> = bi
                .fams
                .iter()
                .flat_map(|&f| self.fams[f].raws.iter().copied())
                .collect();
            members.sort_unstable();

            let mut groups: IndexMap<&[u8], Vec<usize>> = IndexMap::new();
            for &r in &members {
                groups.entry(&self.raws[r].seq[..]).or_default().push(r);
            }

            bi.fams.clear();
            for (_, raws) in groups {
                let center = most_abundant(&self.raws, &raws);
                let reads = raws.iter().map(|&r| self.raws[r].reads).sum();
                bi.fams.push(fams.len());
                fam_bi.push(i);
                fams.push(Fam {
                    center,
                    raws,
                    reads,
                    lambda: 0.0,
                    p_a: 1.0,
                    p_s: 1.0,
                });
            }
        }

        for (f, fam) in fams.iter().enumerate() {
            for &r in &fam.raws {
                self.raw_fam[r] = f;
            }
        }
        self.fams = fams;
        self.fam_bi = fam_bi;

        // A family is always aligned to its own cluster
        let keys: Vec<(usize, usize)> = self
            .fams
            .iter()
            .enumerate()
            .map(|(f, fam)| (self.bis[self.fam_bi[f]].center, fam.center))
            .collect();
        self.fill_subs(keys, false);

        for bi in self.bis.iter_mut() {
            bi.reads = 0;
            bi.trans = [[0; 4]; 4];
        }
        for (f, fam) in self.fams.iter_mut().enumerate() {
            let bi = &mut self.bis[self.fam_bi[f]];
            fam.lambda = match self.subs.get(&(bi.center, fam.center)) {
                Some(Some(sub)) => {
                    for (t, row) in sub.counts.iter().enumerate() {
                        for (o, &n) in row.iter().enumerate() {
                            bi.trans[t][o] += n as u64 * fam.reads;
                        }
                    }
                    compute_lambda(sub, bi.self_prob, &self.params.err)
                }
                _ => 0.0,
            };
            bi.reads += fam.reads;
        }
    }

    /// Abundance and singleton p-values of every family against its cluster.
    ///
    /// The family holding a cluster's consensus is never tested.
    pub fn p_update(&mut self) {
        self.min_a = None;
        self.min_s = None;

        for f in 0..self.fams.len() {
            let bi = &self.bis[self.fam_bi[f]];
            if self.raw_fam[bi.center] == f {
                self.fams[f].p_a = 1.0;
                self.fams[f].p_s = 1.0;
                continue;
            }

            let reads = self.fams[f].reads;
            let e_reads = self.fams[f].lambda * bi.reads as f64;
            self.fams[f].p_a = pval_abundance(reads, e_reads);
            self.fams[f].p_s = if reads == 1 {
                pval_singleton(e_reads)
            } else {
                1.0
            };

            if reads > 1 && self.more_significant(f, self.min_a, |fam| fam.p_a) {
                self.min_a = Some(f);
            }
            if reads == 1 && self.more_significant(f, self.min_s, |fam| fam.p_s) {
                self.min_s = Some(f);
            }
        }
    }

    /// Lower p-value first, then larger abundance, then lower raw index.
    fn more_significant(&self, f: usize, best: Option<usize>, p: impl Fn(&Fam) -> f64) -> bool {
        let Some(b) = best else {
            return true;
        };
        let (fam, other) = (&self.fams[f], &self.fams[b]);
        p(fam)
            .total_cmp(&p(other))
            .then(other.reads.cmp(&fam.reads))
            .then(fam.center.cmp(&other.center))
            == Ordering::Less
    }

    /// Most significant family that still fails its test, if any.
    pub fn min_pvals(&self) -> (Option<(usize, f64)>, Option<(usize, f64)>) {
        (
            self.min_a.map(|f| (f, self.fams[f].p_a)),
            self.min_s.map(|f| (f, self.fams[f].p_s)),
        )
    }

    /// Splits the most significant family off into a new cluster.
    ///
    /// Abundance p-values are tried against omegaA first, then singleton
    /// p-values against omegaS when enabled. Returns the new cluster index.
    pub fn bud(&mut self) -> Option<usize> {
        if let Some(max) = self.params.max_clusters {
            if self.bis.len() >= max {
                log::info!("Reached the cap of {} clusters", max);
                return None;
            }
        }

        let (f, p) = match self.min_pvals() {
            (Some((f, p)), _) if p < self.params.omega_a => (f, p),
            (_, Some((f, p))) if self.params.use_singletons && p < self.params.omega_s => (f, p),
            _ => return None,
        };

        let old = self.fam_bi[f];
        let newi = self.bis.len();
        let fam = &self.fams[f];

        self.bis[old].fams.retain(|&x| x != f);
        self.bis[old].reads -= fam.reads;
        self.bis.push(Bi {
            center: fam.center,
            fams: vec![f],
            reads: fam.reads,
            self_prob: get_self(&self.raws[fam.center].seq, &self.params.err),
            trans: [[0; 4]; 4],
            birth_p: p,
            birth_round: self.round,
        });
        self.fam_bi[f] = newi;

        log::info!(
            "New cluster {} from cluster {}: raw {} with {} reads, p = {:e}",
            newi,
            old,
            self.fams[f].center,
            self.fams[f].reads,
            p
        );

        Some(newi)
    }

    /// Makes every cluster's most abundant raw its consensus.
    pub fn consensus_update(&mut self) {
        for bi in self.bis.iter_mut() {
            let members: Vec<usize> = bi
                .fams
                .iter()
                .flat_map(|&f| self.fams[f].raws.iter().copied())
                .collect();
            let center = most_abundant(&self.raws, &members);
            if center != bi.center {
                log::debug!("Consensus moved from raw {} to raw {}", bi.center, center);
                bi.center = center;
                bi.self_prob = get_self(&self.raws[center].seq, &self.params.err);
            }
        }
    }

    /// lambda of every family against every cluster.
    pub fn lambda_update(&mut self) {
        let bis = &self.bis;
        let keys: Vec<(usize, usize)> = self
            .fams
            .iter()
            .flat_map(|fam| bis.iter().map(move |bi| (bi.center, fam.center)))
            .collect();
        self.fill_subs(keys, true);

        let bis = &self.bis;
        let subs = &self.subs;
        let err = &self.params.err;
        self.lambdas = self
            .fams
            .par_iter()
            .map(|fam| {
                bis.iter()
                    .map(|bi| match subs.get(&(bi.center, fam.center)) {
                        Some(Some(sub)) => compute_lambda(sub, bi.self_prob, err),
                        _ => 0.0,
                    })
                    .collect::<Vec<f64>>()
            })
            .collect();

        log::debug!(
            "{} x {} lambdas, {} alignments cached",
            self.fams.len(),
            self.bis.len(),
            self.subs.len()
        );
    }

    /// Moves each family to the cluster under which its lambda is largest.
    ///
    /// A family only moves for a strictly larger lambda, and the family
    /// holding its cluster's consensus stays put. Returns the number moved.
    pub fn shuffle(&mut self) -> usize {
        let mut moved = 0;

        for f in 0..self.fams.len() {
            let cur = self.fam_bi[f];
            if self.raw_fam[self.bis[cur].center] == f {
                continue;
            }

            let lambdas = &self.lambdas[f];
            let mut best = cur;
            for (i, &l) in lambdas.iter().enumerate() {
                if l > lambdas[best] {
                    best = i;
                }
            }

            if best != cur {
                let reads = self.fams[f].reads;
                self.bis[cur].fams.retain(|&x| x != f);
                self.bis[cur].reads -= reads;
                self.bis[best].fams.push(f);
                self.bis[best].reads += reads;
                self.fam_bi[f] = best;
                moved += 1;
            }
        }

        moved
    }

    /// Every raw in exactly one family, every family in exactly one cluster,
    /// and the read totals add up.
    pub fn check_partition(&self) -> std::result::Result<(), String> {
        let mut raw_seen = vec![0usize; self.raws.len()];
        for (f, fam) in self.fams.iter().enumerate() {
            for &r in &fam.raws {
                raw_seen[r] += 1;
                if self.raw_fam[r] != f {
                    return Err(format!("raw {} listed in family {} but mapped to {}", r, f, self.raw_fam[r]));
                }
            }
            let reads: u64 = fam.raws.iter().map(|&r| self.raws[r].reads).sum();
            if reads != fam.reads {
                return Err(format!("family {} holds {} reads, members sum to {}", f, fam.reads, reads));
            }
        }
        if let Some(r) = raw_seen.iter().position(|&n| n != 1) {
            return Err(format!("raw {} is in {} families", r, raw_seen[r]));
        }

        let mut fam_seen = vec![0usize; self.fams.len()];
        for (i, bi) in self.bis.iter().enumerate() {
            for &f in &bi.fams {
                fam_seen[f] += 1;
                if self.fam_bi[f] != i {
                    return Err(format!("family {} listed in cluster {} but mapped to {}", f, i, self.fam_bi[f]));
                }
            }
            let reads: u64 = bi.fams.iter().map(|&f| self.fams[f].reads).sum();
            if reads != bi.reads {
                return Err(format!("cluster {} holds {} reads, families sum to {}", i, bi.reads, reads));
            }
            if self.fam_bi[self.raw_fam[bi.center]] != i {
                return Err(format!("cluster {} does not contain its consensus raw {}", i, bi.center));
            }
        }
        if let Some(f) = fam_seen.iter().position(|&n| n != 1) {
            return Err(format!("family {} is in {} clusters", f, fam_seen[f]));
        }

        Ok(())
    }

    /// Sum of every cluster's transition counts.
    pub fn trans_matrix(&self) -> TransMatrix {
        let mut trans = [[0u64; 4]; 4];
        for bi in &self.bis {
            for (t, row) in bi.trans.iter().enumerate() {
                for (o, &n) in row.iter().enumerate() {
                    trans[t][o] += n;
                }
            }
        }
        trans
    }

    pub fn output(&self) -> DadaOutput {
        let genotypes = self
            .bis
            .iter()
            .map(|bi| Genotype {
                sequence: decode_seq(&self.raws[bi.center].seq),
                abundance: bi.reads,
                n_uniques: bi.fams.iter().map(|&f| self.fams[f].raws.len()).sum(),
                birth_pval: bi.birth_p,
            })
            .collect();

        DadaOutput {
            genotypes,
            trans: self.trans_matrix(),
            rounds: self.round,
        }
    }
}

/// Highest read count, ties to the lowest index.
fn most_abundant(raws: &[Raw], members: &[usize]) -> usize {
    let mut best = members[0];
    for &r in &members[1..] {
        if raws[r].reads > raws[best].reads || (raws[r].reads == raws[best].reads && r < best) {
            best = r;
        }
    }
    best
}

/// Denoises `uniques` into genotypes.
///
/// ```
/// use dada::libs::cluster::run_dada;
/// use dada::libs::input::{DadaParams, Uniques};
///
/// let uniques = Uniques::from_vectors(
///     &["TACGGAGGGTGCAAGCGTTAATCGGAATTACTGGGCGTAAAG"; 2],
///     &[100, 1],
/// )
/// .unwrap();
/// let out = run_dada(&uniques, &DadaParams::default()).unwrap();
/// assert_eq!(out.genotypes.len(), 1);
/// assert_eq!(out.genotypes[0].abundance, 101);
/// ```
pub fn run_dada(uniques: &Uniques, params: &DadaParams) -> Result<DadaOutput> {
    params.check()?;

    if uniques.is_empty() {
        return Ok(DadaOutput {
            genotypes: vec![],
            trans: [[0; 4]; 4],
            rounds: 0,
        });
    }

    let mut bb = B::new(uniques, params.clone());
    bb.run();
    Ok(bb.output())
}

#[cfg(test)]
mod tests {
    use super::*;

    const REF: &str = "TACGGAGGGTGCAAGCGTTAATCGGAATTACTGGGCGTAAAGCGCACGCAGGCGGTTTGTTAAGTCAGATGTGAAATCCCCGGGCTCAACCTGGGAACTGCATCTGATACTGGCAAGCTTGAGTCTCGTAGAGGGGGGTAGAATTCCAGG";

    /// REF with substitutions at the given positions (cycling to the next base).
    fn mutate(positions: &[usize]) -> String {
        let mut seq: Vec<u8> = REF.bytes().collect();
        for &p in positions {
            seq[p] = match seq[p] {
                b'A' => b'C',
                b'C' => b'G',
                b'G' => b'T',
                _ => b'A',
            };
        }
        String::from_utf8(seq).unwrap()
    }

    fn uniques(seqs: &[String], abundances: &[u64]) -> Uniques {
        Uniques::from_vectors(seqs, abundances).unwrap()
    }

    #[test]
    fn test_identical_sequences() {
        let u = uniques(&[REF.to_string(), REF.to_string()], &[100, 1]);
        let out = run_dada(&u, &DadaParams::default()).unwrap();

        assert_eq!(out.genotypes.len(), 1);
        assert_eq!(out.genotypes[0].abundance, 101);
        assert_eq!(out.genotypes[0].n_uniques, 2);
        assert_eq!(out.genotypes[0].sequence, REF);
        for t in 0..4 {
            for o in 0..4 {
                if t != o {
                    assert_eq!(out.trans[t][o], 0);
                }
            }
        }
        let diag: u64 = (0..4).map(|i| out.trans[i][i]).sum();
        assert_eq!(diag, REF.len() as u64 * 101);
    }

    #[test]
    fn test_error_absorbed() {
        let minor = mutate(&[10, 40, 70, 100, 130]);
        let u = uniques(&[REF.to_string(), minor], &[1000, 1]);
        let out = run_dada(&u, &DadaParams::default()).unwrap();

        assert_eq!(out.genotypes.len(), 1);
        assert_eq!(out.genotypes[0].abundance, 1001);
        assert_eq!(out.genotypes[0].sequence, REF);
        // one read carries five substitutions
        let off: u64 = (0..4)
            .flat_map(|t| (0..4).map(move |o| (t, o)))
            .filter(|(t, o)| t != o)
            .map(|(t, o)| out.trans[t][o])
            .sum();
        assert_eq!(off, 5);
    }

    #[test]
    fn test_abundant_variant_splits() {
        let minor = mutate(&[10, 40, 70, 100, 130]);
        let u = uniques(&[REF.to_string(), minor.clone()], &[1000, 500]);
        let out = run_dada(&u, &DadaParams::default()).unwrap();

        assert_eq!(out.genotypes.len(), 2);
        assert_eq!(out.genotypes[0].sequence, REF);
        assert_eq!(out.genotypes[0].abundance, 1000);
        assert_eq!(out.genotypes[1].sequence, minor);
        assert_eq!(out.genotypes[1].abundance, 500);
        assert!(out.genotypes[1].birth_pval < 0.01);
        assert_eq!(out.rounds, 2);
    }

    #[test]
    fn test_singleton_threshold() {
        let minor = mutate(&[10, 40, 70, 100, 130]);
        let u = uniques(&[REF.to_string(), minor], &[1000, 1]);

        let params = DadaParams {
            use_singletons: true,
            omega_s: 1e-3,
            ..Default::default()
        };
        let out = run_dada(&u, &params).unwrap();
        assert_eq!(out.genotypes.len(), 2);

        // a single substitution is plausible as an error at this depth
        let u = uniques(&[REF.to_string(), mutate(&[50])], &[1000, 1]);
        let out = run_dada(&u, &params).unwrap();
        assert_eq!(out.genotypes.len(), 1);
    }

    #[test]
    fn test_errors_follow_their_parent() {
        let b = mutate(&[5, 25, 45, 65, 85, 105, 125, 145]);
        let mut seqs = vec![REF.to_string(), b.clone()];
        let mut abunds = vec![2000, 1500];
        // single-substitution errors of each parent
        for p in [15, 35, 55] {
            seqs.push(mutate(&[p]));
            abunds.push(2);
        }
        let b_bytes: Vec<u8> = b.bytes().collect();
        for p in [20, 60, 100] {
            let mut e = b_bytes.clone();
            e[p] = if e[p] == b'A' { b'T' } else { b'A' };
            seqs.push(String::from_utf8(e).unwrap());
            abunds.push(2);
        }

        let u = uniques(&seqs, &abunds);
        let mut bb = B::new(&u, DadaParams::default());
        bb.run();

        assert_eq!(bb.nclust(), 2);
        for r in 2..5 {
            assert_eq!(bb.cluster_of_raw(r), bb.cluster_of_raw(0));
        }
        for r in 5..8 {
            assert_eq!(bb.cluster_of_raw(r), bb.cluster_of_raw(1));
        }
        let out = bb.output();
        assert_eq!(out.genotypes[0].abundance, 2006);
        assert_eq!(out.genotypes[1].abundance, 1506);
    }

    #[test]
    fn test_invariants_every_step() {
        let mut seqs = vec![REF.to_string()];
        let mut abunds = vec![5000];
        let variants = [
            vec![12, 80],
            vec![33, 90, 120],
            vec![3],
            vec![44, 45, 46, 47],
            vec![99],
            vec![7, 140],
        ];
        for (i, v) in variants.iter().enumerate() {
            seqs.push(mutate(v));
            abunds.push([800, 300, 4, 150, 1, 2][i]);
        }
        // a duplicate sequence must land with its twin
        seqs.push(mutate(&[33, 90, 120]));
        abunds.push(7);

        let u = uniques(&seqs, &abunds);
        let total = u.total_reads();
        let mut bb = B::new(&u, DadaParams::default());

        let mut last_nclust = bb.nclust();
        let mut rounds = 0;
        loop {
            let state = bb.step();
            assert!(bb.check_partition().is_ok(), "{:?}", bb.check_partition());
            assert_eq!(bb.total_reads(), total);
            assert!(bb.nclust() >= last_nclust);
            if let State::BudCreated(i) = state {
                assert_eq!(i, last_nclust);
                assert_eq!(bb.nclust(), last_nclust + 1);
                rounds += 1;
            } else {
                assert_eq!(bb.nclust(), last_nclust);
            }
            last_nclust = bb.nclust();
            if state == State::Converged {
                break;
            }
        }

        assert_eq!(bb.cluster_of_raw(2), bb.cluster_of_raw(7));
        assert!(rounds + 1 <= 7);
        assert_eq!(bb.round(), rounds + 1);

        // consensus sequences are pairwise distinct
        let out = bb.output();
        for i in 0..out.genotypes.len() {
            for j in i + 1..out.genotypes.len() {
                assert_ne!(out.genotypes[i].sequence, out.genotypes[j].sequence);
            }
        }
        assert_eq!(out.genotypes.iter().map(|g| g.abundance).sum::<u64>(), total);
        assert_eq!(
            out.genotypes.iter().map(|g| g.n_uniques).sum::<usize>(),
            seqs.len()
        );
    }

    #[test]
    fn test_converged_is_terminal() {
        let u = uniques(&[REF.to_string()], &[10]);
        let mut bb = B::new(&u, DadaParams::default());
        assert_eq!(bb.state(), State::Initialized);
        assert_eq!(bb.run(), 1);
        assert_eq!(bb.step(), State::Converged);
        assert_eq!(bb.nclust(), 1);
    }

    #[test]
    fn test_max_clusters() {
        let u = uniques(
            &[REF.to_string(), mutate(&[10, 40, 70, 100, 130]), mutate(&[20, 50, 80, 110])],
            &[1000, 500, 400],
        );
        let params = DadaParams {
            max_clusters: Some(2),
            ..Default::default()
        };
        let out = run_dada(&u, &params).unwrap();
        assert_eq!(out.genotypes.len(), 2);

        let out = run_dada(&u, &DadaParams::default()).unwrap();
        assert_eq!(out.genotypes.len(), 3);
    }

    #[test]
    fn test_kmer_prefilter_skips() {
        let other = "GATGAACGCTGGCGGCGTGCCTAATACATGCAAGTCGAACGCTTCTTTTTCCACCGGAGCTTGCTCCACCGGAAAAAGAGGAGTGGCGAACGGGTGAGTAACACGTGGGTAACCTGCCCATCAGAAGGGGATAACACTTGGAAACAGG";
        let u = uniques(&[REF.to_string(), other.to_string()], &[1000, 900]);
        let mut bb = B::new(&u, DadaParams::default());
        bb.run();

        assert_eq!(bb.nclust(), 2);
        let (aligned, skipped) = bb.align_counts();
        assert!(skipped >= 1);
        assert!(aligned >= 3);

        let params = DadaParams {
            use_kmers: false,
            ..Default::default()
        };
        let mut bb = B::new(&u, params);
        bb.run();
        assert_eq!(bb.nclust(), 2);
        assert_eq!(bb.align_counts().1, 0);
    }

    #[test]
    fn test_empty_input() {
        let out = run_dada(&Uniques::default(), &DadaParams::default()).unwrap();
        assert!(out.genotypes.is_empty());
        assert_eq!(out.rounds, 0);
    }

    #[test]
    fn test_omega_a_threshold() {
        // p is about 1e-3 for five copies of a one-substitution error
        let u = uniques(&[REF.to_string(), mutate(&[60])], &[1000, 5]);

        let out = run_dada(&u, &DadaParams::default()).unwrap();
        assert_eq!(out.genotypes.len(), 2);

        let params = DadaParams {
            omega_a: 1e-4,
            ..Default::default()
        };
        let out = run_dada(&u, &params).unwrap();
        assert_eq!(out.genotypes.len(), 1);
        assert_eq!(out.genotypes[0].abundance, 1005);
    }
}
