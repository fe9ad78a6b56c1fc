use crate::libs::matrix::ScoreMatrix;
use crate::libs::nt::{is_base, Nt};

/// Default width of the diagonal band.
pub const BAND: usize = 16;

const GAP: u8 = Nt::Gap as u8;

// Traceback pointers
const DIAG: u8 = 1;
const LEFT: u8 = 2;
const UP: u8 = 3;

#[derive(Debug, Clone, PartialEq)]
pub struct AlignParams {
    pub score: ScoreMatrix,
    /// Added once per interior gap position, normally negative.
    pub gap: f64,
    /// `None` for an unbanded alignment.
    pub band: Option<usize>,
}

impl Default for AlignParams {
    fn default() -> Self {
        Self {
            score: ScoreMatrix::default(),
            gap: -8.0,
            band: Some(BAND),
        }
    }
}

/// A pairwise alignment of two encoded sequences.
///
/// Both rows have the same length; gap columns hold [`Nt::Gap`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Alignment {
    pub score: f64,
    pub rows: [Vec<u8>; 2],
}

impl Alignment {
    pub fn len(&self) -> usize {
        self.rows[0].len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows[0].is_empty()
    }
}

/// Global alignment with free end gaps, restricted to a diagonal band.
///
/// Gaps before the first and after the last aligned base of either sequence
/// cost nothing. Cells further than `band` from the main diagonal are never
/// filled; the band is widened to the length difference of the two sequences
/// so the final cell is always reachable.
///
/// ```
/// use dada::libs::align::{align_endsfree, AlignParams};
/// use dada::libs::nt::encode_seq;
///
/// let s1 = encode_seq("ACGTACGT", 0).unwrap();
/// let s2 = encode_seq("CGTACG", 1).unwrap();
/// let al = align_endsfree(&s1, &s2, &AlignParams::default());
/// assert_eq!(al.score, 30.0);
/// assert_eq!(al.len(), 8);
/// ```
pub fn align_endsfree(s1: &[u8], s2: &[u8], params: &AlignParams) -> Alignment {
    let len1 = s1.len();
    let len2 = s2.len();
    let ncol = len2 + 1;
    let gap_p = params.gap;

    let band = params.band.map(|b| b.max(len1.abs_diff(len2)));
    let in_band = |i: usize, j: usize| band.map_or(true, |b| i.abs_diff(j) <= b);

    let mut d = vec![f64::NEG_INFINITY; (len1 + 1) * ncol];
    let mut p = vec![0u8; (len1 + 1) * ncol];

    // Ends-free leading gaps
    for i in 0..=len1 {
        if in_band(i, 0) {
            d[i * ncol] = 0.0;
        }
        p[i * ncol] = UP;
    }
    for j in 0..=len2 {
        if in_band(0, j) {
            d[j] = 0.0;
        }
        p[j] = LEFT;
    }

    for i in 1..=len1 {
        let (l, r) = match band {
            Some(b) => (i.saturating_sub(b).max(1), (i + b).min(len2)),
            None => (1, len2),
        };

        for j in l..=r {
            // Trailing gaps along the last row or column are free
            let left = if i == len1 {
                d[i * ncol + j - 1]
            } else {
                d[i * ncol + j - 1] + gap_p
            };
            let up = if j == len2 {
                d[(i - 1) * ncol + j]
            } else {
                d[(i - 1) * ncol + j] + gap_p
            };
            let diag = d[(i - 1) * ncol + j - 1] + params.score.get_score(s1[i - 1], s2[j - 1]);

            let idx = i * ncol + j;
            if up >= diag && up >= left {
                d[idx] = up;
                p[idx] = UP;
            } else if left >= diag {
                d[idx] = left;
                p[idx] = LEFT;
            } else {
                d[idx] = diag;
                p[idx] = DIAG;
            }
        }
    }

    // Trace back
    let mut row1 = Vec::with_capacity(len1 + len2);
    let mut row2 = Vec::with_capacity(len1 + len2);
    let (mut i, mut j) = (len1, len2);
    while i > 0 || j > 0 {
        match p[i * ncol + j] {
            DIAG => {
                i -= 1;
                j -= 1;
                row1.push(s1[i]);
                row2.push(s2[j]);
            }
            LEFT => {
                j -= 1;
                row1.push(GAP);
                row2.push(s2[j]);
            }
            _ => {
                i -= 1;
                row1.push(s1[i]);
                row2.push(GAP);
            }
        }
    }
    row1.reverse();
    row2.reverse();

    Alignment {
        score: d[len1 * ncol + len2],
        rows: [row1, row2],
    }
}

/// One substituted position, `pos` is 0-based in the first sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Substitution {
    pub pos: usize,
    pub nt0: u8,
    pub nt1: u8,
}

/// Substitutions of the second aligned sequence relative to the first.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Sub {
    /// Aligned A/C/G/T pairs that differ.
    pub nsubs: usize,
    /// Gap columns, terminal ones included. Not substitutions.
    pub ngaps: usize,
    pub subs: Vec<Substitution>,
    /// Every aligned A/C/G/T pair, `counts[true][observed]`.
    pub counts: [[u32; 4]; 4],
}

impl Sub {
    pub fn from_alignment(al: &Alignment) -> Self {
        let mut sub = Sub::default();
        let mut pos0 = 0;

        for (&nt0, &nt1) in al.rows[0].iter().zip(al.rows[1].iter()) {
            if nt0 == GAP || nt1 == GAP {
                sub.ngaps += 1;
            } else if is_base(nt0) && is_base(nt1) {
                sub.counts[nt0 as usize][nt1 as usize] += 1;
                if nt0 != nt1 {
                    sub.nsubs += 1;
                    sub.subs.push(Substitution {
                        pos: pos0,
                        nt0,
                        nt1,
                    });
                }
            }

            if nt0 != GAP {
                pos0 += 1;
            }
        }

        sub
    }
}

/// Aligns and summarizes in one go.
pub fn align_subs(s1: &[u8], s2: &[u8], params: &AlignParams) -> Sub {
    Sub::from_alignment(&align_endsfree(s1, s2, params))
}
