use crate::libs::error::{DadaError, Result};
use std::io::BufRead;

/// Observed-given-true base counts, rows are the true base.
pub type TransMatrix = [[u64; 4]; 4];

/// Shape-checks a nested-vector matrix coming from the outside world.
fn to_array(name: &'static str, rows: &[Vec<f64>]) -> Result<[[f64; 4]; 4]> {
    let ncol = rows.first().map_or(0, |r| r.len());
    if rows.len() != 4 || rows.iter().any(|r| r.len() != 4) {
        return Err(DadaError::MatrixShape {
            name,
            rows: rows.len(),
            cols: ncol,
        });
    }

    let mut m = [[0.0; 4]; 4];
    for (i, row) in rows.iter().enumerate() {
        for (j, &v) in row.iter().enumerate() {
            if !v.is_finite() {
                return Err(DadaError::InvalidParameter {
                    name,
                    message: format!("entry [{}][{}] is not finite", i, j),
                });
            }
            m[i][j] = v;
        }
    }
    Ok(m)
}

/// A 4x4 nucleotide score matrix for alignment, indexed by A, C, G, T.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScoreMatrix {
    scores: [[f64; 4]; 4],
}

impl Default for ScoreMatrix {
    fn default() -> Self {
        Self::new(5.0, -4.0)
    }
}

impl ScoreMatrix {
    /// Uniform match/mismatch scores.
    pub fn new(match_score: f64, mismatch_score: f64) -> Self {
        let mut scores = [[mismatch_score; 4]; 4];
        for (i, row) in scores.iter_mut().enumerate() {
            row[i] = match_score;
        }
        Self { scores }
    }

    pub fn from_rows(rows: &[Vec<f64>]) -> Result<Self> {
        Ok(Self {
            scores: to_array("Score", rows)?,
        })
    }

    pub fn rows(&self) -> Vec<Vec<f64>> {
        self.scores.iter().map(|r| r.to_vec()).collect()
    }

    /// Score of two encoded characters. `N` and gaps score 0.
    #[inline]
    pub fn get_score(&self, c1: u8, c2: u8) -> f64 {
        if c1 < 4 && c2 < 4 {
            self.scores[c1 as usize][c2 as usize]
        } else {
            0.0
        }
    }
}

/// Per-nucleotide substitution rates. Row is the true base, column the observed one.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ErrorMatrix {
    rates: [[f64; 4]; 4],
}

impl Default for ErrorMatrix {
    fn default() -> Self {
        Self::uniform(0.001)
    }
}

impl ErrorMatrix {
    /// Every substitution at rate `off`, the diagonal takes the rest of the row.
    pub fn uniform(off: f64) -> Self {
        let mut rates = [[off; 4]; 4];
        for (i, row) in rates.iter_mut().enumerate() {
            row[i] = 1.0 - 3.0 * off;
        }
        Self { rates }
    }

    pub fn from_rows(rows: &[Vec<f64>]) -> Result<Self> {
        let rates = to_array("Error", rows)?;
        for (i, row) in rates.iter().enumerate() {
            if row.iter().any(|&v| v < 0.0) {
                return Err(DadaError::InvalidParameter {
                    name: "Error",
                    message: format!("row {} has a negative rate", i),
                });
            }
            if row[i] <= 0.0 {
                return Err(DadaError::InvalidParameter {
                    name: "Error",
                    message: format!("diagonal entry [{}][{}] must be positive", i, i),
                });
            }
        }
        Ok(Self { rates })
    }

    pub fn rows(&self) -> Vec<Vec<f64>> {
        self.rates.iter().map(|r| r.to_vec()).collect()
    }

    #[inline]
    pub fn rate(&self, true_nt: u8, obs_nt: u8) -> f64 {
        self.rates[true_nt as usize][obs_nt as usize]
    }
}

/// Reads a whitespace separated 4x4 matrix.
///
/// Lines starting with '#' are comments. An optional `A C G T` header and
/// leading row labels are skipped. The shape is not checked here.
///
/// ```
/// let rows = dada::libs::matrix::read_matrix(std::io::Cursor::new(
///     "# score\n  A C G T\nA 5 -4 -4 -4\nC -4 5 -4 -4\nG -4 -4 5 -4\nT -4 -4 -4 5\n",
/// ))
/// .unwrap();
/// assert_eq!(rows.len(), 4);
/// assert_eq!(rows[2], vec![-4.0, -4.0, 5.0, -4.0]);
/// ```
pub fn read_matrix<R: BufRead>(reader: R) -> anyhow::Result<Vec<Vec<f64>>> {
    let mut rows = vec![];

    for line in reader.lines() {
        let line = line?;
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        let parts: Vec<&str> = line.split_whitespace().collect();

        // Header line, all single letters
        if rows.is_empty()
            && parts
                .iter()
                .all(|s| s.len() == 1 && "ACGTacgt".contains(s))
        {
            continue;
        }

        let values = if parts[0].parse::<f64>().is_err() {
            &parts[1..]
        } else {
            &parts[..]
        };

        let mut row = Vec::with_capacity(values.len());
        for v in values {
            row.push(
                v.parse::<f64>()
                    .map_err(|e| anyhow::anyhow!("Invalid matrix entry {:?}: {}", v, e))?,
            );
        }
        rows.push(row);
    }

    Ok(rows)
}

/// Writes a transition matrix with A C G T labels.
pub fn write_trans(writer: &mut dyn std::io::Write, trans: &TransMatrix) -> std::io::Result<()> {
    writer.write_all(b"#\tA\tC\tG\tT\n")?;
    for (i, row) in trans.iter().enumerate() {
        writer.write_fmt(format_args!(
            "{}\t{}\n",
            crate::libs::nt::NT_BASES[i] as char,
            itertools::join(row.iter(), "\t")
        ))?;
    }
    Ok(())
}
