//! Smith-Waterman local alignment with affine gaps (Gotoh's two gap states).
//!
//! # Recurrence
//!
//! For every cell `(i, j)`, `i` over sequence A and `j` over sequence B:
//!
//! * `gap_left(i,j) = max(gap_left(i,j-1) - extend, score(i,j-1) - open)`
//! * `gap_up(i,j)   = max(gap_up(i-1,j) - extend, score(i-1,j) - open)`
//! * `score(i,j)    = max(0, score(i-1,j-1) + sub(a_i, b_j), gap_left, gap_up)`
//!
//! Row 0 and column 0 hold zeros. Ties are resolved diagonal > up > left, and
//! the first cell (row-major) holding the highest score starts the traceback.
//!
//! # Traceback
//!
//! Starting at the best cell, each cell's [`Origin`] is followed until a cell
//! scoring 0 is reached; that cell is not part of the path.

use crate::libs::error::Result;
use crate::libs::matrix::{GapPenalties, SubMatrix};

/// Predecessor that produced a cell's score.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Origin {
    Diagonal,
    Up,
    Left,
}

/// Relation of the two residues meeting at a cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchClass {
    Identical,
    Similar,
    Unrelated,
}

impl MatchClass {
    pub fn symbol(&self) -> char {
        match self {
            MatchClass::Identical => '|',
            MatchClass::Similar => ':',
            MatchClass::Unrelated => ' ',
        }
    }
}

/// One entry of the DP matrix.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Cell {
    pub score: i32,
    pub gap_up: i32,
    pub gap_left: i32,
    pub origin: Origin,
    pub class: MatchClass,
}

impl Cell {
    /// Row 0 / column 0: nothing aligned, no gap charged.
    pub const BOUNDARY: Cell = Cell {
        score: 0,
        gap_up: 0,
        gap_left: 0,
        origin: Origin::Diagonal,
        class: MatchClass::Unrelated,
    };
}

/// Computes cell `(i, j)` from its three finished neighbours.
///
/// `sub` is the substitution score of the residue pair, `same` whether the
/// two residues are equal.
pub fn update_cell(
    diag: &Cell,
    up: &Cell,
    left: &Cell,
    sub: i32,
    same: bool,
    gaps: &GapPenalties,
) -> Cell {
    // Gap states can already sit at -open, saturate instead of wrapping
    let gap_left = left
        .gap_left
        .saturating_sub(gaps.extend)
        .max(left.score.saturating_sub(gaps.open));
    let gap_up = up
        .gap_up
        .saturating_sub(gaps.extend)
        .max(up.score.saturating_sub(gaps.open));
    let diagonal = diag.score + sub;

    let (best, origin) = if diagonal >= gap_up && diagonal >= gap_left {
        (diagonal, Origin::Diagonal)
    } else if gap_up >= gap_left {
        (gap_up, Origin::Up)
    } else {
        (gap_left, Origin::Left)
    };

    let class = if same {
        MatchClass::Identical
    } else if sub > 0 {
        MatchClass::Similar
    } else {
        MatchClass::Unrelated
    };

    Cell {
        score: best.max(0),
        gap_up,
        gap_left,
        origin,
        class,
    }
}

/// Kind of a traceback step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepKind {
    /// Residue of A against residue of B.
    Substitution,
    /// Residue of B against a gap in A.
    Insertion,
    /// Residue of A against a gap in B.
    Deletion,
}

/// One column of the alignment. `i` and `j` are the 1-based matrix
/// coordinates of the cell the step was taken from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Step {
    pub kind: StepKind,
    pub class: MatchClass,
    pub i: usize,
    pub j: usize,
    pub residue_a: Option<u8>,
    pub residue_b: Option<u8>,
}

/// The best local alignment of a sequence pair.
#[derive(Debug, Clone, PartialEq)]
pub struct AlignmentResult {
    pub name_a: String,
    pub name_b: String,
    pub len_a: usize,
    pub len_b: usize,
    pub score: i32,
    pub identical: usize,
    pub similar: usize,
    /// Start-to-end order.
    pub path: Vec<Step>,
}

impl AlignmentResult {
    /// Identity and similarity percentages.
    ///
    /// Both are normalised by the longer input sequence, not by the length of
    /// the aligned region, so a short hit inside a long protein scores low.
    pub fn identity_similarity(&self) -> (f64, f64) {
        let longer = self.len_a.max(self.len_b);
        if longer == 0 {
            return (0.0, 0.0);
        }
        let identity = self.identical as f64 / longer as f64 * 100.0;
        let similarity = (self.identical + self.similar) as f64 / longer as f64 * 100.0;
        (identity, similarity)
    }

    pub fn gap_steps(&self) -> usize {
        self.path
            .iter()
            .filter(|s| s.kind != StepKind::Substitution)
            .count()
    }
}

/// Owns the scratch DP matrix so repeated alignments reuse one allocation.
#[derive(Debug, Default)]
pub struct Aligner {
    matrix: Vec<Cell>,
    cols: usize,
}

impl Aligner {
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    fn cell(&self, i: usize, j: usize) -> &Cell {
        &self.matrix[i * self.cols + j]
    }

    pub fn align(
        &mut self,
        name_a: &str,
        seq_a: &[u8],
        name_b: &str,
        seq_b: &[u8],
        sub_matrix: &SubMatrix,
        gaps: &GapPenalties,
    ) -> Result<AlignmentResult> {
        let code_a = sub_matrix.encode(seq_a, name_a)?;
        let code_b = sub_matrix.encode(seq_b, name_b)?;

        let rows = code_a.len() + 1;
        let cols = code_b.len() + 1;
        self.cols = cols;
        self.matrix.clear();
        self.matrix.resize(rows * cols, Cell::BOUNDARY);

        let mut best = (0, 0, 0);
        for i in 1..rows {
            let ca = code_a[i - 1];
            for j in 1..cols {
                let cb = code_b[j - 1];
                let cell = update_cell(
                    self.cell(i - 1, j - 1),
                    self.cell(i - 1, j),
                    self.cell(i, j - 1),
                    sub_matrix.score_codes(ca, cb),
                    ca == cb,
                    gaps,
                );
                if cell.score > best.0 {
                    best = (cell.score, i, j);
                }
                self.matrix[i * cols + j] = cell;
            }
        }

        let (score, mut i, mut j) = best;
        let mut path = vec![];
        let mut identical = 0;
        let mut similar = 0;
        while self.cell(i, j).score > 0 {
            let cell = *self.cell(i, j);
            let step = match cell.origin {
                Origin::Diagonal => {
                    match cell.class {
                        MatchClass::Identical => identical += 1,
                        MatchClass::Similar => similar += 1,
                        MatchClass::Unrelated => {}
                    }
                    Step {
                        kind: StepKind::Substitution,
                        class: cell.class,
                        i,
                        j,
                        residue_a: Some(seq_a[i - 1]),
                        residue_b: Some(seq_b[j - 1]),
                    }
                }
                Origin::Up => Step {
                    kind: StepKind::Deletion,
                    class: MatchClass::Unrelated,
                    i,
                    j,
                    residue_a: Some(seq_a[i - 1]),
                    residue_b: None,
                },
                Origin::Left => Step {
                    kind: StepKind::Insertion,
                    class: MatchClass::Unrelated,
                    i,
                    j,
                    residue_a: None,
                    residue_b: Some(seq_b[j - 1]),
                },
            };
            path.push(step);

            match cell.origin {
                Origin::Diagonal => {
                    i -= 1;
                    j -= 1;
                }
                Origin::Up => i -= 1,
                Origin::Left => j -= 1,
            }
        }
        path.reverse();

        Ok(AlignmentResult {
            name_a: name_a.to_string(),
            name_b: name_b.to_string(),
            len_a: seq_a.len(),
            len_b: seq_b.len(),
            score,
            identical,
            similar,
            path,
        })
    }
}

/// Aligns two sequences with a throwaway [`Aligner`].
pub fn align(
    name_a: &str,
    seq_a: &[u8],
    name_b: &str,
    seq_b: &[u8],
    sub_matrix: &SubMatrix,
    gaps: &GapPenalties,
) -> Result<AlignmentResult> {
    Aligner::new().align(name_a, seq_a, name_b, seq_b, sub_matrix, gaps)
}
