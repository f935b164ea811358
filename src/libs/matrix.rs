use crate::libs::error::{Result, SwalnError};
use std::io::BufRead;

/// Residue order of the built-in table.
pub const AMINO_ACIDS: &[u8; 24] = b"ARNDCQEGHILKMFPSTWYVBZX*";

#[rustfmt::skip]
const BLOSUM62: [[i32; 24]; 24] = [
    //  A   R   N   D   C   Q   E   G   H   I   L   K   M   F   P   S   T   W   Y   V   B   Z   X   *
    [ 4, -1, -2, -2,  0, -1, -1,  0, -2, -1, -1, -1, -1, -2, -1,  1,  0, -3, -2,  0, -2, -1,  0, -4], // A
    [-1,  5,  0, -2, -3,  1,  0, -2,  0, -3, -2,  2, -1, -3, -2, -1, -1, -3, -2, -3, -1,  0, -1, -4], // R
    [-2,  0,  6,  1, -3,  0,  0,  0,  1, -3, -3,  0, -2, -3, -2,  1,  0, -4, -2, -3,  3,  0, -1, -4], // N
    [-2, -2,  1,  6, -3,  0,  2, -1, -1, -3, -4, -1, -3, -3, -1,  0, -1, -4, -3, -3,  4,  1, -1, -4], // D
    [ 0, -3, -3, -3,  9, -3, -4, -3, -3, -1, -1, -3, -1, -2, -3, -1, -1, -2, -2, -1, -3, -3, -2, -4], // C
    [-1,  1,  0,  0, -3,  5,  2, -2,  0, -3, -2,  1,  0, -3, -1,  0, -1, -2, -1, -2,  0,  3, -1, -4], // Q
    [-1,  0,  0,  2, -4,  2,  5, -2,  0, -3, -3,  1, -2, -3, -1,  0, -1, -3, -2, -2,  1,  4, -1, -4], // E
    [ 0, -2,  0, -1, -3, -2, -2,  6, -2, -4, -4, -2, -3, -3, -2,  0, -2, -2, -3, -3, -1, -2, -1, -4], // G
    [-2,  0,  1, -1, -3,  0,  0, -2,  8, -3, -3, -1, -2, -1, -2, -1, -2, -2,  2, -3,  0,  0, -1, -4], // H
    [-1, -3, -3, -3, -1, -3, -3, -4, -3,  4,  2, -3,  1,  0, -3, -2, -1, -3, -1,  3, -3, -3, -1, -4], // I
    [-1, -2, -3, -4, -1, -2, -3, -4, -3,  2,  4, -2,  2,  0, -3, -2, -1, -2, -1,  1, -4, -3, -1, -4], // L
    [-1,  2,  0, -1, -3,  1,  1, -2, -1, -3, -2,  5, -1, -3, -1,  0, -1, -3, -2, -2,  0,  1, -1, -4], // K
    [-1, -1, -2, -3, -1,  0, -2, -3, -2,  1,  2, -1,  5,  0, -2, -1, -1, -1, -1,  1, -3, -1, -1, -4], // M
    [-2, -3, -3, -3, -2, -3, -3, -3, -1,  0,  0, -3,  0,  6, -4, -2, -2,  1,  3, -1, -3, -3, -1, -4], // F
    [-1, -2, -2, -1, -3, -1, -1, -2, -2, -3, -3, -1, -2, -4,  7, -1, -1, -4, -3, -2, -2, -1, -2, -4], // P
    [ 1, -1,  1,  0, -1,  0,  0,  0, -1, -2, -2,  0, -1, -2, -1,  4,  1, -3, -2, -2,  0,  0,  0, -4], // S
    [ 0, -1,  0, -1, -1, -1, -1, -2, -2, -1, -1, -1, -1, -2, -1,  1,  5, -2, -2,  0, -1, -1,  0, -4], // T
    [-3, -3, -4, -4, -2, -2, -3, -2, -2, -3, -2, -3, -1,  1, -4, -3, -2, 11,  2, -3, -4, -3, -2, -4], // W
    [-2, -2, -2, -3, -2, -1, -2, -3,  2, -1, -1, -2, -1,  3, -3, -2, -2,  2,  7, -1, -3, -2, -1, -4], // Y
    [ 0, -3, -3, -3, -1, -2, -2, -3, -3,  3,  1, -2,  1, -1, -2, -2,  0, -3, -1,  4, -3, -2, -1, -4], // V
    [-2, -1,  3,  4, -3,  0,  1, -1,  0, -3, -4,  0, -3, -3, -2,  0, -1, -4, -3, -3,  4,  1, -1, -4], // B
    [-1,  0,  0,  1, -3,  3,  4, -2,  0, -3, -3,  1, -1, -3, -1,  0, -1, -3, -2, -2,  1,  4, -1, -4], // Z
    [ 0, -1, -1, -1, -2, -1, -1, -1, -1, -1, -1, -1, -1, -1, -2,  0,  0, -2, -1, -1, -1, -1, -1, -4], // X
    [-4, -4, -4, -4, -4, -4, -4, -4, -4, -4, -4, -4, -4, -4, -4, -4, -4, -4, -4, -4, -4, -4, -4,  1], // *
];

const NO_CODE: u8 = u8::MAX;

lazy_static::lazy_static! {
    static ref DEFAULT_MATRIX: SubMatrix = SubMatrix::build_blosum62();
}

/// Affine gap costs, both subtracted from the running score.
///
/// A gap of length `k` costs `open + (k - 1) * extend`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GapPenalties {
    pub open: i32,
    pub extend: i32,
}

impl GapPenalties {
    pub fn new(open: i32, extend: i32) -> Self {
        Self { open, extend }
    }

    pub fn validate(&self) -> Result<()> {
        if self.open < 0 || self.extend < 0 {
            return Err(SwalnError::config(format!(
                "gap penalties must be non-negative, got open={} extend={}",
                self.open, self.extend
            )));
        }
        Ok(())
    }
}

/// A protein substitution matrix.
///
/// Residues are translated once into dense codes (see [`SubMatrix::encode`]),
/// so the DP inner loop never sees an unknown symbol. Lowercase letters share
/// the code of their uppercase form.
#[derive(Debug, Clone)]
pub struct SubMatrix {
    symbols: Vec<u8>,
    index: [u8; 256],
    scores: Vec<i32>,
}

impl Default for SubMatrix {
    fn default() -> Self {
        Self::blosum62()
    }
}

impl SubMatrix {
    /// BLOSUM62 over `ARNDCQEGHILKMFPSTWYVBZX*`.
    pub fn blosum62() -> Self {
        DEFAULT_MATRIX.clone()
    }

    fn build_blosum62() -> Self {
        let scores = BLOSUM62.iter().flat_map(|row| row.iter().copied()).collect();
        Self::from_parts(AMINO_ACIDS.to_vec(), scores)
    }

    fn from_parts(symbols: Vec<u8>, scores: Vec<i32>) -> Self {
        let mut index = [NO_CODE; 256];
        for (code, &sym) in symbols.iter().enumerate() {
            index[sym as usize] = code as u8;
            index[sym.to_ascii_lowercase() as usize] = code as u8;
        }
        SubMatrix {
            symbols,
            index,
            scores,
        }
    }

    /// Load from name (preset) or file.
    pub fn from_name(name: &str) -> anyhow::Result<Self> {
        match name.to_lowercase().as_str() {
            "blosum62" => Ok(Self::blosum62()),
            _ => {
                let reader = crate::reader(name)?;
                Ok(Self::from_reader(reader)?)
            }
        }
    }

    /// Parses a matrix in the NCBI/BLAST text layout.
    ///
    /// Lines starting with '#' are comments. The first remaining line lists
    /// the column symbols; every following line is a row symbol and one score
    /// per column. The matrix must be square and symmetric.
    pub fn from_reader<R: BufRead>(reader: R) -> Result<Self> {
        let mut header: Vec<u8> = vec![];
        let mut rows: Vec<(u8, Vec<i32>)> = vec![];

        for line in reader.lines() {
            let line = line?;
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }

            let parts: Vec<&str> = line.split_whitespace().collect();
            if header.is_empty() {
                for part in &parts {
                    if part.len() != 1 || !part.is_ascii() {
                        return Err(SwalnError::matrix(format!(
                            "header symbol '{}' is not a single character",
                            part
                        )));
                    }
                }
                header = parts.iter().map(|s| s.as_bytes()[0]).collect();
                continue;
            }

            let sym = parts[0];
            if sym.len() != 1 || !sym.is_ascii() {
                return Err(SwalnError::matrix(format!("bad row symbol '{}'", sym)));
            }
            let values = parts[1..]
                .iter()
                .map(|v| {
                    v.parse::<i32>()
                        .map_err(|_| SwalnError::matrix(format!("bad score '{}' in row {}", v, sym)))
                })
                .collect::<Result<Vec<i32>>>()?;
            if values.len() != header.len() {
                return Err(SwalnError::matrix(format!(
                    "row {} has {} scores, expected {}",
                    sym,
                    values.len(),
                    header.len()
                )));
            }
            rows.push((sym.as_bytes()[0], values));
        }

        if header.is_empty() {
            return Err(SwalnError::matrix("no header line"));
        }
        if rows.len() != header.len() {
            return Err(SwalnError::matrix(format!(
                "{} rows for {} columns",
                rows.len(),
                header.len()
            )));
        }

        // Rows may come in any order; store them in header order
        let n = header.len();
        let mut scores = vec![0; n * n];
        let mut seen = vec![false; n];
        for (sym, values) in rows {
            let r = header
                .iter()
                .position(|&h| h == sym)
                .ok_or_else(|| SwalnError::matrix(format!("row {} not in header", sym as char)))?;
            if seen[r] {
                return Err(SwalnError::matrix(format!("duplicated row {}", sym as char)));
            }
            seen[r] = true;
            scores[r * n..(r + 1) * n].copy_from_slice(&values);
        }

        for r in 0..n {
            for c in (r + 1)..n {
                if scores[r * n + c] != scores[c * n + r] {
                    return Err(SwalnError::matrix(format!(
                        "not symmetric at {}/{}",
                        header[r] as char, header[c] as char
                    )));
                }
            }
        }

        Ok(Self::from_parts(header, scores))
    }

    pub fn symbols(&self) -> &[u8] {
        &self.symbols
    }

    /// Substitution score of two residues.
    pub fn score(&self, a: char, b: char) -> Result<i32> {
        let ca = self.code_of(a).ok_or_else(|| unknown(a, 1, "lookup"))?;
        let cb = self.code_of(b).ok_or_else(|| unknown(b, 2, "lookup"))?;
        Ok(self.score_codes(ca, cb))
    }

    fn code_of(&self, c: char) -> Option<u8> {
        if !c.is_ascii() {
            return None;
        }
        match self.index[c as usize] {
            NO_CODE => None,
            code => Some(code),
        }
    }

    /// Translates a sequence into matrix codes. `name` identifies the
    /// sequence in the error raised for an unsupported residue.
    pub fn encode(&self, seq: &[u8], name: &str) -> Result<Vec<u8>> {
        seq.iter()
            .enumerate()
            .map(|(i, &b)| match self.index[b as usize] {
                NO_CODE => Err(unknown(b as char, i + 1, name)),
                code => Ok(code),
            })
            .collect()
    }

    #[inline]
    pub fn score_codes(&self, a: u8, b: u8) -> i32 {
        self.scores[a as usize * self.symbols.len() + b as usize]
    }
}

fn unknown(residue: char, position: usize, seq: &str) -> SwalnError {
    SwalnError::UnknownResidue {
        residue,
        position,
        seq: seq.to_string(),
    }
}
