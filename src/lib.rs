//! Smith-Waterman local alignment of protein sequences, driven at scale by a
//! bounded worker pool with a durable job queue and batched result commits.
//!
//! ```
//! use swaln::libs::align::align;
//! use swaln::libs::matrix::{GapPenalties, SubMatrix};
//!
//! let m = SubMatrix::blosum62();
//! let gaps = GapPenalties::new(10, 1);
//! let aln = align("a", b"AA", "b", b"AA", &m, &gaps).unwrap();
//! assert_eq!(aln.score, 8);
//! assert_eq!(aln.identity_similarity(), (100.0, 100.0));
//! ```

pub mod libs;

pub use libs::io::{reader, writer};
