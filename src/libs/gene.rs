use anyhow::Context;
use std::io::{BufRead, Write};

/// A protein record: identifier, free-text description and residues.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Gene {
    pub id: String,
    pub description: String,
    pub seq: Vec<u8>,
}

impl Gene {
    pub fn new(id: &str, seq: &[u8]) -> Self {
        Self {
            id: id.to_string(),
            description: String::new(),
            seq: seq.to_vec(),
        }
    }

    pub fn len(&self) -> usize {
        self.seq.len()
    }

    pub fn is_empty(&self) -> bool {
        self.seq.is_empty()
    }

    /// Writes the record as FASTA, sequence on a single line.
    pub fn write_fasta<W: Write>(&self, writer: &mut W) -> std::io::Result<()> {
        if self.description.is_empty() {
            writeln!(writer, ">{}", self.id)?;
        } else {
            writeln!(writer, ">{} {}", self.id, self.description)?;
        }
        writer.write_all(&self.seq)?;
        writer.write_all(b"\n")
    }
}

/// Reads FASTA records, keeping at most `limit` of them when given.
///
/// Records with an empty sequence are skipped, they can never align.
pub fn read_genes<R: BufRead>(reader: R, limit: Option<usize>) -> anyhow::Result<Vec<Gene>> {
    let mut fa_in = noodles_fasta::io::Reader::new(reader);
    let mut genes = vec![];

    for result in fa_in.records() {
        if limit.map_or(false, |n| genes.len() >= n) {
            break;
        }

        let record = result?;
        let id = String::from_utf8(record.name().into())?;
        let description = match record.description() {
            Some(d) => String::from_utf8(d.to_vec())?,
            None => String::new(),
        };
        let seq: Vec<u8> = record.sequence().as_ref().to_vec();
        if seq.is_empty() {
            log::warn!("Skipping {}: empty sequence", id);
            continue;
        }

        genes.push(Gene {
            id,
            description,
            seq,
        });
    }

    Ok(genes)
}

/// Loads genes from a plain or gzipped FASTA file.
pub fn load_genes(infile: &str, limit: Option<usize>) -> anyhow::Result<Vec<Gene>> {
    let reader = crate::reader(infile)?;
    let genes = read_genes(reader, limit).with_context(|| format!("reading {}", infile))?;
    log::info!("Loaded {} genes from {}", genes.len(), infile);
    Ok(genes)
}
