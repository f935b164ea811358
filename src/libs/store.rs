//! Durable sinks for alignment summaries.

use crate::libs::align::AlignmentResult;
use crate::libs::error::{Result, SwalnError};
use std::fs::{self, File, OpenOptions};
use std::io::{ErrorKind, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

pub const COLUMNS: [&str; 7] = [
    "gene_id",
    "match_gene_id",
    "score",
    "identical_num",
    "similar_num",
    "ident_percent",
    "sim_percent",
];

/// One stored alignment summary, keyed by the gene pair.
#[derive(Debug, Clone, PartialEq)]
pub struct ResultRow {
    pub gene_a: String,
    pub gene_b: String,
    pub score: i32,
    pub identical: usize,
    pub similar: usize,
    pub identity: f64,
    pub similarity: f64,
}

impl From<&AlignmentResult> for ResultRow {
    fn from(res: &AlignmentResult) -> Self {
        let (identity, similarity) = res.identity_similarity();
        Self {
            gene_a: res.name_a.clone(),
            gene_b: res.name_b.clone(),
            score: res.score,
            identical: res.identical,
            similar: res.similar,
            identity,
            similarity,
        }
    }
}

impl std::fmt::Display for ResultRow {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}\t{}\t{}\t{}\t{}\t{:.2}\t{:.2}",
            self.gene_a,
            self.gene_b,
            self.score,
            self.identical,
            self.similar,
            self.identity,
            self.similarity
        )
    }
}

/// A sink written in all-or-nothing batches.
pub trait ResultStore: Send {
    fn begin_batch(&mut self) -> Result<()>;

    fn append_row(&mut self, row: &ResultRow) -> Result<()>;

    /// Makes every row appended since `begin_batch` durable, or none of them.
    fn commit_batch(&mut self) -> Result<()>;
}

/// Appends rows to a tab-separated file.
///
/// A batch is buffered in memory and first saved to `<path>.journal`: the
/// length of the file before the batch on one line, then the batch itself.
/// The journal is written aside and renamed in, so it is either complete or
/// missing. The batch is then appended with a single `write_all` followed by
/// `sync_data`, and the journal removed.
///
/// If the process dies mid-append, [`TsvStore::open`] finds the journal,
/// truncates the file to the recorded length and appends the batch again. A
/// trailing partial line left by any other writer is cut off, so rows are
/// never glued together.
#[derive(Debug)]
pub struct TsvStore {
    file: File,
    journal: PathBuf,
    buffer: Vec<u8>,
    committed_len: u64,
}

impl TsvStore {
    /// Opens `path` for appending; a header line is written into a new or
    /// empty file.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let mut file = OpenOptions::new()
            .read(true)
            .create(true)
            .append(true)
            .open(path)?;
        let journal = journal_path(path);

        // Never renamed in, the file was not touched
        let staged = staging_path(&journal);
        if staged.exists() {
            fs::remove_file(&staged)?;
        }
        if journal.exists() {
            replay_journal(&mut file, &journal)?;
            log::warn!("{}: replayed an interrupted batch", path.display());
        }

        let len = file.metadata()?.len();
        let mut committed_len = complete_len(&mut file, len)?;
        if committed_len < len {
            log::warn!(
                "{}: dropping {} bytes of a partial line",
                path.display(),
                len - committed_len
            );
            file.set_len(committed_len)?;
            file.sync_data()?;
        }

        if committed_len == 0 {
            let header = format!("{}\n", COLUMNS.join("\t"));
            file.write_all(header.as_bytes())?;
            file.sync_data()?;
            committed_len = header.len() as u64;
        }
        Ok(Self {
            file,
            journal,
            buffer: vec![],
            committed_len,
        })
    }

    fn write_journal(&self) -> std::io::Result<()> {
        let staged = staging_path(&self.journal);
        {
            let mut file = File::create(&staged)?;
            writeln!(file, "{}", self.committed_len)?;
            file.write_all(&self.buffer)?;
            file.sync_all()?;
        }
        fs::rename(&staged, &self.journal)
    }

    fn write_buffer(&mut self) -> std::io::Result<()> {
        self.file.write_all(&self.buffer)?;
        self.file.sync_data()
    }
}

fn journal_path(path: &Path) -> PathBuf {
    let mut name = path.as_os_str().to_owned();
    name.push(".journal");
    PathBuf::from(name)
}

fn staging_path(journal: &Path) -> PathBuf {
    let mut name = journal.as_os_str().to_owned();
    name.push(".tmp");
    PathBuf::from(name)
}

/// Redoes the batch recorded in `journal`, then removes it.
fn replay_journal(file: &mut File, journal: &Path) -> Result<()> {
    let content = fs::read(journal)?;
    let invalid = || {
        SwalnError::Io(std::io::Error::new(
            ErrorKind::InvalidData,
            format!("{}: malformed journal", journal.display()),
        ))
    };

    let newline = content
        .iter()
        .position(|&b| b == b'\n')
        .ok_or_else(invalid)?;
    let committed_len: u64 = std::str::from_utf8(&content[..newline])
        .ok()
        .and_then(|s| s.parse().ok())
        .ok_or_else(invalid)?;

    file.set_len(committed_len)?;
    file.write_all(&content[newline + 1..])?;
    file.sync_data()?;
    fs::remove_file(journal)?;
    Ok(())
}

/// Length of `file` up to and including its last newline.
fn complete_len(file: &mut File, len: u64) -> std::io::Result<u64> {
    let mut chunk = vec![0u8; 8192];
    let mut end = len;
    while end > 0 {
        let start = end.saturating_sub(chunk.len() as u64);
        let buf = &mut chunk[..(end - start) as usize];
        file.seek(SeekFrom::Start(start))?;
        file.read_exact(buf)?;
        if let Some(pos) = buf.iter().rposition(|&b| b == b'\n') {
            return Ok(start + pos as u64 + 1);
        }
        end = start;
    }
    Ok(0)
}

impl ResultStore for TsvStore {
    fn begin_batch(&mut self) -> Result<()> {
        self.buffer.clear();
        Ok(())
    }

    fn append_row(&mut self, row: &ResultRow) -> Result<()> {
        writeln!(self.buffer, "{}", row)?;
        Ok(())
    }

    fn commit_batch(&mut self) -> Result<()> {
        if self.buffer.is_empty() {
            return Ok(());
        }

        self.write_journal()?;
        if let Err(e) = self.write_buffer() {
            self.file.set_len(self.committed_len)?;
            fs::remove_file(&self.journal)?;
            return Err(e.into());
        }
        fs::remove_file(&self.journal)?;

        self.committed_len += self.buffer.len() as u64;
        self.buffer.clear();
        Ok(())
    }
}

/// Keeps committed batches in memory.
#[derive(Debug, Default)]
pub struct MemoryStore {
    batches: Vec<Vec<ResultRow>>,
    current: Vec<ResultRow>,
    fail_at: Option<usize>,
    attempts: usize,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes the `n`-th commit (1-based) fail.
    pub fn failing_at(n: usize) -> Self {
        Self {
            fail_at: Some(n),
            ..Default::default()
        }
    }

    pub fn batches(&self) -> &[Vec<ResultRow>] {
        &self.batches
    }

    pub fn rows(&self) -> impl Iterator<Item = &ResultRow> {
        self.batches.iter().flatten()
    }
}

impl ResultStore for MemoryStore {
    fn begin_batch(&mut self) -> Result<()> {
        self.current.clear();
        Ok(())
    }

    fn append_row(&mut self, row: &ResultRow) -> Result<()> {
        self.current.push(row.clone());
        Ok(())
    }

    fn commit_batch(&mut self) -> Result<()> {
        self.attempts += 1;
        if self.fail_at == Some(self.attempts) {
            self.current.clear();
            return Err(SwalnError::Io(std::io::Error::new(
                std::io::ErrorKind::Other,
                "injected commit failure",
            )));
        }
        self.batches.push(std::mem::take(&mut self.current));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn row(a: &str, b: &str) -> ResultRow {
        ResultRow {
            gene_a: a.to_string(),
            gene_b: b.to_string(),
            score: 168,
            identical: 29,
            similar: 2,
            identity: 87.878787,
            similarity: 93.939393,
        }
    }

    #[test]
    fn test_row_display() {
        assert_eq!(row("g1", "g2").to_string(), "g1\tg2\t168\t29\t2\t87.88\t93.94");
    }

    #[test]
    fn test_tsv_store_appends_batches() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("res.tsv");

        let mut store = TsvStore::open(&path).unwrap();
        store.begin_batch().unwrap();
        store.append_row(&row("a", "b")).unwrap();
        store.append_row(&row("a", "c")).unwrap();
        store.commit_batch().unwrap();

        // rows of an uncommitted batch never reach the file
        store.begin_batch().unwrap();
        store.append_row(&row("x", "y")).unwrap();
        drop(store);

        let mut store = TsvStore::open(&path).unwrap();
        store.begin_batch().unwrap();
        store.append_row(&row("b", "c")).unwrap();
        store.commit_batch().unwrap();

        let content = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = content.lines().collect();
        assert_eq!(lines.len(), 4);
        assert!(lines[0].starts_with("gene_id\tmatch_gene_id"));
        assert!(lines[1].starts_with("a\tb\t"));
        assert!(lines[3].starts_with("b\tc\t"));
    }

    fn header() -> String {
        format!("{}\n", COLUMNS.join("\t"))
    }

    fn commit_one(path: &Path, r: &ResultRow) {
        let mut store = TsvStore::open(path).unwrap();
        store.begin_batch().unwrap();
        store.append_row(r).unwrap();
        store.commit_batch().unwrap();
    }

    #[test]
    fn test_tsv_store_cuts_partial_line() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("res.tsv");

        // killed in the middle of a row
        std::fs::write(&path, format!("{}q0\tt0\t168\t2", header())).unwrap();
        commit_one(&path, &row("q1", "t1"));

        let content = std::fs::read_to_string(&path).unwrap();
        assert_eq!(content, format!("{}{}\n", header(), row("q1", "t1")));
        assert!(!journal_path(&path).exists());
    }

    #[test]
    fn test_tsv_store_cuts_partial_header() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("res.tsv");

        std::fs::write(&path, "gene_id\tmatch_ge").unwrap();
        commit_one(&path, &row("a", "b"));

        let content = std::fs::read_to_string(&path).unwrap();
        assert_eq!(content, format!("{}{}\n", header(), row("a", "b")));
    }

    #[test]
    fn test_tsv_store_replays_interrupted_batch() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("res.tsv");

        let committed = format!("{}{}\n", header(), row("a", "b"));
        let batch = format!("{}\n{}\n", row("c", "d"), row("e", "f"));

        // the journal made it to disk, the append stopped after one full row
        std::fs::write(&path, format!("{}{}\n", committed, row("c", "d"))).unwrap();
        std::fs::write(
            journal_path(&path),
            format!("{}\n{}", committed.len(), batch),
        )
        .unwrap();

        let store = TsvStore::open(&path).unwrap();
        drop(store);

        let content = std::fs::read_to_string(&path).unwrap();
        assert_eq!(content, format!("{}{}", committed, batch));
        assert!(!journal_path(&path).exists());
    }

    #[test]
    fn test_tsv_store_drops_staged_journal() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("res.tsv");

        let committed = format!("{}{}\n", header(), row("a", "b"));
        std::fs::write(&path, &committed).unwrap();
        let staged = staging_path(&journal_path(&path));
        std::fs::write(&staged, "12\nhalf a bat").unwrap();

        let store = TsvStore::open(&path).unwrap();
        drop(store);

        assert_eq!(std::fs::read_to_string(&path).unwrap(), committed);
        assert!(!staged.exists());
    }

    #[test]
    fn test_tsv_store_malformed_journal() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("res.tsv");
        std::fs::write(journal_path(&path), "not a length\n").unwrap();

        assert!(matches!(TsvStore::open(&path), Err(SwalnError::Io(_))));
    }

    #[test]
    fn test_memory_store_failure() {
        let mut store = MemoryStore::failing_at(2);
        for i in 0..3 {
            store.begin_batch().unwrap();
            store.append_row(&row("a", &i.to_string())).unwrap();
            let res = store.commit_batch();
            assert_eq!(res.is_err(), i == 1);
        }
        assert_eq!(store.batches().len(), 2);
        assert_eq!(store.rows().count(), 2);
    }
}
