//! Work units for the queue-driven pipeline.
//!
//! A job is one query gene that has to be aligned against the whole target
//! set. Jobs move `pending -> started -> finished`; the move to `started` is
//! the claim and must be exclusive across every process sharing the queue.

use crate::libs::error::{Result, SwalnError};
use crate::libs::gene::{read_genes, Gene};
use std::collections::VecDeque;
use std::fs;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobStatus {
    Pending,
    Started,
    Finished,
}

impl JobStatus {
    pub fn dir_name(&self) -> &'static str {
        match self {
            JobStatus::Pending => "pending",
            JobStatus::Started => "started",
            JobStatus::Finished => "finished",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Job {
    pub id: String,
    pub gene: Gene,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StatusCounts {
    pub pending: usize,
    pub started: usize,
    pub finished: usize,
}

impl StatusCounts {
    pub fn total(&self) -> usize {
        self.pending + self.started + self.finished
    }
}

/// A persisted queue of jobs.
///
/// `claim_next` atomically moves one pending job to started and returns it,
/// `None` once nothing is pending. `mark_finished` moves a started job to
/// finished.
pub trait JobSource: Send + Sync {
    fn claim_next(&self) -> Result<Option<Job>>;

    fn mark_finished(&self, job_id: &str) -> Result<()>;
}

//----------------------------
// In-process queue
//----------------------------
#[derive(Debug, Default)]
struct MemoryState {
    pending: VecDeque<Job>,
    started: Vec<String>,
    finished: Vec<String>,
    failing: Vec<String>,
}

/// Jobs held in memory. Backs the full cross-product topology, where every
/// gene of the first set becomes one job.
#[derive(Debug, Default)]
pub struct MemoryJobs {
    state: Mutex<MemoryState>,
}

impl MemoryJobs {
    pub fn new(genes: Vec<Gene>) -> Self {
        let pending = genes
            .into_iter()
            .enumerate()
            .map(|(i, gene)| Job {
                id: format!("{}", i + 1),
                gene,
            })
            .collect();
        Self {
            state: Mutex::new(MemoryState {
                pending,
                ..Default::default()
            }),
        }
    }

    /// Makes `mark_finished` fail for this job id.
    pub fn fail_finish_of(&self, job_id: &str) {
        self.lock().failing.push(job_id.to_string());
    }

    pub fn counts(&self) -> StatusCounts {
        let state = self.lock();
        StatusCounts {
            pending: state.pending.len(),
            started: state.started.len(),
            finished: state.finished.len(),
        }
    }

    pub fn finished(&self) -> Vec<String> {
        self.lock().finished.clone()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, MemoryState> {
        // Poisoning is ignored, the state stays consistent between calls
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl JobSource for MemoryJobs {
    fn claim_next(&self) -> Result<Option<Job>> {
        let mut state = self.lock();
        match state.pending.pop_front() {
            Some(job) => {
                state.started.push(job.id.clone());
                Ok(Some(job))
            }
            None => Ok(None),
        }
    }

    fn mark_finished(&self, job_id: &str) -> Result<()> {
        let mut state = self.lock();
        if state.failing.iter().any(|id| id == job_id) {
            return Err(SwalnError::job_source(format!("cannot finish job {}", job_id)));
        }
        match state.started.iter().position(|id| id == job_id) {
            Some(pos) => {
                let id = state.started.remove(pos);
                state.finished.push(id);
                Ok(())
            }
            None => Err(SwalnError::job_source(format!(
                "job {} is not started",
                job_id
            ))),
        }
    }
}

//----------------------------
// Directory queue
//----------------------------
/// A durable queue in a directory.
///
/// ```text
/// <root>/pending/000000001.fa
/// <root>/started/...
/// <root>/finished/...
/// ```
///
/// Each job is a one-record FASTA file. A claim is a `rename` from `pending/`
/// to `started/`, which the filesystem performs atomically: of several
/// processes racing for the same file exactly one succeeds, the others get
/// `NotFound` and move on to the next entry.
#[derive(Debug, Clone)]
pub struct DirJobs {
    root: PathBuf,
}

impl DirJobs {
    /// Opens a queue, creating the state directories when missing.
    pub fn open<P: AsRef<Path>>(root: P) -> Result<Self> {
        let root = root.as_ref().to_path_buf();
        for status in [JobStatus::Pending, JobStatus::Started, JobStatus::Finished] {
            fs::create_dir_all(root.join(status.dir_name()))?;
        }
        Ok(Self { root })
    }

    fn status_dir(&self, status: JobStatus) -> PathBuf {
        self.root.join(status.dir_name())
    }

    fn job_path(&self, status: JobStatus, job_id: &str) -> PathBuf {
        self.status_dir(status).join(format!("{}.fa", job_id))
    }

    /// Sorted job ids in one state directory.
    pub fn list(&self, status: JobStatus) -> Result<Vec<String>> {
        let mut ids = vec![];
        for entry in fs::read_dir(self.status_dir(status))? {
            let path = entry?.path();
            if path.extension().map_or(false, |e| e == "fa") {
                if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
                    ids.push(stem.to_string());
                }
            }
        }
        ids.sort();
        Ok(ids)
    }

    pub fn counts(&self) -> Result<StatusCounts> {
        Ok(StatusCounts {
            pending: self.list(JobStatus::Pending)?.len(),
            started: self.list(JobStatus::Started)?.len(),
            finished: self.list(JobStatus::Finished)?.len(),
        })
    }

    /// Adds one pending job per gene. Does nothing when the queue already
    /// holds jobs in any state, so a re-run never duplicates work.
    pub fn import(&self, genes: &[Gene]) -> Result<usize> {
        if self.counts()?.total() > 0 {
            log::info!("Job queue {} is not empty, skipping import", self.root.display());
            return Ok(0);
        }

        for (i, gene) in genes.iter().enumerate() {
            let id = format!("{:09}", i + 1);
            // Written aside, then renamed in, so a claimer never sees a partial file
            let tmp = self.root.join(format!(".{}.fa.tmp", id));
            {
                let mut file = fs::File::create(&tmp)?;
                gene.write_fasta(&mut file)?;
                file.flush()?;
                file.sync_all()?;
            }
            fs::rename(&tmp, self.job_path(JobStatus::Pending, &id))?;
        }

        Ok(genes.len())
    }

    /// Moves every started job back to pending. Only for an operator who
    /// knows no pipeline is running on this queue.
    pub fn reset_started(&self) -> Result<usize> {
        let ids = self.list(JobStatus::Started)?;
        for id in &ids {
            fs::rename(
                self.job_path(JobStatus::Started, id),
                self.job_path(JobStatus::Pending, id),
            )?;
        }
        Ok(ids.len())
    }

    fn read_job(&self, job_id: &str) -> Result<Job> {
        let path = self.job_path(JobStatus::Started, job_id);
        let content = fs::read(&path)?;
        let mut genes = read_genes(content.as_slice(), Some(1))
            .map_err(|e| SwalnError::job_source(format!("{}: {:#}", path.display(), e)))?;
        match genes.pop() {
            Some(gene) => Ok(Job {
                id: job_id.to_string(),
                gene,
            }),
            None => Err(SwalnError::job_source(format!(
                "{}: no sequence",
                path.display()
            ))),
        }
    }
}

impl JobSource for DirJobs {
    fn claim_next(&self) -> Result<Option<Job>> {
        for id in self.list(JobStatus::Pending)? {
            let from = self.job_path(JobStatus::Pending, &id);
            let to = self.job_path(JobStatus::Started, &id);
            match fs::rename(&from, &to) {
                Ok(()) => return self.read_job(&id).map(Some),
                // Taken by another pipeline since the listing
                Err(e) if e.kind() == ErrorKind::NotFound => continue,
                Err(e) => {
                    return Err(SwalnError::job_source(format!(
                        "claiming {}: {}",
                        from.display(),
                        e
                    )))
                }
            }
        }
        Ok(None)
    }

    fn mark_finished(&self, job_id: &str) -> Result<()> {
        let from = self.job_path(JobStatus::Started, job_id);
        let to = self.job_path(JobStatus::Finished, job_id);
        fs::rename(&from, &to)
            .map_err(|e| SwalnError::job_source(format!("finishing {}: {}", from.display(), e)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use tempfile::tempdir;

    fn genes(n: usize) -> Vec<Gene> {
        (0..n)
            .map(|i| Gene::new(&format!("q{}", i), b"MKVLA"))
            .collect()
    }

    #[test]
    fn test_memory_jobs_lifecycle() {
        let jobs = MemoryJobs::new(genes(2));
        let j1 = jobs.claim_next().unwrap().unwrap();
        assert_eq!(j1.gene.id, "q0");
        assert_eq!(
            jobs.counts(),
            StatusCounts {
                pending: 1,
                started: 1,
                finished: 0
            }
        );

        jobs.mark_finished(&j1.id).unwrap();
        assert!(jobs.mark_finished(&j1.id).is_err());

        let j2 = jobs.claim_next().unwrap().unwrap();
        assert_eq!(j2.gene.id, "q1");
        assert!(jobs.claim_next().unwrap().is_none());

        jobs.fail_finish_of(&j2.id);
        assert!(jobs.mark_finished(&j2.id).is_err());
        assert_eq!(jobs.counts().started, 1);
    }

    #[test]
    fn test_dir_jobs_lifecycle() {
        let dir = tempdir().unwrap();
        let jobs = DirJobs::open(dir.path().join("queue")).unwrap();

        assert_eq!(jobs.import(&genes(3)).unwrap(), 3);
        // second import is a no-op
        assert_eq!(jobs.import(&genes(5)).unwrap(), 0);
        assert_eq!(jobs.counts().unwrap().pending, 3);

        let job = jobs.claim_next().unwrap().unwrap();
        assert_eq!(job.id, "000000001");
        assert_eq!(job.gene.id, "q0");
        assert_eq!(job.gene.seq, b"MKVLA");
        assert_eq!(jobs.list(JobStatus::Started).unwrap(), vec!["000000001"]);

        jobs.mark_finished(&job.id).unwrap();
        assert!(jobs.mark_finished(&job.id).is_err());

        // reopening sees the persisted state
        let reopened = DirJobs::open(dir.path().join("queue")).unwrap();
        assert_eq!(
            reopened.counts().unwrap(),
            StatusCounts {
                pending: 2,
                started: 0,
                finished: 1
            }
        );

        let _ = reopened.claim_next().unwrap().unwrap();
        assert_eq!(reopened.reset_started().unwrap(), 1);
        assert_eq!(reopened.counts().unwrap().pending, 2);
    }

    #[test]
    fn test_dir_jobs_concurrent_claims_are_exclusive() {
        let dir = tempdir().unwrap();
        let jobs = Arc::new(DirJobs::open(dir.path()).unwrap());
        jobs.import(&genes(40)).unwrap();

        let claimed: Vec<String> = crossbeam::scope(|s| {
            let handles: Vec<_> = (0..4)
                .map(|_| {
                    let jobs = Arc::clone(&jobs);
                    s.spawn(move |_| {
                        let mut mine = vec![];
                        while let Some(job) = jobs.claim_next().unwrap() {
                            mine.push(job.id);
                        }
                        mine
                    })
                })
                .collect();
            handles
                .into_iter()
                .flat_map(|h| h.join().unwrap())
                .collect()
        })
        .unwrap();

        let mut sorted = claimed.clone();
        sorted.sort();
        sorted.dedup();
        assert_eq!(claimed.len(), 40);
        assert_eq!(sorted.len(), 40);
    }
}
