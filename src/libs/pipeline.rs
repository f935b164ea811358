//! Drives the aligner over many sequence pairs.
//!
//! ```text
//! dispatcher --(work, bounded)--> N workers --(results, bounded)--> collector --> store
//!     ^                                                                 |
//!     +-- claim_next                                  mark_finished ----+
//! ```
//!
//! The dispatcher claims one job at a time and queues one task per target.
//! Each worker owns an [`Aligner`] and its scratch matrix. The collector
//! commits results in batches and marks a job finished once every one of its
//! rows is committed. Any alignment or commit error stops the run; batches
//! committed before it stay in the store.

use crate::libs::align::{Aligner, AlignmentResult};
use crate::libs::error::{Result, SwalnError};
use crate::libs::gene::Gene;
use crate::libs::jobs::{JobSource, MemoryJobs};
use crate::libs::matrix::{GapPenalties, SubMatrix};
use crate::libs::render::render;
use crate::libs::store::{ResultRow, ResultStore};
use crossbeam::channel::{Receiver, Sender};
use std::collections::HashMap;
use std::sync::Arc;

pub const DEFAULT_BATCH_SIZE: usize = 1000;

/// Columns of the sample alignment logged with each batch.
const SAMPLE_WIDTH: usize = 80;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PipelineConfig {
    pub workers: usize,
    pub batch_size: usize,
    /// Capacity of both the work and the result queue.
    pub queue_size: usize,
}

impl PipelineConfig {
    pub fn new(workers: usize) -> Self {
        let workers = workers.max(1);
        Self {
            workers,
            batch_size: DEFAULT_BATCH_SIZE,
            queue_size: workers * 4,
        }
    }

    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size.max(1);
        self
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PipelineSummary {
    pub jobs_claimed: usize,
    pub jobs_finished: usize,
    pub rows: usize,
    pub batches: usize,
    /// Jobs whose finish update failed; they stay `started`.
    pub unfinished: Vec<String>,
}

struct Task {
    job: Arc<str>,
    query: Arc<Gene>,
    target: usize,
}

type Computed = Result<(Arc<str>, AlignmentResult)>;

/// Aligns every job of `jobs` against every gene of `targets`, writing one
/// row per pair into `store`.
pub fn run_pipeline<J, S>(
    jobs: &J,
    targets: &[Gene],
    sub_matrix: &SubMatrix,
    gaps: &GapPenalties,
    config: &PipelineConfig,
    store: &mut S,
) -> Result<PipelineSummary>
where
    J: JobSource + ?Sized,
    S: ResultStore + ?Sized,
{
    if targets.is_empty() {
        return Err(SwalnError::config("the target set is empty"));
    }
    gaps.validate()?;

    log::info!(
        "Aligning against {} targets with {} workers, {} rows per batch",
        targets.len(),
        config.workers,
        config.batch_size
    );

    // Channel 1 - Tasks
    let (snd1, rcv1) = crossbeam::channel::bounded::<Task>(config.queue_size);
    // Channel 2 - Results
    let (snd2, rcv2) = crossbeam::channel::bounded::<Computed>(config.queue_size);

    let scoped = crossbeam::scope(|s| {
        //----------------------------
        // Dispatcher thread
        //----------------------------
        let dispatcher = s.spawn(move |_| dispatch(jobs, targets.len(), snd1));

        //----------------------------
        // Worker threads
        //----------------------------
        for _ in 0..config.workers {
            let (sendr, recvr) = (snd2.clone(), rcv1.clone());
            s.spawn(move |_| work(recvr, sendr, targets, sub_matrix, gaps));
        }
        // Only the workers hold these now: the result queue closes when the
        // last worker exits, the dispatcher sees a closed work queue when all
        // workers are gone
        drop(snd2);
        drop(rcv1);

        //----------------------------
        // Collector
        //----------------------------
        let collected = collect_results(rcv2, jobs, targets.len(), config.batch_size, store);
        let dispatched = dispatcher.join();
        (collected, dispatched)
    });

    let (collected, dispatched) =
        scoped.map_err(|_| SwalnError::Pipeline {
            message: "a worker thread panicked".to_string(),
        })?;
    let jobs_claimed = dispatched.map_err(|_| SwalnError::Pipeline {
        message: "the dispatcher thread panicked".to_string(),
    })?;

    // A failed commit or alignment outranks a claim error
    let mut summary = collected?;
    summary.jobs_claimed = jobs_claimed?;

    log::info!(
        "Done: {} jobs claimed, {} finished, {} rows in {} batches",
        summary.jobs_claimed,
        summary.jobs_finished,
        summary.rows,
        summary.batches
    );
    if !summary.unfinished.is_empty() {
        log::warn!(
            "{} jobs remain started: {}",
            summary.unfinished.len(),
            summary.unfinished.join(", ")
        );
    }

    Ok(summary)
}

/// Full cross-product: every gene of `set_a` against every gene of `set_b`.
pub fn run_cross<S>(
    set_a: Vec<Gene>,
    set_b: &[Gene],
    sub_matrix: &SubMatrix,
    gaps: &GapPenalties,
    config: &PipelineConfig,
    store: &mut S,
) -> Result<PipelineSummary>
where
    S: ResultStore + ?Sized,
{
    let jobs = MemoryJobs::new(set_a);
    run_pipeline(&jobs, set_b, sub_matrix, gaps, config, store)
}

fn dispatch<J: JobSource + ?Sized>(jobs: &J, n_targets: usize, snd: Sender<Task>) -> Result<usize> {
    let mut claimed = 0;
    while let Some(job) = jobs.claim_next()? {
        claimed += 1;
        log::debug!("Claimed job {} ({})", job.id, job.gene.id);

        let id: Arc<str> = Arc::from(job.id.as_str());
        let query = Arc::new(job.gene);
        for target in 0..n_targets {
            let task = Task {
                job: Arc::clone(&id),
                query: Arc::clone(&query),
                target,
            };
            // Every worker has exited, the run is being aborted
            if snd.send(task).is_err() {
                return Ok(claimed);
            }
        }
    }
    // Returning drops `snd`, which closes the work queue
    Ok(claimed)
}

fn work(
    rcv: Receiver<Task>,
    snd: Sender<Computed>,
    targets: &[Gene],
    sub_matrix: &SubMatrix,
    gaps: &GapPenalties,
) {
    let mut aligner = Aligner::new();
    for task in rcv.iter() {
        let target = &targets[task.target];
        let computed = aligner
            .align(
                &task.query.id,
                &task.query.seq,
                &target.id,
                &target.seq,
                sub_matrix,
                gaps,
            )
            .map(|res| (task.job, res));

        let failed = computed.is_err();
        if snd.send(computed).is_err() || failed {
            return;
        }
    }
}

/// Batches results and tracks per-job completion.
struct Collector<'a, J: ?Sized, S: ?Sized> {
    jobs: &'a J,
    store: &'a mut S,
    n_targets: usize,
    batch_size: usize,
    batch: Vec<(Arc<str>, ResultRow)>,
    committed: HashMap<Arc<str>, usize>,
    summary: PipelineSummary,
    /// Most recent alignment, shown with each batch at debug level.
    last: Option<AlignmentResult>,
}

impl<'a, J, S> Collector<'a, J, S>
where
    J: JobSource + ?Sized,
    S: ResultStore + ?Sized,
{
    fn new(jobs: &'a J, store: &'a mut S, n_targets: usize, batch_size: usize) -> Self {
        Self {
            jobs,
            store,
            n_targets,
            batch_size,
            batch: Vec::with_capacity(batch_size),
            committed: HashMap::new(),
            summary: PipelineSummary::default(),
            last: None,
        }
    }

    fn push(&mut self, job: Arc<str>, res: AlignmentResult) -> Result<()> {
        self.batch.push((job, ResultRow::from(&res)));
        self.last = Some(res);
        if self.batch.len() == self.batch_size {
            self.commit()?;
        }
        Ok(())
    }

    fn sample(&self) -> Option<String> {
        self.last.as_ref().map(|res| render(res, SAMPLE_WIDTH))
    }

    fn commit(&mut self) -> Result<()> {
        let rows = self.batch.len();
        let batch_no = self.summary.batches + 1;
        let to_commit_err = |e: SwalnError| SwalnError::Commit {
            batch: batch_no,
            rows,
            message: e.to_string(),
        };

        self.store.begin_batch().map_err(to_commit_err)?;
        for (_, row) in &self.batch {
            self.store.append_row(row).map_err(to_commit_err)?;
        }
        self.store.commit_batch().map_err(to_commit_err)?;

        self.summary.batches += 1;
        self.summary.rows += rows;
        log::info!("Batch {}: {} rows saved, {} in total", batch_no, rows, self.summary.rows);
        if log::log_enabled!(log::Level::Debug) {
            if let Some(sample) = self.sample() {
                log::debug!("Last alignment of batch {}:\n{}", batch_no, sample);
            }
        }

        let mut done = vec![];
        for (job, _) in std::mem::take(&mut self.batch) {
            let count = self.committed.entry(Arc::clone(&job)).or_insert(0);
            *count += 1;
            if *count == self.n_targets {
                done.push(job);
            }
        }
        for job in done {
            self.committed.remove(&job);
            self.finish_job(&job);
        }

        Ok(())
    }

    fn finish_job(&mut self, job: &str) {
        match self.jobs.mark_finished(job) {
            Ok(()) => self.summary.jobs_finished += 1,
            Err(e) => {
                log::warn!("Job {} stays started: {}", job, e);
                self.summary.unfinished.push(job.to_string());
            }
        }
    }
}

fn collect_results<J, S>(
    rcv: Receiver<Computed>,
    jobs: &J,
    n_targets: usize,
    batch_size: usize,
    store: &mut S,
) -> Result<PipelineSummary>
where
    J: JobSource + ?Sized,
    S: ResultStore + ?Sized,
{
    let mut collector = Collector::new(jobs, store, n_targets, batch_size);

    // Returning early drops `rcv`, so blocked workers fail their send and exit
    for computed in rcv.iter() {
        let (job, res) = computed?;
        collector.push(job, res)?;
    }

    // Residual partial batch
    if !collector.batch.is_empty() {
        collector.commit()?;
    }

    Ok(collector.summary)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::libs::store::MemoryStore;
    use std::collections::HashSet;

    fn genes(prefix: &str, seqs: &[&str]) -> Vec<Gene> {
        seqs.iter()
            .enumerate()
            .map(|(i, s)| Gene::new(&format!("{}{}", prefix, i), s.as_bytes()))
            .collect()
    }

    fn queries() -> Vec<Gene> {
        genes(
            "q",
            &[
                "MADRGFCSADGSDPLWDWNVTWNTSNPDFTKCF",
                "HEAGAWGHEE",
                "ACDEFGHIKL",
                "MKVLAAGIVGLLLA",
                "WWWW",
            ],
        )
    }

    fn targets() -> Vec<Gene> {
        genes(
            "t",
            &[
                "MANRGFCSADGWPLWDWDVTWNTSNPDFTKCF",
                "PAWHEAE",
                "ACDEFWWWWGHIKL",
            ],
        )
    }

    fn gaps() -> GapPenalties {
        GapPenalties::new(10, 1)
    }

    #[test]
    fn test_pipeline_every_pair_once() {
        let jobs = MemoryJobs::new(queries());
        let targets = targets();
        let mut store = MemoryStore::new();
        let config = PipelineConfig::new(3).with_batch_size(4);

        let summary =
            run_pipeline(&jobs, &targets, &SubMatrix::blosum62(), &gaps(), &config, &mut store)
                .unwrap();

        assert_eq!(summary.jobs_claimed, 5);
        assert_eq!(summary.jobs_finished, 5);
        assert_eq!(summary.rows, 15);
        assert!(summary.unfinished.is_empty());

        let counts = jobs.counts();
        assert_eq!((counts.pending, counts.started, counts.finished), (0, 0, 5));

        let pairs: HashSet<(String, String)> = store
            .rows()
            .map(|r| (r.gene_a.clone(), r.gene_b.clone()))
            .collect();
        assert_eq!(pairs.len(), 15);

        let row = store
            .rows()
            .find(|r| r.gene_a == "q0" && r.gene_b == "t0")
            .unwrap();
        assert_eq!(row.score, 168);
        assert_eq!((row.identical, row.similar), (29, 2));
    }

    #[test]
    fn test_pipeline_batching() {
        // 5 x 3 = 15 rows
        for (batch_size, commits, last) in [(4, 4, 3), (5, 3, 5), (1000, 1, 15), (15, 1, 15)] {
            let jobs = MemoryJobs::new(queries());
            let mut store = MemoryStore::new();
            let config = PipelineConfig::new(2).with_batch_size(batch_size);

            let summary = run_pipeline(
                &jobs,
                &targets(),
                &SubMatrix::blosum62(),
                &gaps(),
                &config,
                &mut store,
            )
            .unwrap();

            assert_eq!(summary.batches, commits);
            assert_eq!(store.batches().len(), commits);
            assert_eq!(store.batches().last().unwrap().len(), last);
            assert!(store.batches()[..commits - 1]
                .iter()
                .all(|b| b.len() == batch_size));
        }
    }

    #[test]
    fn test_cross_matches_direct_alignment() {
        let set_a = queries();
        let set_b = targets();
        let m = SubMatrix::blosum62();
        let mut store = MemoryStore::new();

        run_cross(set_a.clone(), &set_b, &m, &gaps(), &PipelineConfig::new(4), &mut store).unwrap();

        for a in &set_a {
            for b in &set_b {
                let direct = crate::libs::align::align(&a.id, &a.seq, &b.id, &b.seq, &m, &gaps())
                    .unwrap();
                let row = store
                    .rows()
                    .find(|r| r.gene_a == a.id && r.gene_b == b.id)
                    .unwrap();
                assert_eq!(*row, ResultRow::from(&direct));
            }
        }
    }

    #[test]
    fn test_pipeline_commit_failure_is_fatal() {
        let jobs = MemoryJobs::new(queries());
        let mut store = MemoryStore::failing_at(2);
        let config = PipelineConfig::new(2).with_batch_size(3);

        let err = run_pipeline(
            &jobs,
            &targets(),
            &SubMatrix::blosum62(),
            &gaps(),
            &config,
            &mut store,
        )
        .unwrap_err();

        assert!(matches!(err, SwalnError::Commit { batch: 2, rows: 3, .. }));
        // the first batch stays, nothing after the failing one
        assert_eq!(store.batches().len(), 1);
        assert_eq!(store.batches()[0].len(), 3);
        // only a job whose 3 rows all landed in batch 1 can be finished
        assert!(jobs.counts().finished <= 1);
        assert_eq!(jobs.counts().finished + jobs.counts().started + jobs.counts().pending, 5);
    }

    #[test]
    fn test_pipeline_unknown_residue_is_fatal() {
        let jobs = MemoryJobs::new(genes("q", &["MKV", "MKV"]));
        let targets = genes("t", &["MKV", "MKJV"]);
        let mut store = MemoryStore::new();

        let err = run_pipeline(
            &jobs,
            &targets,
            &SubMatrix::blosum62(),
            &gaps(),
            &PipelineConfig::new(2),
            &mut store,
        )
        .unwrap_err();

        assert!(matches!(err, SwalnError::UnknownResidue { residue: 'J', .. }));
        assert_eq!(store.batches().len(), 0);
        assert_eq!(jobs.counts().finished, 0);
    }

    #[test]
    fn test_pipeline_finish_failure_leaves_job_started() {
        let jobs = MemoryJobs::new(queries());
        jobs.fail_finish_of("2");
        let mut store = MemoryStore::new();

        let summary = run_pipeline(
            &jobs,
            &targets(),
            &SubMatrix::blosum62(),
            &gaps(),
            &PipelineConfig::new(2),
            &mut store,
        )
        .unwrap();

        assert_eq!(summary.rows, 15);
        assert_eq!(summary.jobs_finished, 4);
        assert_eq!(summary.unfinished, vec!["2".to_string()]);
        assert_eq!(jobs.counts().started, 1);
    }

    #[test]
    fn test_collector_keeps_sample_alignment() {
        let jobs = MemoryJobs::new(genes("q", &["HEAGAWGHEE"]));
        let job = jobs.claim_next().unwrap().unwrap();
        let mut store = MemoryStore::new();
        let mut collector = Collector::new(&jobs, &mut store, 1, 10);
        assert!(collector.sample().is_none());

        let res = crate::libs::align::align(
            "q0",
            b"HEAGAWGHEE",
            "t1",
            b"PAWHEAE",
            &SubMatrix::blosum62(),
            &gaps(),
        )
        .unwrap();
        collector.push(Arc::from(job.id.as_str()), res).unwrap();
        collector.commit().unwrap();

        let sample = collector.sample().unwrap();
        assert!(sample.contains("AWGHE 9"));
        assert!(sample.contains("AW-HE 5"));
        assert_eq!(collector.summary.jobs_finished, 1);
    }

    #[test]
    fn test_pipeline_empty_targets() {
        let jobs = MemoryJobs::new(queries());
        let mut store = MemoryStore::new();
        let res = run_pipeline(
            &jobs,
            &[],
            &SubMatrix::blosum62(),
            &gaps(),
            &PipelineConfig::new(1),
            &mut store,
        );
        assert!(matches!(res, Err(SwalnError::Config { .. })));
        assert_eq!(jobs.counts().pending, 5);
    }

    #[test]
    fn test_pipeline_no_jobs() {
        let jobs = MemoryJobs::new(vec![]);
        let mut store = MemoryStore::new();
        let summary = run_pipeline(
            &jobs,
            &targets(),
            &SubMatrix::blosum62(),
            &gaps(),
            &PipelineConfig::new(4),
            &mut store,
        )
        .unwrap();
        assert_eq!(summary, PipelineSummary::default());
        assert!(store.batches().is_empty());
    }
}
