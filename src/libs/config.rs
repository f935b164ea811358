use crate::libs::error::{Result, SwalnError};
use crate::libs::matrix::GapPenalties;
use crate::libs::pipeline::{PipelineConfig, DEFAULT_BATCH_SIZE};

/// Worker count for a fraction (or multiple) of the machine's parallelism:
/// `ceil(available_parallelism * load)`, at least 1.
pub fn workers_for_load(load: f64) -> Result<usize> {
    if !load.is_finite() || load <= 0.0 {
        return Err(SwalnError::config(format!(
            "load factor must be a positive number, got {}",
            load
        )));
    }
    let cpus = std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1);
    Ok(((cpus as f64 * load).ceil() as usize).max(1))
}

/// Run parameters, validated once at startup and passed down explicitly.
#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    pub gaps: GapPenalties,
    pub workers: usize,
    pub batch_size: usize,
}

impl Config {
    /// `workers` wins over `load` when both are given.
    pub fn new(
        gap_open: i32,
        gap_extend: i32,
        workers: Option<usize>,
        load: f64,
        batch_size: Option<usize>,
    ) -> Result<Self> {
        let gaps = GapPenalties::new(gap_open, gap_extend);
        gaps.validate()?;

        let workers = match workers {
            Some(0) => return Err(SwalnError::config("worker count must be at least 1")),
            Some(n) => n,
            None => workers_for_load(load)?,
        };

        let batch_size = match batch_size {
            Some(0) => return Err(SwalnError::config("batch size must be at least 1")),
            Some(n) => n,
            None => DEFAULT_BATCH_SIZE,
        };

        Ok(Self {
            gaps,
            workers,
            batch_size,
        })
    }

    pub fn pipeline(&self) -> PipelineConfig {
        PipelineConfig::new(self.workers).with_batch_size(self.batch_size)
    }
}
