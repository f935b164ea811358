use clap::*;
use swaln::libs::gene::load_genes;
use swaln::libs::jobs::DirJobs;
use swaln::libs::pipeline::run_pipeline;
use swaln::libs::store::TsvStore;

use super::args;

// Create clap subcommand arguments
pub fn make_subcommand() -> Command {
    let cmd = Command::new("run")
        .about("Drains a job queue against a target set")
        .after_help(
            r###"
Claims pending jobs one at a time, aligns each against every target gene and
appends the rows to a tab-separated file. A job is marked finished once all of
its rows are committed.

Notes:
* Several `swaln run` processes may share one queue; each job is claimed once
* A crashed run leaves its jobs in `started`, see `swaln jobs reset`
* Any alignment or commit error aborts the run

Examples:
1. Build a queue, then drain it:
   swaln jobs import tests/fasta/queries.fa queue
   swaln run queue tests/fasta/targets.fa --gap-open 10 --gap-extend 1 -o res.tsv

2. With 8 workers and smaller batches:
   swaln run queue targets.fa --gap-open 10 --gap-extend 1 -p 8 --batch 100 -o res.tsv

"###,
        )
        .arg(
            Arg::new("queue")
                .required(true)
                .index(1)
                .help("Job queue directory"),
        )
        .arg(
            Arg::new("targets")
                .required(true)
                .index(2)
                .help("Target genes, a FASTA file"),
        )
        .arg(
            Arg::new("outfile")
                .long("outfile")
                .short('o')
                .required(true)
                .num_args(1)
                .help("Result file; rows are appended"),
        );
    args::pipeline_args(args::scoring_args(cmd))
}

// command implementation
pub fn execute(args: &ArgMatches) -> anyhow::Result<()> {
    //----------------------------
    // Args
    //----------------------------
    let config = args::config(args)?;
    let sub_matrix = args::matrix(args)?;

    let jobs = DirJobs::open(args.get_one::<String>("queue").unwrap())?;
    let targets = load_genes(args.get_one::<String>("targets").unwrap(), None)?;

    let mut store = TsvStore::open(args.get_one::<String>("outfile").unwrap())?;

    //----------------------------
    // Ops
    //----------------------------
    let summary = run_pipeline(
        &jobs,
        &targets,
        &sub_matrix,
        &config.gaps,
        &config.pipeline(),
        &mut store,
    )?;

    let counts = jobs.counts()?;
    log::info!(
        "Queue: {} pending, {} started, {} finished",
        counts.pending,
        counts.started,
        counts.finished
    );
    if !summary.unfinished.is_empty() {
        log::warn!("Run `swaln jobs reset` once no pipeline uses this queue");
    }

    Ok(())
}
