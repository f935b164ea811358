use clap::*;
use swaln::libs::gene::load_genes;
use swaln::libs::jobs::DirJobs;

// Create clap subcommand arguments
pub fn make_subcommand() -> Command {
    Command::new("import")
        .about("Creates one pending job per gene")
        .after_help(
            r###"
Notes:
* The queue directory is created when missing
* A queue that already holds jobs, in any state, is left untouched
* Supports both plain text and gzipped (.gz) files

Examples:
1. Queue every gene:
   swaln jobs import tests/fasta/queries.fa queue

2. Queue the first 1000 genes:
   swaln jobs import genes.fa.gz queue --limit 1000

"###,
        )
        .arg(
            Arg::new("infile")
                .required(true)
                .index(1)
                .help("Query genes, a FASTA file"),
        )
        .arg(
            Arg::new("queue")
                .required(true)
                .index(2)
                .help("Job queue directory"),
        )
        .arg(
            Arg::new("limit")
                .long("limit")
                .value_parser(value_parser!(usize))
                .num_args(1)
                .help("Import at most this many genes"),
        )
}

// command implementation
pub fn execute(args: &ArgMatches) -> anyhow::Result<()> {
    let limit = args.get_one::<usize>("limit").copied();
    let queue = args.get_one::<String>("queue").unwrap();

    let jobs = DirJobs::open(queue)?;
    let genes = load_genes(args.get_one::<String>("infile").unwrap(), limit)?;
    let n = jobs.import(&genes)?;
    log::info!("Imported {} jobs into {}", n, queue);

    Ok(())
}
