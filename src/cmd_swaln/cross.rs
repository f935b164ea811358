use clap::*;
use swaln::libs::gene::load_genes;
use swaln::libs::pipeline::run_cross;
use swaln::libs::store::TsvStore;

use super::args;

// Create clap subcommand arguments
pub fn make_subcommand() -> Command {
    let cmd = Command::new("cross")
        .about("Aligns every gene of set A against every gene of set B")
        .after_help(
            r###"
Aligns each sequence of the first FASTA file against each sequence of the
second one and appends one row per pair to a tab-separated file.

Notes:
* Supports both plain text and gzipped (.gz) files
* Running with 1 dispatcher, 1 collector and the corresponding number of workers
* The order of rows may differ from the input order
* Rows are committed in batches; an interrupted run keeps whole batches only
* Any alignment or commit error aborts the run

Examples:
1. All pairs, as many workers as CPUs:
   swaln cross tests/fasta/queries.fa tests/fasta/targets.fa --gap-open 10 --gap-extend 1 -o res.tsv

2. Half of the CPUs, gap penalties from the environment:
   GAP_OPEN_PENALTY=10 GAP_EXTENSION_PENALTY=1 swaln cross a.fa b.fa --load 0.5 -o res.tsv

3. The first 100 genes of A only:
   swaln cross a.fa b.fa --gap-open 10 --gap-extend 1 --limit 100 -o res.tsv

"###,
        )
        .arg(
            Arg::new("set_a")
                .required(true)
                .index(1)
                .help("Query genes, a FASTA file"),
        )
        .arg(
            Arg::new("set_b")
                .required(true)
                .index(2)
                .help("Target genes, a FASTA file"),
        )
        .arg(
            Arg::new("limit")
                .long("limit")
                .value_parser(value_parser!(usize))
                .num_args(1)
                .help("Load at most this many genes of set A"),
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
    let limit = args.get_one::<usize>("limit").copied();

    let set_a = load_genes(args.get_one::<String>("set_a").unwrap(), limit)?;
    let set_b = load_genes(args.get_one::<String>("set_b").unwrap(), None)?;

    let mut store = TsvStore::open(args.get_one::<String>("outfile").unwrap())?;

    //----------------------------
    // Ops
    //----------------------------
    run_cross(
        set_a,
        &set_b,
        &sub_matrix,
        &config.gaps,
        &config.pipeline(),
        &mut store,
    )?;

    Ok(())
}
