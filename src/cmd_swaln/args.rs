//! Arguments shared by the aligning subcommands.

use clap::*;
use swaln::libs::config::Config;
use swaln::libs::matrix::{GapPenalties, SubMatrix};

pub fn scoring_args(cmd: Command) -> Command {
    cmd.arg(
        Arg::new("gap_open")
            .long("gap-open")
            .env("GAP_OPEN_PENALTY")
            .required(true)
            .value_parser(value_parser!(i32))
            .allow_negative_numbers(true)
            .help("Gap opening penalty, a non-negative integer"),
    )
    .arg(
        Arg::new("gap_extend")
            .long("gap-extend")
            .env("GAP_EXTENSION_PENALTY")
            .required(true)
            .value_parser(value_parser!(i32))
            .allow_negative_numbers(true)
            .help("Gap extension penalty, a non-negative integer"),
    )
    .arg(
        Arg::new("matrix")
            .long("matrix")
            .num_args(1)
            .default_value("blosum62")
            .help("Substitution matrix: `blosum62` or a file in NCBI format"),
    )
}

pub fn pipeline_args(cmd: Command) -> Command {
    cmd.arg(
        Arg::new("load")
            .long("load")
            .env("CPU_CAPACITY")
            .value_parser(value_parser!(f64))
            .default_value("1.0")
            .help("Workers as a multiple of the available CPUs"),
    )
    .arg(
        Arg::new("parallel")
            .long("parallel")
            .short('p')
            .value_parser(value_parser!(usize))
            .num_args(1)
            .help("Number of worker threads, overrides --load"),
    )
    .arg(
        Arg::new("batch")
            .long("batch")
            .value_parser(value_parser!(usize))
            .num_args(1)
            .help("Rows per committed batch [default: 1000]"),
    )
}

pub fn gaps(args: &ArgMatches) -> anyhow::Result<GapPenalties> {
    let gaps = GapPenalties::new(
        *args.get_one::<i32>("gap_open").unwrap(),
        *args.get_one::<i32>("gap_extend").unwrap(),
    );
    gaps.validate()?;
    Ok(gaps)
}

pub fn matrix(args: &ArgMatches) -> anyhow::Result<SubMatrix> {
    SubMatrix::from_name(args.get_one::<String>("matrix").unwrap())
}

pub fn config(args: &ArgMatches) -> anyhow::Result<Config> {
    let config = Config::new(
        *args.get_one::<i32>("gap_open").unwrap(),
        *args.get_one::<i32>("gap_extend").unwrap(),
        args.get_one::<usize>("parallel").copied(),
        *args.get_one::<f64>("load").unwrap(),
        args.get_one::<usize>("batch").copied(),
    )?;
    log::debug!("{:?}", config);
    Ok(config)
}
