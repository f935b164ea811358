use clap::*;
use std::io::Write;
use swaln::libs::align::align;
use swaln::libs::gene::{load_genes, Gene};
use swaln::libs::render::report;
use swaln::libs::store::{ResultRow, COLUMNS};

use super::args;

// Create clap subcommand arguments
pub fn make_subcommand() -> Command {
    let cmd = Command::new("align")
        .about("Aligns two protein sequences")
        .after_help(
            r###"
Local alignment of two protein sequences with affine gap penalties.

Notes:
* Each operand is a FASTA file (the first record is used) or a literal sequence
* Literal sequences are named `a` and `b`
* Residues are case-insensitive
* Identity and similarity are relative to the longer sequence

Examples:
1. Align two literal sequences:
   swaln align HEAGAWGHEE PAWHEAE --gap-open 10 --gap-extend 1

2. Align the first records of two FASTA files:
   swaln align tests/fasta/queries.fa tests/fasta/targets.fa --gap-open 10 --gap-extend 1

3. Print one summary row instead of the alignment:
   swaln align HEAGAWGHEE PAWHEAE --gap-open 10 --gap-extend 1 --tsv

"###,
        )
        .arg(
            Arg::new("seq_a")
                .required(true)
                .index(1)
                .help("The first sequence, or a FASTA file"),
        )
        .arg(
            Arg::new("seq_b")
                .required(true)
                .index(2)
                .help("The second sequence, or a FASTA file"),
        )
        .arg(
            Arg::new("width")
                .long("width")
                .short('w')
                .value_parser(value_parser!(usize))
                .default_value("60")
                .help("Columns per alignment block"),
        )
        .arg(
            Arg::new("tsv")
                .long("tsv")
                .action(ArgAction::SetTrue)
                .help("Print a header and one result row"),
        )
        .arg(
            Arg::new("outfile")
                .long("outfile")
                .short('o')
                .num_args(1)
                .default_value("stdout")
                .help("Output filename. [stdout] for screen"),
        );
    args::scoring_args(cmd)
}

// command implementation
pub fn execute(args: &ArgMatches) -> anyhow::Result<()> {
    //----------------------------
    // Args
    //----------------------------
    let gaps = args::gaps(args)?;
    let sub_matrix = args::matrix(args)?;
    let width = *args.get_one::<usize>("width").unwrap();
    let is_tsv = args.get_flag("tsv");

    let gene_a = operand(args.get_one::<String>("seq_a").unwrap(), "a")?;
    let gene_b = operand(args.get_one::<String>("seq_b").unwrap(), "b")?;

    let mut writer = swaln::writer(args.get_one::<String>("outfile").unwrap())?;

    //----------------------------
    // Ops
    //----------------------------
    let res = align(
        &gene_a.id,
        &gene_a.seq,
        &gene_b.id,
        &gene_b.seq,
        &sub_matrix,
        &gaps,
    )?;

    //----------------------------
    // Output
    //----------------------------
    if is_tsv {
        writer.write_fmt(format_args!("{}\n", COLUMNS.join("\t")))?;
        writer.write_fmt(format_args!("{}\n", ResultRow::from(&res)))?;
    } else {
        writer.write_all(report(&res, width).as_bytes())?;
    }

    Ok(())
}

fn operand(arg: &str, name: &str) -> anyhow::Result<Gene> {
    if std::path::Path::new(arg).is_file() {
        match load_genes(arg, Some(1))?.pop() {
            Some(gene) => Ok(gene),
            None => Err(anyhow::anyhow!("{}: no sequence", arg)),
        }
    } else {
        Ok(Gene::new(name, arg.as_bytes()))
    }
}
