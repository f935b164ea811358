pub mod import;
pub mod reset;
pub mod status;

pub fn make_subcommand() -> clap::Command {
    clap::Command::new("jobs")
        .about("Manage a durable job queue")
        .after_help(
            r###"Subcommands:

* import: one pending job per gene of a FASTA file
* status: counts of pending / started / finished jobs
* reset: move started jobs back to pending

A queue is a directory with `pending/`, `started/` and `finished/`, each job a
one-record FASTA file named by its id.

"###,
        )
        .subcommand_required(true)
        .arg_required_else_help(true)
        .subcommand(import::make_subcommand())
        .subcommand(reset::make_subcommand())
        .subcommand(status::make_subcommand())
}

pub fn execute(matches: &clap::ArgMatches) -> anyhow::Result<()> {
    match matches.subcommand() {
        Some(("import", sub_matches)) => import::execute(sub_matches),
        Some(("reset", sub_matches)) => reset::execute(sub_matches),
        Some(("status", sub_matches)) => status::execute(sub_matches),
        _ => unreachable!(),
    }
}
