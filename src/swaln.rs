extern crate clap;
use clap::*;

mod cmd_swaln;

fn main() -> anyhow::Result<()> {
    let app = Command::new("swaln")
        .version(crate_version!())
        .author(crate_authors!())
        .about("`swaln` - Smith-Waterman protein aligner")
        .propagate_version(true)
        .arg_required_else_help(true)
        .color(ColorChoice::Auto)
        .arg(
            Arg::new("verbose")
                .long("verbose")
                .short('v')
                .global(true)
                .action(ArgAction::SetTrue)
                .help("Log debug messages. RUST_LOG takes precedence"),
        )
        .subcommand(cmd_swaln::align::make_subcommand())
        .subcommand(cmd_swaln::cross::make_subcommand())
        .subcommand(cmd_swaln::jobs::make_subcommand())
        .subcommand(cmd_swaln::run::make_subcommand())
        .after_help(
            r###"Subcommands:

* Pairs:
    * align - Align two sequences and show the alignment

* Sets:
    * cross - Align every gene of one FASTA file against every gene of another
    * jobs  - Manage a durable job queue: import, status, reset
    * run   - Drain a job queue against a target set

Configuration:
    GAP_OPEN_PENALTY, GAP_EXTENSION_PENALTY and CPU_CAPACITY stand in for
    --gap-open, --gap-extend and --load

"###,
        );

    let matches = app.get_matches();

    let log_level = if matches.get_flag("verbose") {
        "debug"
    } else {
        "info"
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(log_level)).init();

    // Check which subcomamnd the user ran...
    match matches.subcommand() {
        Some(("align", sub_matches)) => cmd_swaln::align::execute(sub_matches),
        Some(("cross", sub_matches)) => cmd_swaln::cross::execute(sub_matches),
        Some(("jobs", sub_matches)) => cmd_swaln::jobs::execute(sub_matches),
        Some(("run", sub_matches)) => cmd_swaln::run::execute(sub_matches),
        _ => unreachable!(),
    }?;

    Ok(())
}
