use clap::*;
use std::io::Write;
use swaln::libs::jobs::DirJobs;

// Create clap subcommand arguments
pub fn make_subcommand() -> Command {
    Command::new("status")
        .about("Counts jobs per state")
        .after_help(
            r###"
Prints `state<TAB>count` for pending, started, finished and total.

Examples:
1. swaln jobs status queue

"###,
        )
        .arg(
            Arg::new("queue")
                .required(true)
                .index(1)
                .help("Job queue directory"),
        )
        .arg(
            Arg::new("outfile")
                .long("outfile")
                .short('o')
                .num_args(1)
                .default_value("stdout")
                .help("Output filename. [stdout] for screen"),
        )
}

// command implementation
pub fn execute(args: &ArgMatches) -> anyhow::Result<()> {
    let queue = args.get_one::<String>("queue").unwrap();
    if !std::path::Path::new(queue).is_dir() {
        return Err(anyhow::anyhow!("{} is not a job queue directory", queue));
    }

    let counts = DirJobs::open(queue)?.counts()?;

    let mut writer = swaln::writer(args.get_one::<String>("outfile").unwrap())?;
    writer.write_fmt(format_args!("pending\t{}\n", counts.pending))?;
    writer.write_fmt(format_args!("started\t{}\n", counts.started))?;
    writer.write_fmt(format_args!("finished\t{}\n", counts.finished))?;
    writer.write_fmt(format_args!("total\t{}\n", counts.total()))?;

    Ok(())
}
