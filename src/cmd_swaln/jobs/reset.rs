use clap::*;
use swaln::libs::jobs::DirJobs;

// Create clap subcommand arguments
pub fn make_subcommand() -> Command {
    Command::new("reset")
        .about("Moves started jobs back to pending")
        .after_help(
            r###"
Recovers the jobs of a crashed run.

Notes:
* Only safe while no `swaln run` uses the queue: a running pipeline would
  align the reset jobs a second time

Examples:
1. swaln jobs reset queue

"###,
        )
        .arg(
            Arg::new("queue")
                .required(true)
                .index(1)
                .help("Job queue directory"),
        )
}

// command implementation
pub fn execute(args: &ArgMatches) -> anyhow::Result<()> {
    let queue = args.get_one::<String>("queue").unwrap();
    if !std::path::Path::new(queue).is_dir() {
        return Err(anyhow::anyhow!("{} is not a job queue directory", queue));
    }

    let n = DirJobs::open(queue)?.reset_started()?;
    log::info!("Moved {} started jobs back to pending", n);

    Ok(())
}
