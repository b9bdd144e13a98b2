use clap::Parser;
use epicamp::cli::{Cli, Command};
use epicamp::{commands, init_logging};

fn main() -> color_eyre::Result<()> {
    color_eyre::install()?;

    let cli = Cli::parse();
    init_logging(cli.log_file.as_deref(), &cli.log_level)?;

    match cli.command {
        Command::Run(args) => {
            let outcome = commands::run(&args)?;
            for warning in &outcome.warnings {
                eprintln!("warning: {warning}");
            }
            if outcome.reused {
                println!("{} (existing output)", outcome.identity_hash);
            } else {
                println!("{}", outcome.identity_hash);
            }
            println!("report: {}", outcome.paths.report.display());
            println!("summary: {}", outcome.paths.summary.display());
        }
        Command::Hash(args) => println!("{}", commands::hash(&args)?),
    }

    Ok(())
}
