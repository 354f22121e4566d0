use clap::error::ErrorKind;
use clap::{ArgAction, Parser};
use cleanfolder::cli::{CliOptions, run_cli};
use cleanfolder::output::OutputFormatter;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::Level;

#[derive(Parser)]
#[command(name = "cleanfolder")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Sort a folder into images, video, documents, audio, archives and other")]
struct Cli {
    /// Folder to organize
    folder: PathBuf,

    /// Configuration file (defaults to ./.cleanfolder.toml if present)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Show what would happen without touching any file
    #[arg(long)]
    dry_run: bool,

    /// Number of relocation workers (0 = one per CPU)
    #[arg(short, long)]
    jobs: Option<usize>,

    /// Print the run report as JSON
    #[arg(long)]
    json: bool,

    /// More log output (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = ArgAction::Count)]
    verbose: u8,

    /// Only log errors
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,
}

impl Cli {
    fn log_level(&self) -> Level {
        if self.quiet {
            return Level::ERROR;
        }
        match self.verbose {
            0 => Level::WARN,
            1 => Level::INFO,
            2 => Level::DEBUG,
            _ => Level::TRACE,
        }
    }
}

fn main() -> ExitCode {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) if matches!(e.kind(), ErrorKind::DisplayHelp | ErrorKind::DisplayVersion) => {
            e.exit()
        }
        Err(e) => {
            println!("{}", e.render());
            return ExitCode::FAILURE;
        }
    };

    tracing_subscriber::fmt()
        .with_max_level(cli.log_level())
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();

    let options = CliOptions {
        root: cli.folder,
        config_path: cli.config,
        dry_run: cli.dry_run,
        jobs: cli.jobs,
        json: cli.json,
    };

    match run_cli(&options) {
        Ok(_) => ExitCode::SUCCESS,
        Err(e) => {
            OutputFormatter::error(&format!("{:#}", e));
            ExitCode::FAILURE
        }
    }
}
