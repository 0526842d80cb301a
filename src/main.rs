use clap::Parser;
use log::LevelFilter;
use std::process::ExitCode;

use ratesync_lib::cli::Args;
use ratesync_lib::logging::setup_logging;

fn main() -> ExitCode {
    let args = Args::parse();
    let logging = setup_logging(args.log_level, args.log_file.clone(), args.log_file_level);
    if let Err(e) = &logging {
        eprintln!("Logging disabled: {e:#}");
    }
    // The console sink already shows error records
    let console_shows_errors = logging.is_ok() && args.log_level >= LevelFilter::Error;

    match ratesync_lib::run(&args) {
        Ok(summary) => {
            log::debug!("Exiting after {} tracks", summary.processed);
            ExitCode::SUCCESS
        }
        Err(e) => {
            log::error!("{e:#}");
            if !console_shows_errors {
                eprintln!("Error: {e:#}");
            }
            ExitCode::FAILURE
        }
    }
}
