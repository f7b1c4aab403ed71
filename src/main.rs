use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use clap::Parser;

use tirunner::config::{DEFAULT_CONFIG_PATH, DEFAULT_SECTION};
use tirunner::log::LogLevel;
use tirunner::orchestration::{Coordinator, RunArgs};
use tirunner::remote::RestConnector;
use tirunner::{log_fatal, log_warn, Logger};

const LOGGER_NAME: &str = "tirunner";

/// Run remote processes listed in a file, in parallel
#[derive(Parser, Debug)]
#[command(name = "tirunner")]
#[command(version, about, long_about = None)]
#[command(after_help = "INPUT FORMAT:\n    One process per line: Process,ParamName1,ParamValue1,...,ParamNameN,ParamValueN")]
pub struct Cli {
    /// File listing the processes to run
    pub file: Option<PathBuf>,

    /// Maximum number of processes running at once (default: 5)
    #[arg(allow_hyphen_values = true)]
    pub max_concurrency: Option<String>,

    /// Server configuration file
    #[arg(short = 'c', long, default_value = DEFAULT_CONFIG_PATH)]
    pub config: PathBuf,

    /// Server section within the configuration file
    #[arg(short = 's', long, default_value = DEFAULT_SECTION)]
    pub section: String,

    /// Log file (receives DEBUG and above)
    #[arg(short = 'l', long, default_value = "tirunner.log")]
    pub log_file: PathBuf,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let logger = match Logger::init(LOGGER_NAME, &cli.log_file) {
        Ok(logger) => logger,
        Err(e) => {
            let logger = Logger::new(LOGGER_NAME).with_console(LogLevel::Info);
            log_warn!(
                logger,
                "Cannot open log file {}: {}; logging to console only",
                cli.log_file.display(),
                e
            );
            logger
        }
    };

    let args = RunArgs {
        file: cli.file,
        max_concurrency: cli.max_concurrency,
        config_path: cli.config,
        section: cli.section,
    };

    let coordinator = Coordinator::new(Arc::new(RestConnector), logger.clone());
    match coordinator.run(&args).await {
        Ok(_) => ExitCode::SUCCESS,
        Err(e) => {
            log_fatal!(logger, "{}", e);
            ExitCode::FAILURE
        }
    }
}
