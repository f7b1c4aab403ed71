//! End-to-end run: load tasks, connect, dispatch, report, disconnect.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use crate::config::{ConnectionMode, ServerConfig, DEFAULT_CONFIG_PATH, DEFAULT_SECTION};
use crate::core::loader::load_tasks_async;
use crate::core::task::{RunSummary, TaskRecord};
use crate::log::Logger;
use crate::orchestration::pool::{Connections, Dispatcher, DEFAULT_MAX_CONCURRENCY};
use crate::remote::{Connector, RemoteClient};
use crate::{log_debug, log_error, log_info, log_warn, Error, Result};

/// Inputs for one run, as given on the command line.
#[derive(Debug, Clone)]
pub struct RunArgs {
    pub file: Option<PathBuf>,
    /// Raw concurrency argument; parsed by the coordinator.
    pub max_concurrency: Option<String>,
    pub config_path: PathBuf,
    pub section: String,
}

impl RunArgs {
    pub fn new(file: impl Into<PathBuf>) -> Self {
        Self {
            file: Some(file.into()),
            ..Self::default()
        }
    }

    pub fn with_max_concurrency(mut self, value: impl Into<String>) -> Self {
        self.max_concurrency = Some(value.into());
        self
    }

    pub fn with_config(mut self, path: impl Into<PathBuf>, section: impl Into<String>) -> Self {
        self.config_path = path.into();
        self.section = section.into();
        self
    }
}

impl Default for RunArgs {
    fn default() -> Self {
        Self {
            file: None,
            max_concurrency: None,
            config_path: PathBuf::from(DEFAULT_CONFIG_PATH),
            section: DEFAULT_SECTION.to_string(),
        }
    }
}

/// Parse the concurrency argument.
///
/// A missing or non-numeric value falls back to [`DEFAULT_MAX_CONCURRENCY`]
/// with a warning. Numeric values pass through unchanged so the dispatcher
/// can reject non-positive ones.
pub fn resolve_concurrency(arg: Option<&str>, logger: &Logger) -> i64 {
    let default = DEFAULT_MAX_CONCURRENCY as i64;
    match arg.map(|s| s.trim().parse::<i64>()) {
        Some(Ok(n)) => n,
        Some(Err(_)) => {
            log_warn!(
                logger,
                "Max Parallel Threads '{}' is not a number, Default: {}",
                arg.unwrap_or_default(),
                default
            );
            default
        }
        None => {
            log_warn!(logger, "Max Parallel Threads Not Specified, Default: {}", default);
            default
        }
    }
}

/// Drives a whole run against one server.
pub struct Coordinator {
    connector: Arc<dyn Connector>,
    logger: Logger,
}

impl Coordinator {
    pub fn new(connector: Arc<dyn Connector>, logger: Logger) -> Self {
        Self { connector, logger }
    }

    /// Execute every task in `args.file` and summarize the results.
    ///
    /// Per-task failures are logged and counted; only startup, input, and
    /// connection problems return an error. No remote call is made unless
    /// the input file, concurrency, configuration, and tasks are all valid.
    pub async fn run(&self, args: &RunArgs) -> Result<RunSummary> {
        let file = args.file.clone().ok_or(Error::NoFileSpecified)?;
        if !file.is_file() {
            return Err(Error::FileNotFound(file));
        }

        let concurrency = resolve_concurrency(args.max_concurrency.as_deref(), &self.logger);
        let dispatcher = Dispatcher::new(concurrency, self.logger.clone())?;

        log_info!(self.logger, "Reading Config File");
        let config = ServerConfig::load(&args.config_path, &args.section)?;

        let tasks = load_tasks_async(file.clone()).await?;
        log_info!(
            self.logger,
            "Reading file {}, {} lines read",
            file.display(),
            tasks.len()
        );
        log_info!(
            self.logger,
            "Maximum Parallel Threads: {}",
            dispatcher.max_concurrency()
        );

        let connections = self.open(&config, &dispatcher, tasks.len()).await?;
        if let Some(server) = connections.server_identity() {
            log_info!(self.logger, "Connecting to: {}", server);
        }
        log_info!(self.logger, "Starting Processes found in: {}", file.display());

        let result = self.dispatch(&dispatcher, &connections, tasks).await;
        if let Ok(summary) = &result {
            log_info!(
                self.logger,
                "Total Time To Complete {} Processes: {:.3}s",
                summary.total,
                summary.elapsed.as_secs_f64()
            );
        }

        self.close(&connections).await;

        let summary = result?;
        log_info!(self.logger, "{}", summary);
        Ok(summary)
    }

    async fn dispatch(
        &self,
        dispatcher: &Dispatcher,
        connections: &Connections,
        tasks: Vec<TaskRecord>,
    ) -> Result<RunSummary> {
        let start = Instant::now();
        let mut outcomes = dispatcher.run(connections, tasks)?;
        let mut summary = RunSummary::default();

        while let Some(outcome) = outcomes.next_outcome().await {
            if outcome.success {
                log_info!(self.logger, "{}", outcome.message);
            } else {
                log_error!(self.logger, "{}", outcome.message);
            }
            summary.record(&outcome);
        }

        summary.elapsed = start.elapsed();
        Ok(summary)
    }

    async fn open(
        &self,
        config: &ServerConfig,
        dispatcher: &Dispatcher,
        task_count: usize,
    ) -> Result<Connections> {
        match config.connection_mode {
            ConnectionMode::Shared => Ok(Connections::Shared(self.connect(config).await?)),
            ConnectionMode::PerWorker => {
                let wanted = dispatcher.max_concurrency().min(task_count).max(1);
                let mut sessions: Vec<Arc<dyn RemoteClient>> = Vec::with_capacity(wanted);
                for _ in 0..wanted {
                    match self.connect(config).await {
                        Ok(session) => sessions.push(session),
                        Err(e) => {
                            self.close(&Connections::PerWorker(sessions)).await;
                            return Err(e);
                        }
                    }
                }
                log_debug!(self.logger, "Opened {} per-worker sessions", wanted);
                Ok(Connections::PerWorker(sessions))
            }
        }
    }

    async fn connect(&self, config: &ServerConfig) -> Result<Arc<dyn RemoteClient>> {
        log_debug!(self.logger, "Connecting to {}", config.base_url());
        self.connector.connect(config).await.map_err(|e| {
            Error::Configuration(format!(
                "Unable to connect to {}: {}",
                config.base_url(),
                e
            ))
        })
    }

    async fn close(&self, connections: &Connections) {
        let sessions = connections.sessions();
        if sessions.is_empty() {
            return;
        }
        log_info!(self.logger, "Logging Out");
        for session in sessions {
            if let Err(e) = session.close().await {
                log_warn!(self.logger, "Logout failed: {}", e);
            }
        }
    }
}
