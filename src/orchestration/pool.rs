//! Bounded worker pool for parallel task execution.
//!
//! The [`Dispatcher`] spawns at most `max_concurrency` workers. Each worker
//! pulls one task at a time from a shared queue, executes it, and pushes the
//! [`Outcome`] into a channel. The consumer reads outcomes from an
//! [`OutcomeStream`] in completion order, as soon as each task finishes.

use std::collections::VecDeque;
use std::panic::AssertUnwindSafe;
use std::pin::Pin;
use std::sync::{Arc, Mutex};
use std::task::{Context, Poll};

use futures::{FutureExt, Stream};
use tokio::sync::mpsc;

use crate::core::task::{Outcome, TaskRecord};
use crate::log::Logger;
use crate::orchestration::executor;
use crate::remote::RemoteClient;
use crate::{log_debug, Error, Result};

/// Concurrency used when none (or garbage) is given on the command line.
pub const DEFAULT_MAX_CONCURRENCY: usize = 5;

type TaskQueue = Arc<Mutex<VecDeque<TaskRecord>>>;

/// Remote sessions handed to workers.
#[derive(Clone)]
pub enum Connections {
    /// Every worker issues calls on the same session.
    Shared(Arc<dyn RemoteClient>),
    /// Worker `i` owns session `i`.
    PerWorker(Vec<Arc<dyn RemoteClient>>),
}

impl Connections {
    /// Every distinct session, for closing at the end of a run.
    pub fn sessions(&self) -> Vec<Arc<dyn RemoteClient>> {
        match self {
            Connections::Shared(client) => vec![Arc::clone(client)],
            Connections::PerWorker(clients) => clients.clone(),
        }
    }

    /// Identity of the first session, for log lines.
    pub fn server_identity(&self) -> Option<String> {
        match self {
            Connections::Shared(client) => Some(client.server_identity()),
            Connections::PerWorker(clients) => clients.first().map(|c| c.server_identity()),
        }
    }

    fn assign(&self, workers: usize) -> Vec<Arc<dyn RemoteClient>> {
        match self {
            Connections::Shared(client) => (0..workers).map(|_| Arc::clone(client)).collect(),
            Connections::PerWorker(clients) => clients.iter().take(workers).cloned().collect(),
        }
    }

    fn capacity(&self) -> usize {
        match self {
            Connections::Shared(_) => usize::MAX,
            Connections::PerWorker(clients) => clients.len(),
        }
    }
}

/// Runs task records through a fixed-size pool of workers.
///
/// # Example
///
/// ```ignore
/// use futures::StreamExt;
/// use tirunner::orchestration::{Connections, Dispatcher};
///
/// let dispatcher = Dispatcher::new(4, logger)?;
/// let mut outcomes = dispatcher.run(&Connections::Shared(client), tasks)?;
/// while let Some(outcome) = outcomes.next().await {
///     println!("{}", outcome.message);
/// }
/// ```
pub struct Dispatcher {
    max_concurrency: usize,
    logger: Logger,
}

impl Dispatcher {
    /// Create a dispatcher running at most `max_concurrency` tasks at once.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidConcurrency`] if `max_concurrency` is not positive.
    pub fn new(max_concurrency: i64, logger: Logger) -> Result<Self> {
        if max_concurrency <= 0 {
            return Err(Error::InvalidConcurrency(max_concurrency));
        }
        let max_concurrency =
            usize::try_from(max_concurrency).map_err(|_| Error::InvalidConcurrency(max_concurrency))?;
        Ok(Self {
            max_concurrency,
            logger,
        })
    }

    pub fn max_concurrency(&self) -> usize {
        self.max_concurrency
    }

    /// Submit every task and return the stream of their outcomes.
    ///
    /// Must be called from within a tokio runtime. Workers start
    /// immediately; the stream ends once every task has reported.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Configuration`] if `connections` is per-worker and empty.
    pub fn run(&self, connections: &Connections, tasks: Vec<TaskRecord>) -> Result<OutcomeStream> {
        let capacity = connections.capacity();
        if capacity == 0 {
            return Err(Error::Configuration(
                "no connections available for workers".to_string(),
            ));
        }

        let total = tasks.len();
        let workers = self.max_concurrency.min(capacity).min(total);
        let queue: TaskQueue = Arc::new(Mutex::new(tasks.into()));
        let (tx, rx) = mpsc::unbounded_channel();

        log_debug!(
            self.logger,
            "Dispatching {} tasks on {} workers (max {})",
            total,
            workers,
            self.max_concurrency
        );

        for (id, client) in connections.assign(workers).into_iter().enumerate() {
            tokio::spawn(worker(
                id,
                client,
                Arc::clone(&queue),
                tx.clone(),
                self.logger.clone(),
            ));
        }

        Ok(OutcomeStream {
            rx,
            remaining: total,
        })
    }
}

async fn worker(
    id: usize,
    client: Arc<dyn RemoteClient>,
    queue: TaskQueue,
    tx: mpsc::UnboundedSender<Outcome>,
    logger: Logger,
) {
    log_debug!(logger, "Worker {} started", id);
    let server = client.server_identity();

    while let Some(task) = next_task(&queue) {
        let outcome = AssertUnwindSafe(executor::execute(client.as_ref(), &task, &logger))
            .catch_unwind()
            .await
            .unwrap_or_else(|_| Outcome::failed(&task, &server, "task panicked during execution"));

        if tx.send(outcome).is_err() {
            log_debug!(logger, "Worker {} stopping: outcome receiver dropped", id);
            return;
        }
    }

    log_debug!(logger, "Worker {} finished", id);
}

fn next_task(queue: &TaskQueue) -> Option<TaskRecord> {
    match queue.lock() {
        Ok(mut q) => q.pop_front(),
        Err(poisoned) => poisoned.into_inner().pop_front(),
    }
}

/// Outcomes of a dispatched run, in completion order.
pub struct OutcomeStream {
    rx: mpsc::UnboundedReceiver<Outcome>,
    remaining: usize,
}

impl OutcomeStream {
    /// Wait for the next task to finish.
    ///
    /// Returns `None` once every submitted task has reported.
    pub async fn next_outcome(&mut self) -> Option<Outcome> {
        let outcome = self.rx.recv().await;
        if outcome.is_some() {
            self.remaining = self.remaining.saturating_sub(1);
        }
        outcome
    }

    /// Tasks that have not reported yet.
    pub fn remaining(&self) -> usize {
        self.remaining
    }
}

impl Stream for OutcomeStream {
    type Item = Outcome;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let poll = self.rx.poll_recv(cx);
        if let Poll::Ready(Some(_)) = &poll {
            self.remaining = self.remaining.saturating_sub(1);
        }
        poll
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (0, Some(self.remaining))
    }
}
