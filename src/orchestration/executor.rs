//! Single-task execution against a remote session.

use crate::core::task::{format_parameters, Outcome, TaskRecord};
use crate::log::Logger;
use crate::remote::RemoteClient;
use crate::{log_error, log_info};

/// Run one task and report how it went.
///
/// Never fails: any error from the remote call becomes a failed
/// [`Outcome`] carrying the error detail.
pub async fn execute(client: &dyn RemoteClient, task: &TaskRecord, logger: &Logger) -> Outcome {
    let server = client.server_identity();
    log_info!(
        logger,
        "Row {} {}: Executing for {} on {}",
        task.seq(),
        task.procedure(),
        format_parameters(task.parameters()),
        server
    );

    match client.execute(task.procedure(), task.parameters()).await {
        Ok(()) => Outcome::succeeded(task, &server),
        Err(e) => {
            log_error!(logger, "Process Completed With Errors");
            Outcome::failed(task, &server, &e.to_string())
        }
    }
}
