//! Remote server surface.
//!
//! [`RemoteClient`] is one authenticated session able to run processes.
//! [`Connector`] opens sessions from a [`ServerConfig`]. The REST
//! implementation lives in [`rest`]; tests substitute their own.

pub mod rest;

use std::sync::Arc;

use async_trait::async_trait;

use crate::config::ServerConfig;
use crate::core::task::Parameter;

pub use rest::{RestClient, RestConnector};

/// Errors raised by a remote call.
#[derive(Debug, Clone, thiserror::Error)]
pub enum RemoteError {
    /// The server answered with a non-success status.
    #[error("HTTP {status}: {body}")]
    Rejected { status: u16, body: String },

    /// Connection-level failure (DNS, TCP, TLS, dropped session).
    #[error("Transport error: {0}")]
    Transport(String),

    /// The server answered but the response could not be used.
    #[error("Invalid response: {0}")]
    InvalidResponse(String),
}

impl From<reqwest::Error> for RemoteError {
    fn from(e: reqwest::Error) -> Self {
        match e.status() {
            Some(status) => RemoteError::Rejected {
                status: status.as_u16(),
                body: e.to_string(),
            },
            None => RemoteError::Transport(e.to_string()),
        }
    }
}

/// An open session on the remote server.
///
/// Implementations used in [`crate::config::ConnectionMode::Shared`] mode
/// must tolerate concurrent `execute` calls.
#[async_trait]
pub trait RemoteClient: Send + Sync {
    /// Run the named process with its parameters.
    async fn execute(&self, procedure: &str, parameters: &[Parameter])
        -> Result<(), RemoteError>;

    /// Name the server reports for itself.
    fn server_identity(&self) -> String;

    /// End the session.
    async fn close(&self) -> Result<(), RemoteError>;
}

/// Opens sessions on a remote server.
#[async_trait]
pub trait Connector: Send + Sync {
    async fn connect(&self, config: &ServerConfig) -> Result<Arc<dyn RemoteClient>, RemoteError>;
}
