//! REST client for the remote process server.
//!
//! Login authenticates once with a basic or CAM authorization header and
//! reads the server name; the session cookie set by that response carries
//! every later call.

use std::sync::Arc;

use async_trait::async_trait;
use base64::Engine;
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use reqwest::{Client, Response};
use serde::Serialize;

use super::{Connector, RemoteClient, RemoteError};
use crate::config::ServerConfig;
use crate::core::task::Parameter;

const SESSION_CONTEXT: &str = "tirunner";

#[derive(Serialize)]
struct ExecuteBody<'a> {
    #[serde(rename = "Parameters")]
    parameters: &'a [Parameter],
}

/// Session on a server's REST API.
pub struct RestClient {
    http: Client,
    base_url: String,
    server_name: String,
}

impl RestClient {
    /// Authenticate against the server described by `config`.
    pub async fn login(config: &ServerConfig) -> Result<Self, RemoteError> {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        headers.insert(
            "tm1-sessioncontext",
            HeaderValue::from_static(SESSION_CONTEXT),
        );

        let http = Client::builder()
            .cookie_store(true)
            .danger_accept_invalid_certs(!config.verify_tls)
            .default_headers(headers)
            .build()
            .map_err(|e| RemoteError::Transport(e.to_string()))?;

        let base_url = config.base_url();
        let auth = HeaderValue::from_str(&authorization(config))
            .map_err(|e| RemoteError::InvalidResponse(format!("bad credentials header: {}", e)))?;

        let response = http
            .get(format!("{}/Configuration/ServerName/$value", base_url))
            .header(AUTHORIZATION, auth)
            .send()
            .await?;
        let server_name = check(response).await?.text().await?;
        if server_name.trim().is_empty() {
            return Err(RemoteError::InvalidResponse(
                "server returned an empty name".to_string(),
            ));
        }

        Ok(Self {
            http,
            base_url,
            server_name: server_name.trim().to_string(),
        })
    }
}

#[async_trait]
impl RemoteClient for RestClient {
    async fn execute(
        &self,
        procedure: &str,
        parameters: &[Parameter],
    ) -> Result<(), RemoteError> {
        let response = self
            .http
            .post(process_execute_url(&self.base_url, procedure))
            .json(&ExecuteBody { parameters })
            .send()
            .await?;
        check(response).await?;
        Ok(())
    }

    fn server_identity(&self) -> String {
        self.server_name.clone()
    }

    async fn close(&self) -> Result<(), RemoteError> {
        let response = self
            .http
            .post(format!("{}/ActiveSession/tm1.Close", self.base_url))
            .send()
            .await?;
        check(response).await?;
        Ok(())
    }
}

/// Opens [`RestClient`] sessions.
#[derive(Debug, Clone, Copy, Default)]
pub struct RestConnector;

#[async_trait]
impl Connector for RestConnector {
    async fn connect(&self, config: &ServerConfig) -> Result<Arc<dyn RemoteClient>, RemoteError> {
        Ok(Arc::new(RestClient::login(config).await?))
    }
}

async fn check(response: Response) -> Result<Response, RemoteError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    Err(RemoteError::Rejected {
        status: status.as_u16(),
        body,
    })
}

fn authorization(config: &ServerConfig) -> String {
    let engine = base64::engine::general_purpose::STANDARD;
    match &config.namespace {
        Some(ns) => format!(
            "CAMNamespace {}",
            engine.encode(format!("{}:{}:{}", config.user, config.password, ns))
        ),
        None => format!(
            "Basic {}",
            engine.encode(format!("{}:{}", config.user, config.password))
        ),
    }
}

fn process_execute_url(base_url: &str, procedure: &str) -> String {
    format!(
        "{}/Processes('{}')/tm1.Execute",
        base_url,
        escape_key(procedure)
    )
}

/// Quote a name for use inside an OData key literal.
fn escape_key(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    for c in name.chars() {
        match c {
            '\'' => out.push_str("''"),
            '%' => out.push_str("%25"),
            '#' => out.push_str("%23"),
            '?' => out.push_str("%3F"),
            _ => out.push(c),
        }
    }
    out
}
