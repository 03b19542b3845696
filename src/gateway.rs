//! Message gateway: delivery through a signal-cli daemon.
//!
//! signal-cli exposes a JSON-RPC 2.0 endpoint when started with
//! `signal-cli daemon --http`. Every dispatched item becomes one `send` call
//! to the whole recipient list.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use thiserror::Error;
use tracing::{debug, instrument, warn};

use crate::utils::truncate_for_log;

#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("gateway answered with status {0}")]
    Status(u16),
    #[error("gateway error {code}: {message}")]
    Rpc { code: i64, message: String },
}

/// Delivers one message, optionally with attachments, to a recipient list.
pub trait Gateway {
    async fn send(
        &self,
        text: &str,
        attachments: &[PathBuf],
        recipients: &[String],
    ) -> Result<(), GatewayError>;
}

#[derive(Debug, Serialize)]
struct RpcRequest<'a> {
    jsonrpc: &'static str,
    method: &'static str,
    params: SendParams<'a>,
    id: u64,
}

#[derive(Debug, Serialize)]
struct SendParams<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    account: Option<&'a str>,
    recipient: &'a [String],
    message: &'a str,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    attachments: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct RpcResponse {
    #[serde(default)]
    error: Option<RpcErrorBody>,
}

#[derive(Debug, Deserialize)]
struct RpcErrorBody {
    code: i64,
    message: String,
}

/// JSON-RPC client for `signal-cli daemon --http`.
#[derive(Debug)]
pub struct SignalGateway {
    client: reqwest::Client,
    rpc_url: String,
    account: Option<String>,
    next_id: AtomicU64,
}

impl SignalGateway {
    pub fn new(rpc_url: impl Into<String>, account: Option<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            rpc_url: rpc_url.into(),
            account,
            next_id: AtomicU64::new(1),
        }
    }
}

impl Gateway for SignalGateway {
    #[instrument(level = "info", skip_all, fields(attachments = attachments.len(), recipients = recipients.len()))]
    async fn send(
        &self,
        text: &str,
        attachments: &[PathBuf],
        recipients: &[String],
    ) -> Result<(), GatewayError> {
        let request = RpcRequest {
            jsonrpc: "2.0",
            method: "send",
            params: SendParams {
                account: self.account.as_deref(),
                recipient: recipients,
                message: text,
                attachments: attachments
                    .iter()
                    .map(|p| p.to_string_lossy().into_owned())
                    .collect(),
            },
            id: self.next_id.fetch_add(1, Ordering::Relaxed),
        };
        debug!(id = request.id, message = %truncate_for_log(text, 80), "Sending message");

        let response = self.client.post(&self.rpc_url).json(&request).send().await?;
        let status = response.status();
        if !status.is_success() {
            warn!(status = status.as_u16(), "Gateway rejected request");
            return Err(GatewayError::Status(status.as_u16()));
        }

        let body: RpcResponse = response.json().await?;
        if let Some(err) = body.error {
            warn!(code = err.code, message = %err.message, "Gateway returned an error");
            return Err(GatewayError::Rpc {
                code: err.code,
                message: err.message,
            });
        }
        Ok(())
    }
}
