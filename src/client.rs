//! Producer client: one record out, one reply back.
//!
//! Every failure (validation, connect, transport, timeout) comes back as a
//! `SubmitError` whose `Display` is a single human-readable description.

use crate::config::{Catalog, ClientConfig};
use crate::envelope::Envelope;
use crate::form::{ProductForm, ValidationError};
use crate::frame::{self, FrameError};
use crate::product::ProductRecord;
use serde_json::Value;
use std::time::Duration;
use thiserror::Error;
use tokio::net::TcpStream;
use tracing::debug;

#[derive(Debug, Error)]
pub enum SubmitError {
    #[error("{0}")]
    Validation(#[from] ValidationError),
    #[error("❌ Failed to send data: cannot connect to {addr}: {source}")]
    Connect {
        addr: String,
        #[source]
        source: std::io::Error,
    },
    #[error("❌ Failed to send data: no response from {addr} within {timeout:?}")]
    Timeout { addr: String, timeout: Duration },
    #[error("❌ Failed to send data: {0}")]
    Transport(FrameError),
    #[error("❌ Failed to send data: collector closed the connection without replying")]
    EmptyReply,
    #[error("❌ Failed to send data: cannot encode product: {0}")]
    Encode(#[from] serde_json::Error),
}

impl SubmitError {
    /// True when the record never left the process
    pub fn is_validation(&self) -> bool {
        matches!(self, SubmitError::Validation(_))
    }

    /// Process exit status for the `send` command: 2 for rejected input,
    /// 1 for anything that went wrong on the way to the collector.
    pub fn exit_code(&self) -> u8 {
        if self.is_validation() {
            2
        } else {
            1
        }
    }
}

/// The collector's reply frame.
#[derive(Debug, Clone, PartialEq)]
pub struct Reply {
    /// Reply text as received, trailing whitespace trimmed
    pub raw: String,
    /// The reply as JSON, when it parses
    pub parsed: Option<Value>,
}

impl Reply {
    fn from_frame(frame: &[u8]) -> Self {
        let raw = String::from_utf8_lossy(frame).into_owned();
        let parsed = serde_json::from_str(&raw).ok();
        Reply { raw, parsed }
    }

    /// Pretty-printed JSON when the reply parsed, otherwise the raw text.
    pub fn display(&self) -> String {
        self.parsed
            .as_ref()
            .and_then(|value| serde_json::to_string_pretty(value).ok())
            .unwrap_or_else(|| self.raw.clone())
    }

    /// Typed envelope, if the reply has one of the two envelope shapes.
    ///
    /// Decoded from the text: numbers beyond 64 bits do not survive the
    /// untagged buffering of an already-parsed `Value`.
    pub fn envelope(&self) -> Option<Envelope> {
        serde_json::from_str(&self.raw).ok()
    }
}

/// Send one record to the collector and wait for its single reply frame.
pub async fn submit_product(
    record: &ProductRecord,
    config: &ClientConfig,
) -> Result<Reply, SubmitError> {
    let addr = config.collector.as_str();
    let timeout = config.timeout();
    let payload = serde_json::to_vec(record)?;

    let mut stream = match tokio::time::timeout(timeout, TcpStream::connect(addr)).await {
        Ok(Ok(stream)) => stream,
        Ok(Err(source)) => {
            return Err(SubmitError::Connect {
                addr: addr.to_string(),
                source,
            })
        }
        Err(_) => {
            return Err(SubmitError::Timeout {
                addr: addr.to_string(),
                timeout,
            })
        }
    };
    debug!(collector = addr, bytes = payload.len(), "Sending product");

    let map_err = |e: FrameError| match e {
        FrameError::Timeout(timeout) => SubmitError::Timeout {
            addr: addr.to_string(),
            timeout,
        },
        other => SubmitError::Transport(other),
    };

    frame::write_frame_timeout(&mut stream, &payload, timeout)
        .await
        .map_err(map_err)?;

    let frame = frame::read_frame_timeout(&mut stream, config.max_frame_size, timeout)
        .await
        .map_err(map_err)?
        .ok_or(SubmitError::EmptyReply)?;

    debug!(collector = addr, bytes = frame.len(), "Reply received");
    Ok(Reply::from_frame(&frame))
}

/// Validate raw form input, then submit it. Validation failures return
/// before any connection is attempted.
pub async fn submit_form(
    form: &ProductForm,
    catalog: &Catalog,
    config: &ClientConfig,
) -> Result<(ProductRecord, Reply), SubmitError> {
    let record = form.validate(catalog)?;
    let reply = submit_product(&record, config).await?;
    Ok((record, reply))
}
