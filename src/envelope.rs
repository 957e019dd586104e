//! Response envelopes written back to producers.
//!
//! Success:
//! ```text
//! {"client":"10.0.0.7:53122","product":{...},"message":"✅ Product received successfully!"}
//! ```
//! Malformed request:
//! ```text
//! {"error":"Invalid JSON received!","client":"10.0.0.7:53122"}
//! ```

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::net::SocketAddr;

pub const ACK_MESSAGE: &str = "✅ Product received successfully!";
pub const INVALID_JSON: &str = "Invalid JSON received!";
pub const FRAME_TOO_LARGE: &str = "Frame too large!";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Envelope {
    Ack {
        client: String,
        product: Value,
        message: String,
    },
    Error {
        error: String,
        client: String,
    },
}

impl Envelope {
    pub fn ack(peer: SocketAddr, product: Value) -> Self {
        Envelope::Ack {
            client: peer.to_string(),
            product,
            message: ACK_MESSAGE.to_string(),
        }
    }

    pub fn invalid_json(peer: SocketAddr) -> Self {
        Self::error(peer, INVALID_JSON)
    }

    pub fn frame_too_large(peer: SocketAddr) -> Self {
        Self::error(peer, FRAME_TOO_LARGE)
    }

    fn error(peer: SocketAddr, error: &str) -> Self {
        Envelope::Error {
            error: error.to_string(),
            client: peer.to_string(),
        }
    }

    pub fn is_ack(&self) -> bool {
        matches!(self, Envelope::Ack { .. })
    }

    pub fn client(&self) -> &str {
        match self {
            Envelope::Ack { client, .. } | Envelope::Error { client, .. } => client,
        }
    }

    /// Single-line JSON encoding, ready to be framed
    pub fn to_bytes(&self) -> serde_json::Result<Vec<u8>> {
        serde_json::to_vec(self)
    }
}
