//! Messages exchanged between the bridge and an engine during one call.
//!
//! # Design
//! The tag lives in a `type` field so the same values can be decoded from
//! JSON (see `test-vectors/`). Unknown tags decode to `SendMessage::Other`
//! and are dropped by the accumulator instead of failing the call.

use bytes::Bytes;
use serde::{Deserialize, Serialize};

use crate::http::HeaderPair;

/// Message handed to the engine by `Exchange::receive`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ReceiveMessage {
    /// The complete request body.
    #[serde(rename = "http.request")]
    Request { body: Bytes },
}

impl ReceiveMessage {
    pub fn body(&self) -> &Bytes {
        match self {
            ReceiveMessage::Request { body } => body,
        }
    }
}

/// Message emitted by the engine through `Exchange::send`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum SendMessage {
    /// Status line and headers of the reply.
    #[serde(rename = "http.response.start")]
    ResponseStart {
        status: u16,
        #[serde(default)]
        headers: Vec<HeaderPair>,
    },

    /// One fragment of the reply body. A missing fragment appends nothing.
    #[serde(rename = "http.response.body")]
    ResponseBody {
        #[serde(default)]
        body: Option<Bytes>,
    },

    /// Any message kind the bridge does not understand.
    #[serde(other)]
    Other,
}

impl SendMessage {
    pub fn start(status: u16, headers: Vec<HeaderPair>) -> Self {
        SendMessage::ResponseStart { status, headers }
    }

    pub fn body(body: impl Into<Bytes>) -> Self {
        SendMessage::ResponseBody {
            body: Some(body.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn start_defaults_missing_headers() {
        let msg: SendMessage =
            serde_json::from_str(r#"{"type":"http.response.start","status":204}"#).unwrap();
        assert_eq!(msg, SendMessage::start(204, Vec::new()));
    }

    #[test]
    fn body_accepts_missing_fragment() {
        let msg: SendMessage = serde_json::from_str(r#"{"type":"http.response.body"}"#).unwrap();
        assert_eq!(msg, SendMessage::ResponseBody { body: None });
    }

    #[test]
    fn unknown_kind_decodes_to_other() {
        let msg: SendMessage =
            serde_json::from_str(r#"{"type":"http.response.trailers","more":true}"#).unwrap();
        assert_eq!(msg, SendMessage::Other);
    }

    #[test]
    fn receive_message_carries_type_tag() {
        let msg = ReceiveMessage::Request {
            body: Bytes::from_static(b"{}"),
        };
        let json = serde_json::to_value(&msg).unwrap();
        assert_eq!(json["type"], "http.request");
        assert_eq!(msg.body().as_ref(), b"{}");
    }
}
