//! Buffered request/response adapter handed to an engine for one call.
//!
//! # Design
//! An `Exchange` owns the fully-read request body and a fresh
//! `ResponseAccumulator`. The engine reads the body through `receive` and
//! writes its reply through `send`; nothing here performs I/O. The caller
//! folds the accumulator into an `HttpResponse` once the engine returns.

use bytes::Bytes;

use crate::http::{HeaderPair, HttpResponse};
use crate::message::{ReceiveMessage, SendMessage};

/// Reply state collected from `send` calls.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResponseAccumulator {
    started: bool,
    status: u16,
    headers: Vec<HeaderPair>,
    body: Vec<u8>,
}

impl Default for ResponseAccumulator {
    fn default() -> Self {
        Self {
            started: false,
            status: 200,
            headers: Vec::new(),
            body: Vec::new(),
        }
    }
}

impl ResponseAccumulator {
    pub fn started(&self) -> bool {
        self.started
    }

    pub fn status(&self) -> u16 {
        self.status
    }

    pub fn headers(&self) -> &[HeaderPair] {
        &self.headers
    }

    pub fn body(&self) -> &[u8] {
        &self.body
    }

    /// Apply one engine message. Unknown kinds are ignored.
    pub fn apply(&mut self, message: SendMessage) {
        match message {
            SendMessage::ResponseStart { status, headers } => {
                self.started = true;
                self.status = status;
                self.headers = headers;
            }
            SendMessage::ResponseBody { body } => {
                if let Some(fragment) = body {
                    self.body.extend_from_slice(&fragment);
                }
            }
            SendMessage::Other => {
                tracing::debug!("ignoring unknown response message kind");
            }
        }
    }

    pub fn into_response(self) -> HttpResponse {
        HttpResponse {
            status: self.status,
            headers: self.headers,
            body: self.body,
        }
    }
}

/// The receive/send pair for one call.
#[derive(Debug)]
pub struct Exchange {
    body: Bytes,
    response: ResponseAccumulator,
}

impl Exchange {
    pub fn new(body: impl Into<Bytes>) -> Self {
        Self {
            body: body.into(),
            response: ResponseAccumulator::default(),
        }
    }

    /// Returns the request body. Repeated calls return the same payload.
    pub fn receive(&self) -> ReceiveMessage {
        ReceiveMessage::Request {
            body: self.body.clone(),
        }
    }

    pub fn send(&mut self, message: SendMessage) {
        self.response.apply(message);
    }

    pub fn response(&self) -> &ResponseAccumulator {
        &self.response
    }

    pub fn into_response(self) -> HttpResponse {
        self.response.into_response()
    }
}
