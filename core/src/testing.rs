//! In-memory transport for unit tests.

use std::cell::RefCell;
use std::collections::VecDeque;

use crate::http::{HttpRequest, HttpResponse, Transport, TransportError};

type Canned = (u16, Vec<(String, String)>, Vec<u8>);

/// Replays queued responses in order and records every request it sees.
/// Running out of responses is reported as a transport error.
#[derive(Debug, Default)]
pub(crate) struct CannedTransport {
    responses: RefCell<VecDeque<Canned>>,
    requests: RefCell<Vec<HttpRequest>>,
}

impl CannedTransport {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn respond(self, status: u16, body: &str) -> Self {
        self.respond_bytes(status, Vec::new(), body.as_bytes().to_vec())
    }

    pub(crate) fn respond_bytes(self, status: u16, headers: Vec<(String, String)>, body: Vec<u8>) -> Self {
        self.responses.borrow_mut().push_back((status, headers, body));
        self
    }

    pub(crate) fn requests(&self) -> Vec<HttpRequest> {
        self.requests.borrow().clone()
    }
}

impl Transport for CannedTransport {
    fn send(&self, request: &HttpRequest) -> Result<HttpResponse, TransportError> {
        self.requests.borrow_mut().push(request.clone());
        let (status, headers, body) = self
            .responses
            .borrow_mut()
            .pop_front()
            .ok_or("connection refused: no canned response left")?;
        Ok(HttpResponse::from_bytes(status, headers, body))
    }
}
