//! Blocking `Transport` backed by ureq.
//!
//! Status-as-error is disabled on the agent so 4xx/5xx responses come back
//! as data and the client can classify them.

use ureq::tls::TlsConfig;
use ureq::{Agent, RequestBuilder};

use crate::http::{HttpMethod, HttpRequest, HttpResponse, Transport, TransportError};

#[derive(Debug, Clone)]
pub struct UreqTransport {
    agent: Agent,
}

impl UreqTransport {
    pub fn new() -> Self {
        Self::with_tls(TlsConfig::default())
    }

    /// Transport that skips TLS certificate verification. Intended for lab
    /// servers with self-signed certificates.
    pub fn insecure() -> Self {
        Self::with_tls(TlsConfig::builder().disable_verification(true).build())
    }

    /// Wraps a preconfigured agent. The agent must have
    /// `http_status_as_error(false)` or non-2xx responses surface as
    /// transport errors instead of `ErrorResponse`s.
    pub fn from_agent(agent: Agent) -> Self {
        Self { agent }
    }

    fn with_tls(tls: TlsConfig) -> Self {
        let agent = Agent::config_builder()
            .http_status_as_error(false)
            .tls_config(tls)
            .build()
            .new_agent();
        Self { agent }
    }
}

impl Default for UreqTransport {
    fn default() -> Self {
        Self::new()
    }
}

impl Transport for UreqTransport {
    fn send(&self, req: &HttpRequest) -> Result<HttpResponse, TransportError> {
        let response = match (req.method, &req.body) {
            (HttpMethod::Get, _) => with_headers(self.agent.get(&req.url), req).call(),
            (HttpMethod::Delete, _) => with_headers(self.agent.delete(&req.url), req).call(),
            (HttpMethod::Post, Some(body)) => with_headers(self.agent.post(&req.url), req).send(body.as_slice()),
            (HttpMethod::Post, None) => with_headers(self.agent.post(&req.url), req).send_empty(),
            (HttpMethod::Put, Some(body)) => with_headers(self.agent.put(&req.url), req).send(body.as_slice()),
            (HttpMethod::Put, None) => with_headers(self.agent.put(&req.url), req).send_empty(),
        }?;

        let status = response.status().as_u16();
        let headers = response
            .headers()
            .iter()
            .filter_map(|(name, value)| {
                value
                    .to_str()
                    .ok()
                    .map(|v| (name.as_str().to_string(), v.to_string()))
            })
            .collect();
        let body = response.into_body().into_reader();

        Ok(HttpResponse::new(status, headers, body))
    }
}

fn with_headers<B>(mut builder: RequestBuilder<B>, req: &HttpRequest) -> RequestBuilder<B> {
    for (name, value) in &req.headers {
        builder = builder.header(name.as_str(), value.as_str());
    }
    builder
}
