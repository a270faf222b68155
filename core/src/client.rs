//! Request construction and execution against the Pulp REST API.
//!
//! # Design
//! `Client` holds the base endpoint, credentials, user agent and a
//! `Transport`, and carries no mutable state between calls, so one client can
//! serve concurrent callers when its transport allows it. Each call builds a
//! fresh `HttpRequest`, sends it, classifies the status and then either
//! decodes the JSON body (`execute`) or copies it verbatim into a writer
//! (`execute_streaming`).
//!
//! Read methods flatten their options into the query string; write methods
//! serialize them as the JSON body and never carry a query string. The path
//! is appended to the base URL as-is so segment encoding chosen by the caller
//! reaches the server untouched.

use std::fmt;
use std::io::{self, Write};

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::debug;
use url::Url;

use crate::error::{check_response, Error};
use crate::http::{HttpMethod, HttpRequest, HttpResponse, Response, Transport};
use crate::repositories::RepositoriesService;
use crate::tasks::TasksService;
use crate::transport::UreqTransport;
use crate::units::UnitsService;

const API_VERSION: &str = "v2";

/// Sent when the caller does not pick a user agent.
pub const DEFAULT_USER_AGENT: &str = concat!("pulp-rs/", env!("CARGO_PKG_VERSION"));

/// Fallback credentials, used only when none are configured.
pub const DEFAULT_USER: &str = "admin";
pub const DEFAULT_PASSWORD: &str = "admin";

/// HTTP basic auth credentials.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

impl Credentials {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }

    fn authorization(&self) -> String {
        let token = STANDARD.encode(format!("{}:{}", self.username, self.password));
        format!("Basic {token}")
    }
}

impl Default for Credentials {
    fn default() -> Self {
        Self::new(DEFAULT_USER, DEFAULT_PASSWORD)
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Configures a `Client` for a Pulp host.
#[derive(Debug, Clone)]
pub struct ClientBuilder {
    host: String,
    credentials: Option<Credentials>,
    disable_ssl: bool,
    skip_ssl_verify: bool,
    user_agent: String,
}

impl ClientBuilder {
    fn new(host: String) -> Self {
        Self {
            host,
            credentials: None,
            disable_ssl: false,
            skip_ssl_verify: false,
            user_agent: DEFAULT_USER_AGENT.to_string(),
        }
    }

    pub fn credentials(mut self, username: impl Into<String>, password: impl Into<String>) -> Self {
        self.credentials = Some(Credentials::new(username, password));
        self
    }

    /// Talk plain `http` instead of `https`.
    pub fn disable_ssl(mut self, disable: bool) -> Self {
        self.disable_ssl = disable;
        self
    }

    /// Skip certificate verification. Only honoured by `build`; a transport
    /// passed to `build_with` keeps its own TLS settings.
    pub fn skip_ssl_verify(mut self, skip: bool) -> Self {
        self.skip_ssl_verify = skip;
        self
    }

    /// An empty user agent suppresses the header.
    pub fn user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }

    pub fn build(self) -> Result<Client, Error> {
        let transport = if self.skip_ssl_verify {
            UreqTransport::insecure()
        } else {
            UreqTransport::new()
        };
        self.build_with(transport)
    }

    pub fn build_with<T: Transport>(self, transport: T) -> Result<Client<T>, Error> {
        let scheme = if self.disable_ssl { "http" } else { "https" };
        let base_url = parse_base_url(&format!("{scheme}://{}/pulp/api/{API_VERSION}/", self.host))?;
        Ok(Client {
            transport,
            base_url,
            user_agent: self.user_agent,
            credentials: self.credentials.unwrap_or_default(),
        })
    }
}

/// Client for one Pulp server.
#[derive(Debug, Clone)]
pub struct Client<T = UreqTransport> {
    transport: T,
    base_url: Url,
    user_agent: String,
    credentials: Credentials,
}

impl Client {
    pub fn builder(host: impl Into<String>) -> ClientBuilder {
        ClientBuilder::new(host.into())
    }
}

impl<T: Transport> Client<T> {
    /// Client for an explicit API root such as
    /// `http://localhost:8080/pulp/api/v2/`, with the default user agent and
    /// fallback credentials.
    pub fn with_base_url(base_url: &str, transport: T) -> Result<Self, Error> {
        Ok(Self {
            transport,
            base_url: parse_base_url(base_url)?,
            user_agent: DEFAULT_USER_AGENT.to_string(),
            credentials: Credentials::default(),
        })
    }

    pub fn with_credentials(mut self, credentials: Credentials) -> Self {
        self.credentials = credentials;
        self
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Points the client at another API root. A trailing `/` is added when
    /// missing so relative resource paths land under it.
    pub fn set_base_url(&mut self, base_url: &str) -> Result<(), Error> {
        self.base_url = parse_base_url(base_url)?;
        Ok(())
    }

    pub fn user_agent(&self) -> &str {
        &self.user_agent
    }

    pub fn credentials(&self) -> &Credentials {
        &self.credentials
    }

    pub fn repositories(&self) -> RepositoriesService<'_, T> {
        RepositoriesService::new(self)
    }

    pub fn tasks(&self) -> TasksService<'_, T> {
        TasksService::new(self)
    }

    pub fn units(&self) -> UnitsService<'_, T> {
        UnitsService::new(self)
    }

    /// Builds a request without options.
    pub fn new_request(&self, method: HttpMethod, path: &str) -> HttpRequest {
        let mut headers = Vec::new();
        let body = if method.is_write() {
            headers.push(("Content-Type".to_string(), "application/json".to_string()));
            Some(b"{}".to_vec())
        } else {
            None
        };
        self.finish_request(method, self.resolve(path), headers, body)
    }

    /// Builds a request carrying `options`: as the query string for read
    /// methods, as the JSON body for write methods.
    pub fn new_request_with<O>(&self, method: HttpMethod, path: &str, options: &O) -> Result<HttpRequest, Error>
    where
        O: Serialize + ?Sized,
    {
        let mut url = self.resolve(path);
        let mut headers = Vec::new();

        let body = if method.is_write() {
            let body = serde_json::to_vec(options).map_err(Error::EncodeBody)?;
            headers.push(("Content-Type".to_string(), "application/json".to_string()));
            Some(body)
        } else {
            let query = serde_urlencoded::to_string(options)?;
            if !query.is_empty() {
                url.push('?');
                url.push_str(&query);
            }
            None
        };

        Ok(self.finish_request(method, url, headers, body))
    }

    /// Sends `request` and decodes a 2xx JSON body into `D`.
    pub fn execute<D: DeserializeOwned>(&self, request: &HttpRequest) -> Result<(D, Response), Error> {
        let http = self.send(request)?;
        let response = Response::from_http(&http);
        match serde_json::from_reader(http.body) {
            Ok(value) => Ok((value, response)),
            Err(source) => Err(Error::Decode {
                source,
                response: Box::new(response),
            }),
        }
    }

    /// Sends `request` and copies a 2xx body into `sink` byte for byte.
    pub fn execute_streaming<W>(&self, request: &HttpRequest, sink: &mut W) -> Result<Response, Error>
    where
        W: Write + ?Sized,
    {
        let mut http = self.send(request)?;
        let response = Response::from_http(&http);
        match io::copy(&mut http.body, sink) {
            Ok(copied) => {
                debug!(bytes = copied, "streamed response body");
                Ok(response)
            }
            Err(source) => Err(Error::Io {
                source,
                response: Box::new(response),
            }),
        }
    }

    fn send(&self, request: &HttpRequest) -> Result<HttpResponse, Error> {
        debug!(method = %request.method, url = %request.url, "sending request");
        let response = self.transport.send(request).map_err(Error::Transport)?;
        debug!(status = response.status, "received response");
        check_response(request, response)
    }

    fn resolve(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn finish_request(
        &self,
        method: HttpMethod,
        url: String,
        mut headers: Vec<(String, String)>,
        body: Option<Vec<u8>>,
    ) -> HttpRequest {
        headers.push(("Accept".to_string(), "application/json".to_string()));
        headers.push(("Authorization".to_string(), self.credentials.authorization()));
        if !self.user_agent.is_empty() {
            headers.push(("User-Agent".to_string(), self.user_agent.clone()));
        }
        HttpRequest {
            method,
            url,
            headers,
            body,
        }
    }
}

fn parse_base_url(raw: &str) -> Result<Url, Error> {
    let mut raw = raw.to_string();
    if !raw.ends_with('/') {
        raw.push('/');
    }
    Url::parse(&raw).map_err(|source| Error::InvalidBaseUrl { url: raw, source })
}
