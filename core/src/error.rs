//! Error types for the Pulp API client.
//!
//! # Design
//! Every failure class gets its own variant so callers can tell "the server
//! said no" (`Api`) apart from "the server said yes but sent garbage"
//! (`Decode`) and from failures that happen before a request is ever sent.
//! Non-2xx responses always become an `ErrorResponse` that keeps the HTTP
//! context (method, URL, status, headers, pagination) even when the body is
//! not a parseable error payload.

use std::fmt;
use std::io::Read;

use serde::{Deserialize, Serialize};

use crate::de::null_as_default;
use crate::http::{HttpMethod, HttpRequest, HttpResponse, Response, TransportError};

/// Errors returned by `Client` and the resource services.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The configured endpoint is not a valid absolute URL.
    #[error("invalid base url {url:?}: {source}")]
    InvalidBaseUrl {
        url: String,
        #[source]
        source: url::ParseError,
    },

    /// Options could not be flattened into a query string.
    #[error("failed to encode query string: {0}")]
    EncodeQuery(#[from] serde_urlencoded::ser::Error),

    /// Options could not be serialized as a JSON body.
    #[error("failed to encode request body: {0}")]
    EncodeBody(#[source] serde_json::Error),

    /// The request never produced a response.
    #[error("transport error: {0}")]
    Transport(#[source] TransportError),

    /// The server answered with a non-2xx status.
    #[error(transparent)]
    Api(Box<ErrorResponse>),

    /// A 2xx response whose body does not match the expected shape.
    #[error("failed to decode response body: {source}")]
    Decode {
        #[source]
        source: serde_json::Error,
        response: Box<Response>,
    },

    /// Copying a 2xx response body into a caller-supplied sink failed.
    #[error("failed to copy response body: {source}")]
    Io {
        #[source]
        source: std::io::Error,
        response: Box<Response>,
    },
}

impl Error {
    /// The HTTP response, for errors raised after one was received.
    pub fn response(&self) -> Option<&Response> {
        match self {
            Error::Api(err) => Some(&err.response),
            Error::Decode { response, .. } | Error::Io { response, .. } => Some(response),
            _ => None,
        }
    }

    pub fn status(&self) -> Option<u16> {
        self.response().map(|r| r.status)
    }
}

/// Field-level validation failure reported by the server.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FieldError {
    /// Resource on which the error occurred.
    #[serde(deserialize_with = "null_as_default")]
    pub resource: String,
    /// Field on which the error occurred.
    #[serde(deserialize_with = "null_as_default")]
    pub field: String,
    /// Validation error code.
    #[serde(deserialize_with = "null_as_default")]
    pub code: String,
}

impl fmt::Display for FieldError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} error caused by {} field on {} resource",
            self.code, self.field, self.resource
        )
    }
}

impl std::error::Error for FieldError {}

/// A non-2xx response, classified.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ErrorResponse {
    pub method: HttpMethod,
    pub url: String,
    pub response: Response,
    pub message: String,
    pub errors: Vec<FieldError>,
}

impl ErrorResponse {
    pub fn status(&self) -> u16 {
        self.response.status
    }

    /// `scheme://host/path` with the path unescaped and the query dropped.
    fn display_url(&self) -> String {
        let Ok(url) = url::Url::parse(&self.url) else {
            return self.url.clone();
        };
        let path = urlencoding::decode(url.path())
            .map(|p| p.into_owned())
            .unwrap_or_else(|_| url.path().to_string());
        let host = url.host_str().unwrap_or_default();
        match url.port() {
            Some(port) => format!("{}://{host}:{port}{path}", url.scheme()),
            None => format!("{}://{host}{path}", url.scheme()),
        }
    }
}

impl fmt::Display for ErrorResponse {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {}: {} {} [",
            self.method,
            self.display_url(),
            self.status(),
            self.message
        )?;
        for (i, err) in self.errors.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{err}")?;
        }
        f.write_str("]")
    }
}

impl std::error::Error for ErrorResponse {}

/// Error payload as sent by the server. Older endpoints use
/// `error_message` instead of `message`.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct ErrorBody {
    #[serde(alias = "error_message", deserialize_with = "null_as_default")]
    message: String,
    #[serde(deserialize_with = "null_as_default")]
    errors: Vec<FieldError>,
}

/// Passes 2xx responses through untouched. Anything else is drained and
/// turned into an `Error::Api`; a body that is not an error payload leaves
/// `message` and `errors` empty but keeps the status.
pub fn check_response(request: &HttpRequest, mut response: HttpResponse) -> Result<HttpResponse, Error> {
    if (200..=299).contains(&response.status) {
        return Ok(response);
    }

    let mut data = Vec::new();
    let body = match response.body.read_to_end(&mut data) {
        Ok(_) => serde_json::from_slice::<ErrorBody>(&data).unwrap_or_default(),
        Err(_) => ErrorBody::default(),
    };

    Err(Error::Api(Box::new(ErrorResponse {
        method: request.method,
        url: request.url.clone(),
        response: Response::from_http(&response),
        message: body.message,
        errors: body.errors,
    })))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request() -> HttpRequest {
        HttpRequest {
            method: HttpMethod::Get,
            url: "https://pulp.example.com/pulp/api/v2/repositories/my%20repo/?details=true".to_string(),
            headers: Vec::new(),
            body: None,
        }
    }

    #[test]
    fn success_statuses_pass_through() {
        for status in [200, 201, 202, 204, 299] {
            let response = HttpResponse::from_bytes(status, Vec::new(), "");
            let checked = check_response(&request(), response).unwrap();
            assert_eq!(checked.status, status);
        }
    }

    #[test]
    fn failure_statuses_are_classified() {
        for status in [100, 199, 300, 301, 400, 404, 409, 500, 503] {
            let response = HttpResponse::from_bytes(status, Vec::new(), "");
            let err = check_response(&request(), response).unwrap_err();
            assert_eq!(err.status(), Some(status));
            assert!(matches!(err, Error::Api(_)));
        }
    }

    #[test]
    fn error_payload_is_parsed() {
        let body = r#"{"message":"invalid repo","errors":[{"resource":"repository","field":"id","code":"invalid"}]}"#;
        let response = HttpResponse::from_bytes(400, Vec::new(), body);
        let Error::Api(err) = check_response(&request(), response).unwrap_err() else {
            panic!("expected api error");
        };
        assert_eq!(err.message, "invalid repo");
        assert_eq!(
            err.errors,
            vec![FieldError {
                resource: "repository".to_string(),
                field: "id".to_string(),
                code: "invalid".to_string(),
            }]
        );
    }

    #[test]
    fn error_message_alias_is_accepted() {
        let body = r#"{"http_status":404,"error_message":"Missing resource(s): repository=foo"}"#;
        let response = HttpResponse::from_bytes(404, Vec::new(), body);
        let Error::Api(err) = check_response(&request(), response).unwrap_err() else {
            panic!("expected api error");
        };
        assert_eq!(err.message, "Missing resource(s): repository=foo");
    }

    #[test]
    fn null_fields_in_error_payload_are_tolerated() {
        let body = r#"{"message":null,"errors":[{"resource":"repository","field":null,"code":null}]}"#;
        let response = HttpResponse::from_bytes(400, Vec::new(), body);
        let Error::Api(err) = check_response(&request(), response).unwrap_err() else {
            panic!("expected api error");
        };
        assert!(err.message.is_empty());
        assert_eq!(
            err.errors,
            vec![FieldError {
                resource: "repository".to_string(),
                ..FieldError::default()
            }]
        );
    }

    #[test]
    fn unparseable_body_keeps_status() {
        let response = HttpResponse::from_bytes(502, Vec::new(), "<html>bad gateway</html>");
        let Error::Api(err) = check_response(&request(), response).unwrap_err() else {
            panic!("expected api error");
        };
        assert_eq!(err.status(), 502);
        assert!(err.message.is_empty());
        assert!(err.errors.is_empty());
    }

    #[test]
    fn api_error_keeps_pagination_headers() {
        let headers = vec![("Link".to_string(), r#"<http://x/?page=2>; rel="next""#.to_string())];
        let response = HttpResponse::from_bytes(500, headers, "{}");
        let err = check_response(&request(), response).unwrap_err();
        assert_eq!(err.response().unwrap().next_page, Some(2));
    }

    #[test]
    fn display_includes_request_context() {
        let body = r#"{"message":"bad","errors":[{"resource":"repository","field":"id","code":"invalid"}]}"#;
        let response = HttpResponse::from_bytes(400, Vec::new(), body);
        let err = check_response(&request(), response).unwrap_err();
        assert_eq!(
            err.to_string(),
            "GET https://pulp.example.com/pulp/api/v2/repositories/my repo/: 400 bad \
             [invalid error caused by id field on repository resource]"
        );
    }

    #[test]
    fn display_keeps_explicit_port() {
        let mut req = request();
        req.url = "http://127.0.0.1:8080/pulp/api/v2/tasks/".to_string();
        let response = HttpResponse::from_bytes(404, Vec::new(), r#"{"message":"not found"}"#);
        let err = check_response(&req, response).unwrap_err();
        assert_eq!(err.to_string(), "GET http://127.0.0.1:8080/pulp/api/v2/tasks/: 404 not found []");
    }

    #[test]
    fn field_error_display() {
        let err = FieldError {
            resource: "unit".to_string(),
            field: "name".to_string(),
            code: "missing".to_string(),
        };
        assert_eq!(err.to_string(), "missing error caused by name field on unit resource");
    }
}
