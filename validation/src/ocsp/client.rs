// Copyright (c) 2024 The Web eID Project

//! HTTP transport for OCSP requests

use std::time::Duration;

use tracing::debug;
use url::Url;

use crate::error::{Error, Result};

/// Content type of an OCSP request body
pub const OCSP_REQUEST_CONTENT_TYPE: &str = "application/ocsp-request";
/// Content type required of an OCSP response body
pub const OCSP_RESPONSE_CONTENT_TYPE: &str = "application/ocsp-response";

/// Transport used to exchange one DER-encoded OCSP request for a response.
///
/// The pipeline talks to the responder through this seam so tests can serve
/// canned responses and deployments can wrap the transport with their own
/// instrumentation.
pub trait OcspTransport: Send + Sync + std::fmt::Debug {
    /// POST `request` to `url` and return the raw response body.
    fn fetch(&self, url: &Url, request: &[u8]) -> Result<Vec<u8>>;
}

/// Blocking HTTP transport with the configured connect and response timeout.
#[derive(Debug)]
pub struct HttpTransport {
    client: reqwest::blocking::Client,
}

impl HttpTransport {
    /// Build a transport enforcing `timeout` for connecting and for the
    /// whole request/response exchange.
    pub fn new(timeout: Duration) -> Result<Self> {
        let client = reqwest::blocking::Client::builder()
            .timeout(timeout)
            .connect_timeout(timeout)
            .build()
            .map_err(|e| Error::OcspHttpError(e.to_string()))?;
        Ok(Self { client })
    }
}

impl OcspTransport for HttpTransport {
    fn fetch(&self, url: &Url, request: &[u8]) -> Result<Vec<u8>> {
        debug!(url = %url, "sending OCSP request");
        let response = self
            .client
            .post(url.clone())
            .header(reqwest::header::CONTENT_TYPE, OCSP_REQUEST_CONTENT_TYPE)
            .body(request.to_vec())
            .send()
            .map_err(transport_error)?;

        let status = response.status();
        if status != reqwest::StatusCode::OK {
            return Err(Error::OcspHttpError(format!(
                "unexpected HTTP status {status}"
            )));
        }
        let content_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .unwrap_or_default()
            .to_owned();
        if content_type != OCSP_RESPONSE_CONTENT_TYPE {
            return Err(Error::OcspHttpError(format!(
                "unexpected content type {content_type:?}"
            )));
        }

        let body = response.bytes().map_err(transport_error)?;
        Ok(body.to_vec())
    }
}

fn transport_error(e: reqwest::Error) -> Error {
    if e.is_timeout() {
        Error::OcspTimeout
    } else {
        Error::OcspHttpError(e.to_string())
    }
}
