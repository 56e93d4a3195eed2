// Copyright (c) 2024 The Web eID Project

//! The authentication token submitted by the browser extension

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use der::Decode;
use serde::Deserialize;
use x509_cert::Certificate;

use crate::error::{Error, Result};

/// The Web eID authentication token wire format.
///
/// All fields arrive base64 or string encoded and unverified; nothing in
/// the token may be trusted before the validation pipeline has run. The
/// `format` field must be present but its value is not interpreted.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthToken {
    /// Base64-encoded DER of the user's X.509 authentication certificate
    pub unverified_certificate: String,
    /// JWS algorithm identifier, e.g. `ES384`
    pub algorithm: String,
    /// Base64-encoded signature over the origin/nonce binding
    pub signature: String,
    /// Token format marker, e.g. `web-eid:1.0`
    pub format: String,
}

impl AuthToken {
    /// Parse a token from its JSON wire form.
    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json).map_err(Error::from)
    }

    /// Decode the embedded certificate. The result is still untrusted.
    pub fn decode_certificate(&self) -> Result<Certificate> {
        let der = BASE64
            .decode(&self.unverified_certificate)
            .map_err(|e| Error::TokenParse(format!("invalid certificate base64: {e}")))?;
        Certificate::from_der(&der)
            .map_err(|e| Error::TokenParse(format!("invalid certificate: {e}")))
    }
}
