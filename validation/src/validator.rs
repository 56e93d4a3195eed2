// Copyright (c) 2024 The Web eID Project

//! The validation pipeline orchestrator

use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use tracing::debug;
use x509_cert::Certificate;

use crate::certificate::algorithm::PublicKey;
use crate::certificate::{checks, trust};
use crate::config::ValidationConfig;
use crate::error::{Error, Result};
use crate::ocsp::client::{HttpTransport, OcspTransport};
use crate::ocsp::response::ResponseExpectations;
use crate::ocsp::{request, response, service};
use crate::signature::{self, Algorithm};
use crate::token::AuthToken;

/// Validates Web eID authentication tokens against an immutable
/// configuration.
///
/// A validator is safe to share and invoke concurrently; every call
/// operates on its own per-request state, and the only blocking I/O is the
/// OCSP exchange, bounded by the configured timeout.
#[derive(Debug)]
pub struct AuthTokenValidator {
    config: ValidationConfig,
    transport: Arc<dyn OcspTransport>,
}

impl AuthTokenValidator {
    /// Create a validator that reaches OCSP responders over HTTP.
    pub fn new(config: ValidationConfig) -> Result<Self> {
        let transport = Arc::new(HttpTransport::new(config.ocsp_request_timeout)?);
        Ok(Self { config, transport })
    }

    /// Create a validator with a caller-provided OCSP transport.
    pub fn with_transport(config: ValidationConfig, transport: Arc<dyn OcspTransport>) -> Self {
        Self { config, transport }
    }

    /// The configuration this validator was built with.
    pub fn config(&self) -> &ValidationConfig {
        &self.config
    }

    /// Validate `token` against the current time.
    ///
    /// On success the user's authenticated certificate is returned; the
    /// subject it names is the authenticated identity.
    pub fn validate(&self, token: &AuthToken, challenge_nonce: &[u8]) -> Result<Certificate> {
        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map_err(|_| Error::Configuration("system clock is before the unix epoch".into()))?;
        self.validate_at(token, challenge_nonce, now)
    }

    /// Validate `token` with an explicit `now` as unix seconds in UTC.
    ///
    /// The checks run in a fixed order and the first failure aborts the
    /// pipeline: challenge presence, certificate parsing, certificate
    /// purpose, validity window, policy exclusion, trust, revocation
    /// (unless disabled) and finally the token signature.
    pub fn validate_at(
        &self,
        token: &AuthToken,
        challenge_nonce: &[u8],
        now: Duration,
    ) -> Result<Certificate> {
        if challenge_nonce.is_empty() {
            return Err(Error::ChallengeEmpty);
        }

        let certificate = token.decode_certificate()?;
        debug!(subject = %certificate.tbs_certificate.subject, "validating authentication token");

        checks::validate_purpose(&certificate)?;
        checks::validate_validity(&certificate, now)?;
        checks::validate_policies(&certificate, &self.config.disallowed_policies)?;
        let issuer = trust::find_issuer(&certificate, &self.config.trusted_cas)?;
        debug!(issuer = %issuer.tbs_certificate.subject, "user certificate is trusted");

        if self.config.disable_ocsp {
            debug!("revocation checking is disabled");
        } else {
            self.check_revocation(&certificate, issuer)?;
        }

        let algorithm: Algorithm = token.algorithm.parse()?;
        let public_key = PublicKey::try_from(&certificate.tbs_certificate.subject_public_key_info)
            .map_err(|_| Error::CertificateKeyUnsupported)?;
        signature::verify_token_signature(
            algorithm,
            &token.signature,
            &public_key,
            &self.config.origin,
            challenge_nonce,
        )?;
        debug!("token signature verified");

        Ok(certificate)
    }

    /// Run the OCSP round-trip for `certificate` under `issuer`.
    fn check_revocation(&self, certificate: &Certificate, issuer: &Certificate) -> Result<()> {
        let service = service::select_service(&self.config, certificate)?;
        let nonce = service.nonce_enabled.then(request::generate_nonce);

        let cert_id = request::cert_id(certificate, issuer)?;
        let request_der = request::build_request(cert_id.clone(), nonce.as_ref().map(|n| n.as_slice()))?;

        let raw = self.transport.fetch(&service.url, &request_der)?;
        response::validate_response(
            &raw,
            &ResponseExpectations {
                cert_id: &cert_id,
                nonce: nonce.as_ref().map(|n| n.as_slice()),
                service: &service,
                trusted_cas: &self.config.trusted_cas,
            },
        )
    }
}
