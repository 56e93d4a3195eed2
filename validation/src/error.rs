// Copyright (c) 2024 The Web eID Project

//! Errors surfaced by the token-validation pipeline

/// Result type for token validation
pub type Result<T> = core::result::Result<T, Error>;

/// Error returned when an authentication token fails validation.
///
/// The pipeline is fail-fast: the first failing check produces the error and
/// no further checks run. Messages never contain signatures, nonces or key
/// material; certificate subject names and algorithm names are considered
/// safe to display.
#[derive(displaydoc::Display, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// Failed to parse the authentication token: {0}
    TokenParse(String),
    /// The challenge nonce is missing or empty
    ChallengeEmpty,
    /// Invalid validator configuration: {0}
    Configuration(String),
    /// The user certificate is not signed by a trusted CA
    CertificateNotTrusted,
    /// The certificate is not yet valid
    CertificateNotYetValid,
    /// The certificate has expired
    CertificateExpired,
    /// The certificate is not an authentication certificate
    CertificatePurposeInvalid,
    /// The certificate contains a disallowed policy: {0}
    CertificateDisallowedPolicy(String),
    /// The certificate has been revoked: {reason}
    CertificateRevoked {
        /// Revocation reason reported by the OCSP responder, or
        /// `unspecified` when the responder gave none.
        reason: String,
    },
    /// The certificate public key type is not supported
    CertificateKeyUnsupported,
    /// The certificate does not contain an OCSP URL in its AIA extension
    OcspUrlMissing,
    /// Failed to build the OCSP request: {0}
    OcspRequestBuild(String),
    /// OCSP request failed: {0}
    OcspHttpError(String),
    /// OCSP request timed out
    OcspTimeout,
    /// OCSP response status is not successful: {0}
    OcspResponseInvalidStatus(u32),
    /// OCSP response type is not id-pkix-ocsp-basic: {0}
    OcspResponseInvalidType(String),
    /// OCSP response does not contain a responder certificate
    OcspResponderCertificateMissing,
    /// OCSP responder certificate does not match the designated responder
    OcspResponderMismatch,
    /// OCSP responder certificate is not authorized for OCSP signing
    OcspResponderNotAuthorized,
    /// OCSP response signature verification failed
    OcspResponseSignatureInvalid,
    /// OCSP response certificate ID does not match the request
    OcspCertIdMismatch,
    /// OCSP response is outside the allowed time skew
    OcspStaleResponse,
    /// OCSP response nonce does not match the request nonce
    OcspNonceMismatch,
    /// Failed to decode the OCSP response: {0}
    OcspResponseMalformed(String),
    /// Unsupported signature algorithm: {0}
    UnsupportedAlgorithm(String),
    /// The token signature is malformed
    InvalidSignatureFormat,
    /// The token signature does not match the certificate and challenge
    TokenSignatureInvalid,
}

impl std::error::Error for Error {}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::TokenParse(e.to_string())
    }
}
