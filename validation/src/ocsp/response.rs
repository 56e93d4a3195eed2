// Copyright (c) 2024 The Web eID Project

//! Validation of OCSP responses

use core::time::Duration;

use der::asn1::OctetString;
use der::{Decode, Encode};
use sha1::{Digest, Sha1};
use subtle::ConstantTimeEq;
use tracing::debug;
use x509_cert::Certificate;

use super::service::OcspService;
use super::types::{
    reason_name, BasicOcspResponse, CertId, CertStatus, OcspResponse, OcspResponseStatus,
    ResponderId, ResponseData, SingleResponse, ID_PKIX_OCSP_BASIC, ID_PKIX_OCSP_NONCE,
};
use crate::certificate::algorithm::{self, PublicKey, SignatureScheme};
use crate::certificate::checks::{self, ID_KP_OCSP_SIGNING};
use crate::certificate::trust;
use crate::error::{Error, Result};

/// Maximum allowed clock skew between `producedAt` and the update interval
pub const ALLOWED_TIME_SKEW: Duration = Duration::from_secs(900);

/// What the response must match to be accepted
#[derive(Debug)]
pub struct ResponseExpectations<'a> {
    /// The CertID sent in the request
    pub cert_id: &'a CertId,
    /// The request nonce, when one was sent
    pub nonce: Option<&'a [u8]>,
    /// The responder the request went to
    pub service: &'a OcspService,
    /// Trust anchors for AIA responder certificates
    pub trusted_cas: &'a [Certificate],
}

fn malformed(e: der::Error) -> Error {
    Error::OcspResponseMalformed(e.to_string())
}

/// Validate a raw DER OCSP response against `expectations`.
///
/// The checks run in a fixed order and the first failure is returned:
/// response status, response type, responder identity, response signature,
/// CertID match, nonce, freshness and finally the certificate status.
pub fn validate_response(raw: &[u8], expectations: &ResponseExpectations<'_>) -> Result<()> {
    let response = OcspResponse::from_der(raw).map_err(malformed)?;
    if response.response_status != OcspResponseStatus::Successful {
        return Err(Error::OcspResponseInvalidStatus(
            response.response_status as u32,
        ));
    }

    let response_bytes = response
        .response_bytes
        .ok_or_else(|| Error::OcspResponseMalformed("missing responseBytes".into()))?;
    if response_bytes.response_type != ID_PKIX_OCSP_BASIC {
        return Err(Error::OcspResponseInvalidType(
            response_bytes.response_type.to_string(),
        ));
    }
    let basic = BasicOcspResponse::from_der(response_bytes.response.as_bytes()).map_err(malformed)?;
    let produced_at = basic.tbs_response_data.produced_at.to_unix_duration();

    let responder = find_responder_certificate(&basic, expectations.service)?;
    match &expectations.service.pinned_responder {
        Some(pinned) => verify_pinned_responder(&responder, pinned)?,
        None => verify_aia_responder(&responder, expectations.trusted_cas, produced_at)?,
    }

    verify_response_signature(&basic, &responder)?;

    let single = single_response(&basic, expectations.cert_id)?;

    if let Some(nonce) = expectations.nonce {
        check_nonce(&basic.tbs_response_data, nonce)?;
    }

    check_freshness(single, produced_at)?;

    match &single.cert_status {
        CertStatus::Good(_) => {
            debug!("certificate status is good");
            Ok(())
        }
        CertStatus::Revoked(info) => Err(Error::CertificateRevoked {
            reason: info
                .revocation_reason
                .map(reason_name)
                .unwrap_or("unspecified")
                .to_string(),
        }),
        CertStatus::Unknown(_) => Err(Error::CertificateRevoked {
            reason: "unknown".to_string(),
        }),
    }
}

/// Locate the certificate named by `responderID` among the response's
/// `certs`.
///
/// A designated service may omit `certs` entirely, in which case the pinned
/// certificate stands in; the pinning comparison and the signature check
/// then still have to hold against it.
fn find_responder_certificate(
    basic: &BasicOcspResponse,
    service: &OcspService,
) -> Result<Certificate> {
    let certs = basic.certs.as_deref().unwrap_or(&[]);
    let found = match &basic.tbs_response_data.responder_id {
        ResponderId::ByName(name) => certs.iter().find(|cert| &cert.tbs_certificate.subject == name),
        ResponderId::ByKey(key_hash) => certs.iter().find(|cert| {
            let key = cert
                .tbs_certificate
                .subject_public_key_info
                .subject_public_key
                .raw_bytes();
            Sha1::digest(key).as_slice() == key_hash.as_bytes()
        }),
    };

    match found {
        Some(certificate) => Ok(certificate.clone()),
        None => match &service.pinned_responder {
            Some(pinned) if certs.is_empty() => Ok(pinned.clone()),
            _ => Err(Error::OcspResponderCertificateMissing),
        },
    }
}

/// Designated mode: the responder certificate must be byte-equal to the
/// pinned one. The comparison is constant-time over the DER encodings.
fn verify_pinned_responder(responder: &Certificate, pinned: &Certificate) -> Result<()> {
    let responder_der = responder.to_der().map_err(malformed)?;
    let pinned_der = pinned.to_der().map_err(malformed)?;
    if bool::from(responder_der.as_slice().ct_eq(pinned_der.as_slice())) {
        Ok(())
    } else {
        Err(Error::OcspResponderMismatch)
    }
}

/// AIA mode: the responder certificate must be issued by a trusted CA,
/// valid at `producedAt` and authorized for OCSP signing.
fn verify_aia_responder(
    responder: &Certificate,
    trusted_cas: &[Certificate],
    produced_at: Duration,
) -> Result<()> {
    trust::find_issuer(responder, trusted_cas)?;
    checks::validate_validity(responder, produced_at)?;
    if !checks::has_extended_key_usage(responder, &ID_KP_OCSP_SIGNING) {
        return Err(Error::OcspResponderNotAuthorized);
    }
    Ok(())
}

/// Verify the response signature over the DER-encoded `tbsResponseData`.
fn verify_response_signature(basic: &BasicOcspResponse, responder: &Certificate) -> Result<()> {
    let key = PublicKey::try_from(&responder.tbs_certificate.subject_public_key_info)
        .map_err(|_| Error::OcspResponseSignatureInvalid)?;
    let scheme = SignatureScheme::try_from(&basic.signature_algorithm).map_err(|e| match e {
        algorithm::Error::UnsupportedAlgorithm(oid) => Error::UnsupportedAlgorithm(oid),
        _ => Error::OcspResponseSignatureInvalid,
    })?;
    let tbs = basic.tbs_response_data.to_der().map_err(malformed)?;
    let signature = basic
        .signature
        .as_bytes()
        .ok_or(Error::OcspResponseSignatureInvalid)?;
    key.verify(&tbs, signature, scheme)
        .map_err(|_| Error::OcspResponseSignatureInvalid)
}

/// The response must carry exactly one `SingleResponse` and its CertID must
/// equal the one sent in the request, all four fields included.
fn single_response<'a>(basic: &'a BasicOcspResponse, cert_id: &CertId) -> Result<&'a SingleResponse> {
    let single = match basic.tbs_response_data.responses.as_slice() {
        [single] => single,
        _ => {
            return Err(Error::OcspResponseMalformed(
                "expected a single response entry".into(),
            ))
        }
    };
    if &single.cert_id != cert_id {
        return Err(Error::OcspCertIdMismatch);
    }
    Ok(single)
}

/// When the request carried a nonce, the response must carry an equal one.
fn check_nonce(data: &ResponseData, expected: &[u8]) -> Result<()> {
    let extension = data
        .response_extensions
        .as_ref()
        .and_then(|extensions| {
            extensions
                .iter()
                .find(|extension| extension.extn_id == ID_PKIX_OCSP_NONCE)
        })
        .ok_or(Error::OcspNonceMismatch)?;
    let value =
        OctetString::from_der(extension.extn_value.as_bytes()).map_err(|_| Error::OcspNonceMismatch)?;
    if value.as_bytes() != expected {
        return Err(Error::OcspNonceMismatch);
    }
    Ok(())
}

/// Freshness relative to `producedAt`:
/// `thisUpdate ≤ producedAt + skew` and
/// `producedAt − skew ≤ (nextUpdate ?? thisUpdate)`.
fn check_freshness(single: &SingleResponse, produced_at: Duration) -> Result<()> {
    let this_update = single.this_update.to_unix_duration();
    if this_update > produced_at + ALLOWED_TIME_SKEW {
        return Err(Error::OcspStaleResponse);
    }
    let valid_until = single
        .next_update
        .map(|next_update| next_update.to_unix_duration())
        .unwrap_or(this_update);
    if produced_at > valid_until + ALLOWED_TIME_SKEW {
        return Err(Error::OcspStaleResponse);
    }
    Ok(())
}
