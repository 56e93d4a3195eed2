// Copyright (c) 2024 The Web eID Project

//! Building OCSP requests for a subject certificate

use der::asn1::{Any, AnyRef, OctetString};
use der::Encode;
use rand_core::{OsRng, RngCore};
use sha1::{Digest, Sha1};
use x509_cert::ext::Extension;
use x509_cert::spki::AlgorithmIdentifierOwned;
use x509_cert::Certificate;

use super::types::{CertId, OcspRequest, Request, TbsRequest, Version, ID_PKIX_OCSP_NONCE, OID_SHA1};
use crate::error::{Error, Result};

/// Length of the request nonce in bytes (256 bits)
pub const NONCE_LEN: usize = 32;

fn build_error(e: der::Error) -> Error {
    Error::OcspRequestBuild(e.to_string())
}

/// Draw a fresh request nonce from the operating system CSPRNG.
pub fn generate_nonce() -> [u8; NONCE_LEN] {
    let mut nonce = [0u8; NONCE_LEN];
    OsRng.fill_bytes(&mut nonce);
    nonce
}

/// Compute the request `CertID` for `subject`, issued by `issuer`.
///
/// RFC 6960 Section 4.1.1 mandates SHA-1 here: the issuer name hash is taken over
/// the DER-encoded issuer subject name, the key hash over the issuer's
/// SubjectPublicKeyInfo BIT STRING content (excluding tag, length and the
/// unused-bits octet).
pub fn cert_id(subject: &Certificate, issuer: &Certificate) -> Result<CertId> {
    let issuer_name = issuer
        .tbs_certificate
        .subject
        .to_der()
        .map_err(build_error)?;
    let issuer_key = issuer
        .tbs_certificate
        .subject_public_key_info
        .subject_public_key
        .raw_bytes();

    Ok(CertId {
        hash_algorithm: AlgorithmIdentifierOwned {
            oid: OID_SHA1,
            parameters: Some(Any::from(AnyRef::NULL)),
        },
        issuer_name_hash: OctetString::new(Sha1::digest(&issuer_name).to_vec())
            .map_err(build_error)?,
        issuer_key_hash: OctetString::new(Sha1::digest(issuer_key).to_vec())
            .map_err(build_error)?,
        serial_number: subject.tbs_certificate.serial_number.clone(),
    })
}

/// Build a DER-encoded OCSPRequest with a single `Request` entry.
///
/// When `nonce` is given, the id-pkix-ocsp-nonce extension is added with the
/// nonce wrapped in a DER OCTET STRING; the caller retains the value for the
/// response check.
pub fn build_request(cert_id: CertId, nonce: Option<&[u8]>) -> Result<Vec<u8>> {
    let request_extensions = match nonce {
        Some(nonce) => {
            let value = OctetString::new(nonce)
                .map_err(build_error)?
                .to_der()
                .map_err(build_error)?;
            Some(vec![Extension {
                extn_id: ID_PKIX_OCSP_NONCE,
                critical: false,
                extn_value: OctetString::new(value).map_err(build_error)?,
            }])
        }
        None => None,
    };

    let request = OcspRequest {
        tbs_request: TbsRequest {
            version: Version::V1,
            requestor_name: None,
            request_list: vec![Request {
                req_cert: cert_id,
                single_request_extensions: None,
            }],
            request_extensions,
        },
        optional_signature: None,
    };
    request.to_der().map_err(build_error)
}
