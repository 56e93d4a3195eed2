// Copyright (c) 2024 The Web eID Project

//! Single-hop trust verification of a certificate against a configured set
//! of trusted intermediate CAs

use der::Encode;
use x509_cert::Certificate;

use super::algorithm::{PublicKey, SignatureScheme};
use crate::error::{Error, Result};

/// Find the trusted CA that issued `subject` and verify the issuing
/// signature.
///
/// Candidates are the trusted certificates whose subject name equals the
/// subject certificate's issuer name. The first candidate whose public key
/// verifies the signature over `subject.tbsCertificate` is returned. The
/// search is single-hop: the trusted set is expected to contain the direct
/// issuers, and roots above them are not consulted.
pub fn find_issuer<'a>(
    subject: &Certificate,
    trusted: &'a [Certificate],
) -> Result<&'a Certificate> {
    let candidates = trusted
        .iter()
        .filter(|ca| ca.tbs_certificate.subject == subject.tbs_certificate.issuer);

    for candidate in candidates {
        if verify_issued_by(subject, candidate).is_ok() {
            return Ok(candidate);
        }
    }
    Err(Error::CertificateNotTrusted)
}

/// Verify that `issuer` signed `subject`.
///
/// The signed message is the DER encoding of `tbsCertificate`; re-encoding
/// the decoded structure is canonical, so it reproduces the signed bytes.
pub fn verify_issued_by(subject: &Certificate, issuer: &Certificate) -> Result<()> {
    let key = PublicKey::try_from(&issuer.tbs_certificate.subject_public_key_info)
        .map_err(|_| Error::CertificateNotTrusted)?;
    let scheme = SignatureScheme::try_from(&subject.signature_algorithm)
        .map_err(|_| Error::CertificateNotTrusted)?;
    let tbs = subject
        .tbs_certificate
        .to_der()
        .map_err(|_| Error::CertificateNotTrusted)?;
    let signature = subject
        .signature
        .as_bytes()
        .ok_or(Error::CertificateNotTrusted)?;
    key.verify(&tbs, signature, scheme)
        .map_err(|_| Error::CertificateNotTrusted)
}
