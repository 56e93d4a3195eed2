// Copyright (c) 2024 The Web eID Project

//! Checks applied to the user certificate before trust and revocation are
//! consulted

use core::time::Duration;

use const_oid::{AssociatedOid, ObjectIdentifier};
use der::Decode;
use x509_cert::ext::pkix::{CertificatePolicies, ExtendedKeyUsage, KeyUsage, KeyUsages};
use x509_cert::Certificate;

use crate::error::{Error, Result};

/// id-kp-clientAuth, required of authentication certificates
pub const ID_KP_CLIENT_AUTH: ObjectIdentifier = ObjectIdentifier::new_unwrap("1.3.6.1.5.5.7.3.2");
/// id-kp-OCSPSigning, required of AIA OCSP responder certificates
pub const ID_KP_OCSP_SIGNING: ObjectIdentifier = ObjectIdentifier::new_unwrap("1.3.6.1.5.5.7.3.9");

/// Find an extension of `cert` by OID and return its DER value.
pub(crate) fn extension_value<'a>(cert: &'a Certificate, oid: &ObjectIdentifier) -> Option<&'a [u8]> {
    cert.tbs_certificate
        .extensions
        .as_ref()?
        .iter()
        .find(|ext| &ext.extn_id == oid)
        .map(|ext| ext.extn_value.as_bytes())
}

/// Require that `cert` is an authentication certificate: KeyUsage includes
/// digitalSignature and ExtendedKeyUsage includes clientAuth.
pub fn validate_purpose(cert: &Certificate) -> Result<()> {
    let key_usage = extension_value(cert, &KeyUsage::OID)
        .and_then(|der| KeyUsage::from_der(der).ok())
        .ok_or(Error::CertificatePurposeInvalid)?;
    if !key_usage.0.contains(KeyUsages::DigitalSignature) {
        return Err(Error::CertificatePurposeInvalid);
    }

    if !has_extended_key_usage(cert, &ID_KP_CLIENT_AUTH) {
        return Err(Error::CertificatePurposeInvalid);
    }
    Ok(())
}

/// Whether `cert` carries the given extended key usage.
pub fn has_extended_key_usage(cert: &Certificate, usage: &ObjectIdentifier) -> bool {
    extension_value(cert, &ExtendedKeyUsage::OID)
        .and_then(|der| ExtendedKeyUsage::from_der(der).ok())
        .map(|eku| eku.0.contains(usage))
        .unwrap_or(false)
}

/// Require `notBefore ≤ now ≤ notAfter`, both boundaries inclusive, with
/// `now` as unix seconds in UTC.
pub fn validate_validity(cert: &Certificate, now: Duration) -> Result<()> {
    let validity = &cert.tbs_certificate.validity;
    if now < validity.not_before.to_unix_duration() {
        return Err(Error::CertificateNotYetValid);
    }
    if now > validity.not_after.to_unix_duration() {
        return Err(Error::CertificateExpired);
    }
    Ok(())
}

/// Require that no certificate policy of `cert` appears in `disallowed`.
///
/// A certificate without a certificatePolicies extension passes.
pub fn validate_policies(cert: &Certificate, disallowed: &[ObjectIdentifier]) -> Result<()> {
    let Some(der) = extension_value(cert, &CertificatePolicies::OID) else {
        return Ok(());
    };
    let policies = CertificatePolicies::from_der(der)
        .map_err(|_| Error::TokenParse("invalid certificatePolicies extension".into()))?;
    for policy in &policies.0 {
        if disallowed.contains(&policy.policy_identifier) {
            return Err(Error::CertificateDisallowedPolicy(
                policy.policy_identifier.to_string(),
            ));
        }
    }
    Ok(())
}
