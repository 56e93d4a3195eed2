// Copyright (c) 2024 The Web eID Project

//! Selection of the OCSP responder for a subject certificate

use const_oid::AssociatedOid;
use der::Decode;
use url::Url;
use x509_cert::ext::pkix::name::GeneralName;
use x509_cert::ext::pkix::AuthorityInfoAccessSyntax;
use x509_cert::Certificate;

use super::types::ID_AD_OCSP;
use crate::certificate::checks::extension_value;
use crate::config::ValidationConfig;
use crate::error::{Error, Result};

/// The responder chosen for one revocation check
#[derive(Debug, Clone)]
pub struct OcspService {
    /// Access URL of the responder
    pub url: Url,
    /// Whether the request carries the nonce extension
    pub nonce_enabled: bool,
    /// The pinned certificate when the designated responder was selected
    pub pinned_responder: Option<Certificate>,
}

/// Choose the designated responder when it supports the subject's issuer,
/// otherwise fall back to the certificate's AIA extension.
pub fn select_service(config: &ValidationConfig, subject: &Certificate) -> Result<OcspService> {
    if let Some(designated) = &config.designated_ocsp_service {
        if designated
            .supported_issuers
            .contains(&subject.tbs_certificate.issuer)
        {
            return Ok(OcspService {
                url: designated.url.clone(),
                nonce_enabled: designated.supports_nonce,
                pinned_responder: Some(designated.responder_certificate.clone()),
            });
        }
    }

    let url = aia_ocsp_url(subject)?;
    let nonce_enabled = !config.nonce_disabled_ocsp_urls.contains(&url);
    Ok(OcspService {
        url,
        nonce_enabled,
        pinned_responder: None,
    })
}

/// Extract the first id-ad-ocsp URI from the Authority Information Access
/// extension. Additional OCSP URIs are ignored.
pub fn aia_ocsp_url(cert: &Certificate) -> Result<Url> {
    let der =
        extension_value(cert, &AuthorityInfoAccessSyntax::OID).ok_or(Error::OcspUrlMissing)?;
    let aia = AuthorityInfoAccessSyntax::from_der(der).map_err(|_| Error::OcspUrlMissing)?;

    let uri = aia
        .0
        .iter()
        .filter(|access| access.access_method == ID_AD_OCSP)
        .find_map(|access| match &access.access_location {
            GeneralName::UniformResourceIdentifier(uri) => Some(uri.as_str()),
            _ => None,
        })
        .ok_or(Error::OcspUrlMissing)?;

    Url::parse(uri).map_err(|_| Error::OcspUrlMissing)
}
