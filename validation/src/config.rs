// Copyright (c) 2024 The Web eID Project

//! Validator configuration, immutable after build

use std::collections::HashSet;
use std::time::Duration;

use const_oid::ObjectIdentifier;
use der::Decode;
use url::Url;
use x509_cert::name::Name;
use x509_cert::Certificate;

use crate::error::{Error, Result};

/// Default OCSP connect-and-response timeout
pub const DEFAULT_OCSP_REQUEST_TIMEOUT: Duration = Duration::from_secs(5);

/// A designated OCSP responder pinned by configuration.
///
/// When present and the subject certificate's issuer is in
/// `supported_issuers`, the designated responder is used instead of the URL
/// from the certificate's AIA extension, and the response must be signed by
/// exactly `responder_certificate`.
#[derive(Debug, Clone)]
pub struct DesignatedOcspServiceConfig {
    /// The pinned responder certificate
    pub responder_certificate: Certificate,
    /// Access URL of the responder
    pub url: Url,
    /// Issuer names the responder answers for
    pub supported_issuers: Vec<Name>,
    /// Whether the responder supports the nonce extension
    pub supports_nonce: bool,
}

/// Immutable configuration of the validation pipeline.
///
/// Built once with [`ValidationConfigBuilder`]; invariants are checked at
/// build time so reads need no further validation or locking.
#[derive(Debug, Clone)]
pub struct ValidationConfig {
    pub(crate) site_origin: Url,
    pub(crate) origin: String,
    pub(crate) trusted_cas: Vec<Certificate>,
    pub(crate) disallowed_policies: Vec<ObjectIdentifier>,
    pub(crate) ocsp_request_timeout: Duration,
    pub(crate) nonce_disabled_ocsp_urls: HashSet<Url>,
    pub(crate) designated_ocsp_service: Option<DesignatedOcspServiceConfig>,
    pub(crate) disable_ocsp: bool,
}

impl ValidationConfig {
    /// Start building a configuration
    pub fn builder() -> ValidationConfigBuilder {
        ValidationConfigBuilder::default()
    }

    /// The configured site origin URL
    pub fn site_origin(&self) -> &Url {
        &self.site_origin
    }

    /// The origin string hashed into the signed payload,
    /// `scheme://host[:port]` with no trailing slash
    pub fn origin(&self) -> &str {
        &self.origin
    }

    /// The trusted intermediate-CA certificates
    pub fn trusted_cas(&self) -> &[Certificate] {
        &self.trusted_cas
    }
}

/// Builder for [`ValidationConfig`]
#[derive(Debug, Default)]
pub struct ValidationConfigBuilder {
    site_origin: Option<Url>,
    trusted_cas: Vec<Certificate>,
    disallowed_policies: Vec<ObjectIdentifier>,
    ocsp_request_timeout: Option<Duration>,
    nonce_disabled_ocsp_urls: HashSet<Url>,
    designated_ocsp_service: Option<DesignatedOcspServiceConfig>,
    disable_ocsp: bool,
}

impl ValidationConfigBuilder {
    /// The origin of the relying web application; required.
    pub fn origin(mut self, origin: Url) -> Self {
        self.site_origin = Some(origin);
        self
    }

    /// Add trusted intermediate-CA certificates; at least one is required.
    pub fn trusted_cas(mut self, cas: impl IntoIterator<Item = Certificate>) -> Self {
        self.trusted_cas.extend(cas);
        self
    }

    /// Forbid a certificate policy OID in user certificates.
    pub fn disallow_policy(mut self, policy: ObjectIdentifier) -> Self {
        self.disallowed_policies.push(policy);
        self
    }

    /// Override the OCSP connect-and-response timeout (default 5 s).
    pub fn ocsp_request_timeout(mut self, timeout: Duration) -> Self {
        self.ocsp_request_timeout = Some(timeout);
        self
    }

    /// Omit the nonce extension for requests to the given responder URL.
    pub fn disable_nonce_for_url(mut self, url: Url) -> Self {
        self.nonce_disabled_ocsp_urls.insert(url);
        self
    }

    /// Use a designated responder for the issuers it supports.
    pub fn designated_ocsp_service(mut self, service: DesignatedOcspServiceConfig) -> Self {
        self.designated_ocsp_service = Some(service);
        self
    }

    /// Skip revocation checking entirely.
    pub fn disable_ocsp(mut self) -> Self {
        self.disable_ocsp = true;
        self
    }

    /// Validate the invariants and freeze the configuration.
    pub fn build(self) -> Result<ValidationConfig> {
        let site_origin = self
            .site_origin
            .ok_or_else(|| Error::Configuration("the site origin is required".into()))?;
        if !site_origin.has_host() {
            return Err(Error::Configuration(
                "the site origin must have a scheme and a host".into(),
            ));
        }
        let origin = site_origin.origin().ascii_serialization();
        if origin == "null" {
            return Err(Error::Configuration(
                "the site origin must be a http(s) URL".into(),
            ));
        }
        if self.trusted_cas.is_empty() {
            return Err(Error::Configuration(
                "at least one trusted CA certificate is required".into(),
            ));
        }

        Ok(ValidationConfig {
            site_origin,
            origin,
            trusted_cas: self.trusted_cas,
            disallowed_policies: self.disallowed_policies,
            ocsp_request_timeout: self
                .ocsp_request_timeout
                .unwrap_or(DEFAULT_OCSP_REQUEST_TIMEOUT),
            nonce_disabled_ocsp_urls: self.nonce_disabled_ocsp_urls,
            designated_ocsp_service: self.designated_ocsp_service,
            disable_ocsp: self.disable_ocsp,
        })
    }
}

/// Load certificates from a PEM bundle, in order of appearance.
pub fn certificates_from_pem(pem: &str) -> Result<Vec<Certificate>> {
    let mut certificates = Vec::new();
    for block in pem.split_inclusive("-----END CERTIFICATE-----") {
        let block = block.trim();
        if !block.contains("-----BEGIN CERTIFICATE-----") {
            continue;
        }
        let (label, der) = pem_rfc7468::decode_vec(block.as_bytes())
            .map_err(|e| Error::Configuration(format!("invalid PEM: {e}")))?;
        if label != "CERTIFICATE" {
            return Err(Error::Configuration(format!(
                "unexpected PEM label: {label}"
            )));
        }
        let certificate = Certificate::from_der(&der)
            .map_err(|e| Error::Configuration(format!("invalid certificate: {e}")))?;
        certificates.push(certificate);
    }
    if certificates.is_empty() {
        return Err(Error::Configuration(
            "no certificates found in the PEM input".into(),
        ));
    }
    Ok(certificates)
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::certificate::test_support::{ec_key_pair, issue_cert, CertSpec};
    use assert_matches::assert_matches;

    fn test_ca() -> Certificate {
        let (ca_key, ca_spki) = ec_key_pair();
        issue_cert(&CertSpec::ca("CN=Test CA"), &ca_key, &ca_spki, "CN=Test CA")
    }

    #[test]
    fn minimal_configuration_builds() {
        let config = ValidationConfig::builder()
            .origin(Url::parse("https://ria.ee").expect("url"))
            .trusted_cas([test_ca()])
            .build()
            .expect("config");

        assert_eq!(config.origin(), "https://ria.ee");
        assert_eq!(config.ocsp_request_timeout, DEFAULT_OCSP_REQUEST_TIMEOUT);
        assert!(!config.disable_ocsp);
    }

    #[test]
    fn origin_drops_path_and_keeps_port() {
        let config = ValidationConfig::builder()
            .origin(Url::parse("https://eid.example.org:8443/login/").expect("url"))
            .trusted_cas([test_ca()])
            .build()
            .expect("config");

        assert_eq!(config.origin(), "https://eid.example.org:8443");
    }

    #[test]
    fn missing_origin_is_rejected() {
        let result = ValidationConfig::builder().trusted_cas([test_ca()]).build();
        assert_matches!(result, Err(Error::Configuration(_)));
    }

    #[test]
    fn missing_trusted_cas_are_rejected() {
        let result = ValidationConfig::builder()
            .origin(Url::parse("https://ria.ee").expect("url"))
            .build();
        assert_matches!(result, Err(Error::Configuration(_)));
    }

    #[test]
    fn non_web_origin_is_rejected() {
        let result = ValidationConfig::builder()
            .origin(Url::parse("data:text/plain,hello").expect("url"))
            .trusted_cas([test_ca()])
            .build();
        assert_matches!(result, Err(Error::Configuration(_)));
    }

    #[test]
    fn pem_bundle_loads_in_order() {
        use der::EncodePem;

        let ca = test_ca();
        let pem = ca
            .to_pem(der::pem::LineEnding::LF)
            .expect("PEM encoding failed");
        let bundle = format!("{pem}\n{pem}");

        let certificates = certificates_from_pem(&bundle).expect("bundle");
        assert_eq!(certificates.len(), 2);
        assert_eq!(certificates[0], ca);
    }

    #[test]
    fn empty_pem_is_rejected() {
        assert_matches!(certificates_from_pem(""), Err(Error::Configuration(_)));
    }
}
