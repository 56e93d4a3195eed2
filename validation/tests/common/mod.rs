// Copyright (c) 2024 The Web eID Project

//! Shared fixtures: a generated three-certificate PKI, signed
//! authentication tokens and an in-process OCSP responder.

use std::str::FromStr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use const_oid::{AssociatedOid, ObjectIdentifier};
use der::asn1::{BitString, GeneralizedTime, Ia5String, OctetString};
use der::{Decode, Encode};
use p256::ecdsa::signature::Signer;
use rand_core::OsRng;
use sha2::{Digest, Sha384};
use url::Url;
use x509_cert::certificate::{TbsCertificate, Version};
use x509_cert::ext::pkix::name::GeneralName;
use x509_cert::ext::pkix::certpolicy::PolicyInformation;
use x509_cert::ext::pkix::{
    AccessDescription, AuthorityInfoAccessSyntax, CertificatePolicies, ExtendedKeyUsage, KeyUsage,
    KeyUsages,
};
use x509_cert::ext::Extension;
use x509_cert::name::Name;
use x509_cert::serial_number::SerialNumber;
use x509_cert::spki::{AlgorithmIdentifierOwned, EncodePublicKey, SubjectPublicKeyInfoOwned};
use x509_cert::time::{Time, Validity};
use x509_cert::Certificate;

use web_eid_authtoken_validation::ocsp::client::OcspTransport;
use web_eid_authtoken_validation::ocsp::types::{
    BasicOcspResponse, CertStatus, OcspRequest, OcspResponse, OcspResponseStatus, ResponderId,
    ResponseBytes, ResponseData, SingleResponse, ID_PKIX_OCSP_BASIC, ID_PKIX_OCSP_NONCE,
};
use web_eid_authtoken_validation::{AuthToken, Result, ValidationConfig, ValidationConfigBuilder};

/// The frozen clock all scenarios run at, 2021-08-26T17:46:40Z.
pub const FIXED_NOW: u64 = 1_630_000_000;
/// Validity window of every generated certificate.
pub const NOT_BEFORE: u64 = 1_600_000_000;
#[allow(dead_code)]
pub const NOT_AFTER: u64 = 2_000_000_000;

pub const ORIGIN: &str = "https://ria.ee";
pub const CHALLENGE_NONCE: &[u8] = b"12345678123456781234567812345678";
pub const AIA_OCSP_URL: &str = "http://aia.demo.sk.ee/esteid2018";

const OID_SIG_ECDSA_WITH_SHA256: ObjectIdentifier =
    ObjectIdentifier::new_unwrap("1.2.840.10045.4.3.2");
const OID_AD_OCSP: ObjectIdentifier = ObjectIdentifier::new_unwrap("1.3.6.1.5.5.7.48.1");
const OID_KP_CLIENT_AUTH: ObjectIdentifier = ObjectIdentifier::new_unwrap("1.3.6.1.5.5.7.3.2");
const OID_KP_OCSP_SIGNING: ObjectIdentifier = ObjectIdentifier::new_unwrap("1.3.6.1.5.5.7.3.9");

fn ecdsa_sha256() -> AlgorithmIdentifierOwned {
    AlgorithmIdentifierOwned {
        oid: OID_SIG_ECDSA_WITH_SHA256,
        parameters: None,
    }
}

fn generalized(unix_secs: u64) -> GeneralizedTime {
    GeneralizedTime::from_unix_duration(Duration::from_secs(unix_secs)).expect("time")
}

fn extension<T: Encode>(oid: ObjectIdentifier, critical: bool, value: &T) -> Extension {
    let der = value.to_der().expect("extension value");
    Extension {
        extn_id: oid,
        critical,
        extn_value: OctetString::new(der).expect("extension wrapping"),
    }
}

fn spki_of_p256(key: &p256::ecdsa::SigningKey) -> SubjectPublicKeyInfoOwned {
    let der = key
        .verifying_key()
        .to_public_key_der()
        .expect("public key encoding");
    SubjectPublicKeyInfoOwned::from_der(der.as_bytes()).expect("public key decoding")
}

fn spki_of_p384(key: &p384::ecdsa::SigningKey) -> SubjectPublicKeyInfoOwned {
    let der = key
        .verifying_key()
        .to_public_key_der()
        .expect("public key encoding");
    SubjectPublicKeyInfoOwned::from_der(der.as_bytes()).expect("public key decoding")
}

/// Issue a certificate signed with `ca_key` (ECDSA P-256 / SHA-256).
fn issue(
    subject: &str,
    issuer: &str,
    serial: &[u8],
    spki: SubjectPublicKeyInfoOwned,
    ca_key: &p256::ecdsa::SigningKey,
    extensions: Vec<Extension>,
) -> Certificate {
    let tbs_certificate = TbsCertificate {
        version: Version::V3,
        serial_number: SerialNumber::new(serial).expect("serial"),
        signature: ecdsa_sha256(),
        issuer: Name::from_str(issuer).expect("issuer name"),
        validity: Validity {
            not_before: Time::GeneralTime(generalized(NOT_BEFORE)),
            not_after: Time::GeneralTime(generalized(NOT_AFTER)),
        },
        subject: Name::from_str(subject).expect("subject name"),
        subject_public_key_info: spki,
        issuer_unique_id: None,
        subject_unique_id: None,
        extensions: if extensions.is_empty() {
            None
        } else {
            Some(extensions)
        },
    };
    let tbs_der = tbs_certificate.to_der().expect("TBS encoding");
    let signature: p256::ecdsa::Signature = ca_key.sign(&tbs_der);
    Certificate {
        tbs_certificate,
        signature_algorithm: ecdsa_sha256(),
        signature: BitString::from_bytes(signature.to_der().as_bytes()).expect("signature"),
    }
}

/// A complete test PKI: the trusted issuing CA, a user authentication
/// certificate on P-384 and an OCSP responder certificate on P-256.
pub struct TestPki {
    pub ca: Certificate,
    pub ca_key: p256::ecdsa::SigningKey,
    pub user_cert: Certificate,
    pub user_key: p384::ecdsa::SigningKey,
    pub responder_cert: Certificate,
    pub responder_key: p256::ecdsa::SigningKey,
}

impl TestPki {
    pub fn new() -> Self {
        Self::with_user_policies(&[])
    }

    /// A PKI whose user certificate carries the given certificate policies.
    pub fn with_user_policies(policies: &[ObjectIdentifier]) -> Self {
        let ca_key = p256::ecdsa::SigningKey::random(&mut OsRng);
        let ca = issue(
            "CN=TEST of ESTEID2018",
            "CN=TEST of ESTEID2018",
            &[1],
            spki_of_p256(&ca_key),
            &ca_key,
            vec![extension(
                KeyUsage::OID,
                true,
                &KeyUsage(KeyUsages::KeyCertSign | KeyUsages::CRLSign),
            )],
        );

        let user_key = p384::ecdsa::SigningKey::random(&mut OsRng);
        let mut user_extensions = vec![
            extension(
                KeyUsage::OID,
                true,
                &KeyUsage(KeyUsages::DigitalSignature.into()),
            ),
            extension(
                ExtendedKeyUsage::OID,
                false,
                &ExtendedKeyUsage(vec![OID_KP_CLIENT_AUTH]),
            ),
            extension(
                AuthorityInfoAccessSyntax::OID,
                false,
                &AuthorityInfoAccessSyntax(vec![AccessDescription {
                    access_method: OID_AD_OCSP,
                    access_location: GeneralName::UniformResourceIdentifier(
                        Ia5String::new(AIA_OCSP_URL).expect("URL"),
                    ),
                }]),
            ),
        ];
        if !policies.is_empty() {
            user_extensions.push(extension(
                CertificatePolicies::OID,
                false,
                &CertificatePolicies(
                    policies
                        .iter()
                        .map(|oid| PolicyInformation {
                            policy_identifier: *oid,
                            policy_qualifiers: None,
                        })
                        .collect(),
                ),
            ));
        }
        let user_cert = issue(
            "CN=JAAK-KRISTJAN JÕEORG",
            "CN=TEST of ESTEID2018",
            &[0x05, 0x39],
            spki_of_p384(&user_key),
            &ca_key,
            user_extensions,
        );

        let (responder_cert, responder_key) = make_responder(&ca_key, "CN=TEST of SK OCSP RESPONDER 2020", true);

        Self {
            ca,
            ca_key,
            user_cert,
            user_key,
            responder_cert,
            responder_key,
        }
    }
}

/// Issue an OCSP responder certificate under the PKI's CA.
pub fn make_responder(
    ca_key: &p256::ecdsa::SigningKey,
    subject: &str,
    ocsp_signing_eku: bool,
) -> (Certificate, p256::ecdsa::SigningKey) {
    let key = p256::ecdsa::SigningKey::random(&mut OsRng);
    let mut extensions = vec![extension(
        KeyUsage::OID,
        true,
        &KeyUsage(KeyUsages::DigitalSignature.into()),
    )];
    if ocsp_signing_eku {
        extensions.push(extension(
            ExtendedKeyUsage::OID,
            false,
            &ExtendedKeyUsage(vec![OID_KP_OCSP_SIGNING]),
        ));
    }
    let cert = issue(
        subject,
        "CN=TEST of ESTEID2018",
        &[7],
        spki_of_p256(&key),
        ca_key,
        extensions,
    );
    (cert, key)
}

/// A validator configuration trusting the fixture CA.
pub fn config(pki: &TestPki) -> ValidationConfigBuilder {
    ValidationConfig::builder()
        .origin(Url::parse(ORIGIN).expect("origin"))
        .trusted_cas([pki.ca.clone()])
}

/// Sign an ES384 authentication token binding `origin` and `nonce`.
pub fn signed_token(pki: &TestPki, origin: &str, nonce: &[u8]) -> AuthToken {
    let mut blob = Sha384::digest(origin.as_bytes()).to_vec();
    blob.extend_from_slice(&Sha384::digest(nonce));
    let signature: p384::ecdsa::Signature = pki.user_key.sign(&blob);

    AuthToken {
        unverified_certificate: BASE64.encode(pki.user_cert.to_der().expect("certificate")),
        algorithm: "ES384".into(),
        signature: BASE64.encode(signature.to_bytes().as_slice()),
        format: "web-eid:1.0".into(),
    }
}

/// An in-process OCSP responder serving signed responses through the
/// transport seam, echoing the request CertID and nonce.
#[derive(Debug)]
pub struct TestResponder {
    pub responder_cert: Certificate,
    pub responder_key: p256::ecdsa::SigningKey,
    /// Attach the responder certificate to the response
    pub include_certs: bool,
    pub cert_status: CertStatus,
    pub produced_at: u64,
    pub this_update: u64,
    pub next_update: Option<u64>,
    /// Replace the echoed nonce with this value
    pub nonce_override: Option<Vec<u8>>,
    /// Number of requests served
    pub calls: AtomicUsize,
}

impl TestResponder {
    pub fn new(pki: &TestPki) -> Self {
        Self {
            responder_cert: pki.responder_cert.clone(),
            responder_key: pki.responder_key.clone(),
            include_certs: true,
            cert_status: CertStatus::good(),
            produced_at: FIXED_NOW,
            this_update: FIXED_NOW,
            next_update: Some(FIXED_NOW + 3600),
            nonce_override: None,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn respond(&self, request: &[u8]) -> Vec<u8> {
        let request = OcspRequest::from_der(request).expect("request");
        let cert_id = request.tbs_request.request_list[0].req_cert.clone();

        let echoed_nonce = request
            .tbs_request
            .request_extensions
            .as_ref()
            .and_then(|extensions| {
                extensions
                    .iter()
                    .find(|extension| extension.extn_id == ID_PKIX_OCSP_NONCE)
            })
            .map(|extension| extension.extn_value.as_bytes().to_vec());

        let response_extensions = match (&self.nonce_override, echoed_nonce) {
            (Some(nonce), _) => {
                let value = OctetString::new(nonce.clone())
                    .expect("nonce")
                    .to_der()
                    .expect("nonce value");
                Some(vec![Extension {
                    extn_id: ID_PKIX_OCSP_NONCE,
                    critical: false,
                    extn_value: OctetString::new(value).expect("nonce wrapping"),
                }])
            }
            (None, Some(value)) => Some(vec![Extension {
                extn_id: ID_PKIX_OCSP_NONCE,
                critical: false,
                extn_value: OctetString::new(value).expect("nonce wrapping"),
            }]),
            (None, None) => None,
        };

        let tbs_response_data = ResponseData {
            version: Default::default(),
            responder_id: ResponderId::ByName(self.responder_cert.tbs_certificate.subject.clone()),
            produced_at: generalized(self.produced_at),
            responses: vec![SingleResponse {
                cert_id,
                cert_status: self.cert_status.clone(),
                this_update: generalized(self.this_update),
                next_update: self.next_update.map(generalized),
                single_extensions: None,
            }],
            response_extensions,
        };

        let tbs_der = tbs_response_data.to_der().expect("response data");
        let signature: p256::ecdsa::Signature = self.responder_key.sign(&tbs_der);
        let basic = BasicOcspResponse {
            tbs_response_data,
            signature_algorithm: ecdsa_sha256(),
            signature: BitString::from_bytes(signature.to_der().as_bytes()).expect("signature"),
            certs: self
                .include_certs
                .then(|| vec![self.responder_cert.clone()]),
        };

        let response = OcspResponse {
            response_status: OcspResponseStatus::Successful,
            response_bytes: Some(ResponseBytes {
                response_type: ID_PKIX_OCSP_BASIC,
                response: OctetString::new(basic.to_der().expect("basic response"))
                    .expect("response bytes"),
            }),
        };
        response.to_der().expect("response")
    }
}

impl OcspTransport for TestResponder {
    fn fetch(&self, _url: &Url, request: &[u8]) -> Result<Vec<u8>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.respond(request))
    }
}
