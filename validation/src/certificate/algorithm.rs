// Copyright (c) 2024 The Web eID Project

//! Public-key and signature-algorithm handling for certificate and OCSP
//! signature verification

use const_oid::ObjectIdentifier;
use rsa::pkcs1::DecodeRsaPublicKey;
use rsa::{Pkcs1v15Sign, Pss};
use sha2::{Digest, Sha256, Sha384, Sha512};
use signature::hazmat::PrehashVerifier;
use x509_cert::spki::{AlgorithmIdentifierOwned, SubjectPublicKeyInfoOwned};

const OID_EC_PUBLIC_KEY: ObjectIdentifier = ObjectIdentifier::new_unwrap("1.2.840.10045.2.1");
const OID_NIST_P256: ObjectIdentifier = ObjectIdentifier::new_unwrap("1.2.840.10045.3.1.7");
const OID_SECP384R1: ObjectIdentifier = ObjectIdentifier::new_unwrap("1.3.132.0.34");
const OID_SECP521R1: ObjectIdentifier = ObjectIdentifier::new_unwrap("1.3.132.0.35");
const OID_PKCS1_RSA_ENCRYPTION: ObjectIdentifier =
    ObjectIdentifier::new_unwrap("1.2.840.113549.1.1.1");
const OID_SIG_ECDSA_WITH_SHA256: ObjectIdentifier =
    ObjectIdentifier::new_unwrap("1.2.840.10045.4.3.2");
const OID_SIG_ECDSA_WITH_SHA384: ObjectIdentifier =
    ObjectIdentifier::new_unwrap("1.2.840.10045.4.3.3");
const OID_SIG_ECDSA_WITH_SHA512: ObjectIdentifier =
    ObjectIdentifier::new_unwrap("1.2.840.10045.4.3.4");
const OID_PKCS1_SHA256_WITH_RSA: ObjectIdentifier =
    ObjectIdentifier::new_unwrap("1.2.840.113549.1.1.11");
const OID_PKCS1_SHA384_WITH_RSA: ObjectIdentifier =
    ObjectIdentifier::new_unwrap("1.2.840.113549.1.1.12");
const OID_PKCS1_SHA512_WITH_RSA: ObjectIdentifier =
    ObjectIdentifier::new_unwrap("1.2.840.113549.1.1.13");

/// Result type for key and signature handling
pub type Result<T> = core::result::Result<T, Error>;

/// Error type for decoding keys and verifying signatures.
#[derive(displaydoc::Display, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// An error occurred decoding the key from a certificate
    KeyDecoding,
    /// An error occurred decoding the signature
    SignatureDecoding,
    /// The signature does not match with the verifying key
    SignatureVerification,
    /// The signature algorithm is not supported: {0}
    UnsupportedAlgorithm(String),
}

/// Hash algorithms used by the supported signature schemes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HashAlgorithm {
    /// SHA-256
    Sha256,
    /// SHA-384
    Sha384,
    /// SHA-512
    Sha512,
}

impl HashAlgorithm {
    /// Digest `data` with this hash algorithm
    pub fn digest(&self, data: &[u8]) -> Vec<u8> {
        match self {
            HashAlgorithm::Sha256 => Sha256::digest(data).to_vec(),
            HashAlgorithm::Sha384 => Sha384::digest(data).to_vec(),
            HashAlgorithm::Sha512 => Sha512::digest(data).to_vec(),
        }
    }

    /// Digest output length in bytes
    pub fn output_len(&self) -> usize {
        match self {
            HashAlgorithm::Sha256 => 32,
            HashAlgorithm::Sha384 => 48,
            HashAlgorithm::Sha512 => 64,
        }
    }
}

/// Signature scheme paired with its hash algorithm
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignatureScheme {
    /// ECDSA; the signature is a DER `SEQUENCE { r, s }`
    Ecdsa(HashAlgorithm),
    /// RSASSA-PKCS1 v1.5; the signature is the raw encrypted block
    RsaPkcs1(HashAlgorithm),
    /// RSASSA-PSS with MGF1 over the same hash and salt length equal to the
    /// hash length
    RsaPss(HashAlgorithm),
}

/// Map an X.509 `AlgorithmIdentifier` to a [`SignatureScheme`].
///
/// Covers the ECDSA-with-SHA2 and sha*WithRSAEncryption families used by
/// eID CA and OCSP responder certificates.
impl TryFrom<&AlgorithmIdentifierOwned> for SignatureScheme {
    type Error = Error;

    fn try_from(value: &AlgorithmIdentifierOwned) -> core::result::Result<Self, Self::Error> {
        match value.oid {
            OID_SIG_ECDSA_WITH_SHA256 => Ok(SignatureScheme::Ecdsa(HashAlgorithm::Sha256)),
            OID_SIG_ECDSA_WITH_SHA384 => Ok(SignatureScheme::Ecdsa(HashAlgorithm::Sha384)),
            OID_SIG_ECDSA_WITH_SHA512 => Ok(SignatureScheme::Ecdsa(HashAlgorithm::Sha512)),
            OID_PKCS1_SHA256_WITH_RSA => Ok(SignatureScheme::RsaPkcs1(HashAlgorithm::Sha256)),
            OID_PKCS1_SHA384_WITH_RSA => Ok(SignatureScheme::RsaPkcs1(HashAlgorithm::Sha384)),
            OID_PKCS1_SHA512_WITH_RSA => Ok(SignatureScheme::RsaPkcs1(HashAlgorithm::Sha512)),
            oid => Err(Error::UnsupportedAlgorithm(oid.to_string())),
        }
    }
}

/// Public key used in certificate, OCSP and token signature verification
#[derive(Clone)]
pub enum PublicKey {
    /// Elliptic curve public key on NIST P-256
    EcP256(p256::ecdsa::VerifyingKey),
    /// Elliptic curve public key on NIST P-384
    EcP384(p384::ecdsa::VerifyingKey),
    /// Elliptic curve public key on NIST P-521
    EcP521(p521::ecdsa::VerifyingKey),
    /// RSA public key
    Rsa(rsa::RsaPublicKey),
}

// `p521::ecdsa::VerifyingKey` does not implement `Debug`/`PartialEq`/`Eq`
// (unlike its p256/p384 counterparts), so these are implemented manually in
// terms of its SEC1-encoded point, which uniquely identifies the key.
impl core::fmt::Debug for PublicKey {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            PublicKey::EcP256(key) => f.debug_tuple("EcP256").field(key).finish(),
            PublicKey::EcP384(key) => f.debug_tuple("EcP384").field(key).finish(),
            PublicKey::EcP521(key) => f
                .debug_tuple("EcP521")
                .field(&key.to_encoded_point(false))
                .finish(),
            PublicKey::Rsa(key) => f.debug_tuple("Rsa").field(key).finish(),
        }
    }
}

impl PartialEq for PublicKey {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (PublicKey::EcP256(a), PublicKey::EcP256(b)) => a == b,
            (PublicKey::EcP384(a), PublicKey::EcP384(b)) => a == b,
            (PublicKey::EcP521(a), PublicKey::EcP521(b)) => {
                a.to_encoded_point(false) == b.to_encoded_point(false)
            }
            (PublicKey::Rsa(a), PublicKey::Rsa(b)) => a == b,
            _ => false,
        }
    }
}

impl Eq for PublicKey {}

impl PublicKey {
    /// Verify `signature` over `message` with this key under `scheme`.
    ///
    /// ECDSA signatures are DER encoded; the message is digested with the
    /// scheme's hash and verified against the prehash so the digest width
    /// and the curve are free to differ. RSA signatures are the raw
    /// signature block.
    pub fn verify(&self, message: &[u8], signature: &[u8], scheme: SignatureScheme) -> Result<()> {
        match scheme {
            SignatureScheme::Ecdsa(hash) => {
                let prehash = hash.digest(message);
                match self {
                    PublicKey::EcP256(key) => {
                        let sig = p256::ecdsa::Signature::from_der(signature)
                            .map_err(|_| Error::SignatureDecoding)?;
                        key.verify_prehash(&prehash, &sig)
                            .map_err(|_| Error::SignatureVerification)
                    }
                    PublicKey::EcP384(key) => {
                        let sig = p384::ecdsa::Signature::from_der(signature)
                            .map_err(|_| Error::SignatureDecoding)?;
                        key.verify_prehash(&prehash, &sig)
                            .map_err(|_| Error::SignatureVerification)
                    }
                    PublicKey::EcP521(key) => {
                        let sig = p521::ecdsa::Signature::from_der(signature)
                            .map_err(|_| Error::SignatureDecoding)?;
                        key.verify_prehash(&prehash, &sig)
                            .map_err(|_| Error::SignatureVerification)
                    }
                    PublicKey::Rsa(_) => Err(Error::SignatureVerification),
                }
            }
            SignatureScheme::RsaPkcs1(hash) => match self {
                PublicKey::Rsa(key) => {
                    let hashed = hash.digest(message);
                    let result = match hash {
                        HashAlgorithm::Sha256 => {
                            key.verify(Pkcs1v15Sign::new::<Sha256>(), &hashed, signature)
                        }
                        HashAlgorithm::Sha384 => {
                            key.verify(Pkcs1v15Sign::new::<Sha384>(), &hashed, signature)
                        }
                        HashAlgorithm::Sha512 => {
                            key.verify(Pkcs1v15Sign::new::<Sha512>(), &hashed, signature)
                        }
                    };
                    result.map_err(|_| Error::SignatureVerification)
                }
                _ => Err(Error::SignatureVerification),
            },
            SignatureScheme::RsaPss(hash) => match self {
                PublicKey::Rsa(key) => {
                    let hashed = hash.digest(message);
                    let result = match hash {
                        HashAlgorithm::Sha256 => {
                            key.verify(Pss::new::<Sha256>(), &hashed, signature)
                        }
                        HashAlgorithm::Sha384 => {
                            key.verify(Pss::new::<Sha384>(), &hashed, signature)
                        }
                        HashAlgorithm::Sha512 => {
                            key.verify(Pss::new::<Sha512>(), &hashed, signature)
                        }
                    };
                    result.map_err(|_| Error::SignatureVerification)
                }
                _ => Err(Error::SignatureVerification),
            },
        }
    }
}

/// Create a [`PublicKey`] from a [`SubjectPublicKeyInfoOwned`]
impl TryFrom<&SubjectPublicKeyInfoOwned> for PublicKey {
    type Error = Error;

    fn try_from(value: &SubjectPublicKeyInfoOwned) -> core::result::Result<Self, Self::Error> {
        let bytes = value
            .subject_public_key
            .as_bytes()
            .ok_or(Error::KeyDecoding)?;
        match value.algorithm.oid {
            OID_EC_PUBLIC_KEY => {
                let params = value.algorithm.parameters.as_ref().ok_or(Error::KeyDecoding)?;
                let curve = params
                    .decode_as::<ObjectIdentifier>()
                    .map_err(|_| Error::KeyDecoding)?;
                match curve {
                    OID_NIST_P256 => {
                        let key = p256::ecdsa::VerifyingKey::from_sec1_bytes(bytes)
                            .map_err(|_| Error::KeyDecoding)?;
                        Ok(PublicKey::EcP256(key))
                    }
                    OID_SECP384R1 => {
                        let key = p384::ecdsa::VerifyingKey::from_sec1_bytes(bytes)
                            .map_err(|_| Error::KeyDecoding)?;
                        Ok(PublicKey::EcP384(key))
                    }
                    OID_SECP521R1 => {
                        let key = p521::ecdsa::VerifyingKey::from_sec1_bytes(bytes)
                            .map_err(|_| Error::KeyDecoding)?;
                        Ok(PublicKey::EcP521(key))
                    }
                    _ => Err(Error::KeyDecoding),
                }
            }
            OID_PKCS1_RSA_ENCRYPTION => {
                let key = rsa::RsaPublicKey::from_pkcs1_der(bytes).map_err(|_| Error::KeyDecoding)?;
                Ok(PublicKey::Rsa(key))
            }
            _ => Err(Error::KeyDecoding),
        }
    }
}
