// Copyright (c) 2024 The Web eID Project

//! Token signature handling: the JWS algorithm registry, transcoding of the
//! smart card's raw ECDSA signatures into DER, and verification of the
//! signature over the origin/nonce binding

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;

use crate::certificate::algorithm::{HashAlgorithm, PublicKey, SignatureScheme};
use crate::error::{Error, Result};

/// JWS signature algorithms accepted in authentication tokens
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[allow(missing_docs)]
pub enum Algorithm {
    Es256,
    Es384,
    Es512,
    Ps256,
    Ps384,
    Ps512,
    Rs256,
    Rs384,
    Rs512,
}

impl Algorithm {
    /// The hash paired with this algorithm
    pub fn hash(&self) -> HashAlgorithm {
        match self {
            Algorithm::Es256 | Algorithm::Ps256 | Algorithm::Rs256 => HashAlgorithm::Sha256,
            Algorithm::Es384 | Algorithm::Ps384 | Algorithm::Rs384 => HashAlgorithm::Sha384,
            Algorithm::Es512 | Algorithm::Ps512 | Algorithm::Rs512 => HashAlgorithm::Sha512,
        }
    }

    /// The signature scheme implied by this algorithm
    pub fn scheme(&self) -> SignatureScheme {
        match self {
            Algorithm::Es256 | Algorithm::Es384 | Algorithm::Es512 => {
                SignatureScheme::Ecdsa(self.hash())
            }
            Algorithm::Ps256 | Algorithm::Ps384 | Algorithm::Ps512 => {
                SignatureScheme::RsaPss(self.hash())
            }
            Algorithm::Rs256 | Algorithm::Rs384 | Algorithm::Rs512 => {
                SignatureScheme::RsaPkcs1(self.hash())
            }
        }
    }

    /// Field width in bytes of the curve for the `ES*` algorithms
    pub fn ec_field_len(&self) -> Option<usize> {
        match self {
            Algorithm::Es256 => Some(32),
            Algorithm::Es384 => Some(48),
            Algorithm::Es512 => Some(66),
            _ => None,
        }
    }
}

impl core::str::FromStr for Algorithm {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "ES256" => Ok(Algorithm::Es256),
            "ES384" => Ok(Algorithm::Es384),
            "ES512" => Ok(Algorithm::Es512),
            "PS256" => Ok(Algorithm::Ps256),
            "PS384" => Ok(Algorithm::Ps384),
            "PS512" => Ok(Algorithm::Ps512),
            "RS256" => Ok(Algorithm::Rs256),
            "RS384" => Ok(Algorithm::Rs384),
            "RS512" => Ok(Algorithm::Rs512),
            other => Err(Error::UnsupportedAlgorithm(other.to_string())),
        }
    }
}

/// Transcode a raw `R || S` ECDSA signature into a DER
/// `SEQUENCE { INTEGER r, INTEGER s }`.
///
/// The input must be exactly `2 * field_len` bytes with both halves
/// fixed-width. Leading zero bytes are stripped from each half and a zero
/// byte is prepended when the remaining high bit is set, per the DER
/// two's-complement INTEGER rule.
pub fn ecdsa_raw_to_der(raw: &[u8], field_len: usize) -> Result<Vec<u8>> {
    if raw.len() != field_len * 2 {
        return Err(Error::InvalidSignatureFormat);
    }
    let (r, s) = raw.split_at(field_len);
    let r = trim_integer(r);
    let s = trim_integer(s);

    let content_len = 2 + r.len() + 2 + s.len();
    let mut der = Vec::with_capacity(content_len + 4);
    der.push(0x30);
    push_length(&mut der, content_len);
    der.push(0x02);
    push_length(&mut der, r.len());
    der.extend_from_slice(&r);
    der.push(0x02);
    push_length(&mut der, s.len());
    der.extend_from_slice(&s);
    Ok(der)
}

/// Minimal two's-complement content octets for an unsigned integer.
fn trim_integer(half: &[u8]) -> Vec<u8> {
    // An all-zero half keeps a single zero content byte
    let start = half
        .iter()
        .position(|&byte| byte != 0)
        .unwrap_or(half.len() - 1);
    let mut content = Vec::with_capacity(half.len() - start + 1);
    if half[start] & 0x80 != 0 {
        content.push(0x00);
    }
    content.extend_from_slice(&half[start..]);
    content
}

/// DER length octets: single byte below 128, long form above.
fn push_length(der: &mut Vec<u8>, len: usize) {
    if len < 0x80 {
        der.push(len as u8);
    } else if len <= 0xff {
        der.push(0x81);
        der.push(len as u8);
    } else {
        der.push(0x82);
        der.push((len >> 8) as u8);
        der.push(len as u8);
    }
}

/// Verify the token signature over `H(origin) || H(nonce)`.
///
/// `ES*` signatures arrive as the card's fixed-width `R || S` concatenation
/// and are transcoded to DER before verification; RSA signatures are used as
/// decoded. The origin string and the nonce bytes are hashed as-is, with no
/// separator between the two digests.
pub fn verify_token_signature(
    algorithm: Algorithm,
    signature_base64: &str,
    public_key: &PublicKey,
    origin: &str,
    challenge_nonce: &[u8],
) -> Result<()> {
    let raw = BASE64
        .decode(signature_base64)
        .map_err(|_| Error::InvalidSignatureFormat)?;
    let signature = match algorithm.ec_field_len() {
        Some(field_len) => ecdsa_raw_to_der(&raw, field_len)?,
        None => raw,
    };

    let hash = algorithm.hash();
    let mut signed_blob = hash.digest(origin.as_bytes());
    signed_blob.extend_from_slice(&hash.digest(challenge_nonce));

    public_key
        .verify(&signed_blob, &signature, algorithm.scheme())
        .map_err(|_| Error::TokenSignatureInvalid)
}
