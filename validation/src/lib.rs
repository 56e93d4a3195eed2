// Copyright (c) 2024 The Web eID Project

#![doc = include_str!("../README.md")]
#![deny(missing_docs, missing_debug_implementations, unsafe_code)]

pub mod certificate;
pub mod config;
pub mod error;
pub mod ocsp;
pub mod signature;
pub mod token;
pub mod validator;

pub use config::{
    certificates_from_pem, DesignatedOcspServiceConfig, ValidationConfig, ValidationConfigBuilder,
};
pub use error::{Error, Result};
pub use token::AuthToken;
pub use validator::AuthTokenValidator;
