// Copyright (c) 2024 The Web eID Project

//! Certificate handling: key and signature algorithms, trusted-CA
//! verification and subject-certificate checks

pub mod algorithm;
pub mod checks;
pub mod trust;
