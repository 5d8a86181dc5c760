//! Cryptographic primitives for Yan.
//!
//! Provides domain-separated BLAKE3 hashing. All crypto operations wrap
//! established libraries; there is no custom cryptography here.

pub mod hasher;

pub use hasher::ContentHasher;
