//! Foundation types for Yan.
//!
//! This crate provides the identifier and payload types shared by every other
//! Yan crate: the storage layer, the object model, and the sync protocol.
//!
//! # Key Types
//!
//! - [`Hash`]: Content hash tagged with the kind of value it addresses
//! - [`RawHash`]: A hash whose kind is not known statically (wire level)
//! - [`Blob`]: Opaque byte payload plus string headers

pub mod blob;
pub mod error;
pub mod hash;

pub use blob::Blob;
pub use error::TypeError;
pub use hash::{Hash, RawHash, Untyped};
