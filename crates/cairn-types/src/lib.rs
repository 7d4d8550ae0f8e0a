//! Foundation types for Cairn.
//!
//! This crate provides the identity and classification types shared by every
//! other Cairn crate.
//!
//! # Key Types
//!
//! - [`ObjectId`]: Content-addressed identifier (160-bit SHA-1 address)
//! - [`ObjectKind`]: Object type tag (`blob`, `tree`, `commit`, or opaque)
//! - [`TypeError`]: Parse failures for the types above

pub mod error;
pub mod kind;
pub mod object;

pub use error::TypeError;
pub use kind::ObjectKind;
pub use object::ObjectId;
