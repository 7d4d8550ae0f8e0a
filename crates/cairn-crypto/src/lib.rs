//! Content addressing for Cairn.
//!
//! Provides object framing (`"<kind> <len>\0<payload>"`) and the SHA-1
//! content hasher that turns framed bytes into an [`ObjectId`].
//!
//! All crypto operations wrap established libraries; there is no custom cryptography.
//!
//! [`ObjectId`]: cairn_types::ObjectId

pub mod hasher;

pub use hasher::{frame, header, ContentHasher};
