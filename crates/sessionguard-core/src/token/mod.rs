//! Bearer token decoding.
//!
//! Tokens are three dot-separated segments (header, payload, signature).
//! Only the payload is read; the signature is never verified here.
//!
//! - `decode`: token string to `ClaimSet`
//! - `encode_unsigned`: builds an unsigned token for fixtures and local testing

pub mod claims;
pub mod decoder;
pub mod error;

pub use claims::ClaimSet;
pub use decoder::{decode, encode_unsigned};
pub use error::DecodeError;
