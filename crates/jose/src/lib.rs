#![deny(clippy::pedantic, unsafe_code)]
#![allow(clippy::module_name_repetitions)]

//! JOSE primitives for license verification
//!
//! Base64URL, canonical JSON, JOSE header and JWT claims, pluggable
//! signature algorithms and JWS create/verify with the compact wire form.

pub mod algorithm;
pub mod base64url;
pub mod canonical;
pub mod claims;
pub mod header;
pub mod jws;
pub mod object;

pub use algorithm::{HmacSha256, SignatureAlgorithm};
pub use base64url::{Base64UrlString, DecodeError};
pub use canonical::{parse_flat_object, CanonicalBytes};
pub use claims::JwtClaims;
pub use header::JoseHeader;
pub use jws::{signing_input, Jws};
pub use object::JoseObject;
