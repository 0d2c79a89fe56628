//! Signed, session-bound tokens.

pub mod claims;
pub mod codec;
pub mod errors;
pub mod id_gen;

pub use claims::{Claims, Payload};
pub use codec::{IssuedToken, TokenCodec};
pub use errors::{TokenError, TokenResult};
