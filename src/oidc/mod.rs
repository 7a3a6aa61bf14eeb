//! OpenID Connect plumbing: discovery, PKCE, the authorization-code client,
//! and token decoding/verification.

pub mod client;
pub mod discovery;
pub mod jwt;
pub mod pkce;
