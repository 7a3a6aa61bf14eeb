//! Client side of the Product Cloud API gateway.

pub mod client;
pub mod resources;
