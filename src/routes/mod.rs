//! HTTP route handlers.

pub mod api;
pub mod callback;
pub mod events;
pub mod health;
pub mod login;
pub mod logout;
pub mod me;
pub mod tenant;
pub mod token;
