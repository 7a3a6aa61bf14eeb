pub mod csrf;
pub mod route_gate;
