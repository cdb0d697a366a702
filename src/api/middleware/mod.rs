// Middleware module - session state and access control

pub mod auth;
pub mod session;
