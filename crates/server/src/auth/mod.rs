//! Bearer-token authentication for the HTTP API.

pub mod middleware;

pub use middleware::{AdminUser, AuthenticatedUser, Claims};
