//! 中间件模块

mod auth;

pub use auth::{AuthUser, auth_middleware, security_headers};
