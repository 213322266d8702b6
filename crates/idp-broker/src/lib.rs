//! OAuth 2.0 broker over an Auth0-style identity provider.

pub mod config;
pub mod gateway;
pub mod handlers;
pub mod http;
pub mod telemetry;

pub use gateway::{GatewayError, GatewayOptions, IdentityGateway};
pub use handlers::{HandlerContext, HandlerRequest, HandlerResponse};
