pub mod attempt;
pub mod circuit_breaker;
pub mod config;
pub mod courier;
pub mod error;
pub mod handlers;
pub mod message;
pub mod middleware;
pub mod providers;
pub mod queue;
pub mod rate_limiter;
pub mod response;
pub mod server;

pub use config::Config;
pub use courier::Courier;
pub use error::{CourierError, Result};
pub use server::{create_app, Server};
