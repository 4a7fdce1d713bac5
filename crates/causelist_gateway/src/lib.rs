//! Causelist gateway: authenticated reverse forwarding to the extraction API.
mod config;
mod envelope;
mod forward;
mod server;

pub use config::{ConfigError, GatewayConfig, DEFAULT_BIND_ADDR, DEFAULT_UPSTREAM_ORIGIN};
pub use envelope::{ForwardHeaders, Method, RequestEnvelope, ResponseEnvelope};
pub use forward::{Forwarder, ReqwestForwarder};
pub use server::{router, PROXY_PREFIX};
