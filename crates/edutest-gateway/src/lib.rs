//! edutest-gateway: test definition gateways.
//!
//! Implements the `TestGateway` trait for the portal REST API and for local
//! directories of JSON files, plus an in-memory mock, together with the
//! configuration that selects between them.

pub mod config;
pub mod credentials;
pub mod directory;
pub mod http;
pub mod mock;

pub use config::{create_gateway, load_config, EdutestConfig, GatewayConfig};
pub use credentials::Credentials;
pub use directory::DirectoryGateway;
pub use edutest_core::error::GatewayError;
pub use http::HttpGateway;
pub use mock::MockGateway;
