//! Infrastructure layer module
//!
//! Adapters and external integrations:
//! - Configuration management (figment)
//! - Logging infrastructure (tracing)
//! - Key-value stores (`SQLite` with sqlx, in-memory)
//! - Remote catalog client (reqwest)
//! - Headless renderer
//!
//! Infrastructure implementations satisfy the port traits defined in the domain layer.

pub mod config;
pub mod logging;
pub mod remote;
pub mod renderer;
pub mod storage;
